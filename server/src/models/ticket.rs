use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::event::Event;
use crate::models::user::User;

/// A purchase of `number_of_tickets` seats for one event by one user.
///
/// `ticket_code` and `qr_payload` are unique across all tickets.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub ticket_code: String,
    pub qr_payload: String,
    /// Rendered scannable image. `None` means the encoder failed at issuance
    /// and the image is still pending.
    pub qr_image: Option<String>,
    pub number_of_tickets: i32,
    pub bought_country_code: String,
    pub checked_in: bool,
    pub created_at: DateTime<Utc>,
}

/// A fully initialised ticket that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub ticket_code: String,
    pub qr_payload: String,
    pub qr_image: Option<String>,
    pub number_of_tickets: i32,
    pub bought_country_code: String,
    pub created_at: DateTime<Utc>,
}

impl From<NewTicket> for Ticket {
    fn from(new: NewTicket) -> Self {
        Self {
            id: new.id,
            event_id: new.event_id,
            user_id: new.user_id,
            ticket_code: new.ticket_code,
            qr_payload: new.qr_payload,
            qr_image: new.qr_image,
            number_of_tickets: new.number_of_tickets,
            bought_country_code: new.bought_country_code,
            checked_in: false,
            created_at: new.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDetails {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub event: Option<Event>,
    pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTicketRequest {
    pub event_id: Uuid,
    pub user_id: Uuid,
    #[serde(deserialize_with = "integer_or_numeric_string")]
    pub quantity: i32,
}

/// Storefront clients send the quantity as `2` or `"2"`.
fn integer_or_numeric_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Integer(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Integer(n) => i32::try_from(n)
            .map_err(|_| de::Error::custom(format!("quantity {n} is out of range"))),
        Raw::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("quantity '{text}' is not an integer"))),
    }
}

#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub event_ids: Option<Vec<Uuid>>,
    pub user_id: Option<Uuid>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl TicketFilter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        if let Some(ids) = &self.event_ids {
            if !ids.contains(&ticket.event_id) {
                return false;
            }
        }
        if let Some(user_id) = self.user_id {
            if ticket.user_id != user_id {
                return false;
            }
        }
        if let Some(from) = self.created_from {
            if ticket.created_at < from {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if ticket.created_at >= before {
                return false;
            }
        }
        true
    }
}
