use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::user::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub address: String,
    pub city: String,
    pub pincode: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A ticketed event. `ticket_sold` never exceeds `number_of_tickets`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub email: String,
    pub description: String,
    pub tag: String,
    pub ticket_sold: i32,
    pub income: Decimal,
    pub date: DateTime<Utc>,
    pub time: String,
    pub ticket_price: Decimal,
    pub number_of_tickets: i32,
    pub disabled: bool,
    #[sqlx(flatten)]
    pub location: Location,
    pub duration: i32,
    pub created_by: Uuid,
    pub expired: bool,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn is_past(&self, today: NaiveDate) -> bool {
        self.date.date_naive() < today
    }
}

/// Event details joined with the organizer record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWithCreator {
    #[serde(flatten)]
    pub event: Event,
    pub creator: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    /// Organizer email; resolved to `created_by`.
    pub email: String,
    pub title: String,
    pub description: String,
    pub tag: String,
    pub date: DateTime<Utc>,
    pub time: String,
    pub ticket_price: Decimal,
    pub number_of_tickets: i32,
    pub location: Location,
    pub duration: i32,
}

impl NewEvent {
    pub fn into_event(self, created_by: Uuid) -> Event {
        Event {
            id: Uuid::new_v4(),
            title: self.title,
            email: self.email,
            description: self.description,
            tag: self.tag,
            ticket_sold: 0,
            income: Decimal::ZERO,
            date: self.date,
            time: self.time,
            ticket_price: self.ticket_price,
            number_of_tickets: self.number_of_tickets,
            disabled: false,
            location: self.location,
            duration: self.duration,
            created_by,
            expired: false,
            created_at: Utc::now(),
        }
    }
}

/// Editable fields. Sales counters are absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tag: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub time: Option<String>,
    pub ticket_price: Option<Decimal>,
    pub number_of_tickets: Option<i32>,
    pub location: Option<Location>,
    pub duration: Option<i32>,
    pub disabled: Option<bool>,
}

impl Event {
    pub fn apply(&mut self, update: EventUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(tag) = update.tag {
            self.tag = tag;
        }
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(time) = update.time {
            self.time = time;
        }
        if let Some(price) = update.ticket_price {
            self.ticket_price = price;
        }
        if let Some(capacity) = update.number_of_tickets {
            self.number_of_tickets = capacity;
        }
        if let Some(location) = update.location {
            self.location = location;
        }
        if let Some(duration) = update.duration {
            self.duration = duration;
        }
        if let Some(disabled) = update.disabled {
            self.disabled = disabled;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventSearch {
    pub term: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub tag: Option<String>,
}

impl EventSearch {
    /// In-process evaluation of the search filter. Expired events never match.
    pub fn matches(&self, event: &Event) -> bool {
        if event.expired {
            return false;
        }
        if let Some(term) = self.term.as_deref().filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            if !event.title.to_lowercase().contains(&term)
                && !event.description.to_lowercase().contains(&term)
            {
                return false;
            }
        }
        if let Some(date) = self.date {
            if event.date < date {
                return false;
            }
        }
        if let Some(country) = &self.country {
            if &event.location.country != country {
                return false;
            }
        }
        if let Some(city) = &self.city {
            if &event.location.city != city {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if &event.tag != tag {
                return false;
            }
        }
        true
    }
}
