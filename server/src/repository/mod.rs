//! Storage seam.
//!
//! Handlers and services only see these traits. `PgStore` backs production,
//! `MemoryStore` backs tests and the `memory` store backend. Both implement
//! every trait on a single value so cross-entity writes (a sale touching an
//! event and a ticket, an event removal touching its tickets) stay atomic.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    DailyTraffic, Event, EventSearch, NewTicket, Ticket, TicketFilter, User, UserRole, UserUpdate,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum RepoError {
    /// A ticket code or scannable payload collided with an existing ticket.
    #[error("duplicate ticket code")]
    DuplicateCode,

    #[error("{0} already exists")]
    Conflict(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

/// Result of the atomic sale write.
#[derive(Debug, Clone)]
pub enum SaleOutcome {
    /// The ticket row exists and the event counters include it.
    Issued { ticket: Ticket, event: Event },
    /// The conditional increment was refused; nothing was written.
    SoldOut {
        ticket_sold: i32,
        number_of_tickets: i32,
    },
    /// The event disappeared between lookup and sale.
    EventMissing,
}

#[derive(Debug, Clone)]
pub enum CheckInOutcome {
    CheckedIn(Ticket),
    AlreadyCheckedIn(Ticket),
    UnknownCode,
}

/// An event and the tickets removed with it.
#[derive(Debug, Clone)]
pub struct EventRemoval {
    pub event: Event,
    pub tickets: Vec<Ticket>,
}

/// Everything removed when a user account is deleted.
#[derive(Debug, Clone)]
pub struct UserRemoval {
    pub user: User,
    pub events: Vec<Event>,
    /// Tickets other customers held for the removed events.
    pub cancelled_tickets: Vec<Ticket>,
    /// Tickets the removed user held.
    pub own_tickets: Vec<Ticket>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `RepoError::Conflict` when the email is taken.
    async fn create_user(&self, user: User) -> Result<User, RepoError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, RepoError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    async fn update_user(&self, email: &str, update: UserUpdate)
        -> Result<Option<User>, RepoError>;
    async fn set_user_disabled(&self, email: &str, disabled: bool)
        -> Result<Option<User>, RepoError>;
    async fn list_users(&self, role: Option<UserRole>) -> Result<Vec<User>, RepoError>;
    async fn delete_user(&self, email: &str) -> Result<Option<UserRemoval>, RepoError>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create_event(&self, event: Event) -> Result<Event, RepoError>;
    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, RepoError>;
    /// Writes every editable column of `event` but never the sales counters.
    /// Returns `None` when the event is gone or its sold count exceeds the
    /// new capacity.
    async fn save_event_details(&self, event: &Event) -> Result<Option<Event>, RepoError>;
    /// Non-expired events matching the search, by date ascending.
    async fn search_events(&self, search: &EventSearch) -> Result<Vec<Event>, RepoError>;
    /// All events by date ascending.
    async fn list_events(&self) -> Result<Vec<Event>, RepoError>;
    async fn events_by_creator(
        &self,
        creator: Uuid,
        expired: Option<bool>,
    ) -> Result<Vec<Event>, RepoError>;
    /// Events whose date falls in `[from, to)`, by date ascending.
    async fn events_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, RepoError>;
    /// Removes the event and its tickets in one unit.
    async fn delete_event(&self, id: Uuid) -> Result<Option<EventRemoval>, RepoError>;
    /// Marks every non-expired event dated before `now` as expired.
    async fn expire_past_events(&self, now: DateTime<Utc>) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Settles the sale and stores the ticket as one atomic unit.
    ///
    /// The event's `ticket_sold` is increased by the ticket quantity and its
    /// `income` by `quantity * ticket_price` only if the new total stays within
    /// capacity; otherwise nothing is written and `SoldOut` is returned.
    async fn issue(&self, ticket: NewTicket) -> Result<SaleOutcome, RepoError>;
    async fn find_ticket(&self, id: Uuid) -> Result<Option<Ticket>, RepoError>;
    async fn find_ticket_by_payload(&self, payload: &str) -> Result<Option<Ticket>, RepoError>;
    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, RepoError>;
    async fn set_qr_image(
        &self,
        id: Uuid,
        image: Option<String>,
    ) -> Result<Option<Ticket>, RepoError>;
    async fn check_in(&self, ticket_code: &str) -> Result<CheckInOutcome, RepoError>;
}

#[async_trait]
pub trait TrafficRepository: Send + Sync {
    /// Atomically bumps the visit counter for `day`.
    async fn record_visit(&self, day: NaiveDate) -> Result<DailyTraffic, RepoError>;
    async fn traffic_on(&self, day: NaiveDate) -> Result<Option<DailyTraffic>, RepoError>;
}

/// A value that provides every repository.
pub trait Store: UserRepository + EventRepository + TicketRepository + TrafficRepository {}

impl<T> Store for T where T: UserRepository + EventRepository + TicketRepository + TrafficRepository
{}
