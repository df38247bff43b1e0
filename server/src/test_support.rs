//! Fixtures shared by unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::mail::{Email, MailError, Mailer};
use crate::models::{Event, Location, User, UserRole, UserUpdate};
use crate::repository::{MemoryStore, RepoError, UserRemoval, UserRepository};
use crate::services::codes::{CodeError, EntropySource, QrEncoder};
use crate::services::{CodeGenerator, NotificationDispatcher};
use crate::state::AppState;

pub fn sample_user(email: &str) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        display_name: "Sample User".to_string(),
        email: email.to_string(),
        role: UserRole::Customer,
        phone_code: "GB".to_string(),
        mobile_number: None,
        picture: None,
        country: Some("GB".to_string()),
        disabled: false,
        created_at: now,
        updated_at: now,
    }
}

/// An event a week out priced at 25 with `sold` tickets already sold.
pub fn sample_event(created_by: Uuid, capacity: i32, sold: i32) -> Event {
    let price = Decimal::from(25);
    Event {
        id: Uuid::new_v4(),
        title: "Sample Event".to_string(),
        email: "organizer@example.com".to_string(),
        description: "An evening of live music".to_string(),
        tag: "music".to_string(),
        ticket_sold: sold,
        income: price * Decimal::from(sold),
        date: Utc::now() + Duration::days(7),
        time: "19:30".to_string(),
        ticket_price: price,
        number_of_tickets: capacity,
        disabled: false,
        location: Location {
            address: "1 High Street".to_string(),
            city: "London".to_string(),
            pincode: "E1 6AN".to_string(),
            country: "GB".to_string(),
            latitude: None,
            longitude: None,
        },
        duration: 120,
        created_by,
        expired: false,
        created_at: Utc::now(),
    }
}

/// Replays the given byte patterns, one per `fill`; the last one repeats.
pub struct FixedEntropy {
    draws: Mutex<Vec<Vec<u8>>>,
}

impl FixedEntropy {
    pub fn new(draws: Vec<Vec<u8>>) -> Self {
        let mut draws = draws;
        draws.reverse();
        Self {
            draws: Mutex::new(draws),
        }
    }
}

impl EntropySource for FixedEntropy {
    fn fill(&self, buf: &mut [u8]) {
        let mut draws = self.draws.lock().unwrap();
        let pattern = if draws.len() > 1 {
            draws.pop().unwrap()
        } else {
            draws[0].clone()
        };
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = pattern[i % pattern.len()];
        }
    }
}

pub struct FailingEncoder;

impl QrEncoder for FailingEncoder {
    fn encode(&self, _payload: &str) -> Result<String, CodeError> {
        Err(CodeError::Encode("encoder offline".to_string()))
    }
}

/// Records sent mail; fails the first `failures` sends.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
    failures: Mutex<u32>,
}

impl RecordingMailer {
    pub fn failing(failures: u32) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failures: Mutex::new(failures),
        }
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(MailError::Transport("connection refused".to_string()));
            }
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// State over an in-memory store with single-attempt, no-backoff delivery.
pub fn memory_state(store: Arc<MemoryStore>, mailer: Arc<RecordingMailer>) -> AppState {
    AppState::new(
        store,
        Arc::new(CodeGenerator::secure(16)),
        NotificationDispatcher::new(mailer, 1).with_backoff(StdDuration::ZERO),
        "GB",
    )
}

/// User lookups that always fail, as with a dropped database connection.
pub struct UnreachableUsers;

fn unreachable() -> RepoError {
    RepoError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl UserRepository for UnreachableUsers {
    async fn create_user(&self, _user: User) -> Result<User, RepoError> {
        Err(unreachable())
    }

    async fn find_user(&self, _id: Uuid) -> Result<Option<User>, RepoError> {
        Err(unreachable())
    }

    async fn find_user_by_email(&self, _email: &str) -> Result<Option<User>, RepoError> {
        Err(unreachable())
    }

    async fn update_user(
        &self,
        _email: &str,
        _update: UserUpdate,
    ) -> Result<Option<User>, RepoError> {
        Err(unreachable())
    }

    async fn set_user_disabled(
        &self,
        _email: &str,
        _disabled: bool,
    ) -> Result<Option<User>, RepoError> {
        Err(unreachable())
    }

    async fn list_users(&self, _role: Option<UserRole>) -> Result<Vec<User>, RepoError> {
        Err(unreachable())
    }

    async fn delete_user(&self, _email: &str) -> Result<Option<UserRemoval>, RepoError> {
        Err(unreachable())
    }
}
