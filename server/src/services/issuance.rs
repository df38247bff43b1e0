//! Ticket issuance.
//!
//! One request runs `Validating -> CheckingCapacity -> Generating ->
//! Persisting/Settling -> Done`. Persisting the ticket and settling the
//! event counters are a single repository call (`TicketRepository::issue`)
//! that re-checks capacity atomically, so a request that passed the early
//! capacity check can still lose a race and come back sold out.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Event, IssueTicketRequest, NewTicket, Ticket};
use crate::repository::{
    EventRepository, RepoError, SaleOutcome, TicketRepository, UserRepository,
};
use crate::services::availability::{self, Availability, QuantityError};
use crate::services::codes::CodeGenerator;

/// A collision is regenerated once; a second collision is fatal.
const MAX_CODE_ATTEMPTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceStage {
    Validating,
    CheckingCapacity,
    Generating,
    Persisting,
    Settling,
    Done,
}

impl fmt::Display for IssuanceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IssuanceStage::Validating => "validating",
            IssuanceStage::CheckingCapacity => "checking_capacity",
            IssuanceStage::Generating => "generating",
            IssuanceStage::Persisting => "persisting",
            IssuanceStage::Settling => "settling",
            IssuanceStage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum IssuanceError {
    #[error(transparent)]
    InvalidQuantity(#[from] QuantityError),

    #[error("User does not exist")]
    UserNotFound(Uuid),

    #[error("User account is disabled")]
    UserDisabled(Uuid),

    #[error("Event does not exist")]
    EventNotFound(Uuid),

    #[error("Event is sold out")]
    SoldOut {
        attempted_total: i64,
        ticket_sold: i32,
        number_of_tickets: i32,
    },

    #[error("ticket code collided on every attempt")]
    DuplicateCode,

    #[error("storage failure while {stage}")]
    Repository {
        stage: IssuanceStage,
        #[source]
        source: RepoError,
    },
}

impl IssuanceError {
    fn storage(stage: IssuanceStage) -> impl FnOnce(RepoError) -> Self {
        move |source| IssuanceError::Repository { stage, source }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedTicket {
    pub ticket: Ticket,
    pub event: Event,
}

pub struct IssuanceService {
    users: Arc<dyn UserRepository>,
    events: Arc<dyn EventRepository>,
    tickets: Arc<dyn TicketRepository>,
    codes: Arc<CodeGenerator>,
    default_country: String,
}

impl IssuanceService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        events: Arc<dyn EventRepository>,
        tickets: Arc<dyn TicketRepository>,
        codes: Arc<CodeGenerator>,
        default_country: impl Into<String>,
    ) -> Self {
        Self {
            users,
            events,
            tickets,
            codes,
            default_country: default_country.into(),
        }
    }

    #[tracing::instrument(
        skip(self),
        fields(event_id = %request.event_id, user_id = %request.user_id, quantity = request.quantity)
    )]
    pub async fn issue(&self, request: IssueTicketRequest) -> Result<IssuedTicket, IssuanceError> {
        let quantity = request.quantity;

        debug!(stage = %IssuanceStage::Validating, "Issuance stage");
        availability::validate_quantity(quantity)?;
        let user = self
            .users
            .find_user(request.user_id)
            .await
            .map_err(IssuanceError::storage(IssuanceStage::Validating))?
            .ok_or(IssuanceError::UserNotFound(request.user_id))?;
        if user.disabled {
            info!(user_id = %user.id, "Purchase declined: account disabled");
            return Err(IssuanceError::UserDisabled(user.id));
        }
        let event = self
            .events
            .find_event(request.event_id)
            .await
            .map_err(IssuanceError::storage(IssuanceStage::Validating))?
            .ok_or(IssuanceError::EventNotFound(request.event_id))?;

        debug!(stage = %IssuanceStage::CheckingCapacity, "Issuance stage");
        if let Availability::SoldOut { attempted_total } =
            availability::check(event.ticket_sold, event.number_of_tickets, quantity)?
        {
            info!(attempted_total, capacity = event.number_of_tickets, "Purchase declined: sold out");
            return Err(IssuanceError::SoldOut {
                attempted_total,
                ticket_sold: event.ticket_sold,
                number_of_tickets: event.number_of_tickets,
            });
        }

        let country = user
            .country
            .clone()
            .unwrap_or_else(|| self.default_country.clone());

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            debug!(stage = %IssuanceStage::Generating, attempt, "Issuance stage");
            let codes = self.codes.generate(event.id, user.id);
            let new_ticket = NewTicket {
                id: Uuid::new_v4(),
                event_id: event.id,
                user_id: user.id,
                ticket_code: codes.ticket_code,
                qr_payload: codes.qr_payload,
                qr_image: codes.qr_image.into_option(),
                number_of_tickets: quantity,
                bought_country_code: country.clone(),
                created_at: Utc::now(),
            };

            debug!(stage = %IssuanceStage::Persisting, "Issuance stage");
            match self.tickets.issue(new_ticket).await {
                Ok(SaleOutcome::Issued { ticket, event }) => {
                    debug!(stage = %IssuanceStage::Settling, ticket_sold = event.ticket_sold, "Issuance stage");
                    info!(ticket_id = %ticket.id, stage = %IssuanceStage::Done, "Ticket issued");
                    return Ok(IssuedTicket { ticket, event });
                }
                Ok(SaleOutcome::SoldOut {
                    ticket_sold,
                    number_of_tickets,
                }) => {
                    let attempted_total = i64::from(ticket_sold) + i64::from(quantity);
                    info!(attempted_total, capacity = number_of_tickets, "Purchase declined: sold out at settlement");
                    return Err(IssuanceError::SoldOut {
                        attempted_total,
                        ticket_sold,
                        number_of_tickets,
                    });
                }
                Ok(SaleOutcome::EventMissing) => {
                    return Err(IssuanceError::EventNotFound(event.id));
                }
                Err(RepoError::DuplicateCode) if attempt < MAX_CODE_ATTEMPTS => {
                    warn!(attempt, "Ticket code collision; regenerating");
                }
                Err(RepoError::DuplicateCode) => return Err(IssuanceError::DuplicateCode),
                Err(e) => return Err(IssuanceError::storage(IssuanceStage::Persisting)(e)),
            }
        }

        Err(IssuanceError::DuplicateCode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TicketFilter;
    use crate::repository::MemoryStore;
    use crate::services::codes::{SvgQrEncoder, DEFAULT_CODE_LENGTH};
    use crate::test_support::{sample_event, sample_user, FailingEncoder, FixedEntropy};
    use rust_decimal::Decimal;

    struct Fixture {
        store: Arc<MemoryStore>,
        service: IssuanceService,
        user_id: Uuid,
        event_id: Uuid,
    }

    async fn fixture(capacity: i32, sold: i32, codes: CodeGenerator) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let user = store.create_user(sample_user("buyer@example.com")).await.unwrap();
        let event = store
            .create_event(sample_event(user.id, capacity, sold))
            .await
            .unwrap();
        let service = IssuanceService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(codes),
            "GB",
        );
        Fixture {
            store,
            service,
            user_id: user.id,
            event_id: event.id,
        }
    }

    fn request(f: &Fixture, quantity: i32) -> IssueTicketRequest {
        IssueTicketRequest {
            event_id: f.event_id,
            user_id: f.user_id,
            quantity,
        }
    }

    async fn ticket_count(store: &MemoryStore) -> usize {
        store.list_tickets(&TicketFilter::default()).await.unwrap().len()
    }

    #[tokio::test]
    async fn test_filling_remaining_capacity_succeeds() {
        let f = fixture(10, 8, CodeGenerator::secure(DEFAULT_CODE_LENGTH)).await;

        let issued = f.service.issue(request(&f, 2)).await.unwrap();
        assert_eq!(issued.event.ticket_sold, 10);
        assert_eq!(issued.ticket.number_of_tickets, 2);
        assert_eq!(issued.ticket.bought_country_code, "GB");

        let event = f.store.find_event(f.event_id).await.unwrap().unwrap();
        assert_eq!(event.ticket_sold, 10);
        // sample_event starts with income = sold * price (8 * 25)
        assert_eq!(event.income, Decimal::from(200 + 2 * 25));
    }

    #[tokio::test]
    async fn test_one_over_capacity_is_declined_without_writes() {
        let f = fixture(10, 8, CodeGenerator::secure(DEFAULT_CODE_LENGTH)).await;

        let err = f.service.issue(request(&f, 3)).await.unwrap_err();
        assert!(matches!(
            err,
            IssuanceError::SoldOut {
                attempted_total: 11,
                ticket_sold: 8,
                number_of_tickets: 10
            }
        ));
        let event = f.store.find_event(f.event_id).await.unwrap().unwrap();
        assert_eq!(event.ticket_sold, 8);
        assert_eq!(ticket_count(&f.store).await, 0);
    }

    #[tokio::test]
    async fn test_disabled_user_is_declined_without_writes() {
        let f = fixture(10, 0, CodeGenerator::secure(DEFAULT_CODE_LENGTH)).await;
        f.store
            .set_user_disabled("buyer@example.com", true)
            .await
            .unwrap()
            .unwrap();

        let err = f.service.issue(request(&f, 1)).await.unwrap_err();
        assert!(matches!(err, IssuanceError::UserDisabled(id) if id == f.user_id));
        let event = f.store.find_event(f.event_id).await.unwrap().unwrap();
        assert_eq!(event.ticket_sold, 0);
        assert_eq!(ticket_count(&f.store).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_user_is_declined() {
        let f = fixture(10, 0, CodeGenerator::secure(DEFAULT_CODE_LENGTH)).await;
        let missing = Uuid::new_v4();

        let err = f
            .service
            .issue(IssueTicketRequest {
                event_id: f.event_id,
                user_id: missing,
                quantity: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IssuanceError::UserNotFound(id) if id == missing));
        assert_eq!(ticket_count(&f.store).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_event_is_declined() {
        let f = fixture(10, 0, CodeGenerator::secure(DEFAULT_CODE_LENGTH)).await;

        let err = f
            .service
            .issue(IssueTicketRequest {
                event_id: Uuid::new_v4(),
                user_id: f.user_id,
                quantity: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IssuanceError::EventNotFound(_)));
    }

    #[tokio::test]
    async fn test_non_positive_quantity_is_a_validation_error() {
        let f = fixture(10, 0, CodeGenerator::secure(DEFAULT_CODE_LENGTH)).await;

        let err = f.service.issue(request(&f, 0)).await.unwrap_err();
        assert!(matches!(err, IssuanceError::InvalidQuantity(_)));
    }

    #[tokio::test]
    async fn test_encoder_failure_still_issues_ticket() {
        let codes = CodeGenerator::new(
            Arc::new(crate::services::codes::OsEntropy),
            Arc::new(FailingEncoder),
            DEFAULT_CODE_LENGTH,
        );
        let f = fixture(10, 0, codes).await;

        let issued = f.service.issue(request(&f, 1)).await.unwrap();
        assert!(issued.ticket.qr_image.is_none());
        assert!(!issued.ticket.qr_payload.is_empty());
    }

    #[tokio::test]
    async fn test_code_collision_is_retried_once() {
        // First two draws are identical, the third differs.
        let entropy = FixedEntropy::new(vec![vec![1; 8], vec![1; 8], vec![2; 8]]);
        let codes = CodeGenerator::new(Arc::new(entropy), Arc::new(SvgQrEncoder), 16);
        let f = fixture(10, 0, codes).await;

        f.service.issue(request(&f, 1)).await.unwrap();
        let second = f.service.issue(request(&f, 1)).await.unwrap();
        assert!(second.ticket.ticket_code.starts_with("0202"));
        assert_eq!(ticket_count(&f.store).await, 2);
    }

    #[tokio::test]
    async fn test_repeated_collision_is_fatal() {
        let entropy = FixedEntropy::new(vec![vec![7; 8]]);
        let codes = CodeGenerator::new(Arc::new(entropy), Arc::new(SvgQrEncoder), 16);
        let f = fixture(10, 0, codes).await;

        f.service.issue(request(&f, 1)).await.unwrap();
        let err = f.service.issue(request(&f, 1)).await.unwrap_err();
        assert!(matches!(err, IssuanceError::DuplicateCode));

        let event = f.store.find_event(f.event_id).await.unwrap().unwrap();
        assert_eq!(event.ticket_sold, 1);
    }

    #[tokio::test]
    async fn test_concurrent_purchases_never_oversell() {
        let f = fixture(10, 0, CodeGenerator::secure(DEFAULT_CODE_LENGTH)).await;
        let service = Arc::new(f.service);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let service = service.clone();
                let req = IssueTicketRequest {
                    event_id: f.event_id,
                    user_id: f.user_id,
                    quantity: 6,
                };
                tokio::spawn(async move { service.issue(req).await })
            })
            .collect();

        let mut succeeded = 0;
        let mut sold_out = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(IssuanceError::SoldOut { .. }) => sold_out += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!((succeeded, sold_out), (1, 1));

        let event = f.store.find_event(f.event_id).await.unwrap().unwrap();
        assert_eq!(event.ticket_sold, 6);
    }
}
