use std::sync::Arc;

use crate::repository::{EventRepository, Store, TicketRepository, TrafficRepository, UserRepository};
use crate::services::{CodeGenerator, IssuanceService, NotificationDispatcher};

/// Shared handles passed to every handler and background job.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub events: Arc<dyn EventRepository>,
    pub tickets: Arc<dyn TicketRepository>,
    pub traffic: Arc<dyn TrafficRepository>,
    pub codes: Arc<CodeGenerator>,
    pub issuance: Arc<IssuanceService>,
    pub notifier: Arc<NotificationDispatcher>,
    pub default_country: String,
}

impl AppState {
    pub fn new<S: Store + 'static>(
        store: Arc<S>,
        codes: Arc<CodeGenerator>,
        notifier: NotificationDispatcher,
        default_country: impl Into<String>,
    ) -> Self {
        let default_country = default_country.into();
        let users: Arc<dyn UserRepository> = store.clone();
        let events: Arc<dyn EventRepository> = store.clone();
        let tickets: Arc<dyn TicketRepository> = store.clone();
        let traffic: Arc<dyn TrafficRepository> = store;

        let issuance = IssuanceService::new(
            users.clone(),
            events.clone(),
            tickets.clone(),
            codes.clone(),
            default_country.clone(),
        );

        Self {
            users,
            events,
            tickets,
            traffic,
            codes,
            issuance: Arc::new(issuance),
            notifier: Arc::new(notifier),
            default_country,
        }
    }
}
