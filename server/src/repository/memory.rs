use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    DailyTraffic, Event, EventSearch, NewTicket, Ticket, TicketFilter, User, UserRole, UserUpdate,
};
use crate::repository::{
    CheckInOutcome, EventRemoval, EventRepository, RepoError, SaleOutcome, TicketRepository,
    TrafficRepository, UserRemoval, UserRepository,
};

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    events: HashMap<Uuid, Event>,
    tickets: Vec<Ticket>,
    traffic: BTreeMap<NaiveDate, i64>,
}

impl MemoryState {
    fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|u| u.email == email)
    }

    fn user_by_email_mut(&mut self, email: &str) -> Option<&mut User> {
        self.users.values_mut().find(|u| u.email == email)
    }

    fn take_tickets(&mut self, keep: impl Fn(&Ticket) -> bool) -> Vec<Ticket> {
        let (kept, removed): (Vec<Ticket>, Vec<Ticket>) = std::mem::take(&mut self.tickets)
            .into_iter()
            .partition(|t| keep(t));
        self.tickets = kept;
        removed
    }
}

/// In-process store. Every operation runs under one lock, which gives the
/// same atomicity the Postgres transactions provide.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn sorted_by_date(mut events: Vec<Event>) -> Vec<Event> {
    events.sort_by_key(|e| e.date);
    events
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: User) -> Result<User, RepoError> {
        let mut state = self.state();
        if state.user_by_email(&user.email).is_some() {
            return Err(RepoError::Conflict(format!("user '{}'", user.email)));
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.state().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        Ok(self.state().user_by_email(email).cloned())
    }

    async fn update_user(
        &self,
        email: &str,
        update: UserUpdate,
    ) -> Result<Option<User>, RepoError> {
        let mut state = self.state();
        Ok(state.user_by_email_mut(email).map(|user| {
            user.apply(update);
            user.clone()
        }))
    }

    async fn set_user_disabled(
        &self,
        email: &str,
        disabled: bool,
    ) -> Result<Option<User>, RepoError> {
        let mut state = self.state();
        Ok(state.user_by_email_mut(email).map(|user| {
            user.disabled = disabled;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn list_users(&self, role: Option<UserRole>) -> Result<Vec<User>, RepoError> {
        let state = self.state();
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .cloned()
            .collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn delete_user(&self, email: &str) -> Result<Option<UserRemoval>, RepoError> {
        let mut state = self.state();
        let Some(user) = state.user_by_email(email).cloned() else {
            return Ok(None);
        };

        let events: Vec<Event> = state
            .events
            .values()
            .filter(|e| e.created_by == user.id)
            .cloned()
            .collect();
        let event_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();

        let cancelled_tickets = state.take_tickets(|t| !event_ids.contains(&t.event_id));
        for id in &event_ids {
            state.events.remove(id);
        }
        let own_tickets = state.take_tickets(|t| t.user_id != user.id);
        state.users.remove(&user.id);

        Ok(Some(UserRemoval {
            user,
            events: sorted_by_date(events),
            cancelled_tickets,
            own_tickets,
        }))
    }
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn create_event(&self, event: Event) -> Result<Event, RepoError> {
        self.state().events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, RepoError> {
        Ok(self.state().events.get(&id).cloned())
    }

    async fn save_event_details(&self, event: &Event) -> Result<Option<Event>, RepoError> {
        let mut state = self.state();
        let Some(stored) = state.events.get_mut(&event.id) else {
            return Ok(None);
        };
        if stored.ticket_sold > event.number_of_tickets {
            return Ok(None);
        }
        // Counters stay whatever the store currently holds.
        let ticket_sold = stored.ticket_sold;
        let income = stored.income;
        *stored = Event {
            ticket_sold,
            income,
            ..event.clone()
        };
        Ok(Some(stored.clone()))
    }

    async fn search_events(&self, search: &EventSearch) -> Result<Vec<Event>, RepoError> {
        let state = self.state();
        let events = state
            .events
            .values()
            .filter(|e| search.matches(e))
            .cloned()
            .collect();
        Ok(sorted_by_date(events))
    }

    async fn list_events(&self) -> Result<Vec<Event>, RepoError> {
        Ok(sorted_by_date(self.state().events.values().cloned().collect()))
    }

    async fn events_by_creator(
        &self,
        creator: Uuid,
        expired: Option<bool>,
    ) -> Result<Vec<Event>, RepoError> {
        let state = self.state();
        let events = state
            .events
            .values()
            .filter(|e| e.created_by == creator && expired.map_or(true, |x| e.expired == x))
            .cloned()
            .collect();
        Ok(sorted_by_date(events))
    }

    async fn events_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, RepoError> {
        let state = self.state();
        let events = state
            .events
            .values()
            .filter(|e| e.date >= from && e.date < to)
            .cloned()
            .collect();
        Ok(sorted_by_date(events))
    }

    async fn delete_event(&self, id: Uuid) -> Result<Option<EventRemoval>, RepoError> {
        let mut state = self.state();
        let Some(event) = state.events.remove(&id) else {
            return Ok(None);
        };
        let tickets = state.take_tickets(|t| t.event_id != id);
        Ok(Some(EventRemoval { event, tickets }))
    }

    async fn expire_past_events(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let mut state = self.state();
        let mut expired = 0;
        for event in state.events.values_mut() {
            if event.date < now && !event.expired {
                event.expired = true;
                expired += 1;
            }
        }
        Ok(expired)
    }
}

#[async_trait]
impl TicketRepository for MemoryStore {
    async fn issue(&self, ticket: NewTicket) -> Result<SaleOutcome, RepoError> {
        let mut state = self.state();

        if state
            .tickets
            .iter()
            .any(|t| t.ticket_code == ticket.ticket_code || t.qr_payload == ticket.qr_payload)
        {
            return Err(RepoError::DuplicateCode);
        }

        let Some(event) = state.events.get_mut(&ticket.event_id) else {
            return Ok(SaleOutcome::EventMissing);
        };
        let attempted = i64::from(event.ticket_sold) + i64::from(ticket.number_of_tickets);
        if attempted > i64::from(event.number_of_tickets) {
            return Ok(SaleOutcome::SoldOut {
                ticket_sold: event.ticket_sold,
                number_of_tickets: event.number_of_tickets,
            });
        }
        event.ticket_sold += ticket.number_of_tickets;
        event.income += event.ticket_price * Decimal::from(ticket.number_of_tickets);
        let event = event.clone();

        let ticket = Ticket::from(ticket);
        state.tickets.push(ticket.clone());
        Ok(SaleOutcome::Issued { ticket, event })
    }

    async fn find_ticket(&self, id: Uuid) -> Result<Option<Ticket>, RepoError> {
        Ok(self.state().tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn find_ticket_by_payload(&self, payload: &str) -> Result<Option<Ticket>, RepoError> {
        Ok(self
            .state()
            .tickets
            .iter()
            .find(|t| t.qr_payload == payload)
            .cloned())
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, RepoError> {
        Ok(self
            .state()
            .tickets
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn set_qr_image(
        &self,
        id: Uuid,
        image: Option<String>,
    ) -> Result<Option<Ticket>, RepoError> {
        let mut state = self.state();
        Ok(state.tickets.iter_mut().find(|t| t.id == id).map(|t| {
            t.qr_image = image;
            t.clone()
        }))
    }

    async fn check_in(&self, ticket_code: &str) -> Result<CheckInOutcome, RepoError> {
        let mut state = self.state();
        let outcome = match state.tickets.iter_mut().find(|t| t.ticket_code == ticket_code) {
            None => CheckInOutcome::UnknownCode,
            Some(t) if t.checked_in => CheckInOutcome::AlreadyCheckedIn(t.clone()),
            Some(t) => {
                t.checked_in = true;
                CheckInOutcome::CheckedIn(t.clone())
            }
        };
        Ok(outcome)
    }
}

#[async_trait]
impl TrafficRepository for MemoryStore {
    async fn record_visit(&self, day: NaiveDate) -> Result<DailyTraffic, RepoError> {
        let mut state = self.state();
        let count = state.traffic.entry(day).or_insert(0);
        *count += 1;
        Ok(DailyTraffic {
            date: day,
            traffic_count: *count,
        })
    }

    async fn traffic_on(&self, day: NaiveDate) -> Result<Option<DailyTraffic>, RepoError> {
        Ok(self.state().traffic.get(&day).map(|count| DailyTraffic {
            date: day,
            traffic_count: *count,
        }))
    }
}
