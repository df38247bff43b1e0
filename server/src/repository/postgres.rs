use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    DailyTraffic, Event, EventSearch, NewTicket, Ticket, TicketFilter, User, UserRole, UserUpdate,
};
use crate::repository::{
    CheckInOutcome, EventRemoval, EventRepository, RepoError, SaleOutcome, TicketRepository,
    TrafficRepository, UserRemoval, UserRepository,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// `%term%` for ILIKE with the pattern metacharacters escaped.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: User) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, display_name, email, role, phone_code, mobile_number, \
             picture, country, disabled, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
        )
        .bind(user.id)
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(user.role)
        .bind(&user.phone_code)
        .bind(&user.mobile_number)
        .bind(&user.picture)
        .bind(&user.country)
        .bind(user.disabled)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepoError::Conflict(format!("user '{}'", user.email))
            } else {
                RepoError::Database(e)
            }
        })
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_user(
        &self,
        email: &str,
        update: UserUpdate,
    ) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET \
             display_name = COALESCE($2, display_name), \
             role = COALESCE($3, role), \
             phone_code = COALESCE($4, phone_code), \
             mobile_number = COALESCE($5, mobile_number), \
             picture = COALESCE($6, picture), \
             country = COALESCE($7, country), \
             updated_at = NOW() \
             WHERE email = $1 RETURNING *",
        )
        .bind(email)
        .bind(update.display_name)
        .bind(update.role)
        .bind(update.phone_code)
        .bind(update.mobile_number)
        .bind(update.picture)
        .bind(update.country)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_user_disabled(
        &self,
        email: &str,
        disabled: bool,
    ) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET disabled = $2, updated_at = NOW() WHERE email = $1 RETURNING *",
        )
        .bind(email)
        .bind(disabled)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(&self, role: Option<UserRole>) -> Result<Vec<User>, RepoError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE ($1::user_role IS NULL OR role = $1) ORDER BY created_at",
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn delete_user(&self, email: &str) -> Result<Option<UserRemoval>, RepoError> {
        let mut tx = self.pool.begin().await?;

        let Some(user) =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 FOR UPDATE")
                .bind(email)
                .fetch_optional(&mut *tx)
                .await?
        else {
            return Ok(None);
        };

        let cancelled_tickets = sqlx::query_as::<_, Ticket>(
            "DELETE FROM tickets WHERE event_id IN (SELECT id FROM events WHERE created_by = $1) \
             RETURNING *",
        )
        .bind(user.id)
        .fetch_all(&mut *tx)
        .await?;

        let mut events =
            sqlx::query_as::<_, Event>("DELETE FROM events WHERE created_by = $1 RETURNING *")
                .bind(user.id)
                .fetch_all(&mut *tx)
                .await?;
        events.sort_by_key(|e| e.date);

        let own_tickets =
            sqlx::query_as::<_, Ticket>("DELETE FROM tickets WHERE user_id = $1 RETURNING *")
                .bind(user.id)
                .fetch_all(&mut *tx)
                .await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(UserRemoval {
            user,
            events,
            cancelled_tickets,
            own_tickets,
        }))
    }
}

#[async_trait]
impl EventRepository for PgStore {
    async fn create_event(&self, event: Event) -> Result<Event, RepoError> {
        let event = sqlx::query_as::<_, Event>(
            "INSERT INTO events (id, title, email, description, tag, ticket_sold, income, date, \
             time, ticket_price, number_of_tickets, disabled, address, city, pincode, country, \
             latitude, longitude, duration, created_by, expired, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, $21, $22) RETURNING *",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.email)
        .bind(&event.description)
        .bind(&event.tag)
        .bind(event.ticket_sold)
        .bind(event.income)
        .bind(event.date)
        .bind(&event.time)
        .bind(event.ticket_price)
        .bind(event.number_of_tickets)
        .bind(event.disabled)
        .bind(&event.location.address)
        .bind(&event.location.city)
        .bind(&event.location.pincode)
        .bind(&event.location.country)
        .bind(event.location.latitude)
        .bind(event.location.longitude)
        .bind(event.duration)
        .bind(event.created_by)
        .bind(event.expired)
        .bind(event.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(event)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, RepoError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn save_event_details(&self, event: &Event) -> Result<Option<Event>, RepoError> {
        let saved = sqlx::query_as::<_, Event>(
            "UPDATE events SET title = $2, description = $3, tag = $4, date = $5, time = $6, \
             ticket_price = $7, number_of_tickets = $8, address = $9, city = $10, \
             pincode = $11, country = $12, latitude = $13, longitude = $14, duration = $15, \
             disabled = $16, expired = $17 \
             WHERE id = $1 AND ticket_sold <= $8 RETURNING *",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.tag)
        .bind(event.date)
        .bind(&event.time)
        .bind(event.ticket_price)
        .bind(event.number_of_tickets)
        .bind(&event.location.address)
        .bind(&event.location.city)
        .bind(&event.location.pincode)
        .bind(&event.location.country)
        .bind(event.location.latitude)
        .bind(event.location.longitude)
        .bind(event.duration)
        .bind(event.disabled)
        .bind(event.expired)
        .fetch_optional(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn search_events(&self, search: &EventSearch) -> Result<Vec<Event>, RepoError> {
        let term = search
            .term
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(like_pattern);
        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE expired = FALSE \
             AND ($1::TEXT IS NULL OR title ILIKE $1 OR description ILIKE $1) \
             AND ($2::TIMESTAMPTZ IS NULL OR date >= $2) \
             AND ($3::TEXT IS NULL OR country = $3) \
             AND ($4::TEXT IS NULL OR city = $4) \
             AND ($5::TEXT IS NULL OR tag = $5) \
             ORDER BY date ASC",
        )
        .bind(term)
        .bind(search.date)
        .bind(&search.country)
        .bind(&search.city)
        .bind(&search.tag)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn list_events(&self) -> Result<Vec<Event>, RepoError> {
        let events = sqlx::query_as::<_, Event>("SELECT * FROM events ORDER BY date ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    async fn events_by_creator(
        &self,
        creator: Uuid,
        expired: Option<bool>,
    ) -> Result<Vec<Event>, RepoError> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE created_by = $1 \
             AND ($2::BOOLEAN IS NULL OR expired = $2) ORDER BY date ASC",
        )
        .bind(creator)
        .bind(expired)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn events_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, RepoError> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE date >= $1 AND date < $2 ORDER BY date ASC",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn delete_event(&self, id: Uuid) -> Result<Option<EventRemoval>, RepoError> {
        let mut tx = self.pool.begin().await?;

        let Some(event) =
            sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
        else {
            return Ok(None);
        };

        let tickets =
            sqlx::query_as::<_, Ticket>("DELETE FROM tickets WHERE event_id = $1 RETURNING *")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(EventRemoval { event, tickets }))
    }

    async fn expire_past_events(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let result =
            sqlx::query("UPDATE events SET expired = TRUE WHERE date < $1 AND expired = FALSE")
                .bind(now)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TicketRepository for PgStore {
    async fn issue(&self, ticket: NewTicket) -> Result<SaleOutcome, RepoError> {
        let mut tx = self.pool.begin().await?;

        // Conditional increment: the row lock taken here serialises
        // concurrent sales of the same event.
        let settled = sqlx::query_as::<_, Event>(
            "UPDATE events SET ticket_sold = ticket_sold + $2, \
             income = income + ticket_price * $2 \
             WHERE id = $1 AND ticket_sold::BIGINT + $2 <= number_of_tickets RETURNING *",
        )
        .bind(ticket.event_id)
        .bind(ticket.number_of_tickets)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(event) = settled else {
            tx.rollback().await?;
            let current = sqlx::query_as::<_, (i32, i32)>(
                "SELECT ticket_sold, number_of_tickets FROM events WHERE id = $1",
            )
            .bind(ticket.event_id)
            .fetch_optional(&self.pool)
            .await?;
            return Ok(match current {
                Some((ticket_sold, number_of_tickets)) => SaleOutcome::SoldOut {
                    ticket_sold,
                    number_of_tickets,
                },
                None => SaleOutcome::EventMissing,
            });
        };

        let stored = sqlx::query_as::<_, Ticket>(
            "INSERT INTO tickets (id, event_id, user_id, ticket_code, qr_payload, qr_image, \
             number_of_tickets, bought_country_code, checked_in, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE, $9) RETURNING *",
        )
        .bind(ticket.id)
        .bind(ticket.event_id)
        .bind(ticket.user_id)
        .bind(&ticket.ticket_code)
        .bind(&ticket.qr_payload)
        .bind(&ticket.qr_image)
        .bind(ticket.number_of_tickets)
        .bind(&ticket.bought_country_code)
        .bind(ticket.created_at)
        .fetch_one(&mut *tx)
        .await;

        // Dropping `tx` on the error path rolls the counter increment back.
        let stored = match stored {
            Ok(stored) => stored,
            Err(e) if is_unique_violation(&e) => return Err(RepoError::DuplicateCode),
            Err(e) => return Err(RepoError::Database(e)),
        };

        tx.commit().await?;
        Ok(SaleOutcome::Issued {
            ticket: stored,
            event,
        })
    }

    async fn find_ticket(&self, id: Uuid) -> Result<Option<Ticket>, RepoError> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn find_ticket_by_payload(&self, payload: &str) -> Result<Option<Ticket>, RepoError> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE qr_payload = $1")
            .bind(payload)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, RepoError> {
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT * FROM tickets WHERE \
             ($1::UUID[] IS NULL OR event_id = ANY($1)) \
             AND ($2::UUID IS NULL OR user_id = $2) \
             AND ($3::TIMESTAMPTZ IS NULL OR created_at >= $3) \
             AND ($4::TIMESTAMPTZ IS NULL OR created_at < $4) \
             ORDER BY created_at",
        )
        .bind(filter.event_ids.clone())
        .bind(filter.user_id)
        .bind(filter.created_from)
        .bind(filter.created_before)
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }

    async fn set_qr_image(
        &self,
        id: Uuid,
        image: Option<String>,
    ) -> Result<Option<Ticket>, RepoError> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "UPDATE tickets SET qr_image = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(image)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn check_in(&self, ticket_code: &str) -> Result<CheckInOutcome, RepoError> {
        let updated = sqlx::query_as::<_, Ticket>(
            "UPDATE tickets SET checked_in = TRUE \
             WHERE ticket_code = $1 AND checked_in = FALSE RETURNING *",
        )
        .bind(ticket_code)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(ticket) = updated {
            return Ok(CheckInOutcome::CheckedIn(ticket));
        }

        let existing = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE ticket_code = $1")
            .bind(ticket_code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match existing {
            Some(ticket) => CheckInOutcome::AlreadyCheckedIn(ticket),
            None => CheckInOutcome::UnknownCode,
        })
    }
}

#[async_trait]
impl TrafficRepository for PgStore {
    async fn record_visit(&self, day: NaiveDate) -> Result<DailyTraffic, RepoError> {
        let traffic = sqlx::query_as::<_, DailyTraffic>(
            "INSERT INTO site_traffic (date, traffic_count) VALUES ($1, 1) \
             ON CONFLICT (date) DO UPDATE SET traffic_count = site_traffic.traffic_count + 1 \
             RETURNING date, traffic_count",
        )
        .bind(day)
        .fetch_one(&self.pool)
        .await?;
        Ok(traffic)
    }

    async fn traffic_on(&self, day: NaiveDate) -> Result<Option<DailyTraffic>, RepoError> {
        let traffic = sqlx::query_as::<_, DailyTraffic>(
            "SELECT date, traffic_count FROM site_traffic WHERE date = $1",
        )
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;
        Ok(traffic)
    }
}
