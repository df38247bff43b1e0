//! Dashboard aggregates over events, tickets, users and traffic.
//!
//! Percentages are floored and reported as 0 when the base is zero.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Timelike, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Event, Ticket, TicketFilter, User};
use crate::repository::RepoError;
use crate::state::AppState;
use crate::utils::time::start_of_day;

const HOURLY_SERIES_ID: &str = "Tickets Sold";
const HOURLY_SERIES_COLOUR: &str = "hsl(348, 70%, 50%)";

/// `floor(100 * part / base)`.
pub fn share_of(part: i64, base: i64) -> i64 {
    if base == 0 {
        return 0;
    }
    (part * 100).div_euclid(base)
}

/// `floor(100 * (current - previous) / previous)`.
pub fn percentage_change(current: i64, previous: i64) -> i64 {
    share_of(current - previous, previous)
}

pub fn decimal_share_of(part: Decimal, base: Decimal) -> i64 {
    if base.is_zero() {
        return 0;
    }
    (part * Decimal::ONE_HUNDRED / base)
        .floor()
        .to_i64()
        .unwrap_or(0)
}

pub fn decimal_percentage_change(current: Decimal, previous: Decimal) -> i64 {
    decimal_share_of(current - previous, previous)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub price: Decimal,
    pub tickets_sold: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySales {
    pub category: String,
    pub ticket_sales: i64,
    pub total_income_by_category: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSales {
    pub ticket_price: Decimal,
    pub total_ticket_sales: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryTickets {
    pub country: String,
    pub total_tickets: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: String,
    pub total_events: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourPoint {
    pub x: String,
    pub y: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlySeries {
    pub id: &'static str,
    pub color: &'static str,
    pub data: Vec<HourPoint>,
}

pub fn event_popularity(events: &[Event]) -> Vec<PricePoint> {
    events
        .iter()
        .map(|e| PricePoint {
            price: e.ticket_price,
            tickets_sold: e.ticket_sold,
        })
        .collect()
}

/// Per-tag sales, highest income first.
pub fn sales_by_category(events: &[Event]) -> Vec<CategorySales> {
    let mut by_tag: BTreeMap<&str, (i64, Decimal)> = BTreeMap::new();
    for event in events {
        let entry = by_tag.entry(event.tag.as_str()).or_default();
        entry.0 += i64::from(event.ticket_sold);
        entry.1 += event.income;
    }
    let mut sales: Vec<CategorySales> = by_tag
        .into_iter()
        .map(|(category, (ticket_sales, income))| CategorySales {
            category: category.to_string(),
            ticket_sales,
            total_income_by_category: income,
        })
        .collect();
    sales.sort_by(|a, b| b.total_income_by_category.cmp(&a.total_income_by_category));
    sales
}

pub fn sales_by_ticket_price(events: &[Event]) -> Vec<PriceSales> {
    let mut by_price: BTreeMap<Decimal, i64> = BTreeMap::new();
    for event in events {
        *by_price.entry(event.ticket_price.normalize()).or_default() +=
            i64::from(event.ticket_sold);
    }
    by_price
        .into_iter()
        .map(|(ticket_price, total_ticket_sales)| PriceSales {
            ticket_price,
            total_ticket_sales,
        })
        .collect()
}

pub fn tickets_by_country(tickets: &[Ticket]) -> Vec<CountryTickets> {
    let mut by_country: BTreeMap<&str, i64> = BTreeMap::new();
    for ticket in tickets {
        *by_country
            .entry(ticket.bought_country_code.as_str())
            .or_default() += i64::from(ticket.number_of_tickets);
    }
    by_country
        .into_iter()
        .map(|(country, total_tickets)| CountryTickets {
            country: country.to_string(),
            total_tickets,
        })
        .collect()
}

pub fn event_breakdown(events: &[Event]) -> Vec<CategoryCount> {
    let mut by_tag: BTreeMap<&str, i64> = BTreeMap::new();
    for event in events {
        *by_tag.entry(event.tag.as_str()).or_default() += 1;
    }
    by_tag
        .into_iter()
        .map(|(category, total_events)| CategoryCount {
            category: category.to_string(),
            total_events,
        })
        .collect()
}

/// Tickets sold per hour of the current UTC day, `00:00` through the
/// current hour.
pub fn hourly_sales(tickets: &[Ticket], now: DateTime<Utc>) -> HourlySeries {
    let today = start_of_day(now);
    let current_hour = now.hour();
    let mut data: Vec<HourPoint> = (0..=current_hour)
        .map(|hour| HourPoint {
            x: format!("{hour:02}:00"),
            y: 0,
        })
        .collect();

    for ticket in tickets {
        if ticket.created_at < today || ticket.created_at > now {
            continue;
        }
        if let Some(point) = data.get_mut(ticket.created_at.hour() as usize) {
            point.y += i64::from(ticket.number_of_tickets);
        }
    }

    HourlySeries {
        id: HOURLY_SERIES_ID,
        color: HOURLY_SERIES_COLOUR,
        data,
    }
}

fn count_between(
    times: impl Iterator<Item = DateTime<Utc>>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> i64 {
    times.filter(|t| *t >= from && *t < to).count() as i64
}

fn quantity(tickets: &[&Ticket]) -> i64 {
    tickets
        .iter()
        .map(|t| i64::from(t.number_of_tickets))
        .sum()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyDashboard {
    pub new_users: i64,
    pub tickets_bought: i64,
    pub new_users_change: i64,
    pub tickets_bought_change: i64,
}

pub async fn daily_dashboard(
    state: &AppState,
    now: DateTime<Utc>,
) -> Result<DailyDashboard, RepoError> {
    let today = start_of_day(now);
    let yesterday = today - Duration::days(1);
    let tomorrow = today + Duration::days(1);

    let users = state.users.list_users(None).await?;
    let tickets = state
        .tickets
        .list_tickets(&TicketFilter {
            created_from: Some(yesterday),
            ..TicketFilter::default()
        })
        .await?;

    let new_users = count_between(users.iter().map(|u| u.created_at), today, tomorrow);
    let users_yesterday = count_between(users.iter().map(|u| u.created_at), yesterday, today);
    let tickets_bought = count_between(tickets.iter().map(|t| t.created_at), today, tomorrow);
    let tickets_yesterday = count_between(tickets.iter().map(|t| t.created_at), yesterday, today);

    Ok(DailyDashboard {
        new_users,
        tickets_bought,
        new_users_change: new_users - users_yesterday,
        tickets_bought_change: tickets_bought - tickets_yesterday,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Revenue {
    pub total_income: Decimal,
    pub percentage_change: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersData {
    pub total_users: i64,
    pub users_percentage_change: i64,
    pub today_users: i64,
    pub original_users: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketData {
    pub total_tickets: i64,
    pub ticket_percentage_change: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficData {
    pub today_traffic: i64,
    pub traffic_percentage_change: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverview {
    pub revenue: Revenue,
    pub users_data: UsersData,
    pub ticket_data: TicketData,
    pub traffic_data: TrafficData,
    pub sales_by_event_category: Vec<CategorySales>,
    pub sales_by_ticket_price: Vec<PriceSales>,
    pub ticket_sales_by_hour: Vec<HourlySeries>,
    pub tickets_by_country: Vec<CountryTickets>,
}

pub async fn admin_overview(
    state: &AppState,
    now: DateTime<Utc>,
) -> Result<AdminOverview, RepoError> {
    let today = start_of_day(now);
    let yesterday = today - Duration::days(1);

    let events = state.events.list_events().await?;
    let users = state.users.list_users(None).await?;
    let tickets = state.tickets.list_tickets(&TicketFilter::default()).await?;
    let traffic_today = state.traffic.traffic_on(today.date_naive()).await?;
    let traffic_yesterday = state.traffic.traffic_on(yesterday.date_naive()).await?;

    let total_income: Decimal = events.iter().map(|e| e.income).sum();
    let income_before_today: Decimal = events
        .iter()
        .filter(|e| e.created_at < today)
        .map(|e| e.income)
        .sum();
    let income_today = total_income - income_before_today;

    let total_users = users.len() as i64;
    let original_users = users.iter().filter(|u| u.created_at < today).count() as i64;
    let today_users = total_users - original_users;

    let total_tickets = tickets.len() as i64;
    let original_tickets = tickets.iter().filter(|t| t.created_at < today).count() as i64;
    let today_tickets = total_tickets - original_tickets;

    let today_traffic = traffic_today.map_or(0, |t| t.traffic_count);
    let original_traffic = traffic_yesterday.map_or(0, |t| t.traffic_count);

    Ok(AdminOverview {
        revenue: Revenue {
            total_income,
            percentage_change: decimal_share_of(income_today, income_before_today),
        },
        users_data: UsersData {
            total_users,
            users_percentage_change: share_of(today_users, original_users),
            today_users,
            original_users,
        },
        ticket_data: TicketData {
            total_tickets,
            ticket_percentage_change: share_of(today_tickets, original_tickets),
        },
        traffic_data: TrafficData {
            today_traffic,
            traffic_percentage_change: percentage_change(today_traffic, original_traffic),
        },
        sales_by_event_category: sales_by_category(&events),
        sales_by_ticket_price: sales_by_ticket_price(&events),
        ticket_sales_by_hour: vec![hourly_sales(&tickets, now)],
        tickets_by_country: tickets_by_country(&tickets),
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopEvent {
    pub id: Uuid,
    pub title: String,
    pub income: Decimal,
    pub ticket_sold: i32,
    pub tag: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerRevenue {
    pub total_income: Decimal,
    pub revenue_percentage: i64,
    pub total_revenue_yesterday: Decimal,
    pub total_revenue_today: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketsPurchased {
    pub total_tickets_purchased: i64,
    pub total_tickets_sold_yesterday: i64,
    pub total_tickets_sold_today: i64,
    pub tickets_sold_percentage: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsCreated {
    pub total_events: i64,
    pub events_created_yesterday: i64,
    pub events_created_today: i64,
    pub event_difference_percentage: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerOverview {
    pub top_event: Option<TopEvent>,
    pub sales_by_event_category: Vec<CategorySales>,
    pub revenue: OrganizerRevenue,
    pub event_breakdown: Vec<CategoryCount>,
    pub tickets_purchased: TicketsPurchased,
    pub total_event_created: EventsCreated,
    pub tickets_by_country: Vec<CountryTickets>,
}

pub async fn organizer_overview(
    state: &AppState,
    organizer: &User,
    now: DateTime<Utc>,
) -> Result<OrganizerOverview, RepoError> {
    let today = start_of_day(now);
    let yesterday = today - Duration::days(1);
    let tomorrow = today + Duration::days(1);

    let events = state.events.events_by_creator(organizer.id, None).await?;
    let event_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
    let tickets = state
        .tickets
        .list_tickets(&TicketFilter {
            event_ids: Some(event_ids),
            ..TicketFilter::default()
        })
        .await?;

    let prices: HashMap<Uuid, Decimal> = events.iter().map(|e| (e.id, e.ticket_price)).collect();
    let revenue_of = |tickets: &[&Ticket]| -> Decimal {
        tickets
            .iter()
            .map(|t| {
                prices.get(&t.event_id).copied().unwrap_or_default()
                    * Decimal::from(t.number_of_tickets)
            })
            .sum()
    };

    let sold_yesterday: Vec<&Ticket> = tickets
        .iter()
        .filter(|t| t.created_at >= yesterday && t.created_at < today)
        .collect();
    let sold_today: Vec<&Ticket> = tickets
        .iter()
        .filter(|t| t.created_at >= today && t.created_at < tomorrow)
        .collect();

    let total_revenue_yesterday = revenue_of(&sold_yesterday);
    let total_revenue_today = revenue_of(&sold_today);
    let total_tickets_sold_yesterday = quantity(&sold_yesterday);
    let total_tickets_sold_today = quantity(&sold_today);

    let events_created_yesterday =
        count_between(events.iter().map(|e| e.created_at), yesterday, today);
    let events_created_today = count_between(events.iter().map(|e| e.created_at), today, tomorrow);

    let top_event = events
        .iter()
        .max_by(|a, b| a.income.cmp(&b.income))
        .map(|e| TopEvent {
            id: e.id,
            title: e.title.clone(),
            income: e.income,
            ticket_sold: e.ticket_sold,
            tag: e.tag.clone(),
        });

    Ok(OrganizerOverview {
        top_event,
        sales_by_event_category: sales_by_category(&events),
        revenue: OrganizerRevenue {
            total_income: events.iter().map(|e| e.income).sum(),
            revenue_percentage: decimal_percentage_change(
                total_revenue_today,
                total_revenue_yesterday,
            ),
            total_revenue_yesterday,
            total_revenue_today,
        },
        event_breakdown: event_breakdown(&events),
        tickets_purchased: TicketsPurchased {
            total_tickets_purchased: events.iter().map(|e| i64::from(e.ticket_sold)).sum(),
            total_tickets_sold_yesterday,
            total_tickets_sold_today,
            tickets_sold_percentage: percentage_change(
                total_tickets_sold_today,
                total_tickets_sold_yesterday,
            ),
        },
        total_event_created: EventsCreated {
            total_events: events.len() as i64,
            events_created_yesterday,
            events_created_today,
            event_difference_percentage: percentage_change(
                events_created_today,
                events_created_yesterday,
            ),
        },
        tickets_by_country: tickets_by_country(&tickets),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::models::NewTicket;
    use crate::repository::{
        EventRepository, MemoryStore, SaleOutcome, TicketRepository, UserRepository,
    };
    use crate::test_support::{memory_state, sample_event, sample_user, RecordingMailer};
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    async fn user_at(store: &MemoryStore, email: &str, created_at: DateTime<Utc>) -> User {
        let mut user = sample_user(email);
        user.created_at = created_at;
        store.create_user(user).await.unwrap()
    }

    async fn event_at(
        store: &MemoryStore,
        organizer: &User,
        tag: &str,
        price: i64,
        created_at: DateTime<Utc>,
    ) -> Event {
        let mut event = sample_event(organizer.id, 100, 0);
        event.tag = tag.to_string();
        event.ticket_price = Decimal::from(price);
        event.created_at = created_at;
        store.create_event(event).await.unwrap()
    }

    async fn sell(
        store: &MemoryStore,
        event: &Event,
        buyer: &User,
        created_at: DateTime<Utc>,
        quantity: i32,
        country: &str,
    ) {
        let code = Uuid::new_v4().to_string();
        let outcome = store
            .issue(NewTicket {
                id: Uuid::new_v4(),
                event_id: event.id,
                user_id: buyer.id,
                qr_payload: format!("{}-{}-{code}", event.id, buyer.id),
                ticket_code: code,
                qr_image: None,
                number_of_tickets: quantity,
                bought_country_code: country.to_string(),
                created_at,
            })
            .await
            .unwrap();
        assert!(matches!(outcome, SaleOutcome::Issued { .. }));
    }

    fn ticket_at(created_at: DateTime<Utc>, quantity: i32, country: &str) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            ticket_code: Uuid::new_v4().to_string(),
            qr_payload: Uuid::new_v4().to_string(),
            qr_image: None,
            number_of_tickets: quantity,
            bought_country_code: country.to_string(),
            checked_in: false,
            created_at,
        }
    }

    #[test]
    fn test_percentages_with_zero_base_are_zero() {
        assert_eq!(share_of(5, 0), 0);
        assert_eq!(percentage_change(5, 0), 0);
        assert_eq!(decimal_share_of(Decimal::from(5), Decimal::ZERO), 0);
    }

    #[test]
    fn test_percentages_are_floored() {
        assert_eq!(share_of(1, 3), 33);
        assert_eq!(percentage_change(2, 3), -34);
        assert_eq!(percentage_change(6, 4), 50);
        assert_eq!(
            decimal_percentage_change(Decimal::from(10), Decimal::from(3)),
            233
        );
    }

    #[test]
    fn test_sales_by_category_sorted_by_income() {
        let organizer = Uuid::new_v4();
        let mut music = sample_event(organizer, 100, 4);
        music.tag = "music".to_string();
        let mut sport = sample_event(organizer, 100, 10);
        sport.tag = "sport".to_string();
        let mut more_music = sample_event(organizer, 100, 1);
        more_music.tag = "music".to_string();

        let sales = sales_by_category(&[music, sport, more_music]);
        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].category, "sport");
        assert_eq!(sales[0].ticket_sales, 10);
        assert_eq!(sales[1].category, "music");
        assert_eq!(sales[1].ticket_sales, 5);
        assert_eq!(sales[1].total_income_by_category, Decimal::from(125));
    }

    #[test]
    fn test_sales_by_ticket_price_merges_equal_prices() {
        let organizer = Uuid::new_v4();
        let a = sample_event(organizer, 10, 2);
        let mut b = sample_event(organizer, 10, 3);
        b.ticket_price = Decimal::new(2500, 2);

        let sales = sales_by_ticket_price(&[a, b]);
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].total_ticket_sales, 5);
    }

    #[test]
    fn test_tickets_by_country_sums_quantities() {
        let now = Utc::now();
        let tickets = vec![
            ticket_at(now, 2, "GB"),
            ticket_at(now, 3, "FR"),
            ticket_at(now, 1, "GB"),
        ];
        assert_eq!(
            tickets_by_country(&tickets),
            vec![
                CountryTickets {
                    country: "FR".to_string(),
                    total_tickets: 3
                },
                CountryTickets {
                    country: "GB".to_string(),
                    total_tickets: 3
                },
            ]
        );
    }

    #[test]
    fn test_hourly_sales_buckets_today_up_to_current_hour() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 3, 30, 0).unwrap();
        let tickets = vec![
            ticket_at(Utc.with_ymd_and_hms(2024, 6, 1, 1, 5, 0).unwrap(), 2, "GB"),
            ticket_at(Utc.with_ymd_and_hms(2024, 6, 1, 1, 55, 0).unwrap(), 1, "GB"),
            ticket_at(Utc.with_ymd_and_hms(2024, 6, 1, 3, 0, 0).unwrap(), 4, "GB"),
            ticket_at(Utc.with_ymd_and_hms(2024, 5, 31, 23, 0, 0).unwrap(), 9, "GB"),
        ];

        let series = hourly_sales(&tickets, now);
        let points: Vec<(&str, i64)> = series.data.iter().map(|p| (p.x.as_str(), p.y)).collect();
        assert_eq!(
            points,
            vec![("00:00", 0), ("01:00", 3), ("02:00", 0), ("03:00", 4)]
        );
    }

    #[tokio::test]
    async fn test_daily_dashboard_compares_today_with_yesterday() {
        let store = Arc::new(MemoryStore::new());
        let state = memory_state(store.clone(), Arc::new(RecordingMailer::default()));
        let now = noon();
        let today = start_of_day(now);

        let organizer = user_at(&store, "o@example.com", today - Duration::days(3)).await;
        let fan = user_at(&store, "fan@example.com", today - Duration::hours(14)).await;
        user_at(&store, "a@example.com", today + Duration::hours(1)).await;
        user_at(&store, "b@example.com", today + Duration::hours(11)).await;

        let event = event_at(&store, &organizer, "music", 25, today - Duration::days(3)).await;
        sell(&store, &event, &fan, today - Duration::days(2), 5, "GB").await;
        sell(&store, &event, &fan, today - Duration::hours(20), 1, "GB").await;
        sell(&store, &event, &fan, today - Duration::hours(2), 4, "GB").await;
        sell(&store, &event, &fan, today + Duration::hours(9), 2, "GB").await;

        let dashboard = daily_dashboard(&state, now).await.unwrap();
        assert_eq!(dashboard.new_users, 2);
        assert_eq!(dashboard.new_users_change, 1);
        // Purchases are counted, not seats.
        assert_eq!(dashboard.tickets_bought, 1);
        assert_eq!(dashboard.tickets_bought_change, -1);
    }

    #[tokio::test]
    async fn test_daily_dashboard_on_empty_store_is_zero() {
        let store = Arc::new(MemoryStore::new());
        let state = memory_state(store, Arc::new(RecordingMailer::default()));

        let dashboard = daily_dashboard(&state, noon()).await.unwrap();
        assert_eq!(dashboard.new_users, 0);
        assert_eq!(dashboard.tickets_bought, 0);
        assert_eq!(dashboard.new_users_change, 0);
        assert_eq!(dashboard.tickets_bought_change, 0);
    }

    #[tokio::test]
    async fn test_organizer_overview_prices_each_days_sales() {
        let store = Arc::new(MemoryStore::new());
        let state = memory_state(store.clone(), Arc::new(RecordingMailer::default()));
        let now = noon();
        let today = start_of_day(now);
        let yesterday = today - Duration::days(1);

        let organizer = user_at(&store, "o@example.com", yesterday).await;
        let rival = user_at(&store, "r@example.com", yesterday).await;
        let fan = user_at(&store, "fan@example.com", yesterday).await;

        let gig = event_at(&store, &organizer, "music", 25, yesterday + Duration::hours(9)).await;
        let match_day = event_at(&store, &organizer, "sport", 10, today + Duration::hours(8)).await;
        let mut past = sample_event(organizer.id, 50, 0);
        past.tag = "talk".to_string();
        past.date = yesterday - Duration::days(5);
        past.expired = true;
        past.created_at = yesterday - Duration::days(10);
        store.create_event(past).await.unwrap();
        let elsewhere = event_at(&store, &rival, "music", 99, today).await;

        sell(&store, &gig, &fan, yesterday + Duration::hours(10), 2, "GB").await;
        sell(&store, &gig, &fan, today + Duration::hours(1), 1, "GB").await;
        sell(&store, &match_day, &fan, today + Duration::hours(9), 3, "FR").await;
        sell(&store, &elsewhere, &fan, today + Duration::hours(9), 7, "US").await;

        let overview = organizer_overview(&state, &organizer, now).await.unwrap();

        let revenue = &overview.revenue;
        assert_eq!(revenue.total_revenue_yesterday, Decimal::from(50));
        assert_eq!(revenue.total_revenue_today, Decimal::from(25 + 30));
        assert_eq!(revenue.revenue_percentage, 10);
        assert_eq!(revenue.total_income, Decimal::from(75 + 30));

        let tickets = &overview.tickets_purchased;
        assert_eq!(tickets.total_tickets_purchased, 6);
        assert_eq!(tickets.total_tickets_sold_yesterday, 2);
        assert_eq!(tickets.total_tickets_sold_today, 4);
        assert_eq!(tickets.tickets_sold_percentage, 100);

        let created = &overview.total_event_created;
        assert_eq!(created.total_events, 3);
        assert_eq!(created.events_created_yesterday, 1);
        assert_eq!(created.events_created_today, 1);
        assert_eq!(created.event_difference_percentage, 0);

        assert_eq!(overview.top_event.as_ref().map(|e| e.id), Some(gig.id));
        assert_eq!(overview.event_breakdown.len(), 3);
        assert_eq!(
            overview.tickets_by_country,
            vec![
                CountryTickets {
                    country: "FR".to_string(),
                    total_tickets: 3
                },
                CountryTickets {
                    country: "GB".to_string(),
                    total_tickets: 3
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_organizer_overview_without_sales_reports_zero_change() {
        let store = Arc::new(MemoryStore::new());
        let state = memory_state(store.clone(), Arc::new(RecordingMailer::default()));
        let now = noon();
        let organizer = user_at(&store, "o@example.com", now).await;
        event_at(&store, &organizer, "music", 25, start_of_day(now)).await;

        let overview = organizer_overview(&state, &organizer, now).await.unwrap();
        assert_eq!(overview.revenue.total_revenue_yesterday, Decimal::ZERO);
        assert_eq!(overview.revenue.revenue_percentage, 0);
        assert_eq!(overview.tickets_purchased.tickets_sold_percentage, 0);
        // One event today against none yesterday: zero base, zero change.
        assert_eq!(overview.total_event_created.event_difference_percentage, 0);
        assert!(overview.tickets_by_country.is_empty());
    }
}
