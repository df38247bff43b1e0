use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, Config, SecurityHeadersLayer};
use crate::handlers::{admin, events, health_check, stats, tickets, users};
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    api_routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(SecurityHeadersLayer::new(config.production))
        .layer(create_cors_layer(&config.cors_allowed_origins))
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/users", post(users::create_user))
        .route("/users/:email", get(users::get_user).put(users::update_user))
        .route("/events", post(events::create_event))
        .route("/events/search", get(events::search_events))
        .route("/events/upcoming", get(events::upcoming_events))
        .route("/events/organizer/:email", get(events::organizer_events))
        .route(
            "/events/organizer/:email/expired",
            get(events::organizer_expired_events),
        )
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::edit_event)
                .delete(events::delete_event),
        )
        .route("/tickets", post(tickets::issue_ticket))
        .route("/tickets/check-in", post(tickets::check_in))
        .route("/tickets/user/:email", get(tickets::user_tickets))
        .route("/tickets/:id", get(tickets::ticket_details))
        .route("/tickets/:id/qr-image", put(tickets::set_qr_image))
        .route(
            "/tickets/:id/qr-image/regenerate",
            post(tickets::regenerate_qr_image),
        )
        .route("/receipts", post(tickets::send_receipt))
        .route("/traffic", post(stats::record_visit))
        .route("/stats/event-popularity", get(stats::event_popularity))
        .route("/stats/sales-by-category", get(stats::sales_by_category))
        .route("/stats/daily", get(stats::daily))
        .route("/stats/admin", get(stats::admin_overview))
        .route("/stats/organizer/:email", get(stats::organizer_overview))
        .route("/admin/customers", get(admin::list_customers))
        .route("/admin/organizers", get(admin::list_organizers))
        .route("/admin/users/:email", axum::routing::delete(admin::delete_user))
        .route("/admin/users/:email/disable", put(admin::disable_user))
        .route("/admin/users/:email/enable", put(admin::enable_user))
        .route("/admin/events", get(admin::manage_events))
}
