use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

const PREFLIGHT_MAX_AGE_SECS: u64 = 86400;

pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origins(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(PREFLIGHT_MAX_AGE_SECS))
}

fn allowed_origins(origins: &[String]) -> AllowOrigin {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => {
                tracing::debug!(origin = %origin, "CORS: allowing origin");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "CORS: invalid origin");
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        tracing::warn!("CORS: no valid origins configured, allowing any origin");
        AllowOrigin::any()
    } else {
        tracing::info!(count = parsed.len(), "CORS: configured allowed origins");
        AllowOrigin::list(parsed)
    }
}
