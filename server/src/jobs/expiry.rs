use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::repository::{EventRepository, RepoError};

/// Marks every event dated strictly before `now` as expired. Re-running
/// changes nothing.
pub async fn run_expiry_sweep(
    events: &dyn EventRepository,
    now: DateTime<Utc>,
) -> Result<u64, RepoError> {
    let expired = events.expire_past_events(now).await?;
    info!(expired, at = %now, "Expiry sweep finished");
    Ok(expired)
}

pub async fn scheduled_expiry_sweep(events: &dyn EventRepository) {
    if let Err(e) = run_expiry_sweep(events, Utc::now()).await {
        error!(error = %e, "Expiry sweep failed");
    }
}
