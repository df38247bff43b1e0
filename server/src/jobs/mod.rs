//! Daily background jobs.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, TimeZone, Utc};
use tokio::task::JoinHandle;
use tracing::info;

pub mod expiry;
pub mod reminders;

/// Time from `now` until the next UTC wall-clock `at`. An `at` equal to `now`
/// schedules for tomorrow.
pub fn until_next(now: DateTime<Utc>, at: NaiveTime) -> Duration {
    let today = Utc.from_utc_datetime(&now.date_naive().and_time(at));
    let next = if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    };
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

/// Runs `job` every day at `at` (UTC) for the life of the process.
pub fn spawn_daily<F, Fut>(name: &'static str, at: NaiveTime, job: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let delay = until_next(Utc::now(), at);
            info!(job = name, in_secs = delay.as_secs(), "Next scheduled run");
            tokio::time::sleep(delay).await;
            job().await;
        }
    })
}
