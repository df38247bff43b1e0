use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use eventfinder_server::config::{Config, StoreBackend};
use eventfinder_server::jobs::{self, expiry, reminders};
use eventfinder_server::mail::{LogMailer, Mailer, SmtpMailer};
use eventfinder_server::repository::{MemoryStore, PgStore};
use eventfinder_server::routes::create_routes;
use eventfinder_server::services::{CodeGenerator, NotificationDispatcher};
use eventfinder_server::state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventfinder_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Server exited with an error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), BoxError> {
    let config = Config::from_env()?;

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "Using SMTP mailer");
            Arc::new(SmtpMailer::new(smtp)?)
        }
        None => {
            tracing::warn!("SMTP_HOST not set; emails will only be logged");
            Arc::new(LogMailer)
        }
    };
    let notifier = NotificationDispatcher::new(mailer, config.mail_max_attempts);
    let codes = Arc::new(CodeGenerator::secure(config.ticket_code_length));

    let state = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(&config.database_url)
                .await?;
            tracing::info!("Successfully connected to database");

            sqlx::migrate!().run(&pool).await?;
            tracing::info!("Migrations run successfully");

            AppState::new(Arc::new(PgStore::new(pool)), codes, notifier, &config.default_country)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            AppState::new(Arc::new(MemoryStore::new()), codes, notifier, &config.default_country)
        }
    };

    let sweep_state = state.clone();
    jobs::spawn_daily("expiry_sweep", config.expiry_sweep_at, move || {
        let state = sweep_state.clone();
        async move { expiry::scheduled_expiry_sweep(state.events.as_ref()).await }
    });
    let reminder_state = state.clone();
    jobs::spawn_daily("event_reminders", config.reminder_at, move || {
        let state = reminder_state.clone();
        async move { reminders::scheduled_reminders(&state).await }
    });

    let app = create_routes(state, &config);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
