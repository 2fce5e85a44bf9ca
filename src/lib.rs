//! Vigil: personal safety alerting backend.
//!
//! Incoming signals (text, audio) are classified for distress; qualifying
//! alerts start a cancellation countdown, and alerts that survive it
//! notify the user's trusted contacts by SMS. The lifecycle guarantees
//! exactly one terminal outcome per alert even when a cancellation races
//! the expiring countdown.

pub mod alerts;
pub mod classifier;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod models;

use tracing_subscriber::EnvFilter;

pub use alerts::{AlertEngine, AlertError, CreatedAlert, TriggerOutcome};
pub use classifier::{SecondOpinion, SignalAnalyzer};
pub use config::Settings;
pub use db::Database;
pub use dispatch::{HttpSmsGateway, SandboxGateway, SmsGateway};

/// Initialize tracing from `RUST_LOG`, falling back to the built-in filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
