mod config;
mod crypto;
mod errors;
mod merge;
mod models;
mod naming;
mod service;
mod store;
mod watcher;

pub use config::StoreConfig;
pub use crypto::{decrypt, encrypt, EncryptedEnvelope};
pub use errors::{StoreError, StoreResult};
pub use merge::{carry_forward, previous_date, promote_plan, CarryOutcome};
pub use models::{ActualItem, ErrorPlaceholder, ItemSource, PlanItem, Record, RecordEntry};
pub use naming::{FileKey, ENCRYPTED_EXT};
pub use service::DailyCore;
pub use store::{list_records, save_record};
pub use watcher::{ChangeWatcher, WatcherConfig};

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

pub fn init_tracing(data_dir: &Path) -> Result<(), String> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "teamday.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
