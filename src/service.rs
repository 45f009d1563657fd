use crate::config::StoreConfig;
use crate::errors::{StoreError, StoreResult};
use crate::merge::{self, CarryOutcome};
use crate::models::{Record, RecordEntry};
use crate::store;
use crate::watcher::{ChangeWatcher, WatcherConfig};
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast, Mutex, RwLock};

/// The single entry point the shell talks to. Owns the active configuration
/// and the directory watcher; every store and codec call receives its inputs
/// from here instead of from ambient globals.
pub struct DailyCore {
    config_path: PathBuf,
    config: RwLock<StoreConfig>,
    watcher: Mutex<ChangeWatcher>,
}

impl DailyCore {
    /// Loads the persisted configuration and, when a sync directory is
    /// already configured, starts watching it.
    pub async fn load(config_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let config_path = config_path.into();
        let config = StoreConfig::load(&config_path).await?;
        let core = Self {
            config_path,
            config: RwLock::new(config.clone()),
            watcher: Mutex::new(ChangeWatcher::new(WatcherConfig::default())),
        };
        if let Some(dir) = config.sync_dir.as_deref() {
            core.restart_watch(dir).await;
        }
        Ok(core)
    }

    pub async fn config(&self) -> StoreConfig {
        self.config.read().await.clone()
    }

    /// Persists a new configuration and re-points the watcher at the new
    /// directory. A directory that cannot be watched yet (not created, not
    /// yet synced) is logged, not fatal; the next `set_config` retries.
    pub async fn set_config(&self, new: StoreConfig) -> StoreResult<()> {
        new.save(&self.config_path).await?;
        {
            let mut config = self.config.write().await;
            *config = new.clone();
        }
        match new.sync_dir.as_deref() {
            Some(dir) => self.restart_watch(dir).await,
            None => self.watcher.lock().await.stop(),
        }
        Ok(())
    }

    /// All records for `date` (or every date when `None`). An unconfigured
    /// directory or passphrase is a normal fresh-install state and lists
    /// empty.
    pub async fn load_records(&self, date: Option<&str>) -> StoreResult<Vec<RecordEntry>> {
        let config = self.config().await;
        let Some(dir) = config.sync_dir.as_deref() else {
            return Ok(Vec::new());
        };
        if config.password.is_empty() {
            return Ok(Vec::new());
        }
        store::list_records(dir, &config.password, date).await
    }

    /// Saves the caller's record under the configured identity. The record's
    /// `user` field is overridden with the configured username; clients are
    /// not trusted to name themselves.
    pub async fn save_record(&self, record: &Record) -> StoreResult<PathBuf> {
        let config = self.config().await;
        let dir = config.require_sync_dir()?;
        let username = config.require_username()?;
        let password = config.require_password()?;
        store::save_record(dir, username, password, record).await
    }

    /// Carries the configured user's previous-day plan into `record`.
    pub async fn carry_forward_from_previous(&self, record: &mut Record) -> StoreResult<CarryOutcome> {
        let previous_date = merge::previous_date(&record.date).ok_or_else(|| {
            StoreError::Parse(format!("record date must be YYYY-MM-DD, got {:?}", record.date))
        })?;
        let config = self.config().await;
        let username = config.require_username()?.to_string();

        let entries = self.load_records(Some(&previous_date)).await?;
        let previous = entries
            .iter()
            .filter_map(RecordEntry::as_record)
            .find(|candidate| candidate.user == username);
        Ok(merge::carry_forward(record, previous))
    }

    /// Promotes plan items into outcomes; see [`merge::promote_plan`].
    pub fn promote_plan(&self, record: &mut Record) -> usize {
        merge::promote_plan(record)
    }

    /// Change-signal channel for the shell to trigger re-loads from.
    pub async fn subscribe_changes(&self) -> broadcast::Receiver<()> {
        self.watcher.lock().await.subscribe()
    }

    pub async fn stop_watching(&self) {
        self.watcher.lock().await.stop();
    }

    async fn restart_watch(&self, dir: &Path) {
        let mut watcher = self.watcher.lock().await;
        if let Err(error) = watcher.watch(dir) {
            tracing::warn!(dir = %dir.display(), error = %error, "sync directory is not watchable yet");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DailyCore;
    use crate::config::StoreConfig;
    use crate::errors::StoreError;
    use crate::merge::CarryOutcome;
    use crate::models::{PlanItem, Record};

    async fn configured_core(temp: &tempfile::TempDir, username: &str) -> DailyCore {
        let core = DailyCore::load(temp.path().join("config.json"))
            .await
            .expect("load core");
        core.set_config(StoreConfig {
            username: username.to_string(),
            sync_dir: Some(temp.path().join("sync")),
            password: "secret".to_string(),
        })
        .await
        .expect("set config");
        core
    }

    #[tokio::test]
    async fn unconfigured_core_lists_empty_and_refuses_saves() {
        let temp = tempfile::tempdir().expect("tempdir");
        let core = DailyCore::load(temp.path().join("config.json"))
            .await
            .expect("load core");

        assert!(core.load_records(None).await.expect("list").is_empty());
        let error = core
            .save_record(&Record::empty("alice", "2024-05-01"))
            .await
            .expect_err("save must fail");
        assert!(matches!(error, StoreError::Configuration(_)));
    }

    #[tokio::test]
    async fn save_forces_configured_identity() {
        let temp = tempfile::tempdir().expect("tempdir");
        let core = configured_core(&temp, "alice").await;

        let mut record = Record::empty("mallory", "2024-05-01");
        record.plan.push(PlanItem::new("write spec"));
        core.save_record(&record).await.expect("save");

        let entries = core.load_records(Some("2024-05-01")).await.expect("list");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user(), "alice");
    }

    #[tokio::test]
    async fn carry_forward_pulls_own_previous_plan_only() {
        let temp = tempfile::tempdir().expect("tempdir");
        let core = configured_core(&temp, "alice").await;

        let mut yesterday = Record::empty("alice", "2024-04-30");
        yesterday.plan.push(PlanItem::new("finish report"));
        core.save_record(&yesterday).await.expect("save alice");

        // A teammate's record for the same day must not leak in.
        let bob_core = configured_core(&temp, "bob").await;
        let mut bob_yesterday = Record::empty("bob", "2024-04-30");
        bob_yesterday.plan.push(PlanItem::new("bob's task"));
        bob_core.save_record(&bob_yesterday).await.expect("save bob");

        let mut today = Record::empty("alice", "2024-05-01");
        let outcome = core
            .carry_forward_from_previous(&mut today)
            .await
            .expect("carry forward");
        assert_eq!(outcome, CarryOutcome::Carried(1));
        assert_eq!(today.plan.len(), 1);
        assert_eq!(today.plan[0].text, "finish report");
    }

    #[tokio::test]
    async fn carry_forward_without_history_reports_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let core = configured_core(&temp, "alice").await;

        let mut today = Record::empty("alice", "2024-05-01");
        let outcome = core
            .carry_forward_from_previous(&mut today)
            .await
            .expect("carry forward");
        assert_eq!(outcome, CarryOutcome::NothingToCarry);
        assert!(today.plan.is_empty());
    }

    #[tokio::test]
    async fn config_persists_across_core_instances() {
        let temp = tempfile::tempdir().expect("tempdir");
        {
            let _core = configured_core(&temp, "alice").await;
        }
        let reloaded = DailyCore::load(temp.path().join("config.json"))
            .await
            .expect("reload");
        assert_eq!(reloaded.config().await.username, "alice");
    }
}
