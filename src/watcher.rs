use crate::errors::{StoreError, StoreResult};
use crate::naming::ENCRYPTED_EXT;
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct WatcherConfig {
    /// Quiet period after the last relevant event before a signal fires, so
    /// a file still being transferred by the sync daemon triggers once it
    /// stabilizes.
    pub settle: Duration,
    /// Poll interval for notify's fallback polling backend.
    pub poll_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(500),
            poll_interval: Duration::from_millis(100),
        }
    }
}

struct ActiveWatch {
    shutdown_tx: mpsc::Sender<()>,
    _watcher: RecommendedWatcher,
}

/// Watches the sync directory for added or modified `.enc` files and emits
/// unit "data may have changed" signals on a broadcast channel. The watcher
/// never decrypts anything; consumers re-issue a listing when signaled.
///
/// Existing directory contents at watch-start never produce a signal, only
/// subsequent changes do.
pub struct ChangeWatcher {
    config: WatcherConfig,
    change_tx: broadcast::Sender<()>,
    active: Option<ActiveWatch>,
}

impl ChangeWatcher {
    pub fn new(config: WatcherConfig) -> Self {
        let (change_tx, _) = broadcast::channel(16);
        Self {
            config,
            change_tx,
            active: None,
        }
    }

    /// Begins monitoring `dir`, replacing any previous watch. Must be called
    /// from within a tokio runtime.
    pub fn watch(&mut self, dir: &Path) -> StoreResult<()> {
        self.stop();

        let (event_tx, event_rx) = mpsc::channel::<notify::Result<Event>>(256);
        let mut watcher = RecommendedWatcher::new(
            move |result| {
                let _ = event_tx.blocking_send(result);
            },
            NotifyConfig::default().with_poll_interval(self.config.poll_interval),
        )
        .map_err(|error| StoreError::Filesystem(format!("watcher init failed: {error}")))?;
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|error| StoreError::Filesystem(format!("watch failed for {}: {error}", dir.display())))?;

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        spawn_settle_loop(event_rx, shutdown_rx, self.change_tx.clone(), self.config.settle);

        self.active = Some(ActiveWatch {
            shutdown_tx,
            _watcher: watcher,
        });
        tracing::debug!(dir = %dir.display(), "watching sync directory");
        Ok(())
    }

    /// New subscribers only see signals sent after they subscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.change_tx.subscribe()
    }

    /// Releases the watch. Idempotent; safe to call when nothing is watched.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            let _ = active.shutdown_tx.try_send(());
        }
    }

    pub fn is_watching(&self) -> bool {
        self.active.is_some()
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_settle_loop(
    mut event_rx: mpsc::Receiver<notify::Result<Event>>,
    mut shutdown_rx: mpsc::Receiver<()>,
    change_tx: broadcast::Sender<()>,
    settle: Duration,
) {
    tokio::spawn(async move {
        let mut deadline: Option<Instant> = None;
        loop {
            let next_deadline = deadline;
            tokio::select! {
                maybe_event = event_rx.recv() => {
                    match maybe_event {
                        Some(Ok(event)) if is_record_event(&event) => {
                            deadline = Some(Instant::now() + settle);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(error)) => {
                            tracing::warn!(error = %error, "watcher backend error");
                        }
                        None => break,
                    }
                }
                _ = shutdown_rx.recv() => break,
                () = async {
                    if let Some(at) = next_deadline {
                        time::sleep_until(at).await;
                    }
                }, if next_deadline.is_some() => {
                    deadline = None;
                    let _ = change_tx.send(());
                }
            }
        }
    });
}

fn is_record_event(event: &Event) -> bool {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return false;
    }
    event.paths.iter().any(|path| {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(ENCRYPTED_EXT))
    })
}
