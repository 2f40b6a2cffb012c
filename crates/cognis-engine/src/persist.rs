//! Persistence boundary — async stores and a coalescing background writer
//!
//! Evolution never waits on I/O: callers hand the latest state to the
//! `Persister`, which keeps only the newest value (watch channel), waits for a
//! quiet period, and writes with exponential backoff on failure.

use crate::config::PersistenceConfig;
use crate::state::CoreState;
use crate::version::{decode, encode, PersistedState};
use async_trait::async_trait;
use cognis_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Durable home of the serialized state.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<PersistedState>>;
    async fn save(&self, state: &CoreState) -> Result<()>;
}

/// JSON file written atomically via tmp + rename.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn load(&self) -> Result<Option<PersistedState>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(Some(decode(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, state: &CoreState) -> Result<()> {
        let json = encode(state)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// In-process store. Can be told to fail its next writes.
#[derive(Default)]
pub struct MemoryStore {
    blob: tokio::sync::Mutex<Option<String>>,
    fail_next: AtomicU32,
    saves: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` saves fail.
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Successful saves so far.
    pub fn saves(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self) -> Result<Option<PersistedState>> {
        match self.blob.lock().await.as_deref() {
            Some(text) => Ok(Some(decode(text)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, state: &CoreState) -> Result<()> {
        let failing = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::persistence("injected write failure"));
        }
        *self.blob.lock().await = Some(encode(state)?);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Coalescing, debounced, retrying background writer.
pub struct Persister {
    tx: watch::Sender<Option<Arc<CoreState>>>,
    cancel: CancellationToken,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
    written: Arc<AtomicU64>,
}

impl Persister {
    /// Start the writer task on the current runtime.
    pub fn spawn(store: Arc<dyn StateStore>, config: PersistenceConfig) -> Self {
        let (tx, rx) = watch::channel(None);
        let cancel = CancellationToken::new();
        let written = Arc::new(AtomicU64::new(0));
        let task = tokio::spawn(run_writer(store, rx, config, cancel.clone(), written.clone()));
        Self { tx, cancel, task: std::sync::Mutex::new(Some(task)), written }
    }

    /// Queue `state` for writing. Replaces any pending, unwritten state.
    pub fn submit(&self, state: CoreState) {
        self.tx.send_replace(Some(Arc::new(state)));
    }

    /// States written so far.
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::SeqCst)
    }

    /// Flush whatever is pending and stop the writer.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self.task.lock().ok().and_then(|mut t| t.take());
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("Persister task failed: {}", e);
            }
        }
    }
}

async fn run_writer(
    store: Arc<dyn StateStore>,
    mut rx: watch::Receiver<Option<Arc<CoreState>>>,
    config: PersistenceConfig,
    cancel: CancellationToken,
    written: Arc<AtomicU64>,
) {
    let debounce = Duration::from_millis(config.debounce_ms);
    let max_wait = debounce * 4;
    info!("Persister started (debounce {}ms)", config.debounce_ms);

    loop {
        let stopping = tokio::select! {
            changed = rx.changed() => changed.is_err(),
            _ = cancel.cancelled() => true,
        };

        if !stopping {
            // Wait for a quiet period, but never longer than max_wait overall.
            let deadline = Instant::now() + max_wait;
            loop {
                let quiet = (Instant::now() + debounce).min(deadline);
                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep_until(quiet) => break,
                    _ = cancel.cancelled() => break,
                }
                if Instant::now() >= deadline {
                    break;
                }
            }
        }

        // `changed()` marks the value seen, so only the stop path needs the check.
        let pending = if stopping && !rx.has_changed().unwrap_or(false) {
            None
        } else {
            rx.borrow_and_update().clone()
        };
        if let Some(state) = pending {
            if write_with_retry(store.as_ref(), state, &mut rx, &config).await {
                written.fetch_add(1, Ordering::SeqCst);
            }
        }

        if stopping || cancel.is_cancelled() {
            // One last look for anything submitted while we were writing.
            if rx.has_changed().unwrap_or(false) {
                let latest = rx.borrow_and_update().clone();
                if let Some(state) = latest {
                    if write_with_retry(store.as_ref(), state, &mut rx, &config).await {
                        written.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
            break;
        }
    }
    info!("Persister stopped");
}

/// Save `state`, retrying with exponential backoff. A newer state submitted
/// during the backoff replaces the one being retried.
async fn write_with_retry(
    store: &dyn StateStore,
    mut state: Arc<CoreState>,
    rx: &mut watch::Receiver<Option<Arc<CoreState>>>,
    config: &PersistenceConfig,
) -> bool {
    let mut backoff = Duration::from_millis(config.initial_backoff_ms.max(1));
    let max_backoff = Duration::from_millis(config.max_backoff_ms.max(config.initial_backoff_ms));
    let mut attempt = 0u32;
    loop {
        match store.save(&state).await {
            Ok(()) => {
                debug!("Persisted state at iteration {}", state.iteration());
                return true;
            }
            Err(e) if attempt < config.max_retries => {
                attempt += 1;
                warn!(
                    "Persist failed (attempt {}/{}): {}; retrying in {:?}",
                    attempt, config.max_retries, e, backoff
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(max_backoff);
                if rx.has_changed().unwrap_or(false) {
                    let latest = rx.borrow_and_update().clone();
                    if let Some(newer) = latest {
                        state = newer;
                    }
                }
            }
            Err(e) => {
                error!("Giving up on persisting iteration {}: {}", state.iteration(), e);
                return false;
            }
        }
    }
}
