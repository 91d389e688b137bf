//! The fan-out viewer.
//!
//! A [`Viewer`] holds one [`StateProvider`] and an ordered set of
//! [`Target`]s. Each refresh fetches one snapshot and pushes it to every
//! target in the order they were added:
//!
//! - a provider failure aborts the refresh before any target is touched,
//! - a target failure is recorded and the fan-out continues,
//! - the caller receives every target failure as one aggregate error.
//!
//! # Periodic refresh
//!
//! [`Viewer::start`] runs one refresh immediately, then spawns a
//! background task that refreshes on a fixed interval until the
//! cancellation token fires or [`Viewer::stop`] is called. Per-tick
//! errors are logged and swallowed; the loop only ends on cancellation.
//! Ticks never overlap: a slow refresh delays the next tick.
//!
//! # Locking
//!
//! The provider and target list sit behind one `RwLock`. Every refresh
//! copies both out before dispatching, so the lock is never held across
//! target I/O and concurrent add/remove calls see a consistent list.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{TargetFailures, ViewerError};
use crate::provider::StateProvider;
use crate::target::Target;

/// Default time between periodic refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Shortest accepted refresh interval.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(1);

/// Options for constructing a [`Viewer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerOptions {
    /// Time between periodic refreshes once started.
    pub refresh_interval: Duration,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

/// Provider and targets, guarded together.
#[derive(Default)]
struct Registry {
    provider: Option<Arc<dyn StateProvider>>,
    targets: Vec<Arc<dyn Target>>,
}

/// State shared between the viewer handle and its refresh loop task.
#[derive(Default)]
struct Shared {
    registry: RwLock<Registry>,
}

impl Shared {
    async fn refresh_once(&self) -> Result<(), ViewerError> {
        let (provider, targets) = {
            let registry = self.registry.read().await;
            (registry.provider.clone(), registry.targets.clone())
        };

        let provider = provider.ok_or(ViewerError::NoProviderConfigured)?;
        let state = provider.view_state().await?;

        let mut failures = TargetFailures::default();
        for target in &targets {
            if let Err(e) = target.update(Arc::clone(&state)).await {
                let name = target.name();
                warn!(target_name = %name, error = %e, "target update failed");
                failures.push(name, e);
            }
        }

        debug!(
            targets = targets.len(),
            failed = failures.len(),
            lands = state.lands.len(),
            "refresh complete"
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ViewerError::Targets(failures))
        }
    }
}

/// A running background refresh loop.
struct RefreshLoop {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Binds a state provider to a set of output targets.
pub struct Viewer {
    shared: Arc<Shared>,
    refresh_interval: Duration,
    refresh_loop: Mutex<Option<RefreshLoop>>,
}

impl Viewer {
    /// Create a viewer with no provider and no targets.
    pub fn new(options: ViewerOptions) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            refresh_interval: options.refresh_interval.max(MIN_REFRESH_INTERVAL),
            refresh_loop: Mutex::new(None),
        }
    }

    /// The interval used by the periodic loop.
    pub const fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Replace the state provider. The next refresh uses the new one,
    /// including refreshes of an already running loop.
    pub async fn set_state_provider(&self, provider: Arc<dyn StateProvider>) {
        self.shared.registry.write().await.provider = Some(provider);
    }

    /// Append a target. Targets are updated in the order they were added.
    pub async fn add_target(&self, target: Arc<dyn Target>) {
        let name = target.name();
        let mut registry = self.shared.registry.write().await;
        registry.targets.push(target);
        info!(target_name = %name, total = registry.targets.len(), "target added");
    }

    /// Remove a target by identity. Returns `false` if it was not present.
    pub async fn remove_target(&self, target: &Arc<dyn Target>) -> bool {
        let mut registry = self.shared.registry.write().await;
        let Some(index) = registry
            .targets
            .iter()
            .position(|t| Arc::ptr_eq(t, target))
        else {
            return false;
        };
        let removed = registry.targets.remove(index);
        info!(target_name = %removed.name(), "target removed");
        true
    }

    /// Number of registered targets.
    pub async fn target_count(&self) -> usize {
        self.shared.registry.read().await.targets.len()
    }

    /// Names of the registered targets, in refresh order.
    pub async fn target_names(&self) -> Vec<String> {
        self.shared
            .registry
            .read()
            .await
            .targets
            .iter()
            .map(|t| t.name())
            .collect()
    }

    /// Fetch one snapshot and push it to every target.
    ///
    /// # Errors
    ///
    /// - [`ViewerError::NoProviderConfigured`] if no provider is set.
    /// - [`ViewerError::Provider`] if the provider fails; no target is
    ///   touched.
    /// - [`ViewerError::Targets`] naming every target that failed. All
    ///   other targets were still updated.
    pub async fn refresh_once(&self) -> Result<(), ViewerError> {
        self.shared.refresh_once().await
    }

    /// Refresh once, then keep refreshing in the background until `token`
    /// is cancelled or [`stop`](Self::stop) is called.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::AlreadyStarted`] if a loop is running, or
    /// the error of the initial refresh. When the initial refresh fails no
    /// loop is spawned and the viewer can be started again.
    pub async fn start(&self, token: &CancellationToken) -> Result<(), ViewerError> {
        let mut slot = self.refresh_loop.lock().await;
        if slot.as_ref().is_some_and(|running| !running.handle.is_finished()) {
            return Err(ViewerError::AlreadyStarted);
        }

        self.shared.refresh_once().await?;

        let token = token.child_token();
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.shared),
            self.refresh_interval,
            token.clone(),
        ));
        *slot = Some(RefreshLoop { token, handle });

        info!(
            interval_ms = self.refresh_interval.as_millis(),
            "viewer started"
        );
        Ok(())
    }

    /// Whether a background loop is currently running.
    pub async fn is_running(&self) -> bool {
        self.refresh_loop
            .lock()
            .await
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Cancel the background loop and wait until it has exited.
    ///
    /// Returns immediately when no loop is running.
    pub async fn stop(&self) {
        let Some(running) = self.refresh_loop.lock().await.take() else {
            return;
        };
        running.token.cancel();
        if let Err(e) = running.handle.await {
            warn!(error = %e, "refresh loop task ended abnormally");
        }
        info!("viewer stopped");
    }

    /// Stop the loop, then close and remove every target.
    ///
    /// Every target is closed even if an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Close`] naming every target whose close
    /// failed.
    pub async fn close(&self) -> Result<(), ViewerError> {
        self.stop().await;

        let targets = std::mem::take(&mut self.shared.registry.write().await.targets);

        let mut failures = TargetFailures::default();
        for target in &targets {
            if let Err(e) = target.close().await {
                let name = target.name();
                warn!(target_name = %name, error = %e, "target close failed");
                failures.push(name, e);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ViewerError::Close(failures))
        }
    }
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new(ViewerOptions::default())
    }
}

/// The periodic refresh loop. Runs until `token` is cancelled.
async fn run_loop(shared: Arc<Shared>, period: Duration, token: CancellationToken) {
    // The immediate refresh already happened in `start`.
    let first_tick = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
    let mut ticker = tokio::time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = shared.refresh_once().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }

    debug!("refresh loop exited");
}
