//! The web target and its listener lifecycle.
//!
//! The listener is started lazily by the first [`update`] and at most once
//! per target. [`close`] asks the server to stop accepting, gives in-flight
//! requests a bounded grace period, then aborts the server task.
//!
//! [`update`]: forestview_core::Target::update
//! [`close`]: forestview_core::Target::close

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use forestview_core::config::WebConfig;
use forestview_core::{Target, TargetError};
use forestview_types::ViewState;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::WebError;
use crate::router::build_router;
use crate::state::AppState;

/// Default time in-flight requests get to finish on close.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A listener that is serving requests.
struct RunningServer {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<Result<(), WebError>>,
}

/// Listener lifecycle. `Closed` is terminal.
enum Listener {
    Idle,
    Running(RunningServer),
    Closed,
}

/// Serves the latest snapshot to browsers over HTTP.
pub struct WebTarget {
    listen_address: SocketAddr,
    static_dir: Option<PathBuf>,
    shutdown_grace: Duration,
    state: Arc<AppState>,
    listener: Mutex<Listener>,
}

impl WebTarget {
    /// Create a target that will listen on `listen_address`.
    ///
    /// Nothing is bound until the first update.
    pub fn new(listen_address: SocketAddr) -> Self {
        Self {
            listen_address,
            static_dir: None,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            state: Arc::new(AppState::new()),
            listener: Mutex::new(Listener::Idle),
        }
    }

    /// Create a target from the `web` configuration section.
    pub fn from_config(config: &WebConfig) -> Self {
        let target = Self::new(config.listen_address).with_shutdown_grace(config.shutdown_grace());
        match &config.static_dir {
            Some(dir) => target.with_static_dir(dir.clone()),
            None => target,
        }
    }

    /// Serve browser client assets from `dir` at `/`.
    #[must_use]
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Bound the time [`close`](Target::close) waits for in-flight requests.
    #[must_use]
    pub const fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// The router this target serves, for embedding into another server.
    ///
    /// The router shares this target's snapshot, so it reflects every
    /// update even when the target's own listener is never started.
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.state), self.static_dir.as_deref())
    }

    /// The address the listener is bound to, once started.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.listener.lock().await {
            Listener::Running(server) => Some(server.local_addr),
            Listener::Idle | Listener::Closed => None,
        }
    }

    /// The URL a browser on this machine can open.
    ///
    /// Uses the bound address when running, the configured one otherwise.
    /// Wildcard addresses are replaced with loopback.
    pub async fn url(&self) -> String {
        let addr = self.local_addr().await.unwrap_or(self.listen_address);
        let ip = match addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        };
        format!("http://{}", SocketAddr::new(ip, addr.port()))
    }

    /// The shared snapshot state.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Bind and spawn the listener if it is not running yet.
    async fn ensure_started(&self) -> Result<(), WebError> {
        let mut listener = self.listener.lock().await;
        if !matches!(*listener, Listener::Idle) {
            return Ok(());
        }

        let tcp = TcpListener::bind(self.listen_address)
            .await
            .map_err(|e| WebError::Bind(format!("bind failed on {}: {e}", self.listen_address)))?;
        let local_addr = tcp
            .local_addr()
            .map_err(|e| WebError::Bind(format!("local address unavailable: {e}")))?;

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        let router = self.router();
        let handle = tokio::spawn(async move {
            axum::serve(tcp, router)
                .with_graceful_shutdown(async move { signal.cancelled().await })
                .await
                .map_err(|e| WebError::Serve(format!("serve error: {e}")))
        });

        info!(addr = %local_addr, "web target listening");
        *listener = Listener::Running(RunningServer {
            local_addr,
            shutdown,
            handle,
        });
        Ok(())
    }
}

#[async_trait]
impl Target for WebTarget {
    async fn update(&self, state: Arc<ViewState>) -> Result<(), TargetError> {
        self.state.publish(state).await;
        self.ensure_started().await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), TargetError> {
        let previous = std::mem::replace(&mut *self.listener.lock().await, Listener::Closed);
        let Listener::Running(server) = previous else {
            return Ok(());
        };

        server.shutdown.cancel();
        let mut handle = server.handle;
        match tokio::time::timeout(self.shutdown_grace, &mut handle).await {
            Ok(Ok(result)) => {
                debug!(addr = %server.local_addr, "web target stopped");
                result.map_err(TargetError::from)
            }
            Ok(Err(e)) => Err(TargetError::Server(format!("server task failed: {e}"))),
            Err(_) => {
                warn!(
                    addr = %server.local_addr,
                    grace_ms = self.shutdown_grace.as_millis(),
                    "graceful shutdown timed out, aborting"
                );
                handle.abort();
                Ok(())
            }
        }
    }

    fn name(&self) -> String {
        format!("WebTarget({})", self.listen_address)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn url_replaces_wildcard_with_loopback() {
        let target = WebTarget::new(SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert_eq!(target.url().await, "http://127.0.0.1:8080");
        assert_eq!(target.name(), "WebTarget(0.0.0.0:8080)");
    }

    #[tokio::test]
    async fn close_before_start_is_a_no_op() {
        let target = WebTarget::new(SocketAddr::from(([127, 0, 0, 1], 0)));
        target.close().await.unwrap();
        assert!(target.local_addr().await.is_none());
    }

    #[test]
    fn from_config_carries_settings() {
        let config = WebConfig {
            static_dir: Some(PathBuf::from("web")),
            shutdown_grace_ms: 250,
            ..WebConfig::default()
        };
        let target = WebTarget::from_config(&config);
        assert_eq!(target.static_dir, Some(PathBuf::from("web")));
        assert_eq!(target.shutdown_grace, Duration::from_millis(250));
        assert_eq!(target.listen_address, config.listen_address);
    }
}
