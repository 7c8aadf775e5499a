//! Static asset server for the viewer page.
//!
//! Binds synchronously with respect to the caller so a port conflict is
//! reported before anything else starts, then serves in a background task
//! until [`AssetServer::stop`] is called or the handle is dropped.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::{AppError, Result};

/// Upper bound on waiting for in-flight requests during stop.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Handler for `GET /health`.
async fn health() -> &'static str {
    "ok"
}

/// Handle to the running viewer asset server.
#[derive(Debug)]
pub struct AssetServer {
    addr: SocketAddr,
    ct: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl AssetServer {
    /// Bind `127.0.0.1:<port>` and serve `root` in the background.
    ///
    /// Port `0` picks an ephemeral port; see [`Self::local_addr`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `root` is not a directory, or
    /// `AppError::Server` if the port cannot be bound.
    pub async fn start(root: &Path, port: u16) -> Result<Self> {
        if !root.is_dir() {
            return Err(AppError::Config(format!(
                "viewer root {} is not a directory",
                root.display()
            )));
        }

        let bind = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = tokio::net::TcpListener::bind(bind)
            .await
            .map_err(|err| AppError::Server(format!("failed to bind viewer on {bind}: {err}")))?;
        let addr = listener
            .local_addr()
            .map_err(|err| AppError::Server(format!("failed to read bound address: {err}")))?;

        let router = Router::new()
            .route("/health", get(health))
            .fallback_service(ServeDir::new(root))
            .layer(TraceLayer::new_for_http());

        let ct = CancellationToken::new();
        let shutdown = ct.clone();
        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(err) = served {
                error!(%err, "viewer asset server failed");
            }
        });

        info!(%addr, root = %root.display(), "viewer asset server started");
        Ok(Self {
            addr,
            ct,
            handle: Some(handle),
        })
    }

    /// Address the server is listening on.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL of the server, e.g. `http://127.0.0.1:8765/`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Whether [`Self::stop`] has completed.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.handle.is_none()
    }

    /// Stop accepting connections and wait briefly for the serve task.
    ///
    /// Idempotent; failures are logged and never returned.
    pub async fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        self.ct.cancel();
        match tokio::time::timeout(STOP_TIMEOUT, handle).await {
            Ok(Ok(())) => info!(addr = %self.addr, "viewer asset server stopped"),
            Ok(Err(err)) => warn!(%err, "viewer asset server task ended abnormally"),
            Err(_) => warn!("viewer asset server did not stop within {STOP_TIMEOUT:?}"),
        }
    }
}

impl Drop for AssetServer {
    fn drop(&mut self) {
        self.ct.cancel();
    }
}
