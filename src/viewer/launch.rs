//! Viewer URL construction and best-effort browser launch.

use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use crate::models::room::AccessToken;
use crate::{AppError, Result};

/// Query parameter carrying the room URL.
pub const ROOM_URL_PARAM: &str = "roomUrl";

/// Query parameter carrying the viewer token.
pub const TOKEN_PARAM: &str = "token";

/// Resolve the viewer page against the asset server base URL.
///
/// # Errors
///
/// Returns `AppError::Config` if either part does not form a valid URL.
pub fn viewer_page_url(server_base: &str, page: &str) -> Result<Url> {
    Url::parse(server_base)
        .and_then(|base| base.join(page.trim_start_matches('/')))
        .map_err(|err| AppError::Config(format!("invalid viewer url {server_base}{page}: {err}")))
}

/// Append the room URL and viewer token as query parameters.
#[must_use]
pub fn build_viewer_url(page_url: &Url, room_url: &str, viewer_token: &AccessToken) -> Url {
    let mut url = page_url.clone();
    url.query_pairs_mut()
        .append_pair(ROOM_URL_PARAM, room_url)
        .append_pair(TOKEN_PARAM, viewer_token.expose());
    url
}

/// Something that can show a URL to the operator.
pub trait BrowserLauncher: Send + Sync {
    /// Open `url`. Blocking is allowed; callers run this off the async
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the browser cannot be started.
    fn open(&self, url: &Url) -> std::io::Result<()>;
}

/// Opens URLs in the operator's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &Url) -> std::io::Result<()> {
        webbrowser::open(url.as_str())
    }
}

/// Skips the browser; the URL is only logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBrowser;

impl BrowserLauncher for NoBrowser {
    fn open(&self, url: &Url) -> std::io::Result<()> {
        info!(%url, "browser launch disabled; open the viewer manually");
        Ok(())
    }
}

/// Open `url` on a detached blocking task. Failures are logged only.
pub fn open_detached(launcher: Arc<dyn BrowserLauncher>, url: Url) {
    tokio::task::spawn_blocking(move || {
        if let Err(err) = launcher.open(&url) {
            warn!(%err, "failed to open viewer in browser");
        }
    });
}
