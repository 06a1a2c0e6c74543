// src/services/reload.rs

//! Live-reload server.
//!
//! Serves the build output over HTTP and pushes reload events to browsers
//! through a server-sent event stream at [`RELOAD_PATH`]. HTML pages get a
//! small client script injected before `</body>`.

use std::convert::Infallible;
use std::fmt::Debug;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::Stream;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use crate::watch::{spawn_watcher, PatternSet, WatchRoute, WatcherHandle};

/// Event stream endpoint.
pub const RELOAD_PATH: &str = "/__sitepipe/reload";
/// Client script endpoint.
pub const CLIENT_PATH: &str = "/__sitepipe/client.js";

/// Pages larger than this are served without the client script.
const MAX_INJECT_BYTES: usize = 8 * 1024 * 1024;

const CLIENT_JS: &str = r#"(function () {
  var source = new EventSource("/__sitepipe/reload");
  source.addEventListener("reload", function () { location.reload(); });
  source.addEventListener("css", function () {
    document.querySelectorAll('link[rel="stylesheet"]').forEach(function (link) {
      var url = new URL(link.href);
      url.searchParams.set("sitepipe", Date.now());
      link.href = url.toString();
    });
  });
})();
"#;

/// Message pushed to connected clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadEvent {
    /// Full page reload.
    Reload,
    /// Served assets matching these patterns changed (inject, no reload).
    AssetsChanged(Vec<String>),
}

impl ReloadEvent {
    fn to_sse(&self) -> Event {
        match self {
            ReloadEvent::Reload => Event::default().event("reload").data("reload"),
            ReloadEvent::AssetsChanged(patterns) => {
                Event::default().event("css").data(patterns.join(","))
            }
        }
    }
}

pub trait ReloadServer: Send + Sync + Debug {
    /// Start serving `root`, pushing [`ReloadEvent::AssetsChanged`] whenever a
    /// file matching `watched_assets` (relative to the project root) changes.
    fn start(&self, project_root: &Path, root: &Path, watched_assets: &[String]) -> Result<()>;

    /// Ask every connected client to reload. Returns the number of clients
    /// reached; zero clients is not an error.
    fn reload(&self) -> Result<usize>;
}

#[derive(Debug)]
struct Running {
    local_addr: SocketAddr,
    server: JoinHandle<()>,
    _watcher: Option<WatcherHandle>,
}

impl Drop for Running {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// HTTP server over the output directory with a `broadcast` fan-out to
/// event-stream clients. In-process subscribers come from
/// [`BroadcastReloadServer::subscribe`].
#[derive(Debug)]
pub struct BroadcastReloadServer {
    tx: broadcast::Sender<ReloadEvent>,
    addr: SocketAddr,
    debounce: Duration,
    running: Mutex<Option<Running>>,
}

impl BroadcastReloadServer {
    pub const DEFAULT_PORT: u16 = 3000;

    pub fn new(debounce: Duration) -> Self {
        let (tx, _rx) = broadcast::channel(64);
        Self {
            tx,
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), Self::DEFAULT_PORT),
            debounce,
            running: Mutex::new(None),
        }
    }

    /// Listen on `addr` instead of `127.0.0.1:3000`. Port 0 picks a free port.
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }

    /// Address the server is listening on, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running
            .lock()
            .ok()
            .and_then(|r| r.as_ref().map(|r| r.local_addr))
    }

    pub fn is_started(&self) -> bool {
        self.local_addr().is_some()
    }

    fn watch_assets(&self, project_root: &Path, watched_assets: &[String]) -> Result<WatcherHandle> {
        let patterns = PatternSet::new(watched_assets)?;
        let changed = patterns.patterns().to_vec();
        let tx = self.tx.clone();

        spawn_watcher(
            project_root,
            vec![WatchRoute::new(patterns, ())],
            self.debounce,
            move |()| {
                let clients = tx.send(ReloadEvent::AssetsChanged(changed.clone())).unwrap_or(0);
                debug!(clients, "pushed asset change");
                true
            },
        )
    }
}

impl Default for BroadcastReloadServer {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl ReloadServer for BroadcastReloadServer {
    fn start(&self, project_root: &Path, root: &Path, watched_assets: &[String]) -> Result<()> {
        let mut slot = self
            .running
            .lock()
            .map_err(|_| anyhow::anyhow!("live-reload state poisoned"))?;
        if let Some(running) = slot.as_ref() {
            debug!(addr = %running.local_addr, "live-reload server already running");
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .context("live-reload server needs a tokio runtime")?;
        let _guard = runtime.enter();

        let listener = std::net::TcpListener::bind(self.addr)
            .with_context(|| format!("binding live-reload server to {}", self.addr))?;
        listener.set_nonblocking(true)?;
        let listener = tokio::net::TcpListener::from_std(listener)?;
        let local_addr = listener.local_addr()?;

        let app = router(root, self.tx.clone());
        let server = runtime.spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                warn!(%err, "live-reload server stopped");
            }
        });

        let watcher = if watched_assets.is_empty() {
            None
        } else {
            Some(self.watch_assets(project_root, watched_assets)?)
        };

        info!(
            url = %format!("http://{local_addr}"),
            ?root,
            files = ?watched_assets,
            "live-reload server listening"
        );

        *slot = Some(Running {
            local_addr,
            server,
            _watcher: watcher,
        });
        Ok(())
    }

    fn reload(&self) -> Result<usize> {
        // `send` only fails when nobody is subscribed.
        Ok(self.tx.send(ReloadEvent::Reload).unwrap_or(0))
    }
}

fn router(root: &Path, tx: broadcast::Sender<ReloadEvent>) -> Router {
    Router::new()
        .route(RELOAD_PATH, get(event_stream))
        .route(CLIENT_PATH, get(client_script))
        .fallback_service(ServeDir::new(root))
        .layer(axum::middleware::map_response(inject_into_html))
        .with_state(tx)
}

async fn event_stream(
    State(tx): State<broadcast::Sender<ReloadEvent>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = tx.subscribe();
    debug!(clients = tx.receiver_count(), "live-reload client connected");

    let events = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((Ok(event.to_sse()), rx)),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "live-reload client lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn client_script() -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, "text/javascript; charset=utf-8"),
            (CACHE_CONTROL, "no-cache"),
        ],
        CLIENT_JS,
    )
}

async fn inject_into_html(response: Response) -> Response {
    let is_html = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_INJECT_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(%err, "could not buffer page for script injection");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let page = inject_client(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(page))
}

/// Insert the client `<script>` before the last `</body>`, or append it.
pub fn inject_client(html: &str) -> String {
    let tag = format!(r#"<script src="{CLIENT_PATH}" async></script>"#);
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(at) => format!("{}{tag}{}", &html[..at], &html[at..]),
        None => format!("{html}{tag}"),
    }
}
