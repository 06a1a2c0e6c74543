// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::watch::debounce::Debouncer;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchRoute;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` and the event loop alive.
/// Dropping this handle stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    event_loop: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.event_loop.abort();
    }
}

/// Spawn a filesystem watcher that observes `root` recursively.
///
/// Each changed path is made relative to `root` and matched against every
/// route. Matching routes are debounced per route with `window`; when a route
/// fires, `emit` is called with a clone of its payload. If `emit` returns
/// `false` (receiver gone) the event loop stops.
pub fn spawn_watcher<T, F>(
    root: impl Into<PathBuf>,
    routes: Vec<WatchRoute<T>>,
    window: Duration,
    emit: F,
) -> Result<WatcherHandle>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(T) -> bool + Send + 'static,
{
    let root = root.into();
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    // Channel from the blocking notify callback into the async world.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // We can't log via tracing here easily, so fallback to stderr.
                    eprintln!("sitepipe: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("sitepipe: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!(root = ?root, routes = routes.len(), "file watcher started");

    let event_loop = tokio::spawn(run_event_loop(root, Arc::new(routes), window, event_rx, emit));

    Ok(WatcherHandle {
        _inner: watcher,
        event_loop,
    })
}

/// Consume notify events until the channel closes or `emit` reports the
/// receiver is gone.
///
/// Public so the debounce behaviour can be exercised with synthetic events.
pub async fn run_event_loop<T, F>(
    root: PathBuf,
    routes: Arc<Vec<WatchRoute<T>>>,
    window: Duration,
    mut event_rx: mpsc::UnboundedReceiver<Event>,
    emit: F,
) where
    T: Clone + Send + Sync + 'static,
    F: Fn(T) -> bool + Send + 'static,
{
    let mut debouncer = Debouncer::new(window);

    loop {
        let deadline = debouncer.next_deadline();

        tokio::select! {
            maybe_event = event_rx.recv() => {
                let Some(event) = maybe_event else {
                    break;
                };
                record_event(&root, &routes, &event, &mut debouncer);
            }
            _ = sleep_until_deadline(deadline), if deadline.is_some() => {
                for idx in debouncer.take_due(Instant::now()) {
                    let route = &routes[idx];
                    debug!(route = idx, patterns = ?route.patterns.patterns(), "debounced change; firing route");
                    if !emit(route.payload.clone()) {
                        warn!("watch receiver closed; stopping watcher event loop");
                        return;
                    }
                }
            }
        }
    }

    debug!("watcher event loop finished");
}

fn record_event<T>(
    root: &Path,
    routes: &[WatchRoute<T>],
    event: &Event,
    debouncer: &mut Debouncer,
) {
    // Reads (including our own copies reading sources) must not retrigger.
    if matches!(event.kind, EventKind::Access(_)) {
        return;
    }

    let now = Instant::now();
    for path in &event.paths {
        let Some(rel) = relative_str(root, path) else {
            debug!(?path, "event path outside watch root; ignoring");
            continue;
        };

        for (idx, route) in routes.iter().enumerate() {
            if route.matches(&rel) {
                debug!(path = %rel, route = idx, "watch match");
                debouncer.record(idx, now);
            }
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    if let Some(deadline) = deadline {
        tokio::time::sleep_until(deadline).await;
    }
}
