// tests/watch_debounce.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::{AccessKind, ModifyKind};
use notify::{Event, EventKind};
use sitepipe::watch::{run_event_loop, PatternSet, WatchRoute};
use sitepipe_test_utils::{init_tracing, with_timeout};
use tokio::sync::mpsc;

const WINDOW: Duration = Duration::from_millis(50);

fn modify(root: &Path, rel: &str) -> Event {
    Event::new(EventKind::Modify(ModifyKind::Any)).add_path(root.join(rel))
}

fn routes() -> Arc<Vec<WatchRoute<&'static str>>> {
    Arc::new(vec![
        WatchRoute::new(PatternSet::new(&["scss/**/*.scss"]).unwrap(), "sass-dev"),
        WatchRoute::new(PatternSet::new(&["pages/*.html"]).unwrap(), "html"),
    ])
}

/// Spawn the event loop and return the event sender, the emitted-payload
/// receiver and the loop handle.
fn start(
    root: PathBuf,
) -> (
    mpsc::UnboundedSender<Event>,
    mpsc::UnboundedReceiver<&'static str>,
    tokio::task::JoinHandle<()>,
) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (emit_tx, emit_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run_event_loop(
        root,
        routes(),
        WINDOW,
        event_rx,
        move |task| emit_tx.send(task).is_ok(),
    ));
    (event_tx, emit_rx, handle)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<&'static str>) -> Vec<&'static str> {
    let mut out = Vec::new();
    while let Ok(task) = rx.try_recv() {
        out.push(task);
    }
    out
}

#[tokio::test]
async fn burst_of_changes_fires_once() {
    with_timeout(async {
        init_tracing();
        let root = PathBuf::from("/site");
        let (tx, mut emitted, handle) = start(root.clone());

        for i in 0..5 {
            tx.send(modify(&root, &format!("scss/partials/_p{i}.scss"))).unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(WINDOW * 4).await;

        assert_eq!(drain(&mut emitted), vec!["sass-dev"]);

        drop(tx);
        handle.await.unwrap();
    })
    .await;
}

#[tokio::test]
async fn repeated_saves_of_one_file_fire_once() {
    with_timeout(async {
        init_tracing();
        let root = PathBuf::from("/site");
        let (tx, mut emitted, handle) = start(root.clone());

        for _ in 0..6 {
            tx.send(modify(&root, "scss/style.default.scss")).unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(WINDOW * 4).await;

        assert_eq!(drain(&mut emitted), vec!["sass-dev"]);

        drop(tx);
        handle.await.unwrap();
    })
    .await;
}

#[tokio::test]
async fn separate_bursts_fire_separately() {
    with_timeout(async {
        init_tracing();
        let root = PathBuf::from("/site");
        let (tx, mut emitted, handle) = start(root.clone());

        tx.send(modify(&root, "pages/index.html")).unwrap();
        tokio::time::sleep(WINDOW * 4).await;
        tx.send(modify(&root, "pages/about.html")).unwrap();
        tokio::time::sleep(WINDOW * 4).await;

        assert_eq!(drain(&mut emitted), vec!["html", "html"]);

        drop(tx);
        handle.await.unwrap();
    })
    .await;
}

#[tokio::test]
async fn routes_are_debounced_independently() {
    with_timeout(async {
        init_tracing();
        let root = PathBuf::from("/site");
        let (tx, mut emitted, handle) = start(root.clone());

        tx.send(modify(&root, "scss/style.default.scss")).unwrap();
        tx.send(modify(&root, "pages/index.html")).unwrap();
        tokio::time::sleep(WINDOW * 4).await;

        let mut fired = drain(&mut emitted);
        fired.sort();
        assert_eq!(fired, vec!["html", "sass-dev"]);

        drop(tx);
        handle.await.unwrap();
    })
    .await;
}

#[tokio::test]
async fn unmatched_reads_and_outside_paths_are_ignored() {
    with_timeout(async {
        init_tracing();
        let root = PathBuf::from("/site");
        let (tx, mut emitted, handle) = start(root.clone());

        tx.send(modify(&root, "dist/css/style.default.css")).unwrap();
        tx.send(
            Event::new(EventKind::Access(AccessKind::Any)).add_path(root.join("pages/index.html")),
        )
        .unwrap();
        tx.send(modify(Path::new("/elsewhere"), "pages/index.html")).unwrap();
        tokio::time::sleep(WINDOW * 4).await;

        assert!(drain(&mut emitted).is_empty());

        drop(tx);
        handle.await.unwrap();
    })
    .await;
}

#[tokio::test]
async fn loop_stops_when_receiver_is_gone() {
    with_timeout(async {
        init_tracing();
        let root = PathBuf::from("/site");
        let (tx, emitted, handle) = start(root.clone());
        drop(emitted);

        tx.send(modify(&root, "pages/index.html")).unwrap();
        handle.await.unwrap();
    })
    .await;
}
