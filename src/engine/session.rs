// src/engine/session.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::dag::{ExecutionNode, PlanBuilder};
use crate::errors::{Result, SitepipeError};
use crate::fs::FileSystem;
use crate::registry::{ActionContext, TaskRegistry};
use crate::services::Services;
use crate::watch::WatcherHandle;

use super::executor::Executor;
use super::queue::TriggerQueue;
use super::report::RunReport;
use super::{RuntimeEvent, Trigger};

/// Cloneable sender into a [`Session`].
///
/// Every method returns `false` once the session is gone.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<RuntimeEvent>,
}

impl SessionHandle {
    /// A handle that is not connected to any session.
    pub fn detached() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }

    pub fn trigger(&self, trigger: Trigger) -> bool {
        self.send(RuntimeEvent::TaskTriggered(trigger))
    }

    pub fn shutdown(&self) -> bool {
        self.send(RuntimeEvent::ShutdownRequested)
    }

    /// Hand a running watcher to the session, which keeps it alive and
    /// switches into watch mode after the current run.
    pub fn attach_watcher(&self, watcher: WatcherHandle) -> bool {
        self.send(RuntimeEvent::WatchStarted(watcher))
    }

    fn send(&self, event: RuntimeEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// One build session: owns the registry, the action context and the runtime
/// event channel.
///
/// A session either runs a single task and returns, or (once a watcher has
/// been attached) keeps serving triggers until shutdown is requested.
pub struct Session {
    registry: Arc<TaskRegistry>,
    ctx: ActionContext,
    event_rx: mpsc::UnboundedReceiver<RuntimeEvent>,
    watchers: Vec<WatcherHandle>,
    queue: TriggerQueue,
    shutdown: bool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("registry", &self.registry)
            .field("root", &self.ctx.root)
            .field("watchers", &self.watchers.len())
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(
        registry: TaskRegistry,
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        services: Services,
    ) -> Self {
        let (tx, event_rx) = mpsc::unbounded_channel();
        let handle = SessionHandle { tx };
        let ctx = ActionContext::new(root, fs, services, handle);

        Self {
            registry: Arc::new(registry),
            ctx,
            event_rx,
            watchers: Vec::new(),
            queue: TriggerQueue::new(),
            shutdown: false,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.ctx.session.clone()
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Build the execution plan for `task` without running anything.
    pub fn plan(&self, task: &str) -> Result<ExecutionNode> {
        PlanBuilder::new(&self.registry).build(task)
    }

    /// Plan and execute `task` once.
    ///
    /// Configuration errors (unknown task, cycle) are returned before any
    /// action runs; action failures are reported in the [`RunReport`].
    pub async fn invoke(&self, task: &str) -> Result<RunReport> {
        let plan = self.plan(task)?;
        Ok(Executor::new(self.ctx.clone()).run(&plan).await)
    }

    /// Run `task`; if it started a watcher, keep serving triggers until
    /// shutdown.
    ///
    /// Without a watcher the result reflects the run (an `ActionFailure` for
    /// the first failed task). In watch mode action failures are only logged
    /// and the session ends with `Ok` once shutdown is requested.
    pub async fn run(mut self, task: &str) -> Result<RunReport> {
        let report = self.invoke(task).await?;
        self.absorb_pending();

        if self.watchers.is_empty() {
            return report.into_result();
        }

        if !report.succeeded() {
            error!(
                task,
                failed = ?report.failed_tasks(),
                "initial build failed; continuing to watch"
            );
        }

        if self.shutdown {
            return Ok(report);
        }

        info!("Now watching files for changes...");
        self.watch_loop().await;
        Ok(report)
    }

    async fn watch_loop(&mut self) {
        loop {
            if self.shutdown {
                break;
            }

            let trigger = match self.queue.pop() {
                Some(trigger) => trigger,
                None => match self.event_rx.recv().await {
                    Some(event) => {
                        self.absorb(event);
                        continue;
                    }
                    None => {
                        info!("runtime event channel closed; exiting");
                        break;
                    }
                },
            };

            self.run_triggered(trigger).await;
            self.absorb_pending();
        }

        info!(watchers = self.watchers.len(), "watch session finished");
    }

    async fn run_triggered(&self, trigger: Trigger) {
        info!(task = %trigger.task, reason = ?trigger.reason, "change detected; running task");

        match self.invoke(&trigger.task).await {
            Ok(report) if report.succeeded() => {
                if trigger.reload {
                    self.notify_reload(&trigger.task);
                }
            }
            Ok(report) => {
                error!(
                    task = %trigger.task,
                    failed = ?report.failed_tasks(),
                    "triggered build failed; still watching"
                );
            }
            Err(err) => {
                error!(task = %trigger.task, error = %err, "could not run triggered task");
            }
        }
    }

    fn notify_reload(&self, task: &str) {
        match self.ctx.services.reload.reload() {
            Ok(clients) => info!(task, clients, "reloaded browsers"),
            Err(err) => {
                let warning = SitepipeError::CollaboratorWarning {
                    collaborator: "live-reload".to_string(),
                    message: format!("{err:#}"),
                };
                warn!(task, "{warning}");
            }
        }
    }

    /// Drain events that are already waiting without blocking.
    fn absorb_pending(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.absorb(event);
        }
    }

    fn absorb(&mut self, event: RuntimeEvent) {
        match event {
            RuntimeEvent::TaskTriggered(trigger) => {
                if self.shutdown {
                    debug!(task = %trigger.task, "ignoring trigger after shutdown request");
                } else {
                    self.queue.push(trigger);
                }
            }
            RuntimeEvent::WatchStarted(watcher) => {
                debug!("watcher attached to session");
                self.watchers.push(watcher);
            }
            RuntimeEvent::ShutdownRequested => {
                let dropped = self.queue.clear();
                info!(dropped, "shutdown requested");
                self.shutdown = true;
            }
        }
    }
}
