// src/tasks/watch.rs

use std::time::Duration;

use tracing::{info, warn};

use crate::engine::Trigger;
use crate::registry::{Action, ActionContext, ActionFuture};
use crate::watch::{spawn_watcher, WatchBinding};

/// Starts the file watcher for every `[[watch]]` binding and hands it to the
/// session, which then keeps running after the current plan finishes.
#[derive(Debug, Clone)]
pub struct WatchAction {
    pub bindings: Vec<WatchBinding>,
    pub debounce: Duration,
}

impl Action for WatchAction {
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            if self.bindings.is_empty() {
                warn!("no [[watch]] bindings configured; nothing to watch");
                return Ok(());
            }

            let session = ctx.session.clone();
            let handle = spawn_watcher(
                ctx.root.clone(),
                self.bindings.clone(),
                self.debounce,
                move |trigger: Trigger| {
                    info!(task = %trigger.task, "file change detected");
                    session.trigger(trigger)
                },
            )?;

            if !ctx.session.attach_watcher(handle) {
                warn!("no session to attach the watcher to; watching stopped");
            }
            Ok(())
        })
    }
}
