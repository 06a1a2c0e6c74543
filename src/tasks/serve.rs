// src/tasks/serve.rs

use tracing::info;

use crate::config::ServeSection;
use crate::registry::{Action, ActionContext, ActionFuture};

/// Starts the live-reload HTTP server over the output directory.
#[derive(Debug, Clone)]
pub struct ServeAction {
    pub serve: ServeSection,
}

impl Action for ServeAction {
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            if !self.serve.enabled {
                info!("live reload disabled; skipping serve");
                return Ok(());
            }

            let base = ctx.resolve(&self.serve.base_dir);
            ctx.services
                .reload
                .start(&ctx.root, &base, &self.serve.files)?;
            Ok(())
        })
    }
}
