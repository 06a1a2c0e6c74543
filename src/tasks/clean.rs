// src/tasks/clean.rs

use anyhow::Context;
use tracing::info;

use crate::registry::{Action, ActionContext, ActionFuture};

/// Empties the output directory, keeping the directory itself.
#[derive(Debug, Clone)]
pub struct CleanAction {
    pub target: String,
}

impl Action for CleanAction {
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            let target = ctx.resolve(&self.target);
            let fs = ctx.fs.clone();
            let path = target.clone();

            tokio::task::spawn_blocking(move || fs.clear_dir(&path))
                .await
                .context("clean worker panicked")??;

            info!(target = ?target, "cleaned output directory");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::engine::SessionHandle;
    use crate::fs::mock::MockFileSystem;
    use crate::fs::FileSystem;
    use crate::services::Services;

    #[tokio::test]
    async fn empties_target_but_keeps_sources() {
        let fs = MockFileSystem::new();
        fs.add_file("/s/dist/index.html", "old");
        fs.add_file("/s/dist/css/style.css", "old");
        fs.add_file("/s/pages/index.html", "new");

        let ctx = ActionContext::new(
            "/s",
            Arc::new(fs.clone()),
            Services::with_defaults().unwrap(),
            SessionHandle::detached(),
        );
        CleanAction {
            target: "dist".into(),
        }
        .run(&ctx)
        .await
        .unwrap();

        assert_eq!(fs.files(), vec![Path::new("/s/pages/index.html").to_path_buf()]);
        assert!(fs.is_dir(Path::new("/s/dist")));
    }
}
