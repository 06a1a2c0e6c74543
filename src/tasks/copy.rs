// src/tasks/copy.rs

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::assets::{expand_sources, CopyEntry, CopyStats, IncrementalCopy};
use crate::fs::FileSystem;
use crate::registry::{Action, ActionContext, ActionFuture};

/// Copies matched sources to `dest`, skipping unchanged files unless the
/// filter is disabled.
#[derive(Debug, Clone)]
pub struct CopyAction {
    pub src: Vec<String>,
    pub base: Option<String>,
    pub dest: String,
    pub filter: IncrementalCopy,
}

impl CopyAction {
    fn copy_blocking(&self, fs: &dyn FileSystem, root: &Path) -> Result<CopyStats> {
        let dest = root.join(&self.dest);
        let entries: Vec<CopyEntry> = expand_sources(fs, root, self.base.as_deref(), &self.src)?
            .into_iter()
            .map(|src| CopyEntry::new(src.path, dest.join(&src.relative)))
            .collect();
        self.filter.run(fs, &entries)
    }
}

impl Action for CopyAction {
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            let this = self.clone();
            let fs = ctx.fs.clone();
            let root = ctx.root.clone();

            let stats = tokio::task::spawn_blocking(move || this.copy_blocking(fs.as_ref(), &root))
                .await
                .context("copy worker panicked")??;

            info!(
                dest = %self.dest,
                copied = stats.copied,
                skipped = stats.skipped,
                "copied files"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::engine::SessionHandle;
    use crate::fs::mock::MockFileSystem;
    use crate::services::Services;
    use crate::types::ChangeDetection;

    #[tokio::test]
    async fn copies_with_base_and_skips_unchanged() {
        let fs = MockFileSystem::new();
        fs.add_file("/s/pages/js/app.js", "js");
        fs.add_file("/s/pages/css/custom.css", "css");
        fs.add_file("/s/pages/index.html", "html");

        let ctx = ActionContext::new(
            "/s",
            Arc::new(fs.clone()),
            Services::with_defaults().unwrap(),
            SessionHandle::detached(),
        );
        let action = CopyAction {
            src: vec!["js/**".into(), "css/custom.css".into()],
            base: Some("pages".into()),
            dest: "dist".into(),
            filter: IncrementalCopy::new(ChangeDetection::Mtime),
        };

        action.run(&ctx).await.unwrap();
        assert_eq!(
            fs.writes(),
            vec![
                PathBuf::from("/s/dist/css/custom.css"),
                PathBuf::from("/s/dist/js/app.js"),
            ]
        );

        fs.clear_write_log();
        action.run(&ctx).await.unwrap();
        assert_eq!(fs.write_count(), 0);
    }
}
