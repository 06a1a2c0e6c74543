// src/tasks/vendor.rs

use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::assets::{CopyEntry, IncrementalCopy};
use crate::registry::{Action, ActionContext, ActionFuture};
use crate::services::VendorOptions;

/// Copies the distributable files of every declared dependency under `dest`.
///
/// Always copies; there is no change filter for vendored files.
#[derive(Debug, Clone)]
pub struct VendorAction {
    pub manifest: String,
    pub dest: String,
    pub options: VendorOptions,
}

impl Action for VendorAction {
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            let this = self.clone();
            let fs = ctx.fs.clone();
            let resolver = ctx.services.vendor.clone();
            let root = ctx.root.clone();

            let stats = tokio::task::spawn_blocking(move || {
                let files = resolver.list_dependency_files(
                    fs.as_ref(),
                    &root,
                    Path::new(&this.manifest),
                    &this.options,
                )?;
                let dest = root.join(&this.dest);
                let entries: Vec<CopyEntry> = files
                    .into_iter()
                    .map(|f| CopyEntry::new(f.source, dest.join(&f.relative)))
                    .collect();
                IncrementalCopy::always().run(fs.as_ref(), &entries)
            })
            .await
            .context("vendor worker panicked")??;

            info!(dest = %self.dest, files = stats.copied, "vendored dependencies");
            Ok(())
        })
    }
}
