// src/tasks/style.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::assets::{expand_sources, SourceFile};
use crate::config::StyleSection;
use crate::errors::SitepipeError;
use crate::fs::FileSystem;
use crate::registry::{Action, ActionContext, ActionFuture};
use crate::services::{source_map, CompileOptions};
use crate::types::StyleProfile;

/// Compiles stylesheet entry points into `dest`.
///
/// - `Dev`: `<stem>.css` straight from the compiler.
/// - `Build`: prefixed `<stem>.css`, then minified `<stem>.min.css` with a
///   `<stem>.min.css.map` next to it when source maps are enabled.
///
/// A file that fails to compile is logged and skipped; the task still
/// succeeds.
#[derive(Debug, Clone)]
pub struct StyleAction {
    pub src: Vec<String>,
    pub dest: String,
    pub profile: StyleProfile,
    pub style: StyleSection,
}

/// `_name.scss` files are only ever imported.
fn is_partial(relative: &str) -> bool {
    relative
        .rsplit('/')
        .next()
        .is_some_and(|name| name.starts_with('_'))
}

/// Runs a filesystem call on the blocking pool.
async fn with_fs<T, F>(ctx: &ActionContext, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn FileSystem) -> Result<T> + Send + 'static,
{
    let fs = ctx.fs.clone();
    tokio::task::spawn_blocking(move || f(fs.as_ref()))
        .await
        .context("style fs worker panicked")?
}

async fn write_file(ctx: &ActionContext, path: PathBuf, contents: String) -> Result<()> {
    with_fs(ctx, move |fs| fs.write(&path, contents.as_bytes())).await
}

impl StyleAction {
    fn options(&self, ctx: &ActionContext) -> CompileOptions {
        CompileOptions {
            output_style: self.style.output_style,
            include_paths: self.style.include_paths.iter().map(|p| ctx.resolve(p)).collect(),
        }
    }

    async fn build_one(
        &self,
        ctx: &ActionContext,
        src: &SourceFile,
        options: &CompileOptions,
    ) -> Result<bool> {
        let path = src.path.clone();
        let source = with_fs(ctx, move |fs| fs.read_to_string(&path)).await?;

        let css = match ctx.services.style.compile(&src.path, &source, options).await {
            Ok(css) => css,
            Err(err) => {
                let warning = SitepipeError::CollaboratorWarning {
                    collaborator: "style compiler".to_string(),
                    message: format!("{}: {err:#}", src.relative),
                };
                warn!(file = %src.relative, "{warning}");
                return Ok(false);
            }
        };

        let dest_dir = ctx.resolve(&self.dest);
        let css_rel = Path::new(&src.relative).with_extension("css");
        let css_path = dest_dir.join(&css_rel);

        if self.profile == StyleProfile::Dev {
            write_file(ctx, css_path.clone(), css).await?;
            debug!(out = ?css_path, "wrote stylesheet");
            return Ok(true);
        }

        let prefixed = ctx
            .services
            .prefixer
            .transform(&css)
            .await
            .with_context(|| format!("prefixing {}", src.relative))?;
        write_file(ctx, css_path, prefixed.clone()).await?;

        if !self.style.minify {
            return Ok(true);
        }

        let mut minified = ctx
            .services
            .minifier
            .transform(&prefixed)
            .await
            .with_context(|| format!("minifying {}", src.relative))?;

        let min_rel = Path::new(&src.relative).with_extension("min.css");
        let min_path = dest_dir.join(&min_rel);
        let min_name = min_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if self.style.source_maps {
            let map_name = format!("{min_name}.map");
            let map = source_map::render(&min_name, &[(src.relative.clone(), source)])?;
            write_file(ctx, min_path.with_file_name(&map_name), map).await?;
            minified = source_map::with_mapping_url(&minified, &map_name);
        }

        write_file(ctx, min_path.clone(), minified).await?;
        debug!(out = ?min_path, "wrote minified stylesheet");
        Ok(true)
    }
}

impl Action for StyleAction {
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            let root = ctx.root.clone();
            let patterns = self.src.clone();
            let sources =
                with_fs(ctx, move |fs| expand_sources(fs, &root, None, &patterns)).await?;
            let options = self.options(ctx);

            let mut compiled = 0usize;
            let mut skipped = 0usize;
            for src in sources.iter().filter(|s| !is_partial(&s.relative)) {
                if self.build_one(ctx, src, &options).await? {
                    compiled += 1;
                } else {
                    skipped += 1;
                }
            }

            info!(
                dest = %self.dest,
                profile = ?self.profile,
                compiled,
                skipped,
                "compiled stylesheets"
            );
            Ok(())
        })
    }
}
