// src/registry/action.rs

//! The unit of work behind a task.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use crate::engine::SessionHandle;
use crate::fs::FileSystem;
use crate::services::Services;

/// Future returned by [`Action::run`].
pub type ActionFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// An asynchronous unit of build work.
///
/// The returned future resolving to `Ok(())` is the task's success signal; an
/// error is the failure signal and is attributed to the task by the executor.
pub trait Action: Send + Sync {
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> ActionFuture<'a>;
}

/// Everything an action may touch while it runs.
#[derive(Clone)]
pub struct ActionContext {
    /// Project root; relative paths in the config resolve against it.
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub services: Services,
    pub session: SessionHandle,
}

impl fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContext")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl ActionContext {
    pub fn new(
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        services: Services,
        session: SessionHandle,
    ) -> Self {
        Self {
            root: root.into(),
            fs,
            services,
            session,
        }
    }

    /// Resolve a config-relative path against the project root.
    pub fn resolve(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }
}

/// Adapter that turns an async closure into an [`Action`].
pub struct FnAction<F> {
    f: F,
}

impl<F, Fut> Action for FnAction<F>
where
    F: Fn(ActionContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin((self.f)(ctx.clone()))
    }
}

/// Wrap a closure returning a future as a shareable action.
///
/// ```ignore
/// registry.register("hello", action_fn(|_ctx| async { Ok(()) }), vec![])?;
/// ```
pub fn action_fn<F, Fut>(f: F) -> Arc<dyn Action>
where
    F: Fn(ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnAction { f })
}
