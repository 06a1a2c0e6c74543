// src/services/mod.rs

//! External collaborators used by the built-in actions.
//!
//! Each collaborator sits behind a trait so tests can substitute fakes; the
//! production implementations shell out to external tools or run in-process.

pub mod reload;
pub mod source_map;
pub mod style;
pub mod transform;
pub mod vendor;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::ConfigFile;

pub use reload::{BroadcastReloadServer, ReloadEvent, ReloadServer};
pub use style::{CommandStyleCompiler, CompileOptions, StyleCompiler};
pub use transform::{CommandTransform, CssMinifier, PassThrough, Transform};
pub use vendor::{NpmDistResolver, VendorFile, VendorOptions, VendorResolver};

/// Bundle of collaborators shared by every action in a session.
#[derive(Debug, Clone)]
pub struct Services {
    pub style: Arc<dyn StyleCompiler>,
    pub prefixer: Arc<dyn Transform>,
    pub minifier: Arc<dyn Transform>,
    pub reload: Arc<dyn ReloadServer>,
    pub vendor: Arc<dyn VendorResolver>,
}

impl Services {
    /// `sass` compiler, no prefixer, built-in minifier, live-reload server on
/// `127.0.0.1:3000`.
    pub fn with_defaults() -> Result<Self> {
        Ok(Self {
            style: Arc::new(CommandStyleCompiler::default()),
            prefixer: Arc::new(PassThrough),
            minifier: Arc::new(CssMinifier::new()?),
            reload: Arc::new(BroadcastReloadServer::default()),
            vendor: Arc::new(NpmDistResolver),
        })
    }

    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let prefixer: Arc<dyn Transform> = if cfg.style.prefixer.is_empty() {
            Arc::new(PassThrough)
        } else {
            Arc::new(CommandTransform::new(&cfg.style.prefixer)?)
        };

        Ok(Self {
            style: Arc::new(CommandStyleCompiler::new(&cfg.style.compiler)?),
            prefixer,
            minifier: Arc::new(CssMinifier::new()?),
            reload: Arc::new(
                BroadcastReloadServer::new(Duration::from_millis(cfg.config.debounce_ms))
                    .with_addr(cfg.serve.socket_addr()),
            ),
            vendor: Arc::new(NpmDistResolver),
        })
    }

    pub fn with_style(mut self, style: Arc<dyn StyleCompiler>) -> Self {
        self.style = style;
        self
    }

    pub fn with_prefixer(mut self, prefixer: Arc<dyn Transform>) -> Self {
        self.prefixer = prefixer;
        self
    }

    pub fn with_reload(mut self, reload: Arc<dyn ReloadServer>) -> Self {
        self.reload = reload;
        self
    }

    pub fn with_vendor(mut self, vendor: Arc<dyn VendorResolver>) -> Self {
        self.vendor = vendor;
        self
    }
}
