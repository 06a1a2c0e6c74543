use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use sitepipe::registry::{action_fn, Action};
use sitepipe::services::style::CompileFuture;
use sitepipe::services::{CompileOptions, ReloadServer, Services, StyleCompiler};

/// Shared, ordered log of what fake actions did.
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|e| *e == event).count()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events.lock().unwrap().iter().position(|e| e == event)
    }
}

/// Action that records `name` and succeeds.
pub fn recording(log: &ActionLog, name: &str) -> Arc<dyn Action> {
    let log = log.clone();
    let name = name.to_string();
    action_fn(move |_ctx| {
        let log = log.clone();
        let name = name.clone();
        async move {
            log.push(name);
            Ok(())
        }
    })
}

/// Action that records `name` and fails.
pub fn failing(log: &ActionLog, name: &str) -> Arc<dyn Action> {
    let log = log.clone();
    let name = name.to_string();
    action_fn(move |_ctx| {
        let log = log.clone();
        let name = name.clone();
        async move {
            log.push(name.clone());
            Err(anyhow!("{name} failed"))
        }
    })
}

/// Action that sleeps for `delay`, then records `name` and succeeds.
pub fn delayed(log: &ActionLog, name: &str, delay: Duration) -> Arc<dyn Action> {
    let log = log.clone();
    let name = name.to_string();
    action_fn(move |_ctx| {
        let log = log.clone();
        let name = name.clone();
        async move {
            tokio::time::sleep(delay).await;
            log.push(name);
            Ok(())
        }
    })
}

/// Reload hub that only counts calls.
#[derive(Debug, Default)]
pub struct RecordingReload {
    starts: AtomicUsize,
    reloads: AtomicUsize,
    fail: bool,
}

impl RecordingReload {
    /// A hub whose `reload` always errors.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

impl ReloadServer for RecordingReload {
    fn start(&self, _project_root: &Path, _root: &Path, _watched: &[String]) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn reload(&self) -> Result<usize> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("browser connection refused"));
        }
        Ok(1)
    }
}

/// Compiler that prefixes the source with a marker comment.
///
/// Sources containing `@error` fail to compile.
#[derive(Debug, Default)]
pub struct FakeStyleCompiler {
    compiled: Mutex<Vec<PathBuf>>,
}

impl FakeStyleCompiler {
    pub fn compiled(&self) -> Vec<PathBuf> {
        self.compiled.lock().unwrap().clone()
    }
}

impl StyleCompiler for FakeStyleCompiler {
    fn compile<'a>(
        &'a self,
        path: &'a Path,
        source: &'a str,
        options: &'a CompileOptions,
    ) -> CompileFuture<'a> {
        Box::pin(async move {
            self.compiled.lock().unwrap().push(path.to_path_buf());
            if source.contains("@error") {
                return Err(anyhow!("{}: @error directive", path.display()));
            }
            Ok(format!(
                "/* compiled ({}) */\n{source}",
                options.output_style.as_str()
            ))
        })
    }
}

/// Default services with the fakes plugged in, plus handles to inspect them.
pub struct FakeServices {
    pub services: Services,
    pub reload: Arc<RecordingReload>,
    pub style: Arc<FakeStyleCompiler>,
}

pub fn fake_services() -> FakeServices {
    fake_services_with_reload(RecordingReload::default())
}

pub fn fake_services_with_reload(reload: RecordingReload) -> FakeServices {
    let reload = Arc::new(reload);
    let style = Arc::new(FakeStyleCompiler::default());
    let services = Services::with_defaults()
        .expect("default services")
        .with_style(style.clone())
        .with_reload(reload.clone());
    FakeServices {
        services,
        reload,
        style,
    }
}
