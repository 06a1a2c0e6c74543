// src/services/style.rs

//! Stylesheet compiler collaborator.

use std::fmt::Debug;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{anyhow, bail, Context, Result};
use tokio::process::Command;
use tracing::debug;

use crate::types::OutputStyle;

pub type CompileFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

/// Options passed through to the compiler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub output_style: OutputStyle,
    /// Extra directories searched for imports, absolute.
    pub include_paths: Vec<PathBuf>,
}

/// Compiles one stylesheet entry point to CSS.
///
/// `path` is the entry point on disk and `source` its contents as read through
/// the build's filesystem. An error means "this file did not compile"; the
/// caller decides whether that is fatal.
pub trait StyleCompiler: Send + Sync + Debug {
    fn compile<'a>(
        &'a self,
        path: &'a Path,
        source: &'a str,
        options: &'a CompileOptions,
    ) -> CompileFuture<'a>;
}

/// Runs an external compiler (`sass` by default) and captures stdout.
///
/// Invocation: `<program> <args..> --style=<style> --load-path=<dir>.. <file>`.
#[derive(Debug, Clone)]
pub struct CommandStyleCompiler {
    program: String,
    args: Vec<String>,
}

impl CommandStyleCompiler {
    /// `command` is the program followed by any leading arguments.
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| anyhow!("style compiler command is empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn command_for(&self, path: &Path, options: &CompileOptions) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(format!("--style={}", options.output_style.as_str()));
        for dir in &options.include_paths {
            cmd.arg(format!("--load-path={}", dir.display()));
        }
        cmd.arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for CommandStyleCompiler {
    fn default() -> Self {
        Self {
            program: "sass".to_string(),
            args: Vec::new(),
        }
    }
}

impl StyleCompiler for CommandStyleCompiler {
    fn compile<'a>(
        &'a self,
        path: &'a Path,
        _source: &'a str,
        options: &'a CompileOptions,
    ) -> CompileFuture<'a> {
        Box::pin(async move {
            debug!(program = %self.program, ?path, style = options.output_style.as_str(), "compiling stylesheet");

            let output = self
                .command_for(path, options)
                .output()
                .await
                .with_context(|| format!("spawning style compiler '{}'", self.program))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                bail!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    stderr.trim()
                );
            }

            String::from_utf8(output.stdout)
                .with_context(|| format!("style compiler output for {:?} is not UTF-8", path))
        })
    }
}
