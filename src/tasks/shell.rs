// src/tasks/shell.rs

//! Arbitrary shell command as a task.

use std::process::Stdio;

use anyhow::{bail, Context};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::registry::{Action, ActionContext, ActionFuture};

/// Runs `cmd` through the platform shell in the project root.
///
/// stdout lines are logged at `info`, stderr at `debug`. A non-zero exit
/// fails the task.
#[derive(Debug, Clone)]
pub struct ShellAction {
    pub task: String,
    pub cmd: String,
}

impl ShellAction {
    fn command(&self) -> Command {
        // Build a shell command appropriate for the platform.
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        }
    }
}

impl Action for ShellAction {
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> ActionFuture<'a> {
        Box::pin(async move {
            info!(task = %self.task, cmd = %self.cmd, "starting shell command");

            let mut cmd = self.command();
            cmd.current_dir(&ctx.root)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let mut child = cmd
                .spawn()
                .with_context(|| format!("spawning process for task '{}'", self.task))?;

            let stdout_pump = child.stdout.take().map(|stdout| {
                let task = self.task.clone();
                tokio::spawn(async move {
                    let mut lines = BufReader::new(stdout).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        info!(task = %task, "{line}");
                    }
                })
            });

            // Always consume stderr so buffers don't fill.
            let stderr_pump = child.stderr.take().map(|stderr| {
                let task = self.task.clone();
                tokio::spawn(async move {
                    let mut lines = BufReader::new(stderr).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        debug!(task = %task, "stderr: {line}");
                    }
                })
            });

            let status = child
                .wait()
                .await
                .with_context(|| format!("waiting for process of task '{}'", self.task))?;

            for pump in [stdout_pump, stderr_pump].into_iter().flatten() {
                let _ = pump.await;
            }

            let code = status.code().unwrap_or(-1);
            debug!(task = %self.task, exit_code = code, "shell command exited");
            if !status.success() {
                bail!("command `{}` exited with code {code}", self.cmd);
            }
            Ok(())
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine::SessionHandle;
    use crate::fs::RealFileSystem;
    use crate::services::Services;

    fn ctx(root: &std::path::Path) -> ActionContext {
        ActionContext::new(
            root,
            Arc::new(RealFileSystem),
            Services::with_defaults().unwrap(),
            SessionHandle::detached(),
        )
    }

    #[tokio::test]
    async fn runs_in_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let action = ShellAction {
            task: "touch".into(),
            cmd: "echo hi > marker.txt".into(),
        };
        action.run(&ctx(dir.path())).await.unwrap();
        assert!(dir.path().join("marker.txt").exists());
    }

    #[tokio::test]
    async fn non_zero_exit_fails() {
        let dir = tempfile::tempdir().unwrap();
        let action = ShellAction {
            task: "fail".into(),
            cmd: "exit 3".into(),
        };
        let err = action.run(&ctx(dir.path())).await.unwrap_err();
        assert!(err.to_string().contains("code 3"));
    }
}
