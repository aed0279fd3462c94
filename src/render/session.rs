//! Renderer child process.
//!
//! [`CommandLauncher`] clears the output directory, then spawns the
//! configured render command (by default `node render.mjs` inside
//! `motion-canvas/`) as the leader of a new process group, so teardown also
//! reaches the browser processes it spawns.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use command_group::{AsyncCommandGroup, AsyncGroupChild};
use tokio::process::Command;

use crate::config::RenderConfig;

use super::frames::reset_dir;
use super::watcher::{RenderLauncher, RenderProcess};
use super::RenderError;

// ---------------------------------------------------------------------------
// RenderCommand
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl RenderCommand {
    /// Relative working directories are resolved against `root`.
    pub fn from_config(config: &RenderConfig, root: &Path) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            working_dir: root.join(&config.working_dir),
        }
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ---------------------------------------------------------------------------
// CommandLauncher
// ---------------------------------------------------------------------------

pub struct CommandLauncher {
    command: RenderCommand,
    output_dir: PathBuf,
}

impl CommandLauncher {
    pub fn new(command: RenderCommand, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(config: &RenderConfig, root: &Path) -> Self {
        Self::new(
            RenderCommand::from_config(config, root),
            root.join(&config.output_dir),
        )
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl RenderLauncher for CommandLauncher {
    async fn launch(&self) -> Result<Box<dyn RenderProcess>, RenderError> {
        // Stale frames from a previous run would satisfy the watcher early.
        reset_dir(&self.output_dir)?;

        let mut command = Command::new(&self.command.program);
        command
            .args(&self.command.args)
            .current_dir(&self.command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let child = command.group_spawn().map_err(|e| {
            RenderError::Launch(format!("{}: {e}", self.command.display()))
        })?;

        log::info!(
            "render: launched `{}` in {} (pid {:?})",
            self.command.display(),
            self.command.working_dir.display(),
            child.id()
        );
        Ok(Box::new(RenderSession::new(child)))
    }
}

// ---------------------------------------------------------------------------
// RenderSession
// ---------------------------------------------------------------------------

/// A spawned renderer and the process group it leads.
///
/// The group id is captured at spawn; it stays valid for teardown after the
/// leader has been reaped while helpers it forked keep running.
pub struct RenderSession {
    child: AsyncGroupChild,
    group: Option<u32>,
    torn_down: bool,
}

impl RenderSession {
    pub fn new(child: AsyncGroupChild) -> Self {
        let group = child.id();
        Self {
            child,
            group,
            torn_down: false,
        }
    }

    /// SIGKILL the whole group.  `true` when nothing in it can still be alive.
    #[cfg(unix)]
    fn signal_group(&self) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let Some(group) = self.group else {
            return false;
        };
        match killpg(Pid::from_raw(group as i32), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => true,
            Err(e) => {
                log::warn!("render: could not signal process group {group}: {e}");
                false
            }
        }
    }

    #[cfg(not(unix))]
    fn signal_group(&self) -> bool {
        false
    }
}

#[async_trait]
impl RenderProcess for RenderSession {
    fn exited(&mut self) -> Option<String> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.to_string()),
            Ok(None) => None,
            Err(e) => Some(format!("unknown ({e})")),
        }
    }

    async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        let result = if self.signal_group() {
            self.child.wait().await.map(drop)
        } else {
            self.child.kill().await
        };
        if let Err(e) = result {
            log::debug!("render: reaping renderer: {e}");
        }
        log::info!("render: renderer torn down");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
