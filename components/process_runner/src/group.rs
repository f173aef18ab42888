// components/process_runner/src/group.rs
//! Children are started in their own process group so that helpers they
//! spawn (yt-dlp runs ffmpeg to merge streams) die with them.

use std::path::PathBuf;

use tokio::process::Command;
#[cfg(unix)]
use tracing::{debug, warn};

pub(crate) fn isolate(command: &mut Command) {
    #[cfg(unix)]
    command.process_group(0);
    #[cfg(not(unix))]
    let _ = command;
}

/// Kills the child's whole process group when dropped while armed
pub(crate) struct GroupGuard {
    pid: Option<u32>,
    program: PathBuf,
    armed: bool,
}

impl GroupGuard {
    pub(crate) fn new(pid: Option<u32>, program: impl Into<PathBuf>) -> Self {
        Self {
            pid,
            program: program.into(),
            armed: true,
        }
    }

    /// The child exited on its own; leave the group alone
    pub(crate) fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        if self.armed {
            kill_group(self.pid, &self.program);
        }
    }
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>, program: &std::path::Path) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pgid) = pid.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) => debug!(program = %program.display(), pgid, "killed process group"),
        Err(Errno::ESRCH) => {}
        Err(e) => warn!(program = %program.display(), pgid, error = %e, "failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>, _program: &std::path::Path) {}
