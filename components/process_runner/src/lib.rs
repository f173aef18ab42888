// components/process_runner/src/lib.rs
//! Runs external tools as argument vectors with an optional timeout and
//! cancellation. A nonzero exit code is reported in [`CommandOutput`], not as
//! an error; only spawn failures, timeouts and cancellation are errors.

mod command;
mod error;
mod group;
#[cfg(any(test, feature = "stub"))]
pub mod stub;

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use group::GroupGuard;

pub use command::{CommandOutput, CommandSpec};
pub use error::CommandError;

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion, blocking the calling task until it exits
    async fn run(
        &self,
        command: &CommandSpec,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, CommandError>;
}

/// Resolve `program` against `PATH` (or check it directly if it is a path)
pub fn check_available(program: impl AsRef<Path>) -> Result<PathBuf, CommandError> {
    let program = program.as_ref();
    which::which(program).map_err(|_| CommandError::NotFound {
        program: program.to_path_buf(),
    })
}

/// Runs commands as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, CommandError> {
        let program = command.get_program();
        if cancel.is_cancelled() {
            return Err(CommandError::Cancelled {
                program: program.to_path_buf(),
            });
        }

        let mut process = Command::new(program);
        process
            .args(command.get_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // dropping the wait future on timeout/cancel must not leave the tool running
            .kill_on_drop(true);
        group::isolate(&mut process);
        if let Some(dir) = command.get_current_dir() {
            process.current_dir(dir);
        }

        debug!(%command, "spawning process");
        let child = process
            .spawn()
            .map_err(|e| CommandError::spawn_failed(program, e))?;
        let mut guard = GroupGuard::new(child.id(), program);

        let finished = async {
            let wait = child.wait_with_output();
            match command.get_timeout() {
                Some(limit) => match tokio::time::timeout(limit, wait).await {
                    Ok(result) => result.map_err(CommandError::Io),
                    Err(_) => Err(CommandError::Timeout {
                        program: program.to_path_buf(),
                        after: limit,
                    }),
                },
                None => wait.await.map_err(CommandError::Io),
            }
        };

        tokio::select! {
            output = finished => {
                let output = CommandOutput::from(output?);
                guard.disarm();
                debug!(
                    program = %program.display(),
                    exit_code = ?output.exit_code,
                    "process finished"
                );
                Ok(output)
            }
            _ = cancel.cancelled() => {
                debug!(program = %program.display(), "process cancelled");
                Err(CommandError::Cancelled { program: program.to_path_buf() })
            }
        }
    }
}
