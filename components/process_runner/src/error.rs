use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("executable not found: {}", program.display())]
    NotFound { program: PathBuf },

    #[error("failed to start {}", program.display())]
    SpawnFailed {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} did not finish within {}s and was killed", program.display(), after.as_secs_f64())]
    Timeout { program: PathBuf, after: Duration },

    #[error("{} was cancelled", program.display())]
    Cancelled { program: PathBuf },

    #[error("IO error while waiting for process: {0}")]
    Io(#[from] std::io::Error),
}

impl CommandError {
    pub fn spawn_failed(program: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let program = program.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => CommandError::NotFound { program },
            _ => CommandError::SpawnFailed { program, source },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CommandError::Cancelled { .. })
    }
}
