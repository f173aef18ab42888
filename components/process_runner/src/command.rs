use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A process invocation as an argument vector; nothing here goes through a shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: PathBuf,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_owned()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Kill the process if it has not exited after `timeout`
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn get_program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Position of `flag` in the argument list, mostly useful for inspecting built commands
    pub fn position_of(&self, flag: &str) -> Option<usize> {
        self.args.iter().position(|arg| arg == flag)
    }

    /// The argument following `flag`
    pub fn value_of(&self, flag: &str) -> Option<&OsStr> {
        self.position_of(flag)
            .and_then(|index| self.args.get(index + 1))
            .map(|value| value.as_os_str())
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Result of a process that ran to completion; a nonzero exit is a normal value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn succeeded(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Last `lines` non-empty lines of stderr, which is where the tools put their diagnostics
    pub fn stderr_tail(&self, lines: usize) -> String {
        let tail: Vec<&str> = self
            .stderr
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .collect();
        let skip = tail.len().saturating_sub(lines);
        let joined = tail[skip..].join("\n");
        if joined.is_empty() {
            match self.exit_code {
                Some(code) => format!("exited with status {}", code),
                None => "terminated by signal".to_string(),
            }
        } else {
            joined
        }
    }
}

impl From<std::process::Output> for CommandOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_argument_vector() {
        let spec = CommandSpec::new("yt-dlp")
            .arg("--no-playlist")
            .args(["-f", "best"])
            .arg("https://example.com/watch?v=1 && rm -rf /")
            .timeout(Some(Duration::from_secs(5)));

        assert_eq!(spec.get_args().len(), 4);
        assert_eq!(spec.value_of("-f"), Some(OsStr::new("best")));
        // user input stays a single argument
        assert_eq!(
            spec.get_args()[3],
            OsString::from("https://example.com/watch?v=1 && rm -rf /")
        );
        assert_eq!(spec.get_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(spec.value_of("--missing"), None);
    }

    #[test]
    fn displays_as_command_line() {
        let spec = CommandSpec::new("ffmpeg").args(["-i", "in.mp4", "out.mp4"]);
        assert_eq!(spec.to_string(), "ffmpeg -i in.mp4 out.mp4");
    }

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let output = CommandOutput::failed(1, "one\n\ntwo\nthree\n");
        assert_eq!(output.stderr_tail(2), "two\nthree");
        assert_eq!(output.stderr_tail(10), "one\ntwo\nthree");
    }

    #[test]
    fn stderr_tail_falls_back_to_status() {
        let output = CommandOutput::failed(2, "");
        assert_eq!(output.stderr_tail(3), "exited with status 2");
    }
}
