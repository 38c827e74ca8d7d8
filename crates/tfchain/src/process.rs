//! external command execution
//!
//! Everything that shells out goes through [CommandRunner] so the orchestration can be exercised
//! without terraform, az or sqlcmd installed.
use crate::Error;
use std::fmt::Formatter;
use std::process::Stdio;

/// A command line with optionally redacted arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    pub program: String,
    pub args: Vec<String>,
    redacted: Vec<usize>,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            redacted: vec![],
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds an argument that is never logged
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.redacted.push(self.args.len());
        self.args.push(arg.into());
        self
    }
}

impl std::fmt::Display for Cmd {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for (index, arg) in self.args.iter().enumerate() {
            if self.redacted.contains(&index) {
                f.write_str(" ***")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

pub trait CommandRunner {
    /// Run to completion with inherited stdio
    fn run(&self, cmd: &Cmd) -> Result<(), Error>;

    /// Run to completion and return trimmed stdout
    fn capture(&self, cmd: &Cmd) -> Result<String, Error>;

    /// Like [CommandRunner::capture] but treats failure and empty output as "no value"
    fn capture_optional(&self, cmd: &Cmd) -> Option<String> {
        match self.capture(cmd) {
            Ok(output) if !output.is_empty() => Some(output),
            Ok(_) => None,
            Err(err) => {
                tracing::debug!(command=%cmd, %err, "optional command yielded nothing");
                None
            }
        }
    }
}

/// Runs commands on the host
#[derive(Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn command(cmd: &Cmd) -> std::process::Command {
        let mut command = std::process::Command::new(&cmd.program);
        command.args(&cmd.args);
        command
    }

    fn spawn_error(cmd: &Cmd, source: std::io::Error) -> Error {
        Error::Spawn {
            program: cmd.program.clone(),
            source,
        }
    }

    fn failed(cmd: &Cmd, status: std::process::ExitStatus) -> Error {
        Error::CommandFailed {
            command: cmd.to_string(),
            // killed by a signal
            code: status.code().unwrap_or(1),
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &Cmd) -> Result<(), Error> {
        tracing::info!(command=%cmd, "running");
        let status = Self::command(cmd)
            .status()
            .map_err(|e| Self::spawn_error(cmd, e))?;

        if !status.success() {
            return Err(Self::failed(cmd, status));
        }
        Ok(())
    }

    fn capture(&self, cmd: &Cmd) -> Result<String, Error> {
        tracing::debug!(command=%cmd, "capturing");
        let output = Self::command(cmd)
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| Self::spawn_error(cmd, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(command=%cmd, stderr=%stderr.trim(), "command failed");
            return Err(Self::failed(cmd, output.status));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_redacts_secrets() {
        let cmd = Cmd::new("sqlcmd")
            .args(["-U", "admin", "-P"])
            .secret_arg("hunter2")
            .args(["-i", "setup.sql"]);

        assert_eq!(cmd.to_string(), "sqlcmd -U admin -P *** -i setup.sql");
        assert_eq!(cmd.args[3], "hunter2");
    }

    #[test]
    #[cfg(unix)]
    fn system_runner_reports_exit_code() {
        let err = SystemRunner
            .run(&Cmd::new("sh").args(["-c", "exit 3"]))
            .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    #[cfg(unix)]
    fn system_runner_captures_trimmed_stdout() {
        let out = SystemRunner
            .capture(&Cmd::new("sh").args(["-c", "echo '  value  '"]))
            .unwrap();
        assert_eq!(out, "value");
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let err = SystemRunner
            .capture(&Cmd::new("tfchain-definitely-not-installed"))
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
        assert_eq!(SystemRunner.capture_optional(&Cmd::new("tfchain-definitely-not-installed")), None);
    }
}
