use crate::stack::Stack;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("No value for `{key}` of stack {stack}. {hint}")]
    MissingRequiredValue {
        stack: Stack,
        key: &'static str,
        hint: String,
    },
    #[error("Output `{output}` of stack {source_stack} not found (needed by {stack}). Deploy {source_stack} first.")]
    MissingCollaboratorOutput {
        stack: Stack,
        source_stack: Stack,
        output: &'static str,
    },
    #[error("Command failed with exit code {code}: {command}")]
    CommandFailed { command: String, code: i32 },
    #[error("Unable to run `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{tool}` not found. {hint}")]
    MissingTool { tool: &'static str, hint: &'static str },
    #[error("Missing terraform directory {}", .0.display())]
    MissingStackDirectory(PathBuf),
    #[error("Missing SQL script {}", .0.display())]
    MissingSqlScript(PathBuf),
    #[error("Unable to read variables")]
    VariableFile(#[from] crate::tfvars::ReadError),
    #[error("Invalid configuration")]
    Config(#[from] crate::config::ConfigError),
    #[error("Unable to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Process exit code for this error
    ///
    /// Failing external commands pass their own exit code through.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::CommandFailed { code, .. } => *code,
            _ => 1,
        }
    }
}
