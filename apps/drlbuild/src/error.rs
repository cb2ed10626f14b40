//! Error types for configuration, the problem list, the compiler bridge and
//! the build driver.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading `drlbuild.toml|yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error in {}: {message}", path.display())]
    Toml { path: PathBuf, message: String },

    #[error("YAML parse error in {}: {message}", path.display())]
    Yaml { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised by the problem list.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("problem list is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("artifact '{0}' is not accepted by this problem list")]
    Rejected(String),
}

/// Errors raised while handing an artifact to the compiler or converter.
#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("rule text is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with status {status}: {stderr}")]
    Exit {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("no spreadsheet converter is configured")]
    NoConverter,
}

impl CompilerError {
    /// Short name used when a failure carries no usable message.
    pub fn kind_name(&self) -> &'static str {
        match self {
            CompilerError::Io(_) => "io",
            CompilerError::Utf8(_) => "utf8",
            CompilerError::Spawn { .. } => "spawn",
            CompilerError::Exit { .. } => "compiler-exit",
            CompilerError::NoConverter => "no-converter",
        }
    }
}

/// Errors that stop a build pass before any artifact is visited.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("project root {} is not accessible", .0.display())]
    Inaccessible(PathBuf),

    #[error("bad scan pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}
