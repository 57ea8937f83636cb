//! Error types for buildx-step
//!
//! All modules use `StepResult<T>` as their return type.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for buildx-step operations
pub type StepResult<T> = Result<T, StepError>;

/// Orchestrator stage that produced a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    RestoreCache,
    EnsureCacheDirs,
    CreateBuilderEnv,
    Build,
    SaveCache,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RestoreCache => "restore cache",
            Self::EnsureCacheDirs => "create cache folder",
            Self::CreateBuilderEnv => "initialize buildkit",
            Self::Build => "build docker image",
            Self::SaveCache => "save cache",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All errors that can occur in buildx-step
#[derive(Error, Debug)]
pub enum StepError {
    // Input errors
    #[error("Invalid step input: {0}")]
    ConfigParse(String),

    // Settings file errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Cache errors
    #[error("Cache folder error: {context}: {source}")]
    CacheIo {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache backend error: {0}")]
    CacheBackend(String),

    // Builder errors
    #[error("Buildx instance error: {0}")]
    BuilderEnv(String),

    #[error("Build failed: {command}, exit code: {code}")]
    BuildExecution { command: String, code: i32 },

    /// Fatal error wrapped with the orchestrator stage that produced it
    #[error("{stage}: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<StepError>,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    User(String),
}

impl StepError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a cache folder error with context
    pub fn cache_io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::CacheIo {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Wrap this error with the stage that produced it
    pub fn stage(self, stage: Stage) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The stage this error was raised in, if it was wrapped
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Stage { source, .. } => source.hint(),
            Self::ConfigParse(_) => Some("Set the tags, file and context inputs"),
            Self::BuilderEnv(_) => Some("Check that docker is running and buildx is installed"),
            Self::CommandFailed { .. } => Some("Is docker on PATH?"),
            _ => None,
        }
    }
}
