// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// What kind of input a missing path was supposed to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    ImageManifest,
    MaskManifest,
    SidFile,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InputKind::ImageManifest => "image manifest",
            InputKind::MaskManifest => "mask manifest",
            InputKind::SidFile => "SID file",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{kind} not found: {path}")]
    NotFound { kind: InputKind, path: PathBuf },

    #[error("Manifest contains no subjects: {0}")]
    EmptyManifest(PathBuf),

    #[error("Manifest length mismatch: {images} images vs {masks} masks")]
    ManifestMismatch { images: usize, masks: usize },

    #[error("Failed to create workspace directory {path}: {source}")]
    Workspace {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Permission denied creating {path}: {source}")]
    Permission {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write SID file {path}: {source}")]
    Allocation {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PipelineError {
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Maps a directory creation failure onto the workspace/permission split.
    pub fn from_create_dir(path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            PipelineError::Permission { path, source }
        } else {
            PipelineError::Workspace { path, source }
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}
