use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the whole crate.
/// Every public operation returns `Result<T, UProjectError>`.
#[derive(Debug, Error)]
pub enum UProjectError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Descriptor ──────────────────────────────────────
    #[error("Failed to parse project descriptor {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Couldn't find .uproject in {dir:?}")]
    ProjectNotFound { dir: PathBuf },

    // ── Engine ──────────────────────────────────────────
    #[error("Couldn't find associated engine '{association}'")]
    EngineNotFound { association: String },

    // ── Targets ─────────────────────────────────────────
    #[error("uproject - {platform} targets not implemented")]
    NotImplemented { platform: String },

    #[error("uproject - Unsupported platform '{platform}'")]
    UnsupportedPlatform { platform: String },

    // ── Config ──────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Convenience alias used throughout the crate.
pub type UProjectResult<T> = Result<T, UProjectError>;

impl From<std::io::Error> for UProjectError {
    fn from(source: std::io::Error) -> Self {
        UProjectError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl UProjectError {
    /// True for the "nothing there" family of errors, as opposed to faults.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            UProjectError::ProjectNotFound { .. } | UProjectError::EngineNotFound { .. }
        )
    }
}
