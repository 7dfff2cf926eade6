//! Error types for level construction and configuration.
//!
//! Only load-time problems are errors. Anything that goes wrong while a level
//! is being played is absorbed by the module that notices it.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaveError {
    /// Connectivity extraction left nothing to stand on
    #[error("map generation produced no open cells ({width}x{height})")]
    NoOpenCells { width: usize, height: usize },

    #[error("missing required texture: {0}")]
    MissingTexture(String),

    #[error("missing required shader: {0}")]
    MissingShader(String),

    #[error("missing required animation: {0}")]
    MissingAnimation(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read config {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(String),

    /// Snapshot could not be decoded or does not match its own geometry
    #[error("map snapshot error: {0}")]
    Snapshot(String),

    #[error("file watcher error: {0}")]
    Watch(String),
}

pub type Result<T> = std::result::Result<T, CaveError>;
