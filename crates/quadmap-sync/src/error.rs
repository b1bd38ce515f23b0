//! Error types for the quadmap-sync crate.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to read schema file {path}: {source}")]
    SchemaFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid schema in {path}: {source}")]
    SchemaParse {
        path: PathBuf,
        source: quadmap_core::MapperError,
    },

    #[error("Graph error: {0}")]
    Graph(#[from] quadmap_graph::GraphError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
