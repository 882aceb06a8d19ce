//! errors.rs
//! Typed failures of the ingestion pipeline.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileProcessingError {
    #[error("could not read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage failed while processing {file_name}: {source:#}")]
    Store {
        file_name: String,
        #[source]
        source: anyhow::Error,
    },
}
