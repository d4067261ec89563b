use std::path::PathBuf;

use thiserror::Error;

use crate::model::RecordId;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Please fill in all required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("Invalid record id: '{0}'")]
    InvalidId(String),

    #[error("Not an image file: {}", .0.display())]
    NotAnImage(PathBuf),

    #[error("Query error: {0}")]
    Query(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        CatalogError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
