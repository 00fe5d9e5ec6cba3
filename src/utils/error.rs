// src/utils/error.rs
use std::path::PathBuf;
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Failed to load PDF {path}: {message}")]
    Load { path: PathBuf, message: String }, // lopdf could not open or parse the file

    #[error("Failed to decode content of page {page}: {message}")]
    Content { page: u32, message: String },
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("No recognizable section titles found")]
    NoSections,

    #[error("Section not found: {0}")]
    SectionNotFound(String),

    #[error("Required field not found: {0}")]
    MissingField(&'static str),

    #[error("Could not determine the taxation year")]
    UnknownYear,

    #[error("PDF text layer failed: {0}")]
    Pdf(#[from] PdfError),
}

impl ExtractError {
    /// Malformed documents are fatal for one client but never for the batch.
    pub fn is_malformed_document(&self) -> bool {
        !matches!(self, ExtractError::Pdf(_))
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}
