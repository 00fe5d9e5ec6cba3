// src/lib.rs
//! Extracts tax-return figures and benefit payment schedules from tax
//! summary PDFs and groups them into per-client cohorts.

pub mod config;
pub mod extractors;
pub mod pdf;
pub mod storage;
pub mod summary;
pub mod utils;

pub use config::ExtractionConfig;
pub use utils::AppError;
