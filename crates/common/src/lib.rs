//! TenderDesk Common Library
//!
//! Shared code for the TenderDesk backend including:
//! - Database models and repository patterns
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Tender scoring and document text extraction
//! - PDF report rendering
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod extraction;
pub mod metrics;
pub mod prediction;
pub mod report;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use extraction::TextExtractor;
pub use prediction::Predictor;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
