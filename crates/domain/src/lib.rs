//! # Faultline Domain
//!
//! Failure taxonomy and wire types for Faultline.
//!
//! This crate contains:
//! - The four-category error taxonomy and its code ranges
//! - `ClassifiedError` with its range-checked constructor
//! - Request context and the JSON error response contract
//! - Configuration structures
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - Depends only on the `foundation` tier of `faultline-common`
//! - Pure domain models and data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod taxonomy;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use taxonomy::{
    category_label, category_slug, CodeRange, ErrorCategory, TransportStatus,
    UNKNOWN_CATEGORY_LABEL,
};
pub use types::*;
