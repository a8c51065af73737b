//! # Faultline Core
//!
//! Failure handling logic - no transport or storage dependencies.
//!
//! This crate contains:
//! - Port interfaces for metrics recording and diagnostic retries
//! - The response builder and its suggestion catalog
//! - The dispatch coordinator that ties classification, resilience,
//!   response construction and metrics together
//!
//! ## Architecture Principles
//! - Only depends on `faultline-common` and `faultline-domain`
//! - No HTTP framework code; the api crate adapts requests to descriptors
//! - All external effects go through traits

pub mod dispatch;
pub mod error_metrics_ports;
pub mod response;

pub use dispatch::ports::{ReplayProbe, RetryProbe};
pub use dispatch::{DispatchCoordinator, DispatchOutcome, Dispatched};
pub use error_metrics_ports::ErrorMetricsPort;
pub use response::{ResponseBuilder, SuggestionCatalog};
