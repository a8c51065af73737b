//! # Faultline HTTP service
//!
//! Wires the dispatch coordinator, metrics aggregator and pruner into an
//! axum router. Every request runs behind the error-handling middleware.

pub mod context;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod utils;

pub use context::AppContext;
pub use error::{ApiError, ApiResult};
pub use routes::router;
