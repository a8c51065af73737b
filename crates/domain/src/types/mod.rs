//! Domain types and models

pub mod classified;
pub mod context;
pub mod failure;
pub mod response;

pub use classified::{ClassifiedError, RangeViolation};
pub use context::{RequestContext, RequestDescriptor};
pub use failure::{Failure, UnexpectedFailure};
pub use response::ErrorResponse;
