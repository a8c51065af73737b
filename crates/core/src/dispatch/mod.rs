//! Request dispatch and failure coordination

pub mod coordinator;
pub mod ports;

pub use coordinator::{
    dispatch_span, resilience_policies, DispatchCoordinator, DispatchOutcome, Dispatched,
};
