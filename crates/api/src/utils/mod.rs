//! Binary support utilities

pub mod logging;
