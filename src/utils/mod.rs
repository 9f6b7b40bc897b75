//! Utility modules
//!
//! Provides the identity and filtering heuristics shared by discovery, and
//! logging setup.

pub mod filters;
pub mod logging;

pub use logging::init_logging;
