//! Core error type and protocol constants shared by all cashbridge crates.

pub mod constants;
pub mod error;

pub use error::{Error, Result};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
