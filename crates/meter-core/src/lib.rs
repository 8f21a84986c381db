//! Core types shared by every crate of the parking meter endpoint.
//!
//! This crate holds the board constants, the common error type, the value
//! types that travel between the hardware, connector and resource layers, and
//! the TOML configuration model loaded by the firmware binary.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::MeterConfig;
pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
