//! The `utils` module provides the pieces shared across `popsub-udp`:
//! the crate-wide error type and the logging bootstrap.

pub mod error;
pub mod logging;

pub use error::{PopsubError, Result};
