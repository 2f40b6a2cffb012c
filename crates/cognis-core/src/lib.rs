//! Cognis Core - complex kernel, shared types, exchange protocol, error handling

pub mod complex;
pub mod error;
pub mod protocol;
pub mod types;

pub use complex::Complex64;
pub use error::{Error, Result};
pub use protocol::*;
pub use types::*;
