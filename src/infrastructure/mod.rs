//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements the oracle and evidence boundary traits over HTTP
//! and wires up services.

pub mod chat;
pub mod di;
pub mod error;
pub mod evidence;
pub mod http;
pub mod oracle;
pub mod traits;

pub use error::{InfraError, InfraResult};
