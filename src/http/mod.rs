//! HTTP server module.
//!
//! Serves plain HTTP; TLS termination is left to whatever sits in front of
//! the service. The server includes graceful shutdown on SIGTERM/SIGINT.

mod server;
mod shutdown;

pub use server::{start_server, ServerError};
