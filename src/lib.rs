//! dbtest: a health-check service for MySQL / MariaDB.
//!
//! A single HTTP endpoint runs an end-to-end probe against the datastore
//! (connect, create a scratch table, write, read back, delete, drop) and
//! reports each step's outcome as JSON.

pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod probe;
pub mod routes;
pub mod state;
pub mod store;

pub use config::{AppConfig, StoreConfig};
pub use error::{ProbeError, StoreError};
pub use probe::{HealthReport, Probe};
pub use routes::create_router;
pub use state::AppState;
