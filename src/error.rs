//! Error types for datastore operations and the health probe.
//!
//! Nothing here ever reaches the HTTP client as a failure status on its own:
//! the probe renders every error into the report's `errorMessage`.

/// Failure of a single datastore operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Transport or authentication failure while opening the connection.
    #[error("connection to {address} failed: {source}")]
    Connection {
        address: String,
        #[source]
        source: sqlx::Error,
    },

    /// `CREATE TABLE` / `DROP TABLE` failed.
    #[error("schema change on {table} failed: {source}")]
    Schema {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// Upsert or row delete failed.
    #[error("write to {table} failed: {source}")]
    Write {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// Query or row decoding failed.
    #[error("read from {table} failed: {source}")]
    Read {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// The session was already closed.
    #[error("connection to {address} is closed")]
    Closed { address: String },

    /// The table or the key does not exist.
    #[error("{0} not found")]
    NotFound(String),
}

/// Failure of a probe step.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Read succeeded but returned something other than what was written.
    #[error("values do not match: {got} != {want}")]
    Mismatch { got: String, want: String },
}
