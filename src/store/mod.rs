//! Datastore connector.
//!
//! A [`Datastore`] opens one connection per call to [`Datastore::connect`];
//! there is no pooling. The returned [`Session`] exposes the five statement
//! operations the probe needs, each scoped to a single table ("namespace").
//!
//! The caller owns the session and must call [`Session::close`] when done.
//! Dropping a session without closing it still tears down the socket.

mod mysql;
pub mod sql;

pub use mysql::{MysqlSession, MysqlStore};

use async_trait::async_trait;

use crate::error::StoreError;

/// Something that can open a datastore session.
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Session>, StoreError>;
}

/// A single live connection.
#[async_trait]
pub trait Session: Send {
    /// Create the table if it does not already exist.
    async fn create_namespace(&mut self, namespace: &str) -> Result<(), StoreError>;

    /// Insert `key` or overwrite its value.
    async fn set(&mut self, namespace: &str, key: &str, value: &str) -> Result<(), StoreError>;

    /// Fetch the value for `key`.
    ///
    /// Returns [`StoreError::NotFound`] naming the table if it does not exist,
    /// or naming the key if no row matches.
    async fn get(&mut self, namespace: &str, key: &str) -> Result<String, StoreError>;

    async fn delete_key(&mut self, namespace: &str, key: &str) -> Result<(), StoreError>;

    /// Drop the table if it exists.
    async fn delete_namespace(&mut self, namespace: &str) -> Result<(), StoreError>;

    /// Release the connection. Calling it twice is a no-op.
    async fn close(&mut self) -> Result<(), StoreError>;
}
