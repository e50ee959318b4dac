//! In-memory datastore used by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::Router;
use http::{Request, Response};
use http_body_util::BodyExt;
use tower::ServiceExt;

use dbtest::store::{Datastore, Session};
use dbtest::{AppConfig, AppState, Probe, StoreError};

type Tables = HashMap<String, HashMap<String, String>>;

/// Tables live for as long as the store; sessions share them.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    pub refuse_connections: bool,
    /// Value returned by every read instead of the stored one
    pub corrupt_reads: Option<String>,
    /// Delay before every write lands
    pub write_delay: Option<Duration>,
}

impl MemoryStore {
    pub fn refusing() -> Self {
        Self {
            refuse_connections: true,
            ..Self::default()
        }
    }

    pub fn corrupting(value: &str) -> Self {
        Self {
            corrupt_reads: Some(value.to_string()),
            ..Self::default()
        }
    }

    pub fn slow_writes(delay: Duration) -> Self {
        Self {
            write_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    async fn connect(&self) -> Result<Box<dyn Session>, StoreError> {
        if self.refuse_connections {
            return Err(StoreError::Connection {
                address: "memory:3306".to_string(),
                source: sqlx::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "Connection refused",
                )),
            });
        }
        Ok(Box::new(MemorySession {
            store: self.clone(),
            open: true,
        }))
    }
}

pub struct MemorySession {
    store: MemoryStore,
    open: bool,
}

impl MemorySession {
    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        assert!(self.open, "session used after close");
        self.store.tables.lock().unwrap()
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn create_namespace(&mut self, namespace: &str) -> Result<(), StoreError> {
        self.tables().entry(namespace.to_string()).or_default();
        Ok(())
    }

    async fn set(&mut self, namespace: &str, key: &str, value: &str) -> Result<(), StoreError> {
        if let Some(delay) = self.store.write_delay {
            tokio::time::sleep(delay).await;
        }
        let mut tables = self.tables();
        let table = tables
            .get_mut(namespace)
            .ok_or_else(|| StoreError::NotFound(namespace.to_string()))?;
        table.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&mut self, namespace: &str, key: &str) -> Result<String, StoreError> {
        let corrupt = self.store.corrupt_reads.clone();
        let tables = self.tables();
        let table = tables
            .get(namespace)
            .ok_or_else(|| StoreError::NotFound(namespace.to_string()))?;
        let value = table
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Ok(corrupt.unwrap_or(value))
    }

    async fn delete_key(&mut self, namespace: &str, key: &str) -> Result<(), StoreError> {
        if let Some(table) = self.tables().get_mut(namespace) {
            table.remove(key);
        }
        Ok(())
    }

    async fn delete_namespace(&mut self, namespace: &str) -> Result<(), StoreError> {
        self.tables().remove(namespace);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.open = false;
        Ok(())
    }
}

pub fn router_with(probe: Probe) -> Router {
    dbtest::create_router(AppState::new(AppConfig::default(), probe))
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
