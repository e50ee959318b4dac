//! MySQL / MariaDB implementation of the datastore traits, backed by `sqlx`.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlDatabaseError};
use sqlx::Connection;

use super::sql::{connection_url, redacted_url, Statements};
use super::{Datastore, Session};
use crate::config::StoreConfig;
use crate::error::StoreError;

/// MySQL error number for "table doesn't exist"
const ER_NO_SUCH_TABLE: u16 = 1146;

/// SQLSTATE reported alongside `ER_NO_SUCH_TABLE`
const SQLSTATE_NO_SUCH_TABLE: &str = "42S02";

/// Opens one unpooled MySQL connection per probe.
#[derive(Clone)]
pub struct MysqlStore {
    config: Arc<StoreConfig>,
    statements: Statements,
}

impl MysqlStore {
    pub fn new(config: StoreConfig) -> Self {
        let statements = Statements::new(&config.key_column, &config.value_column);
        Self {
            config: Arc::new(config),
            statements,
        }
    }

    fn connect_options(&self) -> Result<MySqlConnectOptions, sqlx::Error> {
        MySqlConnectOptions::from_str(&connection_url(&self.config))
    }
}

#[async_trait]
impl Datastore for MysqlStore {
    async fn connect(&self) -> Result<Box<dyn Session>, StoreError> {
        tracing::debug!(url = %redacted_url(&self.config), "Opening datastore connection");

        let connection_error = |source| StoreError::Connection {
            address: self.config.address.clone(),
            source,
        };

        let options = self.connect_options().map_err(connection_error)?;
        let conn = MySqlConnection::connect_with(&options)
            .await
            .map_err(connection_error)?;

        Ok(Box::new(MysqlSession {
            conn: Some(conn),
            config: self.config.clone(),
            statements: self.statements.clone(),
        }))
    }
}

/// A live connection owned by one probe.
pub struct MysqlSession {
    conn: Option<MySqlConnection>,
    config: Arc<StoreConfig>,
    statements: Statements,
}

impl MysqlSession {
    fn conn(&mut self) -> Result<&mut MySqlConnection, StoreError> {
        let address = &self.config.address;
        self.conn.as_mut().ok_or_else(|| StoreError::Closed {
            address: address.clone(),
        })
    }
}

/// Whether the backend rejected a statement because the table is missing.
fn is_missing_table(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db_err) = err else {
        return false;
    };
    if let Some(mysql_err) = db_err.try_downcast_ref::<MySqlDatabaseError>() {
        return mysql_err.number() == ER_NO_SUCH_TABLE;
    }
    db_err.code().as_deref() == Some(SQLSTATE_NO_SUCH_TABLE)
}

#[async_trait]
impl Session for MysqlSession {
    async fn create_namespace(&mut self, namespace: &str) -> Result<(), StoreError> {
        let statement = self.statements.create_table(namespace);
        let result = sqlx::query(&statement).execute(&mut *self.conn()?).await;
        match result {
            Ok(done) => {
                tracing::debug!(
                    namespace,
                    rows_affected = done.rows_affected(),
                    "Create table if not exists"
                );
                Ok(())
            }
            Err(source) => {
                tracing::error!(namespace, error = %source, "Error creating table");
                Err(StoreError::Schema {
                    table: namespace.to_string(),
                    source,
                })
            }
        }
    }

    async fn set(&mut self, namespace: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let statement = self.statements.upsert(namespace);
        sqlx::query(&statement)
            .bind(key)
            .bind(value)
            .bind(value)
            .execute(&mut *self.conn()?)
            .await
            .map_err(|source| {
                tracing::error!(namespace, key, error = %source, "Upsert failed");
                StoreError::Write {
                    table: namespace.to_string(),
                    source,
                }
            })?;
        Ok(())
    }

    async fn get(&mut self, namespace: &str, key: &str) -> Result<String, StoreError> {
        let statement = self.statements.select_value(namespace);
        let row = sqlx::query_scalar::<_, String>(&statement)
            .bind(key)
            .fetch_optional(&mut *self.conn()?)
            .await;

        match row {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(StoreError::NotFound(key.to_string())),
            Err(source) if is_missing_table(&source) => {
                Err(StoreError::NotFound(namespace.to_string()))
            }
            Err(source) => {
                tracing::error!(namespace, error = %source, "Query failed");
                Err(StoreError::Read {
                    table: namespace.to_string(),
                    source,
                })
            }
        }
    }

    async fn delete_key(&mut self, namespace: &str, key: &str) -> Result<(), StoreError> {
        let statement = self.statements.delete_row(namespace);
        sqlx::query(&statement)
            .bind(key)
            .execute(&mut *self.conn()?)
            .await
            .map_err(|source| {
                tracing::error!(namespace, key, error = %source, "Delete failed");
                StoreError::Write {
                    table: namespace.to_string(),
                    source,
                }
            })?;
        Ok(())
    }

    async fn delete_namespace(&mut self, namespace: &str) -> Result<(), StoreError> {
        let statement = self.statements.drop_table(namespace);
        sqlx::query(&statement)
            .execute(&mut *self.conn()?)
            .await
            .map_err(|source| {
                tracing::error!(namespace, error = %source, "Drop table failed");
                StoreError::Schema {
                    table: namespace.to_string(),
                    source,
                }
            })?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        conn.close().await.map_err(|source| StoreError::Connection {
            address: self.config.address.clone(),
            source,
        })
    }
}
