use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{ClientRecord, NewClient};

#[cfg(test)]
pub mod memory;

/// Table holding the client rows. Interpolated into SQL text, so it must
/// stay a constant and never come from request input.
pub const CLIENT_TABLE: &str = "clientes";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    QueryFailed(String),
    #[error("{0}")]
    Rejected(String),
    #[error("the insert did not return an identity")]
    NotPersisted,
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            // SQLSTATE class 23: integrity constraint violation
            sqlx::Error::Database(db)
                if matches!(db.code().as_deref(), Some(code) if code.starts_with("23")) =>
            {
                StoreError::Rejected(db.message().to_string())
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// The two statements the rest of the application may run.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// All rows, most recent first.
    async fn list_all(&self) -> Result<Vec<ClientRecord>, StoreError>;

    /// Inserts one row and returns its generated id.
    async fn insert(&self, client: &NewClient) -> Result<i32, StoreError>;
}

fn select_all_sql() -> String {
    format!(
        "SELECT id, nombre, apellidopaterno, apellidomaterno, fechanacimiento, \
         direccion, telefono, fecharegistro \
         FROM {CLIENT_TABLE} ORDER BY id DESC"
    )
}

fn insert_sql() -> String {
    format!(
        "INSERT INTO {CLIENT_TABLE} \
         (nombre, apellidopaterno, apellidomaterno, fechanacimiento, direccion, telefono, fecharegistro) \
         VALUES ($1, $2, $3, $4::date, $5, $6, $7::date) \
         RETURNING id"
    )
}

fn create_table_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {CLIENT_TABLE} (
            id SERIAL PRIMARY KEY,
            nombre TEXT NOT NULL,
            apellidopaterno TEXT NOT NULL,
            apellidomaterno TEXT,
            fechanacimiento DATE,
            direccion TEXT,
            telefono TEXT,
            fecharegistro DATE NOT NULL DEFAULT CURRENT_DATE
        )"
    )
}

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new Database instance with a lazily connecting pool
    pub fn new(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_lazy(config.database_url()?)?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the client table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(&create_table_sql())
            .execute(self.get_pool())
            .await?;

        Ok(())
    }
}

/// Build the pool and make sure the client table exists. A database that
/// is down at startup is not fatal: requests report store errors until it
/// comes back.
pub async fn init(config: &Config) -> Result<Database> {
    let db = Database::new(config)?;
    match db.ensure_schema().await {
        Ok(()) => info!(table = CLIENT_TABLE, "client table ready"),
        Err(err) => warn!(error = %err, "could not verify the client table"),
    }
    Ok(db)
}

#[async_trait]
impl ClientStore for Database {
    async fn list_all(&self) -> Result<Vec<ClientRecord>, StoreError> {
        let sql = select_all_sql();
        let clients = sqlx::query_as::<_, ClientRecord>(&sql)
            .fetch_all(self.get_pool())
            .await
            .map_err(|err| {
                warn!(error = %err, "listing clients failed");
                StoreError::from(err)
            })?;

        debug!(count = clients.len(), "listed clients");
        Ok(clients)
    }

    async fn insert(&self, client: &NewClient) -> Result<i32, StoreError> {
        let sql = insert_sql();
        let id = sqlx::query_scalar::<_, i32>(&sql)
            .bind(&client.name)
            .bind(&client.paternal_surname)
            .bind(&client.maternal_surname)
            .bind(&client.birth_date)
            .bind(&client.address)
            .bind(&client.phone)
            .bind(&client.registration_date)
            .fetch_optional(self.get_pool())
            .await
            .map_err(|err| {
                warn!(error = %err, "inserting client failed");
                StoreError::from(err)
            })?;

        id.ok_or(StoreError::NotPersisted)
    }
}
