//! [libs/infra/persistence/src/client.rs]
//! Connection management, adapted from the teacher's `TursoClient`: detects
//! a remote (`libsql://`/`https://`) vs. local/in-memory URL, runs schema
//! bootstrap once at connect time, and — for `:memory:` databases — holds
//! an anchor connection open for the process lifetime so SQLite does not
//! drop the in-memory schema once the bootstrap connection is released.

use std::sync::Arc;

use libsql::{Builder, Connection, Database};
use tracing::{info, instrument};

use crate::errors::PersistenceError;
use crate::schema::apply_schema;

#[derive(Clone)]
pub struct PersistenceClient {
    database: Arc<Database>,
    _memory_anchor: Option<Arc<Connection>>,
}

impl PersistenceClient {
    #[instrument(skip(access_token))]
    pub async fn connect(database_url: &str, access_token: Option<String>) -> Result<Self, PersistenceError> {
        if database_url.is_empty() {
            return Err(PersistenceError::Connection("database url is empty".into()));
        }

        let is_remote = database_url.starts_with("libsql://") || database_url.starts_with("https://");
        let is_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

        let database = if is_remote {
            let token = access_token
                .ok_or_else(|| PersistenceError::Connection("remote database requires an access token".into()))?;
            Builder::new_remote(database_url.to_string(), token).build().await
        } else {
            Builder::new_local(database_url).build().await
        }
        .map_err(|err| PersistenceError::Connection(err.to_string()))?;

        let database = Arc::new(database);
        let anchor = if is_memory {
            let anchor_conn = database.connect().map_err(|err| PersistenceError::Connection(err.to_string()))?;
            apply_schema(&anchor_conn).await?;
            info!("in-memory persistence anchor established");
            Some(Arc::new(anchor_conn))
        } else {
            let bootstrap_conn = database.connect().map_err(|err| PersistenceError::Connection(err.to_string()))?;
            apply_schema(&bootstrap_conn).await?;
            None
        };

        Ok(Self { database, _memory_anchor: anchor })
    }

    pub fn get_connection(&self) -> Result<Connection, PersistenceError> {
        self.database.connect().map_err(|err| PersistenceError::Connection(err.to_string()))
    }
}
