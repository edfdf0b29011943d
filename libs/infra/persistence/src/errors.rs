//! [libs/infra/persistence/src/errors.rs]
//! One error enum for the whole crate, matching the teacher's one-`DbError`
//! -per-crate convention (SPEC_FULL §13).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(#[from] libsql::Error),

    #[error("failed to map a row onto its domain type: {0}")]
    Mapping(String),

    #[error("requested record was not found")]
    NotFound,

    #[error("dead-letter quarantine write failed: {0}")]
    DeadLetter(#[from] std::io::Error),
}
