//! [libs/core/router/src/errors.rs]

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("router is shutting down, submission rejected")]
    ShuttingDown,
}
