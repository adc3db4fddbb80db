//! Validation errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid TRON address: {0}")]
    InvalidAddress(String),

    #[error("unknown address role: {0} (expected \"provider\" or \"payment\")")]
    InvalidRole(String),

    #[error("reason is {len} bytes, maximum is {max}")]
    ReasonTooLong { len: usize, max: usize },
}
