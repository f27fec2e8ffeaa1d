//! Errors raised by the store layer.

use thiserror::Error;

use crate::model::{BookingId, BookingStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("stay overlaps active booking {0}")]
    Conflict(BookingId),

    #[error("cannot move booking from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("idempotency key already used for booking {0} with a different stay")]
    IdempotencyKeyReused(BookingId),

    #[error("{0} already taken")]
    Duplicate(&'static str),

    #[error("storage failure: {0}")]
    Storage(#[from] std::io::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
