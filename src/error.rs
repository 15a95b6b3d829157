use thiserror::Error;

use crate::entities::DebtStatus;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures of entity store operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
    #[error("{entity} at index {index} not found")]
    IndexOutOfRange { entity: &'static str, index: i64 },
    #[error("invalid status '{0}'. Valid values are: {}", DebtStatus::valid_values())]
    InvalidStatus(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("client {0} not found")]
    UnknownClient(u64),
}

impl StoreError {
    pub fn client_not_found(id: u64) -> Self {
        Self::NotFound { entity: "client", id }
    }

    pub fn debt_not_found(id: u64) -> Self {
        Self::NotFound { entity: "debt", id }
    }

    /// Whether the error means "nothing lives at this address"
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::IndexOutOfRange { .. } | Self::UnknownClient(_)
        )
    }
}
