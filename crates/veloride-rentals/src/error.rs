//! The closed error taxonomy of the rental lifecycle service.
//!
//! Every fallible operation in this crate returns [`Result`]. Zone
//! classification is the deliberate exception: it degrades to
//! `outofbounds` instead of erroring so billing always has a defined input.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RentalError {
    #[error("invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("rental not found: {id}")]
    RentalNotFound { id: String },

    #[error("bike not found: {id}")]
    BikeNotFound { id: String },

    #[error("rental {id} is already completed")]
    AlreadyCompleted { id: String },

    #[error("no telemetry recorded for rental {id}")]
    NoRouteData { id: String },

    #[error("rental {id} is not completed")]
    NotCompleted { id: String },

    #[error("storage unavailable during {operation}")]
    StoreUnavailable {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to publish on channel {channel}")]
    PublishFailed {
        channel: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl RentalError {
    pub fn store_unavailable(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::StoreUnavailable {
            operation: operation.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, RentalError>;
