//! Error types for the store adapter.

use thiserror::Error;

/// Main error type for adapter operations.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Store not found: {0}")]
    StoreNotFound(String),

    #[error("{class_name} not found with primaryKey = {primary_key}")]
    RecordNotFound {
        class_name: String,
        primary_key: String,
    },

    #[error("Duplicate primary key for {class_name}: {primary_key}")]
    DuplicateKey {
        class_name: String,
        primary_key: String,
    },

    #[error("Already subscribed: {0}")]
    DuplicateSubscription(String),

    #[error("Not subscribed: {0}")]
    SubscriptionNotFound(String),

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Unsupported operand type for operator {operator}")]
    UnsupportedPredicateType { operator: String },

    #[error("Unsupported value type for field {field}")]
    UnsupportedFieldType { field: String },

    #[error("No argument: {0}")]
    MissingArgument(String),

    #[error("Unknown class: {0}")]
    UnknownClass(String),

    #[error("Engine error: {0}")]
    Engine(String),
}

impl AdapterError {
    /// Stable machine-readable kind, reported at the command-dispatch boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterError::StoreNotFound(_) => "StoreNotFound",
            AdapterError::RecordNotFound { .. } => "RecordNotFound",
            AdapterError::DuplicateKey { .. } => "DuplicateKey",
            AdapterError::DuplicateSubscription(_) => "DuplicateSubscription",
            AdapterError::SubscriptionNotFound(_) => "SubscriptionNotFound",
            AdapterError::UnknownOperator(_) => "UnknownOperator",
            AdapterError::UnsupportedPredicateType { .. } => "UnsupportedPredicateType",
            AdapterError::UnsupportedFieldType { .. } => "UnsupportedFieldType",
            AdapterError::MissingArgument(_) => "MissingArgument",
            AdapterError::UnknownClass(_) => "UnknownClass",
            AdapterError::Engine(_) => "Engine",
        }
    }
}

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;
