// Schema error taxonomy. Every variant is recoverable and ends up as the `error`
// string of a failure envelope.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Malformed or out-of-range field.
    #[error("validation failed for {entity}: {message}")]
    Validation {
        entity: &'static str,
        message: String,
    },

    /// Input that could not be decoded into the entity shape at all.
    #[error("malformed {entity}: {message}")]
    Malformed {
        entity: &'static str,
        message: String,
    },

    /// Back-reference that does not resolve to its parent.
    #[error("dangling reference: {entity} {id} references {target} {target_id}")]
    Reference {
        entity: &'static str,
        id: String,
        target: &'static str,
        target_id: String,
    },

    /// Illegal lifecycle transition.
    #[error("illegal {entity} transition: {from} -> {to}")]
    Transition {
        entity: &'static str,
        from: String,
        to: String,
    },
}

pub type SchemaResult<T> = std::result::Result<T, SchemaError>;

impl SchemaError {
    pub fn validation(entity: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            entity,
            message: message.into(),
        }
    }

    pub fn malformed(entity: &'static str, message: impl Into<String>) -> Self {
        Self::Malformed {
            entity,
            message: message.into(),
        }
    }

    pub fn reference(
        entity: &'static str,
        id: impl Into<String>,
        target: &'static str,
        target_id: impl Into<String>,
    ) -> Self {
        Self::Reference {
            entity,
            id: id.into(),
            target,
            target_id: target_id.into(),
        }
    }

    pub fn transition(
        entity: &'static str,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        Self::Transition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Stable short name of the error class, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaError::Validation { .. } | SchemaError::Malformed { .. } => "validation",
            SchemaError::Reference { .. } => "reference",
            SchemaError::Transition { .. } => "transition",
        }
    }
}

/// Failure of a store operation: either the input was rejected or the database failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("encoding error: {0}")]
    Encoding(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
