//! Error types for predisql

use thiserror::Error;

/// The main error type for predisql operations
#[derive(Error, Debug)]
pub enum Error {
    /// The entity's declared metadata is malformed
    #[error("Configuration error for '{entity}': {message}")]
    Configuration { entity: String, message: String },

    /// A predicate contains a node the translator cannot lower
    #[error("Unsupported expression '{kind}': {message}")]
    UnsupportedExpression { kind: String, message: String },

    /// A logical function has no mapping in the active dialect
    #[error("Function '{function}' is not supported by dialect '{dialect}'")]
    UnsupportedFunction { function: String, dialect: String },

    /// Database connection or execution error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A row value could not be converted into the requested type
    #[error("Cannot decode column '{column}' as {expected}: found {found}")]
    Decode {
        column: String,
        expected: String,
        found: String,
    },

    /// Invalid query configuration
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },
}

/// Convenience Result type for predisql operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new configuration error
    pub fn configuration(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Create a new unsupported expression error
    pub fn unsupported_expression(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsupportedExpression {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create a new unsupported function error
    pub fn unsupported_function(function: impl Into<String>, dialect: impl Into<String>) -> Self {
        Self::UnsupportedFunction {
            function: function.into(),
            dialect: dialect.into(),
        }
    }

    /// Create a new decode error
    pub fn decode(
        column: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::Decode {
            column: column.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a new invalid query error
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }
}
