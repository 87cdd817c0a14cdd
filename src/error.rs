//! Error types for MXBridge
//!
//! Failures are classified by the scope they affect: a single dimension
//! ([`ConfigError`]), a single query ([`QueryError`]) or a whole connection
//! ([`QueryError::Transport`], [`ConnectionError`]).

use thiserror::Error;

/// Result type alias for MXBridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Main error type for MXBridge operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Query error
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
}

/// Errors in configured names, expressions or configuration files.
///
/// Scope: one dimension (or the whole file when loading).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Object name could not be parsed
    #[error("'{name}' is not a valid object name: {reason}")]
    InvalidObjectName { name: String, reason: String },

    /// Attribute expression could not be parsed
    #[error("Invalid attribute expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    /// Expression asks for a shape the resolved query does not have
    #[error("Expression '{expression}' does not fit {variant} attribute '{attribute}'")]
    ShapeMismatch {
        expression: String,
        attribute: String,
        variant: &'static str,
    },

    /// Field of a structured attribute is not numeric
    #[error("Field '{field}' of attribute '{attribute}' is not numeric (was {found})")]
    NonNumericField {
        attribute: String,
        field: String,
        found: String,
    },

    /// Configuration file could not be read
    #[error("Failed to read configuration '{path}': {reason}")]
    Io { path: String, reason: String },

    /// Configuration document could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Configuration document is inconsistent
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors while sampling one attribute.
///
/// Scope: one query, except [`QueryError::Transport`] which drops the
/// whole connection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// No open connection to query through
    #[error("Could not query attribute '{attribute}' of '{object}': not connected")]
    NotConnected { object: String, attribute: String },

    /// Managed object does not exist
    #[error("Managed object '{object}' not found")]
    InstanceNotFound { object: String },

    /// Attribute does not exist on the managed object
    #[error("Attribute '{attribute}' of '{object}' not found")]
    AttributeNotFound { object: String, attribute: String },

    /// Attribute value has a type that cannot be collected
    #[error("Attribute '{attribute}' of '{object}' has unsupported type {type_name}")]
    UnsupportedType {
        object: String,
        attribute: String,
        type_name: String,
    },

    /// Attribute value changed shape after it was probed
    #[error("Attribute '{attribute}' of '{object}' expected to be {expected}, was {found}")]
    WrongShape {
        object: String,
        attribute: String,
        expected: &'static str,
        found: String,
    },

    /// Remote side answered with an error
    #[error("Could not query attribute '{attribute}' of '{object}': {reason}")]
    Remote {
        object: String,
        attribute: String,
        reason: String,
    },

    /// Transport failure (I/O); the connection is considered lost
    #[error("Transport error while querying '{attribute}' of '{object}': {reason}")]
    Transport {
        object: String,
        attribute: String,
        reason: String,
    },
}

impl QueryError {
    /// Whether the underlying cause is an I/O failure of the connection
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Errors while establishing a connection
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectionError {
    /// Service URL could not be understood by the connector
    #[error("Invalid service URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Remote endpoint refused or could not be reached
    #[error("Failed to connect to '{url}': {reason}")]
    Unreachable { url: String, reason: String },

    /// Remote endpoint answered but is not a management agent
    #[error("Handshake with '{url}' failed: {reason}")]
    Handshake { url: String, reason: String },
}
