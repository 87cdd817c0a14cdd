// MXBridge Jolokia - HTTP transport for MXBridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for the Jolokia transport

use mxbridge::{ConnectionError, QueryError};
use thiserror::Error;

/// Failures of one Jolokia request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JolokiaError {
    /// Request could not be sent or the answer not received
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Agent answered with an HTTP error status
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Answer is not a Jolokia response
    #[error("Malformed response: {0}")]
    Decode(String),

    /// Agent answered with an error status
    #[error("{error_type} ({status}): {message}")]
    Agent {
        status: u16,
        error_type: String,
        message: String,
    },
}

impl JolokiaError {
    /// Whether the request failed below the Jolokia protocol
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::HttpStatus(_) | Self::Decode(_))
    }

    /// Classify as a query failure for one attribute
    pub fn into_query_error(self, object: &str, attribute: &str) -> QueryError {
        let object = object.to_string();
        let attribute = attribute.to_string();
        match self {
            Self::Agent { error_type, .. } if error_type.ends_with("InstanceNotFoundException") => {
                QueryError::InstanceNotFound { object }
            }
            Self::Agent { error_type, .. }
                if error_type.ends_with("AttributeNotFoundException") =>
            {
                QueryError::AttributeNotFound { object, attribute }
            }
            e @ Self::Agent { .. } => QueryError::Remote {
                object,
                attribute,
                reason: e.to_string(),
            },
            e => QueryError::Transport {
                object,
                attribute,
                reason: e.to_string(),
            },
        }
    }

    /// Classify as a failed connection attempt
    pub fn into_connection_error(self, url: &str) -> ConnectionError {
        let url = url.to_string();
        match self {
            Self::Http(reason) => ConnectionError::Unreachable { url, reason },
            e => ConnectionError::Handshake {
                url,
                reason: e.to_string(),
            },
        }
    }
}
