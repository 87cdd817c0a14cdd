// MXBridge Exporter - Prometheus exporter for MXBridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for the exporter

use mxbridge::ConfigError;
use thiserror::Error;

/// Result type alias for exporter operations
pub type Result<T> = std::result::Result<T, ExporterError>;

/// Errors that stop the exporter
#[derive(Error, Debug)]
pub enum ExporterError {
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Listening socket could not be opened
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    /// HTTP server stopped with an error
    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),

    /// Poller thread panicked
    #[error("Poller failed: {0}")]
    Poller(String),
}
