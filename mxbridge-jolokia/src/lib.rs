// MXBridge Jolokia - HTTP transport for MXBridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # MXBridge Jolokia
//!
//! Reads managed attributes through a [Jolokia](https://jolokia.org) agent,
//! which exposes them as JSON over HTTP.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mxbridge::{ServerCollector, ServerConfig};
//! use mxbridge_jolokia::JolokiaConnector;
//!
//! let config = ServerConfig::remote("app", "http://localhost:8778/jolokia");
//! let mut collector = ServerCollector::connect(config, Arc::new(JolokiaConnector::new()))?;
//! collector.initialize();
//! collector.collect();
//! # Ok::<(), mxbridge::ConfigError>(())
//! ```
//!
//! Agent errors map to query errors of the same scope: unknown objects and
//! attributes disable one query, while HTTP failures drop the connection.

pub mod client;
pub mod error;
pub mod protocol;

pub use client::{JolokiaConnector, JolokiaServer};
pub use error::JolokiaError;
