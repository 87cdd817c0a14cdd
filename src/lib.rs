//! # MXBridge - Managed attribute metrics bridge
//!
//! Samples attributes of managed objects exposed by a running process and
//! republishes them as chart dimensions for a monitoring backend.
//!
//! ## Key Features
//!
//! - **One sample per attribute**: dimensions reading the same attribute share one query
//! - **Shape probing**: scalar, structured and ratio queries picked from the first sample
//! - **Layered failures**: a bad dimension, query or connection only affects itself
//! - **Rate-limited reconnects**: lost connections are retried on a fixed interval
//!
//! ## Quick Start
//!
//! ```rust
//! use mxbridge::{ChartConfig, DimensionConfig, MemoryServer, ServerCollector, ServerConfig};
//!
//! let server = MemoryServer::new()
//!     .with_attribute("java.lang:type=Threading", "ThreadCount", 12)
//!     .unwrap();
//!
//! let config = ServerConfig::local("app").with_charts(vec![
//!     ChartConfig::new("threads", "Threads", "threads").with_dimension(
//!         DimensionConfig::new("live", "java.lang:type=Threading", "ThreadCount"),
//!     ),
//! ]);
//!
//! let mut collector = ServerCollector::local(config, Box::new(server));
//! collector.initialize();
//!
//! let charts = collector.collect();
//! assert_eq!(charts[0].dimensions()[0].value(), Some(12.0));
//! ```
//!
//! ## Modules
//!
//! - [`connection`]: Transport traits and the connection lifecycle
//! - [`query`]: Attribute queries and their variants
//! - [`registry`]: Query deduplication
//! - [`collector`]: Per-server collection cycle
//! - [`set`]: All collectors of one module
//! - [`config`]: Module configuration
//! - [`memory`]: In-process managed server

// Modules
pub mod chart;
pub mod collector;
pub mod config;
pub mod connection;
pub mod error;
pub mod expression;
pub mod memory;
pub mod object_name;
pub mod query;
pub mod registry;
pub mod set;
pub mod store;
pub mod value;

// Re-exports for convenient access
pub use chart::{Chart, ChartType, Dimension, DimensionAlgorithm, DimensionSlot};
pub use collector::{CycleStats, ServerCollector, RUNTIME_NAME_ATTRIBUTE, RUNTIME_OBJECT};
pub use config::{ChartConfig, DimensionConfig, ModuleConfig, ServerConfig};
pub use connection::{
    ConnectionManager, Connector, HandleOwnership, MBeanServer, RECONNECT_INTERVAL,
};
pub use error::{BridgeError, ConfigError, ConnectionError, QueryError, Result};
pub use expression::{AttributeExpression, ExpressionKind, RatioSpec};
pub use memory::{MemoryConnector, MemoryServer};
pub use object_name::ObjectName;
pub use query::{AttributeQuery, ProbeOutcome, QueryVariant, RATIO_SCALE};
pub use registry::{QueryRegistry, Resolution};
pub use set::CollectorSet;
pub use store::{CompositeStore, ScalarStore};
pub use value::{coerce, AttributeValue, CompositeData};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
