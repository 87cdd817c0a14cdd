// MXBridge - Managed attribute metrics bridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Per-server collection
//!
//! A [`ServerCollector`] builds the charts of one server from its
//! configuration, then samples every enabled query once per cycle. Failures
//! never leave the collector: a bad dimension is skipped, a failing query is
//! disabled and a transport error drops the connection until the next
//! successful reconnect.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::chart::{Chart, Dimension, DimensionSlot};
use crate::config::{ChartConfig, DimensionConfig, ServerConfig};
use crate::connection::{ConnectionManager, Connector, MBeanServer};
use crate::error::{BridgeError, ConfigError, QueryError};
use crate::expression::AttributeExpression;
use crate::object_name::ObjectName;
use crate::registry::QueryRegistry;
use crate::value::AttributeValue;

/// Managed object describing the remote process
pub const RUNTIME_OBJECT: &str = "java.lang:type=Runtime";

/// Attribute of [`RUNTIME_OBJECT`] naming the remote process
pub const RUNTIME_NAME_ATTRIBUTE: &str = "Name";

/// Outcome of the last collection cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Queries sampled successfully
    pub sampled: usize,
    /// Queries that failed and were disabled
    pub failed: usize,
    /// Queries not sampled (disabled, disconnected or cycle halted)
    pub skipped: usize,
    /// A reconnect succeeded at the start of the cycle
    pub reconnected: bool,
    /// The connection was lost during the cycle
    pub connection_lost: bool,
}

/// Collects the charts of one server
#[derive(Debug)]
pub struct ServerCollector {
    config: ServerConfig,
    connection: ConnectionManager,
    registry: QueryRegistry,
    charts: Vec<Chart>,
    initialized: bool,
    last_cycle: CycleStats,
    runtime_name: Option<String>,
}

impl ServerCollector {
    /// Create a collector over an existing connection manager
    pub fn new(config: ServerConfig, connection: ConnectionManager) -> Self {
        Self {
            config,
            connection,
            registry: QueryRegistry::new(),
            charts: Vec::new(),
            initialized: false,
            last_cycle: CycleStats::default(),
            runtime_name: None,
        }
    }

    /// Create a collector for a remote server and connect to it
    ///
    /// A failed connection is not an error; it is retried during collection.
    pub fn connect(config: ServerConfig, connector: Arc<dyn Connector>) -> Result<Self, ConfigError> {
        let url = config.service_url.clone().ok_or_else(|| {
            ConfigError::Invalid(format!("server '{}' has no service URL", config.name))
        })?;
        let interval = Duration::from_secs(config.reconnect_interval_secs);

        let mut connection =
            ConnectionManager::remote(url, connector).with_reconnect_interval(interval);
        connection.connect();

        Ok(Self::new(config, connection))
    }

    /// Create a collector over an already open handle owned elsewhere
    pub fn local(config: ServerConfig, server: Box<dyn MBeanServer>) -> Self {
        Self::new(config, ConnectionManager::local(server))
    }

    /// Build charts and resolve the query of every dimension
    ///
    /// Dimensions that cannot be resolved are logged and left out. Calling
    /// this again returns the charts built the first time.
    pub fn initialize(&mut self) -> &[Chart] {
        if self.initialized {
            return &self.charts;
        }
        self.initialized = true;

        let chart_configs = self.config.charts().to_vec();
        for chart_config in &chart_configs {
            let chart = self.build_chart(chart_config);
            let chart_index = self.charts.len();
            self.charts.push(chart);

            for dimension in &chart_config.dimensions {
                if let Err(e) = self.add_dimension(chart_index, chart_config, dimension) {
                    warn!(
                        "Skipping dimension '{}' of chart '{}' on {}: {}",
                        dimension.name, chart_config.id, self.config.name, e
                    );
                    if matches!(&e, BridgeError::Query(q) if q.is_transport()) {
                        self.connection.mark_lost();
                    }
                }
            }
        }

        info!(
            "Initialized {} charts with {} queries on {}",
            self.charts.len(),
            self.registry.len(),
            self.config.name
        );
        &self.charts
    }

    fn build_chart(&self, config: &ChartConfig) -> Chart {
        let mut chart = Chart::new(
            format!("jmx_{}", self.config.name),
            config.id.clone(),
            config.title.clone(),
            config.units.clone(),
        );
        chart.family = config.family.clone();
        chart.priority = config.priority;
        chart.chart_type = config.chart_type;
        chart.context = self.config.name.clone();
        chart
    }

    fn add_dimension(
        &mut self,
        chart_index: usize,
        chart_config: &ChartConfig,
        config: &DimensionConfig,
    ) -> Result<(), BridgeError> {
        let object = ObjectName::parse(&config.from)?;
        let expression = AttributeExpression::parse(&config.value)?;

        let server = self
            .connection
            .server_mut()
            .ok_or_else(|| QueryError::NotConnected {
                object: object.to_string(),
                attribute: expression.attribute().to_string(),
            })?;

        let chart = &mut self.charts[chart_index];
        let slot = DimensionSlot::new(chart_index, chart.next_dimension_index());
        self.registry.attach(server, &object, &expression, slot)?;

        chart.push_dimension(
            Dimension::new(config.name.clone(), chart_config.dimension_algorithm)
                .with_scale(config.multiplier, config.divisor),
        );
        Ok(())
    }

    /// Run one collection cycle
    pub fn collect(&mut self) -> &[Chart] {
        self.collect_at(Instant::now())
    }

    /// Same as [`collect`](Self::collect) at a given time
    pub fn collect_at(&mut self, now: Instant) -> &[Chart] {
        let mut stats = CycleStats::default();

        if self.connection.reconnect_if_needed_at(now) {
            self.registry.enable_all();
            // The process behind the URL may have been restarted.
            self.runtime_name = None;
            stats.reconnected = true;
            info!("Re-enabled {} queries on {}", self.registry.len(), self.config.name);
        }

        let Some(server) = self.connection.server_mut() else {
            debug!("Not connected to {}, skipping cycle", self.config.name);
            stats.skipped = self.registry.len();
            self.last_cycle = stats;
            return &self.charts;
        };

        for query in self.registry.iter_mut() {
            if stats.connection_lost || !query.is_enabled() {
                stats.skipped += 1;
                continue;
            }

            match query.query(&mut *server, &mut self.charts) {
                Ok(()) => stats.sampled += 1,
                Err(e) => {
                    query.set_enabled(false);
                    stats.failed += 1;
                    warn!("Disabled query on {}: {}", self.config.name, e);
                    if e.is_transport() {
                        stats.connection_lost = true;
                    }
                }
            }
        }

        if stats.connection_lost {
            self.connection.mark_lost();
        }

        self.last_cycle = stats;
        &self.charts
    }

    /// Name of the remote process, unique per running process
    ///
    /// Read once and cached until the next reconnect.
    pub fn runtime_name(&mut self) -> Result<String, BridgeError> {
        if let Some(name) = &self.runtime_name {
            return Ok(name.clone());
        }

        let object = ObjectName::parse(RUNTIME_OBJECT)?;
        let server = self
            .connection
            .server_mut()
            .ok_or_else(|| QueryError::NotConnected {
                object: object.to_string(),
                attribute: RUNTIME_NAME_ATTRIBUTE.to_string(),
            })?;

        match server.get_attribute(&object, RUNTIME_NAME_ATTRIBUTE) {
            Ok(AttributeValue::Text(name)) => {
                self.runtime_name = Some(name.clone());
                Ok(name)
            }
            Ok(other) => Err(QueryError::WrongShape {
                object: object.to_string(),
                attribute: RUNTIME_NAME_ATTRIBUTE.to_string(),
                expected: "text",
                found: other.type_name(),
            }
            .into()),
            Err(e) => {
                if e.is_transport() {
                    self.connection.mark_lost();
                }
                Err(e.into())
            }
        }
    }

    /// Release the connection if this collector owns it
    ///
    /// Safe to call more than once.
    pub fn close(&mut self) {
        if !self.connection.is_closed() {
            debug!("Closing collector {}", self.config.name);
        }
        self.connection.close();
    }

    /// Server name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Configuration of this collector
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Charts with the values of the last cycle
    pub fn charts(&self) -> &[Chart] {
        &self.charts
    }

    /// Whether the connection is open
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Whether [`initialize`](Self::initialize) ran
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Queries the next cycle will sample; none while disconnected
    pub fn active_queries(&self) -> usize {
        if self.is_connected() {
            self.registry.enabled_count()
        } else {
            0
        }
    }

    /// Runtime name read by [`runtime_name`](Self::runtime_name), if any
    pub fn cached_runtime_name(&self) -> Option<&str> {
        self.runtime_name.as_deref()
    }

    /// Connection manager
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Query registry
    pub fn registry(&self) -> &QueryRegistry {
        &self.registry
    }

    /// Outcome of the last cycle
    pub fn last_cycle(&self) -> CycleStats {
        self.last_cycle
    }
}
