// MXBridge - Managed attribute metrics bridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Collector set
//!
//! Fans the module configuration out to one [`ServerCollector`] per server
//! and aggregates their charts. Collectors share no state, so cycles and
//! shutdown can run on one thread per collector.

use std::sync::Arc;
use std::thread;

use log::{info, warn};

use crate::chart::Chart;
use crate::collector::ServerCollector;
use crate::config::{ChartConfig, ModuleConfig, ServerConfig};
use crate::connection::{Connector, MBeanServer};
use crate::error::ConfigError;

/// All collectors of one module
#[derive(Debug, Default)]
pub struct CollectorSet {
    collectors: Vec<ServerCollector>,
    common_charts: Vec<ChartConfig>,
}

impl CollectorSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and connect one collector per server with a service URL
    ///
    /// Servers without a service URL are skipped. Unreachable servers are
    /// kept and retried during collection.
    pub fn from_config(
        mut config: ModuleConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        config.propagate_common_charts();

        let mut set = Self {
            collectors: Vec::with_capacity(config.jmx_servers.len()),
            common_charts: config.common_charts,
        };

        for server in config.jmx_servers {
            if server.service_url.is_none() {
                warn!("Skipping server '{}' without service URL", server.name);
                continue;
            }
            let collector = ServerCollector::connect(server, Arc::clone(&connector))?;
            set.collectors.push(collector);
        }

        info!("Created {} collectors", set.collectors.len());
        Ok(set)
    }

    /// Add a collector over an already open handle using the common charts
    ///
    /// Returns `false` when the process is already monitored.
    pub fn add_local(&mut self, name: impl Into<String>, server: Box<dyn MBeanServer>) -> bool {
        let config = ServerConfig::local(name).with_charts(self.common_charts.clone());
        self.add_unique(ServerCollector::local(config, server))
    }

    /// Add a collector unless another one monitors the same process
    ///
    /// Processes are compared by runtime name. A duplicate is closed and
    /// dropped; a collector whose runtime name cannot be read is added.
    pub fn add_unique(&mut self, mut collector: ServerCollector) -> bool {
        let runtime_name = match collector.runtime_name() {
            Ok(name) => name,
            Err(e) => {
                warn!(
                    "Could not read runtime name of {}: {}",
                    collector.name(),
                    e
                );
                self.collectors.push(collector);
                return true;
            }
        };

        let duplicate = self
            .runtime_names()
            .into_iter()
            .find(|(_, name)| *name == runtime_name)
            .map(|(server, _)| server);

        if let Some(existing) = duplicate {
            info!(
                "Not adding {}: process {} is already monitored as {}",
                collector.name(),
                runtime_name,
                existing
            );
            collector.close();
            return false;
        }

        self.collectors.push(collector);
        true
    }

    /// Runtime names of connected collectors, as (server, runtime name)
    ///
    /// Each collector reads its name remotely once and caches it.
    pub fn runtime_names(&mut self) -> Vec<(String, String)> {
        self.collectors
            .iter_mut()
            .filter(|c| c.is_connected() || c.cached_runtime_name().is_some())
            .filter_map(|c| {
                let name = c.runtime_name().ok()?;
                Some((c.name().to_string(), name))
            })
            .collect()
    }

    /// Add a collector without checking for duplicates
    pub fn push(&mut self, collector: ServerCollector) {
        self.collectors.push(collector);
    }

    /// Initialize every collector
    pub fn initialize(&mut self) -> Vec<&Chart> {
        for collector in &mut self.collectors {
            collector.initialize();
        }
        self.charts().collect()
    }

    /// Run one cycle on every collector, one after the other
    pub fn collect(&mut self) -> Vec<&Chart> {
        for collector in &mut self.collectors {
            collector.collect();
        }
        self.charts().collect()
    }

    /// Run one cycle on every collector, one thread per collector
    pub fn collect_parallel(&mut self) -> Vec<&Chart> {
        thread::scope(|scope| {
            for collector in &mut self.collectors {
                scope.spawn(move || {
                    collector.collect();
                });
            }
        });
        self.charts().collect()
    }

    /// Close every collector, one thread per collector
    pub fn close(&mut self) {
        thread::scope(|scope| {
            for collector in &mut self.collectors {
                scope.spawn(move || collector.close());
            }
        });
    }

    /// Charts of all collectors
    pub fn charts(&self) -> impl Iterator<Item = &Chart> {
        self.collectors.iter().flat_map(|c| c.charts().iter())
    }

    /// Collectors in insertion order
    pub fn collectors(&self) -> &[ServerCollector] {
        &self.collectors
    }

    /// Collector by server name
    pub fn get(&self, name: &str) -> Option<&ServerCollector> {
        self.collectors.iter().find(|c| c.name() == name)
    }

    /// Common charts used for local collectors
    pub fn common_charts(&self) -> &[ChartConfig] {
        &self.common_charts
    }

    /// Number of collectors
    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    /// Whether the set has no collector
    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}
