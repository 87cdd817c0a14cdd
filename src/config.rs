// MXBridge - Managed attribute metrics bridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Configuration types for MXBridge
//!
//! The module configuration is a JSON document:
//!
//! ```json
//! {
//!   "autoDetectLocalVirtualMachines": true,
//!   "jmxServers": [
//!     { "name": "app", "serviceUrl": "http://localhost:8778/jolokia" }
//!   ],
//!   "commonCharts": [
//!     {
//!       "id": "memory",
//!       "title": "Heap memory",
//!       "units": "bytes",
//!       "dimensions": [
//!         { "name": "used", "from": "java.lang:type=Memory", "value": "HeapMemoryUsage.used" }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chart::{ChartType, DimensionAlgorithm};
use crate::connection::RECONNECT_INTERVAL;
use crate::error::ConfigError;

/// Module-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleConfig {
    /// Also monitor processes found on this host
    pub auto_detect_local_virtual_machines: bool,

    /// Remote servers to monitor
    pub jmx_servers: Vec<ServerConfig>,

    /// Charts shared by every server
    pub common_charts: Vec<ChartConfig>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            auto_detect_local_virtual_machines: true,
            jmx_servers: Vec::new(),
            common_charts: Vec::new(),
        }
    }
}

impl ModuleConfig {
    /// Parse a configuration document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read and parse a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&json)
    }

    /// Copy common charts into every server
    ///
    /// A server without charts gets all of them; a server with charts gets
    /// those whose id it does not define itself.
    pub fn propagate_common_charts(&mut self) {
        for server in &mut self.jmx_servers {
            let charts = server.charts.get_or_insert_with(Vec::new);
            for common in &self.common_charts {
                if !charts.iter().any(|c| c.id == common.id) {
                    charts.push(common.clone());
                }
            }
        }
    }

    /// Check names, ids and divisors
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for server in &self.jmx_servers {
            if server.name.trim().is_empty() {
                return Err(ConfigError::Invalid("server without a name".to_string()));
            }
            if !names.insert(server.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate server name '{}'",
                    server.name
                )));
            }
            if let Some(charts) = &server.charts {
                validate_charts(charts, &server.name)?;
            }
        }
        validate_charts(&self.common_charts, "commonCharts")
    }
}

fn validate_charts(charts: &[ChartConfig], owner: &str) -> Result<(), ConfigError> {
    let mut ids = HashSet::new();
    for chart in charts {
        if chart.id.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "chart without an id in '{}'",
                owner
            )));
        }
        if !ids.insert(chart.id.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "duplicate chart id '{}' in '{}'",
                chart.id, owner
            )));
        }
        if let Some(dim) = chart.dimensions.iter().find(|d| d.divisor == 0) {
            return Err(ConfigError::Invalid(format!(
                "dimension '{}' of chart '{}' has a zero divisor",
                dim.name, chart.id
            )));
        }
    }
    Ok(())
}

/// One monitored server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Name, used as chart context and in chart type ids
    pub name: String,

    /// Address of the management agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,

    /// Charts of this server; `None` means "common charts only"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charts: Option<Vec<ChartConfig>>,

    /// Seconds between reconnect attempts
    #[serde(default = "default_reconnect_interval_secs")]
    pub reconnect_interval_secs: u64,
}

fn default_reconnect_interval_secs() -> u64 {
    RECONNECT_INTERVAL.as_secs()
}

impl ServerConfig {
    /// Remote server reachable under `service_url`
    pub fn remote(name: impl Into<String>, service_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service_url: Some(service_url.into()),
            charts: None,
            reconnect_interval_secs: default_reconnect_interval_secs(),
        }
    }

    /// Server reached through an already open handle
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service_url: None,
            charts: None,
            reconnect_interval_secs: default_reconnect_interval_secs(),
        }
    }

    /// Set the charts of this server
    pub fn with_charts(mut self, charts: Vec<ChartConfig>) -> Self {
        self.charts = Some(charts);
        self
    }

    /// Charts to build, empty when none are configured
    pub fn charts(&self) -> &[ChartConfig] {
        self.charts.as_deref().unwrap_or_default()
    }
}

/// One chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    /// Chart id, unique per server
    pub id: String,

    /// Title
    #[serde(default)]
    pub title: String,

    /// Units of all dimensions
    #[serde(default)]
    pub units: String,

    /// Family (menu section)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    /// Sort priority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,

    /// Render type
    #[serde(default)]
    pub chart_type: ChartType,

    /// Algorithm of every dimension of this chart
    #[serde(default, alias = "dimType")]
    pub dimension_algorithm: DimensionAlgorithm,

    /// Dimensions in display order
    #[serde(default)]
    pub dimensions: Vec<DimensionConfig>,
}

impl ChartConfig {
    /// Create a chart without dimensions
    pub fn new(id: impl Into<String>, title: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            units: units.into(),
            family: None,
            priority: None,
            chart_type: ChartType::default(),
            dimension_algorithm: DimensionAlgorithm::default(),
            dimensions: Vec::new(),
        }
    }

    /// Builder-style dimension append
    pub fn with_dimension(mut self, dimension: DimensionConfig) -> Self {
        self.dimensions.push(dimension);
        self
    }

    /// Set the dimension algorithm
    pub fn with_algorithm(mut self, algorithm: DimensionAlgorithm) -> Self {
        self.dimension_algorithm = algorithm;
        self
    }
}

/// One dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionConfig {
    /// Dimension name
    pub name: String,

    /// Object name of the managed object
    pub from: String,

    /// Attribute expression
    pub value: String,

    /// Multiplier applied by the backend
    #[serde(default = "one")]
    pub multiplier: i64,

    /// Divisor applied by the backend
    #[serde(default = "one")]
    pub divisor: i64,
}

fn one() -> i64 {
    1
}

impl DimensionConfig {
    /// Create a dimension with multiplier and divisor 1
    pub fn new(
        name: impl Into<String>,
        from: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from: from.into(),
            value: value.into(),
            multiplier: 1,
            divisor: 1,
        }
    }

    /// Set multiplier and divisor
    pub fn with_scale(mut self, multiplier: i64, divisor: i64) -> Self {
        self.multiplier = multiplier;
        self.divisor = divisor;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DOCUMENT: &str = r#"{
        "jmxServers": [
            { "name": "app", "serviceUrl": "memory://app" },
            {
                "name": "batch",
                "serviceUrl": "memory://batch",
                "reconnectIntervalSecs": 5,
                "charts": [
                    { "id": "threads", "title": "Threads", "units": "threads",
                      "dimensions": [
                        { "name": "live", "from": "java.lang:type=Threading", "value": "ThreadCount" }
                      ] }
                ]
            }
        ],
        "commonCharts": [
            { "id": "memory", "title": "Memory", "units": "bytes", "chartType": "stacked",
              "dimType": "incremental",
              "dimensions": [
                { "name": "heap", "from": "java.lang:type=Memory",
                  "value": "HeapMemoryUsage.used", "divisor": 1024 }
              ] },
            { "id": "threads", "title": "Common threads", "units": "threads" }
        ]
    }"#;

    #[test]
    fn test_parse_document() {
        let config = ModuleConfig::from_json_str(DOCUMENT).unwrap();

        assert!(config.auto_detect_local_virtual_machines);
        assert_eq!(config.jmx_servers.len(), 2);
        assert_eq!(config.jmx_servers[0].reconnect_interval_secs, 60);
        assert_eq!(config.jmx_servers[1].reconnect_interval_secs, 5);

        let memory = &config.common_charts[0];
        assert_eq!(memory.chart_type, ChartType::Stacked);
        assert_eq!(memory.dimension_algorithm, DimensionAlgorithm::Incremental);
        assert_eq!(memory.dimensions[0].multiplier, 1);
        assert_eq!(memory.dimensions[0].divisor, 1024);
    }

    #[test]
    fn test_propagate_common_charts() {
        let mut config = ModuleConfig::from_json_str(DOCUMENT).unwrap();
        config.propagate_common_charts();

        let app = config.jmx_servers[0].charts();
        assert_eq!(app.len(), 2);

        let batch = config.jmx_servers[1].charts();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].title, "Threads");
        assert_eq!(batch[1].id, "memory");
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut config = ModuleConfig::default();
        config.jmx_servers.push(ServerConfig::remote("app", "memory://a"));
        config.jmx_servers.push(ServerConfig::remote("app", "memory://b"));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ModuleConfig::default();
        config.common_charts.push(ChartConfig::new("c", "C", "u"));
        config.common_charts.push(ChartConfig::new("c", "C", "u"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_divisor() {
        let mut config = ModuleConfig::default();
        config.jmx_servers.push(ServerConfig::local("local").with_charts(vec![
            ChartConfig::new("c", "C", "u").with_dimension(
                DimensionConfig::new("d", "java.lang:type=Memory", "A").with_scale(1, 0),
            ),
        ]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unnamed_server() {
        let mut config = ModuleConfig::default();
        config.jmx_servers.push(ServerConfig::local(" "));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOCUMENT.as_bytes()).unwrap();

        let config = ModuleConfig::from_file(file.path()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.common_charts.len(), 2);
    }

    #[test]
    fn test_from_file_errors() {
        assert!(matches!(
            ModuleConfig::from_file("/nonexistent/mxbridge.json"),
            Err(ConfigError::Io { .. })
        ));
        assert!(matches!(
            ModuleConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
