// MXBridge - Managed attribute metrics bridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Charts and dimensions handed to the monitoring backend

use serde::{Deserialize, Serialize};

/// How the backend renders a chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    /// Line chart
    #[default]
    Line,
    /// Area chart
    Area,
    /// Stacked area chart
    Stacked,
}

impl ChartType {
    /// Backend name of the chart type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Area => "area",
            Self::Stacked => "stacked",
        }
    }
}

/// How the backend interprets successive dimension values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DimensionAlgorithm {
    /// Value is shown as collected
    #[default]
    Absolute,
    /// Difference to the previous value is shown
    Incremental,
    /// Percentage of the row sum of absolute values
    PercentageOfAbsoluteRow,
    /// Percentage of the row sum of incremental values
    PercentageOfIncrementalRow,
}

impl DimensionAlgorithm {
    /// Backend name of the algorithm
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absolute => "absolute",
            Self::Incremental => "incremental",
            Self::PercentageOfAbsoluteRow => "percentage-of-absolute-row",
            Self::PercentageOfIncrementalRow => "percentage-of-incremental-row",
        }
    }
}

/// Position of a dimension inside a collector's chart list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DimensionSlot {
    /// Index of the chart
    pub chart: usize,
    /// Index of the dimension within the chart
    pub dimension: usize,
}

impl DimensionSlot {
    /// Create a slot
    pub fn new(chart: usize, dimension: usize) -> Self {
        Self { chart, dimension }
    }
}

/// One named numeric time series
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    /// Dimension identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Value interpretation
    pub algorithm: DimensionAlgorithm,
    /// Multiplier applied by the backend
    pub multiplier: i64,
    /// Divisor applied by the backend
    pub divisor: i64,
    /// Latest collected value, `None` until the first successful sample
    value: Option<f64>,
}

impl Dimension {
    /// Create a dimension with multiplier and divisor 1
    pub fn new(id: impl Into<String>, algorithm: DimensionAlgorithm) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            algorithm,
            multiplier: 1,
            divisor: 1,
            value: None,
        }
    }

    /// Set multiplier and divisor
    pub fn with_scale(mut self, multiplier: i64, divisor: i64) -> Self {
        self.multiplier = multiplier;
        self.divisor = divisor;
        self
    }

    /// Latest collected value
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Latest value with multiplier and divisor applied
    pub fn scaled_value(&self) -> Option<f64> {
        self.value
            .map(|v| v * self.multiplier as f64 / self.divisor as f64)
    }

    pub(crate) fn set_value(&mut self, value: f64) {
        self.value = Some(value);
    }
}

/// A named group of dimensions rendered together
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    /// Type identifier, shared by all charts of one server
    pub type_id: String,
    /// Chart identifier
    pub id: String,
    /// Family (menu section) of the chart
    pub family: Option<String>,
    /// Title
    pub title: String,
    /// Units of all dimensions
    pub units: String,
    /// Context, the name of the monitored server
    pub context: String,
    /// Render type
    pub chart_type: ChartType,
    /// Sort priority
    pub priority: Option<u32>,
    dimensions: Vec<Dimension>,
}

impl Chart {
    /// Create an empty chart
    pub fn new(
        type_id: impl Into<String>,
        id: impl Into<String>,
        title: impl Into<String>,
        units: impl Into<String>,
    ) -> Self {
        Self {
            type_id: type_id.into(),
            id: id.into(),
            family: None,
            title: title.into(),
            units: units.into(),
            context: String::new(),
            chart_type: ChartType::default(),
            priority: None,
            dimensions: Vec::new(),
        }
    }

    /// Full identifier `type_id.id`
    pub fn full_id(&self) -> String {
        format!("{}.{}", self.type_id, self.id)
    }

    /// Dimensions in the order they were added
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Find a dimension by id
    pub fn dimension(&self, id: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.id == id)
    }

    /// Index the next pushed dimension will get
    pub fn next_dimension_index(&self) -> usize {
        self.dimensions.len()
    }

    /// Append a dimension, returning its index
    pub fn push_dimension(&mut self, dimension: Dimension) -> usize {
        self.dimensions.push(dimension);
        self.dimensions.len() - 1
    }

    pub(crate) fn dimension_mut(&mut self, index: usize) -> Option<&mut Dimension> {
        self.dimensions.get_mut(index)
    }
}

/// Write a value into the dimension at `slot`
///
/// Slots that do not exist are ignored.
pub(crate) fn write_slot(charts: &mut [Chart], slot: DimensionSlot, value: f64) {
    if let Some(dimension) = charts
        .get_mut(slot.chart)
        .and_then(|chart| chart.dimension_mut(slot.dimension))
    {
        dimension.set_value(value);
    }
}
