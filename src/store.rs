// MXBridge - Managed attribute metrics bridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Value stores
//!
//! A store keeps the latest value sampled by one query and knows which
//! dimensions it feeds. Writing a value into a store writes it into every
//! attached dimension.

use crate::chart::{write_slot, Chart, DimensionSlot};
use crate::value::CompositeData;

/// Latest coerced scalar and the dimensions showing it
#[derive(Debug, Clone, Default)]
pub struct ScalarStore {
    value: Option<f64>,
    slots: Vec<DimensionSlot>,
}

impl ScalarStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a dimension
    pub fn attach(&mut self, slot: DimensionSlot) {
        if !self.slots.contains(&slot) {
            self.slots.push(slot);
        }
    }

    /// Store a value and write it into every attached dimension
    pub fn update(&mut self, value: f64, charts: &mut [Chart]) {
        self.value = Some(value);
        for slot in &self.slots {
            write_slot(charts, *slot, value);
        }
    }

    /// Latest stored value
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Attached dimensions
    pub fn slots(&self) -> &[DimensionSlot] {
        &self.slots
    }
}

/// Latest structured snapshot and the field each dimension reads
#[derive(Debug, Clone, Default)]
pub struct CompositeStore {
    snapshot: Option<CompositeData>,
    fields: Vec<(DimensionSlot, String)>,
}

impl CompositeStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a dimension reading `field`
    pub fn attach(&mut self, slot: DimensionSlot, field: impl Into<String>) {
        self.fields.push((slot, field.into()));
    }

    /// Store a snapshot and write each dimension's field
    ///
    /// Dimensions whose field is missing or not numeric keep their value.
    pub fn update(&mut self, data: CompositeData, charts: &mut [Chart]) {
        for (slot, field) in &self.fields {
            if let Some(value) = data.get_f64(field) {
                write_slot(charts, *slot, value);
            }
        }
        self.snapshot = Some(data);
    }

    /// Latest stored snapshot
    pub fn snapshot(&self) -> Option<&CompositeData> {
        self.snapshot.as_ref()
    }

    /// Attached dimensions with the field they read
    pub fn fields(&self) -> impl Iterator<Item = (DimensionSlot, &str)> {
        self.fields.iter().map(|(slot, f)| (*slot, f.as_str()))
    }

    /// Number of attached dimensions
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no dimension is attached
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
