// MXBridge - Managed attribute metrics bridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Attribute queries
//!
//! An [`AttributeQuery`] samples one attribute of one managed object and
//! feeds every dimension attached to it. Its variant is fixed by probing the
//! attribute once, when the query is created:
//!
//! | Probed value | Expression       | Variant            |
//! |--------------|------------------|--------------------|
//! | numeric      | `Attr`           | `Simple`           |
//! | structured   | `Attr.field`     | `Composite`        |
//! | structured   | `Attr.a/Attr.b`  | `CompositePercent` |

use log::debug;

use crate::chart::{Chart, DimensionSlot};
use crate::connection::MBeanServer;
use crate::error::{BridgeError, ConfigError, QueryError};
use crate::expression::{AttributeExpression, ExpressionKind, RatioSpec};
use crate::object_name::ObjectName;
use crate::store::{CompositeStore, ScalarStore};
use crate::value::{coerce, AttributeValue, CompositeData};

/// Fixed-point scale applied to ratios
pub const RATIO_SCALE: f64 = 1000.0;

/// Shape of a probed attribute
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// Integer, long or floating point value
    Numeric(f64),
    /// Structured value with named fields
    Structured(CompositeData),
    /// Anything that cannot be collected, with its type name
    Unsupported(String),
}

impl ProbeOutcome {
    /// Classify a sampled value
    pub fn of(value: AttributeValue) -> Self {
        if let Some(v) = coerce(&value) {
            return Self::Numeric(v);
        }
        match value {
            AttributeValue::Composite(data) => Self::Structured(data),
            other => Self::Unsupported(other.type_name()),
        }
    }
}

/// Variant of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryVariant {
    /// Scalar attribute
    Simple,
    /// Fields of a structured attribute
    Composite,
    /// Ratios of fields of a structured attribute
    CompositePercent,
}

impl QueryVariant {
    /// Human readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Composite => "composite",
            Self::CompositePercent => "composite percent",
        }
    }
}

/// One ratio and the dimensions showing it
#[derive(Debug, Clone)]
struct RatioBinding {
    ratio: RatioSpec,
    store: ScalarStore,
}

#[derive(Debug, Clone)]
enum QueryKind {
    Simple(ScalarStore),
    Composite(CompositeStore),
    CompositePercent(Vec<RatioBinding>),
}

/// Sampling unit for one (object, attribute) pair
#[derive(Debug, Clone)]
pub struct AttributeQuery {
    object: ObjectName,
    attribute: String,
    enabled: bool,
    kind: QueryKind,
}

impl AttributeQuery {
    /// Create a query by sampling the attribute once
    ///
    /// The probed shape and the expression decide the variant. The new query
    /// is enabled and has no dimensions yet.
    pub fn probe(
        server: &mut dyn MBeanServer,
        object: &ObjectName,
        expression: &AttributeExpression,
    ) -> Result<Self, QueryError> {
        let attribute = expression.attribute();
        let value = server.get_attribute(object, attribute)?;

        let kind = match ProbeOutcome::of(value) {
            ProbeOutcome::Numeric(_) => QueryKind::Simple(ScalarStore::new()),
            ProbeOutcome::Structured(_) if expression.is_ratio() => {
                QueryKind::CompositePercent(Vec::new())
            }
            ProbeOutcome::Structured(_) => QueryKind::Composite(CompositeStore::new()),
            ProbeOutcome::Unsupported(type_name) => {
                return Err(QueryError::UnsupportedType {
                    object: object.to_string(),
                    attribute: attribute.to_string(),
                    type_name,
                })
            }
        };

        Ok(Self {
            object: object.clone(),
            attribute: attribute.to_string(),
            enabled: true,
            kind,
        })
    }

    /// Attach a dimension reading `expression`
    ///
    /// Ratio expressions re-sample the attribute and require both fields to
    /// be numeric.
    pub fn add_dimension(
        &mut self,
        slot: DimensionSlot,
        expression: &AttributeExpression,
        server: &mut dyn MBeanServer,
    ) -> Result<(), BridgeError> {
        let mismatch = |variant: QueryVariant| ConfigError::ShapeMismatch {
            expression: expression.to_string(),
            attribute: expression.attribute().to_string(),
            variant: variant.as_str(),
        };

        if expression.attribute() != self.attribute {
            return Err(mismatch(self.variant()).into());
        }

        let variant = self.variant();
        match (&mut self.kind, expression.kind()) {
            (QueryKind::Simple(store), ExpressionKind::Scalar) => store.attach(slot),
            (QueryKind::Composite(store), ExpressionKind::Field(field)) => {
                store.attach(slot, field.as_str())
            }
            (QueryKind::CompositePercent(bindings), ExpressionKind::Ratio(ratio)) => {
                let value = server.get_attribute(&self.object, &self.attribute)?;
                let data = value
                    .as_composite()
                    .ok_or_else(|| wrong_shape(&self.object, &self.attribute, "composite", &value))?;
                for field in [&ratio.numerator, &ratio.denominator] {
                    if data.get_f64(field).is_none() {
                        return Err(ConfigError::NonNumericField {
                            attribute: self.attribute.clone(),
                            field: field.clone(),
                            found: data
                                .get(field)
                                .map_or_else(|| "missing".to_string(), AttributeValue::type_name),
                        }
                        .into());
                    }
                }

                match bindings.iter_mut().find(|b| &b.ratio == ratio) {
                    Some(binding) => binding.store.attach(slot),
                    None => {
                        let mut store = ScalarStore::new();
                        store.attach(slot);
                        bindings.push(RatioBinding {
                            ratio: ratio.clone(),
                            store,
                        });
                    }
                }
            }
            _ => return Err(mismatch(variant).into()),
        }

        Ok(())
    }

    /// Sample the attribute once and update every attached dimension
    pub fn query(
        &mut self,
        server: &mut dyn MBeanServer,
        charts: &mut [Chart],
    ) -> Result<(), QueryError> {
        let value = server.get_attribute(&self.object, &self.attribute)?;

        match &mut self.kind {
            QueryKind::Simple(store) => {
                let v = coerce(&value)
                    .ok_or_else(|| wrong_shape(&self.object, &self.attribute, "numeric", &value))?;
                store.update(v, charts);
            }
            QueryKind::Composite(store) => match value {
                AttributeValue::Composite(data) => store.update(data, charts),
                other => {
                    return Err(wrong_shape(&self.object, &self.attribute, "composite", &other))
                }
            },
            QueryKind::CompositePercent(bindings) => {
                let data = value
                    .as_composite()
                    .ok_or_else(|| wrong_shape(&self.object, &self.attribute, "composite", &value))?;
                for binding in bindings.iter_mut() {
                    match compute_ratio(data, &binding.ratio) {
                        Some(v) => binding.store.update(v, charts),
                        None => debug!(
                            "Skipping ratio {}/{} of {} on {}: field not numeric",
                            binding.ratio.numerator,
                            binding.ratio.denominator,
                            self.attribute,
                            self.object
                        ),
                    }
                }
            }
        }

        Ok(())
    }

    /// Whether the query is sampled during collection
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable sampling
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Managed object read by this query
    pub fn object(&self) -> &ObjectName {
        &self.object
    }

    /// Attribute read by this query
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Variant fixed at probe time
    pub fn variant(&self) -> QueryVariant {
        match self.kind {
            QueryKind::Simple(_) => QueryVariant::Simple,
            QueryKind::Composite(_) => QueryVariant::Composite,
            QueryKind::CompositePercent(_) => QueryVariant::CompositePercent,
        }
    }

    /// Slots of every attached dimension
    pub fn dimension_slots(&self) -> Vec<DimensionSlot> {
        match &self.kind {
            QueryKind::Simple(store) => store.slots().to_vec(),
            QueryKind::Composite(store) => store.fields().map(|(slot, _)| slot).collect(),
            QueryKind::CompositePercent(bindings) => bindings
                .iter()
                .flat_map(|b| b.store.slots().iter().copied())
                .collect(),
        }
    }

    /// Number of attached dimensions
    pub fn dimension_count(&self) -> usize {
        match &self.kind {
            QueryKind::Simple(store) => store.slots().len(),
            QueryKind::Composite(store) => store.len(),
            QueryKind::CompositePercent(bindings) => {
                bindings.iter().map(|b| b.store.slots().len()).sum()
            }
        }
    }
}

/// Scaled ratio of two fields, `None` if either field is not numeric
///
/// Division by zero is not guarded and yields infinity or NaN.
pub fn compute_ratio(data: &CompositeData, ratio: &RatioSpec) -> Option<f64> {
    let numerator = data.get_f64(&ratio.numerator)?;
    let denominator = data.get_f64(&ratio.denominator)?;
    let value = numerator / denominator;
    let value = if ratio.complement { 1.0 - value } else { value };
    Some(value * RATIO_SCALE)
}

fn wrong_shape(
    object: &ObjectName,
    attribute: &str,
    expected: &'static str,
    found: &AttributeValue,
) -> QueryError {
    QueryError::WrongShape {
        object: object.to_string(),
        attribute: attribute.to_string(),
        expected,
        found: found.type_name(),
    }
}
