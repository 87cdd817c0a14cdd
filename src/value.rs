// MXBridge - Managed attribute metrics bridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Remote attribute values and numeric coercion
//!
//! The shape of a remote attribute is only known once it has been read.
//! [`AttributeValue`] models what a server can return; [`coerce`] turns the
//! numeric cases into one `f64`.

use std::collections::BTreeMap;
use std::fmt;

/// Value of a remote attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// Double precision floating point
    Double(f64),
    /// Boolean flag
    Boolean(bool),
    /// Text
    Text(String),
    /// Structured value with named fields
    Composite(CompositeData),
    /// Any other type the server may expose (arrays, null, tabular data)
    Other(String),
}

impl AttributeValue {
    /// Coerce numeric values to `f64`
    pub fn as_f64(&self) -> Option<f64> {
        coerce(self)
    }

    /// Whether the value is one of the numeric variants
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Long(_) | Self::Double(_))
    }

    /// Structured value, if this is one
    pub fn as_composite(&self) -> Option<&CompositeData> {
        match self {
            Self::Composite(data) => Some(data),
            _ => None,
        }
    }

    /// Text value, if this is one
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Short type description used in error messages
    pub fn type_name(&self) -> String {
        match self {
            Self::Int(_) => "int".to_string(),
            Self::Long(_) => "long".to_string(),
            Self::Double(_) => "double".to_string(),
            Self::Boolean(_) => "boolean".to_string(),
            Self::Text(_) => "text".to_string(),
            Self::Composite(_) => "composite".to_string(),
            Self::Other(name) => name.clone(),
        }
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<CompositeData> for AttributeValue {
    fn from(v: CompositeData) -> Self {
        Self::Composite(v)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Long(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Text(v) => f.write_str(v),
            Self::Composite(data) => write!(f, "{{{} fields}}", data.len()),
            Self::Other(name) => write!(f, "<{}>", name),
        }
    }
}

/// Structured attribute value: named fields, each independently readable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeData {
    fields: BTreeMap<String, AttributeValue>,
}

impl CompositeData {
    /// Create an empty composite value
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a field
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Read a field
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.fields.get(key)
    }

    /// Read a field coerced to `f64`
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(coerce)
    }

    /// Field names in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for CompositeData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = Self::new();
        for (k, v) in iter {
            data.insert(k, v);
        }
        data
    }
}

/// Convert an integer, long or floating point value to `f64`
///
/// Returns `None` for every non-numeric value.
pub fn coerce(value: &AttributeValue) -> Option<f64> {
    match value {
        AttributeValue::Int(v) => Some(f64::from(*v)),
        AttributeValue::Long(v) => Some(*v as f64),
        AttributeValue::Double(v) => Some(*v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_numeric_variants_agree() {
        assert_eq!(coerce(&AttributeValue::Int(5)), Some(5.0));
        assert_eq!(coerce(&AttributeValue::Long(5)), Some(5.0));
        assert_eq!(coerce(&AttributeValue::Double(5.0)), Some(5.0));
    }

    #[test]
    fn test_coerce_extremes() {
        assert_eq!(coerce(&AttributeValue::Int(i32::MIN)), Some(-2147483648.0));
        assert_eq!(
            coerce(&AttributeValue::Long(1 << 40)),
            Some(1_099_511_627_776.0)
        );
        assert!(coerce(&AttributeValue::Double(f64::NAN)).unwrap().is_nan());
    }

    #[test]
    fn test_coerce_rejects_non_numeric() {
        assert_eq!(coerce(&AttributeValue::Boolean(true)), None);
        assert_eq!(coerce(&AttributeValue::Text("5".to_string())), None);
        assert_eq!(
            coerce(&AttributeValue::Composite(CompositeData::new())),
            None
        );
        assert_eq!(coerce(&AttributeValue::Other("array".to_string())), None);
    }

    #[test]
    fn test_composite_fields() {
        let data = CompositeData::new()
            .with("used", 30i64)
            .with("max", 40)
            .with("name", "heap");

        assert_eq!(data.len(), 3);
        assert_eq!(data.get_f64("used"), Some(30.0));
        assert_eq!(data.get_f64("max"), Some(40.0));
        assert_eq!(data.get_f64("name"), None);
        assert_eq!(data.get_f64("missing"), None);
        assert_eq!(data.keys().collect::<Vec<_>>(), vec!["max", "name", "used"]);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(AttributeValue::Long(1).type_name(), "long");
        assert_eq!(
            AttributeValue::Composite(CompositeData::new()).type_name(),
            "composite"
        );
        assert_eq!(AttributeValue::Other("array".to_string()).type_name(), "array");
    }
}
