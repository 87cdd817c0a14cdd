// MXBridge - Managed attribute metrics bridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Managed object names
//!
//! An [`ObjectName`] identifies exactly one managed object on a remote
//! server. It is written as `domain:key=value[,key=value...]`, for example
//! `java.lang:type=Memory` or `java.lang:type=GarbageCollector,name=G1 Young Generation`.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::ConfigError;

/// Validated name of a remote managed object
///
/// Two names are equal when their domains and key property sets are equal,
/// whatever the order of the properties in the configured string.
#[derive(Debug, Clone)]
pub struct ObjectName {
    raw: String,
    domain: String,
    properties: BTreeMap<String, String>,
}

impl ObjectName {
    /// Parse an object name
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidObjectName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(invalid("name is empty"));
        }

        let (domain, key_list) = trimmed
            .split_once(':')
            .ok_or_else(|| invalid("missing ':' between domain and key properties"))?;

        if domain.contains(['*', '?']) {
            return Err(invalid("domain patterns are not allowed"));
        }
        if domain.contains(['=', ',', '\n']) {
            return Err(invalid("domain contains a reserved character"));
        }

        let mut properties = BTreeMap::new();
        for property in split_properties(key_list).map_err(|reason| invalid(reason))? {
            let (key, value) = property
                .split_once('=')
                .ok_or_else(|| invalid("key property without '='"))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(invalid("empty key"));
            }
            if key.contains([':', '*', '?', '"']) {
                return Err(invalid("key contains a reserved character"));
            }
            if value.is_empty() {
                return Err(invalid("empty value"));
            }
            if !value.starts_with('"') && value.contains(['*', '?']) {
                return Err(invalid("value patterns are not allowed"));
            }
            if properties.insert(key.to_string(), value.to_string()).is_some() {
                return Err(invalid("duplicate key"));
            }
        }

        if properties.is_empty() {
            return Err(invalid("at least one key property is required"));
        }

        Ok(Self {
            raw: trimmed.to_string(),
            domain: domain.to_string(),
            properties,
        })
    }

    /// Domain part of the name
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Value of one key property
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Iterate over key properties in canonical (sorted) order
    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Name as it was configured
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Canonical form: domain followed by key properties in sorted order
    pub fn canonical(&self) -> String {
        let props: Vec<String> = self
            .properties
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{}:{}", self.domain, props.join(","))
    }
}

/// Split a key property list on commas that are not inside quoted values
fn split_properties(list: &str) -> Result<Vec<&str>, &'static str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in list.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if in_quotes {
        return Err("unterminated quoted value");
    }
    if start < list.len() || !parts.is_empty() {
        parts.push(&list[start..]);
    }
    Ok(parts)
}

impl PartialEq for ObjectName {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain && self.properties == other.properties
    }
}

impl Eq for ObjectName {}

impl Hash for ObjectName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.domain.hash(state);
        self.properties.hash(state);
    }
}

impl FromStr for ObjectName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let name = ObjectName::parse("java.lang:type=Memory").unwrap();
        assert_eq!(name.domain(), "java.lang");
        assert_eq!(name.property("type"), Some("Memory"));
        assert_eq!(name.to_string(), "java.lang:type=Memory");
    }

    #[test]
    fn test_parse_multiple_properties() {
        let name =
            ObjectName::parse("java.lang:type=GarbageCollector,name=G1 Young Generation").unwrap();
        assert_eq!(name.property("name"), Some("G1 Young Generation"));
        assert_eq!(
            name.canonical(),
            "java.lang:name=G1 Young Generation,type=GarbageCollector"
        );
    }

    #[test]
    fn test_property_order_is_not_significant() {
        let a = ObjectName::parse("d:type=A,name=B").unwrap();
        let b = ObjectName::parse("d:name=B,type=A").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_quoted_value_with_comma() {
        let name = ObjectName::parse(r#"app:type=Cache,name="a,b""#).unwrap();
        assert_eq!(name.property("name"), Some(r#""a,b""#));
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in [
            "",
            "java.lang",
            "java.lang:",
            "java.lang:type",
            "java.lang:=Memory",
            "java.lang:type=",
            "java.lang:type=A,type=B",
            "java.lang:type=*",
            "java.*:type=Memory",
            r#"app:name="open"#,
        ] {
            assert!(
                matches!(
                    ObjectName::parse(bad),
                    Err(ConfigError::InvalidObjectName { .. })
                ),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_from_str() {
        let name: ObjectName = "java.lang:type=Threading".parse().unwrap();
        assert_eq!(name.property("type"), Some("Threading"));
    }
}
