// MXBridge Jolokia - HTTP transport for MXBridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Jolokia JSON protocol
//!
//! Requests are posted as JSON objects to the agent URL; every answer
//! carries its own `status` besides the HTTP one.

use mxbridge::{AttributeValue, CompositeData};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::JolokiaError;

/// Request sent to the agent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Request<'a> {
    /// Agent and protocol version
    Version,
    /// Read one attribute
    Read {
        /// Object name
        mbean: &'a str,
        /// Attribute name
        attribute: &'a str,
    },
}

/// Answer of the agent
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Response {
    /// Jolokia status, 200 on success
    pub status: u16,
    /// Payload on success
    #[serde(default)]
    pub value: Value,
    /// Error message on failure
    #[serde(default)]
    pub error: Option<String>,
    /// Java class name of the failure
    #[serde(default)]
    pub error_type: Option<String>,
}

impl Response {
    /// Decode a response body
    pub fn from_slice(body: &[u8]) -> Result<Self, JolokiaError> {
        serde_json::from_slice(body).map_err(|e| JolokiaError::Decode(e.to_string()))
    }

    /// Payload, or the agent error
    pub fn into_value(self) -> Result<Value, JolokiaError> {
        if self.status == 200 {
            return Ok(self.value);
        }
        Err(JolokiaError::Agent {
            status: self.status,
            error_type: self.error_type.unwrap_or_else(|| "unknown".to_string()),
            message: self.error.unwrap_or_default(),
        })
    }
}

/// Agent version reported by a `version` request
pub fn agent_version(value: &Value) -> Option<&str> {
    value.get("agent").and_then(Value::as_str)
}

/// Map a JSON payload to an attribute value
///
/// Integers become `Long`, other numbers `Double`, objects become
/// structured values. Arrays and `null` cannot be collected.
pub fn to_attribute_value(value: &Value) -> AttributeValue {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(v) => AttributeValue::Long(v),
            None => AttributeValue::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => AttributeValue::Text(s.clone()),
        Value::Bool(b) => AttributeValue::Boolean(*b),
        Value::Object(fields) => AttributeValue::Composite(
            fields
                .iter()
                .map(|(k, v)| (k.as_str(), to_attribute_value(v)))
                .collect::<CompositeData>(),
        ),
        Value::Array(_) => AttributeValue::Other("array".to_string()),
        Value::Null => AttributeValue::Other("null".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_encoding() {
        let read = serde_json::to_value(Request::Read {
            mbean: "java.lang:type=Memory",
            attribute: "HeapMemoryUsage",
        })
        .unwrap();
        assert_eq!(
            read,
            json!({"type": "read", "mbean": "java.lang:type=Memory", "attribute": "HeapMemoryUsage"})
        );
        assert_eq!(
            serde_json::to_value(Request::Version).unwrap(),
            json!({"type": "version"})
        );
    }

    #[test]
    fn test_value_mapping() {
        assert_eq!(to_attribute_value(&json!(5)), AttributeValue::Long(5));
        assert_eq!(to_attribute_value(&json!(0.5)), AttributeValue::Double(0.5));
        assert_eq!(to_attribute_value(&json!("x")), AttributeValue::Text("x".to_string()));
        assert_eq!(to_attribute_value(&json!(true)), AttributeValue::Boolean(true));
        assert!(matches!(to_attribute_value(&json!([1, 2])), AttributeValue::Other(_)));
        assert!(matches!(to_attribute_value(&Value::Null), AttributeValue::Other(_)));
    }

    #[test]
    fn test_composite_mapping() {
        let value = to_attribute_value(&json!({
            "init": 0, "used": 30, "committed": 40, "max": -1,
            "usage": {"peak": 2.5}
        }));

        let data = value.as_composite().unwrap();
        assert_eq!(data.get_f64("used"), Some(30.0));
        assert_eq!(data.get_f64("max"), Some(-1.0));
        assert!(data.get("usage").and_then(|v| v.as_composite()).is_some());
    }

    #[test]
    fn test_response_decoding() {
        let ok = Response::from_slice(br#"{"request":{},"value":42,"timestamp":1,"status":200}"#)
            .unwrap();
        assert_eq!(ok.into_value().unwrap(), json!(42));

        let err = Response::from_slice(
            br#"{"error_type":"javax.management.InstanceNotFoundException",
                "error":"javax.management.InstanceNotFoundException : java.lang:type=Nope",
                "status":404}"#,
        )
        .unwrap();
        assert!(matches!(
            err.into_value(),
            Err(JolokiaError::Agent { status: 404, .. })
        ));

        assert!(matches!(
            Response::from_slice(b"<html>"),
            Err(JolokiaError::Decode(_))
        ));
    }

    #[test]
    fn test_agent_version() {
        let value = json!({"agent": "2.0.2", "protocol": "7.2"});
        assert_eq!(agent_version(&value), Some("2.0.2"));
        assert_eq!(agent_version(&json!({})), None);
    }
}
