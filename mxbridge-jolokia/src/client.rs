// MXBridge Jolokia - HTTP transport for MXBridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Blocking Jolokia client

use std::time::Duration;

use log::{debug, info};
use mxbridge::{AttributeValue, ConnectionError, Connector, MBeanServer, ObjectName, QueryError};
use reqwest::blocking::Client;

use crate::error::JolokiaError;
use crate::protocol::{agent_version, to_attribute_value, Request, Response};

/// Opens [`JolokiaServer`] connections
///
/// Requests have no timeout unless one is set.
#[derive(Debug, Clone, Default)]
pub struct JolokiaConnector {
    timeout: Option<Duration>,
}

impl JolokiaConnector {
    /// Connector without request timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector aborting requests after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    /// Request timeout, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Open a connection and check that a Jolokia agent answers
    pub fn open(&self, service_url: &str) -> Result<JolokiaServer, ConnectionError> {
        if !(service_url.starts_with("http://") || service_url.starts_with("https://")) {
            return Err(ConnectionError::InvalidUrl {
                url: service_url.to_string(),
                reason: "expected an http:// or https:// URL".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ConnectionError::Handshake {
                url: service_url.to_string(),
                reason: e.to_string(),
            })?;

        let mut server = JolokiaServer {
            client,
            url: service_url.trim_end_matches('/').to_string(),
            agent_version: None,
        };

        let version = server
            .send(&Request::Version)
            .map_err(|e| e.into_connection_error(service_url))?;
        server.agent_version = agent_version(&version).map(str::to_string);

        info!(
            "Jolokia agent {} at {}",
            server.agent_version.as_deref().unwrap_or("(unknown version)"),
            server.url
        );
        Ok(server)
    }
}

impl Connector for JolokiaConnector {
    fn connect(&self, service_url: &str) -> Result<Box<dyn MBeanServer>, ConnectionError> {
        Ok(Box::new(self.open(service_url)?))
    }
}

/// Connection to one Jolokia agent
#[derive(Debug)]
pub struct JolokiaServer {
    client: Client,
    url: String,
    agent_version: Option<String>,
}

impl JolokiaServer {
    /// Agent URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Agent version reported during the handshake
    pub fn agent_version(&self) -> Option<&str> {
        self.agent_version.as_deref()
    }

    fn send(&self, request: &Request<'_>) -> Result<serde_json::Value, JolokiaError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .map_err(|e| JolokiaError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .map_err(|e| JolokiaError::Http(e.to_string()))?;

        // Agents may mirror their own error status in the HTTP status.
        match Response::from_slice(&body) {
            Ok(decoded) => decoded.into_value(),
            Err(_) if !status.is_success() => Err(JolokiaError::HttpStatus(status.as_u16())),
            Err(e) => Err(e),
        }
    }
}

impl MBeanServer for JolokiaServer {
    fn get_attribute(
        &mut self,
        object: &ObjectName,
        attribute: &str,
    ) -> Result<AttributeValue, QueryError> {
        debug!("Reading '{}' of {} from {}", attribute, object, self.url);
        let request = Request::Read {
            mbean: object.as_str(),
            attribute,
        };
        self.send(&request)
            .map(|value| to_attribute_value(&value))
            .map_err(|e| e.into_query_error(object.as_str(), attribute))
    }
}
