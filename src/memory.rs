// MXBridge - Managed attribute metrics bridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! In-memory managed server
//!
//! [`MemoryServer`] keeps managed objects and their attributes in process.
//! Clones share state, so one clone can be handed to a collector while
//! another one changes values, injects failures or inspects how often an
//! attribute was read.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::connection::{Connector, MBeanServer};
use crate::error::{ConfigError, ConnectionError, QueryError};
use crate::object_name::ObjectName;
use crate::value::AttributeValue;

#[derive(Debug, Default)]
struct MemoryState {
    objects: HashMap<ObjectName, BTreeMap<String, AttributeValue>>,
    reads: HashMap<(ObjectName, String), u64>,
    failing: HashSet<(ObjectName, String)>,
    fail_all: bool,
    closed: bool,
    close_count: u32,
}

/// Managed server living in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryServer {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryServer {
    /// Create a server without managed objects
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set an attribute, registering the object if needed
    pub fn set_attribute(
        &self,
        object: &str,
        attribute: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Result<(), ConfigError> {
        let name = ObjectName::parse(object)?;
        self.state()
            .objects
            .entry(name)
            .or_default()
            .insert(attribute.into(), value.into());
        Ok(())
    }

    /// Builder-style [`set_attribute`](Self::set_attribute)
    pub fn with_attribute(
        self,
        object: &str,
        attribute: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Result<Self, ConfigError> {
        self.set_attribute(object, attribute, value)?;
        Ok(self)
    }

    /// Remove an attribute
    pub fn remove_attribute(&self, object: &str, attribute: &str) -> Result<(), ConfigError> {
        let name = ObjectName::parse(object)?;
        if let Some(attributes) = self.state().objects.get_mut(&name) {
            attributes.remove(attribute);
        }
        Ok(())
    }

    /// Make every read fail with a transport error
    pub fn set_transport_failure(&self, failing: bool) {
        self.state().fail_all = failing;
    }

    /// Make reads of one attribute fail with a transport error
    pub fn fail_attribute(&self, object: &str, attribute: &str) -> Result<(), ConfigError> {
        let name = ObjectName::parse(object)?;
        self.state().failing.insert((name, attribute.to_string()));
        Ok(())
    }

    /// Number of reads of one attribute
    pub fn read_count(&self, object: &str, attribute: &str) -> u64 {
        let Ok(name) = ObjectName::parse(object) else {
            return 0;
        };
        self.state()
            .reads
            .get(&(name, attribute.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Number of reads of all attributes
    pub fn total_reads(&self) -> u64 {
        self.state().reads.values().sum()
    }

    /// Number of times a handle to this server was closed
    pub fn close_count(&self) -> u32 {
        self.state().close_count
    }

    /// Whether the last handed-out handle was closed
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    fn reopen(&self) {
        self.state().closed = false;
    }
}

impl MBeanServer for MemoryServer {
    fn get_attribute(
        &mut self,
        object: &ObjectName,
        attribute: &str,
    ) -> Result<AttributeValue, QueryError> {
        let mut state = self.state();
        let key = (object.clone(), attribute.to_string());

        if state.closed || state.fail_all || state.failing.contains(&key) {
            return Err(QueryError::Transport {
                object: object.to_string(),
                attribute: attribute.to_string(),
                reason: "connection reset".to_string(),
            });
        }

        let value = state
            .objects
            .get(object)
            .ok_or_else(|| QueryError::InstanceNotFound {
                object: object.to_string(),
            })?
            .get(attribute)
            .cloned()
            .ok_or_else(|| QueryError::AttributeNotFound {
                object: object.to_string(),
                attribute: attribute.to_string(),
            })?;

        *state.reads.entry(key).or_insert(0) += 1;
        Ok(value)
    }

    fn close(&mut self) -> Result<(), ConnectionError> {
        let mut state = self.state();
        state.closed = true;
        state.close_count += 1;
        Ok(())
    }
}

/// Connector handing out [`MemoryServer`] handles by URL
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    servers: Arc<Mutex<HashMap<String, MemoryServer>>>,
    refusing: Arc<AtomicBool>,
    attempts: Arc<AtomicU32>,
}

impl MemoryConnector {
    /// Create a connector without servers
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `server` reachable under `url`
    pub fn register(&self, url: impl Into<String>, server: MemoryServer) {
        self.servers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(url.into(), server);
    }

    /// Refuse every connection attempt
    pub fn set_refusing(&self, refusing: bool) {
        self.refusing.store(refusing, Ordering::SeqCst);
    }

    /// Number of connection attempts so far
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, service_url: &str) -> Result<Box<dyn MBeanServer>, ConnectionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.refusing.load(Ordering::SeqCst) {
            return Err(ConnectionError::Unreachable {
                url: service_url.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let server = self
            .servers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(service_url)
            .cloned()
            .ok_or_else(|| ConnectionError::Unreachable {
                url: service_url.to_string(),
                reason: "no such server".to_string(),
            })?;

        server.reopen();
        Ok(Box::new(server))
    }
}
