// MXBridge - Managed attribute metrics bridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Connection lifecycle
//!
//! [`MBeanServer`] and [`Connector`] are the seams to the transport. The
//! [`ConnectionManager`] owns the one handle a collector samples through,
//! notices when it is lost and reopens it on a fixed interval.
//!
//! ```text
//!  Disconnected ──connect ok──▶ Connected
//!       ▲  │                       │
//!       │  └──connect fail──┐      │ transport error while sampling
//!       │                   ▼      ▼
//!       └────────────── Disconnected
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::{ConnectionError, QueryError};
use crate::object_name::ObjectName;
use crate::value::AttributeValue;

/// Interval between two reconnect attempts
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(60);

/// An open connection to a managed server
///
/// Calls block until the transport answers or fails.
pub trait MBeanServer: Send {
    /// Read the current value of one attribute
    fn get_attribute(
        &mut self,
        object: &ObjectName,
        attribute: &str,
    ) -> Result<AttributeValue, QueryError>;

    /// Release the transport
    fn close(&mut self) -> Result<(), ConnectionError> {
        Ok(())
    }
}

/// Opens connections to managed servers by service URL
pub trait Connector: Send + Sync {
    /// Open a connection
    fn connect(&self, service_url: &str) -> Result<Box<dyn MBeanServer>, ConnectionError>;
}

/// Whether closing the collector may close the handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOwnership {
    /// Opened by this manager, closed by it
    Owned,
    /// Opened elsewhere, left open on close
    Shared,
}

/// Owns the connection of one collector
pub struct ConnectionManager {
    service_url: Option<String>,
    connector: Option<Arc<dyn Connector>>,
    server: Option<Box<dyn MBeanServer>>,
    ownership: HandleOwnership,
    connected: bool,
    closed: bool,
    last_reconnect_attempt: Instant,
    reconnect_interval: Duration,
}

impl ConnectionManager {
    /// Manager for a remote server, not yet connected
    pub fn remote(service_url: impl Into<String>, connector: Arc<dyn Connector>) -> Self {
        Self {
            service_url: Some(service_url.into()),
            connector: Some(connector),
            server: None,
            ownership: HandleOwnership::Owned,
            connected: false,
            closed: false,
            last_reconnect_attempt: Instant::now(),
            reconnect_interval: RECONNECT_INTERVAL,
        }
    }

    /// Manager over an already open handle owned by someone else
    ///
    /// The handle is never closed by this manager and cannot be reopened.
    pub fn local(server: Box<dyn MBeanServer>) -> Self {
        Self::with_handle(server, HandleOwnership::Shared)
    }

    /// Manager over an already open handle it takes ownership of
    ///
    /// The handle is closed with the manager but cannot be reopened.
    pub fn owned(server: Box<dyn MBeanServer>) -> Self {
        Self::with_handle(server, HandleOwnership::Owned)
    }

    fn with_handle(server: Box<dyn MBeanServer>, ownership: HandleOwnership) -> Self {
        Self {
            service_url: None,
            connector: None,
            server: Some(server),
            ownership,
            connected: true,
            closed: false,
            last_reconnect_attempt: Instant::now(),
            reconnect_interval: RECONNECT_INTERVAL,
        }
    }

    /// Change the interval between reconnect attempts
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Open the transport
    ///
    /// Failures are logged and leave the manager disconnected. Returns
    /// whether the manager is connected afterwards.
    pub fn connect(&mut self) -> bool {
        if self.closed {
            return false;
        }

        let (url, connector) = match (&self.service_url, &self.connector) {
            (Some(url), Some(connector)) => (url.clone(), Arc::clone(connector)),
            _ => return self.connected,
        };

        self.release_handle();

        match connector.connect(&url) {
            Ok(server) => {
                self.server = Some(server);
                self.ownership = HandleOwnership::Owned;
                self.connected = true;
                info!("Connected to {}", url);
            }
            Err(e) => {
                self.connected = false;
                warn!("Failed to connect to {}: {}", url, e);
            }
        }

        self.connected
    }

    /// Reconnect if disconnected and the reconnect interval has elapsed
    ///
    /// Returns `true` only when a reconnect was attempted and succeeded.
    pub fn reconnect_if_needed(&mut self) -> bool {
        self.reconnect_if_needed_at(Instant::now())
    }

    /// Same as [`reconnect_if_needed`](Self::reconnect_if_needed) at a given time
    pub fn reconnect_if_needed_at(&mut self, now: Instant) -> bool {
        if self.connected || self.closed || !self.is_reconnectable() {
            return false;
        }

        let elapsed = now.saturating_duration_since(self.last_reconnect_attempt);
        if elapsed <= self.reconnect_interval {
            debug!(
                "Next reconnect to {} in {:?}",
                self.target(),
                self.reconnect_interval - elapsed
            );
            return false;
        }

        warn!("Reconnecting to {}", self.target());
        self.last_reconnect_attempt = now;
        self.connect()
    }

    /// Mark the connection as lost after a transport failure
    ///
    /// An owned handle is released; a shared one is kept for its owner.
    pub fn mark_lost(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        warn!("Lost connection to {}", self.target());
        if self.ownership == HandleOwnership::Owned {
            self.release_handle();
        }
    }

    /// Close the transport if this manager owns it
    ///
    /// Safe to call more than once; later calls do nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.connected = false;
        match self.ownership {
            HandleOwnership::Owned => self.release_handle(),
            HandleOwnership::Shared => {
                self.server = None;
            }
        }
    }

    fn release_handle(&mut self) {
        if let Some(mut server) = self.server.take() {
            if self.ownership == HandleOwnership::Owned {
                if let Err(e) = server.close() {
                    warn!("Could not close connection to {}: {}", self.target(), e);
                }
            }
        }
    }

    /// Handle to sample through, if connected
    pub fn server_mut(&mut self) -> Option<&mut (dyn MBeanServer + 'static)> {
        if !self.connected {
            return None;
        }
        self.server.as_deref_mut()
    }

    /// Whether the handle is open
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Whether [`close`](Self::close) was called
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether a lost connection can be reopened
    pub fn is_reconnectable(&self) -> bool {
        self.service_url.is_some() && self.connector.is_some()
    }

    /// Configured service URL
    pub fn service_url(&self) -> Option<&str> {
        self.service_url.as_deref()
    }

    /// Ownership of the current handle
    pub fn ownership(&self) -> HandleOwnership {
        self.ownership
    }

    /// Time of the last reconnect attempt (or of creation)
    pub fn last_reconnect_attempt(&self) -> Instant {
        self.last_reconnect_attempt
    }

    /// Interval between reconnect attempts
    pub fn reconnect_interval(&self) -> Duration {
        self.reconnect_interval
    }

    fn target(&self) -> &str {
        self.service_url.as_deref().unwrap_or("local server")
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("service_url", &self.service_url)
            .field("ownership", &self.ownership)
            .field("connected", &self.connected)
            .field("closed", &self.closed)
            .field("reconnect_interval", &self.reconnect_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryConnector, MemoryServer};

    const URL: &str = "memory://app";

    fn remote() -> (ConnectionManager, MemoryConnector, MemoryServer) {
        let server = MemoryServer::new();
        let connector = MemoryConnector::new();
        connector.register(URL, server.clone());
        let manager = ConnectionManager::remote(URL, Arc::new(connector.clone()));
        (manager, connector, server)
    }

    #[test]
    fn test_connect_success() {
        let (mut manager, _, _) = remote();
        assert!(!manager.is_connected());
        assert!(manager.connect());
        assert!(manager.is_connected());
        assert!(manager.server_mut().is_some());
    }

    #[test]
    fn test_connect_failure_is_absorbed() {
        let (mut manager, connector, _) = remote();
        connector.set_refusing(true);
        assert!(!manager.connect());
        assert!(!manager.is_connected());
        assert!(manager.server_mut().is_none());
    }

    #[test]
    fn test_reconnect_waits_for_interval() {
        let (mut manager, connector, _) = remote();
        let created = manager.last_reconnect_attempt();

        assert!(!manager.reconnect_if_needed_at(created + Duration::from_secs(30)));
        assert!(!manager.reconnect_if_needed_at(created + Duration::from_secs(60)));
        assert_eq!(connector.attempts(), 0);

        assert!(manager.reconnect_if_needed_at(created + Duration::from_secs(61)));
        assert_eq!(connector.attempts(), 1);
        assert!(manager.is_connected());
    }

    #[test]
    fn test_failed_reconnect_resets_timer() {
        let (mut manager, connector, _) = remote();
        connector.set_refusing(true);
        let start = manager.last_reconnect_attempt();

        let first = start + Duration::from_secs(61);
        assert!(!manager.reconnect_if_needed_at(first));
        assert_eq!(manager.last_reconnect_attempt(), first);

        assert!(!manager.reconnect_if_needed_at(first + Duration::from_secs(10)));
        assert_eq!(connector.attempts(), 1);

        connector.set_refusing(false);
        assert!(manager.reconnect_if_needed_at(first + Duration::from_secs(61)));
        assert_eq!(connector.attempts(), 2);
    }

    #[test]
    fn test_no_reconnect_when_connected() {
        let (mut manager, connector, _) = remote();
        manager.connect();
        let later = manager.last_reconnect_attempt() + Duration::from_secs(3600);
        assert!(!manager.reconnect_if_needed_at(later));
        assert_eq!(connector.attempts(), 1);
    }

    #[test]
    fn test_mark_lost_releases_owned_handle() {
        let (mut manager, _, server) = remote();
        manager.connect();
        manager.mark_lost();
        assert!(!manager.is_connected());
        assert!(manager.server_mut().is_none());
        assert_eq!(server.close_count(), 1);
    }

    #[test]
    fn test_local_is_not_reconnectable() {
        let server = MemoryServer::new();
        let mut manager = ConnectionManager::local(Box::new(server.clone()));
        assert!(manager.is_connected());
        assert!(!manager.is_reconnectable());

        manager.mark_lost();
        let later = Instant::now() + Duration::from_secs(3600);
        assert!(!manager.reconnect_if_needed_at(later));
        assert!(!manager.is_connected());
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut manager, _, server) = remote();
        manager.connect();
        manager.close();
        manager.close();
        drop(manager);
        assert_eq!(server.close_count(), 1);
    }

    #[test]
    fn test_close_leaves_shared_handle_open() {
        let server = MemoryServer::new();
        let mut manager = ConnectionManager::local(Box::new(server.clone()));
        manager.close();
        assert_eq!(server.close_count(), 0);
    }

    #[test]
    fn test_closed_manager_does_not_reconnect() {
        let (mut manager, connector, _) = remote();
        manager.close();
        assert!(!manager.connect());
        let later = Instant::now() + Duration::from_secs(3600);
        assert!(!manager.reconnect_if_needed_at(later));
        assert_eq!(connector.attempts(), 0);
    }
}
