// MXBridge Exporter - Prometheus exporter for MXBridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Collection loop.
//!
//! Collectors block on remote calls, so the loop runs on a dedicated
//! blocking thread and only shares a status snapshot with the HTTP side.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use mxbridge::{CollectorSet, Connector, ModuleConfig, ServerCollector};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::metrics;

/// Longest sleep between two checks of the stop flag
const STOP_POLL: Duration = Duration::from_millis(100);

/// Poll loop settings.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Time between the start of two cycles
    pub interval: Duration,
}

/// Status of one collector after the last cycle.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServerStatus {
    pub name: String,
    pub connected: bool,
    pub charts: usize,
    pub dimensions: usize,
    pub queries: usize,
    pub enabled_queries: usize,
    pub active_queries: usize,
    pub sampled: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ServerStatus {
    fn of(collector: &ServerCollector) -> Self {
        let last = collector.last_cycle();
        Self {
            name: collector.name().to_string(),
            connected: collector.is_connected(),
            charts: collector.charts().len(),
            dimensions: collector.charts().iter().map(|c| c.dimensions().len()).sum(),
            queries: collector.registry().len(),
            enabled_queries: collector.registry().enabled_count(),
            active_queries: collector.active_queries(),
            sampled: last.sampled,
            failed: last.failed,
            skipped: last.skipped,
        }
    }
}

/// State shared between the poll loop and the HTTP handlers.
#[derive(Debug)]
pub struct PollerState {
    running: AtomicBool,
    cycles: AtomicU64,
    servers: Mutex<Vec<ServerStatus>>,
}

impl Default for PollerState {
    fn default() -> Self {
        Self {
            running: AtomicBool::new(true),
            cycles: AtomicU64::new(0),
            servers: Mutex::new(Vec::new()),
        }
    }
}

impl PollerState {
    /// Ask the loop to stop after the current cycle.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the loop is still running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Completed cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Status of every collector after the last cycle.
    pub fn servers(&self) -> Vec<ServerStatus> {
        self.servers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, set: &CollectorSet) {
        let statuses = set.collectors().iter().map(ServerStatus::of).collect();
        *self
            .servers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = statuses;
        self.cycles.fetch_add(1, Ordering::SeqCst);
    }
}

/// Build the collectors and run cycles until the state is stopped.
///
/// Blocks the calling thread; collectors are closed before returning.
pub fn run(
    config: ModuleConfig,
    connector: Arc<dyn Connector>,
    poller: PollerConfig,
    state: Arc<PollerState>,
) {
    if config.auto_detect_local_virtual_machines {
        info!("Local process discovery is not available, monitoring configured servers only");
    }

    let mut set = match CollectorSet::from_config(config, connector) {
        Ok(set) => set,
        Err(e) => {
            error!("Cannot create collectors: {}", e);
            state.stop();
            return;
        }
    };

    if set.is_empty() {
        warn!("No server to monitor");
    }

    let charts = set.initialize().len();
    info!("Monitoring {} servers with {} charts", set.len(), charts);

    while state.is_running() {
        let started = Instant::now();
        set.collect_parallel();
        let elapsed = started.elapsed();

        metrics::publish(&set, elapsed.as_secs_f64());
        state.record(&set);
        debug!("Cycle finished in {:?}", elapsed);

        if elapsed > poller.interval {
            warn!(
                "Cycle took {:?}, longer than the {:?} interval",
                elapsed, poller.interval
            );
        }
        sleep_until(started + poller.interval, &state);
    }

    info!("Closing {} collectors", set.len());
    set.close();
}

fn sleep_until(deadline: Instant, state: &PollerState) {
    while state.is_running() {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep((deadline - now).min(STOP_POLL));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mxbridge::{ChartConfig, DimensionConfig, MemoryConnector, MemoryServer, ServerConfig};

    #[test]
    fn test_run_until_stopped() {
        let server = MemoryServer::new()
            .with_attribute("java.lang:type=Threading", "ThreadCount", 8)
            .unwrap();
        let connector = MemoryConnector::new();
        connector.register("memory://poller", server.clone());

        let mut config = ModuleConfig::default();
        config
            .jmx_servers
            .push(ServerConfig::remote("poller-test", "memory://poller"));
        config.common_charts.push(
            ChartConfig::new("threads", "Threads", "threads").with_dimension(
                DimensionConfig::new("live", "java.lang:type=Threading", "ThreadCount"),
            ),
        );

        let state = Arc::new(PollerState::default());
        let loop_state = Arc::clone(&state);
        let handle = thread::spawn(move || {
            run(
                config,
                Arc::new(connector),
                PollerConfig {
                    interval: Duration::from_millis(10),
                },
                loop_state,
            )
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        while state.cycles() < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        state.stop();
        handle.join().unwrap();

        assert!(state.cycles() >= 2);
        let servers = state.servers();
        assert_eq!(servers.len(), 1);
        assert!(servers[0].connected);
        assert_eq!(servers[0].dimensions, 1);
        assert_eq!(servers[0].active_queries, 1);
        assert_eq!(server.close_count(), 1);
    }

    #[test]
    fn test_invalid_config_stops_state() {
        let mut config = ModuleConfig::default();
        config.jmx_servers.push(ServerConfig::remote("dup", "memory://a"));
        config.jmx_servers.push(ServerConfig::remote("dup", "memory://b"));

        let state = Arc::new(PollerState::default());
        run(
            config,
            Arc::new(MemoryConnector::new()),
            PollerConfig {
                interval: Duration::from_millis(10),
            },
            Arc::clone(&state),
        );

        assert!(!state.is_running());
        assert_eq!(state.cycles(), 0);
    }
}
