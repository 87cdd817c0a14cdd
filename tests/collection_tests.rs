//! End-to-end collection tests against in-memory servers

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use approx::assert_relative_eq;
use mxbridge::*;

const MEMORY: &str = "java.lang:type=Memory";
const URL: &str = "memory://app";

fn app_server() -> MemoryServer {
    MemoryServer::new()
        .with_attribute(MEMORY, "A", 42i32)
        .unwrap()
        .with_attribute(
            MEMORY,
            "B",
            CompositeData::new().with("used", 30i64).with("total", 40i64),
        )
        .unwrap()
}

fn two_charts() -> Vec<ChartConfig> {
    vec![
        ChartConfig::new("simple", "Simple", "items")
            .with_dimension(DimensionConfig::new("a", MEMORY, "A")),
        ChartConfig::new("percent", "Free", "permille")
            .with_dimension(DimensionConfig::new("free", MEMORY, "B.used/B.total-")),
    ]
}

fn remote_collector(server: &MemoryServer) -> (ServerCollector, MemoryConnector) {
    let connector = MemoryConnector::new();
    connector.register(URL, server.clone());
    let config = ServerConfig::remote("app", URL).with_charts(two_charts());
    let collector = ServerCollector::connect(config, Arc::new(connector.clone())).unwrap();
    (collector, connector)
}

#[test]
fn test_simple_and_complement_percent() {
    let server = app_server();
    let (mut collector, _) = remote_collector(&server);
    collector.initialize();

    let charts = collector.collect();

    assert_eq!(charts.len(), 2);
    assert_relative_eq!(charts[0].dimensions()[0].value().unwrap(), 42.0);
    assert_relative_eq!(charts[1].dimensions()[0].value().unwrap(), 250.0);
}

#[test]
fn test_shared_attribute_sampled_once_per_cycle() {
    let server = app_server();
    let connector = MemoryConnector::new();
    connector.register(URL, server.clone());
    let config = ServerConfig::remote("app", URL).with_charts(vec![
        ChartConfig::new("b", "B", "items")
            .with_dimension(DimensionConfig::new("used", MEMORY, "B.used"))
            .with_dimension(DimensionConfig::new("total", MEMORY, "B.total")),
        ChartConfig::new("b_used", "B used", "items")
            .with_dimension(DimensionConfig::new("used", MEMORY, "B.used")),
    ]);
    let mut collector = ServerCollector::connect(config, Arc::new(connector)).unwrap();
    collector.initialize();
    assert_eq!(collector.registry().len(), 1);

    let before = server.read_count(MEMORY, "B");
    collector.collect();
    collector.collect();
    assert_eq!(server.read_count(MEMORY, "B") - before, 2);
}

#[test]
fn test_mismatched_expression_skips_only_that_dimension() {
    let server = app_server();
    let connector = MemoryConnector::new();
    connector.register(URL, server);
    let config = ServerConfig::remote("app", URL).with_charts(vec![ChartConfig::new(
        "b", "B", "items",
    )
    .with_dimension(DimensionConfig::new("used", MEMORY, "B.used"))
    .with_dimension(DimensionConfig::new("ratio", MEMORY, "B.used/B.total"))
    .with_dimension(DimensionConfig::new("total", MEMORY, "B.total"))]);
    let mut collector = ServerCollector::connect(config, Arc::new(connector)).unwrap();

    let charts = collector.initialize();

    let ids: Vec<&str> = charts[0].dimensions().iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["used", "total"]);
    assert_eq!(
        collector.registry().iter().next().map(|q| q.variant()),
        Some(QueryVariant::Composite)
    );
}

#[test]
fn test_transport_error_halts_cycle_and_recovers() {
    let server = app_server();
    let (mut collector, connector) = remote_collector(&server);
    collector.initialize();
    collector.collect();

    server.set_transport_failure(true);
    collector.collect();
    let stats = collector.last_cycle();
    assert!(stats.connection_lost);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(collector.registry().enabled_count(), 1);

    server.set_transport_failure(false);
    server.set_attribute(MEMORY, "A", 43i64).unwrap();
    let start = collector.connection().last_reconnect_attempt();

    let charts = collector.collect_at(start + Duration::from_secs(30));
    assert_relative_eq!(charts[0].dimensions()[0].value().unwrap(), 42.0);

    let charts = collector.collect_at(start + Duration::from_secs(61));
    assert_relative_eq!(charts[0].dimensions()[0].value().unwrap(), 43.0);
    assert_eq!(collector.registry().enabled_count(), 2);
    assert_eq!(connector.attempts(), 2);
}

#[test]
fn test_other_collector_unaffected() {
    let failing = app_server();
    let healthy = app_server();
    let connector = MemoryConnector::new();
    connector.register("memory://failing", failing.clone());
    connector.register("memory://healthy", healthy);

    let mut config = ModuleConfig::default();
    config.jmx_servers.push(ServerConfig::remote("failing", "memory://failing"));
    config.jmx_servers.push(ServerConfig::remote("healthy", "memory://healthy"));
    config.common_charts = two_charts();

    let mut set = CollectorSet::from_config(config, Arc::new(connector)).unwrap();
    set.initialize();

    failing.set_transport_failure(true);
    set.collect_parallel();

    let healthy = set.get("healthy").unwrap();
    assert!(healthy.is_connected());
    assert_eq!(healthy.last_cycle().sampled, 2);
    assert!(!set.get("failing").unwrap().is_connected());
}

#[test]
fn test_scaled_value_downstream() {
    let server = MemoryServer::new()
        .with_attribute(MEMORY, "Heap", CompositeData::new().with("used", 4096i64))
        .unwrap();
    let config = ServerConfig::local("app").with_charts(vec![ChartConfig::new(
        "heap", "Heap", "KiB",
    )
    .with_dimension(DimensionConfig::new("used", MEMORY, "Heap.used").with_scale(1, 1024))]);
    let mut collector = ServerCollector::local(config, Box::new(server));
    collector.initialize();

    let dimension = &collector.collect()[0].dimensions()[0];
    assert_relative_eq!(dimension.value().unwrap(), 4096.0);
    assert_relative_eq!(dimension.scaled_value().unwrap(), 4.0);
}

#[test]
fn test_close_twice_releases_once() {
    let server = app_server();
    let (mut collector, _) = remote_collector(&server);
    collector.close();
    collector.close();
    assert_eq!(server.close_count(), 1);
}

#[test]
fn test_collect_from_config_file() {
    let document = r#"{
        "jmxServers": [ { "name": "app", "serviceUrl": "memory://app" } ],
        "commonCharts": [
            { "id": "free", "title": "Free", "units": "permille",
              "dimensions": [ { "name": "free", "from": "java.lang:type=Memory",
                                "value": "B.used/B.total-" } ] }
        ]
    }"#;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(document.as_bytes()).unwrap();

    let connector = MemoryConnector::new();
    connector.register(URL, app_server());
    let config = ModuleConfig::from_file(file.path()).unwrap();
    let mut set = CollectorSet::from_config(config, Arc::new(connector)).unwrap();
    set.initialize();

    let charts = set.collect();
    assert_eq!(charts.len(), 1);
    assert_eq!(charts[0].full_id(), "jmx_app.free");
    assert_relative_eq!(charts[0].dimensions()[0].value().unwrap(), 250.0);
}
