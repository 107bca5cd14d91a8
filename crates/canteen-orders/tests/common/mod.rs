//! Shared setup for the integration tests.
#![allow(dead_code)]

use canteen_orders::config::{CanteenConfig, GatewayConfig};
use canteen_orders::gateway::memory::InMemoryBroker;
use canteen_orders::lifecycle::CanteenSystem;
use canteen_orders::model::LineItem;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub fn test_config() -> CanteenConfig {
    CanteenConfig {
        gateway: GatewayConfig {
            reconnect_initial_ms: 10,
            reconnect_max_ms: 50,
            ..GatewayConfig::default()
        },
        ..CanteenConfig::default()
    }
}

pub async fn start() -> (CanteenSystem, InMemoryBroker) {
    let broker = InMemoryBroker::new();
    let system = CanteenSystem::start(&test_config(), Arc::new(broker.clone()))
        .await
        .expect("system should start");
    (system, broker)
}

pub fn lunch() -> Vec<LineItem> {
    vec![LineItem::new("A", 2, 50.0), LineItem::new("B", 1, 30.0)]
}

pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + Duration::from_secs(2);
    while !check().await {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub fn event_kinds(broker: &InMemoryBroker, topic: &str) -> Vec<String> {
    broker
        .published_on(topic)
        .iter()
        .map(|m| m.json().unwrap()["eventKind"].as_str().unwrap().to_string())
        .collect()
}
