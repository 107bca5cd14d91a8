mod common;

use canteen_orders::config::{BrokerConfig, BrokerTransport, GatewayConfig};
use canteen_orders::gateway::memory::InMemoryBroker;
use canteen_orders::gateway::{connector_for, GatewayError, InboundMessage, PubSubGateway, QoS};
use common::eventually;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn fast_reconnect() -> GatewayConfig {
    GatewayConfig {
        reconnect_initial_ms: 10,
        reconnect_max_ms: 40,
        ..GatewayConfig::default()
    }
}

async fn recv(rx: &mut tokio::sync::mpsc::UnboundedReceiver<InboundMessage>) -> String {
    let message = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("message should arrive")
        .expect("channel open");
    message.topic
}

#[tokio::test]
async fn test_wildcard_subscriptions_receive_matching_topics() {
    let broker = InMemoryBroker::new();
    let gateway = PubSubGateway::start(Arc::new(broker.clone()), &fast_reconnect()).await;
    assert!(gateway.is_connected());

    let (_one, mut one_level) = gateway.subscribe_channel("notify/order/+").await.unwrap();
    let (_all, mut everything) = gateway.subscribe_channel("orders/#").await.unwrap();

    gateway
        .publish("notify/order/c-1", b"{}".to_vec(), QoS::AtLeastOnce)
        .await
        .unwrap();
    gateway
        .publish("orders/kitchen/intake", b"{}".to_vec(), QoS::AtMostOnce)
        .await
        .unwrap();

    assert_eq!(recv(&mut one_level).await, "notify/order/c-1");
    assert_eq!(recv(&mut everything).await, "orders/kitchen/intake");
    assert!(one_level.try_recv().is_err());

    let log = broker.published();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].qos, QoS::AtMostOnce);

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_handlers_run_in_registration_order() {
    let broker = InMemoryBroker::new();
    let gateway = PubSubGateway::start(Arc::new(broker.clone()), &fast_reconnect()).await;
    let calls = Arc::new(Mutex::new(Vec::new()));

    for label in ["first", "second"] {
        let calls = calls.clone();
        gateway
            .subscribe("notify/order/#", move |_| calls.lock().unwrap().push(label))
            .await
            .unwrap();
    }
    let (_tail, mut tail) = gateway.subscribe_channel("notify/order/#").await.unwrap();

    broker.inject("notify/order/c-2", b"{}".to_vec());
    recv(&mut tail).await;

    assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
    gateway.shutdown().await;
}

#[tokio::test]
async fn test_invalid_topics_and_patterns_are_refused() {
    let broker = InMemoryBroker::new();
    let gateway = PubSubGateway::start(Arc::new(broker.clone()), &fast_reconnect()).await;

    let bad_pattern = gateway.subscribe("orders/#/intake", |_| {}).await;
    assert!(matches!(bad_pattern, Err(GatewayError::InvalidPattern(_))));

    let wildcard_publish = gateway
        .publish("notify/order/+", Vec::new(), QoS::AtLeastOnce)
        .await;
    assert!(matches!(wildcard_publish, Err(GatewayError::InvalidTopic(_))));
    assert!(broker.published().is_empty());

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_reconnect_resubscribes_and_publish_fails_fast_while_down() {
    let broker = InMemoryBroker::new();
    let gateway = PubSubGateway::start(Arc::new(broker.clone()), &fast_reconnect()).await;
    let (_sub, mut inbox) = gateway.subscribe_channel("notify/order/+").await.unwrap();

    broker.set_refuse_connect(true);
    broker.drop_connections();
    let g = &gateway;
    eventually("connection loss noticed", || async move { !g.is_connected() }).await;

    let offline = gateway
        .publish("notify/order/c-3", b"{}".to_vec(), QoS::AtLeastOnce)
        .await;
    assert!(matches!(offline, Err(GatewayError::NotConnected)));
    assert!(broker.published().is_empty());

    broker.set_refuse_connect(false);
    eventually("reconnect", || async move { g.is_connected() }).await;
    assert_eq!(broker.connect_count(), 2);
    assert_eq!(broker.connection_count(), 1);

    gateway
        .publish("notify/order/c-3", b"{}".to_vec(), QoS::AtLeastOnce)
        .await
        .unwrap();
    assert_eq!(recv(&mut inbox).await, "notify/order/c-3");

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_first_connect_failure_is_retried_in_background() {
    let broker = InMemoryBroker::new();
    broker.set_refuse_connect(true);
    let gateway = PubSubGateway::start(Arc::new(broker.clone()), &fast_reconnect()).await;
    assert!(!gateway.is_connected());

    // Subscriptions made while down are sent once the session opens.
    let (_sub, mut inbox) = gateway.subscribe_channel("orders/intake").await.unwrap();

    broker.set_refuse_connect(false);
    let g = &gateway;
    eventually("first connect", || async move { g.is_connected() }).await;

    broker.inject("orders/intake", b"{}".to_vec());
    assert_eq!(recv(&mut inbox).await, "orders/intake");

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_unsubscribe_is_idempotent_and_shutdown_closes_clones() {
    let broker = InMemoryBroker::new();
    let gateway = PubSubGateway::start(Arc::new(broker.clone()), &fast_reconnect()).await;
    let (id, _rx) = gateway.subscribe_channel("orders/intake").await.unwrap();

    gateway.unsubscribe(id).await.unwrap();
    gateway.unsubscribe(id).await.unwrap();

    let clone = gateway.clone();
    gateway.shutdown().await;
    let after = clone
        .publish("orders/intake", Vec::new(), QoS::AtLeastOnce)
        .await;
    assert!(matches!(after, Err(GatewayError::Closed)));
    assert!(!clone.is_connected());
}

#[tokio::test]
async fn test_default_broker_config_selects_in_process_transport() {
    let config = BrokerConfig::default();
    assert_eq!(config.transport, BrokerTransport::Memory);

    let gateway = PubSubGateway::start(connector_for(&config), &fast_reconnect()).await;
    assert!(gateway.is_connected());
    let (_sub, mut rx) = gateway.subscribe_channel("orders/#").await.unwrap();
    gateway
        .publish("orders/intake", b"{}".to_vec(), QoS::AtLeastOnce)
        .await
        .unwrap();
    assert_eq!(recv(&mut rx).await, "orders/intake");

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_mqtt_broker_leaves_gateway_retrying() {
    let config = BrokerConfig {
        transport: BrokerTransport::Mqtt,
        host: "127.0.0.1".into(),
        port: 1,
        connect_timeout_ms: 200,
        ..BrokerConfig::default()
    };

    let gateway = PubSubGateway::start(connector_for(&config), &fast_reconnect()).await;
    assert!(!gateway.is_connected());
    let result = gateway
        .publish("orders/intake", b"{}".to_vec(), QoS::AtLeastOnce)
        .await;
    assert!(matches!(result, Err(GatewayError::NotConnected)));

    gateway.shutdown().await;
}
