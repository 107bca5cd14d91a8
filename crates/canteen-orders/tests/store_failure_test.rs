use canteen_actor::mock::{create_mock_client, expect_list, expect_update, MockClient};
use canteen_actor::FrameworkError;
use canteen_orders::clients::{NotificationClient, OrderClient};
use canteen_orders::config::GatewayConfig;
use canteen_orders::dispatcher::{DispatchFailure, NotificationDispatcher};
use canteen_orders::gateway::memory::InMemoryBroker;
use canteen_orders::gateway::{PubSubGateway, QoS};
use canteen_orders::model::{
    CustomerId, EventKind, LineItem, Notification, Order, OrderChange, OrderFilter, OrderId,
    OrderStatus, OrderUpdate,
};
use canteen_orders::store::{ActorStore, OrderStore};
use canteen_orders::topics::TopicRouter;
use canteen_orders::OrderError;
use chrono::{Duration, Utc};
use std::sync::Arc;

fn pending_order() -> Order {
    Order {
        id: OrderId::new(),
        customer_id: CustomerId::from("m-1"),
        items: vec![LineItem::new("A", 1, 12.5)],
        total_amount: 12.5,
        status: OrderStatus::Pending,
        payment_status: false,
        completed_at: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_closed_actor_surfaces_as_store_failure() {
    let mut orders = MockClient::<Order>::new();
    let notifications = MockClient::<Notification>::new();
    let id = OrderId::new();
    orders.expect_get(id).return_err(FrameworkError::ActorClosed);
    orders.expect_get(id).return_ok(None);

    let store = ActorStore::new(
        OrderClient::new(orders.client()),
        NotificationClient::new(notifications.client()),
    );

    let closed = store.find_order(id).await;
    assert!(matches!(closed, Err(OrderError::StoreFailure(_))));
    let missing = store.find_order(id).await;
    assert!(matches!(missing, Err(OrderError::NotFound(_))));

    orders.verify();
    notifications.verify();
}

#[tokio::test]
async fn test_cascade_delete_reports_leftover_notifications() {
    let mut orders = MockClient::<Order>::new();
    let mut notifications = MockClient::<Notification>::new();
    let order = pending_order();
    let leftover = Notification {
        id: canteen_orders::model::NotificationId::new(),
        user_id: order.customer_id.clone(),
        order_id: order.id,
        message: "Payment confirmed".into(),
        is_read: false,
        created_at: Utc::now(),
    };
    orders.expect_delete(order.id).return_ok(order.clone());
    notifications.expect_list().return_ok(vec![leftover.clone()]);
    notifications
        .expect_delete(leftover.id)
        .return_err(FrameworkError::ActorDropped);

    let store = ActorStore::new(
        OrderClient::new(orders.client()),
        NotificationClient::new(notifications.client()),
    );
    let result = store.delete_order(order.id).await;
    assert!(matches!(result, Err(OrderError::StoreFailure(_))));

    orders.verify();
    notifications.verify();
}

#[tokio::test]
async fn test_unpersisted_notification_is_not_published() {
    let orders = MockClient::<Order>::new();
    let mut notifications = MockClient::<Notification>::new();
    notifications
        .expect_create()
        .return_err(FrameworkError::ActorClosed);

    let store: Arc<dyn OrderStore> = Arc::new(ActorStore::new(
        OrderClient::new(orders.client()),
        NotificationClient::new(notifications.client()),
    ));
    let broker = InMemoryBroker::new();
    let gateway = PubSubGateway::start(Arc::new(broker.clone()), &GatewayConfig::default()).await;
    let dispatcher =
        NotificationDispatcher::new(store, gateway.clone(), TopicRouter::new(""), QoS::AtLeastOnce);

    let mut order = pending_order();
    order.payment_status = true;
    let report = dispatcher.dispatch(&order, &[EventKind::Paid]).await;

    assert!(!report.is_complete());
    assert!(matches!(
        report.failures.as_slice(),
        [DispatchFailure::Store {
            kind: EventKind::Paid,
            error: OrderError::StoreFailure(_)
        }]
    ));
    assert!(report.published.is_empty());
    assert!(broker.published().is_empty());

    notifications.verify();
    gateway.shutdown().await;
}

#[tokio::test]
async fn test_store_forwards_guarded_writes_and_sorts_listings() {
    let (orders, mut requests) = create_mock_client::<Order>(8);
    let notifications = MockClient::<Notification>::new();
    let store = ActorStore::new(
        OrderClient::new(orders),
        NotificationClient::new(notifications.client()),
    );

    let order = pending_order();
    let mut paid = order.clone();
    paid.payment_status = true;
    let write = OrderUpdate::to_match(order.guard(), OrderChange::ConfirmPayment, &paid);

    let actor = async {
        let (id, update, responder) = expect_update(&mut requests).await.expect("Update request");
        assert_eq!(id, order.id);
        assert_eq!(update.expected, order.guard());
        assert!(update.payment_status);
        responder.send(Ok(paid.clone())).unwrap();
    };
    let (stored, ()) = tokio::join!(store.update_order(order.id, write), actor);
    assert_eq!(stored.unwrap(), paid);

    let mut older = pending_order();
    older.created_at = Utc::now() - Duration::minutes(5);
    let newer = pending_order();
    let actor = async {
        let (filter, responder) = expect_list(&mut requests).await.expect("List request");
        assert_eq!(filter.statuses, vec![OrderStatus::Pending]);
        responder.send(Ok(vec![older.clone(), newer.clone()])).unwrap();
    };
    let (listed, ()) = tokio::join!(
        store.list_orders(OrderFilter::statuses(&[OrderStatus::Pending])),
        actor
    );
    let ids: Vec<OrderId> = listed.unwrap().iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
}
