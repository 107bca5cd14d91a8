//! # Canteen Demo
//!
//! Runs one order through the whole lifecycle, with a kitchen board and a customer
//! listener attached:
//!
//! 1. The customer submits an order.
//! 2. Staff confirm payment and accept it.
//! 3. The kitchen marks it prepared, then ready.
//! 4. The customer picks it up.
//!
//! Settings come from the file named by `CANTEEN_CONFIG` (optional) and `CANTEEN__*`
//! variables. The in-process broker is used unless `[broker] transport = "mqtt"`.

use canteen_orders::config::CanteenConfig;
use canteen_orders::gateway::connector_for;
use canteen_orders::lifecycle::{setup_tracing, CanteenSystem};
use canteen_orders::model::{CustomerId, LineItem, OrderChange, OrderStatus};
use canteen_orders::view::ViewKind;
use std::path::PathBuf;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config_path = std::env::var("CANTEEN_CONFIG").ok().map(PathBuf::from);
    let config = CanteenConfig::load(config_path.as_deref()).map_err(|e| e.to_string())?;

    info!(transport = ?config.broker.transport, "Starting canteen");
    let system = CanteenSystem::start(&config, connector_for(&config.broker))
        .await
        .map_err(|e| e.to_string())?;
    let service = system.service.clone();

    let customer = CustomerId::from("student-042");
    let listener = service
        .subscribe_customer(&customer, |event| {
            if let Some(notice) = event.notice() {
                info!(event_kind = ?event.kind(), text = notice.message, "Customer notified");
            }
        })
        .await
        .map_err(|e| e.to_string())?;
    let kitchen = service
        .open_view(ViewKind::Kitchen)
        .await
        .map_err(|e| e.to_string())?;

    let span = tracing::info_span!("order_lifecycle");
    let result = async {
        let items = vec![LineItem::new("noodles", 2, 50.0), LineItem::new("tea", 1, 30.0)];
        let order = service.submit_order(customer.clone(), items).await?;
        info!(order_id = %order.id, total = order.total_amount, "Order placed");

        for change in [
            OrderChange::ConfirmPayment,
            OrderChange::Status(OrderStatus::Preparing),
            OrderChange::MarkPrepared,
            OrderChange::Status(OrderStatus::Ready),
            OrderChange::Status(OrderStatus::Completed),
        ] {
            let outcome = service.transition_order(order.id, change).await?;
            if outcome.is_degraded() {
                let failures = outcome.report.failures.len();
                error!(%change, failures, "Notification delivery degraded");
            }
            info!(%change, status = %outcome.order.status, "Transition applied");
        }
        Ok::<_, canteen_orders::OrderError>(order.id)
    }
    .instrument(span)
    .await;

    match result {
        Ok(order_id) => {
            let inbox = service
                .list_notifications(&customer)
                .await
                .map_err(|e| e.to_string())?;
            info!(order_id = %order_id, notifications = inbox.len(), "Order lifecycle completed");
        }
        Err(e) => error!(error = %e, "Order lifecycle failed"),
    }

    let board = kitchen.snapshot().await.map_err(|e| e.to_string())?;
    info!(on_kitchen_board = board.visible.len(), "Final state");

    kitchen.close().await.map_err(|e| e.to_string())?;
    service.unsubscribe(listener).await.map_err(|e| e.to_string())?;
    drop(service);
    system.shutdown().await?;

    info!("Demo completed successfully");
    Ok(())
}
