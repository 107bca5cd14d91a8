use crate::clients::{NotificationClient, OrderClient};
use crate::config::{CanteenConfig, ConfigError};
use crate::dispatcher::NotificationDispatcher;
use crate::gateway::{BrokerConnector, PubSubGateway};
use crate::service::OrderService;
use crate::store::{ActorStore, OrderStore};
use crate::topics::TopicRouter;
use std::sync::Arc;
use tracing::{error, info};

/// The running order core: actors, broker connection and the service on top.
///
/// ```ignore
/// let system = CanteenSystem::start(&config, Arc::new(InMemoryBroker::new())).await?;
/// let order = system.service.submit_order(customer, items).await?;
/// system.shutdown().await?;
/// ```
pub struct CanteenSystem {
    pub service: OrderService,
    pub gateway: PubSubGateway,
    pub order_client: OrderClient,
    pub notification_client: NotificationClient,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl CanteenSystem {
    pub async fn start(
        config: &CanteenConfig,
        connector: Arc<dyn BrokerConnector>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        // 1. Actors (no dependencies, Context = ())
        let (order_actor, order_client) = crate::order_actor::new(config.actor_buffer);
        let (notification_actor, notification_client) =
            crate::notification_actor::new(config.actor_buffer);
        let order_handle = tokio::spawn(order_actor.run(()));
        let notification_handle = tokio::spawn(notification_actor.run(()));

        // 2. Broker connection
        let gateway = PubSubGateway::start(connector, &config.gateway).await;

        // 3. Service layer
        let router = TopicRouter::new(config.topic_prefix.clone());
        let store: Arc<dyn OrderStore> = Arc::new(ActorStore::new(
            order_client.clone(),
            notification_client.clone(),
        ));
        let dispatcher = NotificationDispatcher::new(
            store.clone(),
            gateway.clone(),
            router.clone(),
            config.gateway.publish_qos,
        );
        let service = OrderService::new(store, dispatcher, gateway.clone(), router);

        info!(
            prefix = config.topic_prefix,
            connected = gateway.is_connected(),
            "Canteen system started"
        );
        Ok(Self {
            service,
            gateway,
            order_client,
            notification_client,
            handles: vec![order_handle, notification_handle],
        })
    }

    /// Stops the gateway, closes every actor channel and waits for the actors to exit.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");

        self.gateway.shutdown().await;
        drop(self.service);
        drop(self.order_client);
        drop(self.notification_client);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(format!("Actor task failed: {:?}", e));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
