//! # Notification Client
use crate::model::{Notification, NotificationAction, NotificationCreate, NotificationId};
use crate::order_actor::OrderError;
use async_trait::async_trait;
use canteen_actor::{ActorClient, FrameworkError, ResourceClient};
use tracing::{debug, instrument};

/// Client for interacting with the Notification actor.
#[derive(Clone)]
pub struct NotificationClient {
    inner: ResourceClient<Notification>,
}

impl NotificationClient {
    pub fn new(inner: ResourceClient<Notification>) -> Self {
        Self { inner }
    }

    #[instrument(skip(self))]
    pub async fn create_notification(
        &self,
        params: NotificationCreate,
    ) -> Result<Notification, OrderError> {
        debug!("Sending request");
        self.inner.create(params).await.map_err(Self::map_error)
    }

    /// Returns whether the notification was unread before the call.
    #[instrument(skip(self))]
    pub async fn mark_read(&self, id: NotificationId) -> Result<bool, OrderError> {
        debug!("Sending request");
        self.inner
            .perform_action(id, NotificationAction::MarkRead)
            .await
            .map_err(Self::map_error)
    }
}

#[async_trait]
impl ActorClient<Notification> for NotificationClient {
    type Error = OrderError;

    fn inner(&self) -> &ResourceClient<Notification> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        OrderError::from(e)
    }
}
