//! [`ActorEntity`] implementation for [`Notification`].

use crate::model::{
    Notification, NotificationAction, NotificationCreate, NotificationFilter, NotificationId,
};
use crate::order_actor::OrderError;
use async_trait::async_trait;
use canteen_actor::ActorEntity;
use chrono::Utc;

#[async_trait]
impl ActorEntity for Notification {
    type Id = NotificationId;
    type Create = NotificationCreate;
    /// Notifications are immutable apart from the read flag, which is an action.
    type Update = std::convert::Infallible;
    type Action = NotificationAction;
    type ActionResult = bool;
    type Filter = NotificationFilter;
    type Context = ();
    type Error = OrderError;

    fn from_create_params(
        id: NotificationId,
        params: NotificationCreate,
    ) -> Result<Self, Self::Error> {
        if params.message.trim().is_empty() {
            return Err(OrderError::validation("notification message is required"));
        }
        Ok(Self {
            id,
            user_id: params.user_id,
            order_id: params.order_id,
            message: params.message,
            is_read: false,
            created_at: Utc::now(),
        })
    }

    fn matches(&self, filter: &NotificationFilter) -> bool {
        filter.matches(self)
    }

    async fn on_update(
        &mut self,
        update: std::convert::Infallible,
        _ctx: &(),
    ) -> Result<(), Self::Error> {
        match update {}
    }

    async fn handle_action(
        &mut self,
        action: NotificationAction,
        _ctx: &(),
    ) -> Result<bool, Self::Error> {
        match action {
            NotificationAction::MarkRead => {
                let changed = !self.is_read;
                self.is_read = true;
                Ok(changed)
            }
        }
    }
}
