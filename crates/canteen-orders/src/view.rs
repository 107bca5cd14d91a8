//! # Client Order Views
//!
//! A [`ClientOrderView`] is a session-local cache of orders for one kind of screen,
//! fed from two sources:
//!
//! - a **baseline**: the result of a filtered `list_orders` fetch;
//! - **push events** from the gateway.
//!
//! ## Merge rules
//!
//! - An event carrying a full order is an upsert. Replaying it changes nothing.
//! - An event without an order updates the cached copy, or is dropped when the order is
//!   not cached. The next baseline picks it up.
//! - Merges are monotonic: status never moves backwards along the happy path, payment
//!   and completion never revert. A stale fetch racing a newer push cannot undo it.
//! - An order that moves out of the view's baseline filter is evicted at once, and later
//!   redeliveries for it are ignored.
//! - A baseline evicts cached orders that the fetch should have returned but did not,
//!   except those a push touched after the fetch was requested ([`BaselineToken`]).
//!
//! What is visible is decided at read time from the cached orders and the view kind.
//!
//! [`spawn_view`] drives a view from gateway subscriptions on its own task; the
//! returned [`ViewHandle`] is the only way to touch it.

use crate::gateway::{GatewayError, PubSubGateway, SubscriptionId};
use crate::model::{
    CustomerId, EventKind, Notice, NotificationId, Order, OrderEvent, OrderFilter, OrderId,
    OrderStatus,
};
use crate::topics::TopicRouter;
use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewKind {
    /// Orders being cooked, oldest first.
    Kitchen,
    /// New orders, plus the ones this board accepted itself.
    StaffBoard,
    /// One customer's open orders and notification feed.
    Customer(CustomerId),
}

impl ViewKind {
    pub fn topics(&self, router: &TopicRouter) -> Vec<String> {
        match self {
            ViewKind::Kitchen => vec![
                router.kitchen_intake(),
                router.kitchen_cancel(),
                router.customer_wildcard(),
            ],
            ViewKind::StaffBoard => vec![router.order_intake(), router.customer_wildcard()],
            ViewKind::Customer(id) => vec![router.customer_topic(id)],
        }
    }

    pub fn baseline_filter(&self) -> OrderFilter {
        match self {
            ViewKind::Kitchen => OrderFilter::statuses(&[OrderStatus::Preparing]),
            ViewKind::StaffBoard => {
                OrderFilter::statuses(&[OrderStatus::Pending, OrderStatus::Preparing])
            }
            ViewKind::Customer(id) => OrderFilter {
                customer_id: Some(id.clone()),
                ..OrderFilter::statuses(&[
                    OrderStatus::Pending,
                    OrderStatus::Preparing,
                    OrderStatus::Ready,
                ])
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Inserted,
    Updated,
    Unchanged,
    /// The order moved out of this view's scope and was evicted.
    Removed,
    /// Delta for an order this view has not cached.
    Dropped,
    /// Unknown event kind, an event for another customer, or one for an order this
    /// view already let go.
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewNotice {
    pub notification_id: NotificationId,
    pub order_id: OrderId,
    pub kind: EventKind,
    pub message: String,
    pub read: bool,
}

/// Taken when a baseline fetch is requested. Pushes applied after it are newer than
/// anything that fetch can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BaselineToken(u64);

/// Retired ids kept between baselines, oldest dropped first.
const RETIRED_LIMIT: usize = 1024;

#[derive(Debug, Clone)]
struct Cached {
    order: Order,
    /// Sequence of the last push that touched the order; 0 if only fetched.
    pushed_at: u64,
}

#[derive(Debug, Clone)]
pub struct ClientOrderView {
    kind: ViewKind,
    scope: OrderFilter,
    orders: HashMap<OrderId, Cached>,
    accepted: HashSet<OrderId>,
    notices: Vec<ViewNotice>,
    seen_notices: HashSet<NotificationId>,
    /// Orders a push moved out of scope, with the push that did it. Late redeliveries
    /// for these are ignored instead of resurrecting them.
    retired: HashMap<OrderId, u64>,
    pushes: u64,
}

impl ClientOrderView {
    pub fn new(kind: ViewKind) -> Self {
        Self {
            scope: kind.baseline_filter(),
            kind,
            orders: HashMap::new(),
            accepted: HashSet::new(),
            notices: Vec::new(),
            seen_notices: HashSet::new(),
            retired: HashMap::new(),
            pushes: 0,
        }
    }

    pub fn kind(&self) -> &ViewKind {
        &self.kind
    }

    pub fn cached(&self, id: &OrderId) -> Option<&Order> {
        self.orders.get(id).map(|c| &c.order)
    }

    pub fn cached_len(&self) -> usize {
        self.orders.len()
    }

    fn relevant(&self, order: &Order) -> bool {
        match &self.kind {
            ViewKind::Customer(id) => order.customer_id == *id,
            _ => true,
        }
    }

    /// `pushed_at` is `None` for fetched orders.
    fn upsert(&mut self, incoming: Order, pushed_at: Option<u64>) -> ApplyOutcome {
        if !self.relevant(&incoming) || self.retired.contains_key(&incoming.id) {
            return ApplyOutcome::Ignored;
        }
        let id = incoming.id;
        let outcome = match self.orders.get_mut(&id) {
            None => {
                self.orders.insert(
                    id,
                    Cached {
                        order: incoming,
                        pushed_at: pushed_at.unwrap_or(0),
                    },
                );
                ApplyOutcome::Inserted
            }
            Some(cached) => {
                if let Some(seq) = pushed_at {
                    cached.pushed_at = seq;
                }
                let merged = merge(&cached.order, incoming);
                if merged == cached.order {
                    ApplyOutcome::Unchanged
                } else {
                    cached.order = merged;
                    ApplyOutcome::Updated
                }
            }
        };
        self.evict_if_out_of_scope(id, outcome)
    }

    fn evict_if_out_of_scope(&mut self, id: OrderId, outcome: ApplyOutcome) -> ApplyOutcome {
        let in_scope = self
            .orders
            .get(&id)
            .is_some_and(|c| self.scope.matches(&c.order));
        if in_scope {
            return outcome;
        }
        self.orders.remove(&id);
        self.accepted.remove(&id);
        self.retired.insert(id, self.pushes);
        if self.retired.len() > RETIRED_LIMIT {
            let oldest = self
                .retired
                .iter()
                .min_by_key(|(_, seq)| **seq)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                self.retired.remove(&oldest);
            }
        }
        ApplyOutcome::Removed
    }

    /// Call before fetching a baseline; hand the token to [`Self::apply_baseline`].
    pub fn begin_baseline(&self) -> BaselineToken {
        BaselineToken(self.pushes)
    }

    /// Merges a fetch made with `kind().baseline_filter()`.
    ///
    /// Cached orders missing from the fetch are evicted unless a push touched them
    /// after `token` was taken: such a push is newer than the fetch.
    pub fn apply_baseline(&mut self, token: BaselineToken, orders: Vec<Order>) {
        let fetched: HashSet<OrderId> = orders.iter().map(|o| o.id).collect();
        for order in orders {
            self.upsert(order, None);
        }
        let before = self.orders.len();
        self.orders
            .retain(|id, c| fetched.contains(id) || c.pushed_at > token.0);
        self.accepted.retain(|id| self.orders.contains_key(id));
        self.retired.retain(|_, seq| *seq > token.0);
        debug!(
            fetched = fetched.len(),
            evicted = before - self.orders.len(),
            "Baseline applied"
        );
    }

    pub fn apply_event(&mut self, event: &OrderEvent) -> ApplyOutcome {
        let (Some(kind), Some(notice)) = (event.kind(), event.notice()) else {
            return ApplyOutcome::Ignored;
        };
        self.pushes += 1;
        let seq = self.pushes;
        self.record_notice(kind, notice);

        if let Some(order) = &notice.order {
            return self.upsert(order.clone(), Some(seq));
        }
        if self.retired.contains_key(&notice.order_id) {
            return ApplyOutcome::Ignored;
        }
        let Some(cached) = self.orders.get_mut(&notice.order_id) else {
            let order_id = notice.order_id;
            debug!(%order_id, event_kind = %kind, "Delta for uncached order dropped");
            return ApplyOutcome::Dropped;
        };
        cached.pushed_at = seq;
        let before = cached.order.clone();
        apply_delta(&mut cached.order, kind);
        let outcome = if cached.order == before {
            ApplyOutcome::Unchanged
        } else {
            ApplyOutcome::Updated
        };
        self.evict_if_out_of_scope(notice.order_id, outcome)
    }

    fn record_notice(&mut self, kind: EventKind, notice: &Notice) {
        if !matches!(self.kind, ViewKind::Customer(_)) {
            return;
        }
        let Some(id) = notice.notification_id else {
            return;
        };
        if self.seen_notices.insert(id) {
            self.notices.push(ViewNotice {
                notification_id: id,
                order_id: notice.order_id,
                kind,
                message: notice.message.clone(),
                read: false,
            });
        }
    }

    /// Flags an order this board accepted, so it stays visible after leaving `PENDING`.
    pub fn mark_accepted(&mut self, id: OrderId) {
        self.accepted.insert(id);
    }

    /// Visible orders, filtered and sorted for this view kind.
    pub fn visible(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .values()
            .map(|c| &c.order)
            .filter(|o| self.shows(o))
            .cloned()
            .collect();
        match self.kind {
            ViewKind::Kitchen => orders.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            _ => orders.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        orders
    }

    fn shows(&self, order: &Order) -> bool {
        match &self.kind {
            ViewKind::Kitchen => order.status == OrderStatus::Preparing,
            ViewKind::StaffBoard => {
                order.status == OrderStatus::Pending
                    || (order.status == OrderStatus::Preparing && self.accepted.contains(&order.id))
            }
            ViewKind::Customer(id) => order.customer_id == *id && !order.status.is_terminal(),
        }
    }

    /// Newest last.
    pub fn notices(&self) -> &[ViewNotice] {
        &self.notices
    }

    pub fn unread_count(&self) -> usize {
        self.notices.iter().filter(|n| !n.read).count()
    }

    pub fn mark_all_read(&mut self) {
        for notice in &mut self.notices {
            notice.read = true;
        }
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            visible: self.visible(),
            notices: self.notices.clone(),
            unread: self.unread_count(),
            cached: self.orders.len(),
        }
    }
}

/// Monotonic merge of a pushed or fetched order into the cached copy.
fn merge(cached: &Order, incoming: Order) -> Order {
    let mut merged = incoming;
    if cached.status.rank() > merged.status.rank() {
        merged.status = cached.status;
    }
    merged.payment_status |= cached.payment_status;
    if merged.completed_at.is_none() {
        merged.completed_at = cached.completed_at;
    }
    merged
}

fn apply_delta(order: &mut Order, kind: EventKind) {
    let advance = |order: &mut Order, to: OrderStatus| {
        if order.status.rank() < to.rank() {
            order.status = to;
        }
    };
    match kind {
        EventKind::Submitted => {}
        EventKind::Accepted => advance(order, OrderStatus::Preparing),
        EventKind::Paid => order.payment_status = true,
        EventKind::Ready => advance(order, OrderStatus::Ready),
        EventKind::Completed => advance(order, OrderStatus::Completed),
        EventKind::Cancelled => advance(order, OrderStatus::Cancelled),
    }
}

// =============================================================================
// VIEW TASK
// =============================================================================

#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    pub visible: Vec<Order>,
    pub notices: Vec<ViewNotice>,
    pub unread: usize,
    pub cached: usize,
}

enum ViewCommand {
    BeginBaseline(oneshot::Sender<BaselineToken>),
    Baseline(BaselineToken, Vec<Order>),
    MarkAccepted(OrderId),
    MarkAllRead,
    Snapshot(oneshot::Sender<(ViewSnapshot, ViewStats)>),
}

/// Counters kept by the view task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewStats {
    pub events: u64,
    pub dropped: u64,
    pub undecodable: u64,
}

/// Handle to a view running on its own task.
pub struct ViewHandle {
    kind: ViewKind,
    commands: mpsc::Sender<ViewCommand>,
    subscriptions: Vec<SubscriptionId>,
    gateway: PubSubGateway,
    task: JoinHandle<()>,
}

/// Subscribes to the view's topics and starts the task that owns `view`.
pub async fn spawn_view(
    gateway: &PubSubGateway,
    router: &TopicRouter,
    view: ClientOrderView,
) -> Result<ViewHandle, GatewayError> {
    let kind = view.kind().clone();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let mut subscriptions = Vec::new();
    for topic in kind.topics(router) {
        let sender = event_tx.clone();
        let subscribed = gateway
            .subscribe(&topic, move |message| {
                let _ = sender.send(message.payload.clone());
            })
            .await;
        match subscribed {
            Ok(id) => subscriptions.push(id),
            Err(e) => {
                for id in subscriptions {
                    let _ = gateway.unsubscribe(id).await;
                }
                return Err(e);
            }
        }
    }

    let (commands, command_rx) = mpsc::channel(32);
    let task = tokio::spawn(run_view(view, command_rx, event_rx));
    info!(kind = ?kind, topics = subscriptions.len(), "View started");
    Ok(ViewHandle {
        kind,
        commands,
        subscriptions,
        gateway: gateway.clone(),
        task,
    })
}

async fn run_view(
    mut view: ClientOrderView,
    mut commands: mpsc::Receiver<ViewCommand>,
    mut events: mpsc::UnboundedReceiver<Vec<u8>>,
) {
    let mut stats = ViewStats::default();
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(ViewCommand::BeginBaseline(respond_to)) => {
                    let _ = respond_to.send(view.begin_baseline());
                }
                Some(ViewCommand::Baseline(token, orders)) => view.apply_baseline(token, orders),
                Some(ViewCommand::MarkAccepted(id)) => view.mark_accepted(id),
                Some(ViewCommand::MarkAllRead) => view.mark_all_read(),
                Some(ViewCommand::Snapshot(respond_to)) => {
                    let _ = respond_to.send((view.snapshot(), stats));
                }
                None => break,
            },
            Some(payload) = events.recv() => {
                match serde_json::from_slice::<OrderEvent>(&payload) {
                    Ok(event) => {
                        stats.events += 1;
                        if view.apply_event(&event) == ApplyOutcome::Dropped {
                            stats.dropped += 1;
                        }
                    }
                    Err(e) => {
                        stats.undecodable += 1;
                        warn!(error = %e, "Undecodable order event");
                    }
                }
            }
        }
    }
    debug!(kind = ?view.kind(), "View stopped");
}

impl ViewHandle {
    pub fn kind(&self) -> &ViewKind {
        &self.kind
    }

    /// Marks the start of a baseline fetch. Fetch with `kind().baseline_filter()` after
    /// this returns, then pass the token to [`ViewHandle::refresh`].
    pub async fn begin_refresh(&self) -> Result<BaselineToken, GatewayError> {
        let (respond_to, response) = oneshot::channel();
        self.commands
            .send(ViewCommand::BeginBaseline(respond_to))
            .await
            .map_err(|_| GatewayError::Closed)?;
        response.await.map_err(|_| GatewayError::Closed)
    }

    pub async fn refresh(
        &self,
        token: BaselineToken,
        orders: Vec<Order>,
    ) -> Result<(), GatewayError> {
        self.commands
            .send(ViewCommand::Baseline(token, orders))
            .await
            .map_err(|_| GatewayError::Closed)
    }

    pub async fn mark_accepted(&self, id: OrderId) -> Result<(), GatewayError> {
        self.commands
            .send(ViewCommand::MarkAccepted(id))
            .await
            .map_err(|_| GatewayError::Closed)
    }

    pub async fn mark_all_read(&self) -> Result<(), GatewayError> {
        self.commands
            .send(ViewCommand::MarkAllRead)
            .await
            .map_err(|_| GatewayError::Closed)
    }

    pub async fn snapshot(&self) -> Result<ViewSnapshot, GatewayError> {
        Ok(self.snapshot_with_stats().await?.0)
    }

    pub async fn stats(&self) -> Result<ViewStats, GatewayError> {
        Ok(self.snapshot_with_stats().await?.1)
    }

    async fn snapshot_with_stats(&self) -> Result<(ViewSnapshot, ViewStats), GatewayError> {
        let (respond_to, response) = oneshot::channel();
        self.commands
            .send(ViewCommand::Snapshot(respond_to))
            .await
            .map_err(|_| GatewayError::Closed)?;
        response.await.map_err(|_| GatewayError::Closed)
    }

    /// Tears down every subscription, then stops the task. Returns the first
    /// unsubscribe error, if any.
    pub async fn close(self) -> Result<(), GatewayError> {
        let mut first_error = None;
        for id in &self.subscriptions {
            if let Err(e) = self.gateway.unsubscribe(*id).await {
                warn!(%id, error = %e, "View unsubscribe failed");
                first_error.get_or_insert(e);
            }
        }
        drop(self.commands);
        if let Err(e) = self.task.await {
            warn!(error = ?e, "View task failed");
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LineItem;
    use chrono::{Duration, Utc};

    fn order(customer: &str, status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(),
            customer_id: CustomerId::from(customer),
            items: vec![LineItem::new("A", 1, 8.0)],
            total_amount: 8.0,
            status,
            payment_status: false,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    fn full(kind: EventKind, order: &Order) -> OrderEvent {
        OrderEvent::new(
            kind,
            Notice {
                order_id: order.id,
                notification_id: None,
                message: String::new(),
                order: Some(order.clone()),
            },
        )
    }

    fn delta(kind: EventKind, id: OrderId, notification_id: Option<NotificationId>) -> OrderEvent {
        OrderEvent::new(
            kind,
            Notice {
                order_id: id,
                notification_id,
                message: format!("{kind}"),
                order: None,
            },
        )
    }

    fn load(view: &mut ClientOrderView, orders: Vec<Order>) {
        let token = view.begin_baseline();
        view.apply_baseline(token, orders);
    }

    #[test]
    fn upsert_is_idempotent() {
        let mut view = ClientOrderView::new(ViewKind::Kitchen);
        let o = order("c", OrderStatus::Preparing);
        let event = full(EventKind::Accepted, &o);

        assert_eq!(view.apply_event(&event), ApplyOutcome::Inserted);
        let once = view.visible();
        assert_eq!(view.apply_event(&event), ApplyOutcome::Unchanged);
        assert_eq!(view.visible(), once);
        assert_eq!(view.cached_len(), 1);
    }

    #[test]
    fn delta_for_uncached_order_is_dropped() {
        let mut view = ClientOrderView::new(ViewKind::Kitchen);
        let outcome = view.apply_event(&delta(EventKind::Paid, OrderId::new(), None));
        assert_eq!(outcome, ApplyOutcome::Dropped);
        assert_eq!(view.cached_len(), 0);
    }

    #[test]
    fn delta_updates_cached_order_and_filters_it_out() {
        let mut view = ClientOrderView::new(ViewKind::Kitchen);
        let o = order("c", OrderStatus::Preparing);
        view.apply_event(&full(EventKind::Accepted, &o));

        assert_eq!(view.apply_event(&delta(EventKind::Paid, o.id, None)), ApplyOutcome::Updated);
        assert!(view.cached(&o.id).unwrap().payment_status);
        assert_eq!(
            view.apply_event(&delta(EventKind::Ready, o.id, None)),
            ApplyOutcome::Removed
        );
        assert!(view.visible().is_empty());
        assert_eq!(view.cached_len(), 0);
    }

    #[test]
    fn push_during_fetch_survives_older_baseline() {
        let mut view = ClientOrderView::new(ViewKind::StaffBoard);
        let token = view.begin_baseline();
        let fresh = order("c", OrderStatus::Pending);
        assert_eq!(
            view.apply_event(&full(EventKind::Submitted, &fresh)),
            ApplyOutcome::Inserted
        );

        // The fetch was taken before the submission landed.
        view.apply_baseline(token, Vec::new());
        assert!(view.cached(&fresh.id).is_some());
        assert_eq!(view.visible(), vec![fresh.clone()]);

        // A fetch requested after the push is authoritative.
        load(&mut view, Vec::new());
        assert!(view.cached(&fresh.id).is_none());
    }

    #[test]
    fn orders_leaving_scope_are_evicted_and_stay_gone() {
        let mut view = ClientOrderView::new(ViewKind::Kitchen);
        let orders: Vec<Order> = (0..500).map(|_| order("c", OrderStatus::Preparing)).collect();
        for o in &orders {
            view.apply_event(&full(EventKind::Accepted, o));
            assert_eq!(
                view.apply_event(&delta(EventKind::Cancelled, o.id, None)),
                ApplyOutcome::Removed
            );
        }
        assert_eq!(view.cached_len(), 0);

        // Late redelivery of the accept does not bring an order back.
        assert_eq!(
            view.apply_event(&full(EventKind::Accepted, &orders[0])),
            ApplyOutcome::Ignored
        );
        assert_eq!(
            view.apply_event(&delta(EventKind::Paid, orders[1].id, None)),
            ApplyOutcome::Ignored
        );

        load(&mut view, Vec::new());
        assert_eq!(view.cached_len(), 0);
        assert!(view.retired.is_empty());
    }

    #[test]
    fn retired_ids_are_bounded_between_baselines() {
        let mut view = ClientOrderView::new(ViewKind::Kitchen);
        for _ in 0..RETIRED_LIMIT + 50 {
            let o = order("c", OrderStatus::Preparing);
            view.apply_event(&full(EventKind::Accepted, &o));
            view.apply_event(&delta(EventKind::Ready, o.id, None));
        }
        assert_eq!(view.cached_len(), 0);
        assert_eq!(view.retired.len(), RETIRED_LIMIT);
    }

    #[test]
    fn stale_snapshot_never_moves_status_back() {
        let mut view = ClientOrderView::new(ViewKind::StaffBoard);
        let mut o = order("c", OrderStatus::Preparing);
        o.payment_status = true;
        view.apply_event(&full(EventKind::Accepted, &o));

        let mut stale = o.clone();
        stale.status = OrderStatus::Pending;
        stale.payment_status = false;
        load(&mut view, vec![stale]);

        let cached = view.cached(&o.id).unwrap();
        assert_eq!(cached.status, OrderStatus::Preparing);
        assert!(cached.payment_status);
    }

    #[test]
    fn baseline_evicts_orders_missing_from_the_fetch() {
        let mut view = ClientOrderView::new(ViewKind::Kitchen);
        let gone = order("c", OrderStatus::Preparing);
        let kept = order("c", OrderStatus::Preparing);
        view.apply_event(&full(EventKind::Accepted, &gone));

        load(&mut view, vec![kept.clone()]);
        assert!(view.cached(&gone.id).is_none());
        assert_eq!(view.visible(), vec![kept]);
    }

    #[test]
    fn kitchen_is_oldest_first_and_staff_newest_first() {
        let mut older = order("c", OrderStatus::Preparing);
        older.created_at = Utc::now() - Duration::minutes(5);
        let newer = order("c", OrderStatus::Preparing);

        let mut kitchen = ClientOrderView::new(ViewKind::Kitchen);
        load(&mut kitchen, vec![newer.clone(), older.clone()]);
        let ids: Vec<OrderId> = kitchen.visible().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![older.id, newer.id]);

        let mut staff = ClientOrderView::new(ViewKind::StaffBoard);
        let mut pending_old = older.clone();
        pending_old.status = OrderStatus::Pending;
        let mut pending_new = newer.clone();
        pending_new.status = OrderStatus::Pending;
        load(&mut staff, vec![pending_old.clone(), pending_new.clone()]);
        let ids: Vec<OrderId> = staff.visible().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![pending_new.id, pending_old.id]);
    }

    #[test]
    fn staff_board_keeps_locally_accepted_orders() {
        let mut view = ClientOrderView::new(ViewKind::StaffBoard);
        let mine = order("c", OrderStatus::Pending);
        let theirs = order("c", OrderStatus::Pending);
        load(&mut view, vec![mine.clone(), theirs.clone()]);

        view.mark_accepted(mine.id);
        view.apply_event(&delta(EventKind::Accepted, mine.id, None));
        view.apply_event(&delta(EventKind::Accepted, theirs.id, None));

        let visible: Vec<OrderId> = view.visible().iter().map(|o| o.id).collect();
        assert_eq!(visible, vec![mine.id]);
    }

    #[test]
    fn customer_notices_are_deduplicated() {
        let customer = CustomerId::from("c-7");
        let mut view = ClientOrderView::new(ViewKind::Customer(customer));
        let o = order("c-7", OrderStatus::Preparing);
        load(&mut view, vec![o.clone()]);

        let nid = NotificationId::new();
        view.apply_event(&delta(EventKind::Paid, o.id, Some(nid)));
        view.apply_event(&delta(EventKind::Paid, o.id, Some(nid)));
        assert_eq!(view.notices().len(), 1);
        assert_eq!(view.unread_count(), 1);

        view.mark_all_read();
        assert_eq!(view.unread_count(), 0);
        view.apply_event(&delta(EventKind::Paid, o.id, Some(nid)));
        assert_eq!(view.unread_count(), 0);
    }

    #[test]
    fn customer_view_ignores_other_customers_orders() {
        let mut view = ClientOrderView::new(ViewKind::Customer(CustomerId::from("me")));
        let other = order("someone-else", OrderStatus::Pending);
        assert_eq!(view.apply_event(&full(EventKind::Submitted, &other)), ApplyOutcome::Ignored);
        assert_eq!(view.cached_len(), 0);
    }

    #[test]
    fn unknown_events_are_ignored() {
        let mut view = ClientOrderView::new(ViewKind::Kitchen);
        assert_eq!(view.apply_event(&OrderEvent::Unknown), ApplyOutcome::Ignored);
    }
}
