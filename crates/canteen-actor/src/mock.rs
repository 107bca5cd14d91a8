//! # Mock Clients
//!
//! `MockClient<T>` hands out a real [`ResourceClient<T>`] whose requests are answered
//! from a queue of expectations instead of by an actor. Use it to test code that sits
//! *on top of* a client (typed wrappers, stores, services) and to inject failures that
//! a real actor would rarely produce, such as a closed channel mid-operation.
//!
//! | | MockClient | Real actor |
//! |---|---|---|
//! | State | none, answers are scripted | real records |
//! | Error injection | `return_err(...)` | needs a contrived state |
//! | Use case | logic around the client | the record logic itself |
//!
//! ```rust
//! use canteen_actor::mock::MockClient;
//! use canteen_actor::{ActorEntity, FrameworkError};
//! use async_trait::async_trait;
//!
//! #[derive(Clone, Debug)] struct Ticket { id: u32 }
//! #[derive(Debug)] struct TicketCreate;
//! #[derive(Debug)] struct TicketUpdate;
//! #[derive(Debug)] enum TicketAction {}
//! #[derive(Debug, thiserror::Error)] #[error("ticket error")] struct TicketError;
//!
//! #[async_trait]
//! impl ActorEntity for Ticket {
//!     type Id = u32; type Create = TicketCreate; type Update = TicketUpdate;
//!     type Action = TicketAction; type ActionResult = (); type Filter = ();
//!     type Context = (); type Error = TicketError;
//!     fn from_create_params(id: u32, _: TicketCreate) -> Result<Self, Self::Error> {
//!         Ok(Self { id })
//!     }
//!     async fn on_update(&mut self, _: TicketUpdate, _: &()) -> Result<(), Self::Error> { Ok(()) }
//!     async fn handle_action(&mut self, a: TicketAction, _: &()) -> Result<(), Self::Error> {
//!         match a {}
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut mock = MockClient::<Ticket>::new();
//!     mock.expect_get(7).return_err(FrameworkError::ActorClosed);
//!
//!     let result = mock.client().get(7).await;
//!     assert!(matches!(result, Err(FrameworkError::ActorClosed)));
//!     mock.verify();
//! }
//! ```
//!
//! For step-by-step assertions on the raw requests, use [`create_mock_client`] with the
//! `expect_*` receiver helpers.

use crate::client::ResourceClient;
use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::message::ResourceRequest;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

/// One scripted answer, consumed in FIFO order.
enum Answer<T: ActorEntity> {
    Get(Result<Option<T>, FrameworkError>),
    Create(Result<T, FrameworkError>),
    List(Result<Vec<T>, FrameworkError>),
    Update(Result<T, FrameworkError>),
    Delete(Result<T, FrameworkError>),
    Action(Result<T::ActionResult, FrameworkError>),
}

impl<T: ActorEntity> Answer<T> {
    fn name(&self) -> &'static str {
        match self {
            Answer::Get(_) => "Get",
            Answer::Create(_) => "Create",
            Answer::List(_) => "List",
            Answer::Update(_) => "Update",
            Answer::Delete(_) => "Delete",
            Answer::Action(_) => "Action",
        }
    }
}

/// The id is `None` for `Create` and `List`, which name no record.
struct Expectation<T: ActorEntity> {
    id: Option<T::Id>,
    answer: Answer<T>,
}

type Queue<T> = Arc<Mutex<VecDeque<Expectation<T>>>>;

/// A mock client with expectation tracking.
///
/// Requests are matched against the head of the queue by kind and by record id. A
/// request of the wrong kind is answered with `FrameworkError::ActorDropped`; one with
/// the wrong id still gets the scripted answer. Both are recorded as mismatches, which
/// make [`MockClient::verify`] panic.
pub struct MockClient<T: ActorEntity> {
    client: ResourceClient<T>,
    expectations: Queue<T>,
    mismatches: Arc<Mutex<Vec<String>>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: ActorEntity> Default for MockClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ActorEntity> MockClient<T> {
    /// Creates a new mock client with no expectations. Must be called inside a runtime.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<ResourceRequest<T>>(100);
        let expectations: Queue<T> = Arc::new(Mutex::new(VecDeque::new()));
        let mismatches = Arc::new(Mutex::new(Vec::new()));
        let queue = expectations.clone();
        let seen = mismatches.clone();

        let handle = tokio::spawn(async move {
            let record = |mismatch: String| {
                if let Ok(mut m) = seen.lock() {
                    m.push(mismatch);
                }
            };
            while let Some(request) = receiver.recv().await {
                let next = queue.lock().ok().and_then(|mut q| q.pop_front());
                let Some(Expectation { id, answer }) = next else {
                    record(format!("got {}, expected nothing", request_name(&request)));
                    continue;
                };
                if let (Some(wanted), Some(got)) = (&id, request_id(&request)) {
                    if wanted != got {
                        let kind = request_name(&request);
                        record(format!("{kind} for id {got}, expected id {wanted}"));
                    }
                }
                match (request, answer) {
                    (ResourceRequest::Get { respond_to, .. }, Answer::Get(r)) => {
                        let _ = respond_to.send(r);
                    }
                    (ResourceRequest::Create { respond_to, .. }, Answer::Create(r)) => {
                        let _ = respond_to.send(r);
                    }
                    (ResourceRequest::List { respond_to, .. }, Answer::List(r)) => {
                        let _ = respond_to.send(r);
                    }
                    (ResourceRequest::Update { respond_to, .. }, Answer::Update(r)) => {
                        let _ = respond_to.send(r);
                    }
                    (ResourceRequest::Delete { respond_to, .. }, Answer::Delete(r)) => {
                        let _ = respond_to.send(r);
                    }
                    (ResourceRequest::Action { respond_to, .. }, Answer::Action(r)) => {
                        let _ = respond_to.send(r);
                    }
                    (request, answer) => {
                        let got = request_name(&request);
                        record(format!("got {got}, expected {}", answer.name()));
                        // Dropping the request drops its responder: the caller sees ActorDropped.
                    }
                }
            }
        });

        Self {
            client: ResourceClient::new(sender),
            expectations,
            mismatches,
            _handle: handle,
        }
    }

    /// Returns a client wired to this mock.
    pub fn client(&self) -> ResourceClient<T> {
        self.client.clone()
    }

    /// Expects a `get` request for `id`.
    pub fn expect_get(&mut self, id: T::Id) -> ExpectationBuilder<T, Option<T>> {
        self.builder(Some(id), Answer::Get)
    }

    pub fn expect_create(&mut self) -> ExpectationBuilder<T, T> {
        self.builder(None, Answer::Create)
    }

    pub fn expect_list(&mut self) -> ExpectationBuilder<T, Vec<T>> {
        self.builder(None, Answer::List)
    }

    pub fn expect_update(&mut self, id: T::Id) -> ExpectationBuilder<T, T> {
        self.builder(Some(id), Answer::Update)
    }

    pub fn expect_delete(&mut self, id: T::Id) -> ExpectationBuilder<T, T> {
        self.builder(Some(id), Answer::Delete)
    }

    pub fn expect_action(&mut self, id: T::Id) -> ExpectationBuilder<T, T::ActionResult> {
        self.builder(Some(id), Answer::Action)
    }

    fn builder<R>(
        &self,
        id: Option<T::Id>,
        wrap: fn(Result<R, FrameworkError>) -> Answer<T>,
    ) -> ExpectationBuilder<T, R> {
        ExpectationBuilder {
            expectations: self.expectations.clone(),
            id,
            wrap,
            _result: PhantomData,
        }
    }

    /// Panics unless every expectation was consumed and no request was unexpected.
    pub fn verify(&self) {
        if let Ok(m) = self.mismatches.lock() {
            if !m.is_empty() {
                panic!("Unexpected requests: {}", m.join("; "));
            }
        }
        if let Ok(exps) = self.expectations.lock() {
            if !exps.is_empty() {
                panic!("Not all expectations were met. {} remaining", exps.len());
            }
        }
    }
}

fn request_id<T: ActorEntity>(request: &ResourceRequest<T>) -> Option<&T::Id> {
    match request {
        ResourceRequest::Get { id, .. }
        | ResourceRequest::Update { id, .. }
        | ResourceRequest::Delete { id, .. }
        | ResourceRequest::Action { id, .. } => Some(id),
        ResourceRequest::Create { .. } | ResourceRequest::List { .. } => None,
    }
}

fn request_name<T: ActorEntity>(request: &ResourceRequest<T>) -> &'static str {
    match request {
        ResourceRequest::Get { .. } => "Get",
        ResourceRequest::Create { .. } => "Create",
        ResourceRequest::List { .. } => "List",
        ResourceRequest::Update { .. } => "Update",
        ResourceRequest::Delete { .. } => "Delete",
        ResourceRequest::Action { .. } => "Action",
    }
}

/// Builder returned by the `expect_*` methods.
pub struct ExpectationBuilder<T: ActorEntity, R> {
    expectations: Queue<T>,
    id: Option<T::Id>,
    wrap: fn(Result<R, FrameworkError>) -> Answer<T>,
    _result: PhantomData<R>,
}

impl<T: ActorEntity, R> ExpectationBuilder<T, R> {
    fn push(self, response: Result<R, FrameworkError>) {
        if let Ok(mut exps) = self.expectations.lock() {
            exps.push_back(Expectation {
                id: self.id,
                answer: (self.wrap)(response),
            });
        }
    }

    /// Answer the request successfully.
    pub fn return_ok(self, value: R) {
        self.push(Ok(value));
    }

    /// Answer the request with an error.
    pub fn return_err(self, error: FrameworkError) {
        self.push(Err(error));
    }
}

// =============================================================================
// RECEIVER HELPERS
// =============================================================================

/// Creates a client plus the receiver its requests land on.
///
/// The test plays the actor: pull requests with the `expect_*` helpers below, assert
/// on their payloads, then answer through the returned responder.
pub fn create_mock_client<T: ActorEntity>(
    buffer_size: usize,
) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Next request must be a `Create`.
pub async fn expect_create<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Create, oneshot::Sender<Result<T, FrameworkError>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create { params, respond_to }) => Some((params, respond_to)),
        _ => None,
    }
}

/// Next request must be an `Update`.
pub async fn expect_update<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, T::Update, oneshot::Sender<Result<T, FrameworkError>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Update {
            id,
            update,
            respond_to,
        }) => Some((id, update, respond_to)),
        _ => None,
    }
}

/// Next request must be a `List`.
pub async fn expect_list<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Filter, oneshot::Sender<Result<Vec<T>, FrameworkError>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::List { filter, respond_to }) => Some((filter, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Clone, Debug, PartialEq)]
    struct Ticket {
        id: u32,
        label: String,
    }

    #[derive(Debug)]
    struct TicketCreate {
        label: String,
    }

    #[derive(Debug)]
    struct Relabel(String);

    #[derive(Debug)]
    enum TicketAction {}

    #[derive(Debug, thiserror::Error)]
    #[error("ticket error")]
    struct TicketError;

    #[async_trait]
    impl ActorEntity for Ticket {
        type Id = u32;
        type Create = TicketCreate;
        type Update = Relabel;
        type Action = TicketAction;
        type ActionResult = ();
        type Filter = ();
        type Context = ();
        type Error = TicketError;

        fn from_create_params(id: u32, params: TicketCreate) -> Result<Self, Self::Error> {
            Ok(Self {
                id,
                label: params.label,
            })
        }

        async fn on_update(&mut self, update: Relabel, _ctx: &()) -> Result<(), Self::Error> {
            self.label = update.0;
            Ok(())
        }

        async fn handle_action(
            &mut self,
            action: TicketAction,
            _ctx: &(),
        ) -> Result<(), Self::Error> {
            match action {}
        }
    }

    fn ticket(id: u32, label: &str) -> Ticket {
        Ticket {
            id,
            label: label.to_string(),
        }
    }

    #[tokio::test]
    async fn receiver_helpers_expose_payloads() {
        let (client, mut receiver) = create_mock_client::<Ticket>(10);

        let task = tokio::spawn(async move {
            client
                .create(TicketCreate {
                    label: "grill".into(),
                })
                .await
        });

        let (payload, responder) = expect_create(&mut receiver).await.expect("Create request");
        assert_eq!(payload.label, "grill");
        responder.send(Ok(ticket(1, "grill"))).unwrap();

        assert_eq!(task.await.unwrap().unwrap(), ticket(1, "grill"));
    }

    #[tokio::test]
    async fn scripted_answers_are_returned_in_order() {
        let mut mock = MockClient::<Ticket>::new();
        mock.expect_list().return_ok(vec![ticket(1, "a"), ticket(2, "b")]);
        mock.expect_update(1).return_err(FrameworkError::NotFound("1".into()));

        let client = mock.client();
        assert_eq!(client.list(()).await.unwrap().len(), 2);
        let err = client.update(1, Relabel("c".into())).await.unwrap_err();
        assert!(matches!(err, FrameworkError::NotFound(id) if id == "1"));

        mock.verify();
    }

    #[tokio::test]
    async fn unexpected_request_is_reported() {
        let mock = MockClient::<Ticket>::new();
        let result = mock.client().get(3).await;
        assert!(matches!(result, Err(FrameworkError::ActorDropped)));

        let verified = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| mock.verify()));
        assert!(verified.is_err());
    }

    #[tokio::test]
    #[should_panic(expected = "Update for id 3, expected id 4")]
    async fn request_for_another_record_fails_verification() {
        let mut mock = MockClient::<Ticket>::new();
        mock.expect_update(4).return_ok(ticket(4, "fryer"));

        // The scripted answer still comes back, so the caller's logic runs to the end.
        let answered = mock.client().update(3, Relabel("fryer".into())).await;
        assert_eq!(answered.unwrap(), ticket(4, "fryer"));

        mock.verify();
    }

    #[tokio::test]
    async fn receiver_helpers_expose_update_and_list_requests() {
        let (client, mut receiver) = create_mock_client::<Ticket>(10);

        let task = tokio::spawn(async move {
            let updated = client.update(9, Relabel("salad".into())).await;
            let listed = client.list(()).await;
            (updated, listed)
        });

        let (id, update, responder) = expect_update(&mut receiver).await.expect("Update request");
        assert_eq!(id, 9);
        assert_eq!(update.0, "salad");
        responder.send(Ok(ticket(9, "salad"))).unwrap();

        let ((), responder) = expect_list(&mut receiver).await.expect("List request");
        responder.send(Err(FrameworkError::ActorClosed)).unwrap();

        let (updated, listed) = task.await.unwrap();
        assert_eq!(updated.unwrap(), ticket(9, "salad"));
        assert!(matches!(listed, Err(FrameworkError::ActorClosed)));
    }
}
