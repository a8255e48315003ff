//! # Proxy
//!
//! The proxy mediates between callers awaiting a single result and the delegate callbacks that
//! eventually produce it.
//!
//! ## Dispatch
//!
//! Outstanding requests are kept in registration order. When an event arrives, the first
//! request whose interest list contains the event's kind is detached from the pending set and
//! then handed the event. Later requests interested in the same kind stay pending. Events that
//! match nothing are dropped.
//!
//! Scanning and detaching happen under one lock; the request is resolved after the lock is
//! released. A request is therefore never resolved twice, even when dispatch is called from
//! several threads or re-entered from inside a resolution.
//!
//! ## Usage
//!
//! ```rust
//! # use std::sync::Arc;
//! # use delegate_proxy::event::Event;
//! # use delegate_proxy::proxy::{EventSink, Proxy};
//! # #[derive(Debug, Clone, Copy, PartialEq)]
//! # enum Kind { Fix, Failure }
//! # enum LocationEvent { Fix(f64, f64), Failure(String) }
//! # impl Event for LocationEvent {
//! #     type Kind = Kind;
//! #     fn kind(&self) -> Kind {
//! #         match self { LocationEvent::Fix(..) => Kind::Fix, LocationEvent::Failure(_) => Kind::Failure }
//! #     }
//! # }
//! # async fn example() {
//! let proxy = Arc::new(Proxy::<LocationEvent>::new());
//!
//! let pending = proxy.request([Kind::Fix, Kind::Failure], |event| match event {
//!     LocationEvent::Fix(lat, lon) => Ok((lat, lon)),
//!     LocationEvent::Failure(reason) => Err(reason),
//! });
//!
//! // Somewhere in a delegate callback:
//! proxy.notify(LocationEvent::Fix(35.68, 139.76));
//!
//! assert_eq!(pending.wait().await, Ok((35.68, 139.76)));
//! # }
//! ```

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use tracing::{debug, instrument, trace, warn};
use uuid::Uuid;

use crate::{
    config::ProxyConfig,
    event::Event,
    request::{channel, EventRequest, Outcome, Request, RequestError},
};

/// Identity of a registered request.
///
/// Requests with identical interest lists are still distinct; removal always goes by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(Uuid);

impl RequestId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Result of a single [`Proxy::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// The request with this id was detached and resolved.
    Resolved(RequestId),
    /// No pending request was interested; the event was dropped.
    Unmatched,
}

impl Dispatched {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Dispatched::Resolved(_))
    }
}

/// Inbound boundary for event sources.
///
/// Delegate adapters hold an `Arc<dyn EventSink<E>>` and call [`EventSink::notify`] from
/// whatever callback context they run in.
pub trait EventSink<E>: Send + Sync {
    fn notify(&self, event: E);
}

struct Registered<E: Event> {
    id: RequestId,
    request: Box<dyn Request<E>>,
}

/// Registry of outstanding requests with first-match, one-shot dispatch.
pub struct Proxy<E: Event> {
    requests: Mutex<Vec<Registered<E>>>,
    config: ProxyConfig,
}

impl<E: Event> Default for Proxy<E> {
    fn default() -> Self {
        Self::with_config(ProxyConfig::default())
    }
}

impl<E: Event> Proxy<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ProxyConfig) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            config,
        }
    }

    /// Creates a proxy that starts with `requests` pending, in iteration order.
    pub fn with_requests(requests: impl IntoIterator<Item = Box<dyn Request<E>>>) -> Self {
        let proxy = Self::new();
        for request in requests {
            proxy.register(request);
        }
        proxy
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Appends a request to the pending set. No deduplication and no capacity limit.
    #[instrument(level = "trace", skip_all)]
    pub fn register(&self, request: Box<dyn Request<E>>) -> RequestId {
        let id = RequestId::new();
        let pending = {
            let mut requests = self.lock();
            requests.push(Registered { id, request });
            requests.len()
        };

        trace!(request_id = %id, pending, "request registered");
        if pending > self.config.pending_warn_threshold {
            warn!(
                pending,
                threshold = self.config.pending_warn_threshold,
                "pending requests exceed threshold, callers may be leaking requests"
            );
        }
        id
    }

    /// Removes a pending request without resolving it.
    ///
    /// Returns `false` if the request is no longer pending, either because it was already
    /// resolved or because it was never registered here.
    #[instrument(level = "trace", skip(self))]
    pub fn unregister(&self, id: RequestId) -> bool {
        let removed = {
            let mut requests = self.lock();
            let index = requests.iter().position(|registered| registered.id == id);
            index.map(|index| requests.remove(index))
        };

        match removed {
            Some(registered) => {
                trace!(request_id = %id, "request unregistered");
                drop(registered);
                true
            }
            None => false,
        }
    }

    /// Hands `event` to the earliest registered request interested in its kind.
    ///
    /// The matched request is removed from the pending set before it is resolved.
    pub fn dispatch(&self, event: E) -> Dispatched {
        let kind = event.kind();
        let matched = {
            let mut requests = self.lock();
            let index = requests
                .iter()
                .position(|registered| registered.request.responds_to(&kind));
            index.map(|index| requests.remove(index))
        };

        match matched {
            Some(Registered { id, request }) => {
                debug!(request_id = %id, ?kind, "resolving request");
                request.respond(event);
                Dispatched::Resolved(id)
            }
            None => Dispatched::Unmatched,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.lock().iter().any(|registered| registered.id == id)
    }

    /// Ids of all pending requests in registration order.
    pub fn pending_ids(&self) -> Vec<RequestId> {
        self.lock().iter().map(|registered| registered.id).collect()
    }

    /// Drops every pending request. Awaiting callers observe [`RequestError::Dropped`].
    #[instrument(level = "debug", skip(self))]
    pub fn clear(&self) -> usize {
        let drained = std::mem::take(&mut *self.lock());
        let count = drained.len();
        drop(drained);
        debug!(count, "pending requests cleared");
        count
    }

    /// Cancels every pending request in registration order, passing `reason` to each.
    #[instrument(level = "debug", skip(self))]
    pub fn cancel_all(&self, reason: &str) -> Vec<RequestId> {
        let drained = std::mem::take(&mut *self.lock());
        drained
            .into_iter()
            .map(|Registered { id, request }| {
                debug!(request_id = %id, "cancelling request");
                request.cancel(reason);
                id
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Registered<E>>> {
        // Requests are resolved outside the lock, so a poisoned vector is still consistent.
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: Event> Proxy<E> {
    /// Registers an [`EventRequest`] for `events` and returns the caller's handle to it.
    ///
    /// `convert` runs once, on the first matching event, and its result becomes the outcome.
    pub fn request<T, Err, F>(
        self: &Arc<Self>,
        events: impl IntoIterator<Item = E::Kind>,
        convert: F,
    ) -> Pending<T, Err, E>
    where
        T: Send + 'static,
        Err: Send + 'static,
        F: FnOnce(E) -> Result<T, Err> + Send + 'static,
    {
        let (sender, outcome) = channel();
        let request = EventRequest::<E, T, Err, F>::new(events, sender, convert);
        let id = self.register(Box::new(request));
        Pending {
            id,
            outcome,
            proxy: Arc::downgrade(self),
            timeout: self.config.request_timeout,
            settled: false,
        }
    }
}

impl<E: Event> EventSink<E> for Proxy<E> {
    fn notify(&self, event: E) {
        self.dispatch(event);
    }
}

impl<E: Event> fmt::Debug for Proxy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("pending", &self.pending_ids())
            .field("config", &self.config)
            .finish()
    }
}

/// Caller-side handle for a request registered through [`Proxy::request`].
///
/// Dropping the handle before the request settles unregisters it, so abandoned requests do not
/// linger in the proxy.
pub struct Pending<T, Err, E: Event> {
    id: RequestId,
    outcome: Outcome<T, Err>,
    proxy: Weak<Proxy<E>>,
    timeout: Option<Duration>,
    settled: bool,
}

impl<T, Err, E: Event> Pending<T, Err, E> {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Overrides the proxy's configured deadline for this request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Withdraws the request. Returns `false` if it had already been resolved.
    pub fn cancel(mut self) -> bool {
        self.settled = true;
        self.withdraw()
    }

    /// Waits for the outcome, bounded by the deadline if one is set.
    ///
    /// On expiry the request is withdrawn and [`RequestError::Timeout`] returned. If a dispatch
    /// claimed the request in the meantime, its result is returned instead.
    pub async fn wait(mut self) -> Result<T, RequestError<Err>> {
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut self.outcome).await {
                Ok(result) => result,
                Err(_) if self.withdraw() => {
                    debug!(request_id = %self.id, ?limit, "request timed out");
                    Err(RequestError::Timeout(limit))
                }
                Err(_) => (&mut self.outcome).await,
            },
            None => (&mut self.outcome).await,
        };
        self.settled = true;
        result
    }

    fn withdraw(&self) -> bool {
        self.proxy
            .upgrade()
            .is_some_and(|proxy| proxy.unregister(self.id))
    }
}

impl<T, Err, E: Event> Drop for Pending<T, Err, E> {
    fn drop(&mut self) {
        if !self.settled {
            self.withdraw();
        }
    }
}

impl<T, Err, E: Event> fmt::Debug for Pending<T, Err, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("id", &self.id)
            .field("timeout", &self.timeout)
            .field("settled", &self.settled)
            .finish_non_exhaustive()
    }
}
