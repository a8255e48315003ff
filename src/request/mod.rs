//! # Requests
//!
//! A request descriptor declares which event kinds it is waiting for and how to turn a
//! matching event into the final value the caller is awaiting.
//!
//! Most callers never implement [`Request`] themselves: [`EventRequest`] covers the common
//! case of "convert the event with a closure and write the result into an [`Outcome`]", and
//! [`Proxy::request`](crate::proxy::Proxy::request) wires it up in one call. Implement the trait
//! directly when a descriptor needs custom matching or resolution.

pub mod event_request;
pub mod outcome;

pub use event_request::EventRequest;
pub use outcome::{channel, Outcome, OutcomeSender, RequestError};

use crate::event::Event;

/// Capability interface held by the proxy for every outstanding request.
///
/// `respond` and `cancel` consume the boxed descriptor, so a descriptor can produce at most
/// one terminal outcome.
pub trait Request<E: Event>: Send {
    /// Kinds this request accepts. Order is irrelevant and duplicates are harmless.
    fn events(&self) -> &[E::Kind];

    fn responds_to(&self, kind: &E::Kind) -> bool {
        self.events().contains(kind)
    }

    /// Resolves the request from a matching event.
    ///
    /// Only called by the proxy with an event for which [`Request::responds_to`] returned
    /// `true`, and only after the request has been detached from the pending set.
    fn respond(self: Box<Self>, event: E);

    /// Terminates the request without an event. Dropping the descriptor is the default, which
    /// the awaiting side observes as [`RequestError::Dropped`].
    fn cancel(self: Box<Self>, _reason: &str) {}
}
