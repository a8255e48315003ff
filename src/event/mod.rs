//! # Events
//!
//! An event is a discrete notification pushed into a [`Proxy`](crate::proxy::Proxy) by an
//! external source, typically an adapter sitting on a delegate or observer callback.
//!
//! The proxy never looks inside an event. All it needs is the event's *kind*, a nominal tag
//! used to find the request that is waiting for it:
//!
//! ```text
//! ┌────────────┐  notify(event)  ┌───────┐  respond(event)  ┌─────────┐
//! │ Delegate   │────────────────▶│ Proxy │─────────────────▶│ Request │
//! │ adapter    │                 └───────┘                  └────┬────┘
//! └────────────┘                                                 │ Outcome
//!                                                                ▼
//!                                                           ┌─────────┐
//!                                                           │ Caller  │
//!                                                           └─────────┘
//! ```
//!
//! Kinds are usually a fieldless enum living next to the event type:
//!
//! ```rust
//! use delegate_proxy::event::Event;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum SensorKind {
//!     Reading,
//!     Fault,
//! }
//!
//! #[derive(Debug)]
//! enum SensorEvent {
//!     Reading(f64),
//!     Fault(String),
//! }
//!
//! impl Event for SensorEvent {
//!     type Kind = SensorKind;
//!
//!     fn kind(&self) -> SensorKind {
//!         match self {
//!             SensorEvent::Reading(_) => SensorKind::Reading,
//!             SensorEvent::Fault(_) => SensorKind::Fault,
//!         }
//!     }
//! }
//! ```

use std::fmt;

/// A notification that can be matched against pending requests.
///
/// The payload is opaque to the proxy; only [`Event::kind`] is consulted during dispatch.
pub trait Event: Send + 'static {
    /// Tag identifying the category of the notification.
    type Kind: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}
