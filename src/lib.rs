//! # delegate-proxy: async results from callback-style delegates
//!
//! Many platform APIs report results through a delegate or observer: you start an operation and
//! some time later a callback fires with a success or an error. This crate turns that shape into
//! a request/response one, where a caller registers interest and awaits exactly one outcome.
//!
//! ## Components
//!
//! - [`event`]: the [`Event`](event::Event) trait. Events expose a kind and nothing else to the
//!   proxy.
//! - [`request`]: the [`Request`](request::Request) descriptor, the one-shot
//!   [`Outcome`](request::Outcome) channel and the closure-based
//!   [`EventRequest`](request::EventRequest).
//! - [`proxy`]: the [`Proxy`](proxy::Proxy) registry that matches each incoming event to the
//!   earliest pending request interested in it, detaches that request and resolves it.
//! - [`config`] and [`error`]: configuration and crate-level errors.
//!
//! ## Flow
//!
//! ```text
//! Caller ──request()──▶ Proxy.pending ◀──notify(event)── Delegate adapter
//!   ▲                        │
//!   │                        │ first match, removed, then respond(event)
//!   └──────── Outcome ◀──────┘
//! ```
//!
//! An event that matches no pending request is dropped. Each event resolves at most one
//! request, and each request is resolved at most once.

pub mod config;
pub mod error;
pub mod event;
pub mod proxy;
pub mod request;

// Re-exports
pub use error::*;
pub use event::Event;
pub use proxy::{Dispatched, EventSink, Pending, Proxy, RequestId};
pub use request::{Outcome, OutcomeSender, Request, RequestError};
