//! # Outcome channel
//!
//! A single-assignment success/failure handle linking a request descriptor to the caller
//! awaiting it. The write side ([`OutcomeSender`]) is consumed by every resolving method, so a
//! descriptor cannot write twice. The read side ([`Outcome`]) is a `Future`.
//!
//! Built on Tokio's oneshot channel: the sender lives inside the descriptor held by the proxy,
//! the receiver stays with the caller.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use futures::FutureExt;
use thiserror::Error;
use tokio::sync::oneshot;

enum Resolution<T, E> {
    Settled(Result<T, E>),
    Cancelled(String),
}

/// Creates a linked sender/receiver pair for a single request.
pub fn channel<T, E>() -> (OutcomeSender<T, E>, Outcome<T, E>) {
    let (tx, rx) = oneshot::channel();
    (OutcomeSender { tx }, Outcome { rx })
}

/// Write-once side of the outcome channel.
pub struct OutcomeSender<T, E> {
    tx: oneshot::Sender<Resolution<T, E>>,
}

impl<T, E> OutcomeSender<T, E> {
    /// Writes the terminal result.
    ///
    /// Returns `false` if the awaiting side has already gone away, in which case the result
    /// is discarded.
    pub fn resolve(self, result: Result<T, E>) -> bool {
        self.tx.send(Resolution::Settled(result)).is_ok()
    }

    pub fn succeed(self, value: T) -> bool {
        self.resolve(Ok(value))
    }

    pub fn fail(self, error: E) -> bool {
        self.resolve(Err(error))
    }

    /// Terminates the request without a value, surfacing [`RequestError::Cancelled`].
    pub fn cancel(self, reason: impl Into<String>) -> bool {
        self.tx.send(Resolution::Cancelled(reason.into())).is_ok()
    }

    /// Whether the awaiting side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Awaitable side of the outcome channel.
///
/// Resolves once the linked [`OutcomeSender`] writes, or with [`RequestError::Dropped`] when
/// the sender is discarded without writing (for example after [`Proxy::clear`]).
///
/// [`Proxy::clear`]: crate::proxy::Proxy::clear
pub struct Outcome<T, E> {
    rx: oneshot::Receiver<Resolution<T, E>>,
}

impl<T, E> Outcome<T, E> {
    /// Non-blocking check. `None` while the request is still pending.
    pub fn try_take(&mut self) -> Option<Result<T, RequestError<E>>> {
        match self.rx.try_recv() {
            Ok(resolution) => Some(resolution.into_result()),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(RequestError::Dropped)),
        }
    }
}

impl<T, E> Future for Outcome<T, E> {
    type Output = Result<T, RequestError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.rx.poll_unpin(cx).map(|received| match received {
            Ok(resolution) => resolution.into_result(),
            Err(_) => Err(RequestError::Dropped),
        })
    }
}

impl<T, E> Resolution<T, E> {
    fn into_result(self) -> Result<T, RequestError<E>> {
        match self {
            Resolution::Settled(Ok(value)) => Ok(value),
            Resolution::Settled(Err(error)) => Err(RequestError::Failed(error)),
            Resolution::Cancelled(reason) => Err(RequestError::Cancelled(reason)),
        }
    }
}

/// Why a request produced no value.
///
/// `E` is the caller-defined failure carried by the event itself; the other variants describe
/// what happened to the request around it.
#[derive(Debug, Error, PartialEq)]
pub enum RequestError<E> {
    #[error("Request failed: {0}")]
    Failed(E),
    #[error("Request cancelled: {0}")]
    Cancelled(String),
    #[error("Request dropped before it was resolved")]
    Dropped,
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl<E> RequestError<E> {
    pub fn is_failure(&self) -> bool {
        matches!(self, RequestError::Failed(_))
    }

    /// The domain failure, if this error carries one.
    pub fn into_failure(self) -> Option<E> {
        match self {
            RequestError::Failed(error) => Some(error),
            _ => None,
        }
    }
}
