use std::{fmt, marker::PhantomData};

use crate::event::Event;

use super::{outcome::OutcomeSender, Request};

/// Request descriptor driven by a conversion closure.
///
/// On a match the closure turns the event into `Ok(value)` or `Err(failure)`, and the result
/// is written to the bound [`OutcomeSender`].
///
/// ```rust
/// use delegate_proxy::event::Event;
/// use delegate_proxy::request::{channel, EventRequest};
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Kind { Fix, Failure }
///
/// enum LocationEvent { Fix(f64, f64), Failure(String) }
///
/// impl Event for LocationEvent {
///     type Kind = Kind;
///     fn kind(&self) -> Kind {
///         match self {
///             LocationEvent::Fix(..) => Kind::Fix,
///             LocationEvent::Failure(_) => Kind::Failure,
///         }
///     }
/// }
///
/// let (sender, outcome) = channel::<(f64, f64), String>();
/// let request = EventRequest::new(
///     [Kind::Fix, Kind::Failure],
///     sender,
///     |event: LocationEvent| match event {
///         LocationEvent::Fix(lat, lon) => Ok((lat, lon)),
///         LocationEvent::Failure(reason) => Err(reason),
///     },
/// );
/// # drop((request, outcome));
/// ```
pub struct EventRequest<E: Event, T, Err, F> {
    events: Vec<E::Kind>,
    sender: OutcomeSender<T, Err>,
    convert: F,
    _event: PhantomData<fn(E)>,
}

impl<E, T, Err, F> EventRequest<E, T, Err, F>
where
    E: Event,
    F: FnOnce(E) -> Result<T, Err>,
{
    pub fn new(
        events: impl IntoIterator<Item = E::Kind>,
        sender: OutcomeSender<T, Err>,
        convert: F,
    ) -> Self {
        Self {
            events: events.into_iter().collect(),
            sender,
            convert,
            _event: PhantomData,
        }
    }
}

impl<E, T, Err, F> Request<E> for EventRequest<E, T, Err, F>
where
    E: Event,
    T: Send,
    Err: Send,
    F: FnOnce(E) -> Result<T, Err> + Send,
{
    fn events(&self) -> &[E::Kind] {
        &self.events
    }

    fn respond(self: Box<Self>, event: E) {
        debug_assert!(
            self.responds_to(&event.kind()),
            "responded with {:?}, expected one of {:?}",
            event.kind(),
            self.events
        );
        let Self {
            sender, convert, ..
        } = *self;
        sender.resolve(convert(event));
    }

    fn cancel(self: Box<Self>, reason: &str) {
        self.sender.cancel(reason);
    }
}

impl<E: Event, T, Err, F> fmt::Debug for EventRequest<E, T, Err, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRequest")
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{channel, RequestError};

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Kind {
        Value,
        Failure,
        Other,
    }

    #[derive(Debug)]
    enum TestEvent {
        Value(i64),
        Failure(String),
        Other,
    }

    impl Event for TestEvent {
        type Kind = Kind;

        fn kind(&self) -> Kind {
            match self {
                TestEvent::Value(_) => Kind::Value,
                TestEvent::Failure(_) => Kind::Failure,
                TestEvent::Other => Kind::Other,
            }
        }
    }

    fn convert(event: TestEvent) -> Result<i64, String> {
        match event {
            TestEvent::Value(v) => Ok(v),
            TestEvent::Failure(message) => Err(message),
            TestEvent::Other => Err("unexpected".to_string()),
        }
    }

    #[test]
    fn test_responds_to() {
        let (tx, _rx) = channel();
        let request = EventRequest::<TestEvent, _, _, _>::new(
            [Kind::Value, Kind::Failure, Kind::Value],
            tx,
            convert,
        );

        assert!(request.responds_to(&Kind::Value));
        assert!(request.responds_to(&Kind::Failure));
        assert!(!request.responds_to(&Kind::Other));
        // pure
        assert!(request.responds_to(&Kind::Value));
    }

    #[tokio::test]
    async fn test_respond_success() {
        let (tx, rx) = channel();
        let request: Box<dyn Request<TestEvent>> =
            Box::new(EventRequest::<TestEvent, _, _, _>::new([Kind::Value], tx, convert));

        request.respond(TestEvent::Value(42));
        assert_eq!(rx.await, Ok(42));
    }

    #[tokio::test]
    async fn test_respond_failure() {
        let (tx, rx) = channel();
        let request: Box<dyn Request<TestEvent>> = Box::new(EventRequest::<TestEvent, _, _, _>::new(
            [Kind::Value, Kind::Failure],
            tx,
            convert,
        ));

        request.respond(TestEvent::Failure("denied".to_string()));
        assert_eq!(rx.await, Err(RequestError::Failed("denied".to_string())));
    }

    #[tokio::test]
    async fn test_cancel() {
        let (tx, rx) = channel();
        let request: Box<dyn Request<TestEvent>> =
            Box::new(EventRequest::<TestEvent, _, _, _>::new([Kind::Value], tx, convert));

        request.cancel("shutting down");
        assert_eq!(
            rx.await,
            Err(RequestError::Cancelled("shutting down".to_string()))
        );
    }

    #[test]
    #[should_panic(expected = "responded with Other")]
    #[cfg(debug_assertions)]
    fn test_respond_to_unrelated_kind_panics_in_debug() {
        let (tx, _rx) = channel();
        let request: Box<dyn Request<TestEvent>> =
            Box::new(EventRequest::<TestEvent, _, _, _>::new([Kind::Value], tx, convert));
        request.respond(TestEvent::Other);
    }
}
