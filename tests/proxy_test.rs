use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use delegate_proxy::{
    request::{channel, EventRequest},
    Dispatched, Event, EventSink, Proxy, Request, RequestError, RequestId,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    // テストの前に一度だけ実行したい処理
    // tracing_subscriberの初期化
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    A,
    B,
    C,
}

#[derive(Debug, Clone)]
struct Signal {
    kind: Kind,
    seq: usize,
}

impl Event for Signal {
    type Kind = Kind;

    fn kind(&self) -> Kind {
        self.kind
    }
}

/// Counts how many times it was resolved.
struct Counting {
    events: Vec<Kind>,
    calls: Arc<AtomicUsize>,
}

impl Request<Signal> for Counting {
    fn events(&self) -> &[Kind] {
        &self.events
    }

    fn respond(self: Box<Self>, _event: Signal) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn counting(events: &[Kind]) -> (Box<dyn Request<Signal>>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let request = Box::new(Counting {
        events: events.to_vec(),
        calls: calls.clone(),
    });
    (request, calls)
}

#[tokio::test]
async fn test_distinct_kinds_resolve_in_arrival_order() {
    let proxy = Arc::new(Proxy::<Signal>::new());
    let d1 = proxy.request([Kind::A], |s: Signal| Ok::<_, ()>(("d1", s.seq)));
    let d2 = proxy.request([Kind::B], |s: Signal| Ok::<_, ()>(("d2", s.seq)));
    let d3 = proxy.request([Kind::C], |s: Signal| Ok::<_, ()>(("d3", s.seq)));

    // Arrival order differs from registration order.
    proxy.notify(Signal { kind: Kind::C, seq: 1 });
    proxy.notify(Signal { kind: Kind::A, seq: 2 });
    proxy.notify(Signal { kind: Kind::B, seq: 3 });

    assert_eq!(d1.wait().await, Ok(("d1", 2)));
    assert_eq!(d2.wait().await, Ok(("d2", 3)));
    assert_eq!(d3.wait().await, Ok(("d3", 1)));
    assert!(proxy.is_empty());
}

#[tokio::test]
async fn test_custom_descriptor_with_event_request_side_by_side() {
    let proxy = Arc::new(Proxy::<Signal>::new());
    let (custom, calls) = counting(&[Kind::A]);
    let custom_id = proxy.register(custom);

    let (sender, outcome) = channel::<usize, String>();
    let stock_id = proxy.register(Box::new(EventRequest::<Signal, _, _, _>::new(
        [Kind::A],
        sender,
        |s: Signal| Ok(s.seq),
    )));

    assert_eq!(
        proxy.dispatch(Signal { kind: Kind::A, seq: 1 }),
        Dispatched::Resolved(custom_id)
    );
    assert_eq!(
        proxy.dispatch(Signal { kind: Kind::A, seq: 2 }),
        Dispatched::Resolved(stock_id)
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.await, Ok(2));
}

#[tokio::test]
async fn test_unregistered_request_is_dropped() {
    let proxy = Proxy::<Signal>::new();
    let (sender, outcome) = channel::<usize, String>();
    let id = proxy.register(Box::new(EventRequest::<Signal, _, _, _>::new(
        [Kind::B],
        sender,
        |s: Signal| Ok(s.seq),
    )));

    assert!(proxy.unregister(id));
    assert_eq!(outcome.await, Err(RequestError::Dropped));
    assert_eq!(
        proxy.dispatch(Signal { kind: Kind::B, seq: 1 }),
        Dispatched::Unmatched
    );
}

#[tokio::test]
async fn test_resolution_from_another_task() {
    let proxy = Arc::new(Proxy::<Signal>::new());
    let pending = proxy.request([Kind::B], |s: Signal| {
        if s.seq > 0 {
            Ok(s.seq)
        } else {
            Err("empty".to_string())
        }
    });

    let sink: Arc<dyn EventSink<Signal>> = proxy.clone();
    let producer = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        sink.notify(Signal { kind: Kind::A, seq: 1 });
        sink.notify(Signal { kind: Kind::B, seq: 7 });
    });

    assert_eq!(pending.wait().await, Ok(7));
    producer.await.unwrap();
}

#[test]
fn test_concurrent_dispatch_resolves_each_request_once() {
    const REQUESTS: usize = 64;
    const THREADS: usize = 8;
    const EVENTS_PER_THREAD: usize = 16;

    let proxy = Arc::new(Proxy::<Signal>::new());
    let counters: Vec<_> = (0..REQUESTS)
        .map(|_| {
            let (request, calls) = counting(&[Kind::A, Kind::B]);
            proxy.register(request);
            calls
        })
        .collect();

    let resolved = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let proxy = proxy.clone();
            let resolved = resolved.clone();
            std::thread::spawn(move || {
                for seq in 0..EVENTS_PER_THREAD {
                    let kind = if (t + seq) % 2 == 0 { Kind::A } else { Kind::B };
                    if proxy.dispatch(Signal { kind, seq }).is_resolved() {
                        resolved.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(resolved.load(Ordering::SeqCst), REQUESTS);
    assert!(counters
        .iter()
        .all(|calls| calls.load(Ordering::SeqCst) == 1));
    assert!(proxy.is_empty());
}

#[derive(Debug, Clone)]
enum Op {
    Register(Vec<Kind>),
    Dispatch(Kind),
    Unregister(usize),
}

fn kind_strategy() -> impl Strategy<Value = Kind> {
    prop_oneof![Just(Kind::A), Just(Kind::B), Just(Kind::C)]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop::collection::vec(kind_strategy(), 1..4).prop_map(Op::Register),
        kind_strategy().prop_map(Op::Dispatch),
        (0usize..16).prop_map(Op::Unregister),
    ]
}

proptest! {
    /// Compares the proxy against a plain ordered list model.
    #[test]
    fn prop_first_match_and_at_most_once(ops in prop::collection::vec(op_strategy(), 0..64)) {
        let proxy = Proxy::<Signal>::new();
        let mut model: Vec<(RequestId, Vec<Kind>)> = Vec::new();
        let mut registered: Vec<RequestId> = Vec::new();
        let mut calls: HashMap<RequestId, Arc<AtomicUsize>> = HashMap::new();

        for (seq, op) in ops.into_iter().enumerate() {
            match op {
                Op::Register(kinds) => {
                    let (request, counter) = counting(&kinds);
                    let id = proxy.register(request);
                    model.push((id, kinds));
                    registered.push(id);
                    calls.insert(id, counter);
                }
                Op::Dispatch(kind) => {
                    let expected = model
                        .iter()
                        .position(|(_, kinds)| kinds.contains(&kind))
                        .map(|index| model.remove(index).0);
                    let actual = proxy.dispatch(Signal { kind, seq });
                    match expected {
                        Some(id) => prop_assert_eq!(actual, Dispatched::Resolved(id)),
                        None => prop_assert_eq!(actual, Dispatched::Unmatched),
                    }
                }
                Op::Unregister(index) => {
                    if let Some(&id) = registered.get(index) {
                        let expected = model.iter().position(|(pending, _)| *pending == id);
                        if let Some(position) = expected {
                            model.remove(position);
                        }
                        prop_assert_eq!(proxy.unregister(id), expected.is_some());
                    }
                }
            }

            let model_ids: Vec<RequestId> = model.iter().map(|(id, _)| *id).collect();
            prop_assert_eq!(proxy.pending_ids(), model_ids);
        }

        for counter in calls.values() {
            prop_assert!(counter.load(Ordering::SeqCst) <= 1);
        }
    }
}
