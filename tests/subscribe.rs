use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use ctrlbus::{payload_alphabet, MessageBus, MAX_CALLBACKS_PER_TAG};

struct Ping {
    value: u32,
}
struct Pong;

payload_alphabet! {
    enum SubPayload {
        Ping(Ping),
        Pong(Pong),
    }
}

fn sub_bus() -> MessageBus<SubPayload> {
    MessageBus::builder().with_queue_depth(64).build().unwrap()
}

#[test]
fn unsubscribe_stops_delivery_and_is_idempotent() {
    let bus = sub_bus();
    let hits = Arc::new(AtomicU32::new(0));

    let sink = Arc::clone(&hits);
    let handle = bus.subscribe::<Ping, _>(move |_| {
        sink.fetch_add(1, Ordering::Relaxed);
    });
    assert!(handle.is_valid());

    assert!(bus.publish(Ping { value: 1 }, 1));
    bus.process_batch();
    assert_eq!(hits.load(Ordering::Relaxed), 1);

    assert!(bus.unsubscribe(handle));
    assert!(bus.publish(Ping { value: 2 }, 1));
    bus.process_batch();
    assert_eq!(hits.load(Ordering::Relaxed), 1, "unsubscribed handle was invoked");

    // Second unsubscribe finds nothing and changes nothing.
    assert!(!bus.unsubscribe(handle));
}

#[test]
fn handlers_only_see_their_own_tag() {
    let bus = sub_bus();
    let pings = Arc::new(AtomicU32::new(0));
    let pongs = Arc::new(AtomicU32::new(0));

    let sink = Arc::clone(&pings);
    bus.subscribe::<Ping, _>(move |env| {
        let SubPayload::Ping(p) = &env.payload else {
            panic!("wrong payload routed to Ping handler");
        };
        assert!(p.value < 100);
        sink.fetch_add(1, Ordering::Relaxed);
    });
    let sink = Arc::clone(&pongs);
    bus.subscribe::<Pong, _>(move |_| {
        sink.fetch_add(1, Ordering::Relaxed);
    });

    assert!(bus.publish(Ping { value: 1 }, 1));
    assert!(bus.publish(Pong, 1));
    assert!(bus.publish(Ping { value: 2 }, 1));
    bus.process_batch();

    assert_eq!(pings.load(Ordering::Relaxed), 2);
    assert_eq!(pongs.load(Ordering::Relaxed), 1);
}

#[test]
fn every_active_subscriber_is_invoked_once() {
    let bus = sub_bus();
    let hits = Arc::new(AtomicU32::new(0));

    let mut handles = Vec::new();
    for _ in 0..5 {
        let sink = Arc::clone(&hits);
        handles.push(bus.subscribe::<Ping, _>(move |_| {
            sink.fetch_add(1, Ordering::Relaxed);
        }));
    }

    assert!(bus.publish(Ping { value: 1 }, 1));
    bus.process_batch();
    assert_eq!(hits.load(Ordering::Relaxed), 5);

    // Distinct subscriptions get distinct handles.
    for (i, a) in handles.iter().enumerate() {
        for b in &handles[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn full_callback_table_rejects_with_sentinel() {
    let bus = sub_bus();

    let mut handles = Vec::new();
    for _ in 0..MAX_CALLBACKS_PER_TAG {
        let handle = bus.subscribe::<Ping, _>(|_| {});
        assert!(handle.is_valid());
        handles.push(handle);
    }

    let rejected = bus.subscribe::<Ping, _>(|_| {});
    assert!(!rejected.is_valid());
    assert!(!bus.unsubscribe(rejected));

    // Freeing one entry reopens the tag.
    assert!(bus.unsubscribe(handles.pop().unwrap()));
    assert!(bus.subscribe::<Ping, _>(|_| {}).is_valid());
}

#[test]
fn unsubscribing_stale_handles_does_not_mutate_state() {
    let bus = sub_bus();
    let stale = bus.subscribe::<Pong, _>(|_| {});
    assert!(bus.unsubscribe(stale));

    let hits = Arc::new(AtomicU32::new(0));
    let sink = Arc::clone(&hits);
    bus.subscribe::<Ping, _>(move |_| {
        sink.fetch_add(1, Ordering::Relaxed);
    });

    // The stale handle matches nothing and removes nothing.
    assert!(!bus.unsubscribe(stale));
    assert!(bus.publish(Ping { value: 1 }, 1));
    bus.process_batch();
    assert_eq!(hits.load(Ordering::Relaxed), 1);
}

#[test]
fn subscribe_during_operation_sees_only_later_messages() {
    let bus = sub_bus();
    assert!(bus.publish(Ping { value: 1 }, 1));
    bus.process_batch();

    let hits = Arc::new(AtomicU32::new(0));
    let sink = Arc::clone(&hits);
    bus.subscribe::<Ping, _>(move |_| {
        sink.fetch_add(1, Ordering::Relaxed);
    });
    assert!(bus.publish(Ping { value: 2 }, 1));
    bus.process_batch();
    assert_eq!(hits.load(Ordering::Relaxed), 1);
}
