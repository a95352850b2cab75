use std::sync::Arc;

use ctrlbus::{payload_alphabet, MessageBus};

struct Frame {
    raw_data: Arc<Vec<u8>>,
}

payload_alphabet! {
    enum FramePayload {
        Frame(Frame),
    }
}

fn frame_bus() -> MessageBus<FramePayload> {
    MessageBus::builder().with_queue_depth(16).build().unwrap()
}

#[test]
fn consumed_envelopes_release_their_payload() {
    let bus = frame_bus();
    let buffer = Arc::new(vec![0u8; 4096]);

    assert!(bus.publish(
        Frame {
            raw_data: Arc::clone(&buffer)
        },
        1
    ));
    assert_eq!(Arc::strong_count(&buffer), 2);

    let mut seen_len = 0;
    bus.process_batch_with(|payload| {
        let FramePayload::Frame(frame) = payload;
        seen_len = frame.raw_data.len();
    });
    assert_eq!(seen_len, 4096);
    // The envelope was dropped when its slot was released.
    assert_eq!(Arc::strong_count(&buffer), 1);
}

#[test]
fn dropping_the_bus_releases_unconsumed_envelopes() {
    let bus = frame_bus();
    let buffer = Arc::new(vec![0u8; 64]);

    for _ in 0..5 {
        assert!(bus.publish(
            Frame {
                raw_data: Arc::clone(&buffer)
            },
            1
        ));
    }
    assert_eq!(Arc::strong_count(&buffer), 6);

    drop(bus);
    assert_eq!(Arc::strong_count(&buffer), 1);
}

#[test]
fn rejected_publishes_drop_the_payload_immediately() {
    let bus = frame_bus();
    let buffer = Arc::new(vec![0u8; 64]);

    bus.set_performance_mode(ctrlbus::PerformanceMode::BareMetal);
    for _ in 0..16 {
        assert!(bus.publish(
            Frame {
                raw_data: Arc::clone(&buffer)
            },
            1
        ));
    }
    // Ring full: the rejected payload must not leak.
    assert!(!bus.publish(
        Frame {
            raw_data: Arc::clone(&buffer)
        },
        1
    ));
    assert_eq!(Arc::strong_count(&buffer), 17);
}

#[test]
fn handler_capture_lifetimes_follow_subscription() {
    let bus = frame_bus();
    let captured = Arc::new(());
    let probe = Arc::clone(&captured);
    let handle = bus.subscribe::<Frame, _>(move |_| {
        let _ = &probe;
    });
    assert_eq!(Arc::strong_count(&captured), 2);

    assert!(bus.unsubscribe(handle));
    assert_eq!(Arc::strong_count(&captured), 1);
}
