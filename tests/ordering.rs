use std::sync::Arc;

use ctrlbus::{payload_alphabet, MessageBus, Priority};
use parking_lot::Mutex;

struct SeqMsg {
    seq: u32,
}

payload_alphabet! {
    enum OrderPayload {
        Seq(SeqMsg),
    }
}

#[test]
fn single_producer_fifo_order() {
    let bus = MessageBus::<OrderPayload>::builder()
        .with_queue_depth(2048)
        .build()
        .unwrap();

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let handle = bus.subscribe::<SeqMsg, _>(move |env| {
        let OrderPayload::Seq(msg) = &env.payload;
        sink.lock().push(msg.seq);
    });
    assert!(handle.is_valid());

    for seq in 0..1000u32 {
        assert!(bus.publish(SeqMsg { seq }, 1));
    }

    let mut processed = 0;
    while processed < 1000 {
        let n = bus.process_batch();
        assert!(n > 0, "queue drained early at {processed}");
        processed += n;
    }
    assert_eq!(processed, 1000);

    let received = received.lock();
    assert_eq!(received.len(), 1000);
    assert!(
        received.iter().enumerate().all(|(i, &seq)| seq == i as u32),
        "sequence numbers out of order"
    );

    let stats = bus.statistics();
    assert_eq!(stats.messages_published, 1000);
    assert_eq!(stats.messages_processed, 1000);
    assert_eq!(stats.messages_dropped, 0);
    assert_eq!(bus.queue_depth(), 0);
}

#[test]
fn delivery_order_spans_priorities() {
    // Priority never reorders: a LOW admitted before a HIGH is
    // delivered before it.
    let bus = MessageBus::<OrderPayload>::builder()
        .with_queue_depth(64)
        .build()
        .unwrap();

    assert!(bus.publish_with_priority(SeqMsg { seq: 0 }, 1, Priority::Low));
    assert!(bus.publish_with_priority(SeqMsg { seq: 1 }, 1, Priority::High));
    assert!(bus.publish_with_priority(SeqMsg { seq: 2 }, 1, Priority::Medium));

    let mut order = Vec::new();
    bus.process_batch_with(|payload| {
        let OrderPayload::Seq(msg) = payload;
        order.push(msg.seq);
    });
    assert_eq!(order, vec![0, 1, 2]);
}

#[test]
fn process_batch_on_empty_queue_is_a_noop() {
    let bus = MessageBus::<OrderPayload>::builder()
        .with_queue_depth(64)
        .build()
        .unwrap();
    assert_eq!(bus.process_batch(), 0);
    assert_eq!(bus.queue_depth(), 0);
    assert_eq!(bus.statistics().messages_processed, 0);
}
