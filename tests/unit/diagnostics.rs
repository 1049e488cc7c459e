use super::*;

fn capture(f: impl FnOnce()) -> Arc<MemorySink> {
    let sink = Arc::new(MemorySink::new(16));
    let subscriber =
        tracing_subscriber::registry().with(SinkLayer::default().with_sink(sink.clone()));
    tracing::subscriber::with_default(subscriber, f);
    sink
}

#[test]
fn events_reach_injected_sink_with_fields() {
    let sink = capture(|| {
        tracing::info!(slot = "face3", count = 2, "project saved");
    });
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, Level::INFO);
    assert_eq!(records[0].message, "project saved slot=face3 count=2");
}

#[test]
fn memory_sink_is_bounded() {
    let sink = Arc::new(MemorySink::new(2));
    let subscriber =
        tracing_subscriber::registry().with(SinkLayer::new(vec![sink.clone() as Arc<dyn LogSink>]));
    tracing::subscriber::with_default(subscriber, || {
        for i in 0..5 {
            tracing::warn!("event {i}");
        }
    });
    let msgs: Vec<String> = sink.drain().into_iter().map(|r| r.message).collect();
    assert_eq!(msgs, vec!["event 3", "event 4"]);
    assert!(sink.is_empty());
}

#[test]
fn second_init_is_a_noop() {
    let first = init("warn", Vec::new());
    assert!(!init("debug", Vec::new()));
    let _ = first;
}
