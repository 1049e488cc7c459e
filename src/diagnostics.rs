//! Logging setup: `tracing` events fan out to a formatter on stderr and to any number of
//! injected [`LogSink`]s (a UI log panel, a test buffer).

use std::{collections::VecDeque, fmt::Write as _, sync::Arc};

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tracing::{Event, Level, Subscriber, field::Field};
use tracing_subscriber::{EnvFilter, Layer, layer::Context, prelude::*};

/// One formatted log event.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    /// Local time the event was seen.
    pub timestamp: DateTime<Local>,
    /// Event severity.
    pub level: Level,
    /// Module path of the emitting code.
    pub target: String,
    /// Message followed by ` key=value` pairs for the other fields.
    pub message: String,
}

/// Receiver of formatted log records.
pub trait LogSink: Send + Sync {
    /// Called once per event; must not block for long.
    fn record(&self, record: &LogRecord);
}

/// Keeps the most recent `capacity` records.
#[derive(Debug)]
pub struct MemorySink {
    records: Mutex<VecDeque<LogRecord>>,
    capacity: usize,
}

impl MemorySink {
    /// Sink holding at most `capacity` records (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Snapshot of the buffered records, oldest first.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().iter().cloned().collect()
    }

    /// Take every buffered record, leaving the sink empty.
    pub fn drain(&self) -> Vec<LogRecord> {
        self.records.lock().drain(..).collect()
    }

    /// Number of buffered records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for MemorySink {
    fn record(&self, record: &LogRecord) {
        let mut q = self.records.lock();
        q.push_back(record.clone());
        while q.len() > self.capacity {
            q.pop_front();
        }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

/// `tracing_subscriber` layer forwarding every event to the registered sinks.
#[derive(Clone, Default)]
pub struct SinkLayer {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl SinkLayer {
    /// Layer forwarding to `sinks`.
    pub fn new(sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self { sinks }
    }

    /// Add one more sink.
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl<S: Subscriber> Layer<S> for SinkLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if self.sinks.is_empty() {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let meta = event.metadata();
        let record = LogRecord {
            timestamp: Local::now(),
            level: *meta.level(),
            target: meta.target().to_owned(),
            message: visitor.message + &visitor.fields,
        };
        for sink in &self.sinks {
            sink.record(&record);
        }
    }
}

/// Install the global subscriber. `filter` is used when `RUST_LOG` is unset.
///
/// Returns `false` if a subscriber was already installed (by an earlier call or the host).
pub fn init(filter: &str, sinks: Vec<Arc<dyn LogSink>>) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(SinkLayer::new(sinks))
        .try_init()
        .is_ok()
}

#[cfg(test)]
#[path = "../tests/unit/diagnostics.rs"]
mod tests;
