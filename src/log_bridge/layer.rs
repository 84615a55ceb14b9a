//! `tracing` layer forwarding events to the connector manager console.
//!
//! Span names become groups and span fields become attributes of that
//! group; event fields are inline attributes and the `message` field is the
//! record message. Events from this crate and from the HTTP stack are never
//! forwarded, since forwarding itself produces them.
//!
//! Records go through a bounded queue drained by a single forwarding task,
//! started on the first event seen inside a tokio runtime. When the queue is
//! full the record is dropped and counted.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::span;
use tokio::sync::mpsc;
use tracing::{warn, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::attr::Attr;
use super::handler::{LogHandler, Record};
use super::level::Level;

const SKIPPED_TARGETS: &[&str] = &["connector_sdk", "reqwest", "hyper", "h2"];
const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// A record with the handler (groups and span attributes) it was emitted under.
type Pending = (LogHandler, Record);

pub struct ConsoleLayer {
    handler: LogHandler,
    skipped: Vec<&'static str>,
    capacity: usize,
    queue: OnceLock<mpsc::Sender<Pending>>,
    dropped: Arc<AtomicU64>,
}

impl ConsoleLayer {
    pub fn new(handler: LogHandler) -> Self {
        Self {
            handler,
            skipped: SKIPPED_TARGETS.to_vec(),
            capacity: DEFAULT_QUEUE_CAPACITY,
            queue: OnceLock::new(),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of records allowed to wait for forwarding (at least one).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Counter of records dropped because the queue was full or the
    /// forwarding task was gone.
    pub fn dropped(&self) -> Arc<AtomicU64> {
        self.dropped.clone()
    }

    /// Also skips events whose target is `prefix` or one of its submodules.
    pub fn skip_target(mut self, prefix: &'static str) -> Self {
        self.skipped.push(prefix);
        self
    }

    fn is_skipped(&self, target: &str) -> bool {
        self.skipped.iter().any(|prefix| {
            target == *prefix
                || target
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with("::"))
        })
    }

    /// The queue sender, starting the forwarding task on first use.
    fn queue(&self) -> Option<&mpsc::Sender<Pending>> {
        if let Some(queue) = self.queue.get() {
            return Some(queue);
        }
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        Some(self.queue.get_or_init(|| {
            let (tx, rx) = mpsc::channel(self.capacity);
            runtime.spawn(forward(rx));
            tx
        }))
    }

    fn enqueue(&self, queue: &mpsc::Sender<Pending>, pending: Pending) {
        if queue.try_send(pending).is_err() && self.dropped.fetch_add(1, Ordering::Relaxed) == 0 {
            warn!("console log queue is full, dropping records");
        }
    }
}

async fn forward(mut rx: mpsc::Receiver<Pending>) {
    while let Some((handler, record)) = rx.recv().await {
        if let Err(e) = handler.handle(record).await {
            warn!(error = %e, "failed to forward console log");
        }
    }
}

/// Fields recorded on a span, stored in its extensions.
struct SpanAttrs(Vec<Attr>);

#[derive(Default)]
struct AttrVisitor {
    message: Option<String>,
    attrs: Vec<Attr>,
}

impl AttrVisitor {
    fn push(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.attrs.push(Attr::new(field.name(), value));
        }
    }
}

impl Visit for AttrVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, Value::from(format!("{:?}", value)));
    }
}

impl<S> Layer<S> for ConsoleLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let mut visitor = AttrVisitor::default();
        attrs.record(&mut visitor);
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(SpanAttrs(visitor.attrs));
        }
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = AttrVisitor::default();
        values.record(&mut visitor);
        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<SpanAttrs>() {
            Some(SpanAttrs(attrs)) => attrs.extend(visitor.attrs),
            None => extensions.insert(SpanAttrs(visitor.attrs)),
        }
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if self.is_skipped(metadata.target()) {
            return;
        }
        let level = Level::from(*metadata.level());
        if !self.handler.enabled(level) {
            return;
        }
        let Some(queue) = self.queue() else {
            return;
        };

        let mut handler = self.handler.clone();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                handler = handler.with_group(span.name());
                if let Some(SpanAttrs(attrs)) = span.extensions().get::<SpanAttrs>() {
                    handler = handler.with_attrs(attrs.iter().cloned());
                }
            }
        }

        let mut visitor = AttrVisitor::default();
        event.record(&mut visitor);
        let record = Record {
            level,
            message: visitor.message.unwrap_or_default(),
            time: Utc::now(),
            attrs: visitor.attrs,
        };

        self.enqueue(queue, (handler, record));
    }
}
