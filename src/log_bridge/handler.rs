use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

use super::attr::Attr;
use super::chain::Chain;
use super::level::{Level, LevelVar};
use crate::error::{Error, Result};
use crate::event::LogEvent;
use crate::notifier::Notifier;

const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(15);

/// A single log call: level, message, timestamp and inline attributes.
#[derive(Clone, Debug)]
pub struct Record {
    pub level: Level,
    pub message: String,
    pub time: DateTime<Utc>,
    pub attrs: Vec<Attr>,
}

impl Record {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            time: Utc::now(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attrs(mut self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        self.attrs.extend(attrs);
        self
    }
}

/// An attribute remembered by a handler, with the group path that was open
/// when it was added.
#[derive(Clone)]
struct PersistedAttr {
    attr: Attr,
    groups: Chain<Arc<str>>,
}

/// Turns log records into `log` events pushed through a [`Notifier`].
///
/// Handlers are immutable values: [`with_attrs`](Self::with_attrs) and
/// [`with_group`](Self::with_group) return derived handlers that share their
/// parent's state and never alias each other.
#[derive(Clone)]
pub struct LogHandler {
    notifier: Arc<dyn Notifier>,
    level: LevelVar,
    timeout: Duration,
    attributes: Chain<PersistedAttr>,
    groups: Chain<Arc<str>>,
}

impl LogHandler {
    pub fn new(notifier: Arc<dyn Notifier>, level: LevelVar) -> Self {
        Self {
            notifier,
            level,
            timeout: DEFAULT_NOTIFY_TIMEOUT,
            attributes: Chain::default(),
            groups: Chain::default(),
        }
    }

    /// Bound on a single event notification.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level.level()
    }

    /// Derives a handler that adds `attrs` to every record, under the current
    /// group path.
    pub fn with_attrs(&self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        let mut derived = self.clone();
        for attr in attrs {
            derived.attributes = derived.attributes.push(PersistedAttr {
                attr,
                groups: self.groups.clone(),
            });
        }
        derived
    }

    /// Derives a handler whose subsequent attributes nest under `name`.
    pub fn with_group(&self, name: &str) -> Self {
        if name.is_empty() {
            return self.clone();
        }
        let mut derived = self.clone();
        derived.groups = self.groups.push(Arc::from(name));
        derived
    }

    /// Builds the event for `record` without sending it.
    pub fn event(&self, record: &Record) -> LogEvent {
        LogEvent {
            level: record.level.as_str().to_string(),
            message: record.message.clone(),
            time: record.time.timestamp(),
            attributes: self.attributes(&record.attrs),
        }
    }

    /// Sends `record` to the manager. Callers check [`enabled`](Self::enabled) first.
    pub async fn handle(&self, record: Record) -> Result<()> {
        let event = self.event(&record);
        match tokio::time::timeout(self.timeout, self.notifier.notify(event.into())).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.timeout)),
        }
    }

    /// Persisted attributes at their own group path, then inline attributes
    /// at the current one. Later writes to the same path win.
    fn attributes(&self, inline: &[Attr]) -> Map<String, Value> {
        let mut root = Map::new();
        for persisted in self.attributes.to_vec() {
            insert_attr(&mut root, &persisted.groups.to_vec(), &persisted.attr);
        }
        let current = self.groups.to_vec();
        for attr in inline {
            insert_attr(&mut root, &current, attr);
        }
        root
    }
}

fn insert_attr(root: &mut Map<String, Value>, groups: &[&Arc<str>], attr: &Attr) {
    let mut current = root;
    for group in groups {
        let entry = current
            .entry(group.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = match entry.as_object_mut() {
            Some(map) => map,
            None => return,
        };
    }
    current.insert(attr.key.clone(), attr.value.clone());
}
