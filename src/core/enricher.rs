//! Enrichment sources applied to every entry of a logger

use super::log_context::FieldValue;
use super::log_entry::LogEntry;
use std::sync::Arc;

/// Backend enrichment capability.
///
/// Enrichers run on whichever thread performs the physical write, after the
/// scope and static tags have been merged. They should only add properties
/// that are still absent.
pub trait Enricher: Send + Sync {
    fn enrich(&self, entry: &mut LogEntry);
}

/// A callback producing one name/value tag.
///
/// Property sources are evaluated on the caller's thread each time a record
/// is scheduled.
pub type PropertySource = Arc<dyn Fn() -> (String, FieldValue) + Send + Sync>;

/// Wrap a closure as a [`PropertySource`].
pub fn property_source<F, V>(name: impl Into<String>, produce: F) -> PropertySource
where
    F: Fn() -> V + Send + Sync + 'static,
    V: Into<FieldValue>,
{
    let name = name.into();
    Arc::new(move || (name.clone(), produce().into()))
}

/// Enricher adding a fixed property when the entry does not carry it yet.
pub struct PropertyEnricher {
    name: String,
    value: FieldValue,
}

impl PropertyEnricher {
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Enricher for PropertyEnricher {
    fn enrich(&self, entry: &mut LogEntry) {
        entry
            .properties
            .add_field_if_absent(self.name.clone(), self.value.clone());
    }
}

/// Enricher adding the writing thread's name as `ThreadName`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadNameEnricher;

impl Enricher for ThreadNameEnricher {
    fn enrich(&self, entry: &mut LogEntry) {
        let name = entry
            .thread_name
            .clone()
            .unwrap_or_else(|| entry.thread_id.clone());
        entry.properties.add_field_if_absent("ThreadName", name);
    }
}
