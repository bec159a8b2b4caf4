//! Opt-in diagnostic records for SDK users.
//!
//! Unlike library logging (which goes through the `log` crate), debug records are addressed to the
//! application developer: they are enabled per [`DebugCategory`] and delivered to a user-provided
//! [`DebugSink`]. Messages are built lazily, so a disabled category costs nothing.
use std::{
    collections::HashSet,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

/// Label used for ad query records.
pub(crate) const ADS_LOAD_LABEL: &str = "RetailAds/AdsLoad";
/// Label used for beacon and conversion records.
pub(crate) const EVENTS_LABEL: &str = "RetailAds/Events";

/// Categories of debug records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugCategory {
    /// Ad query results, both successes and failures.
    AdsLoad,
    /// Enables every `Events*` category. Does not enable [`DebugCategory::AdsLoad`].
    EventsAll,
    /// Impression beacons.
    EventsImpression,
    /// View beacons.
    EventsView,
    /// Click beacons.
    EventsClick,
    /// Conversion (order) events.
    EventsConversion,
}

impl DebugCategory {
    fn is_event(self) -> bool {
        matches!(
            self,
            DebugCategory::EventsImpression
                | DebugCategory::EventsView
                | DebugCategory::EventsClick
                | DebugCategory::EventsConversion
        )
    }
}

/// Receives rendered debug records.
pub trait DebugSink {
    /// Write a single record. `label` identifies the emitting component.
    ///
    /// Panics raised here are caught and discarded.
    fn write(&self, label: &str, message: &str);
}

pub(crate) struct NoopDebugSink;
impl DebugSink for NoopDebugSink {
    fn write(&self, _label: &str, _message: &str) {}
}

impl<T: Fn(&str, &str)> DebugSink for T {
    fn write(&self, label: &str, message: &str) {
        self(label, message);
    }
}

/// Gate between SDK components and the user's [`DebugSink`].
pub struct DebugLogger {
    enabled: HashSet<DebugCategory>,
    sink: Arc<dyn DebugSink + Send + Sync>,
}

impl DebugLogger {
    pub(crate) fn new(
        enabled: HashSet<DebugCategory>,
        sink: Arc<dyn DebugSink + Send + Sync>,
    ) -> DebugLogger {
        DebugLogger { enabled, sink }
    }

    /// A logger with every category disabled.
    pub fn disabled() -> DebugLogger {
        DebugLogger::new(HashSet::new(), Arc::new(NoopDebugSink))
    }

    /// Whether records of `category` reach the sink.
    ///
    /// `AdsLoad` must be enabled explicitly. Event categories are enabled individually or all at
    /// once through `EventsAll`.
    pub fn is_enabled(&self, category: DebugCategory) -> bool {
        if self.enabled.contains(&category) {
            return true;
        }
        category.is_event() && self.enabled.contains(&DebugCategory::EventsAll)
    }

    /// Forward a record to the sink if `category` is enabled.
    ///
    /// `message` is never called when the category is disabled. A panic in `message` or in the
    /// sink is swallowed.
    pub fn log(&self, category: DebugCategory, label: &str, message: impl FnOnce() -> String) {
        if !self.is_enabled(category) {
            return;
        }

        let result = catch_unwind(AssertUnwindSafe(|| {
            let message = message();
            self.sink.write(label, &message);
        }));
        if result.is_err() {
            log::debug!(target: "retail_ads", label, category:? = category; "debug sink panicked, record dropped");
        }
    }
}
