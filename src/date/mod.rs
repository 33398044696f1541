//! Tolerant date resolution for feed timestamps.
//!
//! Feeds put every imaginable string in their date elements. The
//! [`DateResolver`] tries each candidate against an ordered catalog of
//! layouts and reports unmatched values to a [`FailureSink`] so the catalog
//! can grow over time.

mod catalog;
mod layout;

pub use catalog::{DateCatalog, BUILTIN_LAYOUTS};
pub use layout::Layout;

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

/// Default number of failure buckets.
pub const DEFAULT_FAILURE_BUCKETS: u64 = 500;

/// None of the candidates matched a known layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not parse date: {}", attempted.join(", "))]
pub struct DateParseError {
    /// Every candidate passed in, blank ones included.
    pub attempted: Vec<String>,
}

/// A sample of a date value no layout understood.
///
/// `bucket` is random in `[0, buckets)` so that a store keyed by bucket keeps
/// a bounded, rolling sample of failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateFormatFailure {
    pub bucket: u64,
    pub feed_url: String,
    pub value: String,
}

/// Receives date values that failed to parse.
pub trait FailureSink: Send + Sync {
    /// Records a failure. Must not block for long; callers are mid-parse.
    fn record(&self, failure: DateFormatFailure);
}

/// Logs failures as structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFailureSink;

impl FailureSink for TracingFailureSink {
    fn record(&self, failure: DateFormatFailure) {
        tracing::info!(
            bucket = failure.bucket,
            feed = %failure.feed_url,
            value = %failure.value,
            "Unrecognised date format"
        );
    }
}

/// Keeps failures in memory, replacing earlier samples in the same bucket.
#[derive(Debug, Default)]
pub struct MemoryFailureSink {
    failures: Mutex<Vec<DateFormatFailure>>,
}

impl MemoryFailureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded failures, in arrival order.
    pub fn failures(&self) -> Vec<DateFormatFailure> {
        match self.failures.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl FailureSink for MemoryFailureSink {
    fn record(&self, failure: DateFormatFailure) {
        let mut failures = match self.failures.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        failures.retain(|existing| existing.bucket != failure.bucket);
        failures.push(failure);
    }
}

/// Resolves the first parseable date among ordered candidates.
pub struct DateResolver {
    catalog: DateCatalog,
    sink: Arc<dyn FailureSink>,
    failure_buckets: u64,
}

impl std::fmt::Debug for DateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DateResolver")
            .field("layouts", &self.catalog.len())
            .field("failure_buckets", &self.failure_buckets)
            .finish_non_exhaustive()
    }
}

impl Default for DateResolver {
    fn default() -> Self {
        Self::new(
            DateCatalog::builtin(),
            Arc::new(TracingFailureSink),
            DEFAULT_FAILURE_BUCKETS,
        )
    }
}

impl DateResolver {
    /// Creates a resolver. A `failure_buckets` of zero is treated as one.
    pub fn new(catalog: DateCatalog, sink: Arc<dyn FailureSink>, failure_buckets: u64) -> Self {
        Self {
            catalog,
            sink,
            failure_buckets: failure_buckets.max(1),
        }
    }

    /// Resolves the first candidate that matches any catalog layout.
    ///
    /// Candidates are trimmed and blank ones skipped. Each non-blank
    /// candidate that matches nothing is reported to the failure sink before
    /// the next one is tried.
    ///
    /// # Arguments
    ///
    /// * `feed_url` - The feed the values came from, for failure reports.
    /// * `candidates` - Date strings in priority order.
    ///
    /// # Errors
    ///
    /// Returns `DateParseError` listing every candidate when none matched.
    pub fn resolve(
        &self,
        feed_url: &str,
        candidates: &[&str],
    ) -> Result<DateTime<Utc>, DateParseError> {
        for candidate in candidates {
            let value = candidate.trim();
            if value.is_empty() {
                continue;
            }
            if let Some(parsed) = self.parse_one(value) {
                return Ok(parsed);
            }
            self.sink.record(DateFormatFailure {
                bucket: rand::thread_rng().gen_range(0..self.failure_buckets),
                feed_url: feed_url.to_owned(),
                value: value.to_owned(),
            });
        }

        Err(DateParseError {
            attempted: candidates.iter().map(|c| (*c).to_owned()).collect(),
        })
    }

    /// Matches a single, already trimmed value against the catalog.
    pub fn parse_one(&self, value: &str) -> Option<DateTime<Utc>> {
        self.catalog
            .layouts()
            .iter()
            .find_map(|layout| layout.parse(value))
    }
}
