//! Test doubles for diagnostics and sinks, shared with downstream crates.

use std::collections::HashSet;
use std::io;
use std::sync::Mutex;

use crate::{Diagnostic, DiagnosticCategory, DiagnosticSink, ElementId, PoiRecord, PoiSink};
use crate::{RejectedRecord, SinkError, SinkReport};

/// Diagnostic sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    events: Mutex<Vec<Diagnostic>>,
}

impl RecordingDiagnostics {
    /// Snapshot of the recorded events in arrival order.
    pub fn events(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Recorded events belonging to `category`.
    pub fn in_category(&self, category: DiagnosticCategory) -> Vec<Diagnostic> {
        self.events()
            .into_iter()
            .filter(|event| event.category() == category)
            .collect()
    }
}

impl DiagnosticSink for RecordingDiagnostics {
    fn record(&self, event: &Diagnostic) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Scriptable in-memory [`PoiSink`].
///
/// Batches containing a poisoned id are refused outright; records listed as
/// refused are reported individually while the rest of the batch is kept.
/// The first `outages` submissions fail as unavailable.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Records the sink accepted, in submission order.
    pub accepted: Vec<PoiRecord>,
    /// Sizes of every batch submitted, including failed ones.
    pub submissions: Vec<usize>,
    poisoned: HashSet<ElementId>,
    refused: HashSet<ElementId>,
    outages: usize,
}

impl MemorySink {
    /// Refuse any batch containing `id`.
    #[must_use]
    pub fn with_poisoned(mut self, id: ElementId) -> Self {
        self.poisoned.insert(id);
        self
    }

    /// Report `id` as rejected while accepting the rest of its batch.
    #[must_use]
    pub fn with_refused(mut self, id: ElementId) -> Self {
        self.refused.insert(id);
        self
    }

    /// Fail the next `outages` submissions as unavailable.
    #[must_use]
    pub const fn with_outages(mut self, outages: usize) -> Self {
        self.outages = outages;
        self
    }

    /// Ids of the accepted records.
    pub fn accepted_ids(&self) -> Vec<ElementId> {
        self.accepted.iter().map(|record| record.id).collect()
    }
}

impl PoiSink for MemorySink {
    fn submit(&mut self, batch: &[PoiRecord]) -> Result<SinkReport, SinkError> {
        self.submissions.push(batch.len());
        if self.outages > 0 {
            self.outages -= 1;
            return Err(SinkError::Unavailable {
                source: Box::new(io::Error::new(io::ErrorKind::TimedOut, "sink timed out")),
            });
        }
        if let Some(record) = batch.iter().find(|record| self.poisoned.contains(&record.id)) {
            return Err(SinkError::Rejected {
                reason: format!("{} is malformed", record.id),
            });
        }
        let mut report = SinkReport::default();
        for record in batch {
            if self.refused.contains(&record.id) {
                report.rejected.push(RejectedRecord {
                    id: record.id,
                    reason: "refused".into(),
                });
            } else {
                self.accepted.push(record.clone());
            }
        }
        Ok(report)
    }
}
