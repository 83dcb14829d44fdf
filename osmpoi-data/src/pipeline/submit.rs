//! Batched submission to a [`PoiSink`] with retry and bisection.

use log::warn;
use osmpoi_core::{Diagnostic, DiagnosticSink, PoiRecord, PoiSink, SinkError, SinkReport};

use super::error_chain;

/// Outcome counters for everything submitted so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitStats {
    /// Records the sink accepted.
    pub indexed: u64,
    /// Records abandoned or refused.
    pub errors: u64,
    /// Whole-batch retries.
    pub retry_attempts: u64,
}

/// Hands batches to a sink without ever failing the caller.
///
/// An unavailable sink gets the same batch again up to `retries` times. A
/// refused batch is split in half until the poisoned record stands alone;
/// that record is reported as [`Diagnostic::UnsendableRecord`] and dropped.
pub struct BatchSubmitter<'a, S: ?Sized> {
    sink: &'a mut S,
    retries: u32,
    diagnostics: &'a dyn DiagnosticSink,
    stats: SubmitStats,
}

impl<'a, S: PoiSink + ?Sized> BatchSubmitter<'a, S> {
    /// Submit into `sink`, retrying unavailable batches `retries` times.
    pub fn new(sink: &'a mut S, retries: u32, diagnostics: &'a dyn DiagnosticSink) -> Self {
        Self {
            sink,
            retries,
            diagnostics,
            stats: SubmitStats::default(),
        }
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> SubmitStats {
        self.stats
    }

    /// Submit `batch`; empty batches are not sent.
    pub fn submit(&mut self, batch: &[PoiRecord]) {
        if !batch.is_empty() {
            self.attempt(batch, self.retries);
        }
    }

    fn attempt(&mut self, batch: &[PoiRecord], retries: u32) {
        match self.sink.submit(batch) {
            Ok(report) => self.accept(batch, &report),
            Err(SinkError::Unavailable { source }) if retries > 0 => {
                warn!(
                    "sink unavailable ({}), retrying {} records",
                    error_chain(source.as_ref()),
                    batch.len()
                );
                self.stats.retry_attempts += 1;
                self.attempt(batch, retries - 1);
            }
            Err(SinkError::Unavailable { source }) => {
                let reason = format!("sink unavailable: {}", error_chain(source.as_ref()));
                for record in batch {
                    self.abandon(record, &reason);
                }
            }
            Err(SinkError::Rejected { reason }) => match batch {
                [record] => self.abandon(record, &reason),
                _ => {
                    warn!(
                        "sink rejected {} records ({reason}), bisecting",
                        batch.len()
                    );
                    let (left, right) = batch.split_at(batch.len() / 2);
                    self.attempt(left, self.retries);
                    self.attempt(right, self.retries);
                }
            },
        }
    }

    fn accept(&mut self, batch: &[PoiRecord], report: &SinkReport) {
        for rejected in &report.rejected {
            self.diagnostics.record(&Diagnostic::UnsendableRecord {
                id: rejected.id,
                reason: rejected.reason.clone(),
            });
        }
        let refused = count(report.rejected.len());
        self.stats.errors += refused;
        self.stats.indexed += count(batch.len()).saturating_sub(refused);
    }

    fn abandon(&mut self, record: &PoiRecord, reason: &str) {
        self.stats.errors += 1;
        self.diagnostics.record(&Diagnostic::UnsendableRecord {
            id: record.id,
            reason: reason.to_owned(),
        });
    }
}

fn count(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}
