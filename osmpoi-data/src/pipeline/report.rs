//! Counters describing an indexing run.

use std::fmt;
use std::ops::AddAssign;

use crate::resolve::ResolveStats;

/// Totals for one file, or summed over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Extract files processed.
    pub files: u64,
    /// Nodes decoded.
    pub nodes: u64,
    /// Nodes retained in their own right.
    pub retained_nodes: u64,
    /// Ways decoded.
    pub ways: u64,
    /// Ways retained.
    pub retained_ways: u64,
    /// Relations decoded.
    pub relations: u64,
    /// Relations retained.
    pub retained_relations: u64,
    /// Node ids registered as dependencies.
    pub dependent_nodes: u64,
    /// Distinct blocks that failed to decode.
    pub corrupt_blocks: u64,
    /// Retained elements visited by the resolution stage.
    pub processed: u64,
    /// Records the sink accepted.
    pub indexed: u64,
    /// Records the sink refused.
    pub index_errors: u64,
    /// Whole-batch retries after the sink was unavailable.
    pub retry_attempts: u64,
    /// Elements dropped for lacking usable geometry.
    pub bad_geometries: u64,
    /// Relations with unresolvable member ways.
    pub missing_way_relations: u64,
    /// Relations without way members.
    pub no_way_relations: u64,
    /// Relations whose assembly failed for any reason.
    pub invalid_relations: u64,
    /// Elements skipped for too many dependencies.
    pub oversized: u64,
    /// Store lookups that found nothing.
    pub failed_lookups: u64,
}

impl IndexReport {
    pub(crate) fn absorb_resolve(&mut self, stats: ResolveStats) {
        self.nodes += stats.nodes;
        self.retained_nodes += stats.retained_nodes;
        self.ways += stats.ways;
        self.retained_ways += stats.retained_ways;
        self.relations += stats.relations;
        self.retained_relations += stats.retained_relations;
        self.dependent_nodes += stats.dependent_nodes;
    }
}

impl AddAssign for IndexReport {
    fn add_assign(&mut self, other: Self) {
        self.files += other.files;
        self.nodes += other.nodes;
        self.retained_nodes += other.retained_nodes;
        self.ways += other.ways;
        self.retained_ways += other.retained_ways;
        self.relations += other.relations;
        self.retained_relations += other.retained_relations;
        self.dependent_nodes += other.dependent_nodes;
        self.corrupt_blocks += other.corrupt_blocks;
        self.processed += other.processed;
        self.indexed += other.indexed;
        self.index_errors += other.index_errors;
        self.retry_attempts += other.retry_attempts;
        self.bad_geometries += other.bad_geometries;
        self.missing_way_relations += other.missing_way_relations;
        self.no_way_relations += other.no_way_relations;
        self.invalid_relations += other.invalid_relations;
        self.oversized += other.oversized;
        self.failed_lookups += other.failed_lookups;
    }
}

impl fmt::Display for IndexReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "resolved {} POIs, {} had bad geometries, {} were missing ways, {} had no ways. \
             Indexed {} with {} errors ({} retry attempts) and {} failed lookups. \
             Skipped {} oversized POIs and {} corrupt blocks",
            self.processed,
            self.bad_geometries,
            self.missing_way_relations,
            self.no_way_relations,
            self.indexed,
            self.index_errors,
            self.retry_attempts,
            self.failed_lookups,
            self.oversized,
            self.corrupt_blocks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn reports_accumulate_across_files() {
        let mut total = IndexReport {
            files: 1,
            indexed: 3,
            ..IndexReport::default()
        };
        total += IndexReport {
            files: 1,
            indexed: 4,
            bad_geometries: 1,
            ..IndexReport::default()
        };
        assert_eq!(total.files, 2);
        assert_eq!(total.indexed, 7);
        assert_eq!(total.bad_geometries, 1);
    }

    #[rstest]
    fn summary_line_names_the_key_counts() {
        let report = IndexReport {
            processed: 5,
            indexed: 4,
            index_errors: 1,
            ..IndexReport::default()
        };
        let line = report.to_string();
        assert!(line.starts_with("resolved 5 POIs"));
        assert!(line.contains("Indexed 4 with 1 errors"));
    }
}
