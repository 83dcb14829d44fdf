//! Observability side-channel for skipped, partial or malformed data.
//!
//! Events never alter control flow. They are handed to a [`DiagnosticSink`],
//! which may log them, append them to per-category files, or count them.

use std::fmt;

use log::{info, warn};

use crate::ElementId;

/// Grouping used to route events to per-category outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticCategory {
    /// Store lookups that found nothing.
    FailedLookup,
    /// Relations without way members.
    NoWays,
    /// Relations with some unresolvable ways.
    MissingWays,
    /// Data deliberately ignored during assembly.
    IgnoredData,
    /// Rings closed by duplicating their first node.
    ForcedPatch,
    /// Linear relations abandoned because fragments do not connect.
    UnconnectedFragment,
    /// Elements skipped for having too many dependencies.
    Oversized,
    /// Elements whose geometry came out empty.
    BadGeometry,
    /// Blocks that failed to decode.
    CorruptBlock,
    /// Records the sink would not accept.
    UnsendableRecord,
}

impl DiagnosticCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::FailedLookup,
        Self::NoWays,
        Self::MissingWays,
        Self::IgnoredData,
        Self::ForcedPatch,
        Self::UnconnectedFragment,
        Self::Oversized,
        Self::BadGeometry,
        Self::CorruptBlock,
        Self::UnsendableRecord,
    ];

    /// File name used when events are persisted per category.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::FailedLookup => "ItemLookupFailures.log",
            Self::NoWays => "NoWays.log",
            Self::MissingWays => "MissingWays.log",
            Self::IgnoredData => "IgnoredData.log",
            Self::ForcedPatch => "PatchingWay.log",
            Self::UnconnectedFragment => "NoConnectedWay.log",
            Self::Oversized => "SkippedPOIs.log",
            Self::BadGeometry => "BadGeometries.log",
            Self::CorruptBlock => "CorruptBlocks.log",
            Self::UnsendableRecord => "IndexFailures.log",
        }
    }
}

/// A single observability event.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A referenced element was absent from the store.
    FailedLookup {
        /// Identifier that could not be resolved.
        id: ElementId,
    },
    /// A relation carried no way members and has no geometry.
    NoWays {
        /// Relation identifier.
        relation: ElementId,
        /// Relation display name.
        name: String,
        /// Relation members that were ignored.
        relation_members: Vec<u64>,
    },
    /// Some way members of a relation could not be resolved.
    MissingWays {
        /// Relation identifier.
        relation: ElementId,
        /// Relation display name.
        name: String,
        /// Way ids absent from the store.
        missing: Vec<u64>,
    },
    /// Relation members were skipped because relations of relations are not
    /// assembled.
    IgnoredRelationMembers {
        /// Relation identifier.
        relation: ElementId,
        /// Skipped relation member ids.
        members: Vec<u64>,
    },
    /// A ring with no connecting fragment was closed on its first node.
    ForcedPatch {
        /// Relation identifier.
        relation: ElementId,
        /// Relation display name.
        name: String,
        /// Way whose ring was patched.
        way: u64,
        /// Declared relation type.
        declared_type: String,
    },
    /// A linear relation had fragments that never connect.
    UnconnectedFragment {
        /// Relation identifier.
        relation: ElementId,
        /// Relation display name.
        name: String,
        /// Way whose chain could not be extended.
        way: u64,
        /// First node of the open chain.
        first: u64,
        /// Last node of the open chain.
        last: u64,
        /// Declared relation type.
        declared_type: String,
    },
    /// A closed ring had fewer than three distinct points and was dropped.
    TooFewPoints {
        /// Relation identifier.
        relation: ElementId,
        /// Way that seeded the ring.
        way: u64,
        /// Number of distinct points found.
        points: usize,
    },
    /// An element referenced more dependencies than the configured ceiling.
    Oversized {
        /// Element identifier.
        id: ElementId,
        /// Element display name.
        name: String,
        /// Number of node references.
        nodes: usize,
        /// Number of way references.
        ways: usize,
        /// Number of relation references.
        relations: usize,
    },
    /// Geometry assembly produced nothing usable.
    BadGeometry {
        /// Element identifier.
        id: ElementId,
        /// Element display name.
        name: String,
    },
    /// A relation's administrative centre node was not stored.
    MissingAdminCentre {
        /// Relation identifier.
        relation: ElementId,
        /// Node that could not be resolved.
        node: u64,
    },
    /// A block failed to decode and was skipped.
    CorruptBlock {
        /// Zero-based index of the blob within its file.
        block: usize,
        /// Description of the fault.
        reason: String,
    },
    /// The sink refused a record even when submitted on its own.
    UnsendableRecord {
        /// Record identifier.
        id: ElementId,
        /// Reason reported by the sink.
        reason: String,
    },
}

impl Diagnostic {
    /// Category the event belongs to.
    #[must_use]
    pub const fn category(&self) -> DiagnosticCategory {
        match self {
            Self::FailedLookup { .. } => DiagnosticCategory::FailedLookup,
            Self::NoWays { .. } => DiagnosticCategory::NoWays,
            Self::MissingWays { .. } => DiagnosticCategory::MissingWays,
            Self::IgnoredRelationMembers { .. }
            | Self::TooFewPoints { .. }
            | Self::MissingAdminCentre { .. } => DiagnosticCategory::IgnoredData,
            Self::ForcedPatch { .. } => DiagnosticCategory::ForcedPatch,
            Self::UnconnectedFragment { .. } => DiagnosticCategory::UnconnectedFragment,
            Self::Oversized { .. } => DiagnosticCategory::Oversized,
            Self::BadGeometry { .. } => DiagnosticCategory::BadGeometry,
            Self::CorruptBlock { .. } => DiagnosticCategory::CorruptBlock,
            Self::UnsendableRecord { .. } => DiagnosticCategory::UnsendableRecord,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailedLookup { id } => write!(f, "{id}"),
            Self::NoWays {
                relation,
                name,
                relation_members,
            } => write!(f, "{relation}: {name} has no ways; relations={relation_members:?}"),
            Self::MissingWays {
                relation,
                name,
                missing,
            } => write!(f, "{relation}: {name} is missing ways {missing:?}"),
            Self::IgnoredRelationMembers { relation, members } => {
                write!(f, "{relation}: ignoring relation members {members:?}")
            }
            Self::ForcedPatch {
                relation,
                name,
                way,
                declared_type,
            } => write!(f, "{relation} {name} way={way} type={declared_type}"),
            Self::UnconnectedFragment {
                relation,
                name,
                way,
                first,
                last,
                declared_type,
            } => write!(
                f,
                "{relation} {name} way={way}, {first} & {last}; type={declared_type}"
            ),
            Self::TooFewPoints {
                relation,
                way,
                points,
            } => write!(f, "{relation} way {way} has too few points: {points}"),
            Self::Oversized {
                id,
                name,
                nodes,
                ways,
                relations,
            } => write!(
                f,
                "skipping {id}: {name} {relations} relations, {ways} ways and {nodes} nodes"
            ),
            Self::BadGeometry { id, name } => write!(f, "{id}: {name}"),
            Self::MissingAdminCentre { relation, node } => {
                write!(f, "{relation}: admin centre node/{node} not found")
            }
            Self::CorruptBlock { block, reason } => write!(f, "block {block}: {reason}"),
            Self::UnsendableRecord { id, reason } => write!(f, "{id}: {reason}"),
        }
    }
}

/// Destination for [`Diagnostic`] events.
pub trait DiagnosticSink {
    /// Record a single event.
    fn record(&self, event: &Diagnostic);
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &T {
    fn record(&self, event: &Diagnostic) {
        (**self).record(event);
    }
}

/// Sink that writes every event through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl DiagnosticSink for LogDiagnostics {
    fn record(&self, event: &Diagnostic) {
        match event.category() {
            DiagnosticCategory::IgnoredData | DiagnosticCategory::FailedLookup => {
                info!("{event}");
            }
            _ => warn!("{event}"),
        }
    }
}
