//! Typed identifiers for OSM primitives.

use std::{fmt, num::ParseIntError, str::FromStr};

use thiserror::Error;

/// The three OSM primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ElementKind {
    /// A single point.
    Node,
    /// An ordered list of node references.
    Way,
    /// An ordered list of typed, role-annotated member references.
    Relation,
}

impl ElementKind {
    /// Lower-case name used in identifier strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a single OSM element, unique within its kind.
///
/// The external representation is `"<kind>/<id>"`, which is also the primary
/// key handed to sinks.
///
/// # Examples
///
/// ```
/// use osmpoi_core::{ElementId, ElementKind};
///
/// let id: ElementId = "way/42".parse().expect("valid identifier");
/// assert_eq!(id.kind, ElementKind::Way);
/// assert_eq!(id.to_string(), "way/42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementId {
    /// Primitive kind.
    pub kind: ElementKind,
    /// OSM numeric identifier.
    pub id: u64,
}

impl ElementId {
    /// Build an identifier from its parts.
    #[must_use]
    pub const fn new(kind: ElementKind, id: u64) -> Self {
        Self { kind, id }
    }

    /// Identifier of node `id`.
    #[must_use]
    pub const fn node(id: u64) -> Self {
        Self::new(ElementKind::Node, id)
    }

    /// Identifier of way `id`.
    #[must_use]
    pub const fn way(id: u64) -> Self {
        Self::new(ElementKind::Way, id)
    }

    /// Identifier of relation `id`.
    #[must_use]
    pub const fn relation(id: u64) -> Self {
        Self::new(ElementKind::Relation, id)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Errors returned when parsing an [`ElementId`] from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ElementIdError {
    /// The input lacked the `/` separator.
    #[error("element identifier {input:?} must look like <kind>/<id>")]
    MissingSeparator {
        /// Offending input.
        input: String,
    },
    /// The kind prefix was not `node`, `way` or `relation`.
    #[error("unknown element kind {kind:?}")]
    UnknownKind {
        /// Unrecognised kind prefix.
        kind: String,
    },
    /// The numeric part was not an unsigned 64-bit integer.
    #[error("invalid numeric id in {input:?}")]
    InvalidNumber {
        /// Offending input.
        input: String,
        /// Integer parsing failure.
        #[source]
        source: ParseIntError,
    },
}

impl FromStr for ElementKind {
    type Err = ElementIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(Self::Node),
            "way" => Ok(Self::Way),
            "relation" => Ok(Self::Relation),
            other => Err(ElementIdError::UnknownKind {
                kind: other.to_owned(),
            }),
        }
    }
}

impl FromStr for ElementId {
    type Err = ElementIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once('/')
            .ok_or_else(|| ElementIdError::MissingSeparator {
                input: s.to_owned(),
            })?;
        let kind = kind.parse()?;
        let id = id
            .parse()
            .map_err(|source| ElementIdError::InvalidNumber {
                input: s.to_owned(),
                source,
            })?;
        Ok(Self { kind, id })
    }
}
