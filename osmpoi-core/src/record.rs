//! Records persisted in the item store while a file is being indexed.

use std::collections::BTreeMap;
use std::fmt;

use geo::Coord;

use crate::ElementId;

/// OSM tag bag, ordered by key so that output is stable.
pub type Tags = BTreeMap<String, String>;

/// Significance assigned by the tag classifier.
///
/// Variants are ordered by significance; classification only ever moves a
/// level upwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PoiLevel {
    /// Not a point of interest.
    #[default]
    None,
    /// Worth indexing but not remarkable.
    Ordinary,
    /// A notable landmark.
    Notable,
    /// An administrative area.
    Admin,
}

impl PoiLevel {
    /// Whether the level marks the entity as interesting.
    #[must_use]
    pub const fn is_interesting(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Lowercase label used in sink output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ordinary => "ordinary",
            Self::Notable => "notable",
            Self::Admin => "admin",
        }
    }

    /// Map [`PoiLevel::None`] to `None` for storage.
    #[must_use]
    pub const fn into_option(self) -> Option<Self> {
        if self.is_interesting() { Some(self) } else { None }
    }
}

impl fmt::Display for PoiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit stored in and retrieved from an [`ItemStore`](crate::ItemStore).
///
/// Optional fields are only populated for the kinds that carry them: nodes
/// have a location, ways have node references, relations have way, relation
/// and role lists plus an optional administrative centre.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OsmRecord {
    /// Identifier of the element.
    pub id: ElementId,
    /// Classification, absent when the element is not of interest.
    pub level: Option<PoiLevel>,
    /// Longitude (`x`) and latitude (`y`) in degrees. Nodes only.
    pub location: Option<Coord>,
    /// Display name resolved from the tags.
    pub name: Option<String>,
    /// Retained tags with name-like keys stripped.
    pub tags: Option<Tags>,
    /// Ordered node references of a way, or node members of a relation.
    pub node_ids: Vec<u64>,
    /// Ordered way members of a relation.
    pub way_ids: Vec<u64>,
    /// Ordered relation members of a relation.
    pub relation_ids: Vec<u64>,
    /// Member roles of a relation, parallel to its full member list.
    pub roles: Vec<String>,
    /// Node designated as the relation's administrative centre.
    pub admin_centre: Option<u64>,
}

impl OsmRecord {
    /// An empty record for `id`; populate the remaining fields with struct
    /// update syntax.
    #[must_use]
    pub const fn new(id: ElementId) -> Self {
        Self {
            id,
            level: None,
            location: None,
            name: None,
            tags: None,
            node_ids: Vec::new(),
            way_ids: Vec::new(),
            relation_ids: Vec::new(),
            roles: Vec::new(),
            admin_centre: None,
        }
    }

    /// Total number of referenced nodes, ways and relations.
    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.node_ids.len() + self.way_ids.len() + self.relation_ids.len()
    }

    /// Value of the `type` tag, if retained.
    #[must_use]
    pub fn declared_type(&self) -> Option<&str> {
        self.tag("type")
    }

    /// Look up a retained tag value.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.as_ref()?.get(key).map(String::as_str)
    }

    /// Resolved name, or the empty string.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn levels_are_ordered_by_significance() {
        assert!(PoiLevel::None < PoiLevel::Ordinary);
        assert!(PoiLevel::Ordinary < PoiLevel::Notable);
        assert_eq!(PoiLevel::None.into_option(), None);
        assert_eq!(PoiLevel::Notable.into_option(), Some(PoiLevel::Notable));
    }

    #[rstest]
    fn counts_every_dependency() {
        let record = OsmRecord {
            node_ids: vec![1, 2],
            way_ids: vec![3],
            relation_ids: vec![4, 5, 6],
            ..OsmRecord::new(ElementId::relation(9))
        };
        assert_eq!(record.dependency_count(), 6);
    }

    #[rstest]
    fn reads_declared_type_from_tags() {
        let record = OsmRecord {
            tags: Some(Tags::from([("type".into(), "boundary".into())])),
            ..OsmRecord::new(ElementId::relation(1))
        };
        assert_eq!(record.declared_type(), Some("boundary"));
        assert_eq!(record.display_name(), "");
    }
}
