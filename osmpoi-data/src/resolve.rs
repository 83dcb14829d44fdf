//! Two-pass dependency resolution over decoded blocks.
//!
//! The first pass sees ways and relations. Every way is stored because a
//! retained relation may need it later; only retained relations are stored.
//! Node ids that retained elements depend on are registered in the store's
//! membership set. The second pass sees nodes and keeps only those that are
//! retained themselves or were registered during the first pass.

use std::collections::HashSet;

use log::info;
use osmpoi_core::{
    DEFAULT_RETAINED_PAGE_SIZE, ElementId, ElementKind, ItemLookup, ItemStore, OsmRecord,
    RetainedCursor, StoreError, StoreSession, Tags, classify, is_name_key, name_from_tags,
};

use crate::pbf::{DecodedBlock, DecodedRelation, Member};

/// Member role naming a relation's administrative centre.
pub const ADMIN_CENTRE_ROLE: &str = "admin_centre";

/// Element counts gathered while resolving one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Nodes decoded in the second pass.
    pub nodes: u64,
    /// Nodes retained in their own right.
    pub retained_nodes: u64,
    /// Nodes stored only because something depends on them.
    pub stored_dependents: u64,
    /// Ways decoded in the first pass.
    pub ways: u64,
    /// Ways retained.
    pub retained_ways: u64,
    /// Relations decoded in the first pass.
    pub relations: u64,
    /// Relations retained.
    pub retained_relations: u64,
    /// Node ids registered as dependencies, duplicates included.
    pub dependent_nodes: u64,
}

/// Drives both passes against a [`StoreSession`].
///
/// # Examples
///
/// ```
/// use osmpoi_core::{ElementId, ItemLookup, LogDiagnostics, MemoryItemStore, StoreSession};
/// use osmpoi_data::Resolver;
///
/// # fn main() -> Result<(), osmpoi_core::StoreError> {
/// let diagnostics = LogDiagnostics;
/// let mut session = StoreSession::new(Box::new(MemoryItemStore::default()), &diagnostics);
/// let mut resolver = Resolver::new(&mut session);
/// resolver.finish_first_pass()?;
/// resolver.finish_second_pass()?;
/// assert_eq!(resolver.stats().ways, 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Resolver<'s, 'a> {
    session: &'s mut StoreSession<'a>,
    single_item: Option<u64>,
    page_size: usize,
    stats: ResolveStats,
}

impl<'s, 'a> Resolver<'s, 'a> {
    /// Resolve into `session`.
    pub fn new(session: &'s mut StoreSession<'a>) -> Self {
        Self {
            session,
            single_item: None,
            page_size: DEFAULT_RETAINED_PAGE_SIZE,
            stats: ResolveStats::default(),
        }
    }

    /// Retain only the relation `id`, whatever its tags say.
    #[must_use]
    pub const fn with_single_item(mut self, id: Option<u64>) -> Self {
        self.single_item = id;
        self
    }

    /// Page size used when sweeping retained relations.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Counts so far.
    #[must_use]
    pub const fn stats(&self) -> ResolveStats {
        self.stats
    }

    /// Store the ways and relations of one block.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn first_pass_block(&mut self, block: DecodedBlock) -> Result<(), StoreError> {
        let mut records = Vec::with_capacity(block.ways.len() + block.relations.len());
        let mut retained = Vec::new();
        let mut dependencies = Vec::new();

        for way in block.ways {
            self.stats.ways += 1;
            let id = ElementId::way(way.id);
            let name = name_from_tags(&way.tags).to_owned();
            let classification = classify(&way.tags, ElementKind::Way);
            // A single-item run indexes only the requested relation, so its
            // output can be inspected without the rest of the extract.
            if self.single_item.is_none() && classification.retains(&name) {
                self.stats.retained_ways += 1;
                retained.push(id);
                dependencies.extend_from_slice(&way.refs);
            }
            records.push(OsmRecord {
                level: classification.level.into_option(),
                name: non_empty(name),
                tags: non_empty_tags(classification.tags),
                node_ids: way.refs,
                ..OsmRecord::new(id)
            });
        }

        for relation in block.relations {
            self.stats.relations += 1;
            if let Some(record) = self.relation_record(relation) {
                self.stats.retained_relations += 1;
                retained.push(record.id);
                dependencies.extend_from_slice(&record.node_ids);
                records.push(record);
            }
        }

        self.stats.dependent_nodes += count(dependencies.len());
        self.session.store(records)?;
        self.session.store_retained(&retained)?;
        self.session.store_node_ids(&dependencies)
    }

    /// Register the nodes of every retained relation's member ways, then
    /// flush.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn finish_first_pass(&mut self) -> Result<(), StoreError> {
        self.session.flush()?;
        let mut cursor = RetainedCursor::new(self.page_size);
        loop {
            let page = cursor.next_page(&mut *self.session)?;
            if page.is_empty() {
                break;
            }
            for id in page.into_iter().filter(|id| id.kind == ElementKind::Relation) {
                let Some(relation) = self.session.retrieve(id)? else {
                    continue;
                };
                for way in relation.way_ids {
                    if let Some(record) = self.session.retrieve(ElementId::way(way))? {
                        self.stats.dependent_nodes += count(record.node_ids.len());
                        self.session.store_node_ids(&record.node_ids)?;
                    }
                }
            }
        }
        self.session.flush()?;

        let stats = self.stats;
        info!(
            "first pass complete, kept {} of {} relations and {} of {} ways; {} dependent nodes",
            stats.retained_relations,
            stats.relations,
            stats.retained_ways,
            stats.ways,
            stats.dependent_nodes
        );
        Ok(())
    }

    /// Store the nodes of one block that are retained or depended upon.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn second_pass_block(&mut self, block: DecodedBlock) -> Result<(), StoreError> {
        let mut kept = Vec::new();
        let mut retained = Vec::new();
        let mut candidates = Vec::new();

        for node in block.nodes {
            self.stats.nodes += 1;
            let id = ElementId::node(node.id);
            let name = name_from_tags(&node.tags).to_owned();
            let classification = classify(&node.tags, ElementKind::Node);
            // Nodes stay unretained in a single-item run, as ways do.
            let keep = self.single_item.is_none() && classification.retains(&name);
            let record = OsmRecord {
                level: classification.level.into_option(),
                location: Some(node.location),
                name: non_empty(name),
                tags: non_empty_tags(classification.tags),
                ..OsmRecord::new(id)
            };
            if keep {
                retained.push(id);
                kept.push(record);
            } else {
                candidates.push(record);
            }
        }

        let ids: Vec<u64> = candidates.iter().map(|record| record.id.id).collect();
        let wanted: HashSet<u64> = self.session.contains_node_ids(&ids)?.into_iter().collect();
        let before = kept.len();
        kept.extend(
            candidates
                .into_iter()
                .filter(|record| wanted.contains(&record.id.id)),
        );

        self.stats.retained_nodes += count(retained.len());
        self.stats.stored_dependents += count(kept.len() - before);
        self.session.store(kept)?;
        self.session.store_retained(&retained)
    }

    /// Flush the second pass.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn finish_second_pass(&mut self) -> Result<(), StoreError> {
        self.session.flush()?;
        let stats = self.stats;
        info!(
            "second pass complete, kept {} nodes and {} dependent nodes of {} nodes",
            stats.retained_nodes, stats.stored_dependents, stats.nodes
        );
        Ok(())
    }

    fn relation_record(&self, relation: DecodedRelation) -> Option<OsmRecord> {
        let name = name_from_tags(&relation.tags).to_owned();
        let classification = classify(&relation.tags, ElementKind::Relation);
        let keep = match self.single_item {
            Some(item) => item == relation.id,
            None => classification.retains(&name),
        };
        if !keep {
            return None;
        }

        let tags = if classification.level.is_interesting() {
            classification.tags
        } else {
            strip_names(relation.tags)
        };
        let mut record = OsmRecord {
            level: classification.level.into_option(),
            name: non_empty(name),
            tags: non_empty_tags(tags),
            ..OsmRecord::new(ElementId::relation(relation.id))
        };
        for Member { kind, id, role } in relation.members {
            match kind {
                ElementKind::Node => {
                    if role == ADMIN_CENTRE_ROLE {
                        record.admin_centre = Some(id);
                    }
                    record.node_ids.push(id);
                }
                ElementKind::Way => record.way_ids.push(id),
                ElementKind::Relation => record.relation_ids.push(id),
            }
            record.roles.push(role);
        }
        Some(record)
    }
}

fn strip_names(mut tags: Tags) -> Tags {
    tags.retain(|key, _| !is_name_key(key));
    tags
}

fn non_empty(name: String) -> Option<String> {
    (!name.is_empty()).then_some(name)
}

fn non_empty_tags(tags: Tags) -> Option<Tags> {
    (!tags.is_empty()).then_some(tags)
}

fn count(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}
