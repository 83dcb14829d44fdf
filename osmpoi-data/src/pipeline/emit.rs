//! Turn retained records into sink records.

use camino::Utf8Path;
use log::info;
use osmpoi_core::{
    Diagnostic, DiagnosticSink, ElementKind, GeoPoint, InvalidGeometry, ItemLookup, OsmRecord,
    PoiRecord, PoiSink, RelationGeometry, ResolvedGeometry, RetainedCursor, StoreError,
    StoreSession, assemble_relation, assemble_way, node_geometry,
};

use super::submit::BatchSubmitter;
use super::{IndexConfig, IndexReport, OsmIndexError, store_error};

/// Walk the retained index, resolve each record's geometry and submit the
/// results in batches.
pub(super) fn emit_retained<S>(
    path: &Utf8Path,
    config: &IndexConfig,
    session: &mut StoreSession<'_>,
    sink: &mut S,
    diagnostics: &dyn DiagnosticSink,
    report: &mut IndexReport,
) -> Result<(), OsmIndexError>
where
    S: PoiSink + ?Sized,
{
    let batch_size = config.sink_batch_size.max(1);
    let mut submitter = BatchSubmitter::new(sink, config.sink_retries, diagnostics);
    let mut batch = Vec::with_capacity(batch_size);
    let mut cursor = RetainedCursor::new(config.retained_page_size);
    let mut next_progress = config.progress_interval;

    loop {
        let page = cursor
            .next_page(&mut *session)
            .map_err(|source| store_error(path, source))?;
        if page.is_empty() {
            break;
        }
        for id in page {
            let Some(record) = session
                .retrieve(id)
                .map_err(|source| store_error(path, source))?
            else {
                continue;
            };
            report.processed += 1;
            let poi = to_poi(record, config, &*session, diagnostics, report)
                .map_err(|source| store_error(path, source))?;
            if let Some(poi) = poi {
                batch.push(poi);
                if batch.len() >= batch_size {
                    submitter.submit(&batch);
                    batch.clear();
                }
            }
            if config.progress_interval > 0 && report.processed >= next_progress {
                let stats = submitter.stats();
                info!(
                    "resolved {} POIs, {} bad geometries; indexed {} with {} errors",
                    report.processed, report.bad_geometries, stats.indexed, stats.errors
                );
                next_progress += config.progress_interval;
            }
        }
    }
    submitter.submit(&batch);

    let stats = submitter.stats();
    report.indexed += stats.indexed;
    report.index_errors += stats.errors;
    report.retry_attempts += stats.retry_attempts;
    Ok(())
}

fn to_poi<L>(
    record: OsmRecord,
    config: &IndexConfig,
    lookup: &L,
    diagnostics: &dyn DiagnosticSink,
    report: &mut IndexReport,
) -> Result<Option<PoiRecord>, StoreError>
where
    L: ItemLookup + ?Sized,
{
    if record.dependency_count() > config.max_dependencies {
        report.oversized += 1;
        diagnostics.record(&Diagnostic::Oversized {
            id: record.id,
            name: record.display_name().to_owned(),
            nodes: record.node_ids.len(),
            ways: record.way_ids.len(),
            relations: record.relation_ids.len(),
        });
        return Ok(None);
    }

    let geometry = match record.id.kind {
        ElementKind::Node => node_geometry(&record),
        ElementKind::Way => assemble_way(&record, lookup)?,
        ElementKind::Relation => match relation_geometry(&record, lookup, diagnostics, report)? {
            RelationShape::Assembled(geometry) => Some(geometry),
            RelationShape::Failed => None,
            RelationShape::WithoutWays => return Ok(None),
        },
    };
    let Some(geometry) = geometry.filter(|geometry| !geometry.wkt.is_empty()) else {
        report.bad_geometries += 1;
        diagnostics.record(&Diagnostic::BadGeometry {
            id: record.id,
            name: record.display_name().to_owned(),
        });
        return Ok(None);
    };

    Ok(Some(PoiRecord {
        id: record.id,
        point: GeoPoint {
            lat: geometry.center.y,
            lon: geometry.center.x,
        },
        location: geometry.wkt,
        tags: record
            .tags
            .as_ref()
            .map(PoiRecord::tag_list)
            .unwrap_or_default(),
        level: record.level.unwrap_or_default(),
        area: geometry.area,
        name: record.name.unwrap_or_default(),
    }))
}

/// What assembling a relation produced.
enum RelationShape {
    Assembled(ResolvedGeometry),
    /// Ways were present but gave no usable shape; counts as a bad geometry.
    Failed,
    /// No way members at all; already reported as `NoWays`.
    WithoutWays,
}

fn relation_geometry<L>(
    record: &OsmRecord,
    lookup: &L,
    diagnostics: &dyn DiagnosticSink,
    report: &mut IndexReport,
) -> Result<RelationShape, StoreError>
where
    L: ItemLookup + ?Sized,
{
    let outcome = assemble_relation(record, lookup, diagnostics)?;
    if outcome.missing_ways() > 0 {
        report.missing_way_relations += 1;
    }
    Ok(match outcome {
        RelationGeometry::Resolved { geometry, .. } => RelationShape::Assembled(geometry),
        RelationGeometry::Invalid { reason, .. } => {
            report.invalid_relations += 1;
            if reason == InvalidGeometry::NoWays {
                report.no_way_relations += 1;
                RelationShape::WithoutWays
            } else {
                RelationShape::Failed
            }
        }
    })
}
