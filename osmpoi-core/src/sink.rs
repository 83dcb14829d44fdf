//! Records handed to the external indexing collaborator.

use std::error::Error as StdError;

use thiserror::Error;

use crate::{ElementId, PoiLevel, Tags};

/// Representative point of a POI.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

/// A single key/value tag as exposed to sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoiTag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

/// A classified, geometrically resolved point of interest.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoiRecord {
    /// Element identifier; its string form is the sink's primary key.
    pub id: ElementId,
    /// Display name.
    pub name: String,
    /// Representative point.
    pub point: GeoPoint,
    /// Geometry as Well-Known Text, longitude first.
    pub location: String,
    /// Retained tags in key order.
    pub tags: Vec<PoiTag>,
    /// Significance level.
    pub level: PoiLevel,
    /// Planar area of the geometry's bounding box, in square degrees.
    pub area: f64,
}

impl PoiRecord {
    /// Convert a tag map into the ordered tag list carried by records.
    #[must_use]
    pub fn tag_list(tags: &Tags) -> Vec<PoiTag> {
        tags.iter()
            .map(|(key, value)| PoiTag {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }
}

/// A record refused by the sink within an otherwise accepted batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    /// Identifier of the refused record.
    pub id: ElementId,
    /// Reason reported by the sink.
    pub reason: String,
}

/// Per-record outcome of a successful submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkReport {
    /// Records the sink refused individually.
    pub rejected: Vec<RejectedRecord>,
}

/// Errors raised by a [`PoiSink`] for a whole batch.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink failed in a way that may clear up on retry.
    #[error("sink unavailable")]
    Unavailable {
        /// Underlying failure.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    /// The sink refused the batch; some record in it is poisoned.
    #[error("sink rejected the batch: {reason}")]
    Rejected {
        /// Reason reported by the sink.
        reason: String,
    },
}

/// Destination for finished POI records.
///
/// # Examples
///
/// ```
/// use osmpoi_core::{PoiRecord, PoiSink, SinkError, SinkReport};
///
/// struct CountingSink(usize);
///
/// impl PoiSink for CountingSink {
///     fn submit(&mut self, batch: &[PoiRecord]) -> Result<SinkReport, SinkError> {
///         self.0 += batch.len();
///         Ok(SinkReport::default())
///     }
/// }
///
/// let mut sink = CountingSink(0);
/// sink.submit(&[]).expect("empty batches are accepted");
/// assert_eq!(sink.0, 0);
/// ```
pub trait PoiSink {
    /// Submit a batch of records.
    ///
    /// Returning `Ok` means every record not listed in
    /// [`SinkReport::rejected`] was indexed.
    fn submit(&mut self, batch: &[PoiRecord]) -> Result<SinkReport, SinkError>;
}

impl<T: PoiSink + ?Sized> PoiSink for &mut T {
    fn submit(&mut self, batch: &[PoiRecord]) -> Result<SinkReport, SinkError> {
        (**self).submit(batch)
    }
}
