//! Ring stitching over unordered, arbitrarily oriented way fragments.

use std::collections::{HashSet, VecDeque};

use geo::Coord;

/// A resolved node: its id and coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Node id; ring closure is decided on ids, not coordinates.
    pub id: u64,
    /// Longitude (`x`) and latitude (`y`).
    pub coord: Coord,
}

/// One member way with its resolved vertices in way order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Way id.
    pub way: u64,
    /// Resolved vertices; never empty once in the worklist.
    pub vertices: Vec<Vertex>,
}

/// What to do when an open chain finds no connecting fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosurePolicy {
    /// Close the chain on its first vertex and keep going.
    ForceClose,
    /// Emit the chain as a line if it was the last fragment, else give up.
    LinearFallback,
}

/// Notable events raised while stitching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StitchEvent {
    /// A chain seeded by `way` was force-closed.
    ForcedPatch {
        /// Seed way of the chain.
        way: u64,
    },
    /// A closed ring seeded by `way` was dropped for having fewer than three
    /// distinct vertices.
    TooFewPoints {
        /// Seed way of the ring.
        way: u64,
        /// Distinct vertices in the ring.
        points: usize,
    },
}

/// Result of [`stitch_rings`].
#[derive(Debug, Clone, PartialEq)]
pub enum Stitched {
    /// Closed rings, each with first vertex equal to last.
    Rings(Vec<Vec<Vertex>>),
    /// A single open chain that could not be closed.
    LineString(Vec<Vertex>),
    /// An open chain found no partner while other fragments remained.
    Unconnected {
        /// Seed way of the chain.
        way: u64,
        /// First node id of the chain.
        first: u64,
        /// Last node id of the chain.
        last: u64,
    },
}

/// Stitch fragments into closed rings.
///
/// Fragments are consumed from an owned worklist in member order. Each chain
/// grows by splicing in the first remaining fragment that shares an endpoint
/// with it, reversing the fragment where needed, until its first and last
/// node ids agree. Fragments without vertices are ignored.
pub fn stitch_rings(
    fragments: Vec<Fragment>,
    policy: ClosurePolicy,
    mut on_event: impl FnMut(StitchEvent),
) -> Stitched {
    let mut worklist: VecDeque<Fragment> = fragments
        .into_iter()
        .filter(|fragment| !fragment.vertices.is_empty())
        .collect();
    let mut rings = Vec::new();

    while let Some(Fragment { way, vertices }) = worklist.pop_front() {
        let mut chain = vertices;
        while let Some((first, last)) = open_ends(&chain) {
            let partner = worklist
                .iter()
                .position(|candidate| touches(candidate, first.id, last.id));
            let Some(partner) = partner.and_then(|index| worklist.remove(index)) else {
                match policy {
                    ClosurePolicy::ForceClose => {
                        on_event(StitchEvent::ForcedPatch { way });
                        chain.push(first);
                        continue;
                    }
                    ClosurePolicy::LinearFallback if worklist.is_empty() => {
                        return Stitched::LineString(chain);
                    }
                    ClosurePolicy::LinearFallback => {
                        return Stitched::Unconnected {
                            way,
                            first: first.id,
                            last: last.id,
                        };
                    }
                }
            };
            splice(&mut chain, partner.vertices);
        }

        let points = distinct_points(&chain);
        if points < 3 {
            on_event(StitchEvent::TooFewPoints { way, points });
        } else {
            rings.push(chain);
        }
    }

    Stitched::Rings(rings)
}

fn open_ends(chain: &[Vertex]) -> Option<(Vertex, Vertex)> {
    let (first, last) = (chain.first()?, chain.last()?);
    (first.id != last.id).then_some((*first, *last))
}

fn touches(candidate: &Fragment, first: u64, last: u64) -> bool {
    let (Some(start), Some(end)) = (candidate.vertices.first(), candidate.vertices.last()) else {
        return false;
    };
    [start.id, end.id]
        .iter()
        .any(|id| *id == first || *id == last)
}

/// Join `partner` onto `chain`, orienting it so shared endpoints meet once.
fn splice(chain: &mut Vec<Vertex>, mut partner: Vec<Vertex>) {
    let (Some(first), Some(last)) = (chain.first().map(|v| v.id), chain.last().map(|v| v.id))
    else {
        return;
    };
    let (Some(start), Some(end)) = (partner.first().map(|v| v.id), partner.last().map(|v| v.id))
    else {
        return;
    };

    if first == end {
        // partner runs into our start
        partner.pop();
        chain.splice(0..0, partner);
    } else if last == start {
        chain.extend(partner.into_iter().skip(1));
    } else if last == end {
        // covers both ends matching too: reversed it closes the ring
        partner.pop();
        chain.extend(partner.into_iter().rev());
    } else if first == start {
        partner.reverse();
        partner.pop();
        chain.splice(0..0, partner);
    }
}

fn distinct_points(ring: &[Vertex]) -> usize {
    ring.iter().map(|v| v.id).collect::<HashSet<_>>().len()
}
