use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::geometry::{BoundingBox, Point};
use crate::grid_index::{GridIndex, IndexedSegment};
use crate::shape::ShapeId;

/// What to report for a query point lying on the boundary of a shape.
///
/// Parity counting alone gives an arbitrary answer for such points (it depends on which side of
/// the point the boundary runs), hence the explicit choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryPolicy {
    /// Points on the boundary are inside the shape.
    #[default]
    Inside,
    /// Points on the boundary get whatever verdict the parity count gives.
    Parity,
}

/// The verdict for one shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeHit {
    pub shape_id: ShapeId,
    /// Number of boundary segments of the shape crossed by the probe ray.
    pub intersection_count: usize,
    /// The query point lies on one of the shape's segments, within tolerance.
    pub on_boundary: bool,
    pub is_inside: bool,
    /// Bounding box of the shape's candidate segments.
    pub candidate_bounds: BoundingBox,
}

impl ShapeHit {
    fn empty(shape_id: ShapeId, candidate_bounds: BoundingBox) -> Self {
        Self {
            shape_id,
            intersection_count: 0,
            on_boundary: false,
            is_inside: false,
            candidate_bounds,
        }
    }
}

/// The outcome of locating one query point.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub point: Point,
    /// One record per shape having at least one candidate segment, or lying within tolerance of
    /// the point, sorted by shape identifier.
    pub shapes: Vec<ShapeHit>,
    /// Every segment examined, in index order.
    pub candidates: Vec<IndexedSegment>,
    /// The candidates actually crossed by the probe ray.
    pub intersections: Vec<IndexedSegment>,
}

impl QueryResult {
    /// The record of a shape, if it had any candidate segment.
    pub fn shape(&self, shape_id: ShapeId) -> Option<&ShapeHit> {
        self.shapes
            .binary_search_by_key(&shape_id, |hit| hit.shape_id)
            .ok()
            .map(|idx| &self.shapes[idx])
    }

    /// Number of crossings with the boundary of a shape, `0` for shapes that were not candidates.
    pub fn intersection_count(&self, shape_id: ShapeId) -> usize {
        self.shape(shape_id).map_or(0, |hit| hit.intersection_count)
    }

    pub fn is_inside(&self, shape_id: ShapeId) -> bool {
        self.shape(shape_id).map_or(false, |hit| hit.is_inside)
    }

    /// The shapes containing the point, with their intersection counts.
    ///
    /// Overlapping shapes are all reported: no single owner is picked.
    pub fn inside_shapes(&self) -> impl Iterator<Item = (ShapeId, usize)> + '_ {
        self.shapes
            .iter()
            .filter(|hit| hit.is_inside)
            .map(|hit| (hit.shape_id, hit.intersection_count))
    }
}

/// Point-in-polygon resolution by horizontal ray casting.
///
/// A ray is cast from the query point towards +x, and the boundary segments it crosses are
/// counted per shape: an odd count means the point is inside. Only the segments indexed in the
/// grid row of the query point can cross the ray, so only those are examined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCaster {
    pub boundary: BoundaryPolicy,
    /// Maximal distance between the query point and a segment for the point to be on it.
    pub tolerance: f64,
}

impl Default for RayCaster {
    fn default() -> Self {
        Self {
            boundary: BoundaryPolicy::default(),
            tolerance: 1e-9,
        }
    }
}

impl RayCaster {
    pub fn new(boundary: BoundaryPolicy, tolerance: f64) -> Self {
        Self {
            boundary,
            tolerance,
        }
    }

    /// Locates `point` among the shapes of `index`.
    ///
    /// The candidates are all the segments of the grid row containing the point, since the ray
    /// extends indefinitely along that row. When the point is within `tolerance` of a row border,
    /// the segments of the neighboring rows are also tested for the point lying on them, but
    /// never counted as crossings.
    ///
    /// Fails only if the point has a non-finite coordinate.
    pub fn locate(&self, point: Point, index: &GridIndex) -> Result<QueryResult> {
        check_query(&point)?;
        let row = index.row_of(point.y);
        let (lowest, highest) = if self.tolerance > 0. {
            (
                index.row_of(point.y - self.tolerance),
                index.row_of(point.y + self.tolerance),
            )
        } else {
            (row, row)
        };
        let near = index
            .rows_segments(lowest..=row.saturating_sub(1))
            .chain(index.rows_segments(row.saturating_add(1)..=highest));
        let result = self.resolve(point, index.row_segments(row), near);
        tracing::trace!(
            x = point.x,
            y = point.y,
            row,
            candidates = result.candidates.len(),
            intersections = result.intersections.len(),
            "Located point"
        );
        Ok(result)
    }

    /// Same as [`RayCaster::locate`], but examines every segment of the index.
    ///
    /// This is the brute-force reference the grid lookup is measured against.
    pub fn locate_exhaustive(&self, point: Point, index: &GridIndex) -> Result<QueryResult> {
        check_query(&point)?;
        Ok(self.resolve(point, index.segments().iter(), std::iter::empty()))
    }

    /// Counts the crossings with `candidates`, and looks for `point` on both `candidates` and
    /// `near` segments.
    fn resolve<'a, I, J>(&self, point: Point, candidates: I, near: J) -> QueryResult
    where
        I: Iterator<Item = &'a IndexedSegment>,
        J: Iterator<Item = &'a IndexedSegment>,
    {
        let mut hits: BTreeMap<ShapeId, ShapeHit> = BTreeMap::new();
        let mut examined = Vec::new();
        let mut intersections = Vec::new();
        for indexed in candidates {
            examined.push(*indexed);
            let segment = &indexed.segment;
            let bounds = segment.bounds();
            let hit = hits
                .entry(indexed.shape_id)
                .or_insert_with(|| ShapeHit::empty(indexed.shape_id, bounds));
            hit.candidate_bounds.merge(&bounds);
            if !hit.on_boundary && segment.contains(&point, self.tolerance) {
                hit.on_boundary = true;
            }
            if segment.ray_crossing(&point).is_some() {
                hit.intersection_count += 1;
                intersections.push(*indexed);
            }
        }
        for indexed in near {
            if indexed.segment.contains(&point, self.tolerance) {
                hits
                    .entry(indexed.shape_id)
                    .or_insert_with(|| ShapeHit::empty(indexed.shape_id, indexed.segment.bounds()))
                    .on_boundary = true;
            }
        }

        let shapes = hits
            .into_values()
            .map(|mut hit| {
                let odd = hit.intersection_count % 2 == 1;
                hit.is_inside = match self.boundary {
                    BoundaryPolicy::Inside => odd || hit.on_boundary,
                    BoundaryPolicy::Parity => odd,
                };
                hit
            })
            .collect();

        QueryResult {
            point,
            shapes,
            candidates: examined,
            intersections,
        }
    }
}

fn check_query(point: &Point) -> Result<()> {
    if point.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidQuery {
            x: point.x,
            y: point.y,
        })
    }
}
