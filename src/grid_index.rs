use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use itertools::Itertools;
use smallvec::{smallvec, SmallVec};

use crate::error::{Error, Result};
use crate::geometry::{Point, Segment};
use crate::shape::{Shape, ShapeId};

/// A square cell of the grid, identified by the floor of its coordinates divided by the
/// granularity.
///
/// A cell owns no geometry: it is only a lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    pub cx: i64,
    pub cy: i64,
}

impl GridCell {
    pub fn new(cx: i64, cy: i64) -> Self {
        Self { cx, cy }
    }

    /// The cell containing `point`. Points on a cell border belong to the cell above/right of it.
    pub fn containing(point: &Point, granularity: f64) -> Self {
        Self {
            cx: (point.x / granularity).floor() as i64,
            cy: (point.y / granularity).floor() as i64,
        }
    }
}

/// A boundary segment stored in the index, along with where it comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedSegment {
    pub shape_id: ShapeId,
    /// Index of the ring within its shape.
    pub ring: usize,
    /// Index of the segment's first vertex within its ring.
    pub position: usize,
    pub segment: Segment,
}

/// Uniform grid over the plane, mapping each cell to the segments passing through it.
///
/// Segments are stored once in an arena, and cells refer to them by their index in the arena.
/// Cells are kept row by row (keyed by `(cy, cx)`) so that all the cells of a horizontal strip
/// can be visited with a single range lookup, and the segment indices of each cell are sorted
/// since segments are inserted in arena order.
///
/// Only occupied cells are stored, so the grid is unbounded.
#[derive(Debug, Clone)]
pub struct GridIndex {
    granularity: f64,
    segments: Vec<IndexedSegment>,
    cells: BTreeMap<(i64, i64), Vec<usize>>,
}

/// Largest absolute cell coordinate: beyond it, consecutive cells are no longer told apart by
/// `f64` arithmetic.
const MAX_CELL_COORDINATE: f64 = 9_007_199_254_740_992.; // 2^53

pub(crate) fn check_granularity(granularity: f64) -> Result<()> {
    if granularity.is_finite() && granularity > 0. {
        Ok(())
    } else {
        Err(Error::InvalidConfiguration(format!(
            "the granularity must be finite and strictly positive, got {granularity}"
        )))
    }
}

fn check_cell_range<A>(shape: &Shape<A>, granularity: f64) -> Result<()> {
    let out_of_range = shape
        .rings()
        .flatten()
        .find(|p| (p.x / granularity).abs().max((p.y / granularity).abs()) > MAX_CELL_COORDINATE);
    match out_of_range {
        None => Ok(()),
        Some(p) => Err(Error::InvalidConfiguration(format!(
            "the granularity {granularity} is too fine for vertex ({}, {}) of shape {}",
            p.x,
            p.y,
            shape.id()
        ))),
    }
}

/// Returns every cell the segment passes through, from the cell of `p0` to the cell of `p1`.
///
/// The cells are enumerated by walking along the segment and stepping into the neighboring cell
/// along whichever axis has its next cell border crossed first. When both borders are crossed at
/// once (the segment goes exactly through a cell corner), the two cells sharing that corner are
/// included as well. Each cell appears exactly once.
///
/// `granularity` must be strictly positive. A segment with a non-finite endpoint only gets the
/// cell of `p0`.
pub fn cells_for(segment: &Segment, granularity: f64) -> SmallVec<[GridCell; 8]> {
    let Segment { p0, p1 } = *segment;
    let start = GridCell::containing(&p0, granularity);
    let end = GridCell::containing(&p1, granularity);
    let mut cells: SmallVec<[GridCell; 8]> = smallvec![start];
    if start == end || !p0.is_finite() || !p1.is_finite() {
        return cells;
    }

    let (dx, dy) = (segment.dx(), segment.dy());
    let step_x = if dx > 0. { 1 } else { -1 };
    let step_y = if dy > 0. { 1 } else { -1 };
    // Parametric distance (t in [0, 1] along the segment) to the next border, and between
    // consecutive borders, on each axis.
    let first_border = |c: i64, step: i64, origin: f64, delta: f64| {
        if delta == 0. {
            f64::INFINITY
        } else {
            let border = if step > 0 { c + 1 } else { c };
            (border as f64 * granularity - origin) / delta
        }
    };
    let mut t_max_x = first_border(start.cx, step_x, p0.x, dx);
    let mut t_max_y = first_border(start.cy, step_y, p0.y, dy);
    let t_delta_x = granularity / dx.abs();
    let t_delta_y = granularity / dy.abs();

    let GridCell { mut cx, mut cy } = start;
    // Every step brings the current cell closer to `end` on at least one axis, and never moves
    // along an axis that is already aligned with `end`, so the walk always terminates there.
    while (cx, cy) != (end.cx, end.cy) {
        let move_x = cy == end.cy || (cx != end.cx && t_max_x < t_max_y);
        let move_y = cx == end.cx || (cy != end.cy && t_max_y < t_max_x);
        if move_x {
            cx += step_x;
            t_max_x += t_delta_x;
        } else if move_y {
            cy += step_y;
            t_max_y += t_delta_y;
        } else {
            // Through a corner
            cells.push(GridCell::new(cx + step_x, cy));
            cells.push(GridCell::new(cx, cy + step_y));
            cx += step_x;
            cy += step_y;
            t_max_x += t_delta_x;
            t_max_y += t_delta_y;
        }
        cells.push(GridCell::new(cx, cy));
    }
    cells
}

impl GridIndex {
    /// Builds the index of all the boundary segments of `shapes`.
    ///
    /// Degenerate (zero-length) segments are skipped.
    ///
    /// Fails if `granularity` is not strictly positive, if there are no shapes, if a shape is
    /// malformed (see [`Shape::validate`]), or if a vertex lies too far out for `granularity`
    /// (its cell coordinates would exceed 2^53).
    pub fn build<A>(shapes: &[Shape<A>], granularity: f64) -> Result<Self> {
        check_granularity(granularity)?;
        if shapes.is_empty() {
            return Err(Error::EmptyInput);
        }
        for shape in shapes {
            shape.validate()?;
            check_cell_range(shape, granularity)?;
        }

        let mut segments = Vec::new();
        let mut cells: BTreeMap<(i64, i64), Vec<usize>> = BTreeMap::new();
        for shape in shapes {
            for (ring, position, segment) in shape.segments() {
                if segment.is_degenerate() {
                    continue;
                }
                let idx = segments.len();
                segments.push(IndexedSegment {
                    shape_id: shape.id(),
                    ring,
                    position,
                    segment,
                });
                for GridCell { cx, cy } in cells_for(&segment, granularity) {
                    cells.entry((cy, cx)).or_default().push(idx);
                }
            }
        }

        let index = Self {
            granularity,
            segments,
            cells,
        };
        tracing::info!(
            shapes = shapes.len(),
            segments = index.segment_count(),
            cells = index.cell_count(),
            granularity,
            "Built grid index"
        );
        Ok(index)
    }

    pub fn granularity(&self) -> f64 {
        self.granularity
    }

    /// Number of indexed (non-degenerate) segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of occupied cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of occupied rows.
    pub fn row_count(&self) -> usize {
        self.cells.keys().map(|&(cy, _)| cy).dedup().count()
    }

    pub fn segments(&self) -> &[IndexedSegment] {
        &self.segments
    }

    /// The cells a segment would be indexed under.
    pub fn cells_for(&self, segment: &Segment) -> SmallVec<[GridCell; 8]> {
        cells_for(segment, self.granularity)
    }

    pub fn cell_of(&self, point: &Point) -> GridCell {
        GridCell::containing(point, self.granularity)
    }

    /// The row (`cy` of the cells) holding the ordinate `y`.
    pub fn row_of(&self, y: f64) -> i64 {
        (y / self.granularity).floor() as i64
    }

    /// The segments indexed under one cell, in arena order.
    pub fn segments_in(&self, cell: GridCell) -> impl Iterator<Item = &IndexedSegment> + '_ {
        self.cells
            .get(&(cell.cy, cell.cx))
            .into_iter()
            .flatten()
            .map(move |&idx| &self.segments[idx])
    }

    /// The segments indexed under any cell of row `cy`, each one once, in arena order.
    ///
    /// A segment spanning several cells of the row is listed in each of them; the per-cell lists
    /// are sorted so they are merged and deduplicated on the fly.
    pub fn row_segments(&self, cy: i64) -> impl Iterator<Item = &IndexedSegment> + '_ {
        self.rows_segments(cy..=cy)
    }

    /// Same as [`GridIndex::row_segments`], over several consecutive rows. An empty range gives
    /// no segment.
    pub fn rows_segments(
        &self,
        rows: RangeInclusive<i64>,
    ) -> impl Iterator<Item = &IndexedSegment> + '_ {
        let (first, last) = rows.into_inner();
        (first <= last)
            .then(|| self.cells.range((first, i64::MIN)..=(last, i64::MAX)))
            .into_iter()
            .flatten()
            .map(|(_, ids)| ids.iter().copied())
            .kmerge()
            .dedup()
            .map(move |idx| &self.segments[idx])
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn segment(x0: f64, y0: f64, x1: f64, y1: f64) -> Segment {
        Segment::new(Point::new(x0, y0), Point::new(x1, y1))
    }

    fn cells(coords: &[(i64, i64)]) -> Vec<GridCell> {
        coords.iter().map(|&(cx, cy)| GridCell::new(cx, cy)).collect()
    }

    fn square(id: ShapeId, x: f64, y: f64, side: f64) -> Shape {
        Shape::new(
            id,
            [vec![
                [x, y],
                [x + side, y],
                [x + side, y + side],
                [x, y + side],
                [x, y],
            ]],
        )
    }

    #[rstest]
    #[case(0.5, 0.5, (0, 0))]
    #[case(1., 1., (1, 1))]
    #[case(-0.5, -1.5, (-1, -2))]
    #[case(2.5, 7.1, (2, 7))]
    fn cell_containing_point(#[case] x: f64, #[case] y: f64, #[case] expected: (i64, i64)) {
        let (cx, cy) = expected;

        assert_eq!(GridCell::containing(&Point::new(x, y), 1.), GridCell::new(cx, cy));
    }

    #[test]
    fn segment_inside_one_cell() {
        let found = cells_for(&segment(0.1, 0.1, 0.9, 0.4), 1.);

        assert_eq!(found.to_vec(), cells(&[(0, 0)]));
    }

    #[test]
    fn horizontal_segment_spanning_several_cells() {
        let found = cells_for(&segment(0.5, 0.5, 3.5, 0.5), 1.);

        assert_eq!(found.to_vec(), cells(&[(0, 0), (1, 0), (2, 0), (3, 0)]));
    }

    #[test]
    fn slanted_segment_visits_cells_between_its_endpoints() {
        let found = cells_for(&segment(0.5, 0.2, 3.5, 1.2), 1.);

        assert_eq!(
            found.to_vec(),
            cells(&[(0, 0), (1, 0), (2, 0), (2, 1), (3, 1)])
        );
    }

    #[test]
    fn reversed_segment_visits_the_same_cells() {
        let mut forward = cells_for(&segment(0.5, 0.2, 3.5, 1.2), 1.).to_vec();
        let mut backward = cells_for(&segment(3.5, 1.2, 0.5, 0.2), 1.).to_vec();
        forward.sort();
        backward.sort();

        assert_eq!(forward, backward);
    }

    #[test]
    fn diagonal_through_corners_includes_touching_cells() {
        let found = cells_for(&segment(0.5, 0.5, 2.5, 2.5), 1.);

        assert_eq!(
            found.to_vec(),
            cells(&[(0, 0), (1, 0), (0, 1), (1, 1), (2, 1), (1, 2), (2, 2)])
        );
    }

    #[test]
    fn segment_in_negative_coordinates() {
        let found = cells_for(&segment(-1.5, -0.5, 0.5, -0.5), 1.);

        assert_eq!(found.to_vec(), cells(&[(-2, -1), (-1, -1), (0, -1)]));
    }

    #[test]
    fn long_segment_is_indexed_all_along() {
        let found = cells_for(&segment(0.5, 0.5, 100.5, 0.7), 1.);

        assert_eq!(found.len(), 101);
        assert!(found.iter().all(|cell| cell.cy == 0));
    }

    #[rstest]
    #[case(0.)]
    #[case(-1.)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn build_rejects_invalid_granularity(#[case] granularity: f64) {
        let shapes = [square(0, 0., 0., 4.)];

        let result = GridIndex::build(&shapes, granularity);

        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn build_rejects_malformed_shapes() {
        let shape = Shape::new(
            0,
            [vec![[f64::NAN, 0.], [5., 5.], [0., 5.], [f64::NAN, 0.]]],
        );

        let result = GridIndex::build(&[shape], 1.);

        assert!(matches!(
            result,
            Err(Error::MalformedShape { shape_id: 0, .. })
        ));
    }

    #[rstest]
    #[case(1e20, 1.)]
    #[case(1., 1e-300)]
    #[case(-1e300, 1e-10)]
    fn build_rejects_cells_out_of_range(#[case] far: f64, #[case] granularity: f64) {
        let shapes = [square(0, 0., 0., 4.), square(1, far, 0., far.abs() / 2.)];

        let result = GridIndex::build(&shapes, granularity);

        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn far_vertices_with_a_coarse_granularity_are_fine() -> Result<()> {
        let index = GridIndex::build(&[square(0, 1e20, 1e20, 1e7)], 1e6)?;

        assert_eq!(index.segment_count(), 4);

        Ok(())
    }

    #[rstest]
    #[case(segment(f64::NAN, 0., 5., 5.))]
    #[case(segment(0., 0., f64::INFINITY, 5.))]
    #[case(segment(0., f64::NEG_INFINITY, 0., 0.))]
    fn segment_with_a_non_finite_end_gets_a_single_cell(#[case] seg: Segment) {
        let found = cells_for(&seg, 1.);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0], GridCell::containing(&seg.p0, 1.));
    }

    #[test]
    fn empty_row_range_has_no_segments() -> Result<()> {
        let index = GridIndex::build(&[square(0, 0., 0., 4.)], 1.)?;

        assert_eq!(index.rows_segments(3..=2).count(), 0);
        assert_eq!(index.rows_segments(-1..=0).count(), 3);
        assert_eq!(index.rows_segments(i64::MIN..=i64::MAX).count(), 4);

        Ok(())
    }

    #[test]
    fn build_rejects_empty_input() {
        let shapes: [Shape; 0] = [];

        assert_eq!(GridIndex::build(&shapes, 1.).unwrap_err(), Error::EmptyInput);
    }

    #[test]
    fn build_indexes_each_segment_once_per_cell() -> Result<()> {
        let shapes = [square(0, 0., 0., 4.)];
        let index = GridIndex::build(&shapes, 1.)?;

        assert_eq!(index.segment_count(), 4);
        // 4 sides of 5 cells each, corners are shared
        assert_eq!(index.cell_count(), 16);
        assert_eq!(index.row_count(), 5);
        for segment in index.segments() {
            for cell in index.cells_for(&segment.segment) {
                let occurrences = index
                    .segments_in(cell)
                    .filter(|other| *other == segment)
                    .count();
                assert_eq!(occurrences, 1);
            }
        }

        Ok(())
    }

    #[test]
    fn degenerate_segments_are_not_indexed() -> Result<()> {
        let shape = Shape::new(
            0,
            [vec![[0., 0.], [1., 0.], [1., 0.], [1., 1.], [0., 0.]]],
        );
        let index = GridIndex::build(&[shape], 1.)?;

        assert_eq!(index.segment_count(), 3);
        assert!(index.segments().iter().all(|s| !s.segment.is_degenerate()));
        // Provenance still refers to the original vertex positions
        assert_eq!(
            index.segments().iter().map(|s| s.position).collect_vec(),
            vec![0, 2, 3]
        );

        Ok(())
    }

    #[test]
    fn row_segments_are_deduplicated() -> Result<()> {
        let shapes = [square(0, 0., 0., 4.), square(1, 10., 10., 1.)];
        let index = GridIndex::build(&shapes, 1.)?;

        // Bottom side spans 5 cells of row 0, left and right sides one each
        let row = index.row_segments(0).collect_vec();

        assert_eq!(row.len(), 3);
        assert!(row.iter().all(|s| s.shape_id == 0));
        assert_eq!(row.iter().map(|s| s.position).collect_vec(), vec![0, 1, 3]);
        assert_eq!(index.row_segments(7).count(), 0);
        assert_eq!(
            index.row_segments(10).map(|s| s.shape_id).dedup().collect_vec(),
            vec![1]
        );

        Ok(())
    }

    prop_compose! {
        fn coords_in_range(min: f64, max: f64)(x in min..max, y in min..max) -> Point {
           Point::new(x, y)
        }
    }

    proptest! {
        #[test]
        fn cells_for_covers_endpoints_without_duplicates(
            p0 in coords_in_range(-50., 50.),
            p1 in coords_in_range(-50., 50.),
            granularity in 0.1..5.0f64,
        ) {
            let seg = Segment::new(p0, p1);

            let found = cells_for(&seg, granularity);

            prop_assert!(found.contains(&GridCell::containing(&p0, granularity)));
            prop_assert!(found.contains(&GridCell::containing(&p1, granularity)));
            prop_assert_eq!(found.iter().unique().count(), found.len());
            // The walk never jumps over a cell
            for (a, b) in found.iter().tuple_windows() {
                prop_assert!((a.cx - b.cx).abs() <= 1 && (a.cy - b.cy).abs() <= 1);
            }
            // Every row between the endpoints is visited, so that any ray crossing the segment
            // finds it in its strip
            let (r0, r1) = (found[0].cy, found[found.len() - 1].cy);
            for cy in r0.min(r1)..=r0.max(r1) {
                prop_assert!(found.iter().any(|cell| cell.cy == cy));
            }
        }
    }
}
