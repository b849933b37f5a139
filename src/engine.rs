use std::sync::Arc;

use itertools::Itertools;

use crate::debug_sink::{DebugSink, Feature, Outline};
use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::grid_index::{check_granularity, GridIndex};
use crate::point_locator::PointLocator;
use crate::ray_caster::{BoundaryPolicy, QueryResult, RayCaster};
use crate::shape::{Shape, ShapeId};

/// Parameters of a [`QueryEngine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Side of the square grid cells.
    pub granularity: f64,
    /// Minimal distance between consecutive vertices kept by the simplification. `0` disables it.
    pub min_separation: f64,
    pub boundary: BoundaryPolicy,
    /// Distance under which a query point is considered to be on a boundary segment.
    pub tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            granularity: 0.1,
            min_separation: 1e-2,
            boundary: BoundaryPolicy::Inside,
            tolerance: 1e-9,
        }
    }
}

impl EngineConfig {
    pub fn with_granularity(mut self, granularity: f64) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_min_separation(mut self, min_separation: f64) -> Self {
        self.min_separation = min_separation;
        self
    }

    pub fn with_boundary(mut self, boundary: BoundaryPolicy) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Checks that every parameter is in its valid range.
    pub fn validate(&self) -> Result<()> {
        check_granularity(self.granularity)?;
        if !(self.min_separation >= 0.) {
            return Err(Error::InvalidConfiguration(format!(
                "the minimum separation must be non-negative, got {}",
                self.min_separation
            )));
        }
        if !(self.tolerance >= 0.) {
            return Err(Error::InvalidConfiguration(format!(
                "the boundary tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    fn ray_caster(&self) -> RayCaster {
        RayCaster::new(self.boundary, self.tolerance)
    }
}

/// Point location over a fixed set of shapes.
///
/// Building the engine validates and simplifies the shapes, then indexes their boundaries in a
/// [`GridIndex`]. After that everything is read-only: queries take `&self` and can run
/// concurrently. Changing the granularity takes `&mut self`, so it can never overlap with a query.
pub struct QueryEngine<A = ()> {
    config: EngineConfig,
    /// Sorted by identifier.
    shapes: Vec<Shape<A>>,
    index: GridIndex,
    sink: Option<Arc<dyn DebugSink>>,
}

impl<A> QueryEngine<A> {
    /// Builds an engine for `shapes`.
    ///
    /// Fails on an invalid configuration, an empty set of shapes, a malformed shape or a shape
    /// identifier used twice. No shape is ever skipped: any of these errors fails the whole build.
    pub fn build(shapes: Vec<Shape<A>>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        if shapes.is_empty() {
            return Err(Error::EmptyInput);
        }
        for shape in &shapes {
            shape.validate()?;
        }

        let mut shapes = shapes;
        shapes.sort_by_key(Shape::id);
        if let Some((duplicate, _)) = shapes
            .iter()
            .map(Shape::id)
            .tuple_windows()
            .find(|(a, b)| a == b)
        {
            return Err(Error::DuplicateShapeId(duplicate));
        }

        let shapes = shapes
            .into_iter()
            .map(|shape| {
                let before = shape.point_count();
                let shape = shape.simplified(config.min_separation);
                tracing::debug!(
                    shape_id = shape.id(),
                    before,
                    after = shape.point_count(),
                    "Simplified shape"
                );
                shape
            })
            .collect_vec();

        let index = GridIndex::build(&shapes, config.granularity)?;
        Ok(Self {
            config,
            shapes,
            index,
            sink: None,
        })
    }

    /// Injects a sink receiving the debug output of every subsequent query.
    pub fn with_debug_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn index(&self) -> &GridIndex {
        &self.index
    }

    /// The simplified shapes, sorted by identifier.
    pub fn shapes(&self) -> &[Shape<A>] {
        &self.shapes
    }

    /// Looks up a (simplified) shape, e.g. to display its attributes.
    pub fn shape(&self, shape_id: ShapeId) -> Option<&Shape<A>> {
        self.shapes
            .binary_search_by_key(&shape_id, Shape::id)
            .ok()
            .map(|idx| &self.shapes[idx])
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Number of vertices left after simplification.
    pub fn point_count(&self) -> usize {
        self.shapes.iter().map(Shape::point_count).sum()
    }

    /// Locates `point` among the shapes.
    ///
    /// Fails only if the point has a non-finite coordinate. A point outside of every shape gives a
    /// result with no enclosing shape.
    pub fn locate(&self, point: Point) -> Result<QueryResult> {
        let result = self.config.ray_caster().locate(point, &self.index)?;
        if let Some(sink) = &self.sink {
            self.emit_debug(sink.as_ref(), &result);
        }
        Ok(result)
    }

    /// Rebuilds the index with another granularity.
    ///
    /// On failure the engine is left untouched.
    pub fn set_granularity(&mut self, granularity: f64) -> Result<()> {
        self.index = GridIndex::build(&self.shapes, granularity)?;
        self.config.granularity = granularity;
        Ok(())
    }

    fn emit_debug(&self, sink: &dyn DebugSink, result: &QueryResult) {
        let outlines = self
            .shapes
            .iter()
            .flat_map(|shape| {
                shape.rings().enumerate().map(move |(ring, points)| Outline {
                    shape_id: shape.id(),
                    ring,
                    points: points.to_vec(),
                })
            })
            .collect_vec();
        sink.emit_outlines(&outlines);
        sink.emit_candidates(&result.candidates);
        sink.emit_actual(&result.intersections);

        let marker = Feature::QueryMarker {
            center: result.point,
            half_size: self.config.granularity / 2.,
        };
        let features = std::iter::once(marker)
            .chain(result.shapes.iter().map(|hit| Feature::CandidateBounds {
                shape_id: hit.shape_id,
                bounds: hit.candidate_bounds,
            }))
            .collect_vec();
        sink.emit_features(&features);
    }
}

impl<A: Sync> PointLocator for QueryEngine<A> {
    fn locate_one(&self, point: Point) -> Result<QueryResult> {
        self.locate(point)
    }
}
