//! Point location in large polygonal boundary datasets.
//!
//! Given a set of shapes (administrative regions, for instance), each bounded by one or more
//! closed rings, this crate finds the shapes containing a query point and reports the boundary
//! segments crossed by a horizontal ray cast from it.
//!
//! Testing a point against every boundary segment is too slow for real datasets, so the engine
//! works in three steps:
//! - the rings are thinned out by [`simplify`], which drops vertices lying too close to the
//!   previous kept one,
//! - the remaining segments are binned into a uniform grid, the [`GridIndex`], under every cell
//!   they pass through,
//! - a query only looks at the segments of the grid row containing the point, and counts the
//!   crossings with a ray cast towards +x: an odd count means the point is inside
//!   (see [`RayCaster`]).
//!
//! Coordinates are treated as planar.
//!
//! ```
//! use shapeloc::{EngineConfig, Point, QueryEngine, Shape};
//!
//! let square = Shape::new(0, [vec![[0., 0.], [4., 0.], [4., 4.], [0., 4.], [0., 0.]]]);
//! let config = EngineConfig::default().with_granularity(1.);
//! let engine = QueryEngine::build(vec![square], config).unwrap();
//!
//! let result = engine.locate(Point::new(2., 2.)).unwrap();
//! assert_eq!(result.inside_shapes().collect::<Vec<_>>(), vec![(0, 1)]);
//! ```
mod debug_sink;
mod engine;
mod error;
mod geometry;
mod grid_index;
mod point_locator;
mod ray_caster;
mod shape;
mod simplify;

pub use debug_sink::{DebugSink, Feature, Outline, Recording, RecordingSink};
pub use engine::{EngineConfig, QueryEngine};
pub use error::{Error, Result};
pub use geometry::{BoundingBox, Point, Segment};
pub use grid_index::{cells_for, GridCell, GridIndex, IndexedSegment};
pub use point_locator::PointLocator;
pub use ray_caster::{BoundaryPolicy, QueryResult, RayCaster, ShapeHit};
pub use shape::{Rings, Shape, ShapeId};
pub use simplify::simplify;
