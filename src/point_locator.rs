use rayon::prelude::*;

use crate::error::Result;
use crate::geometry::Point;
use crate::ray_caster::QueryResult;

/// A trait to locate one or several query points among a set of shapes.
pub trait PointLocator {
    /// Locates one query point.
    fn locate_one(&self, point: Point) -> Result<QueryResult>;

    /// Locates several query points.
    fn locate_many(&self, points: &[Point]) -> Vec<Result<QueryResult>> {
        points.iter().map(|&point| self.locate_one(point)).collect()
    }

    /// Locates several query points in parallel.
    ///
    /// The results are in the same order as the query points.
    fn par_locate_many(&self, points: &[Point]) -> Vec<Result<QueryResult>>
    where
        Self: std::marker::Sync,
    {
        points
            .par_iter()
            .map(|&point| self.locate_one(point))
            .collect()
    }
}
