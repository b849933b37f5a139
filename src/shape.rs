use itertools::Itertools;

use crate::error::{Error, Result};
use crate::geometry::{Point, Segment};
use crate::simplify::simplify;

/// Identifier of a shape, chosen by whoever loads the shapes.
pub type ShapeId = usize;

/// A polygonal shape bounded by one or more closed rings.
///
/// Rings may be disjoint parts or holes: no distinction is made between them since parity counting
/// over all the rings of a shape handles both.
///
/// The rings are stored back to back in a single point buffer, with `offsets[i]..offsets[i + 1]`
/// delimiting ring `i`.
///
/// `A` is an opaque attribute record owned by the caller (a name, a row of a dataset...). It is
/// carried along for display purposes and never inspected.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape<A = ()> {
    id: ShapeId,
    points: Vec<Point>,
    offsets: Vec<usize>,
    attributes: A,
}

/// Iterator over the rings of a [`Shape`].
pub struct Rings<'a> {
    points: &'a [Point],
    offsets: &'a [usize],
    idx: usize,
}

impl<'a> Iterator for Rings<'a> {
    type Item = &'a [Point];

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.idx;
        if idx + 1 >= self.offsets.len() {
            return None;
        }
        self.idx += 1;
        // Offsets are built alongside the points so there cannot be bounds issues
        Some(&self.points[self.offsets[idx]..self.offsets[idx + 1]])
    }
}

impl Shape<()> {
    /// Creates a shape without attributes.
    pub fn new<R, P>(id: ShapeId, rings: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = P>,
        P: Into<Point>,
    {
        Self::with_attributes(id, rings, ())
    }
}

impl<A> Shape<A> {
    /// Creates a shape carrying an attribute record.
    pub fn with_attributes<R, P>(id: ShapeId, rings: R, attributes: A) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = P>,
        P: Into<Point>,
    {
        let mut points = Vec::new();
        let mut offsets = vec![0];
        for ring in rings {
            points.extend(ring.into_iter().map(Into::into));
            offsets.push(points.len());
        }
        Self {
            id,
            points,
            offsets,
            attributes,
        }
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn attributes(&self) -> &A {
        &self.attributes
    }

    pub fn ring_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Total number of vertices, over all the rings.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn rings(&self) -> Rings<'_> {
        Rings {
            points: &self.points,
            offsets: &self.offsets,
            idx: 0,
        }
    }

    /// Iterates over the boundary segments as `(ring index, position in ring, segment)`.
    ///
    /// Degenerate segments are included.
    pub fn segments(&self) -> impl Iterator<Item = (usize, usize, Segment)> + '_ {
        self.rings().enumerate().flat_map(|(ring_idx, ring)| {
            ring.iter()
                .tuple_windows()
                .enumerate()
                .map(move |(pos, (&p0, &p1))| (ring_idx, pos, Segment::new(p0, p1)))
        })
    }

    /// Checks that the shape is a usable polygon boundary.
    ///
    /// Every ring must be closed (first point equal to the last), have at least 4 points and at
    /// least 3 distinct vertices, and only finite coordinates. A shape without any ring is
    /// rejected too.
    pub fn validate(&self) -> Result<()> {
        let malformed = |reason: String| Error::MalformedShape {
            shape_id: self.id,
            reason,
        };
        if self.ring_count() == 0 {
            return Err(malformed("the shape has no ring".to_string()));
        }
        for (ring_idx, ring) in self.rings().enumerate() {
            if let Some(p) = ring.iter().find(|p| !p.is_finite()) {
                return Err(malformed(format!(
                    "ring {ring_idx} has a non-finite vertex ({}, {})",
                    p.x, p.y
                )));
            }
            if ring.len() < 4 {
                return Err(malformed(format!(
                    "ring {ring_idx} has {} points, at least 4 are needed",
                    ring.len()
                )));
            }
            if ring.first() != ring.last() {
                return Err(malformed(format!("ring {ring_idx} is not closed")));
            }
            // Adding 0 folds -0.0 onto 0.0 so that both hash the same
            let distinct = ring[..ring.len() - 1]
                .iter()
                .map(|p| ((p.x + 0.).to_bits(), (p.y + 0.).to_bits()))
                .unique()
                .count();
            if distinct < 3 {
                return Err(malformed(format!(
                    "ring {ring_idx} has {distinct} distinct vertices, at least 3 are needed"
                )));
            }
        }
        Ok(())
    }

    /// Simplifies every ring with [`simplify`], keeping the identifier and the attributes.
    pub fn simplified(self, min_separation: f64) -> Self {
        let rings = self
            .rings()
            .map(|ring| simplify(ring, min_separation))
            .collect_vec();
        Self::with_attributes(self.id, rings, self.attributes)
    }
}
