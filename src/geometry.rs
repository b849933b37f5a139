/// A point of the 2D plane.
///
/// Coordinates are treated as planar: `x` is longitude-like and `y` is latitude-like, but no
/// geodesic correction is ever applied.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl From<&Point> for [f64; 2] {
    fn from(val: &Point) -> Self {
        [val.x, val.y]
    }
}

impl From<Point> for [f64; 2] {
    fn from(val: Point) -> Self {
        (&val).into()
    }
}

impl From<&[f64; 2]> for Point {
    fn from(value: &[f64; 2]) -> Self {
        Self {
            x: value[0],
            y: value[1],
        }
    }
}

impl From<[f64; 2]> for Point {
    fn from(value: [f64; 2]) -> Self {
        Self::from(&value)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Positioning of a `Point` with respect to a line.
#[derive(Debug, PartialEq)]
pub(crate) enum Positioning {
    Left,
    On,
    Right,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns `true` if both coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Tests if a point is Left|On|Right of the infinite line carrying `segment`.
    ///
    /// The point is `On` the line when its perpendicular distance to it is at most `tolerance`.
    pub(crate) fn position(&self, segment: &Segment, tolerance: f64) -> Positioning {
        let Self { x: x0, y: y0 } = *self;
        let Point { x: x1, y: y1 } = segment.p0;
        let Point { x: x2, y: y2 } = segment.p1;
        let cross = (x2 - x1) * (y0 - y1) - (x0 - x1) * (y2 - y1);
        if cross.abs() <= tolerance * segment.length() {
            Positioning::On
        } else if cross > 0. {
            Positioning::Left
        } else {
            Positioning::Right
        }
    }
}

/// A directed boundary segment, from a vertex to the next one in its ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub p0: Point,
    pub p1: Point,
}

impl Segment {
    pub fn new(p0: Point, p1: Point) -> Self {
        Self { p0, p1 }
    }

    pub fn dx(&self) -> f64 {
        self.p1.x - self.p0.x
    }

    pub fn dy(&self) -> f64 {
        self.p1.y - self.p0.y
    }

    pub fn length(&self) -> f64 {
        self.p0.distance(&self.p1)
    }

    /// A zero-length segment. These are never indexed.
    pub fn is_degenerate(&self) -> bool {
        self.p0 == self.p1
    }

    pub fn is_horizontal(&self) -> bool {
        self.p0.y == self.p1.y
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_corners(self.p0, self.p1)
    }

    /// Returns the x coordinate at which the horizontal ray cast from `point` towards +x crosses
    /// this segment, if it does.
    ///
    /// The y extent is tested half-open (`ymin <= y < ymax`), so a ray passing exactly through
    /// the vertex shared by two consecutive segments is counted once. Horizontal segments never
    /// cross.
    pub fn ray_crossing(&self, point: &Point) -> Option<f64> {
        let (ymin, ymax) = if self.p0.y <= self.p1.y {
            (self.p0.y, self.p1.y)
        } else {
            (self.p1.y, self.p0.y)
        };
        if !(ymin <= point.y && point.y < ymax) {
            return None;
        }
        // The half-open test above already excludes horizontal segments, which keeps the
        // division below safe.
        let x = self.p0.x + (point.y - self.p0.y) * self.dx() / self.dy();
        (x >= point.x).then_some(x)
    }

    /// Returns `true` if `point` lies on the segment, within `tolerance`.
    pub fn contains(&self, point: &Point, tolerance: f64) -> bool {
        if self.is_degenerate() {
            return self.p0.distance(point) <= tolerance;
        }
        self.bounds().inflated(tolerance).contains(point)
            && point.position(self, tolerance) == Positioning::On
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    /// The box spanned by two opposite corners, in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Grows the box so that it also covers `other`.
    pub fn merge(&mut self, other: &BoundingBox) {
        self.min.x = self.min.x.min(other.min.x);
        self.min.y = self.min.y.min(other.min.y);
        self.max.x = self.max.x.max(other.max.x);
        self.max.y = self.max.y.max(other.max.y);
    }

    pub fn inflated(&self, margin: f64) -> Self {
        Self {
            min: Point::new(self.min.x - margin, self.min.y - margin),
            max: Point::new(self.max.x + margin, self.max.y + margin),
        }
    }

    /// Returns `true` if the point lies inside the box or on its border.
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// The outline of the box as a closed polyline, counter-clockwise from the minimum corner.
    pub fn outline(&self) -> Vec<Point> {
        vec![
            self.min,
            Point::new(self.max.x, self.min.y),
            self.max,
            Point::new(self.min.x, self.max.y),
            self.min,
        ]
    }
}
