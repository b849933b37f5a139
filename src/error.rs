use crate::shape::ShapeId;

/// Errors reported while building an index or running a query.
///
/// Build-time errors fail the whole build: a partially built index would give misleading
/// answers, so no shape is ever silently dropped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A numeric parameter is out of its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// No shapes were supplied to the build.
    #[error("Cannot build an index from an empty set of shapes")]
    EmptyInput,

    /// A shape, or one of its rings, is not a usable closed polygon boundary.
    #[error("Malformed shape {shape_id}: {reason}")]
    MalformedShape { shape_id: ShapeId, reason: String },

    /// Two shapes share the same identifier.
    #[error("Shape identifier {0} is used more than once")]
    DuplicateShapeId(ShapeId),

    /// The query point has a non-finite coordinate.
    #[error("Invalid query point ({x}, {y}): coordinates must be finite")]
    InvalidQuery { x: f64, y: f64 },
}

pub type Result<T> = std::result::Result<T, Error>;
