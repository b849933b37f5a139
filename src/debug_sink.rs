//! Hooks to observe what a query looked at.
//!
//! A [`DebugSink`] can be injected into a [`QueryEngine`](crate::QueryEngine) to receive, after
//! each query, the outlines of the shapes involved, the candidate and intersecting segments, and a
//! few marker features. Everything is handed over as plain geometry: formatting it (plot files,
//! logs...) is up to the sink.

use std::sync::{Mutex, PoisonError};

use crate::geometry::{BoundingBox, Point};
use crate::grid_index::IndexedSegment;
use crate::shape::ShapeId;

/// One ring of a (simplified) shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    pub shape_id: ShapeId,
    pub ring: usize,
    pub points: Vec<Point>,
}

/// A marker drawn to help reading the other debug output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Feature {
    /// An "X" centered on the query point.
    QueryMarker { center: Point, half_size: f64 },
    /// The box around the candidate segments of a shape.
    CandidateBounds {
        shape_id: ShapeId,
        bounds: BoundingBox,
    },
}

impl Feature {
    /// The feature as polylines.
    pub fn polylines(&self) -> Vec<Vec<Point>> {
        match *self {
            Self::QueryMarker {
                center: Point { x, y },
                half_size: h,
            } => vec![
                vec![Point::new(x - h, y - h), Point::new(x + h, y + h)],
                vec![Point::new(x - h, y + h), Point::new(x + h, y - h)],
            ],
            Self::CandidateBounds { bounds, .. } => vec![bounds.outline()],
        }
    }
}

/// Receiver of the debug output of queries.
///
/// Queries may run concurrently, so the hooks take `&self` and implementations handle their own
/// synchronization.
pub trait DebugSink: Send + Sync {
    /// The rings of every shape of the engine, as simplified, whether or not the query touched
    /// them.
    fn emit_outlines(&self, outlines: &[Outline]);

    fn emit_candidates(&self, segments: &[IndexedSegment]);

    fn emit_actual(&self, segments: &[IndexedSegment]);

    fn emit_features(&self, features: &[Feature]);
}

/// Everything a [`RecordingSink`] received.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recording {
    pub outlines: Vec<Outline>,
    pub candidates: Vec<IndexedSegment>,
    pub actual: Vec<IndexedSegment>,
    pub features: Vec<Feature>,
}

/// A sink keeping everything in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    recording: Mutex<Recording>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns what was recorded so far, and starts over.
    pub fn take(&self) -> Recording {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recording> {
        // A panic while holding the lock cannot leave a recording half-written in a way that
        // matters, so poisoning is ignored
        self.recording.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DebugSink for RecordingSink {
    fn emit_outlines(&self, outlines: &[Outline]) {
        self.lock().outlines.extend_from_slice(outlines);
    }

    fn emit_candidates(&self, segments: &[IndexedSegment]) {
        self.lock().candidates.extend_from_slice(segments);
    }

    fn emit_actual(&self, segments: &[IndexedSegment]) {
        self.lock().actual.extend_from_slice(segments);
    }

    fn emit_features(&self, features: &[Feature]) {
        self.lock().features.extend_from_slice(features);
    }
}
