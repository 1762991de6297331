//! Pointer-driven edit tools.
//!
//! Each tool is a small state machine fed screen-space pointer events by the
//! host view. Tools never touch the circuit: they emit [`EditEvent`]s through
//! an [`EditHost`], and the host folds those into the displayed circuit with
//! [`crate::apply::apply_edit_events`].

pub mod board_size;
pub mod events;
pub mod placement;
pub mod trace_hint;

use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::transform::Matrix;
use crate::types::{AnyCircuitElement, Point};

pub use board_size::{BoardHandle, BoardSizeConfig, BoardSizeEditor};
pub use events::{
    BoardSizeEdit, ComponentLocationEdit, ComponentRotationEdit, EditEvent, EditEventLog,
    TraceHintEdit,
};
pub use placement::{PlacementConfig, PlacementEditor};
pub use trace_hint::{TraceHintConfig, TraceHintEditor};

/// What an edit tool needs from the view hosting it.
pub trait EditHost {
    /// Stop any pan gesture that started on the same pointer-down.
    fn cancel_pan_drag(&mut self) {}
    fn create_edit_event(&mut self, event: EditEvent);
    fn modify_edit_event(&mut self, event: EditEvent);
    /// Drop an in-progress event whose gesture was abandoned.
    fn discard_edit_event(&mut self, _edit_event_id: &str) {}
}

/// The circuit as currently displayed, plus the real-to-screen transform.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub elements: &'a [AnyCircuitElement],
    pub transform: &'a Matrix,
}

impl<'a> Scene<'a> {
    pub fn new(elements: &'a [AnyCircuitElement], transform: &'a Matrix) -> Self {
        Self {
            elements,
            transform,
        }
    }

    pub fn to_real(&self, screen: Point) -> Option<Point> {
        self.transform.inverse().map(|inv| inv.apply(screen))
    }

    pub fn to_screen(&self, real: Point) -> Point {
        self.transform.apply(real)
    }

    /// Convert a screen distance to real-world units.
    pub fn px_to_real(&self, px: f64) -> f64 {
        let s = self.transform.scale_x();
        if s > 0.0 {
            px / s
        } else {
            0.0
        }
    }
}

/// Source of event ids and timestamps.
pub trait EventStamp {
    fn new_id(&mut self, prefix: &str) -> String;
    /// Milliseconds since the Unix epoch.
    fn now_ms(&mut self) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidStamp;

impl EventStamp for UuidStamp {
    fn new_id(&mut self, prefix: &str) -> String {
        format!("{prefix}_{}", Uuid::new_v4())
    }

    fn now_ms(&mut self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }
}

/// Deterministic ids (`<prefix>_0`, `<prefix>_1`, ...) and a manual clock.
#[derive(Debug, Clone, Default)]
pub struct SequenceStamp {
    next: u64,
    pub clock_ms: f64,
}

impl EventStamp for SequenceStamp {
    fn new_id(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}_{}", self.next);
        self.next += 1;
        id
    }

    fn now_ms(&mut self) -> f64 {
        self.clock_ms
    }
}
