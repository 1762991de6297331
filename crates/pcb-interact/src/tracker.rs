//! Pointer hover tracking.
//!
//! Raw pointer moves are coalesced to one hit-test per animation frame: a
//! move that arrives while a frame is pending replaces the pending point,
//! it is never queued.

use std::collections::HashSet;

use log::debug;

use crate::highlight::{project_highlights, HighlightedPrimitive};
use crate::hit_test::get_primitives_under_point;
use crate::primitives::Primitive;
use crate::transform::Matrix;
use crate::types::Point;

/// Latest-value slot drained once per frame.
#[derive(Debug, Clone)]
pub struct FrameThrottle<T> {
    pending: Option<T>,
}

impl<T> Default for FrameThrottle<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> FrameThrottle<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, replacing anything pending. Returns true when nothing
    /// was pending, i.e. the caller has to request a frame.
    pub fn push(&mut self, value: T) -> bool {
        let was_idle = self.pending.is_none();
        self.pending = Some(value);
        was_idle
    }

    pub fn take(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

type HoverCallback = Box<dyn FnMut(&[Primitive])>;

#[derive(Default)]
pub struct MouseElementTracker {
    throttle: FrameThrottle<Point>,
    last_hit_ids: HashSet<String>,
    hovered: Vec<Primitive>,
    highlights: Vec<HighlightedPrimitive>,
    last_real_point: Option<Point>,
    on_hover_change: Option<HoverCallback>,
}

impl MouseElementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_on_hover_change(&mut self, callback: impl FnMut(&[Primitive]) + 'static) {
        self.on_hover_change = Some(Box::new(callback));
    }

    /// Record a pointer move in screen pixels. Returns true when a frame must
    /// be requested to process it.
    pub fn pointer_move(&mut self, screen: Point) -> bool {
        self.throttle.push(screen)
    }

    /// A touch start is a pointer move at the first touch.
    pub fn touch_start(&mut self, touches: &[Point]) -> bool {
        match touches.first() {
            Some(first) => self.pointer_move(*first),
            None => false,
        }
    }

    /// Process the pending pointer position, if any. Returns true when the
    /// hovered set changed.
    pub fn on_animation_frame(&mut self, primitives: &[Primitive], transform: &Matrix) -> bool {
        match self.throttle.take() {
            Some(screen) => self.process_point(screen, primitives, transform),
            None => false,
        }
    }

    /// Hit-test `screen` immediately, bypassing the frame throttle.
    pub fn process_point(&mut self, screen: Point, primitives: &[Primitive], transform: &Matrix) -> bool {
        let Some(inverse) = transform.inverse() else {
            debug!("tracker: transform is not invertible, ignoring pointer");
            return false;
        };
        let real = inverse.apply(screen);
        self.last_real_point = Some(real);

        let hits = get_primitives_under_point(primitives, real, transform);
        let ids: HashSet<String> = hits
            .iter()
            .map(|p| p.pcb_drawing_object_id.clone())
            .collect();
        if ids == self.last_hit_ids {
            return false;
        }

        self.highlights = project_highlights(hits.iter().copied(), transform);
        self.hovered = hits.into_iter().cloned().collect();
        self.last_hit_ids = ids;
        debug!("tracker: {} primitives under pointer", self.hovered.len());
        if let Some(callback) = self.on_hover_change.as_mut() {
            callback(&self.hovered);
        }
        true
    }

    /// Recompute screen boxes for the current hover set after a pan/zoom or
    /// after the primitives were rebuilt. Hovered primitives are refreshed
    /// from `primitives` by id; ids that no longer exist leave the hover set.
    /// Returns true when that dropped anything.
    pub fn reproject(&mut self, primitives: &[Primitive], transform: &Matrix) -> bool {
        let before = self.hovered.len();
        self.hovered = primitives
            .iter()
            .filter(|p| self.last_hit_ids.contains(&p.pcb_drawing_object_id))
            .cloned()
            .collect();
        self.highlights = project_highlights(&self.hovered, transform);
        if self.hovered.len() == before {
            return false;
        }
        self.last_hit_ids = self
            .hovered
            .iter()
            .map(|p| p.pcb_drawing_object_id.clone())
            .collect();
        debug!("tracker: {} hovered primitives left after rebuild", self.hovered.len());
        if let Some(callback) = self.on_hover_change.as_mut() {
            callback(&self.hovered);
        }
        true
    }

    /// Forget the hover set, e.g. when the pointer leaves the canvas.
    pub fn clear(&mut self) {
        self.throttle.take();
        self.last_real_point = None;
        if self.last_hit_ids.is_empty() {
            return;
        }
        self.last_hit_ids.clear();
        self.hovered.clear();
        self.highlights.clear();
        if let Some(callback) = self.on_hover_change.as_mut() {
            callback(&[]);
        }
    }

    pub fn hovered(&self) -> &[Primitive] {
        &self.hovered
    }

    pub fn highlights(&self) -> &[HighlightedPrimitive] {
        &self.highlights
    }

    pub fn last_real_point(&self) -> Option<Point> {
        self.last_real_point
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{PrimitiveShape, PrimitiveSource};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn pad(id: &str, x: f64) -> Primitive {
        Primitive {
            pcb_drawing_object_id: id.to_string(),
            layer: "top".to_string(),
            shape: PrimitiveShape::Rect {
                x,
                y: 0.0,
                w: 2.0,
                h: 2.0,
                ccw_rotation: 0.0,
            },
            source: PrimitiveSource {
                element_type: "pcb_smtpad".to_string(),
                element_id: id.to_string(),
                pcb_component_id: None,
                pcb_port_id: None,
            },
        }
    }

    #[test]
    fn test_throttle_keeps_latest() {
        let mut t = FrameThrottle::new();
        assert!(t.push(1));
        assert!(!t.push(2));
        assert!(!t.push(3));
        assert_eq!(t.take(), Some(3));
        assert_eq!(t.take(), None);
        assert!(t.push(4));
    }

    #[test]
    fn test_notifies_only_on_change() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut tracker = MouseElementTracker::new();
        {
            let calls = calls.clone();
            tracker.set_on_hover_change(move |prims| calls.borrow_mut().push(prims.len()));
        }
        let prims = vec![pad("a", 0.0), pad("b", 0.5)];
        let t = Matrix::identity();

        assert!(tracker.pointer_move(Point::new(0.2, 0.0)));
        assert!(tracker.on_animation_frame(&prims, &t));
        assert_eq!(tracker.hovered().len(), 2);

        // micro movement, same set
        tracker.pointer_move(Point::new(0.25, 0.1));
        assert!(!tracker.on_animation_frame(&prims, &t));

        // no pending move, nothing to do
        assert!(!tracker.on_animation_frame(&prims, &t));

        tracker.pointer_move(Point::new(10.0, 0.0));
        assert!(tracker.on_animation_frame(&prims, &t));
        assert!(tracker.hovered().is_empty());

        assert_eq!(*calls.borrow(), vec![2, 0]);
    }

    #[test]
    fn test_hit_set_comparison_ignores_order() {
        let mut tracker = MouseElementTracker::new();
        let t = Matrix::identity();
        let forward = vec![pad("a", 0.0), pad("b", 0.5)];
        let reversed = vec![pad("b", 0.5), pad("a", 0.0)];
        assert!(tracker.process_point(Point::new(0.2, 0.0), &forward, &t));
        assert!(!tracker.process_point(Point::new(0.2, 0.0), &reversed, &t));
    }

    #[test]
    fn test_touch_start_uses_first_touch() {
        let mut tracker = MouseElementTracker::new();
        let prims = vec![pad("a", 0.0)];
        let t = Matrix::scale(10.0, -10.0);
        assert!(tracker.touch_start(&[Point::new(5.0, -5.0), Point::new(500.0, 500.0)]));
        assert!(tracker.on_animation_frame(&prims, &t));
        assert_eq!(tracker.hovered()[0].pcb_drawing_object_id, "a");
        assert_eq!(tracker.last_real_point(), Some(Point::new(0.5, 0.5)));
        assert!(!tracker.touch_start(&[]));
    }

    #[test]
    fn test_reproject_follows_moved_primitive() {
        let mut tracker = MouseElementTracker::new();
        let t = Matrix::identity();
        let big = |x: f64| {
            let mut p = pad("a", x);
            p.shape = PrimitiveShape::Rect {
                x,
                y: 0.0,
                w: 4.0,
                h: 4.0,
                ccw_rotation: 0.0,
            };
            p
        };
        assert!(tracker.process_point(Point::new(0.5, 0.0), &[big(0.0)], &t));

        let moved = vec![big(1.0)];
        assert!(!tracker.reproject(&moved, &t));
        assert_eq!(tracker.hovered(), moved.as_slice());
        assert_eq!(tracker.highlights()[0].screen_x, 1.0);

        // still under the pointer: same set, but geometry is current
        assert!(!tracker.process_point(Point::new(0.5, 0.0), &moved, &t));
        assert_eq!(tracker.hovered(), moved.as_slice());
    }

    #[test]
    fn test_reproject_drops_removed_ids() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut tracker = MouseElementTracker::new();
        {
            let seen = seen.clone();
            tracker.set_on_hover_change(move |prims| seen.borrow_mut().push(prims.len()));
        }
        let t = Matrix::identity();
        tracker.process_point(Point::new(0.2, 0.0), &[pad("a", 0.0), pad("b", 0.5)], &t);
        assert!(tracker.reproject(&[pad("b", 0.5)], &t));
        assert_eq!(tracker.hovered().len(), 1);
        assert_eq!(tracker.highlights().len(), 1);
        assert_eq!(*seen.borrow(), vec![2, 1]);

        // the remaining id set is what the next hit-test compares against
        assert!(!tracker.process_point(Point::new(0.6, 0.0), &[pad("b", 0.5)], &t));
    }

    #[test]
    fn test_clear_notifies_once() {
        let count = Rc::new(RefCell::new(0));
        let mut tracker = MouseElementTracker::new();
        {
            let count = count.clone();
            tracker.set_on_hover_change(move |_| *count.borrow_mut() += 1);
        }
        let prims = vec![pad("a", 0.0)];
        tracker.process_point(Point::new(0.0, 0.0), &prims, &Matrix::identity());
        tracker.clear();
        tracker.clear();
        assert_eq!(*count.borrow(), 2);
        assert!(tracker.highlights().is_empty());
    }
}
