//! Resize and move the board outline with drag handles.
//!
//! Dragging an edge or corner handle moves only that edge (or the two edges
//! meeting at the corner); the opposite edge stays where it was. The `Move`
//! handle in the middle translates the board without resizing it.

use std::mem;

use log::debug;

use crate::store::SharedStore;
use crate::transform::Matrix;
use crate::types::{AnyCircuitElement, PcbBoard, Point};

use super::events::{BoardSizeEdit, EditEvent};
use super::{EditHost, EventStamp, Scene};

/// Smallest width or height a resize can produce, in mm.
pub const MIN_BOARD_DIMENSION: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardHandle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Top,
    Bottom,
    Left,
    Right,
    Move,
}

impl BoardHandle {
    /// Hit-test order: corners win over the edges they touch.
    pub const ALL: [BoardHandle; 9] = [
        BoardHandle::TopLeft,
        BoardHandle::TopRight,
        BoardHandle::BottomLeft,
        BoardHandle::BottomRight,
        BoardHandle::Top,
        BoardHandle::Bottom,
        BoardHandle::Left,
        BoardHandle::Right,
        BoardHandle::Move,
    ];

    /// Which edge moves on each axis: -1 the low edge, 1 the high edge, 0
    /// neither. "Top" is the +y edge in board coordinates.
    fn sides(self) -> (f64, f64) {
        match self {
            BoardHandle::TopLeft => (-1.0, 1.0),
            BoardHandle::TopRight => (1.0, 1.0),
            BoardHandle::BottomLeft => (-1.0, -1.0),
            BoardHandle::BottomRight => (1.0, -1.0),
            BoardHandle::Top => (0.0, 1.0),
            BoardHandle::Bottom => (0.0, -1.0),
            BoardHandle::Left => (-1.0, 0.0),
            BoardHandle::Right => (1.0, 0.0),
            BoardHandle::Move => (0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardGeometry {
    pub center: Point,
    pub width: f64,
    pub height: f64,
}

impl From<&PcbBoard> for BoardGeometry {
    fn from(board: &PcbBoard) -> Self {
        Self {
            center: board.center,
            width: board.width,
            height: board.height,
        }
    }
}

fn resize_axis(center: f64, size: f64, side: f64, delta: f64) -> (f64, f64) {
    if side == 0.0 {
        return (center, size);
    }
    let fixed_edge = center - side * size / 2.0;
    let new_size = (size + side * delta).max(MIN_BOARD_DIMENSION);
    (fixed_edge + side * new_size / 2.0, new_size)
}

/// Board geometry after dragging `handle` by `delta` real-world units.
pub fn resize_board(handle: BoardHandle, original: BoardGeometry, delta: Point) -> BoardGeometry {
    if handle == BoardHandle::Move {
        return BoardGeometry {
            center: original.center + delta,
            ..original
        };
    }
    let (sx, sy) = handle.sides();
    let (cx, width) = resize_axis(original.center.x, original.width, sx, delta.x);
    let (cy, height) = resize_axis(original.center.y, original.height, sy, delta.y);
    BoardGeometry {
        center: Point::new(cx, cy),
        width,
        height,
    }
}

/// Screen positions of every handle of `board`, in hit-test order.
pub fn handle_positions(board: &BoardGeometry, transform: &Matrix) -> Vec<(BoardHandle, Point)> {
    BoardHandle::ALL
        .iter()
        .map(|&handle| {
            let (sx, sy) = handle.sides();
            let real = Point::new(
                board.center.x + sx * board.width / 2.0,
                board.center.y + sy * board.height / 2.0,
            );
            (handle, transform.apply(real))
        })
        .collect()
}

pub fn handle_at(board: &BoardGeometry, transform: &Matrix, screen: Point, radius_px: f64) -> Option<BoardHandle> {
    handle_positions(board, transform)
        .into_iter()
        .find(|(_, p)| screen.distance(*p) <= radius_px)
        .map(|(handle, _)| handle)
}

/// Convert a screen-space drag to board units with the transform's axis
/// scales. The sign of `d` flips y when the view does.
pub fn screen_delta_to_real(delta: Point, transform: &Matrix) -> Option<Point> {
    if transform.a == 0.0 || transform.d == 0.0 {
        return None;
    }
    Some(Point::new(delta.x / transform.a, delta.y / transform.d))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardSizeConfig {
    pub handle_radius_px: f64,
}

impl Default for BoardSizeConfig {
    fn default() -> Self {
        Self {
            handle_radius_px: 8.0,
        }
    }
}

#[derive(Debug, Clone)]
enum ResizeState {
    Idle,
    Resizing {
        handle: BoardHandle,
        start_screen: Point,
        original: BoardGeometry,
        event: BoardSizeEdit,
    },
}

pub struct BoardSizeEditor {
    store: SharedStore,
    stamp: Box<dyn EventStamp>,
    config: BoardSizeConfig,
    state: ResizeState,
}

impl BoardSizeEditor {
    pub fn new(store: SharedStore, stamp: impl EventStamp + 'static) -> Self {
        Self::with_config(store, stamp, BoardSizeConfig::default())
    }

    pub fn with_config(store: SharedStore, stamp: impl EventStamp + 'static, config: BoardSizeConfig) -> Self {
        Self {
            store,
            stamp: Box::new(stamp),
            config,
            state: ResizeState::Idle,
        }
    }

    fn enabled(&self) -> bool {
        let store = self.store.borrow();
        store.state().in_edit_mode && store.state().in_edit_board_size_mode
    }

    pub fn active_handle(&self) -> Option<BoardHandle> {
        match &self.state {
            ResizeState::Resizing { handle, .. } => Some(*handle),
            ResizeState::Idle => None,
        }
    }

    /// Handles to draw for every board in the scene, or nothing when the
    /// editor is off.
    pub fn visible_handles(&self, scene: &Scene) -> Vec<(BoardHandle, Point)> {
        if !self.enabled() {
            return Vec::new();
        }
        scene
            .elements
            .iter()
            .filter_map(AnyCircuitElement::as_board)
            .flat_map(|b| handle_positions(&BoardGeometry::from(b), scene.transform))
            .collect()
    }

    pub fn pointer_down(&mut self, screen: Point, scene: &Scene, host: &mut dyn EditHost) -> bool {
        if !self.enabled() || !matches!(self.state, ResizeState::Idle) {
            return false;
        }
        let radius = self.config.handle_radius_px;
        let hit = scene
            .elements
            .iter()
            .filter_map(AnyCircuitElement::as_board)
            .find_map(|board| {
                let geometry = BoardGeometry::from(board);
                handle_at(&geometry, scene.transform, screen, radius).map(|h| (board, geometry, h))
            });
        let Some((board, original, handle)) = hit else {
            return false;
        };

        host.cancel_pan_drag();
        let event = BoardSizeEdit {
            edit_event_id: self.stamp.new_id("edit_event"),
            pcb_board_id: board.pcb_board_id.clone(),
            original_width: original.width,
            original_height: original.height,
            original_center: original.center,
            new_width: original.width,
            new_height: original.height,
            new_center: original.center,
            in_progress: true,
            created_at: self.stamp.now_ms(),
        };
        host.create_edit_event(EditEvent::EditPcbBoardSize(event.clone()));
        self.state = ResizeState::Resizing {
            handle,
            start_screen: screen,
            original,
            event,
        };
        self.store.borrow_mut().set_is_editing_board_size(true);
        debug!("board size: grabbed {handle:?} of {}", board.pcb_board_id);
        true
    }

    pub fn pointer_move(&mut self, screen: Point, scene: &Scene, host: &mut dyn EditHost) -> bool {
        let ResizeState::Resizing {
            handle,
            start_screen,
            original,
            event,
        } = &mut self.state
        else {
            return false;
        };
        if let Some(delta) = screen_delta_to_real(screen - *start_screen, scene.transform) {
            set_geometry(event, resize_board(*handle, *original, delta));
            host.modify_edit_event(EditEvent::EditPcbBoardSize(event.clone()));
        }
        true
    }

    pub fn pointer_up(&mut self, screen: Point, scene: &Scene, host: &mut dyn EditHost) -> bool {
        let ResizeState::Resizing {
            handle,
            start_screen,
            original,
            mut event,
        } = mem::replace(&mut self.state, ResizeState::Idle)
        else {
            return false;
        };
        if let Some(delta) = screen_delta_to_real(screen - start_screen, scene.transform) {
            set_geometry(&mut event, resize_board(handle, original, delta));
        }
        event.in_progress = false;
        debug!(
            "board size: {} now {:.2}x{:.2}",
            event.pcb_board_id, event.new_width, event.new_height
        );
        host.modify_edit_event(EditEvent::EditPcbBoardSize(event));
        self.store.borrow_mut().set_is_editing_board_size(false);
        true
    }
}

fn set_geometry(event: &mut BoardSizeEdit, geometry: BoardGeometry) {
    event.new_width = geometry.width;
    event.new_height = geometry.height;
    event.new_center = geometry.center;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::{EditEventLog, SequenceStamp};
    use crate::store::{AppStore, ViewState};
    use crate::types::parse_circuit;
    use approx::assert_abs_diff_eq;

    fn board() -> BoardGeometry {
        BoardGeometry {
            center: Point::new(0.0, 0.0),
            width: 10.0,
            height: 8.0,
        }
    }

    fn edges(g: &BoardGeometry) -> (f64, f64, f64, f64) {
        (
            g.center.x - g.width / 2.0,
            g.center.x + g.width / 2.0,
            g.center.y - g.height / 2.0,
            g.center.y + g.height / 2.0,
        )
    }

    #[test]
    fn test_left_handle_clamps_to_minimum() {
        let g = resize_board(BoardHandle::Left, board(), Point::new(20.0, 0.0));
        assert_eq!(g.width, MIN_BOARD_DIMENSION);
        let (left, right, bottom, top) = edges(&g);
        assert_abs_diff_eq!(right, 5.0);
        assert_abs_diff_eq!(left, 4.0);
        assert_abs_diff_eq!(bottom, -4.0);
        assert_abs_diff_eq!(top, 4.0);
    }

    #[test]
    fn test_single_edge_keeps_opposite_edge() {
        let g = resize_board(BoardHandle::Right, board(), Point::new(3.0, 7.0));
        let (left, right, bottom, top) = edges(&g);
        assert_abs_diff_eq!(left, -5.0);
        assert_abs_diff_eq!(right, 8.0);
        assert_abs_diff_eq!(bottom, -4.0);
        assert_abs_diff_eq!(top, 4.0);

        let g = resize_board(BoardHandle::Top, board(), Point::new(0.0, 2.0));
        let (_, _, bottom, top) = edges(&g);
        assert_abs_diff_eq!(bottom, -4.0);
        assert_abs_diff_eq!(top, 6.0);

        let g = resize_board(BoardHandle::Bottom, board(), Point::new(0.0, 2.0));
        let (_, _, bottom, top) = edges(&g);
        assert_abs_diff_eq!(bottom, -2.0);
        assert_abs_diff_eq!(top, 4.0);
    }

    #[test]
    fn test_corner_and_move() {
        let g = resize_board(BoardHandle::BottomLeft, board(), Point::new(-1.0, -1.0));
        let (left, right, bottom, top) = edges(&g);
        assert_abs_diff_eq!(left, -6.0);
        assert_abs_diff_eq!(right, 5.0);
        assert_abs_diff_eq!(bottom, -5.0);
        assert_abs_diff_eq!(top, 4.0);

        let g = resize_board(BoardHandle::Move, board(), Point::new(2.0, -3.0));
        assert_eq!(g.center, Point::new(2.0, -3.0));
        assert_eq!((g.width, g.height), (10.0, 8.0));
    }

    #[test]
    fn test_corners_take_priority() {
        let tiny = BoardGeometry {
            center: Point::new(0.0, 0.0),
            width: 1.0,
            height: 1.0,
        };
        let t = Matrix::translate(400.0, 300.0).compose(&Matrix::scale(10.0, -10.0));
        // top-left corner at (395, 295), top edge at (400, 295)
        assert_eq!(
            handle_at(&tiny, &t, Point::new(397.0, 295.0), 8.0),
            Some(BoardHandle::TopLeft)
        );
        assert_eq!(handle_at(&tiny, &t, Point::new(500.0, 500.0), 8.0), None);
    }

    #[test]
    fn test_resize_through_pointer_events() {
        let elements = parse_circuit(
            r#"[{"type": "pcb_board", "pcb_board_id": "b", "center": {"x": 0, "y": 0}, "width": 10, "height": 8}]"#,
        )
        .unwrap();
        let t = Matrix::translate(400.0, 300.0).compose(&Matrix::scale(10.0, -10.0));
        let scene = Scene::new(&elements, &t);
        let store = AppStore::shared(ViewState {
            in_edit_mode: true,
            in_edit_board_size_mode: true,
            ..ViewState::default()
        });
        let mut editor = BoardSizeEditor::new(store.clone(), SequenceStamp::default());
        let mut log = EditEventLog::new();

        assert_eq!(editor.visible_handles(&scene).len(), 9);
        // left handle sits at (-5, 0) -> screen (350, 300)
        assert!(editor.pointer_down(Point::new(350.0, 300.0), &scene, &mut log));
        assert_eq!(editor.active_handle(), Some(BoardHandle::Left));
        assert!(store.borrow().state().is_editing_board_size);

        assert!(editor.pointer_move(Point::new(360.0, 300.0), &scene, &mut log));
        assert!(editor.pointer_up(Point::new(650.0, 300.0), &scene, &mut log));
        assert!(!store.borrow().state().is_editing_board_size);

        let EditEvent::EditPcbBoardSize(event) = &log.events()[0] else {
            panic!("expected a board size event");
        };
        assert!(!event.in_progress);
        assert_eq!(event.original_width, 10.0);
        assert_abs_diff_eq!(event.new_width, 1.0);
        assert_abs_diff_eq!(event.new_center.x, 4.5);
        assert_abs_diff_eq!(event.new_height, 8.0);
    }

    #[test]
    fn test_top_handle_follows_flipped_y() {
        let elements = parse_circuit(
            r#"[{"type": "pcb_board", "pcb_board_id": "b", "center": {"x": 0, "y": 0}, "width": 10, "height": 8}]"#,
        )
        .unwrap();
        let t = Matrix::translate(400.0, 300.0).compose(&Matrix::scale(10.0, -10.0));
        let scene = Scene::new(&elements, &t);
        let store = AppStore::shared(ViewState {
            in_edit_mode: true,
            in_edit_board_size_mode: true,
            ..ViewState::default()
        });
        let mut editor = BoardSizeEditor::new(store, SequenceStamp::default());
        let mut log = EditEventLog::new();

        // top edge y=4 -> screen y 260; dragging 20px up grows the board 2mm
        assert!(editor.pointer_down(Point::new(400.0, 260.0), &scene, &mut log));
        editor.pointer_up(Point::new(400.0, 240.0), &scene, &mut log);
        let EditEvent::EditPcbBoardSize(event) = &log.events()[0] else {
            panic!("expected a board size event");
        };
        assert_abs_diff_eq!(event.new_height, 10.0);
        assert_abs_diff_eq!(event.new_center.y, 1.0);
    }

    #[test]
    fn test_requires_both_mode_flags() {
        let elements = parse_circuit(
            r#"[{"type": "pcb_board", "pcb_board_id": "b", "center": {"x": 0, "y": 0}, "width": 10, "height": 8}]"#,
        )
        .unwrap();
        let t = Matrix::identity();
        let scene = Scene::new(&elements, &t);
        let store = AppStore::shared(ViewState {
            in_edit_board_size_mode: true,
            ..ViewState::default()
        });
        let mut editor = BoardSizeEditor::new(store, SequenceStamp::default());
        let mut log = EditEventLog::new();
        assert!(!editor.pointer_down(Point::new(-5.0, 0.0), &scene, &mut log));
        assert!(editor.visible_handles(&scene).is_empty());
        assert!(log.is_empty());
    }
}
