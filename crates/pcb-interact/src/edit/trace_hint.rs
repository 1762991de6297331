//! Sketch routing hints from a pad by clicking waypoints.
//!
//! The first click on a pad starts a hint. Each later click appends a
//! waypoint, unless it lands close to the previous point, which finishes the
//! hint. A press that travels too far before release is a pan, not a click.

use log::debug;

use crate::geometry::BBox;
use crate::store::SharedStore;
use crate::types::{AnyCircuitElement, PcbSmtPad, Point, RouteHintPoint, SmtPadShape};

use super::events::{EditEvent, TraceHintEdit};
use super::{EditHost, EventStamp, Scene};

pub const VIA_TOGGLE_KEY: &str = "v";
pub const CANCEL_KEY: &str = "Escape";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotkey {
    pub key: &'static str,
    pub description: &'static str,
}

pub const HOTKEYS: [Hotkey; 2] = [
    Hotkey {
        key: VIA_TOGGLE_KEY,
        description: "Toggle via for the next waypoints",
    },
    Hotkey {
        key: CANCEL_KEY,
        description: "Cancel the current trace hint",
    },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceHintConfig {
    /// Pointer travel, in screen pixels, above which a press/release pair
    /// is a drag rather than a click. Touch input wants a larger value.
    pub drag_threshold_px: f64,
    /// A click this close to the previous point finishes the hint.
    pub close_radius_px: f64,
    pub pad_padding_px: f64,
}

impl Default for TraceHintConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: 20.0,
            close_radius_px: 20.0,
            pad_padding_px: 4.0,
        }
    }
}

#[derive(Debug, Clone)]
struct SelectedPad {
    pcb_port_id: String,
    center: Point,
}

#[derive(Debug, Clone)]
enum HintState {
    Idle,
    Drawing { pad: SelectedPad, event: TraceHintEdit },
}

/// Pad that can start a hint under `real`. Circular pads and pads without a
/// port are skipped.
pub fn pad_at(elements: &[AnyCircuitElement], real: Point, padding: f64) -> Option<&PcbSmtPad> {
    elements
        .iter()
        .filter_map(AnyCircuitElement::as_smtpad)
        .filter(|pad| pad.shape != SmtPadShape::Circle && pad.pcb_port_id.is_some())
        .find(|pad| match (pad.center(), pad.size()) {
            (Some(center), Some((w, h))) => BBox::from_center(center, w, h).contains(real, padding),
            _ => false,
        })
}

pub struct TraceHintEditor {
    store: SharedStore,
    stamp: Box<dyn EventStamp>,
    config: TraceHintConfig,
    state: HintState,
    press_start: Option<Point>,
    via: bool,
}

impl TraceHintEditor {
    pub fn new(store: SharedStore, stamp: impl EventStamp + 'static) -> Self {
        Self::with_config(store, stamp, TraceHintConfig::default())
    }

    pub fn with_config(store: SharedStore, stamp: impl EventStamp + 'static, config: TraceHintConfig) -> Self {
        Self {
            store,
            stamp: Box::new(stamp),
            config,
            state: HintState::Idle,
            press_start: None,
            via: false,
        }
    }

    fn enabled(&self) -> bool {
        let store = self.store.borrow();
        store.state().in_edit_mode && store.state().in_draw_trace_mode
    }

    pub fn hotkeys(&self) -> &'static [Hotkey] {
        &HOTKEYS
    }

    pub fn is_via_enabled(&self) -> bool {
        self.via
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, HintState::Drawing { .. })
    }

    /// Real-world points of the hint being drawn, starting at the pad.
    pub fn preview_route(&self) -> Vec<Point> {
        match &self.state {
            HintState::Idle => Vec::new(),
            HintState::Drawing { pad, event } => std::iter::once(pad.center)
                .chain(event.route.iter().map(RouteHintPoint::position))
                .collect(),
        }
    }

    pub fn pointer_down(&mut self, screen: Point, scene: &Scene, host: &mut dyn EditHost) -> bool {
        if !self.enabled() {
            return false;
        }
        if self.is_drawing() {
            self.press_start = Some(screen);
            return true;
        }
        let Some(real) = scene.to_real(screen) else {
            return false;
        };
        let padding = scene.px_to_real(self.config.pad_padding_px);
        let Some(pad) = pad_at(scene.elements, real, padding) else {
            return false;
        };
        let (Some(pcb_port_id), Some(center)) = (pad.pcb_port_id.clone(), pad.center()) else {
            return false;
        };

        host.cancel_pan_drag();
        let event = TraceHintEdit {
            edit_event_id: self.stamp.new_id("edit_event"),
            pcb_port_id: pcb_port_id.clone(),
            pcb_trace_hint_id: self.stamp.new_id("pcb_trace_hint"),
            route: Vec::new(),
            in_progress: true,
            created_at: self.stamp.now_ms(),
        };
        host.create_edit_event(EditEvent::EditTraceHint(event.clone()));
        debug!("trace hint: started from {pcb_port_id}");
        self.state = HintState::Drawing {
            pad: SelectedPad {
                pcb_port_id,
                center,
            },
            event,
        };
        // the selecting press is not a waypoint click
        self.press_start = None;
        self.store.borrow_mut().set_is_drawing_trace(true);
        true
    }

    pub fn pointer_up(&mut self, screen: Point, scene: &Scene, host: &mut dyn EditHost) -> bool {
        let Some(start) = self.press_start.take() else {
            return false;
        };
        if screen.distance(start) > self.config.drag_threshold_px {
            return false;
        }
        let Some(real) = scene.to_real(screen) else {
            return false;
        };
        let HintState::Drawing { pad, event } = &mut self.state else {
            return false;
        };

        let previous = event
            .route
            .last()
            .map(RouteHintPoint::position)
            .unwrap_or(pad.center);
        if screen.distance(scene.to_screen(previous)) < self.config.close_radius_px {
            event.in_progress = false;
            debug!(
                "trace hint: finished {} with {} waypoints",
                pad.pcb_port_id,
                event.route.len()
            );
            host.modify_edit_event(EditEvent::EditTraceHint(event.clone()));
            self.state = HintState::Idle;
            self.store.borrow_mut().set_is_drawing_trace(false);
            return true;
        }

        event.route.push(RouteHintPoint {
            x: real.x,
            y: real.y,
            via: Some(self.via),
        });
        host.modify_edit_event(EditEvent::EditTraceHint(event.clone()));
        true
    }

    /// Returns true when the key was handled.
    pub fn key_down(&mut self, key: &str, host: &mut dyn EditHost) -> bool {
        if !self.enabled() {
            return false;
        }
        if key.eq_ignore_ascii_case(VIA_TOGGLE_KEY) {
            self.via = !self.via;
            debug!("trace hint: via {}", if self.via { "on" } else { "off" });
            return true;
        }
        if key == CANCEL_KEY && self.is_drawing() {
            self.cancel(host);
            return true;
        }
        false
    }

    /// Drop the hint being drawn without finalizing its event. The unfinished
    /// event is handed back to the host for discarding.
    pub fn cancel(&mut self, host: &mut dyn EditHost) {
        if let HintState::Drawing { event, .. } = &self.state {
            debug!("trace hint: abandoned {}", event.pcb_trace_hint_id);
            host.discard_edit_event(&event.edit_event_id);
        }
        self.state = HintState::Idle;
        self.press_start = None;
        self.store.borrow_mut().set_is_drawing_trace(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::{EditEventLog, SequenceStamp};
    use crate::store::{AppStore, ViewState};
    use crate::transform::Matrix;
    use crate::types::parse_circuit;
    use approx::assert_abs_diff_eq;

    fn circuit() -> Vec<AnyCircuitElement> {
        parse_circuit(
            r#"[
                {"type": "pcb_smtpad", "pcb_smtpad_id": "pad1", "pcb_port_id": "port1", "shape": "rect",
                 "x": 0, "y": 0, "width": 1, "height": 1, "layer": "top"},
                {"type": "pcb_smtpad", "pcb_smtpad_id": "pad2", "pcb_port_id": "port2", "shape": "circle",
                 "x": 10, "y": 0, "radius": 1, "layer": "top"}
            ]"#,
        )
        .unwrap()
    }

    fn view() -> Matrix {
        Matrix::translate(400.0, 300.0).compose(&Matrix::scale(10.0, -10.0))
    }

    fn editor() -> TraceHintEditor {
        let store = AppStore::shared(ViewState {
            in_edit_mode: true,
            in_draw_trace_mode: true,
            ..ViewState::default()
        });
        TraceHintEditor::new(store, SequenceStamp::default())
    }

    fn click(editor: &mut TraceHintEditor, screen: Point, scene: &Scene, log: &mut EditEventLog) {
        editor.pointer_down(screen, scene, log);
        editor.pointer_up(screen, scene, log);
    }

    fn hint(log: &EditEventLog) -> &TraceHintEdit {
        match &log.events()[0] {
            EditEvent::EditTraceHint(e) => e,
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_trace_hint_close() {
        let elements = circuit();
        let t = view();
        let scene = Scene::new(&elements, &t);
        let mut editor = editor();
        let mut log = EditEventLog::new();

        click(&mut editor, t.apply(Point::new(0.0, 0.0)), &scene, &mut log);
        assert!(editor.is_drawing());
        assert!(hint(&log).route.is_empty());

        click(&mut editor, t.apply(Point::new(5.0, 5.0)), &scene, &mut log);
        // 0.5mm away is 5px on screen, inside the close radius
        click(&mut editor, t.apply(Point::new(5.5, 5.0)), &scene, &mut log);

        let event = hint(&log);
        assert_eq!(log.len(), 1);
        assert_eq!(event.route.len(), 1);
        assert_abs_diff_eq!(event.route[0].x, 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(event.route[0].y, 5.0, epsilon = 1e-9);
        assert!(!event.in_progress);
        assert_eq!(event.pcb_port_id, "port1");
        assert_eq!(event.pcb_trace_hint_id, "pcb_trace_hint_1");
        assert!(!editor.is_drawing());
    }

    #[test]
    fn test_drag_adds_no_waypoint() {
        let elements = circuit();
        let t = view();
        let scene = Scene::new(&elements, &t);
        let mut editor = editor();
        let mut log = EditEventLog::new();

        click(&mut editor, t.apply(Point::new(0.0, 0.0)), &scene, &mut log);
        let down = t.apply(Point::new(5.0, 5.0));
        editor.pointer_down(down, &scene, &mut log);
        assert!(!editor.pointer_up(down + Point::new(25.0, 0.0), &scene, &mut log));
        assert!(hint(&log).route.is_empty());

        // small wobble still counts as a click
        editor.pointer_down(down, &scene, &mut log);
        assert!(editor.pointer_up(down + Point::new(3.0, 0.0), &scene, &mut log));
        assert_eq!(hint(&log).route.len(), 1);
    }

    #[test]
    fn test_clicking_the_pad_again_closes_empty_hint() {
        let elements = circuit();
        let t = view();
        let scene = Scene::new(&elements, &t);
        let mut editor = editor();
        let mut log = EditEventLog::new();

        click(&mut editor, t.apply(Point::new(0.0, 0.0)), &scene, &mut log);
        click(&mut editor, t.apply(Point::new(0.2, 0.0)), &scene, &mut log);
        assert!(hint(&log).route.is_empty());
        assert!(!hint(&log).in_progress);
    }

    #[test]
    fn test_via_toggle_marks_waypoints() {
        let elements = circuit();
        let t = view();
        let scene = Scene::new(&elements, &t);
        let mut editor = editor();
        let mut log = EditEventLog::new();

        click(&mut editor, t.apply(Point::new(0.0, 0.0)), &scene, &mut log);
        click(&mut editor, t.apply(Point::new(5.0, 0.0)), &scene, &mut log);
        assert!(editor.key_down("v", &mut log));
        click(&mut editor, t.apply(Point::new(5.0, 5.0)), &scene, &mut log);

        let route = &hint(&log).route;
        assert_eq!(route[0].via, Some(false));
        assert_eq!(route[1].via, Some(true));
        assert_eq!(editor.preview_route().len(), 3);
        assert!(editor.is_via_enabled());
    }

    #[test]
    fn test_escape_cancels_without_finalizing() {
        let elements = circuit();
        let t = view();
        let scene = Scene::new(&elements, &t);
        let mut editor = editor();
        let mut log = EditEventLog::new();

        click(&mut editor, t.apply(Point::new(0.0, 0.0)), &scene, &mut log);
        click(&mut editor, t.apply(Point::new(5.0, 0.0)), &scene, &mut log);
        assert!(editor.key_down("Escape", &mut log));
        assert!(!editor.is_drawing());
        assert!(!editor.store.borrow().state().is_drawing_trace);
        assert!(!editor.key_down("Escape", &mut log));

        // the abandoned hint never reaches the circuit
        assert!(log.is_empty());
        let applied = crate::apply::apply_edit_events(&elements, log.events());
        assert!(applied.iter().all(|e| e.as_trace_hint().is_none()));
    }

    #[test]
    fn test_escape_keeps_finished_hints() {
        let elements = circuit();
        let t = view();
        let scene = Scene::new(&elements, &t);
        let mut editor = editor();
        let mut log = EditEventLog::new();

        click(&mut editor, t.apply(Point::new(0.0, 0.0)), &scene, &mut log);
        click(&mut editor, t.apply(Point::new(5.0, 0.0)), &scene, &mut log);
        click(&mut editor, t.apply(Point::new(5.2, 0.0)), &scene, &mut log);
        assert!(!hint(&log).in_progress);

        click(&mut editor, t.apply(Point::new(0.0, 0.0)), &scene, &mut log);
        assert_eq!(log.len(), 2);
        assert!(editor.key_down("Escape", &mut log));
        assert_eq!(log.len(), 1);
        assert_eq!(hint(&log).route.len(), 1);
    }

    #[test]
    fn test_circular_pads_cannot_start_a_hint() {
        let elements = circuit();
        let t = view();
        let scene = Scene::new(&elements, &t);
        let mut editor = editor();
        let mut log = EditEventLog::new();
        assert!(!editor.pointer_down(t.apply(Point::new(10.0, 0.0)), &scene, &mut log));
        assert!(log.is_empty());
    }
}
