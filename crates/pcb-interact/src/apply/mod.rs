//! Fold edit events into a circuit.
//!
//! `apply_edit_events` is pure: the input slice is cloned once and every
//! edited element is rebuilt. Events run in the order given.

pub mod element_transform;

use log::{debug, warn};

use crate::edit::events::{
    BoardSizeEdit, ComponentLocationEdit, ComponentRotationEdit, EditEvent, TraceHintEdit,
};
use crate::geometry::normalize_angle_delta;
use crate::transform::Matrix;
use crate::types::{
    find_board, find_component, AnyCircuitElement, CircuitElement, Extra, PcbBoard, PcbTraceHint,
    Point,
};

pub use element_transform::transform_element;

/// Positions closer than this are considered equal when deciding whether an
/// event was already applied.
const SAME_POSITION_EPSILON: f64 = 1e-9;

pub fn apply_edit_events(elements: &[AnyCircuitElement], events: &[EditEvent]) -> Vec<AnyCircuitElement> {
    let mut current = elements.to_vec();
    for event in events {
        current = match event {
            EditEvent::EditPcbComponentLocation(e) => apply_component_location(current, e),
            EditEvent::EditPcbComponentRotation(e) => apply_component_rotation(current, e),
            EditEvent::EditPcbBoardSize(e) => apply_board_size(current, e),
            EditEvent::EditTraceHint(e) => apply_trace_hint(current, e),
            EditEvent::Unknown => {
                debug!("skipping edit event of unknown type");
                current
            }
        };
    }
    current
}

fn same_position(a: Point, b: Point) -> bool {
    a.distance(b) < SAME_POSITION_EPSILON
}

/// Apply `m` to the component and everything it owns.
fn transform_owned(
    elements: Vec<AnyCircuitElement>,
    pcb_component_id: &str,
    m: &Matrix,
    rotation_deg: f64,
) -> Vec<AnyCircuitElement> {
    elements
        .into_iter()
        .map(|e| {
            if e.pcb_component_id() == Some(pcb_component_id) {
                transform_element(&e, m, rotation_deg)
            } else {
                e
            }
        })
        .collect()
}

fn apply_component_location(elements: Vec<AnyCircuitElement>, event: &ComponentLocationEdit) -> Vec<AnyCircuitElement> {
    let Some(component) = find_component(&elements, &event.pcb_component_id) else {
        warn!(
            "edit {}: component {} not found",
            event.edit_event_id, event.pcb_component_id
        );
        return elements;
    };
    if same_position(component.center, event.new_center) {
        return elements;
    }
    // measured from the event's own origin, not the current centre
    let delta = event.new_center - event.original_center;
    let m = Matrix::translate(delta.x, delta.y);
    transform_owned(elements, &event.pcb_component_id, &m, 0.0)
}

fn apply_component_rotation(elements: Vec<AnyCircuitElement>, event: &ComponentRotationEdit) -> Vec<AnyCircuitElement> {
    let Some(component) = find_component(&elements, &event.pcb_component_id) else {
        warn!(
            "edit {}: component {} not found",
            event.edit_event_id, event.pcb_component_id
        );
        return elements;
    };
    if normalize_angle_delta(component.rotation - event.new_rotation).abs() < SAME_POSITION_EPSILON {
        return elements;
    }
    let delta = event.new_rotation - event.original_rotation;
    let c = component.center;
    let m = Matrix::translate(c.x, c.y)
        .compose(&Matrix::rotate_degrees(delta))
        .compose(&Matrix::translate(-c.x, -c.y));
    transform_owned(elements, &event.pcb_component_id, &m, delta)
}

fn resized_board(board: &PcbBoard, event: &BoardSizeEdit) -> PcbBoard {
    let mut next = board.clone();
    next.width = event.new_width;
    next.height = event.new_height;
    next.center = event.new_center;
    if let Some(outline) = next.outline.as_mut() {
        let sx = if board.width != 0.0 { event.new_width / board.width } else { 1.0 };
        let sy = if board.height != 0.0 { event.new_height / board.height } else { 1.0 };
        for p in outline {
            *p = Point::new(
                event.new_center.x + (p.x - board.center.x) * sx,
                event.new_center.y + (p.y - board.center.y) * sy,
            );
        }
    }
    next
}

fn apply_board_size(elements: Vec<AnyCircuitElement>, event: &BoardSizeEdit) -> Vec<AnyCircuitElement> {
    let Some(board) = find_board(&elements, &event.pcb_board_id) else {
        warn!("edit {}: board {} not found", event.edit_event_id, event.pcb_board_id);
        return elements;
    };
    if same_position(board.center, event.new_center)
        && (board.width - event.new_width).abs() < SAME_POSITION_EPSILON
        && (board.height - event.new_height).abs() < SAME_POSITION_EPSILON
    {
        return elements;
    }
    elements
        .into_iter()
        .map(|e| match e {
            AnyCircuitElement::Known(CircuitElement::PcbBoard(b)) if b.pcb_board_id == event.pcb_board_id => {
                CircuitElement::PcbBoard(resized_board(&b, event)).into()
            }
            other => other,
        })
        .collect()
}

/// Component owning `pcb_port_id`, from the port record or failing that a
/// pad on the port.
fn port_owner(elements: &[AnyCircuitElement], pcb_port_id: &str) -> Option<String> {
    let from_port = elements
        .iter()
        .filter_map(AnyCircuitElement::as_port)
        .find(|p| p.pcb_port_id == pcb_port_id)
        .and_then(|p| p.pcb_component_id.clone());
    from_port.or_else(|| {
        elements
            .iter()
            .filter_map(AnyCircuitElement::as_smtpad)
            .find(|pad| pad.pcb_port_id.as_deref() == Some(pcb_port_id))
            .and_then(|pad| pad.pcb_component_id.clone())
    })
}

fn apply_trace_hint(elements: Vec<AnyCircuitElement>, event: &TraceHintEdit) -> Vec<AnyCircuitElement> {
    let exists = elements
        .iter()
        .filter_map(AnyCircuitElement::as_trace_hint)
        .any(|h| h.pcb_trace_hint_id == event.pcb_trace_hint_id);
    if exists {
        return elements
            .into_iter()
            .map(|e| match e {
                AnyCircuitElement::Known(CircuitElement::PcbTraceHint(mut h))
                    if h.pcb_trace_hint_id == event.pcb_trace_hint_id =>
                {
                    h.route = event.route.clone();
                    CircuitElement::PcbTraceHint(h).into()
                }
                other => other,
            })
            .collect();
    }

    let Some(pcb_component_id) = port_owner(&elements, &event.pcb_port_id) else {
        warn!(
            "edit {}: no component owns port {}",
            event.edit_event_id, event.pcb_port_id
        );
        return elements;
    };
    // one hint per port
    let mut next: Vec<AnyCircuitElement> = elements
        .into_iter()
        .filter(|e| {
            e.as_trace_hint()
                .map_or(true, |h| h.pcb_port_id != event.pcb_port_id)
        })
        .collect();
    next.push(
        CircuitElement::PcbTraceHint(PcbTraceHint {
            pcb_trace_hint_id: event.pcb_trace_hint_id.clone(),
            pcb_port_id: event.pcb_port_id.clone(),
            pcb_component_id,
            route: event.route.clone(),
            extra: Extra::new(),
        })
        .into(),
    );
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{parse_circuit, RouteHintPoint};
    use approx::assert_abs_diff_eq;

    fn circuit() -> Vec<AnyCircuitElement> {
        parse_circuit(
            r#"[
                {"type": "pcb_board", "pcb_board_id": "board", "center": {"x": 0, "y": 0}, "width": 40, "height": 30},
                {"type": "pcb_component", "pcb_component_id": "c1", "center": {"x": 10, "y": 10}, "width": 4, "height": 2},
                {"type": "pcb_smtpad", "pcb_smtpad_id": "pad1", "pcb_component_id": "c1", "pcb_port_id": "port1",
                 "shape": "rect", "x": 9, "y": 10, "width": 1, "height": 0.5, "layer": "top"},
                {"type": "pcb_plated_hole", "pcb_plated_hole_id": "ph1", "pcb_component_id": "c1", "shape": "circle",
                 "x": 11, "y": 10, "outer_diameter": 1.2, "hole_diameter": 0.6, "layers": ["top", "bottom"]},
                {"type": "pcb_port", "pcb_port_id": "port1", "pcb_component_id": "c1", "x": 9, "y": 10},
                {"type": "pcb_silkscreen_line", "pcb_silkscreen_line_id": "s1", "pcb_component_id": "c1",
                 "x1": 8, "y1": 11, "x2": 12, "y2": 11, "stroke_width": 0.1},
                {"type": "pcb_component", "pcb_component_id": "c2", "center": {"x": -10, "y": -10}, "width": 2, "height": 2},
                {"type": "pcb_smtpad", "pcb_smtpad_id": "pad2", "pcb_component_id": "c2", "pcb_port_id": "port2",
                 "shape": "rect", "x": -10, "y": -10, "width": 1, "height": 1, "layer": "top"},
                {"type": "schematic_component", "schematic_component_id": "sc1"}
            ]"#,
        )
        .unwrap()
    }

    fn move_event(id: &str, from: Point, to: Point) -> EditEvent {
        EditEvent::EditPcbComponentLocation(ComponentLocationEdit {
            edit_event_id: id.to_string(),
            pcb_component_id: "c1".to_string(),
            original_center: from,
            new_center: to,
            in_progress: false,
            created_at: 0.0,
        })
    }

    fn hint_event(hint_id: &str, port: &str, route: Vec<RouteHintPoint>) -> EditEvent {
        EditEvent::EditTraceHint(TraceHintEdit {
            edit_event_id: format!("edit_{hint_id}"),
            pcb_port_id: port.to_string(),
            pcb_trace_hint_id: hint_id.to_string(),
            route,
            in_progress: true,
            created_at: 0.0,
        })
    }

    fn pad_position(elements: &[AnyCircuitElement], id: &str) -> Point {
        let pad = elements
            .iter()
            .filter_map(AnyCircuitElement::as_smtpad)
            .find(|p| p.pcb_smtpad_id == id)
            .unwrap();
        pad.center().unwrap()
    }

    fn hints(elements: &[AnyCircuitElement]) -> Vec<&PcbTraceHint> {
        elements.iter().filter_map(AnyCircuitElement::as_trace_hint).collect()
    }

    #[test]
    fn test_location_moves_everything_the_component_owns() {
        let elements = circuit();
        let out = apply_edit_events(&elements, &[move_event("e1", Point::new(10.0, 10.0), Point::new(15.0, 12.0))]);

        assert_eq!(find_component(&out, "c1").unwrap().center, Point::new(15.0, 12.0));
        assert_eq!(pad_position(&out, "pad1"), Point::new(14.0, 12.0));
        let port = out.iter().filter_map(AnyCircuitElement::as_port).next().unwrap();
        assert_eq!((port.x, port.y), (14.0, 12.0));
        let CircuitElement::PcbSilkscreenLine(line) = out[5].known().unwrap() else {
            panic!("expected silkscreen line");
        };
        assert_eq!((line.x1, line.y1, line.x2, line.y2), (13.0, 13.0, 17.0, 13.0));

        // other component and unknown elements are untouched
        assert_eq!(pad_position(&out, "pad2"), Point::new(-10.0, -10.0));
        assert_eq!(out[8], elements[8]);
    }

    #[test]
    fn test_location_is_idempotent() {
        let elements = circuit();
        let ev = [move_event("e1", Point::new(10.0, 10.0), Point::new(15.3, 12.7))];
        let once = apply_edit_events(&elements, &ev);
        let twice = apply_edit_events(&once, &ev);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_location_delta_uses_original_center() {
        let elements = apply_edit_events(
            &circuit(),
            &[move_event("e0", Point::new(10.0, 10.0), Point::new(12.0, 10.0))],
        );
        // stale event: still moves by new - original
        let out = apply_edit_events(&elements, &[move_event("e1", Point::new(10.0, 10.0), Point::new(15.0, 12.0))]);
        assert_eq!(find_component(&out, "c1").unwrap().center, Point::new(17.0, 12.0));
    }

    #[test]
    fn test_round_trip_translation() {
        let elements = circuit();
        let out = apply_edit_events(
            &elements,
            &[
                move_event("e1", Point::new(10.0, 10.0), Point::new(13.7, 8.1)),
                move_event("e2", Point::new(13.7, 8.1), Point::new(10.0, 10.0)),
            ],
        );
        let p = pad_position(&out, "pad1");
        assert_abs_diff_eq!(p.x, 9.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 10.0, epsilon = 1e-9);
        let CircuitElement::PcbPlatedHole(hole) = out[3].known().unwrap() else {
            panic!("expected plated hole");
        };
        assert_abs_diff_eq!(hole.x, 11.0, epsilon = 1e-9);
        assert_abs_diff_eq!(hole.y, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let elements = circuit();
        let before = elements.clone();
        let _ = apply_edit_events(
            &elements,
            &[
                move_event("e1", Point::new(10.0, 10.0), Point::new(1.0, 1.0)),
                hint_event("h1", "port1", vec![]),
            ],
        );
        assert_eq!(elements, before);
    }

    #[test]
    fn test_rotation_about_component_center() {
        let elements = circuit();
        let ev = [EditEvent::EditPcbComponentRotation(ComponentRotationEdit {
            edit_event_id: "r1".to_string(),
            pcb_component_id: "c1".to_string(),
            original_rotation: 0.0,
            new_rotation: 90.0,
            in_progress: false,
            created_at: 0.0,
        })];
        let out = apply_edit_events(&elements, &ev);
        assert_abs_diff_eq!(find_component(&out, "c1").unwrap().rotation, 90.0);
        let p = pad_position(&out, "pad1");
        assert_abs_diff_eq!(p.x, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 9.0, epsilon = 1e-9);
        let pad = out[2].as_smtpad().unwrap();
        assert_eq!((pad.width, pad.height), (Some(0.5), Some(1.0)));

        assert_eq!(apply_edit_events(&out, &ev), out);
    }

    #[test]
    fn test_quarter_turn_component_is_selectable_by_new_extent() {
        use crate::edit::placement::component_at;

        let elements = parse_circuit(
            r#"[{"type": "pcb_component", "pcb_component_id": "long", "center": {"x": 0, "y": 0},
                 "width": 10, "height": 2}]"#,
        )
        .unwrap();
        let ev = [EditEvent::EditPcbComponentRotation(ComponentRotationEdit {
            edit_event_id: "r1".to_string(),
            pcb_component_id: "long".to_string(),
            original_rotation: 0.0,
            new_rotation: 90.0,
            in_progress: false,
            created_at: 0.0,
        })];
        let out = apply_edit_events(&elements, &ev);
        let c = find_component(&out, "long").unwrap();
        assert_eq!((c.width, c.height), (2.0, 10.0));

        assert!(component_at(&out, Point::new(0.0, 4.0), 0.0).is_some());
        assert!(component_at(&out, Point::new(4.0, 0.0), 0.0).is_none());
    }

    #[test]
    fn test_board_size_scales_outline() {
        let mut elements = circuit();
        elements[0] = parse_circuit(
            r#"[{"type": "pcb_board", "pcb_board_id": "board", "center": {"x": 0, "y": 0}, "width": 40, "height": 30,
                 "outline": [{"x": -20, "y": -15}, {"x": 20, "y": -15}, {"x": 20, "y": 15}, {"x": -20, "y": 15}]}]"#,
        )
        .unwrap()
        .remove(0);
        let ev = [EditEvent::EditPcbBoardSize(BoardSizeEdit {
            edit_event_id: "b1".to_string(),
            pcb_board_id: "board".to_string(),
            original_width: 40.0,
            original_height: 30.0,
            original_center: Point::new(0.0, 0.0),
            new_width: 20.0,
            new_height: 30.0,
            new_center: Point::new(10.0, 0.0),
            in_progress: false,
            created_at: 0.0,
        })];
        let out = apply_edit_events(&elements, &ev);
        let board = find_board(&out, "board").unwrap();
        assert_eq!((board.width, board.height), (20.0, 30.0));
        assert_eq!(board.center, Point::new(10.0, 0.0));
        let outline = board.outline.as_ref().unwrap();
        assert_eq!(outline[0], Point::new(0.0, -15.0));
        assert_eq!(outline[2], Point::new(20.0, 15.0));
        assert_eq!(apply_edit_events(&out, &ev), out);
    }

    #[test]
    fn test_trace_hint_created_then_replaced_in_place() {
        let elements = circuit();
        let out = apply_edit_events(&elements, &[hint_event("h1", "port1", vec![])]);
        assert_eq!(hints(&out).len(), 1);
        assert_eq!(hints(&out)[0].pcb_component_id, "c1");

        let route = vec![RouteHintPoint {
            x: 5.0,
            y: 5.0,
            via: Some(false),
        }];
        let out = apply_edit_events(&elements, &[hint_event("h1", "port1", vec![]), hint_event("h1", "port1", route.clone())]);
        let found = hints(&out);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].route, route);
    }

    #[test]
    fn test_new_hint_replaces_other_hint_on_same_port() {
        let elements = circuit();
        let out = apply_edit_events(
            &elements,
            &[
                hint_event("h1", "port1", vec![]),
                hint_event("h2", "port2", vec![]),
                hint_event("h3", "port1", vec![]),
            ],
        );
        let ids: Vec<&str> = hints(&out).iter().map(|h| h.pcb_trace_hint_id.as_str()).collect();
        assert_eq!(ids, vec!["h2", "h3"]);
        // port2 has no port record; the owning pad names the component
        assert_eq!(hints(&out)[0].pcb_component_id, "c2");
    }

    #[test]
    fn test_unknown_and_dangling_events_are_ignored() {
        let elements = circuit();
        let dangling = EditEvent::EditPcbComponentLocation(ComponentLocationEdit {
            edit_event_id: "x".to_string(),
            pcb_component_id: "missing".to_string(),
            original_center: Point::new(0.0, 0.0),
            new_center: Point::new(1.0, 1.0),
            in_progress: false,
            created_at: 0.0,
        });
        let out = apply_edit_events(&elements, &[EditEvent::Unknown, dangling, hint_event("h", "nope", vec![])]);
        assert_eq!(out, elements);
    }
}
