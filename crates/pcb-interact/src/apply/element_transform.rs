use std::mem::swap;

use crate::geometry::normalize_angle;
use crate::transform::Matrix;
use crate::types::{
    AnyCircuitElement, CircuitElement, PcbPlatedHole, PcbSmtPad, PlatedHoleShape, Point,
    SmtPadShape,
};

/// Whole quarter turns in `degrees`, if it is a multiple of 90.
fn quarter_turns(degrees: f64) -> Option<i64> {
    let q = degrees / 90.0;
    let r = q.round();
    ((q - r).abs() < 1e-9).then_some(r as i64)
}

fn is_odd_quarter_turn(degrees: f64) -> bool {
    quarter_turns(degrees).is_some_and(|q| q.rem_euclid(2) == 1)
}

fn map_points(points: &mut [Point], m: &Matrix) {
    for p in points {
        *p = m.apply(*p);
    }
}

fn map_xy(x: &mut f64, y: &mut f64, m: &Matrix) {
    let p = m.apply(Point::new(*x, *y));
    *x = p.x;
    *y = p.y;
}

fn add_rotation(current: Option<f64>, degrees: f64) -> Option<f64> {
    Some(normalize_angle(current.unwrap_or(0.0) + degrees))
}

/// Move `element` by the rigid transform `m`. `rotation_deg` is the rotation
/// part of `m`, needed to keep orientation fields (pad sizes, component
/// rotation, text angle) in step with the moved geometry. Unknown elements
/// come back unchanged.
pub fn transform_element(element: &AnyCircuitElement, m: &Matrix, rotation_deg: f64) -> AnyCircuitElement {
    let AnyCircuitElement::Known(known) = element else {
        return element.clone();
    };
    let rotated = rotation_deg != 0.0;
    let mut next = known.clone();
    match &mut next {
        CircuitElement::PcbBoard(b) => {
            b.center = m.apply(b.center);
            if let Some(outline) = b.outline.as_mut() {
                map_points(outline, m);
            }
        }
        CircuitElement::PcbPanel(p) => p.center = m.apply(p.center),
        CircuitElement::PcbGroup(g) => {
            g.center = m.apply(g.center);
            g.anchor_position = g.anchor_position.map(|a| m.apply(a));
        }
        CircuitElement::PcbComponent(c) => {
            c.center = m.apply(c.center);
            if rotated {
                c.rotation = normalize_angle(c.rotation + rotation_deg);
            }
            // width/height are the axis-aligned footprint extent
            if is_odd_quarter_turn(rotation_deg) {
                swap(&mut c.width, &mut c.height);
            }
        }
        CircuitElement::PcbSmtpad(pad) => transform_smtpad(pad, m, rotation_deg),
        CircuitElement::PcbPlatedHole(hole) => transform_plated_hole(hole, m, rotation_deg),
        CircuitElement::PcbHole(h) => {
            map_xy(&mut h.x, &mut h.y, m);
            if is_odd_quarter_turn(rotation_deg) {
                swap(&mut h.hole_width, &mut h.hole_height);
            }
        }
        CircuitElement::PcbVia(v) => map_xy(&mut v.x, &mut v.y, m),
        CircuitElement::PcbTrace(t) => {
            for point in &mut t.route {
                point.set_position(m.apply(point.position()));
            }
        }
        CircuitElement::PcbPort(p) => map_xy(&mut p.x, &mut p.y, m),
        CircuitElement::PcbTraceHint(h) => {
            for point in &mut h.route {
                map_xy(&mut point.x, &mut point.y, m);
            }
        }
        CircuitElement::PcbSilkscreenText(t) => {
            t.anchor_position = m.apply(t.anchor_position);
            if rotated {
                t.ccw_rotation = add_rotation(t.ccw_rotation, rotation_deg);
            }
        }
        CircuitElement::PcbSilkscreenLine(l) => {
            map_xy(&mut l.x1, &mut l.y1, m);
            map_xy(&mut l.x2, &mut l.y2, m);
        }
        CircuitElement::PcbSilkscreenPath(p) => map_points(&mut p.route, m),
        CircuitElement::PcbSilkscreenRect(r) => {
            r.center = m.apply(r.center);
            if is_odd_quarter_turn(rotation_deg) {
                swap(&mut r.width, &mut r.height);
            }
        }
        CircuitElement::PcbSilkscreenCircle(c) => c.center = m.apply(c.center),
        CircuitElement::PcbCopperPour(p) => map_points(&mut p.points, m),
        CircuitElement::SourcePort(_) | CircuitElement::SourceTrace(_) => {}
    }
    AnyCircuitElement::Known(next)
}

fn transform_smtpad(pad: &mut PcbSmtPad, m: &Matrix, rotation_deg: f64) {
    if let (Some(x), Some(y)) = (pad.x, pad.y) {
        let c = m.apply(Point::new(x, y));
        pad.x = Some(c.x);
        pad.y = Some(c.y);
    }
    if let Some(points) = pad.points.as_mut() {
        map_points(points, m);
    }
    if rotation_deg == 0.0 {
        return;
    }
    match pad.shape {
        SmtPadShape::Rect | SmtPadShape::Pill => match quarter_turns(rotation_deg) {
            Some(q) => {
                if q.rem_euclid(2) == 1 {
                    swap(&mut pad.width, &mut pad.height);
                }
            }
            None => {
                pad.shape = if pad.shape == SmtPadShape::Rect {
                    SmtPadShape::RotatedRect
                } else {
                    SmtPadShape::RotatedPill
                };
                pad.ccw_rotation = add_rotation(None, rotation_deg);
            }
        },
        SmtPadShape::RotatedRect | SmtPadShape::RotatedPill => {
            pad.ccw_rotation = add_rotation(pad.ccw_rotation, rotation_deg);
        }
        SmtPadShape::Circle | SmtPadShape::Polygon => {}
    }
}

fn transform_plated_hole(hole: &mut PcbPlatedHole, m: &Matrix, rotation_deg: f64) {
    map_xy(&mut hole.x, &mut hole.y, m);
    if rotation_deg == 0.0 || hole.shape == PlatedHoleShape::Circle {
        return;
    }
    match quarter_turns(rotation_deg) {
        Some(q) if q.rem_euclid(2) == 1 => {
            swap(&mut hole.outer_width, &mut hole.outer_height);
            swap(&mut hole.hole_width, &mut hole.hole_height);
            swap(&mut hole.rect_pad_width, &mut hole.rect_pad_height);
        }
        Some(_) => {}
        None => hole.ccw_rotation = add_rotation(hole.ccw_rotation, rotation_deg),
    }
}
