//! Flattening of circuit elements into renderer-ready primitives.
//!
//! Every primitive keeps a back-reference to the element it came from and a
//! drawing object id that is stable for a given circuit, which is what the
//! hover tracker diffs on.

use serde::Serialize;

use crate::types::*;

pub const DRILL_LAYER: &str = "drill";
pub const BOARD_LAYER: &str = "board";
const BOARD_OUTLINE_WIDTH: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "pcb_drawing_type", rename_all = "snake_case")]
pub enum PrimitiveShape {
    Circle {
        x: f64,
        y: f64,
        r: f64,
    },
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        ccw_rotation: f64,
    },
    Oval {
        x: f64,
        y: f64,
        rx: f64,
        ry: f64,
    },
    Pill {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        ccw_rotation: f64,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        width: f64,
    },
    Polygon {
        points: Vec<Point>,
    },
    PolygonWithArcs {
        points: Vec<Point>,
    },
    Text {
        x: f64,
        y: f64,
        text: String,
        size: f64,
    },
}

/// Back-reference from a primitive to the element that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimitiveSource {
    pub element_type: String,
    pub element_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcb_component_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcb_port_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Primitive {
    #[serde(rename = "_pcb_drawing_object_id")]
    pub pcb_drawing_object_id: String,
    pub layer: String,
    #[serde(flatten)]
    pub shape: PrimitiveShape,
    #[serde(rename = "_element")]
    pub source: PrimitiveSource,
}

impl Primitive {
    pub fn is_drill(&self) -> bool {
        self.layer == DRILL_LAYER
    }
}

struct Emitter<'a> {
    source: PrimitiveSource,
    out: &'a mut Vec<Primitive>,
    n: usize,
}

impl Emitter<'_> {
    fn emit(&mut self, layer: &str, shape: PrimitiveShape) {
        self.out.push(Primitive {
            pcb_drawing_object_id: format!("{}#{}", self.source.element_id, self.n),
            layer: layer.to_string(),
            shape,
            source: self.source.clone(),
        });
        self.n += 1;
    }

    fn emit_on(&mut self, layers: &[String], shape: PrimitiveShape) {
        if layers.is_empty() {
            self.emit("top", shape.clone());
            self.emit("bottom", shape);
        } else {
            for layer in layers {
                self.emit(layer, shape.clone());
            }
        }
    }

    fn emit_path(&mut self, layer: &str, points: &[Point], width: f64) {
        for pair in points.windows(2) {
            self.emit(
                layer,
                PrimitiveShape::Line {
                    x1: pair[0].x,
                    y1: pair[0].y,
                    x2: pair[1].x,
                    y2: pair[1].y,
                    width,
                },
            );
        }
    }
}

fn silkscreen_layer(layer: &str) -> String {
    format!("{layer}_silkscreen")
}

fn pill_or_oval(pill: bool, x: f64, y: f64, w: f64, h: f64) -> PrimitiveShape {
    if pill {
        PrimitiveShape::Pill {
            x,
            y,
            w,
            h,
            ccw_rotation: 0.0,
        }
    } else {
        PrimitiveShape::Oval {
            x,
            y,
            rx: w / 2.0,
            ry: h / 2.0,
        }
    }
}

/// Primitives for one element. Elements with missing geometry produce
/// nothing rather than failing.
pub fn element_to_primitives(element: &AnyCircuitElement) -> Vec<Primitive> {
    let mut out = Vec::new();
    let Some(known) = element.known() else {
        return out;
    };
    let pcb_port_id = match known {
        CircuitElement::PcbSmtpad(p) => p.pcb_port_id.clone(),
        CircuitElement::PcbPlatedHole(h) => h.pcb_port_id.clone(),
        _ => None,
    };
    let mut em = Emitter {
        source: PrimitiveSource {
            element_type: known.element_type().to_string(),
            element_id: known.id().to_string(),
            pcb_component_id: known.pcb_component_id().map(str::to_string),
            pcb_port_id,
        },
        out: &mut out,
        n: 0,
    };

    match known {
        CircuitElement::PcbSmtpad(pad) => smtpad_primitives(pad, &mut em),
        CircuitElement::PcbPlatedHole(hole) => plated_hole_primitives(hole, &mut em),
        CircuitElement::PcbHole(hole) => {
            let (x, y) = (hole.x, hole.y);
            let shape = match hole.hole_shape {
                HoleShape::Circle => hole
                    .hole_diameter
                    .map(|d| PrimitiveShape::Circle { x, y, r: d / 2.0 }),
                HoleShape::Oval | HoleShape::Pill => match (hole.hole_width, hole.hole_height) {
                    (Some(w), Some(h)) => {
                        Some(pill_or_oval(hole.hole_shape == HoleShape::Pill, x, y, w, h))
                    }
                    _ => None,
                },
                HoleShape::Rect => match (hole.hole_width, hole.hole_height) {
                    (Some(w), Some(h)) => Some(PrimitiveShape::Rect {
                        x,
                        y,
                        w,
                        h,
                        ccw_rotation: 0.0,
                    }),
                    _ => None,
                },
            };
            if let Some(shape) = shape {
                em.emit(DRILL_LAYER, shape);
            }
        }
        CircuitElement::PcbVia(via) => {
            let (x, y) = (via.x, via.y);
            em.emit_on(
                &via.layers,
                PrimitiveShape::Circle {
                    x,
                    y,
                    r: via.outer_diameter / 2.0,
                },
            );
            em.emit(
                DRILL_LAYER,
                PrimitiveShape::Circle {
                    x,
                    y,
                    r: via.hole_diameter / 2.0,
                },
            );
        }
        CircuitElement::PcbTrace(trace) => {
            for pair in trace.route.windows(2) {
                if let (
                    TraceRoutePoint::Wire {
                        x: x1,
                        y: y1,
                        width,
                        layer,
                        ..
                    },
                    TraceRoutePoint::Wire { x: x2, y: y2, .. },
                ) = (&pair[0], &pair[1])
                {
                    em.emit(
                        layer,
                        PrimitiveShape::Line {
                            x1: *x1,
                            y1: *y1,
                            x2: *x2,
                            y2: *y2,
                            width: *width,
                        },
                    );
                }
            }
        }
        CircuitElement::PcbBoard(board) => {
            let outline = match &board.outline {
                Some(points) if points.len() >= 3 => points.clone(),
                _ => {
                    let (hw, hh) = (board.width / 2.0, board.height / 2.0);
                    let c = board.center;
                    vec![
                        Point::new(c.x - hw, c.y - hh),
                        Point::new(c.x + hw, c.y - hh),
                        Point::new(c.x + hw, c.y + hh),
                        Point::new(c.x - hw, c.y + hh),
                    ]
                }
            };
            let mut closed = outline;
            if let Some(first) = closed.first().copied() {
                closed.push(first);
            }
            em.emit_path(BOARD_LAYER, &closed, BOARD_OUTLINE_WIDTH);
        }
        CircuitElement::PcbSilkscreenText(t) => em.emit(
            &silkscreen_layer(&t.layer),
            PrimitiveShape::Text {
                x: t.anchor_position.x,
                y: t.anchor_position.y,
                text: t.text.clone(),
                size: t.font_size,
            },
        ),
        CircuitElement::PcbSilkscreenLine(l) => em.emit(
            &silkscreen_layer(&l.layer),
            PrimitiveShape::Line {
                x1: l.x1,
                y1: l.y1,
                x2: l.x2,
                y2: l.y2,
                width: l.stroke_width,
            },
        ),
        CircuitElement::PcbSilkscreenPath(p) => {
            em.emit_path(&silkscreen_layer(&p.layer), &p.route, p.stroke_width)
        }
        CircuitElement::PcbSilkscreenRect(r) => em.emit(
            &silkscreen_layer(&r.layer),
            PrimitiveShape::Rect {
                x: r.center.x,
                y: r.center.y,
                w: r.width,
                h: r.height,
                ccw_rotation: 0.0,
            },
        ),
        CircuitElement::PcbSilkscreenCircle(c) => em.emit(
            &silkscreen_layer(&c.layer),
            PrimitiveShape::Circle {
                x: c.center.x,
                y: c.center.y,
                r: c.radius,
            },
        ),
        CircuitElement::PcbCopperPour(pour) => {
            if !pour.points.is_empty() {
                em.emit(
                    &pour.layer,
                    PrimitiveShape::PolygonWithArcs {
                        points: pour.points.clone(),
                    },
                );
            }
        }
        _ => {}
    }

    out
}

fn smtpad_primitives(pad: &PcbSmtPad, em: &mut Emitter<'_>) {
    let shape = match pad.shape {
        SmtPadShape::Polygon => pad
            .points
            .as_ref()
            .filter(|p| !p.is_empty())
            .map(|points| PrimitiveShape::Polygon {
                points: points.clone(),
            }),
        SmtPadShape::Circle => match (pad.x, pad.y, pad.radius) {
            (Some(x), Some(y), Some(r)) => Some(PrimitiveShape::Circle { x, y, r }),
            _ => None,
        },
        SmtPadShape::Rect | SmtPadShape::RotatedRect => match (pad.x, pad.y, pad.width, pad.height) {
            (Some(x), Some(y), Some(w), Some(h)) => Some(PrimitiveShape::Rect {
                x,
                y,
                w,
                h,
                ccw_rotation: pad.ccw_rotation.unwrap_or(0.0),
            }),
            _ => None,
        },
        SmtPadShape::Pill | SmtPadShape::RotatedPill => match (pad.x, pad.y, pad.width, pad.height) {
            (Some(x), Some(y), Some(w), Some(h)) => Some(PrimitiveShape::Pill {
                x,
                y,
                w,
                h,
                ccw_rotation: pad.ccw_rotation.unwrap_or(0.0),
            }),
            _ => None,
        },
    };
    if let Some(shape) = shape {
        em.emit(&pad.layer, shape);
    }
}

fn plated_hole_primitives(hole: &PcbPlatedHole, em: &mut Emitter<'_>) {
    let (x, y) = (hole.x, hole.y);
    let (copper, drill) = match hole.shape {
        PlatedHoleShape::Circle => (
            hole.outer_diameter
                .map(|d| PrimitiveShape::Circle { x, y, r: d / 2.0 }),
            hole.hole_diameter
                .map(|d| PrimitiveShape::Circle { x, y, r: d / 2.0 }),
        ),
        PlatedHoleShape::Oval | PlatedHoleShape::Pill => {
            let pill = hole.shape == PlatedHoleShape::Pill;
            (
                hole.outer_width
                    .zip(hole.outer_height)
                    .map(|(w, h)| pill_or_oval(pill, x, y, w, h)),
                hole.hole_width
                    .zip(hole.hole_height)
                    .map(|(w, h)| pill_or_oval(pill, x, y, w, h)),
            )
        }
        PlatedHoleShape::CircularHoleWithRectPad | PlatedHoleShape::PillHoleWithRectPad => {
            let pad = hole
                .rect_pad_width
                .zip(hole.rect_pad_height)
                .map(|(w, h)| PrimitiveShape::Rect {
                    x,
                    y,
                    w,
                    h,
                    ccw_rotation: hole.ccw_rotation.unwrap_or(0.0),
                });
            let drill = if hole.shape == PlatedHoleShape::CircularHoleWithRectPad {
                hole.hole_diameter
                    .map(|d| PrimitiveShape::Circle { x, y, r: d / 2.0 })
            } else {
                hole.hole_width
                    .zip(hole.hole_height)
                    .map(|(w, h)| PrimitiveShape::Pill {
                        x,
                        y,
                        w,
                        h,
                        ccw_rotation: hole.ccw_rotation.unwrap_or(0.0),
                    })
            };
            (pad, drill)
        }
    };
    if let Some(copper) = copper {
        em.emit_on(&hole.layers, copper);
    }
    if let Some(drill) = drill {
        em.emit(DRILL_LAYER, drill);
    }
}

pub fn circuit_to_primitives(elements: &[AnyCircuitElement]) -> Vec<Primitive> {
    elements.iter().flat_map(element_to_primitives).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: serde_json::Value) -> Vec<AnyCircuitElement> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_plated_hole_emits_copper_and_drill() {
        let elements = parse(json!([{
            "type": "pcb_plated_hole",
            "pcb_plated_hole_id": "h1",
            "pcb_component_id": "c1",
            "shape": "circle",
            "x": 1, "y": 2,
            "outer_diameter": 2.0, "hole_diameter": 1.0,
            "layers": ["top", "bottom"]
        }]));
        let prims = circuit_to_primitives(&elements);
        assert_eq!(prims.len(), 3);
        assert_eq!(prims[0].layer, "top");
        assert_eq!(prims[1].layer, "bottom");
        assert!(prims[2].is_drill());
        assert_eq!(prims[2].shape, PrimitiveShape::Circle { x: 1.0, y: 2.0, r: 0.5 });
        assert_eq!(prims[0].source.pcb_component_id.as_deref(), Some("c1"));
        assert_eq!(prims[0].pcb_drawing_object_id, "h1#0");
        assert_eq!(prims[2].pcb_drawing_object_id, "h1#2");
    }

    #[test]
    fn test_trace_segments_skip_vias() {
        let elements = parse(json!([{
            "type": "pcb_trace",
            "pcb_trace_id": "t1",
            "route": [
                { "route_type": "wire", "x": 0, "y": 0, "width": 0.2, "layer": "top" },
                { "route_type": "wire", "x": 5, "y": 0, "width": 0.2, "layer": "top" },
                { "route_type": "via", "x": 5, "y": 0, "from_layer": "top", "to_layer": "bottom" },
                { "route_type": "wire", "x": 5, "y": 0, "width": 0.2, "layer": "bottom" },
                { "route_type": "wire", "x": 5, "y": 5, "width": 0.2, "layer": "bottom" }
            ]
        }]));
        let prims = circuit_to_primitives(&elements);
        assert_eq!(prims.len(), 2);
        assert_eq!(prims[1].layer, "bottom");
    }

    #[test]
    fn test_pad_missing_geometry_is_skipped() {
        let elements = parse(json!([
            { "type": "pcb_smtpad", "pcb_smtpad_id": "p1", "shape": "rect", "x": 0, "y": 0 },
            { "type": "pcb_smtpad", "pcb_smtpad_id": "p2", "shape": "rect",
              "x": 0, "y": 0, "width": 1, "height": 1, "layer": "bottom" },
            { "type": "unknown_thing", "id": 3 }
        ]));
        let prims = circuit_to_primitives(&elements);
        assert_eq!(prims.len(), 1);
        assert_eq!(prims[0].source.element_id, "p2");
        assert_eq!(prims[0].layer, "bottom");
    }

    #[test]
    fn test_rotated_pill_keeps_rotation() {
        let elements = parse(json!([{
            "type": "pcb_smtpad", "pcb_smtpad_id": "p1", "shape": "rotated_pill",
            "x": 1, "y": 2, "width": 3, "height": 1, "radius": 0.5,
            "ccw_rotation": 30, "layer": "top"
        }]));
        let prims = circuit_to_primitives(&elements);
        assert_eq!(
            prims[0].shape,
            PrimitiveShape::Pill {
                x: 1.0,
                y: 2.0,
                w: 3.0,
                h: 1.0,
                ccw_rotation: 30.0,
            }
        );
    }

    #[test]
    fn test_board_outline_is_closed() {
        let elements = parse(json!([{
            "type": "pcb_board", "pcb_board_id": "b",
            "center": { "x": 0, "y": 0 }, "width": 10, "height": 4
        }]));
        let prims = circuit_to_primitives(&elements);
        assert_eq!(prims.len(), 4);
        assert!(prims.iter().all(|p| p.layer == BOARD_LAYER));
    }
}
