use std::f64::consts::PI;

use pcb_interact::anchor::AnchorOffset;
use pcb_interact::connectivity::RatsNestLine;
use pcb_interact::edit::BoardHandle;
use pcb_interact::highlight::HighlightedPrimitive;
use pcb_interact::primitives::{Primitive, PrimitiveShape, BOARD_LAYER, DRILL_LAYER};
use pcb_interact::store::ViewState;
use pcb_interact::types::Point;
use pcb_interact::Matrix;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

#[derive(Clone)]
pub struct Colors {
    pub background: String,
    pub board: String,
    pub copper_top: String,
    pub copper_bottom: String,
    pub copper_pour: String,
    pub silkscreen: String,
    pub drill: String,
    pub highlight: String,
    pub handle: String,
    pub rats_nest: String,
    pub trace_hint: String,
    pub anchor: String,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            background: "#000000".to_string(),
            board: "#ffffff".to_string(),
            copper_top: "#c87533".to_string(),
            copper_bottom: "#4f7fc8".to_string(),
            copper_pour: "rgba(200, 117, 51, 0.35)".to_string(),
            silkscreen: "#f2eda1".to_string(),
            drill: "#ff26e2".to_string(),
            highlight: "#00c8ff".to_string(),
            handle: "#ffffff".to_string(),
            rats_nest: "#e0e0e0".to_string(),
            trace_hint: "#ff6060".to_string(),
            anchor: "#7fff7f".to_string(),
        }
    }
}

impl Colors {
    /// Colors come from CSS custom properties on `el` where set.
    pub fn from_element(el: &web_sys::Element) -> Self {
        let mut colors = Self::default();
        let Some(style) = web_sys::window().and_then(|w| w.get_computed_style(el).ok().flatten()) else {
            return colors;
        };
        let read = |name: &str, slot: &mut String| {
            let value = style.get_property_value(name).unwrap_or_default();
            let value = value.trim();
            if !value.is_empty() {
                *slot = value.to_string();
            }
        };
        read("--pcb-background", &mut colors.background);
        read("--pcb-board-edge", &mut colors.board);
        read("--pcb-copper-top", &mut colors.copper_top);
        read("--pcb-copper-bottom", &mut colors.copper_bottom);
        read("--pcb-silkscreen", &mut colors.silkscreen);
        read("--pcb-highlight", &mut colors.highlight);
        colors
    }

    fn for_primitive(&self, primitive: &Primitive) -> &str {
        if primitive.source.element_type == "pcb_copper_pour" {
            return &self.copper_pour;
        }
        match primitive.layer.as_str() {
            "top" => &self.copper_top,
            "bottom" => &self.copper_bottom,
            DRILL_LAYER => &self.drill,
            BOARD_LAYER => &self.board,
            l if l.ends_with("_silkscreen") => &self.silkscreen,
            _ => &self.copper_bottom,
        }
    }
}

pub fn get_ctx(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
}

pub fn clear_canvas(ctx: &CanvasRenderingContext2d, canvas: &HtmlCanvasElement, color: &str) {
    let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
    ctx.set_fill_style_str(color);
    ctx.fill_rect(0.0, 0.0, canvas.width() as f64, canvas.height() as f64);
}

// ─── Board primitives ───────────────────────────────────────────────

/// Draw order: everything else, then the selected layer on top, then drills.
fn draw_rank(primitive: &Primitive, selected_layer: &str) -> u8 {
    if primitive.layer == DRILL_LAYER {
        3
    } else if primitive.layer == selected_layer {
        2
    } else if primitive.layer == BOARD_LAYER {
        0
    } else {
        1
    }
}

fn draw_shape(ctx: &CanvasRenderingContext2d, shape: &PrimitiveShape, pixel: f64) {
    match shape {
        PrimitiveShape::Circle { x, y, r } => {
            ctx.begin_path();
            let _ = ctx.arc(*x, *y, *r, 0.0, 2.0 * PI);
            ctx.fill();
        }
        PrimitiveShape::Rect {
            x,
            y,
            w,
            h,
            ccw_rotation,
        } => {
            ctx.save();
            let _ = ctx.translate(*x, *y);
            let _ = ctx.rotate(ccw_rotation.to_radians());
            ctx.fill_rect(-w / 2.0, -h / 2.0, *w, *h);
            ctx.restore();
        }
        PrimitiveShape::Oval { x, y, rx, ry } => {
            ctx.begin_path();
            let _ = ctx.ellipse(*x, *y, *rx, *ry, 0.0, 0.0, 2.0 * PI);
            ctx.fill();
        }
        PrimitiveShape::Pill {
            x,
            y,
            w,
            h,
            ccw_rotation,
        } => {
            let r = w.min(*h) / 2.0;
            let (dx, dy) = if w > h { (w / 2.0 - r, 0.0) } else { (0.0, h / 2.0 - r) };
            ctx.save();
            let _ = ctx.translate(*x, *y);
            let _ = ctx.rotate(ccw_rotation.to_radians());
            ctx.set_line_cap("round");
            ctx.set_line_width(2.0 * r);
            ctx.begin_path();
            ctx.move_to(-dx, -dy);
            ctx.line_to(dx, dy);
            ctx.stroke();
            ctx.restore();
        }
        PrimitiveShape::Line {
            x1,
            y1,
            x2,
            y2,
            width,
        } => {
            ctx.set_line_cap("round");
            ctx.set_line_width(width.max(pixel));
            ctx.begin_path();
            ctx.move_to(*x1, *y1);
            ctx.line_to(*x2, *y2);
            ctx.stroke();
        }
        PrimitiveShape::Polygon { points } | PrimitiveShape::PolygonWithArcs { points } => {
            let Some((first, rest)) = points.split_first() else {
                return;
            };
            ctx.begin_path();
            ctx.move_to(first.x, first.y);
            for p in rest {
                ctx.line_to(p.x, p.y);
            }
            ctx.close_path();
            ctx.fill();
        }
        PrimitiveShape::Text { .. } => {}
    }
}

/// Text is drawn in screen space so it is not mirrored by the y flip.
fn draw_text(ctx: &CanvasRenderingContext2d, transform: &Matrix, shape: &PrimitiveShape) {
    let PrimitiveShape::Text { x, y, text, size } = shape else {
        return;
    };
    let at = transform.apply(Point::new(*x, *y));
    let px = (size * transform.linear_scale()).max(6.0);
    ctx.set_font(&format!("{px:.0}px monospace"));
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    let _ = ctx.fill_text(text, at.x, at.y);
}

pub fn draw_primitives(
    ctx: &CanvasRenderingContext2d,
    primitives: &[Primitive],
    transform: &Matrix,
    view: &ViewState,
    colors: &Colors,
) {
    let mut ordered: Vec<&Primitive> = primitives
        .iter()
        .filter(|p| view.is_showing_copper_pours || p.source.element_type != "pcb_copper_pour")
        .collect();
    ordered.sort_by_key(|p| draw_rank(p, &view.selected_layer));

    let pixel = 1.0 / transform.linear_scale().max(f64::EPSILON);
    let t = transform;
    let _ = ctx.set_transform(t.a, t.b, t.c, t.d, t.e, t.f);
    for primitive in &ordered {
        let color = colors.for_primitive(primitive);
        ctx.set_fill_style_str(color);
        ctx.set_stroke_style_str(color);
        if !matches!(primitive.shape, PrimitiveShape::Text { .. }) {
            draw_shape(ctx, &primitive.shape, pixel);
        }
    }

    let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
    for primitive in ordered.iter().filter(|p| matches!(p.shape, PrimitiveShape::Text { .. })) {
        ctx.set_fill_style_str(colors.for_primitive(primitive));
        draw_text(ctx, transform, &primitive.shape);
    }
}

// ─── Screen-space overlays ──────────────────────────────────────────

pub fn draw_highlights(ctx: &CanvasRenderingContext2d, highlights: &[HighlightedPrimitive], colors: &Colors) {
    let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
    ctx.set_stroke_style_str(&colors.highlight);
    ctx.set_fill_style_str(&colors.highlight);
    ctx.set_line_width(1.0);
    ctx.set_font("11px sans-serif");
    ctx.set_text_align("left");
    ctx.set_text_baseline("bottom");
    for h in highlights {
        let (w, hh) = (h.screen_w.max(4.0), h.screen_h.max(4.0));
        let left = h.screen_x - w / 2.0;
        let top = h.screen_y - hh / 2.0;
        ctx.stroke_rect(left - 2.0, top - 2.0, w + 4.0, hh + 4.0);
        let label = match &h.primitive.source.pcb_port_id {
            Some(port) => format!("{} {}", h.primitive.source.element_type, port),
            None => h.primitive.source.element_type.clone(),
        };
        // stack labels of boxes that occupy the same space
        let _ = ctx.fill_text(&label, left, top - 4.0 - 13.0 * h.same_space_index as f64);
    }
}

pub fn draw_board_handles(ctx: &CanvasRenderingContext2d, handles: &[(BoardHandle, Point)], active: Option<BoardHandle>, radius: f64, colors: &Colors) {
    let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
    ctx.set_line_width(1.5);
    for (handle, at) in handles {
        let fill = if Some(*handle) == active { &colors.highlight } else { &colors.handle };
        ctx.set_fill_style_str(fill);
        ctx.set_stroke_style_str(&colors.background);
        ctx.begin_path();
        if *handle == BoardHandle::Move {
            let _ = ctx.arc(at.x, at.y, radius, 0.0, 2.0 * PI);
        } else {
            ctx.rect(at.x - radius / 2.0, at.y - radius / 2.0, radius, radius);
        }
        ctx.fill();
        ctx.stroke();
    }
}

pub fn draw_rotation_handle(ctx: &CanvasRenderingContext2d, center: Point, handle: Point, radius: f64, colors: &Colors) {
    let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
    ctx.set_stroke_style_str(&colors.handle);
    ctx.set_line_width(1.0);
    ctx.begin_path();
    ctx.move_to(center.x, center.y);
    ctx.line_to(handle.x, handle.y);
    ctx.stroke();
    ctx.set_fill_style_str(&colors.highlight);
    ctx.begin_path();
    let _ = ctx.arc(handle.x, handle.y, radius, 0.0, 2.0 * PI);
    ctx.fill();
}

/// `route` is in real coordinates.
pub fn draw_trace_preview(ctx: &CanvasRenderingContext2d, transform: &Matrix, route: &[Point], cursor: Option<Point>, colors: &Colors) {
    let Some((first, rest)) = route.split_first() else {
        return;
    };
    let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
    ctx.set_stroke_style_str(&colors.trace_hint);
    ctx.set_line_width(2.0);
    ctx.begin_path();
    let start = transform.apply(*first);
    ctx.move_to(start.x, start.y);
    for p in rest {
        let s = transform.apply(*p);
        ctx.line_to(s.x, s.y);
    }
    if let Some(c) = cursor {
        ctx.line_to(c.x, c.y);
    }
    ctx.stroke();
}

pub fn draw_rats_nest(ctx: &CanvasRenderingContext2d, transform: &Matrix, lines: &[RatsNestLine], colors: &Colors) {
    let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
    ctx.set_stroke_style_str(&colors.rats_nest);
    ctx.set_line_width(1.0);
    let _ = ctx.set_line_dash(&js_sys::Array::of2(&JsValue::from_f64(3.0), &JsValue::from_f64(3.0)));
    ctx.begin_path();
    for line in lines {
        let a = transform.apply(line.start);
        let b = transform.apply(line.end);
        ctx.move_to(a.x, a.y);
        ctx.line_to(b.x, b.y);
    }
    ctx.stroke();
    let _ = ctx.set_line_dash(&js_sys::Array::new());
}

/// Dimension lines from each anchor to its target, x leg then y leg.
pub fn draw_anchor_offsets(ctx: &CanvasRenderingContext2d, transform: &Matrix, offsets: &[AnchorOffset], colors: &Colors) {
    let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
    ctx.set_stroke_style_str(&colors.anchor);
    ctx.set_fill_style_str(&colors.anchor);
    ctx.set_line_width(1.0);
    ctx.set_font("10px sans-serif");
    ctx.set_text_align("center");
    ctx.set_text_baseline("bottom");
    for o in offsets {
        let a = transform.apply(o.anchor);
        let corner = transform.apply(Point::new(o.target.x, o.anchor.y));
        let t = transform.apply(o.target);
        ctx.begin_path();
        ctx.move_to(a.x, a.y);
        ctx.line_to(corner.x, corner.y);
        ctx.line_to(t.x, t.y);
        ctx.stroke();
        let _ = ctx.fill_text(&o.label_x, (a.x + corner.x) / 2.0, a.y - 2.0);
        let _ = ctx.fill_text(&o.label_y, corner.x + 4.0, (corner.y + t.y) / 2.0);
    }
}
