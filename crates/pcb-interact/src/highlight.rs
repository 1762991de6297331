//! Screen-space projection of hovered primitives.

use serde::Serialize;

use crate::geometry::polygon_bounding_box;
use crate::primitives::{Primitive, PrimitiveShape};
use crate::transform::Matrix;
use crate::types::Point;

/// Element kinds that are only ever highlighted through their pads/holes.
const NEVER_HIGHLIGHTED: &[&str] = &["pcb_via", "pcb_component"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightedPrimitive {
    #[serde(flatten)]
    pub primitive: Primitive,
    pub screen_x: f64,
    pub screen_y: f64,
    pub screen_w: f64,
    pub screen_h: f64,
    /// Rank among earlier highlights with an identical screen box. Only used
    /// to offset labels; it plays no part in hit-testing.
    pub same_space_index: usize,
}

impl HighlightedPrimitive {
    fn same_space(&self, x: f64, y: f64, w: f64, h: f64) -> bool {
        self.screen_x == x && self.screen_y == y && self.screen_w == w && self.screen_h == h
    }
}

/// Real-world centre and size of a primitive, if it has any extent.
pub fn primitive_extent(primitive: &Primitive) -> Option<(Point, f64, f64)> {
    match &primitive.shape {
        PrimitiveShape::Polygon { points } | PrimitiveShape::PolygonWithArcs { points } => {
            let bbox = polygon_bounding_box(points)?;
            Some((bbox.center(), bbox.width(), bbox.height()))
        }
        PrimitiveShape::Rect { x, y, w, h, .. } | PrimitiveShape::Pill { x, y, w, h, .. } => {
            Some((Point::new(*x, *y), *w, *h))
        }
        PrimitiveShape::Circle { x, y, r } => Some((Point::new(*x, *y), r * 2.0, r * 2.0)),
        PrimitiveShape::Oval { x, y, rx, ry } => Some((Point::new(*x, *y), rx * 2.0, ry * 2.0)),
        PrimitiveShape::Line {
            x1,
            y1,
            x2,
            y2,
            width,
        } => Some((
            Point::new((x1 + x2) / 2.0, (y1 + y2) / 2.0),
            (x2 - x1).abs() + width,
            (y2 - y1).abs() + width,
        )),
        PrimitiveShape::Text { .. } => None,
    }
}

/// Project hit primitives into screen space.
///
/// `same_space_index` is found by rescanning the output built so far, which
/// is quadratic; hover sets are a handful of primitives so this stays cheap.
pub fn project_highlights<'a, I>(hits: I, transform: &Matrix) -> Vec<HighlightedPrimitive>
where
    I: IntoIterator<Item = &'a Primitive>,
{
    let scale = transform.linear_scale();
    let mut out: Vec<HighlightedPrimitive> = Vec::new();
    for primitive in hits {
        if primitive.is_drill() || NEVER_HIGHLIGHTED.contains(&primitive.source.element_type.as_str())
        {
            continue;
        }
        let Some((center, w, h)) = primitive_extent(primitive) else {
            continue;
        };
        let screen = transform.apply(center);
        let (screen_w, screen_h) = (w * scale, h * scale);
        let same_space_index = out
            .iter()
            .filter(|o| o.same_space(screen.x, screen.y, screen_w, screen_h))
            .count();
        out.push(HighlightedPrimitive {
            primitive: primitive.clone(),
            screen_x: screen.x,
            screen_y: screen.y,
            screen_w,
            screen_h,
            same_space_index,
        });
    }
    out
}
