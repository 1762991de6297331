use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::{Add, Sub};

/// Fields of a known element that the model does not name. Kept so a
/// parse/serialize cycle is lossless.
pub type Extra = Map<String, Value>;

fn default_layer() -> String {
    "top".to_string()
}

fn default_font_size() -> f64 {
    1.0
}

// ─── Point ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

// ─── Element wrapper ─────────────────────────────────────────────────

/// One entry of a circuit JSON array. Entries the model does not know (or
/// cannot parse) are carried verbatim so they survive an edit round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnyCircuitElement {
    Known(CircuitElement),
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CircuitElement {
    PcbBoard(PcbBoard),
    PcbPanel(PcbPanel),
    PcbGroup(PcbGroup),
    PcbComponent(PcbComponent),
    PcbSmtpad(PcbSmtPad),
    PcbPlatedHole(PcbPlatedHole),
    PcbHole(PcbHole),
    PcbVia(PcbVia),
    PcbTrace(PcbTrace),
    PcbPort(PcbPort),
    PcbTraceHint(PcbTraceHint),
    PcbSilkscreenText(PcbSilkscreenText),
    PcbSilkscreenLine(PcbSilkscreenLine),
    PcbSilkscreenPath(PcbSilkscreenPath),
    PcbSilkscreenRect(PcbSilkscreenRect),
    PcbSilkscreenCircle(PcbSilkscreenCircle),
    PcbCopperPour(PcbCopperPour),
    SourcePort(SourcePort),
    SourceTrace(SourceTrace),
}

impl CircuitElement {
    pub fn element_type(&self) -> &'static str {
        match self {
            CircuitElement::PcbBoard(_) => "pcb_board",
            CircuitElement::PcbPanel(_) => "pcb_panel",
            CircuitElement::PcbGroup(_) => "pcb_group",
            CircuitElement::PcbComponent(_) => "pcb_component",
            CircuitElement::PcbSmtpad(_) => "pcb_smtpad",
            CircuitElement::PcbPlatedHole(_) => "pcb_plated_hole",
            CircuitElement::PcbHole(_) => "pcb_hole",
            CircuitElement::PcbVia(_) => "pcb_via",
            CircuitElement::PcbTrace(_) => "pcb_trace",
            CircuitElement::PcbPort(_) => "pcb_port",
            CircuitElement::PcbTraceHint(_) => "pcb_trace_hint",
            CircuitElement::PcbSilkscreenText(_) => "pcb_silkscreen_text",
            CircuitElement::PcbSilkscreenLine(_) => "pcb_silkscreen_line",
            CircuitElement::PcbSilkscreenPath(_) => "pcb_silkscreen_path",
            CircuitElement::PcbSilkscreenRect(_) => "pcb_silkscreen_rect",
            CircuitElement::PcbSilkscreenCircle(_) => "pcb_silkscreen_circle",
            CircuitElement::PcbCopperPour(_) => "pcb_copper_pour",
            CircuitElement::SourcePort(_) => "source_port",
            CircuitElement::SourceTrace(_) => "source_trace",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            CircuitElement::PcbBoard(e) => &e.pcb_board_id,
            CircuitElement::PcbPanel(e) => &e.pcb_panel_id,
            CircuitElement::PcbGroup(e) => &e.pcb_group_id,
            CircuitElement::PcbComponent(e) => &e.pcb_component_id,
            CircuitElement::PcbSmtpad(e) => &e.pcb_smtpad_id,
            CircuitElement::PcbPlatedHole(e) => &e.pcb_plated_hole_id,
            CircuitElement::PcbHole(e) => &e.pcb_hole_id,
            CircuitElement::PcbVia(e) => &e.pcb_via_id,
            CircuitElement::PcbTrace(e) => &e.pcb_trace_id,
            CircuitElement::PcbPort(e) => &e.pcb_port_id,
            CircuitElement::PcbTraceHint(e) => &e.pcb_trace_hint_id,
            CircuitElement::PcbSilkscreenText(e) => &e.pcb_silkscreen_text_id,
            CircuitElement::PcbSilkscreenLine(e) => &e.pcb_silkscreen_line_id,
            CircuitElement::PcbSilkscreenPath(e) => &e.pcb_silkscreen_path_id,
            CircuitElement::PcbSilkscreenRect(e) => &e.pcb_silkscreen_rect_id,
            CircuitElement::PcbSilkscreenCircle(e) => &e.pcb_silkscreen_circle_id,
            CircuitElement::PcbCopperPour(e) => &e.pcb_copper_pour_id,
            CircuitElement::SourcePort(e) => &e.source_port_id,
            CircuitElement::SourceTrace(e) => &e.source_trace_id,
        }
    }

    /// The component this element belongs to. A component belongs to itself.
    pub fn pcb_component_id(&self) -> Option<&str> {
        match self {
            CircuitElement::PcbComponent(e) => Some(&e.pcb_component_id),
            CircuitElement::PcbSmtpad(e) => e.pcb_component_id.as_deref(),
            CircuitElement::PcbPlatedHole(e) => e.pcb_component_id.as_deref(),
            CircuitElement::PcbHole(e) => e.pcb_component_id.as_deref(),
            CircuitElement::PcbTrace(e) => e.pcb_component_id.as_deref(),
            CircuitElement::PcbPort(e) => e.pcb_component_id.as_deref(),
            CircuitElement::PcbTraceHint(e) => Some(&e.pcb_component_id),
            CircuitElement::PcbSilkscreenText(e) => e.pcb_component_id.as_deref(),
            CircuitElement::PcbSilkscreenLine(e) => e.pcb_component_id.as_deref(),
            CircuitElement::PcbSilkscreenPath(e) => e.pcb_component_id.as_deref(),
            CircuitElement::PcbSilkscreenRect(e) => e.pcb_component_id.as_deref(),
            CircuitElement::PcbSilkscreenCircle(e) => e.pcb_component_id.as_deref(),
            _ => None,
        }
    }
}

impl AnyCircuitElement {
    pub fn known(&self) -> Option<&CircuitElement> {
        match self {
            AnyCircuitElement::Known(e) => Some(e),
            AnyCircuitElement::Other(_) => None,
        }
    }

    pub fn element_type(&self) -> &str {
        match self {
            AnyCircuitElement::Known(e) => e.element_type(),
            AnyCircuitElement::Other(v) => v.get("type").and_then(Value::as_str).unwrap_or(""),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.known().map(CircuitElement::id)
    }

    pub fn pcb_component_id(&self) -> Option<&str> {
        self.known().and_then(CircuitElement::pcb_component_id)
    }

    pub fn as_component(&self) -> Option<&PcbComponent> {
        match self.known()? {
            CircuitElement::PcbComponent(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_board(&self) -> Option<&PcbBoard> {
        match self.known()? {
            CircuitElement::PcbBoard(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_smtpad(&self) -> Option<&PcbSmtPad> {
        match self.known()? {
            CircuitElement::PcbSmtpad(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_port(&self) -> Option<&PcbPort> {
        match self.known()? {
            CircuitElement::PcbPort(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_trace_hint(&self) -> Option<&PcbTraceHint> {
        match self.known()? {
            CircuitElement::PcbTraceHint(h) => Some(h),
            _ => None,
        }
    }
}

impl From<CircuitElement> for AnyCircuitElement {
    fn from(e: CircuitElement) -> Self {
        AnyCircuitElement::Known(e)
    }
}

pub fn find_component<'a>(elements: &'a [AnyCircuitElement], id: &str) -> Option<&'a PcbComponent> {
    elements
        .iter()
        .filter_map(AnyCircuitElement::as_component)
        .find(|c| c.pcb_component_id == id)
}

pub fn find_board<'a>(elements: &'a [AnyCircuitElement], id: &str) -> Option<&'a PcbBoard> {
    elements
        .iter()
        .filter_map(AnyCircuitElement::as_board)
        .find(|b| b.pcb_board_id == id)
}

// ─── Board / Panel / Group ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbBoard {
    pub pcb_board_id: String,
    pub center: Point,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_panel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_offset_x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_offset_y: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbPanel {
    pub pcb_panel_id: String,
    pub center: Point,
    pub width: f64,
    pub height: f64,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbGroup {
    pub pcb_group_id: String,
    pub center: Point,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub pcb_component_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_position: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positioned_relative_to_pcb_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positioned_relative_to_pcb_board_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_offset_x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_offset_y: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl PcbGroup {
    /// Point children are positioned against: the explicit anchor, or the centre.
    pub fn anchor(&self) -> Point {
        self.anchor_position.unwrap_or(self.center)
    }
}

// ─── Component ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbComponent {
    pub pcb_component_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_component_id: Option<String>,
    pub center: Point,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_layer")]
    pub layer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positioned_relative_to_pcb_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positioned_relative_to_pcb_board_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_offset_x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_offset_y: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

// ─── Pads / Holes / Vias ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmtPadShape {
    Rect,
    RotatedRect,
    Circle,
    Pill,
    RotatedPill,
    Polygon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbSmtPad {
    pub pcb_smtpad_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_component_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_port_id: Option<String>,
    #[serde(default = "default_layer")]
    pub layer: String,
    pub shape: SmtPadShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ccw_rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl PcbSmtPad {
    pub fn center(&self) -> Option<Point> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some(Point::new(x, y)),
            _ => {
                let bbox = crate::geometry::polygon_bounding_box(self.points.as_deref()?)?;
                Some(bbox.center())
            }
        }
    }

    /// Unrotated width/height of the pad, if the shape has them.
    pub fn size(&self) -> Option<(f64, f64)> {
        match self.shape {
            SmtPadShape::Circle => self.radius.map(|r| (r * 2.0, r * 2.0)),
            SmtPadShape::Polygon => {
                let bbox = crate::geometry::polygon_bounding_box(self.points.as_deref()?)?;
                Some((bbox.width(), bbox.height()))
            }
            _ => Some((self.width?, self.height?)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatedHoleShape {
    Circle,
    Oval,
    Pill,
    CircularHoleWithRectPad,
    PillHoleWithRectPad,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbPlatedHole {
    pub pcb_plated_hole_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_component_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_port_id: Option<String>,
    pub shape: PlatedHoleShape,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer_diameter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole_diameter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect_pad_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect_pad_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ccw_rotation: Option<f64>,
    #[serde(default)]
    pub layers: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoleShape {
    #[default]
    Circle,
    Oval,
    Pill,
    Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbHole {
    pub pcb_hole_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_component_id: Option<String>,
    #[serde(default)]
    pub hole_shape: HoleShape,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole_diameter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole_height: Option<f64>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbVia {
    pub pcb_via_id: String,
    pub x: f64,
    pub y: f64,
    pub outer_diameter: f64,
    pub hole_diameter: f64,
    #[serde(default)]
    pub layers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_trace_id: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

// ─── Traces / Ports / Trace hints ────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "route_type", rename_all = "snake_case")]
pub enum TraceRoutePoint {
    Wire {
        x: f64,
        y: f64,
        width: f64,
        #[serde(default = "default_layer")]
        layer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_pcb_port_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_pcb_port_id: Option<String>,
    },
    Via {
        x: f64,
        y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_layer: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to_layer: Option<String>,
    },
}

impl TraceRoutePoint {
    pub fn position(&self) -> Point {
        match self {
            TraceRoutePoint::Wire { x, y, .. } | TraceRoutePoint::Via { x, y, .. } => {
                Point::new(*x, *y)
            }
        }
    }

    pub fn set_position(&mut self, p: Point) {
        match self {
            TraceRoutePoint::Wire { x, y, .. } | TraceRoutePoint::Via { x, y, .. } => {
                *x = p.x;
                *y = p.y;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbTrace {
    pub pcb_trace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_component_id: Option<String>,
    #[serde(default)]
    pub route: Vec<TraceRoutePoint>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbPort {
    pub pcb_port_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_port_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_component_id: Option<String>,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub layers: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteHintPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<bool>,
}

impl RouteHintPoint {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbTraceHint {
    pub pcb_trace_hint_id: String,
    pub pcb_port_id: String,
    pub pcb_component_id: String,
    #[serde(default)]
    pub route: Vec<RouteHintPoint>,
    #[serde(flatten)]
    pub extra: Extra,
}

// ─── Silkscreen / Copper pour ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbSilkscreenText {
    pub pcb_silkscreen_text_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_component_id: Option<String>,
    pub text: String,
    pub anchor_position: Point,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_layer")]
    pub layer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ccw_rotation: Option<f64>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbSilkscreenLine {
    pub pcb_silkscreen_line_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_component_id: Option<String>,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    #[serde(default)]
    pub stroke_width: f64,
    #[serde(default = "default_layer")]
    pub layer: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbSilkscreenPath {
    pub pcb_silkscreen_path_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_component_id: Option<String>,
    #[serde(default)]
    pub route: Vec<Point>,
    #[serde(default)]
    pub stroke_width: f64,
    #[serde(default = "default_layer")]
    pub layer: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbSilkscreenRect {
    pub pcb_silkscreen_rect_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_component_id: Option<String>,
    pub center: Point,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_layer")]
    pub layer: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbSilkscreenCircle {
    pub pcb_silkscreen_circle_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_component_id: Option<String>,
    pub center: Point,
    pub radius: f64,
    #[serde(default = "default_layer")]
    pub layer: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbCopperPour {
    pub pcb_copper_pour_id: String,
    #[serde(default = "default_layer")]
    pub layer: String,
    #[serde(default)]
    pub points: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_net_id: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

// ─── Source (logical) elements ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePort {
    pub source_port_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_component_id: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTrace {
    pub source_trace_id: String,
    #[serde(default)]
    pub connected_source_port_ids: Vec<String>,
    #[serde(default)]
    pub connected_source_net_ids: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Parse a circuit JSON array.
pub fn parse_circuit(json: &str) -> Result<Vec<AnyCircuitElement>, serde_json::Error> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_and_unknown_elements() {
        let elements: Vec<AnyCircuitElement> = serde_json::from_value(json!([
            {
                "type": "pcb_component",
                "pcb_component_id": "pcb_component_0",
                "center": { "x": 1.0, "y": 2 },
                "width": 3, "height": 4, "rotation": 0,
                "layer": "top",
                "obstructs_within_bounds": true
            },
            { "type": "schematic_box", "x": 1 },
        ]))
        .unwrap();

        assert_eq!(elements.len(), 2);
        let comp = elements[0].as_component().unwrap();
        assert_eq!(comp.center, Point::new(1.0, 2.0));
        assert_eq!(comp.extra.get("obstructs_within_bounds"), Some(&json!(true)));
        assert!(matches!(elements[1], AnyCircuitElement::Other(_)));
        assert_eq!(elements[1].element_type(), "schematic_box");
        assert_eq!(elements[1].id(), None);
    }

    #[test]
    fn test_round_trip_preserves_extra_fields() {
        let value = json!({
            "type": "pcb_smtpad",
            "pcb_smtpad_id": "pad1",
            "pcb_component_id": "c1",
            "shape": "rect",
            "x": 0.5, "y": -0.5, "width": 1.0, "height": 0.6,
            "layer": "top",
            "port_hints": ["1"]
        });
        let element: AnyCircuitElement = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(element.element_type(), "pcb_smtpad");
        assert_eq!(element.pcb_component_id(), Some("c1"));
        assert_eq!(serde_json::to_value(&element).unwrap(), value);
    }

    #[test]
    fn test_malformed_known_type_is_kept_verbatim() {
        // pcb_board without a centre cannot be modelled
        let value = json!({ "type": "pcb_board", "pcb_board_id": "b", "width": 10 });
        let element: AnyCircuitElement = serde_json::from_value(value.clone()).unwrap();
        assert!(element.known().is_none());
        assert_eq!(serde_json::to_value(&element).unwrap(), value);
    }

    #[test]
    fn test_pad_center_and_size() {
        let pad: AnyCircuitElement = serde_json::from_value(json!({
            "type": "pcb_smtpad",
            "pcb_smtpad_id": "p",
            "shape": "polygon",
            "points": [{"x": 0, "y": 0}, {"x": 2, "y": 0}, {"x": 2, "y": 1}]
        }))
        .unwrap();
        let pad = pad.as_smtpad().unwrap();
        assert_eq!(pad.center(), Some(Point::new(1.0, 0.5)));
        assert_eq!(pad.size(), Some((2.0, 1.0)));
    }
}
