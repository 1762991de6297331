//! Offsets between positioned elements and the element they are anchored to.
//!
//! One computation covers every relationship; a resolver per relationship
//! finds the anchor parent of an element and the two points to measure.

use serde::Serialize;

use crate::store::{PcbGroupViewMode, ViewState};
use crate::types::{AnyCircuitElement, CircuitElement, PcbGroup, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorKind {
    ComponentToBoard,
    ComponentToGroup,
    GroupToGroup,
    BoardToPanel,
}

impl AnchorKind {
    pub fn involves_group(self) -> bool {
        matches!(self, AnchorKind::ComponentToGroup | AnchorKind::GroupToGroup)
    }
}

/// What a resolver found for one element.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorRelation {
    pub kind: AnchorKind,
    pub anchor_id: String,
    pub anchor: Point,
    pub target: Point,
    pub label_x: Option<String>,
    pub label_y: Option<String>,
}

pub trait AnchorResolver {
    fn resolve(&self, element: &AnyCircuitElement, elements: &[AnyCircuitElement]) -> Option<AnchorRelation>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnchorOffset {
    pub target_id: String,
    pub anchor_id: String,
    pub kind: AnchorKind,
    pub anchor: Point,
    pub target: Point,
    pub dx: f64,
    pub dy: f64,
    pub label_x: String,
    pub label_y: String,
}

fn find_group<'a>(elements: &'a [AnyCircuitElement], id: &str) -> Option<&'a PcbGroup> {
    elements.iter().find_map(|e| match e.known()? {
        CircuitElement::PcbGroup(g) if g.pcb_group_id == id => Some(g),
        _ => None,
    })
}

fn find_panel_center(elements: &[AnyCircuitElement], id: &str) -> Option<Point> {
    elements.iter().find_map(|e| match e.known()? {
        CircuitElement::PcbPanel(p) if p.pcb_panel_id == id => Some(p.center),
        _ => None,
    })
}

pub struct ComponentToBoard;

impl AnchorResolver for ComponentToBoard {
    fn resolve(&self, element: &AnyCircuitElement, elements: &[AnyCircuitElement]) -> Option<AnchorRelation> {
        let component = element.as_component()?;
        let board_id = component.positioned_relative_to_pcb_board_id.as_deref()?;
        let board = crate::types::find_board(elements, board_id)?;
        Some(AnchorRelation {
            kind: AnchorKind::ComponentToBoard,
            anchor_id: board.pcb_board_id.clone(),
            anchor: board.center,
            target: component.center,
            label_x: component.display_offset_x.clone(),
            label_y: component.display_offset_y.clone(),
        })
    }
}

pub struct ComponentToGroup;

impl AnchorResolver for ComponentToGroup {
    fn resolve(&self, element: &AnyCircuitElement, elements: &[AnyCircuitElement]) -> Option<AnchorRelation> {
        let component = element.as_component()?;
        let group = find_group(elements, component.positioned_relative_to_pcb_group_id.as_deref()?)?;
        Some(AnchorRelation {
            kind: AnchorKind::ComponentToGroup,
            anchor_id: group.pcb_group_id.clone(),
            anchor: group.anchor(),
            target: component.center,
            label_x: component.display_offset_x.clone(),
            label_y: component.display_offset_y.clone(),
        })
    }
}

pub struct GroupToGroup;

impl AnchorResolver for GroupToGroup {
    fn resolve(&self, element: &AnyCircuitElement, elements: &[AnyCircuitElement]) -> Option<AnchorRelation> {
        let CircuitElement::PcbGroup(group) = element.known()? else {
            return None;
        };
        let parent = find_group(elements, group.positioned_relative_to_pcb_group_id.as_deref()?)?;
        Some(AnchorRelation {
            kind: AnchorKind::GroupToGroup,
            anchor_id: parent.pcb_group_id.clone(),
            anchor: parent.anchor(),
            target: group.anchor(),
            label_x: group.display_offset_x.clone(),
            label_y: group.display_offset_y.clone(),
        })
    }
}

pub struct BoardToPanel;

impl AnchorResolver for BoardToPanel {
    fn resolve(&self, element: &AnyCircuitElement, elements: &[AnyCircuitElement]) -> Option<AnchorRelation> {
        let board = element.as_board()?;
        let panel_id = board.pcb_panel_id.as_deref()?;
        Some(AnchorRelation {
            kind: AnchorKind::BoardToPanel,
            anchor_id: panel_id.to_string(),
            anchor: find_panel_center(elements, panel_id)?,
            target: board.center,
            label_x: board.display_offset_x.clone(),
            label_y: board.display_offset_y.clone(),
        })
    }
}

pub fn default_resolvers() -> Vec<Box<dyn AnchorResolver>> {
    vec![
        Box::new(ComponentToBoard),
        Box::new(ComponentToGroup),
        Box::new(GroupToGroup),
        Box::new(BoardToPanel),
    ]
}

fn format_offset(value: f64) -> String {
    format!("{value:.2}mm")
}

pub fn compute_anchor_offsets_with(
    elements: &[AnyCircuitElement],
    resolvers: &[Box<dyn AnchorResolver>],
) -> Vec<AnchorOffset> {
    let mut out = Vec::new();
    for element in elements {
        let Some(target_id) = element.id() else {
            continue;
        };
        for resolver in resolvers {
            let Some(rel) = resolver.resolve(element, elements) else {
                continue;
            };
            let dx = rel.target.x - rel.anchor.x;
            let dy = rel.target.y - rel.anchor.y;
            out.push(AnchorOffset {
                target_id: target_id.to_string(),
                anchor_id: rel.anchor_id,
                kind: rel.kind,
                anchor: rel.anchor,
                target: rel.target,
                dx,
                dy,
                label_x: rel.label_x.unwrap_or_else(|| format_offset(dx)),
                label_y: rel.label_y.unwrap_or_else(|| format_offset(dy)),
            });
        }
    }
    out
}

pub fn compute_anchor_offsets(elements: &[AnyCircuitElement]) -> Vec<AnchorOffset> {
    compute_anchor_offsets_with(elements, &default_resolvers())
}

/// Offsets the overlay should draw for the current view toggles. Group
/// relations follow the group visibility and naming filters.
pub fn visible_anchor_offsets(elements: &[AnyCircuitElement], view: &ViewState) -> Vec<AnchorOffset> {
    if !view.is_showing_group_anchor_offsets {
        return Vec::new();
    }
    let group_shown = |id: &str| {
        view.is_showing_pcb_groups
            && find_group(elements, id).is_some_and(|g| match view.pcb_group_view_mode {
                PcbGroupViewMode::All => true,
                PcbGroupViewMode::NamedOnly => g.name.as_deref().is_some_and(|n| !n.is_empty()),
            })
    };
    compute_anchor_offsets(elements)
        .into_iter()
        .filter(|o| match o.kind {
            AnchorKind::ComponentToGroup => group_shown(&o.anchor_id),
            AnchorKind::GroupToGroup => group_shown(&o.anchor_id) && group_shown(&o.target_id),
            AnchorKind::ComponentToBoard | AnchorKind::BoardToPanel => true,
        })
        .collect()
}
