use std::mem::discriminant;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::EditError;
use crate::types::{Point, RouteHintPoint};

use super::EditHost;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentLocationEdit {
    pub edit_event_id: String,
    pub pcb_component_id: String,
    pub original_center: Point,
    pub new_center: Point,
    pub in_progress: bool,
    pub created_at: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRotationEdit {
    pub edit_event_id: String,
    pub pcb_component_id: String,
    /// Degrees, counter-clockwise.
    pub original_rotation: f64,
    pub new_rotation: f64,
    pub in_progress: bool,
    pub created_at: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSizeEdit {
    pub edit_event_id: String,
    pub pcb_board_id: String,
    pub original_width: f64,
    pub original_height: f64,
    pub original_center: Point,
    pub new_width: f64,
    pub new_height: f64,
    pub new_center: Point,
    pub in_progress: bool,
    pub created_at: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceHintEdit {
    pub edit_event_id: String,
    pub pcb_port_id: String,
    pub pcb_trace_hint_id: String,
    #[serde(default)]
    pub route: Vec<RouteHintPoint>,
    pub in_progress: bool,
    pub created_at: f64,
}

/// A single user edit intent. Events with an unrecognised
/// `edit_event_type` parse as [`EditEvent::Unknown`] and are ignored by the
/// application engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "edit_event_type", rename_all = "snake_case")]
pub enum EditEvent {
    EditPcbComponentLocation(ComponentLocationEdit),
    EditPcbComponentRotation(ComponentRotationEdit),
    EditPcbBoardSize(BoardSizeEdit),
    EditTraceHint(TraceHintEdit),
    #[serde(other)]
    Unknown,
}

impl EditEvent {
    pub fn id(&self) -> Option<&str> {
        match self {
            EditEvent::EditPcbComponentLocation(e) => Some(&e.edit_event_id),
            EditEvent::EditPcbComponentRotation(e) => Some(&e.edit_event_id),
            EditEvent::EditPcbBoardSize(e) => Some(&e.edit_event_id),
            EditEvent::EditTraceHint(e) => Some(&e.edit_event_id),
            EditEvent::Unknown => None,
        }
    }

    pub fn in_progress(&self) -> bool {
        match self {
            EditEvent::EditPcbComponentLocation(e) => e.in_progress,
            EditEvent::EditPcbComponentRotation(e) => e.in_progress,
            EditEvent::EditPcbBoardSize(e) => e.in_progress,
            EditEvent::EditTraceHint(e) => e.in_progress,
            EditEvent::Unknown => false,
        }
    }

    pub fn created_at(&self) -> Option<f64> {
        match self {
            EditEvent::EditPcbComponentLocation(e) => Some(e.created_at),
            EditEvent::EditPcbComponentRotation(e) => Some(e.created_at),
            EditEvent::EditPcbBoardSize(e) => Some(e.created_at),
            EditEvent::EditTraceHint(e) => Some(e.created_at),
            EditEvent::Unknown => None,
        }
    }
}

// ─── Event log ───────────────────────────────────────────────────────

/// Append-only edit history. An event may be updated in place by id while
/// it is in progress; once finalized it is frozen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditEventLog {
    events: Vec<EditEvent>,
}

impl EditEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<EditEvent>) -> Self {
        Self { events }
    }

    pub fn create(&mut self, event: EditEvent) {
        self.events.push(event);
    }

    pub fn modify(&mut self, event: EditEvent) -> Result<(), EditError> {
        let id = event.id().unwrap_or_default().to_string();
        let existing = self
            .events
            .iter_mut()
            .find(|e| e.id() == Some(id.as_str()))
            .ok_or_else(|| EditError::UnknownEvent(id.clone()))?;
        if !existing.in_progress() {
            return Err(EditError::EventFinalized(id));
        }
        if discriminant(existing) != discriminant(&event) {
            return Err(EditError::TypeMismatch(id));
        }
        *existing = event;
        Ok(())
    }

    /// Remove an event that was never finalized, e.g. an abandoned gesture.
    pub fn discard(&mut self, edit_event_id: &str) -> Result<EditEvent, EditError> {
        let index = self
            .events
            .iter()
            .position(|e| e.id() == Some(edit_event_id))
            .ok_or_else(|| EditError::UnknownEvent(edit_event_id.to_string()))?;
        if !self.events[index].in_progress() {
            return Err(EditError::EventFinalized(edit_event_id.to_string()));
        }
        Ok(self.events.remove(index))
    }

    pub fn events(&self) -> &[EditEvent] {
        &self.events
    }

    pub fn in_progress(&self) -> impl Iterator<Item = &EditEvent> {
        self.events.iter().filter(|e| e.in_progress())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EditHost for EditEventLog {
    fn create_edit_event(&mut self, event: EditEvent) {
        self.create(event);
    }

    fn modify_edit_event(&mut self, event: EditEvent) {
        if let Err(e) = self.modify(event) {
            warn!("dropping edit event update: {e}");
        }
    }

    fn discard_edit_event(&mut self, edit_event_id: &str) {
        if let Err(e) = self.discard(edit_event_id) {
            warn!("keeping edit event: {e}");
        }
    }
}
