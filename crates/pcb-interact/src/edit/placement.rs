//! Move and rotate components by dragging them.

use std::mem;

use log::debug;

use crate::geometry::{normalize_angle, normalize_angle_delta, BBox};
use crate::store::SharedStore;
use crate::types::{find_component, AnyCircuitElement, PcbComponent, Point};

use super::events::{ComponentLocationEdit, ComponentRotationEdit, EditEvent};
use super::{EditHost, EventStamp, Scene};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementConfig {
    /// Extra screen pixels around a component's box that still select it.
    pub select_padding_px: f64,
    /// Distance of the rotation handle above the component's top edge.
    pub rotation_handle_offset_px: f64,
    pub rotation_handle_radius_px: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            select_padding_px: 4.0,
            rotation_handle_offset_px: 24.0,
            rotation_handle_radius_px: 8.0,
        }
    }
}

/// Rotation in degrees `[0, 360)` after the pointer swept from `start_angle`
/// to `current_angle` (radians, as returned by `atan2`).
pub fn rotation_from_drag(original_rotation: f64, start_angle: f64, current_angle: f64) -> f64 {
    let delta = normalize_angle_delta((current_angle - start_angle).to_degrees());
    normalize_angle(original_rotation + delta)
}

fn angle_about(center: Point, p: Point) -> f64 {
    (p.y - center.y).atan2(p.x - center.x)
}

/// Component whose box (grown by `padding`) contains `real`. When boxes
/// overlap the smallest one wins, so parts sitting on a large module stay
/// reachable.
pub fn component_at(elements: &[AnyCircuitElement], real: Point, padding: f64) -> Option<&PcbComponent> {
    elements
        .iter()
        .filter_map(AnyCircuitElement::as_component)
        .filter(|c| BBox::from_center(c.center, c.width, c.height).contains(real, padding))
        .min_by(|a, b| (a.width * a.height).total_cmp(&(b.width * b.height)))
}

#[derive(Debug, Clone)]
enum PlacementGesture {
    Idle,
    Dragging {
        event: ComponentLocationEdit,
        drag_start: Point,
    },
    Rotating {
        event: ComponentRotationEdit,
        center: Point,
        start_angle: f64,
    },
}

pub struct PlacementEditor {
    store: SharedStore,
    stamp: Box<dyn EventStamp>,
    config: PlacementConfig,
    selected: Option<String>,
    gesture: PlacementGesture,
}

impl PlacementEditor {
    pub fn new(store: SharedStore, stamp: impl EventStamp + 'static) -> Self {
        Self::with_config(store, stamp, PlacementConfig::default())
    }

    pub fn with_config(store: SharedStore, stamp: impl EventStamp + 'static, config: PlacementConfig) -> Self {
        Self {
            store,
            stamp: Box::new(stamp),
            config,
            selected: None,
            gesture: PlacementGesture::Idle,
        }
    }

    fn enabled(&self) -> bool {
        self.store.borrow().state().in_move_footprint_mode
    }

    pub fn selected_component_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, PlacementGesture::Dragging { .. })
    }

    pub fn is_rotating(&self) -> bool {
        matches!(self.gesture, PlacementGesture::Rotating { .. })
    }

    /// Screen position of the rotation handle, shown above the selected
    /// component while it is not being moved.
    pub fn rotation_handle(&self, scene: &Scene) -> Option<Point> {
        if self.is_dragging() {
            return None;
        }
        let component = find_component(scene.elements, self.selected.as_deref()?)?;
        let half = component.height / 2.0;
        let a = scene.to_screen(Point::new(component.center.x, component.center.y + half));
        let b = scene.to_screen(Point::new(component.center.x, component.center.y - half));
        let top = if a.y <= b.y { a } else { b };
        Some(Point::new(top.x, top.y - self.config.rotation_handle_offset_px))
    }

    /// Returns true when the pointer-down was claimed by this editor.
    pub fn pointer_down(&mut self, screen: Point, scene: &Scene, host: &mut dyn EditHost) -> bool {
        if !self.enabled() || !matches!(self.gesture, PlacementGesture::Idle) {
            return false;
        }
        let Some(real) = scene.to_real(screen) else {
            return false;
        };

        let selected = self
            .selected
            .as_deref()
            .and_then(|id| find_component(scene.elements, id));
        if let Some(component) = selected {
            let on_handle = self
                .rotation_handle(scene)
                .is_some_and(|h| screen.distance(h) <= self.config.rotation_handle_radius_px);
            if on_handle {
                host.cancel_pan_drag();
                let event = ComponentRotationEdit {
                    edit_event_id: self.stamp.new_id("edit_event"),
                    pcb_component_id: component.pcb_component_id.clone(),
                    original_rotation: component.rotation,
                    new_rotation: component.rotation,
                    in_progress: true,
                    created_at: self.stamp.now_ms(),
                };
                host.create_edit_event(EditEvent::EditPcbComponentRotation(event.clone()));
                self.gesture = PlacementGesture::Rotating {
                    event,
                    center: component.center,
                    start_angle: angle_about(component.center, real),
                };
                debug!("placement: rotating {}", component.pcb_component_id);
                return true;
            }
        }

        let padding = scene.px_to_real(self.config.select_padding_px);
        let Some(component) = component_at(scene.elements, real, padding) else {
            self.selected = None;
            return false;
        };
        host.cancel_pan_drag();
        let event = ComponentLocationEdit {
            edit_event_id: self.stamp.new_id("edit_event"),
            pcb_component_id: component.pcb_component_id.clone(),
            original_center: component.center,
            new_center: component.center,
            in_progress: true,
            created_at: self.stamp.now_ms(),
        };
        host.create_edit_event(EditEvent::EditPcbComponentLocation(event.clone()));
        self.selected = Some(component.pcb_component_id.clone());
        self.gesture = PlacementGesture::Dragging {
            event,
            drag_start: real,
        };
        self.store.borrow_mut().set_is_moving_component(true);
        debug!("placement: dragging {}", component.pcb_component_id);
        true
    }

    pub fn pointer_move(&mut self, screen: Point, scene: &Scene, host: &mut dyn EditHost) -> bool {
        let Some(real) = scene.to_real(screen) else {
            return false;
        };
        match &mut self.gesture {
            PlacementGesture::Idle => false,
            PlacementGesture::Dragging { event, drag_start } => {
                event.new_center = event.original_center + (real - *drag_start);
                host.modify_edit_event(EditEvent::EditPcbComponentLocation(event.clone()));
                true
            }
            PlacementGesture::Rotating {
                event,
                center,
                start_angle,
            } => {
                event.new_rotation =
                    rotation_from_drag(event.original_rotation, *start_angle, angle_about(*center, real));
                host.modify_edit_event(EditEvent::EditPcbComponentRotation(event.clone()));
                true
            }
        }
    }

    /// Commit the active gesture. A drag that moved the component clears the
    /// selection; a click without movement keeps it so the rotation handle
    /// becomes available.
    pub fn pointer_up(&mut self, screen: Point, scene: &Scene, host: &mut dyn EditHost) -> bool {
        let real = scene.to_real(screen);
        match mem::replace(&mut self.gesture, PlacementGesture::Idle) {
            PlacementGesture::Idle => false,
            PlacementGesture::Dragging {
                mut event,
                drag_start,
            } => {
                if let Some(real) = real {
                    event.new_center = event.original_center + (real - drag_start);
                }
                event.in_progress = false;
                if event.new_center != event.original_center {
                    self.selected = None;
                }
                debug!(
                    "placement: moved {} to ({:.3}, {:.3})",
                    event.pcb_component_id, event.new_center.x, event.new_center.y
                );
                host.modify_edit_event(EditEvent::EditPcbComponentLocation(event));
                self.store.borrow_mut().set_is_moving_component(false);
                true
            }
            PlacementGesture::Rotating {
                mut event,
                center,
                start_angle,
            } => {
                if let Some(real) = real {
                    event.new_rotation =
                        rotation_from_drag(event.original_rotation, start_angle, angle_about(center, real));
                }
                event.in_progress = false;
                debug!(
                    "placement: rotated {} to {:.1}°",
                    event.pcb_component_id, event.new_rotation
                );
                host.modify_edit_event(EditEvent::EditPcbComponentRotation(event));
                true
            }
        }
    }
}
