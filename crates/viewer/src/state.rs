use pcb_interact::edit::{EditEvent, EditEventLog, EditHost, EventStamp};
use pcb_interact::error::StorageError;
use pcb_interact::settings::KeyValueStorage;
use pcb_interact::types::Point;
use wasm_bindgen::JsValue;

/// `window.localStorage`, resolved on every call so a storage that becomes
/// unavailable mid-session reports an error instead of panicking.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    fn storage() -> Result<web_sys::Storage, StorageError> {
        let window = web_sys::window().ok_or_else(|| StorageError::Unavailable("no window".into()))?;
        match window.local_storage() {
            Ok(Some(storage)) => Ok(storage),
            Ok(None) => Err(StorageError::Unavailable("localStorage disabled".into())),
            Err(e) => Err(StorageError::Unavailable(js_error_name(&e))),
        }
    }
}

fn js_error_name(value: &JsValue) -> String {
    js_sys::Reflect::get(value, &JsValue::from_str("name"))
        .ok()
        .and_then(|n| n.as_string())
        .unwrap_or_else(|| format!("{value:?}"))
}

impl KeyValueStorage for LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(js_error_name(&e)))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        Self::storage()?.set_item(key, value).map_err(|e| {
            let name = js_error_name(&e);
            if name == "QuotaExceededError" {
                StorageError::QuotaExceeded
            } else {
                StorageError::Unavailable(name)
            }
        })
    }
}

/// Event ids and timestamps from the browser. `SystemTime` is not available
/// on wasm32, so the clock comes from `Date.now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserStamp;

impl EventStamp for BrowserStamp {
    fn new_id(&mut self, prefix: &str) -> String {
        format!("{prefix}_{}", uuid::Uuid::new_v4())
    }

    fn now_ms(&mut self) -> f64 {
        js_sys::Date::now()
    }
}

/// The edit event log as seen by the edit tools. Any tool that takes over a
/// pointer-down cancels the pan gesture the canvas started for it.
#[derive(Debug, Default)]
pub struct EditSession {
    pub log: EditEventLog,
    pan_cancelled: bool,
}

impl EditSession {
    /// True once since the last call if a tool claimed the current gesture.
    pub fn take_pan_cancelled(&mut self) -> bool {
        std::mem::take(&mut self.pan_cancelled)
    }

    pub fn events(&self) -> &[EditEvent] {
        self.log.events()
    }
}

impl EditHost for EditSession {
    fn cancel_pan_drag(&mut self) {
        self.pan_cancelled = true;
    }

    fn create_edit_event(&mut self, event: EditEvent) {
        self.log.create_edit_event(event);
    }

    fn modify_edit_event(&mut self, event: EditEvent) {
        self.log.modify_edit_event(event);
    }

    fn discard_edit_event(&mut self, edit_event_id: &str) {
        self.log.discard_edit_event(edit_event_id);
    }
}

/// A canvas pan that only starts moving once the pointer has travelled more
/// than `slop` pixels from the press.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanDrag {
    press: Point,
    last: Option<Point>,
    slop: f64,
}

impl PanDrag {
    pub fn new(press: Point) -> Self {
        Self::with_slop(press, 0.0)
    }

    pub fn with_slop(press: Point, slop: f64) -> Self {
        Self {
            press,
            last: None,
            slop,
        }
    }

    /// Screen delta to pan by for a pointer at `screen`, or `None` while the
    /// pointer is still inside the slop radius.
    pub fn drag_to(&mut self, screen: Point) -> Option<Point> {
        let last = match self.last {
            Some(last) => last,
            None if screen.distance(self.press) > self.slop => self.press,
            None => return None,
        };
        self.last = Some(screen);
        Some(screen - last)
    }
}

/// Pan/zoom state for the canvas. Board y grows upwards, screen y downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            zoom: 10.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

impl Camera {
    pub fn matrix(&self) -> pcb_interact::Matrix {
        use pcb_interact::Matrix;
        Matrix::translate(self.pan_x, self.pan_y).compose(&Matrix::scale(self.zoom, -self.zoom))
    }

    /// Zoom by `factor` keeping the screen point (`x`, `y`) fixed.
    pub fn zoom_at(&mut self, factor: f64, x: f64, y: f64) {
        let factor = factor.clamp(0.5, 2.0);
        self.pan_x = x - (x - self.pan_x) * factor;
        self.pan_y = y - (y - self.pan_y) * factor;
        self.zoom *= factor;
    }

    /// Center `width` x `height` canvas pixels on a board bounding box.
    pub fn fit(&mut self, bbox: &pcb_interact::geometry::BBox, width: f64, height: f64) {
        if bbox.is_empty() || width <= 0.0 || height <= 0.0 {
            return;
        }
        let w = bbox.width().max(1.0);
        let h = bbox.height().max(1.0);
        self.zoom = 0.9 * (width / w).min(height / h);
        let c = bbox.center();
        self.pan_x = width / 2.0 - c.x * self.zoom;
        self.pan_y = height / 2.0 + c.y * self.zoom;
    }
}
