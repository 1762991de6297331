//! Observable interaction state shared by the editors and the host view.
//!
//! The store is handed to every editor explicitly (usually as a
//! [`SharedStore`]). Every write replaces a whole field; subscribers are told
//! about a write only when the value actually changed.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PcbGroupViewMode {
    All,
    #[default]
    NamedOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub selected_layer: String,
    pub in_edit_mode: bool,
    pub in_move_footprint_mode: bool,
    pub in_draw_trace_mode: bool,
    pub in_edit_board_size_mode: bool,
    pub is_moving_component: bool,
    pub is_editing_board_size: bool,
    pub is_drawing_trace: bool,
    pub is_mouse_over_container: bool,
    pub hovered_error_id: Option<String>,
    pub is_showing_rats_nest: bool,
    pub is_showing_drc_errors: bool,
    pub is_showing_pcb_groups: bool,
    pub is_showing_copper_pours: bool,
    pub is_showing_group_anchor_offsets: bool,
    pub pcb_group_view_mode: PcbGroupViewMode,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            selected_layer: "top".to_string(),
            in_edit_mode: false,
            in_move_footprint_mode: false,
            in_draw_trace_mode: false,
            in_edit_board_size_mode: false,
            is_moving_component: false,
            is_editing_board_size: false,
            is_drawing_trace: false,
            is_mouse_over_container: false,
            hovered_error_id: None,
            is_showing_rats_nest: false,
            is_showing_drc_errors: true,
            is_showing_pcb_groups: true,
            is_showing_copper_pours: true,
            is_showing_group_anchor_offsets: false,
            pcb_group_view_mode: PcbGroupViewMode::NamedOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&ViewState)>;

#[derive(Default)]
pub struct AppStore {
    state: ViewState,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

pub type SharedStore = Rc<RefCell<AppStore>>;

macro_rules! setters {
    ($($setter:ident => $field:ident: $ty:ty),* $(,)?) => {
        $(
            pub fn $setter(&mut self, value: $ty) {
                if self.state.$field != value {
                    self.state.$field = value;
                    self.notify();
                }
            }
        )*
    };
}

impl AppStore {
    pub fn new(state: ViewState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    pub fn shared(state: ViewState) -> SharedStore {
        Rc::new(RefCell::new(Self::new(state)))
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Listeners run while the store is mutably borrowed, so they must not
    /// reach back into a [`SharedStore`].
    pub fn subscribe(&mut self, listener: impl Fn(&ViewState) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.listeners.retain(|(l, _)| *l != id);
    }

    fn notify(&self) {
        for (_, listener) in &self.listeners {
            listener(&self.state);
        }
    }

    setters! {
        set_selected_layer => selected_layer: String,
        set_in_edit_mode => in_edit_mode: bool,
        set_in_move_footprint_mode => in_move_footprint_mode: bool,
        set_in_draw_trace_mode => in_draw_trace_mode: bool,
        set_in_edit_board_size_mode => in_edit_board_size_mode: bool,
        set_is_moving_component => is_moving_component: bool,
        set_is_editing_board_size => is_editing_board_size: bool,
        set_is_drawing_trace => is_drawing_trace: bool,
        set_is_mouse_over_container => is_mouse_over_container: bool,
        set_hovered_error_id => hovered_error_id: Option<String>,
        set_is_showing_rats_nest => is_showing_rats_nest: bool,
        set_is_showing_drc_errors => is_showing_drc_errors: bool,
        set_is_showing_pcb_groups => is_showing_pcb_groups: bool,
        set_is_showing_copper_pours => is_showing_copper_pours: bool,
        set_is_showing_group_anchor_offsets => is_showing_group_anchor_offsets: bool,
        set_pcb_group_view_mode => pcb_group_view_mode: PcbGroupViewMode,
    }

    /// Switch edit sub-mode. Sub-modes are exclusive and all imply edit mode.
    pub fn set_edit_sub_mode(&mut self, mode: EditSubMode) {
        let mut next = self.state.clone();
        next.in_edit_mode = mode != EditSubMode::None;
        next.in_move_footprint_mode = mode == EditSubMode::MoveFootprint;
        next.in_draw_trace_mode = mode == EditSubMode::DrawTrace;
        next.in_edit_board_size_mode = mode == EditSubMode::EditBoardSize;
        if next != self.state {
            self.state = next;
            self.notify();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditSubMode {
    None,
    MoveFootprint,
    DrawTrace,
    EditBoardSize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_notifies_on_change_only() {
        let count = Rc::new(Cell::new(0));
        let mut store = AppStore::default();
        let c = count.clone();
        let id = store.subscribe(move |_| c.set(c.get() + 1));

        store.set_is_showing_rats_nest(true);
        store.set_is_showing_rats_nest(true);
        assert_eq!(count.get(), 1);
        assert!(store.state().is_showing_rats_nest);

        store.unsubscribe(id);
        store.set_is_showing_rats_nest(false);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_edit_sub_modes_are_exclusive() {
        let mut store = AppStore::default();
        store.set_edit_sub_mode(EditSubMode::MoveFootprint);
        assert!(store.state().in_edit_mode);
        assert!(store.state().in_move_footprint_mode);

        store.set_edit_sub_mode(EditSubMode::EditBoardSize);
        assert!(!store.state().in_move_footprint_mode);
        assert!(store.state().in_edit_board_size_mode);

        store.set_edit_sub_mode(EditSubMode::None);
        assert!(!store.state().in_edit_mode);
        assert!(!store.state().in_edit_board_size_mode);
    }
}
