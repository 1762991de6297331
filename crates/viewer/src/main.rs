mod render;
mod state;

use std::cell::RefCell;
use std::rc::Rc;

use gloo::events::EventListener;
use gloo::render::{request_animation_frame, AnimationFrame};
use log::{debug, info, warn};
use pcb_interact::anchor::visible_anchor_offsets;
use pcb_interact::connectivity::{compute_rats_nest, RatsNestLine};
use pcb_interact::edit::trace_hint::Hotkey;
use pcb_interact::edit::{
    BoardSizeConfig, BoardSizeEditor, PlacementConfig, PlacementEditor, Scene, TraceHintConfig,
    TraceHintEditor,
};
use pcb_interact::geometry::BBox;
use pcb_interact::primitives::{circuit_to_primitives, Primitive};
use pcb_interact::settings::{load_preferences, save_preferences, Preferences};
use pcb_interact::store::{AppStore, EditSubMode, PcbGroupViewMode, SharedStore, ViewState};
use pcb_interact::types::{parse_circuit, Point};
use pcb_interact::worker::ConnectivityClient;
use pcb_interact::{apply_edit_events, AnyCircuitElement, MouseElementTracker};
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, HtmlTextAreaElement};
use yew::prelude::*;

use render::*;
use state::*;

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    yew::Renderer::<App>::new().render();
}

// ─── Viewer State ───────────────────────────────────────────────────

struct Viewer {
    store: SharedStore,
    storage: LocalStorage,
    tracker: MouseElementTracker,
    placement: PlacementEditor,
    board_size: BoardSizeEditor,
    trace_hint: TraceHintEditor,
    session: EditSession,
    connectivity: ConnectivityClient,
    camera: Camera,
    colors: Colors,
    canvas: Option<HtmlCanvasElement>,
    /// Circuit as loaded, before any edit events.
    base: Vec<AnyCircuitElement>,
    /// Circuit as displayed: `base` with the edit log applied.
    edited: Vec<AnyCircuitElement>,
    primitives: Vec<Primitive>,
    rats_nest: Vec<RatsNestLine>,
    pan: Option<PanDrag>,
    cursor: Option<Point>,
    dirty: bool,
    frame_pending: bool,
    frame: Option<AnimationFrame>,
}

impl Viewer {
    fn new() -> Self {
        let store = AppStore::shared(ViewState::default());
        let storage = LocalStorage;
        load_preferences(&storage).apply_to(&mut store.borrow_mut());
        Self {
            placement: PlacementEditor::new(store.clone(), BrowserStamp),
            board_size: BoardSizeEditor::new(store.clone(), BrowserStamp),
            trace_hint: TraceHintEditor::new(store.clone(), BrowserStamp),
            store,
            storage,
            tracker: MouseElementTracker::new(),
            session: EditSession::default(),
            // threads are not available on wasm32
            connectivity: ConnectivityClient::inline(),
            camera: Camera::default(),
            colors: Colors::default(),
            canvas: None,
            base: Vec::new(),
            edited: Vec::new(),
            primitives: Vec::new(),
            rats_nest: Vec::new(),
            pan: None,
            cursor: None,
            dirty: true,
            frame_pending: false,
            frame: None,
        }
    }

    fn load(&mut self, elements: Vec<AnyCircuitElement>) {
        info!("loaded circuit with {} elements", elements.len());
        self.base = elements;
        self.trace_hint.cancel(&mut self.session);
        self.session = EditSession::default();
        self.placement.clear_selection();
        self.tracker.clear();
        self.refresh_circuit();
        self.request_connectivity();
        self.fit();
    }

    fn refresh_circuit(&mut self) {
        self.edited = apply_edit_events(&self.base, self.session.events());
        self.primitives = circuit_to_primitives(&self.edited);
        self.tracker.reproject(&self.primitives, &self.camera.matrix());
        self.dirty = true;
    }

    fn request_connectivity(&mut self) {
        self.connectivity.request(self.edited.clone());
    }

    fn poll_connectivity(&mut self) {
        match self.connectivity.poll() {
            Some(Ok(map)) => {
                self.rats_nest = compute_rats_nest(&self.edited, &map);
                debug!("{} nets, {} unrouted connections", map.len(), self.rats_nest.len());
                self.dirty = true;
            }
            Some(Err(e)) => warn!("connectivity failed: {e}"),
            None => {}
        }
    }

    fn fit(&mut self) {
        let Some(canvas) = &self.canvas else {
            return;
        };
        let mut bbox = BBox::empty();
        for board in self.edited.iter().filter_map(AnyCircuitElement::as_board) {
            let b = BBox::from_center(board.center, board.width, board.height);
            bbox.expand_point(b.minx, b.miny);
            bbox.expand_point(b.maxx, b.maxy);
        }
        self.camera.fit(&bbox, canvas.width() as f64, canvas.height() as f64);
        self.dirty = true;
    }

    fn resize_canvas(&mut self) {
        if let Some(canvas) = &self.canvas {
            let (w, h) = (canvas.client_width().max(0) as u32, canvas.client_height().max(0) as u32);
            if canvas.width() != w || canvas.height() != h {
                canvas.set_width(w);
                canvas.set_height(h);
                self.dirty = true;
            }
        }
    }

    // ─── Pointer handling ───────────────────────────────────────────

    fn pointer_down(&mut self, screen: Point) {
        let transform = self.camera.matrix();
        let scene = Scene::new(&self.edited, &transform);
        let claimed = self.board_size.pointer_down(screen, &scene, &mut self.session)
            || self.placement.pointer_down(screen, &scene, &mut self.session)
            || self.trace_hint.pointer_down(screen, &scene, &mut self.session);
        // a trace being drawn still pans on drag, but only once the pointer
        // leaves the click radius, so waypoint clicks keep the camera still
        self.pan = if self.session.take_pan_cancelled() {
            None
        } else if claimed && self.trace_hint.is_drawing() {
            Some(PanDrag::with_slop(screen, TraceHintConfig::default().drag_threshold_px))
        } else {
            Some(PanDrag::new(screen))
        };
        if claimed {
            self.refresh_circuit();
        }
    }

    fn pointer_move(&mut self, screen: Point) -> bool {
        self.cursor = Some(screen);
        if let Some(delta) = self.pan.as_mut().and_then(|pan| pan.drag_to(screen)) {
            self.camera.pan_x += delta.x;
            self.camera.pan_y += delta.y;
            self.tracker.reproject(&self.primitives, &self.camera.matrix());
            self.dirty = true;
            return true;
        }
        let transform = self.camera.matrix();
        let scene = Scene::new(&self.edited, &transform);
        let changed = self.board_size.pointer_move(screen, &scene, &mut self.session)
            | self.placement.pointer_move(screen, &scene, &mut self.session);
        if changed {
            self.refresh_circuit();
        } else if self.trace_hint.is_drawing() {
            self.dirty = true;
        }
        self.tracker.pointer_move(screen) || self.dirty
    }

    fn pointer_up(&mut self, screen: Point) {
        self.pan = None;
        let transform = self.camera.matrix();
        let scene = Scene::new(&self.edited, &transform);
        let changed = self.board_size.pointer_up(screen, &scene, &mut self.session)
            | self.placement.pointer_up(screen, &scene, &mut self.session)
            | self.trace_hint.pointer_up(screen, &scene, &mut self.session);
        if changed {
            self.refresh_circuit();
            self.request_connectivity();
        } else {
            // a click on empty board may have dropped the selection
            self.dirty = true;
        }
    }

    fn pointer_leave(&mut self) {
        self.cursor = None;
        self.tracker.clear();
        self.store.borrow_mut().set_is_mouse_over_container(false);
        self.dirty = true;
    }

    fn key_down(&mut self, key: &str) -> bool {
        let handled = self.trace_hint.key_down(key, &mut self.session);
        if handled {
            // Escape may have dropped an unfinished hint
            self.refresh_circuit();
        }
        handled
    }

    fn set_edit_mode(&mut self, mode: EditSubMode) {
        if self.trace_hint.is_drawing() {
            self.trace_hint.cancel(&mut self.session);
            self.refresh_circuit();
        }
        self.placement.clear_selection();
        self.store.borrow_mut().set_edit_sub_mode(mode);
        self.dirty = true;
    }

    fn save_preferences(&mut self) {
        let prefs = {
            let store = self.store.borrow();
            let state = store.state();
            Preferences {
                is_showing_copper_pours: state.is_showing_copper_pours,
                is_showing_pcb_groups: state.is_showing_pcb_groups,
                pcb_group_view_mode: state.pcb_group_view_mode,
            }
        };
        save_preferences(&mut self.storage, &prefs);
        self.dirty = true;
    }

    // ─── Drawing ────────────────────────────────────────────────────

    fn on_frame(&mut self) {
        self.frame_pending = false;
        self.poll_connectivity();
        let transform = self.camera.matrix();
        let hover_changed = self.tracker.on_animation_frame(&self.primitives, &transform);
        if hover_changed || self.dirty {
            self.redraw();
        }
    }

    fn redraw(&mut self) {
        self.dirty = false;
        let Some(canvas) = &self.canvas else {
            return;
        };
        let Some(ctx) = get_ctx(canvas) else {
            return;
        };
        let transform = self.camera.matrix();
        let view = self.store.borrow().state().clone();
        let colors = &self.colors;

        clear_canvas(&ctx, canvas, &colors.background);
        draw_primitives(&ctx, &self.primitives, &transform, &view, colors);
        if view.is_showing_rats_nest {
            draw_rats_nest(&ctx, &transform, &self.rats_nest, colors);
        }
        let offsets = visible_anchor_offsets(&self.edited, &view);
        draw_anchor_offsets(&ctx, &transform, &offsets, colors);
        draw_highlights(&ctx, self.tracker.highlights(), colors);

        let scene = Scene::new(&self.edited, &transform);
        let handles = self.board_size.visible_handles(&scene);
        draw_board_handles(
            &ctx,
            &handles,
            self.board_size.active_handle(),
            BoardSizeConfig::default().handle_radius_px,
            colors,
        );
        if let Some(handle) = self.placement.rotation_handle(&scene) {
            let center = self
                .placement
                .selected_component_id()
                .and_then(|id| self.edited.iter().filter_map(AnyCircuitElement::as_component).find(|c| c.pcb_component_id == id))
                .map(|c| transform.apply(c.center));
            if let Some(center) = center {
                draw_rotation_handle(&ctx, center, handle, PlacementConfig::default().rotation_handle_radius_px, colors);
            }
        }
        draw_trace_preview(&ctx, &transform, &self.trace_hint.preview_route(), self.cursor, colors);
    }
}

/// Run `Viewer::on_frame` on the next animation frame, at most once per frame.
fn schedule_frame(viewer: &Rc<RefCell<Viewer>>) {
    let mut v = viewer.borrow_mut();
    if v.frame_pending {
        return;
    }
    v.frame_pending = true;
    let handle = viewer.clone();
    // replacing the handle drops the previous frame, which has already run
    v.frame = Some(request_animation_frame(move |_| handle.borrow_mut().on_frame()));
}

fn circuit_url() -> String {
    web_sys::window()
        .and_then(|w| w.location().search().ok())
        .and_then(|search| web_sys::UrlSearchParams::new_with_str(&search).ok())
        .and_then(|params| params.get("circuit"))
        .unwrap_or_else(|| "circuit.json".to_string())
}

fn pointer_point(e: &PointerEvent) -> Point {
    Point::new(e.offset_x() as f64, e.offset_y() as f64)
}

// ─── App Component ──────────────────────────────────────────────────

/// What the toolbar and sidebar show, copied out of the viewer so markup
/// never holds a borrow.
#[derive(Clone, Default)]
struct Panel {
    view: ViewState,
    hovered: Vec<String>,
    events_json: String,
    event_count: usize,
    via: bool,
    hotkeys: &'static [Hotkey],
}

impl Panel {
    fn from_viewer(v: &Viewer) -> Self {
        Self {
            view: v.store.borrow().state().clone(),
            hovered: v
                .tracker
                .hovered()
                .iter()
                .map(|p| format!("{} {}", p.source.element_type, p.source.element_id))
                .collect(),
            events_json: serde_json::to_string_pretty(&v.session.log).unwrap_or_default(),
            event_count: v.session.log.len(),
            via: v.trace_hint.is_via_enabled(),
            hotkeys: v.trace_hint.hotkeys(),
        }
    }
}

/// Snapshot `cell` through `snap`, remembering the result in `last`. When
/// `cell` is mutably borrowed the previous snapshot is returned instead.
fn snapshot_or_last<T, P: Clone>(cell: &RefCell<T>, last: &RefCell<P>, snap: impl FnOnce(&T) -> P) -> P {
    match cell.try_borrow() {
        Ok(value) => {
            let fresh = snap(&value);
            *last.borrow_mut() = fresh.clone();
            fresh
        }
        Err(_) => last.borrow().clone(),
    }
}

#[function_component(App)]
fn app() -> Html {
    let viewer = use_mut_ref(Viewer::new);
    let canvas_ref = use_node_ref();
    let error: UseStateHandle<Option<String>> = use_state(|| None);
    let loading = use_state(|| true);
    let paste_ref = use_node_ref();
    let rerender = use_force_update();
    let last_panel = use_mut_ref(Panel::default);

    // Mount: attach the canvas, subscribe to the store, fetch the circuit
    {
        let viewer = viewer.clone();
        let canvas_ref = canvas_ref.clone();
        let error = error.clone();
        let loading = loading.clone();
        let rerender = rerender.clone();
        use_effect_with((), move |_| {
            let canvas = canvas_ref.cast::<HtmlCanvasElement>();
            let subscription = {
                let mut v = viewer.borrow_mut();
                if let Some(canvas) = &canvas {
                    v.colors = Colors::from_element(canvas);
                }
                v.canvas = canvas;
                v.resize_canvas();
                let rerender = rerender.clone();
                v.tracker.set_on_hover_change({
                    let rerender = rerender.clone();
                    move |_| rerender.force_update()
                });
                let id = v.store.borrow_mut().subscribe(move |_| rerender.force_update());
                id
            };
            schedule_frame(&viewer);

            {
                let viewer = viewer.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    let url = circuit_url();
                    let result = match gloo::net::http::Request::get(&url).send().await {
                        Ok(resp) if resp.ok() => resp.text().await.map_err(|e| e.to_string()),
                        Ok(resp) => Err(format!("{url}: HTTP {}", resp.status())),
                        Err(e) => Err(e.to_string()),
                    };
                    match result.and_then(|text| parse_circuit(&text).map_err(|e| e.to_string())) {
                        Ok(elements) => {
                            viewer.borrow_mut().load(elements);
                            schedule_frame(&viewer);
                        }
                        Err(e) => {
                            warn!("could not load circuit: {e}");
                            error.set(Some(e));
                        }
                    }
                    loading.set(false);
                });
            }

            let window = web_sys::window();
            let resize = window.as_ref().map(|w| {
                let viewer = viewer.clone();
                EventListener::new(w, "resize", move |_| {
                    viewer.borrow_mut().resize_canvas();
                    schedule_frame(&viewer);
                })
            });
            let keydown = window.as_ref().map(|w| {
                let viewer = viewer.clone();
                EventListener::new(w, "keydown", move |e| {
                    let Some(e) = e.dyn_ref::<KeyboardEvent>() else {
                        return;
                    };
                    if viewer.borrow_mut().key_down(&e.key()) {
                        e.prevent_default();
                        schedule_frame(&viewer);
                    }
                })
            });

            let store = viewer.borrow().store.clone();
            move || {
                drop(resize);
                drop(keydown);
                store.borrow_mut().unsubscribe(subscription);
            }
        });
    }

    // Canvas event handlers
    let on_pointerdown = {
        let viewer = viewer.clone();
        Callback::from(move |e: PointerEvent| {
            if e.button() != 0 {
                return;
            }
            e.prevent_default();
            if let Some(canvas) = e.target().and_then(|t| t.dyn_into::<HtmlCanvasElement>().ok()) {
                let _ = canvas.set_pointer_capture(e.pointer_id());
            }
            let screen = pointer_point(&e);
            {
                let mut v = viewer.borrow_mut();
                if e.pointer_type() == "touch" {
                    v.tracker.touch_start(&[screen]);
                }
                v.pointer_down(screen);
            }
            schedule_frame(&viewer);
        })
    };

    let on_pointermove = {
        let viewer = viewer.clone();
        Callback::from(move |e: PointerEvent| {
            let needs_frame = {
                let mut v = viewer.borrow_mut();
                v.store.borrow_mut().set_is_mouse_over_container(true);
                v.pointer_move(pointer_point(&e))
            };
            if needs_frame {
                schedule_frame(&viewer);
            }
        })
    };

    let on_pointerup = {
        let viewer = viewer.clone();
        Callback::from(move |e: PointerEvent| {
            viewer.borrow_mut().pointer_up(pointer_point(&e));
            schedule_frame(&viewer);
        })
    };

    let on_pointerleave = {
        let viewer = viewer.clone();
        Callback::from(move |_: PointerEvent| {
            viewer.borrow_mut().pointer_leave();
            schedule_frame(&viewer);
        })
    };

    let on_wheel = {
        let viewer = viewer.clone();
        Callback::from(move |e: WheelEvent| {
            e.prevent_default();
            let mut delta = e.delta_y();
            if e.delta_mode() == 1 {
                delta *= 30.0;
            } else if e.delta_mode() == 2 {
                delta *= 300.0;
            }
            {
                let mut v = viewer.borrow_mut();
                v.camera.zoom_at((1.1f64).powf(-delta / 40.0), e.offset_x() as f64, e.offset_y() as f64);
                let v = &mut *v;
                v.tracker.reproject(&v.primitives, &v.camera.matrix());
                v.dirty = true;
            }
            schedule_frame(&viewer);
        })
    };

    // ─── Toolbar callbacks ──────────────────────────────────────────

    let set_mode = {
        let viewer = viewer.clone();
        Callback::from(move |mode: EditSubMode| {
            viewer.borrow_mut().set_edit_mode(mode);
            schedule_frame(&viewer);
        })
    };

    // Apply a store change and redraw; `persist` also saves preferences.
    let update_view = {
        let viewer = viewer.clone();
        Callback::from(move |(change, persist): (fn(&mut AppStore), bool)| {
            {
                let mut v = viewer.borrow_mut();
                change(&mut v.store.borrow_mut());
                if persist {
                    v.save_preferences();
                }
                v.dirty = true;
            }
            schedule_frame(&viewer);
        })
    };

    let on_load_pasted = {
        let viewer = viewer.clone();
        let paste_ref = paste_ref.clone();
        let error = error.clone();
        Callback::from(move |_: MouseEvent| {
            let Some(area) = paste_ref.cast::<HtmlTextAreaElement>() else {
                return;
            };
            match parse_circuit(&area.value()) {
                Ok(elements) => {
                    viewer.borrow_mut().load(elements);
                    error.set(None);
                    schedule_frame(&viewer);
                }
                Err(e) => error.set(Some(format!("invalid circuit JSON: {e}"))),
            }
        })
    };

    // ─── Render ─────────────────────────────────────────────────────

    // hover callbacks can fire while the viewer is borrowed by a handler;
    // the last panel keeps the canvas mounted
    let panel = snapshot_or_last(&*viewer, &*last_panel, Panel::from_viewer);
    let Panel {
        view,
        hovered,
        events_json,
        event_count,
        via,
        hotkeys,
    } = panel;
    let mode = if view.in_move_footprint_mode {
        EditSubMode::MoveFootprint
    } else if view.in_draw_trace_mode {
        EditSubMode::DrawTrace
    } else if view.in_edit_board_size_mode {
        EditSubMode::EditBoardSize
    } else {
        EditSubMode::None
    };

    let mode_button = |label: &'static str, m: EditSubMode| {
        let set_mode = set_mode.clone();
        html! {
            <button class={classes!("mode-button", (mode == m).then_some("active"))}
                onclick={Callback::from(move |_: MouseEvent| set_mode.emit(m))}>
                {label}
            </button>
        }
    };
    let toggle = |label: &'static str, checked: bool, change: fn(&mut AppStore), persist: bool| {
        let update_view = update_view.clone();
        html! {
            <label class="menu-label">
                <input type="checkbox" {checked}
                    onclick={Callback::from(move |_: MouseEvent| update_view.emit((change, persist)))} />
                {label}
            </label>
        }
    };

    html! {
        <div id="topmostdiv" class="viewer">
            <div class="toolbar">
                {mode_button("View", EditSubMode::None)}
                {mode_button("Move", EditSubMode::MoveFootprint)}
                {mode_button("Trace", EditSubMode::DrawTrace)}
                {mode_button("Board size", EditSubMode::EditBoardSize)}
                <span class="toolbar-sep" />
                {toggle("Bottom layer", view.selected_layer == "bottom", |s| {
                    let next = if s.state().selected_layer == "bottom" { "top" } else { "bottom" };
                    s.set_selected_layer(next.to_string());
                }, false)}
                {toggle("Rats nest", view.is_showing_rats_nest, |s| {
                    s.set_is_showing_rats_nest(!s.state().is_showing_rats_nest);
                }, false)}
                {toggle("Copper pours", view.is_showing_copper_pours, |s| {
                    s.set_is_showing_copper_pours(!s.state().is_showing_copper_pours);
                }, true)}
                {toggle("Groups", view.is_showing_pcb_groups, |s| {
                    s.set_is_showing_pcb_groups(!s.state().is_showing_pcb_groups);
                }, true)}
                {toggle("Unnamed groups", view.pcb_group_view_mode == PcbGroupViewMode::All, |s| {
                    let next = match s.state().pcb_group_view_mode {
                        PcbGroupViewMode::All => PcbGroupViewMode::NamedOnly,
                        PcbGroupViewMode::NamedOnly => PcbGroupViewMode::All,
                    };
                    s.set_pcb_group_view_mode(next);
                }, true)}
                {toggle("Anchor offsets", view.is_showing_group_anchor_offsets, |s| {
                    s.set_is_showing_group_anchor_offsets(!s.state().is_showing_group_anchor_offsets);
                }, false)}
            </div>

            <div id="canvascontainer" class="canvas-container">
                <canvas ref={canvas_ref}
                    onpointerdown={on_pointerdown}
                    onpointermove={on_pointermove}
                    onpointerup={on_pointerup}
                    onpointerleave={on_pointerleave}
                    onwheel={on_wheel}
                    oncontextmenu={Callback::from(|e: MouseEvent| e.prevent_default())} />
                if *loading {
                    <div class="overlay">{"Loading circuit…"}</div>
                }
                if let Some(err) = &*error {
                    <div class="overlay error">{err.clone()}</div>
                }
            </div>

            <div class="sidebar">
                if view.in_draw_trace_mode {
                    <div class="hotkeys">
                        {for hotkeys.iter().map(|h| html! {
                            <div class="hotkey"><kbd>{h.key}</kbd>{" "}{h.description}</div>
                        })}
                        <div>{format!("Via: {}", if via { "on" } else { "off" })}</div>
                    </div>
                }
                <div class="hovered">
                    <div class="sidebar-title">{"Under cursor"}</div>
                    {for hovered.iter().map(|h| html! { <div>{h.clone()}</div> })}
                </div>
                <div class="edit-log">
                    <div class="sidebar-title">{format!("Edit events ({event_count})")}</div>
                    <pre>{events_json}</pre>
                </div>
                <div class="paste">
                    <textarea ref={paste_ref} placeholder="Paste circuit JSON" />
                    <button onclick={on_load_pasted}>{"Load"}</button>
                </div>
            </div>
        </div>
    }
}
