use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    CanvasRenderingContext2d, Element, Event, HtmlButtonElement, HtmlCanvasElement,
    HtmlInputElement, HtmlSpanElement, PointerEvent, Window,
};

use syncboard_shared::{Brush, CapturedPath, ClientMessage, CompositeMode, Point, UserId};

use crate::dom::{
    event_to_point, fit_canvas, get_element, set_canvas_cursor, set_status, set_tool_button,
    update_size_label,
};
use crate::net::{board_id_from_location, user_from_location};
use crate::reconciler::{ReconcileError, Reconciler, SyncStatus};
use crate::render::CanvasRenderer;
use crate::util::{default_user_name, log_level_from_search, random_origin};
use crate::ws::{connect_ws, WsEvent, WsSender};

const RECONNECT_DELAY_MS: i32 = 1000;
const JOIN_RETRY_MS: f64 = 5000.0;
const JOIN_CHECK_INTERVAL_MS: i32 = 1000;
const CURSOR_THROTTLE_MS: f64 = 40.0;
const MIN_BRUSH_SIZE: f32 = 1.0;
const MAX_BRUSH_SIZE: f32 = 20.0;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Tool {
    Brush,
    Eraser,
}

struct Ui {
    canvas: HtmlCanvasElement,
    status_el: Element,
    status_text: Element,
    brush_button: HtmlButtonElement,
    eraser_button: HtmlButtonElement,
}

struct App {
    reconciler: Reconciler<CanvasRenderer>,
    sender: Option<Rc<WsSender>>,
    tool: Tool,
    brush: Brush,
    capture: Vec<Point>,
    pointer_down: bool,
    last_cursor_sent: f64,
    join_sent_at: f64,
}

impl App {
    fn send(&self, message: &ClientMessage) {
        if let Some(sender) = &self.sender {
            sender.send(message);
        }
    }

    fn send_join(&mut self) {
        let join = self.reconciler.join();
        self.send(&join);
        self.join_sent_at = js_sys::Date::now();
    }

    fn send_result(&self, action: &str, result: Result<ClientMessage, ReconcileError>) {
        match result {
            Ok(message) => self.send(&message),
            Err(error) => {
                web_sys::console::warn_1(&format!("{action} not sent: {error}").into());
            }
        }
    }

    fn erase_at(&mut self, point: Point) {
        match self.reconciler.erase_at(point) {
            Ok(Some(message)) => self.send(&message),
            Ok(None) => {}
            Err(error) => {
                web_sys::console::warn_1(&format!("erase not sent: {error}").into());
            }
        }
    }
}

fn refresh_status(app: &App, ui: &Ui) {
    let reconciler = &app.reconciler;
    if reconciler.status() == SyncStatus::Synced {
        let text = format!(
            "Connected as: {} | Board: {} | Users online: {}",
            reconciler.user_id(),
            reconciler.board_id(),
            reconciler.roster().len()
        );
        set_status(&ui.status_el, &ui.status_text, "open", &text);
    } else {
        set_status(&ui.status_el, &ui.status_text, "connecting", "Connecting...");
    }
}

fn set_tool(app: &mut App, ui: &Ui, tool: Tool) {
    app.tool = tool;
    set_tool_button(&ui.brush_button, tool == Tool::Brush);
    set_tool_button(&ui.eraser_button, tool == Tool::Eraser);
    set_canvas_cursor(&ui.canvas, tool == Tool::Eraser);
}

fn sanitize_size(value: &str) -> f32 {
    value
        .parse::<f32>()
        .ok()
        .filter(|size| size.is_finite())
        .map(|size| size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE))
        .unwrap_or(Brush::default().width)
}

fn connect(window: &Window, app: &Rc<RefCell<App>>, ui: &Rc<Ui>) {
    let on_event = {
        let window = window.clone();
        let app = app.clone();
        let ui = ui.clone();
        move |event: WsEvent| match event {
            WsEvent::Open => {
                web_sys::console::log_1(&"WS open, joining board".into());
                let mut app_ref = app.borrow_mut();
                app_ref.send_join();
                refresh_status(&app_ref, &ui);
            }
            WsEvent::Message(message) => {
                let mut app_ref = app.borrow_mut();
                if let Some(reply) = app_ref.reconciler.handle(message) {
                    web_sys::console::warn_1(&"Board out of sync, rejoining".into());
                    app_ref.send(&reply);
                    app_ref.join_sent_at = js_sys::Date::now();
                }
                refresh_status(&app_ref, &ui);
            }
            WsEvent::Error => {
                web_sys::console::error_1(&"WS error".into());
            }
            WsEvent::Close => {
                web_sys::console::warn_1(&"WS closed, reconnecting".into());
                {
                    let mut app_ref = app.borrow_mut();
                    app_ref.sender = None;
                    app_ref.capture.clear();
                    app_ref.pointer_down = false;
                    app_ref.reconciler.on_disconnected();
                    refresh_status(&app_ref, &ui);
                }
                schedule_reconnect(&window, &app, &ui);
            }
        }
    };

    match connect_ws(window, on_event) {
        Ok(sender) => app.borrow_mut().sender = Some(sender),
        Err(error) => {
            web_sys::console::error_2(&"WS connect failed".into(), &error);
            schedule_reconnect(window, app, ui);
        }
    }
}

fn schedule_reconnect(window: &Window, app: &Rc<RefCell<App>>, ui: &Rc<Ui>) {
    let window_cb = window.clone();
    let app = app.clone();
    let ui = ui.clone();
    let onreconnect = Closure::<dyn FnMut()>::new(move || {
        connect(&window_cb, &app, &ui);
    });
    let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
        onreconnect.as_ref().unchecked_ref(),
        RECONNECT_DELAY_MS,
    );
    onreconnect.forget();
}

fn add_listener(
    target: &web_sys::EventTarget,
    name: &str,
    handler: impl 'static + FnMut(Event),
) -> Result<(), JsValue> {
    let closure = Closure::<dyn FnMut(Event)>::new(handler);
    target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn add_pointer_listener(
    canvas: &HtmlCanvasElement,
    name: &str,
    handler: impl 'static + FnMut(PointerEvent),
) -> Result<(), JsValue> {
    let closure = Closure::<dyn FnMut(PointerEvent)>::new(handler);
    canvas.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

#[wasm_bindgen]
pub fn run() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;
    let location = window.location();

    // Routes `tracing` events from the reconciler and replica log, which
    // have no subscriber in the browser, to the console through `log`.
    let level = log_level_from_search(&location.search().unwrap_or_default());
    if let Err(error) = console_log::init_with_level(level) {
        web_sys::console::warn_1(&format!("console logger not installed: {error}").into());
    }

    let board_id = board_id_from_location(&location)
        .ok_or_else(|| JsValue::from_str("Missing board id in URL"))?;
    let user_id = user_from_location(&location)
        .map(UserId::new)
        .filter(UserId::is_valid)
        .unwrap_or_else(|| UserId::new(default_user_name()));

    let canvas: HtmlCanvasElement = get_element(&document, "board")?;
    let ctx = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("Missing canvas context"))?
        .dyn_into::<CanvasRenderingContext2d>()?;
    let color_input: HtmlInputElement = get_element(&document, "color")?;
    let size_input: HtmlInputElement = get_element(&document, "size")?;
    let size_value: HtmlSpanElement = get_element(&document, "sizeValue")?;
    let brush_button: HtmlButtonElement = get_element(&document, "brush")?;
    let eraser_button: HtmlButtonElement = get_element(&document, "eraser")?;
    let undo_button: HtmlButtonElement = get_element(&document, "undo")?;
    let redo_button: HtmlButtonElement = get_element(&document, "redo")?;
    let clear_button: HtmlButtonElement = get_element(&document, "clear")?;
    let status_el = document
        .get_element_by_id("status")
        .ok_or_else(|| JsValue::from_str("Missing status element"))?;
    let status_text = document
        .get_element_by_id("statusText")
        .ok_or_else(|| JsValue::from_str("Missing status text"))?;

    let mut renderer = CanvasRenderer::new(ctx);
    let (width, height, dpr) = fit_canvas(&window, &canvas);
    renderer.resize(width, height, dpr);

    let brush = Brush {
        color: color_input.value(),
        width: sanitize_size(&size_input.value()),
        mode: CompositeMode::Normal,
    };
    web_sys::console::log_1(&format!("Joining board={board_id} as user={user_id}").into());

    let ui = Rc::new(Ui {
        canvas: canvas.clone(),
        status_el,
        status_text,
        brush_button: brush_button.clone(),
        eraser_button: eraser_button.clone(),
    });
    let app = Rc::new(RefCell::new(App {
        reconciler: Reconciler::new(renderer, board_id, user_id, random_origin()),
        sender: None,
        tool: Tool::Brush,
        brush,
        capture: Vec::new(),
        pointer_down: false,
        last_cursor_sent: 0.0,
        join_sent_at: 0.0,
    }));

    update_size_label(&size_input, &size_value);
    set_tool(&mut app.borrow_mut(), &ui, Tool::Brush);
    refresh_status(&app.borrow(), &ui);

    {
        let app = app.clone();
        let ui = ui.clone();
        add_listener(&brush_button, "click", move |_| {
            set_tool(&mut app.borrow_mut(), &ui, Tool::Brush);
        })?;
    }
    {
        let app = app.clone();
        let ui = ui.clone();
        add_listener(&eraser_button, "click", move |_| {
            set_tool(&mut app.borrow_mut(), &ui, Tool::Eraser);
        })?;
    }
    {
        let app = app.clone();
        let color_cb = color_input.clone();
        add_listener(&color_input, "input", move |_| {
            app.borrow_mut().brush.color = color_cb.value();
        })?;
    }
    {
        let app = app.clone();
        let size_cb = size_input.clone();
        add_listener(&size_input, "input", move |_| {
            app.borrow_mut().brush.width = sanitize_size(&size_cb.value());
            update_size_label(&size_cb, &size_value);
        })?;
    }
    {
        let app = app.clone();
        add_listener(&undo_button, "click", move |_| {
            let mut app = app.borrow_mut();
            let result = app.reconciler.undo();
            app.send_result("undo", result);
        })?;
    }
    {
        let app = app.clone();
        add_listener(&redo_button, "click", move |_| {
            let mut app = app.borrow_mut();
            let result = app.reconciler.redo();
            app.send_result("redo", result);
        })?;
    }
    {
        let app = app.clone();
        add_listener(&clear_button, "click", move |_| {
            let mut app = app.borrow_mut();
            let result = app.reconciler.clear();
            app.send_result("clear", result);
        })?;
    }

    {
        let app = app.clone();
        let canvas_cb = canvas.clone();
        add_pointer_listener(&canvas, "pointerdown", move |event: PointerEvent| {
            let Some(point) = event_to_point(&canvas_cb, &event) else {
                return;
            };
            event.prevent_default();
            let _ = canvas_cb.set_pointer_capture(event.pointer_id());
            let mut app = app.borrow_mut();
            app.pointer_down = true;
            match app.tool {
                Tool::Brush => {
                    app.capture.clear();
                    app.capture.push(point);
                    let (color, width) = (app.brush.color.clone(), app.brush.width);
                    app.reconciler
                        .renderer()
                        .draw_preview(None, point, &color, width);
                }
                Tool::Eraser => app.erase_at(point),
            }
        })?;
    }

    {
        let app = app.clone();
        let canvas_cb = canvas.clone();
        add_pointer_listener(&canvas, "pointermove", move |event: PointerEvent| {
            let Some(point) = event_to_point(&canvas_cb, &event) else {
                return;
            };
            let mut app = app.borrow_mut();
            let now = js_sys::Date::now();
            if now - app.last_cursor_sent >= CURSOR_THROTTLE_MS {
                if let Some(message) = app.reconciler.cursor_move(point) {
                    app.send(&message);
                    app.last_cursor_sent = now;
                }
            }
            if !app.pointer_down {
                return;
            }
            match app.tool {
                Tool::Brush => {
                    let previous = app.capture.last().copied();
                    app.capture.push(point);
                    let (color, width) = (app.brush.color.clone(), app.brush.width);
                    app.reconciler
                        .renderer()
                        .draw_preview(previous, point, &color, width);
                }
                Tool::Eraser => app.erase_at(point),
            }
        })?;
    }

    for name in ["pointerup", "pointercancel"] {
        let app = app.clone();
        let canvas_cb = canvas.clone();
        add_pointer_listener(&canvas, name, move |event: PointerEvent| {
            let _ = canvas_cb.release_pointer_capture(event.pointer_id());
            let mut app = app.borrow_mut();
            if !app.pointer_down {
                return;
            }
            app.pointer_down = false;
            if app.tool != Tool::Brush {
                return;
            }
            let path = CapturedPath {
                points: std::mem::take(&mut app.capture),
                brush: app.brush.clone(),
            };
            let result = app.reconciler.complete_stroke(path);
            if result.is_err() {
                app.reconciler.redraw();
            }
            app.send_result("stroke", result);
        })?;
    }

    {
        let app = app.clone();
        let window_cb = window.clone();
        let canvas_cb = canvas.clone();
        add_listener(&window, "resize", move |_| {
            let (width, height, dpr) = fit_canvas(&window_cb, &canvas_cb);
            let mut app = app.borrow_mut();
            app.reconciler.renderer_mut().resize(width, height, dpr);
            app.reconciler.redraw();
        })?;
    }

    {
        let app = app.clone();
        let onjoincheck = Closure::<dyn FnMut()>::new(move || {
            let mut app = app.borrow_mut();
            let waiting = app.reconciler.status() == SyncStatus::Joining
                && app.sender.as_ref().is_some_and(|sender| sender.is_open());
            if waiting && js_sys::Date::now() - app.join_sent_at >= JOIN_RETRY_MS {
                web_sys::console::warn_1(&"No board state yet, re-sending join".into());
                app.send_join();
            }
        });
        window.set_interval_with_callback_and_timeout_and_arguments_0(
            onjoincheck.as_ref().unchecked_ref(),
            JOIN_CHECK_INTERVAL_MS,
        )?;
        onjoincheck.forget();
    }

    {
        let app = app.clone();
        add_listener(&window, "beforeunload", move |_| {
            let app = app.borrow();
            app.send(&ClientMessage::LeaveBoard);
            if let Some(sender) = &app.sender {
                sender.close();
            }
        })?;
    }

    connect(&window, &app, &ui);
    Ok(())
}
