#![forbid(unsafe_code)]

//! `wasm-bindgen` exports for [`WebTtyTerminal`].
//!
//! DOM listeners, the overlay node and dismiss timers live in [`DomHost`];
//! the JS terminal object is driven through [`JsSurface`]. Callbacks hold a
//! `Weak` handle to the session and hand their event to the adapter, or queue
//! it when the adapter is already borrowed further up the stack.
//!
//! Only compiled on `wasm32` targets.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};
use std::time::Duration;

use js_sys::{Array, Function, JsString, Object, Reflect, Uint8Array};
use tracing::{trace, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use webtty_core::input::timestamp_from_millis;
use webtty_core::{
    AdapterConfig, CellMetrics, ContainerSize, DecoderOutput, Dimensions, EncodeError,
    HostEnvironment, HostError, InboundDecoder, InputEvent, Listener, Notification,
    NotificationSink, OverlayCommand, PlatformProfile, PlatformSignals, TerminalAdapter,
    TerminalSurface, TimerId,
};

use crate::dom::{DomInputFields, data_from_utf16, input_event_from_dom};

const OVERLAY_CLASS: &str = "xterm-overlay";

/// `console.error(msg)`. Returns whether a console took the message.
fn console_error(msg: &str) -> bool {
    match Reflect::get(&js_sys::global(), &JsValue::from_str("console")) {
        Ok(console) if console.is_object() => {
            call_method(&console, "error", &Array::of1(&JsValue::from_str(msg))).is_ok()
        }
        _ => false,
    }
}

/// Route Rust panics to the browser console. Installed once per module.
fn install_panic_hook() {
    static HOOK: std::sync::Once = std::sync::Once::new();
    HOOK.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let location = info
                .location()
                .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
                .unwrap_or_default();
            console_error(&format!("webtty panic{location}: {info}"));
        }));
    });
}

fn set_js(obj: &Object, key: &str, value: JsValue) {
    if let Err(err) = Reflect::set(obj, &JsValue::from_str(key), &value) {
        warn!(err = ?err, key, "property not set");
    }
}

fn js_error(value: &JsValue) -> HostError {
    HostError::Dom(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

fn host_error_to_js(err: &HostError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn get_f64_opt(obj: &JsValue, key: &str) -> Result<Option<f64>, JsValue> {
    let v = Reflect::get(obj, &JsValue::from_str(key))?;
    if v.is_null() || v.is_undefined() {
        return Ok(None);
    }
    v.as_f64()
        .map(Some)
        .ok_or_else(|| JsValue::from_str(&format!("field {key} must be a number")))
}

/// Call `target[name](...args)`.
fn call_method(target: &JsValue, name: &'static str, args: &Array) -> Result<JsValue, HostError> {
    let method = Reflect::get(target, &JsValue::from_str(name)).map_err(|e| js_error(&e))?;
    let Some(function) = method.dyn_ref::<Function>() else {
        return Err(HostError::Unsupported(name));
    };
    function.apply(target, args).map_err(|e| js_error(&e))
}

fn parse_config(options: Option<&JsValue>) -> Result<AdapterConfig, JsValue> {
    let mut config = AdapterConfig::default();
    let Some(options) = options.filter(|o| o.is_object()) else {
        return Ok(config);
    };
    if let Some(ms) = get_f64_opt(options, "overlayTimeoutMs")? {
        if !ms.is_finite() || ms < 0.0 {
            return Err(JsValue::from_str("overlayTimeoutMs must be a non-negative number"));
        }
        config.overlay_timeout = Duration::from_millis(ms as u64);
    }
    if let Some(max) = get_f64_opt(options, "maxPendingOutbound")? {
        if !max.is_finite() || max < 0.0 {
            return Err(JsValue::from_str("maxPendingOutbound must be a non-negative number"));
        }
        config.max_pending_outbound = max as usize;
    }
    if let Some(ms) = get_f64_opt(options, "echoWindowMs")? {
        config.echo_window = timestamp_from_millis(ms)
            .ok_or_else(|| JsValue::from_str("echoWindowMs must be a non-negative number"))?;
    }
    if let Some(px) = get_f64_opt(options, "reservedWidthPx")? {
        config.fit.reserved_width_px = px;
    }
    if let Some(px) = get_f64_opt(options, "reservedHeightPx")? {
        config.fit.reserved_height_px = px;
    }
    Ok(config)
}

fn platform_signals(window: &web_sys::Window) -> PlatformSignals {
    let navigator = window.navigator();
    PlatformSignals::new(
        navigator.user_agent().unwrap_or_default(),
        navigator.platform().unwrap_or_default(),
        u32::try_from(navigator.max_touch_points()).unwrap_or(0),
    )
}

// ---- session ---------------------------------------------------------------

type WebAdapter = TerminalAdapter<JsSurface, DomHost, JsDecoder>;

/// Something the browser (or the embedding page) told us while the adapter
/// may be busy.
#[derive(Debug)]
enum HostSignal {
    Input {
        event: InputEvent,
        at: Option<Duration>,
    },
    WindowResize,
    TouchStart,
    Timer(TimerId),
    Close,
}

struct Session {
    adapter: RefCell<Option<WebAdapter>>,
    pending: RefCell<VecDeque<HostSignal>>,
    // Kept here because `close` drops the surface, possibly from inside
    // the keystroke callback itself.
    retired_keystrokes: RefCell<Vec<Closure<dyn FnMut(JsValue)>>>,
}

/// Returns whether the browser's default action must be prevented.
fn handle_signal(adapter: &mut WebAdapter, signal: HostSignal) -> bool {
    match signal {
        HostSignal::Input { event, at } => {
            let dispatch = match at {
                Some(at) => adapter.handle_input_at(&event, at),
                None => adapter.handle_input(&event),
            };
            dispatch.is_some_and(|dispatch| dispatch.prevent_default)
        }
        HostSignal::WindowResize => {
            adapter.on_window_resize();
            false
        }
        HostSignal::TouchStart => {
            adapter.on_touch_start();
            false
        }
        HostSignal::Timer(timer) => {
            adapter.host_mut().retire_timer(timer);
            adapter.on_timer(timer);
            false
        }
        HostSignal::Close => {
            adapter.close();
            false
        }
    }
}

/// Drop callbacks removed by an earlier call. Only valid when no adapter
/// call is on the stack, so none of them can be running.
fn release_retired(session: &Session, adapter: &mut WebAdapter) {
    adapter.host_mut().release_retired();
    session.retired_keystrokes.borrow_mut().clear();
}

fn drain_pending(session: &Session, adapter: &mut WebAdapter) {
    loop {
        let next = session.pending.borrow_mut().pop_front();
        let Some(signal) = next else {
            break;
        };
        handle_signal(adapter, signal);
    }
}

/// Deliver a browser signal. Re-entrant deliveries are queued and handled
/// once the outer call returns, so their default action is never prevented.
fn deliver(session: &Weak<Session>, signal: HostSignal) -> bool {
    let Some(session) = session.upgrade() else {
        return false;
    };
    let Ok(mut guard) = session.adapter.try_borrow_mut() else {
        session.pending.borrow_mut().push_back(signal);
        return false;
    };
    let Some(adapter) = guard.as_mut() else {
        return false;
    };
    release_retired(&session, adapter);
    let prevent = handle_signal(adapter, signal);
    drain_pending(&session, adapter);
    prevent
}

/// Read a JS string as UTF-16 code units; `None` for non-strings.
fn js_text(value: &JsValue) -> Result<Option<String>, EncodeError> {
    let units = value
        .dyn_ref::<JsString>()
        .map(|text| text.iter().collect::<Vec<u16>>());
    data_from_utf16(units.as_deref())
}

fn dom_fields(event: &web_sys::Event) -> Result<DomInputFields, EncodeError> {
    // `data` is read raw; the typed getters replace lone surrogates.
    // Legacy `textInput` is a TextEvent, which web-sys does not bind.
    let data = match Reflect::get(event.as_ref(), &JsValue::from_str("data")) {
        Ok(value) => js_text(&value)?,
        Err(_) => None,
    };
    let (input_type, is_composing) = match event.dyn_ref::<web_sys::InputEvent>() {
        Some(input) => (Some(input.input_type()), input.is_composing()),
        None => (None, false),
    };
    Ok(DomInputFields {
        data,
        input_type,
        is_composing,
    })
}

/// Surface keystrokes carry no DOM event; stamp them on the same clock.
fn performance_now() -> Option<Duration> {
    let performance = web_sys::window()?.performance()?;
    timestamp_from_millis(performance.now())
}

// ---- host ------------------------------------------------------------------

struct DomHost {
    window: web_sys::Window,
    document: web_sys::Document,
    element: web_sys::HtmlElement,
    overlay: web_sys::HtmlElement,
    session: Weak<Session>,
    listeners: HashMap<Listener, Closure<dyn FnMut(web_sys::Event)>>,
    timers: HashMap<TimerId, (i32, Closure<dyn FnMut()>)>,
    // Callbacks are dropped only once they can no longer be on the stack.
    retired_listeners: Vec<Closure<dyn FnMut(web_sys::Event)>>,
    retired_timer: Option<Closure<dyn FnMut()>>,
}

impl DomHost {
    fn new(
        window: web_sys::Window,
        element: web_sys::HtmlElement,
        session: Weak<Session>,
    ) -> Result<Self, JsValue> {
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("window has no document"))?;
        let overlay: web_sys::HtmlElement = document.create_element("div")?.dyn_into()?;
        overlay.set_class_name(OVERLAY_CLASS);
        Ok(Self {
            window,
            document,
            element,
            overlay,
            session,
            listeners: HashMap::new(),
            timers: HashMap::new(),
            retired_listeners: Vec::new(),
            retired_timer: None,
        })
    }

    fn target(&self, listener: Listener) -> &web_sys::EventTarget {
        match listener {
            Listener::WindowResize => self.window.as_ref(),
            _ => self.element.as_ref(),
        }
    }

    fn listener_closure(&self, listener: Listener) -> Closure<dyn FnMut(web_sys::Event)> {
        let session = self.session.clone();
        Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
            let signal = match listener {
                Listener::WindowResize => HostSignal::WindowResize,
                Listener::TouchStart => HostSignal::TouchStart,
                _ => {
                    let fields = match dom_fields(&event) {
                        Ok(fields) => fields,
                        Err(err) => {
                            warn!(%err, listener = listener.event_name(), "dropping input event");
                            return;
                        }
                    };
                    let Some(input) = input_event_from_dom(listener, fields) else {
                        return;
                    };
                    HostSignal::Input {
                        event: input,
                        at: timestamp_from_millis(event.time_stamp()),
                    }
                }
            };
            if deliver(&session, signal) {
                event.prevent_default();
            }
        })
    }

    /// A dismiss timer fired; its callback is still on the stack.
    fn retire_timer(&mut self, timer: TimerId) {
        if let Some((_, callback)) = self.timers.remove(&timer) {
            self.retired_timer = Some(callback);
        }
    }

    fn release_retired(&mut self) {
        if !self.retired_listeners.is_empty() {
            trace!(count = self.retired_listeners.len(), "releasing removed listeners");
            self.retired_listeners.clear();
        }
    }

    fn overlay_attached(&self) -> bool {
        let element: &web_sys::Node = self.element.as_ref();
        self.overlay
            .parent_node()
            .is_some_and(|parent| &parent == element)
    }
}

impl HostEnvironment for DomHost {
    fn container_size(&self) -> Option<ContainerSize> {
        Some(ContainerSize {
            width_px: f64::from(self.element.client_width()),
            height_px: f64::from(self.element.client_height()),
        })
    }

    fn add_listener(&mut self, listener: Listener) -> Result<(), HostError> {
        if self.listeners.contains_key(&listener) {
            return Ok(());
        }
        let callback = self.listener_closure(listener);
        self.target(listener)
            .add_event_listener_with_callback(
                listener.event_name(),
                callback.as_ref().unchecked_ref(),
            )
            .map_err(|e| HostError::ListenerRegistration {
                listener,
                reason: js_error(&e).to_string(),
            })?;
        self.listeners.insert(listener, callback);
        Ok(())
    }

    fn remove_listener(&mut self, listener: Listener) -> Result<(), HostError> {
        let Some(callback) = self.listeners.remove(&listener) else {
            return Err(HostError::ListenerNotRegistered);
        };
        let result = self
            .target(listener)
            .remove_event_listener_with_callback(
                listener.event_name(),
                callback.as_ref().unchecked_ref(),
            )
            .map_err(|e| js_error(&e));
        self.retired_listeners.push(callback);
        result
    }

    fn apply_overlay(&mut self, command: &OverlayCommand) -> Result<(), HostError> {
        match command {
            OverlayCommand::Display { text } => {
                self.overlay.set_text_content(Some(text));
                if !self.overlay_attached() {
                    self.element
                        .append_child(&self.overlay)
                        .map_err(|e| js_error(&e))?;
                }
                Ok(())
            }
            OverlayCommand::Remove => {
                if !self.overlay_attached() {
                    return Err(HostError::Dom("overlay is not attached".into()));
                }
                self.element
                    .remove_child(&self.overlay)
                    .map(drop)
                    .map_err(|e| js_error(&e))
            }
            OverlayCommand::ScheduleDismiss { timer, after } => {
                let session = self.session.clone();
                let timer = *timer;
                let callback = Closure::<dyn FnMut()>::once(move || {
                    deliver(&session, HostSignal::Timer(timer));
                });
                let delay = i32::try_from(after.as_millis()).unwrap_or(i32::MAX);
                let handle = self
                    .window
                    .set_timeout_with_callback_and_timeout_and_arguments_0(
                        callback.as_ref().unchecked_ref(),
                        delay,
                    )
                    .map_err(|e| js_error(&e))?;
                self.timers.insert(timer, (handle, callback));
                Ok(())
            }
            OverlayCommand::CancelDismiss { timer } => {
                if let Some((handle, _callback)) = self.timers.remove(timer) {
                    self.window.clear_timeout_with_handle(handle);
                }
                Ok(())
            }
        }
    }

    fn set_window_title(&mut self, title: &str) {
        self.document.set_title(title);
    }
}

// ---- surface ---------------------------------------------------------------

/// A JS terminal object.
///
/// Expected shape: `open(element)`, `write(Uint8Array)`, `resize(cols, rows)`,
/// `scrollToBottom()`, `focus()`, `blur()`, `clear()`, `dispose()`,
/// `onData(cb) -> { dispose() }`, `cellMetrics() -> { width, height }`, an
/// `options` object (`fontSize`, `fontFamily`, `disableStdin`) and optionally
/// `enableAcceleratedRendering()`.
struct JsSurface {
    inner: JsValue,
    element: web_sys::HtmlElement,
    session: Weak<Session>,
    keystrokes: Option<(Closure<dyn FnMut(JsValue)>, JsValue)>,
}

impl JsSurface {
    fn invoke(&self, name: &'static str, args: &Array) {
        if let Err(err) = call_method(&self.inner, name, args) {
            warn!(%err, method = name, "terminal surface call failed");
        }
    }

    fn set_option(&self, key: &str, value: &JsValue) {
        let result = Reflect::get(&self.inner, &JsValue::from_str("options"))
            .and_then(|options| Reflect::set(&options, &JsValue::from_str(key), value));
        if let Err(err) = result {
            warn!(err = ?err, key, "terminal option not applied");
        }
    }
}

impl TerminalSurface for JsSurface {
    fn open(&mut self) -> Result<(), HostError> {
        call_method(&self.inner, "open", &Array::of1(&self.element)).map(drop)
    }

    fn write(&mut self, bytes: &[u8]) {
        self.invoke("write", &Array::of1(&Uint8Array::from(bytes)));
    }

    fn cell_metrics(&self) -> Option<CellMetrics> {
        let metrics = call_method(&self.inner, "cellMetrics", &Array::new()).ok()?;
        Some(CellMetrics {
            width_px: get_f64_opt(&metrics, "width").ok()??,
            height_px: get_f64_opt(&metrics, "height").ok()??,
        })
    }

    fn resize(&mut self, dims: Dimensions) {
        self.invoke(
            "resize",
            &Array::of2(&JsValue::from(dims.cols()), &JsValue::from(dims.rows())),
        );
    }

    fn scroll_to_bottom(&mut self) {
        self.invoke("scrollToBottom", &Array::new());
    }

    fn focus(&mut self) {
        self.invoke("focus", &Array::new());
    }

    fn blur(&mut self) {
        self.invoke("blur", &Array::new());
    }

    fn clear(&mut self) {
        self.invoke("clear", &Array::new());
    }

    fn set_stdin_enabled(&mut self, enabled: bool) {
        self.set_option("disableStdin", &JsValue::from_bool(!enabled));
    }

    fn set_font_size(&mut self, size: f64) {
        self.set_option("fontSize", &JsValue::from_f64(size));
    }

    fn set_font_family(&mut self, family: &str) {
        self.set_option("fontFamily", &JsValue::from_str(family));
    }

    fn enable_accelerated_rendering(&mut self) -> Result<(), HostError> {
        call_method(&self.inner, "enableAcceleratedRendering", &Array::new()).map(drop)
    }

    fn subscribe_keystrokes(&mut self) -> Result<(), HostError> {
        if self.keystrokes.is_some() {
            return Ok(());
        }
        let session = self.session.clone();
        let callback = Closure::<dyn FnMut(JsValue)>::new(move |data: JsValue| {
            match js_text(&data) {
                Ok(Some(text)) => {
                    let signal = HostSignal::Input {
                        event: InputEvent::key(&text),
                        at: performance_now(),
                    };
                    deliver(&session, signal);
                }
                Ok(None) => {}
                Err(err) => warn!(%err, "dropping keystroke"),
            }
        });
        let disposable = call_method(&self.inner, "onData", &Array::of1(callback.as_ref()))?;
        self.keystrokes = Some((callback, disposable));
        Ok(())
    }

    fn unsubscribe_keystrokes(&mut self) {
        if let Some((callback, disposable)) = self.keystrokes.take() {
            if let Err(err) = call_method(&disposable, "dispose", &Array::new()) {
                warn!(%err, "keystroke subscription dispose failed");
            }
            if let Some(session) = self.session.upgrade() {
                session.retired_keystrokes.borrow_mut().push(callback);
            }
        }
    }

    fn dispose(&mut self) {
        self.invoke("dispose", &Array::new());
    }
}

// ---- decoder ---------------------------------------------------------------

/// Optional JS decoder: `consume(Uint8Array) -> { toTerminal: Uint8Array[], toServer: Uint8Array[] }`.
struct JsDecoder {
    consume: Option<Function>,
}

fn byte_chunks(obj: &JsValue, key: &str) -> Vec<Vec<u8>> {
    let Ok(value) = Reflect::get(obj, &JsValue::from_str(key)) else {
        return Vec::new();
    };
    if !Array::is_array(&value) {
        return Vec::new();
    }
    Array::from(&value)
        .iter()
        .filter_map(|chunk| chunk.dyn_into::<Uint8Array>().ok())
        .map(|chunk| chunk.to_vec())
        .collect()
}

impl InboundDecoder for JsDecoder {
    fn consume(&mut self, data: &[u8], out: &mut DecoderOutput) {
        let Some(consume) = self.consume.as_ref() else {
            out.terminal(data);
            return;
        };
        match consume.call1(&JsValue::NULL, &Uint8Array::from(data)) {
            Ok(result) => {
                for chunk in byte_chunks(&result, "toTerminal") {
                    out.terminal(&chunk);
                }
                for chunk in byte_chunks(&result, "toServer") {
                    out.server(&chunk);
                }
            }
            Err(err) => {
                warn!(err = ?err, "decoder failed, rendering raw bytes");
                out.terminal(data);
            }
        }
    }
}

// ---- notifications ---------------------------------------------------------

struct JsNotificationSink {
    callback: Function,
}

impl NotificationSink for JsNotificationSink {
    fn notify(&mut self, notification: &Notification) {
        let result = self.callback.call3(
            &JsValue::NULL,
            &JsValue::from_str(&notification.title),
            &JsValue::from_str(&notification.body),
            &JsValue::from_str(notification.severity.as_str()),
        );
        if let Err(err) = result {
            warn!(err = ?err, "notification callback failed");
        }
    }
}

/// Map a notification stream payload and hand it to `callback(title, body, severity)`.
#[wasm_bindgen(js_name = dispatchNotification)]
pub fn dispatch_notification(payload: &str, callback: Function) -> Result<(), JsValue> {
    let notification = Notification::from_event_json(payload)
        .map_err(|err| JsValue::from_str(&format!("invalid notification payload: {err}")))?;
    JsNotificationSink { callback }.notify(&notification);
    Ok(())
}

/// Platform classification for the current browser.
#[wasm_bindgen(js_name = platformProfile)]
pub fn platform_profile() -> JsValue {
    let obj = Object::new();
    if let Some(window) = web_sys::window() {
        let profile = PlatformProfile::classify(&platform_signals(&window));
        set_js(&obj, "touchPrimary", JsValue::from_bool(profile.touch_primary));
        set_js(&obj, "iosLike", JsValue::from_bool(profile.ios_like));
    }
    obj.into()
}

#[wasm_bindgen(start)]
pub fn wasm_start() {
    install_panic_hook();
}

// ---- exported terminal -----------------------------------------------------

/// Browser TTY terminal: wraps a JS terminal object and reconciles its input
/// channels into one outbound byte stream.
#[wasm_bindgen]
pub struct WebTtyTerminal {
    session: Rc<Session>,
}

impl WebTtyTerminal {
    fn with_adapter<R>(&self, f: impl FnOnce(&mut WebAdapter) -> R) -> Result<R, JsValue> {
        let mut guard = self
            .session
            .adapter
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("terminal is busy"))?;
        let adapter = guard
            .as_mut()
            .ok_or_else(|| JsValue::from_str("terminal not initialized"))?;
        release_retired(&self.session, adapter);
        let result = f(adapter);
        drain_pending(&self.session, adapter);
        Ok(result)
    }
}

#[wasm_bindgen]
impl WebTtyTerminal {
    /// Create a terminal bound to `element`.
    ///
    /// `options` may carry `overlayTimeoutMs`, `maxPendingOutbound`,
    /// `reservedWidthPx` and `reservedHeightPx`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        element: web_sys::HtmlElement,
        surface: JsValue,
        decoder: Option<Function>,
        options: Option<JsValue>,
    ) -> Result<WebTtyTerminal, JsValue> {
        install_panic_hook();
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let config = parse_config(options.as_ref())?;
        let profile = PlatformProfile::classify(&platform_signals(&window));

        let session = Rc::new(Session {
            adapter: RefCell::new(None),
            pending: RefCell::new(VecDeque::new()),
            retired_keystrokes: RefCell::new(Vec::new()),
        });
        let weak = Rc::downgrade(&session);
        let host = DomHost::new(window, element.clone(), weak.clone())?;
        let surface = JsSurface {
            inner: surface,
            element,
            session: weak,
            keystrokes: None,
        };
        let decoder = JsDecoder { consume: decoder };
        let adapter = TerminalAdapter::with_decoder(surface, host, decoder, profile, config);
        *session.adapter.borrow_mut() = Some(adapter);
        Ok(Self { session })
    }

    /// Attach the surface, fit it and show the initial dimensions.
    pub fn open(&self) -> Result<(), JsValue> {
        self.with_adapter(|adapter| adapter.open())?
            .map_err(|err| host_error_to_js(&err))
    }

    /// Install the outbound callback. Returns `false` if one is already set.
    #[wasm_bindgen(js_name = onInput)]
    pub fn on_input(&self, callback: Function) -> Result<bool, JsValue> {
        self.with_adapter(|adapter| {
            adapter.register_outbound_sink(move |bytes: &[u8]| {
                if let Err(err) = callback.call1(&JsValue::NULL, &Uint8Array::from(bytes)) {
                    console_error(&format!("outbound callback failed: {err:?}"));
                }
            })
        })
    }

    /// Install the dimension callback `(columns, rows)`.
    #[wasm_bindgen(js_name = onResize)]
    pub fn on_resize(&self, callback: Function) -> Result<(), JsValue> {
        self.with_adapter(|adapter| {
            adapter.register_resize_sink(move |dims: Dimensions| {
                let result = callback.call2(
                    &JsValue::NULL,
                    &JsValue::from(dims.cols()),
                    &JsValue::from(dims.rows()),
                );
                if let Err(err) = result {
                    console_error(&format!("resize callback failed: {err:?}"));
                }
            });
        })
    }

    /// Bytes received from the remote session.
    pub fn output(&self, data: &[u8]) -> Result<(), JsValue> {
        self.with_adapter(|adapter| adapter.consume_inbound(data))
    }

    /// Send bytes to the remote session from outside the terminal.
    #[wasm_bindgen(js_name = sendInput)]
    pub fn send_input(&self, data: &[u8]) -> Result<(), JsValue> {
        self.with_adapter(|adapter| adapter.send_input(data))
    }

    /// Feed a serialized input event; returns whether to prevent the default.
    #[wasm_bindgen(js_name = handleInputJson)]
    pub fn handle_input_json(&self, json: &str) -> Result<bool, JsValue> {
        self.with_adapter(|adapter| adapter.handle_input_json(json))
    }

    #[wasm_bindgen(js_name = setPreferences)]
    pub fn set_preferences(&self, value: JsValue) -> Result<(), JsValue> {
        let text: String = js_sys::JSON::stringify(&value)?.into();
        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|err| JsValue::from_str(&format!("invalid preferences: {err}")))?;
        self.with_adapter(|adapter| adapter.set_preferences(&value).map(drop))?
            .map_err(|err| JsValue::from_str(&err.to_string()))
    }

    #[wasm_bindgen(js_name = disableStdin)]
    pub fn disable_stdin(&self) -> Result<(), JsValue> {
        self.with_adapter(|adapter| adapter.disable_stdin())
    }

    #[wasm_bindgen(js_name = enableStdin)]
    pub fn enable_stdin(&self) -> Result<(), JsValue> {
        self.with_adapter(|adapter| adapter.enable_stdin())
    }

    /// `{ columns, rows }`, or `null` before the first fit.
    pub fn info(&self) -> Result<JsValue, JsValue> {
        self.with_adapter(|adapter| match adapter.info() {
            Some(dims) => {
                let obj = Object::new();
                set_js(&obj, "columns", JsValue::from(dims.cols()));
                set_js(&obj, "rows", JsValue::from(dims.rows()));
                obj.into()
            }
            None => JsValue::NULL,
        })
    }

    /// Recompute the grid from the container size.
    pub fn fit(&self) -> Result<(), JsValue> {
        self.with_adapter(|adapter| adapter.refit())
    }

    /// Show `text`; `timeout_ms == 0` keeps it until removed.
    #[wasm_bindgen(js_name = showMessage)]
    pub fn show_message(&self, text: &str, timeout_ms: u32) -> Result<(), JsValue> {
        self.with_adapter(|adapter| {
            adapter.show_message(text, Duration::from_millis(u64::from(timeout_ms)));
        })
    }

    #[wasm_bindgen(js_name = removeMessage)]
    pub fn remove_message(&self) -> Result<(), JsValue> {
        self.with_adapter(|adapter| adapter.clear_message())
    }

    #[wasm_bindgen(js_name = setWindowTitle)]
    pub fn set_window_title(&self, title: &str) -> Result<(), JsValue> {
        self.with_adapter(|adapter| adapter.set_window_title(title))
    }

    #[wasm_bindgen(js_name = isComposing)]
    pub fn is_composing(&self) -> Result<bool, JsValue> {
        self.with_adapter(|adapter| adapter.session().composing)
    }

    pub fn focus(&self) -> Result<(), JsValue> {
        self.with_adapter(|adapter| adapter.focus())
    }

    /// Stop input delivery and blur; a new `onInput` may follow.
    pub fn deactivate(&self) -> Result<(), JsValue> {
        self.with_adapter(|adapter| adapter.deactivate())
    }

    pub fn reset(&self) -> Result<(), JsValue> {
        self.with_adapter(|adapter| adapter.reset())
    }

    /// Tear everything down. Safe to call repeatedly, including from inside
    /// an `onInput`/`onResize` callback, where it takes effect as soon as the
    /// running call returns.
    pub fn close(&self) -> Result<(), JsValue> {
        let busy = self.session.adapter.try_borrow_mut().is_err();
        if busy {
            self.session.pending.borrow_mut().push_back(HostSignal::Close);
            return Ok(());
        }
        self.with_adapter(|adapter| adapter.close())
    }
}

impl Drop for WebTtyTerminal {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.session.adapter.try_borrow_mut()
            && let Some(adapter) = guard.as_mut()
        {
            adapter.close();
        }
    }
}
