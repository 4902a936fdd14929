#![forbid(unsafe_code)]

//! Terminal adapter: session lifecycle and wiring.
//!
//! [`TerminalAdapter`] owns the reconciliation engine, the fit negotiator and
//! the overlay messenger, and drives a [`TerminalSurface`] and
//! [`HostEnvironment`] on their behalf. The host forwards DOM events and
//! timer firings into the adapter; the adapter never calls back into the
//! host's event loop.
//!
//! Entry points that run from event handlers return `()` (or a plain
//! verdict) and log failures; nothing propagates past a single handler.

use std::collections::VecDeque;
use std::fmt;

use core::time::Duration;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{ConfigError, HostError};
use crate::fit::{Dimensions, FitNegotiator};
use crate::host::{
    DecoderOutput, HostEnvironment, InboundDecoder, Listener, ListenerSet, PassthroughDecoder,
    TerminalSurface,
};
use crate::input::InputEvent;
use crate::overlay::{OverlayCommand, OverlayMessenger, TimerId};
use crate::platform::PlatformProfile;
use crate::prefs::{AdapterConfig, Preferences};
use crate::reconcile::{ReconcileDispatch, ReconcileEngine};

/// Destination for reconciled outbound bytes.
pub type OutboundSink = Box<dyn FnMut(&[u8])>;

/// Destination for dimension-change notifications.
pub type ResizeSink = Box<dyn FnMut(Dimensions)>;

/// Lifecycle phase of the adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AdapterPhase {
    #[default]
    Constructed,
    Open,
    Closed,
}

/// Snapshot of the terminal session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub phase: AdapterPhase,
    pub dimensions: Option<Dimensions>,
    pub focused: bool,
    pub stdin_enabled: bool,
    pub composing: bool,
    pub pending_outbound: usize,
}

pub struct TerminalAdapter<S, H, D = PassthroughDecoder> {
    surface: Option<S>,
    host: H,
    decoder: D,
    config: AdapterConfig,
    engine: ReconcileEngine,
    fit: FitNegotiator,
    overlay: OverlayMessenger,
    phase: AdapterPhase,
    listeners: ListenerSet,
    keystrokes_subscribed: bool,
    focused: bool,
    stdin_enabled: bool,
    outbound: Option<OutboundSink>,
    resize_sink: Option<ResizeSink>,
    pending_outbound: VecDeque<Vec<u8>>,
}

impl<S, H, D> fmt::Debug for TerminalAdapter<S, H, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalAdapter")
            .field("phase", &self.phase)
            .field("profile", &self.engine.profile())
            .field("state", &self.engine.state())
            .field("dimensions", &self.fit.last_reported())
            .field("listeners", &self.listeners)
            .field("has_outbound", &self.outbound.is_some())
            .field("pending_outbound", &self.pending_outbound.len())
            .finish_non_exhaustive()
    }
}

impl<S, H> TerminalAdapter<S, H, PassthroughDecoder>
where
    S: TerminalSurface,
    H: HostEnvironment,
{
    /// Adapter without a sub-protocol decoder.
    pub fn new(surface: S, host: H, profile: PlatformProfile, config: AdapterConfig) -> Self {
        Self::with_decoder(surface, host, PassthroughDecoder, profile, config)
    }
}

impl<S, H, D> TerminalAdapter<S, H, D>
where
    S: TerminalSurface,
    H: HostEnvironment,
    D: InboundDecoder,
{
    pub fn with_decoder(
        surface: S,
        host: H,
        decoder: D,
        profile: PlatformProfile,
        config: AdapterConfig,
    ) -> Self {
        Self {
            surface: Some(surface),
            host,
            decoder,
            config,
            engine: ReconcileEngine::new(profile).with_echo_window(config.echo_window),
            fit: FitNegotiator::new(config.fit),
            overlay: OverlayMessenger::new(),
            phase: AdapterPhase::Constructed,
            listeners: ListenerSet::empty(),
            keystrokes_subscribed: false,
            focused: false,
            stdin_enabled: true,
            outbound: None,
            resize_sink: None,
            pending_outbound: VecDeque::new(),
        }
    }

    // ---- accessors -------------------------------------------------------

    #[must_use]
    pub const fn phase(&self) -> AdapterPhase {
        self.phase
    }

    #[must_use]
    pub const fn profile(&self) -> PlatformProfile {
        self.engine.profile()
    }

    #[must_use]
    pub const fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Current `(columns, rows)`, `None` before the first fit.
    #[must_use]
    pub const fn info(&self) -> Option<Dimensions> {
        self.fit.last_reported()
    }

    #[must_use]
    pub const fn listeners(&self) -> ListenerSet {
        self.listeners
    }

    #[must_use]
    pub fn overlay(&self) -> &OverlayMessenger {
        &self.overlay
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// The surface, `None` once closed.
    #[must_use]
    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    #[must_use]
    pub fn session(&self) -> SessionState {
        SessionState {
            phase: self.phase,
            dimensions: self.fit.last_reported(),
            focused: self.focused,
            stdin_enabled: self.stdin_enabled,
            composing: self.engine.is_composing(),
            pending_outbound: self.pending_outbound.len(),
        }
    }

    // ---- lifecycle -------------------------------------------------------

    /// Attach the surface, fit, listen for window resizes and show the
    /// initial dimensions.
    ///
    /// A failure leaves whatever was set up in place; [`Self::close`]
    /// tears down partial state.
    pub fn open(&mut self) -> Result<(), HostError> {
        match self.phase {
            AdapterPhase::Constructed => {}
            AdapterPhase::Open => {
                debug!("terminal adapter already open");
                return Ok(());
            }
            AdapterPhase::Closed => {
                debug!("open after close ignored");
                return Ok(());
            }
        }
        let Some(surface) = self.surface.as_mut() else {
            return Err(HostError::Unsupported("terminal surface"));
        };
        surface.open()?;
        self.phase = AdapterPhase::Open;
        surface.focus();
        self.focused = true;
        self.add_listener(Listener::WindowResize);
        self.fit_and_report();
        debug!(profile = ?self.engine.profile(), "terminal adapter opened");
        Ok(())
    }

    /// Deregister every listener, cancel the overlay timer and release the
    /// surface. Idempotent.
    pub fn close(&mut self) {
        if self.phase == AdapterPhase::Closed {
            trace!("close on closed adapter");
            return;
        }
        self.phase = AdapterPhase::Closed;

        let commands = self.overlay.clear();
        self.apply_overlay(&commands);

        for listener in self.listeners.listeners() {
            if let Err(err) = self.host.remove_listener(listener) {
                warn!(%err, listener = listener.event_name(), "listener teardown failed");
            }
        }
        self.listeners = ListenerSet::empty();

        if let Some(mut surface) = self.surface.take() {
            if self.keystrokes_subscribed {
                surface.unsubscribe_keystrokes();
            }
            surface.dispose();
        }
        self.keystrokes_subscribed = false;
        self.focused = false;
        self.outbound = None;
        self.resize_sink = None;
        self.pending_outbound.clear();
        self.engine.reset();
        debug!("terminal adapter closed");
    }

    // ---- sinks -----------------------------------------------------------

    /// Install the single outbound sink.
    ///
    /// A second registration before [`Self::close`] or [`Self::deactivate`]
    /// is a no-op and returns `false`. Queued bytes are flushed into the
    /// new sink; on touch-primary profiles the virtual-keyboard listeners
    /// are wired here.
    pub fn register_outbound_sink(&mut self, sink: impl FnMut(&[u8]) + 'static) -> bool {
        if self.phase == AdapterPhase::Closed {
            debug!("outbound sink registration after close ignored");
            return false;
        }
        if self.outbound.is_some() {
            debug!("outbound sink already registered");
            return false;
        }
        let mut sink: OutboundSink = Box::new(sink);
        let queued = self.pending_outbound.len();
        for chunk in self.pending_outbound.drain(..) {
            sink(&chunk);
        }
        if queued > 0 {
            debug!(queued, "flushed pending outbound bytes");
        }
        self.outbound = Some(sink);

        if let Some(surface) = self.surface.as_mut() {
            match surface.subscribe_keystrokes() {
                Ok(()) => self.keystrokes_subscribed = true,
                Err(err) => warn!(%err, "keystroke channel unavailable"),
            }
        }
        if self.engine.profile().wants_virtual_keyboard_channels() {
            for listener in Listener::VIRTUAL_KEYBOARD {
                self.add_listener(listener);
            }
        }
        true
    }

    /// Install (or replace) the dimension-change sink.
    pub fn register_resize_sink(&mut self, sink: impl FnMut(Dimensions) + 'static) {
        if self.phase == AdapterPhase::Closed {
            debug!("resize sink registration after close ignored");
            return;
        }
        self.resize_sink = Some(Box::new(sink));
    }

    /// Stop input and resize delivery and blur the surface.
    ///
    /// Touch-to-focus stays wired. A new outbound sink may be registered
    /// afterwards.
    pub fn deactivate(&mut self) {
        if self.phase == AdapterPhase::Closed {
            return;
        }
        if let Some(surface) = self.surface.as_mut() {
            if self.keystrokes_subscribed {
                surface.unsubscribe_keystrokes();
            }
            surface.blur();
        }
        self.keystrokes_subscribed = false;
        for listener in Listener::TEXT_ENTRY {
            self.remove_listener(listener);
        }
        self.outbound = None;
        self.resize_sink = None;
        self.focused = false;
        self.engine.reset();
        debug!("terminal adapter deactivated");
    }

    // ---- input -----------------------------------------------------------

    /// Reconcile one input event and forward any emitted bytes.
    ///
    /// Returns `None` when the event was not looked at (closed adapter,
    /// stdin disabled).
    pub fn handle_input(&mut self, event: &InputEvent) -> Option<ReconcileDispatch> {
        self.reconcile(event, None)
    }

    /// [`Self::handle_input`] for an event stamped with the host's event
    /// time, so claims expire after the configured echo window.
    pub fn handle_input_at(
        &mut self,
        event: &InputEvent,
        at: Duration,
    ) -> Option<ReconcileDispatch> {
        self.reconcile(event, Some(at))
    }

    fn reconcile(
        &mut self,
        event: &InputEvent,
        at: Option<Duration>,
    ) -> Option<ReconcileDispatch> {
        if self.phase == AdapterPhase::Closed {
            trace!(channel = event.channel().label(), "input after close ignored");
            return None;
        }
        if let InputEvent::Focus { focused } = *event {
            self.focused = focused;
        }
        if !self.stdin_enabled && !matches!(event, InputEvent::Focus { .. }) {
            trace!(channel = event.channel().label(), "stdin disabled");
            return None;
        }
        let dispatch = match at {
            Some(at) => self.engine.dispatch_at(event, at),
            None => self.engine.dispatch(event),
        };
        if let Some(bytes) = dispatch.bytes.as_deref() {
            self.send_input(bytes);
        }
        Some(dispatch)
    }

    /// Parse and reconcile a host-serialized event. Returns whether the
    /// browser's default action must be prevented.
    ///
    /// An optional `timeStamp` (milliseconds) bounds the echo window.
    pub fn handle_input_json(&mut self, json: &str) -> bool {
        let (event, at) = match InputEvent::timed_from_json_str(json) {
            Ok((Some(event), at)) => (event, at),
            Ok((None, _)) => {
                trace!("ignoring non-insert input event");
                return false;
            }
            Err(err) => {
                debug!(%err, "dropping malformed input event");
                return false;
            }
        };
        self.reconcile(&event, at)
            .is_some_and(|dispatch| dispatch.prevent_default)
    }

    /// Send bytes to the remote session, queueing them until a sink exists.
    pub fn send_input(&mut self, bytes: &[u8]) {
        if bytes.is_empty() || self.phase == AdapterPhase::Closed {
            return;
        }
        if let Some(sink) = self.outbound.as_mut() {
            trace!(len = bytes.len(), "outbound");
            sink(bytes);
            return;
        }
        if self.config.max_pending_outbound == 0 {
            warn!(len = bytes.len(), "no outbound sink, dropping input");
            return;
        }
        if self.pending_outbound.len() >= self.config.max_pending_outbound {
            self.pending_outbound.pop_front();
            warn!("pending outbound queue full, dropping oldest chunk");
        }
        self.pending_outbound.push_back(bytes.to_vec());
    }

    pub fn disable_stdin(&mut self) {
        self.set_stdin(false);
    }

    pub fn enable_stdin(&mut self) {
        self.set_stdin(true);
    }

    fn set_stdin(&mut self, enabled: bool) {
        if self.stdin_enabled == enabled {
            return;
        }
        self.stdin_enabled = enabled;
        if !enabled {
            self.engine.reset();
        }
        if let Some(surface) = self.surface.as_mut() {
            surface.set_stdin_enabled(enabled);
        }
        debug!(enabled, "stdin toggled");
    }

    // ---- output ----------------------------------------------------------

    /// Hand inbound bytes to the decoder and route what it produces.
    pub fn consume_inbound(&mut self, data: &[u8]) {
        if self.phase == AdapterPhase::Closed {
            trace!(len = data.len(), "inbound after close ignored");
            return;
        }
        let mut out = DecoderOutput::default();
        self.decoder.consume(data, &mut out);
        if let Some(surface) = self.surface.as_mut() {
            for chunk in &out.to_terminal {
                surface.write(chunk);
            }
        }
        for chunk in &out.to_server {
            self.send_input(chunk);
        }
    }

    // ---- geometry --------------------------------------------------------

    /// Window resize: refit, keep the prompt in view and report changes.
    pub fn on_window_resize(&mut self) {
        if self.phase != AdapterPhase::Open {
            return;
        }
        self.fit_and_report();
        if let Some(surface) = self.surface.as_mut() {
            surface.scroll_to_bottom();
        }
    }

    /// Externally triggered refit.
    pub fn refit(&mut self) {
        if self.phase == AdapterPhase::Open {
            self.fit_and_report();
        }
    }

    fn fit_and_report(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let Some(container) = self.host.container_size() else {
            debug!("container size unavailable, skipping fit");
            return;
        };
        let Some(cell) = surface.cell_metrics() else {
            debug!("cell metrics unavailable, skipping fit");
            return;
        };
        let Some(dims) = self.fit.negotiate(container, cell) else {
            trace!("fit unchanged");
            return;
        };
        surface.resize(dims);
        debug!(cols = dims.cols(), rows = dims.rows(), "terminal resized");
        if let Some(sink) = self.resize_sink.as_mut() {
            sink(dims);
        }
        let commands = self
            .overlay
            .show(&dims.to_string(), self.config.overlay_timeout);
        self.apply_overlay(&commands);
    }

    // ---- preferences -----------------------------------------------------

    /// Apply server preferences. Unknown keys are ignored; a malformed value
    /// is skipped with a warning.
    pub fn set_preferences(&mut self, value: &Value) -> Result<Preferences, ConfigError> {
        let prefs = Preferences::from_value(value)?;
        self.apply_preferences(&prefs);
        Ok(prefs)
    }

    pub fn apply_preferences(&mut self, prefs: &Preferences) {
        let Some(surface) = self.surface.as_mut() else {
            debug!("preferences after close ignored");
            return;
        };
        if prefs.accelerated_rendering == Some(true)
            && let Err(err) = surface.enable_accelerated_rendering()
        {
            warn!(%err, "accelerated rendering unavailable, using default renderer");
        }
        if let Some(size) = prefs.font_size {
            surface.set_font_size(size);
        }
        if let Some(family) = prefs.font_family.as_deref() {
            surface.set_font_family(family);
        }
        if prefs.affects_metrics() {
            self.refit();
        }
    }

    // ---- overlay ---------------------------------------------------------

    /// Show a message; a zero timeout keeps it until replaced or cleared.
    pub fn show_message(&mut self, text: &str, timeout: Duration) {
        if self.phase == AdapterPhase::Closed {
            return;
        }
        let commands = self.overlay.show(text, timeout);
        self.apply_overlay(&commands);
    }

    pub fn clear_message(&mut self) {
        let commands = self.overlay.clear();
        self.apply_overlay(&commands);
    }

    /// A host timer fired.
    pub fn on_timer(&mut self, timer: TimerId) {
        let commands = self.overlay.timer_fired(timer);
        if commands.is_empty() {
            trace!(timer = timer.get(), "stale overlay timer");
        }
        self.apply_overlay(&commands);
    }

    fn apply_overlay(&mut self, commands: &[OverlayCommand]) {
        for command in commands {
            if let Err(err) = self.host.apply_overlay(command) {
                warn!(%err, ?command, "overlay command failed");
            }
        }
    }

    // ---- misc ------------------------------------------------------------

    pub fn focus(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            surface.focus();
            self.focused = true;
        }
    }

    /// Touch on the terminal element raises the virtual keyboard.
    pub fn on_touch_start(&mut self) {
        self.focus();
    }

    /// Remove the overlay and clear the screen.
    pub fn reset(&mut self) {
        self.clear_message();
        if let Some(surface) = self.surface.as_mut() {
            surface.clear();
        }
    }

    pub fn set_window_title(&mut self, title: &str) {
        if self.phase != AdapterPhase::Closed {
            self.host.set_window_title(title);
        }
    }

    fn add_listener(&mut self, listener: Listener) {
        let bit = ListenerSet::of(listener);
        if self.listeners.contains(bit) {
            return;
        }
        match self.host.add_listener(listener) {
            Ok(()) => self.listeners |= bit,
            Err(err) => warn!(%err, listener = listener.event_name(), "listener unavailable"),
        }
    }

    fn remove_listener(&mut self, listener: Listener) {
        let bit = ListenerSet::of(listener);
        if !self.listeners.contains(bit) {
            return;
        }
        self.listeners.remove(bit);
        if let Err(err) = self.host.remove_listener(listener) {
            warn!(%err, listener = listener.event_name(), "listener teardown failed");
        }
    }
}

impl<S, H, D> Drop for TerminalAdapter<S, H, D> {
    fn drop(&mut self) {
        if self.phase != AdapterPhase::Closed && !self.listeners.is_empty() {
            warn!(listeners = ?self.listeners, "terminal adapter dropped without close");
        }
    }
}
