#![forbid(unsafe_code)]

//! Seams between the adapter and its environment.
//!
//! - [`TerminalSurface`]: the rendering engine (glyphs, cursor, scrollback).
//! - [`HostEnvironment`]: window/DOM listener registration, the overlay node
//!   and its dismiss timer.
//! - [`InboundDecoder`]: the sub-protocol layered on the output stream.
//!
//! The wasm frontend implements these over `web-sys`; tests use recording
//! fakes.

use bitflags::bitflags;

use crate::error::HostError;
use crate::fit::{CellMetrics, ContainerSize, Dimensions};
use crate::overlay::OverlayCommand;

/// A window- or element-level listener owned by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listener {
    WindowResize,
    BeforeInput,
    TextInput,
    CompositionStart,
    CompositionUpdate,
    CompositionEnd,
    NativeInput,
    /// Focus leaving the terminal element; ends any composition in flight.
    FocusOut,
    TouchStart,
}

impl Listener {
    pub const ALL: [Self; 9] = [
        Self::WindowResize,
        Self::BeforeInput,
        Self::TextInput,
        Self::CompositionStart,
        Self::CompositionUpdate,
        Self::CompositionEnd,
        Self::NativeInput,
        Self::FocusOut,
        Self::TouchStart,
    ];

    /// Element listeners that feed the reconciliation engine. Removed on
    /// deactivate.
    pub const TEXT_ENTRY: [Self; 7] = [
        Self::BeforeInput,
        Self::TextInput,
        Self::CompositionStart,
        Self::CompositionUpdate,
        Self::CompositionEnd,
        Self::NativeInput,
        Self::FocusOut,
    ];

    /// Element listeners wired on touch-primary profiles. Touch-to-focus
    /// outlives deactivate.
    pub const VIRTUAL_KEYBOARD: [Self; 8] = [
        Self::BeforeInput,
        Self::TextInput,
        Self::CompositionStart,
        Self::CompositionUpdate,
        Self::CompositionEnd,
        Self::NativeInput,
        Self::FocusOut,
        Self::TouchStart,
    ];

    /// DOM event name.
    #[must_use]
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::WindowResize => "resize",
            Self::BeforeInput => "beforeinput",
            Self::TextInput => "textInput",
            Self::CompositionStart => "compositionstart",
            Self::CompositionUpdate => "compositionupdate",
            Self::CompositionEnd => "compositionend",
            Self::NativeInput => "input",
            Self::FocusOut => "focusout",
            Self::TouchStart => "touchstart",
        }
    }
}

bitflags! {
    /// Listeners currently registered with the host.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ListenerSet: u16 {
        const WINDOW_RESIZE = 1 << 0;
        const BEFORE_INPUT = 1 << 1;
        const TEXT_INPUT = 1 << 2;
        const COMPOSITION_START = 1 << 3;
        const COMPOSITION_UPDATE = 1 << 4;
        const COMPOSITION_END = 1 << 5;
        const NATIVE_INPUT = 1 << 6;
        const TOUCH_START = 1 << 7;
        const FOCUS_OUT = 1 << 8;
    }
}

impl ListenerSet {
    #[must_use]
    pub const fn of(listener: Listener) -> Self {
        match listener {
            Listener::WindowResize => Self::WINDOW_RESIZE,
            Listener::BeforeInput => Self::BEFORE_INPUT,
            Listener::TextInput => Self::TEXT_INPUT,
            Listener::CompositionStart => Self::COMPOSITION_START,
            Listener::CompositionUpdate => Self::COMPOSITION_UPDATE,
            Listener::CompositionEnd => Self::COMPOSITION_END,
            Listener::NativeInput => Self::NATIVE_INPUT,
            Listener::TouchStart => Self::TOUCH_START,
            Listener::FocusOut => Self::FOCUS_OUT,
        }
    }

    /// Registered listeners in declaration order.
    pub fn listeners(self) -> impl Iterator<Item = Listener> {
        Listener::ALL
            .into_iter()
            .filter(move |listener| self.contains(Self::of(*listener)))
    }
}

/// The terminal rendering engine.
pub trait TerminalSurface {
    /// Attach to the mount point.
    fn open(&mut self) -> Result<(), HostError>;
    /// Render bytes received from the remote session.
    fn write(&mut self, bytes: &[u8]);
    /// Current cell size, `None` before the surface has measured its font.
    fn cell_metrics(&self) -> Option<CellMetrics>;
    fn resize(&mut self, dims: Dimensions);
    fn scroll_to_bottom(&mut self);
    fn focus(&mut self);
    fn blur(&mut self);
    fn clear(&mut self);
    fn set_stdin_enabled(&mut self, enabled: bool);
    fn set_font_size(&mut self, size: f64);
    fn set_font_family(&mut self, family: &str);
    fn enable_accelerated_rendering(&mut self) -> Result<(), HostError>;
    /// Start delivering committed keystrokes as `InputEvent::KeyCommit`.
    fn subscribe_keystrokes(&mut self) -> Result<(), HostError>;
    fn unsubscribe_keystrokes(&mut self);
    /// Release all rendering resources. Called at most once.
    fn dispose(&mut self);
}

/// Window/DOM side of the host.
pub trait HostEnvironment {
    /// Usable mount-point size, `None` if it cannot be measured.
    fn container_size(&self) -> Option<ContainerSize>;
    fn add_listener(&mut self, listener: Listener) -> Result<(), HostError>;
    fn remove_listener(&mut self, listener: Listener) -> Result<(), HostError>;
    /// Execute one overlay command (node attach/detach, timer schedule/cancel).
    fn apply_overlay(&mut self, command: &OverlayCommand) -> Result<(), HostError>;
    fn set_window_title(&mut self, title: &str);
}

/// Output of one decoder pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderOutput {
    pub to_terminal: Vec<Vec<u8>>,
    pub to_server: Vec<Vec<u8>>,
}

impl DecoderOutput {
    pub fn terminal(&mut self, bytes: &[u8]) {
        if !bytes.is_empty() {
            self.to_terminal.push(bytes.to_vec());
        }
    }

    pub fn server(&mut self, bytes: &[u8]) {
        if !bytes.is_empty() {
            self.to_server.push(bytes.to_vec());
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_terminal.is_empty() && self.to_server.is_empty()
    }
}

/// Sub-protocol decoder sitting between the transport and the surface.
pub trait InboundDecoder {
    fn consume(&mut self, data: &[u8], out: &mut DecoderOutput);
}

/// Forwards every byte to the surface unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughDecoder;

impl InboundDecoder for PassthroughDecoder {
    fn consume(&mut self, data: &[u8], out: &mut DecoderOutput) {
        out.terminal(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_set_iterates_in_declaration_order() {
        let set = ListenerSet::TOUCH_START | ListenerSet::WINDOW_RESIZE | ListenerSet::NATIVE_INPUT;
        let listeners: Vec<_> = set.listeners().collect();
        assert_eq!(
            listeners,
            vec![
                Listener::WindowResize,
                Listener::NativeInput,
                Listener::TouchStart
            ]
        );
    }

    #[test]
    fn text_entry_is_virtual_keyboard_without_touch() {
        let text_entry: ListenerSet = Listener::TEXT_ENTRY
            .into_iter()
            .map(ListenerSet::of)
            .collect();
        let virtual_keyboard: ListenerSet = Listener::VIRTUAL_KEYBOARD
            .into_iter()
            .map(ListenerSet::of)
            .collect();
        assert_eq!(virtual_keyboard - text_entry, ListenerSet::TOUCH_START);
        assert!(text_entry.contains(ListenerSet::FOCUS_OUT));
    }

    #[test]
    fn every_listener_has_a_distinct_bit() {
        let mut all = ListenerSet::empty();
        for listener in Listener::ALL {
            let bit = ListenerSet::of(listener);
            assert!(!all.intersects(bit), "{listener:?}");
            all |= bit;
        }
        assert_eq!(all, ListenerSet::all());
    }

    #[test]
    fn passthrough_forwards_and_skips_empty() {
        let mut out = DecoderOutput::default();
        PassthroughDecoder.consume(b"\x1b[1mhi", &mut out);
        PassthroughDecoder.consume(b"", &mut out);
        assert_eq!(out.to_terminal, vec![b"\x1b[1mhi".to_vec()]);
        assert!(out.to_server.is_empty());
    }
}
