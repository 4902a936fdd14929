#![forbid(unsafe_code)]

//! `webtty-core` is the host-agnostic half of a browser TTY client.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedding environment pushes input events,
//!   resizes and timer firings; the core returns bytes and commands.
//! - **One byte sequence per keystroke**: overlapping browser input channels
//!   are reconciled by [`reconcile::ReconcileEngine`].
//! - **No JS types**: everything here runs and is tested natively. The
//!   `webtty-web` crate binds it to the DOM.

pub mod adapter;
pub mod error;
pub mod fit;
pub mod host;
pub mod input;
pub mod notify;
pub mod overlay;
pub mod platform;
pub mod prefs;
pub mod reconcile;

pub use adapter::{AdapterPhase, SessionState, TerminalAdapter};
pub use error::{ConfigError, EncodeError, HostError};
pub use fit::{CellMetrics, ContainerSize, Dimensions, FitConfig, FitNegotiator};
pub use host::{
    DecoderOutput, HostEnvironment, InboundDecoder, Listener, ListenerSet, PassthroughDecoder,
    TerminalSurface,
};
pub use input::{InputChannel, InputEvent, InputEventJson, RawTextChannel};
pub use notify::{Notification, NotificationSink, Severity};
pub use overlay::{OverlayCommand, OverlayMessenger, TimerId};
pub use platform::{PlatformProfile, PlatformSignals};
pub use prefs::{AdapterConfig, Preferences};
pub use reconcile::{ReconcileDispatch, ReconcileEngine, ReconcileState};
