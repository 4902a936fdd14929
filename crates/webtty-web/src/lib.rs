#![forbid(unsafe_code)]

//! WASM frontend for the browser TTY client.
//!
//! Binds [`webtty_core::TerminalAdapter`] to the DOM: window and element
//! listeners, the `xterm-overlay` node, `setTimeout` dismiss timers and a JS
//! terminal object. The JS entry point is [`WebTtyTerminal`] (wasm32 only).

pub mod dom;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{WebTtyTerminal, dispatch_notification, platform_profile};
