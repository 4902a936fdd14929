#![forbid(unsafe_code)]

//! Input reconciliation engine.
//!
//! Browsers report a single keystroke through several overlapping channels
//! (surface `onData`, `beforeinput`, `textInput`, `input`, composition
//! events), and which of them fire depends on the platform. This module
//! merges them into exactly one UTF-8 byte sequence per logical input.
//!
//! Two mechanisms cooperate:
//! - an authority table, [`authority`], a pure function of
//!   `(profile, state, channel)` deciding whether a channel may emit at all;
//! - a claim: the last emitted unit remembers its text and origin, and the
//!   first echo of that text from each *other* channel is swallowed. When
//!   the host supplies event timestamps, a claim only absorbs echoes that
//!   arrive within [`DEFAULT_ECHO_WINDOW`] (or the configured window) of
//!   the emission.
//!
//! The engine never reorders input; it only suppresses.

use core::time::Duration;

use bitflags::bitflags;
use tracing::{debug, trace, warn};

use crate::input::{InputChannel, InputEvent};
use crate::platform::PlatformProfile;

/// Echoes of one keystroke are dispatched within the same event-loop turn.
pub const DEFAULT_ECHO_WINDOW: Duration = Duration::from_millis(25);

/// Composition state of the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReconcileState {
    #[default]
    Idle,
    Composing,
}

/// What a channel is allowed to do in a given `(profile, state)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Authority {
    /// Emit the payload as-is.
    Emit,
    /// Emit only when the payload starts with a control character.
    EmitControlOnly,
    /// Emit unless the event's own `isComposing` flag is set.
    EmitUnlessEventComposing,
    /// Emit the part of the composition not yet forwarded.
    EmitSuffix,
    /// Emit the complete composed text.
    EmitComposed,
    /// Transition only; never emits.
    StateOnly,
    Deny(SuppressReason),
}

/// Why a dispatch produced no bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuppressReason {
    EmptyPayload,
    /// Another channel is authoritative while composing.
    ComposingNonAuthoritative,
    /// Non-iOS platforms wait for `compositionend`.
    DeferredUntilCompositionEnd,
    /// The native event itself reported `isComposing`.
    EventComposing,
    /// The composition update added nothing new.
    NothingNew,
    /// The composition rewrote already-forwarded text.
    CompositionRevision,
    /// Echo of a unit already emitted by the given channel.
    ClaimedBy(InputChannel),
    /// State transition without a payload.
    StateOnly,
}

/// Outcome category for one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconcileOutcome {
    Emitted,
    Suppressed(SuppressReason),
}

/// Structured record of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileLogEntry {
    pub sequence: u64,
    pub channel: InputChannel,
    pub state_before: ReconcileState,
    pub state_after: ReconcileState,
    pub outcome: ReconcileOutcome,
    pub bytes_len: usize,
}

/// Result of reconciling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileDispatch {
    /// Encoded bytes for the outbound sink, if this event won.
    pub bytes: Option<Vec<u8>>,
    /// The host must cancel the browser's default insertion.
    pub prevent_default: bool,
    pub log: ReconcileLogEntry,
}

impl ReconcileDispatch {
    #[must_use]
    pub const fn emitted(&self) -> bool {
        self.bytes.is_some()
    }
}

bitflags! {
    /// Set of channels, used to track which channels already echoed a claim.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChannelSet: u16 {
        const KEYBOARD = 1 << 0;
        const BEFORE_INPUT = 1 << 1;
        const TEXT_INPUT = 1 << 2;
        const NATIVE_INPUT = 1 << 3;
        const COMPOSITION = 1 << 4;
    }
}

impl ChannelSet {
    #[must_use]
    pub const fn of(channel: InputChannel) -> Self {
        match channel {
            InputChannel::Keyboard => Self::KEYBOARD,
            InputChannel::BeforeInput => Self::BEFORE_INPUT,
            InputChannel::TextInput => Self::TEXT_INPUT,
            InputChannel::NativeInput => Self::NATIVE_INPUT,
            InputChannel::CompositionStart
            | InputChannel::CompositionUpdate
            | InputChannel::CompositionEnd
            | InputChannel::CompositionCancel => Self::COMPOSITION,
            InputChannel::Focus => Self::empty(),
        }
    }
}

/// The last emitted unit and the channels that already echoed it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Claim {
    text: Box<str>,
    origin: ChannelSet,
    origin_channel: InputChannel,
    echoed: ChannelSet,
    /// Host timestamp of the emission, if the host provides one.
    at: Option<Duration>,
}

impl Claim {
    fn new(text: &str, origin: InputChannel, at: Option<Duration>) -> Self {
        Self {
            text: text.into(),
            origin: ChannelSet::of(origin),
            origin_channel: origin,
            echoed: ChannelSet::empty(),
            at,
        }
    }

    /// Consume one echo of this claim from `channel`, if it is one.
    ///
    /// An event later than `window` after the emission is a new keystroke,
    /// never an echo. Untimed events are treated as one burst.
    fn absorb(
        &mut self,
        channel: InputChannel,
        text: &str,
        now: Option<Duration>,
        window: Duration,
    ) -> bool {
        if let (Some(at), Some(now)) = (self.at, now)
            && now.saturating_sub(at) > window
        {
            return false;
        }
        let bit = ChannelSet::of(channel);
        if bit == self.origin || self.echoed.contains(bit) || &*self.text != text {
            return false;
        }
        self.echoed.insert(bit);
        true
    }
}

/// Per-composition bookkeeping for incremental (iOS) forwarding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CompositionTracker {
    /// Baseline the next update is diffed against.
    forwarded: String,
}

impl CompositionTracker {
    fn reset(&mut self) {
        self.forwarded.clear();
    }
}

/// Authority table: may `channel` emit in `state` on `profile`?
///
/// While composing, only the composition channel designated for the
/// profile may emit (updates on iOS-like platforms, the end event
/// elsewhere).
#[must_use]
pub const fn authority(
    profile: PlatformProfile,
    state: ReconcileState,
    channel: InputChannel,
) -> Authority {
    let composing = matches!(state, ReconcileState::Composing);
    match channel {
        InputChannel::CompositionStart
        | InputChannel::CompositionCancel
        | InputChannel::Focus => Authority::StateOnly,
        InputChannel::CompositionUpdate => {
            if profile.ios_like {
                Authority::EmitSuffix
            } else {
                Authority::Deny(SuppressReason::DeferredUntilCompositionEnd)
            }
        }
        InputChannel::CompositionEnd => {
            if profile.ios_like {
                Authority::EmitSuffix
            } else {
                Authority::EmitComposed
            }
        }
        InputChannel::Keyboard => {
            if composing {
                Authority::EmitControlOnly
            } else {
                Authority::Emit
            }
        }
        InputChannel::BeforeInput | InputChannel::TextInput => {
            if composing {
                Authority::Deny(SuppressReason::ComposingNonAuthoritative)
            } else {
                Authority::Emit
            }
        }
        InputChannel::NativeInput => {
            if composing {
                Authority::Deny(SuppressReason::ComposingNonAuthoritative)
            } else if profile.touch_primary {
                Authority::Emit
            } else {
                Authority::EmitUnlessEventComposing
            }
        }
    }
}

fn starts_with_control(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_control)
}

/// Merges overlapping DOM input channels into one ordered byte stream.
#[derive(Debug, Clone)]
pub struct ReconcileEngine {
    profile: PlatformProfile,
    state: ReconcileState,
    composition: CompositionTracker,
    claim: Option<Claim>,
    echo_window: Duration,
    /// Timestamp of the event being dispatched.
    now: Option<Duration>,
    next_sequence: u64,
}

impl ReconcileEngine {
    #[must_use]
    pub fn new(profile: PlatformProfile) -> Self {
        Self {
            profile,
            state: ReconcileState::Idle,
            composition: CompositionTracker::default(),
            claim: None,
            echo_window: DEFAULT_ECHO_WINDOW,
            now: None,
            next_sequence: 1,
        }
    }

    #[must_use]
    pub fn with_echo_window(mut self, window: Duration) -> Self {
        self.echo_window = window;
        self
    }

    #[must_use]
    pub const fn echo_window(&self) -> Duration {
        self.echo_window
    }

    #[must_use]
    pub const fn profile(&self) -> PlatformProfile {
        self.profile
    }

    #[must_use]
    pub const fn state(&self) -> ReconcileState {
        self.state
    }

    #[must_use]
    pub const fn is_composing(&self) -> bool {
        matches!(self.state, ReconcileState::Composing)
    }

    /// Drop composition progress and any pending claim.
    pub fn reset(&mut self) {
        self.state = ReconcileState::Idle;
        self.composition.reset();
        self.claim = None;
    }

    /// Reconcile one raw event without a timestamp.
    ///
    /// Claims made by untimed events never expire by age; they are only
    /// replaced by the next emission.
    pub fn dispatch(&mut self, event: &InputEvent) -> ReconcileDispatch {
        self.dispatch_with_time(event, None)
    }

    /// Reconcile one raw event stamped with the host's event time
    /// (`Event.timeStamp`, or `performance.now()` for surface keystrokes).
    pub fn dispatch_at(&mut self, event: &InputEvent, at: Duration) -> ReconcileDispatch {
        self.dispatch_with_time(event, Some(at))
    }

    fn dispatch_with_time(
        &mut self,
        event: &InputEvent,
        at: Option<Duration>,
    ) -> ReconcileDispatch {
        self.now = at;
        let state_before = self.state;
        let channel = event.channel();
        let text = event.text();

        let result = match authority(self.profile, state_before, channel) {
            Authority::StateOnly => {
                self.apply_state_only(event);
                Err(SuppressReason::StateOnly)
            }
            Authority::Deny(reason) => {
                if channel == InputChannel::CompositionUpdate {
                    self.enter_composition();
                }
                Err(reason)
            }
            Authority::EmitSuffix => self.emit_suffix(channel, text),
            Authority::EmitComposed => {
                self.finish_composition();
                if text.is_empty() {
                    Err(SuppressReason::EmptyPayload)
                } else {
                    Ok(self.claim_and_encode(text, channel))
                }
            }
            Authority::EmitControlOnly if !text.is_empty() && !starts_with_control(text) => {
                Err(SuppressReason::ComposingNonAuthoritative)
            }
            Authority::EmitUnlessEventComposing if event.composing() => {
                Err(SuppressReason::EventComposing)
            }
            Authority::Emit | Authority::EmitControlOnly | Authority::EmitUnlessEventComposing => {
                self.emit_deduplicated(channel, text)
            }
        };

        let (bytes, outcome) = match result {
            Ok(bytes) => (Some(bytes), ReconcileOutcome::Emitted),
            Err(reason) => (None, ReconcileOutcome::Suppressed(reason)),
        };
        // Cancel the browser's insertion only when the text reached (or had
        // already reached) the remote; a denied event keeps its native edit.
        let prevent_default = self.profile.ios_like
            && channel.is_virtual_keyboard()
            && matches!(
                outcome,
                ReconcileOutcome::Emitted
                    | ReconcileOutcome::Suppressed(SuppressReason::ClaimedBy(_))
            );
        let log = ReconcileLogEntry {
            sequence: self.next_sequence,
            channel,
            state_before,
            state_after: self.state,
            outcome,
            bytes_len: bytes.as_ref().map_or(0, Vec::len),
        };
        self.next_sequence = self.next_sequence.saturating_add(1);

        match outcome {
            ReconcileOutcome::Emitted => trace!(
                sequence = log.sequence,
                channel = channel.label(),
                bytes_len = log.bytes_len,
                "input emitted"
            ),
            ReconcileOutcome::Suppressed(reason) => debug!(
                sequence = log.sequence,
                channel = channel.label(),
                ?reason,
                composing = self.is_composing(),
                "input suppressed"
            ),
        }

        ReconcileDispatch {
            bytes,
            prevent_default,
            log,
        }
    }

    fn apply_state_only(&mut self, event: &InputEvent) {
        match event {
            InputEvent::CompositionStart => {
                self.state = ReconcileState::Composing;
                self.composition.reset();
            }
            InputEvent::CompositionCancel => self.finish_composition(),
            // Focus loss may swallow compositionend; never stay stuck composing.
            InputEvent::Focus { focused: false } => self.reset(),
            _ => {}
        }
    }

    fn enter_composition(&mut self) {
        if self.state == ReconcileState::Idle {
            self.state = ReconcileState::Composing;
            self.composition.reset();
        }
    }

    fn finish_composition(&mut self) {
        self.state = ReconcileState::Idle;
        self.composition.reset();
    }

    /// Incremental forwarding for iOS-like platforms.
    ///
    /// Updates extend the composition one (or a few) characters at a time;
    /// only what was appended since the last forwarded update goes out. The
    /// end event flushes whatever the updates did not cover.
    fn emit_suffix(&mut self, channel: InputChannel, text: &str) -> Result<Vec<u8>, SuppressReason> {
        let ending = channel == InputChannel::CompositionEnd;
        if !ending {
            self.enter_composition();
        }
        let baseline = std::mem::take(&mut self.composition.forwarded);
        if ending {
            self.finish_composition();
        }

        if text.is_empty() {
            if !ending {
                self.composition.forwarded = baseline;
            }
            return Err(SuppressReason::EmptyPayload);
        }

        if ending {
            // Claim the whole word so a trailing echo of it is absorbed.
            self.claim = Some(Claim::new(text, channel, self.now));
        }

        let Some(suffix) = text.strip_prefix(baseline.as_str()) else {
            warn!(
                channel = channel.label(),
                forwarded_len = baseline.len(),
                revised_len = text.len(),
                "composition revised already-forwarded text; revision not sent"
            );
            if !ending {
                self.composition.forwarded = text.to_owned();
            }
            return Err(SuppressReason::CompositionRevision);
        };

        if !ending {
            self.composition.forwarded = text.to_owned();
        }
        if suffix.is_empty() {
            return Err(SuppressReason::NothingNew);
        }
        if !ending {
            self.claim = Some(Claim::new(suffix, channel, self.now));
        }
        Ok(suffix.as_bytes().to_vec())
    }

    fn emit_deduplicated(
        &mut self,
        channel: InputChannel,
        text: &str,
    ) -> Result<Vec<u8>, SuppressReason> {
        if text.is_empty() {
            return Err(SuppressReason::EmptyPayload);
        }
        if let Some(claim) = self.claim.as_mut()
            && claim.absorb(channel, text, self.now, self.echo_window)
        {
            return Err(SuppressReason::ClaimedBy(claim.origin_channel));
        }
        Ok(self.claim_and_encode(text, channel))
    }

    fn claim_and_encode(&mut self, text: &str, channel: InputChannel) -> Vec<u8> {
        self.claim = Some(Claim::new(text, channel, self.now));
        text.as_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn run(engine: &mut ReconcileEngine, events: &[InputEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|ev| engine.dispatch(ev).bytes)
            .map(|bytes| String::from_utf8(bytes).expect("engine emits utf-8"))
            .collect()
    }

    #[test]
    fn desktop_key_emits_once() {
        let mut engine = ReconcileEngine::new(PlatformProfile::DESKTOP);
        let out = run(
            &mut engine,
            &[InputEvent::key("a"), InputEvent::native("a", false)],
        );
        assert_eq!(out, vec!["a".to_string()]);
    }

    #[test]
    fn native_before_keyboard_still_emits_once() {
        let mut engine = ReconcileEngine::new(PlatformProfile::DESKTOP);
        let out = run(
            &mut engine,
            &[InputEvent::native("a", false), InputEvent::key("a")],
        );
        assert_eq!(out, vec!["a".to_string()]);
    }

    #[test]
    fn repeated_key_on_same_channel_is_not_deduplicated() {
        let mut engine = ReconcileEngine::new(PlatformProfile::DESKTOP);
        let out = run(
            &mut engine,
            &[
                InputEvent::key("l"),
                InputEvent::native("l", false),
                InputEvent::key("l"),
                InputEvent::native("l", false),
            ],
        );
        assert_eq!(out, vec!["l".to_string(), "l".to_string()]);
    }

    #[test]
    fn ios_virtual_keyboard_emits_each_char_and_prevents_default() {
        let mut engine = ReconcileEngine::new(PlatformProfile::IOS);
        let h = engine.dispatch(&InputEvent::before_input("h"));
        assert_eq!(h.bytes.as_deref(), Some(&b"h"[..]));
        assert!(h.prevent_default);
        let echo = engine.dispatch(&InputEvent::native("h", false));
        assert_eq!(echo.bytes, None);
        assert_eq!(
            echo.log.outcome,
            ReconcileOutcome::Suppressed(SuppressReason::ClaimedBy(InputChannel::BeforeInput))
        );
        let i = engine.dispatch(&InputEvent::before_input("i"));
        assert_eq!(i.bytes.as_deref(), Some(&b"i"[..]));
    }

    #[test]
    fn ios_denied_virtual_keyboard_text_keeps_native_edit() {
        let mut engine = ReconcileEngine::new(PlatformProfile::IOS);
        engine.dispatch(&InputEvent::CompositionStart);
        for ev in [InputEvent::before_input("x"), InputEvent::text_input("x")] {
            let d = engine.dispatch(&ev);
            assert_eq!(d.bytes, None);
            assert_eq!(
                d.log.outcome,
                ReconcileOutcome::Suppressed(SuppressReason::ComposingNonAuthoritative)
            );
            assert!(!d.prevent_default, "{ev:?}");
        }
    }

    #[test]
    fn ios_absorbed_echo_still_prevents_default() {
        let mut engine = ReconcileEngine::new(PlatformProfile::IOS);
        assert!(engine.dispatch(&InputEvent::before_input("q")).prevent_default);
        let echo = engine.dispatch(&InputEvent::text_input("q"));
        assert_eq!(echo.bytes, None);
        assert!(echo.prevent_default);
    }

    #[test]
    fn claim_expires_after_echo_window() {
        let mut engine = ReconcileEngine::new(PlatformProfile::ANDROID);
        let at = |ms| Duration::from_millis(ms);

        let soft = engine.dispatch_at(&InputEvent::before_input("a"), at(1_000));
        assert!(soft.emitted());
        let echo = engine.dispatch_at(&InputEvent::key("a"), at(1_003));
        assert_eq!(
            echo.log.outcome,
            ReconcileOutcome::Suppressed(SuppressReason::ClaimedBy(InputChannel::BeforeInput))
        );

        // Same character from a hardware keyboard, well after the burst.
        assert!(engine.dispatch_at(&InputEvent::before_input("a"), at(2_000)).emitted());
        let hard = engine.dispatch_at(&InputEvent::key("a"), at(2_000) + engine.echo_window() * 8);
        assert_eq!(hard.bytes.as_deref(), Some(&b"a"[..]));
        assert_eq!(hard.log.outcome, ReconcileOutcome::Emitted);
    }

    #[test]
    fn echo_window_is_configurable() {
        let mut engine =
            ReconcileEngine::new(PlatformProfile::DESKTOP).with_echo_window(Duration::ZERO);
        engine.dispatch_at(&InputEvent::key("z"), Duration::from_millis(5));
        assert_eq!(
            engine
                .dispatch_at(&InputEvent::native("z", false), Duration::from_millis(5))
                .bytes,
            None
        );
        engine.dispatch_at(&InputEvent::key("z"), Duration::from_millis(9));
        assert!(
            engine
                .dispatch_at(&InputEvent::native("z", false), Duration::from_millis(10))
                .emitted()
        );
    }

    #[test]
    fn android_does_not_prevent_default() {
        let mut engine = ReconcileEngine::new(PlatformProfile::ANDROID);
        let d = engine.dispatch(&InputEvent::before_input("h"));
        assert!(d.emitted());
        assert!(!d.prevent_default);
    }

    #[test]
    fn keyboard_echo_of_virtual_keyboard_claim_is_dropped() {
        let mut engine = ReconcileEngine::new(PlatformProfile::ANDROID);
        let out = run(
            &mut engine,
            &[
                InputEvent::before_input("x"),
                InputEvent::text_input("x"),
                InputEvent::key("x"),
                InputEvent::key("\r"),
            ],
        );
        assert_eq!(out, vec!["x".to_string(), "\r".to_string()]);
    }

    #[test]
    fn ios_composition_forwards_incrementally() {
        let mut engine = ReconcileEngine::new(PlatformProfile::IOS);
        let out = run(
            &mut engine,
            &[
                InputEvent::CompositionStart,
                InputEvent::composition_update("h"),
                InputEvent::native("h", true),
                InputEvent::composition_update("he"),
                InputEvent::composition_update("hey"),
                InputEvent::composition_end("hey"),
                InputEvent::native("hey", false),
            ],
        );
        assert_eq!(out, vec!["h", "e", "y"]);
        assert_eq!(engine.state(), ReconcileState::Idle);
    }

    #[test]
    fn ios_end_flushes_unforwarded_suffix() {
        let mut engine = ReconcileEngine::new(PlatformProfile::IOS);
        let out = run(
            &mut engine,
            &[
                InputEvent::composition_update("ni"),
                InputEvent::composition_end("nihao"),
            ],
        );
        assert_eq!(out, vec!["ni", "hao"]);
    }

    #[test]
    fn ios_revision_is_not_forwarded() {
        let mut engine = ReconcileEngine::new(PlatformProfile::IOS);
        run(&mut engine, &[InputEvent::composition_update("teh")]);
        let d = engine.dispatch(&InputEvent::composition_update("the"));
        assert_eq!(
            d.log.outcome,
            ReconcileOutcome::Suppressed(SuppressReason::CompositionRevision)
        );
        let tail = engine.dispatch(&InputEvent::composition_update("the "));
        assert_eq!(tail.bytes.as_deref(), Some(&b" "[..]));
    }

    #[test]
    fn non_ios_composition_waits_for_end() {
        let mut engine = ReconcileEngine::new(PlatformProfile::ANDROID);
        let start = engine.dispatch(&InputEvent::composition_update("ko"));
        assert_eq!(start.bytes, None);
        assert_eq!(start.log.state_after, ReconcileState::Composing);
        assert_eq!(
            engine.dispatch(&InputEvent::native("ko", true)).log.outcome,
            ReconcileOutcome::Suppressed(SuppressReason::ComposingNonAuthoritative)
        );
        let end = engine.dispatch(&InputEvent::composition_end("kor"));
        assert_eq!(end.bytes.as_deref(), Some(&b"kor"[..]));
        assert_eq!(end.log.state_after, ReconcileState::Idle);
        assert_eq!(engine.dispatch(&InputEvent::native("kor", false)).bytes, None);
    }

    #[test]
    fn desktop_native_input_respects_event_composing_flag() {
        let mut engine = ReconcileEngine::new(PlatformProfile::DESKTOP);
        assert_eq!(
            engine.dispatch(&InputEvent::native("か", true)).log.outcome,
            ReconcileOutcome::Suppressed(SuppressReason::EventComposing)
        );
        let mut touch = ReconcileEngine::new(PlatformProfile::ANDROID);
        assert!(touch.dispatch(&InputEvent::native("か", true)).emitted());
    }

    #[test]
    fn control_keys_pass_during_composition() {
        let mut engine = ReconcileEngine::new(PlatformProfile::DESKTOP);
        engine.dispatch(&InputEvent::CompositionStart);
        assert_eq!(engine.dispatch(&InputEvent::key("a")).bytes, None);
        let enter = engine.dispatch(&InputEvent::key("\r"));
        assert_eq!(enter.bytes.as_deref(), Some(&b"\r"[..]));
        assert!(engine.is_composing());
    }

    #[test]
    fn empty_payloads_are_dropped() {
        let mut engine = ReconcileEngine::new(PlatformProfile::IOS);
        for ev in [
            InputEvent::key(""),
            InputEvent::before_input(""),
            InputEvent::native("", false),
            InputEvent::composition_end(""),
        ] {
            let d = engine.dispatch(&ev);
            assert_eq!(d.bytes, None);
            assert!(!d.prevent_default);
            assert_eq!(
                d.log.outcome,
                ReconcileOutcome::Suppressed(SuppressReason::EmptyPayload)
            );
        }
    }

    #[test]
    fn focus_loss_and_cancel_leave_composition() {
        let mut engine = ReconcileEngine::new(PlatformProfile::DESKTOP);
        engine.dispatch(&InputEvent::CompositionStart);
        engine.dispatch(&InputEvent::Focus { focused: false });
        assert_eq!(engine.state(), ReconcileState::Idle);

        engine.dispatch(&InputEvent::composition_update("x"));
        assert!(engine.is_composing());
        engine.dispatch(&InputEvent::CompositionCancel);
        assert_eq!(engine.state(), ReconcileState::Idle);
        assert!(engine.dispatch(&InputEvent::key("x")).emitted());
    }

    #[test]
    fn sequence_numbers_increase() {
        let mut engine = ReconcileEngine::new(PlatformProfile::DESKTOP);
        let a = engine.dispatch(&InputEvent::key("a"));
        let b = engine.dispatch(&InputEvent::key(""));
        assert_eq!(a.log.sequence + 1, b.log.sequence);
    }

    #[test]
    fn authority_table_only_lets_designated_channel_emit_while_composing() {
        let channels = [
            InputChannel::Keyboard,
            InputChannel::BeforeInput,
            InputChannel::TextInput,
            InputChannel::NativeInput,
            InputChannel::CompositionUpdate,
            InputChannel::CompositionEnd,
        ];
        for profile in [
            PlatformProfile::DESKTOP,
            PlatformProfile::ANDROID,
            PlatformProfile::IOS,
        ] {
            for channel in channels {
                let auth = authority(profile, ReconcileState::Composing, channel);
                let may_emit_text = matches!(
                    auth,
                    Authority::Emit
                        | Authority::EmitSuffix
                        | Authority::EmitComposed
                        | Authority::EmitUnlessEventComposing
                );
                let designated = match channel {
                    InputChannel::CompositionUpdate => profile.ios_like,
                    InputChannel::CompositionEnd => true,
                    _ => false,
                };
                assert_eq!(
                    may_emit_text, designated,
                    "{profile:?} {channel:?} -> {auth:?}"
                );
            }
        }
    }

    fn word() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop::sample::select(vec!['a', 'b', 'é', '字', '🦀', ' ']),
            1..12,
        )
        .prop_map(|chars| chars.into_iter().collect())
    }

    proptest! {
        #[test]
        fn ios_updates_concatenate_to_final_text(text in word(), native_echo in any::<bool>()) {
            let mut engine = ReconcileEngine::new(PlatformProfile::IOS);
            let mut out = String::new();
            let mut prefix = String::new();
            for ch in text.chars() {
                prefix.push(ch);
                if let Some(bytes) = engine.dispatch(&InputEvent::composition_update(&prefix)).bytes {
                    out.push_str(std::str::from_utf8(&bytes).expect("utf-8"));
                }
                if native_echo {
                    prop_assert_eq!(engine.dispatch(&InputEvent::native(&prefix, true)).bytes, None);
                }
            }
            if let Some(bytes) = engine.dispatch(&InputEvent::composition_end(&text)).bytes {
                out.push_str(std::str::from_utf8(&bytes).expect("utf-8"));
            }
            prop_assert_eq!(out, text);
        }

        #[test]
        fn non_ios_emits_nothing_until_end(text in word(), profile_touch in any::<bool>()) {
            let profile = if profile_touch { PlatformProfile::ANDROID } else { PlatformProfile::DESKTOP };
            let mut engine = ReconcileEngine::new(profile);
            let mut prefix = String::new();
            for ch in text.chars() {
                prefix.push(ch);
                prop_assert_eq!(engine.dispatch(&InputEvent::composition_update(&prefix)).bytes, None);
                prop_assert_eq!(engine.dispatch(&InputEvent::native(&prefix, true)).bytes, None);
            }
            let end = engine.dispatch(&InputEvent::composition_end(&text));
            prop_assert_eq!(end.bytes, Some(text.as_bytes().to_vec()));
            prop_assert_eq!(engine.dispatch(&InputEvent::key(&text)).bytes, None);
        }

        #[test]
        fn desktop_keystroke_pairs_emit_once_each(
            keys in prop::collection::vec((word(), any::<bool>(), any::<bool>()), 1..40)
        ) {
            let mut engine = ReconcileEngine::new(PlatformProfile::DESKTOP);
            let mut emitted = Vec::new();
            for (text, native_first, native_fires) in &keys {
                let mut events = vec![InputEvent::key(text)];
                if *native_fires {
                    let native = InputEvent::native(text, false);
                    if *native_first { events.insert(0, native); } else { events.push(native); }
                }
                let mut count = 0;
                for ev in &events {
                    if let Some(bytes) = engine.dispatch(ev).bytes {
                        count += 1;
                        emitted.push(bytes);
                    }
                }
                prop_assert_eq!(count, 1);
            }
            prop_assert_eq!(emitted.len(), keys.len());
        }
    }
}
