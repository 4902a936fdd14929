#![forbid(unsafe_code)]

//! Transient on-screen message (for example `80x24` after a resize).
//!
//! The messenger is a pure state machine that returns [`OverlayCommand`]s for
//! the host to execute: display/remove the overlay node and schedule/cancel
//! the single dismiss timer. At most one message and one live timer exist at
//! any time; a timer that fires after being superseded is ignored.

use core::time::Duration;

/// Handle of a host-scheduled dismiss timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Currently displayed overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayMessage {
    pub text: String,
    /// Zero means the message stays until replaced or cleared.
    pub timeout: Duration,
}

/// Host command emitted by the messenger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayCommand {
    /// Attach the overlay node (if detached) and set its text.
    Display { text: String },
    /// Detach the overlay node.
    Remove,
    ScheduleDismiss { timer: TimerId, after: Duration },
    CancelDismiss { timer: TimerId },
}

#[derive(Debug, Clone, Default)]
pub struct OverlayMessenger {
    message: Option<OverlayMessage>,
    pending: Option<TimerId>,
    next_timer: u64,
}

impl OverlayMessenger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn message(&self) -> Option<&OverlayMessage> {
        self.message.as_ref()
    }

    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.message.is_some()
    }

    #[must_use]
    pub const fn pending_timer(&self) -> Option<TimerId> {
        self.pending
    }

    /// Replace any current message with `text`.
    pub fn show(&mut self, text: &str, timeout: Duration) -> Vec<OverlayCommand> {
        let mut commands = Vec::with_capacity(3);
        if let Some(timer) = self.pending.take() {
            commands.push(OverlayCommand::CancelDismiss { timer });
        }
        self.message = Some(OverlayMessage {
            text: text.to_owned(),
            timeout,
        });
        commands.push(OverlayCommand::Display {
            text: text.to_owned(),
        });
        if !timeout.is_zero() {
            self.next_timer = self.next_timer.wrapping_add(1);
            let timer = TimerId(self.next_timer);
            self.pending = Some(timer);
            commands.push(OverlayCommand::ScheduleDismiss {
                timer,
                after: timeout,
            });
        }
        commands
    }

    /// Remove the message now, cancelling any pending dismiss.
    ///
    /// Clearing when nothing is shown yields no commands.
    pub fn clear(&mut self) -> Vec<OverlayCommand> {
        let mut commands = Vec::with_capacity(2);
        if let Some(timer) = self.pending.take() {
            commands.push(OverlayCommand::CancelDismiss { timer });
        }
        if self.message.take().is_some() {
            commands.push(OverlayCommand::Remove);
        }
        commands
    }

    /// A host timer fired. Stale timers are ignored.
    pub fn timer_fired(&mut self, timer: TimerId) -> Vec<OverlayCommand> {
        if self.pending != Some(timer) {
            return Vec::new();
        }
        self.pending = None;
        self.message = None;
        vec![OverlayCommand::Remove]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TWO_SECONDS: Duration = Duration::from_millis(2000);

    #[test]
    fn show_with_timeout_schedules_one_dismiss() {
        let mut overlay = OverlayMessenger::new();
        let commands = overlay.show("80x24", TWO_SECONDS);
        assert_eq!(
            commands,
            vec![
                OverlayCommand::Display {
                    text: "80x24".into()
                },
                OverlayCommand::ScheduleDismiss {
                    timer: TimerId::new(1),
                    after: TWO_SECONDS
                },
            ]
        );
        assert!(overlay.is_visible());
    }

    #[test]
    fn second_show_cancels_first_timer() {
        let mut overlay = OverlayMessenger::new();
        overlay.show("80x24", TWO_SECONDS);
        let commands = overlay.show("80x24", TWO_SECONDS);
        assert_eq!(
            commands[0],
            OverlayCommand::CancelDismiss {
                timer: TimerId::new(1)
            }
        );
        assert_eq!(overlay.pending_timer(), Some(TimerId::new(2)));
        assert_eq!(overlay.message().map(|m| m.text.as_str()), Some("80x24"));
    }

    #[test]
    fn zero_timeout_is_persistent() {
        let mut overlay = OverlayMessenger::new();
        let commands = overlay.show("Connection Closed", Duration::ZERO);
        assert_eq!(commands.len(), 1);
        assert_eq!(overlay.pending_timer(), None);
        assert!(overlay.is_visible());
    }

    #[test]
    fn stale_timer_is_ignored() {
        let mut overlay = OverlayMessenger::new();
        overlay.show("a", TWO_SECONDS);
        overlay.show("b", TWO_SECONDS);
        assert!(overlay.timer_fired(TimerId::new(1)).is_empty());
        assert!(overlay.is_visible());
        assert_eq!(
            overlay.timer_fired(TimerId::new(2)),
            vec![OverlayCommand::Remove]
        );
        assert!(!overlay.is_visible());
    }

    #[test]
    fn double_clear_is_noop() {
        let mut overlay = OverlayMessenger::new();
        overlay.show("x", TWO_SECONDS);
        assert_eq!(
            overlay.clear(),
            vec![
                OverlayCommand::CancelDismiss {
                    timer: TimerId::new(1)
                },
                OverlayCommand::Remove
            ]
        );
        assert!(overlay.clear().is_empty());
        assert!(overlay.timer_fired(TimerId::new(1)).is_empty());
    }
}
