//! Visibility enforcement
//!
//! The overlay must stay on screen for the life of the process. Every attempt
//! to close, minimize or hide it is answered with actions that bring it back,
//! unless the close guard was opened by the quit sequence.

use std::time::{Duration, Instant};

/// Permits exactly one legitimate close: the quit sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseGuard {
    permitted: bool,
}

impl CloseGuard {
    pub fn permit(&mut self) {
        self.permitted = true;
    }

    pub fn is_permitted(&self) -> bool {
        self.permitted
    }
}

/// Where the window stands from the guard's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowVisibility {
    Visible,
    Hidden,
    /// Quit sequence in progress. Nothing is re-shown from here on.
    Closing,
}

/// What the toolkit reported about the window this frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowObservation {
    pub close_requested: bool,
    pub minimized: bool,
    pub hidden: bool,
    pub focused: Option<bool>,
}

/// A command for the toolkit adapter to carry out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAction {
    CancelClose,
    Show,
    Restore,
    Raise,
    Focus,
}

const RESHOW: [WindowAction; 4] = [
    WindowAction::Show,
    WindowAction::Restore,
    WindowAction::Raise,
    WindowAction::Focus,
];

/// State machine that vetoes every path to Hidden except the quit sequence
#[derive(Debug, Clone)]
pub struct VisibilityGuard {
    state: WindowVisibility,
    was_focused: Option<bool>,
    enforce_on_focus_loss: bool,
}

impl VisibilityGuard {
    pub fn new(enforce_on_focus_loss: bool) -> Self {
        Self {
            state: WindowVisibility::Visible,
            was_focused: None,
            enforce_on_focus_loss,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> WindowVisibility {
        self.state
    }

    /// React to a window event. Returns the actions that restore visibility.
    pub fn observe(&mut self, obs: WindowObservation, guard: CloseGuard) -> Vec<WindowAction> {
        if self.state == WindowVisibility::Closing {
            return Vec::new();
        }

        let mut actions = Vec::new();

        if obs.close_requested {
            if guard.is_permitted() {
                self.state = WindowVisibility::Closing;
                return actions;
            }
            tracing::debug!("close request vetoed");
            actions.push(WindowAction::CancelClose);
            actions.push(WindowAction::Show);
            actions.push(WindowAction::Raise);
        }

        if obs.minimized || obs.hidden {
            tracing::debug!(minimized = obs.minimized, hidden = obs.hidden, "window hidden, re-showing");
            self.state = WindowVisibility::Hidden;
            push_unique(&mut actions, &RESHOW);
        } else {
            self.state = WindowVisibility::Visible;
        }

        let lost_focus = self.was_focused == Some(true) && obs.focused == Some(false);
        if lost_focus && self.enforce_on_focus_loss {
            tracing::debug!("focus lost, re-asserting topmost");
            push_unique(&mut actions, &[WindowAction::Raise]);
        }
        if obs.focused.is_some() {
            self.was_focused = obs.focused;
        }

        actions
    }

    /// Periodic check. Re-asserts Visible if the window is observed Hidden.
    pub fn tick(&mut self, obs: WindowObservation) -> Vec<WindowAction> {
        match self.state {
            WindowVisibility::Closing => Vec::new(),
            _ if obs.minimized || obs.hidden || self.state == WindowVisibility::Hidden => {
                // Hidden until the toolkit reports otherwise
                self.state = WindowVisibility::Hidden;
                RESHOW.to_vec()
            }
            _ => Vec::new(),
        }
    }

    /// Enter the terminal state. Called only by the quit sequence.
    pub fn begin_closing(&mut self) {
        self.state = WindowVisibility::Closing;
    }
}

fn push_unique(actions: &mut Vec<WindowAction>, extra: &[WindowAction]) {
    for action in extra {
        if !actions.contains(action) {
            actions.push(*action);
        }
    }
}

/// Fixed-interval timer driven by the UI loop
#[derive(Debug, Clone)]
pub struct VisibilityTimer {
    interval: Duration,
    last_tick: Instant,
    active: bool,
}

impl VisibilityTimer {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_tick: now,
            active: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns true once per elapsed interval
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.active || now.saturating_duration_since(self.last_tick) < self.interval {
            return false;
        }
        self.last_tick = now;
        true
    }

    /// Time until the next tick is due
    pub fn remaining(&self, now: Instant) -> Duration {
        self.interval
            .saturating_sub(now.saturating_duration_since(self.last_tick))
    }

    pub fn stop(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn focused(focused: bool) -> WindowObservation {
        WindowObservation {
            focused: Some(focused),
            ..Default::default()
        }
    }

    #[test]
    fn test_close_vetoed_without_guard() {
        let mut vis = VisibilityGuard::new(true);
        let actions = vis.observe(
            WindowObservation {
                close_requested: true,
                ..Default::default()
            },
            CloseGuard::default(),
        );
        assert_eq!(actions[0], WindowAction::CancelClose);
        assert!(actions.contains(&WindowAction::Show));
        assert_eq!(vis.state(), WindowVisibility::Visible);
    }

    #[test]
    fn test_close_allowed_with_guard() {
        let mut vis = VisibilityGuard::new(true);
        let mut guard = CloseGuard::default();
        guard.permit();
        let actions = vis.observe(
            WindowObservation {
                close_requested: true,
                ..Default::default()
            },
            guard,
        );
        assert!(actions.is_empty());
        assert_eq!(vis.state(), WindowVisibility::Closing);
    }

    #[test]
    fn test_minimize_is_restored() {
        let mut vis = VisibilityGuard::new(true);
        let actions = vis.observe(
            WindowObservation {
                minimized: true,
                ..Default::default()
            },
            CloseGuard::default(),
        );
        assert_eq!(actions, RESHOW.to_vec());
        assert_eq!(vis.state(), WindowVisibility::Hidden);

        // Toolkit reports it restored
        let actions = vis.observe(WindowObservation::default(), CloseGuard::default());
        assert!(actions.is_empty());
        assert_eq!(vis.state(), WindowVisibility::Visible);
    }

    #[test]
    fn test_timer_reasserts_hidden_window() {
        let mut vis = VisibilityGuard::new(true);
        let hidden = WindowObservation {
            hidden: true,
            ..Default::default()
        };
        let actions = vis.tick(hidden);
        assert_eq!(actions, RESHOW.to_vec());

        // Stays Hidden until the toolkit reports a visible window
        assert_eq!(vis.tick(WindowObservation::default()), RESHOW.to_vec());
        vis.observe(WindowObservation::default(), CloseGuard::default());
        assert!(vis.tick(WindowObservation::default()).is_empty());
    }

    #[test]
    fn test_focus_loss_raises() {
        let mut vis = VisibilityGuard::new(true);
        assert!(vis.observe(focused(true), CloseGuard::default()).is_empty());
        assert_eq!(
            vis.observe(focused(false), CloseGuard::default()),
            vec![WindowAction::Raise]
        );
        // Only on the transition
        assert!(vis.observe(focused(false), CloseGuard::default()).is_empty());
    }

    #[test]
    fn test_focus_loss_ignored_when_disabled() {
        let mut vis = VisibilityGuard::new(false);
        vis.observe(focused(true), CloseGuard::default());
        assert!(vis.observe(focused(false), CloseGuard::default()).is_empty());
    }

    #[test]
    fn test_closing_is_terminal() {
        let mut vis = VisibilityGuard::new(true);
        vis.begin_closing();
        let hidden = WindowObservation {
            minimized: true,
            close_requested: true,
            ..Default::default()
        };
        assert!(vis.observe(hidden, CloseGuard::default()).is_empty());
        assert!(vis.tick(hidden).is_empty());
        assert_eq!(vis.state(), WindowVisibility::Closing);
    }

    #[test]
    fn test_any_hide_attempt_visible_within_one_interval() {
        let interval = Duration::from_millis(500);
        let start = Instant::now();
        let attempts = [
            WindowObservation { close_requested: true, ..Default::default() },
            WindowObservation { minimized: true, ..Default::default() },
            WindowObservation { hidden: true, ..Default::default() },
            WindowObservation { focused: Some(false), ..Default::default() },
        ];

        for attempt in attempts {
            let mut vis = VisibilityGuard::new(true);
            let mut timer = VisibilityTimer::new(interval, start);
            vis.observe(focused(true), CloseGuard::default());

            let mut actions = vis.observe(attempt, CloseGuard::default());
            let now = start + interval;
            if timer.poll(now) {
                actions.extend(vis.tick(attempt));
            }

            let hidden = attempt.minimized || attempt.hidden;
            if hidden {
                assert!(actions.contains(&WindowAction::Show));
                assert!(actions.contains(&WindowAction::Restore));
            }
            if attempt.close_requested {
                assert!(actions.contains(&WindowAction::CancelClose));
            }
            assert!(actions.contains(&WindowAction::Raise));
            assert_ne!(vis.state(), WindowVisibility::Closing);
        }
    }

    #[test]
    fn test_timer_interval() {
        let start = Instant::now();
        let mut timer = VisibilityTimer::new(Duration::from_millis(500), start);

        assert!(!timer.poll(start + Duration::from_millis(499)));
        assert!(timer.poll(start + Duration::from_millis(500)));
        assert!(!timer.poll(start + Duration::from_millis(600)));
        assert!(timer.poll(start + Duration::from_millis(1000)));
        assert_eq!(
            timer.remaining(start + Duration::from_millis(1200)),
            Duration::from_millis(300)
        );
    }

    #[test]
    fn test_stopped_timer_never_fires() {
        let start = Instant::now();
        let mut timer = VisibilityTimer::new(Duration::from_millis(500), start);
        timer.stop();
        assert!(!timer.is_active());
        assert!(!timer.poll(start + Duration::from_secs(10)));
    }
}
