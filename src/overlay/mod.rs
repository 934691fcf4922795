//! Overlay Window Controller
//!
//! Owns everything the overlay window knows about itself: run state, close
//! guard, window position, drag gesture and visibility policy. The eframe
//! adapter in `app` feeds toolkit events in and applies the returned actions.

pub mod drag;
pub mod state;
pub mod visibility;
pub mod widgets;

use egui::{pos2, Color32, Pos2, Vec2};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::overlay::drag::{DragError, DragTracker};
use crate::overlay::state::{RunPalette, RunState};
use crate::overlay::visibility::{
    CloseGuard, VisibilityGuard, VisibilityTimer, WindowAction, WindowObservation,
};

/// Shortest visibility check period. A zero period would spin the UI loop.
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// Overlay geometry and policy, derived from the app config
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub title: String,
    pub size: Vec2,
    /// Offset of the window's left edge from the right edge of the screen
    pub right_margin: f32,
    pub top_offset: f32,
    pub fallback_position: Pos2,
    pub check_interval: Duration,
    pub enforce_on_focus_loss: bool,
    pub palette: RunPalette,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for OverlayConfig {
    fn from(config: &AppConfig) -> Self {
        let window = &config.window;
        let mut check_interval = Duration::from_millis(config.visibility.check_interval_ms);
        if check_interval < MIN_CHECK_INTERVAL {
            warn!(
                configured_ms = config.visibility.check_interval_ms,
                "visibility check interval raised to {:?}", MIN_CHECK_INTERVAL
            );
            check_interval = MIN_CHECK_INTERVAL;
        }
        Self {
            title: window.title.clone(),
            size: Vec2::new(window.width, window.height),
            right_margin: window.right_margin,
            top_offset: window.top_offset,
            fallback_position: pos2(window.fallback_position.0, window.fallback_position.1),
            check_interval,
            enforce_on_focus_loss: config.visibility.enforce_on_focus_loss,
            palette: RunPalette::from(&config.colors),
        }
    }
}

/// Top-right corner placement on a monitor of the given size
pub fn corner_position(monitor_size: Vec2, right_margin: f32, top_offset: f32) -> Pos2 {
    pos2(monitor_size.x - right_margin, top_offset)
}

/// The overlay's state holder and command surface
pub struct OverlayController {
    config: OverlayConfig,
    run_state: RunState,
    color: Color32,
    position: Pos2,
    placed: bool,
    drag: DragTracker,
    close_guard: CloseGuard,
    visibility: VisibilityGuard,
    timer: VisibilityTimer,
}

impl OverlayController {
    /// Create the controller in the Stopped state with the timer running
    pub fn new(config: OverlayConfig, now: Instant) -> Self {
        let run_state = RunState::Stopped;
        Self {
            color: config.palette.color_for(run_state),
            position: config.fallback_position,
            placed: false,
            drag: DragTracker::default(),
            close_guard: CloseGuard::default(),
            visibility: VisibilityGuard::new(config.enforce_on_focus_loss),
            timer: VisibilityTimer::new(config.check_interval, now),
            run_state,
            config,
        }
    }

    #[cfg(test)]
    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    #[cfg(test)]
    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Background color matching the run state
    pub fn color(&self) -> Color32 {
        self.color
    }

    pub fn position(&self) -> Pos2 {
        self.position
    }

    #[cfg(test)]
    pub fn close_guard(&self) -> CloseGuard {
        self.close_guard
    }

    #[cfg(test)]
    pub fn visibility(&self) -> visibility::WindowVisibility {
        self.visibility.state()
    }

    #[cfg(test)]
    pub fn timer_active(&self) -> bool {
        self.timer.is_active()
    }

    /// Start the bot. Idempotent.
    pub fn start(&mut self) {
        self.set_run_state(RunState::Running);
    }

    /// Stop the bot. Idempotent.
    pub fn stop(&mut self) {
        self.set_run_state(RunState::Stopped);
    }

    fn set_run_state(&mut self, run_state: RunState) {
        self.run_state = run_state;
        self.color = self.config.palette.color_for(run_state);
        println!("{}", run_state.announcement());
        info!(state = ?run_state, "run state changed");
    }

    /// Place the window in the top-right corner once the monitor size is known.
    /// Returns the position to move to, only on the first call.
    pub fn place_on_monitor(&mut self, monitor_size: Vec2) -> Option<Pos2> {
        if self.placed {
            return None;
        }
        self.placed = true;
        self.position = corner_position(monitor_size, self.config.right_margin, self.config.top_offset);
        debug!(position = ?self.position, "placed overlay");
        Some(self.position)
    }

    /// Keep the tracked position in sync with what the toolkit reports
    pub fn sync_position(&mut self, origin: Pos2) {
        if !self.drag.is_dragging() {
            self.position = origin;
        }
    }

    /// Primary button pressed on the window background
    pub fn drag_press(&mut self, pointer: Pos2) -> Result<(), DragError> {
        self.drag.press(pointer, self.position)
    }

    /// Pointer dragged with the primary button held. Returns the new origin.
    pub fn drag_move(&mut self, pointer: Pos2) -> Result<Pos2, DragError> {
        let origin = self.drag.drag(pointer)?;
        self.position = origin;
        Ok(origin)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn drag_release(&mut self) {
        self.drag.release();
    }

    /// React to a window event reported by the toolkit
    pub fn observe_window(&mut self, obs: WindowObservation) -> Vec<WindowAction> {
        self.visibility.observe(obs, self.close_guard)
    }

    /// Run the periodic visibility check if it is due
    pub fn poll_timer(&mut self, now: Instant, obs: WindowObservation) -> Vec<WindowAction> {
        if self.timer.poll(now) {
            self.visibility.tick(obs)
        } else {
            Vec::new()
        }
    }

    /// Delay until the next visibility check, if the timer is still running
    pub fn next_tick_in(&self, now: Instant) -> Option<Duration> {
        self.timer.is_active().then(|| self.timer.remaining(now))
    }

    /// Quit step: stop the periodic timer
    pub fn stop_timer(&mut self) {
        self.timer.stop();
    }

    /// Quit step: open the close guard for the single authorized close
    pub fn permit_close(&mut self) {
        if self.close_guard.is_permitted() {
            warn!("close guard already open");
        }
        self.close_guard.permit();
        self.visibility.begin_closing();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::visibility::WindowVisibility;
    use egui::vec2;

    fn controller() -> OverlayController {
        OverlayController::new(OverlayConfig::default(), Instant::now())
    }

    #[test]
    fn test_initial_state() {
        let c = controller();
        assert_eq!(c.run_state(), RunState::Stopped);
        assert_eq!(c.color(), Color32::from_rgb(255, 0, 0));
        assert!(!c.close_guard().is_permitted());
        assert!(c.timer_active());
        assert_eq!(c.visibility(), WindowVisibility::Visible);
    }

    #[test]
    fn test_start_stop_idempotent() {
        let mut c = controller();
        c.start();
        c.start();
        assert_eq!(c.run_state(), RunState::Running);
        c.stop();
        c.stop();
        assert_eq!(c.run_state(), RunState::Stopped);
    }

    #[test]
    fn test_color_consistent_for_any_sequence() {
        let mut c = controller();
        let palette = c.config().palette;
        // Walk every start/stop sequence up to length 6
        for len in 0..=6u32 {
            for bits in 0..(1u32 << len) {
                for i in 0..len {
                    if bits & (1 << i) != 0 {
                        c.start();
                    } else {
                        c.stop();
                    }
                    let expect = if c.run_state() == RunState::Running {
                        palette.running
                    } else {
                        palette.stopped
                    };
                    assert_eq!(c.color(), expect);
                }
            }
        }
    }

    #[test]
    fn test_corner_placement() {
        let mut c = controller();
        let pos = c.place_on_monitor(vec2(1920.0, 1080.0));
        assert_eq!(pos, Some(pos2(1700.0, 50.0)));
        assert_eq!(c.position(), pos2(1700.0, 50.0));
        // Only once
        assert_eq!(c.place_on_monitor(vec2(800.0, 600.0)), None);
    }

    #[test]
    fn test_drag_through_controller() {
        let mut c = controller();
        c.place_on_monitor(vec2(1920.0, 1080.0));
        c.drag_press(pos2(1750.0, 80.0)).unwrap();
        let origin = c.drag_move(pos2(1650.0, 380.0)).unwrap();
        assert_eq!(origin, pos2(1600.0, 350.0));
        assert_eq!(c.position(), origin);

        // Toolkit reports are ignored mid-drag
        c.sync_position(pos2(0.0, 0.0));
        assert_eq!(c.position(), origin);
        c.drag_release();
        c.sync_position(pos2(1.0, 2.0));
        assert_eq!(c.position(), pos2(1.0, 2.0));
    }

    #[test]
    fn test_close_vetoed_until_permitted() {
        let mut c = controller();
        let close = WindowObservation {
            close_requested: true,
            ..Default::default()
        };
        assert!(c.observe_window(close).contains(&WindowAction::CancelClose));

        c.stop_timer();
        c.permit_close();
        assert!(c.observe_window(close).is_empty());
        assert_eq!(c.visibility(), WindowVisibility::Closing);
        assert_eq!(c.next_tick_in(Instant::now()), None);
    }

    #[test]
    fn test_timer_reshows_minimized_window() {
        let start = Instant::now();
        let mut c = OverlayController::new(OverlayConfig::default(), start);
        let minimized = WindowObservation {
            minimized: true,
            ..Default::default()
        };
        assert!(c.poll_timer(start, minimized).is_empty());
        let actions = c.poll_timer(start + Duration::from_millis(500), minimized);
        assert!(actions.contains(&WindowAction::Show));
        assert!(actions.contains(&WindowAction::Restore));
    }

    #[test]
    fn test_zero_check_interval_is_floored() {
        let mut config = AppConfig::default();
        config.visibility.check_interval_ms = 0;
        let overlay = OverlayConfig::from(&config);
        assert_eq!(overlay.check_interval, MIN_CHECK_INTERVAL);

        let start = Instant::now();
        let mut c = OverlayController::new(overlay, start);
        assert_eq!(c.next_tick_in(start), Some(MIN_CHECK_INTERVAL));
        // Not due again within the same instant
        assert!(c.poll_timer(start, WindowObservation::default()).is_empty());

        config.visibility.check_interval_ms = 750;
        assert_eq!(OverlayConfig::from(&config).check_interval, Duration::from_millis(750));
    }
}
