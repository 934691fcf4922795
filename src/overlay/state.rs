//! Run state toggled by the Start/Stop buttons

use egui::Color32;

use crate::config::ColorSettings;

/// Whether the bot is running. Only drives the overlay color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    Running,
    #[default]
    Stopped,
}

impl RunState {
    /// Console line announcing this state
    pub fn announcement(self) -> &'static str {
        match self {
            RunState::Running => "Bot started",
            RunState::Stopped => "Bot stopped",
        }
    }
}

/// Colors painted behind the buttons for each run state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunPalette {
    pub running: Color32,
    pub stopped: Color32,
}

impl RunPalette {
    pub fn color_for(&self, state: RunState) -> Color32 {
        match state {
            RunState::Running => self.running,
            RunState::Stopped => self.stopped,
        }
    }
}

impl Default for RunPalette {
    fn default() -> Self {
        Self::from(&ColorSettings::default())
    }
}

impl From<&ColorSettings> for RunPalette {
    fn from(colors: &ColorSettings) -> Self {
        let [r, g, b] = colors.running;
        let running = Color32::from_rgb(r, g, b);
        let [r, g, b] = colors.stopped;
        let stopped = Color32::from_rgb(r, g, b);
        Self { running, stopped }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_stopped() {
        assert_eq!(RunState::default(), RunState::Stopped);
        assert_eq!(RunState::default().announcement(), "Bot stopped");
    }

    #[test]
    fn test_announcements() {
        assert_eq!(RunState::Running.announcement(), "Bot started");
        assert_eq!(RunState::Stopped.announcement(), "Bot stopped");
    }

    #[test]
    fn test_palette_from_settings() {
        let palette = RunPalette::default();
        assert_eq!(palette.color_for(RunState::Running), Color32::from_rgb(0, 128, 0));
        assert_eq!(palette.color_for(RunState::Stopped), Color32::from_rgb(255, 0, 0));
    }
}
