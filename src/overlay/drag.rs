//! Drag-to-move tracking
//!
//! Positions are screen coordinates in logical points. The offset between the
//! pointer and the window origin is captured on press and preserved while
//! dragging. The window is not clamped to the screen.

use egui::{Pos2, Vec2};
use thiserror::Error;

/// Why a drag event could not be turned into a window position
#[derive(Debug, Error, PartialEq)]
pub enum DragError {
    #[error("drag event without a preceding press")]
    NotPressed,
    #[error("non-finite coordinate in drag input: {0:?}")]
    NonFinite(Pos2),
}

/// Tracks an in-progress drag gesture
#[derive(Debug, Clone, Default)]
pub struct DragTracker {
    offset: Option<Vec2>,
}

impl DragTracker {
    /// Primary button went down. Records pointer offset from the window origin.
    pub fn press(&mut self, pointer: Pos2, window_origin: Pos2) -> Result<(), DragError> {
        check_finite(pointer)?;
        check_finite(window_origin)?;
        self.offset = Some(pointer - window_origin);
        Ok(())
    }

    /// Pointer moved with the primary button held. Returns the new window origin.
    pub fn drag(&self, pointer: Pos2) -> Result<Pos2, DragError> {
        let offset = self.offset.ok_or(DragError::NotPressed)?;
        check_finite(pointer)?;
        let origin = pointer - offset;
        check_finite(origin)?;
        Ok(origin)
    }

    pub fn release(&mut self) {
        self.offset = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.offset.is_some()
    }
}

fn check_finite(pos: Pos2) -> Result<(), DragError> {
    if pos.x.is_finite() && pos.y.is_finite() {
        Ok(())
    } else {
        Err(DragError::NonFinite(pos))
    }
}
