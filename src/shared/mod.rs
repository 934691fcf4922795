//! Cross-thread messaging into the UI loop
//!
//! Background threads never touch window state. They post a `UiMessage`
//! and the UI loop handles it on its next frame.

pub mod messages;

pub use messages::{ui_channel, QuitSource, UiMessage, UiPost};
