//! Message types posted into the UI loop from other threads

use crossbeam_channel::{Receiver, Sender, unbounded};

/// Where a quit request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitSource {
    /// Key event delivered to the focused overlay window
    LocalKey,
    /// OS-level listener thread
    GlobalListener,
}

/// Work for the UI loop. Only the UI thread touches window state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiMessage {
    /// Run the quit sequence
    Quit(QuitSource),
}

/// Sending half of the UI queue, plus a handle to wake the loop
#[derive(Clone)]
pub struct UiPost {
    sender: Sender<UiMessage>,
    waker: Option<egui::Context>,
}

impl UiPost {
    pub fn new(sender: Sender<UiMessage>, waker: Option<egui::Context>) -> Self {
        Self { sender, waker }
    }

    /// Queue a message and wake the UI loop. Fire-and-forget: returns false
    /// if the UI side is already gone.
    pub fn post(&self, message: UiMessage) -> bool {
        let delivered = self.sender.send(message).is_ok();
        if let Some(ctx) = &self.waker {
            ctx.request_repaint();
        }
        delivered
    }
}

/// Create the UI queue. The receiver stays on the UI thread.
pub fn ui_channel(waker: Option<egui::Context>) -> (UiPost, Receiver<UiMessage>) {
    let (sender, receiver) = unbounded();
    (UiPost::new(sender, waker), receiver)
}
