//! Global quit listener
//!
//! Runs outside the overlay's input focus and posts `UiMessage::Quit` to the
//! UI loop when a quit chord is seen. Two backends:
//! - `Raw`: `rdev::listen` on a background thread, feeding a `QuitDetector`.
//!   Keys are observed, not consumed.
//! - `Registered`: hotkeys registered with the OS through `global-hotkey`;
//!   a forwarder thread relays its events.
//!
//! Neither thread is joined. `stop` detaches the listener by dropping its
//! `UiPost`, after which OS events are ignored.

use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState, hotkey::HotKey};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::HotkeyBackend;
use crate::hotkey::{HotkeyError, QuitChord, QuitDetector};
use crate::shared::{QuitSource, UiMessage, UiPost};

/// Errors starting the global listener
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("no quit chords configured")]
    NoChords,
    #[error(transparent)]
    Hotkey(#[from] HotkeyError),
    #[error("hotkey manager unavailable: {0}")]
    Manager(String),
    #[error("failed to register {chord}: {reason}")]
    Register { chord: QuitChord, reason: String },
    #[error("failed to spawn listener thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Shared slot the listener thread posts through. Empty once detached.
type PostSlot = Arc<Mutex<Option<UiPost>>>;

fn forward_quit(slot: &PostSlot) {
    match slot.lock().as_ref() {
        Some(post) => {
            debug!("global quit chord detected");
            post.post(UiMessage::Quit(QuitSource::GlobalListener));
        }
        None => debug!("quit chord after listener detached, ignored"),
    }
}

/// Hotkeys registered with the OS, unregistered on stop or drop
struct Registered {
    manager: GlobalHotKeyManager,
    hotkeys: Vec<HotKey>,
}

impl Registered {
    fn unregister(&mut self) {
        for hotkey in self.hotkeys.drain(..) {
            if let Err(e) = self.manager.unregister(hotkey) {
                warn!("Failed to unregister hotkey: {:?}", e);
            }
        }
    }
}

/// Background listener for the quit chords
pub struct GlobalListener {
    backend: HotkeyBackend,
    slot: PostSlot,
    registered: Option<Registered>,
}

impl GlobalListener {
    /// Start listening. Must be called on the UI thread for the `Registered`
    /// backend, which needs the platform event loop.
    pub fn spawn(
        backend: HotkeyBackend,
        chords: &[QuitChord],
        post: UiPost,
    ) -> Result<Self, ListenerError> {
        if chords.is_empty() {
            return Err(ListenerError::NoChords);
        }
        for chord in chords.iter().filter(|c| c.modifiers.is_empty()) {
            warn!("Quit chord {} has no modifier and will fire on a bare key press", chord);
        }

        let slot: PostSlot = Arc::new(Mutex::new(Some(post)));
        let registered = match backend {
            HotkeyBackend::Raw => {
                spawn_raw(chords.to_vec(), slot.clone())?;
                None
            }
            HotkeyBackend::Registered => Some(spawn_registered(chords, slot.clone())?),
        };

        info!(
            "Global quit listener started ({:?}): {}",
            backend,
            chords.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        );

        Ok(Self {
            backend,
            slot,
            registered,
        })
    }

    pub fn backend(&self) -> HotkeyBackend {
        self.backend
    }

    pub fn is_attached(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Detach from the UI loop and release registered hotkeys. Idempotent.
    pub fn stop(&mut self) {
        if self.slot.lock().take().is_some() {
            info!("Global quit listener detached");
        }
        if let Some(mut registered) = self.registered.take() {
            registered.unregister();
        }
    }
}

impl Drop for GlobalListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_raw(chords: Vec<QuitChord>, slot: PostSlot) -> Result<(), ListenerError> {
    thread::Builder::new()
        .name("quit-listener".into())
        .spawn(move || {
            let mut detector = QuitDetector::new(chords);
            let result = rdev::listen(move |event| {
                if detector.on_event(&event) {
                    forward_quit(&slot);
                }
            });
            if let Err(e) = result {
                warn!("Raw keyboard listener stopped: {:?}", e);
            }
        })?;
    Ok(())
}

fn spawn_registered(chords: &[QuitChord], slot: PostSlot) -> Result<Registered, ListenerError> {
    let manager = GlobalHotKeyManager::new().map_err(|e| ListenerError::Manager(format!("{e:?}")))?;

    let mut registered = Registered {
        manager,
        hotkeys: Vec::new(),
    };
    for chord in chords {
        let hotkey = chord.to_hotkey()?;
        if let Err(e) = registered.manager.register(hotkey) {
            registered.unregister();
            return Err(ListenerError::Register {
                chord: *chord,
                reason: format!("{e:?}"),
            });
        }
        registered.hotkeys.push(hotkey);
    }

    let ids: Vec<u32> = registered.hotkeys.iter().map(|h| h.id()).collect();
    thread::Builder::new()
        .name("quit-hotkey-forwarder".into())
        .spawn(move || {
            let receiver = GlobalHotKeyEvent::receiver();
            while let Ok(event) = receiver.recv() {
                if event.state == HotKeyState::Pressed && ids.contains(&event.id) {
                    forward_quit(&slot);
                }
                if slot.lock().is_none() {
                    break;
                }
            }
        })?;

    Ok(registered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ui_channel;

    #[test]
    fn test_forward_quit_posts_while_attached() {
        let (post, receiver) = ui_channel(None);
        let slot: PostSlot = Arc::new(Mutex::new(Some(post)));

        forward_quit(&slot);
        assert_eq!(
            receiver.try_recv().unwrap(),
            UiMessage::Quit(QuitSource::GlobalListener)
        );

        slot.lock().take();
        forward_quit(&slot);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_spawn_requires_chords() {
        let (post, _receiver) = ui_channel(None);
        let result = GlobalListener::spawn(HotkeyBackend::Raw, &[], post);
        assert!(matches!(result, Err(ListenerError::NoChords)));
    }
}
