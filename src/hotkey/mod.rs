//! Quit hotkey parsing and detection
//!
//! A chord is a set of modifiers plus one letter or digit, written like
//! "Ctrl+Q". The same chord is matched against egui key events (window has
//! focus), raw OS key events (`tracker`), and OS-registered hotkeys
//! (`listener`).

pub mod listener;
pub mod tracker;

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use thiserror::Error;

pub use listener::GlobalListener;
pub use tracker::QuitDetector;

/// Errors from parsing a chord string
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HotkeyError {
    #[error("empty hotkey string")]
    Empty,
    #[error("no key in hotkey string '{0}'")]
    NoKey(String),
    #[error("more than one key in hotkey string '{0}'")]
    MultipleKeys(String),
    #[error("unknown key: {0}")]
    UnknownKey(String),
}

/// Modifiers a chord requires. Extra held modifiers do not prevent a match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChordModifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    /// Windows key on Windows/Linux, Command on macOS
    pub super_key: bool,
}

impl ChordModifiers {
    /// True when every modifier this chord needs is present in `held`
    pub fn satisfied_by(&self, held: ChordModifiers) -> bool {
        (!self.ctrl || held.ctrl)
            && (!self.shift || held.shift)
            && (!self.alt || held.alt)
            && (!self.super_key || held.super_key)
    }

    pub fn is_empty(&self) -> bool {
        *self == ChordModifiers::default()
    }
}

/// One quit shortcut, e.g. Ctrl+Q
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuitChord {
    pub modifiers: ChordModifiers,
    /// Uppercase ASCII letter or digit
    pub key: char,
}

impl QuitChord {
    /// Does an egui key event from the focused window match this chord
    pub fn matches_egui(&self, key: egui::Key, modifiers: egui::Modifiers) -> bool {
        let held = ChordModifiers {
            ctrl: modifiers.ctrl,
            shift: modifiers.shift,
            alt: modifiers.alt,
            super_key: modifiers.mac_cmd,
        };
        egui_key(self.key) == Some(key) && self.modifiers.satisfied_by(held)
    }

    /// Equivalent OS-registered hotkey
    pub fn to_hotkey(&self) -> Result<HotKey, HotkeyError> {
        let mut mods = Modifiers::empty();
        if self.modifiers.ctrl {
            mods |= Modifiers::CONTROL;
        }
        if self.modifiers.shift {
            mods |= Modifiers::SHIFT;
        }
        if self.modifiers.alt {
            mods |= Modifiers::ALT;
        }
        if self.modifiers.super_key {
            mods |= Modifiers::SUPER;
        }
        let code = key_code(self.key).ok_or_else(|| HotkeyError::UnknownKey(self.key.to_string()))?;
        Ok(HotKey::new(Some(mods), code))
    }
}

impl std::fmt::Display for QuitChord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let m = self.modifiers;
        for (held, name) in [(m.ctrl, "Ctrl"), (m.shift, "Shift"), (m.alt, "Alt"), (m.super_key, "Super")] {
            if held {
                write!(f, "{name}+")?;
            }
        }
        write!(f, "{}", self.key)
    }
}

/// Parses a chord string like "Ctrl+Q", "Cmd+Q", "Ctrl+Shift+X"
pub fn parse_chord(chord_str: &str) -> Result<QuitChord, HotkeyError> {
    if chord_str.trim().is_empty() {
        return Err(HotkeyError::Empty);
    }

    let mut modifiers = ChordModifiers::default();
    let mut key: Option<char> = None;

    for part in chord_str.split('+').map(|s| s.trim()) {
        let upper = part.to_uppercase();
        match upper.as_str() {
            "CTRL" | "CONTROL" => modifiers.ctrl = true,
            "SHIFT" => modifiers.shift = true,
            "ALT" | "OPTION" => modifiers.alt = true,
            "WIN" | "SUPER" | "META" | "CMD" | "COMMAND" => modifiers.super_key = true,
            _ => {
                if key.is_some() {
                    return Err(HotkeyError::MultipleKeys(chord_str.to_string()));
                }
                key = Some(parse_key(&upper)?);
            }
        }
    }

    let key = key.ok_or_else(|| HotkeyError::NoKey(chord_str.to_string()))?;
    Ok(QuitChord { modifiers, key })
}

/// Parse every configured chord, failing on the first bad one
pub fn parse_chords<S: AsRef<str>>(chords: &[S]) -> Result<Vec<QuitChord>, HotkeyError> {
    chords.iter().map(|c| parse_chord(c.as_ref())).collect()
}

fn parse_key(key: &str) -> Result<char, HotkeyError> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphanumeric() => Ok(c.to_ascii_uppercase()),
        _ => Err(HotkeyError::UnknownKey(key.to_string())),
    }
}

fn egui_key(key: char) -> Option<egui::Key> {
    egui::Key::from_name(key.encode_utf8(&mut [0; 4]))
}

/// Map a chord key onto the registered-hotkey key code
fn key_code(key: char) -> Option<Code> {
    let code = match key {
        'A' => Code::KeyA,
        'B' => Code::KeyB,
        'C' => Code::KeyC,
        'D' => Code::KeyD,
        'E' => Code::KeyE,
        'F' => Code::KeyF,
        'G' => Code::KeyG,
        'H' => Code::KeyH,
        'I' => Code::KeyI,
        'J' => Code::KeyJ,
        'K' => Code::KeyK,
        'L' => Code::KeyL,
        'M' => Code::KeyM,
        'N' => Code::KeyN,
        'O' => Code::KeyO,
        'P' => Code::KeyP,
        'Q' => Code::KeyQ,
        'R' => Code::KeyR,
        'S' => Code::KeyS,
        'T' => Code::KeyT,
        'U' => Code::KeyU,
        'V' => Code::KeyV,
        'W' => Code::KeyW,
        'X' => Code::KeyX,
        'Y' => Code::KeyY,
        'Z' => Code::KeyZ,
        '0' => Code::Digit0,
        '1' => Code::Digit1,
        '2' => Code::Digit2,
        '3' => Code::Digit3,
        '4' => Code::Digit4,
        '5' => Code::Digit5,
        '6' => Code::Digit6,
        '7' => Code::Digit7,
        '8' => Code::Digit8,
        '9' => Code::Digit9,
        _ => return None,
    };
    Some(code)
}
