//! Event Translator
//!
//! Drains the window-server message queue and converts each message into zero
//! or more [`NormalizedEvent`]s: symbolic key events with modifier sets, mouse
//! button edges against tracked button state, translated motion, resize
//! forwarding, focus changes, and session teardown. Unknown traffic is logged
//! and dropped, never fatal.

use anyhow::Result;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decorations::{DecorEvent, Decorator};
use crate::server::{raw_key, raw_mod, KeyAction, ServerLink, ServerMessage};
use crate::surface::{ResizeNegotiation, WindowSurface};

bitflags! {
    /// Normalized modifier set; left and right variants stay distinguishable
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Modifiers: u8 {
        const LCTRL  = 0x01;
        const LSHIFT = 0x02;
        const LALT   = 0x04;
        const LSUPER = 0x08;
        const RCTRL  = 0x10;
        const RSHIFT = 0x20;
        const RALT   = 0x40;
        const RSUPER = 0x80;
    }
}

impl Modifiers {
    /// Map the raw server modifier bitmask; each physical modifier maps to a
    /// distinct bit, independently OR'd together.
    pub fn from_raw(raw: u32) -> Self {
        let mut mods = Modifiers::empty();
        if raw & raw_mod::LEFT_CTRL != 0 {
            mods |= Modifiers::LCTRL;
        }
        if raw & raw_mod::LEFT_SHIFT != 0 {
            mods |= Modifiers::LSHIFT;
        }
        if raw & raw_mod::LEFT_ALT != 0 {
            mods |= Modifiers::LALT;
        }
        if raw & raw_mod::LEFT_SUPER != 0 {
            mods |= Modifiers::LSUPER;
        }
        if raw & raw_mod::RIGHT_CTRL != 0 {
            mods |= Modifiers::RCTRL;
        }
        if raw & raw_mod::RIGHT_SHIFT != 0 {
            mods |= Modifiers::RSHIFT;
        }
        if raw & raw_mod::RIGHT_ALT != 0 {
            mods |= Modifiers::RALT;
        }
        if raw & raw_mod::RIGHT_SUPER != 0 {
            mods |= Modifiers::RSUPER;
        }
        mods
    }
}

/// Symbolic key identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Return,
    Space,
    Escape,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
    LeftCtrl,
    LeftShift,
    /// ASCII-range alphanumeric or punctuation, in the symbolic alphabet
    Ascii(u8),
}

/// Pressed/released edge shared by keys and mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Canonical input-event model emitted to the host's event sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizedEvent {
    Key {
        key: Key,
        state: KeyState,
        modifiers: Modifiers,
    },
    MouseButton {
        button: u8,
        state: KeyState,
        x: i32,
        y: i32,
    },
    MouseMotion {
        x: i32,
        y: i32,
    },
    Resize {
        width: u32,
        height: u32,
    },
    FocusChange {
        focused: bool,
    },
    Quit,
}

/// Receives normalized events from the translator
pub trait EventSink {
    fn push(&mut self, event: NormalizedEvent);
}

impl EventSink for Vec<NormalizedEvent> {
    fn push(&mut self, event: NormalizedEvent) {
        Vec::push(self, event);
    }
}

/// Per-transport mapping from raw button bit index to normalized button
/// number. Protocol-version-specific; not unified across transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonRemap {
    /// Plain 1-based: bit index i becomes button i+1
    Native,
    /// Middle/right swapped: 0 -> 1, 1 -> 3, 2 -> 2
    #[default]
    Swapped,
}

impl ButtonRemap {
    pub fn apply(self, bit: u8) -> u8 {
        match self {
            ButtonRemap::Native => bit + 1,
            ButtonRemap::Swapped => match bit {
                0 => 1,
                1 => 3,
                2 => 2,
                _ => 0,
            },
        }
    }
}

/// Last-known mouse button bitmask (3 buttons). Persists for the session,
/// never reset; press/release edges are computed between successive snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    pub buttons: u8,
}

const BUTTON_MASK: u8 = 0x07;

/// The symbolic alphabet base coincides with ASCII `a`
const SYM_BASE: u8 = b'a';

/// Map a raw keycode to its symbolic key. Returns `None` for codes the
/// translator does not recognize.
pub fn map_key(keycode: u32) -> Option<Key> {
    match keycode {
        c if c == u32::from(b'\n') => Some(Key::Return),
        c if c == u32::from(b' ') => Some(Key::Space),
        c if c == u32::from(b'\t') => Some(Key::Tab),
        raw_key::ESCAPE => Some(Key::Escape),
        raw_key::BACKSPACE => Some(Key::Backspace),
        raw_key::ARROW_UP => Some(Key::Up),
        raw_key::ARROW_DOWN => Some(Key::Down),
        raw_key::ARROW_LEFT => Some(Key::Left),
        raw_key::ARROW_RIGHT => Some(Key::Right),
        raw_key::LEFT_CTRL => Some(Key::LeftCtrl),
        raw_key::LEFT_SHIFT => Some(Key::LeftShift),
        c if is_symbolic_ascii(c) => {
            // Fixed base-offset transform from 'a' into the symbolic alphabet
            let byte = (c as u8).wrapping_sub(b'a').wrapping_add(SYM_BASE);
            Some(Key::Ascii(byte))
        }
        _ => None,
    }
}

/// The ASCII-range alphanumerics and punctuation the translator forwards
fn is_symbolic_ascii(code: u32) -> bool {
    let Ok(b) = u8::try_from(code) else {
        return false;
    };
    matches!(b,
        b'0'..=b'9'
        | b'a'..=b'z'
        | b':'..=b'@'
        | b'['..=b'`'
        | b'!'..=b'$'
        | b'&'..=b'('
        | b'*'
        | b'+'
        | b'-'..=b'/')
}

/// Converts inbound window-server messages into normalized input events
pub struct EventTranslator {
    input: InputState,
    remap: ButtonRemap,
}

impl EventTranslator {
    pub fn new(remap: ButtonRemap) -> Self {
        Self {
            input: InputState::default(),
            remap,
        }
    }

    pub fn input_state(&self) -> InputState {
        self.input
    }

    /// Drain all currently queued messages (non-blocking) and emit normalized
    /// events to `sink`. Messages are processed strictly in delivery order;
    /// returns once the queue is empty.
    pub fn pump_events(
        &mut self,
        link: &mut ServerLink,
        surface: &mut Option<WindowSurface>,
        decorator: &dyn Decorator,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        while let Some(msg) = link.poll()? {
            match msg {
                ServerMessage::Key(key) => self.translate_key(key, sink),
                ServerMessage::Mouse {
                    window: _,
                    x,
                    y,
                    buttons,
                } => {
                    self.translate_mouse(surface.as_mut(), decorator, x, y, buttons, sink);
                }
                ServerMessage::ResizeOffer {
                    window,
                    width,
                    height,
                } => {
                    if let Some(s) = surface.as_mut() {
                        if s.id != window {
                            continue;
                        }
                        match s.negotiation {
                            // A locally requested resize consumes its offer in
                            // the blocking wait, not here.
                            ResizeNegotiation::Requested => {}
                            _ => {
                                s.negotiation = ResizeNegotiation::Accepted;
                                sink.push(NormalizedEvent::Resize {
                                    width: width.saturating_sub(s.insets.extra_width),
                                    height: height.saturating_sub(s.insets.extra_height),
                                });
                            }
                        }
                    }
                }
                ServerMessage::FocusChange { window, focused } => {
                    if let Some(s) = surface.as_mut() {
                        if s.id == window {
                            s.focused = focused;
                            s.border_dirty = true;
                            sink.push(NormalizedEvent::FocusChange { focused });
                        }
                    }
                }
                ServerMessage::SessionEnd => {
                    debug!("Window server session ending");
                    sink.push(NormalizedEvent::Quit);
                }
                ServerMessage::WindowMoved { .. } => {}
                ServerMessage::Unknown(kind) => {
                    warn!("Unhandled message from window server: type=0x{:x}", kind);
                }
            }
        }
        Ok(())
    }

    fn translate_key(&mut self, key: crate::server::KeyMessage, sink: &mut dyn EventSink) {
        // Zero keycode: modifier-only or released-without-code
        if key.keycode == 0 {
            return;
        }
        let state = match key.action {
            KeyAction::Down => KeyState::Pressed,
            KeyAction::Up => KeyState::Released,
        };
        match map_key(key.keycode) {
            Some(sym) => sink.push(NormalizedEvent::Key {
                key: sym,
                state,
                modifiers: Modifiers::from_raw(key.modifiers),
            }),
            None => debug!("Dropping unrecognized keycode {}", key.keycode),
        }
    }

    fn translate_mouse(
        &mut self,
        surface: Option<&mut WindowSurface>,
        decorator: &dyn Decorator,
        x: i32,
        y: i32,
        buttons: u8,
        sink: &mut dyn EventSink,
    ) {
        let (left, top) = match &surface {
            Some(s) => {
                if s.bordered {
                    let hit = decorator.hit_test(
                        s.outer_width(),
                        s.outer_height(),
                        x,
                        y,
                        buttons,
                        self.input.buttons,
                    );
                    if let Some(DecorEvent::Close) = hit {
                        sink.push(NormalizedEvent::Quit);
                        return;
                    }
                }
                (s.insets.left as i32, s.insets.top as i32)
            }
            None => (0, 0),
        };

        let tx = x - left;
        let ty = y - top;

        for bit in 0..3u8 {
            let was = self.input.buttons & (1 << bit) != 0;
            let is = buttons & (1 << bit) != 0;
            let button = self.remap.apply(bit);
            if is && !was {
                sink.push(NormalizedEvent::MouseButton {
                    button,
                    state: KeyState::Pressed,
                    x: tx,
                    y: ty,
                });
            } else if was && was != is {
                sink.push(NormalizedEvent::MouseButton {
                    button,
                    state: KeyState::Released,
                    x: tx,
                    y: ty,
                });
            }
        }
        self.input.buttons = buttons & BUTTON_MASK;

        // Motion always follows, even when no button changed
        sink.push(NormalizedEvent::MouseMotion { x: tx, y: ty });
    }
}
