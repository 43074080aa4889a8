//! Window Server Protocol
//!
//! Canonical message model for the window-server session plus the operation
//! contract the rest of the backend is written against. Incoming traffic is
//! decoded into [`ServerMessage`] up front so new message formats stay
//! additive; the raw transport lives behind the [`WindowServer`] trait.

use std::collections::VecDeque;

use anyhow::Result;
use tracing::debug;

/// Server-side window handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u32);

/// Raw modifier bits as delivered in key messages
pub mod raw_mod {
    pub const LEFT_CTRL: u32 = 0x01;
    pub const LEFT_SHIFT: u32 = 0x02;
    pub const LEFT_ALT: u32 = 0x04;
    pub const LEFT_SUPER: u32 = 0x08;
    pub const RIGHT_CTRL: u32 = 0x10;
    pub const RIGHT_SHIFT: u32 = 0x20;
    pub const RIGHT_ALT: u32 = 0x40;
    pub const RIGHT_SUPER: u32 = 0x80;
}

/// Keycodes outside the ASCII range
pub mod raw_key {
    pub const ARROW_UP: u32 = 0x101;
    pub const ARROW_DOWN: u32 = 0x102;
    pub const ARROW_LEFT: u32 = 0x103;
    pub const ARROW_RIGHT: u32 = 0x104;
    pub const LEFT_CTRL: u32 = 0x105;
    pub const LEFT_SHIFT: u32 = 0x106;
    pub const ESCAPE: u32 = 0x1b;
    pub const BACKSPACE: u32 = 0x08;
}

/// Key press or release, as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
}

/// Payload of a key message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMessage {
    /// Raw keycode; zero means modifier-only or released-without-code
    pub keycode: u32,
    pub action: KeyAction,
    /// Bitmask of `raw_mod` bits
    pub modifiers: u32,
}

/// Decoded window-server message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Keyboard input
    Key(KeyMessage),
    /// Focus moved onto or away from a window
    FocusChange { window: WindowId, focused: bool },
    /// Server proposes or confirms new outer window dimensions
    ResizeOffer {
        window: WindowId,
        width: u32,
        height: u32,
    },
    /// Pointer state snapshot: absolute position plus button bitmask
    Mouse {
        window: WindowId,
        x: i32,
        y: i32,
        buttons: u8,
    },
    /// Window was moved by the server; carries the new origin
    WindowMoved { window: WindowId, x: i32, y: i32 },
    /// The session is shutting down
    SessionEnd,
    /// Unrecognized message type; carried for diagnostics only
    Unknown(u32),
}

/// Operation contract for a window-server session.
///
/// `poll_message` must never block; `next_message` blocks until the server
/// delivers something. Both return messages strictly in delivery order.
pub trait WindowServer {
    fn poll_message(&mut self) -> Result<Option<ServerMessage>>;
    fn next_message(&mut self) -> Result<ServerMessage>;

    fn create_window(&mut self, width: u32, height: u32) -> Result<WindowId>;
    fn resize_window(&mut self, window: WindowId, width: u32, height: u32) -> Result<()>;
    fn resize_accept(&mut self, window: WindowId, width: u32, height: u32) -> Result<()>;
    fn resize_done(&mut self, window: WindowId) -> Result<()>;
    /// Ask the server to composite the window's current buffer
    fn flip(&mut self, window: WindowId) -> Result<()>;

    fn warp_mouse(&mut self, x: i32, y: i32) -> Result<()>;
    fn show_mouse(&mut self, visible: bool) -> Result<()>;
}

/// Exclusive handle to the window-server session.
///
/// Owns the message queue cursor. Messages received while blocked on a resize
/// offer are deferred here instead of dropped, and are drained ahead of fresh
/// traffic on the next poll so delivery order is preserved.
pub struct ServerLink {
    server: Box<dyn WindowServer>,
    deferred: VecDeque<ServerMessage>,
}

impl ServerLink {
    pub fn new(server: Box<dyn WindowServer>) -> Self {
        Self {
            server,
            deferred: VecDeque::new(),
        }
    }

    /// Non-blocking poll: deferred messages first, then the live queue
    pub fn poll(&mut self) -> Result<Option<ServerMessage>> {
        if let Some(msg) = self.deferred.pop_front() {
            return Ok(Some(msg));
        }
        self.server.poll_message()
    }

    /// Block until the server offers a resize for `window`, returning the
    /// offered outer dimensions. Every other message received while waiting
    /// is deferred, not discarded.
    pub fn wait_for_resize_offer(&mut self, window: WindowId) -> Result<(u32, u32)> {
        loop {
            match self.server.next_message()? {
                ServerMessage::ResizeOffer {
                    window: w,
                    width,
                    height,
                } if w == window => return Ok((width, height)),
                other => {
                    debug!("Deferring {:?} while waiting for resize offer", other);
                    self.deferred.push_back(other);
                }
            }
        }
    }

    /// Number of messages deferred during a resize wait
    pub(crate) fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    pub fn create_window(&mut self, width: u32, height: u32) -> Result<WindowId> {
        self.server.create_window(width, height)
    }

    pub fn resize_window(&mut self, window: WindowId, width: u32, height: u32) -> Result<()> {
        self.server.resize_window(window, width, height)
    }

    pub fn resize_accept(&mut self, window: WindowId, width: u32, height: u32) -> Result<()> {
        self.server.resize_accept(window, width, height)
    }

    pub fn resize_done(&mut self, window: WindowId) -> Result<()> {
        self.server.resize_done(window)
    }

    pub fn flip(&mut self, window: WindowId) -> Result<()> {
        self.server.flip(window)
    }

    pub fn warp_mouse(&mut self, x: i32, y: i32) -> Result<()> {
        self.server.warp_mouse(x, y)
    }

    pub fn show_mouse(&mut self, visible: bool) -> Result<()> {
        self.server.show_mouse(visible)
    }
}
