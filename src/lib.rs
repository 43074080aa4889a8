//! Mado — windowing and audio platform backend
//!
//! Translates a window-server message stream into normalized input events and
//! presents an application pixel buffer into an optionally decorated window,
//! negotiating resizes with the server. The server itself is reached through
//! the [`server::WindowServer`] trait, so the backend can be driven against a
//! live connection or a scripted one in tests.
//!
//! The host-facing surface is [`backend::PlatformBackend`], one cohesive
//! interface covering video mode changes, presentation, event pumping, cursor
//! control, and PCM audio output.

pub mod audio;
pub mod backend;
pub mod config;
pub mod decorations;
pub mod error;
pub mod events;
pub mod gfx;
pub mod logging;
pub mod server;
pub mod surface;

pub use backend::{MadoBackend, PlatformBackend};
pub use error::BackendError;
pub use events::{EventSink, NormalizedEvent};
pub use server::{ServerMessage, WindowServer};
