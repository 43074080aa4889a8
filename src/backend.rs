//! Platform Backend
//!
//! The host-facing surface of the crate: one cohesive interface covering
//! video mode changes, frame presentation, event pumping, cursor control,
//! caption changes, and PCM audio output. [`MadoBackend`] wires the event
//! translator and surface presenter over a single window-server session;
//! both operate on disjoint message types of the same connection.

use anyhow::Result;
use tracing::info;

use crate::audio::{self, AudioDevice, AudioSpec};
use crate::config::Config;
use crate::decorations::{Decorator, SimpleDecorator};
use crate::error::BackendError;
use crate::events::{EventSink, EventTranslator};
use crate::server::{ServerLink, WindowServer};
use crate::surface::WindowSurface;

/// Host contract for a windowing/audio platform backend
pub trait PlatformBackend {
    /// Create the window on first call; negotiate a resize with the server
    /// on subsequent calls. The resize path blocks until the server answers.
    fn set_video_mode(&mut self, width: u32, height: u32, bordered: bool) -> Result<()>;

    /// Composite and flip the current frame. No-op before the first
    /// `set_video_mode`.
    fn present(&mut self) -> Result<()>;

    /// Drain queued server messages into normalized events
    fn pump_events(&mut self, sink: &mut dyn EventSink) -> Result<()>;

    /// The application-facing pixel buffer
    fn pixels(&mut self) -> Result<&mut [u32]>;

    fn set_caption(&mut self, title: &str);

    fn warp_cursor(&mut self, x: i32, y: i32) -> Result<()>;
    fn show_cursor(&mut self, visible: bool) -> Result<()>;

    /// Whether the configured playback device is present
    fn audio_available(&self) -> bool;
    /// Open the playback device; returns the device-imposed spec
    fn open_audio(&mut self, requested: &AudioSpec) -> Result<AudioSpec>;
    /// Mix buffer of the open device, if any
    fn audio_buffer(&mut self) -> Option<&mut [i16]>;
    /// Write the mix buffer out; silently ignored when audio is closed or
    /// disabled
    fn play_audio(&mut self);
}

/// Backend implementation over a [`WindowServer`] session
pub struct MadoBackend {
    link: ServerLink,
    translator: EventTranslator,
    surface: Option<WindowSurface>,
    decorator: Box<dyn Decorator>,
    audio: Option<AudioDevice>,
    config: Config,
    /// Caption set before the window exists, applied at creation
    pending_title: Option<String>,
}

impl MadoBackend {
    pub fn new(server: Box<dyn WindowServer>, config: Config) -> Self {
        Self::with_decorator(server, config, Box::new(SimpleDecorator::new()))
    }

    pub fn with_decorator(
        server: Box<dyn WindowServer>,
        config: Config,
        decorator: Box<dyn Decorator>,
    ) -> Self {
        let translator = EventTranslator::new(config.input.button_remap);
        let pending_title = config.window.title.clone();
        Self {
            link: ServerLink::new(server),
            translator,
            surface: None,
            decorator,
            audio: None,
            config,
            pending_title,
        }
    }

    pub fn surface(&self) -> Option<&WindowSurface> {
        self.surface.as_ref()
    }
}

impl PlatformBackend for MadoBackend {
    fn set_video_mode(&mut self, width: u32, height: u32, bordered: bool) -> Result<()> {
        match self.surface.as_mut() {
            Some(surface) => surface.resize(&mut self.link, width, height)?,
            None => {
                let mut surface = WindowSurface::create(
                    &mut self.link,
                    width,
                    height,
                    bordered,
                    self.decorator.as_ref(),
                )?;
                if let Some(title) = self.pending_title.take() {
                    surface.set_caption(&title);
                }
                self.surface = Some(surface);
                info!("Window output initialized");
            }
        }
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        match self.surface.as_mut() {
            Some(surface) => surface.present(&mut self.link, self.decorator.as_ref()),
            None => Ok(()),
        }
    }

    fn pump_events(&mut self, sink: &mut dyn EventSink) -> Result<()> {
        self.translator.pump_events(
            &mut self.link,
            &mut self.surface,
            self.decorator.as_ref(),
            sink,
        )
    }

    fn pixels(&mut self) -> Result<&mut [u32]> {
        match self.surface.as_mut() {
            Some(surface) => Ok(surface.pixels()),
            None => Err(BackendError::NoWindow.into()),
        }
    }

    fn set_caption(&mut self, title: &str) {
        match self.surface.as_mut() {
            Some(surface) => surface.set_caption(title),
            None => self.pending_title = Some(title.to_string()),
        }
    }

    fn warp_cursor(&mut self, x: i32, y: i32) -> Result<()> {
        self.link.warp_mouse(x, y)
    }

    fn show_cursor(&mut self, visible: bool) -> Result<()> {
        self.link.show_mouse(visible)
    }

    fn audio_available(&self) -> bool {
        audio::probe(&self.config.audio.device)
    }

    fn open_audio(&mut self, requested: &AudioSpec) -> Result<AudioSpec> {
        let device = AudioDevice::open(&self.config.audio.device, requested)?;
        let spec = *device.spec();
        self.audio = Some(device);
        Ok(spec)
    }

    fn audio_buffer(&mut self) -> Option<&mut [i16]> {
        self.audio.as_mut().map(|device| device.buffer())
    }

    fn play_audio(&mut self) {
        if let Some(device) = self.audio.as_mut() {
            device.play();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NormalizedEvent;
    use crate::server::testing::ScriptedServer;
    use crate::server::{ServerMessage, WindowId};

    fn backend_with(server: ScriptedServer) -> MadoBackend {
        MadoBackend::new(Box::new(server), Config::default())
    }

    #[test]
    fn test_present_before_video_mode_is_a_noop() {
        let server = ScriptedServer::new();
        let ops = server.ops_handle();
        let mut backend = backend_with(server);
        backend.present().unwrap();
        assert!(ops.borrow().is_empty());
        assert!(backend.pixels().is_err());
    }

    #[test]
    fn test_first_video_mode_creates_window_with_chrome() {
        let server = ScriptedServer::new();
        let ops = server.ops_handle();
        let mut backend = backend_with(server);
        backend.set_video_mode(640, 480, true).unwrap();

        // SimpleDecorator insets: 2px borders, 24px titlebar
        assert_eq!(ops.borrow()[0], "create 644x506");
        assert_eq!(backend.pixels().unwrap().len(), 640 * 480);
    }

    #[test]
    fn test_second_video_mode_negotiates_resize() {
        let server = ScriptedServer::new();
        let ops = server.ops_handle();
        let mut backend = backend_with(server);
        backend.set_video_mode(640, 480, true).unwrap();
        backend.set_video_mode(800, 600, true).unwrap();

        let ops = ops.borrow();
        assert!(ops.contains(&"resize 1 804x626".to_string()));
        assert!(ops.contains(&"accept 1 804x626".to_string()));
        assert!(ops.contains(&"done 1".to_string()));
    }

    #[test]
    fn test_caption_set_before_window_is_applied_at_creation() {
        let mut backend = backend_with(ScriptedServer::new());
        backend.set_caption("early");
        backend.set_video_mode(100, 100, true).unwrap();
        assert_eq!(
            backend.surface().unwrap().title.as_deref(),
            Some("early")
        );
    }

    #[test]
    fn test_events_flow_end_to_end() {
        let mut server = ScriptedServer::new();
        server.push(ServerMessage::SessionEnd);
        let mut backend = backend_with(server);

        let mut sink: Vec<NormalizedEvent> = Vec::new();
        backend.pump_events(&mut sink).unwrap();
        assert_eq!(sink, vec![NormalizedEvent::Quit]);
    }

    #[test]
    fn test_input_flows_through_backend_with_inset_translation() {
        let mut server = ScriptedServer::new();
        // The first created window gets id 1
        server.push(ServerMessage::FocusChange {
            window: WindowId(1),
            focused: true,
        });
        server.push(ServerMessage::Mouse {
            window: WindowId(1),
            x: 10,
            y: 30,
            buttons: 1,
        });
        let mut backend = backend_with(server);
        backend.set_video_mode(64, 64, true).unwrap();

        let mut sink: Vec<NormalizedEvent> = Vec::new();
        backend.pump_events(&mut sink).unwrap();

        // SimpleDecorator content origin is (2, 24)
        assert_eq!(sink[0], NormalizedEvent::FocusChange { focused: true });
        assert!(matches!(
            sink[1],
            NormalizedEvent::MouseButton {
                button: 1,
                x: 8,
                y: 6,
                ..
            }
        ));
        assert_eq!(sink[2], NormalizedEvent::MouseMotion { x: 8, y: 6 });
    }

    #[test]
    fn test_cursor_ops_forward_to_server() {
        let server = ScriptedServer::new();
        let ops = server.ops_handle();
        let mut backend = backend_with(server);
        backend.warp_cursor(10, 20).unwrap();
        backend.show_cursor(false).unwrap();
        let ops = ops.borrow();
        assert!(ops.contains(&"warp 10 20".to_string()));
        assert!(ops.contains(&"show_mouse false".to_string()));
    }

    #[test]
    fn test_audio_open_uses_configured_device() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.audio.device = file.path().to_path_buf();
        let mut backend =
            MadoBackend::new(Box::new(ScriptedServer::new()), config);

        assert!(backend.audio_available());
        let spec = backend.open_audio(&AudioSpec::default()).unwrap();
        assert_eq!(spec.sample_rate, 48_000);
        assert_eq!(spec.channels, 2);
        assert!(backend.audio_buffer().is_some());
        backend.play_audio();
    }

    #[test]
    fn test_audio_unavailable_without_device() {
        let mut config = Config::default();
        config.audio.device = "/nonexistent/dsp".into();
        let mut backend =
            MadoBackend::new(Box::new(ScriptedServer::new()), config);
        assert!(!backend.audio_available());
        assert!(backend.open_audio(&AudioSpec::default()).is_err());
        assert!(backend.audio_buffer().is_none());
        backend.play_audio(); // closed device: silently ignored
    }
}
