//! Surface Presenter
//!
//! Owns the window's pixel buffers, negotiates resizes with the window
//! server, renders optional decorations, and flips completed frames to the
//! display. Mode changes walk a small state machine: the first
//! `set_video_mode` creates the server window, subsequent calls negotiate a
//! resize with the server before rebuilding the local buffers.

use anyhow::Result;
use tracing::{debug, info};

use crate::decorations::{DecorMetrics, Decorator};
use crate::error::BackendError;
use crate::gfx::GfxContext;
use crate::server::{ServerLink, WindowId};

/// Fallback caption when the application never set one
const DEFAULT_TITLE: &str = "[mado]";

const OPAQUE: u32 = 0xFF00_0000;

/// Tri-state resize negotiation with the window server.
///
/// `Requested` means a locally initiated resize is waiting for its matching
/// server offer; `Accepted` means an unsolicited offer arrived and was
/// forwarded to the application, which is expected to call back with a mode
/// change. A `Requested` resize sees exactly one matching offer before the
/// state returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeNegotiation {
    #[default]
    Idle,
    Requested,
    Accepted,
}

/// Where the application's pixels live
enum PixelStore {
    /// Private staging buffer, composited into the backbuffer at present
    /// time (bordered windows)
    Staging(Vec<u32>),
    /// The backbuffer itself is the application buffer (borderless windows)
    Direct,
}

/// One top-level window: content buffer, decoration insets, and the
/// resize-negotiation state shared with the event translator.
pub struct WindowSurface {
    pub id: WindowId,
    /// Inner content size
    pub width: u32,
    pub height: u32,
    /// Zero in every field when borderless
    pub insets: DecorMetrics,
    pub bordered: bool,
    pub focused: bool,
    pub border_dirty: bool,
    pub title: Option<String>,
    pub negotiation: ResizeNegotiation,
    store: PixelStore,
    ctx: GfxContext,
}

impl WindowSurface {
    /// First mode set: create the server-side window sized content plus
    /// insets and bind a double-buffered graphics context to it.
    pub fn create(
        link: &mut ServerLink,
        width: u32,
        height: u32,
        bordered: bool,
        decorator: &dyn Decorator,
    ) -> Result<Self> {
        let insets = if bordered {
            decorator.metrics()
        } else {
            DecorMetrics::default()
        };
        let outer_w = width + insets.extra_width;
        let outer_h = height + insets.extra_height;

        info!(
            "Initializing {} window {}x{} (outer {}x{})",
            if bordered { "bordered" } else { "borderless" },
            width,
            height,
            outer_w,
            outer_h
        );

        let id = link
            .create_window(outer_w, outer_h)
            .map_err(|e| BackendError::WindowCreate(e.to_string()))?;
        let ctx = GfxContext::new(outer_w, outer_h);
        let store = if bordered {
            PixelStore::Staging(vec![0; (width as usize) * (height as usize)])
        } else {
            PixelStore::Direct
        };

        Ok(Self {
            id,
            width,
            height,
            insets,
            bordered,
            focused: false,
            border_dirty: bordered,
            title: None,
            negotiation: ResizeNegotiation::Idle,
            store,
            ctx,
        })
    }

    pub fn outer_width(&self) -> u32 {
        self.width + self.insets.extra_width
    }

    pub fn outer_height(&self) -> u32 {
        self.height + self.insets.extra_height
    }

    /// Subsequent mode set: negotiate new dimensions with the server.
    ///
    /// When negotiation is `Idle` this is a locally initiated resize: send
    /// the request and block until the matching offer arrives (the one
    /// legitimate blocking point in the backend), adopting the
    /// server-confirmed dimensions over the requested ones. When an external
    /// offer already advanced negotiation, skip straight to accept+rebuild.
    pub fn resize(&mut self, link: &mut ServerLink, width: u32, height: u32) -> Result<()> {
        debug!("Resize request to {}x{}", width, height);
        let (mut width, mut height) = (width, height);

        if self.negotiation == ResizeNegotiation::Idle {
            self.negotiation = ResizeNegotiation::Requested;
            link.resize_window(
                self.id,
                width + self.insets.extra_width,
                height + self.insets.extra_height,
            )?;
            let (offer_w, offer_h) = link.wait_for_resize_offer(self.id)?;
            width = offer_w.saturating_sub(self.insets.extra_width);
            height = offer_h.saturating_sub(self.insets.extra_height);
        }

        link.resize_accept(
            self.id,
            width + self.insets.extra_width,
            height + self.insets.extra_height,
        )?;

        debug!("Rebuilding graphics context at {}x{}", width, height);
        self.ctx = GfxContext::new(
            width + self.insets.extra_width,
            height + self.insets.extra_height,
        );
        if self.bordered {
            self.store = PixelStore::Staging(vec![0; (width as usize) * (height as usize)]);
            self.border_dirty = true;
        }
        self.width = width;
        self.height = height;
        self.negotiation = ResizeNegotiation::Idle;

        link.resize_done(self.id)?;
        Ok(())
    }

    /// Composite the application buffer into the window and flip it to the
    /// display. Decoration chrome is redrawn only while the border-dirty
    /// flag is set; presented pixels are always fully opaque.
    pub fn present(&mut self, link: &mut ServerLink, decorator: &dyn Decorator) -> Result<()> {
        match &mut self.store {
            PixelStore::Staging(staging) => {
                if self.border_dirty {
                    let title = self.title.as_deref().unwrap_or(DEFAULT_TITLE);
                    decorator.render(&mut self.ctx, title, self.focused);
                    self.border_dirty = false;
                }
                self.ctx.flip();

                let (left, top) = (self.insets.left, self.insets.top);
                for y in 0..self.height {
                    for x in 0..self.width {
                        let px = staging[(y * self.width + x) as usize] | OPAQUE;
                        self.ctx.put(x + left, y + top, px);
                    }
                }
            }
            PixelStore::Direct => {
                for px in self.ctx.back_mut() {
                    *px |= OPAQUE;
                }
            }
        }
        self.ctx.flip();
        link.flip(self.id)?;
        Ok(())
    }

    /// Replace the owned caption and schedule a chrome redraw
    pub fn set_caption(&mut self, title: &str) {
        self.title = Some(title.to_string());
        self.border_dirty = true;
    }

    /// The application-facing pixel buffer: the staging buffer when
    /// bordered, the backbuffer itself when borderless.
    pub fn pixels(&mut self) -> &mut [u32] {
        match &mut self.store {
            PixelStore::Staging(staging) => staging,
            PixelStore::Direct => self.ctx.back_mut(),
        }
    }

    pub fn gfx(&self) -> &GfxContext {
        &self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorations::{DecorEvent, SimpleDecorator};
    use crate::server::testing::ScriptedServer;
    use crate::server::{KeyAction, KeyMessage, ServerMessage};
    use std::cell::Cell;

    /// Insets matching the (top=20, left=2) fixture used across the tests;
    /// counts chrome redraws instead of painting anything.
    #[derive(Default)]
    struct InsetDecorator {
        renders: Cell<u32>,
    }

    impl Decorator for InsetDecorator {
        fn metrics(&self) -> DecorMetrics {
            DecorMetrics {
                extra_width: 2,
                extra_height: 20,
                left: 2,
                top: 20,
            }
        }

        fn render(&self, _ctx: &mut GfxContext, _title: &str, _focused: bool) {
            self.renders.set(self.renders.get() + 1);
        }

        fn hit_test(
            &self,
            _outer_width: u32,
            _outer_height: u32,
            _x: i32,
            _y: i32,
            _buttons: u8,
            _prev_buttons: u8,
        ) -> Option<DecorEvent> {
            None
        }
    }

    fn bordered(width: u32, height: u32) -> (ServerLink, WindowSurface) {
        let mut link = ServerLink::new(Box::new(ScriptedServer::new()));
        let surface =
            WindowSurface::create(&mut link, width, height, true, &InsetDecorator::default())
                .unwrap();
        (link, surface)
    }

    #[test]
    fn test_bordered_creation_includes_insets() {
        let server = ScriptedServer::new();
        let ops = server.ops_handle();
        let mut link = ServerLink::new(Box::new(server));
        let mut surface =
            WindowSurface::create(&mut link, 640, 480, true, &InsetDecorator::default()).unwrap();

        // Server window is sized content + insets
        assert_eq!(ops.borrow()[0], "create 642x500");
        assert_eq!(surface.outer_width(), 642);
        assert_eq!(surface.outer_height(), 500);
        assert!(surface.border_dirty);
        // Private staging buffer sized to the content area
        assert_eq!(surface.pixels().len(), 640 * 480);
    }

    #[test]
    fn test_borderless_creation_has_no_insets() {
        let mut link = ServerLink::new(Box::new(ScriptedServer::new()));
        let mut surface =
            WindowSurface::create(&mut link, 320, 200, false, &SimpleDecorator::new()).unwrap();
        assert_eq!(surface.insets, DecorMetrics::default());
        assert!(!surface.border_dirty);
        // Borderless: the application buffer is the backbuffer itself
        assert_eq!(surface.pixels().len(), 320 * 200);
    }

    #[test]
    fn test_present_copies_staging_at_content_offset_forcing_alpha() {
        let (mut link, mut surface) = bordered(640, 480);
        surface.pixels()[0] = 0x00ABCDEF; // alpha 0x00 on purpose
        surface.present(&mut link, &InsetDecorator::default()).unwrap();

        let outer_w = 642usize;
        let idx = 20 * outer_w + 2; // content origin (2, 20)
        assert_eq!(surface.gfx().front()[idx], 0xFFABCDEF);
    }

    #[test]
    fn test_present_forces_alpha_everywhere_when_borderless() {
        let mut link = ServerLink::new(Box::new(ScriptedServer::new()));
        let mut surface =
            WindowSurface::create(&mut link, 8, 4, false, &SimpleDecorator::new()).unwrap();
        for px in surface.pixels().iter_mut() {
            *px = 0x00112233;
        }
        surface.present(&mut link, &SimpleDecorator::new()).unwrap();
        assert!(surface.gfx().front().iter().all(|&p| p == 0xFF112233));
    }

    #[test]
    fn test_present_requests_server_flip() {
        let server = ScriptedServer::new();
        let ops = server.ops_handle();
        let mut link = ServerLink::new(Box::new(server));
        let deco = InsetDecorator::default();
        let mut surface = WindowSurface::create(&mut link, 16, 16, true, &deco).unwrap();
        surface.present(&mut link, &deco).unwrap();
        assert!(ops.borrow().iter().any(|op| op.starts_with("flip")));
    }

    #[test]
    fn test_chrome_redrawn_iff_border_dirty() {
        let (mut link, mut surface) = bordered(64, 48);
        let deco = InsetDecorator::default();

        assert!(surface.border_dirty);
        surface.present(&mut link, &deco).unwrap();
        // Cleared within the same present call
        assert!(!surface.border_dirty);
        assert_eq!(deco.renders.get(), 1);

        // Clean flag: no redraw on the next present
        surface.present(&mut link, &deco).unwrap();
        assert_eq!(deco.renders.get(), 1);

        surface.set_caption("renamed");
        surface.present(&mut link, &deco).unwrap();
        assert_eq!(deco.renders.get(), 2);
    }

    #[test]
    fn test_caption_change_marks_borders_dirty() {
        let (mut link, mut surface) = bordered(64, 48);
        surface.present(&mut link, &InsetDecorator::default()).unwrap();
        assert!(!surface.border_dirty);
        surface.set_caption("hello");
        assert_eq!(surface.title.as_deref(), Some("hello"));
        assert!(surface.border_dirty);
    }

    #[test]
    fn test_local_resize_requests_outer_and_adopts_confirmed_size() {
        let mut server = ScriptedServer::new();
        // Server confirms different dimensions than requested
        server.offer_override = Some((502, 420));
        let ops = server.ops_handle();
        let mut link = ServerLink::new(Box::new(server));
        let mut surface =
            WindowSurface::create(&mut link, 640, 480, true, &InsetDecorator::default()).unwrap();

        surface.resize(&mut link, 800, 600).unwrap();

        // The request carries content + insets; the accept uses the
        // server-confirmed dimensions, not the original request.
        let ops = ops.borrow();
        assert!(ops.contains(&"resize 1 802x620".to_string()));
        assert!(ops.contains(&"accept 1 502x420".to_string()));
        assert!(ops.contains(&"done 1".to_string()));
        drop(ops);

        assert_eq!(surface.width, 500);
        assert_eq!(surface.height, 400);
        assert_eq!(surface.negotiation, ResizeNegotiation::Idle);
        assert_eq!(surface.pixels().len(), 500 * 400);
        assert!(surface.border_dirty);
    }

    #[test]
    fn test_accepted_negotiation_skips_request_and_wait() {
        let server = ScriptedServer::new();
        let ops = server.ops_handle();
        let mut link = ServerLink::new(Box::new(server));
        let mut surface =
            WindowSurface::create(&mut link, 640, 480, true, &InsetDecorator::default()).unwrap();
        surface.negotiation = ResizeNegotiation::Accepted;

        // No offer is queued; if the resize tried to block it would fail
        surface.resize(&mut link, 800, 600).unwrap();
        assert_eq!(surface.width, 800);
        assert_eq!(surface.height, 600);
        assert_eq!(surface.negotiation, ResizeNegotiation::Idle);
        assert!(!ops.borrow().iter().any(|op| op.starts_with("resize")));
        assert!(ops.borrow().contains(&"accept 1 802x620".to_string()));
    }

    #[test]
    fn test_resize_wait_keeps_interleaved_messages() {
        let mut server = ScriptedServer::new();
        // Input arriving ahead of the offer must survive the blocking wait
        server.push(ServerMessage::Key(KeyMessage {
            keycode: b'x' as u32,
            action: KeyAction::Down,
            modifiers: 0,
        }));
        let mut link = ServerLink::new(Box::new(server));
        let mut surface =
            WindowSurface::create(&mut link, 100, 100, true, &InsetDecorator::default()).unwrap();

        surface.resize(&mut link, 200, 150).unwrap();
        assert_eq!(link.deferred_len(), 1);
    }
}
