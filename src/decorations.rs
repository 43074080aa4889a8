//! Window decorations (titlebar, border, close button)
//!
//! Chrome is drawn by a [`Decorator`] into the window's graphics context,
//! above the application's content buffer. The provider also reports the
//! decoration insets and hit-tests pointer input against its own chrome.

use crate::gfx::GfxContext;

const TITLEBAR_HEIGHT: u32 = 24;
const BORDER_WIDTH: u32 = 2;
const BUTTON_SIZE: u32 = 12;
const BUTTON_PADDING: u32 = 6;

// Nord Theme Colors
const COLOR_TITLEBAR_FOCUSED: u32 = 0xFF3B4252; // Polar Night Lighter
const COLOR_TITLEBAR_UNFOCUSED: u32 = 0xFF2E3440; // Polar Night Darkest
const COLOR_BORDER: u32 = 0xFF5E81AC; // Frost Blue
const COLOR_CLOSE: u32 = 0xFFBF616A; // Aurora Red

/// Decoration insets: total extra outer size plus the content origin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecorMetrics {
    /// Chrome width added to the content width (left + right borders)
    pub extra_width: u32,
    /// Chrome height added to the content height (titlebar + bottom border)
    pub extra_height: u32,
    /// Content origin x (left border width)
    pub left: u32,
    /// Content origin y (titlebar height)
    pub top: u32,
}

/// Signals produced by decoration hit-testing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorEvent {
    /// The close control was activated
    Close,
}

/// Decoration provider: metrics, chrome rendering, and input hit-testing
pub trait Decorator {
    fn metrics(&self) -> DecorMetrics;

    /// Draw chrome into the context's back buffer. The content region is left
    /// untouched; the presenter composites over it afterwards.
    fn render(&self, ctx: &mut GfxContext, title: &str, focused: bool);

    /// Inspect a pointer snapshot in outer-window coordinates. `prev_buttons`
    /// is the previous button bitmask so edge-triggered controls fire once.
    fn hit_test(
        &self,
        outer_width: u32,
        outer_height: u32,
        x: i32,
        y: i32,
        buttons: u8,
        prev_buttons: u8,
    ) -> Option<DecorEvent>;
}

/// Flat single-color chrome: titlebar strip, side/bottom borders, and a
/// close button in the titlebar's top-right corner.
pub struct SimpleDecorator;

impl SimpleDecorator {
    pub fn new() -> Self {
        Self
    }

    fn close_button_rect(outer_width: u32) -> (u32, u32, u32, u32) {
        let x = outer_width.saturating_sub(BUTTON_SIZE + BUTTON_PADDING);
        let y = (TITLEBAR_HEIGHT - BUTTON_SIZE) / 2;
        (x, y, BUTTON_SIZE, BUTTON_SIZE)
    }
}

impl Default for SimpleDecorator {
    fn default() -> Self {
        Self::new()
    }
}

impl Decorator for SimpleDecorator {
    fn metrics(&self) -> DecorMetrics {
        DecorMetrics {
            extra_width: BORDER_WIDTH * 2,
            extra_height: TITLEBAR_HEIGHT + BORDER_WIDTH,
            left: BORDER_WIDTH,
            top: TITLEBAR_HEIGHT,
        }
    }

    fn render(&self, ctx: &mut GfxContext, _title: &str, focused: bool) {
        let w = ctx.width();
        let h = ctx.height();
        let titlebar = if focused {
            COLOR_TITLEBAR_FOCUSED
        } else {
            COLOR_TITLEBAR_UNFOCUSED
        };

        ctx.fill_rect(0, 0, w, TITLEBAR_HEIGHT, titlebar);
        ctx.fill_rect(
            0,
            TITLEBAR_HEIGHT,
            BORDER_WIDTH,
            h.saturating_sub(TITLEBAR_HEIGHT),
            COLOR_BORDER,
        );
        ctx.fill_rect(
            w.saturating_sub(BORDER_WIDTH),
            TITLEBAR_HEIGHT,
            BORDER_WIDTH,
            h.saturating_sub(TITLEBAR_HEIGHT),
            COLOR_BORDER,
        );
        ctx.fill_rect(0, h.saturating_sub(BORDER_WIDTH), w, BORDER_WIDTH, COLOR_BORDER);

        let (bx, by, bw, bh) = Self::close_button_rect(w);
        ctx.fill_rect(bx, by, bw, bh, COLOR_CLOSE);
    }

    fn hit_test(
        &self,
        outer_width: u32,
        _outer_height: u32,
        x: i32,
        y: i32,
        buttons: u8,
        prev_buttons: u8,
    ) -> Option<DecorEvent> {
        // Edge-triggered: only a fresh left press activates the button
        if buttons & 1 == 0 || prev_buttons & 1 != 0 {
            return None;
        }
        if x < 0 || y < 0 {
            return None;
        }
        let (bx, by, bw, bh) = Self::close_button_rect(outer_width);
        let (x, y) = (x as u32, y as u32);
        (x >= bx && x < bx + bw && y >= by && y < by + bh).then_some(DecorEvent::Close)
    }
}
