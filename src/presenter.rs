use crate::layout::{Layout, LayoutParams, compute_layout};
use crate::text::{FontMetrics, WrappedText, unescape_newlines, wrap_text};
use tracing::{debug, info};

/// The window operations the presenter needs. Positions are in screen
/// pixels, the cursor in window-local pixels.
pub trait WindowController {
    fn set_size(&mut self, width: u32, height: u32);
    fn set_position(&mut self, x: i32, y: i32);
    fn position(&self) -> (i32, i32);
    fn cursor_position(&self) -> (i32, i32);
    fn is_primary_pressed(&self) -> bool;
}

/// Owns the current layout, the message timer and the drag state.
///
/// [`Presenter::update`] runs once per frame and is the only place any of
/// that state changes.
pub struct Presenter {
    params: LayoutParams,
    sprite_size: (u32, u32),
    fps: u32,
    layout: Layout,
    has_message: bool,
    /// Frames until the message hides.
    message_timer: u32,
    dragging: bool,
    /// Screen-space pointer position at the last drag step.
    drag_anchor: (i32, i32),
}

impl Presenter {
    pub fn new(
        sprite_size: (u32, u32),
        params: LayoutParams,
        fps: u32,
        metrics: &mut impl FontMetrics,
    ) -> Self {
        let layout = compute_layout(sprite_size, metrics, &WrappedText::empty(), &params);
        Self {
            params,
            sprite_size,
            fps: fps.max(1),
            layout,
            has_message: false,
            message_timer: 0,
            dragging: false,
            drag_anchor: (0, 0),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    pub fn has_message(&self) -> bool {
        self.has_message
    }

    pub fn message_timer(&self) -> u32 {
        self.message_timer
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Bubble and text are hidden while dragging.
    pub fn shows_bubble(&self) -> bool {
        self.has_message && !self.dragging
    }

    /// One frame: inbound message, then timer, then pointer.
    pub fn update(
        &mut self,
        incoming: Option<String>,
        window: &mut impl WindowController,
        metrics: &mut impl FontMetrics,
    ) {
        if let Some(raw) = incoming {
            self.receive(&raw, window, metrics);
        }
        self.tick_timer(window, metrics);
        self.track_pointer(window);
    }

    fn receive(
        &mut self,
        raw: &str,
        window: &mut impl WindowController,
        metrics: &mut impl FontMetrics,
    ) {
        if raw.is_empty() {
            return;
        }
        let message = unescape_newlines(raw);
        let text = wrap_text(&message, metrics, self.params.max_line_width);
        let frames = (text.char_count() as u32).saturating_mul(self.fps);
        info!(
            chars = text.char_count(),
            lines = text.lines().len(),
            frames,
            "showing message"
        );

        self.relayout(&text, window, metrics);
        self.has_message = true;
        self.message_timer = frames;
    }

    fn tick_timer(&mut self, window: &mut impl WindowController, metrics: &mut impl FontMetrics) {
        if !self.has_message || self.message_timer == 0 {
            return;
        }
        self.message_timer -= 1;
        if self.message_timer == 0 {
            info!("message expired");
            self.has_message = false;
            self.relayout(&WrappedText::empty(), window, metrics);
        }
    }

    /// Install a new layout, moving the window by the size delta so its
    /// bottom-right corner (and so the sprite) stays put on screen.
    fn relayout(
        &mut self,
        text: &WrappedText,
        window: &mut impl WindowController,
        metrics: &mut impl FontMetrics,
    ) {
        let layout = compute_layout(self.sprite_size, metrics, text, &self.params);
        let (old_w, old_h) = self.layout.window_size();
        let (new_w, new_h) = layout.window_size();
        let (wx, wy) = window.position();
        let x = wx + old_w as i32 - new_w as i32;
        let y = wy + old_h as i32 - new_h as i32;

        self.layout = layout;
        window.set_size(new_w, new_h);
        window.set_position(x, y);
        let (ax, ay) = self.layout.sprite_anchor();
        debug!(
            width = new_w,
            height = new_h,
            x,
            y,
            anchor_x = x as f32 + ax,
            anchor_y = y as f32 + ay,
            "window relaid out"
        );
    }

    fn track_pointer(&mut self, window: &mut impl WindowController) {
        if !window.is_primary_pressed() {
            if self.dragging {
                debug!("drag ended");
            }
            self.dragging = false;
            return;
        }

        let (cx, cy) = window.cursor_position();
        let (wx, wy) = window.position();
        let screen = (wx + cx, wy + cy);

        if !self.dragging {
            if self.layout.sprite.contains(cx as f32, cy as f32) {
                debug!(x = cx, y = cy, "drag started");
                self.dragging = true;
                self.drag_anchor = screen;
            }
            return;
        }

        let dx = screen.0 - self.drag_anchor.0;
        let dy = screen.1 - self.drag_anchor.1;
        if dx != 0 || dy != 0 {
            window.set_position(wx + dx, wy + dy);
            self.drag_anchor = screen;
        }
    }
}
