use crate::text::{FontMetrics, WrappedText};
use serde::Deserialize;

/// Geometry constants for the overlay. Every field can be overridden from
/// the `[layout]` table of the config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    pub font_size: f32,
    /// Extra pixels between lines on top of the font size.
    pub line_spacing: f32,
    /// Text wraps once a line would grow past this width.
    pub max_line_width: f32,
    /// The sprite's longer side is scaled to this many pixels.
    pub max_sprite_extent: f32,
    pub bubble_pad_x: f32,
    pub bubble_pad_y: f32,
    pub bubble_radius: f32,
    /// Vertical gap between the bubble's lower edge and the sprite.
    pub bubble_gap: f32,
    pub stroke_width: f32,
    /// Floor for both window dimensions; some compositors reject tiny buffers.
    pub min_window_size: u32,
    pub sprite_margin_right: f32,
    pub sprite_margin_bottom: f32,
    pub bubble_side_margin: f32,
    pub outer_margin: f32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            font_size: 24.0,
            line_spacing: 4.0,
            max_line_width: 350.0,
            max_sprite_extent: 300.0,
            bubble_pad_x: 44.0,
            bubble_pad_y: 28.0,
            bubble_radius: 15.0,
            bubble_gap: 25.0,
            stroke_width: 2.0,
            min_window_size: 300,
            sprite_margin_right: 20.0,
            sprite_margin_bottom: 5.0,
            bubble_side_margin: 80.0,
            outer_margin: 20.0,
        }
    }
}

impl LayoutParams {
    /// Height of a bubble holding exactly one line.
    pub fn one_line_bubble_height(&self, line_height: f32) -> f32 {
        line_height + self.bubble_pad_y
    }
}

/// Axis-aligned rectangle in window coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Edges are inclusive.
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }
}

/// Geometry for one presentation state. A new message always produces a
/// fresh `Layout`.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Scaled sprite bounds.
    pub sprite: Rect,
    pub sprite_scale: f32,
    pub bubble: Rect,
    pub text: WrappedText,
    pub line_height: f32,
    pub window_width: u32,
    pub window_height: u32,
}

impl Layout {
    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    /// Sprite bottom-right corner in window coordinates.
    pub fn sprite_anchor(&self) -> (f32, f32) {
        (self.sprite.right(), self.sprite.bottom())
    }
}

/// Uniform scale that fits the sprite inside `max_extent` on both axes.
pub fn sprite_scale(natural: (u32, u32), max_extent: f32) -> f32 {
    let (w, h) = (natural.0.max(1) as f32, natural.1.max(1) as f32);
    (max_extent / w).min(max_extent / h)
}

/// Size and place sprite, bubble and window for `text`.
///
/// The sprite sits at fixed margins from the window's bottom-right corner,
/// so a caller that keeps that corner fixed on screen keeps the sprite still.
/// Pure: identical inputs give identical layouts.
pub fn compute_layout(
    sprite_natural: (u32, u32),
    metrics: &mut impl FontMetrics,
    text: &WrappedText,
    params: &LayoutParams,
) -> Layout {
    let scale = sprite_scale(sprite_natural, params.max_sprite_extent);
    let sprite_w = sprite_natural.0 as f32 * scale;
    let sprite_h = sprite_natural.1 as f32 * scale;

    let line_height = metrics.line_height();
    let (bubble_w, bubble_h) = if text.is_empty() {
        (0.0, 0.0)
    } else {
        let text_w = text.max_width(metrics);
        let text_h = text.lines().len() as f32 * line_height;
        (text_w + params.bubble_pad_x, text_h + params.bubble_pad_y)
    };

    // Reserve one line of bubble even when idle so the first message does
    // not jolt the window.
    let effective_bubble_h = bubble_h.max(params.one_line_bubble_height(line_height));

    let width = (bubble_w + params.bubble_side_margin)
        .max(sprite_w + params.sprite_margin_right + params.outer_margin);
    let height = sprite_h
        + params.sprite_margin_bottom
        + params.bubble_gap
        + effective_bubble_h
        + params.outer_margin;
    let window_width = (width as u32).max(params.min_window_size);
    let window_height = (height as u32).max(params.min_window_size);

    let sprite_x = window_width as f32 - sprite_w - params.sprite_margin_right;
    let sprite_y = window_height as f32 - sprite_h - params.sprite_margin_bottom;

    let bubble = Rect {
        x: window_width as f32 / 2.0 - bubble_w / 2.0,
        y: sprite_y - bubble_h - params.bubble_gap,
        width: bubble_w,
        height: bubble_h,
    };

    Layout {
        sprite: Rect { x: sprite_x, y: sprite_y, width: sprite_w, height: sprite_h },
        sprite_scale: scale,
        bubble,
        text: text.clone(),
        line_height,
        window_width,
        window_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::tests::MonoMetrics;
    use crate::text::wrap_text;

    fn layout_for(msg: &str, sprite: (u32, u32)) -> Layout {
        let params = LayoutParams::default();
        let mut metrics = MonoMetrics::new();
        let text = wrap_text(msg, &mut metrics, params.max_line_width);
        compute_layout(sprite, &mut metrics, &text, &params)
    }

    #[test]
    fn scale_preserves_aspect_and_caps_extent() {
        assert_eq!(sprite_scale((200, 100), 300.0), 1.5);
        assert_eq!(sprite_scale((600, 1200), 300.0), 0.25);
        assert_eq!(sprite_scale((300, 300), 300.0), 1.0);
    }

    #[test]
    fn empty_message_reserves_one_line_floor() {
        let ly = layout_for("", (200, 100));
        assert_eq!(ly.sprite.width, 300.0);
        assert_eq!(ly.sprite.height, 150.0);
        assert_eq!(ly.bubble.width, 0.0);
        assert_eq!(ly.bubble.height, 0.0);
        // 300 + 20 + 20 wide; 150 + 5 + 25 + (28 + 28) + 20 = 256 tall, floored to 300.
        assert_eq!(ly.window_size(), (340, 300));
        assert_eq!(ly.sprite.x, 20.0);
        assert_eq!(ly.sprite.y, 145.0);
    }

    #[test]
    fn window_grows_with_line_count() {
        let params = LayoutParams::default();
        let mut metrics = MonoMetrics::new();
        let many = "a\n".repeat(9) + "a";
        let text = wrap_text(&many, &mut metrics, params.max_line_width);
        let ly = compute_layout((200, 100), &mut metrics, &text, &params);
        assert_eq!(ly.bubble.height, 10.0 * 28.0 + 28.0);
        assert_eq!(ly.window_height, (150.0 + 5.0 + 25.0 + 308.0 + 20.0) as u32);
    }

    #[test]
    fn bubble_sits_centered_above_sprite() {
        let ly = layout_for("Hello there", (200, 100));
        assert_eq!(ly.bubble.width, 110.0 + 44.0);
        assert_eq!(ly.bubble.height, 28.0 + 28.0);
        assert_eq!(ly.bubble.x + ly.bubble.width / 2.0, ly.window_width as f32 / 2.0);
        assert_eq!(ly.bubble.bottom() + 25.0, ly.sprite.y);
    }

    #[test]
    fn wide_bubble_widens_window() {
        let msg = "x".repeat(35);
        let ly = layout_for(&msg, (200, 100));
        assert_eq!(ly.window_width, (350.0 + 44.0 + 80.0) as u32);
        assert!(ly.bubble.x >= 0.0);
    }

    #[test]
    fn sprite_anchor_is_fixed_offset_from_window_corner() {
        for msg in ["", "Hi", "a much longer message that wraps\nand then\nsome"] {
            let ly = layout_for(msg, (123, 77));
            let (ax, ay) = ly.sprite_anchor();
            assert!((ly.window_width as f32 - ax - 20.0).abs() < 0.01);
            assert!((ly.window_height as f32 - ay - 5.0).abs() < 0.01);
        }
    }

    #[test]
    fn min_window_size_applies_to_small_sprites() {
        let params = LayoutParams { max_sprite_extent: 50.0, ..LayoutParams::default() };
        let mut metrics = MonoMetrics::new();
        let ly = compute_layout((10, 10), &mut metrics, &WrappedText::empty(), &params);
        assert_eq!(ly.window_size(), (300, 300));
    }

    #[test]
    fn layout_is_pure() {
        let a = layout_for("same input\ntwice", (200, 100));
        let b = layout_for("same input\ntwice", (200, 100));
        assert_eq!(a, b);
    }

    #[test]
    fn rect_contains_is_edge_inclusive() {
        let r = Rect { x: 10.0, y: 10.0, width: 5.0, height: 5.0 };
        assert!(r.contains(10.0, 10.0));
        assert!(r.contains(15.0, 15.0));
        assert!(!r.contains(9.9, 12.0));
        assert!(!r.contains(12.0, 15.1));
    }
}
