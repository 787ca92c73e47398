use crate::bubble::{BubbleStyle, draw_bubble};
use crate::font::TextRenderer;
use crate::presenter::Presenter;
use crate::sprite::Sprite;
use cosmic_text::Color as CColor;
use tiny_skia::{Color, Pixmap};

/// Paint one frame: bubble and text when a message is showing, then the sprite.
pub fn draw_frame(
    pixmap: &mut Pixmap,
    presenter: &Presenter,
    sprite: &Sprite,
    text: &mut TextRenderer,
) {
    pixmap.fill(Color::TRANSPARENT);
    let ly = presenter.layout();

    if presenter.shows_bubble() {
        let params = presenter.params();
        let style = BubbleStyle::new(params.bubble_radius, params.stroke_width);
        draw_bubble(pixmap, &ly.bubble, &style);

        let lines = ly.text.lines();
        let text_h = lines.len() as f32 * ly.line_height;
        let x = ly.bubble.x + params.bubble_pad_x / 2.0;
        let y = ly.bubble.y + (ly.bubble.height - text_h) / 2.0;
        text.draw_lines(pixmap, lines, x, y, CColor::rgb(0, 0, 0));
    }

    sprite.draw(pixmap, ly.sprite.x, ly.sprite.y, ly.sprite_scale);
}

/// Copy a premultiplied RGBA pixmap into a little-endian ARGB8888 buffer.
pub fn copy_to_argb(pixmap: &Pixmap, canvas: &mut [u8]) {
    for (dst, src) in canvas.chunks_exact_mut(4).zip(pixmap.data().chunks_exact(4)) {
        dst.copy_from_slice(&[src[2], src[1], src[0], src[3]]);
    }
}
