use crate::layout::Rect;
use std::f32::consts::FRAC_1_SQRT_2;
use tiny_skia::{
    Color, FillRule, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, Stroke, Transform,
};

// ---- Tail geometry ----

/// Horizontal position of the tail base, as a fraction of bubble width.
const TAIL_BASE_FRACTION: f32 = 0.65;
const TAIL_HALF_BASE: f32 = 10.0;
const TAIL_TIP_DX: f32 = -15.0;
const TAIL_TIP_DY: f32 = 20.0;
/// Rectangle painted over the stroke where the tail joins the body.
const SEAM_HALF_WIDTH: f32 = 9.0;
const SEAM_HALF_HEIGHT: f32 = 2.0;

/// Fill, outline and stroke settings for the bubble.
#[derive(Debug, Clone, Copy)]
pub struct BubbleStyle {
    pub radius: f32,
    pub stroke_width: f32,
    pub fill: Color,
    pub outline: Color,
}

impl BubbleStyle {
    pub fn new(radius: f32, stroke_width: f32) -> Self {
        Self {
            radius,
            stroke_width,
            fill: Color::WHITE,
            outline: Color::BLACK,
        }
    }
}

/// Where the tail meets the bubble's lower edge. Sits one pixel inside the
/// body so the fills overlap.
fn tail_base(rect: &Rect) -> (f32, f32) {
    (rect.x + rect.width * TAIL_BASE_FRACTION, rect.bottom() - 1.0)
}

/// Rounded rectangle: four edges joined by quarter-circle corners.
pub fn bubble_outline(rect: &Rect, radius: f32) -> Option<Path> {
    let Rect { x, y, width: w, height: h } = *rect;
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    let r = radius.min(w / 2.0).min(h / 2.0).max(0.0);

    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(x + w - r, y);
    pb.conic_to(x + w, y, x + w, y + r, FRAC_1_SQRT_2);
    pb.line_to(x + w, y + h - r);
    pb.conic_to(x + w, y + h, x + w - r, y + h, FRAC_1_SQRT_2);
    pb.line_to(x + r, y + h);
    pb.conic_to(x, y + h, x, y + h - r, FRAC_1_SQRT_2);
    pb.line_to(x, y + r);
    pb.conic_to(x, y, x + r, y, FRAC_1_SQRT_2);
    pb.close();
    pb.finish()
}

/// The tail's two outer curves, left base to tip to right base.
fn push_tail_curves(pb: &mut PathBuilder, rect: &Rect) {
    let (bx, by) = tail_base(rect);
    let (tip_x, tip_y) = (bx + TAIL_TIP_DX, by + TAIL_TIP_DY);
    pb.move_to(bx - TAIL_HALF_BASE, by);
    pb.quad_to(bx - 8.0, by + 8.0, tip_x, tip_y);
    pb.quad_to(bx + 2.0, by + 12.0, bx + TAIL_HALF_BASE, by);
}

/// Closed tail shape for filling.
pub fn tail_outline(rect: &Rect) -> Option<Path> {
    let mut pb = PathBuilder::new();
    push_tail_curves(&mut pb, rect);
    pb.close();
    pb.finish()
}

/// Open tail curves for stroking; the base segment is left out.
pub fn tail_stroke(rect: &Rect) -> Option<Path> {
    let mut pb = PathBuilder::new();
    push_tail_curves(&mut pb, rect);
    pb.finish()
}

/// Covers the body stroke where the tail attaches.
pub fn seam_rect(rect: &Rect) -> Option<tiny_skia::Rect> {
    let (bx, by) = tail_base(rect);
    tiny_skia::Rect::from_xywh(
        bx - SEAM_HALF_WIDTH,
        by - SEAM_HALF_HEIGHT,
        SEAM_HALF_WIDTH * 2.0,
        SEAM_HALF_HEIGHT * 2.0,
    )
}

fn paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = true;
    paint
}

/// Paint the bubble and its tail as one outlined shape.
///
/// Order matters: body fill, tail fill, body stroke, seam erase in the fill
/// colour, then the tail's outer curves.
pub fn draw_bubble(pixmap: &mut Pixmap, rect: &Rect, style: &BubbleStyle) {
    let (Some(body), Some(tail)) = (bubble_outline(rect, style.radius), tail_outline(rect)) else {
        return;
    };
    let fill = paint(style.fill);
    let outline = paint(style.outline);

    pixmap.fill_path(&body, &fill, FillRule::Winding, Transform::identity(), None);
    pixmap.fill_path(&tail, &fill, FillRule::Winding, Transform::identity(), None);

    let body_stroke = Stroke { width: style.stroke_width, ..Stroke::default() };
    pixmap.stroke_path(&body, &outline, &body_stroke, Transform::identity(), None);

    if let Some(seam) = seam_rect(rect) {
        pixmap.fill_rect(seam, &fill, Transform::identity(), None);
    }

    if let Some(curves) = tail_stroke(rect) {
        let tail_stroke = Stroke {
            width: style.stroke_width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        pixmap.stroke_path(&curves, &outline, &tail_stroke, Transform::identity(), None);
    }
}
