use anyhow::{Context, Result};
use std::path::Path;
use tiny_skia::{FilterQuality, Pixmap, PixmapPaint, Transform};
use tracing::info;

/// The decoded character image.
pub struct Sprite {
    pixmap: Pixmap,
}

impl Sprite {
    pub fn load(path: &Path) -> Result<Self> {
        let pixmap = Pixmap::load_png(path)
            .with_context(|| format!("failed to decode sprite {}", path.display()))?;
        info!(
            path = %path.display(),
            width = pixmap.width(),
            height = pixmap.height(),
            "sprite loaded"
        );
        Ok(Self { pixmap })
    }

    pub fn natural_size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    /// Draw scaled by `scale` with its top-left corner at `(x, y)`.
    pub fn draw(&self, target: &mut Pixmap, x: f32, y: f32, scale: f32) {
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        let transform = Transform::from_row(scale, 0.0, 0.0, scale, x, y);
        target.draw_pixmap(0, 0, self.pixmap.as_ref(), &paint, transform, None);
    }
}

#[cfg(test)]
impl Sprite {
    pub(crate) fn solid(width: u32, height: u32) -> Self {
        let mut pixmap = Pixmap::new(width, height).unwrap();
        pixmap.fill(tiny_skia::Color::from_rgba8(0, 0, 255, 255));
        Self { pixmap }
    }
}
