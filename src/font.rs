use crate::text::FontMetrics;
use anyhow::{Context, Result};
use cosmic_text::{
    Attrs, Buffer as TextBuffer, Color as CColor, Family, FontSystem, Metrics, Shaping, SwashCache,
    fontdb,
};
use std::collections::HashSet;
use std::path::Path;
use tiny_skia::{Paint, Pixmap, Transform};
use tracing::info;

/// Shapes, measures and rasterises text with cosmic-text.
pub struct TextRenderer {
    font_system: FontSystem,
    swash_cache: SwashCache,
    /// Family loaded from a font file; `None` falls back to the system sans-serif.
    family: Option<String>,
    font_size: f32,
    line_height: f32,
}

impl TextRenderer {
    /// Load `font` if given, else use whatever sans-serif the system has.
    /// A font file that cannot be parsed is an error.
    pub fn new(font: Option<&Path>, font_size: f32, line_spacing: f32) -> Result<Self> {
        let mut font_system = FontSystem::new();
        let family = match font {
            Some(path) => Some(load_family(&mut font_system, path)?),
            None => None,
        };
        info!(family = family.as_deref().unwrap_or("sans-serif"), font_size, "font ready");

        Ok(Self {
            font_system,
            swash_cache: SwashCache::new(),
            family,
            font_size,
            line_height: font_size + line_spacing,
        })
    }

    fn shape(&mut self, text: &str) -> TextBuffer {
        let metrics = Metrics::new(self.font_size, self.line_height);
        let mut buf = TextBuffer::new(&mut self.font_system, metrics);
        buf.set_size(&mut self.font_system, None, None);
        let attrs = match &self.family {
            Some(name) => Attrs::new().family(Family::Name(name)),
            None => Attrs::new().family(Family::SansSerif),
        };
        buf.set_text(&mut self.font_system, text, attrs, Shaping::Advanced);
        buf.shape_until_scroll(&mut self.font_system, false);
        buf
    }

    /// Draw `lines` top-down starting at `(x, y)`, one line height apart.
    pub fn draw_lines(
        &mut self,
        pixmap: &mut Pixmap,
        lines: &[String],
        x: f32,
        y: f32,
        color: CColor,
    ) {
        for (i, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let buf = self.shape(line);
            let oy = y + i as f32 * self.line_height;
            buf.draw(&mut self.font_system, &mut self.swash_cache, color, |gx, gy, w, h, c| {
                if c.a() == 0 {
                    return;
                }
                let Some(rect) = tiny_skia::Rect::from_xywh(
                    x + gx as f32,
                    oy + gy as f32,
                    w as f32,
                    h as f32,
                ) else {
                    return;
                };
                let mut paint = Paint::default();
                paint.set_color_rgba8(c.r(), c.g(), c.b(), c.a());
                pixmap.fill_rect(rect, &paint, Transform::identity(), None);
            });
        }
    }
}

impl FontMetrics for TextRenderer {
    fn text_width(&mut self, text: &str) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let buf = self.shape(text);
        buf.layout_runs().map(|run| run.line_w).fold(0.0, f32::max)
    }

    fn line_height(&self) -> f32 {
        self.line_height
    }
}

/// Add a font file to the database and return its family name. For a
/// collection this is the family of its first face.
fn load_family(font_system: &mut FontSystem, path: &Path) -> Result<String> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read font {}", path.display()))?;
    let db = font_system.db_mut();
    let before: HashSet<fontdb::ID> = db.faces().map(|face| face.id).collect();
    db.load_font_data(data);
    let Some(face) = db
        .faces()
        .filter(|face| !before.contains(&face.id))
        .min_by_key(|face| face.index)
    else {
        anyhow::bail!("failed to parse font {}", path.display());
    };
    face.families
        .first()
        .map(|(name, _)| name.clone())
        .with_context(|| format!("font {} has no family name", path.display()))
}
