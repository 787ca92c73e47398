/// Width measurement and line height for the font the overlay draws with.
///
/// Measuring takes `&mut self` because shaping backends keep caches.
pub trait FontMetrics {
    /// Rendered pixel width of `text` on a single line.
    fn text_width(&mut self, text: &str) -> f32;
    /// Vertical distance between consecutive baselines (font size + spacing).
    fn line_height(&self) -> f32;
}

/// A message broken into display lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrappedText {
    lines: Vec<String>,
}

impl WrappedText {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Codepoints of the newline-joined text. Inserted breaks count too.
    pub fn char_count(&self) -> usize {
        let breaks = self.lines.len().saturating_sub(1);
        self.lines.iter().map(|l| l.chars().count()).sum::<usize>() + breaks
    }

    /// Pixel width of the widest line.
    pub fn max_width(&self, metrics: &mut impl FontMetrics) -> f32 {
        self.lines
            .iter()
            .map(|line| metrics.text_width(line))
            .fold(0.0, f32::max)
    }
}

impl std::fmt::Display for WrappedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

/// Turn literal `\n` markers from a line-oriented source into real breaks.
pub fn unescape_newlines(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

/// Greedy per-codepoint fill. Hard breaks in `message` are kept, empty
/// paragraphs become empty lines, and a codepoint wider than `max_width` on
/// its own still gets a line of its own.
pub fn wrap_text(message: &str, metrics: &mut impl FontMetrics, max_width: f32) -> WrappedText {
    if message.is_empty() {
        return WrappedText::empty();
    }

    let mut lines = Vec::new();
    for para in message.split('\n') {
        if para.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut line = String::new();
        for ch in para.chars() {
            let mut candidate = line.clone();
            candidate.push(ch);
            if !line.is_empty() && metrics.text_width(&candidate) > max_width {
                lines.push(std::mem::take(&mut line));
                line.push(ch);
            } else {
                line = candidate;
            }
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }

    WrappedText { lines }
}
