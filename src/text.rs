use std::{borrow::Cow, path::Path};

use crate::{
    color::Rgba8,
    error::{AgjendaError, AgjendaResult},
};

pub use parley::style::FontWeight;

/// RGBA8 brush carried through Parley layouts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrush {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<Rgba8> for TextBrush {
    fn from(c: Rgba8) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TextStyle {
    pub size_px: f32,
    pub weight: FontWeight,
    pub color: Rgba8,
}

impl TextStyle {
    pub fn regular(size_px: f32, color: Rgba8) -> Self {
        Self {
            size_px,
            weight: FontWeight::NORMAL,
            color,
        }
    }

    pub fn bold(size_px: f32, color: Rgba8) -> Self {
        Self {
            size_px,
            weight: FontWeight::BOLD,
            color,
        }
    }
}

struct LoadedFont {
    family_name: String,
    glyph_font: vello_cpu::peniko::FontData,
}

/// Shapes single lines of text for measurement and glyph rendering.
///
/// Line breaking is NOT delegated to Parley: the slide renderer wraps text
/// itself with [`wrap_text`] and shapes each resulting line independently,
/// so every layout produced here is a one-line layout.
pub struct TextShaper {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
    font: Option<LoadedFont>,
}

impl Default for TextShaper {
    fn default() -> Self {
        Self::new()
    }
}

impl TextShaper {
    /// A shaper with no font registered. Measurement returns 0 and shaping
    /// returns `None` until a font is registered, which renders text as
    /// degenerate (absent) output rather than failing.
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            font: None,
        }
    }

    /// A shaper backed by a font discovered on the host system, or an
    /// `AGJENDA_FONT` override.
    pub fn with_system_font() -> AgjendaResult<Self> {
        let mut shaper = Self::new();
        let path = detect_font_path().ok_or_else(|| {
            AgjendaError::surface_unavailable(
                "no usable .ttf font found; set AGJENDA_FONT or pass --font",
            )
        })?;
        shaper.register_font_file(&path)?;
        Ok(shaper)
    }

    pub fn register_font_file(&mut self, path: &Path) -> AgjendaResult<()> {
        use anyhow::Context as _;
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read font file '{}'", path.display()))?;
        self.register_font_bytes(&bytes)
    }

    /// Register raw font bytes; the first family in the blob becomes the
    /// shaping and glyph-rendering font.
    pub fn register_font_bytes(&mut self, font_bytes: &[u8]) -> AgjendaResult<()> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            AgjendaError::validation("no font families registered from font bytes")
        })?;

        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| AgjendaError::validation("registered font family has no name"))?
            .to_string();

        let glyph_font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(font_bytes.to_vec()),
            0,
        );

        self.font = Some(LoadedFont {
            family_name,
            glyph_font,
        });
        Ok(())
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Font handle for the raster backend's glyph runs.
    pub fn glyph_font(&self) -> Option<&vello_cpu::peniko::FontData> {
        self.font.as_ref().map(|f| &f.glyph_font)
    }

    /// Shape one line of text. Returns `None` when no font is registered.
    pub fn shape_line(
        &mut self,
        text: &str,
        style: &TextStyle,
    ) -> Option<parley::Layout<TextBrush>> {
        let family_name = self.font.as_ref()?.family_name.clone();

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(style.size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(style.weight));
        builder.push_default(parley::style::StyleProperty::Brush(TextBrush::from(
            style.color,
        )));

        let mut layout: parley::Layout<TextBrush> = builder.build(text);
        layout.break_all_lines(None);
        layout.align(
            None,
            parley::Alignment::Start,
            parley::AlignmentOptions::default(),
        );
        Some(layout)
    }

    /// Measured rendered width of `text` at `style`, 0 when no font is
    /// registered.
    pub fn measure_width(&mut self, text: &str, style: &TextStyle) -> f32 {
        self.shape_line(text, style)
            .map(|layout| layout.width())
            .unwrap_or(0.0)
    }
}

/// Greedy word wrap over a width-measuring function.
///
/// Words are whitespace-separated (runs of whitespace collapse); a word is
/// appended to the current line unless the measured candidate exceeds
/// `max_width`, in which case the line is committed and the word starts the
/// next one. A single word wider than `max_width` is still placed alone
/// (no mid-word breaking). Empty input yields zero lines.
pub fn wrap_text<F>(text: &str, max_width: f32, mut measure: F) -> Vec<String>
where
    F: FnMut(&str) -> f32,
{
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_owned()
        } else {
            format!("{current} {word}")
        };
        if measure(&candidate) > max_width && !current.is_empty() {
            lines.push(std::mem::replace(&mut current, word.to_owned()));
        } else {
            current = candidate;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Look for a usable TrueType font: `AGJENDA_FONT` first, then well-known
/// system locations, then a shallow scan of the shared font directories.
fn detect_font_path() -> Option<std::path::PathBuf> {
    if let Ok(p) = std::env::var("AGJENDA_FONT") {
        let p = std::path::PathBuf::from(p);
        if p.is_file() {
            return Some(p);
        }
    }

    const CANDIDATES: [&str; 6] = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];
    for c in CANDIDATES {
        let p = std::path::PathBuf::from(c);
        if p.is_file() {
            return Some(p);
        }
    }

    for root in ["/usr/share/fonts", "/usr/local/share/fonts"] {
        if let Some(found) = scan_for_ttf(Path::new(root), 3) {
            return Some(found);
        }
    }
    None
}

fn scan_for_ttf(dir: &Path, depth: usize) -> Option<std::path::PathBuf> {
    if depth == 0 {
        return None;
    }
    let entries = std::fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            if path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("ttf"))
            {
                return Some(path);
            }
        } else if path.is_dir() {
            subdirs.push(path);
        }
    }
    subdirs.sort();
    for sub in subdirs {
        if let Some(found) = scan_for_ttf(&sub, depth - 1) {
            return Some(found);
        }
    }
    None
}
