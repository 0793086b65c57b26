use std::collections::HashMap;

use kurbo::{Circle, Point, Rect};

use crate::{
    agenda::SlideContext,
    color::Rgba8,
    error::AgjendaResult,
    surface::{PaintPass, Surface, premul_image},
    text::{TextShaper, TextStyle, wrap_text},
};

/// Opaque dark base everything is composed over.
const BASE: Rgba8 = Rgba8::rgb(0x02, 0x06, 0x17);
/// Dark slate used as the far gradient stop and the progress track.
const SLATE: Rgba8 = Rgba8::rgb(0x0f, 0x17, 0x2a);
const TITLE_COLOR: Rgba8 = Rgba8::rgb(0xf8, 0xfa, 0xfc);
const DESCRIPTION_COLOR: Rgba8 = Rgba8::rgb(0xe2, 0xe8, 0xf0);
/// Fixed progress-bar gradient hues (independent of the slide accent).
const BAR_FROM: Rgba8 = Rgba8::rgb(0x06, 0xb6, 0xd4);
const BAR_TO: Rgba8 = Rgba8::rgb(0xa8, 0x55, 0xf7);

const ORB_COUNT: usize = 3;
const TITLE_SIZE_PX: f32 = 72.0;
const TITLE_LINE_HEIGHT: f64 = 84.0;
const DESCRIPTION_SIZE_PX: f32 = 36.0;
const DESCRIPTION_LINE_HEIGHT: f64 = 48.0;
const BADGE_SIZE_PX: f32 = 32.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct LinearKey {
    accent: Rgba8,
    width: u32,
    height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct OrbKey {
    accent: Rgba8,
    diameter: u32,
    orb: u8,
}

/// Paints one complete slide frame: base wash, accent gradient, decorative
/// orbs, index badge, body panel with wrapped text, and the sequence
/// progress bar.
///
/// Gradient paints are rasterized once per accent color and cached.
pub struct SlideRenderer {
    shaper: TextShaper,
    linear_cache: HashMap<LinearKey, vello_cpu::Image>,
    orb_cache: HashMap<OrbKey, vello_cpu::Image>,
}

impl SlideRenderer {
    pub fn new(shaper: TextShaper) -> Self {
        Self {
            shaper,
            linear_cache: HashMap::new(),
            orb_cache: HashMap::new(),
        }
    }

    pub fn shaper_mut(&mut self) -> &mut TextShaper {
        &mut self.shaper
    }

    /// Paint one frame for `ctx`, fully overwriting `surface`.
    ///
    /// Never fails for a valid agenda item: empty strings produce degenerate
    /// but well-formed output.
    pub fn render(&mut self, surface: &mut Surface, ctx: &SlideContext<'_>) -> AgjendaResult<()> {
        let w = f64::from(surface.width());
        let h = f64::from(surface.height());
        let accent = ctx.item.accent;

        let Self {
            shaper,
            linear_cache,
            orb_cache,
        } = self;

        let mut pass = surface.begin_frame();

        // 1. Opaque base.
        pass.fill_rect(Rect::new(0.0, 0.0, w, h), BASE);

        // 2. Directional accent wash, bottom-left toward top-right.
        let key = LinearKey {
            accent,
            width: w as u32,
            height: h as u32,
        };
        if !linear_cache.contains_key(&key) {
            let bytes = linear_gradient_premul(
                w as u32,
                h as u32,
                (0.0, h as f32),
                (w as f32, 0.0),
                accent.with_opacity(0.35),
                SLATE.with_opacity(0.95),
            );
            linear_cache.insert(key, premul_image(&bytes, w as u32, h as u32)?);
        }
        if let Some(img) = linear_cache.get(&key) {
            pass.fill_rect_image(Rect::new(0.0, 0.0, w, h), img);
        }

        // 3. Decorative orbs along a diagonal, shrinking and fading.
        for i in 0..ORB_COUNT {
            let radius = (w / (4.0 + i as f64 * 2.0)) * 0.8;
            let x = w * 0.3 + i as f64 * radius * 0.8;
            let y = h * (0.6 - i as f64 * 0.05);
            let diameter = (radius * 2.0).ceil().max(1.0) as u32;

            let key = OrbKey {
                accent,
                diameter,
                orb: i as u8,
            };
            if !orb_cache.contains_key(&key) {
                let alpha = 0.5 / (i as f32 + 1.0);
                let bytes = radial_gradient_premul(
                    diameter,
                    0.2,
                    accent.with_opacity(alpha),
                    BASE.with_opacity(0.0),
                );
                orb_cache.insert(key, premul_image(&bytes, diameter, diameter)?);
            }
            if let Some(img) = orb_cache.get(&key) {
                pass.fill_circle_image(Circle::new((x, y), radius), img);
            }
        }

        draw_badge(&mut pass, shaper, ctx, w);
        draw_body(&mut pass, shaper, ctx, w, h);
        draw_progress(&mut pass, ctx, w, h)?;

        pass.finish();
        Ok(())
    }
}

/// 4. Filled pill near the top-left carrying `#{index+1}/{total}`.
fn draw_badge(pass: &mut PaintPass<'_>, shaper: &mut TextShaper, ctx: &SlideContext<'_>, w: f64) {
    let badge = Rect::new(w * 0.08, 110.0, w * 0.08 + 160.0, 110.0 + 66.0);
    pass.fill_rounded_rect(badge, 33.0, ctx.item.accent.with_opacity(0.85));

    let style = TextStyle::bold(BADGE_SIZE_PX, BASE);
    let label = format!("#{}/{}", ctx.index + 1, ctx.total);
    if let Some(layout) = shaper.shape_line(&label, &style)
        && let Some(font) = shaper.glyph_font()
    {
        let y = badge.y0 + (badge.height() - f64::from(layout.height())) / 2.0;
        pass.draw_layout(&layout, font, Point::new(badge.x0 + 40.0, y));
    }
}

/// 5 + 6. Translucent body panel with the wrapped title and description.
fn draw_body(
    pass: &mut PaintPass<'_>,
    shaper: &mut TextShaper,
    ctx: &SlideContext<'_>,
    w: f64,
    h: f64,
) {
    let panel = Rect::new(w * 0.08, h * 0.22, w * 0.92, h * 0.82);
    pass.fill_rounded_rect(panel, 40.0, BASE.with_opacity(0.55));

    let origin = Point::new(w * 0.11, h * 0.3);

    let title_style = TextStyle::bold(TITLE_SIZE_PX, TITLE_COLOR);
    let title = ctx.item.title.to_uppercase();
    let title_lines = wrap_text(&title, (w * 0.76) as f32, |s| {
        shaper.measure_width(s, &title_style)
    });
    for (i, line) in title_lines.iter().enumerate() {
        if let Some(layout) = shaper.shape_line(line, &title_style)
            && let Some(font) = shaper.glyph_font()
        {
            let y = origin.y + i as f64 * TITLE_LINE_HEIGHT;
            pass.draw_layout(&layout, font, Point::new(origin.x, y));
        }
    }

    let description_style =
        TextStyle::regular(DESCRIPTION_SIZE_PX, DESCRIPTION_COLOR.with_opacity(0.86));
    let description_lines = wrap_text(&ctx.item.description, (w * 0.72) as f32, |s| {
        shaper.measure_width(s, &description_style)
    });
    // The description block sits below however many title lines wrapped.
    let offset_y = origin.y + title_lines.len() as f64 * TITLE_LINE_HEIGHT + 60.0;
    for (i, line) in description_lines.iter().enumerate() {
        if let Some(layout) = shaper.shape_line(line, &description_style)
            && let Some(font) = shaper.glyph_font()
        {
            let y = offset_y + i as f64 * DESCRIPTION_LINE_HEIGHT;
            pass.draw_layout(&layout, font, Point::new(origin.x, y));
        }
    }
}

/// 7. Sequence progress: translucent track plus a gradient fill whose width
/// encodes `(index + focus) / total`.
fn draw_progress(
    pass: &mut PaintPass<'_>,
    ctx: &SlideContext<'_>,
    w: f64,
    h: f64,
) -> AgjendaResult<()> {
    let bar_width = w * 0.84;
    let bar_height = 16.0;
    let x = w * 0.08;
    let y = h * 0.84;

    let track = Rect::new(x, y, x + bar_width, y + bar_height);
    pass.fill_rounded_rect(track, bar_height / 2.0, SLATE.with_opacity(0.55));

    let total = ctx.total.max(1) as f64;
    let progress = ((ctx.index as f64 + ctx.focus.clamp(0.0, 1.0)) / total).min(1.0);
    let filled_width = bar_width * progress;
    if filled_width < 1.0 {
        return Ok(());
    }

    let fill_w = filled_width.round().max(1.0) as u32;
    let fill_h = bar_height as u32;
    let bytes = linear_gradient_premul(
        fill_w,
        fill_h,
        (0.0, 0.0),
        (fill_w as f32, 0.0),
        BAR_FROM,
        BAR_TO,
    );
    let img = premul_image(&bytes, fill_w, fill_h)?;
    let fill = Rect::new(x, y, x + filled_width, y + bar_height);
    pass.fill_rounded_rect_image(fill, bar_height / 2.0, &img);
    Ok(())
}

/// Rasterize a two-stop linear gradient (straight-alpha stops, premultiplied
/// output). Canvas-style interpolation: channels and alpha lerp together.
fn linear_gradient_premul(
    width: u32,
    height: u32,
    p0: (f32, f32),
    p1: (f32, f32),
    from: Rgba8,
    to: Rgba8,
) -> Vec<u8> {
    let mut bytes = vec![0u8; width as usize * height as usize * 4];
    let dx = p1.0 - p0.0;
    let dy = p1.1 - p0.1;
    let len_sq = (dx * dx + dy * dy).max(f32::EPSILON);

    for y in 0..height {
        for x in 0..width {
            let t = (((x as f32 - p0.0) * dx + (y as f32 - p0.1) * dy) / len_sq).clamp(0.0, 1.0);
            let px = from.lerp(to, t).to_premul();
            let idx = (y as usize * width as usize + x as usize) * 4;
            bytes[idx..idx + 4].copy_from_slice(&px);
        }
    }
    bytes
}

/// Rasterize a radial gradient disc: solid `from` inside `inner_frac` of the
/// radius, interpolating to `to` at the rim, transparent outside.
fn radial_gradient_premul(diameter: u32, inner_frac: f32, from: Rgba8, to: Rgba8) -> Vec<u8> {
    let mut bytes = vec![0u8; diameter as usize * diameter as usize * 4];
    let r = diameter as f32 / 2.0;
    let r0 = r * inner_frac;
    let span = (r - r0).max(f32::EPSILON);

    for y in 0..diameter {
        for x in 0..diameter {
            let dx = x as f32 + 0.5 - r;
            let dy = y as f32 + 0.5 - r;
            let d = (dx * dx + dy * dy).sqrt();
            if d > r {
                continue;
            }
            let t = ((d - r0) / span).clamp(0.0, 1.0);
            let px = from.lerp(to, t).to_premul();
            let idx = (y as usize * diameter as usize + x as usize) * 4;
            bytes[idx..idx + 4].copy_from_slice(&px);
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agenda::AgendaItem;

    fn item(accent: &str) -> AgendaItem {
        AgendaItem::new("Title", "Some description text", 5.0, Rgba8::from_hex(accent))
    }

    fn pixel(frame: &crate::surface::FrameRgba, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * frame.width + x) * 4) as usize;
        [
            frame.data[idx],
            frame.data[idx + 1],
            frame.data[idx + 2],
            frame.data[idx + 3],
        ]
    }

    #[test]
    fn render_produces_fully_opaque_frame() {
        let mut surface = Surface::new(1280, 720).unwrap();
        let mut renderer = SlideRenderer::new(TextShaper::new());
        let item = item("#14b8a6");
        renderer
            .render(
                &mut surface,
                &SlideContext {
                    item: &item,
                    index: 0,
                    total: 2,
                    focus: 0.0,
                },
            )
            .unwrap();

        let frame = surface.frame();
        for (x, y) in [(5, 5), (640, 360), (1275, 715)] {
            assert_eq!(pixel(&frame, x, y)[3], 255, "pixel ({x},{y}) not opaque");
        }
    }

    #[test]
    fn render_tolerates_empty_strings() {
        let mut surface = Surface::new(1280, 720).unwrap();
        let mut renderer = SlideRenderer::new(TextShaper::new());
        let item = AgendaItem::new("x", "y", 5.0, Rgba8::from_hex("#6366f1"));
        let mut blank = item.clone();
        blank.title = String::new();
        blank.description = String::new();
        renderer
            .render(
                &mut surface,
                &SlideContext {
                    item: &blank,
                    index: 0,
                    total: 1,
                    focus: 0.0,
                },
            )
            .unwrap();
    }

    #[test]
    fn progress_fill_appears_up_to_the_expected_width() {
        let mut surface = Surface::new(1280, 720).unwrap();
        let mut renderer = SlideRenderer::new(TextShaper::new());
        let item = item("#14b8a6");
        // (index + focus) / total = 0.25 of the track.
        renderer
            .render(
                &mut surface,
                &SlideContext {
                    item: &item,
                    index: 0,
                    total: 2,
                    focus: 0.5,
                },
            )
            .unwrap();

        let frame = surface.frame();
        let bar_y = (720.0 * 0.84 + 8.0) as u32;

        // Inside the filled quarter: opaque cyan-to-purple gradient.
        let filled = pixel(&frame, 200, bar_y);
        assert_eq!(filled[3], 255);
        assert!(filled[1] > 90, "expected cyan-ish fill, got {filled:?}");
        assert!(filled[2] > 150, "expected cyan-ish fill, got {filled:?}");

        // Past the fill: the translucent slate track over the backdrop.
        let track = pixel(&frame, 800, bar_y);
        assert_ne!(filled, track);
    }

    #[test]
    fn focus_is_clamped_into_unit_range() {
        let mut surface = Surface::new(1280, 720).unwrap();
        let mut renderer = SlideRenderer::new(TextShaper::new());
        let item = item("#f97316");
        // focus > 1 must behave like focus == 1, not overflow the track.
        renderer
            .render(
                &mut surface,
                &SlideContext {
                    item: &item,
                    index: 0,
                    total: 1,
                    focus: 2.5,
                },
            )
            .unwrap();

        let frame = surface.frame();
        let bar_y = (720.0 * 0.84 + 8.0) as u32;
        let right_inside = pixel(&frame, (1280.0 * 0.08 + 1280.0 * 0.84) as u32 - 12, bar_y);
        assert_eq!(right_inside[3], 255);
        // Near the far end the fill approaches the purple stop.
        assert!(right_inside[0] > 100, "expected purple-ish end {right_inside:?}");
    }

    #[test]
    fn gradient_rasterizers_hit_their_stops() {
        let bytes = linear_gradient_premul(
            4,
            1,
            (0.0, 0.0),
            (3.0, 0.0),
            Rgba8::rgb(0, 0, 0),
            Rgba8::rgb(255, 255, 255),
        );
        assert_eq!(&bytes[0..4], &[0, 0, 0, 255]);
        assert_eq!(&bytes[12..16], &[255, 255, 255, 255]);

        let orb = radial_gradient_premul(8, 0.2, Rgba8::rgb(255, 0, 0), Rgba8::rgba(0, 0, 0, 0));
        // Corner is outside the disc, center is solid.
        assert_eq!(&orb[0..4], &[0, 0, 0, 0]);
        let center = (4usize * 8 + 4) * 4;
        assert!(orb[center + 3] > 0);
    }
}
