use kurbo::{Circle, Point, Rect};

use crate::{
    error::{AgjendaError, AgjendaResult},
    text::TextBrush,
};

/// One read-back frame in row-major RGBA8.
#[derive(Clone, Debug)]
pub struct FrameRgba {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRgba {
    /// Flatten to opaque straight RGBA8 over `bg`, for encoders and image
    /// formats without alpha.
    pub fn to_opaque_rgba8(&self, bg: crate::color::Rgba8) -> Vec<u8> {
        let mut out = vec![0u8; self.data.len()];
        // Length always matches width*height*4 for frames we produce.
        let _ = flatten_to_opaque_rgba8(&mut out, &self.data, self.premultiplied, bg);
        out
    }
}

/// Composite RGBA8 pixels over an opaque background, writing opaque straight
/// RGBA8 into `dst`.
pub(crate) fn flatten_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    src_is_premul: bool,
    bg: crate::color::Rgba8,
) -> AgjendaResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(AgjendaError::validation(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = u16::from(bg.r);
    let bg_g = u16::from(bg.g);
    let bg_b = u16::from(bg.b);

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            d[3] = 255;
            continue;
        }

        let inv = 255u16 - a;

        let (r, g, b) = if src_is_premul {
            (
                u16::from(s[0]) + mul_div255(bg_r, inv),
                u16::from(s[1]) + mul_div255(bg_g, inv),
                u16::from(s[2]) + mul_div255(bg_b, inv),
            )
        } else {
            (
                mul_div255(u16::from(s[0]), a) + mul_div255(bg_r, inv),
                mul_div255(u16::from(s[1]), a) + mul_div255(bg_g, inv),
                mul_div255(u16::from(s[2]), a) + mul_div255(bg_b, inv),
            )
        };

        d[0] = r.min(255) as u8;
        d[1] = g.min(255) as u8;
        d[2] = b.min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// The shared drawing surface: an addressable RGBA8 raster target.
///
/// Painting happens through a [`PaintPass`] that fully overwrites the
/// visible contents; [`Surface::frame`] samples whatever was painted last.
pub struct Surface {
    width: u16,
    height: u16,
    pixmap: vello_cpu::Pixmap,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> AgjendaResult<Self> {
        if width == 0 || height == 0 {
            return Err(AgjendaError::surface_unavailable(
                "surface width/height must be non-zero",
            ));
        }
        let width_u16: u16 = width
            .try_into()
            .map_err(|_| AgjendaError::surface_unavailable("surface width exceeds u16"))?;
        let height_u16: u16 = height
            .try_into()
            .map_err(|_| AgjendaError::surface_unavailable("surface height exceeds u16"))?;

        Ok(Self {
            width: width_u16,
            height: height_u16,
            pixmap: vello_cpu::Pixmap::new(width_u16, height_u16),
        })
    }

    pub fn width(&self) -> u32 {
        u32::from(self.width)
    }

    pub fn height(&self) -> u32 {
        u32::from(self.height)
    }

    /// Start a paint pass. The pass resets the surface; nothing painted
    /// before it survives.
    pub fn begin_frame(&mut self) -> PaintPass<'_> {
        clear_pixmap(&mut self.pixmap, [0, 0, 0, 0]);
        let ctx = vello_cpu::RenderContext::new(self.width, self.height);
        PaintPass { surface: self, ctx }
    }

    /// Sample the current surface contents (premultiplied RGBA8).
    pub fn frame(&self) -> FrameRgba {
        FrameRgba {
            width: self.width(),
            height: self.height(),
            data: self.pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        }
    }
}

/// An in-flight frame paint. Draw calls layer in submission order; `finish`
/// rasterizes them onto the surface.
pub struct PaintPass<'a> {
    surface: &'a mut Surface,
    ctx: vello_cpu::RenderContext,
}

impl PaintPass<'_> {
    pub fn fill_rect(&mut self, rect: Rect, color: crate::color::Rgba8) {
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            color.r, color.g, color.b, color.a,
        ));
        self.ctx.fill_rect(&rect_to_cpu(rect));
    }

    pub fn fill_rounded_rect(&mut self, rect: Rect, radius: f64, color: crate::color::Rgba8) {
        use vello_cpu::kurbo::Shape as _;
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            color.r, color.g, color.b, color.a,
        ));
        let path = vello_cpu::kurbo::RoundedRect::from_rect(rect_to_cpu(rect), radius).to_path(0.1);
        self.ctx.fill_path(&path);
    }

    /// Fill a rounded rect with an image paint whose pixel grid is aligned
    /// to the rect's top-left corner.
    pub fn fill_rounded_rect_image(&mut self, rect: Rect, radius: f64, image: &vello_cpu::Image) {
        use vello_cpu::kurbo::Shape as _;
        self.ctx
            .set_transform(vello_cpu::kurbo::Affine::translate((rect.x0, rect.y0)));
        self.ctx.set_paint(image.clone());
        let local = vello_cpu::kurbo::Rect::new(0.0, 0.0, rect.width(), rect.height());
        let path = vello_cpu::kurbo::RoundedRect::from_rect(local, radius).to_path(0.1);
        self.ctx.fill_path(&path);
    }

    /// Fill the full rect with an image paint aligned to its top-left.
    pub fn fill_rect_image(&mut self, rect: Rect, image: &vello_cpu::Image) {
        self.ctx
            .set_transform(vello_cpu::kurbo::Affine::translate((rect.x0, rect.y0)));
        self.ctx.set_paint(image.clone());
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            rect.width(),
            rect.height(),
        ));
    }

    /// Fill a circle with an image paint aligned to the circle's bounding
    /// box top-left.
    pub fn fill_circle_image(&mut self, circle: Circle, image: &vello_cpu::Image) {
        use vello_cpu::kurbo::Shape as _;
        let r = circle.radius;
        self.ctx.set_transform(vello_cpu::kurbo::Affine::translate((
            circle.center.x - r,
            circle.center.y - r,
        )));
        self.ctx.set_paint(image.clone());
        let path = vello_cpu::kurbo::Circle::new((r, r), r).to_path(0.1);
        self.ctx.fill_path(&path);
    }

    /// Draw a shaped single-line layout with its top-left at `origin`.
    pub fn draw_layout(
        &mut self,
        layout: &parley::Layout<TextBrush>,
        font: &vello_cpu::peniko::FontData,
        origin: Point,
    ) {
        self.ctx
            .set_transform(vello_cpu::kurbo::Affine::translate((origin.x, origin.y)));

        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };

                let brush = run.style().brush;
                self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));

                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                self.ctx
                    .glyph_run(font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }

    /// Rasterize the accumulated draws onto the surface.
    pub fn finish(mut self) {
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut self.surface.pixmap);
    }
}

/// Wrap premultiplied RGBA8 bytes as an image paint.
pub(crate) fn premul_image(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> AgjendaResult<vello_cpu::Image> {
    let w: u16 = width
        .try_into()
        .map_err(|_| AgjendaError::validation("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| AgjendaError::validation("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(AgjendaError::validation(
            "image byte length mismatch with width*height*4",
        ));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(std::sync::Arc::new(
            vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, may_have_opacities),
        )),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap, rgba: [u8; 4]) {
    for px in pixmap.data_as_u8_slice_mut().chunks_exact_mut(4) {
        px.copy_from_slice(&rgba);
    }
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba8;

    #[test]
    fn new_rejects_degenerate_sizes() {
        assert!(Surface::new(0, 720).is_err());
        assert!(Surface::new(1280, 0).is_err());
        assert!(Surface::new(70_000, 720).is_err());
    }

    #[test]
    fn frame_matches_surface_dimensions() {
        let surface = Surface::new(64, 32).unwrap();
        let frame = surface.frame();
        assert_eq!(frame.width, 64);
        assert_eq!(frame.height, 32);
        assert_eq!(frame.data.len(), 64 * 32 * 4);
        assert!(frame.premultiplied);
    }

    #[test]
    fn fill_rect_overwrites_pixels() {
        let mut surface = Surface::new(8, 8).unwrap();
        let mut pass = surface.begin_frame();
        pass.fill_rect(Rect::new(0.0, 0.0, 8.0, 8.0), Rgba8::rgb(255, 0, 0));
        pass.finish();

        let frame = surface.frame();
        let px = &frame.data[0..4];
        assert_eq!(px, &[255, 0, 0, 255]);
    }

    #[test]
    fn begin_frame_resets_previous_contents() {
        let mut surface = Surface::new(8, 8).unwrap();
        let mut pass = surface.begin_frame();
        pass.fill_rect(Rect::new(0.0, 0.0, 8.0, 8.0), Rgba8::rgb(255, 0, 0));
        pass.finish();

        let pass = surface.begin_frame();
        pass.finish();
        let frame = surface.frame();
        assert_eq!(&frame.data[0..4], &[0, 0, 0, 0]);
    }

    #[test]
    fn premul_image_validates_byte_length() {
        assert!(premul_image(&[0u8; 8], 2, 2).is_err());
        assert!(premul_image(&[0u8; 16], 2, 2).is_ok());
    }

    #[test]
    fn flatten_premul_over_black_produces_expected_rgb() {
        // Premultiplied red @ 50% alpha => rgb stays 128,0,0 over black.
        let src = vec![128u8, 0u8, 0u8, 128u8];
        let mut dst = vec![0u8; 4];
        flatten_to_opaque_rgba8(&mut dst, &src, true, Rgba8::rgb(0, 0, 0)).unwrap();
        assert_eq!(dst, vec![128u8, 0u8, 0u8, 255u8]);
    }

    #[test]
    fn flatten_straight_over_black_produces_expected_rgb() {
        // Straight red @ 50% alpha => rgb becomes 128,0,0 over black.
        let src = vec![255u8, 0u8, 0u8, 128u8];
        let mut dst = vec![0u8; 4];
        flatten_to_opaque_rgba8(&mut dst, &src, false, Rgba8::rgb(0, 0, 0)).unwrap();
        assert_eq!(dst, vec![128u8, 0u8, 0u8, 255u8]);
    }

    #[test]
    fn flatten_rejects_mismatched_buffers() {
        let src = vec![0u8; 8];
        let mut dst = vec![0u8; 4];
        assert!(flatten_to_opaque_rgba8(&mut dst, &src, true, Rgba8::rgb(0, 0, 0)).is_err());
    }
}
