use crate::debug::DebugLogger;
use crate::error::ExportError;
use crate::font::FontRegistry;
use crate::layout::{DisplayList, PaintCmd};
use crate::types::Color;
use rustybuzz::{Face as HbFace, UnicodeBuffer};
use tiny_skia::{
    FillRule, FilterQuality, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke,
    Transform,
};
use ttf_parser::{GlyphId, OutlineBuilder};

const MAX_RASTER_PIXELS: u64 = 268_435_456; // 256 MPx hard cap

/// Paint a laid-out display list into a fresh RGBA pixmap at the given
/// pixel density. The pixmap is scratch state owned by this call; the
/// caller consumes it and nothing survives the return.
pub(crate) fn raster_display_list(
    list: &DisplayList,
    scale: f32,
    fonts: &FontRegistry,
    debug: Option<&DebugLogger>,
) -> Result<Pixmap, ExportError> {
    let scale = if scale.is_finite() { scale.max(1.0) } else { 1.0 };
    let width_px = (list.width * scale).ceil().max(1.0) as u32;
    let height_px = (list.height * scale).ceil().max(1.0) as u32;
    if (width_px as u64) * (height_px as u64) > MAX_RASTER_PIXELS {
        return Err(ExportError::Raster(format!(
            "raster size {}x{} exceeds pixel budget",
            width_px, height_px
        )));
    }
    let mut pixmap = Pixmap::new(width_px, height_px).ok_or_else(|| {
        ExportError::Raster(format!("invalid raster size {}x{}", width_px, height_px))
    })?;
    pixmap.fill(tiny_skia::Color::from_rgba8(255, 255, 255, 255));

    let mut skipped_text = 0u64;
    for cmd in &list.cmds {
        match cmd {
            PaintCmd::Rect { x, y, w, h, color } => {
                fill_device_rect(
                    &mut pixmap,
                    x * scale,
                    y * scale,
                    w * scale,
                    h * scale,
                    *color,
                );
            }
            PaintCmd::Text {
                x,
                baseline,
                text,
                font_size,
                bold,
                color,
            } => {
                let drew = draw_text(
                    &mut pixmap,
                    fonts,
                    text,
                    x * scale,
                    baseline * scale,
                    font_size * scale,
                    *bold,
                    *color,
                );
                if !drew {
                    skipped_text += 1;
                }
            }
            PaintCmd::Image { x, y, w, h, data } => {
                draw_image(
                    &mut pixmap,
                    data,
                    x * scale,
                    y * scale,
                    w * scale,
                    h * scale,
                );
            }
        }
    }

    if let Some(debug) = debug {
        if skipped_text > 0 {
            debug.increment("raster.text_skipped_no_font", skipped_text);
        }
        debug.event(
            "raster.capture",
            &[
                ("width_px", width_px.to_string()),
                ("height_px", height_px.to_string()),
                ("commands", list.cmds.len().to_string()),
            ],
        );
    }

    Ok(pixmap)
}

fn fill_device_rect(pixmap: &mut Pixmap, x: f32, y: f32, w: f32, h: f32, color: Color) {
    // Sub-pixel hairlines (1px borders at any scale) still get at least
    // one device pixel.
    let w = w.max(1.0);
    let h = h.max(1.0);
    let Some(rect) = Rect::from_xywh(x, y, w, h) else {
        return;
    };
    let mut paint = Paint::default();
    paint.set_color(to_sk_color(color));
    paint.anti_alias = false;
    pixmap.fill_rect(rect, &paint, Transform::identity(), None);
}

struct GlyphPlacement {
    glyph_id: u16,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

#[allow(clippy::too_many_arguments)]
fn draw_text(
    pixmap: &mut Pixmap,
    fonts: &FontRegistry,
    text: &str,
    baseline_x: f32,
    baseline_y: f32,
    font_size: f32,
    bold: bool,
    color: Color,
) -> bool {
    let Some(font) = fonts.select(bold) else {
        return false;
    };
    let placements = layout_text_glyphs(&font.data, text, font_size, baseline_x, baseline_y);
    if placements.is_empty() {
        return false;
    }
    let Ok(face) = ttf_parser::Face::parse(&font.data, 0) else {
        return false;
    };

    let mut paint = Paint::default();
    paint.set_color(to_sk_color(color));
    paint.anti_alias = true;
    // Requested-bold text on a regular face gets a thin synthetic stroke.
    let synthetic_stroke = if bold && !font.bold {
        Some(Stroke {
            width: (font_size * 0.035).max(0.3),
            ..Stroke::default()
        })
    } else {
        None
    };

    let mut drew = false;
    for placement in &placements {
        let mut builder =
            GlyphPathBuilder::new(placement.origin_x, placement.origin_y, placement.scale);
        if face
            .outline_glyph(GlyphId(placement.glyph_id), &mut builder)
            .is_none()
        {
            continue;
        }
        let Some(path) = builder.finish() else {
            continue;
        };
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        if let Some(stroke) = &synthetic_stroke {
            pixmap.stroke_path(&path, &paint, stroke, Transform::identity(), None);
        }
        drew = true;
    }
    drew
}

fn layout_text_glyphs(
    font_data: &[u8],
    text: &str,
    font_size: f32,
    baseline_x: f32,
    baseline_y: f32,
) -> Vec<GlyphPlacement> {
    let Some(face) = HbFace::from_slice(font_data, 0) else {
        return Vec::new();
    };
    let units_per_em = face.units_per_em().max(1) as f32;
    let scale = font_size / units_per_em;
    let mut buffer = UnicodeBuffer::new();
    buffer.push_str(text);
    let output = rustybuzz::shape(&face, &[], buffer);
    let infos = output.glyph_infos();
    let positions = output.glyph_positions();
    if infos.is_empty() || infos.len() != positions.len() {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(infos.len());
    let mut pen_x = 0.0f32;
    for (info, pos) in infos.iter().zip(positions.iter()) {
        let gid = info.glyph_id as u16;
        let x_off = (pos.x_offset as f32 / units_per_em) * font_size;
        let y_off = (pos.y_offset as f32 / units_per_em) * font_size;
        if gid != 0 {
            out.push(GlyphPlacement {
                glyph_id: gid,
                origin_x: baseline_x + pen_x + x_off,
                // Device space is y-down; glyph offsets are y-up.
                origin_y: baseline_y - y_off,
                scale,
            });
        }
        pen_x += (pos.x_advance as f32 / units_per_em) * font_size;
    }
    out
}

struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn finish(self) -> Option<Path> {
        self.builder.finish()
    }
}

// Font units are y-up; the pixmap is y-down, hence the negated y terms.
impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.builder.move_to(
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.builder.quad_to(
            self.origin_x + x1 * self.scale,
            self.origin_y - y1 * self.scale,
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.builder.cubic_to(
            self.origin_x + x1 * self.scale,
            self.origin_y - y1 * self.scale,
            self.origin_x + x2 * self.scale,
            self.origin_y - y2 * self.scale,
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

fn draw_image(pixmap: &mut Pixmap, data: &[u8], x: f32, y: f32, w: f32, h: f32) {
    let Some(source) = decode_to_pixmap(data) else {
        return;
    };
    let src_w = source.width() as f32;
    let src_h = source.height() as f32;
    if src_w <= 0.0 || src_h <= 0.0 || w <= 0.0 || h <= 0.0 {
        return;
    }
    let transform = Transform::from_row(w / src_w, 0.0, 0.0, h / src_h, x, y);
    let mut paint = PixmapPaint::default();
    paint.quality = FilterQuality::Bilinear;
    pixmap.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
}

fn decode_to_pixmap(data: &[u8]) -> Option<Pixmap> {
    let decoded = image::load_from_memory(data).ok()?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixmap = Pixmap::new(width, height)?;
    let src = rgba.as_raw();
    let dst = pixmap.data_mut();
    for (src_px, dst_px) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let a = src_px[3];
        dst_px[0] = premul_u8(src_px[0], a);
        dst_px[1] = premul_u8(src_px[1], a);
        dst_px[2] = premul_u8(src_px[2], a);
        dst_px[3] = a;
    }
    Some(pixmap)
}

fn premul_u8(channel: u8, alpha: u8) -> u8 {
    let prod = (channel as u16) * (alpha as u16) + 127;
    ((prod + (prod >> 8)) >> 8) as u8
}

fn to_sk_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba(
        color.r.clamp(0.0, 1.0),
        color.g.clamp(0.0, 1.0),
        color.b.clamp(0.0, 1.0),
        1.0,
    )
    .unwrap_or_else(|| tiny_skia::Color::from_rgba8(0, 0, 0, 255))
}

/// Flatten premultiplied RGBA to tightly packed RGB. All pipeline
/// content is opaque over a white base, so alpha is already 255.
pub(crate) fn pixmap_to_rgb(pixmap: &Pixmap) -> Vec<u8> {
    let data = pixmap.data();
    let mut rgb = Vec::with_capacity((data.len() / 4) * 3);
    for px in data.chunks_exact(4) {
        rgb.push(px[0]);
        rgb.push(px[1]);
        rgb.push(px[2]);
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::DisplayList;

    fn solid_rect_list(w: f32, h: f32) -> DisplayList {
        DisplayList {
            width: w,
            height: h,
            cmds: vec![PaintCmd::Rect {
                x: 1.0,
                y: 1.0,
                w: 2.0,
                h: 2.0,
                color: Color::BLACK,
            }],
        }
    }

    fn pixel(pixmap: &Pixmap, x: u32, y: u32) -> (u8, u8, u8, u8) {
        let idx = ((y * pixmap.width() + x) * 4) as usize;
        let data = pixmap.data();
        (data[idx], data[idx + 1], data[idx + 2], data[idx + 3])
    }

    #[test]
    fn scale_multiplies_pixel_dimensions() {
        let fonts = FontRegistry::new();
        let list = solid_rect_list(10.0, 20.0);
        let one = raster_display_list(&list, 1.0, &fonts, None).expect("1x");
        let two = raster_display_list(&list, 2.0, &fonts, None).expect("2x");
        assert_eq!((one.width(), one.height()), (10, 20));
        assert_eq!((two.width(), two.height()), (20, 40));
    }

    #[test]
    fn rect_paints_black_over_white_base() {
        let fonts = FontRegistry::new();
        let list = solid_rect_list(10.0, 10.0);
        let pixmap = raster_display_list(&list, 2.0, &fonts, None).expect("raster");
        assert_eq!(pixel(&pixmap, 0, 0), (255, 255, 255, 255));
        assert_eq!(pixel(&pixmap, 3, 3), (0, 0, 0, 255));
    }

    #[test]
    fn text_without_fonts_degrades_to_blank_capture() {
        let fonts = FontRegistry::new();
        let list = DisplayList {
            width: 50.0,
            height: 20.0,
            cmds: vec![PaintCmd::Text {
                x: 2.0,
                baseline: 12.0,
                text: "발주서".to_string(),
                font_size: 12.0,
                bold: false,
                color: Color::BLACK,
            }],
        };
        let pixmap = raster_display_list(&list, 2.0, &fonts, None).expect("raster");
        assert!(pixmap.data().chunks_exact(4).all(|px| px[0] == 255));
    }

    #[test]
    fn oversized_raster_is_rejected() {
        let fonts = FontRegistry::new();
        let list = solid_rect_list(40_000.0, 40_000.0);
        let err = raster_display_list(&list, 1.0, &fonts, None).expect_err("must exceed budget");
        assert!(matches!(err, ExportError::Raster(_)));
    }

    #[test]
    fn data_uri_image_pixels_land_in_output() {
        let mut source = image::RgbaImage::new(1, 1);
        source.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        let mut png = std::io::Cursor::new(Vec::new());
        source
            .write_to(&mut png, image::ImageFormat::Png)
            .expect("encode png");
        let list = DisplayList {
            width: 10.0,
            height: 10.0,
            cmds: vec![PaintCmd::Image {
                x: 0.0,
                y: 0.0,
                w: 4.0,
                h: 4.0,
                data: std::sync::Arc::new(png.into_inner()),
            }],
        };
        let fonts = FontRegistry::new();
        let pixmap = raster_display_list(&list, 1.0, &fonts, None).expect("raster");
        let (r, g, b, _) = {
            let idx = 0usize;
            let data = pixmap.data();
            (data[idx], data[idx + 1], data[idx + 2], data[idx + 3])
        };
        assert!(r > 200 && g < 60 && b < 60, "got {r},{g},{b}");
    }

    #[test]
    fn rgb_flattening_drops_alpha_only() {
        let mut pixmap = Pixmap::new(2, 1).expect("pixmap");
        pixmap.fill(tiny_skia::Color::from_rgba8(10, 20, 30, 255));
        let rgb = pixmap_to_rgb(&pixmap);
        assert_eq!(rgb, vec![10, 20, 30, 10, 20, 30]);
    }
}
