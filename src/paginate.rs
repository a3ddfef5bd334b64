use crate::error::ExportError;
use crate::raster::pixmap_to_rgb;
use crate::types::PageGeometry;
use image::codecs::jpeg::JpegEncoder;
use rayon::prelude::*;
use tiny_skia::{IntRect, Pixmap};

/// Trailing strips shorter than this produce a near-blank page and are
/// dropped instead.
pub(crate) const MIN_STRIP_MM: f64 = 5.0;

/// One page-sized crop, JPEG-encoded, with its physical placement.
/// `x_offset_mm` is the horizontal inset from the content box used by
/// fit-single sections that had to shrink below full width.
#[derive(Debug, Clone)]
pub(crate) struct PageStrip {
    pub jpeg: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
    pub width_mm: f64,
    pub height_mm: f64,
    pub x_offset_mm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct StripPlan {
    pub y0_px: u32,
    pub height_px: u32,
    pub height_mm: f64,
}

/// Pure slice plan: bitmap rows per page when the bitmap is scaled to
/// the content width. Page count is ceil(H/P), except a trailing sliver
/// below `MIN_STRIP_MM` drops to floor(H/P). Row ranges use a cumulative
/// partition so concatenated crops reconstruct the source bitmap within
/// one pixel row.
pub(crate) fn slice_plan(width_px: u32, height_px: u32, geom: &PageGeometry) -> Vec<StripPlan> {
    if width_px == 0 || height_px == 0 {
        return Vec::new();
    }
    let content_w = geom.content_width_mm() as f64;
    let content_h = geom.content_height_mm() as f64;
    if content_w <= 0.0 || content_h <= 0.0 {
        return Vec::new();
    }
    let scaled_h = height_px as f64 * content_w / width_px as f64;
    if scaled_h <= content_h {
        return vec![StripPlan {
            y0_px: 0,
            height_px,
            height_mm: scaled_h,
        }];
    }

    let px_per_mm = width_px as f64 / content_w;
    let mut plan = Vec::new();
    let mut consumed = 0.0f64;
    while scaled_h - consumed > 1e-9 {
        let strip_mm = (scaled_h - consumed).min(content_h);
        if strip_mm < MIN_STRIP_MM {
            break;
        }
        let y0 = ((consumed * px_per_mm).round() as i64).clamp(0, height_px as i64) as u32;
        let y1 = (((consumed + strip_mm) * px_per_mm).round() as i64)
            .clamp(0, height_px as i64) as u32;
        if y1 <= y0 {
            break;
        }
        plan.push(StripPlan {
            y0_px: y0,
            height_px: y1 - y0,
            height_mm: strip_mm,
        });
        consumed += strip_mm;
    }
    plan
}

/// Flow composition: slice a tall capture into page-height strips. Strip
/// encoding is independent per page and runs in parallel.
pub(crate) fn paginate_flow(
    pixmap: &Pixmap,
    geom: &PageGeometry,
    jpeg_quality: u8,
) -> Result<Vec<PageStrip>, ExportError> {
    let plan = slice_plan(pixmap.width(), pixmap.height(), geom);
    if plan.is_empty() {
        return Err(ExportError::Compose(
            "capture produced no page strips".to_string(),
        ));
    }
    let content_w = geom.content_width_mm() as f64;
    plan.par_iter()
        .map(|strip| {
            let rect = IntRect::from_xywh(
                0,
                strip.y0_px as i32,
                pixmap.width(),
                strip.height_px,
            )
            .ok_or_else(|| {
                ExportError::Compose(format!(
                    "invalid crop rect at row {}",
                    strip.y0_px
                ))
            })?;
            let crop = pixmap.clone_rect(rect).ok_or_else(|| {
                ExportError::Compose(format!("crop failed at row {}", strip.y0_px))
            })?;
            let jpeg = encode_jpeg(&crop, jpeg_quality)?;
            Ok(PageStrip {
                jpeg,
                width_px: crop.width(),
                height_px: crop.height(),
                width_mm: content_w,
                height_mm: strip.height_mm,
                x_offset_mm: 0.0,
            })
        })
        .collect()
}

/// Fit-single composition: the whole capture lands on one page, scaled
/// down proportionally when taller than the content box and centered
/// horizontally at the narrowed width.
pub(crate) fn fit_single_page(
    pixmap: &Pixmap,
    geom: &PageGeometry,
    jpeg_quality: u8,
) -> Result<PageStrip, ExportError> {
    if pixmap.width() == 0 || pixmap.height() == 0 {
        return Err(ExportError::Compose("empty capture".to_string()));
    }
    let content_w = geom.content_width_mm() as f64;
    let content_h = geom.content_height_mm() as f64;
    let scaled_h = pixmap.height() as f64 * content_w / pixmap.width() as f64;
    let (width_mm, height_mm) = if scaled_h > content_h {
        (content_w * content_h / scaled_h, content_h)
    } else {
        (content_w, scaled_h)
    };
    let jpeg = encode_jpeg(pixmap, jpeg_quality)?;
    Ok(PageStrip {
        jpeg,
        width_px: pixmap.width(),
        height_px: pixmap.height(),
        width_mm,
        height_mm,
        x_offset_mm: (content_w - width_mm) / 2.0,
    })
}

fn encode_jpeg(pixmap: &Pixmap, quality: u8) -> Result<Vec<u8>, ExportError> {
    let rgb = pixmap_to_rgb(pixmap);
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    encoder
        .encode(
            &rgb,
            pixmap.width(),
            pixmap.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|err| ExportError::Compose(format!("jpeg encode failed: {err}")))?;
    Ok(out)
}
