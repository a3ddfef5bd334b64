use crate::error::ExportError;
use crate::paginate::PageStrip;
use crate::types::PageGeometry;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;

#[derive(Debug, Clone, Default)]
pub(crate) struct PdfMetadata {
    pub title: Option<String>,
    pub producer: String,
}

/// Assemble page strips into a PDF 1.7 file: one page per strip, each
/// carrying a single DCTDecode image XObject placed inside the margin
/// box. Identical strip bytes (blank filler pages, repeated headers)
/// embed once and are shared by reference.
pub(crate) fn write_pdf(
    pages: &[PageStrip],
    geom: &PageGeometry,
    metadata: &PdfMetadata,
) -> Result<Vec<u8>, ExportError> {
    if pages.is_empty() {
        return Err(ExportError::Pdf("document has no pages".to_string()));
    }
    if !geom.is_valid() {
        return Err(ExportError::Pdf("invalid page geometry".to_string()));
    }

    // Object layout: unique images first, then per page a content stream
    // and a page dict, then the pages tree, catalog, info.
    let mut image_ids: HashMap<[u8; 32], usize> = HashMap::new();
    let mut unique_images: Vec<&PageStrip> = Vec::new();
    let mut page_image_ids = Vec::with_capacity(pages.len());
    for strip in pages {
        let mut hasher = Sha256::new();
        hasher.update(&strip.jpeg);
        let digest: [u8; 32] = hasher.finalize().into();
        let id = *image_ids.entry(digest).or_insert_with(|| {
            unique_images.push(strip);
            unique_images.len()
        });
        page_image_ids.push(id);
    }

    let image_count = unique_images.len();
    let pages_id = image_count + pages.len() * 2 + 1;
    let catalog_id = pages_id + 1;
    let info_id = catalog_id + 1;
    let max_id = info_id;

    let page_w_pt = geom.page_width_pt().to_f32();
    let page_h_pt = geom.page_height_pt().to_f32();
    let margin_pt = crate::types::Pt::from_mm(geom.margin_mm).to_f32();

    let mut bodies: Vec<Vec<u8>> = vec![Vec::new(); max_id + 1];

    for (idx, strip) in unique_images.iter().enumerate() {
        let id = idx + 1;
        let mut body = Vec::with_capacity(strip.jpeg.len() + 160);
        let _ = write!(
            body,
            "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
             /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /DCTDecode /Length {} >>\nstream\n",
            strip.width_px,
            strip.height_px,
            strip.jpeg.len()
        );
        body.extend_from_slice(&strip.jpeg);
        body.extend_from_slice(b"\nendstream");
        bodies[id] = body;
    }

    let mut kids = String::new();
    for (page_idx, strip) in pages.iter().enumerate() {
        let image_id = page_image_ids[page_idx];
        let content_id = image_count + page_idx * 2 + 1;
        let page_id = content_id + 1;

        let img_w_pt = mm_to_pt(strip.width_mm);
        let img_h_pt = mm_to_pt(strip.height_mm);
        let x_pt = margin_pt + mm_to_pt(strip.x_offset_mm);
        // PDF origin is bottom-left; the image top sits at the top margin.
        let y_pt = page_h_pt - margin_pt - img_h_pt;

        let content = format!(
            "q\n{:.2} 0 0 {:.2} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
            img_w_pt, img_h_pt, x_pt, y_pt, image_id
        );
        let mut body = Vec::with_capacity(content.len() + 64);
        let _ = write!(body, "<< /Length {} >>\nstream\n{}endstream", content.len(), content);
        bodies[content_id] = body;

        let mut page = Vec::with_capacity(192);
        let _ = write!(
            page,
            "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {:.2} {:.2}] \
             /Resources << /XObject << /Im{} {} 0 R >> >> /Contents {} 0 R >>",
            pages_id, page_w_pt, page_h_pt, image_id, image_id, content_id
        );
        bodies[page_id] = page;
        kids.push_str(&format!("{} 0 R ", page_id));
    }

    let mut pages_body = Vec::with_capacity(kids.len() + 64);
    let _ = write!(
        pages_body,
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.trim_end(),
        pages.len()
    );
    bodies[pages_id] = pages_body;

    let mut catalog = Vec::with_capacity(64);
    let _ = write!(catalog, "<< /Type /Catalog /Pages {} 0 R >>", pages_id);
    bodies[catalog_id] = catalog;

    let mut info = Vec::with_capacity(128);
    info.extend_from_slice(b"<< ");
    if !metadata.producer.is_empty() {
        let _ = write!(info, "/Producer {} ", pdf_text_string(&metadata.producer));
    }
    if let Some(title) = metadata.title.as_deref() {
        let _ = write!(info, "/Title {} ", pdf_text_string(title));
    }
    info.extend_from_slice(b">>");
    bodies[info_id] = info;

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n");
    let mut offsets = vec![0usize; max_id + 1];
    for id in 1..=max_id {
        offsets[id] = out.len();
        let _ = write!(out, "{} 0 obj\n", id);
        out.extend_from_slice(&bodies[id]);
        out.extend_from_slice(b"\nendobj\n");
    }
    let xref_start = out.len();
    let _ = write!(out, "xref\n0 {}\n", max_id + 1);
    out.extend_from_slice(b"0000000000 65535 f \n");
    for id in 1..=max_id {
        let _ = write!(out, "{:010} 00000 n \n", offsets[id]);
    }
    let _ = write!(
        out,
        "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
        max_id + 1,
        catalog_id,
        info_id,
        xref_start
    );
    Ok(out)
}

fn mm_to_pt(mm: f64) -> f32 {
    (mm * 72.0 / 25.4) as f32
}

/// Literal string for ASCII, UTF-16BE hex string (BOM-prefixed) for
/// anything else — document titles are usually Korean.
fn pdf_text_string(raw: &str) -> String {
    if raw.is_ascii() {
        let mut out = String::with_capacity(raw.len() + 2);
        out.push('(');
        for ch in raw.chars() {
            match ch {
                '(' | ')' | '\\' => {
                    out.push('\\');
                    out.push(ch);
                }
                _ => out.push(ch),
            }
        }
        out.push(')');
        out
    } else {
        let mut out = String::from("<FEFF");
        for unit in raw.encode_utf16() {
            out.push_str(&format!("{unit:04X}"));
        }
        out.push('>');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paginate::PageStrip;

    fn strip(height_mm: f64, payload: u8) -> PageStrip {
        PageStrip {
            jpeg: vec![0xFF, 0xD8, payload, 0xFF, 0xD9],
            width_px: 10,
            height_px: 10,
            width_mm: 190.0,
            height_mm,
            x_offset_mm: 0.0,
        }
    }

    fn meta() -> PdfMetadata {
        PdfMetadata {
            title: Some("발주서".to_string()),
            producer: "docpress".to_string(),
        }
    }

    #[test]
    fn empty_page_list_is_rejected() {
        let err = write_pdf(&[], &PageGeometry::a4(10.0), &meta()).expect_err("empty");
        assert!(matches!(err, ExportError::Pdf(_)));
    }

    #[test]
    fn produced_bytes_parse_with_expected_page_count() {
        let pages = vec![strip(277.0, 1), strip(100.0, 2), strip(50.0, 3)];
        let bytes = write_pdf(&pages, &PageGeometry::a4(10.0), &meta()).expect("pdf");
        assert!(bytes.starts_with(b"%PDF-1.7"));
        let doc = lopdf::Document::load_mem(&bytes).expect("parse own output");
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn identical_strips_share_one_image_object() {
        let pages = vec![strip(100.0, 7), strip(100.0, 7), strip(100.0, 7)];
        let bytes = write_pdf(&pages, &PageGeometry::a4(10.0), &meta()).expect("pdf");
        let haystack = bytes.as_slice();
        let needle = b"/Subtype /Image";
        let count = haystack
            .windows(needle.len())
            .filter(|w| *w == needle)
            .count();
        assert_eq!(count, 1, "duplicate strips must dedupe to one XObject");
        let doc = lopdf::Document::load_mem(&bytes).expect("parse");
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn distinct_strips_embed_separately() {
        let pages = vec![strip(100.0, 1), strip(100.0, 2)];
        let bytes = write_pdf(&pages, &PageGeometry::a4(10.0), &meta()).expect("pdf");
        let needle = b"/Subtype /Image";
        let count = bytes
            .windows(needle.len())
            .filter(|w| *w == needle)
            .count();
        assert_eq!(count, 2);
    }

    #[test]
    fn korean_title_becomes_utf16_hex_string() {
        assert_eq!(pdf_text_string("abc"), "(abc)");
        assert_eq!(pdf_text_string("a(b)"), "(a\\(b\\))");
        let hex = pdf_text_string("발");
        assert!(hex.starts_with("<FEFF"));
        assert!(hex.ends_with('>'));
        assert_eq!(hex.len(), "<FEFF>".len() + 4);
    }

    #[test]
    fn media_box_matches_a4_points() {
        let pages = vec![strip(100.0, 1)];
        let bytes = write_pdf(&pages, &PageGeometry::a4(10.0), &meta()).expect("pdf");
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/MediaBox [0 0 595.28 841.89]"));
    }
}
