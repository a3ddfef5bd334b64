use crate::error::ExportError;
use rustybuzz::{Face as HbFace, UnicodeBuffer};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct TextWidthKey {
    font_index: Option<usize>,
    size_milli: i64,
    text: String,
}

#[derive(Debug)]
struct TextWidthCache {
    map: HashMap<TextWidthKey, f32>,
    order: VecDeque<TextWidthKey>,
    max_entries: usize,
}

impl TextWidthCache {
    fn new(max_entries: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            max_entries,
        }
    }

    fn get(&mut self, key: &TextWidthKey) -> Option<f32> {
        self.map.get(key).copied()
    }

    fn insert(&mut self, key: TextWidthKey, value: f32) {
        if self.map.contains_key(&key) {
            return;
        }
        self.map.insert(key.clone(), value);
        self.order.push_back(key);
        while self.map.len() > self.max_entries {
            if let Some(old) = self.order.pop_front() {
                self.map.remove(&old);
            } else {
                break;
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct RegisteredFont {
    pub(crate) name: String,
    pub(crate) data: Vec<u8>,
    pub(crate) units_per_em: u16,
    pub(crate) ascent: i16,
    pub(crate) descent: i16,
    pub(crate) bold: bool,
}

impl RegisteredFont {
    pub(crate) fn ascent_px(&self, font_size: f32) -> f32 {
        self.ascent as f32 / self.units_per_em.max(1) as f32 * font_size
    }
}

/// Registered fonts, resolved eagerly and synchronously before any
/// capture. Registration is the readiness signal: once a registry is
/// built there is nothing left to settle, so captures can never race a
/// late-loading face into fallback layout. With no registered face,
/// measurement degrades to deterministic approximate metrics and glyph
/// painting is skipped.
#[derive(Debug)]
pub(crate) struct FontRegistry {
    fonts: Vec<RegisteredFont>,
    width_cache: Mutex<TextWidthCache>,
}

impl FontRegistry {
    pub(crate) fn new() -> Self {
        Self {
            fonts: Vec::new(),
            width_cache: Mutex::new(TextWidthCache::new(20_000)),
        }
    }

    pub(crate) fn register_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let Ok(entries) = fs::read_dir(path) else {
            return;
        };
        let mut files: Vec<_> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        for file in files {
            let _ = self.register_file(file);
        }
    }

    pub(crate) fn register_file(&mut self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let path = path.as_ref();
        let Some(ext) = path.extension().and_then(|v| v.to_str()) else {
            return Ok(());
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" {
            return Ok(());
        }
        let data = fs::read(path)?;
        let source = path
            .file_stem()
            .and_then(|v| v.to_str())
            .unwrap_or("font")
            .to_string();
        self.register_bytes(data, Some(&source)).map(|_| ())
    }

    pub(crate) fn register_bytes(
        &mut self,
        data: Vec<u8>,
        source_name: Option<&str>,
    ) -> Result<String, ExportError> {
        let source = source_name.unwrap_or("EmbeddedFont");
        let Ok(face) = ttf_parser::Face::parse(&data, 0) else {
            return Err(ExportError::Asset(format!(
                "invalid font data for {source}"
            )));
        };
        let name = face
            .names()
            .into_iter()
            .filter(|n| n.name_id == ttf_parser::name::name_id::FULL_NAME)
            .find_map(|n| n.to_string())
            .unwrap_or_else(|| source.to_string());
        let font = RegisteredFont {
            name: name.clone(),
            units_per_em: face.units_per_em().max(1),
            ascent: face.ascender(),
            descent: face.descender(),
            bold: face.is_bold(),
            data,
        };
        self.fonts.push(font);
        Ok(name)
    }

    pub(crate) fn has_fonts(&self) -> bool {
        !self.fonts.is_empty()
    }

    pub(crate) fn font_names(&self) -> Vec<String> {
        self.fonts.iter().map(|f| f.name.clone()).collect()
    }

    /// Registration order is the preference order; a bold request takes
    /// the first bold face and falls back to the first face of any
    /// weight (the rasterizer fakes weight by double-stroking).
    pub(crate) fn select(&self, bold: bool) -> Option<&RegisteredFont> {
        if bold {
            if let Some(font) = self.fonts.iter().find(|f| f.bold) {
                return Some(font);
            }
        } else if let Some(font) = self.fonts.iter().find(|f| !f.bold) {
            return Some(font);
        }
        self.fonts.first()
    }

    fn select_index(&self, bold: bool) -> Option<usize> {
        if bold {
            if let Some(idx) = self.fonts.iter().position(|f| f.bold) {
                return Some(idx);
            }
        } else if let Some(idx) = self.fonts.iter().position(|f| !f.bold) {
            return Some(idx);
        }
        if self.fonts.is_empty() { None } else { Some(0) }
    }

    pub(crate) fn measure_px(&self, text: &str, font_size: f32, bold: bool) -> f32 {
        if text.is_empty() || font_size <= 0.0 {
            return 0.0;
        }
        let font_index = self.select_index(bold);
        let key = TextWidthKey {
            font_index,
            size_milli: (font_size as f64 * 1000.0).round() as i64,
            text: text.to_string(),
        };
        if let Ok(mut cache) = self.width_cache.lock() {
            if let Some(value) = cache.get(&key) {
                return value;
            }
        }
        let value = match font_index.and_then(|idx| self.fonts.get(idx)) {
            Some(font) => shaped_width_px(font, text, font_size)
                .unwrap_or_else(|| approx_width_px(text, font_size)),
            None => approx_width_px(text, font_size),
        };
        if let Ok(mut cache) = self.width_cache.lock() {
            cache.insert(key, value);
        }
        value
    }

    /// Distance from the top of a line box to the text baseline.
    pub(crate) fn baseline_px(&self, font_size: f32, line_height_px: f32, bold: bool) -> f32 {
        let (ascent, descent) = match self.select(bold) {
            Some(font) => {
                let upem = font.units_per_em.max(1) as f32;
                (
                    font.ascent_px(font_size),
                    -font.descent as f32 / upem * font_size,
                )
            }
            None => (font_size * 0.8, font_size * 0.2),
        };
        let leading = (line_height_px - ascent - descent).max(0.0) / 2.0;
        leading + ascent
    }
}

fn shaped_width_px(font: &RegisteredFont, text: &str, font_size: f32) -> Option<f32> {
    let face = HbFace::from_slice(&font.data, 0)?;
    let units_per_em = face.units_per_em().max(1) as f32;
    let mut buffer = UnicodeBuffer::new();
    buffer.push_str(text);
    let output = rustybuzz::shape(&face, &[], buffer);
    let positions = output.glyph_positions();
    if positions.is_empty() {
        return None;
    }
    let mut total_units = 0.0f32;
    for pos in positions {
        total_units += pos.x_advance as f32;
    }
    Some(total_units / units_per_em * font_size)
}

/// Deterministic width approximation for font-less operation: wide
/// (CJK/full-width) glyphs are square, the rest advance at 0.6em.
fn approx_width_px(text: &str, font_size: f32) -> f32 {
    text.chars()
        .map(|ch| {
            if is_wide(ch) {
                font_size
            } else {
                font_size * 0.6
            }
        })
        .sum()
}

/// Hangul, CJK ideographs, full-width forms, and CJK-compat symbols
/// (㎥ and friends) advance a full em and break freely.
pub(crate) fn is_wide(ch: char) -> bool {
    matches!(ch,
        '\u{1100}'..='\u{11FF}'
            | '\u{2E80}'..='\u{303F}'
            | '\u{3130}'..='\u{318F}'
            | '\u{3200}'..='\u{33FF}'
            | '\u{3400}'..='\u{4DBF}'
            | '\u{4E00}'..='\u{9FFF}'
            | '\u{AC00}'..='\u{D7AF}'
            | '\u{F900}'..='\u{FAFF}'
            | '\u{FF00}'..='\u{FF60}'
    )
}
