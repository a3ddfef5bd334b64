use fixed::types::I32F32;

pub const MM_PER_PT: f32 = 25.4 / 72.0;

/// Typographic point (1/72 in), fixed-point so page geometry converts
/// identically across platforms. Values are quantized to 1/1000 pt on
/// entry; the pipeline only ever converts millimetre geometry into
/// points for the PDF writer, so no arithmetic happens in point space.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Pt(I32F32);

impl Pt {
    pub const ZERO: Pt = Pt(I32F32::from_bits(0));

    pub fn from_f32(value: f32) -> Pt {
        if !value.is_finite() {
            return Pt::ZERO;
        }
        let quantized = (value as f64 * 1000.0).round() / 1000.0;
        Pt(I32F32::from_num(quantized))
    }

    pub fn from_mm(value: f32) -> Pt {
        Pt::from_f32(value / MM_PER_PT)
    }

    pub fn to_f32(self) -> f32 {
        self.0.to_num()
    }

    pub fn to_milli_i64(self) -> i64 {
        (self.0.to_num::<f64>() * 1000.0).round() as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }
}

/// Physical page layout in millimetres. The compositor slices raster
/// content against `content_height_mm`, and the PDF writer places page
/// images inside the margin box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_mm: f32,
}

impl PageGeometry {
    pub fn a4(margin_mm: f32) -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_mm,
        }
    }

    pub fn content_width_mm(&self) -> f32 {
        (self.page_width_mm - self.margin_mm * 2.0).max(0.0)
    }

    pub fn content_height_mm(&self) -> f32 {
        (self.page_height_mm - self.margin_mm * 2.0).max(0.0)
    }

    pub fn page_width_pt(&self) -> Pt {
        Pt::from_mm(self.page_width_mm)
    }

    pub fn page_height_pt(&self) -> Pt {
        Pt::from_mm(self.page_height_mm)
    }

    pub fn is_valid(&self) -> bool {
        self.page_width_mm > 0.0
            && self.page_height_mm > 0.0
            && self.margin_mm >= 0.0
            && self.content_width_mm() > 0.0
            && self.content_height_mm() > 0.0
    }
}
