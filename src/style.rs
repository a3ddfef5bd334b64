use crate::types::Color;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BorderEdge {
    pub width: f32,
    pub color: Color,
}

impl BorderEdge {
    pub fn none() -> Self {
        Self {
            width: 0.0,
            color: Color::BLACK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Borders {
    pub top: BorderEdge,
    pub right: BorderEdge,
    pub bottom: BorderEdge,
    pub left: BorderEdge,
}

impl Borders {
    pub fn none() -> Self {
        Self {
            top: BorderEdge::none(),
            right: BorderEdge::none(),
            bottom: BorderEdge::none(),
            left: BorderEdge::none(),
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left.width + self.right.width
    }

    pub fn vertical(&self) -> f32 {
        self.top.width + self.bottom.width
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) enum DimensionSpec {
    #[default]
    Auto,
    Px(f32),
    Percent(f32),
}

/// Style resolved to concrete values before painting. Colors are always
/// explicit: text defaults to black and the page composites over white,
/// so no raster backend can drop transparent or inherited colors into
/// invisible output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ComputedStyle {
    pub font_size: f32,
    pub bold: bool,
    pub color: Color,
    pub background: Option<Color>,
    pub text_align: TextAlign,
    pub line_height: f32,
    pub padding: Edges,
    pub margin: Edges,
    pub border: Borders,
    pub width: DimensionSpec,
    pub min_height: Option<f32>,
    pub middle: bool,
}

impl ComputedStyle {
    pub fn root(font_size: f32, line_height: f32) -> Self {
        Self {
            font_size,
            bold: false,
            color: Color::BLACK,
            background: None,
            text_align: TextAlign::Left,
            line_height,
            padding: Edges::zero(),
            margin: Edges::zero(),
            border: Borders::none(),
            width: DimensionSpec::Auto,
            min_height: None,
            middle: false,
        }
    }

    /// Child style: inherited text properties carry over, box properties
    /// reset.
    pub fn inherit(&self) -> Self {
        Self {
            font_size: self.font_size,
            bold: self.bold,
            color: self.color,
            background: None,
            text_align: self.text_align,
            line_height: self.line_height,
            padding: Edges::zero(),
            margin: Edges::zero(),
            border: Borders::none(),
            width: DimensionSpec::Auto,
            min_height: None,
            middle: false,
        }
    }
}

/// User-agent defaults for the tags the templates use. Heading margins
/// are in ems of the inherited size; explicit declarations override
/// per edge afterwards.
pub(crate) fn apply_tag_defaults(style: &mut ComputedStyle, tag: &str) {
    let em = style.font_size;
    match tag {
        "h1" => {
            style.font_size = em * 2.0;
            style.bold = true;
            style.margin.top = em * 0.67 * 2.0;
            style.margin.bottom = em * 0.67 * 2.0;
        }
        "h2" => {
            style.font_size = em * 1.5;
            style.bold = true;
            style.margin.top = em * 0.83 * 1.5;
            style.margin.bottom = em * 0.83 * 1.5;
        }
        "h3" => {
            style.font_size = em * 1.17;
            style.bold = true;
            style.margin.top = em * 1.17;
            style.margin.bottom = em * 1.17;
        }
        "h4" => {
            style.font_size = em;
            style.bold = true;
            style.margin.top = em * 1.33;
            style.margin.bottom = em * 1.33;
        }
        "p" => {
            style.margin.top = em;
            style.margin.bottom = em;
        }
        "th" => {
            style.bold = true;
            style.text_align = TextAlign::Center;
        }
        _ => {}
    }
}

/// Apply one inline `style="..."` attribute on top of a computed style.
/// Unknown properties and malformed values are ignored, matching how a
/// browser treats them.
pub(crate) fn apply_declarations(style: &mut ComputedStyle, raw: &str) {
    for decl in raw.split(';') {
        let Some((name, value)) = decl.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim().trim_end_matches("!important").trim();
        if value.is_empty() {
            continue;
        }
        match name.as_str() {
            "font-size" => {
                if let Some(px) = parse_px(value) {
                    style.font_size = px;
                }
            }
            "font-weight" => style.bold = parse_bold(value),
            "line-height" => {
                if let Ok(v) = value.parse::<f32>() {
                    if v.is_finite() && v > 0.0 {
                        style.line_height = v;
                    }
                } else if let Some(px) = parse_px(value) {
                    if style.font_size > 0.0 {
                        style.line_height = px / style.font_size;
                    }
                }
            }
            "color" => {
                if let Some((color, alpha)) = parse_color(value) {
                    if alpha > 0.0 {
                        style.color = color;
                    }
                }
            }
            "background-color" | "background" => match parse_color(value) {
                Some((color, alpha)) if alpha > 0.0 => style.background = Some(color),
                Some(_) => style.background = None,
                None => {}
            },
            "text-align" => match value.to_ascii_lowercase().as_str() {
                "center" => style.text_align = TextAlign::Center,
                "right" => style.text_align = TextAlign::Right,
                "left" => style.text_align = TextAlign::Left,
                _ => {}
            },
            "vertical-align" => {
                style.middle = value.eq_ignore_ascii_case("middle");
            }
            "padding" => {
                if let Some(edges) = parse_edge_shorthand(value) {
                    style.padding = edges;
                }
            }
            "padding-top" => set_px(&mut style.padding.top, value),
            "padding-right" => set_px(&mut style.padding.right, value),
            "padding-bottom" => set_px(&mut style.padding.bottom, value),
            "padding-left" => set_px(&mut style.padding.left, value),
            "margin" => {
                if let Some(edges) = parse_edge_shorthand(value) {
                    style.margin = edges;
                }
            }
            "margin-top" => set_px(&mut style.margin.top, value),
            "margin-right" => set_px(&mut style.margin.right, value),
            "margin-bottom" => set_px(&mut style.margin.bottom, value),
            "margin-left" => set_px(&mut style.margin.left, value),
            "border" => {
                if let Some(edge) = parse_border_edge(value) {
                    style.border = Borders {
                        top: edge,
                        right: edge,
                        bottom: edge,
                        left: edge,
                    };
                }
            }
            "border-top" => {
                if let Some(edge) = parse_border_edge(value) {
                    style.border.top = edge;
                }
            }
            "border-right" => {
                if let Some(edge) = parse_border_edge(value) {
                    style.border.right = edge;
                }
            }
            "border-bottom" => {
                if let Some(edge) = parse_border_edge(value) {
                    style.border.bottom = edge;
                }
            }
            "border-left" => {
                if let Some(edge) = parse_border_edge(value) {
                    style.border.left = edge;
                }
            }
            _ => {}
        }
    }

    let (width, height) = inline_dimensions(raw);
    if !matches!(width, DimensionSpec::Auto) {
        style.width = width;
    }
    if let DimensionSpec::Px(px) = height {
        style.min_height = Some(px);
    }
}

/// Width/height from the style attribute via the CSS parser; everything
/// else above is a closed template vocabulary handled directly.
fn inline_dimensions(style: &str) -> (DimensionSpec, DimensionSpec) {
    let style_attr = match lightningcss::stylesheet::StyleAttribute::parse(
        style,
        lightningcss::stylesheet::ParserOptions::default(),
    ) {
        Ok(value) => value,
        Err(_) => return (DimensionSpec::Auto, DimensionSpec::Auto),
    };
    let mut width = DimensionSpec::Auto;
    let mut height = DimensionSpec::Auto;
    for prop in style_attr.declarations.declarations.iter() {
        match prop {
            lightningcss::properties::Property::Width(size) => {
                width = size_to_spec(size);
            }
            lightningcss::properties::Property::Height(size) => {
                height = size_to_spec(size);
            }
            _ => {}
        }
    }
    for prop in style_attr.declarations.important_declarations.iter() {
        match prop {
            lightningcss::properties::Property::Width(size) => {
                width = size_to_spec(size);
            }
            lightningcss::properties::Property::Height(size) => {
                height = size_to_spec(size);
            }
            _ => {}
        }
    }
    (width, height)
}

fn size_to_spec(size: &lightningcss::properties::size::Size) -> DimensionSpec {
    match size {
        lightningcss::properties::size::Size::LengthPercentage(value) => match value {
            lightningcss::values::length::LengthPercentage::Dimension(length) => length
                .to_px()
                .map(DimensionSpec::Px)
                .unwrap_or(DimensionSpec::Auto),
            lightningcss::values::length::LengthPercentage::Percentage(pct) => {
                DimensionSpec::Percent(pct.0 * 100.0)
            }
            _ => DimensionSpec::Auto,
        },
        _ => DimensionSpec::Auto,
    }
}

fn set_px(slot: &mut f32, value: &str) {
    if let Some(px) = parse_px(value) {
        *slot = px;
    }
}

fn parse_px(value: &str) -> Option<f32> {
    let value = value.trim();
    if value == "0" {
        return Some(0.0);
    }
    let number = value.strip_suffix("px")?.trim();
    let parsed = number.parse::<f32>().ok()?;
    if parsed.is_finite() && parsed >= 0.0 {
        Some(parsed)
    } else {
        None
    }
}

fn parse_bold(value: &str) -> bool {
    match value.to_ascii_lowercase().as_str() {
        "bold" | "bolder" => true,
        "normal" | "lighter" => false,
        other => other.parse::<u32>().map(|w| w >= 600).unwrap_or(false),
    }
}

/// 1-4 value padding/margin shorthand; `auto` counts as zero.
fn parse_edge_shorthand(value: &str) -> Option<Edges> {
    let parts: Vec<f32> = value
        .split_whitespace()
        .map(|part| {
            if part.eq_ignore_ascii_case("auto") {
                Some(0.0)
            } else {
                parse_px(part)
            }
        })
        .collect::<Option<Vec<f32>>>()?;
    match parts.as_slice() {
        [all] => Some(Edges {
            top: *all,
            right: *all,
            bottom: *all,
            left: *all,
        }),
        [vertical, horizontal] => Some(Edges {
            top: *vertical,
            right: *horizontal,
            bottom: *vertical,
            left: *horizontal,
        }),
        [top, horizontal, bottom] => Some(Edges {
            top: *top,
            right: *horizontal,
            bottom: *bottom,
            left: *horizontal,
        }),
        [top, right, bottom, left] => Some(Edges {
            top: *top,
            right: *right,
            bottom: *bottom,
            left: *left,
        }),
        _ => None,
    }
}

/// `<width> <style> <color>` border shorthand; only solid borders occur
/// in the templates, so the style token is checked but not kept.
fn parse_border_edge(value: &str) -> Option<BorderEdge> {
    if value.eq_ignore_ascii_case("none") || value == "0" {
        return Some(BorderEdge::none());
    }
    let mut width = None;
    let mut color = None;
    for part in value.split_whitespace() {
        if let Some(px) = parse_px(part) {
            width = Some(px);
        } else if let Some((c, alpha)) = parse_color(part) {
            if alpha > 0.0 {
                color = Some(c);
            }
        }
    }
    Some(BorderEdge {
        width: width?,
        color: color.unwrap_or(Color::BLACK),
    })
}

pub(crate) fn parse_color(raw: &str) -> Option<(Color, f32)> {
    let s = raw.trim().trim_end_matches(',');
    if s.is_empty() {
        return None;
    }
    if let Some(color) = parse_hex_color(s) {
        return Some((color, 1.0));
    }
    let lower = s.to_ascii_lowercase();
    match lower.as_str() {
        "black" => return Some((Color::BLACK, 1.0)),
        "white" => return Some((Color::WHITE, 1.0)),
        "red" => return Some((Color::from_rgb8(255, 0, 0), 1.0)),
        "transparent" => return Some((Color::WHITE, 0.0)),
        _ => {}
    }
    if lower.starts_with("rgb(") || lower.starts_with("rgba(") {
        let inner = lower
            .trim_start_matches("rgba(")
            .trim_start_matches("rgb(")
            .trim_end_matches(')');
        let parts: Vec<&str> = inner.split(',').map(|p| p.trim()).collect();
        if parts.len() < 3 {
            return None;
        }
        let r = parts[0].parse::<f32>().ok()? / 255.0;
        let g = parts[1].parse::<f32>().ok()? / 255.0;
        let b = parts[2].parse::<f32>().ok()? / 255.0;
        let a = if parts.len() >= 4 {
            parts[3].parse::<f32>().ok()?.clamp(0.0, 1.0)
        } else {
            1.0
        };
        return Some((Color::rgb(r, g, b), a));
    }
    None
}

fn parse_hex_color(raw: &str) -> Option<Color> {
    let hex = raw.strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        3 => {
            let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?;
            let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?;
            let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?;
            Some(Color::from_rgb8(r, g, b))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Color::from_rgb8(r, g, b))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styled(raw: &str) -> ComputedStyle {
        let mut style = ComputedStyle::root(12.0, 1.5);
        apply_declarations(&mut style, raw);
        style
    }

    #[test]
    fn parses_template_cell_declarations() {
        let style = styled(
            "border: 1px solid #ddd; padding: 7px; background-color: #f8f9fa; \
             font-weight: bold; width: 15%; vertical-align: middle; height: 35px;",
        );
        assert_eq!(style.border.top.width, 1.0);
        assert_eq!(style.padding.left, 7.0);
        assert!(style.bold);
        assert!(style.middle);
        assert_eq!(style.min_height, Some(35.0));
        assert!(matches!(style.width, DimensionSpec::Percent(p) if (p - 15.0).abs() < 0.01));
        assert_eq!(style.background, Some(Color::from_rgb8(0xf8, 0xf9, 0xfa)));
    }

    #[test]
    fn shorthand_margins_expand_clockwise() {
        let style = styled("margin: 0 0 6px 0;");
        assert_eq!(style.margin.bottom, 6.0);
        assert_eq!(style.margin.top, 0.0);
        let style = styled("margin: 5px 0;");
        assert_eq!(style.margin.top, 5.0);
        assert_eq!(style.margin.right, 0.0);
    }

    #[test]
    fn border_left_accent_only_affects_one_edge() {
        let style = styled("border-left: 4px solid #2563eb; padding-left: 10px;");
        assert_eq!(style.border.left.width, 4.0);
        assert_eq!(style.border.top.width, 0.0);
        assert_eq!(style.border.left.color, Color::from_rgb8(0x25, 0x63, 0xeb));
    }

    #[test]
    fn colors_parse_hex_short_hex_and_rgb() {
        assert_eq!(
            parse_color("#2563eb"),
            Some((Color::from_rgb8(0x25, 0x63, 0xeb), 1.0))
        );
        assert_eq!(parse_color("#fff"), Some((Color::WHITE, 1.0)));
        let (c, a) = parse_color("rgba(0, 0, 0, 0)").expect("rgba");
        assert_eq!(c, Color::BLACK);
        assert_eq!(a, 0.0);
    }

    #[test]
    fn transparent_background_stays_unset() {
        let style = styled("background-color: transparent;");
        assert_eq!(style.background, None);
    }

    #[test]
    fn important_marker_is_tolerated() {
        let style = styled("background-color: #ffffff !important; color: #000000 !important;");
        assert_eq!(style.background, Some(Color::WHITE));
        assert_eq!(style.color, Color::BLACK);
    }

    #[test]
    fn heading_defaults_scale_from_inherited_size() {
        let mut style = ComputedStyle::root(12.0, 1.5).inherit();
        apply_tag_defaults(&mut style, "h1");
        assert!((style.font_size - 24.0).abs() < 0.01);
        assert!(style.bold);
    }
}
