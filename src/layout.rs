use crate::font::{FontRegistry, is_wide};
use crate::html::{BlockBox, BoxNode, ImageBox, InlineItem, ParagraphBox, TableBox};
use crate::style::{ComputedStyle, DimensionSpec, TextAlign};
use crate::types::Color;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub(crate) enum PaintCmd {
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Color,
    },
    Text {
        x: f32,
        baseline: f32,
        text: String,
        font_size: f32,
        bold: bool,
        color: Color,
    },
    Image {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        data: Arc<Vec<u8>>,
    },
}

#[derive(Debug)]
pub(crate) struct DisplayList {
    pub width: f32,
    pub height: f32,
    pub cmds: Vec<PaintCmd>,
}

/// Lay out a parsed box tree at a fixed nominal width. The returned list
/// is in CSS pixel space, y-down, origin at the top-left of the root
/// container.
pub(crate) fn layout_document(root: &BlockBox, width: f32, fonts: &FontRegistry) -> DisplayList {
    let mut cmds = Vec::new();
    let height = layout_block(root, 0.0, 0.0, width, fonts, &mut cmds);
    DisplayList {
        width,
        height: height.max(1.0),
        cmds,
    }
}

fn resolve_width(spec: DimensionSpec, available: f32) -> f32 {
    match spec {
        DimensionSpec::Auto => available,
        DimensionSpec::Px(px) => px.min(available),
        DimensionSpec::Percent(pct) => (available * pct / 100.0).min(available),
    }
}

fn layout_node(
    node: &BoxNode,
    x: f32,
    y: f32,
    width: f32,
    fonts: &FontRegistry,
    cmds: &mut Vec<PaintCmd>,
) -> f32 {
    match node {
        BoxNode::Block(block) => layout_block(block, x, y, width, fonts, cmds),
        BoxNode::Paragraph(para) => layout_paragraph(para, x, y, width, fonts, cmds),
        BoxNode::Table(table) => layout_table(table, x, y, width, fonts, cmds),
        BoxNode::Image(image) => layout_image(image, x, y, width, cmds),
    }
}

/// Returns the full vertical extent consumed, margins included.
fn layout_block(
    block: &BlockBox,
    x: f32,
    y: f32,
    width: f32,
    fonts: &FontRegistry,
    cmds: &mut Vec<PaintCmd>,
) -> f32 {
    let style = &block.style;
    let available = (width - style.margin.horizontal()).max(0.0);
    let outer_w = resolve_width(style.width, available);
    let outer_x = x + style.margin.left;
    let top = y + style.margin.top;

    let content_x = outer_x + style.border.left.width + style.padding.left;
    let content_w =
        (outer_w - style.border.horizontal() - style.padding.horizontal()).max(0.0);

    let decor_idx = cmds.len();
    let mut cursor = top + style.border.top.width + style.padding.top;
    for child in &block.children {
        cursor += layout_node(child, content_x, cursor, content_w, fonts, cmds);
    }
    let content_h = cursor - (top + style.border.top.width + style.padding.top);
    let mut box_h = content_h + style.padding.vertical() + style.border.vertical();
    if let Some(min_h) = style.min_height {
        box_h = box_h.max(min_h);
    }

    insert_decor(cmds, decor_idx, outer_x, top, outer_w, box_h, style);
    box_h + style.margin.vertical()
}

/// Background and border rects, inserted beneath already-emitted child
/// content.
fn insert_decor(
    cmds: &mut Vec<PaintCmd>,
    at: usize,
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    style: &ComputedStyle,
) {
    let mut decor = Vec::new();
    if let Some(background) = style.background {
        decor.push(PaintCmd::Rect {
            x,
            y,
            w,
            h,
            color: background,
        });
    }
    let border = &style.border;
    if border.top.width > 0.0 {
        decor.push(PaintCmd::Rect {
            x,
            y,
            w,
            h: border.top.width,
            color: border.top.color,
        });
    }
    if border.bottom.width > 0.0 {
        decor.push(PaintCmd::Rect {
            x,
            y: y + h - border.bottom.width,
            w,
            h: border.bottom.width,
            color: border.bottom.color,
        });
    }
    if border.left.width > 0.0 {
        decor.push(PaintCmd::Rect {
            x,
            y,
            w: border.left.width,
            h,
            color: border.left.color,
        });
    }
    if border.right.width > 0.0 {
        decor.push(PaintCmd::Rect {
            x: x + w - border.right.width,
            y,
            w: border.right.width,
            h,
            color: border.right.color,
        });
    }
    for (offset, cmd) in decor.into_iter().enumerate() {
        cmds.insert(at + offset, cmd);
    }
}

#[derive(Debug, Clone)]
struct LineFragment {
    text: String,
    width: f32,
    font_size: f32,
    bold: bool,
    color: Color,
}

#[derive(Debug, Clone)]
struct Line {
    fragments: Vec<LineFragment>,
    width: f32,
    height: f32,
    max_font: f32,
    max_bold: bool,
}

fn layout_paragraph(
    para: &ParagraphBox,
    x: f32,
    y: f32,
    width: f32,
    fonts: &FontRegistry,
    cmds: &mut Vec<PaintCmd>,
) -> f32 {
    let lines = wrap_inline(&para.items, para.style.line_height, width, fonts);
    paint_lines(&lines, x, y, width, para.style.text_align, fonts, cmds)
}

fn paint_lines(
    lines: &[Line],
    x: f32,
    y: f32,
    width: f32,
    align: TextAlign,
    fonts: &FontRegistry,
    cmds: &mut Vec<PaintCmd>,
) -> f32 {
    let mut cursor = y;
    for line in lines {
        let baseline = cursor + fonts.baseline_px(line.max_font, line.height, line.max_bold);
        let mut pen = match align {
            TextAlign::Left => x,
            TextAlign::Center => x + (width - line.width).max(0.0) / 2.0,
            TextAlign::Right => x + (width - line.width).max(0.0),
        };
        for fragment in &line.fragments {
            if !fragment.text.trim().is_empty() {
                cmds.push(PaintCmd::Text {
                    x: pen,
                    baseline,
                    text: fragment.text.clone(),
                    font_size: fragment.font_size,
                    bold: fragment.bold,
                    color: fragment.color,
                });
            }
            pen += fragment.width;
        }
        cursor += line.height;
    }
    cursor - y
}

/// Greedy line breaking over styled runs. Break opportunities sit at
/// whitespace and on both sides of wide (CJK) characters, which is what
/// keeps unspaced Korean labels wrappable.
fn wrap_inline(
    items: &[InlineItem],
    line_height: f32,
    width: f32,
    fonts: &FontRegistry,
) -> Vec<Line> {
    #[derive(Debug)]
    struct Token {
        text: String,
        width: f32,
        is_space: bool,
        font_size: f32,
        bold: bool,
        color: Color,
        hard_break: bool,
    }

    let mut tokens: Vec<Token> = Vec::new();
    let mut default_font = 0.0f32;
    for item in items {
        match item {
            InlineItem::Break => tokens.push(Token {
                text: String::new(),
                width: 0.0,
                is_space: false,
                font_size: default_font,
                bold: false,
                color: Color::BLACK,
                hard_break: true,
            }),
            InlineItem::Run(run) => {
                default_font = run.font_size;
                let mut word = String::new();
                let mut flush_word = |word: &mut String, tokens: &mut Vec<Token>| {
                    if word.is_empty() {
                        return;
                    }
                    let text = std::mem::take(word);
                    tokens.push(Token {
                        width: fonts.measure_px(&text, run.font_size, run.bold),
                        text,
                        is_space: false,
                        font_size: run.font_size,
                        bold: run.bold,
                        color: run.color,
                        hard_break: false,
                    });
                };
                for ch in run.text.chars() {
                    if ch == ' ' {
                        flush_word(&mut word, &mut tokens);
                        tokens.push(Token {
                            width: fonts.measure_px(" ", run.font_size, run.bold),
                            text: " ".to_string(),
                            is_space: true,
                            font_size: run.font_size,
                            bold: run.bold,
                            color: run.color,
                            hard_break: false,
                        });
                    } else if is_wide(ch) {
                        flush_word(&mut word, &mut tokens);
                        let text = ch.to_string();
                        tokens.push(Token {
                            width: fonts.measure_px(&text, run.font_size, run.bold),
                            text,
                            is_space: false,
                            font_size: run.font_size,
                            bold: run.bold,
                            color: run.color,
                            hard_break: false,
                        });
                    } else {
                        word.push(ch);
                    }
                }
                flush_word(&mut word, &mut tokens);
            }
        }
    }

    let mut lines: Vec<Line> = Vec::new();
    let mut current: Vec<&Token> = Vec::new();
    let mut current_w = 0.0f32;

    let finish =
        |line_tokens: &mut Vec<&Token>, lines: &mut Vec<Line>, fallback_font: f32| {
            while matches!(line_tokens.last(), Some(token) if token.is_space) {
                line_tokens.pop();
            }
            let mut fragments: Vec<LineFragment> = Vec::new();
            let mut width = 0.0f32;
            let mut max_font = 0.0f32;
            let mut max_bold = false;
            for token in line_tokens.iter() {
                width += token.width;
                if token.font_size > max_font {
                    max_font = token.font_size;
                    max_bold = token.bold;
                }
                match fragments.last_mut() {
                    Some(last)
                        if last.font_size == token.font_size
                            && last.bold == token.bold
                            && last.color == token.color =>
                    {
                        last.text.push_str(&token.text);
                        last.width += token.width;
                    }
                    _ => fragments.push(LineFragment {
                        text: token.text.clone(),
                        width: token.width,
                        font_size: token.font_size,
                        bold: token.bold,
                        color: token.color,
                    }),
                }
            }
            let font = if max_font > 0.0 { max_font } else { fallback_font };
            lines.push(Line {
                fragments,
                width,
                height: font * line_height,
                max_font: font,
                max_bold,
            });
            line_tokens.clear();
        };

    for token in &tokens {
        if token.hard_break {
            finish(&mut current, &mut lines, token.font_size.max(1.0));
            current_w = 0.0;
            continue;
        }
        if token.is_space && current.is_empty() {
            continue;
        }
        if !token.is_space && current_w + token.width > width && !current.is_empty() {
            finish(&mut current, &mut lines, token.font_size);
            current_w = 0.0;
        }
        current_w += token.width;
        current.push(token);
    }
    if !current.is_empty() {
        finish(&mut current, &mut lines, default_font.max(1.0));
    }
    // Recompute widths after trailing-space trimming.
    for line in &mut lines {
        line.width = line.fragments.iter().map(|f| f.width).sum();
    }
    lines
}

fn inline_text_height(
    items: &[InlineItem],
    line_height: f32,
    width: f32,
    fonts: &FontRegistry,
) -> (Vec<Line>, f32) {
    let lines = wrap_inline(items, line_height, width, fonts);
    let height = lines.iter().map(|line| line.height).sum();
    (lines, height)
}

fn layout_table(
    table: &TableBox,
    x: f32,
    y: f32,
    width: f32,
    fonts: &FontRegistry,
    cmds: &mut Vec<PaintCmd>,
) -> f32 {
    let style = &table.style;
    let available = (width - style.margin.horizontal()).max(0.0);
    let table_w = resolve_width(style.width, available);
    let table_x = x + style.margin.left;
    let mut cursor = y + style.margin.top;

    let columns = table
        .rows
        .iter()
        .map(|row| row.cells.iter().map(|cell| cell.colspan as usize).sum())
        .max()
        .unwrap_or(0);
    if columns == 0 {
        return style.margin.vertical();
    }

    // Explicit percent/px widths claim their columns (first declaration
    // wins); the rest share the remaining width evenly.
    let mut col_widths: Vec<Option<f32>> = vec![None; columns];
    for row in &table.rows {
        let mut col = 0usize;
        for cell in &row.cells {
            let span = cell.colspan as usize;
            if span == 1 && col < columns && col_widths[col].is_none() {
                match cell.style.width {
                    DimensionSpec::Percent(pct) => {
                        col_widths[col] = Some(table_w * pct / 100.0);
                    }
                    DimensionSpec::Px(px) => col_widths[col] = Some(px),
                    DimensionSpec::Auto => {}
                }
            }
            col += span;
        }
    }
    let claimed: f32 = col_widths.iter().flatten().sum();
    let unclaimed = col_widths.iter().filter(|w| w.is_none()).count();
    let fill = if unclaimed > 0 {
        ((table_w - claimed).max(0.0)) / unclaimed as f32
    } else {
        0.0
    };
    let widths: Vec<f32> = col_widths
        .into_iter()
        .map(|w| w.unwrap_or(fill))
        .collect();
    let mut col_x = Vec::with_capacity(columns + 1);
    let mut acc = table_x;
    for w in &widths {
        col_x.push(acc);
        acc += w;
    }
    col_x.push(acc);

    let row_count = table.rows.len();
    for (row_idx, row) in table.rows.iter().enumerate() {
        // First pass: wrapped content and row height.
        let mut prepared = Vec::with_capacity(row.cells.len());
        let mut row_h = 0.0f32;
        let mut col = 0usize;
        for cell in &row.cells {
            let start = col.min(columns - 1);
            let span = (cell.colspan as usize).max(1).min(columns - start);
            let left = col_x[start];
            let right = col_x[start + span];
            let cell_w = (right - left).max(0.0);
            let inner_w = (cell_w
                - cell.style.padding.horizontal()
                - cell.style.border.horizontal())
            .max(0.0);
            let (lines, text_h) =
                inline_text_height(&cell.content, cell.style.line_height, inner_w, fonts);
            let mut cell_h = text_h
                + cell.style.padding.vertical()
                + cell.style.border.vertical();
            if let Some(min_h) = cell.style.min_height {
                cell_h = cell_h.max(min_h);
            }
            row_h = row_h.max(cell_h);
            prepared.push((left, cell_w, lines, text_h));
            col += span;
        }
        if let Some(min_h) = row.style.min_height {
            row_h = row_h.max(min_h);
        }

        // Second pass: paint. Row background first, then per-cell decor
        // and text. Collapsed borders: each cell draws its top and left
        // edge; the table's last column and row close the outer edge.
        if let Some(background) = row.style.background {
            cmds.push(PaintCmd::Rect {
                x: table_x,
                y: cursor,
                w: table_w,
                h: row_h,
                color: background,
            });
        }
        let mut col = 0usize;
        for (cell, (left, cell_w, lines, text_h)) in row.cells.iter().zip(prepared.iter()) {
            let span = cell.colspan as usize;
            let cell_style = &cell.style;
            if let Some(background) = cell_style.background {
                cmds.push(PaintCmd::Rect {
                    x: *left,
                    y: cursor,
                    w: *cell_w,
                    h: row_h,
                    color: background,
                });
            }
            let border = &cell_style.border;
            if border.top.width > 0.0 {
                cmds.push(PaintCmd::Rect {
                    x: *left,
                    y: cursor,
                    w: *cell_w,
                    h: border.top.width,
                    color: border.top.color,
                });
            }
            if border.left.width > 0.0 {
                cmds.push(PaintCmd::Rect {
                    x: *left,
                    y: cursor,
                    w: border.left.width,
                    h: row_h,
                    color: border.left.color,
                });
            }
            let is_last_col = col + span >= columns;
            if is_last_col && border.right.width > 0.0 {
                cmds.push(PaintCmd::Rect {
                    x: *left + *cell_w - border.right.width,
                    y: cursor,
                    w: border.right.width,
                    h: row_h,
                    color: border.right.color,
                });
            }
            if row_idx + 1 == row_count && border.bottom.width > 0.0 {
                cmds.push(PaintCmd::Rect {
                    x: *left,
                    y: cursor + row_h - border.bottom.width,
                    w: *cell_w,
                    h: border.bottom.width,
                    color: border.bottom.color,
                });
            }

            let inner_x = *left + border.left.width + cell_style.padding.left;
            let inner_w =
                (*cell_w - cell_style.padding.horizontal() - border.horizontal()).max(0.0);
            let text_top = if cell_style.middle {
                cursor + ((row_h - text_h).max(0.0)) / 2.0
            } else {
                cursor + border.top.width + cell_style.padding.top
            };
            paint_lines(
                lines,
                inner_x,
                text_top,
                inner_w,
                cell_style.text_align,
                fonts,
                cmds,
            );
            col += span;
        }
        cursor += row_h;
    }

    cursor - y + style.margin.bottom
}

fn layout_image(
    image: &ImageBox,
    x: f32,
    y: f32,
    width: f32,
    cmds: &mut Vec<PaintCmd>,
) -> f32 {
    let natural = match (image.width, image.height) {
        (Some(w), Some(h)) => Some((w, h)),
        _ => image::load_from_memory(&image.data)
            .ok()
            .map(|decoded| decoded.to_rgba8())
            .map(|rgba| {
                let w = image.width.unwrap_or(rgba.width() as f32);
                let h = image.height.unwrap_or(rgba.height() as f32);
                (w, h)
            }),
    };
    let Some((natural_w, natural_h)) = natural else {
        return 0.0;
    };
    if natural_w <= 0.0 || natural_h <= 0.0 {
        return 0.0;
    }
    let style = &image.style;
    let available = (width - style.margin.horizontal()).max(1.0);
    let scale = if natural_w > available {
        available / natural_w
    } else {
        1.0
    };
    let draw_w = natural_w * scale;
    let draw_h = natural_h * scale;
    cmds.push(PaintCmd::Image {
        x: x + style.margin.left,
        y: y + style.margin.top,
        w: draw_w,
        h: draw_h,
        data: Arc::new(image.data.clone()),
    });
    draw_h + style.margin.vertical()
}
