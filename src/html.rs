use crate::style::{ComputedStyle, DimensionSpec, apply_declarations, apply_tag_defaults};
use crate::types::Color;
use base64::Engine;
use kuchiki::traits::TendrilSink;
use kuchiki::{NodeData, NodeRef};

#[derive(Debug)]
pub(crate) enum BoxNode {
    Block(BlockBox),
    Table(TableBox),
    Paragraph(ParagraphBox),
    Image(ImageBox),
}

#[derive(Debug)]
pub(crate) struct BlockBox {
    pub style: ComputedStyle,
    pub children: Vec<BoxNode>,
}

#[derive(Debug)]
pub(crate) struct TableBox {
    pub style: ComputedStyle,
    pub rows: Vec<TableRow>,
}

#[derive(Debug)]
pub(crate) struct TableRow {
    pub style: ComputedStyle,
    pub cells: Vec<TableCell>,
}

#[derive(Debug)]
pub(crate) struct TableCell {
    pub style: ComputedStyle,
    pub colspan: u32,
    pub header: bool,
    pub content: Vec<InlineItem>,
}

#[derive(Debug)]
pub(crate) struct ParagraphBox {
    pub style: ComputedStyle,
    pub items: Vec<InlineItem>,
}

#[derive(Debug)]
pub(crate) enum InlineItem {
    Run(InlineRun),
    Break,
}

#[derive(Debug)]
pub(crate) struct InlineRun {
    pub text: String,
    pub font_size: f32,
    pub bold: bool,
    pub color: Color,
}

#[derive(Debug)]
pub(crate) struct ImageBox {
    pub style: ComputedStyle,
    pub data: Vec<u8>,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

/// Parse template markup into a box tree rooted at an implicit container
/// with the given base style. The template vocabulary is closed: block
/// containers, headings, paragraphs, tables, inline spans/breaks, and
/// data-URI images. Unknown elements behave as plain blocks.
pub(crate) fn build_box_tree(html: &str, base: &ComputedStyle) -> BlockBox {
    let document = kuchiki::parse_html().one(html);
    let children = match document.select_first("body") {
        Ok(body) => build_children(body.as_node(), base),
        Err(()) => build_children(&document, base),
    };
    BlockBox {
        style: *base,
        children,
    }
}

fn element_style(node: &NodeRef, parent: &ComputedStyle, tag: &str) -> ComputedStyle {
    let mut style = parent.inherit();
    apply_tag_defaults(&mut style, tag);
    if let Some(element) = node.as_element() {
        if let Some(raw) = element.attributes.borrow().get("style") {
            apply_declarations(&mut style, raw);
        }
    }
    style
}

fn build_children(node: &NodeRef, parent: &ComputedStyle) -> Vec<BoxNode> {
    let mut out = Vec::new();
    let mut inline_acc: Vec<InlineItem> = Vec::new();

    for child in node.children() {
        match child.data() {
            NodeData::Text(text) => {
                push_text(&mut inline_acc, &text.borrow(), parent);
            }
            NodeData::Element(element) => {
                let tag = element.name.local.to_ascii_lowercase();
                match &*tag {
                    "span" | "b" | "strong" | "em" | "i" | "u" => {
                        let mut style = parent.inherit();
                        if matches!(&*tag, "b" | "strong") {
                            style.bold = true;
                        }
                        if let Some(raw) = element.attributes.borrow().get("style") {
                            apply_declarations(&mut style, raw);
                        }
                        collect_inline(&child, &style, &mut inline_acc);
                    }
                    "br" => inline_acc.push(InlineItem::Break),
                    "img" => {
                        flush_paragraph(&mut out, &mut inline_acc, parent);
                        if let Some(image) = build_image(&child, parent) {
                            out.push(BoxNode::Image(image));
                        }
                    }
                    "table" => {
                        flush_paragraph(&mut out, &mut inline_acc, parent);
                        let style = element_style(&child, parent, "table");
                        out.push(BoxNode::Table(build_table(&child, style)));
                    }
                    "script" | "head" | "title" => {}
                    _ => {
                        flush_paragraph(&mut out, &mut inline_acc, parent);
                        let style = element_style(&child, parent, &tag);
                        out.push(BoxNode::Block(BlockBox {
                            style,
                            children: build_children(&child, &style),
                        }));
                    }
                }
            }
            _ => {}
        }
    }

    flush_paragraph(&mut out, &mut inline_acc, parent);
    out
}

fn collect_inline(node: &NodeRef, style: &ComputedStyle, acc: &mut Vec<InlineItem>) {
    for child in node.children() {
        match child.data() {
            NodeData::Text(text) => push_text(acc, &text.borrow(), style),
            NodeData::Element(element) => {
                let tag = element.name.local.to_ascii_lowercase();
                match &*tag {
                    "br" => acc.push(InlineItem::Break),
                    _ => {
                        let mut inner = style.inherit();
                        if matches!(&*tag, "b" | "strong") {
                            inner.bold = true;
                        }
                        if let Some(raw) = element.attributes.borrow().get("style") {
                            apply_declarations(&mut inner, raw);
                        }
                        collect_inline(&child, &inner, acc);
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_text(acc: &mut Vec<InlineItem>, raw: &str, style: &ComputedStyle) {
    let collapsed = collapse_whitespace(raw);
    if collapsed.is_empty() {
        return;
    }
    // Pure separator whitespace only matters between two runs.
    if collapsed == " " && !ends_with_run(acc) {
        return;
    }
    acc.push(InlineItem::Run(InlineRun {
        text: collapsed,
        font_size: style.font_size,
        bold: style.bold,
        color: style.color,
    }));
}

fn ends_with_run(acc: &[InlineItem]) -> bool {
    matches!(acc.last(), Some(InlineItem::Run(_)))
}

fn flush_paragraph(out: &mut Vec<BoxNode>, acc: &mut Vec<InlineItem>, style: &ComputedStyle) {
    if acc.is_empty() {
        return;
    }
    let items = std::mem::take(acc);
    let has_content = items.iter().any(|item| match item {
        InlineItem::Run(run) => !run.text.trim().is_empty(),
        InlineItem::Break => true,
    });
    if !has_content {
        return;
    }
    out.push(BoxNode::Paragraph(ParagraphBox {
        style: style.inherit(),
        items,
    }));
}

fn build_table(node: &NodeRef, style: ComputedStyle) -> TableBox {
    let mut rows = Vec::new();
    collect_rows(node, &style, &mut rows);
    TableBox { style, rows }
}

fn collect_rows(node: &NodeRef, table_style: &ComputedStyle, rows: &mut Vec<TableRow>) {
    for child in node.children() {
        let Some(element) = child.as_element() else {
            continue;
        };
        let tag = element.name.local.to_ascii_lowercase();
        match &*tag {
            "thead" | "tbody" | "tfoot" => collect_rows(&child, table_style, rows),
            "tr" => {
                let row_style = element_style(&child, table_style, "tr");
                let mut cells = Vec::new();
                for cell_node in child.children() {
                    let Some(cell_el) = cell_node.as_element() else {
                        continue;
                    };
                    let cell_tag = cell_el.name.local.to_ascii_lowercase();
                    if &*cell_tag != "td" && &*cell_tag != "th" {
                        continue;
                    }
                    let cell_style = element_style(&cell_node, &row_style, &cell_tag);
                    let colspan = cell_el
                        .attributes
                        .borrow()
                        .get("colspan")
                        .and_then(|v| v.trim().parse::<u32>().ok())
                        .filter(|v| *v >= 1)
                        .unwrap_or(1);
                    let mut content = Vec::new();
                    collect_inline(&cell_node, &cell_style, &mut content);
                    trim_inline_edges(&mut content);
                    cells.push(TableCell {
                        style: cell_style,
                        colspan,
                        header: &*cell_tag == "th",
                        content,
                    });
                }
                if !cells.is_empty() {
                    rows.push(TableRow {
                        style: row_style,
                        cells,
                    });
                }
            }
            _ => {}
        }
    }
}

fn build_image(node: &NodeRef, parent: &ComputedStyle) -> Option<ImageBox> {
    let element = node.as_element()?;
    let attributes = element.attributes.borrow();
    let src = attributes.get("src")?;
    let data = decode_data_uri(src)?;
    let style = element_style(node, parent, "img");
    let attr_px = |name: &str| {
        attributes
            .get(name)
            .and_then(|v| v.trim().parse::<f32>().ok())
            .filter(|v| *v > 0.0)
    };
    let width = match style.width {
        DimensionSpec::Px(px) => Some(px),
        _ => attr_px("width"),
    };
    let height = style.min_height.or_else(|| attr_px("height"));
    Some(ImageBox {
        style,
        data,
        width,
        height,
    })
}

fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    if !uri.starts_with("data:") {
        return None;
    }
    let (header, payload) = uri.split_once(',')?;
    if header.contains(";base64") {
        base64::engine::general_purpose::STANDARD.decode(payload).ok()
    } else {
        Some(payload.as_bytes().to_vec())
    }
}

fn collapse_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_ws = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            if !in_ws {
                out.push(' ');
            }
            in_ws = true;
        } else {
            out.push(ch);
            in_ws = false;
        }
    }
    out
}

fn trim_inline_edges(items: &mut Vec<InlineItem>) {
    if let Some(InlineItem::Run(run)) = items.first_mut() {
        let trimmed = run.text.trim_start().to_string();
        run.text = trimmed;
    }
    if let Some(InlineItem::Run(run)) = items.last_mut() {
        let trimmed = run.text.trim_end().to_string();
        run.text = trimmed;
    }
    items.retain(|item| match item {
        InlineItem::Run(run) => !run.text.is_empty(),
        InlineItem::Break => true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::TextAlign;

    fn base() -> ComputedStyle {
        ComputedStyle::root(12.0, 1.5)
    }

    fn tree(html: &str) -> BlockBox {
        build_box_tree(html, &base())
    }

    #[test]
    fn table_rows_and_colspans_survive_parsing() {
        let root = tree(
            r#"<div><table>
                <tr><td style="width: 25%;">사업장명</td><td colspan="3">주식회사</td></tr>
                <tr><td>지자체</td><td>서울</td><td>업종</td><td>제조</td></tr>
            </table></div>"#,
        );
        let BoxNode::Block(div) = &root.children[0] else {
            panic!("expected block");
        };
        let BoxNode::Table(table) = &div.children[0] else {
            panic!("expected table");
        };
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].cells.len(), 2);
        assert_eq!(table.rows[0].cells[1].colspan, 3);
        assert_eq!(table.rows[1].cells.len(), 4);
    }

    #[test]
    fn header_row_inherits_row_color_into_cells() {
        let root = tree(
            r#"<table><thead>
                <tr style="background-color: #2563eb; color: #ffffff;">
                  <th>구분</th><th>PH센서</th>
                </tr>
            </thead></table>"#,
        );
        let BoxNode::Table(table) = &root.children[0] else {
            panic!("expected table");
        };
        let row = &table.rows[0];
        assert_eq!(row.style.background, Some(Color::from_rgb8(0x25, 0x63, 0xeb)));
        let cell = &row.cells[0];
        assert!(cell.header);
        assert_eq!(cell.style.color, Color::WHITE);
        assert_eq!(cell.style.text_align, TextAlign::Center);
        assert!(cell.style.bold);
    }

    #[test]
    fn escaped_markup_stays_textual() {
        let escaped = crate::format::escape_html("<script>alert('x')</script>");
        let root = tree(&format!("<div><p>{escaped}</p></div>"));
        let BoxNode::Block(div) = &root.children[0] else {
            panic!("expected div");
        };
        let BoxNode::Block(p) = &div.children[0] else {
            panic!("expected p");
        };
        let BoxNode::Paragraph(para) = &p.children[0] else {
            panic!("expected paragraph, got {:?}", p.children);
        };
        let text: String = para
            .items
            .iter()
            .filter_map(|item| match item {
                InlineItem::Run(run) => Some(run.text.as_str()),
                InlineItem::Break => None,
            })
            .collect();
        assert!(text.contains("<script>alert('x')</script>"));
    }

    #[test]
    fn spans_and_breaks_build_styled_runs() {
        let root = tree(
            r#"<p style="font-size: 14px;">선금 <span style="color: #dc2626; font-weight: bold;">60%</span><br>잔금 40%</p>"#,
        );
        let BoxNode::Block(p) = &root.children[0] else {
            panic!("expected p");
        };
        let BoxNode::Paragraph(para) = &p.children[0] else {
            panic!("expected paragraph");
        };
        let runs: Vec<&InlineRun> = para
            .items
            .iter()
            .filter_map(|item| match item {
                InlineItem::Run(run) => Some(run),
                InlineItem::Break => None,
            })
            .collect();
        assert!(runs.iter().any(|run| run.text.contains("60%")
            && run.bold
            && run.color == Color::from_rgb8(0xdc, 0x26, 0x26)));
        assert!(para
            .items
            .iter()
            .any(|item| matches!(item, InlineItem::Break)));
        assert!(runs.iter().all(|run| (run.font_size - 14.0).abs() < 0.01));
    }

    #[test]
    fn whitespace_between_blocks_produces_no_paragraphs() {
        let root = tree("<div>\n  <div>a</div>\n  <div>b</div>\n</div>");
        let BoxNode::Block(outer) = &root.children[0] else {
            panic!("expected block");
        };
        assert_eq!(outer.children.len(), 2);
        assert!(outer
            .children
            .iter()
            .all(|child| matches!(child, BoxNode::Block(_))));
    }

    #[test]
    fn data_uri_images_decode_inline() {
        // 1x1 transparent PNG.
        let png = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";
        let root = tree(&format!(
            r#"<div><img src="data:image/png;base64,{png}" width="24" height="24"></div>"#
        ));
        let BoxNode::Block(div) = &root.children[0] else {
            panic!("expected block");
        };
        let BoxNode::Image(image) = &div.children[0] else {
            panic!("expected image, got {:?}", div.children);
        };
        assert!(!image.data.is_empty());
        assert_eq!(image.width, Some(24.0));
        assert_eq!(image.height, Some(24.0));
    }
}
