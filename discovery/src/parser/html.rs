//! HTML reader for exported documentation markup.
//!
//! Pages are parsed with `scraper` (html5ever), so implicitly closed
//! elements, entities and stray markup are resolved the way a browser would
//! resolve them. The resulting DOM is walked in document order and reduced
//! to the same [`Block`] sequence the Markdown reader produces.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use super::blocks::Block;
use super::grid::{GridCell, TableGrid};

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex must compile"));

static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("static selector must parse"));

/// Collapses runs of whitespace (including non-breaking spaces) and trims.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE
        .replace_all(&text.replace('\u{a0}', " "), " ")
        .trim()
        .to_string()
}

/// Splits HTML into the same block sequence the Markdown reader produces.
///
/// Headings, tables, lists, `<pre>` blocks and elements carrying an
/// embedded field list become their own blocks; remaining text is grouped
/// into paragraphs at block-level element boundaries.
///
/// # Examples
///
/// ```
/// use apidoc_schema_discovery::parser::blocks::Block;
/// use apidoc_schema_discovery::parser::html::split_blocks;
///
/// let blocks = split_blocks("<h2>请求头</h2><ul><li>access-token: 调用凭证</li></ul>");
/// assert_eq!(blocks[0], Block::Heading { level: 2, text: "请求头".into() });
/// assert_eq!(blocks[1], Block::List(vec!["access-token: 调用凭证".into()]));
/// ```
pub fn split_blocks(html: &str) -> Vec<Block> {
    let document = Html::parse_document(html);
    let mut reader = BlockReader::default();
    reader.visit_children(document.root_element());
    reader.flush_paragraph();
    reader.blocks
}

#[derive(Default)]
struct BlockReader {
    blocks: Vec<Block>,
    text: String,
}

impl BlockReader {
    fn visit_children(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            if let Some(child) = ElementRef::wrap(child) {
                self.visit_element(child);
            } else if let Node::Text(text) = child.value() {
                self.text.push_str(text);
            }
        }
    }

    fn visit_element(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        if is_skipped_element(name) {
            return;
        }
        if let Some(payload) = embedded_payload(element) {
            self.flush_paragraph();
            self.blocks.push(Block::Embedded(payload.to_string()));
        } else if let Some(level) = heading_level(name) {
            self.flush_paragraph();
            self.blocks.push(Block::Heading {
                level,
                text: collapse_whitespace(&inner_text(element)),
            });
        } else if name == "table" {
            self.flush_paragraph();
            if let Some(grid) = table_grid(element) {
                self.blocks.push(Block::Table(grid));
            }
        } else if name == "ul" || name == "ol" {
            self.flush_paragraph();
            let items = list_items(element);
            if !items.is_empty() {
                self.blocks.push(Block::List(items));
            }
        } else if name == "pre" {
            self.flush_paragraph();
            self.blocks
                .push(Block::Code(inner_text(element).trim().to_string()));
        } else if name == "br" {
            self.text.push('\n');
        } else if is_block_element(name) {
            self.flush_paragraph();
            self.visit_children(element);
            self.flush_paragraph();
        } else {
            self.visit_children(element);
        }
    }

    fn flush_paragraph(&mut self) {
        let paragraph = self.text.trim();
        if !paragraph.is_empty() {
            self.blocks.push(Block::Paragraph(paragraph.to_string()));
        }
        self.text.clear();
    }
}

fn heading_level(name: &str) -> Option<u8> {
    match name.as_bytes() {
        [b'h', digit @ b'1'..=b'6'] => Some(digit - b'0'),
        _ => None,
    }
}

fn is_block_element(name: &str) -> bool {
    matches!(
        name,
        "p" | "div" | "section" | "article" | "blockquote" | "body" | "html" | "li" | "hr"
    )
}

fn is_skipped_element(name: &str) -> bool {
    matches!(name, "head" | "script" | "style" | "template" | "title")
}

/// Payload of a `data` attribute carrying an embedded field list.
fn embedded_payload<'a>(element: ElementRef<'a>) -> Option<&'a str> {
    element
        .value()
        .attr("data")
        .map(str::trim)
        .filter(|data| data.starts_with("{\"fields\"") || data.starts_with("{\"data\""))
}

/// Text of an element and its descendants; `<br>` becomes a newline.
fn inner_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out
}

/// Builds a grid from one `<table>`. Each `<tr>` owned by this table is a
/// row and each `<td>`/`<th>` child a cell; text pieces inside a cell are
/// joined with single spaces.
fn table_grid(table: ElementRef<'_>) -> Option<TableGrid> {
    let rows: Vec<Vec<GridCell>> = table
        .select(&ROW_SELECTOR)
        .filter(|row| owning_table(*row).is_some_and(|owner| owner.id() == table.id()))
        .map(|row| {
            row.children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| matches!(cell.value().name(), "td" | "th"))
                .map(|cell| GridCell {
                    text: collapse_whitespace(&cell.text().collect::<Vec<_>>().join(" ")),
                    colspan: cell
                        .value()
                        .attr("colspan")
                        .and_then(|span| span.trim().parse().ok()),
                })
                .collect()
        })
        .filter(|cells: &Vec<GridCell>| !cells.is_empty())
        .collect();

    TableGrid::from_rows(rows)
}

fn owning_table(row: ElementRef<'_>) -> Option<ElementRef<'_>> {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "table")
}

/// Direct `<li>` children of a list, whitespace-collapsed.
fn list_items(list: ElementRef<'_>) -> Vec<String> {
    list.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "li")
        .map(|item| collapse_whitespace(&inner_text(item)))
        .filter(|item| !item.is_empty())
        .collect()
}
