//! Document segmentation.
//!
//! Both input formats are reduced to a flat sequence of [`Block`]s in
//! document order. Markdown goes through `pulldown-cmark`; raw HTML, and
//! HTML blocks embedded in Markdown, go through the DOM reader in
//! [`html`](super::html).

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use super::grid::{GridCell, TableGrid, clean_cell_text, parse_pipe_table};
use super::html::{collapse_whitespace, split_blocks};

/// One structural unit of a documentation page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Table(TableGrid),
    Paragraph(String),
    List(Vec<String>),
    Code(String),
    /// JSON field list carried in a `data` attribute.
    Embedded(String),
}

impl Block {
    pub fn heading(&self) -> Option<(u8, &str)> {
        match self {
            Self::Heading { level, text } => Some((*level, text.as_str())),
            _ => None,
        }
    }

    /// `true` for blocks that can carry a field list.
    pub fn is_field_source(&self) -> bool {
        matches!(self, Self::Table(_) | Self::Embedded(_))
    }

    /// Plain text of prose-like blocks.
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Heading { text, .. } | Self::Paragraph(text) | Self::Code(text) => {
                Some(text.clone())
            }
            Self::List(items) => Some(items.join("\n")),
            Self::Table(_) | Self::Embedded(_) => None,
        }
    }
}

/// Splits a document into blocks, choosing the reader by content.
///
/// Input whose first non-blank character is `<` and that has no Markdown
/// heading line is read as HTML; everything else as Markdown.
///
/// # Examples
///
/// ```
/// use apidoc_schema_discovery::parser::blocks::{Block, segment};
///
/// let blocks = segment("## 请求参数\n\n| 参数 | 类型 |\n| --- | --- |\n| code | string |\n");
/// assert_eq!(blocks[0], Block::Heading { level: 2, text: "请求参数".into() });
/// assert!(matches!(&blocks[1], Block::Table(grid) if grid.rows.len() == 1));
/// ```
pub fn segment(input: &str) -> Vec<Block> {
    if looks_like_html(input) {
        split_blocks(input)
    } else {
        read_markdown(input)
    }
}

fn looks_like_html(input: &str) -> bool {
    input.trim_start().starts_with('<')
        && !input.lines().any(|line| line.trim_start().starts_with('#'))
}

fn read_markdown(input: &str) -> Vec<Block> {
    let mut reader = MarkdownReader::default();
    for (event, range) in Parser::new_ext(input, Options::ENABLE_TABLES).into_offset_iter() {
        reader.handle(event, &input[range]);
    }
    reader.blocks
}

#[derive(Default)]
struct MarkdownReader {
    blocks: Vec<Block>,
    text: String,
    html: String,
    table: Option<Vec<Vec<GridCell>>>,
    row: Vec<GridCell>,
    items: Vec<String>,
    list_depth: usize,
}

impl MarkdownReader {
    fn handle(&mut self, event: Event<'_>, source: &str) {
        match event {
            Event::Start(Tag::Heading { .. }) | Event::Start(Tag::CodeBlock(_)) => {
                self.text.clear();
            }
            Event::End(TagEnd::Heading(level)) => {
                let text = collapse_whitespace(&self.take_text());
                self.blocks.push(Block::Heading {
                    level: level as u8,
                    text,
                });
            }
            Event::Start(Tag::Paragraph) if self.list_depth == 0 => self.text.clear(),
            Event::End(TagEnd::Paragraph) if self.list_depth == 0 => {
                let text = self.take_text();
                self.push_paragraph(text.trim(), source);
            }
            Event::End(TagEnd::CodeBlock) => {
                let code = self.take_text();
                match parse_pipe_table(&code) {
                    Some(grid) => self.blocks.push(Block::Table(grid)),
                    None => self.blocks.push(Block::Code(code.trim_end().to_string())),
                }
            }
            Event::Start(Tag::List(_)) => {
                if self.list_depth == 0 {
                    self.items.clear();
                }
                self.list_depth += 1;
            }
            Event::End(TagEnd::List(_)) => {
                self.list_depth = self.list_depth.saturating_sub(1);
                if self.list_depth == 0 && !self.items.is_empty() {
                    let items = std::mem::take(&mut self.items);
                    self.blocks.push(Block::List(items));
                }
            }
            Event::Start(Tag::Item) if self.list_depth == 1 => self.text.clear(),
            Event::End(TagEnd::Item) if self.list_depth == 1 => {
                let item = collapse_whitespace(&self.take_text());
                if !item.is_empty() {
                    self.items.push(item);
                }
            }
            Event::Start(Tag::Table(_)) => self.table = Some(Vec::new()),
            Event::Start(Tag::TableHead) | Event::Start(Tag::TableRow) => self.row.clear(),
            Event::Start(Tag::TableCell) => self.text.clear(),
            Event::End(TagEnd::TableCell) => {
                let cell = clean_cell_text(&self.take_text());
                self.row.push(GridCell::new(cell));
            }
            Event::End(TagEnd::TableHead) | Event::End(TagEnd::TableRow) => {
                let row = std::mem::take(&mut self.row);
                if let Some(table) = self.table.as_mut() {
                    table.push(row);
                }
            }
            Event::End(TagEnd::Table) => {
                if let Some(grid) = self.table.take().and_then(TableGrid::from_rows) {
                    self.blocks.push(Block::Table(grid));
                }
            }
            Event::Start(Tag::HtmlBlock) => self.html.clear(),
            Event::Html(html) => self.html.push_str(&html),
            Event::End(TagEnd::HtmlBlock) => {
                let html = std::mem::take(&mut self.html);
                self.blocks.extend(split_blocks(&html));
            }
            Event::Text(text) | Event::Code(text) => self.text.push_str(&text),
            Event::SoftBreak | Event::HardBreak => self.text.push('\n'),
            _ => {}
        }
    }

    fn take_text(&mut self) -> String {
        std::mem::take(&mut self.text)
    }

    /// Paragraphs may hide an inline HTML table, an embedded field list or
    /// a pipe table that lacks a delimiter row.
    fn push_paragraph(&mut self, text: &str, source: &str) {
        if source.contains('<') {
            let nested = split_blocks(source);
            if nested.iter().any(Block::is_field_source) {
                self.blocks.extend(nested);
                return;
            }
        }
        if let Some(grid) = parse_pipe_table(source) {
            self.blocks.push(Block::Table(grid));
            return;
        }
        if !text.is_empty() {
            self.blocks.push(Block::Paragraph(text.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_headings_lists_and_code() {
        let md = "# 获取用户信息\n\n## 请求头\n\n- access-token: 调用凭证\n- content-type：application/json\n\n### 响应样例\n\n```json\n{\"err_no\": 0}\n```\n";
        let blocks = segment(md);
        assert_eq!(
            blocks,
            vec![
                Block::Heading {
                    level: 1,
                    text: "获取用户信息".into()
                },
                Block::Heading {
                    level: 2,
                    text: "请求头".into()
                },
                Block::List(vec![
                    "access-token: 调用凭证".into(),
                    "content-type：application/json".into()
                ]),
                Block::Heading {
                    level: 3,
                    text: "响应样例".into()
                },
                Block::Code("{\"err_no\": 0}".into()),
            ]
        );
    }

    #[test]
    fn test_markdown_table_cells_are_cleaned() {
        let md = "| 名称 | 描述 |\n| --- | --- |\n| **open_id** | 用户<br/>标识 |\n";
        let blocks = segment(md);
        let Block::Table(grid) = &blocks[0] else {
            panic!("expected table, got {blocks:?}");
        };
        assert_eq!(grid.columns(), vec!["名称", "描述"]);
        assert_eq!(grid.rows[0][0].text, "open_id");
        assert_eq!(grid.rows[0][1].text, "用户标识");
    }

    #[test]
    fn test_html_block_inside_markdown() {
        let md = "## 响应参数\n\n<table>\n<tr><th>名称</th><th>类型</th></tr>\n<tr><td>data</td><td>object</td></tr>\n</table>\n";
        let blocks = segment(md);
        assert_eq!(blocks.len(), 2);
        assert!(matches!(&blocks[1], Block::Table(grid) if grid.rows[0][0].text == "data"));
    }

    #[test]
    fn test_pipe_table_in_code_block() {
        let md = "```\n|名称|类型|\n|---|---|\n|list|[]object|\n```\n";
        let blocks = segment(md);
        assert!(matches!(&blocks[0], Block::Table(grid) if grid.rows[0][1].text == "[]object"));
    }

    #[test]
    fn test_raw_html_input() {
        let blocks = segment("<h2>接口说明</h2><p>获取 token</p>");
        assert_eq!(blocks[1], Block::Paragraph("获取 token".into()));
    }
}
