//! Documentation page parser.
//!
//! A page (Markdown or HTML) is segmented into [`Block`]s, then walked
//! heading by heading. Headings from the configured vocabulary route the
//! blocks that follow them to a section reader:
//!
//! - **接口说明** (level 2): operation description
//! - **请求地址 / 基本信息**: method, path and servers ([`base_info`])
//! - **请求头** (level 2): header fields, from a table or a `name: value` list
//! - **请求参数** (level 2): query fields under a `Query` sub-heading,
//!   otherwise stitched body fields ([`stitch`])
//! - **响应参数** (level 2): stitched response fields
//! - **响应样例 / 异常** (level 3): success and error example payloads
//!
//! The primary entry point is [`DocParser::new`] followed by
//! [`DocParser::parse`]; most callers use
//! [`parse_document`](crate::parse_document) instead.

pub mod base_info;
pub mod blocks;
pub mod decode;
pub mod embedded;
pub mod grid;
pub mod html;
pub mod stitch;
pub mod tree;

use apidoc_schema_core::{Field, FieldId, SchemaSynthesizer};
use tracing::debug;

use self::base_info::BaseInfo;
use self::blocks::{Block, segment};
use self::decode::{apply_attr, apply_field_rules, attr_for_column};
use self::stitch::{parse_stitched_section, read_field_block};
use crate::config::ParserConfig;
use crate::error::Result;
use crate::operation::ApiDocument;

/// Section a heading opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Description,
    BaseInfo,
    RequestHeaders,
    RequestParameters,
    ResponseParameters,
    SuccessExample,
    ErrorExample,
}

/// Parser for one documentation page.
pub struct DocParser<'a> {
    config: &'a ParserConfig,
    blocks: Vec<Block>,
    doc_path: Option<String>,
    document: ApiDocument,
}

impl<'a> DocParser<'a> {
    pub fn new(input: &str, config: &'a ParserConfig) -> Self {
        Self {
            config,
            blocks: segment(input),
            doc_path: None,
            document: ApiDocument {
                prefix_segments: config.schema_prefix_segments,
                ..ApiDocument::default()
            },
        }
    }

    /// Location of the page on its documentation site, used when the page
    /// itself gives no usable path.
    pub fn with_doc_path(mut self, doc_path: impl Into<String>) -> Self {
        self.doc_path = Some(doc_path.into());
        self
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Reads every recognized section.
    ///
    /// # Errors
    ///
    /// Fails when a follow-up field table cannot be attached to any known
    /// field, or when an embedded field list is not valid JSON.
    pub fn parse(mut self) -> Result<ApiDocument> {
        for index in 0..self.blocks.len() {
            let Some((level, text)) = self.blocks[index].heading() else {
                continue;
            };
            let Some(section) = self.classify(level, text) else {
                continue;
            };
            debug!(heading = %text, ?section, "Reading section");
            self.document.diagnostics.sections.push(text.to_string());

            match section {
                Section::Description => self.read_description(index),
                Section::BaseInfo => self.read_base_info(index),
                Section::RequestHeaders => self.read_headers(index)?,
                Section::RequestParameters => self.read_request_parameters(index)?,
                Section::ResponseParameters => {
                    self.document.response_fields = parse_stitched_section(
                        &self.blocks,
                        index,
                        &mut self.document.tree,
                        self.config,
                        &mut self.document.diagnostics,
                    )?;
                }
                Section::SuccessExample => {
                    self.document.success_example = self.example_after(index);
                }
                Section::ErrorExample => self.document.error_example = self.example_after(index),
            }
        }

        if self.document.path.is_none() {
            self.document.path = self.fallback_path();
        }

        self.collect_dropped_defaults();
        Ok(self.document)
    }

    fn classify(&self, level: u8, text: &str) -> Option<Section> {
        let headings = &self.config.headings;
        let text = text.trim();
        if level == 2 && text == headings.description {
            Some(Section::Description)
        } else if headings.base_info.iter().any(|h| h == text) {
            Some(Section::BaseInfo)
        } else if level == 2 && text == headings.request_headers {
            Some(Section::RequestHeaders)
        } else if level == 2 && text == headings.request_parameters {
            Some(Section::RequestParameters)
        } else if level == 2 && text.contains(headings.response_parameters.as_str()) {
            Some(Section::ResponseParameters)
        } else if level == 3 && headings.error_example.iter().any(|h| text.contains(h.as_str())) {
            Some(Section::ErrorExample)
        } else if level == 3 && headings.response_example.iter().any(|h| text.contains(h.as_str())) {
            Some(Section::SuccessExample)
        } else {
            None
        }
    }

    /// Blocks after `index` up to the next heading of the same or a higher
    /// level.
    fn section_blocks(&self, index: usize) -> &[Block] {
        let level = self.blocks[index].heading().map_or(u8::MAX, |(level, _)| level);
        let rest = &self.blocks[index + 1..];
        let end = rest
            .iter()
            .position(|block| block.heading().is_some_and(|(l, _)| l <= level))
            .unwrap_or(rest.len());
        &rest[..end]
    }

    fn read_description(&mut self, index: usize) {
        let text: Vec<String> = self
            .section_blocks(index)
            .iter()
            .filter(|block| !matches!(block, Block::Heading { .. }))
            .filter_map(Block::text)
            .filter(|text| !text.trim().is_empty())
            .collect();
        if !text.is_empty() {
            self.document.description = Some(text.join("\n"));
        }
    }

    /// The trailing `schema_prefix_segments` segments of the documentation
    /// location.
    fn fallback_path(&self) -> Option<String> {
        self.doc_path
            .as_deref()
            .map(|doc_path| base_info::trailing_path(doc_path, self.config.schema_prefix_segments))
    }

    fn read_base_info(&mut self, index: usize) {
        let fallback_path = self.fallback_path();
        let section = self.section_blocks(index);
        let info = match section.first() {
            Some(Block::Table(grid)) => Some(BaseInfo::from_table(
                grid,
                &self.config.base_info_keys,
                fallback_path.as_deref(),
            )),
            _ => section
                .iter()
                .take_while(|block| block.heading().is_none())
                .enumerate()
                .find_map(|(offset, block)| {
                    let text = block.text()?;
                    let previous = match offset {
                        0 => None,
                        _ => section[offset - 1].text(),
                    };
                    BaseInfo::from_text(&text, previous.as_deref())
                }),
        };

        let Some(info) = info else {
            debug!("Base info section names no method or path");
            return;
        };
        if info.method.is_some() {
            self.document.method = info.method;
        }
        if info.path.is_some() {
            self.document.path = info.path;
        }
        self.document.servers.extend(info.servers);
    }

    fn read_headers(&mut self, index: usize) -> Result<()> {
        let fields = match self.blocks.get(index + 1).cloned() {
            Some(Block::List(items)) => items.iter().filter_map(|item| self.header_item(item)).collect(),
            Some(block) if block.is_field_source() => read_field_block(
                &block,
                &mut self.document.tree,
                self.config,
                &mut self.document.diagnostics,
            )?,
            _ => Vec::new(),
        };
        self.document.header_fields = fields;
        Ok(())
    }

    /// One `name: value` (or `name：value`) header list item. A name that is
    /// itself a column alias sets that attribute instead.
    fn header_item(&mut self, item: &str) -> Option<FieldId> {
        let (name, value) = item.split_once([':', '：'])?;
        let (name, value) = (name.trim(), value.trim());

        let mut field = Field::default();
        match attr_for_column(name) {
            Some(attr) if !name.is_empty() => apply_attr(&mut field, attr, value),
            _ => {
                field.name = name.to_string();
                field.description = value.to_string();
                field.type_token = Some("string".to_string());
            }
        }
        if field.name.trim().is_empty() {
            self.document.diagnostics.discarded_rows += 1;
            return None;
        }
        apply_field_rules(&mut field, self.config);
        Some(self.document.tree.push(field))
    }

    fn read_request_parameters(&mut self, index: usize) -> Result<()> {
        let is_query = match self.blocks.get(index + 1) {
            Some(Block::Heading { text, .. }) => {
                self.config.headings.query_markers.iter().any(|m| m == text.trim())
            }
            _ => false,
        };

        if is_query {
            let source = self
                .section_blocks(index)
                .iter()
                .find(|block| block.is_field_source())
                .cloned();
            if let Some(block) = source {
                self.document.query_fields = read_field_block(
                    &block,
                    &mut self.document.tree,
                    self.config,
                    &mut self.document.diagnostics,
                )?;
            }
        } else {
            self.document.body_fields = parse_stitched_section(
                &self.blocks,
                index,
                &mut self.document.tree,
                self.config,
                &mut self.document.diagnostics,
            )?;
        }
        Ok(())
    }

    fn example_after(&self, index: usize) -> Option<String> {
        match self.blocks.get(index + 1)? {
            Block::Code(text) | Block::Paragraph(text) => Some(text.trim().to_string()),
            _ => None,
        }
    }

    fn collect_dropped_defaults(&mut self) {
        let document = &self.document;
        let mut synth = SchemaSynthesizer::new(&document.tree);
        let roots = document
            .header_fields
            .iter()
            .chain(&document.query_fields)
            .chain(&document.body_fields)
            .chain(&document.response_fields);
        for root in roots {
            for id in document.tree.descendants(*root) {
                synth.schema_of(id);
                synth.alternate_schemas(id);
            }
        }
        let dropped = synth.dropped_defaults().to_vec();
        self.document.diagnostics.dropped_defaults = dropped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::HttpMethod;

    fn parse(input: &str) -> ApiDocument {
        let config = ParserConfig::default();
        DocParser::new(input, &config).parse().unwrap()
    }

    fn names(doc: &ApiDocument, ids: &[FieldId]) -> Vec<String> {
        ids.iter().map(|id| doc.tree.get(*id).name.clone()).collect()
    }

    #[test]
    fn test_description_and_examples() {
        let doc = parse(
            "## 接口说明\n\n获取用户的公开信息。\n\n需要用户授权。\n\n## 响应参数\n\n\
             | 名称 | 类型 |\n| --- | --- |\n| err_no | int |\n\n\
             ### 正常示例\n\n```json\n{\"err_no\": 0}\n```\n\n\
             ### 异常示例\n\n```json\n{\"err_no\": 28001}\n```\n",
        );
        assert_eq!(
            doc.description.as_deref(),
            Some("获取用户的公开信息。\n需要用户授权。")
        );
        assert_eq!(doc.success_example.as_deref(), Some("{\"err_no\": 0}"));
        assert_eq!(doc.error_example.as_deref(), Some("{\"err_no\": 28001}"));
        assert_eq!(names(&doc, &doc.response_fields), vec!["err_no"]);
    }

    #[test]
    fn test_base_info_from_method_line() {
        let doc = parse("## 请求地址\n\nPOST https://open.douyin.com/oauth/access_token/\n");
        assert_eq!(doc.method, Some(HttpMethod::Post));
        assert_eq!(doc.path.as_deref(), Some("/oauth/access_token/"));
        assert_eq!(doc.servers[0].url, "https://open.douyin.com");
    }

    #[test]
    fn test_header_list_items() {
        let doc = parse(
            "## 请求头\n\n- access-token: 调用 /oauth/client_token/ 生成的 token\n- content-type：固定值 application/json\n",
        );
        assert_eq!(names(&doc, &doc.header_fields), vec!["access-token", "content-type"]);
        let content_type = doc.tree.get(doc.header_fields[1]);
        assert_eq!(content_type.default_value.as_deref(), Some("application/json"));
        assert_eq!(content_type.type_token.as_deref(), Some("string"));
    }

    #[test]
    fn test_query_sub_heading() {
        let doc = parse(
            "## 请求参数\n\n### Query\n\n| 参数名 | 类型 | 必填 |\n| --- | --- | --- |\n| open_id | string | 是 |\n",
        );
        assert_eq!(names(&doc, &doc.query_fields), vec!["open_id"]);
        assert!(doc.tree.get(doc.query_fields[0]).required);
        assert!(doc.body_fields.is_empty());
    }

    #[test]
    fn test_body_without_query_heading() {
        let doc = parse(
            "## 请求参数\n\n| 参数名 | 类型 |\n| --- | --- |\n| client_key | string |\n| grant_type | string |\n",
        );
        assert_eq!(names(&doc, &doc.body_fields), vec!["client_key", "grant_type"]);
        assert!(doc.query_fields.is_empty());
    }

    #[test]
    fn test_document_path_fallback_and_sections() {
        let config = ParserConfig::default();
        let doc = DocParser::new("## 请求参数\n\n| 参数名 | 类型 |\n| --- | --- |\n| a | int |\n", &config)
            .with_doc_path("/docs/openapi/account-permission/get-access-token")
            .parse()
            .unwrap();
        assert_eq!(
            doc.path.as_deref(),
            Some("/account-permission/get-access-token")
        );
        assert_eq!(doc.diagnostics.sections, vec!["请求参数"]);
        assert_eq!(doc.schema_prefix(), "AccountPermissionGetAccessToken");
    }

    #[test]
    fn test_document_path_fallback_follows_prefix_segments() {
        let config = ParserConfig {
            schema_prefix_segments: 3,
            ..ParserConfig::default()
        };
        let page = "## 基本信息\n\n| 名称 | 描述 |\n| --- | --- |\n| HTTP URL | 见下方说明 |\n";

        let doc = DocParser::new(page, &config)
            .with_doc_path("/docs/openapi/account-permission/get-access-token")
            .parse()
            .unwrap();
        assert_eq!(
            doc.path.as_deref(),
            Some("/openapi/account-permission/get-access-token")
        );
        assert_eq!(doc.schema_prefix(), "OpenapiAccountPermissionGetAccessToken");

        let doc = DocParser::new("## 请求参数\n\n| 参数名 | 类型 |\n| --- | --- |\n| a | int |\n", &config)
            .with_doc_path("/docs/openapi/account-permission/get-access-token")
            .parse()
            .unwrap();
        assert_eq!(
            doc.path.as_deref(),
            Some("/openapi/account-permission/get-access-token")
        );
    }

    #[test]
    fn test_dropped_defaults_are_reported() {
        let doc = parse(
            "## 响应参数\n\n| 名称 | 类型 | 默认值 |\n| --- | --- | --- |\n| count | int | many |\n",
        );
        assert_eq!(doc.diagnostics.dropped_defaults.len(), 1);
        assert_eq!(doc.diagnostics.dropped_defaults[0].field, "count");
    }
}
