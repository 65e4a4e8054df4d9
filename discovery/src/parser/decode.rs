//! Field row decoding.
//!
//! Each data row of a [`TableGrid`] becomes at most one [`Field`]. Header
//! texts are mapped to field attributes through [`COLUMN_SETTERS`], an
//! ordered predicate table where the first match wins.

use apidoc_schema_core::Field;
use tracing::debug;

use super::grid::{ColumnRanges, GridCell, TableGrid};
use super::html::collapse_whitespace;
use crate::config::ParserConfig;
use crate::report::ParseDiagnostics;

/// Field attribute a column populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAttr {
    Name,
    Type,
    Required,
    Description,
    Example,
    Default,
    MaxLength,
}

pub type ColumnPredicate = fn(&str) -> bool;

/// Header predicates in priority order.
pub const COLUMN_SETTERS: &[(ColumnPredicate, FieldAttr)] = &[
    (is_name_column, FieldAttr::Name),
    (is_type_column, FieldAttr::Type),
    (is_required_column, FieldAttr::Required),
    (is_description_column, FieldAttr::Description),
    (is_example_column, FieldAttr::Example),
    (is_default_column, FieldAttr::Default),
    (is_max_length_column, FieldAttr::MaxLength),
];

fn is_name_column(column: &str) -> bool {
    matches!(column, "" | "参数" | "属性" | "参数名" | "字段名") || column.contains("名称")
}

fn is_type_column(column: &str) -> bool {
    column.contains("类型")
}

// 必须 / 必需 / 必填 / 必传
fn is_required_column(column: &str) -> bool {
    column.contains('必')
}

fn is_description_column(column: &str) -> bool {
    column == "说明" || column.contains("描述") || column.contains("备注")
}

fn is_example_column(column: &str) -> bool {
    column.contains("示例")
}

fn is_default_column(column: &str) -> bool {
    column == "默认值"
}

fn is_max_length_column(column: &str) -> bool {
    column == "最大长度"
}

/// Attribute for a header text, or `None` when the column is not used.
///
/// # Examples
///
/// ```
/// use apidoc_schema_discovery::parser::decode::{FieldAttr, attr_for_column};
///
/// assert_eq!(attr_for_column("参数名称"), Some(FieldAttr::Name));
/// assert_eq!(attr_for_column("是否必填"), Some(FieldAttr::Required));
/// assert_eq!(attr_for_column("取值范围"), None);
/// ```
pub fn attr_for_column(column: &str) -> Option<FieldAttr> {
    let column = column.trim();
    COLUMN_SETTERS
        .iter()
        .find(|(matches, _)| matches(column))
        .map(|(_, attr)| *attr)
}

/// Writes `value` into the attribute of `field`.
pub fn apply_attr(field: &mut Field, attr: FieldAttr, value: &str) {
    match attr {
        FieldAttr::Name => field.name = value.to_string(),
        FieldAttr::Type => field.type_token = Some(value.to_string()),
        FieldAttr::Required => {
            let value = value.trim();
            field.required = value == "是" || value.eq_ignore_ascii_case("true");
        }
        FieldAttr::Description => field.description = value.to_string(),
        FieldAttr::Example => field.example = Some(value.to_string()),
        FieldAttr::Default => field.default_value = Some(value.to_string()),
        FieldAttr::MaxLength => field.max_length = Some(value.to_string()),
    }
}

/// A decoded row and its nesting index.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRow {
    pub field: Field,
    /// Depth from leading `.`/`-` markers, or the ordinal of the cell that
    /// carried the name when there are none.
    pub nesting_index: usize,
}

/// Decodes rows of one table.
pub struct RowDecoder<'a> {
    config: &'a ParserConfig,
    columns: Vec<String>,
    ranges: ColumnRanges,
}

impl<'a> RowDecoder<'a> {
    pub fn new(config: &'a ParserConfig, grid: &TableGrid) -> Self {
        Self {
            config,
            columns: grid.columns(),
            ranges: grid.ranges(),
        }
    }

    /// Header name for a cell at `position` (last covered position) with
    /// the given ordinal in its row.
    ///
    /// A blank range falls back to the first column for ordinal 1, else to
    /// the nearest non-blank header before the ordinal.
    pub fn effective_column(&self, position: usize, ordinal: usize) -> &str {
        let mapped = self.ranges.lookup(position).unwrap_or("");
        if !mapped.trim().is_empty() {
            return mapped;
        }
        if ordinal == 1 {
            return self.columns.first().map_or("", String::as_str);
        }
        self.columns[..ordinal.min(self.columns.len())]
            .iter()
            .rev()
            .find(|column| !column.trim().is_empty())
            .map_or("", String::as_str)
    }

    /// Decodes one row. Returns `None` for rows whose name is blank or a
    /// placeholder, before or after stripping nesting markers.
    pub fn decode(&self, row: &[GridCell], diagnostics: &mut ParseDiagnostics) -> Option<DecodedRow> {
        let mut field = Field::default();
        let mut name_ordinal = 0;
        let mut position_end = 0;

        for (ordinal, cell) in row.iter().enumerate() {
            position_end += cell.width();
            let value = collapse_whitespace(&cell.text);
            if value.is_empty() {
                continue;
            }

            let column = self.effective_column(position_end - 1, ordinal);
            match attr_for_column(column) {
                Some(attr) => {
                    let had_name = !field.name.is_empty();
                    apply_attr(&mut field, attr, &value);
                    if !had_name && !field.name.is_empty() {
                        name_ordinal = ordinal;
                    }
                }
                None => diagnostics.record_ignored_column(column),
            }
        }

        let name = field.name.trim().to_string();
        if is_placeholder(&name) {
            diagnostics.discarded_rows += 1;
            return None;
        }

        let nesting_index = match name.chars().next() {
            Some(marker @ ('.' | '-')) => {
                let depth = name.chars().take_while(|c| *c == marker).count();
                let stripped = name[depth * marker.len_utf8()..].trim().to_string();
                if is_placeholder(&stripped) {
                    diagnostics.discarded_rows += 1;
                    return None;
                }
                field.name = stripped;
                depth
            }
            _ => {
                field.name = name;
                name_ordinal
            }
        };

        apply_field_rules(&mut field, self.config);
        Some(DecodedRow {
            field,
            nesting_index,
        })
    }

    /// Decodes every data row of `grid`, skipping discarded rows.
    pub fn decode_all(&self, grid: &TableGrid, diagnostics: &mut ParseDiagnostics) -> Vec<DecodedRow> {
        grid.rows
            .iter()
            .filter_map(|row| self.decode(row, diagnostics))
            .collect()
    }
}

fn is_placeholder(name: &str) -> bool {
    name.is_empty() || name == "." || name == "-"
}

/// Name- and description-driven rules applied once all cells are read.
///
/// - Content-type fields documented as JSON become `string` with default
///   `application/json`.
/// - Otherwise the default-value and example markers in the description
///   fill in a default and an example when no column gave one.
/// - Names that are always strings get `string` when no type was given.
/// - A `msg` string described as JSON becomes `Json Object`.
pub fn apply_field_rules(field: &mut Field, config: &ParserConfig) {
    if config.is_content_type_name(&field.name) {
        if field
            .description
            .to_ascii_lowercase()
            .contains("application/json")
        {
            field.type_token = Some("string".to_string());
            field.default_value = Some("application/json".to_string());
        }
    } else {
        if field.default_value.is_none() {
            field.default_value = marked_value(&field.description, &config.default_value_marker);
        }
        if field.example.is_none() {
            field.example = marked_value(&field.description, &config.example_marker);
        }
    }

    if field.type_token.is_none() && config.is_always_string_name(&field.name) {
        field.type_token = Some("string".to_string());
    }

    if field.name == "msg"
        && field.resolved_type() == "string"
        && field.description.to_ascii_lowercase().contains("json")
    {
        debug!(field = %field.name, "Description marks string field as JSON payload");
        field.type_token = Some("Json Object".to_string());
    }
}

/// First value following `marker` (or `marker：`) in `text`, cut at the next
/// separator, with quotes removed.
///
/// # Examples
///
/// ```
/// use apidoc_schema_discovery::parser::decode::marked_value;
///
/// assert_eq!(
///     marked_value("授权类型，固定值：\"client_credential\"", "固定值"),
///     Some("client_credential".to_string())
/// );
/// assert_eq!(marked_value("授权类型", "固定值"), None);
/// ```
pub fn marked_value(text: &str, marker: &str) -> Option<String> {
    if marker.is_empty() {
        return None;
    }
    let start = text.find(marker)? + marker.len();
    let rest = text[start..].trim_start_matches(['：', ':', ' ']);
    let value: String = rest
        .split(|c: char| c.is_whitespace() || matches!(c, '，' | ',' | '。' | '；' | ';' | '、' | '）' | ')'))
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| !matches!(c, '"' | '“' | '”' | '\'' | '`'))
        .collect();
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> TableGrid {
        TableGrid::from_rows(
            rows.iter()
                .map(|row| row.iter().map(|text| GridCell::new(*text)).collect())
                .collect(),
        )
        .unwrap()
    }

    fn decode_rows(rows: &[&[&str]]) -> (Vec<DecodedRow>, ParseDiagnostics) {
        let config = ParserConfig::default();
        let grid = grid(rows);
        let decoder = RowDecoder::new(&config, &grid);
        let mut diagnostics = ParseDiagnostics::default();
        let decoded = decoder.decode_all(&grid, &mut diagnostics);
        (decoded, diagnostics)
    }

    #[test]
    fn test_basic_row() {
        let (rows, _) = decode_rows(&[
            &["参数", "类型", "必填", "描述"],
            &["userId", "string", "是", "用户 ID"],
        ]);
        let field = &rows[0].field;
        assert_eq!(field.name, "userId");
        assert_eq!(field.type_token.as_deref(), Some("string"));
        assert!(field.required);
        assert_eq!(field.description, "用户 ID");
        assert_eq!(rows[0].nesting_index, 0);
    }

    #[test]
    fn test_setter_order_first_match_wins() {
        // "名称" matches the name predicate before "类型".
        assert_eq!(attr_for_column("类型名称"), Some(FieldAttr::Name));
        assert_eq!(attr_for_column("说明"), Some(FieldAttr::Description));
        assert_eq!(attr_for_column("默认值"), Some(FieldAttr::Default));
        assert_eq!(attr_for_column("默认值说明"), None);
    }

    #[test]
    fn test_dot_markers_set_nesting_index() {
        let (rows, _) = decode_rows(&[
            &["参数名", "类型"],
            &["items", "[]object"],
            &[".itemName", "string"],
            &["..sku", "string"],
        ]);
        assert_eq!(rows[1].field.name, "itemName");
        assert_eq!(rows[1].nesting_index, 1);
        assert_eq!(rows[2].field.name, "sku");
        assert_eq!(rows[2].nesting_index, 2);
    }

    #[test]
    fn test_dash_marker_and_placeholders() {
        let (rows, diagnostics) = decode_rows(&[
            &["参数名", "类型"],
            &["-", "string"],
            &["--", "string"],
            &["", "string"],
            &["- open_id", "string"],
        ]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].field.name, "open_id");
        assert_eq!(rows[0].nesting_index, 1);
        assert_eq!(diagnostics.discarded_rows, 3);
    }

    #[test]
    fn test_cell_position_gives_fallback_nesting() {
        let (rows, _) = decode_rows(&[
            &["参数名", "", "类型"],
            &["data", "", "object"],
            &["", "open_id", "string"],
        ]);
        assert_eq!(rows[0].nesting_index, 0);
        assert_eq!(rows[1].field.name, "open_id");
        assert_eq!(rows[1].nesting_index, 1);
        assert_eq!(rows[1].field.type_token.as_deref(), Some("string"));
    }

    #[test]
    fn test_unknown_columns_are_recorded() {
        let (rows, diagnostics) = decode_rows(&[
            &["参数名", "取值范围"],
            &["count", "1-10"],
        ]);
        assert_eq!(rows[0].field.name, "count");
        assert!(diagnostics.ignored_columns.contains("取值范围"));
    }

    #[test]
    fn test_content_type_json_rule() {
        let (rows, _) = decode_rows(&[
            &["名称", "描述"],
            &["Content-Type", "固定值 application/json"],
        ]);
        let field = &rows[0].field;
        assert_eq!(field.type_token.as_deref(), Some("string"));
        assert_eq!(field.default_value.as_deref(), Some("application/json"));
    }

    #[test]
    fn test_description_markers() {
        let (rows, _) = decode_rows(&[
            &["名称", "描述"],
            &["grant_type", "授权类型，固定值：\"client_credential\""],
            &["open_id", "用户标识，示例：ba253642"],
        ]);
        assert_eq!(rows[0].field.default_value.as_deref(), Some("client_credential"));
        assert_eq!(rows[0].field.resolved_type(), "string");
        assert_eq!(rows[1].field.example.as_deref(), Some("ba253642"));
    }

    #[test]
    fn test_msg_described_as_json_is_an_object() {
        let (rows, _) = decode_rows(&[
            &["名称", "类型", "描述"],
            &["msg", "string", "JSON 格式的消息体"],
        ]);
        assert_eq!(rows[0].field.type_token.as_deref(), Some("Json Object"));
        assert!(rows[0].field.is_object_type());
    }

    #[test]
    fn test_always_string_names() {
        let (rows, _) = decode_rows(&[&["名称", "描述"], &["access-token", "调用凭证"]]);
        assert_eq!(rows[0].field.type_token.as_deref(), Some("string"));
    }

    #[test]
    fn test_colspan_rows_use_last_covered_position() {
        let config = ParserConfig::default();
        let grid = TableGrid {
            header: vec![
                GridCell::spanning("参数名", 2),
                GridCell::new("类型"),
                GridCell::new("描述"),
            ],
            rows: vec![vec![
                GridCell::new(""),
                GridCell::new("open_id"),
                GridCell::new("string"),
                GridCell::new("用户标识"),
            ]],
        };
        let decoder = RowDecoder::new(&config, &grid);
        let mut diagnostics = ParseDiagnostics::default();
        let row = decoder.decode(&grid.rows[0], &mut diagnostics).unwrap();
        assert_eq!(row.field.name, "open_id");
        assert_eq!(row.nesting_index, 1);
        assert_eq!(row.field.type_token.as_deref(), Some("string"));
        assert_eq!(row.field.description, "用户标识");
    }
}
