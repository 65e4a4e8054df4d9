//! Table grids and header range maps.
//!
//! A [`TableGrid`] is the format-independent form of a table: a header row
//! and data rows of [`GridCell`]s. [`ColumnRanges`] maps cell positions to
//! header names, honoring `colspan` on header cells.

/// One table cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GridCell {
    pub text: String,
    /// Declared `colspan`, if any.
    pub colspan: Option<usize>,
}

impl GridCell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            colspan: None,
        }
    }

    pub fn spanning(text: impl Into<String>, colspan: usize) -> Self {
        Self {
            text: text.into(),
            colspan: Some(colspan),
        }
    }

    /// Number of positions the cell covers. A missing or zero span counts
    /// as one.
    pub fn width(&self) -> usize {
        self.colspan.unwrap_or(1).max(1)
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A parsed table: the first row is the header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableGrid {
    pub header: Vec<GridCell>,
    pub rows: Vec<Vec<GridCell>>,
}

impl TableGrid {
    /// Builds a grid from rows, taking the first as the header. Returns
    /// `None` when there are no rows at all.
    pub fn from_rows(mut rows: Vec<Vec<GridCell>>) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let header = rows.remove(0);
        Some(Self { header, rows })
    }

    /// Header texts by ordinal, trimmed.
    pub fn columns(&self) -> Vec<String> {
        self.header
            .iter()
            .map(|cell| cell.text.trim().to_string())
            .collect()
    }

    pub fn ranges(&self) -> ColumnRanges {
        ColumnRanges::from_header(&self.header)
    }

    /// Header row followed by data rows, as plain text.
    pub fn all_rows(&self) -> impl Iterator<Item = &Vec<GridCell>> {
        std::iter::once(&self.header).chain(self.rows.iter())
    }

    /// Short label for logs and errors.
    pub fn summary(&self) -> String {
        let first = self
            .rows
            .first()
            .and_then(|row| row.iter().find(|cell| !cell.is_blank()))
            .map(|cell| cell.text.trim().to_string())
            .unwrap_or_default();
        format!("{} | first row: {}", self.columns().join(" | "), first)
    }
}

/// A header name covering positions `start..end` (`end == None` means
/// "`start` and everything after").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRange {
    pub start: usize,
    pub end: Option<usize>,
    pub name: String,
}

impl ColumnRange {
    pub fn contains(&self, position: usize) -> bool {
        position >= self.start && self.end.is_none_or(|end| position < end)
    }
}

/// Position to header-name map.
///
/// Blank header cells extend the range of the non-blank header before them;
/// the last header covers every position from its start onwards.
///
/// # Examples
///
/// ```
/// use apidoc_schema_discovery::parser::grid::{ColumnRanges, GridCell};
///
/// let header = vec![
///     GridCell::spanning("参数名", 3),
///     GridCell::new("类型"),
///     GridCell::new("描述"),
/// ];
/// let ranges = ColumnRanges::from_header(&header);
/// assert_eq!(ranges.lookup(0), Some("参数名"));
/// assert_eq!(ranges.lookup(2), Some("参数名"));
/// assert_eq!(ranges.lookup(3), Some("类型"));
/// assert_eq!(ranges.lookup(9), Some("描述"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnRanges {
    ranges: Vec<ColumnRange>,
}

impl ColumnRanges {
    pub fn from_header(header: &[GridCell]) -> Self {
        let Some(first) = header.first() else {
            return Self::default();
        };

        let offset = |ordinal: usize| -> usize { header[..ordinal].iter().map(GridCell::width).sum() };

        let mut ranges = Vec::new();
        let mut start = 0;
        let mut name = first.text.trim().to_string();

        for (end, cell) in header.iter().enumerate().skip(1) {
            if cell.is_blank() {
                continue;
            }
            ranges.push(ColumnRange {
                start: offset(start),
                end: Some(offset(end)),
                name,
            });
            start = end;
            name = cell.text.trim().to_string();
        }

        ranges.push(ColumnRange {
            start: offset(start),
            end: None,
            name,
        });

        Self { ranges }
    }

    pub fn lookup(&self, position: usize) -> Option<&str> {
        self.ranges
            .iter()
            .find(|range| range.contains(position))
            .map(|range| range.name.as_str())
    }

    pub fn ranges(&self) -> &[ColumnRange] {
        &self.ranges
    }
}

/// Reads a pipe table out of plain text lines.
///
/// Lines without `|` and separator lines (only `|`, `-`, `:` and spaces) are
/// skipped. Each remaining line is split on `|`, dropping the empty edges.
/// Returns `None` when fewer than two table lines are found.
///
/// # Examples
///
/// ```
/// use apidoc_schema_discovery::parser::grid::parse_pipe_table;
///
/// let text = "| 名称 | 类型 |\n| --- | --- |\n| open_id | string |";
/// let grid = parse_pipe_table(text).unwrap();
/// assert_eq!(grid.columns(), vec!["名称", "类型"]);
/// assert_eq!(grid.rows[0][0].text, "open_id");
/// ```
pub fn parse_pipe_table(text: &str) -> Option<TableGrid> {
    let rows: Vec<Vec<GridCell>> = text
        .lines()
        .map(str::trim)
        .filter(|line| line.contains('|') && !is_separator_line(line))
        .map(split_pipe_line)
        .collect();

    if rows.len() < 2 {
        return None;
    }
    TableGrid::from_rows(rows)
}

fn is_separator_line(line: &str) -> bool {
    line.contains('-') && line.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

fn split_pipe_line(line: &str) -> Vec<GridCell> {
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner
        .split('|')
        .map(|cell| GridCell::new(clean_cell_text(cell)))
        .collect()
}

/// Removes `<br/>` tags and emphasis asterisks, then trims.
pub fn clean_cell_text(text: &str) -> String {
    text.replace("<br/>", "")
        .replace("<br>", "")
        .replace('*', "")
        .trim()
        .to_string()
}
