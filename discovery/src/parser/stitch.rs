//! Cross-section stitching.
//!
//! A response or body section often documents nested objects in separate
//! tables further down the page, each introduced by a heading or sentence
//! that names the field it describes. The first table gives the section's
//! roots; every later table is attached to the field its nearest preceding
//! heading or paragraph names.

use apidoc_schema_core::{Field, FieldId, FieldKey, FieldTree};
use indexmap::IndexMap;
use tracing::debug;

use super::blocks::Block;
use super::decode::RowDecoder;
use super::embedded::import_fields;
use super::tree::build_rows;
use crate::config::ParserConfig;
use crate::error::{DiscoveryError, Result};
use crate::report::ParseDiagnostics;

/// How an identifier matched a known field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The field name starts with the identifier (ASCII case-insensitive).
    Name,
    /// The field type token contains the identifier.
    Type,
    /// The field description mentions the identifier; the described object
    /// is a new child of the field.
    Description,
}

/// A known object or array field, as seen by [`resolve_attachment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownField {
    pub id: FieldId,
    pub name: String,
    pub type_token: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub target: FieldId,
    pub kind: MatchKind,
}

/// Finds the first known field that `ident` refers to.
///
/// Fields are tested in order, each against the name, type and description
/// rules in that order.
///
/// # Examples
///
/// ```
/// use apidoc_schema_core::FieldId;
/// use apidoc_schema_discovery::parser::stitch::{KnownField, MatchKind, resolve_attachment};
///
/// let known = vec![KnownField {
///     id: FieldId(0),
///     name: "UserInfo".into(),
///     type_token: "object".into(),
///     description: String::new(),
/// }];
///
/// let found = resolve_attachment(&known, "user").unwrap();
/// assert_eq!(found.target, FieldId(0));
/// assert_eq!(found.kind, MatchKind::Name);
/// assert!(resolve_attachment(&known, "order").is_none());
/// ```
pub fn resolve_attachment(known: &[KnownField], ident: &str) -> Option<Attachment> {
    if ident.is_empty() {
        return None;
    }
    let lowered = ident.to_ascii_lowercase();
    known.iter().find_map(|field| {
        let kind = if field.name.to_ascii_lowercase().starts_with(&lowered) {
            MatchKind::Name
        } else if field.type_token.contains(ident) {
            MatchKind::Type
        } else if field.description.contains(ident) {
            MatchKind::Description
        } else {
            return None;
        };
        Some(Attachment {
            target: field.id,
            kind,
        })
    })
}

/// Identifier carried by a heading or paragraph: the ASCII letters and
/// underscores of its first whitespace-separated token that has any.
///
/// # Examples
///
/// ```
/// use apidoc_schema_discovery::parser::stitch::heading_ident;
///
/// assert_eq!(heading_ident("user_info 结构").as_deref(), Some("user_info"));
/// assert_eq!(heading_ident("3.1 Extra"), Some("Extra".to_string()));
/// assert_eq!(heading_ident("字段说明"), None);
/// ```
pub fn heading_ident(text: &str) -> Option<String> {
    text.split_whitespace()
        .map(|token| {
            token
                .chars()
                .filter(|c| *c == '_' || c.is_ascii_alphabetic())
                .collect::<String>()
        })
        .find(|ident| !ident.is_empty())
}

/// Reads the fields of a table or embedded block into `tree` and returns
/// its roots. Other blocks yield nothing.
pub fn read_field_block(
    block: &Block,
    tree: &mut FieldTree,
    config: &ParserConfig,
    diagnostics: &mut ParseDiagnostics,
) -> Result<Vec<FieldId>> {
    match block {
        Block::Table(grid) => {
            let rows = RowDecoder::new(config, grid).decode_all(grid, diagnostics);
            Ok(build_rows(tree, rows, diagnostics))
        }
        Block::Embedded(payload) => import_fields(payload, tree, config),
        _ => Ok(Vec::new()),
    }
}

/// Object and array fields seen so far in one section, keyed by structural
/// identity. The first field registered for a key keeps it.
#[derive(Debug, Default)]
struct KnownFields {
    by_key: IndexMap<FieldKey, FieldId>,
}

impl KnownFields {
    fn register_subtrees(&mut self, tree: &FieldTree, roots: &[FieldId]) {
        for root in roots {
            for id in tree.descendants(*root) {
                if tree.get(id).is_array_or_object() {
                    self.by_key.entry(tree.get(id).key()).or_insert(id);
                }
            }
        }
    }

    fn snapshot(&self, tree: &FieldTree) -> Vec<KnownField> {
        self.by_key
            .values()
            .map(|id| {
                let field = tree.get(*id);
                KnownField {
                    id: *id,
                    name: field.name.clone(),
                    type_token: field.resolved_type().into_owned(),
                    description: field.description.clone(),
                }
            })
            .collect()
    }
}

/// Parses the section whose heading is `blocks[heading_index]`, attaching
/// every follow-up table to the field it describes, and returns the roots
/// of the section's first table.
///
/// The section ends at the next heading of the same or a higher level.
///
/// # Errors
///
/// [`DiscoveryError::UnresolvedSection`] when no heading or paragraph before
/// a follow-up table names a known field, or any error from reading an
/// embedded field list.
pub fn parse_stitched_section(
    blocks: &[Block],
    heading_index: usize,
    tree: &mut FieldTree,
    config: &ParserConfig,
    diagnostics: &mut ParseDiagnostics,
) -> Result<Vec<FieldId>> {
    let level = blocks
        .get(heading_index)
        .and_then(Block::heading)
        .map_or(u8::MAX, |(level, _)| level);
    let section_end = blocks[heading_index + 1..]
        .iter()
        .position(|block| block.heading().is_some_and(|(l, _)| l <= level))
        .map_or(blocks.len(), |offset| heading_index + 1 + offset);
    let section = heading_index + 1..section_end;

    let Some(first) = section.clone().find(|i| blocks[*i].is_field_source()) else {
        return Ok(Vec::new());
    };

    let roots = read_field_block(&blocks[first], tree, config, diagnostics)?;
    let mut known = KnownFields::default();
    known.register_subtrees(tree, &roots);

    for index in first + 1..section.end {
        let block = &blocks[index];
        if !block.is_field_source() {
            continue;
        }
        let new_roots = read_field_block(block, tree, config, diagnostics)?;
        if new_roots.is_empty() {
            continue;
        }
        known.register_subtrees(tree, &new_roots);
        attach_block(blocks, index, &new_roots, tree, &mut known, diagnostics)?;
        inherit_known_children(&new_roots, tree, &known);
    }

    Ok(roots)
}

fn attach_block(
    blocks: &[Block],
    index: usize,
    new_roots: &[FieldId],
    tree: &mut FieldTree,
    known: &mut KnownFields,
    diagnostics: &mut ParseDiagnostics,
) -> Result<()> {
    let snapshot = known.snapshot(tree);
    let (ident, attachment) = blocks[..index]
        .iter()
        .rev()
        .filter(|block| matches!(block, Block::Heading { .. } | Block::Paragraph(_)))
        .filter_map(|block| block.text().as_deref().and_then(heading_ident))
        .find_map(|ident| resolve_attachment(&snapshot, &ident).map(|found| (ident, found)))
        .ok_or_else(|| DiscoveryError::UnresolvedSection {
            block: block_label(&blocks[index]),
        })?;

    let mut targets = vec![attachment.target];
    if attachment.kind == MatchKind::Description {
        let placeholder = tree.push(Field::new(ident.as_str()).with_type("object"));
        tree.attach_child(attachment.target, placeholder);
        known.register_subtrees(tree, &[placeholder]);
        targets = vec![placeholder];
    }
    for field in &snapshot {
        if !targets.contains(&field.id)
            && (field.type_token.contains(&ident) || field.name == ident)
        {
            targets.push(field.id);
        }
    }
    targets.retain(|target| !new_roots.iter().any(|root| tree.reaches(*root, *target)));

    if targets.is_empty() {
        debug!(ident = %ident, "Follow-up table names one of its own fields; not attached");
        diagnostics.skipped_blocks += 1;
        return Ok(());
    }

    let mut attached = false;
    for target in targets {
        let existing = tree.get(target).children.clone();
        if existing.is_empty() {
            debug!(field = %tree.get(target).name, ident = %ident, "Attaching follow-up table");
            tree.set_children(target, new_roots.to_vec());
            attached = true;
        } else if !tree.same_children(&existing, new_roots) {
            let key = tree.add_alternate_child_set(target, new_roots.to_vec());
            debug!(field = %tree.get(target).name, key = %key, "Field redefined with a different shape");
            diagnostics.alternate_child_sets.push(key);
            attached = true;
        }
    }
    if attached {
        diagnostics.stitched_blocks += 1;
    }
    Ok(())
}

/// New roots without children take the children of the field first
/// registered under the same identity.
fn inherit_known_children(new_roots: &[FieldId], tree: &mut FieldTree, known: &KnownFields) {
    for root in new_roots {
        if !tree.get(*root).children.is_empty() {
            continue;
        }
        let Some(&source) = known.by_key.get(&tree.get(*root).key()) else {
            continue;
        };
        if source == *root {
            continue;
        }
        let children = tree.get(source).children.clone();
        if children.is_empty() || children.iter().any(|child| tree.reaches(*child, *root)) {
            continue;
        }
        debug!(field = %tree.get(*root).name, "Reusing children of an earlier definition");
        tree.set_children(*root, children);
    }
}

fn block_label(block: &Block) -> String {
    match block {
        Block::Table(grid) => grid.summary(),
        Block::Embedded(payload) => payload.chars().take(60).collect(),
        other => other.text().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::grid::{GridCell, TableGrid};

    fn table(rows: &[&[&str]]) -> Block {
        Block::Table(
            TableGrid::from_rows(
                rows.iter()
                    .map(|row| row.iter().map(|text| GridCell::new(*text)).collect())
                    .collect(),
            )
            .unwrap(),
        )
    }

    fn heading(level: u8, text: &str) -> Block {
        Block::Heading {
            level,
            text: text.into(),
        }
    }

    fn names(tree: &FieldTree, ids: &[FieldId]) -> Vec<String> {
        ids.iter().map(|id| tree.get(*id).name.clone()).collect()
    }

    fn parse(blocks: &[Block]) -> (Result<Vec<FieldId>>, FieldTree, ParseDiagnostics) {
        let mut tree = FieldTree::new();
        let mut diagnostics = ParseDiagnostics::default();
        let roots = parse_stitched_section(
            blocks,
            0,
            &mut tree,
            &ParserConfig::default(),
            &mut diagnostics,
        );
        (roots, tree, diagnostics)
    }

    #[test]
    fn test_follow_up_table_attaches_by_heading_name() {
        let blocks = vec![
            heading(2, "响应参数"),
            table(&[&["名称", "类型"], &["data", "object"], &["err_no", "int"]]),
            heading(3, "data 结构"),
            table(&[&["名称", "类型"], &["open_id", "string"], &["user", "object"]]),
            heading(3, "user"),
            table(&[&["名称", "类型"], &["nickname", "string"]]),
        ];
        let (roots, tree, diagnostics) = parse(&blocks);
        let roots = roots.unwrap();

        assert_eq!(names(&tree, &roots), vec!["data", "err_no"]);
        let data = tree.get(roots[0]);
        assert_eq!(names(&tree, &data.children), vec!["open_id", "user"]);
        let user = tree.get(data.children[1]);
        assert_eq!(names(&tree, &user.children), vec!["nickname"]);
        assert_eq!(diagnostics.stitched_blocks, 2);
    }

    #[test]
    fn test_type_and_description_matches() {
        let blocks = vec![
            heading(2, "响应参数"),
            table(&[
                &["名称", "类型", "描述"],
                &["list", "[]Item", "条目"],
                &["extra", "object", "见下方 Cursor 说明"],
            ]),
            Block::Paragraph("Item 定义".into()),
            table(&[&["名称", "类型"], &["sku", "string"]]),
            Block::Paragraph("Cursor".into()),
            table(&[&["名称", "类型"], &["next", "int64"]]),
        ];
        let (roots, tree, _) = parse(&blocks);
        let roots = roots.unwrap();

        let list = tree.get(roots[0]);
        assert_eq!(names(&tree, &list.children), vec!["sku"]);
        let extra = tree.get(roots[1]);
        assert_eq!(names(&tree, &extra.children), vec!["Cursor"]);
        let cursor = tree.get(extra.children[0]);
        assert_eq!(names(&tree, &cursor.children), vec!["next"]);
    }

    #[test]
    fn test_redefinition_becomes_alternate_child_set() {
        let blocks = vec![
            heading(2, "响应参数"),
            table(&[&["名称", "类型"], &["extra", "object"]]),
            heading(3, "extra"),
            table(&[&["名称", "类型"], &["logid", "string"]]),
            heading(3, "extra"),
            table(&[&["名称", "类型"], &["now", "int64"], &["logid", "string"]]),
        ];
        let (roots, tree, diagnostics) = parse(&blocks);
        let extra = tree.get(roots.unwrap()[0]);

        assert_eq!(names(&tree, &extra.children), vec!["logid"]);
        let alternate = &extra.alternate_child_sets["extra1"];
        assert_eq!(names(&tree, alternate), vec!["now", "logid"]);
        assert_eq!(diagnostics.alternate_child_sets, vec!["extra1"]);
    }

    #[test]
    fn test_identical_redefinition_is_ignored() {
        let blocks = vec![
            heading(2, "响应参数"),
            table(&[&["名称", "类型"], &["extra", "object"]]),
            heading(3, "extra"),
            table(&[&["名称", "类型"], &["logid", "string"]]),
            heading(3, "extra"),
            table(&[&["名称", "类型"], &["logid", "string"]]),
        ];
        let (roots, tree, diagnostics) = parse(&blocks);
        let extra = tree.get(roots.unwrap()[0]);
        assert!(extra.alternate_child_sets.is_empty());
        assert_eq!(diagnostics.stitched_blocks, 1);
    }

    #[test]
    fn test_unresolved_follow_up_is_fatal() {
        let blocks = vec![
            heading(2, "响应参数"),
            table(&[&["名称", "类型"], &["data", "object"]]),
            heading(3, "补充说明"),
            table(&[&["名称", "类型"], &["code", "int"]]),
        ];
        let (roots, _, _) = parse(&blocks);
        assert!(matches!(
            roots,
            Err(DiscoveryError::UnresolvedSection { block }) if block.contains("code")
        ));
    }

    #[test]
    fn test_section_ends_at_same_level_heading() {
        let blocks = vec![
            heading(2, "响应参数"),
            table(&[&["名称", "类型"], &["data", "object"]]),
            heading(2, "错误码"),
            table(&[&["错误码", "描述"], &["28001", "参数错误"]]),
        ];
        let (roots, tree, diagnostics) = parse(&blocks);
        let roots = roots.unwrap();
        assert_eq!(names(&tree, &roots), vec!["data"]);
        assert!(tree.get(roots[0]).children.is_empty());
        assert_eq!(diagnostics.stitched_blocks, 0);
    }

    #[test]
    fn test_repeated_field_inherits_children() {
        let blocks = vec![
            heading(2, "响应参数"),
            table(&[&["名称", "类型"], &["data", "object"], &["owner", "object"]]),
            heading(3, "owner"),
            table(&[&["名称", "类型"], &["uid", "int64"]]),
            heading(3, "data"),
            table(&[&["名称", "类型"], &["owner", "object"], &["title", "string"]]),
        ];
        let (roots, tree, _) = parse(&blocks);
        let data = tree.get(roots.unwrap()[0]);
        let owner = tree.get(data.children[0]);
        assert_eq!(owner.name, "owner");
        assert_eq!(names(&tree, &owner.children), vec!["uid"]);
    }

    #[test]
    fn test_heading_ident_skips_numbering() {
        assert_eq!(heading_ident("2.1 list 字段").as_deref(), Some("list"));
        assert_eq!(heading_ident("").as_deref(), None);
    }
}
