//! Nesting-stack tree assembly for the rows of one table.

use std::collections::BTreeMap;

use apidoc_schema_core::{FieldId, FieldTree};
use tracing::debug;

use super::decode::DecodedRow;
use crate::report::ParseDiagnostics;

/// Pushes decoded rows into `tree`, linking each to the nearest enclosing
/// object row, and returns the root-level (index 0) rows in order.
///
/// Object and array-of-object rows register at their own index, replacing
/// only the entry at that index. A row at index `i` attaches to the entry
/// at the nearest registered index below `i`; scalar rows never register,
/// so a scalar sibling leaves the previous object's scope open. A nested row
/// with nothing registered below it is an orphan, but an orphan object row
/// still registers so its own children attach to it.
///
/// # Examples
///
/// ```
/// use apidoc_schema_core::{Field, FieldTree};
/// use apidoc_schema_discovery::ParseDiagnostics;
/// use apidoc_schema_discovery::parser::decode::DecodedRow;
/// use apidoc_schema_discovery::parser::tree::build_rows;
///
/// let rows = vec![
///     DecodedRow { field: Field::new("items").with_type("[]object"), nesting_index: 0 },
///     DecodedRow { field: Field::new("itemName").with_type("string"), nesting_index: 1 },
/// ];
/// let mut tree = FieldTree::new();
/// let mut diagnostics = ParseDiagnostics::default();
/// let roots = build_rows(&mut tree, rows, &mut diagnostics);
///
/// assert_eq!(roots.len(), 1);
/// let child = tree.get(roots[0]).children[0];
/// assert_eq!(tree.get(child).name, "itemName");
/// ```
pub fn build_rows(
    tree: &mut FieldTree,
    rows: Vec<DecodedRow>,
    diagnostics: &mut ParseDiagnostics,
) -> Vec<FieldId> {
    let mut scopes: BTreeMap<usize, FieldId> = BTreeMap::new();
    let mut roots = Vec::new();

    for DecodedRow {
        field,
        nesting_index,
    } in rows
    {
        let opens_scope = field.is_object_type() || field.is_array_object();
        let id = tree.push(field);

        match scopes.range(..nesting_index).next_back() {
            Some((_, &parent)) => tree.attach_child(parent, id),
            None if nesting_index > 0 => {
                debug!(
                    field = %tree.get(id).name,
                    nesting_index,
                    "Nested row has no enclosing object row"
                );
                diagnostics.orphan_rows += 1;
            }
            None => roots.push(id),
        }

        if opens_scope {
            scopes.insert(nesting_index, id);
        }
    }

    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use apidoc_schema_core::Field;

    fn row(name: &str, type_token: &str, nesting_index: usize) -> DecodedRow {
        DecodedRow {
            field: Field::new(name).with_type(type_token),
            nesting_index,
        }
    }

    fn names(tree: &FieldTree, ids: &[FieldId]) -> Vec<String> {
        ids.iter().map(|id| tree.get(*id).name.clone()).collect()
    }

    #[test]
    fn test_nested_rows_attach_to_innermost_scope() {
        let mut tree = FieldTree::new();
        let mut diagnostics = ParseDiagnostics::default();
        let roots = build_rows(
            &mut tree,
            vec![
                row("data", "object", 0),
                row("user", "object", 1),
                row("uid", "int64", 2),
                row("nickname", "string", 2),
                row("total", "int", 1),
                row("extra", "object", 0),
            ],
            &mut diagnostics,
        );

        assert_eq!(names(&tree, &roots), vec!["data", "extra"]);
        let data = tree.get(roots[0]);
        assert_eq!(names(&tree, &data.children), vec!["user", "total"]);
        let user = tree.get(data.children[0]);
        assert_eq!(names(&tree, &user.children), vec!["uid", "nickname"]);
        assert_eq!(tree.get(user.children[0]).parent, Some(data.children[0]));
    }

    #[test]
    fn test_scalar_rows_do_not_open_scopes() {
        let mut tree = FieldTree::new();
        let mut diagnostics = ParseDiagnostics::default();
        let roots = build_rows(
            &mut tree,
            vec![
                row("data", "object", 0),
                row("count", "int", 1),
                row("id", "string", 2),
            ],
            &mut diagnostics,
        );

        // `id` skips the scalar `count` and lands under `data`.
        let data = tree.get(roots[0]);
        assert_eq!(names(&tree, &data.children), vec!["count", "id"]);
    }

    #[test]
    fn test_scalar_sibling_keeps_object_scope_open() {
        let mut tree = FieldTree::new();
        let mut diagnostics = ParseDiagnostics::default();
        let roots = build_rows(
            &mut tree,
            vec![
                row("data", "object", 0),
                row("a", "object", 1),
                row("b", "int", 1),
                row("c", "string", 2),
            ],
            &mut diagnostics,
        );

        let data = tree.get(roots[0]);
        assert_eq!(names(&tree, &data.children), vec!["a", "b"]);
        let a = tree.get(data.children[0]);
        assert_eq!(names(&tree, &a.children), vec!["c"]);
        assert!(tree.get(data.children[1]).children.is_empty());
    }

    #[test]
    fn test_sibling_object_replaces_scope_at_its_index() {
        let mut tree = FieldTree::new();
        let mut diagnostics = ParseDiagnostics::default();
        let roots = build_rows(
            &mut tree,
            vec![
                row("data", "object", 0),
                row("a", "object", 1),
                row("x", "string", 2),
                row("b", "object", 1),
                row("y", "string", 2),
            ],
            &mut diagnostics,
        );

        let data = tree.get(roots[0]);
        assert_eq!(names(&tree, &data.children), vec!["a", "b"]);
        assert_eq!(names(&tree, &tree.get(data.children[0]).children), vec!["x"]);
        assert_eq!(names(&tree, &tree.get(data.children[1]).children), vec!["y"]);
    }

    #[test]
    fn test_orphan_object_keeps_its_children() {
        let mut tree = FieldTree::new();
        let mut diagnostics = ParseDiagnostics::default();
        let roots = build_rows(
            &mut tree,
            vec![
                row("info", "object", 1),
                row("x", "string", 2),
                row("code", "int", 0),
            ],
            &mut diagnostics,
        );

        assert_eq!(names(&tree, &roots), vec!["code"]);
        assert_eq!(diagnostics.orphan_rows, 1);
        let info = tree
            .iter()
            .find(|(_, field)| field.name == "info")
            .map(|(id, _)| id)
            .expect("info row is in the tree");
        assert_eq!(names(&tree, &tree.get(info).children), vec!["x"]);
    }

    #[test]
    fn test_orphans_are_counted_not_returned() {
        let mut tree = FieldTree::new();
        let mut diagnostics = ParseDiagnostics::default();
        let roots = build_rows(
            &mut tree,
            vec![row("open_id", "string", 1), row("code", "int", 0)],
            &mut diagnostics,
        );

        assert_eq!(names(&tree, &roots), vec!["code"]);
        assert_eq!(diagnostics.orphan_rows, 1);
    }
}
