//! Parse diagnostics.
//!
//! Everything the parser skips or reconciles silently is counted here, so a
//! caller can judge how well a page matched the expected conventions.

use std::collections::BTreeSet;

use apidoc_schema_core::DroppedDefault;
use serde::{Deserialize, Serialize};

/// Counters and notes collected while parsing one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseDiagnostics {
    /// Rows dropped because their name was blank or a placeholder.
    pub discarded_rows: usize,
    /// Nested rows with no enclosing object row to attach to.
    pub orphan_rows: usize,
    /// Header texts that matched no field attribute.
    pub ignored_columns: BTreeSet<String>,
    /// Defaults that could not be represented in the field's schema.
    pub dropped_defaults: Vec<DroppedDefault>,
    /// Follow-up tables attached to a previously documented field.
    pub stitched_blocks: usize,
    /// Follow-up tables that resolved to a field defined by the table itself.
    pub skipped_blocks: usize,
    /// Keys of alternate child sets recorded during stitching.
    pub alternate_child_sets: Vec<String>,
    /// Sections recognized, in document order.
    pub sections: Vec<String>,
}

impl ParseDiagnostics {
    pub fn record_ignored_column(&mut self, column: &str) {
        if !self.ignored_columns.contains(column) {
            self.ignored_columns.insert(column.to_string());
        }
    }

    /// Human-readable summary of everything worth a second look.
    ///
    /// # Examples
    ///
    /// ```
    /// use apidoc_schema_discovery::ParseDiagnostics;
    ///
    /// let mut diagnostics = ParseDiagnostics::default();
    /// assert!(diagnostics.warnings().is_empty());
    ///
    /// diagnostics.orphan_rows = 2;
    /// assert_eq!(diagnostics.warnings(), vec!["2 nested rows had no parent row and were dropped"]);
    /// ```
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.discarded_rows > 0 {
            warnings.push(format!(
                "{} rows with blank or placeholder names were skipped",
                self.discarded_rows
            ));
        }

        if self.orphan_rows > 0 {
            warnings.push(format!(
                "{} nested rows had no parent row and were dropped",
                self.orphan_rows
            ));
        }

        if !self.ignored_columns.is_empty() {
            let columns: Vec<&str> = self.ignored_columns.iter().map(String::as_str).collect();
            warnings.push(format!("Ignored columns: {}", columns.join(", ")));
        }

        for dropped in &self.dropped_defaults {
            warnings.push(format!(
                "Default `{}` of field `{}` does not fit its type and was dropped",
                dropped.value, dropped.field
            ));
        }

        if self.skipped_blocks > 0 {
            warnings.push(format!(
                "{} follow-up tables described only their own fields and were not attached",
                self.skipped_blocks
            ));
        }

        if !self.alternate_child_sets.is_empty() {
            warnings.push(format!(
                "Fields redefined with a different shape: {}",
                self.alternate_child_sets.join(", ")
            ));
        }

        warnings
    }
}
