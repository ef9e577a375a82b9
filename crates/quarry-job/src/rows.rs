//! Row fetching over the job protocol.
//!
//! The fetch flavor reads a slice of a table by generating a bounded
//! `SELECT` and running it as an ordinary query job: same identity rules,
//! same conflict handling, same deferral. Rows arrive either from the
//! client after a blocking wait or inside the watch event's `records`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::JobConfiguration;

/// Rows fetched per table by default.
pub const DEFAULT_MAX_RESULTS: u64 = 100;

/// What to read and how to shape the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOptions {
    /// Project owning the table, when different from the job project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_project_id: Option<String>,
    /// Dataset containing the table.
    pub dataset_id: String,
    /// The table to read.
    pub table_id: String,
    /// Cap on the number of rows fetched.
    #[serde(default = "default_max_results")]
    pub max_results: u64,
    /// Comma-separated columns to select; all columns when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_fields: Option<String>,
    /// Return rows as field-keyed mappings instead of value tuples.
    #[serde(default)]
    pub as_mappings: bool,
    /// Generate the query in the legacy dialect.
    #[serde(default = "default_use_legacy_sql")]
    pub use_legacy_sql: bool,
}

fn default_max_results() -> u64 {
    DEFAULT_MAX_RESULTS
}

fn default_use_legacy_sql() -> bool {
    true
}

impl FetchOptions {
    /// Creates fetch options for a table with the default row cap.
    #[must_use]
    pub fn new(dataset_id: impl Into<String>, table_id: impl Into<String>) -> Self {
        Self {
            table_project_id: None,
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
            max_results: default_max_results(),
            selected_fields: None,
            as_mappings: false,
            use_legacy_sql: default_use_legacy_sql(),
        }
    }

    /// Reads the table from a different project than the job runs in.
    #[must_use]
    pub fn with_table_project(mut self, project_id: impl Into<String>) -> Self {
        self.table_project_id = Some(project_id.into());
        self
    }

    /// Caps the number of rows fetched.
    #[must_use]
    pub const fn with_max_results(mut self, max_results: u64) -> Self {
        self.max_results = max_results;
        self
    }

    /// Restricts the selected columns.
    #[must_use]
    pub fn with_selected_fields(mut self, fields: impl Into<String>) -> Self {
        self.selected_fields = Some(fields.into());
        self
    }

    /// Returns rows as field-keyed mappings instead of value tuples.
    #[must_use]
    pub const fn with_mappings(mut self, as_mappings: bool) -> Self {
        self.as_mappings = as_mappings;
        self
    }

    /// Selects the SQL dialect the generated query uses.
    #[must_use]
    pub const fn with_legacy_sql(mut self, use_legacy_sql: bool) -> Self {
        self.use_legacy_sql = use_legacy_sql;
        self
    }

    /// Generates the bounded `SELECT` reading this table slice.
    ///
    /// `default_project` is used when no table project is pinned.
    #[must_use]
    pub fn select_sql(&self, default_project: &str) -> String {
        let fields = self.selected_fields.as_deref().unwrap_or("*");
        let project = self.table_project_id.as_deref().unwrap_or(default_project);
        format!(
            "select {fields} from `{project}.{}.{}` limit {}",
            self.dataset_id, self.table_id, self.max_results
        )
    }

    /// Builds the query job configuration running the generated `SELECT`.
    #[must_use]
    pub fn to_configuration(&self, default_project: &str) -> JobConfiguration {
        JobConfiguration::for_query(self.select_sql(default_project), self.use_legacy_sql)
    }
}

/// Shapes fetched rows to the caller's preference.
///
/// With `as_mappings` the rows pass through untouched. Otherwise each
/// object row is flattened to a tuple of its values; rows of any other
/// shape pass through.
#[must_use]
pub fn shape_rows(rows: Vec<Value>, as_mappings: bool) -> Vec<Value> {
    if as_mappings {
        return rows;
    }
    rows.into_iter()
        .map(|row| match row {
            Value::Object(fields) => Value::Array(fields.into_iter().map(|(_, v)| v).collect()),
            other => other,
        })
        .collect()
}
