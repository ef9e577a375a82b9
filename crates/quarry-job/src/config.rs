//! Job configuration payloads and the closed job-kind table.
//!
//! A [`JobConfiguration`] is the opaque request document handed to the
//! remote warehouse API. It stays caller-shaped except for one mutation
//! before submission: standard pipeline and task labels are merged into its
//! `labels` map. Everything else in this module is read-only inspection of
//! that document, keyed off the closed [`JobKind`] enum.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Label key carrying the lowercased pipeline id.
pub const PIPELINE_LABEL_KEY: &str = "quarry-pipeline";

/// Label key carrying the lowercased task id.
pub const TASK_LABEL_KEY: &str = "quarry-task";

/// The closed set of job kinds the remote API accepts.
///
/// The kind is identified by the top-level configuration key of the same
/// name. Dispatch on kind happens by `match`, never by downcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// A SQL query job.
    Query,
    /// A load job ingesting external data into a table.
    Load,
    /// A table-to-table copy job.
    Copy,
    /// An extract job exporting a table to external storage.
    Extract,
}

impl JobKind {
    /// All kinds, in detection order.
    pub const ALL: [JobKind; 4] = [JobKind::Query, JobKind::Load, JobKind::Copy, JobKind::Extract];

    /// Returns the configuration key identifying this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            JobKind::Query => "query",
            JobKind::Load => "load",
            JobKind::Copy => "copy",
            JobKind::Extract => "extract",
        }
    }

    /// Returns the configuration fields holding table references for this
    /// kind.
    #[must_use]
    pub const fn table_reference_fields(self) -> &'static [&'static str] {
        match self {
            JobKind::Query => &["destinationTable"],
            JobKind::Load | JobKind::Copy => &["sourceTable", "destinationTable"],
            JobKind::Extract => &["sourceTable"],
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table touched by a job, as recorded in its configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableReference {
    /// An unparsed string path such as `project.dataset.table`.
    Path(String),
    /// A structured reference with all three components spelled out.
    Structured {
        /// Project owning the table.
        project_id: String,
        /// Dataset containing the table.
        dataset_id: String,
        /// The table name itself.
        table_id: String,
    },
}

impl std::fmt::Display for TableReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableReference::Path(path) => f.write_str(path),
            TableReference::Structured {
                project_id,
                dataset_id,
                table_id,
            } => write!(f, "{project_id}.{dataset_id}.{table_id}"),
        }
    }
}

/// The request document for one remote job.
///
/// Structurally opaque: any JSON object is accepted, and unknown keys pass
/// through to the remote API untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobConfiguration(Map<String, Value>);

impl JobConfiguration {
    /// Wraps a JSON value as a job configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the value is not a JSON
    /// object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::invalid_configuration(format!(
                "job configuration must be a JSON object, got {}",
                value_type_name(&other)
            ))),
        }
    }

    /// Builds the configuration for a plain SQL query job.
    #[must_use]
    pub fn for_query(sql: impl Into<String>, use_legacy_sql: bool) -> Self {
        let mut query = Map::new();
        query.insert("query".to_owned(), Value::String(sql.into()));
        query.insert("useLegacySql".to_owned(), Value::Bool(use_legacy_sql));

        let mut map = Map::new();
        map.insert("query".to_owned(), Value::Object(query));
        Self(map)
    }

    /// Returns the job kind identified by the configuration's top-level
    /// keys, if any.
    ///
    /// When more than one kind key is present (the remote API rejects such
    /// documents anyway), the first in [`JobKind::ALL`] order wins.
    #[must_use]
    pub fn kind(&self) -> Option<JobKind> {
        JobKind::ALL
            .into_iter()
            .find(|kind| self.0.contains_key(kind.as_str()))
    }

    /// Returns the SQL text of a query configuration, if present.
    #[must_use]
    pub fn query_text(&self) -> Option<&str> {
        self.0.get("query")?.get("query")?.as_str()
    }

    /// Returns the `labels` map, if present and an object.
    #[must_use]
    pub fn labels(&self) -> Option<&Map<String, Value>> {
        self.0.get("labels").and_then(Value::as_object)
    }

    /// Returns the underlying map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the configuration, returning it as a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Encodes the configuration as canonical JSON bytes.
    ///
    /// The encoding sorts object keys at every level, so two configurations
    /// with the same content hash identically regardless of insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized.
    pub fn canonical_bytes(&self) -> std::result::Result<Vec<u8>, quarry_core::CanonicalJsonError> {
        quarry_core::to_canonical_bytes(&self.0)
    }

    /// Merges the standard pipeline and task labels into the configuration.
    ///
    /// Both ids are lowercased first. Injection happens only when both
    /// lowercased values satisfy the label charset (a lowercase letter
    /// followed by up to 63 letters, digits, `_`, or `-`); otherwise the
    /// configuration is left untouched. Caller-supplied labels are kept,
    /// with the standard keys winning on collision. A `labels` value that
    /// is not an object also skips injection.
    pub fn inject_standard_labels(&mut self, pipeline_id: &str, task_id: &str) {
        let pipeline_label = pipeline_id.to_lowercase();
        let task_label = task_id.to_lowercase();
        if !is_label_safe(&pipeline_label) || !is_label_safe(&task_label) {
            return;
        }

        match self.0.get_mut("labels") {
            Some(Value::Object(existing)) => {
                existing.insert(PIPELINE_LABEL_KEY.to_owned(), Value::String(pipeline_label));
                existing.insert(TASK_LABEL_KEY.to_owned(), Value::String(task_label));
            }
            Some(_) => {}
            None => {
                let mut labels = Map::new();
                labels.insert(PIPELINE_LABEL_KEY.to_owned(), Value::String(pipeline_label));
                labels.insert(TASK_LABEL_KEY.to_owned(), Value::String(task_label));
                self.0.insert("labels".to_owned(), Value::Object(labels));
            }
        }
    }

    /// Extracts every table reference recorded in the configuration.
    ///
    /// Scans all kind keys (not just the detected one) and, for each, the
    /// fields named by [`JobKind::table_reference_fields`]. String values
    /// become [`TableReference::Path`]; objects with `projectId`,
    /// `datasetId`, and `tableId` become [`TableReference::Structured`].
    /// Fields of any other shape are skipped.
    #[must_use]
    pub fn table_references(&self) -> Vec<TableReference> {
        let mut tables = Vec::new();
        for kind in JobKind::ALL {
            let Some(section) = self.0.get(kind.as_str()).and_then(Value::as_object) else {
                continue;
            };
            for field in kind.table_reference_fields() {
                match section.get(*field) {
                    Some(Value::String(path)) => tables.push(TableReference::Path(path.clone())),
                    Some(Value::Object(table)) => {
                        if let Some(reference) = structured_reference(table) {
                            tables.push(reference);
                        }
                    }
                    _ => {}
                }
            }
        }
        tables
    }
}

fn structured_reference(table: &Map<String, Value>) -> Option<TableReference> {
    Some(TableReference::Structured {
        project_id: table.get("projectId")?.as_str()?.to_owned(),
        dataset_id: table.get("datasetId")?.as_str()?.to_owned(),
        table_id: table.get("tableId")?.as_str()?.to_owned(),
    })
}

/// Checks a lowercased label value against the remote API's label charset.
fn is_label_safe(value: &str) -> bool {
    if value.len() > 64 {
        return false;
    }
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_lowercase() && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
