//! Normalization of caller input into a row-oriented dataset.

use crate::error::{EvalError, Result};
use crate::models::{EvaluationRecord, Sample};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Samples in dataset order, one row per sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<Sample>,
}

impl Dataset {
    pub fn from_samples(rows: Vec<Sample>) -> Self {
        Self { rows }
    }

    /// Read a newline-delimited JSON file. Blank lines are skipped.
    pub fn from_jsonl(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| EvalError::ReadDataset {
            path: path.to_path_buf(),
            source,
        })?;

        let rows = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|source| EvalError::InvalidRecord {
                    line: index + 1,
                    source,
                })
            })
            .collect::<Result<Vec<Sample>>>()?;

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Sample] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Sample] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether every row carries a non-blank response
    pub fn has_responses(&self) -> bool {
        self.rows.iter().all(|row| row.answer().is_some())
    }

    /// Convert into the scoring engine's record format.
    ///
    /// Fails on the first row whose response is missing or blank.
    pub fn to_records(&self) -> Result<Vec<EvaluationRecord>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let response = row.answer().ok_or(EvalError::IncompleteDataset { index })?;
                Ok(EvaluationRecord {
                    user_input: row.user_input.clone(),
                    response: response.to_string(),
                    reference: row.reference.clone(),
                })
            })
            .collect()
    }
}

/// Anything that can be normalized into a [`Dataset`]
pub trait IntoDataset {
    fn into_dataset(self) -> Result<Dataset>;
}

impl IntoDataset for Dataset {
    fn into_dataset(self) -> Result<Dataset> {
        Ok(self)
    }
}

impl IntoDataset for Vec<Sample> {
    fn into_dataset(self) -> Result<Dataset> {
        Ok(Dataset::from_samples(self))
    }
}

impl IntoDataset for &[Sample] {
    fn into_dataset(self) -> Result<Dataset> {
        Ok(Dataset::from_samples(self.to_vec()))
    }
}

impl IntoDataset for &Path {
    fn into_dataset(self) -> Result<Dataset> {
        Dataset::from_jsonl(self)
    }
}

impl IntoDataset for PathBuf {
    fn into_dataset(self) -> Result<Dataset> {
        Dataset::from_jsonl(&self)
    }
}

/// Untyped input: an array of samples or an object `{"path": "..."}`.
/// Everything else, including a bare string, is rejected.
impl IntoDataset for Value {
    fn into_dataset(self) -> Result<Dataset> {
        match self {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    serde_json::from_value(item)
                        .map_err(|source| EvalError::InvalidSample { index, source })
                })
                .collect::<Result<Vec<Sample>>>()
                .map(Dataset::from_samples),
            Value::Object(map) if map.len() == 1 => match map.get("path") {
                Some(Value::String(path)) => Dataset::from_jsonl(Path::new(path)),
                _ => Err(invalid_input("object")),
            },
            other => Err(invalid_input(value_kind(&other))),
        }
    }
}

fn invalid_input(found: &str) -> EvalError {
    EvalError::InvalidInputType {
        found: found.to_string(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
