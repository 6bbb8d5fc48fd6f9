use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::amount::parse_amount;
use crate::error::DashError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatasetName(String);

impl DatasetName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human title derived from a camelCase name: `staffDistribution` becomes
    /// `Staff Distribution`.
    pub fn default_title(&self) -> String {
        let mut title = String::with_capacity(self.0.len() + 4);
        let mut prev_lower = false;
        for (idx, ch) in self.0.chars().enumerate() {
            if ch == '_' || ch == '-' {
                title.push(' ');
                prev_lower = false;
                continue;
            }
            if ch.is_ascii_uppercase() && prev_lower {
                title.push(' ');
            }
            if idx == 0 || title.ends_with(' ') {
                title.push(ch.to_ascii_uppercase());
            } else {
                title.push(ch);
            }
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        }
        title
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DatasetName {
    type Err = DashError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let is_valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
        if !is_valid {
            return Err(DashError::InvalidDatasetName(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

impl TryFrom<String> for DatasetName {
    type Error = DashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DatasetName> for String {
    fn from(value: DatasetName) -> Self {
        value.0
    }
}

/// The `{ range, majorDimension, values }` shape shared by the remote reply
/// and the persisted cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetValues {
    #[serde(default)]
    pub range: String,
    #[serde(default = "default_major_dimension")]
    pub major_dimension: String,
    #[serde(default, deserialize_with = "deserialize_cells")]
    pub values: Vec<Vec<String>>,
}

fn default_major_dimension() -> String {
    "ROWS".to_string()
}

fn deserialize_cells<'de, D>(deserializer: D) -> Result<Vec<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let rows: Vec<Vec<Value>> = Vec::deserialize(deserializer)?;
    Ok(rows
        .into_iter()
        .map(|row| row.into_iter().map(cell_to_string).collect())
        .collect())
}

fn cell_to_string(cell: Value) -> String {
    match cell {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl SheetValues {
    /// Converts a raw reply into a ready dataset, dropping the header row.
    pub fn into_dataset(mut self, name: DatasetName) -> Dataset {
        if !self.values.is_empty() {
            self.values.remove(0);
        }
        Dataset {
            name,
            range: self.range,
            major_dimension: self.major_dimension,
            rows: self.values,
        }
    }
}

/// A named table of string cells. Rows hold data only; the header row is gone
/// by the time a `Dataset` exists.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub name: DatasetName,
    pub range: String,
    pub major_dimension: String,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(name: DatasetName, rows: Vec<Vec<String>>) -> Self {
        Self {
            name,
            range: String::new(),
            major_dimension: default_major_dimension(),
            rows,
        }
    }

    /// Rebuilds a dataset from an already header-stripped persisted value.
    pub fn from_stored(name: DatasetName, stored: SheetValues) -> Self {
        Self {
            name,
            range: stored.range,
            major_dimension: stored.major_dimension,
            rows: stored.values,
        }
    }

    pub fn to_stored(&self) -> SheetValues {
        SheetValues {
            range: self.range.clone(),
            major_dimension: self.major_dimension.clone(),
            values: self.rows.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn label(&self, row: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Second cell of every row, with missing or non-numeric cells read as zero.
    pub fn primary_values(&self) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| row.get(1).map(|cell| parse_amount(cell)).unwrap_or(0.0))
            .collect()
    }

    pub fn primary_total(&self) -> f64 {
        self.primary_values().iter().sum()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Reachable,
    Unreachable,
}

impl Connectivity {
    pub fn is_reachable(self) -> bool {
        matches!(self, Connectivity::Reachable)
    }
}

impl From<bool> for Connectivity {
    fn from(connected: bool) -> Self {
        if connected {
            Connectivity::Reachable
        } else {
            Connectivity::Unreachable
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Reachable => write!(f, "reachable"),
            Connectivity::Unreachable => write!(f, "unreachable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_from_camel_case() {
        let name: DatasetName = "staffDistribution".parse().unwrap();
        assert_eq!(name.default_title(), "Staff Distribution");
        let name: DatasetName = "income".parse().unwrap();
        assert_eq!(name.default_title(), "Income");
    }

    #[test]
    fn reply_without_values_is_empty() {
        let raw: SheetValues =
            serde_json::from_str(r#"{"range":"income!A1:Z1000","majorDimension":"ROWS"}"#)
                .unwrap();
        let dataset = raw.into_dataset("income".parse().unwrap());
        assert!(dataset.is_empty());
    }
}
