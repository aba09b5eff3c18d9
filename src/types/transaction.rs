//! Transaction record data structures

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell of a transaction record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
    /// JSON `null` or an absent cell
    Missing,
}

impl FieldValue {
    /// True for JSON `null` and absent cells
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    /// Numeric view: numbers as-is, booleans as 0/1, numeric text parsed
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) if v.is_finite() => Some(*v),
            FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Binary-label view: booleans, numbers and `true/false/yes/no` text
    pub fn as_flag(&self) -> Option<f64> {
        match self {
            FieldValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "fraud" => Some(1.0),
                "false" | "no" | "legit" => Some(0.0),
                _ => self.as_f64(),
            },
            other => other.as_f64(),
        }
    }

    /// Categorical view: every present value has a string form
    pub fn as_category(&self) -> Option<String> {
        match self {
            FieldValue::Missing => None,
            FieldValue::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Convert one JSON value. Nested arrays and objects are kept as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Missing,
            serde_json::Value::Bool(b) => FieldValue::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(FieldValue::Number)
                .unwrap_or(FieldValue::Missing),
            serde_json::Value::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(v) => write!(f, "{}", v),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Missing => write!(f, "<missing>"),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// An ordered mapping of column name to value.
///
/// Column names are unique; inserting an existing name replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionRecord {
    fields: Vec<(String, FieldValue)>,
}

impl TransactionRecord {
    /// Empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field, replacing an existing value in place
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Value of a field by name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Whether the field is present (a `Missing` value still counts)
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Field names in insertion order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// `(name, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a record from a JSON object.
    ///
    /// Field order follows the JSON map; consumers that care about order
    /// (the fitted preprocessor) look fields up by name.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            PipelineError::invalid_input("<record>", "transaction must be a JSON object")
        })?;
        Ok(object
            .iter()
            .fold(Self::new(), |record, (k, v)| record.with(k.clone(), FieldValue::from_json(v))))
    }

    /// Parse a record from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| PipelineError::invalid_input("<record>", e.to_string()))?;
        Self::from_json(&value)
    }
}

impl FromIterator<(String, FieldValue)> for TransactionRecord {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |record, (k, v)| record.with(k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_json() {
        let record = TransactionRecord::from_json_str(
            r#"{"amount": 500000, "transaction_type": "TRANSFER", "flag": true, "note": null}"#,
        )
        .unwrap();

        assert_eq!(record.len(), 4);
        assert_eq!(record.get("amount"), Some(&FieldValue::Number(500000.0)));
        assert_eq!(
            record.get("transaction_type"),
            Some(&FieldValue::Text("TRANSFER".to_string()))
        );
        assert_eq!(record.get("flag"), Some(&FieldValue::Bool(true)));
        assert!(record.get("note").unwrap().is_missing());
    }

    #[test]
    fn test_non_object_rejected() {
        let err = TransactionRecord::from_json_str("[1, 2]").unwrap_err();
        assert_eq!(err.code(), "INVALID_TRANSACTION_INPUT");
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut record = TransactionRecord::new().with("a", 1.0).with("b", "x");
        record.insert("a", 2.0);
        let cols: Vec<&str> = record.columns().collect();
        assert_eq!(cols, vec!["a", "b"]);
        assert_eq!(record.get("a"), Some(&FieldValue::Number(2.0)));
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(FieldValue::Bool(true).as_f64(), Some(1.0));
        assert_eq!(FieldValue::Text(" 12.5 ".to_string()).as_f64(), Some(12.5));
        assert_eq!(FieldValue::Text("abc".to_string()).as_f64(), None);
        assert_eq!(FieldValue::Missing.as_f64(), None);
        assert_eq!(FieldValue::Number(3.0).as_category(), Some("3".to_string()));
    }

    #[test]
    fn test_flag_view() {
        assert_eq!(FieldValue::from(" Yes ").as_flag(), Some(1.0));
        assert_eq!(FieldValue::from("False").as_flag(), Some(0.0));
        assert_eq!(FieldValue::from("1").as_flag(), Some(1.0));
        assert_eq!(FieldValue::Bool(false).as_flag(), Some(0.0));
        assert_eq!(FieldValue::from("maybe").as_flag(), None);
        assert_eq!(FieldValue::Missing.as_flag(), None);
    }

    #[test]
    fn test_field_value_serde() {
        let values: Vec<FieldValue> = serde_json::from_str(r#"[true, 1.5, "x", null]"#).unwrap();
        assert_eq!(
            values,
            vec![
                FieldValue::Bool(true),
                FieldValue::Number(1.5),
                FieldValue::Text("x".to_string()),
                FieldValue::Missing
            ]
        );
    }
}
