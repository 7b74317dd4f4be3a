//! Table content extracted from table crops.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Structured content of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableContent {
    /// Column names, in display order
    pub columns: Vec<String>,

    /// One mapping of column name to cell value per row
    pub rows: Vec<BTreeMap<String, String>>,

    /// Short natural-language description
    pub description: String,
}

impl TableContent {
    /// Parse raw extractor output into a table.
    ///
    /// Accepts a bare JSON object or one wrapped in a markdown code fence.
    /// Non-string cell values are rendered to strings.
    pub fn parse(raw: &str) -> Result<Self> {
        let body = strip_code_fence(raw.trim());
        let value: Value = serde_json::from_str(body)
            .map_err(|e| Error::MalformedTable(format!("invalid JSON: {}", e)))?;

        let Value::Object(obj) = value else {
            return Err(Error::MalformedTable("expected a JSON object".to_string()));
        };

        let columns = match obj.get("columns") {
            Some(Value::Array(cols)) => cols.iter().map(value_to_string).collect(),
            None | Some(Value::Null) => Vec::new(),
            Some(_) => {
                return Err(Error::MalformedTable("`columns` must be an array".to_string()))
            }
        };

        let rows = match obj.get("rows") {
            Some(Value::Array(rows)) => rows
                .iter()
                .map(|row| match row {
                    Value::Object(cells) => Ok(cells
                        .iter()
                        .map(|(k, v)| (k.clone(), value_to_string(v)))
                        .collect()),
                    _ => Err(Error::MalformedTable("each row must be an object".to_string())),
                })
                .collect::<Result<Vec<_>>>()?,
            None | Some(Value::Null) => Vec::new(),
            Some(_) => return Err(Error::MalformedTable("`rows` must be an array".to_string())),
        };

        let description = obj
            .get("description")
            .map(value_to_string)
            .unwrap_or_default();

        Ok(Self {
            columns,
            rows,
            description,
        })
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A table block together with its extracted content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTable {
    /// Id of the source table block
    pub table_id: String,

    /// TOC path the table was aligned to
    pub toc_path: Vec<String>,

    /// Title in effect above the table
    pub title: Option<String>,

    /// Page number (1-indexed)
    pub page: u32,

    /// Path of the table crop
    pub image_crop: Option<PathBuf>,

    /// Extracted content
    #[serde(flatten)]
    pub content: TableContent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let raw = r#"{"columns":["Year","Total"],"rows":[{"Year":"2020","Total":42}],"description":"Totals by year"}"#;
        let table = TableContent::parse(raw).unwrap();
        assert_eq!(table.columns, vec!["Year", "Total"]);
        assert_eq!(table.rows[0]["Total"], "42");
        assert_eq!(table.description, "Totals by year");
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "```json\n{\"columns\":[],\"rows\":[],\"description\":\"empty\"}\n```";
        let table = TableContent::parse(raw).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.description, "empty");
    }

    #[test]
    fn test_parse_rejects_truncated_output() {
        let raw = r#"{"columns":["A"],"rows":[{"A":"1"},"#;
        assert!(matches!(
            TableContent::parse(raw),
            Err(Error::MalformedTable(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_object_rows() {
        let raw = r#"{"columns":["A"],"rows":[["1"]]}"#;
        assert!(TableContent::parse(raw).is_err());
    }

    #[test]
    fn test_extracted_table_flattens_content() {
        let table = ExtractedTable {
            table_id: "tbl_1_00000".into(),
            toc_path: vec!["Results".into()],
            title: None,
            page: 1,
            image_crop: None,
            content: TableContent {
                description: "d".into(),
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["description"], "d");
        assert!(json["columns"].is_array());
    }
}
