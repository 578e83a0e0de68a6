//! Schema definition for the booking dataset (`settings/schema.yaml`).
//!
//! The schema names every expected column with its type and assigns column roles:
//! which columns are sensitive, which are dropped before training, which carry
//! known noisy values, and which are label-encoded, one-hot encoded or scaled.

use booking_core::persistence::read_yaml;
use booking_core::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Column data type as declared in the schema file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    #[serde(alias = "int64", alias = "integer")]
    Int,
    #[serde(alias = "float64", alias = "double")]
    Float,
    #[serde(alias = "object", alias = "string", alias = "str")]
    Category,
    #[serde(alias = "boolean")]
    Bool,
}

impl ColumnType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }
}

/// Schema for a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    pub dtype: ColumnType,
}

/// Columns to encode and scale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationConfig {
    #[serde(default)]
    pub label_encoding: Vec<String>,
    #[serde(default)]
    pub onehot_encoding: Vec<String>,
    #[serde(default)]
    pub scaling: Vec<String>,
}

/// The full schema file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(with = "column_list")]
    pub columns: Vec<ColumnSchema>,
    #[serde(default)]
    pub numerical_columns: Vec<String>,
    #[serde(default)]
    pub categorical_columns: Vec<String>,
    /// Columns that leak the target or are otherwise unusable for training.
    #[serde(default)]
    pub drop_columns: Vec<String>,
    /// Personal data removed at ingestion time.
    #[serde(default)]
    pub sensitive_columns: Vec<String>,
    /// Columns whose known noisy values are cleaned during preprocessing.
    #[serde(default)]
    pub noisy_values_columns: Vec<String>,
    #[serde(default)]
    pub transformation: TransformationConfig,
}

impl SchemaConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let schema: Self = read_yaml(path)?;
        tracing::debug!(
            path = %path.display(),
            columns = schema.columns.len(),
            "loaded schema"
        );
        Ok(schema)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns expected in the ingested (de-identified) data.
    pub fn expected_columns(&self) -> Vec<&ColumnSchema> {
        self.columns
            .iter()
            .filter(|c| !self.sensitive_columns.contains(&c.name))
            .collect()
    }
}

/// `columns` is written as a list of single-entry maps: `- lead_time: int`.
mod column_list {
    use super::{ColumnSchema, ColumnType};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(columns: &[ColumnSchema], s: S) -> Result<S::Ok, S::Error> {
        let raw: Vec<BTreeMap<&str, ColumnType>> = columns
            .iter()
            .map(|c| BTreeMap::from([(c.name.as_str(), c.dtype)]))
            .collect();
        raw.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<ColumnSchema>, D::Error> {
        let raw: Vec<BTreeMap<String, ColumnType>> = Vec::deserialize(d)?;
        Ok(raw
            .into_iter()
            .flatten()
            .map(|(name, dtype)| ColumnSchema { name, dtype })
            .collect())
    }
}

/// Infer the type of a column from its values, ignoring nulls.
///
/// Returns `None` when every value is null.
pub fn infer_column_type(values: &[&Value]) -> Option<ColumnType> {
    let non_null: Vec<_> = values.iter().filter(|v| !v.is_null()).collect();
    if non_null.is_empty() {
        return None;
    }

    let mut has_int = false;
    let mut has_float = false;
    let mut has_bool = false;
    let mut has_string = false;

    for v in &non_null {
        match v {
            Value::Number(n) => {
                if n.is_f64() {
                    has_float = true;
                } else {
                    has_int = true;
                }
            }
            Value::Bool(_) => has_bool = true,
            _ => has_string = true,
        }
    }

    if has_string {
        return Some(ColumnType::Category);
    }
    if has_float {
        return Some(ColumnType::Float);
    }
    if has_int {
        return Some(ColumnType::Int);
    }
    if has_bool {
        return Some(ColumnType::Bool);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SCHEMA: &str = r#"
columns:
  - hotel: category
  - lead_time: int
  - adr: float64
  - name: object
drop_columns: [reservation_status]
sensitive_columns: [name]
noisy_values_columns: [adr]
transformation:
  label_encoding: [hotel]
  scaling: [lead_time, adr]
"#;

    #[test]
    fn test_parse_schema() {
        let schema: SchemaConfig = serde_yaml::from_str(SCHEMA).unwrap();
        assert_eq!(schema.columns.len(), 4);
        assert_eq!(schema.column("adr").unwrap().dtype, ColumnType::Float);
        assert_eq!(schema.column("name").unwrap().dtype, ColumnType::Category);
        assert_eq!(schema.transformation.label_encoding, vec!["hotel"]);
        assert!(schema.transformation.onehot_encoding.is_empty());
        assert!(schema.categorical_columns.is_empty());
    }

    #[test]
    fn test_expected_columns_exclude_sensitive() {
        let schema: SchemaConfig = serde_yaml::from_str(SCHEMA).unwrap();
        let names: Vec<_> = schema
            .expected_columns()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["hotel", "lead_time", "adr"]);
    }

    #[test]
    fn test_schema_serializes_back_to_list() {
        let schema: SchemaConfig = serde_yaml::from_str(SCHEMA).unwrap();
        let text = serde_yaml::to_string(&schema).unwrap();
        let again: SchemaConfig = serde_yaml::from_str(&text).unwrap();
        assert_eq!(again, schema);
    }

    #[test]
    fn test_shipped_schema_roles_reference_known_columns() {
        let schema: SchemaConfig =
            serde_yaml::from_str(include_str!("../../../settings/schema.yaml")).unwrap();
        let transformation = &schema.transformation;
        for name in schema
            .drop_columns
            .iter()
            .chain(&schema.sensitive_columns)
            .chain(&schema.noisy_values_columns)
            .chain(&transformation.label_encoding)
            .chain(&transformation.onehot_encoding)
            .chain(&transformation.scaling)
        {
            assert!(schema.column(name).is_some(), "unknown column {name}");
        }
    }

    #[test]
    fn test_infer_column_type() {
        let ints = [json!(1), json!(2), Value::Null];
        let refs: Vec<_> = ints.iter().collect();
        assert_eq!(infer_column_type(&refs), Some(ColumnType::Int));

        let mixed = [json!(1), json!(2.5)];
        let refs: Vec<_> = mixed.iter().collect();
        assert_eq!(infer_column_type(&refs), Some(ColumnType::Float));

        let strings = [json!("a"), json!(3)];
        let refs: Vec<_> = strings.iter().collect();
        assert_eq!(infer_column_type(&refs), Some(ColumnType::Category));

        let nulls = [Value::Null];
        let refs: Vec<_> = nulls.iter().collect();
        assert_eq!(infer_column_type(&refs), None);
    }
}
