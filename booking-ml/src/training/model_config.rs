//! Candidate models and grid search settings (`settings/model.yaml`).

use crate::training::metrics::Scoring;
use booking_core::{PipelineError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Cross-validation settings for the grid search.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GridSearchConfig {
    #[serde(default = "default_cv")]
    pub cv: usize,
    #[serde(default = "default_scoring")]
    pub scoring: Scoring,
}

fn default_cv() -> usize {
    3
}

fn default_scoring() -> Scoring {
    Scoring::Recall
}

impl Default for GridSearchConfig {
    fn default() -> Self {
        Self {
            cv: default_cv(),
            scoring: default_scoring(),
        }
    }
}

/// One named candidate model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelCandidate {
    #[serde(skip)]
    pub name: String,
    pub family: String,
    /// Fixed parameters, applied under every grid combination.
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Values to search per parameter. Key order is the expansion order.
    #[serde(default)]
    pub search_param_grid: BTreeMap<String, Vec<Value>>,
}

impl ModelCandidate {
    /// Base parameters overlaid with `overrides`.
    pub fn merged_params(&self, overrides: &Map<String, Value>) -> Map<String, Value> {
        let mut params = self.params.clone();
        for (k, v) in overrides {
            params.insert(k.clone(), v.clone());
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub grid_search: GridSearchConfig,
    /// Candidates in file order.
    pub model_selection: Vec<ModelCandidate>,
}

impl ModelConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::not_found(format!(
                "{} does not exist",
                path.display()
            )));
        }
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&text)?;
        tracing::debug!(
            path = %path.display(),
            candidates = config.model_selection.len(),
            "loaded model config"
        );
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let root: serde_yaml::Value = serde_yaml::from_str(text)?;

        let grid_search = match root.get("grid_search") {
            Some(v) => serde_json::from_value(yaml_to_json(v.clone())?)?,
            None => GridSearchConfig::default(),
        };
        if grid_search.cv < 2 {
            return Err(PipelineError::config("grid_search.cv must be at least 2"));
        }

        let Some(serde_yaml::Value::Mapping(models)) = root.get("model_selection") else {
            return Err(PipelineError::config(
                "model.yaml must define a model_selection mapping",
            ));
        };
        let mut model_selection = Vec::with_capacity(models.len());
        for (key, body) in models {
            let name = yaml_key(key)?;
            let mut candidate: ModelCandidate = serde_json::from_value(yaml_to_json(body.clone())?)
                .map_err(|e| PipelineError::config(format!("model '{name}': {e}")))?;
            candidate.name = name;
            model_selection.push(candidate);
        }
        if model_selection.is_empty() {
            return Err(PipelineError::config("model_selection is empty"));
        }

        Ok(Self {
            grid_search,
            model_selection,
        })
    }

    /// Candidate with `name`, compared case-insensitively.
    pub fn candidate(&self, name: &str) -> Option<&ModelCandidate> {
        self.model_selection
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

fn yaml_key(key: &serde_yaml::Value) -> Result<String> {
    match key {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(PipelineError::config(format!(
            "unsupported mapping key {other:?}"
        ))),
    }
}

/// Convert YAML to JSON, stringifying scalar mapping keys (`{0: 1.0}` becomes `{"0": 1.0}`).
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value> {
    Ok(match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        serde_yaml::Value::Mapping(map) => {
            let mut object = Map::new();
            for (k, v) in map {
                object.insert(yaml_key(&k)?, yaml_to_json(v)?);
            }
            Value::Object(object)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const MODEL_YAML: &str = r#"
grid_search:
  cv: 4
  scoring: f1
model_selection:
  rfc:
    family: random_forest
    params:
      random_state: 42
      class_weight: {0: 1, 1: 2}
    search_param_grid:
      n_estimators: [50, 100]
      max_depth: [6, null]
  dtc:
    family: decision_tree
    search_param_grid:
      criterion: [gini, entropy]
"#;

    #[test]
    fn test_load_preserves_file_order() {
        let config = ModelConfig::from_yaml(MODEL_YAML).unwrap();
        assert_eq!(config.grid_search.cv, 4);
        assert_eq!(config.grid_search.scoring, Scoring::F1);
        let names: Vec<_> = config.model_selection.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["rfc", "dtc"]);

        let rfc = &config.model_selection[0];
        assert_eq!(rfc.params["class_weight"], json!({"0": 1, "1": 2}));
        assert_eq!(rfc.search_param_grid["max_depth"], vec![json!(6), Value::Null]);
        assert!(config.model_selection[1].params.is_empty());
    }

    #[test]
    fn test_candidate_lookup_is_case_insensitive() {
        let config = ModelConfig::from_yaml(MODEL_YAML).unwrap();
        assert_eq!(config.candidate("RFC").unwrap().family, "random_forest");
        assert!(config.candidate("xgb").is_none());
    }

    #[test]
    fn test_merged_params() {
        let config = ModelConfig::from_yaml(MODEL_YAML).unwrap();
        let overrides = json!({"n_estimators": 50, "random_state": 7});
        let merged = config.model_selection[0].merged_params(overrides.as_object().unwrap());
        assert_eq!(merged["random_state"], json!(7));
        assert_eq!(merged["n_estimators"], json!(50));
        assert!(merged.contains_key("class_weight"));
    }

    #[test]
    fn test_defaults_and_errors() {
        let config = ModelConfig::from_yaml("model_selection:\n  lr:\n    family: logistic_regression\n").unwrap();
        assert_eq!(config.grid_search, GridSearchConfig::default());

        assert!(ModelConfig::from_yaml("grid_search:\n  cv: 3\n").is_err());
        assert!(ModelConfig::from_yaml("grid_search:\n  cv: 1\nmodel_selection:\n  lr:\n    family: logistic_regression\n").is_err());
    }

    #[test]
    fn test_shipped_model_settings_build_every_trial() {
        let config =
            ModelConfig::from_yaml(include_str!("../../../settings/model.yaml")).unwrap();
        assert_eq!(config.grid_search.scoring, Scoring::Recall);
        for candidate in &config.model_selection {
            for trial in crate::training::sweep::generate_trials(&candidate.search_param_grid) {
                let params = candidate.merged_params(&trial);
                crate::algorithms::ClassicalAlgorithm::from_params(&candidate.family, &params)
                    .unwrap_or_else(|e| panic!("{}: {e}", candidate.name));
            }
        }
    }
}
