//! Structural diff between two parsed configuration trees (§4.C).
//!
//! JSON, JSON5, YAML, and TOML are each parsed into one shared
//! [`ConfigValue`] tree so the diff algorithm below is written once, not
//! once per source format.

use crate::error::EngineError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A fully-parsed configuration tree: maps with string keys, ordered
/// sequences, and scalar leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Seq(Vec<ConfigValue>),
    Map(IndexMap<String, ConfigValue>),
}

impl ConfigValue {
    fn kind(&self) -> u8 {
        match self {
            ConfigValue::Null => 0,
            ConfigValue::Bool(_) => 1,
            ConfigValue::Number(_) => 2,
            ConfigValue::String(_) => 3,
            ConfigValue::Seq(_) => 4,
            ConfigValue::Map(_) => 5,
        }
    }

    fn same_container_kind(&self, other: &ConfigValue) -> bool {
        matches!(
            (self, other),
            (ConfigValue::Map(_), ConfigValue::Map(_)) | (ConfigValue::Seq(_), ConfigValue::Seq(_))
        )
    }
}

/// Which recognized structured-config extension a path carries, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Json5,
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Returns the format implied by a file path's extension, or `None` if
    /// the path isn't a recognized structured-config file.
    pub fn from_path(path: &str) -> Option<Self> {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".json") {
            Some(ConfigFormat::Json)
        } else if lower.ends_with(".json5") {
            Some(ConfigFormat::Json5)
        } else if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            Some(ConfigFormat::Yaml)
        } else if lower.ends_with(".toml") {
            Some(ConfigFormat::Toml)
        } else {
            None
        }
    }

    fn label(self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            ConfigFormat::Json5 => "json5",
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
        }
    }
}

/// Parse raw file text into a [`ConfigValue`] under the given format.
/// Fails with [`EngineError::ParseFailure`], never silently.
pub fn parse(path: &str, format: ConfigFormat, text: &str) -> Result<ConfigValue, EngineError> {
    let parse_err = |e: String| EngineError::ParseFailure {
        path: path.to_string(),
        format: format.label(),
        source: e,
    };

    match format {
        ConfigFormat::Json => {
            let v: serde_json::Value = serde_json::from_str(text).map_err(|e| parse_err(e.to_string()))?;
            Ok(json_to_config(v))
        }
        ConfigFormat::Json5 => {
            // json5 shares JSON's data model; it deserializes through serde
            // rather than exposing its own Value type.
            let v: serde_json::Value = json5::from_str(text).map_err(|e| parse_err(e.to_string()))?;
            Ok(json_to_config(v))
        }
        ConfigFormat::Yaml => {
            let v: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| parse_err(e.to_string()))?;
            Ok(yaml_to_config(v))
        }
        ConfigFormat::Toml => {
            let v: toml::Value = toml::from_str(text).map_err(|e| parse_err(e.to_string()))?;
            Ok(toml_to_config(v))
        }
    }
}

fn json_to_config(v: serde_json::Value) -> ConfigValue {
    match v {
        serde_json::Value::Null => ConfigValue::Null,
        serde_json::Value::Bool(b) => ConfigValue::Bool(b),
        serde_json::Value::Number(n) => ConfigValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => ConfigValue::String(s),
        serde_json::Value::Array(a) => ConfigValue::Seq(a.into_iter().map(json_to_config).collect()),
        serde_json::Value::Object(o) => {
            ConfigValue::Map(o.into_iter().map(|(k, v)| (k, json_to_config(v))).collect())
        }
    }
}

fn yaml_to_config(v: serde_yaml::Value) -> ConfigValue {
    match v {
        serde_yaml::Value::Null => ConfigValue::Null,
        serde_yaml::Value::Bool(b) => ConfigValue::Bool(b),
        serde_yaml::Value::Number(n) => ConfigValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_yaml::Value::String(s) => ConfigValue::String(s),
        serde_yaml::Value::Sequence(a) => ConfigValue::Seq(a.into_iter().map(yaml_to_config).collect()),
        serde_yaml::Value::Mapping(o) => ConfigValue::Map(
            o.into_iter()
                .map(|(k, v)| (yaml_key_to_string(k), yaml_to_config(v)))
                .collect(),
        ),
        serde_yaml::Value::Tagged(t) => yaml_to_config(t.value),
    }
}

fn yaml_key_to_string(k: serde_yaml::Value) -> String {
    match k {
        serde_yaml::Value::String(s) => s,
        other => serde_yaml::to_string(&other).unwrap_or_default().trim().to_string(),
    }
}

fn toml_to_config(v: toml::Value) -> ConfigValue {
    match v {
        toml::Value::String(s) => ConfigValue::String(s),
        toml::Value::Integer(i) => ConfigValue::Number(i as f64),
        toml::Value::Float(f) => ConfigValue::Number(f),
        toml::Value::Boolean(b) => ConfigValue::Bool(b),
        toml::Value::Datetime(d) => ConfigValue::String(d.to_string()),
        toml::Value::Array(a) => ConfigValue::Seq(a.into_iter().map(toml_to_config).collect()),
        toml::Value::Table(o) => {
            ConfigValue::Map(o.into_iter().map(|(k, v)| (k, toml_to_config(v))).collect())
        }
    }
}

/// One key-step in an [`ObjectChange`] path: a map key or sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathStep {
    Key(String),
    Index(usize),
}

/// One structural change between `previous` and `current`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ObjectChange {
    #[serde(rename = "CREATE")]
    Create { path: Vec<PathStep>, value: ConfigValue },
    #[serde(rename = "REMOVE")]
    Remove {
        path: Vec<PathStep>,
        #[serde(rename = "oldValue")]
        old_value: ConfigValue,
    },
    #[serde(rename = "CHANGE")]
    Change {
        path: Vec<PathStep>,
        value: ConfigValue,
        #[serde(rename = "oldValue")]
        old_value: ConfigValue,
    },
}

/// Structural diff carried on a [`crate::patch::Patch`] for recognized
/// configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDiff {
    pub previous: Option<ConfigValue>,
    pub current: Option<ConfigValue>,
    pub diff: Vec<ObjectChange>,
}

impl ObjectDiff {
    pub fn inserted(current: ConfigValue) -> Self {
        Self {
            previous: None,
            current: Some(current),
            diff: Vec::new(),
        }
    }

    pub fn deleted(previous: ConfigValue) -> Self {
        Self {
            previous: Some(previous),
            current: None,
            diff: Vec::new(),
        }
    }

    pub fn modified(previous: ConfigValue, current: ConfigValue) -> Self {
        let diff = diff_values(&[], &previous, &current);
        Self {
            previous: Some(previous),
            current: Some(current),
            diff,
        }
    }
}

fn diff_values(path: &[PathStep], previous: &ConfigValue, current: &ConfigValue) -> Vec<ObjectChange> {
    match (previous, current) {
        (ConfigValue::Map(a), ConfigValue::Map(b)) => diff_maps(path, a, b),
        (ConfigValue::Seq(a), ConfigValue::Seq(b)) => diff_seqs(path, a, b),
        (a, b) => {
            if scalar_eq(a, b) {
                Vec::new()
            } else {
                vec![ObjectChange::Change {
                    path: path.to_vec(),
                    value: b.clone(),
                    old_value: a.clone(),
                }]
            }
        }
    }
}

fn diff_maps(
    path: &[PathStep],
    previous: &IndexMap<String, ConfigValue>,
    current: &IndexMap<String, ConfigValue>,
) -> Vec<ObjectChange> {
    let mut out = Vec::new();

    for (key, prev_val) in previous {
        let mut child_path = path.to_vec();
        child_path.push(PathStep::Key(key.clone()));
        match current.get(key) {
            Some(cur_val) => {
                if !scalar_eq(prev_val, cur_val) {
                    if prev_val.same_container_kind(cur_val) {
                        out.extend(diff_values(&child_path, prev_val, cur_val));
                    } else {
                        out.push(ObjectChange::Change {
                            path: child_path,
                            value: cur_val.clone(),
                            old_value: prev_val.clone(),
                        });
                    }
                }
            }
            None => out.push(ObjectChange::Remove {
                path: child_path,
                old_value: prev_val.clone(),
            }),
        }
    }

    for (key, cur_val) in current {
        if !previous.contains_key(key) {
            let mut child_path = path.to_vec();
            child_path.push(PathStep::Key(key.clone()));
            out.push(ObjectChange::Create {
                path: child_path,
                value: cur_val.clone(),
            });
        }
    }

    out
}

fn diff_seqs(path: &[PathStep], previous: &[ConfigValue], current: &[ConfigValue]) -> Vec<ObjectChange> {
    let mut out = Vec::new();
    let shared = previous.len().min(current.len());

    for idx in 0..shared {
        let mut child_path = path.to_vec();
        child_path.push(PathStep::Index(idx));
        let (prev_val, cur_val) = (&previous[idx], &current[idx]);
        if !scalar_eq(prev_val, cur_val) {
            if prev_val.same_container_kind(cur_val) {
                out.extend(diff_values(&child_path, prev_val, cur_val));
            } else {
                out.push(ObjectChange::Change {
                    path: child_path,
                    value: cur_val.clone(),
                    old_value: prev_val.clone(),
                });
            }
        }
    }

    for idx in shared..previous.len() {
        let mut child_path = path.to_vec();
        child_path.push(PathStep::Index(idx));
        out.push(ObjectChange::Remove {
            path: child_path,
            old_value: previous[idx].clone(),
        });
    }

    for idx in shared..current.len() {
        let mut child_path = path.to_vec();
        child_path.push(PathStep::Index(idx));
        out.push(ObjectChange::Create {
            path: child_path,
            value: current[idx].clone(),
        });
    }

    out
}

/// Strict scalar/container equality: `1` and `"1"` are never equal; `null`
/// equals only `null`. Containers are compared structurally.
fn scalar_eq(a: &ConfigValue, b: &ConfigValue) -> bool {
    if a.kind() != b.kind() {
        return false;
    }
    match (a, b) {
        (ConfigValue::Null, ConfigValue::Null) => true,
        (ConfigValue::Bool(x), ConfigValue::Bool(y)) => x == y,
        (ConfigValue::Number(x), ConfigValue::Number(y)) => x == y,
        (ConfigValue::String(x), ConfigValue::String(y)) => x == y,
        (ConfigValue::Seq(x), ConfigValue::Seq(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| scalar_eq(a, b))
        }
        (ConfigValue::Map(x), ConfigValue::Map(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).map(|ov| scalar_eq(v, ov)).unwrap_or(false))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, ConfigValue)]) -> ConfigValue {
        ConfigValue::Map(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn scalar_eq_is_strict_about_type() {
        assert!(!scalar_eq(&ConfigValue::Number(1.0), &ConfigValue::String("1".into())));
        assert!(scalar_eq(&ConfigValue::Null, &ConfigValue::Null));
        assert!(!scalar_eq(&ConfigValue::Null, &ConfigValue::Bool(false)));
    }

    #[test]
    fn top_level_scalar_change_emits_change() {
        let prev = map(&[("subapp", ConfigValue::String("v1.1.0".into()))]);
        let cur = map(&[("subapp", ConfigValue::String("v1.2.0".into()))]);
        let diff = diff_values(&[], &prev, &cur);
        assert_eq!(
            diff,
            vec![ObjectChange::Change {
                path: vec![PathStep::Key("subapp".into())],
                value: ConfigValue::String("v1.2.0".into()),
                old_value: ConfigValue::String("v1.1.0".into()),
            }]
        );
    }

    #[test]
    fn create_and_remove_keys() {
        let prev = map(&[("a", ConfigValue::Bool(true))]);
        let cur = map(&[("b", ConfigValue::Bool(true))]);
        let diff = diff_values(&[], &prev, &cur);
        assert_eq!(diff.len(), 2);
        assert!(diff.iter().any(|c| matches!(c, ObjectChange::Remove { .. })));
        assert!(diff.iter().any(|c| matches!(c, ObjectChange::Create { .. })));
    }

    #[test]
    fn sequence_length_change_emits_tail_create() {
        let prev = ConfigValue::Seq(vec![ConfigValue::Number(1.0)]);
        let cur = ConfigValue::Seq(vec![ConfigValue::Number(1.0), ConfigValue::Number(2.0)]);
        let diff = diff_values(&[], &prev, &cur);
        assert_eq!(
            diff,
            vec![ObjectChange::Create {
                path: vec![PathStep::Index(1)],
                value: ConfigValue::Number(2.0),
            }]
        );
    }

    #[test]
    fn nested_map_recurses() {
        let prev = map(&[("outer", map(&[("inner", ConfigValue::Number(1.0))]))]);
        let cur = map(&[("outer", map(&[("inner", ConfigValue::Number(2.0))]))]);
        let diff = diff_values(&[], &prev, &cur);
        assert_eq!(
            diff,
            vec![ObjectChange::Change {
                path: vec![PathStep::Key("outer".into()), PathStep::Key("inner".into())],
                value: ConfigValue::Number(2.0),
                old_value: ConfigValue::Number(1.0),
            }]
        );
    }

    #[test]
    fn json_parses_into_config_value() {
        let v = parse("x.json", ConfigFormat::Json, r#"{"a": 1, "b": [1, 2]}"#).unwrap();
        match v {
            ConfigValue::Map(m) => {
                assert_eq!(m.get("a"), Some(&ConfigValue::Number(1.0)));
            }
            _ => panic!("expected map"),
        }
    }

    #[test]
    fn toml_parses_into_config_value() {
        let v = parse("x.toml", ConfigFormat::Toml, "a = 1\n\n[b]\nc = \"hi\"\n").unwrap();
        match v {
            ConfigValue::Map(m) => {
                assert_eq!(m.get("a"), Some(&ConfigValue::Number(1.0)));
                match m.get("b") {
                    Some(ConfigValue::Map(inner)) => {
                        assert_eq!(inner.get("c"), Some(&ConfigValue::String("hi".into())));
                    }
                    other => panic!("expected nested table, got {other:?}"),
                }
            }
            _ => panic!("expected map"),
        }
    }

    #[test]
    fn yaml_parses_into_config_value() {
        let v = parse("x.yaml", ConfigFormat::Yaml, "a: 1\nb:\n  - 1\n  - 2\n").unwrap();
        match v {
            ConfigValue::Map(m) => {
                assert_eq!(m.get("a"), Some(&ConfigValue::Number(1.0)));
                assert_eq!(
                    m.get("b"),
                    Some(&ConfigValue::Seq(vec![ConfigValue::Number(1.0), ConfigValue::Number(2.0)]))
                );
            }
            _ => panic!("expected map"),
        }
    }

    #[test]
    fn json5_parses_into_config_value() {
        let v = parse("x.json5", ConfigFormat::Json5, "{a: 1, // trailing comma ok\n b: [1, 2],}").unwrap();
        match v {
            ConfigValue::Map(m) => {
                assert_eq!(m.get("a"), Some(&ConfigValue::Number(1.0)));
                assert_eq!(
                    m.get("b"),
                    Some(&ConfigValue::Seq(vec![ConfigValue::Number(1.0), ConfigValue::Number(2.0)]))
                );
            }
            _ => panic!("expected map"),
        }
    }

    #[test]
    fn format_detection_from_path() {
        assert_eq!(ConfigFormat::from_path("a/b.yaml"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_path("a/b.yml"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_path("a/b.toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_path("a/b.rs"), None);
    }
}
