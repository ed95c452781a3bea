//! Tunable option definitions and the catalog they are loaded from.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::errors::{CatalogError, TuneError, TuneResult};
use crate::validation_error;

/// Value type of a tunable option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Bool,
    Int,
    Float,
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
        }
    }
}

/// One tunable parameter and its legal domain, as listed in the catalog file.
///
/// `min` and `max` are ignored for boolean options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigOption {
    pub name: String,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    #[serde(
        rename = "startvalue",
        alias = "start_value",
        alias = "startValue",
        default,
        deserialize_with = "scalar_as_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_value: Option<String>,
    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub max: f64,
}

impl ConfigOption {
    pub fn boolean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            option_type: OptionType::Bool,
            start_value: None,
            min: 0.0,
            max: 0.0,
        }
    }

    pub fn int(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            option_type: OptionType::Int,
            start_value: None,
            min,
            max,
        }
    }

    pub fn float(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            option_type: OptionType::Float,
            start_value: None,
            min,
            max,
        }
    }

    pub fn with_start_value(mut self, value: impl Into<String>) -> Self {
        self.start_value = Some(value.into());
        self
    }

    /// The baseline value to apply before searching, if one was given.
    pub fn start_value(&self) -> Option<&str> {
        self.start_value.as_deref().filter(|v| !v.is_empty())
    }

    /// True when both bounds are whole numbers representable as `i64`.
    ///
    /// Integral bounds select integer sampling regardless of the declared
    /// numeric type.
    pub fn has_integral_bounds(&self) -> bool {
        is_integral(self.min) && is_integral(self.max)
    }

    /// Check that the option can produce candidates.
    pub fn validate(&self) -> TuneResult<()> {
        if self.name.trim().is_empty() {
            return Err(validation_error!("config option with empty name"));
        }
        if self.option_type == OptionType::Bool {
            return Ok(());
        }
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(validation_error!(
                "{}: bounds must be finite (min={}, max={})",
                self.name,
                self.min,
                self.max
            ));
        }
        if self.option_type == OptionType::Int && !self.has_integral_bounds() {
            return Err(validation_error!(
                "{}: int option needs whole-number bounds (min={}, max={})",
                self.name,
                self.min,
                self.max
            ));
        }
        if self.has_integral_bounds() {
            if self.max <= self.min {
                return Err(validation_error!(
                    "{}: integer range [{}, {}) is empty",
                    self.name,
                    self.min,
                    self.max
                ));
            }
        } else if self.max < self.min {
            return Err(validation_error!(
                "{}: max {} is below min {}",
                self.name,
                self.max,
                self.min
            ));
        }
        Ok(())
    }
}

fn is_integral(value: f64) -> bool {
    value.is_finite()
        && value.fract() == 0.0
        && value >= i64::MIN as f64
        && value < i64::MAX as f64
}

/// Start values may be written as bare YAML scalars (`startvalue: 4`).
fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "start value must be a scalar, got {other:?}"
        ))),
    }
}

/// A point-in-time observation of one live parameter on the target system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentConfigValue {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub source: String,
}

impl CurrentConfigValue {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            source: source.into(),
        }
    }
}

/// The ordered, read-only list of options a search may perturb.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionCatalog {
    options: Vec<ConfigOption>,
}

impl OptionCatalog {
    /// Build a catalog, rejecting empty lists, duplicate names and options
    /// whose bounds cannot produce a candidate.
    pub fn new(options: Vec<ConfigOption>) -> TuneResult<Self> {
        let catalog = Self { options };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_yaml_str(content: &str) -> TuneResult<Self> {
        if content.trim().is_empty() {
            return Err(CatalogError::Empty.into());
        }
        let options: Vec<ConfigOption> =
            serde_yaml::from_str(content).map_err(|e| CatalogError::ParseFailed {
                message: e.to_string(),
            })?;
        Self::new(options)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> TuneResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::ReadFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> TuneResult<()> {
        if self.options.is_empty() {
            return Err(CatalogError::Empty.into());
        }
        let mut seen = HashSet::new();
        for option in &self.options {
            if !seen.insert(option.name.as_str()) {
                return Err(CatalogError::DuplicateOption {
                    name: option.name.clone(),
                }
                .into());
            }
            option.validate().map_err(|e| match e {
                TuneError::Validation(message) => TuneError::Catalog(CatalogError::InvalidOption {
                    name: option.name.clone(),
                    message,
                }),
                other => other,
            })?;
        }
        Ok(())
    }

    pub fn options(&self) -> &[ConfigOption] {
        &self.options
    }

    pub fn get(&self, index: usize) -> Option<&ConfigOption> {
        self.options.get(index)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigOption> {
        self.options.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CATALOG: &str = r#"
- name: osd_op_num_threads_per_shard
  type: int
  startvalue: 2
  min: 1
  max: 16
- name: osd_recovery_sleep
  type: float
  min: 0.0
  max: 0.5
- name: bluestore_compression_enabled
  type: bool
"#;

    #[test]
    fn parses_catalog_in_order() {
        let catalog = OptionCatalog::from_yaml_str(CATALOG).unwrap();
        assert_eq!(
            catalog.names(),
            vec![
                "osd_op_num_threads_per_shard",
                "osd_recovery_sleep",
                "bluestore_compression_enabled"
            ]
        );
        let threads = catalog.get(0).unwrap();
        assert_eq!(threads.option_type, OptionType::Int);
        assert_eq!(threads.start_value(), Some("2"));
        assert_eq!(catalog.get(2).unwrap().start_value(), None);
    }

    #[test]
    fn start_value_aliases_are_accepted() {
        let yaml = "- name: a\n  type: bool\n  start_value: \"true\"\n- name: b\n  type: bool\n  startValue: false\n";
        let catalog = OptionCatalog::from_yaml_str(yaml).unwrap();
        assert_eq!(catalog.get(0).unwrap().start_value(), Some("true"));
        assert_eq!(catalog.get(1).unwrap().start_value(), Some("false"));
    }

    #[test]
    fn empty_start_value_is_ignored() {
        let option = ConfigOption::boolean("x").with_start_value("");
        assert_eq!(option.start_value(), None);
    }

    #[test]
    fn empty_catalog_is_rejected() {
        for input in ["", "   \n", "[]"] {
            let err = OptionCatalog::from_yaml_str(input).unwrap_err();
            assert!(
                matches!(err, TuneError::Catalog(CatalogError::Empty)),
                "input {input:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn unknown_type_fails_to_parse() {
        let err = OptionCatalog::from_yaml_str("- name: x\n  type: string\n").unwrap_err();
        assert!(matches!(err, TuneError::Catalog(CatalogError::ParseFailed { .. })));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = OptionCatalog::new(vec![
            ConfigOption::boolean("dup"),
            ConfigOption::int("dup", 1.0, 5.0),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            TuneError::Catalog(CatalogError::DuplicateOption { ref name }) if name == "dup"
        ));
    }

    #[test]
    fn degenerate_integer_range_is_rejected_at_load() {
        let err = OptionCatalog::new(vec![ConfigOption::int("cache_size", 200.0, 200.0)])
            .unwrap_err();
        assert!(matches!(
            err,
            TuneError::Catalog(CatalogError::InvalidOption { ref name, .. }) if name == "cache_size"
        ));
    }

    #[test]
    fn int_option_with_fractional_bounds_is_rejected_at_load() {
        let err = OptionCatalog::new(vec![ConfigOption::int("osd_op_num_shards", 0.5, 4.5)])
            .unwrap_err();
        assert!(matches!(
            err,
            TuneError::Catalog(CatalogError::InvalidOption { ref name, .. })
                if name == "osd_op_num_shards"
        ));

        let yaml = "- name: osd_max_backfills\n  type: int\n  min: 1\n  max: 2.5\n";
        assert!(OptionCatalog::from_yaml_str(yaml).is_err());
        assert!(ConfigOption::float("osd_recovery_sleep", 0.5, 4.5).validate().is_ok());
    }

    #[test]
    fn inverted_float_range_is_rejected() {
        assert!(ConfigOption::float("ratio", 0.9, 0.1).validate().is_err());
        assert!(ConfigOption::float("ratio", 0.5, 0.5).validate().is_ok());
    }

    #[test]
    fn non_finite_bounds_are_rejected() {
        assert!(ConfigOption::float("x", 0.0, f64::INFINITY).validate().is_err());
        assert!(ConfigOption::float("x", f64::NAN, 1.0).validate().is_err());
    }

    #[test]
    fn bool_bounds_are_ignored() {
        let mut option = ConfigOption::boolean("flag");
        option.min = 10.0;
        option.max = -10.0;
        assert!(option.validate().is_ok());
    }

    #[test]
    fn integral_bounds_detection() {
        assert!(ConfigOption::float("x", 1.0, 4.0).has_integral_bounds());
        assert!(!ConfigOption::float("x", 1.0, 4.5).has_integral_bounds());
        assert!(!ConfigOption::float("x", 0.0, 1e300).has_integral_bounds());
    }

    #[test]
    fn loads_catalog_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();
        let catalog = OptionCatalog::from_file(file.path()).unwrap();
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = OptionCatalog::from_file("/nonexistent/catalog.yaml").unwrap_err();
        assert!(matches!(err, TuneError::Catalog(CatalogError::ReadFailed { .. })));
    }

    #[test]
    fn current_config_value_parses_ceph_json() {
        let json = r#"[{"name":"osd_max_backfills","value":"1","source":"default"},
                       {"name":"osd_op_num_shards","value":"8","source":"override"}]"#;
        let values: Vec<CurrentConfigValue> = serde_json::from_str(json).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1], CurrentConfigValue::new("osd_op_num_shards", "8", "override"));
    }
}
