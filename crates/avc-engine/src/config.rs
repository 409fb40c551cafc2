//! Thresholds and switches for an advanced value count.
//!
//! Every field is validated when it is set, so the pipeline never re-checks
//! configuration. Typed setters make most invalid states unrepresentable;
//! ratio setters and the dynamic [`AvcConfig::set_attribute`] surface run the
//! shared predicates below and return [`ConfigError`] on rejection.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field}: value must be {expected}")]
    Type {
        field: String,
        expected: &'static str,
    },
    #[error("{field}: {reason}")]
    Range { field: String, reason: &'static str },
    #[error("unexpected configuration field '{name}'")]
    UnexpectedField { name: String },
}

/// Non-fatal outcome of a dynamic assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// The name is not a recognized field; the value was kept as an extra.
    UnknownField { name: String },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField { name } => {
                write!(f, "AdvancedValueCounts doesn't have attribute '{name}'")
            }
        }
    }
}

/// A dynamically typed configuration value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<ConfigValue>> From<Option<T>> for ConfigValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

// ── Predicates ─────────────────────────────────────────────────────────

fn type_error(field: &str, expected: &'static str) -> ConfigError {
    ConfigError::Type {
        field: field.to_owned(),
        expected,
    }
}

fn range_error(field: &str, reason: &'static str) -> ConfigError {
    ConfigError::Range {
        field: field.to_owned(),
        reason,
    }
}

/// Booleans are rejected even though they are numeric in some hosts.
fn only_numbers(field: &str, value: &ConfigValue) -> Result<f64, ConfigError> {
    match value {
        ConfigValue::Int(v) => Ok(*v as f64),
        ConfigValue::Float(v) => Ok(*v),
        _ => Err(type_error(field, "a float or int")),
    }
}

fn numbers_or_none(field: &str, value: &ConfigValue) -> Result<Option<f64>, ConfigError> {
    match value {
        ConfigValue::None => Ok(None),
        ConfigValue::Int(_) | ConfigValue::Float(_) => only_numbers(field, value).map(Some),
        _ => Err(type_error(field, "a number or None")),
    }
}

fn not_nan(field: &str, value: f64) -> Result<f64, ConfigError> {
    if value.is_nan() {
        return Err(range_error(field, "value cannot be NaN"));
    }
    Ok(value)
}

fn not_inf(field: &str, value: f64) -> Result<f64, ConfigError> {
    if value.is_infinite() {
        return Err(range_error(field, "value cannot be infinite"));
    }
    Ok(value)
}

fn not_below_zero(field: &str, value: f64) -> Result<f64, ConfigError> {
    if value < 0.0 {
        return Err(range_error(field, "value cannot be below 0"));
    }
    Ok(value)
}

fn whole_number(field: &str, value: f64) -> Result<f64, ConfigError> {
    if value.fract() != 0.0 {
        return Err(range_error(field, "value must be a whole number"));
    }
    Ok(value)
}

fn check_if_ratio(field: &str, value: f64) -> Result<f64, ConfigError> {
    not_nan(field, value)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(range_error(field, "value cannot be < 0 or > 1"));
    }
    Ok(value)
}

fn positive_number(field: &str, value: &ConfigValue) -> Result<f64, ConfigError> {
    let value = only_numbers(field, value)?;
    not_nan(field, value)?;
    not_below_zero(field, value)?;
    not_inf(field, value)
}

fn positive_number_or_none(field: &str, value: &ConfigValue) -> Result<Option<f64>, ConfigError> {
    numbers_or_none(field, value)?
        .map(|v| {
            not_nan(field, v)?;
            not_inf(field, v)?;
            not_below_zero(field, v)
        })
        .transpose()
}

fn ratio(field: &str, value: &ConfigValue) -> Result<f64, ConfigError> {
    let value = only_numbers(field, value)?;
    check_if_ratio(field, value)
}

/// A row count threshold. Counts are integers, so `count < 2.5` and
/// `count < 3` select the same rows and fractional minimums round up.
fn min_count(field: &str, value: &ConfigValue) -> Result<u64, ConfigError> {
    let value = positive_number(field, value)?;
    Ok(value.ceil() as u64)
}

fn cap(field: &str, value: &ConfigValue) -> Result<Option<usize>, ConfigError> {
    positive_number_or_none(field, value)?
        .map(|v| whole_number(field, v).map(|v| v as usize))
        .transpose()
}

fn flag(field: &str, value: &ConfigValue) -> Result<bool, ConfigError> {
    match value {
        ConfigValue::Bool(v) => Ok(*v),
        _ => Err(type_error(field, "a bool")),
    }
}

// ── Configuration ──────────────────────────────────────────────────────

pub const FIELD_NAMES: [&str; 9] = [
    "dropna",
    "max_groups",
    "min_group_ratio",
    "min_group_count",
    "max_subgroups",
    "min_subgroup_ratio",
    "min_subgroup_count",
    "min_subgroup_ratio_vs_total",
    "round_ratio",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvcConfig {
    dropna: bool,
    max_groups: Option<usize>,
    min_group_ratio: f64,
    min_group_count: u64,
    max_subgroups: Option<usize>,
    min_subgroup_ratio: f64,
    min_subgroup_count: u64,
    min_subgroup_ratio_vs_total: f64,
    round_ratio: Option<u32>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    extras: BTreeMap<String, ConfigValue>,
}

impl Default for AvcConfig {
    fn default() -> Self {
        Self {
            dropna: false,
            max_groups: None,
            min_group_ratio: 0.0,
            min_group_count: 1,
            max_subgroups: None,
            min_subgroup_ratio: 0.0,
            min_subgroup_count: 1,
            min_subgroup_ratio_vs_total: 0.0,
            round_ratio: None,
            extras: BTreeMap::new(),
        }
    }
}

impl AvcConfig {
    #[must_use]
    pub fn builder() -> AvcConfigBuilder {
        AvcConfigBuilder::default()
    }

    /// Build from `(name, value)` pairs, as a keyword-argument constructor
    /// would. Unknown names are rejected here rather than stored.
    pub fn from_attributes<'a, I>(attributes: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, ConfigValue)>,
    {
        let mut config = Self::default();
        for (name, value) in attributes {
            if !FIELD_NAMES.contains(&name) {
                return Err(ConfigError::UnexpectedField {
                    name: name.to_owned(),
                });
            }
            config.set_attribute(name, value)?;
        }
        Ok(config)
    }

    #[must_use]
    pub fn dropna(&self) -> bool {
        self.dropna
    }

    #[must_use]
    pub fn max_groups(&self) -> Option<usize> {
        self.max_groups
    }

    #[must_use]
    pub fn min_group_ratio(&self) -> f64 {
        self.min_group_ratio
    }

    #[must_use]
    pub fn min_group_count(&self) -> u64 {
        self.min_group_count
    }

    #[must_use]
    pub fn max_subgroups(&self) -> Option<usize> {
        self.max_subgroups
    }

    #[must_use]
    pub fn min_subgroup_ratio(&self) -> f64 {
        self.min_subgroup_ratio
    }

    #[must_use]
    pub fn min_subgroup_count(&self) -> u64 {
        self.min_subgroup_count
    }

    #[must_use]
    pub fn min_subgroup_ratio_vs_total(&self) -> f64 {
        self.min_subgroup_ratio_vs_total
    }

    #[must_use]
    pub fn round_ratio(&self) -> Option<u32> {
        self.round_ratio
    }

    #[must_use]
    pub fn extra(&self, name: &str) -> Option<&ConfigValue> {
        self.extras.get(name)
    }

    pub fn set_dropna(&mut self, dropna: bool) -> &mut Self {
        self.dropna = dropna;
        self
    }

    pub fn set_max_groups(&mut self, max_groups: Option<usize>) -> &mut Self {
        self.max_groups = max_groups;
        self
    }

    pub fn set_min_group_ratio(&mut self, value: f64) -> Result<&mut Self, ConfigError> {
        self.min_group_ratio = check_if_ratio("min_group_ratio", value)?;
        Ok(self)
    }

    pub fn set_min_group_count(&mut self, value: u64) -> &mut Self {
        self.min_group_count = value;
        self
    }

    pub fn set_max_subgroups(&mut self, max_subgroups: Option<usize>) -> &mut Self {
        self.max_subgroups = max_subgroups;
        self
    }

    pub fn set_min_subgroup_ratio(&mut self, value: f64) -> Result<&mut Self, ConfigError> {
        self.min_subgroup_ratio = check_if_ratio("min_subgroup_ratio", value)?;
        Ok(self)
    }

    pub fn set_min_subgroup_count(&mut self, value: u64) -> &mut Self {
        self.min_subgroup_count = value;
        self
    }

    pub fn set_min_subgroup_ratio_vs_total(&mut self, value: f64) -> Result<&mut Self, ConfigError> {
        self.min_subgroup_ratio_vs_total = check_if_ratio("min_subgroup_ratio_vs_total", value)?;
        Ok(self)
    }

    pub fn set_round_ratio(&mut self, decimals: Option<u32>) -> &mut Self {
        self.round_ratio = decimals;
        self
    }

    /// Assign a field by name.
    ///
    /// A rejected value leaves the configuration untouched. Unrecognized
    /// names are stored as extras and reported through the returned warning.
    pub fn set_attribute(
        &mut self,
        name: &str,
        value: ConfigValue,
    ) -> Result<Option<ConfigWarning>, ConfigError> {
        match name {
            "dropna" => self.dropna = flag(name, &value)?,
            "max_groups" => self.max_groups = cap(name, &value)?,
            "min_group_ratio" => self.min_group_ratio = ratio(name, &value)?,
            "min_group_count" => self.min_group_count = min_count(name, &value)?,
            "max_subgroups" => self.max_subgroups = cap(name, &value)?,
            "min_subgroup_ratio" => self.min_subgroup_ratio = ratio(name, &value)?,
            "min_subgroup_count" => self.min_subgroup_count = min_count(name, &value)?,
            "min_subgroup_ratio_vs_total" => {
                self.min_subgroup_ratio_vs_total = ratio(name, &value)?;
            }
            "round_ratio" => {
                self.round_ratio = cap(name, &value)?
                    .map(|v| u32::try_from(v).unwrap_or(u32::MAX));
            }
            _ => {
                let warning = ConfigWarning::UnknownField {
                    name: name.to_owned(),
                };
                tracing::warn!(field = name, "{warning}");
                self.extras.insert(name.to_owned(), value);
                return Ok(Some(warning));
            }
        }
        Ok(None)
    }

    /// Current value of a field or extra, by name.
    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<ConfigValue> {
        let count = |v: u64| ConfigValue::Int(i64::try_from(v).unwrap_or(i64::MAX));
        let as_cap = |v: Option<usize>| {
            v.map_or(ConfigValue::None, |v| {
                ConfigValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
            })
        };
        let value = match name {
            "dropna" => ConfigValue::Bool(self.dropna),
            "max_groups" => as_cap(self.max_groups),
            "min_group_ratio" => ConfigValue::Float(self.min_group_ratio),
            "min_group_count" => count(self.min_group_count),
            "max_subgroups" => as_cap(self.max_subgroups),
            "min_subgroup_ratio" => ConfigValue::Float(self.min_subgroup_ratio),
            "min_subgroup_count" => count(self.min_subgroup_count),
            "min_subgroup_ratio_vs_total" => ConfigValue::Float(self.min_subgroup_ratio_vs_total),
            "round_ratio" => as_cap(self.round_ratio.map(|v| v as usize)),
            _ => return self.extras.get(name).cloned(),
        };
        Some(value)
    }
}

/// Collects raw settings and validates them all in [`AvcConfigBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct AvcConfigBuilder {
    dropna: Option<bool>,
    max_groups: Option<usize>,
    min_group_ratio: Option<f64>,
    min_group_count: Option<u64>,
    max_subgroups: Option<usize>,
    min_subgroup_ratio: Option<f64>,
    min_subgroup_count: Option<u64>,
    min_subgroup_ratio_vs_total: Option<f64>,
    round_ratio: Option<u32>,
}

impl AvcConfigBuilder {
    #[must_use]
    pub fn dropna(mut self, dropna: bool) -> Self {
        self.dropna = Some(dropna);
        self
    }

    #[must_use]
    pub fn max_groups(mut self, max_groups: usize) -> Self {
        self.max_groups = Some(max_groups);
        self
    }

    #[must_use]
    pub fn min_group_ratio(mut self, value: f64) -> Self {
        self.min_group_ratio = Some(value);
        self
    }

    #[must_use]
    pub fn min_group_count(mut self, value: u64) -> Self {
        self.min_group_count = Some(value);
        self
    }

    #[must_use]
    pub fn max_subgroups(mut self, max_subgroups: usize) -> Self {
        self.max_subgroups = Some(max_subgroups);
        self
    }

    #[must_use]
    pub fn min_subgroup_ratio(mut self, value: f64) -> Self {
        self.min_subgroup_ratio = Some(value);
        self
    }

    #[must_use]
    pub fn min_subgroup_count(mut self, value: u64) -> Self {
        self.min_subgroup_count = Some(value);
        self
    }

    #[must_use]
    pub fn min_subgroup_ratio_vs_total(mut self, value: f64) -> Self {
        self.min_subgroup_ratio_vs_total = Some(value);
        self
    }

    #[must_use]
    pub fn round_ratio(mut self, decimals: u32) -> Self {
        self.round_ratio = Some(decimals);
        self
    }

    pub fn build(self) -> Result<AvcConfig, ConfigError> {
        let mut config = AvcConfig::default();
        if let Some(dropna) = self.dropna {
            config.set_dropna(dropna);
        }
        config
            .set_max_groups(self.max_groups)
            .set_max_subgroups(self.max_subgroups)
            .set_round_ratio(self.round_ratio);
        if let Some(v) = self.min_group_count {
            config.set_min_group_count(v);
        }
        if let Some(v) = self.min_subgroup_count {
            config.set_min_subgroup_count(v);
        }
        if let Some(v) = self.min_group_ratio {
            config.set_min_group_ratio(v)?;
        }
        if let Some(v) = self.min_subgroup_ratio {
            config.set_min_subgroup_ratio(v)?;
        }
        if let Some(v) = self.min_subgroup_ratio_vs_total {
            config.set_min_subgroup_ratio_vs_total(v)?;
        }
        Ok(config)
    }
}
