//! The user-facing handle: a frame snapshot plus a configuration.

use std::fmt;

use avc_frame::DataFrame;
use serde::Serialize;

use crate::AvcError;
use crate::config::{AvcConfig, ConfigError, ConfigValue, ConfigWarning};
use crate::pipeline::aggregate;
use crate::table::{Bucket, FrequencyTable, GroupKey, RowKind, SubgroupKey};

/// Signal that a derived view had nothing to remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewNotice {
    /// Ungrouped tables carry no summary rows.
    NoSummaries,
}

impl fmt::Display for ViewNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSummaries => f.write_str(
                "no summary statistics are included in an ungrouped value count; same table returned",
            ),
        }
    }
}

/// One bar of a value-count chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub category: String,
    pub value: f64,
}

fn plot_label(bucket: &Bucket) -> String {
    match bucket {
        Bucket::Missing => ".na".to_owned(),
        Bucket::Other => ".other".to_owned(),
        Bucket::Value(label) => label.to_string(),
    }
}

/// Advanced value counts of one column, optionally split by a second.
///
/// The frame is copied on construction, so later changes to the caller's
/// frame do not leak in. Every call to [`AdvancedValueCounts::avc_table`]
/// recomputes the table from that copy and the current configuration.
#[derive(Debug, Clone)]
pub struct AdvancedValueCounts {
    df: DataFrame,
    column: String,
    groupby_col: Option<String>,
    config: AvcConfig,
}

impl AdvancedValueCounts {
    pub fn new(
        df: &DataFrame,
        column: &str,
        groupby_col: Option<&str>,
        config: AvcConfig,
    ) -> Result<Self, AvcError> {
        df.require_column(column)?;
        if let Some(groupby_col) = groupby_col {
            df.require_column(groupby_col)?;
        }
        Ok(Self {
            df: df.clone(),
            column: column.to_owned(),
            groupby_col: groupby_col.map(str::to_owned),
            config,
        })
    }

    /// Construct from keyword-style settings; see [`AvcConfig::from_attributes`].
    pub fn from_attributes<'a, I>(
        df: &DataFrame,
        column: &str,
        groupby_col: Option<&str>,
        attributes: I,
    ) -> Result<Self, AvcError>
    where
        I: IntoIterator<Item = (&'a str, ConfigValue)>,
    {
        let config = AvcConfig::from_attributes(attributes)?;
        Self::new(df, column, groupby_col, config)
    }

    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    #[must_use]
    pub fn groupby_col(&self) -> Option<&str> {
        self.groupby_col.as_deref()
    }

    #[must_use]
    pub fn config(&self) -> &AvcConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AvcConfig {
        &mut self.config
    }

    /// Dynamic assignment, forwarded to [`AvcConfig::set_attribute`].
    pub fn set_attribute(
        &mut self,
        name: &str,
        value: ConfigValue,
    ) -> Result<Option<ConfigWarning>, ConfigError> {
        self.config.set_attribute(name, value)
    }

    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<ConfigValue> {
        self.config.get_attribute(name)
    }

    /// The full table with summary rows.
    pub fn avc_table(&self) -> Result<FrequencyTable, AvcError> {
        Ok(aggregate(
            &self.df,
            &self.column,
            self.groupby_col.as_deref(),
            &self.config,
        )?)
    }

    /// The table without `_all` and `_total` rows.
    ///
    /// Ungrouped tables have no summaries; they come back unchanged together
    /// with [`ViewNotice::NoSummaries`].
    pub fn unsummarized_table(&self) -> Result<(FrequencyTable, Option<ViewNotice>), AvcError> {
        let table = self.avc_table()?;
        if table.is_grouped() {
            return Ok((table.filter_kinds(&[RowKind::Data]), None));
        }
        let notice = ViewNotice::NoSummaries;
        tracing::warn!(column = %self.column, "{notice}");
        Ok((table, Some(notice)))
    }

    /// Bars for a chart of the table.
    ///
    /// Grouped: `_total` rows are dropped, `_all` rows only kept when
    /// `normalize` is set, and bars are sorted by group then category.
    /// Sentinel categories are renamed to `.na` and `.other`. Values are
    /// ratios when `normalize` is set and counts otherwise.
    pub fn plot_rows(&self, normalize: bool) -> Result<Vec<PlotRow>, AvcError> {
        let table = self.avc_table()?;
        let value = |ratio: f64, count: u64| if normalize { ratio } else { count as f64 };

        if !table.is_grouped() {
            return Ok(table
                .rows()
                .iter()
                .filter_map(|row| match &row.key.subgroup {
                    SubgroupKey::Bucket(bucket) => Some(PlotRow {
                        group: None,
                        category: plot_label(bucket),
                        value: value(row.ratio, row.count),
                    }),
                    SubgroupKey::Total => None,
                })
                .collect());
        }

        let mut rows: Vec<PlotRow> = table
            .rows()
            .iter()
            .filter(|row| normalize || !row.key.in_all_group())
            .filter_map(|row| {
                let SubgroupKey::Bucket(bucket) = &row.key.subgroup else {
                    return None;
                };
                let group = match row.key.group.as_ref()? {
                    GroupKey::Bucket(group) => plot_label(group),
                    GroupKey::All => GroupKey::All.to_string(),
                };
                Some(PlotRow {
                    group: Some(group),
                    category: plot_label(bucket),
                    value: value(row.ratio, row.count),
                })
            })
            .collect();
        rows.sort_by(|left, right| {
            left.group
                .cmp(&right.group)
                .then_with(|| left.category.cmp(&right.category))
        });
        Ok(rows)
    }
}

impl fmt::Display for AdvancedValueCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let optional = |v: Option<usize>| v.map_or_else(|| "None".to_owned(), |v| v.to_string());
        let config = &self.config;
        writeln!(f, "Settings:")?;
        writeln!(f, "  column: {}", self.column)?;
        writeln!(f, "  groupby_col: {}", self.groupby_col.as_deref().unwrap_or("None"))?;
        writeln!(f, "  dropna: {}", config.dropna())?;
        writeln!(f, "  max_groups: {}", optional(config.max_groups()))?;
        writeln!(f, "  min_group_ratio: {}", config.min_group_ratio())?;
        writeln!(f, "  min_group_count: {}", config.min_group_count())?;
        writeln!(f, "  max_subgroups: {}", optional(config.max_subgroups()))?;
        writeln!(f, "  min_subgroup_ratio: {}", config.min_subgroup_ratio())?;
        writeln!(f, "  min_subgroup_count: {}", config.min_subgroup_count())?;
        writeln!(
            f,
            "  min_subgroup_ratio_vs_total: {}",
            config.min_subgroup_ratio_vs_total()
        )?;
        writeln!(
            f,
            "  round_ratio: {}",
            optional(config.round_ratio().map(|v| v as usize))
        )?;
        writeln!(f)?;
        writeln!(f, "AdvancedValueCounts table:")?;
        match self.avc_table() {
            Ok(table) => write!(f, "{table}"),
            Err(err) => writeln!(f, "<unavailable: {err}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use avc_frame::{DataFrame, FrameError};
    use avc_types::Scalar;

    use super::{AdvancedValueCounts, ViewNotice};
    use crate::AvcError;
    use crate::config::{AvcConfig, ConfigValue};

    fn frame() -> DataFrame {
        let utf8 = |values: &[&str]| values.iter().map(|v| Scalar::from(*v)).collect::<Vec<_>>();
        DataFrame::from_columns([
            ("shop", utf8(&["a", "a", "b", "b", "b"])),
            ("fruit", utf8(&["apple", "pear", "apple", "apple", "kiwi"])),
        ])
        .expect("frame")
    }

    #[test]
    fn construction_checks_columns() {
        let err = AdvancedValueCounts::new(&frame(), "fruit", Some("nope"), AvcConfig::default())
            .expect_err("unknown group column");
        assert!(matches!(err, AvcError::Frame(FrameError::ColumnNotFound(_))));
    }

    #[test]
    fn source_frame_is_snapshotted() {
        let mut df = frame();
        let avc = AdvancedValueCounts::new(&df, "fruit", None, AvcConfig::default()).expect("avc");
        df = df
            .with_column("extra", vec![Scalar::from(1_i64); 5])
            .expect("extra column");
        assert_eq!(df.num_columns(), 3);
        assert_eq!(avc.avc_table().expect("table").len(), 3);
    }

    #[test]
    fn unsummarized_view_drops_summary_rows() {
        let avc = AdvancedValueCounts::new(&frame(), "fruit", Some("shop"), AvcConfig::default())
            .expect("avc");
        let (table, notice) = avc.unsummarized_table().expect("view");
        assert!(notice.is_none());
        assert_eq!(table.len(), 4);
        assert!(table.get(Some("_all"), "apple").is_none());
        assert!(table.get(Some("a"), "_total").is_none());

        let ungrouped =
            AdvancedValueCounts::new(&frame(), "fruit", None, AvcConfig::default()).expect("avc");
        let (table, notice) = ungrouped.unsummarized_table().expect("view");
        assert_eq!(notice, Some(ViewNotice::NoSummaries));
        assert_eq!(table, ungrouped.avc_table().expect("table"));
    }

    #[test]
    fn plot_rows_rename_sentinels_and_skip_totals() {
        let config = AvcConfig::builder().min_subgroup_count(2).build().expect("config");
        let avc = AdvancedValueCounts::new(&frame(), "fruit", Some("shop"), config).expect("avc");

        let normalized = avc.plot_rows(true).expect("plot");
        assert!(normalized.iter().all(|row| row.category != "_total"));
        assert!(normalized.iter().any(|row| row.category == ".other"));
        assert!(normalized.iter().any(|row| row.group.as_deref() == Some("_all")));

        let counts = avc.plot_rows(false).expect("plot");
        assert!(counts.iter().all(|row| row.group.as_deref() != Some("_all")));
        let b_apple = counts
            .iter()
            .find(|row| row.group.as_deref() == Some("b") && row.category == "apple")
            .expect("b/apple");
        assert_eq!(b_apple.value, 2.0);
    }

    #[test]
    fn attributes_can_change_after_construction() {
        let mut avc = AdvancedValueCounts::from_attributes(
            &frame(),
            "fruit",
            None,
            [("max_groups", ConfigValue::Int(1))],
        )
        .expect("avc");
        assert_eq!(avc.avc_table().expect("table").len(), 2);

        avc.set_attribute("max_groups", ConfigValue::None).expect("valid");
        assert_eq!(avc.avc_table().expect("table").len(), 3);
        assert_eq!(avc.get_attribute("max_groups"), Some(ConfigValue::None));
    }

    #[test]
    fn display_lists_settings_and_table() {
        let avc = AdvancedValueCounts::new(&frame(), "fruit", Some("shop"), AvcConfig::default())
            .expect("avc");
        let rendered = avc.to_string();
        assert!(rendered.contains("groupby_col: shop"));
        assert!(rendered.contains("max_groups: None"));
        assert!(rendered.contains("subgroup_ratio"));
    }
}
