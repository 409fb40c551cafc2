//! Frequency table records and their keys.
//!
//! Sentinel categories are enum variants here. The underscore names
//! (`_other`, `_na`, `_total`, `_all`) only appear through `Display`,
//! serialization and label lookups.

use std::collections::HashSet;
use std::fmt;

use avc_types::IndexLabel;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

pub const OTHER_LABEL: &str = "_other";
pub const MISSING_LABEL: &str = "_na";
pub const TOTAL_LABEL: &str = "_total";
pub const ALL_LABEL: &str = "_all";

/// A counted value after bucketing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    Value(IndexLabel),
    /// Stands in for missing input values.
    Missing,
    /// Collects values that failed a threshold.
    Other,
}

impl Bucket {
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        !matches!(self, Self::Value(_))
    }
}

impl From<IndexLabel> for Bucket {
    fn from(label: IndexLabel) -> Self {
        Self::Value(label)
    }
}

impl From<&str> for Bucket {
    fn from(label: &str) -> Self {
        Self::Value(IndexLabel::from(label))
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(label) => write!(f, "{label}"),
            Self::Missing => f.write_str(MISSING_LABEL),
            Self::Other => f.write_str(OTHER_LABEL),
        }
    }
}

/// Outer key of a grouped table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Bucket(Bucket),
    /// The aggregate pseudo-group holding the ungrouped distribution.
    All,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bucket(bucket) => write!(f, "{bucket}"),
            Self::All => f.write_str(ALL_LABEL),
        }
    }
}

/// Inner (category) key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubgroupKey {
    Bucket(Bucket),
    /// The per-group total row.
    Total,
}

impl SubgroupKey {
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        match self {
            Self::Bucket(bucket) => bucket.is_sentinel(),
            Self::Total => true,
        }
    }
}

impl fmt::Display for SubgroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bucket(bucket) => write!(f, "{bucket}"),
            Self::Total => f.write_str(TOTAL_LABEL),
        }
    }
}

macro_rules! serialize_as_label {
    ($($ty:ty),*) => {$(
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }
    )*};
}

serialize_as_label!(Bucket, GroupKey, SubgroupKey);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    /// An observed (group, category) cell, or any row of an ungrouped table.
    Data,
    /// `(group, _total)`.
    GroupTotal,
    /// `(_all, category)`.
    AllGroupData,
    /// `(_all, _total)`.
    GrandTotal,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey {
    pub group: Option<GroupKey>,
    pub subgroup: SubgroupKey,
}

impl RowKey {
    #[must_use]
    pub fn ungrouped(bucket: Bucket) -> Self {
        Self {
            group: None,
            subgroup: SubgroupKey::Bucket(bucket),
        }
    }

    #[must_use]
    pub fn grouped(group: GroupKey, subgroup: SubgroupKey) -> Self {
        Self {
            group: Some(group),
            subgroup,
        }
    }

    #[must_use]
    pub fn kind(&self) -> RowKind {
        match (&self.group, &self.subgroup) {
            (Some(GroupKey::All), SubgroupKey::Total) => RowKind::GrandTotal,
            (Some(GroupKey::All), SubgroupKey::Bucket(_)) => RowKind::AllGroupData,
            (_, SubgroupKey::Total) => RowKind::GroupTotal,
            (_, SubgroupKey::Bucket(_)) => RowKind::Data,
        }
    }

    #[must_use]
    pub fn in_all_group(&self) -> bool {
        matches!(self.group, Some(GroupKey::All))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyRow {
    pub key: RowKey,
    pub count: u64,
    /// Share within the row's scope: the whole column when ungrouped, the
    /// group otherwise. Serialized under [`FrequencyTable::ratio_column`].
    pub ratio: f64,
    pub r_vs_total: Option<f64>,
    pub diff_vs_all: Option<f64>,
}

impl FrequencyRow {
    #[must_use]
    pub fn new(key: RowKey, count: u64, ratio: f64) -> Self {
        Self {
            key,
            count,
            ratio,
            r_vs_total: None,
            diff_vs_all: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> RowKind {
        self.key.kind()
    }
}

/// Result of an advanced value count.
///
/// Ungrouped tables have one row per category. Grouped tables carry one row
/// per (group, category) plus `_total` rows per group and an `_all` group.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyTable {
    column: String,
    group_column: Option<String>,
    rows: Vec<FrequencyRow>,
}

impl FrequencyTable {
    #[must_use]
    pub fn new(
        column: impl Into<String>,
        group_column: Option<String>,
        rows: Vec<FrequencyRow>,
    ) -> Self {
        Self {
            column: column.into(),
            group_column,
            rows,
        }
    }

    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    #[must_use]
    pub fn group_column(&self) -> Option<&str> {
        self.group_column.as_deref()
    }

    #[must_use]
    pub fn is_grouped(&self) -> bool {
        self.group_column.is_some()
    }

    /// Name the ratio column goes by in this mode.
    #[must_use]
    pub fn ratio_column(&self) -> &'static str {
        if self.is_grouped() {
            "subgroup_ratio"
        } else {
            "ratio"
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[FrequencyRow] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [FrequencyRow] {
        &mut self.rows
    }

    pub(crate) fn with_rows(&self, rows: Vec<FrequencyRow>) -> Self {
        Self {
            column: self.column.clone(),
            group_column: self.group_column.clone(),
            rows,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a row by external labels, e.g. `get(Some("_all"), "_total")`.
    /// Pass `None` as group for ungrouped tables.
    #[must_use]
    pub fn get(&self, group: Option<&str>, subgroup: &str) -> Option<&FrequencyRow> {
        self.rows.iter().find(|row| {
            let group_matches = match (&row.key.group, group) {
                (None, None) => true,
                (Some(key), Some(label)) => key.to_string() == label,
                _ => false,
            };
            group_matches && row.key.subgroup.to_string() == subgroup
        })
    }

    /// Rows of one group, by external label.
    pub fn group<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a FrequencyRow> + 'a {
        self.rows.iter().filter(move |row| {
            row.key
                .group
                .as_ref()
                .is_some_and(|key| key.to_string() == label)
        })
    }

    /// Distinct group keys in row order.
    #[must_use]
    pub fn groups(&self) -> Vec<&GroupKey> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter_map(|row| row.key.group.as_ref())
            .filter(|key| seen.insert(*key))
            .collect()
    }

    /// Distinct subgroup keys in row order.
    #[must_use]
    pub fn subgroups(&self) -> Vec<&SubgroupKey> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(|row| &row.key.subgroup)
            .filter(|key| seen.insert(*key))
            .collect()
    }

    /// Keep only rows of the given kinds.
    #[must_use]
    pub fn filter_kinds(&self, kinds: &[RowKind]) -> Self {
        self.with_rows(
            self.rows
                .iter()
                .filter(|row| kinds.contains(&row.kind()))
                .cloned()
                .collect(),
        )
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// One row as a flat record, with the ratio under its mode-dependent name.
struct RowRecord<'a> {
    row: &'a FrequencyRow,
    ratio_column: &'static str,
}

impl Serialize for RowRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let row = self.row;
        let mut map = serializer.serialize_map(None)?;
        if let Some(group) = &row.key.group {
            map.serialize_entry("group", group)?;
        }
        map.serialize_entry("subgroup", &row.key.subgroup)?;
        map.serialize_entry("count", &row.count)?;
        map.serialize_entry(self.ratio_column, &row.ratio)?;
        if let Some(r_vs_total) = row.r_vs_total {
            map.serialize_entry("r_vs_total", &r_vs_total)?;
        }
        if let Some(diff) = row.diff_vs_all {
            map.serialize_entry("subgr_r_diff_subgr_all", &diff)?;
        }
        map.end()
    }
}

struct RowRecords<'a>(&'a FrequencyTable);

impl Serialize for RowRecords<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ratio_column = self.0.ratio_column();
        serializer.collect_seq(
            self.0
                .rows
                .iter()
                .map(|row| RowRecord { row, ratio_column }),
        )
    }
}

impl Serialize for FrequencyTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if self.group_column.is_some() { 3 } else { 2 };
        let mut state = serializer.serialize_struct("FrequencyTable", fields)?;
        state.serialize_field("column", &self.column)?;
        if let Some(group_column) = &self.group_column {
            state.serialize_field("group_column", group_column)?;
        } else {
            state.skip_field("group_column")?;
        }
        state.serialize_field("rows", &RowRecords(self))?;
        state.end()
    }
}

fn format_ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "NaN".to_owned(), |v| format!("{v:.6}"))
}

impl fmt::Display for FrequencyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut header = Vec::new();
        if let Some(group_column) = &self.group_column {
            header.push(group_column.clone());
        }
        header.push(self.column.clone());
        header.push("count".to_owned());
        header.push(self.ratio_column().to_owned());
        if self.is_grouped() {
            header.push("subgr_r_diff_subgr_all".to_owned());
            header.push("r_vs_total".to_owned());
        }

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                let mut line = Vec::with_capacity(header.len());
                if let Some(group) = &row.key.group {
                    line.push(group.to_string());
                }
                line.push(row.key.subgroup.to_string());
                line.push(row.count.to_string());
                line.push(format_ratio(Some(row.ratio)));
                if self.is_grouped() {
                    line.push(format_ratio(row.diff_vs_all));
                    line.push(format_ratio(row.r_vs_total));
                }
                line
            })
            .collect();

        let widths: Vec<usize> = (0..header.len())
            .map(|idx| {
                cells
                    .iter()
                    .map(|line| line.get(idx).map_or(0, String::len))
                    .chain(std::iter::once(header[idx].len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let render = |line: &[String]| {
            line.iter()
                .enumerate()
                .map(|(idx, cell)| format!("{cell:>width$}", width = widths[idx]))
                .collect::<Vec<_>>()
                .join("  ")
        };

        writeln!(f, "{}", render(&header))?;
        for line in &cells {
            writeln!(f, "{}", render(line))?;
        }
        Ok(())
    }
}
