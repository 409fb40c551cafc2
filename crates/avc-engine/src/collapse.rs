//! Second bucketing pass over an already summarized grouped table.
//!
//! The passes are separate functions because their order matters:
//! [`collapse_real_groups`] ranks categories using the `_all` listing as it
//! stands before anything is pruned, and only then does
//! [`reconcile_all_group`] trim `_all` down to what the real groups kept.

use std::collections::HashSet;
use std::ops::AddAssign;

use avc_groupby::groupby_sum;

use crate::table::{Bucket, FrequencyRow, FrequencyTable, GroupKey, RowKey, SubgroupKey};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubgroupThresholds {
    /// Number of `_all` categories allowed by name. `None` and `Some(0)` both
    /// leave the listing uncapped.
    pub max_subgroups: Option<usize>,
    pub min_subgroup_ratio: f64,
    pub min_subgroup_count: u64,
    pub min_subgroup_ratio_vs_total: f64,
}

impl Default for SubgroupThresholds {
    fn default() -> Self {
        Self {
            max_subgroups: None,
            min_subgroup_ratio: 0.0,
            min_subgroup_count: 1,
            min_subgroup_ratio_vs_total: 0.0,
        }
    }
}

fn is_protected(subgroup: &SubgroupKey) -> bool {
    matches!(
        subgroup,
        SubgroupKey::Total | SubgroupKey::Bucket(Bucket::Missing)
    )
}

fn allowed_subgroups(
    table: &FrequencyTable,
    max_subgroups: Option<usize>,
) -> Option<HashSet<SubgroupKey>> {
    let max = max_subgroups.filter(|max| *max > 0)?;
    let mut listing: Vec<&FrequencyRow> = table
        .rows()
        .iter()
        .filter(|row| row.key.in_all_group() && row.key.subgroup != SubgroupKey::Total)
        .collect();
    listing.sort_by(|left, right| right.count.cmp(&left.count));
    Some(
        listing
            .into_iter()
            .take(max)
            .map(|row| row.key.subgroup.clone())
            .collect(),
    )
}

/// Pass one: fill `r_vs_total` and fold rare categories of real groups into
/// `_other`.
///
/// `r_vs_total` is the row count over the largest count in the table, which
/// is the grand total. `_na` and `_total` rows and every `_all` row are left
/// alone.
#[must_use]
pub fn collapse_real_groups(
    table: &FrequencyTable,
    thresholds: &SubgroupThresholds,
) -> FrequencyTable {
    let Some(max_count) = table.rows().iter().map(|row| row.count).max() else {
        return table.clone();
    };
    let allowed = allowed_subgroups(table, thresholds.max_subgroups);

    let mut collapsed = 0_usize;
    let rows = table
        .rows()
        .iter()
        .map(|row| {
            let mut row = row.clone();
            let r_vs_total = if max_count == 0 {
                0.0
            } else {
                row.count as f64 / max_count as f64
            };
            row.r_vs_total = Some(r_vs_total);

            if row.key.in_all_group() || is_protected(&row.key.subgroup) {
                return row;
            }
            let rare = row.count < thresholds.min_subgroup_count
                || row.ratio < thresholds.min_subgroup_ratio
                || r_vs_total < thresholds.min_subgroup_ratio_vs_total
                || allowed
                    .as_ref()
                    .is_some_and(|set| !set.contains(&row.key.subgroup));
            if rare {
                collapsed += 1;
                row.key.subgroup = SubgroupKey::Bucket(Bucket::Other);
            }
            row
        })
        .collect();

    tracing::debug!(collapsed, max_count, "collapsed real-group subgroups");
    table.with_rows(rows)
}

/// Pass two: bring the `_all` group in line with the real groups.
///
/// `_all` categories that no real group still shows become `_other`. A
/// category that only exists in real groups after pass one (typically a fresh
/// `_other`) gets a zero-count `_all` row so every real row has a
/// counterpart.
#[must_use]
pub fn reconcile_all_group(table: &FrequencyTable) -> FrequencyTable {
    let surviving: HashSet<SubgroupKey> = table
        .rows()
        .iter()
        .filter(|row| !row.key.in_all_group())
        .map(|row| row.key.subgroup.clone())
        .collect();

    let mut rows: Vec<FrequencyRow> = table
        .rows()
        .iter()
        .map(|row| {
            let mut row = row.clone();
            if row.key.in_all_group() && !surviving.contains(&row.key.subgroup) {
                row.key.subgroup = SubgroupKey::Bucket(Bucket::Other);
            }
            row
        })
        .collect();

    if rows.iter().any(|row| row.key.in_all_group()) {
        let listed: HashSet<SubgroupKey> = rows
            .iter()
            .filter(|row| row.key.in_all_group())
            .map(|row| row.key.subgroup.clone())
            .collect();
        let mut missing: Vec<&SubgroupKey> = surviving.difference(&listed).collect();
        missing.sort();
        for subgroup in missing {
            let mut row = FrequencyRow::new(
                RowKey::grouped(GroupKey::All, subgroup.clone()),
                0,
                0.0,
            );
            row.r_vs_total = Some(0.0);
            rows.push(row);
        }
    }

    table.with_rows(rows)
}

#[derive(Debug, Clone, Copy)]
struct Stats {
    count: u64,
    ratio: f64,
    r_vs_total: Option<f64>,
}

impl AddAssign for Stats {
    fn add_assign(&mut self, other: Self) {
        self.count += other.count;
        self.ratio += other.ratio;
        self.r_vs_total = match (self.r_vs_total, other.r_vs_total) {
            (Some(left), Some(right)) => Some(left + right),
            (left, right) => left.or(right),
        };
    }
}

/// Merge rows that now share a key and sort the table by key.
///
/// Counts, ratios and `r_vs_total` are summed. Any previous diff is dropped.
#[must_use]
pub fn reaggregate(table: &FrequencyTable) -> FrequencyTable {
    let mut merged = groupby_sum(table.rows().iter().map(|row| {
        (
            row.key.clone(),
            Stats {
                count: row.count,
                ratio: row.ratio,
                r_vs_total: row.r_vs_total,
            },
        )
    }));
    merged.sort_by(|(left, _), (right, _)| left.cmp(right));

    let rows = merged
        .into_iter()
        .map(|(key, stats)| FrequencyRow {
            key,
            count: stats.count,
            ratio: stats.ratio,
            r_vs_total: stats.r_vs_total,
            diff_vs_all: None,
        })
        .collect();
    table.with_rows(rows)
}

/// Run both collapsing passes and re-aggregate. Ungrouped and empty tables
/// are returned as-is.
#[must_use]
pub fn collapse_subgroups(
    table: &FrequencyTable,
    thresholds: &SubgroupThresholds,
) -> FrequencyTable {
    if !table.is_grouped() || table.is_empty() {
        return table.clone();
    }
    let pass_one = collapse_real_groups(table, thresholds);
    let pass_two = reconcile_all_group(&pass_one);
    reaggregate(&pass_two)
}
