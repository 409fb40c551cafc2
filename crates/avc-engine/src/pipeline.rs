//! The full aggregation: bucket, tabulate, summarize, collapse, diff, round.

use avc_frame::{DataFrame, FrameError};

use crate::bucket::{BucketThresholds, bucket};
use crate::collapse::{SubgroupThresholds, collapse_subgroups};
use crate::config::AvcConfig;
use crate::diff::add_diff_vs_all;
use crate::summary::add_summaries;
use crate::table::FrequencyTable;
use crate::tabulate::{counted_values, tabulate, tabulate_grouped};

/// Compute the advanced value counts of `column`, optionally split by
/// `groupby_col`.
///
/// Ungrouped tables are ordered by count descending. Grouped tables are
/// ordered by key and carry `_total` rows and an `_all` group.
pub fn aggregate(
    df: &DataFrame,
    column: &str,
    groupby_col: Option<&str>,
    config: &AvcConfig,
) -> Result<FrequencyTable, FrameError> {
    let values = df.require_column(column)?.values();
    let group_thresholds = BucketThresholds {
        max_distinct: config.max_groups(),
        min_ratio: config.min_group_ratio(),
        min_count: config.min_group_count(),
    };

    let table = match groupby_col {
        None => {
            let _span = tracing::debug_span!("avc_ungrouped", rows = df.len(), column).entered();
            let buckets = bucket(values, &group_thresholds, config.dropna());
            tabulate(&buckets, column)
        }
        Some(groupby_col) => {
            let groups = df.require_column(groupby_col)?.values();
            let _span = tracing::debug_span!(
                "avc_grouped",
                rows = df.len(),
                column,
                groupby_col
            )
            .entered();

            let group_buckets = bucket(groups, &group_thresholds, config.dropna());
            let value_buckets = bucket(
                values,
                &BucketThresholds {
                    max_distinct: None,
                    min_ratio: config.min_subgroup_ratio_vs_total(),
                    min_count: config.min_subgroup_count(),
                },
                config.dropna(),
            );

            let grouped = tabulate_grouped(&group_buckets, &value_buckets, column, groupby_col);
            let overall = tabulate(&counted_values(&group_buckets, &value_buckets), column);
            let summarized = add_summaries(&grouped, &overall);
            let collapsed = collapse_subgroups(
                &summarized,
                &SubgroupThresholds {
                    max_subgroups: config.max_subgroups(),
                    min_subgroup_ratio: config.min_subgroup_ratio(),
                    min_subgroup_count: config.min_subgroup_count(),
                    min_subgroup_ratio_vs_total: config.min_subgroup_ratio_vs_total(),
                },
            );
            add_diff_vs_all(&collapsed)
        }
    };

    tracing::debug!(rows = table.len(), "aggregated value counts");
    Ok(round_ratios(table, config.round_ratio()))
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(i32::try_from(decimals).unwrap_or(i32::MAX));
    if factor.is_finite() {
        (value * factor).round() / factor
    } else {
        value
    }
}

/// Round every ratio column for display. `None` and `Some(0)` leave the
/// table as computed.
#[must_use]
pub fn round_ratios(mut table: FrequencyTable, decimals: Option<u32>) -> FrequencyTable {
    let Some(decimals) = decimals.filter(|d| *d > 0) else {
        return table;
    };
    for row in table.rows_mut() {
        row.ratio = round_to(row.ratio, decimals);
        row.r_vs_total = row.r_vs_total.map(|v| round_to(v, decimals));
        row.diff_vs_all = row.diff_vs_all.map(|v| round_to(v, decimals));
    }
    table
}
