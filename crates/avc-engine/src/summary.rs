//! Summary rows: the `_all` pseudo-group and per-group `_total` rows.

use avc_groupby::groupby_sum;

use crate::table::{FrequencyRow, FrequencyTable, GroupKey, RowKey, SubgroupKey};

/// Close every group of a grouped table with summary rows.
///
/// `overall` is the ungrouped tabulation of the same rows; its entries become
/// the `_all` group. Each real group gains a `(group, _total)` row and `_all`
/// gains `(_all, _total)`, all with ratio 1. Ungrouped and empty tables come
/// back unchanged.
#[must_use]
pub fn add_summaries(table: &FrequencyTable, overall: &FrequencyTable) -> FrequencyTable {
    if !table.is_grouped() || table.is_empty() {
        return table.clone();
    }

    let group_totals = groupby_sum(
        table
            .rows()
            .iter()
            .filter_map(|row| row.key.group.clone().map(|group| (group, row.count))),
    );

    let mut rows = table.rows().to_vec();
    rows.extend(group_totals.iter().map(|(group, count)| {
        FrequencyRow::new(
            RowKey::grouped(group.clone(), SubgroupKey::Total),
            *count,
            1.0,
        )
    }));

    rows.extend(overall.rows().iter().map(|row| {
        FrequencyRow::new(
            RowKey::grouped(GroupKey::All, row.key.subgroup.clone()),
            row.count,
            row.ratio,
        )
    }));

    let grand_total: u64 = overall.rows().iter().map(|row| row.count).sum();
    rows.push(FrequencyRow::new(
        RowKey::grouped(GroupKey::All, SubgroupKey::Total),
        grand_total,
        1.0,
    ));

    tracing::debug!(
        groups = group_totals.len(),
        categories = overall.len(),
        grand_total,
        "added summary rows"
    );

    table.with_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::add_summaries;
    use crate::table::{Bucket, RowKind};
    use crate::tabulate::{counted_values, tabulate, tabulate_grouped};

    fn some(values: &[&str]) -> Vec<Option<Bucket>> {
        values.iter().map(|v| Some(Bucket::from(*v))).collect()
    }

    #[test]
    fn grouped_table_gains_totals_and_all_group() {
        let groups = some(&["x", "x", "y", "y", "y"]);
        let values = some(&["p", "q", "p", "p", "r"]);
        let grouped = tabulate_grouped(&groups, &values, "cat", "grp");
        let overall = tabulate(&counted_values(&groups, &values), "cat");
        let table = add_summaries(&grouped, &overall);

        assert_eq!(table.get(Some("x"), "_total").map(|r| r.count), Some(2));
        assert_eq!(table.get(Some("y"), "_total").map(|r| r.count), Some(3));
        let grand = table.get(Some("_all"), "_total").expect("grand total");
        assert_eq!(grand.count, 5);
        assert_eq!(grand.ratio, 1.0);
        assert_eq!(grand.kind(), RowKind::GrandTotal);

        let all_p = table.get(Some("_all"), "p").expect("_all/p");
        assert_eq!(all_p.count, 3);
        assert!((all_p.ratio - 0.6).abs() < 1e-12);
        assert_eq!(table.group("_all").count(), 4);
    }

    #[test]
    fn group_totals_match_group_sums() {
        let groups = some(&["a", "b", "a", "c", "b", "a"]);
        let values = some(&["1", "2", "2", "1", "2", "3"]);
        let grouped = tabulate_grouped(&groups, &values, "v", "g");
        let overall = tabulate(&counted_values(&groups, &values), "v");
        let table = add_summaries(&grouped, &overall);

        for group in ["a", "b", "c", "_all"] {
            let data: u64 = table
                .group(group)
                .filter(|row| row.kind() != RowKind::GroupTotal && row.kind() != RowKind::GrandTotal)
                .map(|row| row.count)
                .sum();
            assert_eq!(table.get(Some(group), "_total").map(|r| r.count), Some(data));
        }
    }

    #[test]
    fn ungrouped_and_empty_tables_pass_through() {
        let overall = tabulate(&some(&["a", "b"]), "v");
        assert_eq!(add_summaries(&overall, &overall), overall);

        let empty = tabulate_grouped(&[], &[], "v", "g");
        assert!(add_summaries(&empty, &tabulate(&[], "v")).is_empty());
    }
}
