//! Deviation of each cell's ratio from the overall distribution.

use std::collections::HashMap;

use crate::table::{FrequencyTable, SubgroupKey};

/// Fill `diff_vs_all` on every row outside `_all` with its ratio minus the
/// ratio of the `_all` row for the same category. `_all` rows keep `None`.
///
/// # Panics
///
/// Panics if a category has no `_all` counterpart. The collapser guarantees
/// one, so hitting this means an earlier stage is broken.
#[must_use]
pub fn add_diff_vs_all(table: &FrequencyTable) -> FrequencyTable {
    if !table.is_grouped() {
        return table.clone();
    }

    let overall: HashMap<&SubgroupKey, f64> = table
        .rows()
        .iter()
        .filter(|row| row.key.in_all_group())
        .map(|row| (&row.key.subgroup, row.ratio))
        .collect();

    let rows = table
        .rows()
        .iter()
        .map(|row| {
            let mut row = row.clone();
            row.diff_vs_all = if row.key.in_all_group() {
                None
            } else {
                let reference = overall
                    .get(&row.key.subgroup)
                    .copied()
                    .expect("every category has an `_all` counterpart");
                Some(row.ratio - reference)
            };
            row
        })
        .collect();

    table.with_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::add_diff_vs_all;
    use crate::table::{Bucket, FrequencyRow, FrequencyTable, GroupKey, RowKey, SubgroupKey};

    fn row(group: GroupKey, subgroup: SubgroupKey, ratio: f64) -> FrequencyRow {
        FrequencyRow::new(RowKey::grouped(group, subgroup), 1, ratio)
    }

    #[test]
    fn diff_is_cell_ratio_minus_overall_ratio() {
        let x = GroupKey::Bucket(Bucket::from("x"));
        let p = SubgroupKey::Bucket(Bucket::from("p"));
        let table = FrequencyTable::new(
            "cat",
            Some("grp".to_owned()),
            vec![
                row(x.clone(), p.clone(), 0.75),
                row(x, SubgroupKey::Total, 1.0),
                row(GroupKey::All, p, 0.5),
                row(GroupKey::All, SubgroupKey::Total, 1.0),
            ],
        );
        let out = add_diff_vs_all(&table);
        assert_eq!(out.get(Some("x"), "p").and_then(|r| r.diff_vs_all), Some(0.25));
        assert_eq!(out.get(Some("x"), "_total").and_then(|r| r.diff_vs_all), Some(0.0));
        assert!(out.group("_all").all(|r| r.diff_vs_all.is_none()));
    }

    #[test]
    #[should_panic(expected = "`_all` counterpart")]
    fn missing_counterpart_panics() {
        let table = FrequencyTable::new(
            "cat",
            Some("grp".to_owned()),
            vec![row(
                GroupKey::Bucket(Bucket::from("x")),
                SubgroupKey::Bucket(Bucket::Other),
                1.0,
            )],
        );
        let _ = add_diff_vs_all(&table);
    }

    #[test]
    fn ungrouped_tables_are_untouched() {
        let table = FrequencyTable::new(
            "cat",
            None,
            vec![FrequencyRow::new(RowKey::ungrouped(Bucket::from("a")), 1, 1.0)],
        );
        assert_eq!(add_diff_vs_all(&table), table);
    }
}
