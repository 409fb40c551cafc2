//! Absolute and normalized counts of bucketed values.

use avc_groupby::{GroupByOptions, grouped_value_counts, value_counts};

use crate::table::{Bucket, FrequencyRow, FrequencyTable, GroupKey, RowKey, SubgroupKey};

/// Ungrouped counts, sorted by count descending with first-seen ties.
///
/// `None` entries (suppressed missing values) are not counted and do not
/// enter the ratio denominator.
#[must_use]
pub fn tabulate(values: &[Option<Bucket>], column: &str) -> FrequencyTable {
    let counts = value_counts(values.iter().flatten().cloned());
    let total: usize = counts.iter().map(|(_, count)| count).sum();

    let rows = counts
        .into_iter()
        .map(|(bucket, count)| {
            FrequencyRow::new(
                RowKey::ungrouped(bucket),
                count as u64,
                count as f64 / total as f64,
            )
        })
        .collect();

    FrequencyTable::new(column, None, rows)
}

/// Per-group counts; the ratio is the share within the group.
///
/// Rows where either side is `None` are skipped, so every counted row
/// belongs to exactly one real group.
#[must_use]
pub fn tabulate_grouped(
    groups: &[Option<Bucket>],
    values: &[Option<Bucket>],
    column: &str,
    group_column: &str,
) -> FrequencyTable {
    let grouped = grouped_value_counts(
        groups.iter().cloned().zip(values.iter().cloned()),
        GroupByOptions { dropna: true },
    );

    let mut rows = Vec::new();
    for entry in grouped {
        let Some(group) = entry.group else { continue };
        for (value, count) in entry.counts {
            let Some(value) = value else { continue };
            rows.push(FrequencyRow::new(
                RowKey::grouped(
                    GroupKey::Bucket(group.clone()),
                    SubgroupKey::Bucket(value),
                ),
                count as u64,
                count as f64 / entry.total as f64,
            ));
        }
    }

    FrequencyTable::new(column, Some(group_column.to_owned()), rows)
}

/// Values of the rows a grouped tabulation counts, for the `_all` group.
#[must_use]
pub fn counted_values(groups: &[Option<Bucket>], values: &[Option<Bucket>]) -> Vec<Option<Bucket>> {
    groups
        .iter()
        .zip(values)
        .filter(|(group, _)| group.is_some())
        .map(|(_, value)| value.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{counted_values, tabulate, tabulate_grouped};
    use crate::table::Bucket;

    fn buckets(values: &[&str]) -> Vec<Option<Bucket>> {
        values
            .iter()
            .map(|v| match *v {
                "-" => None,
                "_other" => Some(Bucket::Other),
                "_na" => Some(Bucket::Missing),
                other => Some(Bucket::from(other)),
            })
            .collect()
    }

    #[test]
    fn ungrouped_counts_and_ratios() {
        let table = tabulate(&buckets(&["a", "b", "a", "_other", "-"]), "letter");
        assert!(!table.is_grouped());
        let rendered: Vec<(String, u64)> = table
            .rows()
            .iter()
            .map(|row| (row.key.subgroup.to_string(), row.count))
            .collect();
        assert_eq!(
            rendered,
            vec![("a".to_owned(), 2), ("b".to_owned(), 1), ("_other".to_owned(), 1)]
        );
        assert_eq!(table.get(None, "a").map(|row| row.ratio), Some(0.5));
    }

    #[test]
    fn grouped_ratios_are_within_group() {
        let groups = buckets(&["x", "x", "x", "y", "-", "y"]);
        let values = buckets(&["p", "p", "q", "p", "q", "-"]);
        let table = tabulate_grouped(&groups, &values, "cat", "grp");
        assert_eq!(table.group_column(), Some("grp"));
        assert_eq!(table.len(), 3);
        let xp = table.get(Some("x"), "p").expect("x/p");
        assert_eq!(xp.count, 2);
        assert!((xp.ratio - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(table.get(Some("y"), "p").map(|row| row.ratio), Some(1.0));
    }

    #[test]
    fn counted_values_follow_group_presence() {
        let groups = buckets(&["x", "-", "y"]);
        let values = buckets(&["p", "q", "-"]);
        assert_eq!(
            counted_values(&groups, &values),
            vec![Some(Bucket::from("p")), None]
        );
    }

    #[test]
    fn empty_inputs_give_empty_tables() {
        assert!(tabulate(&[], "c").is_empty());
        assert!(tabulate_grouped(&[], &[], "c", "g").is_empty());
    }
}
