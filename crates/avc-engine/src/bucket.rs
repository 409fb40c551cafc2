//! Value bucketing: the first collapsing pass, applied to raw column values.

use std::collections::{HashMap, HashSet};

use avc_groupby::{GroupByOptions, label_value_counts};
use avc_types::{IndexLabel, Scalar};

use crate::table::Bucket;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketThresholds {
    /// Keep at most this many distinct values by frequency. `None` keeps all.
    pub max_distinct: Option<usize>,
    pub min_ratio: f64,
    pub min_count: u64,
}

impl Default for BucketThresholds {
    fn default() -> Self {
        Self {
            max_distinct: None,
            min_ratio: 0.0,
            min_count: 1,
        }
    }
}

/// Replace rare values with [`Bucket::Other`].
///
/// Missing values become [`Bucket::Missing`] and are never collapsed. With
/// `suppress_missing` they are left out of the frequency universe entirely
/// and come back as `None`. The output is aligned with `values`.
///
/// When the missing bucket ranks inside the top `max_distinct` window the
/// window grows by one, so it never displaces a real value. The widening only
/// looks at the rank, not at whether the missing bucket clears the ratio and
/// count thresholds.
#[must_use]
pub fn bucket(
    values: &[Scalar],
    thresholds: &BucketThresholds,
    suppress_missing: bool,
) -> Vec<Option<Bucket>> {
    let counts = label_value_counts(
        values,
        GroupByOptions {
            dropna: suppress_missing,
        },
    );
    let total: usize = counts.iter().map(|(_, count)| count).sum();

    let allowed: Option<HashSet<&IndexLabel>> = thresholds.max_distinct.map(|max| {
        let widened = if counts.iter().take(max).any(|(label, _)| label.is_none()) {
            max + 1
        } else {
            max
        };
        counts
            .iter()
            .take(widened)
            .filter_map(|(label, _)| label.as_ref())
            .collect()
    });

    let decisions: HashMap<&IndexLabel, bool> = counts
        .iter()
        .filter_map(|(label, count)| label.as_ref().map(|label| (label, *count)))
        .map(|(label, count)| {
            let ratio = count as f64 / total as f64;
            let collapse = (count as u64) < thresholds.min_count
                || ratio < thresholds.min_ratio
                || allowed.as_ref().is_some_and(|set| !set.contains(label));
            (label, collapse)
        })
        .collect();

    let collapsed = decisions.values().filter(|collapse| **collapse).count();
    tracing::debug!(
        distinct = decisions.len(),
        collapsed,
        total,
        "bucketed column values"
    );

    values
        .iter()
        .map(|value| match value.to_label() {
            None if suppress_missing => None,
            None => Some(Bucket::Missing),
            Some(label) => {
                if decisions.get(&label).copied().unwrap_or(false) {
                    Some(Bucket::Other)
                } else {
                    Some(Bucket::Value(label))
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use avc_types::{NullKind, Scalar};

    use super::{BucketThresholds, bucket};
    use crate::table::Bucket;

    fn column(values: &[Option<&str>]) -> Vec<Scalar> {
        values.iter().map(|v| Scalar::from(*v)).collect()
    }

    fn rendered(buckets: &[Option<Bucket>]) -> Vec<String> {
        buckets
            .iter()
            .map(|b| b.as_ref().map_or_else(|| "<none>".to_owned(), ToString::to_string))
            .collect()
    }

    #[test]
    fn min_count_collapses_rare_values() {
        let values = column(&[
            Some("A"),
            Some("A"),
            Some("A"),
            Some("B"),
            Some("B"),
            Some("C"),
            Some("C"),
            Some("C"),
            Some("C"),
            Some("D"),
        ]);
        let out = bucket(
            &values,
            &BucketThresholds {
                min_count: 3,
                ..BucketThresholds::default()
            },
            false,
        );
        assert_eq!(
            rendered(&out),
            vec!["A", "A", "A", "_other", "_other", "C", "C", "C", "C", "_other"]
        );
    }

    #[test]
    fn min_ratio_uses_share_of_counted_rows() {
        let values = column(&[Some("a"), Some("a"), Some("a"), Some("b"), None]);
        let thresholds = BucketThresholds {
            min_ratio: 0.25,
            ..BucketThresholds::default()
        };
        // b is 1/5 with missing counted, 1/4 without.
        assert_eq!(
            rendered(&bucket(&values, &thresholds, false)),
            vec!["a", "a", "a", "_other", "_na"]
        );
        assert_eq!(
            rendered(&bucket(&values, &thresholds, true)),
            vec!["a", "a", "a", "b", "<none>"]
        );
    }

    #[test]
    fn missing_bucket_is_never_collapsed() {
        let values = vec![
            Scalar::from("a"),
            Scalar::from("a"),
            Scalar::Null(NullKind::Null),
        ];
        let out = bucket(
            &values,
            &BucketThresholds {
                min_count: 2,
                max_distinct: Some(0),
                ..BucketThresholds::default()
            },
            false,
        );
        assert_eq!(rendered(&out), vec!["_other", "_other", "_na"]);
    }

    #[test]
    fn cap_widens_when_missing_ranks_inside_window() {
        // Frequencies: missing 3, x 2, y 1.
        let values = column(&[None, None, None, Some("x"), Some("x"), Some("y")]);
        let out = bucket(
            &values,
            &BucketThresholds {
                max_distinct: Some(1),
                ..BucketThresholds::default()
            },
            false,
        );
        assert_eq!(rendered(&out), vec!["_na", "_na", "_na", "x", "x", "_other"]);
    }

    #[test]
    fn cap_without_missing_in_window_keeps_top_values() {
        let values = column(&[Some("x"), Some("x"), Some("y"), Some("z"), None]);
        let out = bucket(
            &values,
            &BucketThresholds {
                max_distinct: Some(2),
                ..BucketThresholds::default()
            },
            false,
        );
        // Ties between y, z and missing resolve by first appearance.
        assert_eq!(rendered(&out), vec!["x", "x", "y", "_other", "_na"]);
    }

    #[test]
    fn cap_zero_collapses_every_value() {
        let values = column(&[Some("x"), Some("y")]);
        let out = bucket(
            &values,
            &BucketThresholds {
                max_distinct: Some(0),
                ..BucketThresholds::default()
            },
            true,
        );
        assert_eq!(rendered(&out), vec!["_other", "_other"]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(bucket(&[], &BucketThresholds::default(), false).is_empty());
    }
}
