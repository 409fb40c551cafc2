#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::AddAssign;

use avc_types::{IndexLabel, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupByOptions {
    pub dropna: bool,
}

impl Default for GroupByOptions {
    fn default() -> Self {
        Self { dropna: true }
    }
}

/// Count occurrences of each key.
///
/// Output is sorted by count descending; tied keys keep first-seen order.
pub fn value_counts<K, I>(keys: I) -> Vec<(K, usize)>
where
    K: Hash + Eq + Clone,
    I: IntoIterator<Item = K>,
{
    let mut counts = groupby_sum(keys.into_iter().map(|key| (key, 1_usize)));
    // Stable descending sort keeps first-seen ordering for tied counts.
    counts.sort_by(|(_, left), (_, right)| right.cmp(left));
    counts
}

/// Value counts of a scalar column keyed by label.
///
/// Missing values count under `None` unless `options.dropna` is set, in
/// which case they are skipped entirely.
pub fn label_value_counts(
    values: &[Scalar],
    options: GroupByOptions,
) -> Vec<(Option<IndexLabel>, usize)> {
    value_counts(
        values
            .iter()
            .map(Scalar::to_label)
            .filter(|label| !(options.dropna && label.is_none())),
    )
}

/// Per-group value counts of `(group, key)` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCounts<G, K> {
    pub group: G,
    pub total: usize,
    pub counts: Vec<(K, usize)>,
}

/// Count keys inside each group.
///
/// Groups appear in first-seen order; inside a group keys are sorted by
/// count descending with first-seen tie order. Pairs with a `None` side are
/// skipped when `options.dropna` is set and kept under `None` otherwise.
pub fn grouped_value_counts<G, K, I>(
    pairs: I,
    options: GroupByOptions,
) -> Vec<GroupCounts<Option<G>, Option<K>>>
where
    G: Hash + Eq + Clone,
    K: Hash + Eq + Clone,
    I: IntoIterator<Item = (Option<G>, Option<K>)>,
{
    let mut ordering: Vec<Option<G>> = Vec::new();
    let mut slot: HashMap<Option<G>, Vec<Option<K>>> = HashMap::new();

    for (group, key) in pairs {
        if options.dropna && (group.is_none() || key.is_none()) {
            continue;
        }
        slot.entry(group.clone())
            .or_insert_with(|| {
                ordering.push(group);
                Vec::new()
            })
            .push(key);
    }

    ordering
        .into_iter()
        .map(|group| {
            let keys = slot.remove(&group).unwrap_or_default();
            GroupCounts {
                total: keys.len(),
                counts: value_counts(keys),
                group,
            }
        })
        .collect()
}

/// Sum values per key, keys in first-seen order.
pub fn groupby_sum<K, V, I>(rows: I) -> Vec<(K, V)>
where
    K: Hash + Eq + Clone,
    V: AddAssign,
    I: IntoIterator<Item = (K, V)>,
{
    let mut ordering: Vec<(K, V)> = Vec::new();
    let mut slot: HashMap<K, usize> = HashMap::new();

    for (key, value) in rows {
        match slot.get(&key) {
            Some(&pos) => ordering[pos].1 += value,
            None => {
                slot.insert(key.clone(), ordering.len());
                ordering.push((key, value));
            }
        }
    }

    ordering
}
