use std::collections::HashSet;

use super::types::NaturalKey;

/// Keeps the first item seen for each key, preserving input order. Items
/// without a key are always kept.
pub fn deduplicate_by<T, K, F>(items: Vec<T>, key_fn: F) -> Vec<T>
where
    K: Eq + std::hash::Hash,
    F: Fn(&T) -> Option<K>,
{
    let mut seen = HashSet::<K>::new();
    items
        .into_iter()
        .filter(|item| match key_fn(item) {
            Some(key) => seen.insert(key),
            None => true,
        })
        .collect()
}

pub fn deduplicate<T: NaturalKey>(items: Vec<T>) -> Vec<T> {
    deduplicate_by(items, |item| item.natural_key().map(ToOwned::to_owned))
}
