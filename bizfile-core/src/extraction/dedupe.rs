use std::collections::HashSet;
use std::hash::Hash;

/// Drops records equal to an earlier one on every field, keeping the first
/// occurrence of each in its original position.
///
/// Two distinct entities whose captured fields happen to be identical are
/// merged as well.
pub fn dedupe<T: Eq + Hash + Clone>(records: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.clone()))
        .collect()
}
