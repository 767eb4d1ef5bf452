use crate::config::OffsetRule;
use crate::types::{KeyDelta, PositionedFragment, RowDump, RowKey};
use std::collections::BTreeMap;

/// Fragments grouped into rows by vertical position.
///
/// Two fragments on the same visual line are often reported with slightly
/// different baselines, so a fragment joins an existing row when its key is
/// within `tolerance` of it. Every fragment lives in exactly one row and rows
/// are never split once created.
#[derive(Debug, Clone)]
pub struct RowIndex {
    rows: BTreeMap<RowKey, Vec<PositionedFragment>>,
    tolerance: KeyDelta,
}

impl RowIndex {
    pub fn new(tolerance: KeyDelta) -> Self {
        Self {
            rows: BTreeMap::new(),
            tolerance: KeyDelta::from_hundredths(tolerance.hundredths().saturating_abs()),
        }
    }

    /// Build an index from a batch of fragments, inserted in order.
    pub fn from_fragments<I>(tolerance: KeyDelta, fragments: I) -> Self
    where
        I: IntoIterator<Item = PositionedFragment>,
    {
        let mut index = Self::new(tolerance);
        for fragment in fragments {
            index.insert(fragment);
        }
        index
    }

    pub fn tolerance(&self) -> KeyDelta {
        self.tolerance
    }

    /// Place a fragment in its row and return that row's key.
    pub fn insert(&mut self, fragment: PositionedFragment) -> RowKey {
        let key = self.row_for(fragment.key()).unwrap_or(fragment.key());
        let row = self.rows.entry(key).or_default();
        let position = row.partition_point(|existing| existing.x <= fragment.x);
        row.insert(position, fragment);
        key
    }

    /// Existing row a fragment at `key` belongs to. An established row wins
    /// over a near-duplicate: exact key, then `key + δ`, then `key - δ`,
    /// then the nearest row in between (the higher one on a tie).
    fn row_for(&self, key: RowKey) -> Option<RowKey> {
        let nudged = [key, key.above(self.tolerance), key.below(self.tolerance)];
        if let Some(found) = nudged.into_iter().find(|k| self.rows.contains_key(k)) {
            return Some(found);
        }

        self.rows
            .range(key.below(self.tolerance)..=key.above(self.tolerance))
            .map(|(existing, _)| *existing)
            .min_by(|a, b| {
                a.distance(key)
                    .cmp(&b.distance(key))
                    .then_with(|| b.cmp(a))
            })
    }

    pub fn lookup(&self, key: RowKey) -> Option<&[PositionedFragment]> {
        self.rows.get(&key).map(Vec::as_slice)
    }

    pub fn contains(&self, key: RowKey) -> bool {
        self.rows.contains_key(&key)
    }

    /// Keys of rows where some fragment's text equals `token` exactly.
    pub fn rows_containing(&self, token: &str) -> Vec<RowKey> {
        self.rows
            .iter()
            .filter(|(_, row)| row.iter().any(|fragment| fragment.text == token))
            .map(|(key, _)| *key)
            .collect()
    }

    /// Like `rows_containing`, but also matches single lines of multi-line fragments.
    pub fn rows_containing_line(&self, token: &str) -> Vec<RowKey> {
        self.rows
            .iter()
            .filter(|(_, row)| row.iter().any(|fragment| fragment.has_line(token)))
            .map(|(key, _)| *key)
            .collect()
    }

    /// Apply an offset rule below `from`: the first candidate whose row
    /// exists, otherwise the default (which may point at nothing).
    pub fn resolve(&self, from: RowKey, rule: &OffsetRule) -> RowKey {
        rule.candidates
            .iter()
            .map(|candidate| from.below(*candidate))
            .find(|key| self.contains(*key))
            .unwrap_or_else(|| from.below(rule.default))
    }

    /// Fold another index into this one, fragment by fragment.
    pub fn merge(&mut self, other: RowIndex) {
        for fragment in other.rows.into_values().flatten() {
            self.insert(fragment);
        }
    }

    /// Rows in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (RowKey, &[PositionedFragment])> {
        self.rows.iter().map(|(key, row)| (*key, row.as_slice()))
    }

    /// Rows from the top of the page down.
    pub fn iter_top_down(&self) -> impl Iterator<Item = (RowKey, &[PositionedFragment])> {
        self.rows.iter().rev().map(|(key, row)| (*key, row.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn fragment_count(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn dump(&self) -> Vec<RowDump> {
        self.iter()
            .map(|(key, row)| RowDump {
                key,
                texts: row.iter().map(|fragment| fragment.text.clone()).collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(x: f64, y: f64, text: &str) -> PositionedFragment {
        PositionedFragment::new(x, y, 10.0, text)
    }

    fn index() -> RowIndex {
        RowIndex::new(KeyDelta::from(4.0))
    }

    #[test]
    fn test_fragments_ordered_left_to_right() {
        let mut rows = index();
        rows.insert(fragment(300.0, 500.0, "BankX"));
        rows.insert(fragment(20.0, 500.0, "C001"));
        rows.insert(fragment(150.0, 500.0, "01/01/2020"));

        let texts: Vec<_> = rows
            .lookup(RowKey::from(500.0))
            .unwrap()
            .iter()
            .map(|f| f.text.as_str())
            .collect();
        assert_eq!(texts, vec!["C001", "01/01/2020", "BankX"]);
    }

    #[test]
    fn test_keys_at_the_edge_of_the_range_share_a_row() {
        let mut rows = index();
        let first = rows.insert(fragment(1.0, 1e20, "a"));
        let second = rows.insert(fragment(2.0, 1e20, "b"));
        assert_eq!(first, second);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.fragment_count(), 2);
    }

    #[test]
    fn test_merge_tolerance_in_either_order() {
        let pairs = [(500.0, 504.0), (500.0, 496.0), (500.0, 501.37), (471.66, 468.2)];
        for (a, b) in pairs {
            for (first, second) in [(a, b), (b, a)] {
                let mut rows = index();
                let k1 = rows.insert(fragment(10.0, first, "one"));
                let k2 = rows.insert(fragment(50.0, second, "two"));
                assert_eq!(k1, k2, "{first} and {second} split into two rows");
                assert_eq!(rows.len(), 1);
                assert_eq!(rows.fragment_count(), 2);
            }
        }
    }

    #[test]
    fn test_beyond_tolerance_makes_new_row() {
        let mut rows = index();
        rows.insert(fragment(10.0, 500.0, "one"));
        rows.insert(fragment(10.0, 504.01, "two"));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_offset_match_wins_over_nearest_row() {
        let mut rows = index();
        rows.insert(fragment(10.0, 500.0, "a"));
        rows.insert(fragment(10.0, 505.0, "b"));
        // 501 is within tolerance of both; the key + 4 lookup lands on 505
        // before the nearest-row scan would pick 500
        let key = rows.insert(fragment(90.0, 501.0, "c"));
        assert_eq!(key, RowKey::from(505.0));
    }

    #[test]
    fn test_nearest_row_tie_prefers_higher_key() {
        let mut rows = index();
        rows.insert(fragment(10.0, 497.0, "low"));
        rows.insert(fragment(10.0, 503.0, "high"));
        let key = rows.insert(fragment(10.0, 500.0, "mid"));
        assert_eq!(key, RowKey::from(503.0));
    }

    #[test]
    fn test_rows_containing_exact_and_line_match() {
        let mut rows = index();
        rows.insert(fragment(10.0, 700.0, "Officers/Authorised Representative(s)\nName"));
        rows.insert(fragment(10.0, 600.0, "Charge No."));
        rows.insert(fragment(10.0, 550.0, "Charge No. 2"));

        assert_eq!(rows.rows_containing("Charge No."), vec![RowKey::from(600.0)]);
        assert!(rows
            .rows_containing("Officers/Authorised Representative(s)")
            .is_empty());
        assert_eq!(
            rows.rows_containing_line("Officers/Authorised Representative(s)"),
            vec![RowKey::from(700.0)]
        );
    }

    #[test]
    fn test_resolve_prefers_present_candidate() {
        let mut rows = index();
        rows.insert(fragment(10.0, 64.0, "row"));
        let rule = OffsetRule::with_candidates(&[24.0, 36.0], 28.0);
        assert_eq!(rows.resolve(RowKey::from(100.0), &rule), RowKey::from(64.0));
        // nothing present: the default, even though no row is there
        assert_eq!(rows.resolve(RowKey::from(300.0), &rule), RowKey::from(272.0));
    }

    #[test]
    fn test_merge_keeps_every_fragment() {
        let mut page_one = index();
        page_one.insert(fragment(10.0, 500.0, "a"));
        let mut page_two = index();
        page_two.insert(fragment(10.0, 1500.0, "b"));
        page_two.insert(fragment(40.0, 1500.0, "c"));

        page_one.merge(page_two);
        assert_eq!(page_one.len(), 2);
        assert_eq!(page_one.fragment_count(), 3);
        let dump = page_one.dump();
        assert_eq!(dump[1].texts, vec!["b", "c"]);
    }
}
