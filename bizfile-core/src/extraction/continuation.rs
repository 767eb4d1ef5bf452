use super::row_index::RowIndex;
use super::walker::OffsetWalker;
use crate::config::TableSpec;
use crate::normalize::Normalizer;
use crate::records::Record;
use crate::types::RowKey;

/// A record whose walk stopped before its last stage.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecord<R> {
    pub record: R,
    /// First stage still to be read
    pub next_stage: usize,
    /// Row the walk was waiting for when it stopped
    pub last_key: RowKey,
}

/// Outcome of trying to finish a pending record from a new set of rows.
pub enum Resumption<'a, R: Record> {
    /// Nothing was pending
    Idle,
    /// The record is finished; `walker` goes on with the rest of the table
    Completed {
        record: R,
        walker: OffsetWalker<'a, R>,
    },
    /// The rows did not finish it; it stays in the slot
    StillPending,
}

/// The single pending record a table kind may carry between pages.
#[derive(Debug, Clone)]
pub struct ContinuationSlot<R> {
    pending: Option<PendingRecord<R>>,
}

impl<R: Record> ContinuationSlot<R> {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Park a record. A record already parked is replaced and handed back so
    /// the caller decides what becomes of it.
    pub fn save(&mut self, partial: PendingRecord<R>) -> Option<PendingRecord<R>> {
        self.pending.replace(partial)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn peek(&self) -> Option<&PendingRecord<R>> {
        self.pending.as_ref()
    }

    pub fn take(&mut self) -> Option<PendingRecord<R>> {
        self.pending.take()
    }

    /// Try to finish the pending record from `rows`, reading its next stage
    /// at the table's resume offset below `start`.
    ///
    /// On failure the record, with whatever the new rows added, goes back
    /// into the slot.
    pub fn resume<'a>(
        &mut self,
        rows: &'a RowIndex,
        table: &'a TableSpec,
        normalizer: &'a Normalizer,
        start: RowKey,
    ) -> Resumption<'a, R> {
        let Some(continuation) = table.continuation.as_ref() else {
            return Resumption::Idle;
        };
        let Some(pending) = self.pending.take() else {
            return Resumption::Idle;
        };

        let key = rows.resolve(start, &continuation.resume);
        let mut walker = OffsetWalker::resume(rows, table, normalizer, key, pending);
        match walker.next() {
            Some(record) => {
                tracing::debug!("{} record completed from continuation at {}", table.kind, key);
                Resumption::Completed { record, walker }
            }
            None => {
                self.pending = walker.take_partial();
                Resumption::StillPending
            }
        }
    }
}

impl<R: Record> Default for ContinuationSlot<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutProfile;
    use crate::records::{OfficerRecord, ShareholderRecord};
    use crate::types::{KeyDelta, PositionedFragment, TableKind};

    fn rows(data: &[(f64, &[&str])]) -> RowIndex {
        let mut index = RowIndex::new(KeyDelta::from(4.0));
        for (y, texts) in data {
            for (column, text) in texts.iter().enumerate() {
                index.insert(PositionedFragment::new(
                    20.0 + 100.0 * column as f64,
                    *y,
                    10.0,
                    *text,
                ));
            }
        }
        index
    }

    fn pending_shareholder() -> PendingRecord<ShareholderRecord> {
        PendingRecord {
            record: ShareholderRecord {
                name: Some("TAN AH KOW".to_string()),
                shareholder_id: Some("S1234567A".to_string()),
                ..Default::default()
            },
            next_stage: 1,
            last_key: RowKey::from(88.66),
        }
    }

    #[test]
    fn test_save_replaces_and_returns_displaced() {
        let mut slot = ContinuationSlot::new();
        assert!(slot.save(pending_shareholder()).is_none());
        let mut second = pending_shareholder();
        second.record.name = Some("LIM".to_string());
        let displaced = slot.save(second).unwrap();
        assert_eq!(displaced.record.name.as_deref(), Some("TAN AH KOW"));
        assert_eq!(
            slot.peek().unwrap().record.name.as_deref(),
            Some("LIM")
        );
    }

    #[test]
    fn test_resume_completes_and_keeps_walking() {
        let profile = LayoutProfile::default();
        let table = profile.table(TableKind::Shareholders).unwrap();
        let normalizer = Normalizer::default();
        // start row holds the address; shares 81 below; next holder 24 below that
        let index = rows(&[
            (1925.66, &["1 RAFFLES PLACE SINGAPORE 048616"]),
            (1844.66, &["1,000", "SGD"]),
            (1820.66, &["2", "LIM", "S7654321B", "MALAYSIAN", "ACRA"]),
        ]);

        let mut slot = ContinuationSlot::new();
        slot.save(pending_shareholder());
        match slot.resume(&index, table, &normalizer, RowKey::from(1925.66)) {
            Resumption::Completed { record, mut walker } => {
                assert_eq!(
                    record.address.as_deref(),
                    Some("1 RAFFLES PLACE SINGAPORE 048616")
                );
                assert_eq!(record.ordinary_shares, Some(1000));
                assert_eq!(record.currency.as_deref(), Some("SGD"));
                assert!(walker.next().is_none());
                // the next holder has no address row yet
                let parked = walker.take_partial().unwrap();
                assert_eq!(parked.record.name.as_deref(), Some("LIM"));
            }
            _ => panic!("expected the pending record to complete"),
        }
        assert!(!slot.is_pending());
    }

    #[test]
    fn test_resume_failure_keeps_record_pending() {
        let profile = LayoutProfile::default();
        let table = profile.table(TableKind::Shareholders).unwrap();
        let normalizer = Normalizer::default();
        let index = rows(&[(1925.66, &["too", "many", "columns"])]);

        let mut slot = ContinuationSlot::new();
        slot.save(pending_shareholder());
        assert!(matches!(
            slot.resume(&index, table, &normalizer, RowKey::from(1925.66)),
            Resumption::StillPending
        ));
        assert_eq!(slot.peek().unwrap().next_stage, 1);
    }

    #[test]
    fn test_empty_slot_is_idle() {
        let profile = LayoutProfile::default();
        let table = profile.table(TableKind::Officers).unwrap();
        let normalizer = Normalizer::default();
        let index = rows(&[]);
        let mut slot: ContinuationSlot<OfficerRecord> = ContinuationSlot::new();
        assert!(matches!(
            slot.resume(&index, table, &normalizer, RowKey::from(1900.0)),
            Resumption::Idle
        ));
    }
}
