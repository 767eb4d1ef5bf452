use super::continuation::PendingRecord;
use super::row_index::RowIndex;
use crate::config::{RowStage, TableSpec};
use crate::error::WalkStop;
use crate::normalize::Normalizer;
use crate::records::Record;
use crate::types::RowKey;
use std::mem;

/// Where a walk stands between two calls to `next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    /// Waiting to read `stage` of the current record from the row at `key`
    AwaitingRow { key: RowKey, stage: usize },
    ExtractingFields { key: RowKey, stage: usize },
    /// Every stage read; the next record starts at `next`
    RecordComplete { next: RowKey },
    /// Stopped mid-record; the partial record is waiting to be handed over
    AwaitingContinuation { key: RowKey, stage: usize },
    Done,
}

/// Walks a table row by row from its first data row, one record per pass
/// through the table's stages.
///
/// Each next row key is derived from the current one (not from the anchor)
/// with the stage's `advance` rule, which absorbs drift that accumulates down
/// the page. The walk is lazy and finite and cannot be restarted.
///
/// A table with no stages, or a pending record past the last stage, yields
/// nothing; `LayoutProfile::validate` rejects the former up front.
pub struct OffsetWalker<'a, R: Record> {
    rows: &'a RowIndex,
    table: &'a TableSpec,
    normalizer: &'a Normalizer,
    state: WalkState,
    record: R,
    /// The current record came out of a continuation slot
    resumed: bool,
    partial: Option<PendingRecord<R>>,
    last_stop: Option<WalkStop>,
}

impl<'a, R: Record> OffsetWalker<'a, R> {
    pub fn new(
        rows: &'a RowIndex,
        table: &'a TableSpec,
        normalizer: &'a Normalizer,
        start: RowKey,
    ) -> Self {
        Self {
            rows,
            table,
            normalizer,
            state: WalkState::AwaitingRow {
                key: start,
                stage: 0,
            },
            record: R::default(),
            resumed: false,
            partial: None,
            last_stop: None,
        }
    }

    /// Continue a parked record at its next stage, reading from `key`.
    pub fn resume(
        rows: &'a RowIndex,
        table: &'a TableSpec,
        normalizer: &'a Normalizer,
        key: RowKey,
        pending: PendingRecord<R>,
    ) -> Self {
        Self {
            rows,
            table,
            normalizer,
            state: WalkState::AwaitingRow {
                key,
                stage: pending.next_stage,
            },
            record: pending.record,
            resumed: true,
            partial: None,
            last_stop: None,
        }
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    /// Why the walk ended, once it has.
    pub fn stop_reason(&self) -> Option<&WalkStop> {
        self.last_stop.as_ref()
    }

    /// The record left unfinished when the walk stopped mid-record, if the
    /// table can carry it over to the next page.
    pub fn take_partial(&mut self) -> Option<PendingRecord<R>> {
        let partial = self.partial.take();
        if partial.is_some() {
            self.state = WalkState::Done;
        }
        partial
    }

    fn stage(&self, index: usize) -> &'a RowStage {
        &self.table.stages[index]
    }

    /// Read one row into the current record. Nothing is written unless the
    /// row has an accepted shape and every bound column exists.
    fn extract_row(&mut self, key: RowKey, stage: usize) -> Result<(), WalkStop> {
        let row = self
            .rows
            .lookup(key)
            .ok_or(WalkStop::MissingRow { key })?;
        let shape = self
            .stage(stage)
            .shape_for(row.len())
            .ok_or(WalkStop::StructuralMismatch {
                key,
                found: row.len(),
            })?;

        if let Some(&index) = shape.columns.values().find(|&&index| index >= row.len()) {
            return Err(WalkStop::FieldOutOfRange {
                key,
                index,
                len: row.len(),
            });
        }

        for (field, &index) in &shape.columns {
            self.normalizer.apply(&mut self.record, field, &row[index].text);
        }
        Ok(())
    }

    fn stop(&mut self, stop: WalkStop, key: RowKey, stage: usize) {
        tracing::debug!("{} walk stopped: {:?}", self.table.kind, stop);

        let out_of_range = matches!(stop, WalkStop::FieldOutOfRange { .. });
        let record = mem::take(&mut self.record);
        self.last_stop = Some(stop);

        // Stopping before the first stage of a fresh record is just the end of the table
        let keep = stage > 0 || self.resumed;
        let parkable = self.table.continues_across_pages() && (!out_of_range || self.resumed);

        if keep && parkable {
            self.partial = Some(PendingRecord {
                record,
                next_stage: stage,
                last_key: key,
            });
            self.state = WalkState::AwaitingContinuation { key, stage };
        } else {
            if keep {
                tracing::debug!(
                    "discarding unfinished {} record at {}",
                    self.table.kind,
                    key
                );
            }
            self.state = WalkState::Done;
        }
    }
}

impl<R: Record> Iterator for OffsetWalker<'_, R> {
    type Item = R;

    fn next(&mut self) -> Option<R> {
        loop {
            match self.state {
                WalkState::AwaitingRow { stage, .. } if stage >= self.table.stages.len() => {
                    self.state = WalkState::Done;
                }
                WalkState::AwaitingRow { key, stage } => {
                    if self.rows.contains(key) {
                        self.state = WalkState::ExtractingFields { key, stage };
                    } else {
                        self.stop(WalkStop::MissingRow { key }, key, stage);
                    }
                }
                WalkState::ExtractingFields { key, stage } => {
                    match self.extract_row(key, stage) {
                        Ok(()) => {
                            let next = self.rows.resolve(key, &self.stage(stage).advance);
                            self.state = if stage + 1 == self.table.stages.len() {
                                WalkState::RecordComplete { next }
                            } else {
                                WalkState::AwaitingRow {
                                    key: next,
                                    stage: stage + 1,
                                }
                            };
                        }
                        Err(stop) => self.stop(stop, key, stage),
                    }
                }
                WalkState::RecordComplete { next } => {
                    self.state = WalkState::AwaitingRow {
                        key: next,
                        stage: 0,
                    };
                    self.resumed = false;
                    return Some(mem::take(&mut self.record));
                }
                WalkState::AwaitingContinuation { .. } | WalkState::Done => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayoutProfile, RowShape};
    use crate::records::{ChargeRecord, ShareholderRecord};
    use crate::types::{KeyDelta, PositionedFragment, TableKind};
    use chrono::NaiveDate;

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

    fn table(kind: TableKind) -> TableSpec {
        LayoutProfile::default().table(kind).unwrap().clone()
    }

    #[test]
    fn test_single_charge_then_table_end() {
        let index = rows(&[
            (500.0, &["Charge No."]),
            (471.66, &["C001", "01/01/2020", "1000", "BankX"]),
        ]);
        let charges = table(TableKind::Charges);
        let normalizer = Normalizer::default();

        let mut walker: OffsetWalker<ChargeRecord> =
            OffsetWalker::new(&index, &charges, &normalizer, RowKey::from(471.66));
        let records: Vec<_> = walker.by_ref().collect();

        assert_eq!(
            records,
            vec![ChargeRecord {
                charge_no: Some("C001".to_string()),
                date_registered: NaiveDate::from_ymd_opt(2020, 1, 1),
                currency: None,
                amount_secured: Some("1000".to_string()),
                charge_org: Some("BankX".to_string()),
            }]
        );
        assert_eq!(
            walker.stop_reason(),
            Some(&WalkStop::MissingRow {
                key: RowKey::from(435.66)
            })
        );
        assert_eq!(walker.state(), WalkState::Done);
        assert!(walker.take_partial().is_none());
    }

    #[test]
    fn test_malformed_row_yields_nothing() {
        let index = rows(&[(500.0, &["Charge No."]), (471.66, &["C001"])]);
        let charges = table(TableKind::Charges);
        let normalizer = Normalizer::default();

        let mut walker: OffsetWalker<ChargeRecord> =
            OffsetWalker::new(&index, &charges, &normalizer, RowKey::from(471.66));
        assert!(walker.next().is_none());
        assert_eq!(
            walker.stop_reason(),
            Some(&WalkStop::StructuralMismatch {
                key: RowKey::from(471.66),
                found: 1
            })
        );
    }

    #[test]
    fn test_drifting_rows_followed_through_candidates() {
        // 471.66 -28-> 443.66 -48-> 395.66 -36-> 359.66
        let index = rows(&[
            (471.66, &["C001", "01/01/2020", "1000", "BankX"]),
            (443.66, &["C002", "02/01/2020", "2000", "BankY"]),
            (395.66, &["C003", "03/01/2020", "3000", "BankZ"]),
            (359.66, &["Page 1 of 2"]),
        ]);
        let charges = table(TableKind::Charges);
        let normalizer = Normalizer::default();

        let numbers: Vec<_> =
            OffsetWalker::<ChargeRecord>::new(&index, &charges, &normalizer, RowKey::from(471.66))
                .filter_map(|record| record.charge_no)
                .collect();
        assert_eq!(numbers, vec!["C001", "C002", "C003"]);
    }

    #[test]
    fn test_walk_is_deterministic() {
        let index = rows(&[
            (471.66, &["C001", "01/01/2020", "1000", "BankX"]),
            (435.66, &["C002", "02/01/2020", "2000", "BankY"]),
        ]);
        let charges = table(TableKind::Charges);
        let normalizer = Normalizer::default();
        let walk = || {
            OffsetWalker::<ChargeRecord>::new(&index, &charges, &normalizer, RowKey::from(471.66))
                .collect::<Vec<_>>()
        };
        let first = walk();
        assert_eq!(first.len(), 2);
        assert_eq!(first, walk());
    }

    #[test]
    fn test_out_of_range_column_discards_record() {
        let mut charges = table(TableKind::Charges);
        charges.stages[0].shapes = vec![RowShape::new(2, &[("charge_no", 0), ("charge_org", 3)])];
        let index = rows(&[(471.66, &["C001", "BankX"])]);
        let normalizer = Normalizer::default();

        let mut walker: OffsetWalker<ChargeRecord> =
            OffsetWalker::new(&index, &charges, &normalizer, RowKey::from(471.66));
        assert!(walker.next().is_none());
        assert_eq!(
            walker.stop_reason(),
            Some(&WalkStop::FieldOutOfRange {
                key: RowKey::from(471.66),
                index: 3,
                len: 2
            })
        );
        assert!(walker.take_partial().is_none());
    }

    #[test]
    fn test_table_without_stages_yields_nothing() {
        let mut charges = table(TableKind::Charges);
        charges.stages.clear();
        let index = rows(&[(471.66, &["C001", "01/01/2020", "1000", "BankX"])]);
        let normalizer = Normalizer::default();

        let mut walker: OffsetWalker<ChargeRecord> =
            OffsetWalker::new(&index, &charges, &normalizer, RowKey::from(471.66));
        assert!(walker.next().is_none());
        assert_eq!(walker.state(), WalkState::Done);
        assert!(walker.take_partial().is_none());
    }

    #[test]
    fn test_pending_past_last_stage_yields_nothing() {
        let shareholders = table(TableKind::Shareholders);
        let index = rows(&[(125.66, &["1,000", "SGD"])]);
        let normalizer = Normalizer::default();
        let pending = PendingRecord {
            record: ShareholderRecord::default(),
            next_stage: shareholders.stages.len(),
            last_key: RowKey::from(125.66),
        };

        let mut walker =
            OffsetWalker::resume(&index, &shareholders, &normalizer, RowKey::from(125.66), pending);
        assert!(walker.next().is_none());
        assert_eq!(walker.state(), WalkState::Done);
    }

    #[test]
    fn test_unfinished_shareholder_is_parked() {
        let index = rows(&[(
            125.66,
            &["1", "TAN AH KOW", "S1234567A", "SINGAPORE CITIZEN", "ACRA"],
        )]);
        let shareholders = table(TableKind::Shareholders);
        let normalizer = Normalizer::default();

        let mut walker: OffsetWalker<ShareholderRecord> =
            OffsetWalker::new(&index, &shareholders, &normalizer, RowKey::from(125.66));
        assert!(walker.next().is_none());
        assert!(matches!(
            walker.state(),
            WalkState::AwaitingContinuation { stage: 1, .. }
        ));

        let pending = walker.take_partial().unwrap();
        assert_eq!(pending.next_stage, 1);
        assert_eq!(pending.last_key, RowKey::from(88.66));
        assert_eq!(pending.record.name.as_deref(), Some("TAN AH KOW"));
        assert_eq!(pending.record.address, None);
        assert_eq!(walker.state(), WalkState::Done);
    }
}
