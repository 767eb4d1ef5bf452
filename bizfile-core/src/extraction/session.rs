use super::anchors::locate;
use super::company::extract_company_fields;
use super::continuation::{ContinuationSlot, PendingRecord, Resumption};
use super::dedupe::dedupe;
use super::row_index::RowIndex;
use super::walker::OffsetWalker;
use crate::config::{LayoutProfile, TableSpec, UnfinishedRecordPolicy};
use crate::error::ProfileError;
use crate::normalize::Normalizer;
use crate::records::{
    CapitalRecord, ChargeRecord, CompanyRecord, OfficerRecord, ShareholderRecord,
    ShareholderTypeRecord, TableRecord,
};
use crate::types::{ExtractionResult, PageFragments, TableKind, SCHEMA_VERSION};
use chrono::Utc;
use uuid::Uuid;

/// Records of one table kind collected so far, plus its continuation slot.
#[derive(Debug)]
struct TableState<R> {
    records: Vec<R>,
    slot: ContinuationSlot<R>,
    unfinished: usize,
}

impl<R: TableRecord> TableState<R> {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            slot: ContinuationSlot::new(),
            unfinished: 0,
        }
    }

    /// Walk every occurrence of the table on a page. A record parked by an
    /// earlier page gets the first chance at each occurrence's opening rows.
    fn extract(
        &mut self,
        rows: &RowIndex,
        table: &TableSpec,
        normalizer: &Normalizer,
        policy: UnfinishedRecordPolicy,
    ) -> usize {
        let before = self.records.len();
        for anchor in locate(rows, &table.anchor) {
            let start = anchor.first_data_row;
            let mut walker = match self.slot.resume(rows, table, normalizer, start) {
                Resumption::Completed { record, walker } => {
                    self.records.push(record);
                    walker
                }
                Resumption::Idle | Resumption::StillPending => {
                    OffsetWalker::new(rows, table, normalizer, start)
                }
            };

            self.records.extend(walker.by_ref());

            if let Some(partial) = walker.take_partial() {
                tracing::debug!(
                    "{} record parked at {} (stage {})",
                    table.kind,
                    partial.last_key,
                    partial.next_stage
                );
                if let Some(displaced) = self.slot.save(partial) {
                    tracing::warn!("{} pending record displaced by a newer one", table.kind);
                    self.settle(table.kind, displaced, policy);
                }
            }
        }
        self.records.len() - before
    }

    fn settle(&mut self, kind: TableKind, pending: PendingRecord<R>, policy: UnfinishedRecordPolicy) {
        match policy {
            UnfinishedRecordPolicy::Emit => {
                self.records.push(pending.record);
                self.unfinished += 1;
            }
            UnfinishedRecordPolicy::Drop => {
                tracing::warn!(
                    "dropping unfinished {} record (stopped at {})",
                    kind,
                    pending.last_key
                );
            }
        }
    }

    fn finish(mut self, kind: TableKind, policy: UnfinishedRecordPolicy, dedupe_records: bool) -> (Vec<R>, usize) {
        if let Some(pending) = self.slot.take() {
            tracing::debug!("{} record never found its continuation", kind);
            self.settle(kind, pending, policy);
        }
        let records = if dedupe_records {
            dedupe(self.records)
        } else {
            self.records
        };
        (records, self.unfinished)
    }
}

/// Per-document extraction state. Pages must be fed in order: a record left
/// unfinished at the bottom of one page is completed from the next.
pub struct ExtractionSession<'p> {
    profile: &'p LayoutProfile,
    normalizer: Normalizer,
    document_rows: RowIndex,
    page_count: usize,
    company: CompanyRecord,
    charges: TableState<ChargeRecord>,
    capital: TableState<CapitalRecord>,
    paid_up_capital: TableState<CapitalRecord>,
    shareholders: TableState<ShareholderRecord>,
    shareholder_types: TableState<ShareholderTypeRecord>,
    officers: TableState<OfficerRecord>,
}

impl<'p> ExtractionSession<'p> {
    pub fn new(profile: &'p LayoutProfile) -> Result<Self, ProfileError> {
        profile.validate()?;
        Ok(Self {
            profile,
            normalizer: Normalizer::new(profile.date_format.clone()),
            document_rows: RowIndex::new(profile.row_tolerance),
            page_count: 0,
            company: CompanyRecord::default(),
            charges: TableState::new(),
            capital: TableState::new(),
            paid_up_capital: TableState::new(),
            shareholders: TableState::new(),
            shareholder_types: TableState::new(),
            officers: TableState::new(),
        })
    }

    pub fn profile(&self) -> &LayoutProfile {
        self.profile
    }

    pub fn process_page(&mut self, page: PageFragments) {
        let rows = RowIndex::from_fragments(self.profile.row_tolerance, page.fragments);
        let policy = self.profile.unfinished_records;

        let labels = extract_company_fields(
            &rows,
            &self.profile.company_fields,
            &self.normalizer,
            &mut self.company,
        );

        let mut found = 0;
        for table in &self.profile.tables {
            let normalizer = &self.normalizer;
            found += match table.kind {
                TableKind::Charges => self.charges.extract(&rows, table, normalizer, policy),
                TableKind::Capital => self.capital.extract(&rows, table, normalizer, policy),
                TableKind::PaidUpCapital => {
                    self.paid_up_capital.extract(&rows, table, normalizer, policy)
                }
                TableKind::Shareholders => {
                    self.shareholders.extract(&rows, table, normalizer, policy)
                }
                TableKind::ShareholderTypes => {
                    self.shareholder_types.extract(&rows, table, normalizer, policy)
                }
                TableKind::Officers => self.officers.extract(&rows, table, normalizer, policy),
            };
        }

        tracing::info!(
            "page {}: {} rows, {} company labels, {} table records",
            page.page_index,
            rows.len(),
            labels,
            found
        );

        self.document_rows.merge(rows);
        self.page_count += 1;
    }

    /// Rows of every page processed so far.
    pub fn rows(&self) -> &RowIndex {
        &self.document_rows
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn has_pending(&self, kind: TableKind) -> bool {
        match kind {
            TableKind::Charges => self.charges.slot.is_pending(),
            TableKind::Capital => self.capital.slot.is_pending(),
            TableKind::PaidUpCapital => self.paid_up_capital.slot.is_pending(),
            TableKind::Shareholders => self.shareholders.slot.is_pending(),
            TableKind::ShareholderTypes => self.shareholder_types.slot.is_pending(),
            TableKind::Officers => self.officers.slot.is_pending(),
        }
    }

    /// Settle pending records, deduplicate and hand over the result.
    pub fn finish(self) -> ExtractionResult {
        let policy = self.profile.unfinished_records;
        let dedupe_records = self.profile.dedupe;

        let (charges, a) = self.charges.finish(TableKind::Charges, policy, dedupe_records);
        let (capital, b) = self.capital.finish(TableKind::Capital, policy, dedupe_records);
        let (paid_up_capital, c) =
            self.paid_up_capital
                .finish(TableKind::PaidUpCapital, policy, dedupe_records);
        let (shareholders, d) =
            self.shareholders
                .finish(TableKind::Shareholders, policy, dedupe_records);
        let (shareholder_types, e) =
            self.shareholder_types
                .finish(TableKind::ShareholderTypes, policy, dedupe_records);
        let (officers, f) = self.officers.finish(TableKind::Officers, policy, dedupe_records);

        ExtractionResult {
            schema_version: SCHEMA_VERSION.to_string(),
            document_id: Uuid::new_v4(),
            profile: self.profile.name.clone(),
            extracted_at: Utc::now(),
            page_count: self.page_count,
            company: self.company,
            charges,
            capital,
            paid_up_capital,
            shareholders,
            shareholder_types,
            officers,
            unfinished_records: a + b + c + d + e + f,
        }
    }
}
