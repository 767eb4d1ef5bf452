//! Typed record schemas
//!
//! Every table kind has a fixed struct with named, nullable fields. Layout
//! profiles refer to fields by name; those names are checked against the
//! static `FIELDS` schema when a profile is validated, so a misspelt column
//! binding is a configuration error instead of a silent miss at runtime.

use crate::types::{FieldKind, FieldSpec, FieldValue, TableKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// A record with a static field schema.
pub trait Record: Default + Clone + Debug {
    const FIELDS: &'static [FieldSpec];

    /// Store a normalized value. Returns false when `field` is not part of the schema.
    fn set(&mut self, field: &str, value: FieldValue) -> bool;

    fn field_kind(field: &str) -> Option<FieldKind> {
        Self::FIELDS
            .iter()
            .find(|spec| spec.name == field)
            .map(|spec| spec.kind)
    }
}

/// Records that come out of repeating tables. Structural equality is what
/// deduplication runs on.
pub trait TableRecord: Record + Eq + Hash + Serialize {}

/// Field schema for the records of a table kind.
pub fn table_fields(kind: TableKind) -> &'static [FieldSpec] {
    match kind {
        TableKind::Charges => ChargeRecord::FIELDS,
        TableKind::Capital | TableKind::PaidUpCapital => CapitalRecord::FIELDS,
        TableKind::Shareholders => ShareholderRecord::FIELDS,
        TableKind::ShareholderTypes => ShareholderTypeRecord::FIELDS,
        TableKind::Officers => OfficerRecord::FIELDS,
    }
}

// ===== CHARGES =====

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChargeRecord {
    pub charge_no: Option<String>,
    pub date_registered: Option<NaiveDate>,
    pub currency: Option<String>,
    pub amount_secured: Option<String>,
    pub charge_org: Option<String>,
}

impl Record for ChargeRecord {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("charge_no"),
        FieldSpec::date("date_registered"),
        FieldSpec::text("currency"),
        FieldSpec::text("amount_secured"),
        FieldSpec::text("charge_org"),
    ];

    fn set(&mut self, field: &str, value: FieldValue) -> bool {
        match field {
            "charge_no" => self.charge_no = value.into_text(),
            "date_registered" => self.date_registered = value.into_date(),
            "currency" => self.currency = value.into_text(),
            "amount_secured" => self.amount_secured = value.into_text(),
            "charge_org" => self.charge_org = value.into_text(),
            _ => return false,
        }
        true
    }
}

impl TableRecord for ChargeRecord {}

// ===== CAPITAL (issued and paid-up) =====

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapitalRecord {
    pub amount: Option<String>,
    pub shares: Option<u64>,
    pub currency: Option<String>,
    pub share_type: Option<String>,
}

impl Record for CapitalRecord {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("amount"),
        FieldSpec::number("shares"),
        FieldSpec::text("currency"),
        FieldSpec::text("share_type"),
    ];

    fn set(&mut self, field: &str, value: FieldValue) -> bool {
        match field {
            "amount" => self.amount = value.into_text(),
            "shares" => self.shares = value.into_number(),
            "currency" => self.currency = value.into_text(),
            "share_type" => self.share_type = value.into_text(),
            _ => return false,
        }
        true
    }
}

impl TableRecord for CapitalRecord {}

// ===== SHAREHOLDERS =====

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShareholderRecord {
    pub name: Option<String>,
    pub shareholder_id: Option<String>,
    pub nationality: Option<String>,
    pub source_of_address: Option<String>,
    pub address: Option<String>,
    pub address_changed: Option<NaiveDate>,
    pub ordinary_shares: Option<u64>,
    pub currency: Option<String>,
}

impl Record for ShareholderRecord {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("name"),
        FieldSpec::text("shareholder_id"),
        FieldSpec::text("nationality"),
        FieldSpec::text("source_of_address"),
        FieldSpec::text("address"),
        FieldSpec::date("address_changed"),
        FieldSpec::number("ordinary_shares"),
        FieldSpec::text("currency"),
    ];

    fn set(&mut self, field: &str, value: FieldValue) -> bool {
        match field {
            "name" => self.name = value.into_text(),
            "shareholder_id" => self.shareholder_id = value.into_text(),
            "nationality" => self.nationality = value.into_text(),
            "source_of_address" => self.source_of_address = value.into_text(),
            "address" => self.address = value.into_text(),
            "address_changed" => self.address_changed = value.into_date(),
            "ordinary_shares" => self.ordinary_shares = value.into_number(),
            "currency" => self.currency = value.into_text(),
            _ => return false,
        }
        true
    }
}

impl TableRecord for ShareholderRecord {}

// ===== SHAREHOLDER TYPES =====

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShareholderTypeRecord {
    pub name: Option<String>,
    pub shareholder_type: Option<String>,
    pub number_of_shares: Option<u64>,
    pub share_type: Option<String>,
}

impl Record for ShareholderTypeRecord {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("name"),
        FieldSpec::text("shareholder_type"),
        FieldSpec::number("number_of_shares"),
        FieldSpec::text("share_type"),
    ];

    fn set(&mut self, field: &str, value: FieldValue) -> bool {
        match field {
            "name" => self.name = value.into_text(),
            "shareholder_type" => self.shareholder_type = value.into_text(),
            "number_of_shares" => self.number_of_shares = value.into_number(),
            "share_type" => self.share_type = value.into_text(),
            _ => return false,
        }
        true
    }
}

impl TableRecord for ShareholderTypeRecord {}

// ===== OFFICERS =====

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfficerRecord {
    pub name: Option<String>,
    pub officer_id: Option<String>,
    pub nationality: Option<String>,
    pub source_of_address: Option<String>,
    pub date_of_appointment: Option<NaiveDate>,
    pub address: Option<String>,
    pub position_held: Option<String>,
}

impl Record for OfficerRecord {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("name"),
        FieldSpec::text("officer_id"),
        FieldSpec::text("nationality"),
        FieldSpec::text("source_of_address"),
        FieldSpec::date("date_of_appointment"),
        FieldSpec::text("address"),
        FieldSpec::text("position_held"),
    ];

    fn set(&mut self, field: &str, value: FieldValue) -> bool {
        match field {
            "name" => self.name = value.into_text(),
            "officer_id" => self.officer_id = value.into_text(),
            "nationality" => self.nationality = value.into_text(),
            "source_of_address" => self.source_of_address = value.into_text(),
            "date_of_appointment" => self.date_of_appointment = value.into_date(),
            "address" => self.address = value.into_text(),
            "position_held" => self.position_held = value.into_text(),
            _ => return false,
        }
        true
    }
}

impl TableRecord for OfficerRecord {}

// ===== COMPANY =====

/// Single per-document record. Fields are overwritten in place whenever
/// their label is found again (last writer wins).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub registration_no: Option<String>,
    pub company_name: Option<String>,
    pub former_name: Option<String>,
    pub incorp_date: Option<NaiveDate>,
    pub company_type: Option<String>,
    pub status: Option<String>,
    pub status_date: Option<NaiveDate>,
    pub activities_1: Option<String>,
    pub activities_description: Option<String>,
    pub activities_2: Option<String>,
    pub registered_office_address: Option<String>,
    pub date_of_address: Option<NaiveDate>,
    pub date_of_last_agm: Option<NaiveDate>,
    pub date_of_last_ar: Option<NaiveDate>,
    pub date_of_ac_at_last: Option<NaiveDate>,
    pub date_of_lodgment_of_ar: Option<NaiveDate>,
    pub receipt_no: Option<String>,
    pub audit_firm_name: Option<String>,
}

impl Record for CompanyRecord {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("registration_no"),
        FieldSpec::text("company_name"),
        FieldSpec::text("former_name"),
        FieldSpec::date("incorp_date"),
        FieldSpec::text("company_type"),
        FieldSpec::text("status"),
        FieldSpec::date("status_date"),
        FieldSpec::text("activities_1"),
        FieldSpec::text("activities_description"),
        FieldSpec::text("activities_2"),
        FieldSpec::text("registered_office_address"),
        FieldSpec::date("date_of_address"),
        FieldSpec::date("date_of_last_agm"),
        FieldSpec::date("date_of_last_ar"),
        FieldSpec::date("date_of_ac_at_last"),
        FieldSpec::date("date_of_lodgment_of_ar"),
        FieldSpec::text("receipt_no"),
        FieldSpec::text("audit_firm_name"),
    ];

    fn set(&mut self, field: &str, value: FieldValue) -> bool {
        match field {
            "registration_no" => self.registration_no = value.into_text(),
            "company_name" => self.company_name = value.into_text(),
            "former_name" => self.former_name = value.into_text(),
            "incorp_date" => self.incorp_date = value.into_date(),
            "company_type" => self.company_type = value.into_text(),
            "status" => self.status = value.into_text(),
            "status_date" => self.status_date = value.into_date(),
            "activities_1" => self.activities_1 = value.into_text(),
            "activities_description" => self.activities_description = value.into_text(),
            "activities_2" => self.activities_2 = value.into_text(),
            "registered_office_address" => self.registered_office_address = value.into_text(),
            "date_of_address" => self.date_of_address = value.into_date(),
            "date_of_last_agm" => self.date_of_last_agm = value.into_date(),
            "date_of_last_ar" => self.date_of_last_ar = value.into_date(),
            "date_of_ac_at_last" => self.date_of_ac_at_last = value.into_date(),
            "date_of_lodgment_of_ar" => self.date_of_lodgment_of_ar = value.into_date(),
            "receipt_no" => self.receipt_no = value.into_text(),
            "audit_firm_name" => self.audit_firm_name = value.into_text(),
            _ => return false,
        }
        true
    }
}
