use crate::records::{
    CapitalRecord, ChargeRecord, CompanyRecord, OfficerRecord, ShareholderRecord,
    ShareholderTypeRecord,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The schema version stamped on every extraction result.
/// Bump this when the output shape changes.
pub const SCHEMA_VERSION: &str = "0.1.0";

// ===== GEOMETRY =====
// Vertical positions are carried as fixed-point hundredths so that row keys
// and offsets compare and hash exactly. Upstream geometry arrives as floats
// and is rounded once, at the boundary.

fn to_hundredths(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

/// Normalized vertical position of a row, in hundredths of a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct RowKey(i64);

impl RowKey {
    pub fn from_hundredths(hundredths: i64) -> Self {
        Self(hundredths)
    }

    pub fn hundredths(self) -> i64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Key of the row `delta` below this one. Saturates at the ends of the key range.
    pub fn below(self, delta: KeyDelta) -> Self {
        Self(self.0.saturating_sub(delta.0))
    }

    /// Key of the row `delta` above this one.
    pub fn above(self, delta: KeyDelta) -> Self {
        Self(self.0.saturating_add(delta.0))
    }

    /// Absolute distance between two keys.
    pub fn distance(self, other: RowKey) -> KeyDelta {
        KeyDelta(self.0.abs_diff(other.0).min(i64::MAX as u64) as i64)
    }
}

impl From<f64> for RowKey {
    fn from(value: f64) -> Self {
        Self(to_hundredths(value))
    }
}

impl From<RowKey> for f64 {
    fn from(key: RowKey) -> Self {
        key.as_f64()
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.as_f64())
    }
}

/// Vertical offset between two rows, in hundredths of a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct KeyDelta(i64);

impl KeyDelta {
    pub const ZERO: KeyDelta = KeyDelta(0);

    pub fn from_hundredths(hundredths: i64) -> Self {
        Self(hundredths)
    }

    pub fn hundredths(self) -> i64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl From<f64> for KeyDelta {
    fn from(value: f64) -> Self {
        Self(to_hundredths(value))
    }
}

impl From<KeyDelta> for f64 {
    fn from(delta: KeyDelta) -> Self {
        delta.as_f64()
    }
}

impl fmt::Display for KeyDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.as_f64())
    }
}

// ===== FRAGMENTS =====

/// A horizontally oriented text region as reported by a layout engine,
/// in the coordinates of its own page (y grows upward, measured at the top edge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRegion {
    pub x: f64,
    pub y: f64,
    pub height: f64,
    pub text: String,
}

/// A text fragment placed in the document-wide vertical coordinate space.
///
/// `y` is `page_index * page_stride + in_page_y`, rounded to two decimals.
/// Produced once by the fragment stream and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedFragment {
    pub x: f64,
    pub y: f64,
    pub height: f64,
    pub text: String,
}

impl PositionedFragment {
    pub fn new(x: f64, y: f64, height: f64, text: impl Into<String>) -> Self {
        Self {
            x,
            y,
            height,
            text: text.into(),
        }
    }

    pub fn key(&self) -> RowKey {
        RowKey::from(self.y)
    }

    /// True when the whole fragment, or one of its lines, equals `token`.
    pub fn has_line(&self, token: &str) -> bool {
        self.text == token || self.text.lines().any(|line| line.trim() == token)
    }
}

/// All fragments of one page, already normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFragments {
    pub page_index: usize,
    pub fragments: Vec<PositionedFragment>,
}

// ===== TABLE KINDS & FIELD SCHEMA =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Charges,
    Capital,
    PaidUpCapital,
    Shareholders,
    ShareholderTypes,
    Officers,
}

impl TableKind {
    pub const ALL: [TableKind; 6] = [
        TableKind::Charges,
        TableKind::Capital,
        TableKind::PaidUpCapital,
        TableKind::Shareholders,
        TableKind::ShareholderTypes,
        TableKind::Officers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Charges => "charges",
            TableKind::Capital => "capital",
            TableKind::PaidUpCapital => "paid_up_capital",
            TableKind::Shareholders => "shareholders",
            TableKind::ShareholderTypes => "shareholder_types",
            TableKind::Officers => "officers",
        }
    }

    /// Whether records of this kind may be carried across a page boundary.
    /// Charges and both capital tables always close within one anchor occurrence.
    pub fn supports_continuation(&self) -> bool {
        matches!(
            self,
            TableKind::Shareholders | TableKind::ShareholderTypes | TableKind::Officers
        )
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Date,
    Number,
}

/// One named, typed slot of a record schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
        }
    }

    pub const fn date(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Date,
        }
    }

    pub const fn number(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Number,
        }
    }
}

/// A normalized field value ready to be stored in a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Number(u64),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Date(date) => Some(date.to_string()),
            FieldValue::Number(number) => Some(number.to_string()),
            FieldValue::Null => None,
        }
    }

    pub fn into_date(self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(date) => Some(date),
            _ => None,
        }
    }

    pub fn into_number(self) -> Option<u64> {
        match self {
            FieldValue::Number(number) => Some(number),
            _ => None,
        }
    }
}

// ===== OUTPUT =====

/// Everything recovered from one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub schema_version: String,
    pub document_id: Uuid,
    pub profile: String,
    pub extracted_at: DateTime<Utc>,
    pub page_count: usize,
    pub company: CompanyRecord,
    pub charges: Vec<ChargeRecord>,
    pub capital: Vec<CapitalRecord>,
    pub paid_up_capital: Vec<CapitalRecord>,
    pub shareholders: Vec<ShareholderRecord>,
    pub shareholder_types: Vec<ShareholderTypeRecord>,
    pub officers: Vec<OfficerRecord>,
    /// Records that never found their continuation and were emitted as they stood
    pub unfinished_records: usize,
}

impl ExtractionResult {
    pub fn record_count(&self, kind: TableKind) -> usize {
        match kind {
            TableKind::Charges => self.charges.len(),
            TableKind::Capital => self.capital.len(),
            TableKind::PaidUpCapital => self.paid_up_capital.len(),
            TableKind::Shareholders => self.shareholders.len(),
            TableKind::ShareholderTypes => self.shareholder_types.len(),
            TableKind::Officers => self.officers.len(),
        }
    }
}

/// One row of the document row map, flattened for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowDump {
    pub key: RowKey,
    pub texts: Vec<String>,
}
