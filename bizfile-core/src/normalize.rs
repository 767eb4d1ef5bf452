use crate::records::Record;
use crate::types::{FieldKind, FieldValue};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

// Plain digits, or digits grouped in thousands with commas
static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3}(,\d{3})+|\d+)$").unwrap());

/// Turns raw fragment text into typed field values.
///
/// Parse failures never raise: the field becomes null and the record is
/// still emitted.
#[derive(Debug, Clone)]
pub struct Normalizer {
    date_format: String,
}

impl Normalizer {
    pub fn new(date_format: impl Into<String>) -> Self {
        Self {
            date_format: date_format.into(),
        }
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    pub fn normalize(&self, raw: &str, kind: FieldKind) -> FieldValue {
        let Some(text) = clean_text(raw) else {
            return FieldValue::Null;
        };
        match kind {
            FieldKind::Text => FieldValue::Text(text),
            FieldKind::Date => parse_date(&text, &self.date_format)
                .map(FieldValue::Date)
                .unwrap_or(FieldValue::Null),
            FieldKind::Number => parse_number(&text)
                .map(FieldValue::Number)
                .unwrap_or(FieldValue::Null),
        }
    }

    /// Normalize `raw` according to the schema of `R` and store it.
    /// Returns false when `field` is not part of the schema.
    pub fn apply<R: Record>(&self, record: &mut R, field: &str, raw: &str) -> bool {
        match R::field_kind(field) {
            Some(kind) => record.set(field, self.normalize(raw, kind)),
            None => false,
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new("%d/%m/%Y")
    }
}

/// Trim whitespace and a literal colon separator at either end.
pub fn clean_text(raw: &str) -> Option<String> {
    let text = raw
        .trim()
        .trim_start_matches(':')
        .trim_end_matches(':')
        .trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

pub fn parse_date(text: &str, format: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(text, format) {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::debug!("date '{}' does not match '{}': {}", text, format, e);
            None
        }
    }
}

pub fn parse_number(text: &str) -> Option<u64> {
    if !NUMBER_PATTERN.is_match(text) {
        tracing::debug!("'{}' is not a number", text);
        return None;
    }
    text.replace(',', "").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ChargeRecord, ShareholderRecord};

    #[test]
    fn test_clean_text_strips_separators() {
        assert_eq!(clean_text("  BankX : "), Some("BankX".to_string()));
        assert_eq!(clean_text(": 201912345A"), Some("201912345A".to_string()));
        assert_eq!(clean_text(" : "), None);
        assert_eq!(clean_text(""), None);
        // inner colons are content
        assert_eq!(clean_text("10:30 AM"), Some("10:30 AM".to_string()));
    }

    #[test]
    fn test_date_parsing() {
        let normalizer = Normalizer::default();
        assert_eq!(
            normalizer.normalize("01/01/2020", FieldKind::Date),
            FieldValue::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
        );
        assert_eq!(normalizer.normalize("2020-01-01", FieldKind::Date), FieldValue::Null);
        assert_eq!(normalizer.normalize("31/02/2020", FieldKind::Date), FieldValue::Null);
    }

    #[test]
    fn test_number_parsing() {
        assert_eq!(parse_number("1000"), Some(1000));
        assert_eq!(parse_number("1,000,000"), Some(1_000_000));
        assert_eq!(parse_number("1,00"), None);
        assert_eq!(parse_number("12.5"), None);
        assert_eq!(parse_number("ORDINARY"), None);
    }

    #[test]
    fn test_apply_uses_record_schema() {
        let normalizer = Normalizer::default();
        let mut charge = ChargeRecord::default();
        assert!(normalizer.apply(&mut charge, "date_registered", "15/06/2018"));
        assert!(normalizer.apply(&mut charge, "charge_no", "C001:"));
        assert!(!normalizer.apply(&mut charge, "chargee", "BankX"));
        assert_eq!(charge.date_registered, NaiveDate::from_ymd_opt(2018, 6, 15));
        assert_eq!(charge.charge_no.as_deref(), Some("C001"));

        let mut holder = ShareholderRecord::default();
        assert!(normalizer.apply(&mut holder, "ordinary_shares", "not a number"));
        assert_eq!(holder.ordinary_shares, None);
    }
}
