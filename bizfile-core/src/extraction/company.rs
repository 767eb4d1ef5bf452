use super::row_index::RowIndex;
use crate::config::CompanyFieldSpec;
use crate::normalize::Normalizer;
use crate::records::CompanyRecord;

const SEPARATOR: &str = ":";

/// Fill company attributes from label/value rows, top of page first.
///
/// A row carries at most one attribute: the first configured label found in
/// it. Its value is the first other fragment that is not a bare separator; a
/// row holding only the label clears the field. Later rows overwrite earlier
/// ones. Returns the number of rows that matched a label.
pub fn extract_company_fields(
    rows: &RowIndex,
    specs: &[CompanyFieldSpec],
    normalizer: &Normalizer,
    company: &mut CompanyRecord,
) -> usize {
    let mut matched = 0;
    for (_, row) in rows.iter_top_down() {
        let Some((spec, label_at)) = specs.iter().find_map(|spec| {
            row.iter()
                .position(|fragment| fragment.text == spec.label)
                .map(|position| (spec, position))
        }) else {
            continue;
        };

        let value = row
            .iter()
            .enumerate()
            .filter(|(position, fragment)| *position != label_at && fragment.text != SEPARATOR)
            .map(|(_, fragment)| fragment.text.as_str())
            .next()
            .unwrap_or("");

        normalizer.apply(company, &spec.field, value);
        matched += 1;
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutProfile;
    use crate::types::{KeyDelta, PositionedFragment};
    use chrono::NaiveDate;

    fn rows(data: &[(f64, &[&str])]) -> RowIndex {
        let mut index = RowIndex::new(KeyDelta::from(4.0));
        for (y, texts) in data {
            for (column, text) in texts.iter().enumerate() {
                index.insert(PositionedFragment::new(
                    20.0 + 150.0 * column as f64,
                    *y,
                    10.0,
                    *text,
                ));
            }
        }
        index
    }

    #[test]
    fn test_label_value_rows() {
        let index = rows(&[
            (760.0, &["Registration No.", ":", "201912345A"]),
            (740.0, &["Company Name.", ":", "ACME PTE. LTD."]),
            (720.0, &["Incorporation Date.", ":", "05/03/2019"]),
            (700.0, &["Status", "Live Company"]),
            (680.0, &["Unrelated", "text"]),
        ]);
        let profile = LayoutProfile::default();
        let mut company = CompanyRecord::default();

        let matched = extract_company_fields(
            &index,
            &profile.company_fields,
            &Normalizer::default(),
            &mut company,
        );
        assert_eq!(matched, 4);
        assert_eq!(company.registration_no.as_deref(), Some("201912345A"));
        assert_eq!(company.company_name.as_deref(), Some("ACME PTE. LTD."));
        assert_eq!(company.incorp_date, NaiveDate::from_ymd_opt(2019, 3, 5));
        assert_eq!(company.status.as_deref(), Some("Live Company"));
    }

    #[test]
    fn test_value_left_of_label() {
        let index = rows(&[(700.0, &["LIVE", "Status"])]);
        let profile = LayoutProfile::default();
        let mut company = CompanyRecord::default();
        extract_company_fields(&index, &profile.company_fields, &Normalizer::default(), &mut company);
        assert_eq!(company.status.as_deref(), Some("LIVE"));
    }

    #[test]
    fn test_last_writer_wins() {
        let profile = LayoutProfile::default();
        let normalizer = Normalizer::default();
        let mut company = CompanyRecord::default();

        // higher rows are read first, so the lower row overwrites
        let page = rows(&[
            (760.0, &["Company Name.", "OLD NAME PTE. LTD."]),
            (500.0, &["Company Name.", "NEW NAME PTE. LTD."]),
        ]);
        extract_company_fields(&page, &profile.company_fields, &normalizer, &mut company);
        assert_eq!(company.company_name.as_deref(), Some("NEW NAME PTE. LTD."));

        let next_page = rows(&[(1760.0, &["Description"])]);
        company.activities_description = Some("stale".to_string());
        extract_company_fields(&next_page, &profile.company_fields, &normalizer, &mut company);
        assert_eq!(company.activities_description, None);
        assert_eq!(company.company_name.as_deref(), Some("NEW NAME PTE. LTD."));
    }
}
