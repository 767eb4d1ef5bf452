use crate::types::*;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Record counts and company identity, without the records themselves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub format: String,
    pub document_id: Uuid,
    pub profile: String,
    pub page_count: usize,
    pub registration_no: Option<String>,
    pub company_name: Option<String>,
    pub records: BTreeMap<String, usize>,
    pub unfinished_records: usize,
}

impl ExtractionResult {
    pub fn to_summary_format(&self) -> ExtractionSummary {
        let records = TableKind::ALL
            .iter()
            .map(|kind| (kind.as_str().to_string(), self.record_count(*kind)))
            .collect();

        ExtractionSummary {
            format: "summary".to_string(),
            document_id: self.document_id,
            profile: self.profile.clone(),
            page_count: self.page_count,
            registration_no: self.company.registration_no.clone(),
            company_name: self.company.company_name.clone(),
            records,
            unfinished_records: self.unfinished_records,
        }
    }

    pub fn to_json(&self, format: &str) -> Result<String> {
        let json = match format {
            "summary" => serde_json::to_string_pretty(&self.to_summary_format())?,
            _ => serde_json::to_string_pretty(self)?,
        };
        Ok(json)
    }

    pub fn save_with_format(&self, path: &str, format: &str) -> Result<()> {
        std::fs::write(path, self.to_json(format)?)?;
        Ok(())
    }
}
