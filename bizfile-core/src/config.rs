use crate::error::ProfileError;
use crate::records::{table_fields, CompanyRecord, Record};
use crate::types::{KeyDelta, TableKind};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;

/// Name of the profile used when none is requested.
pub const DEFAULT_PROFILE: &str = "bizfile";

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_page_stride() -> f64 {
    1000.0
}

fn default_row_tolerance() -> KeyDelta {
    KeyDelta::from(4.0)
}

fn default_date_format() -> String {
    "%d/%m/%Y".to_string()
}

/// Declarative description of one document layout variant.
///
/// Every offset and row shape the extractor relies on lives here, so a new
/// document revision is a new profile rather than new code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutProfile {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Vertical distance reserved per page in the document-wide coordinate space
    #[serde(default = "default_page_stride")]
    pub page_stride: f64,
    /// Fragments whose keys differ by at most this much share a row
    #[serde(default = "default_row_tolerance")]
    pub row_tolerance: KeyDelta,
    /// chrono format string for date-valued fields
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// What happens to records still waiting for a continuation at document end
    #[serde(default)]
    pub unfinished_records: UnfinishedRecordPolicy,
    /// Drop records identical on every field
    #[serde(default = "default_true")]
    pub dedupe: bool,
    #[serde(default)]
    pub company_fields: Vec<CompanyFieldSpec>,
    pub tables: Vec<TableSpec>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnfinishedRecordPolicy {
    /// Emit the record with whatever fields it has
    #[default]
    Emit,
    /// Discard it
    Drop,
}

/// A company attribute found on the same row as its label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyFieldSpec {
    pub label: String,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub kind: TableKind,
    pub anchor: AnchorSpec,
    /// Rows making up one record, in reading order
    pub stages: Vec<RowStage>,
    #[serde(default)]
    pub continuation: Option<ContinuationSpec>,
}

impl TableSpec {
    /// Field counts that mark a row as the start of a record.
    pub fn expected_field_counts(&self) -> Vec<usize> {
        self.stages
            .first()
            .map(|stage| stage.shapes.iter().map(|shape| shape.fields).collect())
            .unwrap_or_default()
    }

    pub fn continues_across_pages(&self) -> bool {
        self.continuation.is_some()
    }
}

/// Where a table starts relative to its label row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorSpec {
    pub label: String,
    /// Match the label against each line of multi-line fragments too
    #[serde(default)]
    pub split_lines: bool,
    pub offsets: OffsetRule,
}

/// Calibrated offsets tried in order before falling back to the nominal one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetRule {
    #[serde(default)]
    pub candidates: Vec<KeyDelta>,
    pub default: KeyDelta,
}

impl OffsetRule {
    pub fn fixed(default: f64) -> Self {
        Self {
            candidates: Vec::new(),
            default: KeyDelta::from(default),
        }
    }

    pub fn with_candidates(candidates: &[f64], default: f64) -> Self {
        Self {
            candidates: candidates.iter().copied().map(KeyDelta::from).collect(),
            default: KeyDelta::from(default),
        }
    }

    fn all_positive(&self) -> bool {
        self.default.is_positive() && self.candidates.iter().all(|c| c.is_positive())
    }
}

/// One row of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowStage {
    /// Accepted row shapes; a row with any other field count ends the walk
    pub shapes: Vec<RowShape>,
    /// Offset from this row to the next row (of this record, or of the next record)
    pub advance: OffsetRule,
}

impl RowStage {
    pub fn shape_for(&self, field_count: usize) -> Option<&RowShape> {
        self.shapes.iter().find(|shape| shape.fields == field_count)
    }
}

/// A row with exactly `fields` fragments, and which fragment feeds which field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowShape {
    pub fields: usize,
    pub columns: BTreeMap<String, usize>,
}

impl RowShape {
    pub fn new(fields: usize, columns: &[(&str, usize)]) -> Self {
        Self {
            fields,
            columns: columns
                .iter()
                .map(|(name, index)| (name.to_string(), *index))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuationSpec {
    /// Offset from the first data row of the next occurrence to the row that completes the pending record
    pub resume: OffsetRule,
}

impl LayoutProfile {
    /// Load a profile from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let profile: LayoutProfile = serde_yaml::from_str(&content)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load profile with fallback to the built-in default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                tracing::warn!("Failed to load profile from {}: {}, using defaults", p, e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn table(&self, kind: TableKind) -> Option<&TableSpec> {
        self.tables.iter().find(|table| table.kind == kind)
    }

    /// Check that every binding names a real field and that every walk moves downward.
    pub fn validate(&self) -> Result<(), ProfileError> {
        for spec in &self.company_fields {
            if CompanyRecord::field_kind(&spec.field).is_none() {
                return Err(ProfileError::UnknownCompanyField {
                    label: spec.label.clone(),
                    field: spec.field.clone(),
                });
            }
        }

        let mut seen = HashSet::new();
        for table in &self.tables {
            let kind = table.kind;
            if !seen.insert(kind) {
                return Err(ProfileError::DuplicateTable { kind });
            }
            if table.stages.is_empty() {
                return Err(ProfileError::NoStages { kind });
            }
            if !table.anchor.offsets.all_positive() {
                return Err(ProfileError::NonPositiveOffset {
                    kind,
                    what: "anchor".to_string(),
                });
            }

            let fields = table_fields(kind);
            for (index, stage) in table.stages.iter().enumerate() {
                if stage.shapes.is_empty() {
                    return Err(ProfileError::NoShapes { kind, stage: index });
                }
                if !stage.advance.all_positive() {
                    return Err(ProfileError::NonPositiveOffset {
                        kind,
                        what: format!("stage {index} advance"),
                    });
                }
                for shape in &stage.shapes {
                    if let Some(unknown) = shape
                        .columns
                        .keys()
                        .find(|name| !fields.iter().any(|f| f.name == name.as_str()))
                    {
                        return Err(ProfileError::UnknownField {
                            kind,
                            field: unknown.clone(),
                        });
                    }
                }
            }

            if table.continuation.is_some() && !kind.supports_continuation() {
                return Err(ProfileError::ContinuationUnsupported { kind });
            }
        }
        Ok(())
    }
}

impl Default for LayoutProfile {
    fn default() -> Self {
        builtin_bizfile_profile()
    }
}

/// Registry of known layout variants. Picking the right one for a document
/// is left to the caller.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: HashMap<String, LayoutProfile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            profiles: HashMap::new(),
        };
        registry.register(builtin_bizfile_profile());
        registry
    }

    pub fn register(&mut self, profile: LayoutProfile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    pub fn get(&self, name: &str) -> Result<&LayoutProfile, ProfileError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ProfileError::UnknownProfile(name.to_string()))
    }

    /// Load a YAML profile and register it under its own name.
    pub fn load_profile_from_file(&mut self, path: &str) -> Result<String> {
        let profile = LayoutProfile::load_from_file(path)?;
        let name = profile.name.clone();
        self.register(profile);
        Ok(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn company_field(label: &str, field: &str) -> CompanyFieldSpec {
    CompanyFieldSpec {
        label: label.to_string(),
        field: field.to_string(),
    }
}

/// The company business profile layout the extractor was calibrated on.
fn builtin_bizfile_profile() -> LayoutProfile {
    LayoutProfile {
        name: DEFAULT_PROFILE.to_string(),
        description: Some("Company business profile, single-column layout".to_string()),
        page_stride: default_page_stride(),
        row_tolerance: default_row_tolerance(),
        date_format: default_date_format(),
        unfinished_records: UnfinishedRecordPolicy::Emit,
        dedupe: true,
        company_fields: vec![
            company_field("Registration No.", "registration_no"),
            company_field("Company Name.", "company_name"),
            company_field("Former Name if any", "former_name"),
            company_field("Incorporation Date.", "incorp_date"),
            company_field("Company Type", "company_type"),
            company_field("Status", "status"),
            company_field("Status Date", "status_date"),
            company_field("Activities (I)", "activities_1"),
            company_field("Activities (II)", "activities_2"),
            company_field("Description", "activities_description"),
            company_field("Registered Office Address", "registered_office_address"),
            company_field("Date of Address", "date_of_address"),
            company_field("Date of Last AGM", "date_of_last_agm"),
            company_field("Date of Last AR", "date_of_last_ar"),
            company_field("Date of A/C Laid at Last AGM", "date_of_ac_at_last"),
            company_field("Date of Lodgment of AR, A/C", "date_of_lodgment_of_ar"),
            company_field("Receipt No.", "receipt_no"),
            company_field("Name of Audit Firm", "audit_firm_name"),
        ],
        tables: vec![
            TableSpec {
                kind: TableKind::Charges,
                anchor: AnchorSpec {
                    label: "Charge No.".to_string(),
                    split_lines: false,
                    offsets: OffsetRule::with_candidates(&[28.37], 28.34),
                },
                stages: vec![RowStage {
                    shapes: vec![RowShape::new(
                        4,
                        &[
                            ("charge_no", 0),
                            ("date_registered", 1),
                            ("amount_secured", 2),
                            ("charge_org", 3),
                        ],
                    )],
                    advance: OffsetRule::with_candidates(&[24.0, 28.0, 48.0, 36.0, 26.0], 36.0),
                }],
                continuation: None,
            },
            TableSpec {
                kind: TableKind::Capital,
                anchor: AnchorSpec {
                    label: "Capital".to_string(),
                    split_lines: false,
                    offsets: OffsetRule::with_candidates(&[75.37], 75.34),
                },
                stages: vec![RowStage {
                    shapes: vec![
                        RowShape::new(
                            4,
                            &[("amount", 0), ("shares", 1), ("currency", 2), ("share_type", 3)],
                        ),
                        RowShape::new(3, &[("amount", 0), ("currency", 1), ("share_type", 2)]),
                    ],
                    advance: OffsetRule::fixed(26.0),
                }],
                continuation: None,
            },
            TableSpec {
                kind: TableKind::PaidUpCapital,
                anchor: AnchorSpec {
                    label: "Paid-Up Capital".to_string(),
                    split_lines: false,
                    offsets: OffsetRule::with_candidates(&[50.37], 50.34),
                },
                stages: vec![RowStage {
                    shapes: vec![RowShape::new(
                        3,
                        &[("amount", 0), ("currency", 1), ("share_type", 2)],
                    )],
                    advance: OffsetRule::fixed(26.0),
                }],
                continuation: None,
            },
            TableSpec {
                kind: TableKind::Shareholders,
                anchor: AnchorSpec {
                    label: "Shareholder(s)".to_string(),
                    split_lines: false,
                    offsets: OffsetRule::with_candidates(&[97.34], 74.34),
                },
                stages: vec![
                    // row number, name, id, nationality, source of address
                    RowStage {
                        shapes: vec![RowShape::new(
                            5,
                            &[
                                ("name", 1),
                                ("shareholder_id", 2),
                                ("nationality", 3),
                                ("source_of_address", 4),
                            ],
                        )],
                        advance: OffsetRule::with_candidates(&[27.0], 37.0),
                    },
                    RowStage {
                        shapes: vec![RowShape::new(1, &[("address", 0)])],
                        advance: OffsetRule::with_candidates(&[70.0, 58.0], 81.0),
                    },
                    RowStage {
                        shapes: vec![RowShape::new(
                            2,
                            &[("ordinary_shares", 0), ("currency", 1)],
                        )],
                        advance: OffsetRule::fixed(24.0),
                    },
                ],
                continuation: Some(ContinuationSpec {
                    resume: OffsetRule {
                        candidates: vec![KeyDelta::ZERO],
                        default: KeyDelta::from(10.0),
                    },
                }),
            },
            TableSpec {
                kind: TableKind::ShareholderTypes,
                anchor: AnchorSpec {
                    label: "Shareholder Type(s)".to_string(),
                    split_lines: false,
                    offsets: OffsetRule::fixed(40.0),
                },
                stages: vec![
                    RowStage {
                        shapes: vec![RowShape::new(2, &[("name", 0), ("shareholder_type", 1)])],
                        advance: OffsetRule::fixed(20.0),
                    },
                    RowStage {
                        shapes: vec![RowShape::new(
                            2,
                            &[("number_of_shares", 0), ("share_type", 1)],
                        )],
                        advance: OffsetRule::fixed(24.0),
                    },
                ],
                continuation: Some(ContinuationSpec {
                    resume: OffsetRule {
                        candidates: vec![KeyDelta::ZERO],
                        default: KeyDelta::from(10.0),
                    },
                }),
            },
            TableSpec {
                kind: TableKind::Officers,
                anchor: AnchorSpec {
                    label: "Officers/Authorised Representative(s)".to_string(),
                    split_lines: true,
                    offsets: OffsetRule::with_candidates(&[98.0, 74.37], 74.34),
                },
                stages: vec![
                    RowStage {
                        shapes: vec![RowShape::new(
                            5,
                            &[
                                ("name", 0),
                                ("officer_id", 1),
                                ("nationality", 2),
                                ("source_of_address", 3),
                                ("date_of_appointment", 4),
                            ],
                        )],
                        advance: OffsetRule::with_candidates(&[35.0], 25.0),
                    },
                    RowStage {
                        shapes: vec![RowShape::new(2, &[("address", 0), ("position_held", 1)])],
                        advance: OffsetRule::with_candidates(
                            &[49.0, 37.0, 51.0, 47.0, 60.0, 62.0, 39.0],
                            36.0,
                        ),
                    },
                ],
                continuation: Some(ContinuationSpec {
                    resume: OffsetRule::fixed(0.0),
                }),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profile_is_valid() {
        let profile = LayoutProfile::default();
        assert_eq!(profile.validate(), Ok(()));
        assert_eq!(profile.tables.len(), TableKind::ALL.len());
        assert_eq!(
            profile.table(TableKind::Charges).unwrap().expected_field_counts(),
            vec![4]
        );
        assert_eq!(
            profile.table(TableKind::Capital).unwrap().expected_field_counts(),
            vec![4, 3]
        );
    }

    #[test]
    fn test_shipped_yaml_matches_builtin() {
        let yaml = include_str!("../configs/bizfile.yaml");
        let profile: LayoutProfile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(profile.validate(), Ok(()));
        assert_eq!(profile, LayoutProfile::default());
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let yaml = r#"
name: minimal
tables:
  - kind: charges
    anchor:
      label: "Charge No."
      offsets: { default: 28.34 }
    stages:
      - shapes:
          - fields: 2
            columns: { charge_no: 0, amount_secured: 1 }
        advance: { candidates: [24, 28], default: 36 }
"#;
        let profile: LayoutProfile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(profile.validate(), Ok(()));
        assert_eq!(profile.page_stride, 1000.0);
        assert_eq!(profile.row_tolerance, KeyDelta::from(4.0));
        assert_eq!(profile.date_format, "%d/%m/%Y");
        assert_eq!(profile.unfinished_records, UnfinishedRecordPolicy::Emit);
        assert!(profile.dedupe);
        let advance = &profile.tables[0].stages[0].advance;
        assert_eq!(advance.candidates, vec![KeyDelta::from(24.0), KeyDelta::from(28.0)]);
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let mut profile = LayoutProfile::default();
        profile.tables[0].stages[0].shapes[0]
            .columns
            .insert("chargee".to_string(), 3);
        assert_eq!(
            profile.validate(),
            Err(ProfileError::UnknownField {
                kind: TableKind::Charges,
                field: "chargee".to_string()
            })
        );
    }

    #[test]
    fn test_continuation_on_charges_is_rejected() {
        let mut profile = LayoutProfile::default();
        profile.tables[0].continuation = Some(ContinuationSpec {
            resume: OffsetRule::fixed(0.0),
        });
        assert_eq!(
            profile.validate(),
            Err(ProfileError::ContinuationUnsupported {
                kind: TableKind::Charges
            })
        );
    }

    #[test]
    fn test_zero_advance_is_rejected() {
        let mut profile = LayoutProfile::default();
        profile.tables[1].stages[0].advance = OffsetRule::fixed(0.0);
        assert!(matches!(
            profile.validate(),
            Err(ProfileError::NonPositiveOffset {
                kind: TableKind::Capital,
                ..
            })
        ));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ProfileRegistry::new();
        assert!(registry.get(DEFAULT_PROFILE).is_ok());
        assert_eq!(
            registry.get("nope").unwrap_err(),
            ProfileError::UnknownProfile("nope".to_string())
        );
        assert_eq!(registry.names(), vec![DEFAULT_PROFILE]);
    }
}
