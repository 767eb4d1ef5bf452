// Bizfile Core Library
//
// Rebuilds company records from the positioned text fragments of paginated
// business filings: rows are recovered from geometry, tables are found by
// their labels and walked with calibrated vertical offsets.

pub mod cache;
pub mod config;
pub mod error;
pub mod extraction;
pub mod layout;
pub mod normalize;
pub mod output;
pub mod processor;
pub mod records;
pub mod storage;
pub mod types;

// Re-export main types and functions for easy use
pub use config::{LayoutProfile, ProfileRegistry, UnfinishedRecordPolicy, DEFAULT_PROFILE};
pub use error::{ExtractError, ProfileError, WalkStop};
pub use extraction::{ExtractionSession, RowIndex};
pub use layout::{BboxXhtmlEngine, FragmentStream, JsonLayoutEngine, LayoutBackend, LayoutEngine};
pub use processor::{extract, DocumentProcessor, ProcessOptions};
pub use records::*;
pub use types::*;
