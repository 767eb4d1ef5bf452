// Layout-driven record reconstruction:
// - row_index.rs: fragments grouped into rows by vertical position
// - anchors.rs: table labels and the row their data starts on
// - walker.rs: offset walk through a table, one record per pass
// - continuation.rs: records carried from one page to the next
// - company.rs: label/value company attributes
// - dedupe.rs: structural duplicate removal
// - session.rs: per-document state tying the above together

pub mod anchors;
pub mod company;
pub mod continuation;
pub mod dedupe;
pub mod row_index;
pub mod session;
pub mod walker;

pub use anchors::{locate, AnchorMatch};
pub use company::extract_company_fields;
pub use continuation::{ContinuationSlot, PendingRecord, Resumption};
pub use dedupe::dedupe;
pub use row_index::RowIndex;
pub use session::ExtractionSession;
pub use walker::{OffsetWalker, WalkState};
