use super::row_index::RowIndex;
use crate::config::AnchorSpec;
use crate::types::RowKey;

/// One occurrence of a table label and the row its data starts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorMatch {
    pub anchor_key: RowKey,
    /// May not exist in the index; an absent row means no records for this occurrence
    pub first_data_row: RowKey,
}

/// Every row labelled by `anchor`, top of page first.
pub fn locate(rows: &RowIndex, anchor: &AnchorSpec) -> Vec<AnchorMatch> {
    let mut keys = if anchor.split_lines {
        rows.rows_containing_line(&anchor.label)
    } else {
        rows.rows_containing(&anchor.label)
    };
    keys.reverse();

    keys.into_iter()
        .map(|anchor_key| AnchorMatch {
            anchor_key,
            first_data_row: rows.resolve(anchor_key, &anchor.offsets),
        })
        .collect()
}
