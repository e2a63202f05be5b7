//! Derives the table key of a record.

use crate::types::{ATTR_FILE_NAME, ATTR_ID, ATTR_SELECTION_ID, Record, RecordKey};

/// Resolve the key that addresses `record` in the metadata table.
///
/// Priority: `fileName` + `selectionId` together, then `fileName`, then
/// `selectionId`, then `id`. `None` means the record cannot be addressed;
/// callers count it as a per-record failure.
pub fn resolve_key(record: &Record) -> Option<RecordKey> {
    let file_name = record.attribute(ATTR_FILE_NAME).cloned();
    let selection_id = record.attribute(ATTR_SELECTION_ID).cloned();

    match (file_name, selection_id) {
        (Some(file_name), Some(selection_id)) => Some(RecordKey::Composite {
            file_name,
            selection_id,
        }),
        (Some(file_name), None) => Some(RecordKey::FileName(file_name)),
        (None, Some(selection_id)) => Some(RecordKey::SelectionId(selection_id)),
        (None, None) => record.attribute(ATTR_ID).cloned().map(RecordKey::Id),
    }
}
