//! CSV export of a form's submissions.

use std::collections::BTreeSet;

use crate::storage::types::{FormPolicy, StorageError, SubmissionRecord};

const FIXED_COLUMNS: [&str; 3] = ["id", "submitted_at", "client_address"];

/// Encode submissions as CSV.
///
/// The header is the fixed columns followed by the sorted union of every
/// record's field keys. Missing fields are written as empty cells.
pub fn submissions_csv(records: &[SubmissionRecord]) -> Result<Vec<u8>, StorageError> {
    let field_keys: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.fields.keys().map(String::as_str))
        .collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(FIXED_COLUMNS.iter().copied().chain(field_keys.iter().copied()))?;

    for record in records {
        let mut row = vec![
            record.id.to_string(),
            record.created_at.to_rfc3339(),
            record.client_address.clone(),
        ];
        row.extend(
            field_keys
                .iter()
                .map(|key| record.fields.get(*key).map(ToString::to_string).unwrap_or_default()),
        );
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| StorageError::Io(e.into_error()))
}

/// Download name for a form's export.
pub fn export_filename(form: &FormPolicy) -> String {
    let stem: String = form
        .name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        format!("{}_submissions.csv", form.public_id)
    } else {
        format!("{stem}_submissions.csv")
    }
}
