//! Bulk import reconciliation.
//!
//! The caller hands over raw rows of cells already extracted from a
//! spreadsheet; this module locates the recognized columns in the header
//! row and partitions the data rows into accepted candidates and rejected
//! duplicates. Nothing here touches the roster; committing the accepted
//! candidates goes through `RosterStore::insert_batch`.

use crate::errors::AppError;
use crate::models::{ImportPreview, MemberCandidate, RejectReason, RejectedRow};
use crate::roster::RosterStore;

/// Column indices located in the header row. Identifier and name are
/// mandatory; serial number and interests are optional conveniences.
#[derive(Debug, Clone, Copy)]
pub struct ColumnLayout {
    pub serial: Option<usize>,
    pub code: usize,
    pub name: usize,
    pub interests: Option<usize>,
}

/// Match header cells case-insensitively against recognized column-name
/// fragments. Fails with `MissingRequiredColumns` before any row processing
/// when the identifier or name column cannot be found.
pub fn locate_columns(header: &[String]) -> Result<ColumnLayout, AppError> {
    let mut serial = None;
    let mut code = None;
    let mut name = None;
    let mut interests = None;

    for (index, cell) in header.iter().enumerate() {
        let cell = cell.to_lowercase();
        // Order matters: "serial number" would otherwise match neither
        // fragment, and "employee name" must not be taken for the id column.
        if serial.is_none() && (cell.contains("s.no") || cell.contains("serial")) {
            serial = Some(index);
        } else if interests.is_none() && cell.contains("interest") {
            interests = Some(index);
        } else if name.is_none() && cell.contains("name") {
            name = Some(index);
        } else if code.is_none() && (cell.contains("id") || cell.contains("code")) {
            code = Some(index);
        }
    }

    match (code, name) {
        (Some(code), Some(name)) => Ok(ColumnLayout {
            serial,
            code,
            name,
            interests,
        }),
        _ => Err(AppError::MissingRequiredColumns(
            "Import requires an employee identifier column and a name column".to_string(),
        )),
    }
}

fn cell(row: &[String], index: usize) -> Option<String> {
    row.get(index)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Partition data rows into accepted candidates and rejected duplicates.
///
/// Rows with a blank identifier or name are skipped silently. Duplicate
/// detection is by identifier only, case-insensitively, checked first
/// against codes accepted earlier in this batch and then against the
/// roster; the first collision found determines the rejection reason.
/// Accepted candidates carry provisional ids continuing from the roster
/// counter but the roster itself is not mutated.
pub fn reconcile(roster: &RosterStore, rows: &[Vec<String>]) -> Result<ImportPreview, AppError> {
    let header = rows.first().ok_or_else(|| {
        AppError::MissingRequiredColumns("Import data has no header row".to_string())
    })?;
    let layout = locate_columns(header)?;

    let mut accepted: Vec<MemberCandidate> = Vec::new();
    let mut rejected: Vec<RejectedRow> = Vec::new();
    let mut batch_codes: Vec<String> = Vec::new();
    let mut provisional_id = roster.next_id();

    for (row_number, row) in rows.iter().enumerate().skip(1) {
        let (Some(code), Some(display_name)) = (cell(row, layout.code), cell(row, layout.name))
        else {
            tracing::debug!(row_number, "Skipping row with blank identifier or name");
            continue;
        };
        let interests = layout.interests.and_then(|i| cell(row, i));

        let folded = code.to_lowercase();
        let reason = if batch_codes.contains(&folded) {
            Some(RejectReason::DuplicateInBatch)
        } else if roster.code_in_use(&code, None) {
            Some(RejectReason::DuplicateInRoster)
        } else {
            None
        };

        match reason {
            Some(reason) => rejected.push(RejectedRow {
                row: row_number,
                code,
                display_name,
                reason,
            }),
            None => {
                batch_codes.push(folded);
                accepted.push(MemberCandidate {
                    id: provisional_id,
                    code,
                    display_name,
                    interests,
                });
                provisional_id += 1;
            }
        }
    }

    Ok(ImportPreview { accepted, rejected })
}
