//! Payroll sheet schema and helpers.
//!
//! Column semantics are fixed at sheet-creation time and never renumbered:
//!
//! ```text
//! A  Employee ID     E  Working Days       I  Gross Salary
//! B  Employee Name   F  Paid Leave Days    J  LOP Amount
//! C  Department      G  Loss of Pay Days   K  Net Salary
//! D  Monthly Salary  H  Per Day Salary
//! ```
//!
//! Columns H..K hold formulas installed per data row; C is protected and is
//! never rewritten by the recalculation step regardless of its content.

mod engine;
mod ops;

pub use engine::RowUpdateEngine;
pub use ops::{
    apply_leave, change_salary, create_payroll_sheet, find_employee_row, CreatedSheet,
    LeaveOutcome, LeaveType,
};

/// Header row, one entry per column A..K.
pub const HEADERS: [&str; 11] = [
    "Employee ID",
    "Employee Name",
    "Department",
    "Monthly Salary",
    "Working Days",
    "Paid Leave Days",
    "Loss of Pay Days",
    "Per Day Salary",
    "Gross Salary",
    "LOP Amount",
    "Net Salary",
];

/// Formula templates keyed by 0-based column index; `{ROW}` is substituted
/// with the 1-based row number at install time.
pub const FORMULA_COLUMNS: [(u32, &str); 4] = [
    (7, "=D{ROW}/30"),       // H: Per Day Salary
    (8, "=D{ROW}"),          // I: Gross Salary
    (9, "=G{ROW}*H{ROW}"),   // J: LOP Amount
    (10, "=I{ROW}-J{ROW}"),  // K: Net Salary
];

/// Columns the recalculation step must never overwrite.
pub const PROTECTED_COLUMNS: [&str; 1] = ["C"];

pub const COL_EMPLOYEE_ID: &str = "A";
pub const COL_SALARY: &str = "D";
pub const COL_WORKING_DAYS: &str = "E";
pub const COL_PAID_LEAVE: &str = "F";
pub const COL_LOP_DAYS: &str = "G";

/// First column past the schema; the touch marker is written and cleared here
/// so it can never land on a formula cell.
pub const TOUCH_MARKER_COLUMN: &str = "L";

/// Default working days assumed when the cell is empty or unparsable.
pub const DEFAULT_WORKING_DAYS: f64 = 30.0;

/// Convert a 0-based column index to its letter form (0 -> A, 25 -> Z,
/// 26 -> AA).
pub fn column_index_to_letter(idx: u32) -> String {
    let mut letter = String::new();
    let mut temp = idx as i64;
    while temp >= 0 {
        letter.insert(0, (b'A' + (temp % 26) as u8) as char);
        temp = temp / 26 - 1;
    }
    letter
}

/// Accept either a bare spreadsheet id or a full `/spreadsheets/d/<id>/...`
/// URL.
pub fn extract_spreadsheet_id(url_or_id: &str) -> String {
    if let Some(pos) = url_or_id.find("/spreadsheets/d/") {
        let rest = &url_or_id[pos + "/spreadsheets/d/".len()..];
        let id: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        if !id.is_empty() {
            return id;
        }
    }
    url_or_id.to_string()
}

/// Browser link for a spreadsheet.
pub fn sheet_link(spreadsheet_id: &str) -> String {
    format!(
        "https://docs.google.com/spreadsheets/d/{}/edit",
        extract_spreadsheet_id(spreadsheet_id)
    )
}

/// Render a numeric cell value, dropping a trailing `.0` on whole numbers.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(column_index_to_letter(0), "A");
        assert_eq!(column_index_to_letter(3), "D");
        assert_eq!(column_index_to_letter(10), "K");
        assert_eq!(column_index_to_letter(25), "Z");
        assert_eq!(column_index_to_letter(26), "AA");
        assert_eq!(column_index_to_letter(27), "AB");
        assert_eq!(column_index_to_letter(52), "BA");
    }

    #[test]
    fn spreadsheet_id_from_url_or_raw() {
        assert_eq!(
            extract_spreadsheet_id(
                "https://docs.google.com/spreadsheets/d/1aB-c_9/edit#gid=0"
            ),
            "1aB-c_9"
        );
        assert_eq!(extract_spreadsheet_id("1aB-c_9"), "1aB-c_9");
        // Malformed URL falls through untouched
        assert_eq!(
            extract_spreadsheet_id("https://docs.google.com/spreadsheets/d/"),
            "https://docs.google.com/spreadsheets/d/"
        );
    }

    #[test]
    fn link_normalizes_urls() {
        assert_eq!(
            sheet_link("https://docs.google.com/spreadsheets/d/abc123/edit"),
            "https://docs.google.com/spreadsheets/d/abc123/edit"
        );
        assert_eq!(
            sheet_link("abc123"),
            "https://docs.google.com/spreadsheets/d/abc123/edit"
        );
    }

    #[test]
    fn number_rendering() {
        assert_eq!(format_number(25.0), "25");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(50000.0), "50000");
    }

    #[test]
    fn schema_is_consistent() {
        assert_eq!(HEADERS.len(), 11);
        for (col, template) in FORMULA_COLUMNS {
            assert!(col < HEADERS.len() as u32);
            assert!(template.starts_with('='));
            assert!(template.contains("{ROW}"));
        }
    }
}
