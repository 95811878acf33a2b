//! Payroll business operations on top of the row-update engine.

use std::collections::{BTreeMap, HashSet};

use tracing::info;

use crate::error::OpError;
use crate::google::drive::{DriveClient, MIME_SPREADSHEET};
use crate::google::{FormulaWrite, SheetsApi, ValueRender};
use crate::payroll::{
    engine::RowUpdateEngine, format_number, sheet_link, COL_LOP_DAYS, COL_PAID_LEAVE, COL_SALARY,
    COL_WORKING_DAYS, DEFAULT_WORKING_DAYS, FORMULA_COLUMNS, HEADERS, PROTECTED_COLUMNS,
};

/// Which balance a leave request draws down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveType {
    Paid,
    LossOfPay,
}

impl LeaveType {
    /// Anything that isn't PAID (case-insensitive) counts as loss of pay.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("paid") {
            LeaveType::Paid
        } else {
            LeaveType::LossOfPay
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LeaveType::Paid => "paid leave",
            LeaveType::LossOfPay => "loss-of-pay leave",
        }
    }
}

/// Result of a successful leave application.
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    pub row: u32,
    pub leave_type: LeaveType,
    pub remaining_working_days: f64,
}

/// A freshly provisioned payroll sheet.
#[derive(Debug, Clone)]
pub struct CreatedSheet {
    pub spreadsheet_id: String,
    pub link: String,
    pub data_rows: usize,
}

fn protected() -> HashSet<String> {
    PROTECTED_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// Locate an employee by exact id match in column A. Returns the 1-based row
/// number of the first match; the header row is never considered.
pub async fn find_employee_row(
    sheets: &dyn SheetsApi,
    tab: &str,
    spreadsheet_id: &str,
    employee_id: &str,
) -> Result<u32, OpError> {
    let needle = employee_id.trim();
    if needle.is_empty() {
        return Err(OpError::InvalidArgument(
            "employee_id must not be empty".to_string(),
        ));
    }

    let range = format!("{tab}!A:A");
    let rows = sheets
        .read_range(spreadsheet_id, &range, ValueRender::Computed)
        .await?;

    for (idx, row) in rows.iter().enumerate() {
        if idx == 0 {
            continue;
        }
        if let Some(cell) = row.first() {
            if cell.trim() == needle {
                return Ok(idx as u32 + 1);
            }
        }
    }

    Err(OpError::NotFound(format!(
        "employee '{needle}' not found in column A"
    )))
}

/// Set an employee's monthly salary (column D). Every downstream formula in
/// the row recomputes from the new value.
pub async fn change_salary(
    sheets: &dyn SheetsApi,
    tab: &str,
    spreadsheet_id: &str,
    employee_id: &str,
    new_salary: f64,
) -> Result<u32, OpError> {
    if !new_salary.is_finite() || new_salary < 0.0 {
        return Err(OpError::InvalidArgument(format!(
            "new_salary must be a non-negative number, got {new_salary}"
        )));
    }

    let row = find_employee_row(sheets, tab, spreadsheet_id, employee_id).await?;

    let mut updates = BTreeMap::new();
    updates.insert(COL_SALARY.to_string(), format_number(new_salary));

    RowUpdateEngine::new(sheets, tab)
        .update_row(spreadsheet_id, row, &updates, &protected())
        .await?;

    info!(employee_id, row, new_salary, "salary updated");
    Ok(row)
}

/// Deduct leave days from an employee's working-day balance and credit them
/// to the paid-leave or loss-of-pay column.
///
/// Missing or unparsable balance cells fall back to 30 working days and zero
/// leave taken. A request that exceeds the available balance is rejected
/// before any write is issued.
pub async fn apply_leave(
    sheets: &dyn SheetsApi,
    tab: &str,
    spreadsheet_id: &str,
    employee_id: &str,
    leave_days: i64,
    leave_type: LeaveType,
) -> Result<LeaveOutcome, OpError> {
    if leave_days <= 0 {
        return Err(OpError::InvalidArgument(format!(
            "leave_days must be positive, got {leave_days}"
        )));
    }

    let row = find_employee_row(sheets, tab, spreadsheet_id, employee_id).await?;

    let ranges = vec![
        format!("{tab}!{COL_WORKING_DAYS}{row}"),
        format!("{tab}!{COL_PAID_LEAVE}{row}"),
        format!("{tab}!{COL_LOP_DAYS}{row}"),
    ];
    let cells = sheets.batch_read_cells(spreadsheet_id, &ranges).await?;

    let parse = |idx: usize, default: f64| -> f64 {
        cells
            .get(idx)
            .and_then(|c| c.as_deref())
            .and_then(|s| s.trim().parse::<f64>().ok())
            .unwrap_or(default)
    };
    let working = parse(0, DEFAULT_WORKING_DAYS);
    let paid = parse(1, 0.0);
    let lop = parse(2, 0.0);

    let requested = leave_days as f64;
    if requested > working {
        return Err(OpError::InsufficientBalance {
            requested: leave_days,
            available: working,
        });
    }

    let remaining = working - requested;
    let mut updates = BTreeMap::new();
    updates.insert(COL_WORKING_DAYS.to_string(), format_number(remaining));
    match leave_type {
        LeaveType::Paid => {
            updates.insert(COL_PAID_LEAVE.to_string(), format_number(paid + requested));
        }
        LeaveType::LossOfPay => {
            updates.insert(COL_LOP_DAYS.to_string(), format_number(lop + requested));
        }
    }

    RowUpdateEngine::new(sheets, tab)
        .update_row(spreadsheet_id, row, &updates, &protected())
        .await?;

    info!(
        employee_id,
        row,
        leave_days,
        leave_type = leave_type.label(),
        "leave applied"
    );
    Ok(LeaveOutcome {
        row,
        leave_type,
        remaining_working_days: remaining,
    })
}

/// Provision a payroll spreadsheet: folder, document, header row, literal
/// data rows, and per-row formulas for the computed columns.
///
/// `data_rows` carries the literal columns A..G; the formula columns H..K are
/// installed from the schema templates regardless of what the rows contain
/// there.
pub async fn create_payroll_sheet(
    drive: &DriveClient,
    sheets: &dyn SheetsApi,
    tab: &str,
    folder_name: &str,
    sheet_name: &str,
    data_rows: Vec<Vec<String>>,
) -> Result<CreatedSheet, OpError> {
    let folder_id = drive.find_or_create_folder(folder_name).await?;
    let file = drive
        .create_in_folder(sheet_name, MIME_SPREADSHEET, &folder_id)
        .await?;

    let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    sheets
        .write_values_raw(&file.id, &format!("{tab}!A1"), vec![header])
        .await?;

    let row_count = data_rows.len();
    if row_count > 0 {
        sheets
            .write_values_raw(&file.id, &format!("{tab}!A2"), data_rows)
            .await?;

        let mut formulas = Vec::with_capacity(row_count * FORMULA_COLUMNS.len());
        for offset in 0..row_count as u32 {
            let row = offset + 2;
            for (col, template) in FORMULA_COLUMNS {
                formulas.push(FormulaWrite {
                    row,
                    col,
                    formula: template.replace("{ROW}", &row.to_string()),
                });
            }
        }
        sheets.apply_formulas(&file.id, &formulas).await?;
    }

    let link = match file.web_view_link {
        Some(link) => link,
        None => sheet_link(&file.id),
    };

    info!(sheet = sheet_name, rows = row_count, "payroll sheet created");
    Ok(CreatedSheet {
        spreadsheet_id: file.id,
        link,
        data_rows: row_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leave_type_parsing() {
        assert_eq!(LeaveType::parse("PAID"), LeaveType::Paid);
        assert_eq!(LeaveType::parse("paid"), LeaveType::Paid);
        assert_eq!(LeaveType::parse(" Paid "), LeaveType::Paid);
        assert_eq!(LeaveType::parse("LOP"), LeaveType::LossOfPay);
        assert_eq!(LeaveType::parse("sick"), LeaveType::LossOfPay);
        assert_eq!(LeaveType::parse(""), LeaveType::LossOfPay);
    }
}
