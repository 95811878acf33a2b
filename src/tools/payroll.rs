//! Payroll tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::payroll::{
    apply_leave, change_salary, create_payroll_sheet, extract_spreadsheet_id, find_employee_row,
    LeaveType,
};
use crate::tools::tool::{
    optional_str, require_f64, require_i64, require_str, rows_from_value, Tool, ToolError,
    ToolOutput,
};
use crate::tools::{render_err, Services};

const DEFAULT_FOLDER: &str = "Payroll";

/// Create a payroll spreadsheet with headers, data, and salary formulas.
pub struct CreatePayrollSheetTool {
    services: Arc<Services>,
}

impl CreatePayrollSheetTool {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for CreatePayrollSheetTool {
    fn name(&self) -> &str {
        "create_payroll_sheet"
    }

    fn description(&self) -> &str {
        "Create a payroll Google Sheet in a Drive folder with the standard 11-column schema \
         (Employee ID through Net Salary) and per-row salary formulas. Optional data rows fill \
         columns A-G; the computed columns H-K are always formula-driven."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sheet_name": {
                    "type": "string",
                    "description": "Name for the new spreadsheet"
                },
                "folder_name": {
                    "type": "string",
                    "description": "Drive folder to place it in (created if missing, default 'Payroll')"
                },
                "data": {
                    "type": "array",
                    "items": { "type": "array", "items": {} },
                    "description": "Optional data rows for columns A-G (Employee ID, Name, Department, Monthly Salary, Working Days, Paid Leave Days, Loss of Pay Days)"
                }
            },
            "required": ["sheet_name"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        let sheet_name = require_str(&params, "sheet_name")?;
        let folder_name = optional_str(&params, "folder_name").unwrap_or(DEFAULT_FOLDER);
        let data = rows_from_value(&params, "data")?;

        match create_payroll_sheet(
            &self.services.drive,
            self.services.sheets.as_ref(),
            &self.services.tab,
            folder_name,
            sheet_name,
            data,
        )
        .await
        {
            Ok(created) => Ok(ToolOutput::text(format!(
                "✅ Created payroll sheet '{sheet_name}' with {} data row(s) in folder '{folder_name}'\n🔗 {}",
                created.data_rows, created.link
            ))),
            Err(e) => Ok(render_err(e)),
        }
    }
}

/// Locate an employee's row by id.
pub struct FindEmployeeRowTool {
    services: Arc<Services>,
}

impl FindEmployeeRowTool {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for FindEmployeeRowTool {
    fn name(&self) -> &str {
        "find_employee_row"
    }

    fn description(&self) -> &str {
        "Find the row number of an employee in a payroll sheet by exact Employee ID match \
         in column A."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sheet_url": {
                    "type": "string",
                    "description": "Spreadsheet URL or bare spreadsheet id"
                },
                "employee_id": {
                    "type": "string",
                    "description": "Employee ID to look up"
                }
            },
            "required": ["sheet_url", "employee_id"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        let sheet_url = require_str(&params, "sheet_url")?;
        let employee_id = require_str(&params, "employee_id")?;
        let spreadsheet_id = extract_spreadsheet_id(sheet_url);

        match find_employee_row(
            self.services.sheets.as_ref(),
            &self.services.tab,
            &spreadsheet_id,
            employee_id,
        )
        .await
        {
            Ok(row) => Ok(ToolOutput::text(format!(
                "✅ Employee '{employee_id}' found at row {row}"
            ))),
            Err(e) => Ok(render_err(e)),
        }
    }
}

/// Change an employee's monthly salary.
pub struct ChangeSalaryTool {
    services: Arc<Services>,
}

impl ChangeSalaryTool {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for ChangeSalaryTool {
    fn name(&self) -> &str {
        "change_employee_salary"
    }

    fn description(&self) -> &str {
        "Set an employee's monthly salary (column D). Per-day, gross, LOP, and net salary \
         formulas recompute automatically from the new value."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sheet_url": {
                    "type": "string",
                    "description": "Spreadsheet URL or bare spreadsheet id"
                },
                "employee_id": {
                    "type": "string",
                    "description": "Employee ID to update"
                },
                "new_salary": {
                    "type": "number",
                    "description": "New monthly salary"
                }
            },
            "required": ["sheet_url", "employee_id", "new_salary"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        let sheet_url = require_str(&params, "sheet_url")?;
        let employee_id = require_str(&params, "employee_id")?;
        let new_salary = require_f64(&params, "new_salary")?;
        let spreadsheet_id = extract_spreadsheet_id(sheet_url);

        match change_salary(
            self.services.sheets.as_ref(),
            &self.services.tab,
            &spreadsheet_id,
            employee_id,
            new_salary,
        )
        .await
        {
            Ok(row) => Ok(ToolOutput::text(format!(
                "✅ Updated salary for '{employee_id}' to {new_salary} (row {row}). \
                 Dependent columns recalculated."
            ))),
            Err(e) => Ok(render_err(e)),
        }
    }
}

/// Apply leave days against an employee's working-day balance.
pub struct ApplyLeaveTool {
    services: Arc<Services>,
}

impl ApplyLeaveTool {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for ApplyLeaveTool {
    fn name(&self) -> &str {
        "apply_employee_leave"
    }

    fn description(&self) -> &str {
        "Deduct leave days from an employee's working days (column E) and credit them to \
         Paid Leave (F) or Loss of Pay (G). Rejects requests exceeding the remaining balance."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sheet_url": {
                    "type": "string",
                    "description": "Spreadsheet URL or bare spreadsheet id"
                },
                "employee_id": {
                    "type": "string",
                    "description": "Employee ID to update"
                },
                "leave_days": {
                    "type": "integer",
                    "description": "Number of leave days to apply (must be positive)"
                },
                "leave_type": {
                    "type": "string",
                    "description": "'PAID' for paid leave; anything else counts as loss of pay (default 'LOP')"
                }
            },
            "required": ["sheet_url", "employee_id", "leave_days"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        let sheet_url = require_str(&params, "sheet_url")?;
        let employee_id = require_str(&params, "employee_id")?;
        let leave_days = require_i64(&params, "leave_days")?;
        let leave_type = LeaveType::parse(optional_str(&params, "leave_type").unwrap_or("LOP"));
        let spreadsheet_id = extract_spreadsheet_id(sheet_url);

        match apply_leave(
            self.services.sheets.as_ref(),
            &self.services.tab,
            &spreadsheet_id,
            employee_id,
            leave_days,
            leave_type,
        )
        .await
        {
            Ok(outcome) => Ok(ToolOutput::text(format!(
                "✅ Applied {leave_days} {} day(s) for '{employee_id}' (row {}). \
                 {} working day(s) remaining.",
                outcome.leave_type.label(),
                outcome.row,
                outcome.remaining_working_days
            ))),
            Err(e) => Ok(render_err(e)),
        }
    }
}
