//! Smart row updates: write literals, then force every untouched formula in
//! the row to recompute.
//!
//! Google Sheets does not always re-evaluate a row's formulas after a values
//! write from the API. The workaround is to read each formula cell's source,
//! rewrite it with a volatile `&RAND()` suffix, then restore the original
//! text; the restore triggers a fresh evaluation. A touch marker written and
//! cleared past the last schema column nudges the dependency graph one more
//! time. Both steps are Sheets-specific and would be dead weight against a
//! backend that recomputes eagerly.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::error::OpError;
use crate::google::{SheetsApi, ValueRender, ValueWrite};
use crate::payroll::{column_index_to_letter, TOUCH_MARKER_COLUMN};

const TOUCH_MARKER: &str = "Updated";

/// Applies column-level updates to one row of a payroll sheet.
pub struct RowUpdateEngine<'a> {
    sheets: &'a dyn SheetsApi,
    tab: &'a str,
}

impl<'a> RowUpdateEngine<'a> {
    pub fn new(sheets: &'a dyn SheetsApi, tab: &'a str) -> Self {
        Self { sheets, tab }
    }

    /// Write `column_updates` (column letter -> literal value) into
    /// `row_number`, then force-recompute every formula cell in the row that
    /// was neither updated nor listed in `protected_columns`.
    ///
    /// Not concurrency-safe: two simultaneous updates to the same row can
    /// interleave the perturb/restore writes. Last writer wins on the
    /// restore, which leaves the formula text intact but may drop the other
    /// caller's literal.
    pub async fn update_row(
        &self,
        spreadsheet_id: &str,
        row_number: u32,
        column_updates: &BTreeMap<String, String>,
        protected_columns: &HashSet<String>,
    ) -> Result<(), OpError> {
        if !column_updates.is_empty() {
            let writes: Vec<ValueWrite> = column_updates
                .iter()
                .map(|(col, value)| {
                    ValueWrite::new(format!("{}!{col}{row_number}", self.tab), value.clone())
                })
                .collect();
            self.sheets.batch_write(spreadsheet_id, &writes).await?;
        }

        let range = format!("{}!A{row_number}:ZZ{row_number}", self.tab);
        let rows = self
            .sheets
            .read_range(spreadsheet_id, &range, ValueRender::Formula)
            .await?;
        let row = rows.into_iter().next().unwrap_or_default();

        let mut formula_cells: Vec<(String, String)> = Vec::new();
        for (idx, cell) in row.iter().enumerate() {
            if !cell.starts_with('=') {
                continue;
            }
            let letter = column_index_to_letter(idx as u32);
            if column_updates.contains_key(&letter) || protected_columns.contains(&letter) {
                continue;
            }
            formula_cells.push((letter, cell.clone()));
        }

        if !formula_cells.is_empty() {
            debug!(
                row = row_number,
                count = formula_cells.len(),
                "forcing formula recomputation"
            );
            let perturb: Vec<ValueWrite> = formula_cells
                .iter()
                .map(|(col, formula)| {
                    ValueWrite::new(
                        format!("{}!{col}{row_number}", self.tab),
                        format!("{formula}&RAND()"),
                    )
                })
                .collect();
            self.sheets.batch_write(spreadsheet_id, &perturb).await?;

            let restore: Vec<ValueWrite> = formula_cells
                .iter()
                .map(|(col, formula)| {
                    ValueWrite::new(format!("{}!{col}{row_number}", self.tab), formula.clone())
                })
                .collect();
            self.sheets.batch_write(spreadsheet_id, &restore).await?;
        }

        let marker = format!("{}!{TOUCH_MARKER_COLUMN}{row_number}", self.tab);
        self.sheets
            .write_cell(spreadsheet_id, &marker, TOUCH_MARKER)
            .await?;
        self.sheets.clear_range(spreadsheet_id, &marker).await?;

        Ok(())
    }
}
