//! Google Sheets v4 client.
//!
//! The [`SheetsApi`] trait is the seam between the payroll engine and the
//! hosted service; tests implement it with an in-memory grid.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::auth::GoogleAuth;
use crate::error::ApiError;
use crate::google::ApiTransport;

const BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// How cell values are rendered on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRender {
    /// Raw expression text: a formula cell yields its `=...` source.
    Formula,
    /// Evaluated value as displayed.
    Computed,
}

impl ValueRender {
    fn as_param(self) -> &'static str {
        match self {
            ValueRender::Formula => "FORMULA",
            ValueRender::Computed => "FORMATTED_VALUE",
        }
    }
}

/// One cell or range write for a batched value update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueWrite {
    /// A1-style range, e.g. `Sheet1!D5`.
    pub range: String,
    pub value: String,
}

impl ValueWrite {
    pub fn new(range: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            range: range.into(),
            value: value.into(),
        }
    }
}

/// A formula to install via `updateCells` (used at sheet-creation time).
#[derive(Debug, Clone)]
pub struct FormulaWrite {
    /// 1-based row index.
    pub row: u32,
    /// 0-based column index.
    pub col: u32,
    pub formula: String,
}

/// Operations the payroll engine needs from a spreadsheet backend.
///
/// All writes use the service's formula-evaluating input mode, so a value
/// beginning with `=` is installed as a formula and anything else as a
/// literal. `write_values_raw` is the exception: it stores text verbatim.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Write a rectangular block of literal values starting at `range`.
    async fn write_values_raw(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), ApiError>;

    /// Append rows after the last row of data in `range`'s table.
    async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), ApiError>;

    /// Apply all writes in one batched round trip (formula-evaluating mode).
    async fn batch_write(
        &self,
        spreadsheet_id: &str,
        writes: &[ValueWrite],
    ) -> Result<(), ApiError>;

    /// Write one cell (formula-evaluating mode).
    async fn write_cell(
        &self,
        spreadsheet_id: &str,
        range: &str,
        value: &str,
    ) -> Result<(), ApiError>;

    /// Clear a cell or range.
    async fn clear_range(&self, spreadsheet_id: &str, range: &str) -> Result<(), ApiError>;

    /// Read a range; empty cells inside the rectangle come back as `""`.
    async fn read_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        render: ValueRender,
    ) -> Result<Vec<Vec<String>>, ApiError>;

    /// Read the first cell of each range in one round trip (computed render).
    /// Empty cells yield `None`.
    async fn batch_read_cells(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> Result<Vec<Option<String>>, ApiError>;

    /// Install formulas via a single structural batch update.
    async fn apply_formulas(
        &self,
        spreadsheet_id: &str,
        cells: &[FormulaWrite],
    ) -> Result<(), ApiError>;
}

pub struct SheetsClient {
    api: ApiTransport,
}

impl SheetsClient {
    pub fn new(auth: Arc<GoogleAuth>) -> Self {
        Self {
            api: ApiTransport::new(auth, "sheets"),
        }
    }

    /// Numeric id of the first sheet tab (needed for `updateCells` ranges).
    async fn first_sheet_id(&self, spreadsheet_id: &str) -> Result<i64, ApiError> {
        #[derive(Deserialize)]
        struct Meta {
            #[serde(default)]
            sheets: Vec<SheetEntry>,
        }
        #[derive(Deserialize)]
        struct SheetEntry {
            properties: SheetProps,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct SheetProps {
            sheet_id: i64,
        }

        let url = format!("{BASE}/{spreadsheet_id}?fields=sheets.properties");
        let meta: Meta = self.api.get(&url).await?;
        meta.sheets
            .first()
            .map(|s| s.properties.sheet_id)
            .ok_or_else(|| ApiError::InvalidResponse {
                service: "sheets".to_string(),
                reason: "spreadsheet has no sheets".to_string(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

fn cell_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SheetsApi for SheetsClient {
    async fn write_values_raw(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), ApiError> {
        let url = format!(
            "{BASE}/{spreadsheet_id}/values/{}?valueInputOption=RAW",
            urlencoding::encode(range)
        );
        let _: serde_json::Value = self.api.put(&url, json!({ "values": values })).await?;
        Ok(())
    }

    async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), ApiError> {
        let url = format!(
            "{BASE}/{spreadsheet_id}/values/{}:append?valueInputOption=RAW",
            urlencoding::encode(range)
        );
        let _: serde_json::Value = self.api.post(&url, json!({ "values": values })).await?;
        Ok(())
    }

    async fn batch_write(
        &self,
        spreadsheet_id: &str,
        writes: &[ValueWrite],
    ) -> Result<(), ApiError> {
        if writes.is_empty() {
            return Ok(());
        }
        let data: Vec<_> = writes
            .iter()
            .map(|w| json!({ "range": w.range, "values": [[w.value]] }))
            .collect();
        let url = format!("{BASE}/{spreadsheet_id}/values:batchUpdate");
        let _: serde_json::Value = self
            .api
            .post(
                &url,
                json!({ "valueInputOption": "USER_ENTERED", "data": data }),
            )
            .await?;
        Ok(())
    }

    async fn write_cell(
        &self,
        spreadsheet_id: &str,
        range: &str,
        value: &str,
    ) -> Result<(), ApiError> {
        let url = format!(
            "{BASE}/{spreadsheet_id}/values/{}?valueInputOption=USER_ENTERED",
            urlencoding::encode(range)
        );
        let _: serde_json::Value = self.api.put(&url, json!({ "values": [[value]] })).await?;
        Ok(())
    }

    async fn clear_range(&self, spreadsheet_id: &str, range: &str) -> Result<(), ApiError> {
        let url = format!(
            "{BASE}/{spreadsheet_id}/values/{}:clear",
            urlencoding::encode(range)
        );
        let _: serde_json::Value = self.api.post(&url, json!({})).await?;
        Ok(())
    }

    async fn read_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        render: ValueRender,
    ) -> Result<Vec<Vec<String>>, ApiError> {
        let url = format!(
            "{BASE}/{spreadsheet_id}/values/{}?valueRenderOption={}",
            urlencoding::encode(range),
            render.as_param()
        );
        let result: ValueRange = self.api.get(&url).await?;
        Ok(result
            .values
            .iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    async fn batch_read_cells(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> Result<Vec<Option<String>>, ApiError> {
        let mut url = format!("{BASE}/{spreadsheet_id}/values:batchGet?valueRenderOption=FORMATTED_VALUE");
        for range in ranges {
            url.push_str("&ranges=");
            url.push_str(&urlencoding::encode(range));
        }
        let result: BatchGetResponse = self.api.get(&url).await?;
        Ok(result
            .value_ranges
            .iter()
            .map(|vr| {
                vr.values
                    .first()
                    .and_then(|row| row.first())
                    .map(cell_to_string)
                    .filter(|s| !s.is_empty())
            })
            .collect())
    }

    async fn apply_formulas(
        &self,
        spreadsheet_id: &str,
        cells: &[FormulaWrite],
    ) -> Result<(), ApiError> {
        if cells.is_empty() {
            return Ok(());
        }
        let sheet_id = self.first_sheet_id(spreadsheet_id).await?;

        let requests: Vec<_> = cells
            .iter()
            .map(|cell| {
                json!({
                    "updateCells": {
                        "range": {
                            "sheetId": sheet_id,
                            "startRowIndex": cell.row - 1,
                            "endRowIndex": cell.row,
                            "startColumnIndex": cell.col,
                            "endColumnIndex": cell.col + 1,
                        },
                        "rows": [{
                            "values": [{ "userEnteredValue": { "formulaValue": cell.formula } }]
                        }],
                        "fields": "userEnteredValue",
                    }
                })
            })
            .collect();

        let url = format!("{BASE}/{spreadsheet_id}:batchUpdate");
        let _: serde_json::Value = self.api.post(&url, json!({ "requests": requests })).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_params() {
        assert_eq!(ValueRender::Formula.as_param(), "FORMULA");
        assert_eq!(ValueRender::Computed.as_param(), "FORMATTED_VALUE");
    }

    #[test]
    fn cell_values_stringify() {
        assert_eq!(cell_to_string(&json!("30000")), "30000");
        assert_eq!(cell_to_string(&json!(25)), "25");
        assert_eq!(cell_to_string(&json!(12.5)), "12.5");
    }
}
