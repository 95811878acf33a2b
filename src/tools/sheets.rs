//! General-purpose spreadsheet tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::google::drive::MIME_SPREADSHEET;
use crate::google::ValueRender;
use crate::payroll::{extract_spreadsheet_id, sheet_link};
use crate::tools::tool::{optional_str, require_str, rows_from_value, Tool, ToolError, ToolOutput};
use crate::tools::{render_err, Services};

const DEFAULT_FOLDER: &str = "Sheets";

/// Create a plain spreadsheet with optional initial data.
pub struct CreateSheetTool {
    services: Arc<Services>,
}

impl CreateSheetTool {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for CreateSheetTool {
    fn name(&self) -> &str {
        "create_sheet"
    }

    fn description(&self) -> &str {
        "Create a Google Sheet in a Drive folder, optionally filled with initial rows \
         starting at A1. Values are stored verbatim (no formula interpretation)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Name for the new spreadsheet"
                },
                "folder_name": {
                    "type": "string",
                    "description": "Drive folder to place it in (created if missing, default 'Sheets')"
                },
                "data": {
                    "type": "array",
                    "items": { "type": "array", "items": {} },
                    "description": "Optional initial rows, written starting at A1"
                }
            },
            "required": ["title"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        let title = require_str(&params, "title")?;
        let folder_name = optional_str(&params, "folder_name").unwrap_or(DEFAULT_FOLDER);
        let data = rows_from_value(&params, "data")?;

        let result = async {
            let folder_id = self.services.drive.find_or_create_folder(folder_name).await?;
            let file = self
                .services
                .drive
                .create_in_folder(title, MIME_SPREADSHEET, &folder_id)
                .await?;

            let rows = data.len();
            if rows > 0 {
                let range = format!("{}!A1", self.services.tab);
                self.services
                    .sheets
                    .write_values_raw(&file.id, &range, data)
                    .await?;
            }

            let link = file.web_view_link.unwrap_or_else(|| sheet_link(&file.id));
            Ok::<_, crate::error::OpError>((rows, link))
        }
        .await;

        match result {
            Ok((rows, link)) => Ok(ToolOutput::text(format!(
                "✅ Created sheet '{title}' with {rows} row(s) in folder '{folder_name}'\n🔗 {link}"
            ))),
            Err(e) => Ok(render_err(e)),
        }
    }
}

/// Read a range from a spreadsheet.
pub struct ReadSheetTool {
    services: Arc<Services>,
}

impl ReadSheetTool {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for ReadSheetTool {
    fn name(&self) -> &str {
        "read_sheet"
    }

    fn description(&self) -> &str {
        "Read a range of cells from a Google Sheet and return them as tab-separated rows."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sheet_url": {
                    "type": "string",
                    "description": "Spreadsheet URL or bare spreadsheet id"
                },
                "range": {
                    "type": "string",
                    "description": "A1-style range to read (default: first 100 rows of the configured tab)"
                }
            },
            "required": ["sheet_url"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        let sheet_url = require_str(&params, "sheet_url")?;
        let default_range = format!("{}!A1:Z100", self.services.tab);
        let range = optional_str(&params, "range").unwrap_or(&default_range);
        let spreadsheet_id = extract_spreadsheet_id(sheet_url);

        match self
            .services
            .sheets
            .read_range(&spreadsheet_id, range, ValueRender::Computed)
            .await
        {
            Ok(rows) if rows.is_empty() => {
                Ok(ToolOutput::text(format!("Range '{range}' is empty")))
            }
            Ok(rows) => {
                let rendered: Vec<String> = rows.iter().map(|row| row.join("\t")).collect();
                Ok(ToolOutput::text(rendered.join("\n")))
            }
            Err(e) => Ok(render_err(e.into())),
        }
    }
}

/// Append rows after the existing data in a sheet.
pub struct AppendRowsTool {
    services: Arc<Services>,
}

impl AppendRowsTool {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for AppendRowsTool {
    fn name(&self) -> &str {
        "append_rows"
    }

    fn description(&self) -> &str {
        "Append rows after the last row of data in a Google Sheet. Values are stored \
         verbatim (no formula interpretation)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sheet_url": {
                    "type": "string",
                    "description": "Spreadsheet URL or bare spreadsheet id"
                },
                "rows": {
                    "type": "array",
                    "items": { "type": "array", "items": {} },
                    "description": "Rows to append"
                }
            },
            "required": ["sheet_url", "rows"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        let sheet_url = require_str(&params, "sheet_url")?;
        let rows = rows_from_value(&params, "rows")?;
        if rows.is_empty() {
            return Err(ToolError::InvalidParams(
                "'rows' must contain at least one row".to_string(),
            ));
        }
        let spreadsheet_id = extract_spreadsheet_id(sheet_url);
        let range = format!("{}!A1", self.services.tab);

        let count = rows.len();
        match self
            .services
            .sheets
            .append_values(&spreadsheet_id, &range, rows)
            .await
        {
            Ok(()) => Ok(ToolOutput::text(format!("✅ Appended {count} row(s)"))),
            Err(e) => Ok(render_err(e.into())),
        }
    }
}
