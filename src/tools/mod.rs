//! MCP tool implementations.
//!
//! Each tool is a thin façade over the payroll, deck, or Gemini operations:
//! it validates parameters, runs the operation, and renders the outcome (or
//! its error) as text. Structured errors never cross the MCP boundary.

pub mod ai;
pub mod payroll;
pub mod registry;
pub mod sheets;
pub mod slides;
pub mod tool;

pub use registry::{ToolDefinition, ToolRegistry};
pub use tool::{Tool, ToolError, ToolOutput};

use std::sync::Arc;

use crate::error::OpError;
use crate::gemini::SlideDrafter;
use crate::google::drive::DriveClient;
use crate::google::{SheetsApi, SlidesApi};

/// Shared backend handles injected into every tool.
pub struct Services {
    pub drive: Arc<DriveClient>,
    pub sheets: Arc<dyn SheetsApi>,
    pub slides: Arc<dyn SlidesApi>,
    /// Absent when no GEMINI_API_KEY is configured; the AI tools then report
    /// themselves unavailable instead of failing mid-call.
    pub gemini: Option<Arc<dyn SlideDrafter>>,
    /// Tab name payroll and sheet operations target.
    pub tab: String,
}

/// Register every tool this server exposes.
pub fn register_all(registry: &ToolRegistry, services: Arc<Services>) {
    registry.register_sync(Arc::new(payroll::CreatePayrollSheetTool::new(Arc::clone(
        &services,
    ))));
    registry.register_sync(Arc::new(payroll::FindEmployeeRowTool::new(Arc::clone(
        &services,
    ))));
    registry.register_sync(Arc::new(payroll::ChangeSalaryTool::new(Arc::clone(
        &services,
    ))));
    registry.register_sync(Arc::new(payroll::ApplyLeaveTool::new(Arc::clone(
        &services,
    ))));

    registry.register_sync(Arc::new(sheets::CreateSheetTool::new(Arc::clone(
        &services,
    ))));
    registry.register_sync(Arc::new(sheets::ReadSheetTool::new(Arc::clone(&services))));
    registry.register_sync(Arc::new(sheets::AppendRowsTool::new(Arc::clone(
        &services,
    ))));

    registry.register_sync(Arc::new(slides::CreateSlidesTool::new(Arc::clone(
        &services,
    ))));
    registry.register_sync(Arc::new(slides::AddSlideTool::new(Arc::clone(&services))));
    registry.register_sync(Arc::new(slides::PresentationInfoTool::new(Arc::clone(
        &services,
    ))));

    registry.register_sync(Arc::new(ai::GenerateSlidesTool::new(Arc::clone(&services))));
    registry.register_sync(Arc::new(ai::SummarizeToSlidesTool::new(services)));

    tracing::info!("Registered {} tools", registry.count());
}

/// Render an operation failure as tool output.
pub(crate) fn render_err(err: OpError) -> ToolOutput {
    ToolOutput::error(format!("❌ {err}"))
}
