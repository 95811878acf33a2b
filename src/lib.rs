//! deskpilot: an MCP tool server for Google Sheets and Slides automation.
//!
//! The server exposes payroll spreadsheet operations, presentation building,
//! and Gemini-drafted deck generation as MCP tools over an SSE transport.

pub mod auth;
pub mod config;
pub mod deck;
pub mod error;
pub mod gemini;
pub mod google;
pub mod payroll;
pub mod server;
pub mod tools;
