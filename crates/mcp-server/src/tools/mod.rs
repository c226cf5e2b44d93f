//! Issue Graph MCP tool surface.

pub mod catalog;
mod dispatch;
mod error;
mod schemas;

pub use dispatch::IssueGraphService;
