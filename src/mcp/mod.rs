//! MCP server module
//!
//! Exposes the larder tools over the Model Context Protocol.

pub mod server;

pub use server::LarderService;
