//! Domains module containing business logic organized by bounded contexts.
//!
//! - **documents**: renderers turning structured descriptions into files, and
//!   the store those files are written to
//! - **tools**: the tools exposed to MCP clients and how they are executed

pub mod documents;
pub mod tools;
