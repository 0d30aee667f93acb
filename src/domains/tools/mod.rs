//! Tools domain module.
//!
//! Tools are the callable functions exposed to MCP clients.
//!
//! ## Architecture
//!
//! - `definitions/` - Individual tool implementations (one file per tool)
//! - `catalog.rs` - Which tools each application registers
//! - `registry.rs` - Tool definitions and the read-only registry
//! - `validation.rs` - Compiled input schemas producing field violations
//! - `executor.rs` - Lookup, validation and guarded handler execution
//! - `error.rs` - Tool-specific error types
//!
//! ## Adding a New Tool
//!
//! 1. Create a new file in `definitions/` with params, `execute()`,
//!    `to_tool()` and `definition()`
//! 2. Export it in `definitions/mod.rs`
//! 3. Add it to the matching profile in `catalog.rs`

pub mod catalog;
pub mod context;
pub mod definitions;
pub mod error;
pub mod executor;
pub mod registry;
pub mod validation;

pub use catalog::build_registry;
pub use context::ToolContext;
pub use error::{FieldViolation, ToolError};
pub use executor::{PreparedCall, ToolExecutor};
pub use registry::{ToolDefinition, ToolRegistry};
