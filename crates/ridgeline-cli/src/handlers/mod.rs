//! Command handlers.
//!
//! Handlers follow the canonical pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<(), CliError>`
//! - Thin wrappers that call the stores or the download manager and format
//!   output for the terminal
//!
//! Handlers should NOT:
//! - Build their own storage adapters
//! - Touch the filesystem directly

pub mod dem;
pub mod package;
pub mod paths;
pub mod regions;
pub mod status;
