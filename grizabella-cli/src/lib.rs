pub mod args;
pub mod commands;
pub mod context;
pub mod handlers;
pub mod output;
pub mod query_dto;
pub mod utils;

pub use context::GrizabellaCliContext;
pub use output::{format_error, format_info, format_success, format_warning, output_error, OutputFormat};
