//! CLI surface for server mode (spec §6): a single `--db-path` override,
//! no other flags.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "grizabella-server", about = "Remote tool-call surface for the Grizabella tri-store knowledge engine")]
pub struct CliArgs {
    /// Overrides GRIZABELLA_DB_PATH and the per-user default database path.
    #[arg(long = "db-path", value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}
