//! Shared context for every subcommand: a single open [`GrizabellaDb`],
//! constructed from an optional `--data-dir` override the same way the
//! library's own `GrizabellaSession` would.

use grizabella_core::config::ConfigBuilder;
use grizabella_core::db_manager::GrizabellaDb;
use grizabella_core::error::Result;

pub struct GrizabellaCliContext {
    pub db: GrizabellaDb,
}

impl GrizabellaCliContext {
    pub async fn new(data_dir: Option<String>) -> Result<Self> {
        let config = if let Some(dir) = &data_dir {
            ConfigBuilder::new().with_data_dir(dir).build()?
        } else {
            ConfigBuilder::new().with_db_path_from_env().build()?
        };

        let db_path = config.storage.data_dir.to_string_lossy().to_string();
        let db_name_or_path = if db_path.is_empty() { "grizabella" } else { db_path.as_str() };
        let db = GrizabellaDb::connect_with_config(db_name_or_path, true, &config).await?;
        Ok(Self { db })
    }

    pub async fn close(self) {
        self.db.close().await;
    }
}
