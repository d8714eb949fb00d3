//! Database Manager Factory (spec §4.10).
//!
//! A process-wide registry of `{canonicalized path → (manager, refcount)}` so
//! repeated `get_manager` calls for the same database path share one set of
//! substrate connections instead of racing to open the same SQLite file or
//! Kuzu database twice. Mirrors the original's module-level
//! `get_db_manager_factory()` / `cleanup_all_managers()` free functions
//! (confirmed in `original_source/tests/test_connection_management.py`) as a
//! `once_cell`-backed singleton guarded by a `tokio::sync::Mutex`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use tokio::sync::Mutex;

use crate::config::GrizabellaConfig;
use crate::db_manager::GrizabellaDb;
use crate::error::{GrizabellaError, Result};
use crate::path_resolver;

/// The registry holds a `Weak` reference rather than a strong `Arc`: every
/// strong reference lives with the callers who called `get_manager`, so a
/// caller that drops its handle without calling `release` (panic, early
/// return, abnormal termination) doesn't keep the entry - and its open
/// substrate connections - alive forever. `refcount` is bookkeeping for the
/// explicit `get_manager`/`release` contract; liveness is always checked by
/// upgrading the weak reference, so a dead entry self-heals on the next
/// lookup regardless of what `refcount` says.
struct Entry {
    manager: Weak<GrizabellaDb>,
    refcount: usize,
}

/// The registry itself. Holds every currently-open database keyed by its
/// canonicalized root path.
pub struct DbManagerFactory {
    entries: Mutex<HashMap<PathBuf, Entry>>,
}

impl DbManagerFactory {
    fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    /// The process-wide singleton.
    pub fn global() -> &'static DbManagerFactory {
        static INSTANCE: OnceCell<DbManagerFactory> = OnceCell::new();
        INSTANCE.get_or_init(DbManagerFactory::new)
    }

    /// Return the manager for `db_name_or_path`, constructing and opening it
    /// on first use and incrementing its refcount on every subsequent call.
    pub async fn get_manager(&self, db_name_or_path: &str, create_if_not_exists: bool) -> Result<Arc<GrizabellaDb>> {
        self.get_manager_with_config(db_name_or_path, create_if_not_exists, &GrizabellaConfig::default()).await
    }

    pub async fn get_manager_with_config(
        &self,
        db_name_or_path: &str,
        create_if_not_exists: bool,
        config: &GrizabellaConfig,
    ) -> Result<Arc<GrizabellaDb>> {
        let key = canonicalize_key(db_name_or_path, create_if_not_exists)?;
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(&key) {
            if let Some(manager) = entry.manager.upgrade() {
                entry.refcount += 1;
                return Ok(manager);
            }
            // The last strong reference was dropped without a matching
            // `release` (abnormal termination); the entry is stale, prune it
            // and fall through to open a fresh manager.
            entries.remove(&key);
        }

        drop(entries);
        let manager = Arc::new(GrizabellaDb::connect_with_config(db_name_or_path, create_if_not_exists, config).await?);
        let mut entries = self.entries.lock().await;
        match entries.get_mut(&key) {
            Some(entry) if entry.manager.upgrade().is_some() => {
                // Lost the race to another caller opening the same path concurrently;
                // keep the winner's manager and let ours drop (Kuzu's own single-writer
                // guard rejects a second open before we'd otherwise notice).
                entry.refcount += 1;
                Ok(entry.manager.upgrade().expect("just checked"))
            }
            _ => {
                entries.insert(key, Entry { manager: Arc::downgrade(&manager), refcount: 1 });
                Ok(manager)
            }
        }
    }

    /// Decrement the refcount for `db_name_or_path`; at zero, remove the
    /// entry and close the manager if this call is holding its last strong
    /// reference. A path with no open (live) entry is a no-op.
    pub async fn release(&self, db_name_or_path: &str) -> Result<()> {
        let key = canonicalize_key(db_name_or_path, false)?;
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get_mut(&key) else {
            return Ok(());
        };
        entry.refcount = entry.refcount.saturating_sub(1);
        if entry.refcount == 0 {
            let entry = entries.remove(&key).expect("just matched");
            drop(entries);
            if let Some(manager) = entry.manager.upgrade() {
                close_if_sole_owner(manager).await;
            }
        }
        Ok(())
    }

    /// Drain and close every open manager, regardless of refcount.
    pub async fn cleanup_all(&self) {
        let drained: Vec<Entry> = {
            let mut entries = self.entries.lock().await;
            entries.drain().map(|(_, entry)| entry).collect()
        };
        for entry in drained {
            if let Some(manager) = entry.manager.upgrade() {
                close_if_sole_owner(manager).await;
            }
        }
    }

    /// Drop registry entries whose weak reference no longer upgrades, i.e.
    /// every strong `Arc<GrizabellaDb>` was already dropped (typically
    /// without a matching `release`). Safe to call opportunistically; never
    /// removes a live entry.
    pub async fn prune_dead_entries(&self) {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.manager.strong_count() > 0);
    }

    #[cfg(test)]
    async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }

    #[cfg(test)]
    async fn live_entry_count(&self) -> usize {
        self.entries
            .lock()
            .await
            .values()
            .filter(|entry| entry.manager.strong_count() > 0)
            .count()
    }
}

async fn close_if_sole_owner(manager: Arc<GrizabellaDb>) {
    match Arc::try_unwrap(manager) {
        Ok(db) => db.close().await,
        Err(_) => {
            tracing::warn!("database manager released with live references outstanding; deferring close to final drop");
        }
    }
}

fn canonicalize_key(db_name_or_path: &str, create_if_not_exists: bool) -> Result<PathBuf> {
    let paths = path_resolver::resolve(db_name_or_path, create_if_not_exists)?;
    paths
        .root
        .canonicalize()
        .or_else(|_| Ok::<_, std::io::Error>(paths.root.clone()))
        .map_err(|e: std::io::Error| GrizabellaError::Configuration(format!("failed to canonicalize database path: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn repeated_get_manager_shares_one_entry_and_refcounts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared_db");
        let path_str = path.to_str().unwrap();
        let factory = DbManagerFactory::new();

        let a = factory.get_manager(path_str, true).await.unwrap();
        let b = factory.get_manager(path_str, true).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(factory.entry_count().await, 1);

        factory.release(path_str).await.unwrap();
        assert_eq!(factory.entry_count().await, 1);
        drop(a);
        drop(b);
        factory.release(path_str).await.unwrap();
        assert_eq!(factory.entry_count().await, 0);
    }

    #[tokio::test]
    async fn release_of_unknown_path_is_a_no_op() {
        let factory = DbManagerFactory::new();
        factory.release("never_opened").await.unwrap();
    }

    #[tokio::test]
    async fn dropping_every_handle_without_release_self_heals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abandoned_db");
        let path_str = path.to_str().unwrap();
        let factory = DbManagerFactory::new();

        let handle = factory.get_manager(path_str, true).await.unwrap();
        assert_eq!(factory.entry_count().await, 1);

        // Simulate a caller that panics or returns early instead of calling
        // `release`: drop the only strong reference directly.
        drop(handle);
        assert_eq!(factory.live_entry_count().await, 0);

        factory.prune_dead_entries().await;
        assert_eq!(factory.entry_count().await, 0);

        // A subsequent lookup opens a fresh manager rather than handing back
        // the dangling entry.
        let fresh = factory.get_manager(path_str, true).await.unwrap();
        assert_eq!(factory.entry_count().await, 1);
        drop(fresh);
    }
}
