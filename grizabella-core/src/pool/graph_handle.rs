//! A thread-safe handle onto a Kuzu database.
//!
//! `kuzu::Connection` is not `Send`, so it cannot be parked in an async
//! connection pool the way the relational and vector connections are. Instead
//! a single dedicated OS thread owns the `kuzu::Database` and one
//! `kuzu::Connection` for its whole lifetime; callers submit boxed closures
//! over a channel and await the result through a oneshot channel. This keeps
//! the non-`Send` type entirely off the async executor's threads while still
//! giving adapters an `async fn` to call.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::error::{GrizabellaError, Result};

type Job = Box<dyn FnOnce(&kuzu::Connection) -> Result<BoxedAny> + Send>;
type BoxedAny = Box<dyn std::any::Any + Send>;

/// Handle to a single worker thread that owns a `kuzu::Connection`.
#[derive(Clone)]
pub struct ThreadSafeGraphHandle {
    sender: mpsc::Sender<(Job, oneshot::Sender<Result<BoxedAny>>)>,
    graph_dir: Arc<PathBuf>,
}

impl ThreadSafeGraphHandle {
    /// Spawn the worker thread and open the database at `graph_dir`.
    pub fn open(graph_dir: &Path) -> Result<Self> {
        let (tx, mut rx) = mpsc::channel::<(Job, oneshot::Sender<Result<BoxedAny>>)>(64);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<()>>();
        let dir = graph_dir.to_path_buf();

        std::thread::Builder::new()
            .name(format!("grizabella-graph-{}", dir.display()))
            .spawn(move || {
                let db = match kuzu::Database::new(&dir, kuzu::SystemConfig::default()) {
                    Ok(db) => db,
                    Err(e) => {
                        let _ = ready_tx.send(Err(GrizabellaError::Database(format!(
                            "failed to open kuzu database at {}: {e}",
                            dir.display()
                        ))));
                        return;
                    }
                };
                let conn = match kuzu::Connection::new(&db) {
                    Ok(conn) => conn,
                    Err(e) => {
                        let _ = ready_tx.send(Err(GrizabellaError::Database(format!(
                            "failed to open kuzu connection at {}: {e}",
                            dir.display()
                        ))));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                while let Some((job, reply)) = rx.blocking_recv() {
                    let result = job(&conn);
                    let _ = reply.send(result);
                }
            })
            .map_err(|e| GrizabellaError::Database(format!("failed to spawn graph worker thread: {e}")))?;

        ready_rx
            .recv()
            .map_err(|_| GrizabellaError::Database("graph worker thread exited before init".into()))??;

        Ok(Self {
            sender: tx,
            graph_dir: Arc::new(graph_dir.to_path_buf()),
        })
    }

    pub fn graph_dir(&self) -> &Path {
        &self.graph_dir
    }

    /// Run `f` on the worker thread against the owned connection and await
    /// its result.
    pub async fn run<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&kuzu::Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |conn| f(conn).map(|r| Box::new(r) as BoxedAny));

        self.sender
            .send((job, reply_tx))
            .await
            .map_err(|_| GrizabellaError::Database("graph worker thread is gone".into()))?;

        let boxed = reply_rx
            .await
            .map_err(|_| GrizabellaError::Database("graph worker thread dropped the reply".into()))??;

        boxed
            .downcast::<R>()
            .map(|b| *b)
            .map_err(|_| GrizabellaError::Database("graph worker thread returned an unexpected type".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_and_run_round_trips_a_value() {
        let tmp = tempfile::tempdir().unwrap();
        let handle = ThreadSafeGraphHandle::open(tmp.path()).unwrap();
        let value = handle.run(|_conn| Ok(42_i32)).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn handle_is_clonable_and_shares_one_worker() {
        let tmp = tempfile::tempdir().unwrap();
        let handle = ThreadSafeGraphHandle::open(tmp.path()).unwrap();
        let other = handle.clone();
        let (a, b) = tokio::join!(handle.run(|_| Ok(1_i32)), other.run(|_| Ok(2_i32)));
        assert_eq!(a.unwrap() + b.unwrap(), 3);
    }
}
