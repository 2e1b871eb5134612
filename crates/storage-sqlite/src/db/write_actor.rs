//! Single-writer actor.
//!
//! SQLite allows one writer at a time; funnelling every write through one
//! dedicated thread serializes them without lock contention and lets each
//! job run inside an immediate transaction.

use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use tokio::sync::{mpsc, oneshot};

use crate::errors::{Result, StoreError};

type WriteJob = Box<dyn FnOnce(&mut SqliteConnection) + Send + 'static>;

/// Cloneable handle to the writer thread.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::UnboundedSender<WriteJob>,
}

impl WriteHandle {
    /// Run `job` on the writer thread inside an immediate transaction.
    ///
    /// The closure's error aborts and rolls back the transaction.
    pub async fn exec<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let wrapped: WriteJob = Box::new(move |conn| {
            let outcome = conn.immediate_transaction(|tx| job(tx));
            let _ = done_tx.send(outcome);
        });
        self.tx
            .send(wrapped)
            .map_err(|_| StoreError::WriterUnavailable)?;
        done_rx.await.map_err(|_| StoreError::WriterUnavailable)?
    }
}

/// Spawn the writer thread that owns all database writes.
///
/// The thread exits when every `WriteHandle` has been dropped.
pub fn spawn_writer(pool: Pool<ConnectionManager<SqliteConnection>>) -> WriteHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<WriteJob>();
    std::thread::Builder::new()
        .name("catalog-writer".to_string())
        .spawn(move || {
            while let Some(job) = rx.blocking_recv() {
                match pool.get() {
                    Ok(mut conn) => job(&mut conn),
                    Err(err) => {
                        // The dropped job drops its oneshot sender; the
                        // caller observes WriterUnavailable.
                        log::error!("[Store] writer could not get a connection: {err}");
                    }
                }
            }
        })
        .expect("failed to spawn catalog writer thread");
    WriteHandle { tx }
}
