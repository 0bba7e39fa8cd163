use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{UCode, UStatus};
use crate::pending::RequestTable;

/// Background task that expires pending requests at their deadlines.
///
/// The loop re-reads the table's earliest deadline on every iteration and
/// never trusts the deadline it started sleeping on: an insert with a nearer
/// deadline wakes it through the table's notify, so a short-ttl request
/// queued behind a long-ttl one still fires on its own schedule.
///
/// Stopping the worker (or dropping it) only ends the task; outstanding
/// entries are left for the owner to cancel.
#[derive(Debug)]
pub struct ExpireWorker {
    stop: CancellationToken,
}

impl ExpireWorker {
    /// Spawns a worker serving `table`. Must be called within a tokio
    /// runtime.
    #[must_use]
    pub fn spawn(table: Arc<RequestTable>) -> Self {
        let stop = CancellationToken::new();
        tokio::spawn(run(table, stop.clone()));
        Self { stop }
    }

    pub fn stop(&self) {
        self.stop.cancel();
    }
}

impl Drop for ExpireWorker {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

async fn run(table: Arc<RequestTable>, stop: CancellationToken) {
    loop {
        // Authoritative re-read after every wake, whatever woke us.
        let wake_at = table.earliest_deadline();
        tokio::select! {
            () = stop.cancelled() => {
                tracing::debug!("stop expiration worker");
                return;
            }
            () = table.changed() => {}
            () = sleep_or_park(wake_at) => {
                for (reqid, slot) in table.take_due(Instant::now()) {
                    tracing::debug!("request expired before response received: {reqid}");
                    slot.complete(Err(UStatus::new(
                        UCode::DeadlineExceeded,
                        "request expired before response received",
                    )));
                }
            }
        }
    }
}

/// Sleeps until `deadline`, or forever when the table holds no deadline
/// (the worker then only wakes by insert or stop).
async fn sleep_or_park(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
