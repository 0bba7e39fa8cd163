use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Mutex;

use foldhash::fast::RandomState;
use tokio::sync::{oneshot, Notify};
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::UStatus;
use crate::message::UMessage;

/// Result delivered through a pending request's completion slot.
pub type Outcome = std::result::Result<UMessage, UStatus>;

/// Completion channel of one pending request: either a promise backing an
/// [`InvokeFuture`](crate::InvokeFuture) or a one-shot callback.
pub enum CompletionSlot {
    Promise(oneshot::Sender<Outcome>),
    Callback(Box<dyn FnOnce(Outcome) + Send + 'static>),
}

impl CompletionSlot {
    /// Delivers the outcome. Consumes the slot, so a slot can complete at
    /// most once by construction.
    pub fn complete(self, outcome: Outcome) {
        match self {
            // The receiver may already be gone if the caller dropped its
            // future without awaiting it.
            CompletionSlot::Promise(tx) => {
                let _ = tx.send(outcome);
            }
            CompletionSlot::Callback(callback) => callback(outcome),
        }
    }
}

impl std::fmt::Debug for CompletionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletionSlot::Promise(_) => f.write_str("CompletionSlot::Promise"),
            CompletionSlot::Callback(_) => f.write_str("CompletionSlot::Callback"),
        }
    }
}

#[derive(Debug)]
struct PendingRequest {
    deadline: Instant,
    slot: CompletionSlot,
}

#[derive(Debug, Default)]
struct TableInner {
    entries: HashMap<Uuid, PendingRequest, RandomState>,
    // Deadlines are tracked separately with lazy deletion: completing an
    // entry only removes it from `entries`, and stale heap heads are
    // discarded when they surface.
    deadlines: BinaryHeap<Reverse<(Instant, Uuid)>>,
}

impl TableInner {
    /// A heap entry only claims a live map entry if both the id and the
    /// deadline match; a stale head left by a completed-then-reinserted id
    /// must not expire the fresh entry early.
    fn live_at(&self, reqid: Uuid, deadline: Instant) -> bool {
        self.entries
            .get(&reqid)
            .is_some_and(|pending| pending.deadline == deadline)
    }
}

/// Pending-request table mapping a correlation id to its deadline and
/// completion slot.
///
/// Shared by the invoking client (insert, cancel-all), the transport
/// listener (complete-on-response) and the expiration worker
/// (complete-on-deadline). A single mutex covers the map and the deadline
/// heap; completion slots are always invoked after the lock is released.
#[derive(Debug, Default)]
pub struct RequestTable {
    inner: Mutex<TableInner>,
    wake: Notify,
}

impl RequestTable {
    /// Inserts a pending entry for `reqid`, due at `deadline`.
    ///
    /// If the new deadline is earlier than everything already queued, the
    /// expiration worker is woken so it never keeps sleeping toward a later
    /// deadline.
    ///
    /// # Errors
    ///
    /// If an entry for `reqid` already exists the slot is handed back
    /// unconsumed; the caller decides how to complete it.
    pub fn try_insert(
        &self,
        reqid: Uuid,
        deadline: Instant,
        slot: CompletionSlot,
    ) -> std::result::Result<(), CompletionSlot> {
        let wake = {
            let mut inner = self.inner.lock().unwrap();
            if inner.entries.contains_key(&reqid) {
                return Err(slot);
            }
            let wake = match inner.deadlines.peek() {
                Some(Reverse((earliest, _))) => deadline < *earliest,
                None => true,
            };
            inner.entries.insert(reqid, PendingRequest { deadline, slot });
            inner.deadlines.push(Reverse((deadline, reqid)));
            wake
        };
        if wake {
            self.wake.notify_one();
        }
        Ok(())
    }

    /// Atomically removes the entry for `reqid` and delivers `outcome` to
    /// its slot. Returns whether an entry was found.
    ///
    /// Response arrival, expiration and cancellation all funnel through
    /// here, so whichever fires first wins and the rest observe not-found.
    pub fn complete(&self, reqid: Uuid, outcome: Outcome) -> bool {
        let removed = {
            let mut inner = self.inner.lock().unwrap();
            inner.entries.remove(&reqid)
        };
        match removed {
            Some(pending) => {
                pending.slot.complete(outcome);
                true
            }
            None => false,
        }
    }

    /// Removes every entry and completes each with `Err(status)`.
    pub fn cancel_all(&self, status: UStatus) {
        let drained: Vec<PendingRequest> = {
            let mut inner = self.inner.lock().unwrap();
            inner.deadlines.clear();
            inner.entries.drain().map(|(_, pending)| pending).collect()
        };
        for pending in drained {
            pending.slot.complete(Err(status.clone()));
        }
    }

    /// Earliest deadline of any live entry, pruning stale heap heads.
    pub fn earliest_deadline(&self) -> Option<Instant> {
        let mut inner = self.inner.lock().unwrap();
        while let Some(Reverse((deadline, reqid))) = inner.deadlines.peek().copied() {
            if inner.live_at(reqid, deadline) {
                return Some(deadline);
            }
            inner.deadlines.pop();
        }
        None
    }

    /// Removes every entry due at or before `now` and returns their slots,
    /// earliest deadline first.
    pub fn take_due(&self, now: Instant) -> Vec<(Uuid, CompletionSlot)> {
        let mut due = Vec::new();
        let mut inner = self.inner.lock().unwrap();
        while let Some(Reverse((deadline, reqid))) = inner.deadlines.peek().copied() {
            if deadline > now {
                break;
            }
            inner.deadlines.pop();
            if inner.live_at(reqid, deadline) {
                if let Some(pending) = inner.entries.remove(&reqid) {
                    due.push((reqid, pending.slot));
                }
            }
        }
        due
    }

    /// Resolves when an insert schedules an earlier deadline than anything
    /// the caller has seen. Used by the expiration worker.
    pub async fn changed(&self) {
        self.wake.notified().await;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::error::UCode;

    use super::*;

    fn callback_slot(count: &Arc<AtomicUsize>) -> CompletionSlot {
        let count = count.clone();
        CompletionSlot::Callback(Box::new(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let table = RequestTable::default();
        let count = Arc::new(AtomicUsize::new(0));
        let reqid = Uuid::now_v7();
        let deadline = Instant::now() + Duration::from_secs(1);

        table
            .try_insert(reqid, deadline, callback_slot(&count))
            .unwrap();
        let slot = table
            .try_insert(reqid, deadline, callback_slot(&count))
            .unwrap_err();
        assert_eq!(table.len(), 1);

        // The rejected slot is returned intact and still usable.
        slot.complete(Err(UCode::Internal.into()));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_complete_at_most_once() {
        let table = RequestTable::default();
        let count = Arc::new(AtomicUsize::new(0));
        let reqid = Uuid::now_v7();
        let deadline = Instant::now() + Duration::from_secs(1);

        table
            .try_insert(reqid, deadline, callback_slot(&count))
            .unwrap();

        assert!(table.complete(reqid, Ok(UMessage::default())));
        assert!(!table.complete(reqid, Err(UCode::DeadlineExceeded.into())));
        assert!(!table.complete(reqid, Err(UCode::Cancelled.into())));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_id_is_noop() {
        let table = RequestTable::default();
        assert!(!table.complete(Uuid::now_v7(), Ok(UMessage::default())));
    }

    #[tokio::test]
    async fn test_cancel_all() {
        let table = RequestTable::default();
        let count = Arc::new(AtomicUsize::new(0));
        let deadline = Instant::now() + Duration::from_secs(1);
        for _ in 0..5 {
            table
                .try_insert(Uuid::now_v7(), deadline, callback_slot(&count))
                .unwrap();
        }

        table.cancel_all(UCode::Cancelled.into());
        assert_eq!(count.load(Ordering::SeqCst), 5);
        assert!(table.is_empty());
        assert_eq!(table.earliest_deadline(), None);
    }

    #[tokio::test]
    async fn test_earliest_deadline_skips_completed() {
        let table = RequestTable::default();
        let count = Arc::new(AtomicUsize::new(0));
        let now = Instant::now();
        let early = Uuid::now_v7();
        let late = Uuid::now_v7();

        table
            .try_insert(early, now + Duration::from_millis(10), callback_slot(&count))
            .unwrap();
        table
            .try_insert(late, now + Duration::from_secs(1), callback_slot(&count))
            .unwrap();
        assert_eq!(
            table.earliest_deadline(),
            Some(now + Duration::from_millis(10))
        );

        // Completing the early entry leaves a stale heap head to prune.
        table.complete(early, Ok(UMessage::default()));
        assert_eq!(table.earliest_deadline(), Some(now + Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_reinserted_id_keeps_fresh_deadline() {
        let table = RequestTable::default();
        let count = Arc::new(AtomicUsize::new(0));
        let now = Instant::now();
        let reqid = Uuid::now_v7();

        table.try_insert(reqid, now, callback_slot(&count)).unwrap();
        assert!(table.complete(reqid, Ok(UMessage::default())));

        // Re-using the id leaves a stale heap head behind; it must not
        // claim the fresh entry at the old deadline.
        table
            .try_insert(reqid, now + Duration::from_secs(1), callback_slot(&count))
            .unwrap();
        assert!(table.take_due(now).is_empty());
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.earliest_deadline(),
            Some(now + Duration::from_secs(1))
        );

        assert_eq!(table.take_due(now + Duration::from_secs(1)).len(), 1);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_take_due_in_deadline_order() {
        let table = RequestTable::default();
        let now = Instant::now();
        let count = Arc::new(AtomicUsize::new(0));
        let first = Uuid::now_v7();
        let second = Uuid::now_v7();
        let future = Uuid::now_v7();

        table
            .try_insert(second, now - Duration::from_millis(5), callback_slot(&count))
            .unwrap();
        table
            .try_insert(first, now - Duration::from_millis(10), callback_slot(&count))
            .unwrap();
        table
            .try_insert(future, now + Duration::from_secs(1), callback_slot(&count))
            .unwrap();

        let due = table.take_due(now);
        let ids: Vec<Uuid> = due.iter().map(|(reqid, _)| *reqid).collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(table.len(), 1);
    }
}
