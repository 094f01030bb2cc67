use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use boa_gc::{Finalize, Trace, empty_trace};
use tokio::sync::oneshot;

/// Why a script exchange did not produce a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScriptFailure {
    /// The first data frame was binary and not valid UTF-8.
    NonText,
    Message(String),
}

/// What the script reported for one exchange.
pub(crate) type ScriptOutcome = Result<String, ScriptFailure>;

/// Script exchanges that were started from Rust and have not settled yet.
#[derive(Clone, Default, Finalize)]
pub(crate) struct PendingExchanges {
    inner: Arc<Mutex<HashMap<u32, oneshot::Sender<ScriptOutcome>>>>,
    next_id: Arc<AtomicU32>,
}

unsafe impl Trace for PendingExchanges {
    empty_trace!();
}

impl PendingExchanges {
    fn lock(&self) -> MutexGuard<'_, HashMap<u32, oneshot::Sender<ScriptOutcome>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn register(&self) -> (u32, oneshot::Receiver<ScriptOutcome>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = oneshot::channel();
        self.lock().insert(id, tx);
        (id, rx)
    }

    /// Hand the outcome to whoever waits on `id`. False if nobody does.
    pub(crate) fn settle(&self, id: u32, outcome: ScriptOutcome) -> bool {
        let Some(tx) = self.lock().remove(&id) else {
            return false;
        };
        tx.send(outcome).is_ok()
    }

    pub(crate) fn cancel(&self, id: u32) {
        self.lock().remove(&id);
    }

    pub(crate) fn fail_all(&self, reason: &str) {
        let drained: Vec<_> = self.lock().drain().collect();
        for (id, tx) in drained {
            log::warn!("[Ping script {}] Failing pending exchange: {}", id, reason);
            let _ = tx.send(Err(ScriptFailure::Message(reason.to_string())));
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_reaches_the_registered_waiter_once() {
        let pending = PendingExchanges::default();
        let (id, mut rx) = pending.register();
        assert_eq!(pending.len(), 1);

        assert!(pending.settle(id, Ok("reply".to_string())));
        assert!(!pending.settle(id, Ok("again".to_string())));
        assert_eq!(rx.try_recv().unwrap(), Ok("reply".to_string()));
        assert_eq!(pending.len(), 0);
    }

    #[test]
    fn cancelled_exchanges_ignore_late_outcomes() {
        let pending = PendingExchanges::default();
        let (id, _rx) = pending.register();
        pending.cancel(id);
        assert!(!pending.settle(id, Ok("late".to_string())));
    }

    #[test]
    fn fail_all_rejects_every_waiter() {
        let pending = PendingExchanges::default();
        let (first, mut a) = pending.register();
        let (second, mut b) = pending.register();
        assert_ne!(first, second);

        pending.fail_all("engine stopped");

        let stopped = Err(ScriptFailure::Message("engine stopped".to_string()));
        assert_eq!(a.try_recv().unwrap(), stopped);
        assert_eq!(b.try_recv().unwrap(), stopped);
        assert_eq!(pending.len(), 0);
    }
}
