//! Runs exchanges off the caller's thread and hands the outcomes back.
//!
//! Bevy systems cannot await, so [`PingClient::submit`] spawns the exchange on
//! the shared runtime and a system drains [`PingReportReceiver`] every frame.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};

use bevy::prelude::Resource;

use crate::ping::{ExchangeOutcome, PingBackend, PingError, PingRequest};
use crate::runtime;

/// A finished exchange.
#[derive(Debug)]
pub struct PingReport {
    pub id: u64,
    pub outcome: ExchangeOutcome,
}

/// Thread-safe handle for starting exchanges.
#[derive(Resource, Clone)]
pub struct PingClient {
    backend: Arc<dyn PingBackend>,
    reports: SyncSender<PingReport>,
    next_id: Arc<AtomicU64>,
}

/// Receiving end for [`PingReport`]s.
#[derive(Resource)]
pub struct PingReportReceiver {
    rx: Mutex<Receiver<PingReport>>,
}

impl PingReportReceiver {
    /// Take the next finished exchange without blocking.
    pub fn try_recv(&self) -> Option<PingReport> {
        self.rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_recv()
            .ok()
    }

    /// Block until the next report arrives.
    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<PingReport> {
        self.rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv_timeout(timeout)
            .ok()
    }
}

impl PingClient {
    pub fn new(backend: Arc<dyn PingBackend>) -> (PingClient, PingReportReceiver) {
        let (reports, rx) = mpsc::sync_channel(64);

        (
            PingClient {
                backend,
                reports,
                next_id: Arc::new(AtomicU64::new(1)),
            },
            PingReportReceiver { rx: Mutex::new(rx) },
        )
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Start an exchange and return its id right away.
    ///
    /// Exactly one [`PingReport`] with this id is delivered later, even if the
    /// task is torn down before the exchange finishes.
    pub fn submit(&self, request: PingRequest) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let backend = self.backend.clone();
        let guard = ReportGuard {
            id,
            reports: Some(self.reports.clone()),
        };

        log::info!(
            "[Ping {}] Submitting exchange with {} via {} backend",
            id,
            request.endpoint,
            backend.name()
        );

        runtime::handle().spawn(async move {
            let outcome = backend.exchange(request).await.into();
            guard.deliver(outcome);
        });

        id
    }
}

/// Delivers a report when the exchange finishes, or a failure when dropped first.
struct ReportGuard {
    id: u64,
    reports: Option<SyncSender<PingReport>>,
}

impl ReportGuard {
    fn deliver(mut self, outcome: ExchangeOutcome) {
        if let Some(reports) = self.reports.take() {
            send_report(&reports, PingReport { id: self.id, outcome });
        }
    }
}

impl Drop for ReportGuard {
    fn drop(&mut self) {
        if let Some(reports) = self.reports.take() {
            log::warn!("[Ping {}] Exchange task ended without an outcome", self.id);
            let outcome = ExchangeOutcome::Failed(PingError::Unavailable(
                "exchange was aborted".to_string(),
            ));
            send_report(&reports, PingReport { id: self.id, outcome });
        }
    }
}

fn send_report(reports: &SyncSender<PingReport>, report: PingReport) {
    let id = report.id;
    match reports.try_send(report) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            log::error!("[Ping {}] Report queue is full, dropping outcome", id);
        }
        Err(TrySendError::Disconnected(_)) => {
            log::debug!("[Ping {}] Nobody is listening for the outcome", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::FutureExt;
    use futures_util::future::BoxFuture;

    use super::*;
    use crate::ping::Endpoint;

    struct Canned(&'static str);

    impl PingBackend for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        fn exchange(&self, request: PingRequest) -> BoxFuture<'_, Result<String, PingError>> {
            let reply = format!("{}:{}", self.0, request.message);
            async move { Ok(reply) }.boxed()
        }
    }

    struct Panics;

    impl PingBackend for Panics {
        fn name(&self) -> &'static str {
            "panics"
        }

        fn exchange(&self, _request: PingRequest) -> BoxFuture<'_, Result<String, PingError>> {
            futures_util::future::lazy(|_| -> Result<String, PingError> {
                panic!("backend blew up")
            })
            .boxed()
        }
    }

    fn request(message: &str) -> PingRequest {
        PingRequest::new(Endpoint::parse("ws://127.0.0.1:9/").unwrap(), message)
    }

    #[test]
    fn submit_delivers_report_with_matching_id() {
        let (client, receiver) = PingClient::new(Arc::new(Canned("echo")));
        assert_eq!(client.backend_name(), "canned");

        let id = client.submit(request("hello"));
        let report = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("report should arrive");

        assert_eq!(report.id, id);
        assert_eq!(report.outcome.into_result().unwrap(), "echo:hello");
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn ids_are_unique_per_submission() {
        let (client, receiver) = PingClient::new(Arc::new(Canned("x")));
        let first = client.submit(request("a"));
        let second = client.submit(request("b"));
        assert_ne!(first, second);

        let mut seen = vec![
            receiver.recv_timeout(Duration::from_secs(5)).unwrap().id,
            receiver.recv_timeout(Duration::from_secs(5)).unwrap().id,
        ];
        seen.sort();
        assert_eq!(seen, vec![first.min(second), first.max(second)]);
    }

    #[test]
    fn aborted_task_still_reports_failure() {
        let (client, receiver) = PingClient::new(Arc::new(Panics));
        let id = client.submit(request("boom"));

        let report = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("guard should report on unwind");
        assert_eq!(report.id, id);
        assert!(matches!(
            report.outcome,
            ExchangeOutcome::Failed(PingError::Unavailable(_))
        ));
    }
}
