//! One analysis cycle at a time: reconcile, ask the remote model once, fall
//! back locally, publish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Settings;
use crate::extract::{ChartDataReconciler, DataOrigin, ExtractionContext};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::page::PageSnapshot;
use crate::predict::LocalPredictor;
use crate::remote::InferenceClient;
use crate::{Insight, PublishError, UtcDateTime};

/// Receives every completed insight. Delivery is best effort.
pub trait InsightListener: Send + Sync {
    fn name(&self) -> &str;
    fn deliver(&self, insight: &Insight) -> Result<(), PublishError>;
}

/// Forwards insights into a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    name: String,
    sender: UnboundedSender<Insight>,
}

impl ChannelListener {
    pub fn new(name: impl Into<String>, sender: UnboundedSender<Insight>) -> Self {
        Self {
            name: name.into(),
            sender,
        }
    }
}

impl InsightListener for ChannelListener {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&self, insight: &Insight) -> Result<(), PublishError> {
        self.sender
            .send(insight.clone())
            .map_err(|_| PublishError::Closed {
                listener: self.name.clone(),
            })
    }
}

/// What one completed cycle produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub origin: DataOrigin,
    /// Whether the remote model supplied the insight.
    pub remote: bool,
    pub delivered: usize,
    pub insight: Insight,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Another cycle was already running; nothing happened.
    Skipped,
}

impl CycleOutcome {
    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Skipped => None,
        }
    }
}

/// Clears the in-flight flag when the cycle ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Process-scoped analysis state.
pub struct AnalysisSession {
    settings: Settings,
    reconciler: ChartDataReconciler,
    predictor: LocalPredictor,
    remote: Option<InferenceClient>,
    in_flight: AtomicBool,
    connected: AtomicBool,
    last_insight: Mutex<Option<Insight>>,
    listeners: Vec<Arc<dyn InsightListener>>,
}

impl AnalysisSession {
    /// Session that talks to `settings.api_endpoint` over reqwest.
    pub fn from_settings(settings: Settings) -> Self {
        Self::with_http_client(settings, Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_http_client(settings: Settings, http_client: Arc<dyn HttpClient>) -> Self {
        let remote = InferenceClient::new(http_client, settings.api_endpoint.clone())
            .with_api_key(settings.api_key.clone())
            .with_timeout_ms(settings.request_timeout_ms);
        Self::build(settings, Some(remote))
    }

    /// Session that never contacts a remote model.
    pub fn offline(settings: Settings) -> Self {
        Self::build(settings, None)
    }

    fn build(settings: Settings, remote: Option<InferenceClient>) -> Self {
        Self {
            settings,
            reconciler: ChartDataReconciler::new(),
            predictor: LocalPredictor::new(),
            remote,
            in_flight: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            last_insight: Mutex::new(None),
            listeners: Vec::new(),
        }
    }

    pub fn with_reconciler(mut self, reconciler: ChartDataReconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn InsightListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn remote(&self) -> Option<&InferenceClient> {
        self.remote.as_ref()
    }

    /// Whether the most recent remote attempt (cycle or health check) succeeded.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn last_insight(&self) -> Option<Insight> {
        self.last_insight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn run_cycle(&self, page: &PageSnapshot) -> CycleOutcome {
        self.run_cycle_at(page, UtcDateTime::now()).await
    }

    /// Run one cycle with `now` as the extraction and prediction instant.
    pub async fn run_cycle_at(&self, page: &PageSnapshot, now: UtcDateTime) -> CycleOutcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("analysis cycle already in flight; trigger coalesced");
            return CycleOutcome::Skipped;
        };

        let cycle_id = Uuid::new_v4();
        let span = info_span!("analysis_cycle", %cycle_id);
        let report = self.cycle(cycle_id, page, now).instrument(span).await;
        CycleOutcome::Completed(report)
    }

    async fn cycle(&self, cycle_id: Uuid, page: &PageSnapshot, now: UtcDateTime) -> CycleReport {
        let reconciled = self.reconciler.reconcile(page, &ExtractionContext::at(now));

        let remote_insight = match &self.remote {
            Some(client) => match client.analyze(&reconciled.data).await {
                Ok(insight) => Some(insight),
                Err(error) => {
                    warn!(
                        code = error.code(),
                        %error,
                        "remote inference failed; using local predictor"
                    );
                    None
                }
            },
            None => None,
        };
        let remote = remote_insight.is_some();
        let mut insight =
            remote_insight.unwrap_or_else(|| self.predictor.predict(&reconciled.data, now));
        insight.warnings.extend(reconciled.warnings);

        self.connected.store(remote, Ordering::SeqCst);
        *self
            .last_insight
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(insight.clone());
        let delivered = self.publish(&insight);

        info!(
            symbol = %reconciled.data.symbol,
            origin = reconciled.origin.as_str(),
            remote,
            direction = insight.prediction.direction.as_str(),
            confidence = insight.prediction.confidence,
            delivered,
            "analysis cycle completed"
        );

        CycleReport {
            cycle_id,
            origin: reconciled.origin,
            remote,
            delivered,
            insight,
        }
    }

    /// Deliver to every listener; returns how many accepted it.
    pub fn publish(&self, insight: &Insight) -> usize {
        self.listeners
            .iter()
            .filter(|listener| match listener.deliver(insight) {
                Ok(()) => true,
                Err(error) => {
                    warn!(listener = listener.name(), %error, "insight delivery failed");
                    false
                }
            })
            .count()
    }

    /// Query the remote health route and record the result. Offline sessions
    /// are never connected.
    pub async fn check_health(&self) -> bool {
        let healthy = match &self.remote {
            Some(client) => match client.health().await {
                Ok(report) => report.is_healthy(),
                Err(error) => {
                    warn!(code = error.code(), %error, "health check failed");
                    false
                }
            },
            None => false,
        };
        self.connected.store(healthy, Ordering::SeqCst);
        healthy
    }
}

impl std::fmt::Debug for AnalysisSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisSession")
            .field("settings", &self.settings)
            .field("remote", &self.remote)
            .field("in_flight", &self.is_in_flight())
            .field("connected", &self.is_connected())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rejecting;

    impl InsightListener for Rejecting {
        fn name(&self) -> &str {
            "rejecting"
        }

        fn deliver(&self, _insight: &Insight) -> Result<(), PublishError> {
            Err(PublishError::Failed {
                listener: String::from("rejecting"),
                reason: String::from("overlay detached"),
            })
        }
    }

    #[test]
    fn in_flight_guard_is_exclusive_and_released_on_drop() {
        let flag = AtomicBool::new(false);
        let guard = InFlight::acquire(&flag).expect("first acquire");
        assert!(InFlight::acquire(&flag).is_none());
        drop(guard);
        assert!(!flag.load(Ordering::SeqCst));
        assert!(InFlight::acquire(&flag).is_some());
    }

    #[tokio::test]
    async fn offline_cycle_uses_local_predictor() {
        let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
        let session = AnalysisSession::offline(Settings::default())
            .with_reconciler(ChartDataReconciler::new().with_demo_seed(5))
            .with_listener(Arc::new(Rejecting))
            .with_listener(Arc::new(ChannelListener::new("channel", sender)));

        let outcome = session.run_cycle(&PageSnapshot::default()).await;
        let report = outcome.report().expect("cycle completed");

        assert_eq!(report.origin, DataOrigin::Synthetic);
        assert!(!report.remote);
        assert_eq!(report.delivered, 1);
        assert!(!session.is_connected());
        assert!(!session.is_in_flight());
        assert_eq!(session.last_insight().as_ref(), Some(&report.insight));
        assert_eq!(receiver.recv().await.as_ref(), Some(&report.insight));
    }
}
