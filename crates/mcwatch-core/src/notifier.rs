//! Edge-triggered population notifier.
//!
//! One notifier instance owns one `ongoing` flag. Each tick takes a fresh
//! snapshot and fires at most one event, only at the moment the population
//! crosses the threshold. A failed query leaves the flag untouched, so a
//! flaky upstream can never fake a session start or end.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::ping::{StatusSnapshot, StatusSource};

/// A threshold crossing, carrying the snapshot that triggered it.
#[derive(Debug, Clone)]
pub enum PopulationEvent {
    /// Population rose to or above the threshold.
    Started(StatusSnapshot),
    /// Population fell back below the threshold.
    Ended(StatusSnapshot),
}

impl PopulationEvent {
    pub fn snapshot(&self) -> &StatusSnapshot {
        match self {
            PopulationEvent::Started(snapshot) | PopulationEvent::Ended(snapshot) => snapshot,
        }
    }
}

/// Destination for population events. Delivery is at-most-once best-effort:
/// a failed send is logged and never retried.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: &PopulationEvent) -> Result<()>;
}

/// Watches one server's population against a fixed threshold.
pub struct ThresholdNotifier<S, K> {
    source: S,
    sink: K,
    threshold: u32,
    ongoing: bool,
}

impl<S, K> ThresholdNotifier<S, K>
where
    S: StatusSource,
    K: NotificationSink,
{
    pub fn new(source: S, sink: K, threshold: u32) -> Self {
        Self {
            source,
            sink,
            threshold,
            ongoing: false,
        }
    }

    /// Whether the last successful evaluation saw the population at or
    /// above the threshold.
    pub fn is_ongoing(&self) -> bool {
        self.ongoing
    }

    /// One tick: query, compare, emit on a crossing.
    ///
    /// Errors are terminal for this tick only; the notifier survives any
    /// number of consecutive failures with its state intact.
    pub async fn evaluate(&mut self) {
        let snapshot = match self.source.query().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!("status query failed, session state unchanged: {err:#}");
                return;
            }
        };

        if snapshot.online >= self.threshold && !self.ongoing {
            tracing::info!(
                online = snapshot.online,
                threshold = self.threshold,
                "session started"
            );
            self.deliver(PopulationEvent::Started(snapshot)).await;
            self.ongoing = true;
        } else if snapshot.online < self.threshold && self.ongoing {
            tracing::info!(
                online = snapshot.online,
                threshold = self.threshold,
                "session ended"
            );
            self.deliver(PopulationEvent::Ended(snapshot)).await;
            self.ongoing = false;
        }
    }

    async fn deliver(&self, event: PopulationEvent) {
        if let Err(err) = self.sink.notify(&event).await {
            tracing::warn!("notification delivery failed: {err:#}");
        }
    }

    /// Drives [`evaluate`](Self::evaluate) once per poll interval until
    /// cancelled. The loop owns the notifier, so the `ongoing` flag has a
    /// single writer for the process lifetime.
    pub async fn run(mut self, poll_interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("population watch stopped");
                    return;
                }
                _ = ticker.tick() => self.evaluate().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use anyhow::{anyhow, bail};

    use super::*;

    fn snapshot(online: u32) -> StatusSnapshot {
        StatusSnapshot {
            online,
            max: 100,
            version_name: "1.20".to_string(),
            motd: String::new(),
            motd_clean: String::new(),
            sample: None,
        }
    }

    /// Replays a fixed sequence of query outcomes.
    struct ScriptedSource {
        outcomes: Mutex<VecDeque<Result<StatusSnapshot>>>,
    }

    impl ScriptedSource {
        fn new(outcomes: Vec<Result<StatusSnapshot>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
            }
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedSource {
        async fn query(&self) -> Result<StatusSnapshot> {
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("script exhausted")))
        }
    }

    /// Records delivered events as compact labels.
    #[derive(Clone, Default)]
    struct RecordingSink {
        events: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl RecordingSink {
        fn failing(self) -> Self {
            Self { fail: true, ..self }
        }

        fn labels(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn notify(&self, event: &PopulationEvent) -> Result<()> {
            let label = match event {
                PopulationEvent::Started(snapshot) => format!("started:{}", snapshot.online),
                PopulationEvent::Ended(snapshot) => format!("ended:{}", snapshot.online),
            };
            self.events.lock().unwrap().push(label);
            if self.fail {
                bail!("sink unavailable");
            }
            Ok(())
        }
    }

    async fn drive(
        outcomes: Vec<Result<StatusSnapshot>>,
        sink: RecordingSink,
        threshold: u32,
    ) -> ThresholdNotifier<ScriptedSource, RecordingSink> {
        let ticks = outcomes.len();
        let mut notifier = ThresholdNotifier::new(ScriptedSource::new(outcomes), sink, threshold);
        for _ in 0..ticks {
            notifier.evaluate().await;
        }
        notifier
    }

    #[tokio::test]
    async fn start_quiet_tick_end_failure() {
        let sink = RecordingSink::default();
        let notifier = drive(
            vec![
                Ok(snapshot(25)),
                Ok(snapshot(22)),
                Ok(snapshot(10)),
                Err(anyhow!("unreachable")),
            ],
            sink.clone(),
            20,
        )
        .await;

        assert_eq!(sink.labels(), vec!["started:25", "ended:10"]);
        assert!(!notifier.is_ongoing());
    }

    #[tokio::test]
    async fn one_event_per_crossing_regardless_of_run_length() {
        let sink = RecordingSink::default();
        let counts = [5, 25, 30, 28, 22, 19, 3, 40, 41];
        let notifier = drive(
            counts.iter().map(|&c| Ok(snapshot(c))).collect(),
            sink.clone(),
            20,
        )
        .await;

        assert_eq!(sink.labels(), vec!["started:25", "ended:19", "started:40"]);
        assert!(notifier.is_ongoing());
    }

    #[tokio::test]
    async fn failures_are_transition_neutral() {
        let sink = RecordingSink::default();
        let notifier = drive(
            vec![
                Ok(snapshot(30)),
                Err(anyhow!("timeout")),
                Err(anyhow!("refused")),
                Ok(snapshot(31)),
            ],
            sink.clone(),
            20,
        )
        .await;

        // The outage while ongoing must not be read as "ended".
        assert_eq!(sink.labels(), vec!["started:30"]);
        assert!(notifier.is_ongoing());
    }

    #[tokio::test]
    async fn failure_before_any_success_emits_nothing() {
        let sink = RecordingSink::default();
        let notifier = drive(
            vec![Err(anyhow!("down")), Err(anyhow!("still down"))],
            sink.clone(),
            20,
        )
        .await;

        assert!(sink.labels().is_empty());
        assert!(!notifier.is_ongoing());
    }

    #[tokio::test]
    async fn sustained_low_population_stays_silent() {
        let sink = RecordingSink::default();
        let notifier = drive(
            (0..10).map(|_| Ok(snapshot(4))).collect(),
            sink.clone(),
            20,
        )
        .await;

        assert!(sink.labels().is_empty());
        assert!(!notifier.is_ongoing());
    }

    #[tokio::test]
    async fn exact_threshold_starts_and_keeps_a_session() {
        let sink = RecordingSink::default();
        let notifier = drive(
            vec![Ok(snapshot(20)), Ok(snapshot(20)), Ok(snapshot(19))],
            sink.clone(),
            20,
        )
        .await;

        assert_eq!(sink.labels(), vec!["started:20", "ended:19"]);
        assert!(!notifier.is_ongoing());
    }

    #[tokio::test]
    async fn sink_failure_does_not_repeat_the_event() {
        let sink = RecordingSink::default().failing();
        let notifier = drive(
            vec![Ok(snapshot(25)), Ok(snapshot(26)), Ok(snapshot(27))],
            sink.clone(),
            20,
        )
        .await;

        // Delivery failed, but the transition happened exactly once.
        assert_eq!(sink.labels(), vec!["started:25"]);
        assert!(notifier.is_ongoing());
    }
}
