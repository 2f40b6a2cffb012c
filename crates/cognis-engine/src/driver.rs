//! Shared engine handle and the fixed-rate background driver
//!
//! Both the request path and the background ticker go through one
//! `tokio::sync::Mutex`, held for exactly one evolution call. Nothing awaits
//! an external service while holding it.

use crate::anomaly::Anomaly;
use crate::engine::{CognitiveEngine, TickReport};
use crate::narrator::{build_request, Narrator};
use crate::persist::Persister;
use crate::quantum::goals::{GoalAttractor, GoalTarget};
use crate::quantum::measurement::DecisionRecord;
use crate::recurrence::Interaction;
use crate::state::CoreState;
use cognis_core::{EventMessage, GoalSource, Result, Snapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Buffered events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EngineHandle {
    engine: Arc<Mutex<CognitiveEngine>>,
    persister: Option<Arc<Persister>>,
    events: broadcast::Sender<EventMessage>,
}

impl EngineHandle {
    pub fn new(engine: CognitiveEngine) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { engine: Arc::new(Mutex::new(engine)), persister: None, events }
    }

    /// Hand every mutated state to `persister`.
    pub fn with_persister(mut self, persister: Arc<Persister>) -> Self {
        self.persister = Some(persister);
        self
    }

    pub fn persister(&self) -> Option<&Arc<Persister>> {
        self.persister.as_ref()
    }

    /// `tick` and `collapse` events for every evolution from either driver.
    pub fn subscribe(&self) -> broadcast::Receiver<EventMessage> {
        self.events.subscribe()
    }

    fn persist(&self, engine: &CognitiveEngine) {
        if let Some(p) = &self.persister {
            p.submit(engine.state().clone());
        }
    }

    fn publish_collapse(&self, record: &DecisionRecord) {
        let _ = self
            .events
            .send(EventMessage::collapse(record.basis, record.was_volitional, record.confidence));
    }

    /// One evolution under the lock, with the snapshot of the state it produced.
    async fn evolve(&self, f: impl FnOnce(&mut CognitiveEngine) -> TickReport) -> (TickReport, Snapshot) {
        let (report, snapshot) = {
            let mut engine = self.engine.lock().await;
            let report = f(&mut engine);
            self.persist(&engine);
            (report, engine.snapshot())
        };
        if self.events.receiver_count() > 0 {
            for record in report.quantum.passive.iter().chain(report.quantum.volitional.iter()) {
                self.publish_collapse(record);
            }
            let _ = self.events.send(EventMessage::tick(&snapshot));
        }
        (report, snapshot)
    }

    pub async fn interact(&self, input: Interaction) -> TickReport {
        self.evolve(|engine| engine.interact(&input)).await.0
    }

    /// Interact and return the snapshot of the resulting state, captured
    /// before any other caller can evolve it.
    pub async fn interact_with_snapshot(&self, input: Interaction) -> (TickReport, Snapshot) {
        self.evolve(|engine| engine.interact(&input)).await
    }

    pub async fn ambient_tick(&self) -> TickReport {
        self.evolve(CognitiveEngine::ambient_tick).await.0
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.engine.lock().await.snapshot()
    }

    pub async fn state(&self) -> CoreState {
        self.engine.lock().await.state().clone()
    }

    pub async fn set_goal_attractor(
        &self,
        target: GoalTarget,
        weight: f64,
        decay_rate: f64,
        source: GoalSource,
    ) -> Result<Option<GoalAttractor>> {
        let mut engine = self.engine.lock().await;
        let evicted = engine.set_goal_attractor(target, weight, decay_rate, source)?;
        self.persist(&engine);
        Ok(evicted)
    }

    pub async fn trigger_volitional_collapse(&self) -> Result<DecisionRecord> {
        let record = {
            let mut engine = self.engine.lock().await;
            let record = engine.trigger_volitional_collapse()?;
            self.persist(&engine);
            record
        };
        self.publish_collapse(&record);
        Ok(record)
    }

    /// Most recent anomalies, oldest first.
    pub async fn anomalies(&self) -> (u64, Vec<Anomaly>) {
        let engine = self.engine.lock().await;
        (engine.anomalies().total(), engine.anomalies().recent().cloned().collect())
    }

    /// Narrate the current state. The request is captured under the lock;
    /// the narrator runs after it is released.
    pub async fn narrate(&self, narrator: &dyn Narrator) -> Result<String> {
        let request = {
            let engine = self.engine.lock().await;
            build_request(&engine.snapshot())
        };
        debug!("narrating via {}", narrator.name());
        narrator.narrate(request).await
    }
}

/// Fixed-rate ambient ticker. Stop it with `stop()` or by cancelling its token.
pub struct BackgroundDriver {
    cancel: CancellationToken,
    task: JoinHandle<u64>,
}

impl BackgroundDriver {
    pub fn spawn(handle: EngineHandle, interval: Duration, cancel: CancellationToken) -> Self {
        let token = cancel.clone();
        let interval = interval.max(Duration::from_millis(1));
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;
            info!("Background driver started ({:?} interval)", interval);
            let mut ticks = 0u64;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let report = handle.ambient_tick().await;
                        ticks += 1;
                        if !report.anomalies.is_empty() {
                            debug!("ambient tick {} recorded {} anomalies", report.iteration, report.anomalies.len());
                        }
                    }
                }
            }
            info!("Background driver stopped after {} ticks", ticks);
            ticks
        });
        Self { cancel, task }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop after the in-flight tick (if any) and return the tick count.
    pub async fn stop(self) -> u64 {
        self.cancel.cancel();
        match self.task.await {
            Ok(ticks) => ticks,
            Err(e) => {
                warn!("Background driver task failed: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::narrator::TemplateNarrator;

    #[tokio::test]
    async fn handle_serializes_calls() {
        let handle = EngineHandle::new(CognitiveEngine::new(EngineConfig::default()));
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let h = handle.clone();
            tasks.push(tokio::spawn(async move { h.interact(Interaction::new(0.2, 0.0, 0.0)).await.iteration }));
        }
        let mut seen = Vec::new();
        for t in tasks {
            seen.push(t.await.unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, (1..=8).collect::<Vec<u64>>());
        assert_eq!(handle.snapshot().await.iteration, 8);
    }

    #[tokio::test]
    async fn subscribers_see_ticks_and_collapses() {
        let handle = EngineHandle::new(CognitiveEngine::new(EngineConfig::default()));
        let mut events = handle.subscribe();
        let (report, snapshot) = handle.interact_with_snapshot(Interaction::new(0.3, 0.0, 0.0)).await;
        assert_eq!(snapshot.iteration, report.iteration);

        let mut received = Vec::new();
        while let Ok(ev) = events.try_recv() {
            received.push(ev);
        }
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].event, "collapse");
        assert_eq!(received[1].event, "tick");
        assert_eq!(received[1].data["iteration"], report.iteration);

        let quiet = handle.ambient_tick().await;
        let tick = events.try_recv().unwrap();
        assert_eq!(tick.event, "tick");
        assert_eq!(tick.data["iteration"], quiet.iteration);
    }

    #[tokio::test]
    async fn narrate_releases_the_lock() {
        let handle = EngineHandle::new(CognitiveEngine::new(EngineConfig::default()));
        let text = handle.narrate(&TemplateNarrator).await.unwrap();
        assert!(text.starts_with("After 0 steps"));
        handle.interact(Interaction::new(0.0, 0.0, 0.0)).await;
    }
}
