use std::sync::Arc;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    collaborators::NotificationDeliveryPort,
    config::{ResolutionCycleConfig, TickMissedBehavior},
    dispatch::{DispatchOutcome, StrategyDispatcher},
    error::EmergencyError,
    ledger::{CommitOutcome, SharedLedger},
    types::{Notification, ThreatId},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ThreatFailure {
    pub threat_id: ThreatId,
    pub error: EmergencyError,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SweepReport {
    pub cycle_id: u64,
    pub snapshot_len: usize,
    pub notified: Vec<ThreatId>,
    pub stale: Vec<ThreatId>,
    pub failures: Vec<ThreatFailure>,
    pub side_effect_failures: Vec<ThreatFailure>,
    pub delivered: Vec<Notification>,
    pub delivery_error: Option<EmergencyError>,
}

impl SweepReport {
    pub fn failed(&self, threat_id: ThreatId) -> Option<&EmergencyError> {
        self.failures
            .iter()
            .find(|failure| failure.threat_id == threat_id)
            .map(|failure| &failure.error)
    }
}

struct Produced {
    threat_id: ThreatId,
    revision: u64,
    outcome: DispatchOutcome,
}

pub struct ResolutionCycle {
    cycle_id: u64,
    ledger: SharedLedger,
    dispatcher: Arc<StrategyDispatcher>,
    notifications: Arc<dyn NotificationDeliveryPort>,
    config: ResolutionCycleConfig,
}

impl ResolutionCycle {
    pub fn new(
        ledger: SharedLedger,
        dispatcher: Arc<StrategyDispatcher>,
        notifications: Arc<dyn NotificationDeliveryPort>,
        config: ResolutionCycleConfig,
    ) -> Self {
        Self {
            cycle_id: 0,
            ledger,
            dispatcher,
            notifications,
            config,
        }
    }

    pub fn cycle_id(&self) -> u64 {
        self.cycle_id
    }

    #[tracing::instrument(name = "resolution_cycle_run", target = "cycle", skip_all)]
    pub async fn run(mut self, shutdown: CancellationToken) {
        let period = self.config.interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(match self.config.tick_missed_behavior {
            TickMissedBehavior::Skip => MissedTickBehavior::Skip,
            TickMissedBehavior::Delay => MissedTickBehavior::Delay,
        });

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.sweep().await;
                }
            }
        }

        tracing::info!(target: "cycle", cycle_id = self.cycle_id, "resolution_cycle_stopped");
    }

    /// One snapshot, dispatch, commit, deliver pass over the pending threats.
    #[tracing::instrument(
        name = "resolution_cycle_sweep",
        target = "cycle",
        skip(self),
        fields(cycle_id = self.cycle_id + 1)
    )]
    pub async fn sweep(&mut self) -> SweepReport {
        self.cycle_id = self.cycle_id.saturating_add(1);
        let mut report = SweepReport {
            cycle_id: self.cycle_id,
            ..SweepReport::default()
        };

        let snapshot = self.ledger.get_pending().await;
        let counts = self.ledger.status_counts().await;
        report.snapshot_len = snapshot.len();
        tracing::info!(
            target: "cycle",
            cycle_id = self.cycle_id,
            active = counts.active(),
            pending = counts.pending,
            notified = counts.notified,
            "sweep_started"
        );

        let mut produced = Vec::with_capacity(snapshot.len());
        for record in snapshot {
            let threat_id = record.threat_id();
            match self.dispatcher.resolve(&record.threat).await {
                Ok(outcome) => produced.push(Produced {
                    threat_id,
                    revision: record.revision,
                    outcome,
                }),
                Err(error) => {
                    tracing::warn!(
                        target: "cycle",
                        cycle_id = self.cycle_id,
                        threat_id = threat_id,
                        category = %record.threat.category,
                        error_kind = error.kind.as_str(),
                        error = %error,
                        "threat_left_pending"
                    );
                    report.failures.push(ThreatFailure { threat_id, error });
                }
            }
        }

        let mut batch = Vec::new();
        for Produced {
            threat_id,
            revision,
            outcome,
        } in produced
        {
            report
                .side_effect_failures
                .extend(outcome.side_effect_failures.into_iter().map(|error| ThreatFailure {
                    threat_id,
                    error,
                }));

            let primary = outcome.notifications.first().cloned();
            match self.ledger.mark_notified(threat_id, revision, primary).await {
                CommitOutcome::Committed => {
                    report.notified.push(threat_id);
                    batch.extend(outcome.notifications);
                }
                CommitOutcome::Stale { status, revision } => {
                    tracing::info!(
                        target: "cycle",
                        cycle_id = self.cycle_id,
                        threat_id = threat_id,
                        status = ?status,
                        revision = revision,
                        "sweep_commit_stale"
                    );
                    report.stale.push(threat_id);
                }
                CommitOutcome::Missing => {
                    tracing::info!(
                        target: "cycle",
                        cycle_id = self.cycle_id,
                        threat_id = threat_id,
                        "sweep_commit_missing"
                    );
                    report.stale.push(threat_id);
                }
            }
        }

        if !batch.is_empty() {
            match self.notifications.deliver(batch.clone()).await {
                Ok(()) => {
                    tracing::info!(
                        target: "cycle",
                        cycle_id = self.cycle_id,
                        delivered = batch.len(),
                        "notifications_delivered"
                    );
                    report.delivered = batch;
                }
                Err(error) => {
                    tracing::warn!(
                        target: "cycle",
                        cycle_id = self.cycle_id,
                        undelivered = batch.len(),
                        error = %error,
                        "notification_delivery_failed"
                    );
                    report.delivery_error = Some(error);
                }
            }
        }

        tracing::debug!(
            target: "cycle",
            cycle_id = self.cycle_id,
            snapshot = report.snapshot_len,
            notified = report.notified.len(),
            stale = report.stale.len(),
            failed = report.failures.len(),
            "sweep_finished"
        );
        report
    }
}
