use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use uspace_em::{
    collaborators::{
        Collaborators, DeconflictionPlannerPort, DeconflictionRequest,
        testing::{
            RecordingGeofenceStore, RecordingNotificationDelivery, ScriptedPlanner,
            StaticOperationCatalog,
        },
    },
    config::{DispatchConfig, ResolutionCycleConfig, TickMissedBehavior},
    cycle::ResolutionCycle,
    dispatch::{RETURN_TO_PLAN_TEXT, StrategyDispatcher},
    error::{EmergencyError, EmergencyErrorKind},
    feedback::FeedbackHandler,
    intake::IntakeHandler,
    ledger::{SharedLedger, ThreatStatus},
    types::{DeconflictionPlan, ManeuverType, PilotAnswer, Threat, ThreatId},
};

fn threat(threat_id: ThreatId, category: &str, uavs: &[u64]) -> Threat {
    serde_json::from_value(json!({
        "threat_id": threat_id,
        "category": category,
        "detected_at": "2026-05-04T08:30:00Z",
        "affected_uav_ids": uavs,
        "location": {"x": 3.0, "y": 4.0},
    }))
    .expect("threat fixture should decode")
}

fn hover_plan(uav_id: u64) -> DeconflictionPlan {
    DeconflictionPlan {
        uav_id,
        maneuver_type: ManeuverType::Hover,
        waypoints: Vec::new(),
        cost: 1.0,
        riskiness: 1.0,
    }
}

fn quick_config() -> ResolutionCycleConfig {
    ResolutionCycleConfig {
        interval_ms: 20,
        tick_missed_behavior: TickMissedBehavior::Skip,
    }
}

struct Fixture {
    ledger: SharedLedger,
    delivery: Arc<RecordingNotificationDelivery>,
    geofences: Arc<RecordingGeofenceStore>,
    cycle: ResolutionCycle,
}

impl Fixture {
    fn new(planner: Arc<dyn DeconflictionPlannerPort>) -> Self {
        Self::with_ledger(SharedLedger::new(), planner)
    }

    fn with_ledger(ledger: SharedLedger, planner: Arc<dyn DeconflictionPlannerPort>) -> Self {
        let delivery = Arc::new(RecordingNotificationDelivery::default());
        let geofences = Arc::new(RecordingGeofenceStore::default());
        let collaborators = Collaborators {
            planner,
            geofence_store: geofences.clone(),
            notifications: delivery.clone(),
            operations: Arc::new(StaticOperationCatalog::default()),
        };
        let dispatcher = Arc::new(StrategyDispatcher::new(
            &collaborators,
            DispatchConfig::default(),
        ));
        let cycle = ResolutionCycle::new(
            ledger.clone(),
            dispatcher,
            collaborators.notifications.clone(),
            quick_config(),
        );
        Self {
            ledger,
            delivery,
            geofences,
            cycle,
        }
    }

    fn intake(&self) -> IntakeHandler {
        IntakeHandler::new(self.ledger.clone())
    }

    fn feedback(&self) -> FeedbackHandler {
        FeedbackHandler::new(self.ledger.clone())
    }
}

/// Planner that changes the ledger while the sweep is waiting on it.
struct InterferingPlanner {
    ledger: SharedLedger,
    interference: Interference,
}

enum Interference {
    Submit(Threat),
    Reject(ThreatId),
}

#[async_trait]
impl DeconflictionPlannerPort for InterferingPlanner {
    async fn request_deconfliction(
        &self,
        req: DeconflictionRequest,
    ) -> Result<Vec<DeconflictionPlan>, EmergencyError> {
        match &self.interference {
            Interference::Submit(threat) => {
                self.ledger.insert(threat.clone()).await;
            }
            Interference::Reject(threat_id) => {
                self.ledger
                    .apply_pilot_answer(*threat_id, PilotAnswer::Rejected)
                    .await?;
            }
        }
        Ok(vec![hover_plan(req.threat.affected_uav_ids[0])])
    }
}

#[tokio::test]
async fn given_direct_notify_threat_when_swept_then_one_notification_is_delivered() {
    let mut fixture = Fixture::new(Arc::new(ScriptedPlanner::default()));
    fixture.intake().submit(threat(1, "uas_in_cv", &[5])).await;

    let report = fixture.cycle.sweep().await;

    assert_eq!(report.cycle_id, 1);
    assert_eq!(report.snapshot_len, 1);
    assert_eq!(report.notified, vec![1]);
    assert!(report.failures.is_empty());

    let delivered = fixture.delivery.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].uav_id, 5);
    assert_eq!(delivered[0].description, RETURN_TO_PLAN_TEXT);

    let record = fixture.ledger.get(1).await.expect("threat should remain");
    assert_eq!(record.status, ThreatStatus::Notified);
    assert_eq!(record.notified_count, 1);
    assert_eq!(record.last_notification.as_ref(), Some(&delivered[0]));
}

#[tokio::test]
async fn given_notified_threat_when_swept_again_then_it_is_not_renotified() {
    let mut fixture = Fixture::new(Arc::new(ScriptedPlanner::default()));
    fixture.intake().submit(threat(1, "uas_in_cv", &[5])).await;

    fixture.cycle.sweep().await;
    let second = fixture.cycle.sweep().await;

    assert_eq!(second.snapshot_len, 0);
    assert_eq!(fixture.delivery.batches().len(), 1, "empty sweeps deliver nothing");
}

#[tokio::test]
async fn given_full_pilot_round_trip_when_rejected_then_accepted_then_threat_is_resolved() {
    let planner = Arc::new(ScriptedPlanner::returning(vec![hover_plan(9)]));
    let mut fixture = Fixture::new(planner.clone());
    fixture.intake().submit(threat(4, "loss_of_separation", &[9])).await;

    fixture.cycle.sweep().await;
    fixture
        .feedback()
        .submit_answer(4, PilotAnswer::Rejected)
        .await
        .expect("rejection should apply");

    let retry = fixture.cycle.sweep().await;
    assert_eq!(retry.notified, vec![4]);
    assert_eq!(planner.requests().len(), 2);

    let record = fixture.ledger.get(4).await.expect("threat should remain");
    assert_eq!(record.notified_count, 2);

    fixture
        .feedback()
        .submit_answer(4, PilotAnswer::Accepted)
        .await
        .expect("acceptance should apply");
    assert!(fixture.ledger.get(4).await.is_none());
    assert_eq!(fixture.delivery.delivered().len(), 2);
    assert!(
        fixture
            .delivery
            .delivered()
            .iter()
            .all(|n| n.action == Some(ManeuverType::Hover))
    );
}

#[tokio::test]
async fn given_threat_submitted_mid_sweep_when_swept_then_it_waits_for_next_sweep() {
    let ledger = SharedLedger::new();
    let planner = Arc::new(InterferingPlanner {
        ledger: ledger.clone(),
        interference: Interference::Submit(threat(2, "uas_in_cv", &[6])),
    });
    let mut fixture = Fixture::with_ledger(ledger, planner);
    fixture.intake().submit(threat(1, "uas_out_ov", &[5])).await;

    let first = fixture.cycle.sweep().await;
    assert_eq!(first.snapshot_len, 1);
    assert_eq!(first.notified, vec![1]);
    let late = fixture.ledger.get(2).await.expect("late threat is recorded");
    assert_eq!(late.status, ThreatStatus::Pending);

    let second = fixture.cycle.sweep().await;
    assert_eq!(second.notified, vec![2]);
}

#[tokio::test]
async fn given_rejection_lands_mid_sweep_when_committing_then_threat_stays_pending() {
    let ledger = SharedLedger::new();
    let planner = Arc::new(InterferingPlanner {
        ledger: ledger.clone(),
        interference: Interference::Reject(1),
    });
    let mut fixture = Fixture::with_ledger(ledger, planner);
    fixture.intake().submit(threat(1, "geofence_conflict", &[5])).await;

    let report = fixture.cycle.sweep().await;

    assert!(report.notified.is_empty());
    assert_eq!(report.stale, vec![1]);
    assert!(
        fixture.delivery.batches().is_empty(),
        "a stale outcome is never delivered"
    );
    let record = fixture.ledger.get(1).await.expect("threat should remain");
    assert_eq!(record.status, ThreatStatus::Pending);
    assert_eq!(record.notified_count, 0);
}

#[tokio::test]
async fn given_one_failing_threat_when_swept_then_the_others_still_progress() {
    let mut fixture = Fixture::new(Arc::new(ScriptedPlanner::default()));
    let intake = fixture.intake();
    intake.submit(threat(1, "volcanic_ash", &[5])).await;
    intake.submit(threat(2, "gnss_degradation", &[6])).await;
    intake.submit(threat(3, "communication_failure", &[7])).await;

    let report = fixture.cycle.sweep().await;

    assert_eq!(report.notified, vec![3]);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(
        report.failed(1).map(|err| err.kind),
        Some(EmergencyErrorKind::UnsupportedThreatCategory)
    );
    assert_eq!(
        report.failed(2).map(|err| err.kind),
        Some(EmergencyErrorKind::NoCandidates)
    );

    for threat_id in [1, 2] {
        let record = fixture.ledger.get(threat_id).await.expect("threat should remain");
        assert_eq!(record.status, ThreatStatus::Pending);
    }
}

#[tokio::test]
async fn given_delivery_failure_when_swept_then_records_stay_notified() {
    let mut fixture = Fixture::new(Arc::new(ScriptedPlanner::default()));
    fixture.delivery.set_failing(true);
    fixture.intake().submit(threat(1, "technical_failure", &[5])).await;

    let report = fixture.cycle.sweep().await;

    assert_eq!(report.notified, vec![1]);
    let delivery_error = report.delivery_error.expect("delivery failure is reported");
    assert_eq!(delivery_error.kind, EmergencyErrorKind::CollaboratorUnavailable);
    assert!(report.delivered.is_empty());
    assert_eq!(
        fixture.ledger.get(1).await.map(|record| record.status),
        Some(ThreatStatus::Notified)
    );
}

#[tokio::test]
async fn given_running_cycle_when_threat_arrives_then_it_is_notified_until_cancelled() {
    let fixture = Fixture::new(Arc::new(ScriptedPlanner::default()));
    let ledger = fixture.ledger.clone();
    let delivery = fixture.delivery.clone();
    let intake = fixture.intake();
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(fixture.cycle.run(shutdown.clone()));

    intake.submit(threat(1, "spoofing_attack", &[5])).await;
    tokio::time::timeout(Duration::from_secs(5), async {
        while delivery.delivered().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("cycle should notify within the timeout");

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("cycle should stop after cancellation")
        .expect("cycle task should not panic");

    assert_eq!(
        ledger.get(1).await.map(|record| record.status),
        Some(ThreatStatus::Notified)
    );
}

#[tokio::test]
async fn given_broadcast_with_nothing_to_send_when_swept_then_threat_stays_pending() {
    let mut fixture = Fixture::new(Arc::new(ScriptedPlanner::default()));
    let mut unlocated = threat(77, "alert_warning", &[]);
    unlocated.location = None;
    fixture.intake().submit(unlocated).await;

    let report = fixture.cycle.sweep().await;

    assert!(report.notified.is_empty());
    assert_eq!(
        report.failed(77).map(|err| err.kind),
        Some(EmergencyErrorKind::InvalidThreat)
    );
    assert!(fixture.delivery.batches().is_empty());
    let record = fixture.ledger.get(77).await.expect("threat should remain");
    assert_eq!(record.status, ThreatStatus::Pending);
    assert_eq!(record.last_notification, None);
}

#[tokio::test]
async fn given_fenced_threat_rejected_repeatedly_when_reswept_then_one_fence_is_reused() {
    let mut fixture = Fixture::new(Arc::new(ScriptedPlanner::default()));
    fixture.intake().submit(threat(5, "jamming_attack", &[9])).await;

    for _ in 0..3 {
        let report = fixture.cycle.sweep().await;
        assert_eq!(report.notified, vec![5]);
        fixture
            .feedback()
            .submit_answer(5, PilotAnswer::Rejected)
            .await
            .expect("rejection should apply");
    }

    let ids: Vec<_> = fixture
        .geofences
        .writes()
        .iter()
        .flat_map(|write| write.geofence_ids.clone())
        .collect();
    assert_eq!(ids, vec![5, 5, 5]);
}
