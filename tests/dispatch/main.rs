use std::sync::Arc;

use serde_json::json;

use uspace_em::{
    collaborators::{
        Collaborators, KnownAirspace,
        testing::{
            RecordingGeofenceStore, RecordingNotificationDelivery, ScriptedPlanner,
            StaticOperationCatalog,
        },
    },
    config::DispatchConfig,
    dispatch::{
        ACTIVATE_FTS_TEXT, CONTAINMENT_GEOFENCE_CEILING, EMERGENCY_LANDING_TEXT,
        HAZARD_WARNING_TEXT, LAND_IN_GEOFENCE_TEXT, MANUAL_CONTROL_TEXT,
        PROTECTIVE_GEOFENCE_CEILING, RETURN_TO_PLAN_TEXT, StrategyDispatcher, StrategyTable,
    },
    error::{EmergencyErrorKind, collaborator_unavailable},
    types::{
        Circle, DeconflictionPlan, Geofence, ManeuverType, Operation, Threat, ThreatCategory,
        Waypoint,
    },
};

struct Harness {
    planner: Arc<ScriptedPlanner>,
    geofences: Arc<RecordingGeofenceStore>,
    collaborators: Collaborators,
}

impl Harness {
    fn new(planner: ScriptedPlanner) -> Self {
        Self::with_catalog(planner, StaticOperationCatalog::default())
    }

    fn with_catalog(planner: ScriptedPlanner, catalog: StaticOperationCatalog) -> Self {
        let planner = Arc::new(planner);
        let geofences = Arc::new(RecordingGeofenceStore::default());
        let collaborators = Collaborators {
            planner: planner.clone(),
            geofence_store: geofences.clone(),
            notifications: Arc::new(RecordingNotificationDelivery::default()),
            operations: Arc::new(catalog),
        };
        Self {
            planner,
            geofences,
            collaborators,
        }
    }

    fn dispatcher(&self) -> StrategyDispatcher {
        StrategyDispatcher::new(&self.collaborators, DispatchConfig::default())
    }
}

fn threat(threat_id: u64, category: &str, uavs: &[u64], located: bool) -> Threat {
    let mut value = json!({
        "threat_id": threat_id,
        "category": category,
        "detected_at": "2026-05-04T08:30:00Z",
        "affected_uav_ids": uavs,
    });
    if located {
        value["location"] = json!({"x": 120.0, "y": -35.5, "z": 40.0});
    }
    serde_json::from_value(value).expect("threat fixture should decode")
}

fn plan(uav_id: u64, maneuver: ManeuverType, cost: f64, riskiness: f64) -> DeconflictionPlan {
    DeconflictionPlan {
        uav_id,
        maneuver_type: maneuver,
        waypoints: vec![
            Waypoint {
                x: 1.0,
                y: 2.0,
                z: 30.0,
                stamp: 1_770_000_000.0,
            },
            Waypoint {
                x: 4.0,
                y: 6.0,
                z: 30.0,
                stamp: 1_770_000_010.0,
            },
        ],
        cost,
        riskiness,
    }
}

#[tokio::test]
async fn given_uas_in_cv_when_resolved_then_first_uav_is_told_to_return_to_plan() {
    let harness = Harness::new(ScriptedPlanner::default());
    let outcome = harness
        .dispatcher()
        .resolve(&threat(1, "uas_in_cv", &[11, 12], true))
        .await
        .expect("direct notify should succeed");

    assert_eq!(outcome.notifications.len(), 1);
    let notification = &outcome.notifications[0];
    assert_eq!(notification.threat_id, 1);
    assert_eq!(notification.uav_id, 11);
    assert_eq!(notification.description, RETURN_TO_PLAN_TEXT);
    assert_eq!(notification.action, None);
    assert_eq!(notification.waypoints, None);
    assert!(harness.geofences.writes().is_empty());
    assert!(harness.planner.requests().is_empty());
}

#[tokio::test]
async fn given_fixed_text_categories_when_resolved_then_each_gets_its_instruction() {
    let harness = Harness::new(ScriptedPlanner::default());
    let dispatcher = harness.dispatcher();
    let cases = [
        ("technical_failure", EMERGENCY_LANDING_TEXT),
        ("communication_failure", MANUAL_CONTROL_TEXT),
        ("jamming_attack", LAND_IN_GEOFENCE_TEXT),
        ("spoofing_attack", ACTIVATE_FTS_TEXT),
    ];

    for (index, (category, text)) in cases.into_iter().enumerate() {
        let outcome = dispatcher
            .resolve(&threat(index as u64 + 1, category, &[7], true))
            .await
            .expect("direct notify should succeed");
        assert_eq!(outcome.notifications.len(), 1, "{category}");
        assert_eq!(outcome.notifications[0].description, text, "{category}");
    }

    // communication failure is the only one of the four without a protective geofence
    assert_eq!(harness.geofences.writes().len(), 3);
}

#[tokio::test]
async fn given_technical_failure_when_resolved_then_protective_geofence_is_written() {
    let harness = Harness::new(ScriptedPlanner::default());
    let dispatcher = harness.dispatcher();
    dispatcher
        .resolve(&threat(1, "technical_failure", &[7], true))
        .await
        .expect("first threat should resolve");
    let outcome = dispatcher
        .resolve(&threat(2, "technical_failure", &[8], true))
        .await
        .expect("second threat should resolve");

    let writes = harness.geofences.writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].geofence_ids, vec![1]);
    assert_eq!(writes[1].geofence_ids, vec![2], "each threat owns its own fence");
    assert_eq!(outcome.geofences_written, vec![2]);
    assert_eq!(
        writes[1].geofences[0],
        Geofence {
            id: 2,
            min_altitude: 0.0,
            max_altitude: PROTECTIVE_GEOFENCE_CEILING,
            circle: Some(Circle {
                x_center: 120.0,
                y_center: -35.5,
                radius: 50.0,
            }),
        }
    );
}

#[tokio::test]
async fn given_same_threat_resolved_twice_when_fencing_then_the_fence_is_overwritten() {
    let harness = Harness::new(ScriptedPlanner::default());
    let dispatcher = StrategyDispatcher::new(
        &harness.collaborators,
        DispatchConfig {
            geofence_id_base: 1_000,
            ..DispatchConfig::default()
        },
    );
    let jamming = threat(5, "jamming_attack", &[7], true);

    let first = dispatcher
        .resolve(&jamming)
        .await
        .expect("first resolve should succeed");
    let second = dispatcher
        .resolve(&jamming)
        .await
        .expect("second resolve should succeed");

    assert_eq!(first.geofences_written, vec![1_005]);
    assert_eq!(second.geofences_written, first.geofences_written);
    let ids: Vec<_> = harness
        .geofences
        .writes()
        .iter()
        .flat_map(|write| write.geofence_ids.clone())
        .collect();
    assert_eq!(ids, vec![1_005, 1_005]);
}

#[tokio::test]
async fn given_geofence_store_down_when_resolved_then_notification_still_stands() {
    let harness = Harness::new(ScriptedPlanner::default());
    harness.geofences.set_failing(true);

    let outcome = harness
        .dispatcher()
        .resolve(&threat(1, "spoofing_attack", &[7], true))
        .await
        .expect("geofence failure must not fail the threat");

    assert_eq!(outcome.notifications.len(), 1);
    assert!(outcome.geofences_written.is_empty());
    assert_eq!(outcome.side_effect_failures.len(), 1);
    assert_eq!(
        outcome.side_effect_failures[0].kind,
        EmergencyErrorKind::CollaboratorUnavailable
    );
}

#[tokio::test]
async fn given_alert_warning_when_resolved_then_every_uav_is_warned_and_area_fenced() {
    let harness = Harness::new(ScriptedPlanner::default());
    let outcome = harness
        .dispatcher()
        .resolve(&threat(3, "alert_warning", &[21, 22, 23], true))
        .await
        .expect("broadcast should succeed");

    let uavs: Vec<_> = outcome.notifications.iter().map(|n| n.uav_id).collect();
    assert_eq!(uavs, vec![21, 22, 23]);
    assert!(
        outcome
            .notifications
            .iter()
            .all(|n| n.description == HAZARD_WARNING_TEXT && n.threat_id == 3)
    );

    let writes = harness.geofences.writes();
    assert_eq!(writes.len(), 1);
    let geofence = &writes[0].geofences[0];
    assert_eq!(geofence.min_altitude, 0.0);
    assert_eq!(geofence.max_altitude, CONTAINMENT_GEOFENCE_CEILING);
    assert_eq!(
        geofence.circle.map(|circle| circle.radius),
        Some(500.0)
    );
}

#[tokio::test]
async fn given_alert_warning_without_location_when_resolved_then_containment_is_skipped() {
    let harness = Harness::new(ScriptedPlanner::default());
    let outcome = harness
        .dispatcher()
        .resolve(&threat(3, "alert_warning", &[21], false))
        .await
        .expect("broadcast should still succeed");

    assert_eq!(outcome.notifications.len(), 1);
    assert!(harness.geofences.writes().is_empty());
    assert_eq!(outcome.side_effect_failures.len(), 1);
    assert_eq!(
        outcome.side_effect_failures[0].kind,
        EmergencyErrorKind::InvalidThreat
    );
}

#[tokio::test]
async fn given_alert_warning_without_uavs_when_resolved_then_only_the_fence_is_written() {
    let harness = Harness::new(ScriptedPlanner::default());
    let outcome = harness
        .dispatcher()
        .resolve(&threat(6, "alert_warning", &[], true))
        .await
        .expect("a fenced area is output enough");

    assert!(outcome.notifications.is_empty());
    assert_eq!(outcome.geofences_written, vec![6]);
}

#[tokio::test]
async fn given_alert_warning_with_nothing_to_produce_when_resolved_then_threat_is_invalid() {
    let harness = Harness::new(ScriptedPlanner::default());
    let dispatcher = harness.dispatcher();

    let err = dispatcher
        .resolve(&threat(77, "alert_warning", &[], false))
        .await
        .expect_err("no uav and no location leaves nothing to broadcast");
    assert_eq!(err.kind, EmergencyErrorKind::InvalidThreat);

    harness.geofences.set_failing(true);
    let err = dispatcher
        .resolve(&threat(78, "alert_warning", &[], true))
        .await
        .expect_err("a failed fence write with no uav produces nothing");
    assert_eq!(err.kind, EmergencyErrorKind::InvalidThreat);
}

#[tokio::test]
async fn given_equal_scores_when_deconflicting_then_first_plan_is_sent() {
    let harness = Harness::new(ScriptedPlanner::returning(vec![
        plan(31, ManeuverType::LandAtSpot, 4.0, 2.0),
        plan(31, ManeuverType::Hover, 1.0, 3.0),
    ]));

    let outcome = harness
        .dispatcher()
        .resolve(&threat(8, "lack_of_battery", &[31], true))
        .await
        .expect("deconfliction should succeed");

    assert_eq!(outcome.notifications.len(), 1);
    let notification = &outcome.notifications[0];
    assert_eq!(notification.uav_id, 31);
    assert_eq!(notification.action, Some(ManeuverType::LandAtSpot));
    assert_eq!(notification.description, ManeuverType::LandAtSpot.description());
    assert_eq!(
        notification.waypoints.as_ref().map(Vec::len),
        Some(2),
        "the selected plan's trajectory travels with the notification"
    );
}

#[tokio::test]
async fn given_lower_risk_plan_when_deconflicting_then_it_wins() {
    let harness = Harness::new(ScriptedPlanner::returning(vec![
        plan(31, ManeuverType::ShortestRoute, 1.0, 9.0),
        plan(31, ManeuverType::AvoidGeofence, 8.0, 1.0),
    ]));

    let outcome = harness
        .dispatcher()
        .resolve(&threat(8, "geofence_intrusion", &[31], true))
        .await
        .expect("deconfliction should succeed");
    assert_eq!(
        outcome.notifications[0].action,
        Some(ManeuverType::AvoidGeofence)
    );
}

#[tokio::test]
async fn given_deconfliction_when_requested_then_known_airspace_is_forwarded() {
    let operation = Operation {
        uav_id: 31,
        flight_plan: Vec::new(),
        details: json!({"operator": "ops-1"}),
    };
    let other = Operation {
        uav_id: 99,
        flight_plan: Vec::new(),
        details: json!({}),
    };
    let fence = Geofence {
        id: 500,
        min_altitude: 0.0,
        max_altitude: 120.0,
        circle: None,
    };
    let catalog = StaticOperationCatalog {
        airspace: KnownAirspace {
            operations: vec![operation.clone(), other],
            geofences: vec![fence.clone()],
        },
    };
    let harness = Harness::with_catalog(
        ScriptedPlanner::returning(vec![plan(31, ManeuverType::Hover, 1.0, 1.0)]),
        catalog,
    );

    harness
        .dispatcher()
        .resolve(&threat(8, "uas_out_ov", &[31], true))
        .await
        .expect("deconfliction should succeed");

    let requests = harness.planner.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].tactical);
    assert_eq!(requests[0].threat.threat_id, 8);
    assert_eq!(requests[0].known_operations, vec![operation]);
    assert_eq!(requests[0].known_geofences, vec![fence]);
}

#[tokio::test]
async fn given_planner_returns_nothing_when_deconflicting_then_no_candidates() {
    let harness = Harness::new(ScriptedPlanner::default());
    let err = harness
        .dispatcher()
        .resolve(&threat(8, "loss_of_separation", &[31, 32], true))
        .await
        .expect_err("empty plan list should fail");
    assert_eq!(err.kind, EmergencyErrorKind::NoCandidates);
}

#[tokio::test]
async fn given_planner_unreachable_when_deconflicting_then_error_propagates() {
    let planner = ScriptedPlanner::default();
    planner.push_response(Err(collaborator_unavailable("planner timed out")));
    let harness = Harness::new(planner);

    let err = harness
        .dispatcher()
        .resolve(&threat(8, "gnss_degradation", &[31], true))
        .await
        .expect_err("planner failure should surface");
    assert_eq!(err.kind, EmergencyErrorKind::CollaboratorUnavailable);
    assert_eq!(err.message, "planner timed out");
}

#[tokio::test]
async fn given_no_affected_uav_when_resolved_then_threat_is_invalid() {
    let harness = Harness::new(ScriptedPlanner::default());
    let dispatcher = harness.dispatcher();

    for category in ["uas_in_cv", "geofence_conflict"] {
        let err = dispatcher
            .resolve(&threat(2, category, &[], true))
            .await
            .expect_err("nobody to notify");
        assert_eq!(err.kind, EmergencyErrorKind::InvalidThreat, "{category}");
    }
    assert!(harness.planner.requests().is_empty());
}

#[tokio::test]
async fn given_unknown_category_when_resolved_then_unsupported() {
    let harness = Harness::new(ScriptedPlanner::default());
    let volcanic = threat(4, "volcanic_ash", &[7], true);
    assert_eq!(
        volcanic.category,
        ThreatCategory::Unrecognized("volcanic_ash".to_string())
    );

    let err = harness
        .dispatcher()
        .resolve(&volcanic)
        .await
        .expect_err("no strategy for unknown category");
    assert_eq!(err.kind, EmergencyErrorKind::UnsupportedThreatCategory);
}

#[tokio::test]
async fn given_category_removed_from_table_when_resolved_then_unsupported() {
    let harness = Harness::new(ScriptedPlanner::default());
    let table = StrategyTable::standard().without(&ThreatCategory::UasInCv);
    let dispatcher =
        StrategyDispatcher::with_table(&harness.collaborators, DispatchConfig::default(), table);

    let err = dispatcher
        .resolve(&threat(1, "uas_in_cv", &[7], true))
        .await
        .expect_err("category without a strategy");
    assert_eq!(err.kind, EmergencyErrorKind::UnsupportedThreatCategory);
}
