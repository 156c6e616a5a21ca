use std::sync::Arc;

use crate::{
    collaborators::{
        Collaborators, DeconflictionPlannerPort, DeconflictionRequest, GeofenceStorePort,
        OperationCatalogPort, WriteGeofencesRequest,
    },
    config::DispatchConfig,
    dispatch::strategy::{Strategy, StrategyTable},
    error::{EmergencyError, invalid_threat, no_candidates, unsupported_category},
    ranker::{PlanRanker, WeightedPlanRanker},
    types::{Circle, DeconflictionPlan, Geofence, GeofenceId, Notification, Threat},
};

pub const PROTECTIVE_GEOFENCE_CEILING: f64 = 100.0;
pub const CONTAINMENT_GEOFENCE_CEILING: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DispatchOutcome {
    pub notifications: Vec<Notification>,
    pub geofences_written: Vec<GeofenceId>,
    /// Fire-and-forget side effects that failed; the notifications still stand.
    pub side_effect_failures: Vec<EmergencyError>,
}

pub struct StrategyDispatcher {
    table: StrategyTable,
    ranker: Arc<dyn PlanRanker>,
    planner: Arc<dyn DeconflictionPlannerPort>,
    geofence_store: Arc<dyn GeofenceStorePort>,
    operations: Arc<dyn OperationCatalogPort>,
    config: DispatchConfig,
}

impl StrategyDispatcher {
    pub fn new(collaborators: &Collaborators, config: DispatchConfig) -> Self {
        Self::with_table(collaborators, config, StrategyTable::standard())
    }

    pub fn with_table(
        collaborators: &Collaborators,
        config: DispatchConfig,
        table: StrategyTable,
    ) -> Self {
        Self {
            table,
            ranker: Arc::new(WeightedPlanRanker::default()),
            planner: Arc::clone(&collaborators.planner),
            geofence_store: Arc::clone(&collaborators.geofence_store),
            operations: Arc::clone(&collaborators.operations),
            config,
        }
    }

    pub fn with_ranker(mut self, ranker: Arc<dyn PlanRanker>) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn table(&self) -> &StrategyTable {
        &self.table
    }

    #[tracing::instrument(
        name = "dispatch_resolve",
        target = "dispatch",
        skip(self, threat),
        fields(threat_id = threat.threat_id, category = %threat.category)
    )]
    pub async fn resolve(&self, threat: &Threat) -> Result<DispatchOutcome, EmergencyError> {
        let strategy = self.table.lookup(&threat.category).ok_or_else(|| {
            unsupported_category(format!(
                "no response strategy for threat category '{}'",
                threat.category
            ))
        })?;
        tracing::debug!(
            target: "dispatch",
            threat_id = threat.threat_id,
            strategy = strategy.name(),
            "strategy_selected"
        );

        match strategy {
            Strategy::DirectNotify {
                text,
                protective_geofence,
            } => self.direct_notify(threat, text, protective_geofence).await,
            Strategy::BroadcastContainment { text } => {
                self.broadcast_containment(threat, text).await
            }
            Strategy::DeconflictionRouted => self.deconfliction_routed(threat).await,
        }
    }

    async fn direct_notify(
        &self,
        threat: &Threat,
        text: &str,
        protective_geofence: bool,
    ) -> Result<DispatchOutcome, EmergencyError> {
        let uav_id = threat.first_affected_uav().ok_or_else(|| {
            invalid_threat(format!(
                "threat {} names no affected uav to notify",
                threat.threat_id
            ))
        })?;

        let mut outcome = DispatchOutcome {
            notifications: vec![Notification {
                threat_id: threat.threat_id,
                uav_id,
                description: text.to_string(),
                action: None,
                waypoints: None,
            }],
            ..DispatchOutcome::default()
        };

        if protective_geofence {
            let geofence = self.protective_geofence(threat);
            self.write_geofence(threat, geofence, &mut outcome).await;
        }

        Ok(outcome)
    }

    async fn broadcast_containment(
        &self,
        threat: &Threat,
        text: &str,
    ) -> Result<DispatchOutcome, EmergencyError> {
        let mut outcome = DispatchOutcome {
            notifications: threat
                .affected_uav_ids
                .iter()
                .map(|uav_id| Notification {
                    threat_id: threat.threat_id,
                    uav_id: *uav_id,
                    description: text.to_string(),
                    action: None,
                    waypoints: None,
                })
                .collect(),
            ..DispatchOutcome::default()
        };

        match self.containment_geofence(threat) {
            Some(geofence) => self.write_geofence(threat, geofence, &mut outcome).await,
            None => {
                tracing::warn!(
                    target: "dispatch",
                    threat_id = threat.threat_id,
                    "containment_geofence_skipped_without_location"
                );
                outcome.side_effect_failures.push(invalid_threat(format!(
                    "threat {} has no location; containment geofence skipped",
                    threat.threat_id
                )));
            }
        }

        if outcome.notifications.is_empty() && outcome.geofences_written.is_empty() {
            return Err(invalid_threat(format!(
                "threat {} produced neither a notification nor a containment geofence",
                threat.threat_id
            )));
        }

        Ok(outcome)
    }

    async fn deconfliction_routed(&self, threat: &Threat) -> Result<DispatchOutcome, EmergencyError> {
        if threat.affected_uav_ids.is_empty() {
            return Err(invalid_threat(format!(
                "threat {} names no affected uav to deconflict",
                threat.threat_id
            )));
        }

        let airspace = self
            .operations
            .read_operations(&threat.affected_uav_ids)
            .await?;
        let plans = self
            .planner
            .request_deconfliction(DeconflictionRequest {
                tactical: true,
                threat: threat.clone(),
                known_operations: airspace.operations,
                known_geofences: airspace.geofences,
            })
            .await?;
        if plans.is_empty() {
            return Err(no_candidates(format!(
                "deconfliction planner returned no plans for threat {}",
                threat.threat_id
            )));
        }

        let best = self.ranker.select(&plans)?;
        tracing::debug!(
            target: "dispatch",
            threat_id = threat.threat_id,
            candidates = plans.len(),
            uav_id = best.uav_id,
            maneuver = best.maneuver_type.code(),
            cost = best.cost,
            riskiness = best.riskiness,
            "deconfliction_plan_selected"
        );

        Ok(DispatchOutcome {
            notifications: vec![plan_notification(threat, best)],
            ..DispatchOutcome::default()
        })
    }

    fn protective_geofence(&self, threat: &Threat) -> Geofence {
        Geofence {
            id: self.geofence_id(threat),
            min_altitude: 0.0,
            max_altitude: PROTECTIVE_GEOFENCE_CEILING,
            circle: threat.location.map(|center| Circle {
                x_center: center.x,
                y_center: center.y,
                radius: self.config.protective_geofence_radius,
            }),
        }
    }

    fn containment_geofence(&self, threat: &Threat) -> Option<Geofence> {
        let center = threat.location?;
        Some(Geofence {
            id: self.geofence_id(threat),
            min_altitude: 0.0,
            max_altitude: CONTAINMENT_GEOFENCE_CEILING,
            circle: Some(Circle {
                x_center: center.x,
                y_center: center.y,
                radius: self.config.containment_geofence_radius,
            }),
        })
    }

    /// One fence per threat: a re-resolve overwrites the fence it wrote before.
    fn geofence_id(&self, threat: &Threat) -> GeofenceId {
        self.config.geofence_id_base.saturating_add(threat.threat_id)
    }

    async fn write_geofence(
        &self,
        threat: &Threat,
        geofence: Geofence,
        outcome: &mut DispatchOutcome,
    ) {
        let geofence_id = geofence.id;
        match self
            .geofence_store
            .write_geofences(WriteGeofencesRequest::single(geofence))
            .await
        {
            Ok(message) => {
                tracing::info!(
                    target: "dispatch",
                    threat_id = threat.threat_id,
                    geofence_id = geofence_id,
                    message = %message,
                    "geofence_written"
                );
                outcome.geofences_written.push(geofence_id);
            }
            Err(err) => {
                tracing::warn!(
                    target: "dispatch",
                    threat_id = threat.threat_id,
                    geofence_id = geofence_id,
                    error = %err,
                    "geofence_write_failed"
                );
                outcome.side_effect_failures.push(err);
            }
        }
    }
}

fn plan_notification(threat: &Threat, plan: DeconflictionPlan) -> Notification {
    Notification {
        threat_id: threat.threat_id,
        uav_id: plan.uav_id,
        description: plan.maneuver_type.description().to_string(),
        action: Some(plan.maneuver_type),
        waypoints: Some(plan.waypoints),
    }
}
