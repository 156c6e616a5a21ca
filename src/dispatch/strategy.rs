use std::collections::BTreeMap;

use crate::types::ThreatCategory;

pub const RETURN_TO_PLAN_TEXT: &str = "Go back to your flight plan.";
pub const EMERGENCY_LANDING_TEXT: &str = "URGENT: Land now.";
pub const MANUAL_CONTROL_TEXT: &str = "Change UAV control mode from autonomous to manual.";
pub const LAND_IN_GEOFENCE_TEXT: &str = "Land within the geofence created around the UAV.";
pub const ACTIVATE_FTS_TEXT: &str = "Activate the Flight Termination System (FTS) of the UAV.";
pub const HAZARD_WARNING_TEXT: &str =
    "Alert Warning: Bad weather Fire or NDZ detected in the zone.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Fixed-text order to the first affected UAV.
    DirectNotify {
        text: &'static str,
        protective_geofence: bool,
    },
    /// Warn every affected UAV and fence off the hazard area.
    BroadcastContainment { text: &'static str },
    /// Ask the planner for candidate trajectories and send the best one.
    DeconflictionRouted,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DirectNotify { .. } => "direct_notify",
            Self::BroadcastContainment { .. } => "broadcast_containment",
            Self::DeconflictionRouted => "deconfliction_routed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyTable {
    entries: BTreeMap<ThreatCategory, Strategy>,
}

impl StrategyTable {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn standard() -> Self {
        let direct = |text: &'static str, protective_geofence: bool| Strategy::DirectNotify {
            text,
            protective_geofence,
        };

        Self::empty()
            .with(ThreatCategory::UasInCv, direct(RETURN_TO_PLAN_TEXT, false))
            .with(ThreatCategory::UasOutOv, Strategy::DeconflictionRouted)
            .with(ThreatCategory::LossOfSeparation, Strategy::DeconflictionRouted)
            .with(
                ThreatCategory::AlertWarning,
                Strategy::BroadcastContainment {
                    text: HAZARD_WARNING_TEXT,
                },
            )
            .with(ThreatCategory::GeofenceIntrusion, Strategy::DeconflictionRouted)
            .with(ThreatCategory::GeofenceConflict, Strategy::DeconflictionRouted)
            .with(
                ThreatCategory::TechnicalFailure,
                direct(EMERGENCY_LANDING_TEXT, true),
            )
            .with(
                ThreatCategory::CommunicationFailure,
                direct(MANUAL_CONTROL_TEXT, false),
            )
            .with(ThreatCategory::LackOfBattery, Strategy::DeconflictionRouted)
            .with(
                ThreatCategory::JammingAttack,
                direct(LAND_IN_GEOFENCE_TEXT, true),
            )
            .with(ThreatCategory::SpoofingAttack, direct(ACTIVATE_FTS_TEXT, true))
            .with(ThreatCategory::GnssDegradation, Strategy::DeconflictionRouted)
    }

    pub fn with(mut self, category: ThreatCategory, strategy: Strategy) -> Self {
        self.entries.insert(category, strategy);
        self
    }

    pub fn without(mut self, category: &ThreatCategory) -> Self {
        self.entries.remove(category);
        self
    }

    pub fn lookup(&self, category: &ThreatCategory) -> Option<Strategy> {
        self.entries.get(category).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::standard()
    }
}
