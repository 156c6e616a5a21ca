use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

pub type ThreatId = u64;
pub type UavId = u64;
pub type GeofenceId = u64;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ThreatCategory {
    UasInCv,
    UasOutOv,
    LossOfSeparation,
    AlertWarning,
    GeofenceIntrusion,
    GeofenceConflict,
    TechnicalFailure,
    CommunicationFailure,
    LackOfBattery,
    JammingAttack,
    SpoofingAttack,
    GnssDegradation,
    Unrecognized(String),
}

impl ThreatCategory {
    pub const KNOWN: [ThreatCategory; 12] = [
        ThreatCategory::UasInCv,
        ThreatCategory::UasOutOv,
        ThreatCategory::LossOfSeparation,
        ThreatCategory::AlertWarning,
        ThreatCategory::GeofenceIntrusion,
        ThreatCategory::GeofenceConflict,
        ThreatCategory::TechnicalFailure,
        ThreatCategory::CommunicationFailure,
        ThreatCategory::LackOfBattery,
        ThreatCategory::JammingAttack,
        ThreatCategory::SpoofingAttack,
        ThreatCategory::GnssDegradation,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::UasInCv => "uas_in_cv",
            Self::UasOutOv => "uas_out_ov",
            Self::LossOfSeparation => "loss_of_separation",
            Self::AlertWarning => "alert_warning",
            Self::GeofenceIntrusion => "geofence_intrusion",
            Self::GeofenceConflict => "geofence_conflict",
            Self::TechnicalFailure => "technical_failure",
            Self::CommunicationFailure => "communication_failure",
            Self::LackOfBattery => "lack_of_battery",
            Self::JammingAttack => "jamming_attack",
            Self::SpoofingAttack => "spoofing_attack",
            Self::GnssDegradation => "gnss_degradation",
            Self::Unrecognized(name) => name.as_str(),
        }
    }
}

impl From<String> for ThreatCategory {
    fn from(value: String) -> Self {
        Self::KNOWN
            .iter()
            .find(|category| category.as_str() == value)
            .cloned()
            .unwrap_or(Self::Unrecognized(value))
    }
}

impl From<&str> for ThreatCategory {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ThreatCategory> for String {
    fn from(value: ThreatCategory) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Seconds since the UNIX epoch at which the vehicle should pass the point.
    pub stamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threat {
    pub threat_id: ThreatId,
    pub category: ThreatCategory,
    #[serde(with = "time::serde::rfc3339")]
    pub detected_at: OffsetDateTime,
    #[serde(default)]
    pub affected_uav_ids: Vec<UavId>,
    #[serde(default)]
    pub location: Option<Point>,
    #[serde(default)]
    pub waypoint_ids: Vec<u32>,
    #[serde(default)]
    pub payload: Value,
}

impl Threat {
    pub fn first_affected_uav(&self) -> Option<UavId> {
        self.affected_uav_ids.first().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ManeuverType {
    AvoidGeofence = 1,
    ShortestRoute = 2,
    ReturnHome = 3,
    HoverUntilDeactivation = 4,
    LandAtSpot = 5,
    LeaveGeofence = 6,
    Hover = 7,
    AvoidConflictObject = 8,
    RejoinFlightPlan = 9,
}

impl ManeuverType {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::AvoidGeofence => "Route to my destiny avoiding a geofence",
            Self::ShortestRoute => "Route to my destiny for the shortest way",
            Self::ReturnHome => "Route back home",
            Self::HoverUntilDeactivation => "Hovering waiting for geofence deactivation",
            Self::LandAtSpot => "Route landing in a landing spot",
            Self::LeaveGeofence => "Route to my destiny leaving the geofence asap",
            Self::Hover => "Hovering",
            Self::AvoidConflictObject => "Route avoiding the conflict object",
            Self::RejoinFlightPlan => {
                "Route for going back asap to the Flight Geometry and keeping with the Flight Plan"
            }
        }
    }
}

impl TryFrom<u8> for ManeuverType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::AvoidGeofence),
            2 => Ok(Self::ShortestRoute),
            3 => Ok(Self::ReturnHome),
            4 => Ok(Self::HoverUntilDeactivation),
            5 => Ok(Self::LandAtSpot),
            6 => Ok(Self::LeaveGeofence),
            7 => Ok(Self::Hover),
            8 => Ok(Self::AvoidConflictObject),
            9 => Ok(Self::RejoinFlightPlan),
            other => Err(format!("unknown maneuver code {other}")),
        }
    }
}

impl From<ManeuverType> for u8 {
    fn from(value: ManeuverType) -> Self {
        value.code()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeconflictionPlan {
    pub uav_id: UavId,
    pub maneuver_type: ManeuverType,
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
    pub cost: f64,
    pub riskiness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub threat_id: ThreatId,
    pub uav_id: UavId,
    pub description: String,
    #[serde(default)]
    pub action: Option<ManeuverType>,
    #[serde(default)]
    pub waypoints: Option<Vec<Waypoint>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub x_center: f64,
    pub y_center: f64,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub id: GeofenceId,
    pub min_altitude: f64,
    pub max_altitude: f64,
    #[serde(default)]
    pub circle: Option<Circle>,
}

/// Flight operation as known to the operation catalog; opaque to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub uav_id: UavId,
    #[serde(default)]
    pub flight_plan: Vec<Waypoint>,
    #[serde(default)]
    pub details: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PilotAnswer {
    Accepted,
    Rejected,
}

impl fmt::Display for PilotAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => f.write_str("accepted"),
            Self::Rejected => f.write_str("rejected"),
        }
    }
}
