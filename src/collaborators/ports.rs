use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    error::EmergencyError,
    types::{DeconflictionPlan, Geofence, GeofenceId, Notification, Operation, Threat, UavId},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeconflictionRequest {
    pub tactical: bool,
    pub threat: Threat,
    #[serde(default)]
    pub known_operations: Vec<Operation>,
    #[serde(default)]
    pub known_geofences: Vec<Geofence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DeconflictionResponse {
    #[serde(default)]
    pub plans: Vec<DeconflictionPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteGeofencesRequest {
    pub geofence_ids: Vec<GeofenceId>,
    pub geofences: Vec<Geofence>,
}

impl WriteGeofencesRequest {
    pub fn single(geofence: Geofence) -> Self {
        Self {
            geofence_ids: vec![geofence.id],
            geofences: vec![geofence],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WriteGeofencesResponse {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverNotificationsRequest {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverNotificationsResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOperationsRequest {
    pub uav_ids: Vec<UavId>,
}

/// Operations and geofences the catalog knows about around the affected vehicles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct KnownAirspace {
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub geofences: Vec<Geofence>,
}

#[async_trait]
pub trait DeconflictionPlannerPort: Send + Sync {
    async fn request_deconfliction(
        &self,
        req: DeconflictionRequest,
    ) -> Result<Vec<DeconflictionPlan>, EmergencyError>;
}

#[async_trait]
pub trait GeofenceStorePort: Send + Sync {
    async fn write_geofences(&self, req: WriteGeofencesRequest) -> Result<String, EmergencyError>;
}

#[async_trait]
pub trait NotificationDeliveryPort: Send + Sync {
    async fn deliver(&self, notifications: Vec<Notification>) -> Result<(), EmergencyError>;
}

#[async_trait]
pub trait OperationCatalogPort: Send + Sync {
    async fn read_operations(&self, uav_ids: &[UavId]) -> Result<KnownAirspace, EmergencyError>;
}
