use async_trait::async_trait;

use crate::{
    collaborators::ports::{
        DeconflictionPlannerPort, DeconflictionRequest, GeofenceStorePort, KnownAirspace,
        NotificationDeliveryPort, OperationCatalogPort, WriteGeofencesRequest,
    },
    error::EmergencyError,
    types::{DeconflictionPlan, Notification, UavId},
};

/// Planner that never proposes anything; every routed threat ends in `NoCandidates`.
#[derive(Debug, Clone, Default)]
pub struct NoopDeconflictionPlanner;

#[async_trait]
impl DeconflictionPlannerPort for NoopDeconflictionPlanner {
    async fn request_deconfliction(
        &self,
        _req: DeconflictionRequest,
    ) -> Result<Vec<DeconflictionPlan>, EmergencyError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Default)]
pub struct NoopGeofenceStore;

#[async_trait]
impl GeofenceStorePort for NoopGeofenceStore {
    async fn write_geofences(&self, req: WriteGeofencesRequest) -> Result<String, EmergencyError> {
        tracing::debug!(
            target: "collaborators.geofence_store",
            geofence_ids = ?req.geofence_ids,
            "geofence_write_discarded"
        );
        Ok("geofences discarded".to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogNotificationDelivery;

#[async_trait]
impl NotificationDeliveryPort for LogNotificationDelivery {
    async fn deliver(&self, notifications: Vec<Notification>) -> Result<(), EmergencyError> {
        for notification in &notifications {
            tracing::info!(
                target: "collaborators.notifications",
                threat_id = notification.threat_id,
                uav_id = notification.uav_id,
                action = ?notification.action,
                description = %notification.description,
                "notification_logged"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmptyOperationCatalog;

#[async_trait]
impl OperationCatalogPort for EmptyOperationCatalog {
    async fn read_operations(&self, _uav_ids: &[UavId]) -> Result<KnownAirspace, EmergencyError> {
        Ok(KnownAirspace::default())
    }
}
