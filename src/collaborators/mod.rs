use std::sync::Arc;

use anyhow::Result;

use crate::config::CollaboratorsConfig;

pub mod http;
pub mod noop;
pub mod ports;
pub mod testing;

pub use http::{
    HttpDeconflictionPlanner, HttpGeofenceStore, HttpJsonClient, HttpNotificationDelivery,
    HttpOperationCatalog,
};
pub use noop::{
    EmptyOperationCatalog, LogNotificationDelivery, NoopDeconflictionPlanner, NoopGeofenceStore,
};
pub use ports::{
    DeconflictionPlannerPort, DeconflictionRequest, DeconflictionResponse,
    DeliverNotificationsRequest, DeliverNotificationsResponse, GeofenceStorePort, KnownAirspace,
    NotificationDeliveryPort, OperationCatalogPort, ReadOperationsRequest, WriteGeofencesRequest,
    WriteGeofencesResponse,
};

/// The external services the core talks to, behind their ports.
#[derive(Clone)]
pub struct Collaborators {
    pub planner: Arc<dyn DeconflictionPlannerPort>,
    pub geofence_store: Arc<dyn GeofenceStorePort>,
    pub notifications: Arc<dyn NotificationDeliveryPort>,
    pub operations: Arc<dyn OperationCatalogPort>,
}

impl Collaborators {
    pub fn noop() -> Self {
        Self {
            planner: Arc::new(NoopDeconflictionPlanner),
            geofence_store: Arc::new(NoopGeofenceStore),
            notifications: Arc::new(LogNotificationDelivery),
            operations: Arc::new(EmptyOperationCatalog),
        }
    }

    pub fn from_config(config: &CollaboratorsConfig) -> Result<Self> {
        let noop = Self::noop();

        let planner: Arc<dyn DeconflictionPlannerPort> = match &config.planner {
            Some(endpoint) => Arc::new(HttpDeconflictionPlanner::new(endpoint)?),
            None => noop.planner,
        };
        let geofence_store: Arc<dyn GeofenceStorePort> = match &config.geofence_store {
            Some(endpoint) => Arc::new(HttpGeofenceStore::new(endpoint)?),
            None => noop.geofence_store,
        };
        let notifications: Arc<dyn NotificationDeliveryPort> = match &config.notifications {
            Some(endpoint) => Arc::new(HttpNotificationDelivery::new(endpoint)?),
            None => noop.notifications,
        };
        let operations: Arc<dyn OperationCatalogPort> = match &config.operations {
            Some(endpoint) => Arc::new(HttpOperationCatalog::new(endpoint)?),
            None => noop.operations,
        };

        Ok(Self {
            planner,
            geofence_store,
            notifications,
            operations,
        })
    }
}
