use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;

use crate::{
    collaborators::ports::{
        DeconflictionPlannerPort, DeconflictionRequest, GeofenceStorePort, KnownAirspace,
        NotificationDeliveryPort, OperationCatalogPort, WriteGeofencesRequest,
    },
    error::{EmergencyError, collaborator_unavailable},
    types::{DeconflictionPlan, Notification, UavId},
};

/// Planner double: answers queued responses first, then repeats `fallback`.
#[derive(Debug, Default)]
pub struct ScriptedPlanner {
    queued: Mutex<VecDeque<Result<Vec<DeconflictionPlan>, EmergencyError>>>,
    fallback: Mutex<Vec<DeconflictionPlan>>,
    requests: Mutex<Vec<DeconflictionRequest>>,
}

impl ScriptedPlanner {
    pub fn returning(plans: Vec<DeconflictionPlan>) -> Self {
        Self {
            fallback: Mutex::new(plans),
            ..Self::default()
        }
    }

    pub fn push_response(&self, response: Result<Vec<DeconflictionPlan>, EmergencyError>) {
        self.queued
            .lock()
            .expect("lock poisoned")
            .push_back(response);
    }

    pub fn requests(&self) -> Vec<DeconflictionRequest> {
        self.requests.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl DeconflictionPlannerPort for ScriptedPlanner {
    async fn request_deconfliction(
        &self,
        req: DeconflictionRequest,
    ) -> Result<Vec<DeconflictionPlan>, EmergencyError> {
        self.requests.lock().expect("lock poisoned").push(req);
        if let Some(response) = self.queued.lock().expect("lock poisoned").pop_front() {
            return response;
        }
        Ok(self.fallback.lock().expect("lock poisoned").clone())
    }
}

#[derive(Debug, Default)]
pub struct RecordingGeofenceStore {
    failing: AtomicBool,
    writes: Mutex<Vec<WriteGeofencesRequest>>,
}

impl RecordingGeofenceStore {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<WriteGeofencesRequest> {
        self.writes.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl GeofenceStorePort for RecordingGeofenceStore {
    async fn write_geofences(&self, req: WriteGeofencesRequest) -> Result<String, EmergencyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(collaborator_unavailable("geofence store is offline"));
        }
        self.writes.lock().expect("lock poisoned").push(req);
        Ok("Geofence stored in the Data Base.".to_string())
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotificationDelivery {
    failing: AtomicBool,
    batches: Mutex<Vec<Vec<Notification>>>,
}

impl RecordingNotificationDelivery {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn batches(&self) -> Vec<Vec<Notification>> {
        self.batches.lock().expect("lock poisoned").clone()
    }

    pub fn delivered(&self) -> Vec<Notification> {
        self.batches().into_iter().flatten().collect()
    }
}

#[async_trait]
impl NotificationDeliveryPort for RecordingNotificationDelivery {
    async fn deliver(&self, notifications: Vec<Notification>) -> Result<(), EmergencyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(collaborator_unavailable("notification service is offline"));
        }
        self.batches.lock().expect("lock poisoned").push(notifications);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticOperationCatalog {
    pub airspace: KnownAirspace,
}

#[async_trait]
impl OperationCatalogPort for StaticOperationCatalog {
    async fn read_operations(&self, uav_ids: &[UavId]) -> Result<KnownAirspace, EmergencyError> {
        Ok(KnownAirspace {
            operations: self
                .airspace
                .operations
                .iter()
                .filter(|operation| uav_ids.contains(&operation.uav_id))
                .cloned()
                .collect(),
            geofences: self.airspace.geofences.clone(),
        })
    }
}
