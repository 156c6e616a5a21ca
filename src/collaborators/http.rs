use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header;
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{
    collaborators::ports::{
        DeconflictionPlannerPort, DeconflictionRequest, DeconflictionResponse,
        DeliverNotificationsRequest, DeliverNotificationsResponse, GeofenceStorePort,
        KnownAirspace, NotificationDeliveryPort, OperationCatalogPort, ReadOperationsRequest,
        WriteGeofencesRequest, WriteGeofencesResponse,
    },
    config::HttpEndpointConfig,
    error::{EmergencyError, collaborator_unavailable},
    types::{DeconflictionPlan, Notification, UavId},
};

const MAX_ERROR_BODY_CHARS: usize = 240;

/// JSON-over-HTTP request/response client for one collaborator endpoint.
#[derive(Debug, Clone)]
pub struct HttpJsonClient {
    collaborator: &'static str,
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpJsonClient {
    pub fn new(collaborator: &'static str, config: &HttpEndpointConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .with_context(|| format!("failed to build http client for {collaborator}"))?;
        Ok(Self {
            collaborator,
            url: config.url.clone(),
            timeout: Duration::from_millis(config.timeout_ms.max(1)),
            client,
        })
    }

    pub async fn post<Req, Resp>(&self, body: &Req) -> Result<Resp, EmergencyError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let request_id = Uuid::now_v7().to_string();
        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-request-id", request_id)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                collaborator_unavailable(format!("{} request failed: {}", self.collaborator, err))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(self.collaborator, status.as_u16(), &body));
        }

        response.json::<Resp>().await.map_err(|err| {
            collaborator_unavailable(format!(
                "{} returned an undecodable body: {}",
                self.collaborator, err
            ))
        })
    }
}

pub fn map_http_error(collaborator: &str, status: u16, body: &str) -> EmergencyError {
    let normalized_body = body.chars().take(MAX_ERROR_BODY_CHARS).collect::<String>();
    if normalized_body.is_empty() {
        collaborator_unavailable(format!("{} returned status {}", collaborator, status))
    } else {
        collaborator_unavailable(format!(
            "{} returned status {}: {}",
            collaborator, status, normalized_body
        ))
    }
}

#[derive(Debug, Clone)]
pub struct HttpDeconflictionPlanner {
    client: HttpJsonClient,
}

impl HttpDeconflictionPlanner {
    pub fn new(config: &HttpEndpointConfig) -> Result<Self> {
        Ok(Self {
            client: HttpJsonClient::new("deconfliction planner", config)?,
        })
    }
}

#[async_trait]
impl DeconflictionPlannerPort for HttpDeconflictionPlanner {
    async fn request_deconfliction(
        &self,
        req: DeconflictionRequest,
    ) -> Result<Vec<DeconflictionPlan>, EmergencyError> {
        let response: DeconflictionResponse = self.client.post(&req).await?;
        Ok(response.plans)
    }
}

#[derive(Debug, Clone)]
pub struct HttpGeofenceStore {
    client: HttpJsonClient,
}

impl HttpGeofenceStore {
    pub fn new(config: &HttpEndpointConfig) -> Result<Self> {
        Ok(Self {
            client: HttpJsonClient::new("geofence store", config)?,
        })
    }
}

#[async_trait]
impl GeofenceStorePort for HttpGeofenceStore {
    async fn write_geofences(&self, req: WriteGeofencesRequest) -> Result<String, EmergencyError> {
        let response: WriteGeofencesResponse = self.client.post(&req).await?;
        Ok(response.message)
    }
}

#[derive(Debug, Clone)]
pub struct HttpNotificationDelivery {
    client: HttpJsonClient,
}

impl HttpNotificationDelivery {
    pub fn new(config: &HttpEndpointConfig) -> Result<Self> {
        Ok(Self {
            client: HttpJsonClient::new("notification delivery", config)?,
        })
    }
}

#[async_trait]
impl NotificationDeliveryPort for HttpNotificationDelivery {
    async fn deliver(&self, notifications: Vec<Notification>) -> Result<(), EmergencyError> {
        let count = notifications.len();
        let response: DeliverNotificationsResponse = self
            .client
            .post(&DeliverNotificationsRequest { notifications })
            .await?;
        if !response.ok {
            return Err(collaborator_unavailable(format!(
                "notification delivery refused a batch of {} notifications",
                count
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct HttpOperationCatalog {
    client: HttpJsonClient,
}

impl HttpOperationCatalog {
    pub fn new(config: &HttpEndpointConfig) -> Result<Self> {
        Ok(Self {
            client: HttpJsonClient::new("operation catalog", config)?,
        })
    }
}

#[async_trait]
impl OperationCatalogPort for HttpOperationCatalog {
    async fn read_operations(&self, uav_ids: &[UavId]) -> Result<KnownAirspace, EmergencyError> {
        self.client
            .post(&ReadOperationsRequest {
                uav_ids: uav_ids.to_vec(),
            })
            .await
    }
}
