//! REST record store client
//!
//! Speaks a minimal collection API:
//! - `GET {base}/{collection}` returns a JSON array of records
//! - `GET {base}/{collection}/{id}` returns one record, `404` when absent
//! - `PATCH {base}/{collection}/{id}` with `{"status": ...}` updates a status

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};
use url::Url;
use vigil_cache::CollectionSource;
use vigil_common::{Incident, MaintenanceStatus, MaintenanceWindow, sort_newest_first};
use vigil_maintenance::{StatusStore, WindowSource};

use crate::config::RecordStoreConfig;
use crate::error::{ClientError, Result};

/// HTTP client for the record store
#[derive(Clone, Debug)]
pub struct RecordStoreClient {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
}

impl RecordStoreClient {
    pub fn new(config: RecordStoreConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidConfig(format!(
                "record store url cannot be used as a base: {}",
                config.base_url
            )));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_token: config.api_token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Typed view over an incident collection
    pub fn incidents(&self, collection: &str) -> IncidentCollection {
        IncidentCollection {
            client: self.clone(),
            collection: collection.to_string(),
        }
    }

    /// Typed view over a maintenance collection
    pub fn maintenance(&self, collection: &str) -> MaintenanceCollection {
        MaintenanceCollection {
            client: self.clone(),
            collection: collection.to_string(),
        }
    }

    /// List the records of `collection`.
    ///
    /// Records that do not decode as `T` are logged and dropped so one bad
    /// record never hides the rest. A body that is not a JSON array is an error.
    pub async fn list_records<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let url = self.endpoint(&[collection])?;
        debug!("Listing records from {}", url);
        let response = self.authorize(self.client.get(url)).send().await?;
        let raw: Vec<serde_json::Value> = Self::handle_response(response).await?;

        let total = raw.len();
        let records: Vec<T> = raw
            .into_iter()
            .filter_map(|value| {
                let id = value
                    .get("id")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("<unknown>")
                    .to_string();
                match serde_json::from_value(value) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!("Dropping invalid record '{}' from {}: {}", id, collection, e);
                        None
                    }
                }
            })
            .collect();
        if records.len() < total {
            warn!(
                "Dropped {} of {} records from {}",
                total - records.len(),
                total,
                collection
            );
        }
        Ok(records)
    }

    /// Fetch one record, `None` if the store answers 404
    pub async fn get_record<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>> {
        let url = self.endpoint(&[collection, id])?;
        debug!("Fetching record {}", url);
        let response = self.authorize(self.client.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::handle_response(response).await.map(Some)
    }

    /// Update the `status` field of one record
    pub async fn update_status(&self, collection: &str, id: &str, status: &str) -> Result<()> {
        let url = self.endpoint(&[collection, id])?;
        debug!("Updating status of {} to {}", url, status);
        let body = serde_json::json!({ "status": status });
        let response = self
            .authorize(self.client.patch(url))
            .json(&body)
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::InvalidConfig(format!(
                    "record store url cannot be used as a base: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        error!("Request failed with status {}: {}", status, body);
        Err(ClientError::RequestFailed {
            status: status.as_u16(),
            body,
        })
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Incident records, listed newest first
#[derive(Clone, Debug)]
pub struct IncidentCollection {
    client: RecordStoreClient,
    collection: String,
}

impl IncidentCollection {
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl CollectionSource<Incident> for IncidentCollection {
    async fn fetch_collection(&self) -> anyhow::Result<Vec<Incident>> {
        let mut incidents: Vec<Incident> = self.client.list_records(&self.collection).await?;
        sort_newest_first(&mut incidents);
        Ok(incidents)
    }

    async fn fetch_one(&self, id: &str) -> anyhow::Result<Option<Incident>> {
        Ok(self.client.get_record(&self.collection, id).await?)
    }
}

/// Maintenance records: the monitor's window source and status store
#[derive(Clone, Debug)]
pub struct MaintenanceCollection {
    client: RecordStoreClient,
    collection: String,
}

impl MaintenanceCollection {
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl WindowSource for MaintenanceCollection {
    async fn list_windows(&self) -> anyhow::Result<Vec<MaintenanceWindow>> {
        Ok(self.client.list_records(&self.collection).await?)
    }
}

#[async_trait]
impl StatusStore for MaintenanceCollection {
    async fn persist_status(
        &self,
        window_id: &str,
        status: MaintenanceStatus,
    ) -> anyhow::Result<()> {
        self.client
            .update_status(&self.collection, window_id, status.as_str())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CollectionSource<MaintenanceWindow> for MaintenanceCollection {
    async fn fetch_collection(&self) -> anyhow::Result<Vec<MaintenanceWindow>> {
        Ok(self.client.list_records(&self.collection).await?)
    }

    async fn fetch_one(&self, id: &str) -> anyhow::Result<Option<MaintenanceWindow>> {
        Ok(self.client.get_record(&self.collection, id).await?)
    }
}
