//! HTTP client for the collection service, as used by front ends and scripts.
//!
//! Every call is attempted at most twice: one retry after a fixed delay, and only when
//! the request never produced a response (connect/timeout/IO). HTTP error statuses are
//! returned as [`ClientError::Api`] without retrying.

use crate::domain::adoption::RequestStatus;
use crate::domain::session::Session;
use crate::transport::http::types::MutationResponse;
use backon::{ConstantBuilder, Retryable};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("could not decode response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone)]
pub struct CollectionClient {
    http: reqwest::Client,
    base_url: String,
    retry: ConstantBuilder,
}

impl CollectionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: ConstantBuilder::default()
                .with_delay(DEFAULT_RETRY_DELAY)
                .with_max_times(1),
        }
    }

    /// Changes the pause before the single retry.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry = ConstantBuilder::default()
            .with_delay(delay)
            .with_max_times(1);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<F>(&self, build: F) -> Result<reqwest::Response, ClientError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let resp = (|| async { build().send().await })
            .retry(self.retry)
            .when(|e: &reqwest::Error| !e.is_builder())
            .notify(|e: &reqwest::Error, after: Duration| {
                warn!(error = %e, ?after, "request failed; retrying");
            })
            .await?;
        Ok(resp)
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<JsonValue>(&bytes)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn get_query(&self, params: &[(&str, &str)]) -> Result<reqwest::Response, ClientError> {
        let url = self.url("/query");
        self.send(|| self.http.get(&url).query(params)).await
    }

    /// Every record of a collection. Rows wrapped as `{data: {...}}` are unwrapped.
    pub async fn get_collection(&self, collection: &str) -> Result<Vec<JsonValue>, ClientError> {
        let resp = self.get_query(&[("collection", collection)]).await?;
        let rows: Vec<JsonValue> = Self::decode(resp).await?;
        Ok(rows.into_iter().map(unwrap_data).collect())
    }

    /// One record, or `None` when the service reports it missing.
    pub async fn get_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<JsonValue>, ClientError> {
        let resp = self
            .get_query(&[("collection", collection), ("id", id)])
            .await?;
        match Self::decode::<JsonValue>(resp).await {
            Ok(row) => Ok(Some(unwrap_data(row))),
            Err(ClientError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Records of `collection` that belong to the session's profile.
    ///
    /// Adopters see the adoption requests they filed; everyone else sees what they own.
    pub async fn owned(
        &self,
        session: &Session,
        collection: &str,
    ) -> Result<Vec<JsonValue>, ClientError> {
        let key = if !session.owns_listings() && is_adoption_requests(collection) {
            "applicant"
        } else {
            "owner"
        };
        let resp = self
            .get_query(&[("collection", collection), (key, &session.profile_id)])
            .await?;
        let rows: Vec<JsonValue> = Self::decode(resp).await?;
        Ok(rows.into_iter().map(unwrap_data).collect())
    }

    async fn mutate(&self, body: JsonValue) -> Result<String, ClientError> {
        let url = self.url("/mutate");
        let resp = self.send(|| self.http.post(&url).json(&body)).await?;
        let out: MutationResponse = Self::decode(resp).await?;
        Ok(out.id)
    }

    /// Creates a record, assigning `<collection>_<unix millis>` when it has no id.
    pub async fn create(&self, collection: &str, mut item: JsonValue) -> Result<String, ClientError> {
        let obj = item
            .as_object_mut()
            .ok_or_else(|| ClientError::Decode("item must be a JSON object".to_string()))?;
        if obj.get("id").map_or(true, JsonValue::is_null) {
            let id = format!("{}_{}", collection, Utc::now().timestamp_millis());
            obj.insert("id".to_string(), JsonValue::from(id));
        }
        self.mutate(json!({ "action": "create", "collection": collection, "item": item }))
            .await
    }

    /// Replaces the record `id` with `item`. The target `id` overrides any `id` the
    /// payload still carries.
    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        mut item: JsonValue,
    ) -> Result<String, ClientError> {
        let obj = item
            .as_object_mut()
            .ok_or_else(|| ClientError::Decode("item must be a JSON object".to_string()))?;
        obj.insert("id".to_string(), JsonValue::from(id));
        self.mutate(json!({ "action": "update", "collection": collection, "id": id, "item": item }))
            .await
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), ClientError> {
        self.mutate(json!({ "action": "delete", "collection": collection, "id": id }))
            .await
            .map(|_| ())
    }

    /// Files an adoption request as the session's profile: stamps `applicantId` and
    /// `requestDate`, and starts it as `PENDING` unless a status is given.
    pub async fn submit_adoption_request(
        &self,
        session: &Session,
        mut item: JsonValue,
    ) -> Result<String, ClientError> {
        let obj = item
            .as_object_mut()
            .ok_or_else(|| ClientError::Decode("item must be a JSON object".to_string()))?;
        obj.insert(
            "applicantId".to_string(),
            JsonValue::from(session.profile_id.as_str()),
        );
        obj.insert(
            "requestDate".to_string(),
            JsonValue::from(Utc::now().to_rfc3339()),
        );
        obj.entry("status")
            .or_insert_with(|| JsonValue::from(RequestStatus::Pending.as_str()));
        self.create("adoption_requests", item).await
    }
}

fn is_adoption_requests(collection: &str) -> bool {
    matches!(collection, "adoption_requests" | "adoption-requests")
}

fn unwrap_data(row: JsonValue) -> JsonValue {
    match row {
        JsonValue::Object(mut obj) if obj.get("data").is_some_and(JsonValue::is_object) => {
            obj.remove("data").unwrap_or(JsonValue::Null)
        }
        other => other,
    }
}
