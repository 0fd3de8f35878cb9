// File: ./src/client/core.rs
use crate::client::error::ApiError;
use crate::client::tls::build_connector;
use crate::config::Config;
use crate::model::adapter::{created_id, error_message, unwrap_list, unwrap_object};
use crate::model::{Alert, Checklist, ChecklistItem, ItemStatus, Suggestion, TripDetails};

use futures::stream::{self, StreamExt};
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{Method, Request};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

type HttpsClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// REST client for the PackPal backend.
///
/// One request per call with a fixed deadline; nothing is retried.
#[derive(Clone)]
pub struct PackClient {
    http: Option<HttpsClient>,
    base_url: String,
    token: String,
    timeout: Duration,
}

impl fmt::Debug for PackClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackClient")
            .field("base_url", &self.base_url)
            .field("online", &self.http.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PackClient {
    /// An empty `url` yields an offline client whose calls all fail with
    /// [`ApiError::Offline`].
    pub fn new(url: &str, token: &str, insecure: bool) -> Result<Self, String> {
        let base_url = url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Ok(Self {
                http: None,
                base_url,
                token: token.to_string(),
                timeout: DEFAULT_TIMEOUT,
            });
        }

        base_url
            .parse::<http::Uri>()
            .map_err(|e: http::uri::InvalidUri| e.to_string())?;

        let connector = build_connector(insecure)?;
        let http_client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            http: Some(http_client),
            base_url,
            token: token.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, String> {
        Ok(Self::new(&config.url, &config.token, config.allow_insecure_certs)?
            .with_timeout(Duration::from_secs(config.request_timeout_secs.max(1))))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        let http = self.http.as_ref().ok_or(ApiError::Offline)?;
        let uri = format!("{}{}", self.base_url, path);

        let payload = match &body {
            Some(v) => serde_json::to_vec(v).map_err(|e| ApiError::Decode(e.to_string()))?,
            None => Vec::new(),
        };
        let req = Request::builder()
            .method(method.clone())
            .uri(&uri)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .body(Full::new(Bytes::from(payload)))
            .map_err(|e| ApiError::Network(e.to_string()))?;

        debug!("{} {}", method, path);

        let exchange = async {
            let resp = http
                .request(req)
                .await
                .map_err(|e| ApiError::Network(format!("{:?}", e)))?;
            let status = resp.status();
            let bytes = resp
                .into_body()
                .collect()
                .await
                .map_err(|e| ApiError::Network(e.to_string()))?
                .to_bytes();
            Ok::<_, ApiError>((status, bytes))
        };

        let (status, bytes) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ApiError::Timeout(self.timeout))??;

        debug!("{} {} -> {}", method, path, status);

        let parsed = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice::<Value>(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        if !status.is_success() {
            let message = error_message(&parsed)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(parsed)
    }

    // --- Checklists ---

    pub async fn list_checklists(&self) -> Result<Vec<Checklist>, ApiError> {
        let body = self.send(Method::GET, "/api/checklists", None).await?;
        expect_listish(&body, "checklists")?;

        let mut checklists = Vec::new();
        for raw in unwrap_list(&body, "checklists") {
            match Checklist::from_api(raw) {
                Ok(c) => checklists.push(c),
                Err(e) => warn!("Skipping checklist: {}", e),
            }
        }
        Ok(checklists)
    }

    pub async fn get_checklist(&self, id: &str) -> Result<(Checklist, Vec<ChecklistItem>), ApiError> {
        let body = self
            .send(Method::GET, &format!("/api/checklists/{}", id), None)
            .await?;
        let map = unwrap_object(&body, "checklist")
            .ok_or_else(|| ApiError::Decode("checklist is not an object".to_string()))?;
        let checklist_value = Value::Object(map.clone());
        let checklist = Checklist::from_api(&checklist_value).map_err(ApiError::Decode)?;

        let mut items = Vec::new();
        if let Some(raw_items) = map.get("items").and_then(Value::as_array) {
            for raw in raw_items {
                match ChecklistItem::from_api(raw, Some(&checklist.id)) {
                    Ok(item) => items.push(item),
                    Err(e) => warn!("Skipping item in checklist {}: {}", checklist.id, e),
                }
            }
        }
        Ok((checklist, items))
    }

    /// Fetches several checklists concurrently; failures are left out.
    pub async fn get_all_checklists(
        &self,
        checklists: &[Checklist],
    ) -> Vec<(Checklist, Vec<ChecklistItem>)> {
        let ids: Vec<String> = checklists.iter().map(|c| c.id.clone()).collect();
        let futures = ids.into_iter().map(|id| {
            let client = self.clone();
            async move { (id.clone(), client.get_checklist(&id).await) }
        });
        let mut stream = stream::iter(futures).buffer_unordered(4);
        let mut results = Vec::new();
        while let Some((id, res)) = stream.next().await {
            match res {
                Ok(found) => results.push(found),
                Err(e) => warn!("Could not fetch checklist {}: {}", id, e),
            }
        }
        results
    }

    pub async fn create_checklist(&self, title: &str) -> Result<Checklist, ApiError> {
        let body = self
            .send(
                Method::POST,
                "/api/checklists",
                Some(json!({ "title": title, "name": title })),
            )
            .await?;
        let id = created_id(&body, "checklist", "checklist_id")
            .ok_or_else(|| ApiError::Decode("no checklist id in response".to_string()))?;
        Ok(Checklist {
            id,
            title: title.to_string(),
            created_at: Some(chrono::Utc::now()),
        })
    }

    pub async fn rename_checklist(&self, id: &str, title: &str) -> Result<(), ApiError> {
        self.send(
            Method::PUT,
            &format!("/api/checklists/{}", id),
            Some(json!({ "title": title, "name": title })),
        )
        .await
        .map(|_| ())
    }

    pub async fn delete_checklist(&self, id: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, &format!("/api/checklists/{}", id), None)
            .await
            .map(|_| ())
    }

    // --- Items ---

    /// Creates `item` remotely and returns the server-assigned id.
    pub async fn create_item(&self, item: &ChecklistItem) -> Result<String, ApiError> {
        let body = self
            .send(Method::POST, "/api/checklist-items", Some(item.to_api_create()))
            .await?;
        created_id(&body, "item", "item_id")
            .ok_or_else(|| ApiError::Decode("no item id in response".to_string()))
    }

    /// Sends a partial update. An empty change set does not hit the network.
    pub async fn update_item(&self, id: &str, changes: Value) -> Result<(), ApiError> {
        if changes.as_object().is_some_and(|m| m.is_empty()) {
            return Ok(());
        }
        self.send(
            Method::PUT,
            &format!("/api/checklist-items/{}", id),
            Some(changes),
        )
        .await
        .map(|_| ())
    }

    pub async fn update_status(&self, id: &str, status: ItemStatus) -> Result<(), ApiError> {
        self.update_item(id, json!({ "status": status.as_str() }))
            .await
    }

    /// Deleting an item the server no longer knows about succeeds.
    pub async fn delete_item(&self, id: &str) -> Result<(), ApiError> {
        match self
            .send(Method::DELETE, &format!("/api/checklist-items/{}", id), None)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!("Item {} already gone on server", id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    // --- Alerts & suggestions ---

    pub async fn list_alerts(&self) -> Result<Vec<Alert>, ApiError> {
        let body = self.send(Method::GET, "/api/alerts", None).await?;
        expect_listish(&body, "alerts")?;
        let mut alerts = Vec::new();
        for raw in unwrap_list(&body, "alerts") {
            match Alert::from_api(raw) {
                Ok(a) => alerts.push(a),
                Err(e) => warn!("Skipping alert: {}", e),
            }
        }
        Ok(alerts)
    }

    pub async fn mark_alert_read(&self, id: &str) -> Result<(), ApiError> {
        self.send(Method::PUT, &format!("/api/alerts/{}/read", id), None)
            .await
            .map(|_| ())
    }

    pub async fn get_suggestions(&self, trip: &TripDetails) -> Result<Vec<Suggestion>, ApiError> {
        let payload = serde_json::to_value(trip).map_err(|e| ApiError::Decode(e.to_string()))?;
        let body = self
            .send(Method::POST, "/api/suggestions", Some(payload))
            .await?;
        let list = body
            .get("suggestions")
            .cloned()
            .ok_or_else(|| ApiError::Decode("no suggestions in response".to_string()))?;
        serde_json::from_value(list).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn expect_listish(body: &Value, key: &str) -> Result<(), ApiError> {
    let ok = body.is_array() || body.get(key).is_some_and(Value::is_array);
    if ok {
        Ok(())
    } else {
        Err(ApiError::Decode(format!("expected a list of {}", key)))
    }
}
