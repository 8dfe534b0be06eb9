//! Typed wrappers around the lab platform's HTTP contract. The platform
//! itself (provisioning, containers, grading) stays on the other side of
//! these endpoints.

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("lab server is unreachable")]
    Unavailable,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::Unavailable
        } else {
            Self::Other(err.into())
        }
    }

    pub fn from_tungstenite(err: tungstenite::Error) -> Self {
        let is_connect = match &err {
            tungstenite::Error::Io(io_err) => matches!(
                io_err.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        };
        if is_connect {
            Self::Unavailable
        } else {
            Self::Other(err.into())
        }
    }
}

/// One lab server. Knows how to derive every endpoint from the base URL,
/// including the terminal endpoint's scheme: `wss` iff the base is `https`.
#[derive(Debug, Clone)]
pub struct LabServer {
    base: String,
}

impl LabServer {
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self { base }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn labs_url(&self) -> String {
        format!("{}/api/labs/", self.base)
    }

    pub fn lab_url(&self, lab_id: u64) -> String {
        format!("{}/api/labs/{}", self.base, lab_id)
    }

    pub fn start_url(&self, lab_id: u64) -> String {
        format!("{}/api/labs/{}/start", self.base, lab_id)
    }

    pub fn stop_url(&self, instance_id: u64) -> String {
        format!("{}/api/labs/instances/{}/stop", self.base, instance_id)
    }

    /// Terminal endpoint for an instance, scheme-matched to the base URL.
    pub fn ws_url(&self, instance_id: u64) -> String {
        let ws_base = if let Some(rest) = self.base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            format!("ws://{}", self.base)
        };
        format!("{ws_base}/api/labs/ws/{instance_id}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabSummary {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub category: String,
    pub estimated_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabDetails {
    pub id: u64,
    pub title: String,
    pub description: String,
    /// Markdown lab guide.
    pub content: String,
    pub difficulty: String,
    pub category: String,
    #[serde(default)]
    pub time_limit: u32,
    #[serde(default)]
    pub objectives: Vec<String>,
}

/// The session handle: issued on start, consumed by attach/stop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabInstance {
    pub instance_id: u64,
    pub status: String,
    #[serde(default)]
    pub container_id: Option<String>,
    #[serde(default)]
    pub message: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    server: LabServer,
}

impl ApiClient {
    pub fn new(server: LabServer) -> Self {
        Self {
            http: reqwest::Client::new(),
            server,
        }
    }

    pub fn server(&self) -> &LabServer {
        &self.server
    }

    pub async fn labs(&self) -> Result<Vec<LabSummary>, ApiError> {
        let resp = self
            .http
            .get(self.server.labs_url())
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;
        Self::expect_success(resp, "list labs")
            .await?
            .json()
            .await
            .map_err(ApiError::from_reqwest)
    }

    pub async fn lab(&self, lab_id: u64) -> Result<LabDetails, ApiError> {
        let resp = self
            .http
            .get(self.server.lab_url(lab_id))
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;
        Self::expect_success(resp, "fetch lab")
            .await?
            .json()
            .await
            .map_err(ApiError::from_reqwest)
    }

    /// Start an instance of the lab. The server returns the existing
    /// instance when one is already running for this user and lab.
    pub async fn start_lab(&self, lab_id: u64) -> Result<LabInstance, ApiError> {
        let resp = self
            .http
            .post(self.server.start_url(lab_id))
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;
        Self::expect_success(resp, "start lab")
            .await?
            .json()
            .await
            .map_err(ApiError::from_reqwest)
    }

    pub async fn stop_instance(&self, instance_id: u64) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(self.server.stop_url(instance_id))
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;
        Self::expect_success(resp, "stop instance").await?;
        Ok(())
    }

    async fn expect_success(
        resp: reqwest::Response,
        action: &str,
    ) -> Result<reqwest::Response, ApiError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(anyhow!("failed to {action}: {status} {body}").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    // -- LabServer URL derivation --

    #[test]
    fn ws_url_matches_http_base_scheme() {
        let server = LabServer::new("http://lab.example.org:8000");
        assert_eq!(
            server.ws_url(7),
            "ws://lab.example.org:8000/api/labs/ws/7"
        );
    }

    #[test]
    fn ws_url_matches_https_base_scheme() {
        let server = LabServer::new("https://lab.example.org:8000");
        assert_eq!(
            server.ws_url(7),
            "wss://lab.example.org:8000/api/labs/ws/7"
        );
    }

    #[test]
    fn trailing_slashes_are_normalized() {
        let server = LabServer::new("http://127.0.0.1:8000///");
        assert_eq!(server.base_url(), "http://127.0.0.1:8000");
        assert_eq!(server.labs_url(), "http://127.0.0.1:8000/api/labs/");
    }

    #[test]
    fn endpoint_paths() {
        let server = LabServer::new("http://127.0.0.1:8000");
        assert_eq!(server.lab_url(3), "http://127.0.0.1:8000/api/labs/3");
        assert_eq!(
            server.start_url(3),
            "http://127.0.0.1:8000/api/labs/3/start"
        );
        assert_eq!(
            server.stop_url(12),
            "http://127.0.0.1:8000/api/labs/instances/12/stop"
        );
    }

    // -- error classification --

    #[tokio::test]
    async fn connect_error_yields_unavailable() {
        // Port 1 is reserved and nothing listens on it
        let err = reqwest::get("http://127.0.0.1:1/api/labs/").await.unwrap_err();
        assert!(err.is_connect());
        assert!(matches!(ApiError::from_reqwest(err), ApiError::Unavailable));
    }

    #[test]
    fn tungstenite_connection_refused_yields_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = tungstenite::Error::Io(io);
        assert!(matches!(
            ApiError::from_tungstenite(err),
            ApiError::Unavailable
        ));
    }

    #[test]
    fn tungstenite_other_errors_stay_other() {
        let err = tungstenite::Error::ConnectionClosed;
        assert!(matches!(ApiError::from_tungstenite(err), ApiError::Other(_)));
    }

    // -- model defaults --

    #[test]
    fn lab_instance_optional_fields_default() {
        let json = r#"{"instance_id": 4, "status": "running"}"#;
        let instance: LabInstance = serde_json::from_str(json).unwrap();
        assert_eq!(instance.instance_id, 4);
        assert!(instance.container_id.is_none());
        assert_eq!(instance.message, "");
    }

    #[test]
    fn lab_details_defaults() {
        let json = r##"{
            "id": 1, "title": "Recon basics", "description": "d",
            "content": "# Guide", "difficulty": "beginner", "category": "recon"
        }"##;
        let details: LabDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.time_limit, 0);
        assert!(details.objectives.is_empty());
    }

    // -- against a stub server --

    fn sample_lab() -> LabSummary {
        LabSummary {
            id: 1,
            title: "Network scanning".to_string(),
            description: "Find open ports".to_string(),
            difficulty: "beginner".to_string(),
            category: "networking".to_string(),
            estimated_minutes: 30,
        }
    }

    async fn spawn_api_stub() -> u16 {
        let app = Router::new()
            .route("/api/labs/", get(|| async { Json(vec![sample_lab()]) }))
            .route(
                "/api/labs/{id}/start",
                post(|| async {
                    Json(LabInstance {
                        instance_id: 99,
                        status: "running".to_string(),
                        container_id: Some("c0ffee".to_string()),
                        message: "Lab started successfully".to_string(),
                    })
                }),
            )
            .route(
                "/api/labs/instances/{id}/stop",
                post(|| async { Json(serde_json::json!({"message": "Lab stopped"})) }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        port
    }

    #[tokio::test]
    async fn lists_starts_and_stops_against_stub() {
        let port = spawn_api_stub().await;
        let api = ApiClient::new(LabServer::new(format!("http://127.0.0.1:{port}")));

        let labs = api.labs().await.unwrap();
        assert_eq!(labs.len(), 1);
        assert_eq!(labs[0].title, "Network scanning");

        let instance = api.start_lab(1).await.unwrap();
        assert_eq!(instance.instance_id, 99);
        assert_eq!(instance.status, "running");

        api.stop_instance(instance.instance_id).await.unwrap();
    }

    #[tokio::test]
    async fn non_success_status_carries_status_and_body() {
        let port = spawn_api_stub().await;
        let api = ApiClient::new(LabServer::new(format!("http://127.0.0.1:{port}")));

        // No such route on the stub
        let err = api.lab(123).await.unwrap_err();
        match err {
            ApiError::Other(inner) => {
                let text = inner.to_string();
                assert!(text.contains("fetch lab"), "got: {text}");
                assert!(text.contains("404"), "got: {text}");
            }
            ApiError::Unavailable => panic!("expected Other, got Unavailable"),
        }
    }
}
