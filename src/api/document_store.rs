use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::PersistenceError,
    landing::collaborators::DocumentStore,
    models::waitlist_models::WaitlistEntry,
};

#[derive(Deserialize)]
struct CreatedDocument {
    #[serde(default)]
    id: Option<String>,
}

/// Document store reached over HTTP: `POST {base_url}/waitlist` with the
/// entry as JSON, answered by `{"id": "..."}`.
pub struct HttpDocumentStore {
    client: Client,
    base_url: Option<String>,
    api_key: Option<String>,
}

impl HttpDocumentStore {
    pub fn new(
        base_url: Option<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url, api_key })
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn add_waitlist_entry(&self, entry: &WaitlistEntry) -> Result<String, PersistenceError> {
        let base_url = self.base_url.as_deref().ok_or(PersistenceError::NotConfigured)?;

        let mut request = self.client.post(format!("{}/waitlist", base_url)).json(entry);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PersistenceError::Remote(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PersistenceError::Remote(format!("{}: {}", status, error_text)));
        }

        let created: CreatedDocument = response
            .json()
            .await
            .map_err(|e| PersistenceError::Remote(format!("Failed to parse response: {}", e)))?;

        match created.id {
            Some(id) if !id.trim().is_empty() => Ok(id),
            _ => Err(PersistenceError::EmptyIdentifier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use chrono::Utc;
    use serde_json::{json, Value};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn store(base_url: Option<String>) -> HttpDocumentStore {
        HttpDocumentStore::new(base_url, Some("store-key".to_string()), Duration::from_secs(2)).unwrap()
    }

    fn entry() -> WaitlistEntry {
        WaitlistEntry::new("user@example.com", Utc::now())
    }

    #[tokio::test]
    async fn unconfigured_store_fails_fast() {
        let err = store(None).add_waitlist_entry(&entry()).await.unwrap_err();
        assert!(matches!(err, PersistenceError::NotConfigured));
    }

    #[tokio::test]
    async fn created_id_is_returned() {
        let app = Router::new().route(
            "/waitlist",
            post(|headers: axum::http::HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["authorization"], "Bearer store-key");
                assert_eq!(body["email"], "user@example.com");
                assert_eq!(body["source"], "landing_waitlist");
                Json(json!({"id": "doc-42"}))
            }),
        );
        let base_url = serve(app).await;

        let id = store(Some(base_url)).add_waitlist_entry(&entry()).await.unwrap();
        assert_eq!(id, "doc-42");
    }

    #[tokio::test]
    async fn missing_id_is_an_empty_identifier() {
        let app = Router::new().route("/waitlist", post(|| async { Json(json!({"id": ""})) }));
        let base_url = serve(app).await;

        let err = store(Some(base_url)).add_waitlist_entry(&entry()).await.unwrap_err();
        assert!(matches!(err, PersistenceError::EmptyIdentifier));
    }

    #[tokio::test]
    async fn error_status_is_a_remote_failure() {
        let app = Router::new().route(
            "/waitlist",
            post(|| async { (StatusCode::FORBIDDEN, "permission denied") }),
        );
        let base_url = serve(app).await;

        let err = store(Some(base_url)).add_waitlist_entry(&entry()).await.unwrap_err();
        match err {
            PersistenceError::Remote(msg) => assert!(msg.contains("403")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
