//! Test helpers: wire stores and actions to an `ApiClient` pointed at a
//! mockito server.

use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, Mock, ServerGuard};
use openexam_api_client::{ApiClient, Auth};
use openexam_core::ClientConfig;
use openexam_sync::{EventBus, FileActions, FileStore, StoreConfig};

pub const FILES_PATH: &str = "/api/cheatsheet/files";

/// Test harness: mock server, client and a shared event bus.
pub struct TestApp {
    pub server: ServerGuard,
    pub client: Arc<ApiClient>,
    pub config: ClientConfig,
    pub bus: EventBus,
}

impl TestApp {
    pub async fn start() -> Self {
        let server = mockito::Server::new_async().await;
        let config = ClientConfig {
            api_url: server.url(),
            access_token: Some("test-token".to_string()),
            user_id: Some("7".to_string()),
            request_timeout: Duration::from_secs(5),
            refresh_debounce: Duration::from_millis(20),
            ..ClientConfig::default()
        };
        let client = Arc::new(
            ApiClient::new(server.url(), Auth::Bearer("test-token".to_string())).unwrap(),
        );
        Self {
            server,
            client,
            config,
            bus: EventBus::new(),
        }
    }

    pub fn store(&self) -> Arc<FileStore> {
        FileStore::new(self.client.clone(), StoreConfig::from(&self.config))
    }

    pub fn actions(&self, store: Arc<FileStore>) -> FileActions {
        FileActions::new(self.client.clone(), store, self.bus.clone(), &self.config)
    }

    /// Serve `files` from the listing endpoint until the returned mock is removed.
    pub async fn serve_listing(&mut self, files: &[(&str, &str, &str)]) -> Mock {
        let body = serde_json::json!({
            "files": files
                .iter()
                .map(|(id, key, created_at)| serde_json::json!({
                    "id": id,
                    "key": key,
                    "name": key.rsplit('/').next().unwrap_or(key),
                    "userId": "7",
                    "createdAt": created_at,
                }))
                .collect::<Vec<_>>()
        });
        self.server
            .mock("GET", FILES_PATH)
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    pub async fn accept_delete(&mut self, category: &str, filename: &str) -> Mock {
        self.server
            .mock("DELETE", FILES_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("file_type".into(), category.into()),
                Matcher::UrlEncoded("file".into(), filename.into()),
            ]))
            .with_status(200)
            .with_body(r#"{"deleted":true}"#)
            .create_async()
            .await
    }
}

/// Give debounced refreshes and bus handlers time to run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}
