//! Test helper functions and utilities.

use classkit_api::build_app;
use classkit_core::ports::LicenseStore;
use classkit_db::MemoryLicenseStore;
use classkit_licensing::LicenseRegistry;
use reqwest::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Start the license service over `registry` and return its address.
pub async fn start_test_server(
    registry: LicenseRegistry,
    admin_token: Option<String>,
) -> anyhow::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let app = build_app(registry, admin_token);
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Ok((addr, handle))
}

/// A running service over a seeded in-memory registry.
pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: LicenseRegistry,
    pub client: ApiTestClient,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start(admin_token: Option<&str>) -> anyhow::Result<Self> {
        Self::start_with_store(Arc::new(MemoryLicenseStore::new()), admin_token).await
    }

    pub async fn start_with_store(
        store: Arc<dyn LicenseStore>,
        admin_token: Option<&str>,
    ) -> anyhow::Result<Self> {
        crate::init_test_logging();

        let registry = LicenseRegistry::new(store);
        registry.ensure_seeded().await?;

        let (addr, handle) =
            start_test_server(registry.clone(), admin_token.map(str::to_string)).await?;
        let mut client = ApiTestClient::new(addr);
        if let Some(token) = admin_token {
            client = client.with_token(token);
        }

        Ok(Self {
            addr,
            registry,
            client,
            handle,
        })
    }

    /// Base URL for `HttpLicenseAuthority`.
    pub fn api_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Create an HTTP client for testing.
pub fn test_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .expect("Failed to create test client")
}

/// API test client with base URL.
pub struct ApiTestClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiTestClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            client: test_client(),
            base_url: format!("http://{}", addr),
            token: None,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let req = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    pub async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.request(reqwest::Method::GET, path).send().await
    }

    pub async fn post<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> reqwest::Result<reqwest::Response> {
        self.request(reqwest::Method::POST, path).json(body).send().await
    }

    pub async fn delete(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.request(reqwest::Method::DELETE, path).send().await
    }

    /// Check health endpoint.
    pub async fn health(&self) -> anyhow::Result<bool> {
        let resp = self.get("/health").await?;
        Ok(resp.status().is_success())
    }

    /// Activate `code` for `device_id` through the device-facing route.
    pub async fn activate(&self, code: &str, device_id: &str) -> reqwest::Result<reqwest::Response> {
        self.post(
            &format!("/api/v1/licenses/{}/activate", code),
            &serde_json::json!({ "deviceId": device_id, "deviceName": format!("device {}", device_id) }),
        )
        .await
    }
}

/// Wait for a condition with timeout.
pub async fn wait_for<F, Fut>(
    timeout: std::time::Duration,
    interval: std::time::Duration,
    mut condition: F,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_for_immediate() {
        let result = wait_for(
            std::time::Duration::from_secs(1),
            std::time::Duration::from_millis(10),
            || async { true },
        )
        .await;
        assert!(result);
    }

    #[tokio::test]
    async fn test_wait_for_timeout() {
        let result = wait_for(
            std::time::Duration::from_millis(100),
            std::time::Duration::from_millis(10),
            || async { false },
        )
        .await;
        assert!(!result);
    }

    #[tokio::test]
    async fn test_server_starts_seeded() {
        let server = TestServer::start(None).await.unwrap();
        assert!(server.client.health().await.unwrap());
        assert_eq!(
            server.registry.stats().await.unwrap().len(),
            classkit_licensing::PREDEFINED_CODES.len()
        );
    }
}
