use chat_service::config::ChatConfig;
use chat_service::services::providers::mock::MockChatProvider;
use chat_service::services::providers::ChatProvider;
use chat_service::startup::Application;
use std::sync::Arc;

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawn the application on a random port with the given mock provider.
    pub async fn spawn(provider: MockChatProvider) -> Self {
        let mut config = ChatConfig::with_api_key("test-api-key");
        config.common.port = 0; // Random port for testing

        let provider: Arc<dyn ChatProvider> = Arc::new(provider);
        let app = Application::build_with_provider(config, provider)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp { address, client }
    }

    pub async fn post_chat(&self, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/chat", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to send request")
    }
}
