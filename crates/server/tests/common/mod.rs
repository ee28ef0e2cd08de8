//! # Common Test Utilities
//!
//! `TestApp` spawns the real router on a random port. The AI provider is the
//! real `OpenAiCompatibleProvider` pointed at an `httpmock::MockServer`, and the
//! database is a `MockStorage`, so endpoint tests need no network or Postgres.

// Not every test file uses every helper.
#![allow(unused)]

use anyhow::Result;
use axum::serve;
use datachat::{
    providers::ai::{openai::OpenAiCompatibleProvider, GenerationParams},
    SqlChatBuilder,
};
use datachat_server::{router::create_router, state::AppState};
use datachat_test_utils::MockStorage;
use httpmock::{Method::POST, Mock, MockServer};
use reqwest::Client;
use serde_json::json;
use std::net::SocketAddr;
use tokio::{net::TcpListener, task::JoinHandle};

pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// A harness for end-to-end testing of the Axum server.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    pub storage: MockStorage,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestApp {
    /// Spawns the application server and returns a `TestApp` instance.
    pub async fn spawn() -> Result<Self> {
        dotenvy::dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .try_init();

        let mock_server = MockServer::start_async().await;
        let storage = MockStorage::new();

        let ai_provider = OpenAiCompatibleProvider::new(
            mock_server.url(COMPLETIONS_PATH),
            Some("test-key".to_string()),
            Some("mock-model".to_string()),
            GenerationParams::default(),
        )?;
        let chat = SqlChatBuilder::new()
            .ai_provider(Box::new(ai_provider))
            .storage_provider(Box::new(storage.clone()))
            .build()?;
        let app_state = AppState::new(chat);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server_handle = tokio::spawn(async move {
            let app = create_router(app_state);
            let server = serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            storage,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Makes the mock model answer with `content` for prompts containing `question`.
    pub async fn mock_completion(&self, question: &str, content: &str) -> Mock<'_> {
        self.mock_server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(COMPLETIONS_PATH)
                    .body_contains(question);
                then.status(200).json_body(json!({
                    "choices": [{
                        "message": { "role": "assistant", "content": content }
                    }]
                }));
            })
            .await
    }

    pub async fn post_json(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(format!("{}{path}", self.address))
            .json(&body)
            .send()
            .await?)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
