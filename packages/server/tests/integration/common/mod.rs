use std::net::SocketAddr;

use chrono::{Duration, Utc};
use ::common::{CacheConfig, FetchConfig};
use reqwest::Client;
use serde_json::{Value, json};
use tempfile::TempDir;
use upstream::UpstreamConfig;
use wiremock::matchers::{method, path, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use server::config::{AppConfig, CorsConfig, ServerConfig};
use server::state::AppState;

pub const PROJECT: &str = "proj";
pub const WEBHOOK: &str = "hook";
pub const TOKEN: &str = "test-token";

pub mod routes {
    pub const HEALTH: &str = "/health";
    pub const ATTEMPTS: &str = "/api/v1/attempts";
    pub const MESSAGES: &str = "/api/v1/messages";
    pub const DASHBOARD: &str = "/api/v1/dashboard";
    pub const DASHBOARD_REFRESH: &str = "/api/v1/dashboard/refresh";
    pub const DASHBOARD_LOAD_OLDER: &str = "/api/v1/dashboard/load-older";

    /// `path` scoped to the default test project and webhook.
    pub fn scoped(path: &str) -> String {
        format!("{path}?projectId={}&webhookId={}", super::PROJECT, super::WEBHOOK)
    }
}

pub mod upstream_paths {
    pub fn attempts() -> String {
        format!(
            "/v2021-10-04/hooks/projects/{}/{}/attempts",
            super::PROJECT,
            super::WEBHOOK
        )
    }

    pub fn messages() -> String {
        format!(
            "/v2021-10-04/hooks/projects/{}/{}/messages",
            super::PROJECT,
            super::WEBHOOK
        )
    }
}

/// A delivery attempt as the upstream API returns it.
pub fn attempt_json(id: &str, message_id: &str, minutes_ago: i64, code: i32) -> Value {
    json!({
        "id": id,
        "messageId": message_id,
        "projectId": PROJECT,
        "hookId": WEBHOOK,
        "createdAt": (Utc::now() - Duration::minutes(minutes_ago)).to_rfc3339(),
        "isFailure": code >= 300,
        "resultCode": code,
        "resultBody": if code >= 300 { "error" } else { "ok" },
    })
}

/// A message whose payload references `document_id`, or carries `raw`
/// verbatim when no document id is given.
pub fn message_json(id: &str, minutes_ago: i64, document_id: Option<&str>, raw: &str) -> Value {
    let payload = match document_id {
        Some(doc) => json!({ "after": { "_id": doc } }).to_string(),
        None => raw.to_string(),
    };
    json!({
        "id": id,
        "hookId": WEBHOOK,
        "createdAt": (Utc::now() - Duration::minutes(minutes_ago)).to_rfc3339(),
        "status": "delivered",
        "payload": payload,
    })
}

/// A running test server backed by a mock upstream.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub upstream: MockServer,
    pub cache_dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with a config adjusted by `configure` after the test defaults
    /// have been applied.
    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let upstream = MockServer::start().await;
        let cache_dir = TempDir::new().expect("Failed to create cache dir");

        let mut app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            upstream: UpstreamConfig {
                base_url: upstream.uri(),
                token: Some(TOKEN.to_string()),
                ..Default::default()
            },
            fetch: FetchConfig {
                max_pages: 1,
                ..Default::default()
            },
            replay: Default::default(),
            cache: CacheConfig {
                enabled: true,
                dir: cache_dir.path().to_path_buf(),
                ..Default::default()
            },
        };
        configure(&mut app_config);

        let state = AppState::from_config(app_config)
            .await
            .expect("Failed to build state");
        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            upstream,
            cache_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn post(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    /// Serve `attempts` for requests without a `before` anchor.
    pub async fn mount_recent_attempts(&self, attempts: Value) {
        Mock::given(method("GET"))
            .and(path(upstream_paths::attempts()))
            .and(query_param_is_missing("before"))
            .respond_with(ResponseTemplate::new(200).set_body_json(attempts))
            .mount(&self.upstream)
            .await;
    }

    /// Serve `messages` for requests without a `before` anchor.
    pub async fn mount_recent_messages(&self, messages: Value) {
        Mock::given(method("GET"))
            .and(path(upstream_paths::messages()))
            .and(query_param_is_missing("before"))
            .respond_with(ResponseTemplate::new(200).set_body_json(messages))
            .mount(&self.upstream)
            .await;
    }

    /// Serve `attempts` for any request not matched by an earlier mock.
    pub async fn mount_attempts(&self, attempts: Value) {
        Mock::given(method("GET"))
            .and(path(upstream_paths::attempts()))
            .respond_with(ResponseTemplate::new(200).set_body_json(attempts))
            .mount(&self.upstream)
            .await;
    }

    pub async fn mount_messages(&self, messages: Value) {
        Mock::given(method("GET"))
            .and(path(upstream_paths::messages()))
            .respond_with(ResponseTemplate::new(200).set_body_json(messages))
            .mount(&self.upstream)
            .await;
    }

    pub async fn mount_failure(&self, upstream_path: String, status: u16) {
        Mock::given(method("GET"))
            .and(path(upstream_path))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({"error": "down"})))
            .mount(&self.upstream)
            .await;
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }

    /// Message ids of the aggregates in a dashboard response, in order.
    pub fn message_ids(&self) -> Vec<String> {
        self.body["aggregates"]
            .as_array()
            .expect("response body should contain 'aggregates'")
            .iter()
            .map(|a| a["messageId"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}
