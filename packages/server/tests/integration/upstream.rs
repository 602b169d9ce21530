use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{
    TOKEN, TestApp, attempt_json, message_json,
    routes::{self, scoped},
    upstream_paths,
};

mod attempts_proxy {
    use super::*;

    #[tokio::test]
    async fn returns_attempts_inside_the_window() {
        let app = TestApp::spawn().await;
        app.mount_attempts(json!([
            attempt_json("a1", "msg-1", 5, 200),
            attempt_json("a2", "msg-2", 25 * 60, 200),
        ]))
        .await;

        let res = app.get(&scoped(routes::ATTEMPTS)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        let attempts = res.body["attempts"].as_array().unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0]["id"], "a1");
        assert_eq!(attempts[0]["messageId"], "msg-1");
        assert_eq!(res.body["hasMore"], true);
        assert!(res.body["window"]["start"].is_string());
        assert!(res.body["window"]["end"].is_string());
    }

    #[tokio::test]
    async fn forwards_offset_limit_and_token() {
        let app = TestApp::spawn().await;
        Mock::given(method("GET"))
            .and(path(upstream_paths::attempts()))
            .and(query_param("offset", "100"))
            .and(query_param("limit", "10"))
            .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([attempt_json("a1", "msg-1", 1, 200)])),
            )
            .expect(1)
            .mount(&app.upstream)
            .await;

        let res = app
            .get(&format!("{}&offset=100&limit=10", scoped(routes::ATTEMPTS)))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["attempts"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn limit_is_capped_at_upstream_maximum() {
        let app = TestApp::spawn().await;
        app.mount_attempts(json!([])).await;

        let res = app
            .get(&format!("{}&limit=500", scoped(routes::ATTEMPTS)))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let requests = app.upstream.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(
            requests[0]
                .url
                .query_pairs()
                .any(|(k, v)| k == "limit" && v == "50")
        );
    }

    #[tokio::test]
    async fn missing_webhook_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .get(&format!("{}?projectId=proj", routes::ATTEMPTS))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "MISSING_PARAMETER");
        assert!(res.text.contains("webhookId"));
        assert!(app.upstream.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn every_page_failing_is_a_bad_gateway() {
        let app = TestApp::spawn().await;
        app.mount_failure(upstream_paths::attempts(), 500).await;

        let res = app.get(&scoped(routes::ATTEMPTS)).await;

        assert_eq!(res.status, 502, "{}", res.text);
        assert_eq!(res.code(), "UPSTREAM_UNAVAILABLE");
    }

    #[tokio::test]
    async fn partial_page_failures_are_tolerated() {
        let app = TestApp::spawn_with(|config| config.fetch.max_pages = 2).await;
        Mock::given(method("GET"))
            .and(path(upstream_paths::attempts()))
            .and(query_param("offset", "0"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([attempt_json("a1", "msg-1", 1, 200)])),
            )
            .mount(&app.upstream)
            .await;
        app.mount_failure(upstream_paths::attempts(), 503).await;

        let res = app.get(&scoped(routes::ATTEMPTS)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["attempts"].as_array().unwrap().len(), 1);
    }
}

mod messages_proxy {
    use super::*;

    #[tokio::test]
    async fn reports_older_data_availability() {
        let app = TestApp::spawn().await;
        app.mount_messages(json!([message_json("msg-1", 5, Some("doc-1"), "")]))
            .await;

        let res = app.get(&scoped(routes::MESSAGES)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(res.body["messages"][0]["id"], "msg-1");
        assert_eq!(res.body["window"]["olderDataAvailable"], true);
    }

    #[tokio::test]
    async fn before_anchors_the_window() {
        let app = TestApp::spawn().await;
        app.mount_messages(json!([])).await;

        let res = app
            .get(&format!(
                "{}&before=2025-09-01T08:00:00Z",
                scoped(routes::MESSAGES)
            ))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["window"]["end"], "2025-09-01T08:00:00Z");
        assert_eq!(res.body["window"]["start"], "2025-08-31T08:00:00Z");
        let requests = app.upstream.received_requests().await.unwrap();
        assert!(requests[0].url.query_pairs().any(|(k, _)| k == "before"));
    }

    #[tokio::test]
    async fn missing_token_is_a_misconfiguration() {
        let app = TestApp::spawn_with(|config| config.upstream.token = None).await;

        let res = app.get(&scoped(routes::MESSAGES)).await;

        assert_eq!(res.status, 500, "{}", res.text);
        assert_eq!(res.code(), "MISCONFIGURATION");
    }
}

mod health {
    use super::*;

    #[tokio::test]
    async fn health_reports_ok() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::HEALTH).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "ok");
    }

    #[tokio::test]
    async fn openapi_document_lists_dashboard_routes() {
        let app = TestApp::spawn().await;

        let res = app.get("/api-docs/openapi.json").await;

        assert_eq!(res.status, 200);
        let paths = res.body["paths"].as_object().unwrap();
        assert!(paths.contains_key(routes::DASHBOARD));
        assert!(paths.contains_key(routes::DASHBOARD_REFRESH));
        assert!(paths.contains_key(routes::DASHBOARD_LOAD_OLDER));
        assert!(paths.contains_key(routes::ATTEMPTS));
    }
}
