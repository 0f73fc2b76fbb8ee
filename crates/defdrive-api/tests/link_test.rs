//! API tests for public link serving.

mod helpers;

use axum::http::{StatusCode, header};
use chrono::{Duration, Utc};
use serde_json::json;

use helpers::{DEFAULT_PEER, TestApp, link_of};

#[tokio::test]
async fn test_serves_file_as_attachment() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;
    let file_id = app.upload_hello(&token, true).await;
    let link = link_of(&app.create_access(&token, &file_id, json!({ "public": true })).await);

    let response = app.get_link(&link, DEFAULT_PEER, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..], b"hello world");
    let disposition = response.headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"hello.txt\""));
    assert_eq!(response.headers[header::CONTENT_TYPE], "text/plain");
}

#[tokio::test]
async fn test_unknown_link_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .get_link("00000000000000000000000000000000", DEFAULT_PEER, None)
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.error_code(), "NotFound");
}

#[tokio::test]
async fn test_one_time_link_serves_once() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;
    let file_id = app.upload_hello(&token, true).await;
    let link = link_of(
        &app.create_access(&token, &file_id, json!({ "public": true, "oneTimeUse": true }))
            .await,
    );

    assert_eq!(app.get_link(&link, DEFAULT_PEER, None).await.status, StatusCode::OK);

    let response = app.get_link(&link, DEFAULT_PEER, None).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), "AlreadyUsed");
}

#[tokio::test]
async fn test_one_time_link_under_concurrency() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;
    let file_id = app.upload_hello(&token, true).await;
    let link = link_of(
        &app.create_access(&token, &file_id, json!({ "public": true, "oneTimeUse": true }))
            .await,
    );

    let responses =
        futures::future::join_all((0..12).map(|_| app.get_link(&link, DEFAULT_PEER, None))).await;

    let served = responses
        .iter()
        .filter(|r| r.status == StatusCode::OK)
        .count();
    assert_eq!(served, 1);
    assert!(
        responses
            .iter()
            .filter(|r| r.status != StatusCode::OK)
            .all(|r| r.status == StatusCode::FORBIDDEN)
    );
}

#[tokio::test]
async fn test_private_file_needs_authenticated_caller() {
    let app = TestApp::new().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let file_id = app.upload_hello(&alice, false).await;
    let link = link_of(&app.create_access(&alice, &file_id, json!({ "public": true })).await);

    let response = app.get_link(&link, DEFAULT_PEER, None).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), "NotPublic");

    // A broken token is treated as anonymous, not as an error.
    let response = app.get_link(&link, DEFAULT_PEER, Some("garbage")).await;
    assert_eq!(response.error_code(), "NotPublic");

    let response = app.get_link(&link, DEFAULT_PEER, Some(&bob)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_ip_allow_list() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;
    let file_id = app.upload_hello(&token, true).await;
    let link = link_of(
        &app.create_access(&token, &file_id, json!({ "public": true, "ips": ["198.51.100.9"] }))
            .await,
    );

    let response = app.get_link(&link, DEFAULT_PEER, None).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), "IPNotAllowed");

    let response = app.get_link(&link, "198.51.100.9", None).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_subnet_allow_list() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;
    let file_id = app.upload_hello(&token, true).await;
    let link = link_of(
        &app.create_access(
            &token,
            &file_id,
            json!({ "public": true, "subnets": ["10.20.0.0/16"] }),
        )
        .await,
    );

    let response = app.get_link(&link, DEFAULT_PEER, None).await;
    assert_eq!(response.error_code(), "SubnetNotAllowed");

    let response = app.get_link(&link, "10.20.30.40", None).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_forwarded_header_needs_trusted_proxy() {
    let settings = json!({ "public": true, "ips": ["198.51.100.9"] });
    let forwarded = [("x-forwarded-for", "198.51.100.9")];

    let app = TestApp::new().await;
    let token = app.register("alice").await;
    let file_id = app.upload_hello(&token, true).await;
    let link = link_of(&app.create_access(&token, &file_id, settings.clone()).await);
    let response = app
        .get_link_with(&link, DEFAULT_PEER, None, &forwarded)
        .await;
    assert_eq!(response.error_code(), "IPNotAllowed");

    let app = TestApp::with_config(|config| {
        config.server.trusted_proxies = vec!["203.0.113.0/24".to_string()];
    })
    .await;
    let token = app.register("alice").await;
    let file_id = app.upload_hello(&token, true).await;
    let link = link_of(&app.create_access(&token, &file_id, settings).await);
    let response = app
        .get_link_with(&link, DEFAULT_PEER, None, &forwarded)
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_ttl_budget() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;
    let file_id = app.upload_hello(&token, true).await;
    let created = app
        .create_access(
            &token,
            &file_id,
            json!({ "public": true, "enableTTL": true, "ttl": 2 }),
        )
        .await;
    let link = link_of(&created);

    assert_eq!(app.get_link(&link, DEFAULT_PEER, None).await.status, StatusCode::OK);
    assert_eq!(app.get_link(&link, DEFAULT_PEER, None).await.status, StatusCode::OK);

    let response = app.get_link(&link, DEFAULT_PEER, None).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), "TTLExhausted");

    let access_id = created["access"]["id"].as_str().unwrap();
    let response = app
        .request("GET", &format!("/api/accesses/{access_id}"), None, Some(&token))
        .await;
    assert_eq!(response.json()["data"]["ttl"], 0);
}

#[tokio::test]
async fn test_expired_link() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;
    let file_id = app.upload_hello(&token, true).await;

    let past = (Utc::now() - Duration::hours(1)).to_rfc3339();
    let link = link_of(
        &app.create_access(&token, &file_id, json!({ "public": true, "expires": past }))
            .await,
    );
    let response = app.get_link(&link, DEFAULT_PEER, None).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), "Expired");

    let future = (Utc::now() + Duration::hours(1)).to_rfc3339();
    let link = link_of(
        &app.create_access(&token, &file_id, json!({ "public": true, "expires": future }))
            .await,
    );
    assert_eq!(app.get_link(&link, DEFAULT_PEER, None).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_denied_requests_do_not_consume_link() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;
    let file_id = app.upload_hello(&token, true).await;
    let link = link_of(
        &app.create_access(
            &token,
            &file_id,
            json!({ "public": true, "oneTimeUse": true, "ips": ["198.51.100.9"] }),
        )
        .await,
    );

    for _ in 0..3 {
        let response = app.get_link(&link, DEFAULT_PEER, None).await;
        assert_eq!(response.error_code(), "IPNotAllowed");
    }

    let response = app.get_link(&link, "198.51.100.9", None).await;
    assert_eq!(response.status, StatusCode::OK);
}
