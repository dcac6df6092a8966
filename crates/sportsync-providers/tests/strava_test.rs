// ABOUTME: Integration tests for the Strava client against a mock API server
// ABOUTME: Covers upload polling, duplicate detection, weight update and refresh errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use chrono::{TimeZone, Utc};
use serde_json::json;
use sportsync_core::errors::ProviderError;
use sportsync_core::models::{Activity, Credentials};
use sportsync_providers::{
    ActivityUploader, ProfileWeightUpdater, ProviderConfig, StravaProvider, TokenRefresher,
    UploadPolling, UploadReceipt,
};
use std::collections::BTreeMap;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> StravaProvider {
    StravaProvider::with_config(ProviderConfig {
        name: "strava".to_owned(),
        auth_url: format!("{}/oauth/authorize", server.uri()),
        token_url: format!("{}/oauth/token", server.uri()),
        api_base_url: server.uri(),
    })
    .with_upload_polling(UploadPolling {
        attempts: 3,
        interval: Duration::from_millis(10),
    })
}

fn activity() -> Activity {
    Activity::new(
        "9001".to_owned(),
        Utc.with_ymd_and_hms(2024, 3, 1, 6, 30, 0).unwrap(),
        "Morning Run".to_owned(),
        "running".to_owned(),
        b"FITDATA".to_vec(),
    )
}

#[tokio::test]
async fn test_upload_polls_until_activity_created() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/uploads"))
        .and(body_string_contains("Morning Run"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 55, "status": "Your activity is still being processed.",
            "error": null, "activity_id": null
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/uploads/55"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 55, "status": "Your activity is still being processed.",
            "error": null, "activity_id": null
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/uploads/55"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 55, "status": "Your activity is ready.",
            "error": null, "activity_id": 777
        })))
        .mount(&server)
        .await;

    let receipt = provider(&server)
        .upload_activity("token", &activity())
        .await
        .unwrap();
    assert_eq!(
        receipt,
        UploadReceipt::Created {
            remote_id: "777".to_owned()
        }
    );
}

#[tokio::test]
async fn test_duplicate_upload_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/uploads"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 56, "status": "There was an error processing your activity.",
            "error": "9001.fit duplicate of activity 123", "activity_id": null
        })))
        .mount(&server)
        .await;

    let receipt = provider(&server)
        .upload_activity("token", &activity())
        .await
        .unwrap();
    assert!(matches!(receipt, UploadReceipt::Duplicate { .. }));
}

#[tokio::test]
async fn test_upload_that_never_finishes_times_out() {
    let server = MockServer::start().await;
    let processing = json!({
        "id": 57, "status": "Your activity is still being processed.",
        "error": null, "activity_id": null
    });
    Mock::given(method("POST"))
        .and(path("/uploads"))
        .respond_with(ResponseTemplate::new(201).set_body_json(processing.clone()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/uploads/57"))
        .respond_with(ResponseTemplate::new(200).set_body_json(processing))
        .expect(3)
        .mount(&server)
        .await;

    let err = provider(&server)
        .upload_activity("token", &activity())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Timeout { .. }));
}

#[tokio::test]
async fn test_update_weight_sends_form() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/athlete"))
        .and(body_string_contains("weight=70.00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1, "weight": 70.0 })))
        .expect(1)
        .mount(&server)
        .await;

    provider(&server).update_weight("token", 70.0).await.unwrap();
}

#[tokio::test]
async fn test_rejected_refresh_token_requires_reauthorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Bad Request",
            "errors": [{ "resource": "RefreshToken", "code": "invalid" }]
        })))
        .mount(&server)
        .await;

    let credentials = Credentials {
        access_token: "a".to_owned(),
        refresh_token: "r".to_owned(),
        token_type: "Bearer".to_owned(),
        expires_at: None,
        client_id: "c".to_owned(),
        client_secret: "s".to_owned(),
        extra: BTreeMap::new(),
    };
    let err = provider(&server).refresh(&credentials).await.unwrap_err();
    assert!(matches!(err, ProviderError::ReauthorizationRequired { .. }));
}
