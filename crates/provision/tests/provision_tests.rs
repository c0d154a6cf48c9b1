#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Database provisioning against a mock document database.

use {
    relay_common::Status,
    relay_config::CloudantConfig,
    relay_provision::Provisioner,
    secrecy::Secret,
    serde_json::json,
};

fn provisioner(url: String, max_attempts: u32) -> Provisioner {
    Provisioner::new(&CloudantConfig {
        url,
        username: "admin".into(),
        password: Secret::new("pw".into()),
        max_attempts,
        retry_delay_ms: 10,
        ..CloudantConfig::default()
    })
}

#[tokio::test]
async fn existing_database_is_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PUT", "/acme_context")
        .match_header("authorization", "Basic YWRtaW46cHc=")
        .with_status(412)
        .with_body(json!({"error": "file_exists", "reason": "exists"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let status = provisioner(server.url(), 10)
        .create_database("acme_context")
        .await
        .unwrap();
    assert_eq!(status, Status::ok());
    assert_eq!(
        serde_json::to_value(&status).unwrap(),
        json!({"code": 200, "message": "OK"})
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn unavailable_then_created_is_success() {
    let mut server = mockito::Server::new_async().await;
    let unavailable = server
        .mock("PUT", "/acme_context")
        .with_status(503)
        .with_body(json!({"error": "service_unavailable"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let created = server
        .mock("PUT", "/acme_context")
        .with_status(201)
        .with_body(json!({"ok": true}).to_string())
        .expect(1)
        .create_async()
        .await;

    let status = provisioner(server.url(), 10)
        .create_database("acme_context")
        .await
        .unwrap();
    assert_eq!(status, Status::ok());
    unavailable.assert_async().await;
    created.assert_async().await;
}

#[tokio::test]
async fn retries_are_bounded() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PUT", "/acme_context")
        .with_status(503)
        .with_body(json!({"error": "service_unavailable"}).to_string())
        .expect(3)
        .create_async()
        .await;

    let status = provisioner(server.url(), 3)
        .create_database("acme_context")
        .await
        .unwrap_err();
    assert_eq!(status.code, 503);
    mock.assert_async().await;
}

#[tokio::test]
async fn terminal_error_is_bad_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PUT", "/acme_context")
        .with_status(401)
        .with_body(json!({"error": "unauthorized", "reason": "Name or password is incorrect."}).to_string())
        .expect(1)
        .create_async()
        .await;

    let status = provisioner(server.url(), 10)
        .create_database("acme_context")
        .await
        .unwrap_err();
    assert_eq!(
        status,
        Status::bad_request("Name or password is incorrect.")
    );
    mock.assert_async().await;
}
