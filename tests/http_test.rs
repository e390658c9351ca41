//! Route-level request/response contract: multipart parsing, client-input
//! rejections as 400s, and pipeline outcomes as 200s with structured bodies.

mod common;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use ades_validator::server;

use common::*;

const BOUNDARY: &str = "ades-test-boundary";

struct TestApp {
    app: Router,
    _gateway_dirs: (tempfile::TempDir, tempfile::TempDir),
}

fn app_from(gateway: TestGateway) -> TestApp {
    let TestGateway {
        pipeline,
        schema_dir,
        converter_dir,
    } = gateway;
    TestApp {
        app: server::create_app(Arc::new(pipeline)),
        _gateway_dirs: (schema_dir, converter_dir),
    }
}

fn multipart_body(filename: &str, content: &[u8], validation_type: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(b"\r\n");
    if let Some(vt) = validation_type {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; \
                 name=\"validation_type\"\r\n\r\n{vt}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn post_upload(
    app: &TestApp,
    uri: &str,
    filename: &str,
    content: &[u8],
    validation_type: Option<&str>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(filename, content, validation_type)))
        .unwrap();

    let response = app.app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app_from(gateway());

    let response = app
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn validate_xml_success_response_shape() {
    let app = app_from(gateway());

    let (status, json) = post_upload(
        &app,
        "/validate-xml",
        "valid.xml",
        VALID_ADES_XML.as_bytes(),
        Some("all"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["filename"], "valid.xml");
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["type"], "submit");
    assert_eq!(results[1]["type"], "general");
    assert!(results.iter().all(|r| r["valid"] == true));
    assert_eq!(json["xml_info"]["version"], "2022");

    // Pure-XML requests carry no conversion block.
    assert!(json.get("conversion").is_none());
    assert!(json.get("validation_type").is_none());
}

#[tokio::test]
async fn validate_xml_uppercase_extension_is_accepted() {
    let app = app_from(gateway());

    let (status, json) = post_upload(
        &app,
        "/validate-xml",
        "VALID.XML",
        VALID_ADES_XML.as_bytes(),
        Some("all"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json.get("results").is_some());
}

#[tokio::test]
async fn validate_xml_failure_is_still_http_200() {
    let app = app_from(gateway());

    let (status, json) = post_upload(
        &app,
        "/validate-xml",
        "invalid.xml",
        INVALID_ADES_XML.as_bytes(),
        Some("all"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let results = json["results"].as_array().unwrap();
    assert!(results.iter().any(|r| r["valid"] == false));
}

#[tokio::test]
async fn missing_validation_type_defaults_to_all() {
    let app = app_from(gateway());

    let (status, json) = post_upload(
        &app,
        "/validate-xml",
        "valid.xml",
        VALID_ADES_XML.as_bytes(),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_validation_type_is_rejected() {
    let app = app_from(gateway());

    let (status, json) = post_upload(
        &app,
        "/validate-xml",
        "valid.xml",
        VALID_ADES_XML.as_bytes(),
        Some("strict"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["detail"],
        "Invalid validation type: strict. Must be one of: all, submit, general"
    );
}

#[tokio::test]
async fn non_xml_filename_is_rejected() {
    let app = app_from(gateway());

    let (status, json) = post_upload(
        &app,
        "/validate-xml",
        "file.unknown",
        VALID_ADES_XML.as_bytes(),
        Some("all"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "File must be an XML document");
}

#[tokio::test]
async fn psv_conversion_failure_has_empty_results() {
    // No converter installed.
    let app = app_from(gateway());

    let (status, json) = post_upload(
        &app,
        "/validate-psv",
        "batch.psv",
        SAMPLE_PSV.as_bytes(),
        Some("all"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["conversion"]["success"], false);
    assert_eq!(json["results"].as_array().unwrap().len(), 0);
    assert!(json.get("xml_info").is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn psv_conversion_success_includes_validation_type() {
    let gw = gateway();
    install_converter(&gw, "psvtoxml", &passthrough_converter_script());
    let app = app_from(gw);

    let (status, json) = post_upload(
        &app,
        "/validate-psv",
        "valid.psv",
        SAMPLE_PSV.as_bytes(),
        Some("all"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["conversion"]["success"], true);
    assert_eq!(json["validation_type"], "all");
    assert_eq!(json["results"].as_array().unwrap().len(), 2);
    assert_eq!(json["xml_info"]["root_element"], "ades");
}

#[tokio::test]
async fn psv_endpoint_rejects_other_extensions() {
    let app = app_from(gateway());

    let (status, json) = post_upload(
        &app,
        "/validate-psv",
        "batch.txt",
        SAMPLE_PSV.as_bytes(),
        Some("all"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "File must be a PSV document");
}

#[tokio::test]
async fn mpc_endpoint_accepts_extensionless_names() {
    // No converter installed: the request passes sniffing, then reports a
    // conversion failure rather than a rejection.
    let app = app_from(gateway());

    let (status, json) = post_upload(
        &app,
        "/validate-mpc",
        "J99001",
        SAMPLE_MPC.as_bytes(),
        Some("all"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["conversion"]["success"], false);
    assert_eq!(
        json["conversion"]["message"],
        "mpc80coltoxml converter script not found"
    );
}

#[tokio::test]
async fn mpc_endpoint_rejects_unrecognized_extension() {
    let app = app_from(gateway());

    let (status, json) = post_upload(
        &app,
        "/validate-mpc",
        "obs.csv",
        SAMPLE_MPC.as_bytes(),
        Some("all"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let detail = json["detail"].as_str().unwrap();
    assert!(detail.contains("'.csv'"));
    assert!(detail.contains("MPC 80-column"));
}

#[tokio::test]
async fn missing_file_part_is_rejected() {
    let app = app_from(gateway());

    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; \
         name=\"validation_type\"\r\n\r\nall\r\n--{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/validate-xml")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
