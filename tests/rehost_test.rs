//! Rehoster failure-policy tests
//!
//! The rehoster must degrade, never throw: an unreachable remote asset
//! leaves the original reference untouched, a reachable one is replaced
//! by a durable local reference.

use mediabroker::prelude::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JPG_BYTES: &[u8] = b"\xff\xd8\xff\xe0-fake-jpeg-payload";

fn rehoster(root: &std::path::Path) -> MediaRehoster {
    MediaRehoster::new(root, "http://localhost:9000/media", reqwest::Client::new())
}

#[tokio::test]
async fn test_unreachable_url_is_returned_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let dead = MediaSource::Url("http://127.0.0.1:9/gone.png".to_string());

    let reference = rehoster(dir.path()).rehost(&dead, Modality::Image).await;
    assert_eq!(reference, "http://127.0.0.1:9/gone.png");
    // nothing was written
    assert!(!dir.path().join("images").exists());
}

#[tokio::test]
async fn test_http_error_status_is_returned_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/expired.png"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let url = format!("{}/expired.png", server.uri());
    let source = MediaSource::Url(url.clone());

    let reference = rehoster(dir.path()).rehost(&source, Modality::Image).await;
    assert_eq!(reference, url);
}

#[tokio::test]
async fn test_reachable_url_is_replaced_by_local_reference() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/asset"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(JPG_BYTES, "image/jpeg"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let url = format!("{}/asset", server.uri());
    let source = MediaSource::Url(url.clone());

    let reference = rehoster(dir.path()).rehost(&source, Modality::Image).await;
    assert_ne!(reference, url);
    assert!(reference.starts_with("http://localhost:9000/media/images/"));
    // content-type won over the extensionless URL
    assert!(reference.ends_with(".jpg"));

    let file_name = reference.rsplit('/').next().unwrap();
    let written = std::fs::read(dir.path().join("images").join(file_name)).unwrap();
    assert_eq!(written, JPG_BYTES);
}

#[tokio::test]
async fn test_extension_falls_back_to_url_then_modality_default() {
    let server = MockServer::start().await;
    // no usable content-type; the URL's trailing segment decides
    Mock::given(method("GET"))
        .and(path("/clip.webm"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"x".as_slice(), "application/octet-stream"))
        .mount(&server)
        .await;
    // neither content-type nor URL help; the modality default applies
    Mock::given(method("GET"))
        .and(path("/opaque"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"x".as_slice(), "application/octet-stream"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let rehoster = rehoster(dir.path());

    let from_url = rehoster
        .rehost(
            &MediaSource::Url(format!("{}/clip.webm", server.uri())),
            Modality::Video,
        )
        .await;
    assert!(from_url.ends_with(".webm"));

    let from_default = rehoster
        .rehost(
            &MediaSource::Url(format!("{}/opaque", server.uri())),
            Modality::Video,
        )
        .await;
    assert!(from_default.ends_with(".mp4"));
}
