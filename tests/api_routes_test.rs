use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use image::{ImageBuffer, ImageFormat, Rgb};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use teamster::{
    config::{Config, TeamsVersion},
    services::CatalogService,
    web::{AppState, WebServer},
};

struct TestApp {
    _temp_dir: TempDir,
    router: Router,
    thumbnail_dir: std::path::PathBuf,
}

async fn test_app(teams_version: TeamsVersion) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let image_dir = temp_dir.path().join("images");
    std::fs::create_dir_all(image_dir.join("holiday")).unwrap();
    write_image(&image_dir.join("a.png"), ImageFormat::Png);
    write_image(&image_dir.join("holiday/b.jpeg"), ImageFormat::Jpeg);
    std::fs::write(image_dir.join("readme.txt"), b"ignored").unwrap();

    let config = Config {
        image_dir,
        thumbnail_dir: temp_dir.path().join("thumbs"),
        teams_version,
        port: 7123,
        ..Config::default()
    };
    let catalog = Arc::new(CatalogService::from_config(&config));
    catalog.initialize().await.unwrap();

    TestApp {
        thumbnail_dir: config.thumbnail_dir.clone(),
        router: WebServer::create_router(AppState {
            config: Arc::new(config),
            catalog,
        }),
        _temp_dir: temp_dir,
    }
}

fn write_image(path: &Path, format: ImageFormat) {
    ImageBuffer::from_pixel(320, 240, Rgb([40u8, 80, 120]))
        .save_with_format(path, format)
        .unwrap();
}

// Helper function to send requests to the app
async fn send_request(app: &Router, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::ORIGIN, "https://teams.microsoft.com")
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, headers, body)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = send_request(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_v2_catalog_lists_images_in_order() {
    let app = test_app(TeamsVersion::V2).await;

    let (status, body) =
        get_json(&app.router, "/evergreen-assets/backgroundimages/config.json").await;
    assert_eq!(status, StatusCode::OK);

    let entries = body["videoBackgroundImages"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["id"], "a");
    assert_eq!(entries[0]["filetype"], "png");
    assert_eq!(
        entries[0]["thumb_src"],
        "/evergreen-assets/backgroundimages/thumbnails/a.png"
    );
    assert_eq!(entries[1]["id"], "holiday/b");
    assert_eq!(entries[1]["name"], "b");
    assert_eq!(entries[1]["filetype"], "jpg");
    assert_eq!(
        entries[1]["src"],
        "/evergreen-assets/backgroundimages/images/holiday/b.jpeg.jpg"
    );

    // Both layouts are routed regardless of the configured version
    let (status, root) = get_json(&app.router, "/config.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(root, body);
}

#[tokio::test]
async fn test_v1_catalog_is_a_bare_array() {
    let app = test_app(TeamsVersion::V1).await;

    let (status, body) = get_json(&app.router, "/config.json").await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["src"], "/images/a.png");
    assert_eq!(entries[0]["thumb_src"], "/thumbnails/a.png");
}

#[tokio::test]
async fn test_catalog_thumbnail_urls_resolve_to_generated_files() {
    let app = test_app(TeamsVersion::V2).await;
    let (_, body) = get_json(&app.router, "/config.json").await;

    for entry in body["videoBackgroundImages"].as_array().unwrap() {
        let thumb_src = entry["thumb_src"].as_str().unwrap();
        let (status, headers, bytes) = send_request(&app.router, thumb_src).await;
        assert_eq!(status, StatusCode::OK, "{thumb_src}");
        assert_eq!(headers[header::CONTENT_TYPE], "image/png");

        let thumbnail = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
        assert_eq!((thumbnail.width(), thumbnail.height()), (128, 96));
    }

    let artifacts = std::fs::read_dir(&app.thumbnail_dir)
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().extension().is_some_and(|x| x == "png"))
        .count();
    assert_eq!(artifacts, 2);
}

#[tokio::test]
async fn test_image_bytes_are_served_with_content_type() {
    let app = test_app(TeamsVersion::V2).await;

    let (status, headers, bytes) = send_request(&app.router, "/images/holiday/b.jpeg.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(!bytes.is_empty());
}

#[tokio::test]
async fn test_unknown_image_is_not_found() {
    let app = test_app(TeamsVersion::V2).await;

    let (status, body) = get_json(&app.router, "/images/missing.png").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = get_json(&app.router, "/thumbnails/readme.txt").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app(TeamsVersion::V2).await;

    let (status, body) = get_json(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["images"], 2);
    assert_eq!(body["consecutive_scan_failures"], 0);
    assert!(body.get("last_scan").is_some());
}

#[tokio::test]
async fn test_index_and_listings_render() {
    let app = test_app(TeamsVersion::V2).await;

    let (status, _, body) = send_request(&app.router, "/").await;
    assert_eq!(status, StatusCode::OK);
    let page = String::from_utf8(body.to_vec()).unwrap();
    assert!(page.contains("http://localhost:7123"));
    assert!(!page.contains("{{"));

    let (status, _, body) = send_request(&app.router, "/images").await;
    assert_eq!(status, StatusCode::OK);
    let page = String::from_utf8(body.to_vec()).unwrap();
    assert!(page.contains("/images/holiday/b.jpeg.jpg"));
    assert!(!page.contains("readme.txt"));

    send_request(&app.router, "/thumbnails/a.png").await;
    let (status, _, body) = send_request(&app.router, "/thumbnails").await;
    assert_eq!(status, StatusCode::OK);
    let page = String::from_utf8(body.to_vec()).unwrap();
    assert!(page.contains("/thumbnails/a.png"));
}
