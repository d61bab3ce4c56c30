//! Image and thumbnail byte serving plus the HTML listings

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, Method, Uri, header},
    response::{Html, IntoResponse, Response},
};
use std::collections::HashMap;

use crate::assets::StaticAssets;
use crate::catalog::encode_url_name;
use crate::errors::{AppError, AppResult};
use crate::web::{
    AppState,
    extractors::RequestContext,
    utils::log_request,
};

/// Serve a source image by its url-name
pub async fn serve_image(
    State(state): State<AppState>,
    Path(path): Path<String>,
    method: Method,
    uri: Uri,
    context: RequestContext,
) -> AppResult<Response> {
    log_request(&method, &uri, &context);

    let image = state.catalog.image_for(&path).await?;
    let bytes = read_file(&image.path, "image", &path).await?;
    Ok(file_response(
        StaticAssets::get_content_type(&image.relative_path),
        bytes,
    ))
}

/// Serve the thumbnail of an image, generating it on first request
pub async fn serve_thumbnail(
    State(state): State<AppState>,
    Path(path): Path<String>,
    method: Method,
    uri: Uri,
    context: RequestContext,
) -> AppResult<Response> {
    log_request(&method, &uri, &context);

    let thumbnail = state.catalog.thumbnail_for(&path).await?;
    let bytes = read_file(&thumbnail.path, "thumbnail", &path).await?;
    Ok(file_response(
        StaticAssets::get_content_type(&thumbnail.path.to_string_lossy()),
        bytes,
    ))
}

pub async fn list_images(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    context: RequestContext,
) -> impl IntoResponse {
    log_request(&method, &uri, &context);

    let items: Vec<(String, String)> = state
        .catalog
        .images()
        .await
        .iter()
        .map(|image| {
            (
                format!("/images/{}", encode_url_name(&image.url_name())),
                image.relative_path.clone(),
            )
        })
        .collect();
    Html(listing_page("Images", &items))
}

pub async fn list_thumbnails(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    context: RequestContext,
) -> impl IntoResponse {
    log_request(&method, &uri, &context);

    let images: HashMap<_, _> = state
        .catalog
        .store()
        .snapshot()
        .await
        .records()
        .iter()
        .map(|image| (image.identity.clone(), image.clone()))
        .collect();

    let items: Vec<(String, String)> = state
        .catalog
        .thumbnails()
        .await
        .iter()
        .filter_map(|thumbnail| {
            let image = images.get(&thumbnail.identity)?;
            Some((
                format!("/thumbnails/{}", encode_url_name(&image.url_name())),
                format!(
                    "{} ({} bytes, generated {})",
                    image.relative_path,
                    thumbnail.bytes_on_disk,
                    thumbnail.generated_at.format("%Y-%m-%d %H:%M:%S")
                ),
            ))
        })
        .collect();
    Html(listing_page("Thumbnails", &items))
}

async fn read_file(path: &std::path::Path, resource: &str, name: &str) -> AppResult<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::not_found(resource, name)
        } else {
            AppError::Io(e)
        }
    })
}

fn file_response(content_type: &'static str, bytes: Vec<u8>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    (headers, bytes).into_response()
}

fn listing_page(title: &str, items: &[(String, String)]) -> String {
    let list: String = items
        .iter()
        .map(|(href, label)| {
            format!(
                "<li><a href=\"{}\">{}</a></li>\n",
                quick_xml::escape::escape(href),
                quick_xml::escape::escape(label)
            )
        })
        .collect();

    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body><h1>{title}</h1>\n<ul>\n{list}</ul>\n</body></html>\n"
    )
}
