// HTTP request handlers for the gallery API.

use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};
use bytes::BytesMut;
use futures::StreamExt;
use log::debug;
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::blobs::DEFAULT_CONTENT_TYPE;
use crate::errors::GalleryError;
use crate::service::auth;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

fn header_value(req: &HttpRequest, name: &str) -> String {
    req.headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("")
        .to_string()
}

#[post("/register")]
pub async fn register(
    body: web::Json<RegisterRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, GalleryError> {
    let request = body.into_inner();
    let user = app_state
        .gallery
        .register(&request.username, &request.password, request.email)?;
    Ok(HttpResponse::Ok().json(json!({ "username": user.username })))
}

#[post("/login")]
pub async fn login(
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, GalleryError> {
    let context = auth::authenticate(&req, app_state.gallery.metadata())?;
    debug!("Login succeeded for user: {}", context.username);
    Ok(HttpResponse::Ok().json(json!({ "username": context.username })))
}

#[get("/gallery")]
pub async fn gallery(
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, GalleryError> {
    let context = auth::authenticate(&req, app_state.gallery.metadata())?;
    let photos = app_state.gallery.list_photos(&context)?;
    Ok(HttpResponse::Ok().json(photos))
}

#[post("/upload/{filename}")]
pub async fn upload(
    path: web::Path<String>,
    mut payload: web::Payload,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, GalleryError> {
    let filename = path.into_inner();
    let context = auth::authenticate(&req, app_state.gallery.metadata())?;
    debug!(
        "Upload of {} requested by user: {}",
        filename, context.username
    );

    let content_type = {
        let ct = header_value(&req, "Content-Type");
        if ct.is_empty() {
            DEFAULT_CONTENT_TYPE.to_string()
        } else {
            ct
        }
    };
    let tags = header_value(&req, "Tags");
    let description = header_value(&req, "Description");

    let mut bytes = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk =
            chunk.map_err(|e| GalleryError::validation(format!("failed to read upload: {e}")))?;
        bytes.extend_from_slice(&chunk);
    }

    let photo = app_state.gallery.upload_photo(
        &context.username,
        &filename,
        &content_type,
        &bytes,
        &tags,
        &description,
    )?;
    Ok(HttpResponse::Ok().json(photo))
}

#[get("/search")]
pub async fn search(
    query: web::Query<SearchQuery>,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, GalleryError> {
    let context = auth::authenticate(&req, app_state.gallery.metadata())?;
    let photos = app_state.gallery.search_photos(&context, &query.q)?;
    Ok(HttpResponse::Ok().json(photos))
}

#[get("/download/{photo_id}")]
pub async fn download(
    path: web::Path<String>,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, GalleryError> {
    let photo_id = path.into_inner();
    let context = auth::authenticate(&req, app_state.gallery.metadata())?;
    let (photo, content, content_type) =
        app_state.gallery.download_photo(&context, &photo_id)?;
    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", photo.filename),
        ))
        .body(content))
}

#[delete("/photos/{photo_id}")]
pub async fn delete_photo(
    path: web::Path<String>,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, GalleryError> {
    let photo_id = path.into_inner();
    let context = auth::authenticate(&req, app_state.gallery.metadata())?;
    app_state.gallery.delete_photo(&context, &photo_id)?;
    Ok(HttpResponse::Ok().json(json!({ "deleted": photo_id })))
}
