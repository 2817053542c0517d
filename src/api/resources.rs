// src/api/resources.rs

use actix_multipart::Multipart;
use actix_web::{HttpResponse, delete, get, post, put, web};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::api::auth::AuthUser;
use crate::api::stripe_client;
use crate::error::ApiError;
use crate::{AppState, db};

const EXTERNAL_KIND: &str = "course";
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, Deserialize)]
pub struct CatalogFilter {
    pub category: Option<String>,
    pub is_free: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/digitalresources",
    tag = "resources",
    params(
        ("category" = Option<String>, Query, description = "Filter by category"),
        ("is_free" = Option<bool>, Query, description = "Filter by free/paid")
    ),
    responses((status = 200, body = [crate::models::ResourceSummary]))
)]
#[get("/api/digitalresources")]
pub async fn list_resources(
    query: web::Query<CatalogFilter>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let resources =
        db::list_resources(&state.pool, query.category.as_deref(), query.is_free).await?;
    Ok(HttpResponse::Ok().json(resources))
}

#[derive(Debug, Default)]
struct UploadForm {
    title: Option<String>,
    category: Option<String>,
    is_free: bool,
    price: Option<String>,
    thumbnail_url: Option<String>,
    external_url: Option<String>,
    file_name: Option<String>,
    file_bytes: Vec<u8>,
}

async fn read_upload_form(mut payload: Multipart) -> UploadForm {
    let mut form = UploadForm::default();

    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(f) => f,
            Err(_) => continue,
        };

        let cd = field.content_disposition();
        let name = cd.get_name().unwrap_or("").to_string();

        if name == "file" {
            if let Some(filename) = cd.get_filename() {
                form.file_name = Some(filename.to_string());
            }
            while let Some(chunk) = field.next().await {
                if let Ok(data) = chunk {
                    form.file_bytes.extend_from_slice(&data);
                }
            }
            continue;
        }

        let mut value = Vec::new();
        while let Some(chunk) = field.next().await {
            if let Ok(data) = chunk {
                value.extend_from_slice(&data);
            }
        }
        let value = String::from_utf8_lossy(&value).trim().to_string();
        if value.is_empty() {
            continue;
        }

        match name.as_str() {
            "title" => form.title = Some(value),
            "category" => form.category = Some(value),
            "is_free" => form.is_free = matches!(value.as_str(), "true" | "1"),
            "price" => form.price = Some(value),
            "thumbnail_url" => form.thumbnail_url = Some(value),
            "external_url" => form.external_url = Some(value),
            _ => {}
        }
    }

    form
}

/// Paid resources must carry a valid price; free resources never do.
fn effective_price(is_free: bool, price: Option<&str>) -> Result<Option<String>, ApiError> {
    if is_free {
        return Ok(None);
    }
    let price = price
        .ok_or_else(|| ApiError::Validation("Price is required for paid resources.".into()))?;
    if stripe_client::to_minor_units(price).is_none() {
        return Err(ApiError::Validation(
            "Price must be a positive decimal amount.".into(),
        ));
    }
    Ok(Some(price.to_string()))
}

/// Admin: add a resource to the library. Most resources are a stored file;
/// the "Courses" category may instead point at an external URL.
#[utoipa::path(
    post,
    path = "/api/digitalresources/upload",
    tag = "resources",
    responses(
        (status = 200, description = "Resource created"),
        (status = 400, description = "Missing file, URL or price"),
        (status = 403, description = "Admin role required")
    )
)]
#[post("/digitalresources/upload")]
pub async fn upload_resource(
    payload: Multipart,
    state: web::Data<AppState>,
    user: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;

    let form = read_upload_form(payload).await;

    let title = form
        .title
        .clone()
        .ok_or_else(|| ApiError::Validation("Title is missing.".into()))?;
    let price = effective_price(form.is_free, form.price.as_deref())?;

    let is_course = form.category.as_deref() == Some("Courses");

    let (file_name, file_path, file_type, thumbnail_url) = if !form.file_bytes.is_empty() {
        let original_name = form.file_name.as_deref().unwrap_or("resource.bin");
        let file_type = original_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_else(|| "bin".to_string());

        let stored = state.store.save(original_name, &form.file_bytes).await?;

        // Uploaded images double as their own thumbnail.
        let thumbnail_url = form.thumbnail_url.clone().or_else(|| {
            IMAGE_EXTENSIONS
                .contains(&file_type.as_str())
                .then(|| stored.web_path.clone())
        });

        (stored.file_name, stored.web_path, file_type, thumbnail_url)
    } else if is_course {
        let external_url = form.external_url.clone().ok_or_else(|| {
            ApiError::Validation("External URL is required for courses.".into())
        })?;
        (
            "external-course".to_string(),
            external_url,
            EXTERNAL_KIND.to_string(),
            form.thumbnail_url.clone(),
        )
    } else {
        return Err(ApiError::Validation(
            "File is required for non-course resources.".into(),
        ));
    };

    let resource = db::insert_resource(
        &state.pool,
        db::NewResource {
            title: &title,
            file_name: &file_name,
            file_path: &file_path,
            file_type: &file_type,
            category: form.category.as_deref(),
            is_free: form.is_free,
            price: price.as_deref(),
            thumbnail_url: thumbnail_url.as_deref(),
            external_url: form.external_url.as_deref(),
            uploaded_by: &user.id,
        },
    )
    .await?;

    log::info!("resource {} uploaded by {}", resource.id, user.id);

    Ok(HttpResponse::Ok().json(json!({
        "message": "Resource uploaded successfully!",
        "resource": resource
    })))
}

/// Entitlement gate plus delivery. Free resources always pass; paid ones
/// need at least one paid purchase row for the caller. A pending purchase
/// is not enough. "You may not have this" (402) and "this is broken" (404)
/// stay distinct.
#[utoipa::path(
    get,
    path = "/api/digitalresources/download/{id}",
    tag = "resources",
    params(("id" = i32, Path, description = "Resource id")),
    responses(
        (status = 200, description = "Resource bytes", content_type = "application/octet-stream"),
        (status = 302, description = "Redirect for external resources"),
        (status = 402, description = "Payment required"),
        (status = 404, description = "Resource or backing file missing")
    )
)]
#[get("/digitalresources/download/{id}")]
pub async fn download_resource(
    path: web::Path<i32>,
    state: web::Data<AppState>,
    user: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    let resource = db::get_resource(&state.pool, *path)
        .await?
        .ok_or_else(|| ApiError::NotFound("Resource not found.".into()))?;

    if !resource.is_free && !db::has_paid_purchase(&state.pool, resource.id, &user.id).await? {
        return Err(ApiError::PaymentRequired);
    }

    if resource.file_type == EXTERNAL_KIND {
        if let Some(url) = resource.external_url.as_deref() {
            return Ok(HttpResponse::Found()
                .insert_header(("Location", url))
                .finish());
        }
    }

    let bytes = state
        .store
        .load(&resource.file_name)
        .await?
        .ok_or_else(|| ApiError::NotFound("File does not exist.".into()))?;

    Ok(HttpResponse::Ok()
        .content_type("application/octet-stream")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", resource.file_name),
        ))
        .body(bytes))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EditResourceRequest {
    pub title: String,
    pub category: Option<String>,
    pub is_free: bool,
    pub price: Option<String>,
    pub thumbnail_url: Option<String>,
    pub external_url: Option<String>,
}

/// Admin: edit resource metadata and pricing.
#[utoipa::path(
    put,
    path = "/api/digitalresources/{id}",
    tag = "resources",
    params(("id" = i32, Path, description = "Resource id")),
    request_body = EditResourceRequest,
    responses(
        (status = 200, description = "Updated"),
        (status = 404, description = "No such resource")
    )
)]
#[put("/digitalresources/{id}")]
pub async fn edit_resource(
    path: web::Path<i32>,
    body: web::Json<EditResourceRequest>,
    state: web::Data<AppState>,
    user: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;

    let price = effective_price(body.is_free, body.price.as_deref())?;

    let updated = db::update_resource(
        &state.pool,
        *path,
        db::ResourceEdit {
            title: &body.title,
            category: body.category.as_deref(),
            is_free: body.is_free,
            price: price.as_deref(),
            thumbnail_url: body.thumbnail_url.as_deref(),
            external_url: body.external_url.as_deref(),
        },
    )
    .await?;

    if !updated {
        return Err(ApiError::NotFound("Resource not found.".into()));
    }

    Ok(HttpResponse::Ok().body("Resource updated successfully."))
}

/// Admin: remove a resource and its stored file. Purchases referencing it
/// cascade away with the row.
#[utoipa::path(
    delete,
    path = "/api/digitalresources/{id}",
    tag = "resources",
    params(("id" = i32, Path, description = "Resource id")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "No such resource")
    )
)]
#[delete("/digitalresources/{id}")]
pub async fn delete_resource(
    path: web::Path<i32>,
    state: web::Data<AppState>,
    user: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;

    let resource = db::get_resource(&state.pool, *path)
        .await?
        .ok_or_else(|| ApiError::NotFound("Resource not found.".into()))?;

    if resource.file_type != EXTERNAL_KIND {
        state.store.remove(&resource.file_name).await?;
    }

    db::delete_resource(&state.pool, resource.id).await?;
    log::info!("resource {} deleted by {}", resource.id, user.id);

    Ok(HttpResponse::Ok().body("Resource deleted successfully."))
}
