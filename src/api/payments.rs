// src/api/payments.rs

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::Deserialize;
use serde_json::json;

use crate::api::auth::AuthUser;
use crate::api::stripe_client::{self, CreateCheckoutSession};
use crate::error::ApiError;
use crate::{AppState, db};

/// Creates a Stripe Checkout Session for a paid resource and records the
/// attempt as a Pending purchase. The row is written only after Stripe
/// accepted the session, so every stored session id is a real token; the
/// buyer gets the redirect URL once the row is durably in place.
#[utoipa::path(
    post,
    path = "/api/payment/create-checkout-session/{id}",
    tag = "payments",
    params(("id" = i32, Path, description = "Resource id")),
    responses(
        (status = 200, description = "Redirect URL to the gateway checkout page"),
        (status = 400, description = "Free, unknown or unpriced resource"),
        (status = 401, description = "Not authenticated")
    )
)]
#[post("/payment/create-checkout-session/{id}")]
pub async fn create_checkout_session(
    path: web::Path<i32>,
    state: web::Data<AppState>,
    user: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    let resource = match db::get_resource(&state.pool, *path).await? {
        Some(r) if !r.is_free => r,
        _ => return Err(ApiError::Validation("Invalid or free resource.".into())),
    };

    let price = resource
        .price
        .as_deref()
        .ok_or_else(|| ApiError::Validation("Price cannot be null.".into()))?;
    let unit_amount = stripe_client::to_minor_units(price)
        .ok_or_else(|| ApiError::Validation("Price cannot be parsed.".into()))?;

    log::info!(
        "creating checkout session user={} resource={} amount={}",
        user.id,
        resource.id,
        unit_amount
    );

    let session = stripe_client::create_checkout_session(
        &state.stripe_secret_key,
        CreateCheckoutSession {
            product_name: &resource.title,
            unit_amount,
            currency: "usd",
            success_url: format!(
                "{}/success?session_id={{CHECKOUT_SESSION_ID}}",
                state.checkout_base_url
            ),
            cancel_url: format!("{}/cancel", state.checkout_base_url),
            user_id: &user.id,
            resource_id: resource.id,
        },
    )
    .await
    .map_err(|e| {
        log::error!(
            "stripe session create failed user={} resource={}: {e}",
            user.id,
            resource.id
        );
        ApiError::Gateway(e.to_string())
    })?;

    let url = session
        .url
        .ok_or_else(|| ApiError::Gateway("session has no redirect url".into()))?;

    db::insert_purchase(&state.pool, resource.id, &user.id, &session.id).await?;

    Ok(HttpResponse::Ok().json(json!({ "url": url })))
}

/// The caller's own paid purchases.
#[utoipa::path(
    get,
    path = "/api/payment/my-purchases",
    tag = "payments",
    responses((status = 200, body = [crate::models::PurchaseView]))
)]
#[get("/payment/my-purchases")]
pub async fn my_purchases(
    state: web::Data<AppState>,
    user: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    let purchases = db::list_user_paid_purchases(&state.pool, &user.id).await?;
    Ok(HttpResponse::Ok().json(purchases))
}

/// Admin diagnostic view: every purchase, paid and pending.
#[utoipa::path(
    get,
    path = "/api/payment/all-purchases",
    tag = "payments",
    responses(
        (status = 200, body = [crate::models::PurchaseView]),
        (status = 403, description = "Admin role required")
    )
)]
#[get("/payment/all-purchases")]
pub async fn all_purchases(
    state: web::Data<AppState>,
    user: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let purchases = db::list_all_purchases(&state.pool).await?;
    Ok(HttpResponse::Ok().json(purchases))
}

/// Admin revenue view: paid purchases only.
#[utoipa::path(
    get,
    path = "/api/payment/paid-purchases",
    tag = "payments",
    responses(
        (status = 200, body = [crate::models::PurchaseView]),
        (status = 403, description = "Admin role required")
    )
)]
#[get("/payment/paid-purchases")]
pub async fn paid_purchases(
    state: web::Data<AppState>,
    user: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let purchases = db::list_paid_purchases(&state.pool).await?;
    Ok(HttpResponse::Ok().json(purchases))
}

/// Manual recovery path for purchases whose webhook never arrived.
#[utoipa::path(
    put,
    path = "/api/payment/mark-paid/{id}",
    tag = "payments",
    params(("id" = i32, Path, description = "Purchase id")),
    responses(
        (status = 200, description = "Marked paid"),
        (status = 404, description = "No such purchase"),
        (status = 409, description = "Already paid")
    )
)]
#[put("/payment/mark-paid/{id}")]
pub async fn mark_purchase_paid(
    path: web::Path<i32>,
    state: web::Data<AppState>,
    user: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let id = *path;

    let purchase = db::get_purchase(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Purchase not found.".into()))?;

    if purchase.is_paid {
        return Err(ApiError::AlreadyPaid(id));
    }

    db::mark_purchase_paid(&state.pool, id).await?;
    log::info!("purchase {id} manually marked paid by {}", user.id);

    Ok(HttpResponse::Ok().body(format!("Purchase ID {id} marked as paid.")))
}

#[derive(Debug, Deserialize)]
pub struct DeletePurchaseQuery {
    /// Deleting a paid row revokes a granted entitlement, so it has to be
    /// confirmed explicitly.
    #[serde(default)]
    pub confirm_paid: bool,
}

#[utoipa::path(
    delete,
    path = "/api/payment/delete-purchase/{id}",
    tag = "payments",
    params(
        ("id" = i32, Path, description = "Purchase id"),
        ("confirm_paid" = bool, Query, description = "Required to delete a paid purchase")
    ),
    responses(
        (status = 200, description = "Deleted"),
        (status = 400, description = "Paid purchase without confirmation"),
        (status = 404, description = "No such purchase")
    )
)]
#[delete("/payment/delete-purchase/{id}")]
pub async fn delete_purchase(
    path: web::Path<i32>,
    query: web::Query<DeletePurchaseQuery>,
    state: web::Data<AppState>,
    user: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let id = *path;

    let purchase = db::get_purchase(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Purchase not found.".into()))?;

    if purchase.is_paid && !query.confirm_paid {
        return Err(ApiError::Validation(format!(
            "Purchase ID {id} is paid; deleting it revokes the buyer's access. \
             Repeat the request with confirm_paid=true to proceed."
        )));
    }

    db::delete_purchase(&state.pool, id).await?;
    log::info!(
        "purchase {id} deleted by {} (was_paid={})",
        user.id,
        purchase.is_paid
    );

    Ok(HttpResponse::Ok().body(format!("Purchase ID {id} deleted successfully.")))
}
