// src/db.rs

use sqlx::{PgPool, Row};

use crate::models::{DigitalResource, Purchase, PurchaseView, ResourceSummary};

fn map_resource(r: &sqlx::postgres::PgRow) -> DigitalResource {
    DigitalResource {
        id: r.get("id"),
        title: r.get("title"),
        file_name: r.get("file_name"),
        file_path: r.get("file_path"),
        file_type: r.get("file_type"),
        category: r.get("category"),
        is_free: r.get("is_free"),
        price: r.get("price"),
        thumbnail_url: r.get("thumbnail_url"),
        external_url: r.get("external_url"),
        uploaded_by: r.get("uploaded_by"),
        upload_date: r.get("upload_date"),
    }
}

const RESOURCE_COLUMNS: &str = r#"id, title, file_name, file_path, file_type, category,
       is_free, price::text AS price, thumbnail_url, external_url, uploaded_by, upload_date"#;

pub async fn list_resources(
    pool: &PgPool,
    category: Option<&str>,
    is_free: Option<bool>,
) -> Result<Vec<ResourceSummary>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT id, title, file_type, category, is_free, price::text AS price,
                  file_path, thumbnail_url, external_url, upload_date
           FROM digital_resources
           WHERE ($1::text IS NULL OR category = $1)
             AND ($2::boolean IS NULL OR is_free = $2)
           ORDER BY upload_date DESC"#,
    )
    .bind(category)
    .bind(is_free)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| ResourceSummary {
            id: r.get("id"),
            title: r.get("title"),
            file_type: r.get("file_type"),
            category: r.get("category"),
            is_free: r.get("is_free"),
            price: r.get("price"),
            file_path: r.get("file_path"),
            thumbnail_url: r.get("thumbnail_url"),
            external_url: r.get("external_url"),
            upload_date: r.get("upload_date"),
        })
        .collect())
}

pub async fn get_resource(pool: &PgPool, id: i32) -> Result<Option<DigitalResource>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {RESOURCE_COLUMNS} FROM digital_resources WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| map_resource(&r)))
}

pub struct NewResource<'a> {
    pub title: &'a str,
    pub file_name: &'a str,
    pub file_path: &'a str,
    pub file_type: &'a str,
    pub category: Option<&'a str>,
    pub is_free: bool,
    pub price: Option<&'a str>,
    pub thumbnail_url: Option<&'a str>,
    pub external_url: Option<&'a str>,
    pub uploaded_by: &'a str,
}

pub async fn insert_resource(
    pool: &PgPool,
    new: NewResource<'_>,
) -> Result<DigitalResource, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"INSERT INTO digital_resources
               (title, file_name, file_path, file_type, category, is_free, price,
                thumbnail_url, external_url, uploaded_by)
           VALUES ($1, $2, $3, $4, $5, $6, $7::numeric, $8, $9, $10)
           RETURNING {RESOURCE_COLUMNS}"#
    ))
    .bind(new.title)
    .bind(new.file_name)
    .bind(new.file_path)
    .bind(new.file_type)
    .bind(new.category)
    .bind(new.is_free)
    .bind(new.price)
    .bind(new.thumbnail_url)
    .bind(new.external_url)
    .bind(new.uploaded_by)
    .fetch_one(pool)
    .await?;

    Ok(map_resource(&row))
}

pub struct ResourceEdit<'a> {
    pub title: &'a str,
    pub category: Option<&'a str>,
    pub is_free: bool,
    pub price: Option<&'a str>,
    pub thumbnail_url: Option<&'a str>,
    pub external_url: Option<&'a str>,
}

pub async fn update_resource(
    pool: &PgPool,
    id: i32,
    edit: ResourceEdit<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE digital_resources
           SET title = $1, category = $2, is_free = $3, price = $4::numeric,
               thumbnail_url = $5, external_url = $6
           WHERE id = $7"#,
    )
    .bind(edit.title)
    .bind(edit.category)
    .bind(edit.is_free)
    .bind(edit.price)
    .bind(edit.thumbnail_url)
    .bind(edit.external_url)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_resource(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM digital_resources WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Inserts a Pending purchase. Callers must only do this after the gateway
/// session was created, so `stripe_session_id` is always a real token.
pub async fn insert_purchase(
    pool: &PgPool,
    digital_resource_id: i32,
    user_id: &str,
    stripe_session_id: &str,
) -> Result<i32, sqlx::Error> {
    let row = sqlx::query(
        r#"INSERT INTO purchases (digital_resource_id, user_id, stripe_session_id, is_paid)
           VALUES ($1, $2, $3, FALSE)
           RETURNING id"#,
    )
    .bind(digital_resource_id)
    .bind(user_id)
    .bind(stripe_session_id)
    .fetch_one(pool)
    .await?;

    Ok(row.get("id"))
}

pub struct SessionPurchase {
    pub id: i32,
    pub is_paid: bool,
}

pub async fn find_purchase_by_session(
    pool: &PgPool,
    stripe_session_id: &str,
) -> Result<Option<SessionPurchase>, sqlx::Error> {
    let row = sqlx::query("SELECT id, is_paid FROM purchases WHERE stripe_session_id = $1")
        .bind(stripe_session_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| SessionPurchase {
        id: r.get("id"),
        is_paid: r.get("is_paid"),
    }))
}

/// The false -> true transition is monotonic, so re-running this for an
/// already-paid row is a no-op.
pub async fn mark_paid_by_session(
    pool: &PgPool,
    stripe_session_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE purchases SET is_paid = TRUE WHERE stripe_session_id = $1")
        .bind(stripe_session_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn has_paid_purchase(
    pool: &PgPool,
    digital_resource_id: i32,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT EXISTS(
               SELECT 1 FROM purchases
               WHERE digital_resource_id = $1 AND user_id = $2 AND is_paid
           ) AS entitled"#,
    )
    .bind(digital_resource_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(row.get("entitled"))
}

fn map_purchase_view(r: &sqlx::postgres::PgRow) -> PurchaseView {
    PurchaseView {
        id: r.get("id"),
        digital_resource_id: r.get("digital_resource_id"),
        resource_title: r.get("resource_title"),
        price: r.get("price"),
        is_paid: r.get("is_paid"),
        purchase_date: r.get("purchase_date"),
    }
}

const PURCHASE_VIEW_QUERY: &str = r#"SELECT p.id, p.digital_resource_id, r.title AS resource_title,
       r.price::text AS price, p.is_paid, p.purchase_date
FROM purchases p
JOIN digital_resources r ON r.id = p.digital_resource_id"#;

pub async fn list_all_purchases(pool: &PgPool) -> Result<Vec<PurchaseView>, sqlx::Error> {
    let rows = sqlx::query(&format!("{PURCHASE_VIEW_QUERY} ORDER BY p.purchase_date DESC"))
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(map_purchase_view).collect())
}

pub async fn list_paid_purchases(pool: &PgPool) -> Result<Vec<PurchaseView>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "{PURCHASE_VIEW_QUERY} WHERE p.is_paid ORDER BY p.purchase_date DESC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(map_purchase_view).collect())
}

pub async fn list_user_paid_purchases(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<PurchaseView>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "{PURCHASE_VIEW_QUERY} WHERE p.user_id = $1 AND p.is_paid ORDER BY p.purchase_date DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(map_purchase_view).collect())
}

pub async fn get_purchase(pool: &PgPool, id: i32) -> Result<Option<Purchase>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT id, digital_resource_id, user_id, stripe_session_id, is_paid, purchase_date
           FROM purchases
           WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| Purchase {
        id: r.get("id"),
        digital_resource_id: r.get("digital_resource_id"),
        user_id: r.get("user_id"),
        stripe_session_id: r.get("stripe_session_id"),
        is_paid: r.get("is_paid"),
        purchase_date: r.get("purchase_date"),
    }))
}

pub async fn mark_purchase_paid(pool: &PgPool, id: i32) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE purchases SET is_paid = TRUE WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn delete_purchase(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM purchases WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
