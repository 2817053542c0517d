// src/models.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct DigitalResource {
    pub id: i32,
    pub title: String,
    /// Stored object name, or "external-course" for URL-only resources.
    pub file_name: String,
    /// Public web path for stored files, or the external URL itself.
    pub file_path: String,
    pub file_type: String, // e.g. "pdf", "xlsx", "mp4"; "course" for external
    pub category: Option<String>,
    pub is_free: bool,
    pub price: Option<String>,
    pub thumbnail_url: Option<String>,
    pub external_url: Option<String>,
    pub uploaded_by: String,
    pub upload_date: Option<DateTime<Utc>>,
}

/// Catalog view of a resource: everything a browsing user needs, nothing
/// about who uploaded it.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResourceSummary {
    pub id: i32,
    pub title: String,
    pub file_type: String,
    pub category: Option<String>,
    pub is_free: bool,
    pub price: Option<String>,
    pub file_path: String,
    pub thumbnail_url: Option<String>,
    pub external_url: Option<String>,
    pub upload_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Purchase {
    pub id: i32,
    pub digital_resource_id: i32,
    pub user_id: String,
    pub stripe_session_id: String,
    pub is_paid: bool,
    pub purchase_date: Option<DateTime<Utc>>,
}

/// Purchase joined with its resource, for buyer history and the admin ledger.
#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseView {
    pub id: i32,
    pub digital_resource_id: i32,
    pub resource_title: String,
    pub price: Option<String>,
    pub is_paid: bool,
    pub purchase_date: Option<DateTime<Utc>>,
}
