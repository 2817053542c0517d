pub mod api;
pub mod db;
pub mod docs;
pub mod error;
pub mod models;
pub mod storage;

use sqlx::PgPool;

use crate::storage::ResourceStore;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub store: ResourceStore,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub checkout_base_url: String,
}
