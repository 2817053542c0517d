use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;
use sha2::Sha256;
use sqlx::{PgPool, Row};
use std::env;
use std::sync::OnceLock;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use praxis::AppState;
use praxis::storage::ResourceStore;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test123secret456";

fn split_db_url(url: &str) -> Result<(String, String), String> {
    let (base, query) = match url.split_once('?') {
        Some((base, query)) => (base.to_string(), Some(query)),
        None => (url.to_string(), None),
    };

    let db_start = base
        .rfind('/')
        .ok_or_else(|| "invalid database url".to_string())?;
    if db_start + 1 >= base.len() {
        return Err("database name is empty".to_string());
    }

    let db_name = base[db_start + 1..].to_string();
    let mut admin_url = format!("{}postgres", &base[..db_start + 1]);
    if let Some(query) = query {
        admin_url = format!("{admin_url}?{query}");
    }

    Ok((admin_url, db_name))
}

fn replace_db_name(url: &str, new_name: &str) -> String {
    let (base, query) = match url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (url, None),
    };
    let db_start = base.rfind('/').expect("invalid database url");
    let mut out = format!("{}{}", &base[..db_start + 1], new_name);
    if let Some(query) = query {
        out = format!("{out}?{query}");
    }
    out
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub struct TestDb {
    pub pool: PgPool,
    _guard: MutexGuard<'static, ()>,
}

pub async fn init_test_db() -> TestDb {
    dotenvy::dotenv().ok();
    let test_url = env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let (admin_url, base_name) = split_db_url(&test_url).expect("invalid TEST_DATABASE_URL format");

    // Per-process database name so test binaries can run concurrently.
    let db_name = format!("{base_name}_{}", std::process::id());
    let test_url = replace_db_name(&test_url, &db_name);

    let lock = TEST_DB_LOCK.get_or_init(|| Mutex::new(()));
    let guard = lock.lock().await;

    let admin_pool = PgPool::connect(&admin_url).await.expect("connect admin db");

    let _ = sqlx::query("SELECT pg_advisory_lock(424242)")
        .execute(&admin_pool)
        .await;

    let quoted_name = quote_identifier(&db_name);
    let drop_sql = format!("DROP DATABASE IF EXISTS {quoted_name} WITH (FORCE)");
    let create_sql = format!("CREATE DATABASE {quoted_name}");

    let _ = sqlx::query(&drop_sql).execute(&admin_pool).await;
    let create_result = sqlx::query(&create_sql).execute(&admin_pool).await;
    if let Err(e) = create_result {
        eprintln!("create test db error: {e}");
        let _ = sqlx::query(&drop_sql).execute(&admin_pool).await;
        sqlx::query(&create_sql)
            .execute(&admin_pool)
            .await
            .expect("create test db retry");
    }

    let _ = sqlx::query("SELECT pg_advisory_unlock(424242)")
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;

    let pool = PgPool::connect(&test_url).await.expect("connect test db");
    sqlx::migrate!().run(&pool).await.expect("migrations");
    TestDb { pool, _guard: guard }
}

pub fn build_state(pool: PgPool, webhook_secret: &str) -> AppState {
    let storage_root = std::env::temp_dir().join(format!("praxis-test-{}", Uuid::new_v4()));

    AppState {
        pool,
        store: ResourceStore::new(storage_root),
        stripe_secret_key: "sk_test_local".to_string(),
        stripe_webhook_secret: webhook_secret.to_string(),
        checkout_base_url: "http://localhost".to_string(),
    }
}

#[derive(Serialize)]
struct TestClaims {
    sub: String,
    role: String,
    exp: usize,
}

pub fn bearer_token(user_id: &str, role: &str) -> String {
    let exp = (Utc::now() + Duration::hours(1)).timestamp() as usize;
    let claims = TestClaims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_ref()),
    )
    .expect("encode test jwt")
}

pub fn stripe_signature(payload: &[u8], secret: &str, timestamp: &str) -> String {
    type HmacSha256 = Hmac<Sha256>;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let signature = hex::encode(mac.finalize().into_bytes());

    format!("t={timestamp},v1={signature}")
}

pub fn current_timestamp() -> String {
    Utc::now().timestamp().to_string()
}

pub async fn insert_resource(
    pool: &PgPool,
    title: &str,
    file_name: &str,
    is_free: bool,
    price: Option<&str>,
) -> i32 {
    sqlx::query(
        r#"INSERT INTO digital_resources
               (title, file_name, file_path, file_type, category, is_free, price, uploaded_by)
           VALUES ($1, $2, $3, 'pdf', 'Career Guide', $4, $5::numeric, 'test-admin')
           RETURNING id"#,
    )
    .bind(title)
    .bind(file_name)
    .bind(format!("/digital-resources/{file_name}"))
    .bind(is_free)
    .bind(price)
    .fetch_one(pool)
    .await
    .expect("insert resource")
    .get("id")
}

pub async fn insert_external_resource(
    pool: &PgPool,
    title: &str,
    external_url: &str,
    is_free: bool,
    price: Option<&str>,
) -> i32 {
    sqlx::query(
        r#"INSERT INTO digital_resources
               (title, file_name, file_path, file_type, category, is_free, price,
                external_url, uploaded_by)
           VALUES ($1, 'external-course', $2, 'course', 'Courses', $3, $4::numeric, $2, 'test-admin')
           RETURNING id"#,
    )
    .bind(title)
    .bind(external_url)
    .bind(is_free)
    .bind(price)
    .fetch_one(pool)
    .await
    .expect("insert external resource")
    .get("id")
}

pub async fn insert_purchase(
    pool: &PgPool,
    resource_id: i32,
    user_id: &str,
    session_id: &str,
    is_paid: bool,
) -> i32 {
    sqlx::query(
        r#"INSERT INTO purchases (digital_resource_id, user_id, stripe_session_id, is_paid)
           VALUES ($1, $2, $3, $4)
           RETURNING id"#,
    )
    .bind(resource_id)
    .bind(user_id)
    .bind(session_id)
    .bind(is_paid)
    .fetch_one(pool)
    .await
    .expect("insert purchase")
    .get("id")
}

pub async fn purchase_is_paid(pool: &PgPool, id: i32) -> bool {
    sqlx::query("SELECT is_paid FROM purchases WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("select purchase")
        .get("is_paid")
}

pub async fn purchase_count(pool: &PgPool, session_id: &str) -> i64 {
    sqlx::query("SELECT COUNT(*) AS n FROM purchases WHERE stripe_session_id = $1")
        .bind(session_id)
        .fetch_one(pool)
        .await
        .expect("count purchases")
        .get("n")
}
