// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, Responder, web};
use dotenvy::dotenv;
use sqlx::PgPool;
use std::env;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use praxis::storage::ResourceStore;
use praxis::{AppState, api, docs};

async fn index() -> impl Responder {
    HttpResponse::Ok().body("Service ready!")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET required");
    let stripe_secret_key = env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY required");
    let stripe_webhook_secret =
        env::var("STRIPE_WEBHOOK_SECRET").expect("STRIPE_WEBHOOK_SECRET required");
    let checkout_base_url =
        env::var("CHECKOUT_BASE_URL").unwrap_or_else(|_| "https://your-domain.com".to_string());
    let storage_root =
        env::var("RESOURCE_STORAGE_ROOT").unwrap_or_else(|_| "digital-resources".to_string());

    let state = web::Data::new(AppState {
        pool,
        store: ResourceStore::new(&storage_root),
        stripe_secret_key,
        stripe_webhook_secret,
        checkout_base_url,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/", web::get().to(index))
            .service(
                SwaggerUi::new("/docs/{_:.*}")
                    .url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
            )
            // Public: catalog listing and the gateway webhook
            .service(api::resources::list_resources)
            .service(api::webhooks::stripe_webhook)
            // Authenticated routes
            .service(
                web::scope("/api")
                    .wrap(api::auth::JwtMiddleware::new(jwt_secret.clone()))
                    .service(api::resources::upload_resource)
                    .service(api::resources::download_resource)
                    .service(api::resources::edit_resource)
                    .service(api::resources::delete_resource)
                    .service(api::payments::create_checkout_session)
                    .service(api::payments::my_purchases)
                    .service(api::payments::all_purchases)
                    .service(api::payments::paid_purchases)
                    .service(api::payments::mark_purchase_paid)
                    .service(api::payments::delete_purchase),
            )
    })
    .bind(("0.0.0.0", 8065))?
    .run()
    .await
}
