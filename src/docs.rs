use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::resources::list_resources,
        crate::api::resources::upload_resource,
        crate::api::resources::download_resource,
        crate::api::resources::edit_resource,
        crate::api::resources::delete_resource,
        crate::api::payments::create_checkout_session,
        crate::api::payments::my_purchases,
        crate::api::payments::all_purchases,
        crate::api::payments::paid_purchases,
        crate::api::payments::mark_purchase_paid,
        crate::api::payments::delete_purchase,
        crate::api::webhooks::stripe_webhook
    ),
    components(
        schemas(
            crate::models::DigitalResource,
            crate::models::ResourceSummary,
            crate::models::Purchase,
            crate::models::PurchaseView,
            crate::api::resources::EditResourceRequest
        )
    ),
    tags(
        (name = "resources", description = "Digital resource library"),
        (name = "payments", description = "Checkout and the purchase ledger"),
        (name = "webhooks", description = "Callbacks from the payment gateway")
    )
)]
pub struct ApiDoc;
