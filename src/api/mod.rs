pub mod auth;
pub mod payments;
pub mod resources;
pub mod stripe_client;
pub mod webhooks;
