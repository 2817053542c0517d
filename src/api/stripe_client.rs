// src/api/stripe_client.rs
//
// Minimal client for the Stripe surface this service uses: Checkout Session
// creation (form-encoded, Bearer auth) and webhook signature verification.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::fmt;

const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Events signed longer ago than this are rejected to limit replays.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug)]
pub enum StripeError {
    Http(reqwest::Error),
    Api { status: u16, body: String },
    InvalidResponse(String),
}

impl fmt::Display for StripeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StripeError::Http(e) => write!(f, "http error: {e}"),
            StripeError::Api { status, body } => {
                write!(f, "stripe api error status={status} body={body}")
            }
            StripeError::InvalidResponse(e) => write!(f, "invalid response: {e}"),
        }
    }
}

impl From<reqwest::Error> for StripeError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

#[derive(Debug)]
pub struct CreateCheckoutSession<'a> {
    pub product_name: &'a str,
    pub unit_amount: i64,
    pub currency: &'a str,
    pub success_url: String,
    pub cancel_url: String,
    /// Recorded in session metadata for audit trails.
    pub user_id: &'a str,
    pub resource_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSessionResponse {
    pub id: String,
    pub url: Option<String>,
}

pub async fn create_checkout_session(
    secret_key: &str,
    req: CreateCheckoutSession<'_>,
) -> Result<CheckoutSessionResponse, StripeError> {
    let client = reqwest::Client::new();

    let form = [
        ("mode", "payment".to_string()),
        ("payment_method_types[0]", "card".to_string()),
        ("line_items[0][quantity]", "1".to_string()),
        ("line_items[0][price_data][currency]", req.currency.to_string()),
        (
            "line_items[0][price_data][unit_amount]",
            req.unit_amount.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]",
            req.product_name.to_string(),
        ),
        ("success_url", req.success_url),
        ("cancel_url", req.cancel_url),
        ("metadata[userId]", req.user_id.to_string()),
        ("metadata[resourceId]", req.resource_id.to_string()),
    ];

    let resp = client
        .post(format!("{STRIPE_API_BASE}/v1/checkout/sessions"))
        .bearer_auth(secret_key)
        .form(&form)
        .send()
        .await?;

    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(StripeError::Api {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str::<CheckoutSessionResponse>(&body)
        .map_err(|e| StripeError::InvalidResponse(format!("{e}; body={body}")))
}

/// Converts a decimal price string (e.g. "9.99") to gateway minor units (999).
pub fn to_minor_units(price: &str) -> Option<i64> {
    let value: f64 = price.trim().parse().ok()?;
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    Some((value * 100.0).round() as i64)
}

/// Checks a `Stripe-Signature` header (`t=<unix>,v1=<hex>`) against the
/// shared webhook secret. Anything short of a fresh, matching v1 signature
/// is a rejection; malformed headers are not an error class of their own.
pub fn signature_is_valid(secret: &str, payload: &[u8], header: &str) -> bool {
    verify_with_timestamp(secret, payload, header, chrono::Utc::now().timestamp())
}

pub fn verify_with_timestamp(secret: &str, payload: &[u8], header: &str, now: i64) -> bool {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let Some(timestamp) = timestamp else {
        return false;
    };
    if candidates.is_empty() {
        return false;
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return false;
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    candidates.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|sig| mac.clone().verify_slice(&sig).is_ok())
            .unwrap_or(false)
    })
}

/// Webhook payloads are parsed into a closed set of shapes at the boundary;
/// event types this service does not handle collapse into `Ignored`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum WebhookEvent {
    #[serde(rename = "checkout.session.completed")]
    CheckoutCompleted { data: EventEnvelope },
    #[serde(other)]
    Ignored,
}

#[derive(Debug, Deserialize)]
pub struct EventEnvelope {
    pub object: CheckoutSessionObject,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSessionObject {
    #[serde(default)]
    pub id: String,
}
