//! Stripe payment intents over the REST API, plus local webhook signature
//! verification.

use std::collections::{BTreeMap, HashMap};

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::Config;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a webhook signature timestamp.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub const EVENT_PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const EVENT_PAYMENT_FAILED: &str = "payment_intent.payment_failed";

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("STRIPE_SECRET_KEY is not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Stripe returned {status}: {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook secret is not configured")]
    NotConfigured,

    #[error("malformed signature header")]
    MalformedHeader,

    #[error("signature timestamp outside tolerance")]
    TimestampOutsideTolerance,

    #[error("no matching signature")]
    SignatureMismatch,

    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl Event {
    pub fn payment_intent(&self) -> Result<PaymentIntent, serde_json::Error> {
        PaymentIntent::deserialize(&self.data.object)
    }
}

/// What a donor is paying for. Serialized into intent metadata so the
/// webhook can attribute the payment later.
#[derive(Debug, Clone, Default)]
pub struct DonationMetadata {
    pub crisis_id: i64,
    pub charity_id: Option<i64>,
    pub user_id: Option<i64>,
    pub donor_email: Option<String>,
    pub donor_name: Option<String>,
}

impl DonationMetadata {
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("crisis_id".to_string(), self.crisis_id.to_string());
        map.insert("donation_type".to_string(), "crisis_relief".to_string());
        if let Some(charity_id) = self.charity_id {
            map.insert("charity_id".to_string(), charity_id.to_string());
        }
        if let Some(user_id) = self.user_id {
            map.insert("user_id".to_string(), user_id.to_string());
        }
        if let Some(email) = self.donor_email.as_ref().filter(|e| !e.is_empty()) {
            map.insert("donor_email".to_string(), email.clone());
        }
        if let Some(name) = self.donor_name.as_ref().filter(|n| !n.is_empty()) {
            map.insert("donor_name".to_string(), name.clone());
        }
        map
    }

    /// Read attribution back out of a payment intent. `None` when the intent
    /// carries no usable `crisis_id`.
    pub fn from_intent(intent: &PaymentIntent) -> Option<Self> {
        let parse = |key: &str| intent.metadata.get(key).and_then(|v| v.parse::<i64>().ok());
        Some(Self {
            crisis_id: parse("crisis_id")?,
            charity_id: parse("charity_id"),
            user_id: parse("user_id"),
            donor_email: intent.metadata.get("donor_email").cloned(),
            donor_name: intent.metadata.get("donor_name").cloned(),
        })
    }
}

#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: Option<String>,
}

impl StripeClient {
    pub fn new(config: &Config) -> Result<Self, PaymentError> {
        let http = reqwest::Client::builder()
            .user_agent("globemap/0.1")
            .build()?;

        Ok(Self {
            http,
            api_base: config.stripe_api_base.trim_end_matches('/').to_string(),
            secret_key: config.stripe_secret_key.clone(),
        })
    }

    fn secret_key(&self) -> Result<&str, PaymentError> {
        self.secret_key.as_deref().ok_or(PaymentError::NotConfigured)
    }

    pub async fn create_payment_intent(
        &self,
        amount: i64,
        currency: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<PaymentIntent, PaymentError> {
        let key = self.secret_key()?;

        let mut form: Vec<(String, String)> = vec![
            ("amount".to_string(), amount.to_string()),
            ("currency".to_string(), currency.to_string()),
            ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
        ];
        form.extend(
            metadata
                .iter()
                .map(|(k, v)| (format!("metadata[{k}]"), v.clone())),
        );

        let res = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .basic_auth(key, None::<&str>)
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .form(&form)
            .send()
            .await?;

        parse_response(res).await
    }

    pub async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, PaymentError> {
        let key = self.secret_key()?;

        let res = self
            .http
            .get(format!("{}/v1/payment_intents/{id}", self.api_base))
            .basic_auth(key, None::<&str>)
            .send()
            .await?;

        parse_response(res).await
    }
}

async fn parse_response(res: reqwest::Response) -> Result<PaymentIntent, PaymentError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        let message = serde_json::from_str::<StripeErrorBody>(&body)
            .ok()
            .and_then(|b| b.error.message)
            .unwrap_or(body);
        return Err(PaymentError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(res.json().await?)
}

/// Verify a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=<hex>...]`)
/// against the raw request body and decode the event.
pub fn verify_webhook(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<Event, WebhookError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse().map_err(|_| WebhookError::MalformedHeader)?);
            }
            Some(("v1", value)) => {
                // Undecodable entries can never match; skip rather than fail.
                if let Ok(sig) = hex::decode(value) {
                    signatures.push(sig);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }
    if now.abs_diff(timestamp) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(WebhookError::TimestampOutsideTolerance);
    }

    let mac = signed_payload_mac(secret, timestamp, payload);
    let matched = signatures
        .iter()
        .any(|sig| mac.clone().verify_slice(sig).is_ok());
    if !matched {
        return Err(WebhookError::SignatureMismatch);
    }

    Ok(serde_json::from_slice(payload)?)
}

fn signed_payload_mac(secret: &str, timestamp: i64, payload: &[u8]) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}
