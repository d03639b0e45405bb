use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::donations::{self, NewDonation, STATUS_SUCCEEDED};
use crate::db::{charities, crises};
use crate::error::{AppError, AppResult};
use crate::extract::{JsonBody, PathParam};
use crate::models::AuthUser;
use crate::routes::AppState;
use crate::services::stripe::{
    self, DonationMetadata, Event, WebhookError, EVENT_PAYMENT_FAILED, EVENT_PAYMENT_SUCCEEDED,
};

pub const DONATION_CURRENCY: &str = "usd";
/// Stripe's minimum charge for USD, in cents.
pub const MIN_DONATION_AMOUNT: i64 = 50;

const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Deserialize)]
pub struct CreateIntentRequest {
    pub amount: i64,
    pub crisis_id: i64,
    pub charity_id: Option<i64>,
    pub donor_email: Option<String>,
    pub donor_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentStatus {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub metadata: HashMap<String, String>,
}

/// POST /api/payments/create-intent
///
/// Signed-in donors are attributed through the intent metadata; anonymous
/// donations are allowed.
pub async fn create_intent(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
    JsonBody(body): JsonBody<CreateIntentRequest>,
) -> AppResult<Json<IntentResponse>> {
    if body.amount < MIN_DONATION_AMOUNT {
        return Err(AppError::BadRequest(format!(
            "Amount must be at least {MIN_DONATION_AMOUNT} cents"
        )));
    }

    {
        let conn = state.db.get()?;
        crises::get_crisis(&conn, body.crisis_id)?;
        if let Some(charity_id) = body.charity_id {
            let belongs = charities::list_charities(&conn, Some(body.crisis_id))?
                .iter()
                .any(|c| c.id == charity_id);
            if !belongs {
                return Err(AppError::BadRequest(
                    "Charity is not affiliated with this crisis".to_string(),
                ));
            }
        }
    }

    let user = user.map(|Extension(u)| u);
    let metadata = DonationMetadata {
        crisis_id: body.crisis_id,
        charity_id: body.charity_id,
        user_id: user.as_ref().map(|u| u.user_id),
        donor_email: body.donor_email.or_else(|| user.as_ref().map(|u| u.email.clone())),
        donor_name: body.donor_name,
    };

    let intent = state
        .stripe
        .create_payment_intent(body.amount, DONATION_CURRENCY, &metadata.to_map())
        .await?;

    let client_secret = intent
        .client_secret
        .ok_or_else(|| AppError::Internal(format!("Intent {} has no client secret", intent.id)))?;

    tracing::info!(
        intent_id = %intent.id,
        crisis_id = body.crisis_id,
        amount = intent.amount,
        "Payment intent created"
    );

    Ok(Json(IntentResponse {
        client_secret,
        payment_intent_id: intent.id,
        amount: intent.amount,
        currency: intent.currency,
        status: intent.status,
    }))
}

/// GET /api/payments/status/{intent_id}
pub async fn status(
    State(state): State<AppState>,
    PathParam(intent_id): PathParam<String>,
) -> AppResult<Json<PaymentStatus>> {
    let intent = state.stripe.retrieve_payment_intent(&intent_id).await?;
    Ok(Json(PaymentStatus {
        id: intent.id,
        amount: intent.amount,
        currency: intent.currency,
        status: intent.status,
        metadata: intent.metadata,
    }))
}

/// POST /api/payments/webhook
///
/// Only a verified `payment_intent.succeeded` event creates a donation, with
/// amount and currency taken from Stripe's intent rather than any client.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing stripe-signature header".to_string()))?;

    let event = verify_event(&state, &body, signature)?;

    match event.event_type.as_str() {
        EVENT_PAYMENT_SUCCEEDED => record_succeeded(&state, &event)?,
        EVENT_PAYMENT_FAILED => {
            let intent_id = event.payment_intent().map(|i| i.id).unwrap_or_default();
            tracing::warn!(event_id = %event.id, %intent_id, "Payment failed");
        }
        other => tracing::debug!(event_id = %event.id, "Ignoring webhook event {other}"),
    }

    Ok(Json(json!({ "status": "success" })))
}

fn verify_event(state: &AppState, body: &[u8], signature: &str) -> AppResult<Event> {
    let secret = state
        .config
        .stripe_webhook_secret
        .as_deref()
        .ok_or_else(|| AppError::Internal(WebhookError::NotConfigured.to_string()))?;

    let now = chrono::Utc::now().timestamp();
    stripe::verify_webhook(body, signature, secret, now).map_err(|e| {
        tracing::warn!("Rejected webhook: {e}");
        match e {
            WebhookError::InvalidPayload(_) => AppError::BadRequest("Invalid payload".to_string()),
            _ => AppError::BadRequest("Invalid signature".to_string()),
        }
    })
}

fn record_succeeded(state: &AppState, event: &Event) -> AppResult<()> {
    let intent = event
        .payment_intent()
        .map_err(|e| AppError::BadRequest(format!("Invalid payment intent: {e}")))?;

    let Some(meta) = DonationMetadata::from_intent(&intent) else {
        // Not one of ours (or tampered metadata); acknowledge so Stripe stops retrying.
        tracing::warn!(intent_id = %intent.id, "Succeeded intent has no crisis_id metadata");
        return Ok(());
    };

    let new = NewDonation {
        crisis_id: meta.crisis_id,
        charity_id: meta.charity_id,
        user_id: meta.user_id,
        amount: intent.amount,
        currency: intent.currency.clone(),
        stripe_payment_intent_id: intent.id.clone(),
        status: STATUS_SUCCEEDED.to_string(),
    };

    let mut conn = state.db.get()?;
    let recorded = donations::record_donation(&mut conn, &new)?;
    if recorded.created {
        tracing::info!(
            donation_id = recorded.donation.id,
            intent_id = %intent.id,
            amount = intent.amount,
            "Donation recorded"
        );
    } else {
        tracing::info!(intent_id = %intent.id, "Duplicate webhook delivery ignored");
    }
    Ok(())
}
