/// Identity provider webhook endpoint
///
/// # Endpoint
///
/// ```text
/// POST /api/webhooks/clerk
/// svix-id: msg_...
/// svix-timestamp: 1700000000
/// svix-signature: v1,<base64>
/// ```
///
/// # Processing
///
/// 1. Signing secret must be configured (500 otherwise)
/// 2. All three Svix headers must be present (400)
/// 3. Signature is checked against the raw body (400)
/// 4. Body is parsed into a typed event (400)
/// 5. Event is dispatched (500 if persistence or the metadata push fails)
///
/// # Response
///
/// ```json
/// { "ok": true }
/// { "ok": true, "ignored": "session.created" }
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use imaginify_shared::webhook::{DispatchOutcome, SvixHeaders, WebhookEvent, WebhookVerifier};
use serde::{Deserialize, Serialize};

/// Webhook acknowledgement
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookResponse {
    pub ok: bool,

    /// Event type that was acknowledged without action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored: Option<String>,
}

pub async fn clerk_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookResponse>> {
    let secret = state.webhook_secret().ok_or_else(|| {
        ApiError::InternalError("CLERK_WEBHOOK_SECRET is not configured".to_string())
    })?;
    let verifier = WebhookVerifier::new(secret)?;

    let svix_headers =
        SvixHeaders::from_lookup(|name| headers.get(name).and_then(|value| value.to_str().ok()))?;

    if let Err(e) = verifier.verify(&svix_headers, &body) {
        tracing::warn!(svix_id = %svix_headers.id, error = %e, "Rejected webhook");
        return Err(e.into());
    }

    let event = WebhookEvent::parse(&body).map_err(|e| {
        tracing::warn!(svix_id = %svix_headers.id, error = %e, "Malformed webhook payload");
        ApiError::BadRequest(format!("Malformed webhook payload: {}", e))
    })?;

    tracing::debug!(svix_id = %svix_headers.id, event_type = %event.event_type(), "Webhook verified");

    let ignored = match state.dispatcher.dispatch(event).await? {
        DispatchOutcome::Ignored { event_type } => Some(event_type),
        _ => None,
    };

    Ok(Json(WebhookResponse { ok: true, ignored }))
}
