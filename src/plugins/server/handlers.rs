use axum::{
  Json,
  body::Bytes,
  extract::State,
  http::{HeaderMap, StatusCode},
};
use serde::Serialize;

use crate::{
  plugins::telegram,
  prelude::*,
  state::AppState,
  sv::cryptobot::{CryptoBot, WebhookUpdate},
};

#[derive(Serialize)]
pub struct Status {
  success: bool,
  msg: Option<String>,
}

pub async fn health() -> (StatusCode, Json<Status>) {
  (StatusCode::OK, Json(Status { success: true, msg: None }))
}

/// Payment confirmation callback from CryptoBot. The signature covers the
/// raw body, so the body is consumed as bytes and parsed after verification.
/// Replayed deliveries settle idempotently and still answer 200, so the
/// provider stops retrying.
pub async fn cryptobot_webhook(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  body: Bytes,
) -> StatusCode {
  let signature = headers
    .get("crypto-pay-api-signature")
    .and_then(|v| v.to_str().ok())
    .unwrap_or_default();

  if !CryptoBot::verify_signature(&app.config.cryptobot_token, &body, signature)
  {
    warn!("webhook: rejected update with a bad signature");
    return StatusCode::UNAUTHORIZED;
  }

  let update: WebhookUpdate = match json::from_slice(&body) {
    Ok(update) => update,
    Err(err) => {
      warn!("webhook: undecodable update: {err}");
      return StatusCode::BAD_REQUEST;
    }
  };

  if update.update_type != "invoice_paid" {
    debug!("webhook: ignoring update type `{}`", update.update_type);
    return StatusCode::OK;
  }

  let provider_id = update.payload.invoice_id.to_string();

  match app.sv().donation.confirm(&provider_id).await {
    Ok(confirmed) => {
      if confirmed.applied {
        info!(
          "payment {provider_id} confirmed, donation {}",
          confirmed.donation.id
        );
        telegram::send_donation_receipt(&app, &confirmed).await;
      }
      StatusCode::OK
    }
    Err(Error::UnknownPayment(_)) => {
      warn!("webhook: confirmation for unknown payment {provider_id}");
      StatusCode::NOT_FOUND
    }
    Err(Error::AlreadyFailed) => {
      warn!("webhook: payment {provider_id} was already marked failed");
      StatusCode::CONFLICT
    }
    Err(err) => {
      error!("webhook: failed to confirm {provider_id}: {err}");
      StatusCode::INTERNAL_SERVER_ERROR
    }
  }
}
