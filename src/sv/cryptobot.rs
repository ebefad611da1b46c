//! CryptoBot API integration for donation payments
//! API docs: https://help.send.tg/en/articles/10279948-crypto-pay-api
//!
//! Issues one invoice per donation attempt; the invoice id becomes the
//! donation's provider payment id. Webhook callbacks are authenticated with
//! HMAC-SHA256 over the raw body, keyed by the SHA256 of the API token.

#![allow(dead_code)]

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::prelude::*;

pub const MAINNET_URL: &str = "https://pay.crypt.bot/api/";
pub const TESTNET_URL: &str = "https://testnet-pay.crypt.bot/api/";

/// 1 USDT = 1,000,000 nanoUSDT (USDT uses 6 decimal places). All amounts in
/// the database are nano units; the provider speaks decimal strings.
pub const NANO_USDT: i64 = 1_000_000;

pub fn to_decimal(amount_nano: i64) -> String {
  format!("{:.2}", amount_nano as f64 / NANO_USDT as f64)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
  Active,
  Paid,
  Expired,
}

/// Invoice response from the Crypto Pay API, trimmed to the fields this bot
/// reads; unknown fields are ignored on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
  pub invoice_id: i64,
  pub status: InvoiceStatus,
  pub asset: Option<String>,
  pub amount: String,
  pub bot_invoice_url: String,
  pub description: Option<String>,
  pub payload: Option<String>,
  pub created_at: String,
  pub paid_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
  pub ok: bool,
  pub result: Option<T>,
  pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
  pub code: i32,
  pub name: String,
}

/// Webhook update from CryptoBot
#[derive(Debug, Deserialize)]
pub struct WebhookUpdate {
  pub update_id: i64,
  pub update_type: String,
  pub request_date: String,
  pub payload: Invoice,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateInvoiceParams {
  pub asset: Option<String>,
  pub amount: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub hidden_message: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payload: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub expires_in: Option<i32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub allow_comments: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub allow_anonymous: Option<bool>,
}

/// Data we attach to an invoice so the webhook can find its donation again
/// without guessing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationPayload {
  pub user_id: i64,
  pub goal_id: Option<i32>,
}

#[derive(Clone)]
pub struct CryptoBot {
  client: Client,
  base_url: String,
  api_token: String,
}

impl CryptoBot {
  pub fn new(api_token: String, use_testnet: bool) -> Self {
    let base_url = if use_testnet {
      TESTNET_URL.to_string()
    } else {
      MAINNET_URL.to_string()
    };

    Self { client: Client::new(), base_url, api_token }
  }

  async fn request<T: for<'de> Deserialize<'de>>(
    &self,
    method: &str,
    params: Option<HashMap<String, String>>,
  ) -> Result<T> {
    let url = format!("{}{}", self.base_url, method);

    let mut request =
      self.client.get(&url).header("Crypto-Pay-API-Token", &self.api_token);

    if let Some(p) = params {
      request = request.query(&p);
    }

    let response = request
      .send()
      .await
      .map_err(|e| Error::CryptoBot(format!("Request failed: {}", e)))?;

    let api_response: ApiResponse<T> = response.json().await.map_err(|e| {
      Error::CryptoBot(format!("Failed to parse response: {}", e))
    })?;

    Self::unwrap_response(api_response)
  }

  async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
    &self,
    method: &str,
    body: &B,
  ) -> Result<T> {
    let url = format!("{}{}", self.base_url, method);

    let response = self
      .client
      .post(&url)
      .header("Crypto-Pay-API-Token", &self.api_token)
      .json(body)
      .send()
      .await
      .map_err(|e| Error::CryptoBot(format!("Request failed: {}", e)))?;

    let api_response: ApiResponse<T> = response.json().await.map_err(|e| {
      Error::CryptoBot(format!("Failed to parse response: {}", e))
    })?;

    Self::unwrap_response(api_response)
  }

  fn unwrap_response<T>(response: ApiResponse<T>) -> Result<T> {
    if response.ok {
      response.result.ok_or_else(|| Error::CryptoBot("Empty result".into()))
    } else {
      let err = response.error.map_or_else(
        || "Unknown error".to_string(),
        |e| format!("{}: {}", e.name, e.code),
      );
      Err(Error::CryptoBot(err))
    }
  }

  pub async fn create_invoice(
    &self,
    params: CreateInvoiceParams,
  ) -> Result<Invoice> {
    self.post("createInvoice", &params).await
  }

  pub async fn get_invoices(
    &self,
    invoice_ids: Option<Vec<i64>>,
    status: Option<InvoiceStatus>,
  ) -> Result<Vec<Invoice>> {
    let mut params = HashMap::new();

    if let Some(ids) = invoice_ids {
      params.insert(
        "invoice_ids".to_string(),
        ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(","),
      );
    }

    if let Some(s) = status {
      let status_str = match s {
        InvoiceStatus::Active => "active",
        InvoiceStatus::Paid => "paid",
        InvoiceStatus::Expired => "expired",
      };
      params.insert("status".to_string(), status_str.to_string());
    }

    let params = if params.is_empty() { None } else { Some(params) };

    #[derive(Deserialize)]
    struct ItemsResponse {
      items: Vec<Invoice>,
    }

    let response: ItemsResponse = self.request("getInvoices", params).await?;
    Ok(response.items)
  }

  pub async fn get_invoice(&self, invoice_id: i64) -> Result<Invoice> {
    let invoices = self.get_invoices(Some(vec![invoice_id]), None).await?;
    invoices
      .into_iter()
      .next()
      .ok_or_else(|| Error::UnknownPayment(invoice_id.to_string()))
  }

  /// Issues a one-hour invoice for a donation toward `goal_title`.
  pub async fn create_donation_invoice(
    &self,
    user_id: i64,
    goal_id: Option<i32>,
    goal_title: &str,
    amount_nano: i64,
    currency: &str,
  ) -> Result<Invoice> {
    let payload = json::to_string(&DonationPayload { user_id, goal_id })
      .map_err(|e| Error::CryptoBot(format!("payload encoding: {}", e)))?;

    let params = CreateInvoiceParams {
      asset: Some(currency.to_string()),
      amount: to_decimal(amount_nano),
      description: Some(format!("Donation toward \"{}\"", goal_title)),
      hidden_message: Some(
        "Thank you for your donation! It will be counted shortly.".to_string(),
      ),
      payload: Some(payload),
      expires_in: Some(3600), // 1 hour
      allow_comments: Some(true),
      allow_anonymous: Some(false),
    };

    self.create_invoice(params).await
  }

  pub fn parse_payload(payload: &str) -> Option<DonationPayload> {
    json::from_str(payload).ok()
  }

  /// Verify webhook signature
  pub fn verify_signature(
    api_token: &str,
    body: &[u8],
    signature: &str,
  ) -> bool {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    // Secret is the SHA256 hash of the API token, per the Crypto Pay docs
    let token_hash = {
      use sha2::Digest;
      let mut hasher = Sha256::new();
      hasher.update(api_token.as_bytes());
      hasher.finalize()
    };

    let mut mac = HmacSha256::new_from_slice(&token_hash)
      .expect("HMAC can take key of any size");
    mac.update(body);

    let expected = hex::encode(mac.finalize().into_bytes());
    expected == signature
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_donation_payload() {
    let payload = r#"{"user_id":12345,"goal_id":7}"#;
    let parsed = CryptoBot::parse_payload(payload).unwrap();
    assert_eq!(parsed.user_id, 12345);
    assert_eq!(parsed.goal_id, Some(7));
  }

  #[test]
  fn parses_payload_without_goal() {
    let payload = r#"{"user_id":12345,"goal_id":null}"#;
    let parsed = CryptoBot::parse_payload(payload).unwrap();
    assert!(parsed.goal_id.is_none());
  }

  #[test]
  fn rejects_garbage_payload() {
    assert!(CryptoBot::parse_payload("not json").is_none());
  }

  #[test]
  fn formats_nano_amounts_as_decimals() {
    assert_eq!(to_decimal(10 * NANO_USDT), "10.00");
    assert_eq!(to_decimal(NANO_USDT / 2), "0.50");
  }

  #[test]
  fn signature_verification_round_trips() {
    use hmac::{Hmac, Mac};
    use sha2::{Digest, Sha256};

    let token = "test-token";
    let body = br#"{"update_id":1}"#;

    let key = Sha256::digest(token.as_bytes());
    let mut mac = Hmac::<Sha256>::new_from_slice(&key).unwrap();
    mac.update(body);
    let signature = hex::encode(mac.finalize().into_bytes());

    assert!(CryptoBot::verify_signature(token, body, &signature));
    assert!(!CryptoBot::verify_signature(token, body, "deadbeef"));
    assert!(!CryptoBot::verify_signature("other-token", body, &signature));
  }
}
