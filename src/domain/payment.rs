use super::cart::CartSnapshot;
use super::fraud::FraudVerdict;
use crate::error::{CommerceError, Result};
use chrono::{DateTime, Utc};
use reqwest::Url;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Upi,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Card => f.write_str("card"),
            PaymentMethod::Upi => f.write_str("upi"),
        }
    }
}

/// Where a checkout attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutState {
    #[default]
    Idle,
    AttemptInitiated,
    AwaitingExternalConfirmation,
    AwaitingSheetResult,
    Committing,
    Settled,
    Cancelled,
    Failed,
}

impl CheckoutState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CheckoutState::Settled | CheckoutState::Cancelled | CheckoutState::Failed
        )
    }

    /// An attempt exists and has not reached a terminal outcome.
    pub fn is_in_flight(self) -> bool {
        !self.is_terminal() && self != CheckoutState::Idle
    }
}

/// One checkout attempt for one cart snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentAttempt {
    pub method: PaymentMethod,
    pub snapshot: CartSnapshot,
    /// Intent id for card payments, the deep link for UPI.
    pub external_ref: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl PaymentAttempt {
    pub fn new(method: PaymentMethod, snapshot: CartSnapshot) -> Self {
        Self {
            method,
            snapshot,
            external_ref: None,
            started_at: Utc::now(),
        }
    }

    pub fn amount(&self) -> Decimal {
        self.snapshot.total_amount()
    }
}

/// `upi://pay` deep link handed to whichever wallet app claims the scheme.
#[derive(Debug, Clone, PartialEq)]
pub struct UpiLink {
    pub payee_vpa: String,
    pub payee_name: String,
    pub note: String,
    pub amount: Decimal,
    pub currency: String,
}

impl UpiLink {
    pub const SCHEME: &'static str = "upi";

    pub fn to_uri(&self) -> Result<Url> {
        if self.payee_vpa.is_empty() {
            return Err(CommerceError::ValidationError(
                "Payee VPA is not configured".to_string(),
            ));
        }
        let mut url = Url::parse("upi://pay")
            .map_err(|e| CommerceError::ValidationError(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("pa", &self.payee_vpa)
            .append_pair("pn", &self.payee_name)
            .append_pair("tn", &self.note)
            .append_pair("am", &self.amount.round_dp(2).normalize().to_string())
            .append_pair("cu", &self.currency);
        Ok(url)
    }
}

/// Merchant fields attached to every payment request.
#[derive(Debug, Clone, PartialEq)]
pub struct MerchantProfile {
    pub merchant_id: String,
    pub display_name: String,
    pub location: String,
    pub country_code: String,
    pub payee_vpa: String,
    pub payee_name: String,
    pub upi_note: String,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntentRequest {
    pub snapshot: CartSnapshot,
    pub method: PaymentMethod,
    pub location: String,
    pub merchant_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
    #[serde(default)]
    pub fraud_result: Option<FraudVerdict>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpiLedgerRequest {
    pub snapshot: CartSnapshot,
    pub vpa: String,
    pub location: String,
    pub merchant_id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpiLedgerResponse {
    #[serde(default)]
    pub fraud_result: Option<FraudVerdict>,
}

/// Display options for the card payment sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetOptions {
    pub merchant_display_name: String,
    pub merchant_country_code: String,
    pub google_pay: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub method: PaymentMethod,
    pub reference: String,
    pub amount: Decimal,
    pub fraud: Option<FraudVerdict>,
}

/// Terminal result of a checkout attempt.
#[derive(Debug)]
pub enum CheckoutOutcome {
    Settled(Receipt),
    Cancelled { reason: String },
    Failed { error: CommerceError },
}

impl CheckoutOutcome {
    pub fn state(&self) -> CheckoutState {
        match self {
            CheckoutOutcome::Settled(_) => CheckoutState::Settled,
            CheckoutOutcome::Cancelled { .. } => CheckoutState::Cancelled,
            CheckoutOutcome::Failed { .. } => CheckoutState::Failed,
        }
    }
}

/// A past payment as listed by the history endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub method: Option<PaymentMethod>,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fraud_result: Option<FraudVerdict>,
}
