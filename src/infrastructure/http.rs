//! HTTP adapter for the commerce backend.
//!
//! Every request reads the bearer token from the injected `Session`. A 401
//! invalidates that session.

use super::session::Session;
use crate::domain::cart::{CartItem, CartSnapshot};
use crate::domain::fraud::{FraudAnalytics, FraudVerdict};
use crate::domain::payment::{
    IntentRequest, IntentResponse, PaymentMethod, PaymentRecord, UpiLedgerRequest,
    UpiLedgerResponse,
};
use crate::domain::ports::{BatchUploader, PaymentGateway};
use crate::error::{CommerceError, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL including the `/api` prefix, without a trailing slash.
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Cart line as the backend expects it.
#[derive(Debug, Serialize)]
struct WireItem<'a> {
    #[serde(rename = "_id")]
    product_id: &'a str,
    name: &'a str,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    price: Decimal,
    quantity: u32,
}

impl<'a> From<&'a CartItem> for WireItem<'a> {
    fn from(item: &'a CartItem) -> Self {
        Self {
            product_id: &item.product_id,
            name: &item.name,
            price: item.unit_price,
            quantity: item.quantity,
        }
    }
}

fn wire_items(snapshot: &CartSnapshot) -> Vec<WireItem<'_>> {
    snapshot.items().iter().map(WireItem::from).collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateIntentBody<'a> {
    items: Vec<WireItem<'a>>,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    total_amount: Decimal,
    method: PaymentMethod,
    location: &'a str,
    merchant_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MarkSuccessBody<'a> {
    payment_intent_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpiPaymentBody<'a> {
    items: Vec<WireItem<'a>>,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    total_amount: Decimal,
    vpa: &'a str,
    location: &'a str,
    merchant_id: &'a str,
}

#[derive(Debug, Serialize)]
struct BiometricsBody {
    vector: Vec<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FraudCheckBody<'a> {
    payment_id: &'a str,
}

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub country: String,
    pub pincode: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub address: Address,
}

impl SignupRequest {
    pub fn validate(&self) -> Result<()> {
        let required = [
            &self.name,
            &self.email,
            &self.password,
            &self.address.street,
            &self.address.city,
            &self.address.country,
            &self.address.pincode,
        ];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(CommerceError::ValidationError(
                "All fields are required".to_string(),
            ));
        }
        if self.password != self.confirm_password {
            return Err(CommerceError::ValidationError(
                "Passwords do not match".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl Product {
    /// Case-insensitive name match, the way the shop search box filters.
    pub fn matches(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(&query.to_lowercase())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Client for the commerce REST API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, session: Session) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attaches the bearer token; fails when nobody is logged in.
    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.session.require_token()?;
        Ok(request.bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error);
        Err(self.rejection(status, message))
    }

    /// Maps a non-success status to an error. A 401 also ends the session.
    fn rejection(&self, status: StatusCode, message: Option<String>) -> CommerceError {
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("session rejected by server, logging out");
            self.session.invalidate();
            return CommerceError::SessionExpired;
        }
        CommerceError::Rejected {
            status: status.as_u16(),
            message: message.unwrap_or_else(|| {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            }),
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| CommerceError::TransportFailure(format!("invalid response body: {e}")))
    }

    /// Logs in and stores the returned token in the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let request = self
            .http
            .post(self.url("/auth/login"))
            .json(&LoginBody { email, password });
        let response: AuthResponse = self.send_json(request).await?;
        if let Some(token) = &response.token {
            self.session.set_token(token.clone())?;
        }
        tracing::info!(email, "logged in");
        Ok(response)
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse> {
        request.validate()?;
        let builder = self.http.post(self.url("/auth/signup")).json(request);
        let response: AuthResponse = self.send_json(builder).await?;
        if let Some(token) = &response.token {
            self.session.set_token(token.clone())?;
        }
        Ok(response)
    }

    pub async fn profile(&self) -> Result<UserProfile> {
        let request = self.authorized(self.http.get(self.url("/auth/profile")))?;
        self.send_json(request).await
    }

    /// Tells the server, then forgets the token locally even if the call failed.
    pub async fn logout(&self) -> Result<()> {
        let result = match self.authorized(self.http.post(self.url("/auth/logout"))) {
            Ok(request) => self.send(request).await.map(|_| ()),
            Err(e) => Err(e),
        };
        self.session.invalidate();
        match result {
            Err(CommerceError::NotAuthenticated) | Err(CommerceError::SessionExpired) => Ok(()),
            other => other,
        }
    }

    pub async fn products(&self) -> Result<Vec<Product>> {
        self.send_json(self.http.get(self.url("/products"))).await
    }

    pub async fn payment_history(&self) -> Result<Vec<PaymentRecord>> {
        let request = self.authorized(self.http.get(self.url("/payments/history")))?;
        self.send_json(request).await
    }

    pub async fn fraud_analytics(&self) -> Result<FraudAnalytics> {
        let request = self.authorized(self.http.get(self.url("/fraud/analytics")))?;
        self.send_json(request).await
    }

    pub async fn check_transaction_fraud(&self, payment_id: &str) -> Result<FraudVerdict> {
        let request = self.authorized(
            self.http
                .post(self.url("/fraud/check"))
                .json(&FraudCheckBody { payment_id }),
        )?;
        self.send_json(request).await
    }
}

#[async_trait]
impl PaymentGateway for ApiClient {
    async fn create_intent(&self, request: &IntentRequest) -> Result<IntentResponse> {
        let body = CreateIntentBody {
            items: wire_items(&request.snapshot),
            total_amount: request.snapshot.total_amount(),
            method: request.method,
            location: &request.location,
            merchant_id: &request.merchant_id,
        };
        let builder = self.authorized(self.http.post(self.url("/payments/create-intent")).json(&body))?;
        self.send_json(builder).await
    }

    async fn mark_success(&self, payment_intent_id: &str) -> Result<()> {
        let builder = self.authorized(
            self.http
                .post(self.url("/payments/mark-success"))
                .json(&MarkSuccessBody { payment_intent_id }),
        )?;
        self.send(builder).await.map(|_| ())
    }

    async fn record_upi_payment(&self, request: &UpiLedgerRequest) -> Result<UpiLedgerResponse> {
        let body = UpiPaymentBody {
            items: wire_items(&request.snapshot),
            total_amount: request.snapshot.total_amount(),
            vpa: &request.vpa,
            location: &request.location,
            merchant_id: &request.merchant_id,
        };
        let builder = self.authorized(self.http.post(self.url("/payments/upi")).json(&body))?;
        self.send_json(builder).await
    }
}

#[async_trait]
impl BatchUploader for ApiClient {
    /// Telemetry is best-effort: sent without a credential when logged out.
    async fn upload(&self, vector: Vec<f64>) -> Result<()> {
        let mut builder = self
            .http
            .post(self.url("/biometrics"))
            .json(&BiometricsBody { vector });
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }
        self.send(builder).await.map(|_| ())
    }
}
