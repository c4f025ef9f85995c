use super::cart::CartSnapshot;
use super::fraud::FraudNotice;
use super::payment::{
    IntentRequest, IntentResponse, SheetOptions, UpiLedgerRequest, UpiLedgerResponse,
};
use super::sensor::{Axes, SensorKind};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn snapshot(&self) -> Result<CartSnapshot>;
    async fn clear(&self) -> Result<()>;
}

/// Remote payment service.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, request: &IntentRequest) -> Result<IntentResponse>;
    /// Idempotent per intent id.
    async fn mark_success(&self, payment_intent_id: &str) -> Result<()>;
    async fn record_upi_payment(&self, request: &UpiLedgerRequest) -> Result<UpiLedgerResponse>;
}

/// Card payment UI. Resolves once with the terminal outcome.
#[async_trait]
pub trait PaymentSheet: Send + Sync {
    async fn present(&self, client_secret: &str, options: &SheetOptions) -> Result<()>;
}

#[async_trait]
pub trait DeepLinker: Send + Sync {
    async fn can_open(&self, uri: &Url) -> bool;
    /// Fire-and-forget hand-off; the app usually loses the foreground.
    async fn open(&self, uri: &Url) -> Result<()>;
}

/// Binary questions put to whoever started the checkout.
#[async_trait]
pub trait CheckoutPrompt: Send + Sync {
    /// Continue paying despite a high-risk verdict?
    async fn confirm_high_risk(&self, notice: &FraudNotice) -> bool;
    /// Did the payment in the external app complete?
    async fn confirm_external_payment(&self) -> bool;
}

/// A 3-axis sensor whose readings are broadcast to current subscribers.
pub trait SensorStream: Send + Sync {
    fn kind(&self) -> SensorKind;
    fn set_update_interval(&self, interval: Duration);
    /// Readings emitted after this call. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<Axes>;
}

#[async_trait]
pub trait BatchUploader: Send + Sync {
    async fn upload(&self, vector: Vec<f64>) -> Result<()>;
}

pub type CartStoreBox = Box<dyn CartStore>;
pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
pub type PaymentSheetBox = Box<dyn PaymentSheet>;
pub type DeepLinkerBox = Box<dyn DeepLinker>;
pub type CheckoutPromptBox = Box<dyn CheckoutPrompt>;
pub type BatchUploaderBox = Box<dyn BatchUploader>;
pub type SensorStreamRef = Arc<dyn SensorStream>;
