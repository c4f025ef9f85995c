#![allow(dead_code)]

use async_trait::async_trait;
use mcart::domain::cart::CartSnapshot;
use mcart::domain::fraud::{FraudNotice, FraudVerdict, RiskLevel};
use mcart::domain::lifecycle::{LifecycleSignal, LifecycleState};
use mcart::domain::payment::{
    IntentRequest, IntentResponse, SheetOptions, UpiLedgerRequest, UpiLedgerResponse,
};
use mcart::domain::ports::{
    BatchUploader, CartStore, CheckoutPrompt, DeepLinker, PaymentGateway, PaymentSheet,
};
use mcart::error::{CommerceError, Result};
use mcart::infrastructure::in_memory::InMemoryCartStore;
use parking_lot::Mutex;
use reqwest::Url;
use std::collections::VecDeque;
use std::sync::Arc;

pub fn verdict(risk_level: RiskLevel, fraud_probability: f64) -> FraudVerdict {
    FraudVerdict {
        risk_level,
        fraud_probability,
        is_fraud: risk_level == RiskLevel::High,
    }
}

/// Cart that reads normally but can never be cleared.
#[derive(Clone)]
pub struct StuckCart(pub InMemoryCartStore);

#[async_trait]
impl CartStore for StuckCart {
    async fn snapshot(&self) -> Result<CartSnapshot> {
        self.0.snapshot().await
    }

    async fn clear(&self) -> Result<()> {
        Err(std::io::Error::other("cart storage unavailable").into())
    }
}

/// Every call the fake gateway received.
#[derive(Debug, Default)]
pub struct GatewayCalls {
    pub intents: Vec<IntentRequest>,
    pub mark_success: Vec<String>,
    pub upi_payments: Vec<UpiLedgerRequest>,
}

/// Gateway returning canned responses and recording what it was asked.
#[derive(Clone, Default)]
pub struct FakeGateway {
    pub calls: Arc<Mutex<GatewayCalls>>,
    pub fraud_result: Option<FraudVerdict>,
    pub fail_intent: bool,
    pub fail_mark_success: bool,
    pub fail_upi: bool,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fraud(fraud_result: FraudVerdict) -> Self {
        Self {
            fraud_result: Some(fraud_result),
            ..Self::default()
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_intent(&self, request: &IntentRequest) -> Result<IntentResponse> {
        self.calls.lock().intents.push(request.clone());
        if self.fail_intent {
            return Err(CommerceError::Rejected {
                status: 500,
                message: "Failed to create payment intent".to_string(),
            });
        }
        Ok(IntentResponse {
            client_secret: "pi_1_secret".to_string(),
            payment_intent_id: "pi_1".to_string(),
            fraud_result: self.fraud_result.clone(),
        })
    }

    async fn mark_success(&self, payment_intent_id: &str) -> Result<()> {
        self.calls
            .lock()
            .mark_success
            .push(payment_intent_id.to_string());
        if self.fail_mark_success {
            return Err(CommerceError::TransportFailure("connection reset".to_string()));
        }
        Ok(())
    }

    async fn record_upi_payment(&self, request: &UpiLedgerRequest) -> Result<UpiLedgerResponse> {
        self.calls.lock().upi_payments.push(request.clone());
        if self.fail_upi {
            return Err(CommerceError::TransportFailure("timed out".to_string()));
        }
        Ok(UpiLedgerResponse {
            fraud_result: self.fraud_result.clone(),
        })
    }
}

#[derive(Clone, Default)]
pub struct FakeSheet {
    pub presented: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
}

#[async_trait]
impl PaymentSheet for FakeSheet {
    async fn present(&self, client_secret: &str, _options: &SheetOptions) -> Result<()> {
        self.presented.lock().push(client_secret.to_string());
        if self.fail {
            return Err(CommerceError::PaymentUiError("Canceled".to_string()));
        }
        Ok(())
    }
}

/// Linker that backgrounds the app when it opens a link, as a wallet app would.
#[derive(Clone)]
pub struct FakeLinker {
    pub installed: bool,
    pub fail_open: bool,
    pub lifecycle: LifecycleSignal,
    pub opened: Arc<Mutex<Vec<Url>>>,
}

impl FakeLinker {
    pub fn new(lifecycle: LifecycleSignal) -> Self {
        Self {
            installed: true,
            fail_open: false,
            lifecycle,
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl DeepLinker for FakeLinker {
    async fn can_open(&self, _uri: &Url) -> bool {
        self.installed
    }

    async fn open(&self, uri: &Url) -> Result<()> {
        if self.fail_open {
            return Err(CommerceError::DeepLinkFailed("activity not found".to_string()));
        }
        self.opened.lock().push(uri.clone());
        self.lifecycle.emit(LifecycleState::Background);
        Ok(())
    }
}

/// Prompt answering from a script. Unscripted questions are answered "no".
#[derive(Clone, Default)]
pub struct ScriptedPrompt {
    pub high_risk_answers: Arc<Mutex<VecDeque<bool>>>,
    pub external_answers: Arc<Mutex<VecDeque<bool>>>,
    pub notices: Arc<Mutex<Vec<FraudNotice>>>,
    pub external_asked: Arc<Mutex<usize>>,
}

impl ScriptedPrompt {
    pub fn answering(high_risk: &[bool], external: &[bool]) -> Self {
        Self {
            high_risk_answers: Arc::new(Mutex::new(high_risk.iter().copied().collect())),
            external_answers: Arc::new(Mutex::new(external.iter().copied().collect())),
            ..Self::default()
        }
    }

    pub fn external_prompts(&self) -> usize {
        *self.external_asked.lock()
    }
}

#[async_trait]
impl CheckoutPrompt for ScriptedPrompt {
    async fn confirm_high_risk(&self, notice: &FraudNotice) -> bool {
        self.notices.lock().push(notice.clone());
        self.high_risk_answers.lock().pop_front().unwrap_or(false)
    }

    async fn confirm_external_payment(&self) -> bool {
        *self.external_asked.lock() += 1;
        self.external_answers.lock().pop_front().unwrap_or(false)
    }
}

/// Uploader that keeps every payload. Fails the first `failures` uploads.
#[derive(Clone, Default)]
pub struct RecordingUploader {
    pub uploads: Arc<Mutex<Vec<Vec<f64>>>>,
    pub failures: Arc<Mutex<usize>>,
}

impl RecordingUploader {
    pub fn failing(failures: usize) -> Self {
        Self {
            failures: Arc::new(Mutex::new(failures)),
            ..Self::default()
        }
    }
}

#[async_trait]
impl BatchUploader for RecordingUploader {
    async fn upload(&self, vector: Vec<f64>) -> Result<()> {
        self.uploads.lock().push(vector);
        let mut failures = self.failures.lock();
        if *failures > 0 {
            *failures -= 1;
            return Err(CommerceError::Rejected {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}
