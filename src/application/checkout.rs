use crate::domain::cart::CartSnapshot;
use crate::domain::lifecycle::{LifecycleSubscription, Transition, is_resume_edge};
use crate::domain::payment::{
    CheckoutOutcome, CheckoutState, IntentRequest, MerchantProfile, PaymentAttempt, PaymentMethod,
    Receipt, SheetOptions, UpiLedgerRequest, UpiLink,
};
use crate::domain::ports::{
    CartStoreBox, CheckoutPromptBox, DeepLinkerBox, PaymentGatewayBox, PaymentSheetBox,
};
use crate::error::{CommerceError, Result};
use tracing::{info, warn};

/// Collaborators the reconciler drives.
pub struct CheckoutPorts {
    pub cart: CartStoreBox,
    pub gateway: PaymentGatewayBox,
    pub sheet: PaymentSheetBox,
    pub linker: DeepLinkerBox,
    pub prompt: CheckoutPromptBox,
}

/// Drives one cart from payment initiation to a terminal outcome.
///
/// Card payments resolve through the payment sheet. UPI payments leave the app
/// through a deep link and are only confirmed when the app comes back to the
/// foreground and the user attests the transfer went through. At most one
/// attempt is in flight at a time.
pub struct CheckoutReconciler {
    ports: CheckoutPorts,
    merchant: MerchantProfile,
    state: CheckoutState,
    attempt: Option<PaymentAttempt>,
    awaiting_confirmation: bool,
}

impl CheckoutReconciler {
    pub fn new(ports: CheckoutPorts, merchant: MerchantProfile) -> Self {
        Self {
            ports,
            merchant,
            state: CheckoutState::Idle,
            attempt: None,
            awaiting_confirmation: false,
        }
    }

    pub fn state(&self) -> CheckoutState {
        self.state
    }

    pub fn is_awaiting_confirmation(&self) -> bool {
        self.awaiting_confirmation
    }

    pub fn attempt(&self) -> Option<&PaymentAttempt> {
        self.attempt.as_ref()
    }

    /// Card checkout: intent, optional fraud gate, payment sheet, commit.
    pub async fn pay_with_card(&mut self) -> Result<CheckoutOutcome> {
        let snapshot = self.begin().await?;
        self.attempt = Some(PaymentAttempt::new(PaymentMethod::Card, snapshot.clone()));
        self.enter(CheckoutState::AttemptInitiated);

        let request = IntentRequest {
            snapshot,
            method: PaymentMethod::Card,
            location: self.merchant.location.clone(),
            merchant_id: self.merchant.merchant_id.clone(),
        };
        let intent = match self.ports.gateway.create_intent(&request).await {
            Ok(intent) => intent,
            Err(e) => {
                let error = match e {
                    CommerceError::SessionExpired => e,
                    other => CommerceError::IntentCreationFailed(other.to_string()),
                };
                return Ok(self.fail(error));
            }
        };
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.external_ref = Some(intent.payment_intent_id.clone());
        }

        if let Some(verdict) = intent.fraud_result.as_ref().filter(|v| v.is_high_risk()) {
            warn!(
                intent = %intent.payment_intent_id,
                probability = verdict.fraud_probability,
                "high fraud risk on payment intent"
            );
            if !self.ports.prompt.confirm_high_risk(&verdict.gate_notice()).await {
                return Ok(self.cancel("Payment cancelled after fraud warning"));
            }
        }

        self.enter(CheckoutState::AwaitingSheetResult);
        let options = SheetOptions {
            merchant_display_name: self.merchant.display_name.clone(),
            merchant_country_code: self.merchant.country_code.clone(),
            google_pay: true,
        };
        if let Err(e) = self
            .ports
            .sheet
            .present(&intent.client_secret, &options)
            .await
        {
            let error = match e {
                CommerceError::PaymentUiError(_) => e,
                other => CommerceError::PaymentUiError(other.to_string()),
            };
            return Ok(self.fail(error));
        }

        self.enter(CheckoutState::Committing);
        if let Err(e) = self
            .ports
            .gateway
            .mark_success(&intent.payment_intent_id)
            .await
        {
            // The sheet already reported success to the user.
            let error = CommerceError::CommitNotificationFailed(e.to_string());
            warn!(intent = %intent.payment_intent_id, "{error}");
        }

        let receipt = Receipt {
            method: PaymentMethod::Card,
            reference: intent.payment_intent_id,
            amount: request.snapshot.total_amount(),
            fraud: intent.fraud_result,
        };
        Ok(self.settle(receipt).await)
    }

    /// Hands the cart total to a UPI app.
    ///
    /// Fails with `NoUpiAppFound` before any state change when no app claims the
    /// link. The awaiting flag is set only if the hand-off itself succeeded.
    pub async fn launch_upi(&mut self) -> Result<()> {
        let snapshot = self.begin().await?;
        let link = UpiLink {
            payee_vpa: self.merchant.payee_vpa.clone(),
            payee_name: self.merchant.payee_name.clone(),
            note: self.merchant.upi_note.clone(),
            amount: snapshot.total_amount(),
            currency: self.merchant.currency.clone(),
        };
        let uri = link.to_uri()?;

        if !self.ports.linker.can_open(&uri).await {
            warn!("no app registered for {}", UpiLink::SCHEME);
            return Err(CommerceError::NoUpiAppFound);
        }

        let mut attempt = PaymentAttempt::new(PaymentMethod::Upi, snapshot);
        attempt.external_ref = Some(uri.to_string());
        self.attempt = Some(attempt);
        self.enter(CheckoutState::AttemptInitiated);

        if let Err(e) = self.ports.linker.open(&uri).await {
            let reason = match e {
                CommerceError::DeepLinkFailed(reason) => reason,
                other => other.to_string(),
            };
            warn!("UPI hand-off failed: {reason}");
            self.enter(CheckoutState::Failed);
            self.attempt = None;
            return Err(CommerceError::DeepLinkFailed(reason));
        }

        self.awaiting_confirmation = true;
        self.enter(CheckoutState::AwaitingExternalConfirmation);
        Ok(())
    }

    /// Feeds one lifecycle transition into the UPI confirmation protocol.
    ///
    /// Returns an outcome only for the dormant-to-active edge that follows a
    /// successful hand-off; every other transition is ignored.
    pub async fn on_lifecycle(&mut self, transition: Transition) -> Option<CheckoutOutcome> {
        if !is_resume_edge(
            transition.previous,
            transition.next,
            self.awaiting_confirmation,
        ) {
            return None;
        }
        // Cleared before prompting so a second resume cannot prompt again.
        self.awaiting_confirmation = false;

        if !self.ports.prompt.confirm_external_payment().await {
            return Some(self.cancel("UPI payment not confirmed"));
        }
        Some(self.commit_upi().await)
    }

    /// Runs a whole UPI checkout: launch, wait for the return to the app, confirm.
    ///
    /// Transitions queued on `lifecycle` before the call are dropped, so only
    /// the hand-off's own background and return edges can confirm. If every signal handle is dropped
    /// while waiting, the app is treated as killed: the attempt is discarded and
    /// the reconciler returns to `Idle`.
    pub async fn pay_with_upi(
        &mut self,
        lifecycle: &mut LifecycleSubscription,
    ) -> Result<CheckoutOutcome> {
        lifecycle.sync();
        match self.launch_upi().await {
            Ok(()) => {}
            Err(CommerceError::DeepLinkFailed(reason)) => {
                return Ok(CheckoutOutcome::Failed {
                    error: CommerceError::DeepLinkFailed(reason),
                });
            }
            Err(e) => return Err(e),
        }

        while let Some(transition) = lifecycle.next().await {
            if let Some(outcome) = self.on_lifecycle(transition).await {
                return Ok(outcome);
            }
        }

        warn!("lifecycle closed before UPI confirmation, attempt discarded");
        self.reset();
        Ok(CheckoutOutcome::Cancelled {
            reason: "App closed before the UPI payment was confirmed".to_string(),
        })
    }

    /// Forgets any attempt in progress, as a relaunch would.
    pub fn reset(&mut self) {
        self.attempt = None;
        self.awaiting_confirmation = false;
        self.state = CheckoutState::Idle;
    }

    async fn commit_upi(&mut self) -> CheckoutOutcome {
        let Some(attempt) = self.attempt.as_ref() else {
            return self.fail(CommerceError::ValidationError(
                "No UPI attempt to confirm".to_string(),
            ));
        };
        let request = UpiLedgerRequest {
            snapshot: attempt.snapshot.clone(),
            vpa: self.merchant.payee_vpa.clone(),
            location: self.merchant.location.clone(),
            merchant_id: self.merchant.merchant_id.clone(),
        };
        let amount = attempt.amount();
        let reference = attempt.external_ref.clone().unwrap_or_default();
        self.enter(CheckoutState::Committing);

        match self.ports.gateway.record_upi_payment(&request).await {
            Ok(response) => {
                if let Some(verdict) = response.fraud_result.as_ref() {
                    // Informational only: the money has already moved.
                    info!(risk = %verdict.risk_level, "{}", verdict.notice());
                }
                let receipt = Receipt {
                    method: PaymentMethod::Upi,
                    reference,
                    amount,
                    fraud: response.fraud_result,
                };
                self.settle(receipt).await
            }
            Err(e) => self.fail(e),
        }
    }

    async fn begin(&mut self) -> Result<CartSnapshot> {
        if self.state.is_in_flight() {
            return Err(CommerceError::AttemptInFlight);
        }
        let snapshot = self.ports.cart.snapshot().await?;
        if snapshot.is_empty() {
            return Err(CommerceError::EmptyCart);
        }
        self.attempt = None;
        self.awaiting_confirmation = false;
        self.state = CheckoutState::Idle;
        Ok(snapshot)
    }

    async fn settle(&mut self, receipt: Receipt) -> CheckoutOutcome {
        // The money has moved, so a cart that will not clear cannot undo it.
        if let Err(e) = self.ports.cart.clear().await {
            warn!(reference = %receipt.reference, "failed to clear cart after payment: {e}");
        }
        self.enter(CheckoutState::Settled);
        self.attempt = None;
        info!(
            method = %receipt.method,
            reference = %receipt.reference,
            amount = %receipt.amount,
            "payment settled"
        );
        CheckoutOutcome::Settled(receipt)
    }

    fn cancel(&mut self, reason: &str) -> CheckoutOutcome {
        self.enter(CheckoutState::Cancelled);
        self.attempt = None;
        self.awaiting_confirmation = false;
        CheckoutOutcome::Cancelled {
            reason: reason.to_string(),
        }
    }

    fn fail(&mut self, error: CommerceError) -> CheckoutOutcome {
        warn!("checkout failed: {error}");
        self.enter(CheckoutState::Failed);
        self.attempt = None;
        self.awaiting_confirmation = false;
        CheckoutOutcome::Failed { error }
    }

    fn enter(&mut self, next: CheckoutState) {
        tracing::debug!(from = ?self.state, to = ?next, "checkout state");
        self.state = next;
    }
}
