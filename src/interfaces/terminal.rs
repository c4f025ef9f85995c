//! Console stand-ins for the device-side collaborators of checkout.
//!
//! Questions go to stdout and answers come from stdin. Blocking reads run on
//! the blocking pool so the runtime keeps serving lifecycle events.

use crate::domain::fraud::FraudNotice;
use crate::domain::lifecycle::{LifecycleSignal, LifecycleState};
use crate::domain::payment::SheetOptions;
use crate::domain::ports::{CheckoutPrompt, DeepLinker, PaymentSheet};
use crate::error::{CommerceError, Result};
use async_trait::async_trait;
use reqwest::Url;
use std::io::{self, BufRead, Write};

fn read_answer() -> io::Result<String> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn write_question(out: &mut impl Write, question: &str) -> io::Result<()> {
    write!(out, "{question} [y/N] ")?;
    out.flush()
}

async fn ask(question: String) -> bool {
    // The answer is still read; the question may just show up late.
    if let Err(e) = write_question(&mut io::stdout(), &question) {
        tracing::warn!("failed to show question: {e}");
    }
    match tokio::task::spawn_blocking(read_answer).await {
        Ok(Ok(answer)) => is_yes(&answer),
        Ok(Err(e)) => {
            tracing::warn!("failed to read answer: {e}");
            false
        }
        Err(e) => {
            tracing::warn!("prompt task failed: {e}");
            false
        }
    }
}

pub struct TerminalPrompt;

#[async_trait]
impl CheckoutPrompt for TerminalPrompt {
    async fn confirm_high_risk(&self, notice: &FraudNotice) -> bool {
        println!("{}: {}", notice.title, notice.message);
        ask("This payment looks risky. Proceed anyway?".to_string()).await
    }

    async fn confirm_external_payment(&self) -> bool {
        ask("Did you complete the payment in your UPI app?".to_string()).await
    }
}

/// Asks for a yes/no in place of the card entry sheet.
pub struct TerminalPaymentSheet;

#[async_trait]
impl PaymentSheet for TerminalPaymentSheet {
    async fn present(&self, client_secret: &str, options: &SheetOptions) -> Result<()> {
        println!(
            "{} ({}) card payment ready [{}]",
            options.merchant_display_name, options.merchant_country_code, client_secret
        );
        if ask("Pay now?".to_string()).await {
            Ok(())
        } else {
            Err(CommerceError::PaymentUiError("Canceled".to_string()))
        }
    }
}

/// Prints the link for the user to open elsewhere.
///
/// Opening the link puts the app in the background. Pressing Enter brings it
/// back to the foreground.
pub struct TerminalDeepLinker {
    handlers: Vec<String>,
    lifecycle: LifecycleSignal,
}

impl TerminalDeepLinker {
    pub fn new(handlers: Vec<String>, lifecycle: LifecycleSignal) -> Self {
        Self {
            handlers,
            lifecycle,
        }
    }
}

#[async_trait]
impl DeepLinker for TerminalDeepLinker {
    async fn can_open(&self, uri: &Url) -> bool {
        self.handlers.iter().any(|scheme| scheme == uri.scheme())
    }

    async fn open(&self, uri: &Url) -> Result<()> {
        let mut stdout = io::stdout();
        writeln!(stdout, "Open this link in your UPI app:\n  {uri}")
            .map_err(|e| CommerceError::DeepLinkFailed(e.to_string()))?;
        writeln!(stdout, "Press Enter when you are back.")
            .map_err(|e| CommerceError::DeepLinkFailed(e.to_string()))?;

        self.lifecycle.emit(LifecycleState::Background);
        let lifecycle = self.lifecycle.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = read_answer() {
                tracing::warn!("failed to read from stdin: {e}");
            }
            lifecycle.emit(LifecycleState::Active);
        });
        Ok(())
    }
}
