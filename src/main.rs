use clap::{Parser, Subcommand, ValueEnum};
use mcart::application::checkout::{CheckoutPorts, CheckoutReconciler};
use mcart::application::sampler::{SensorSampler, SensorSet};
use mcart::config::Config;
use mcart::domain::lifecycle::{LifecycleSignal, LifecycleState};
use mcart::domain::payment::{CheckoutOutcome, PaymentMethod};
use mcart::domain::ports::CartStore;
use mcart::domain::sensor::SensorKind;
use mcart::error::CommerceError;
use mcart::infrastructure::http::{Address, ApiClient, SignupRequest};
use mcart::infrastructure::in_memory::InMemoryCartStore;
use mcart::infrastructure::sensors::{BroadcastSensor, spawn_synthetic};
use mcart::infrastructure::session::Session;
use mcart::interfaces::csv::cart_reader::CartReader;
use mcart::interfaces::terminal::{TerminalDeepLinker, TerminalPaymentSheet, TerminalPrompt};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the commerce API (overrides MCART_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and remember the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        #[arg(long)]
        street: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        country: String,
        #[arg(long)]
        pincode: String,
    },
    /// Forget the session token
    Logout,
    /// Show the logged-in user
    Profile,
    /// List the catalog
    Products {
        #[arg(long)]
        search: Option<String>,
    },
    /// Print a cart CSV and its total
    Cart { input: PathBuf },
    /// Pay for a cart CSV
    Checkout {
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = Method::Card)]
        method: Method,
    },
    /// List past payments
    History,
    /// Show fraud statistics
    Analytics,
    /// Ask the server to score a past payment
    FraudCheck { payment_id: String },
    /// Stream synthetic motion data to the backend
    Sample {
        /// Stop after this many batches
        #[arg(long)]
        batches: Option<u64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Method {
    Card,
    Upi,
}

impl From<Method> for PaymentMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Card => PaymentMethod::Card,
            Method::Upi => PaymentMethod::Upi,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mcart=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let mut config = Config::from_env().into_diagnostic()?;
    if let Some(api_url) = cli.api_url {
        config.api.base_url = api_url;
    }

    let session = Session::load(&config.token_path).into_diagnostic()?;
    let client = ApiClient::new(&config.api, session).into_diagnostic()?;

    match cli.command {
        Command::Login { email, password } => {
            let response = client.login(&email, &password).await.into_diagnostic()?;
            println!("{}", response.message.unwrap_or_else(|| "Logged in".to_string()));
        }
        Command::Signup {
            name,
            email,
            password,
            confirm_password,
            street,
            city,
            country,
            pincode,
        } => {
            let request = SignupRequest {
                name,
                email,
                password,
                confirm_password,
                address: Address {
                    street,
                    city,
                    country,
                    pincode,
                },
            };
            let response = client.signup(&request).await.into_diagnostic()?;
            println!("{}", response.message.unwrap_or_else(|| "Signed up".to_string()));
        }
        Command::Logout => {
            client.logout().await.into_diagnostic()?;
            println!("Logged out");
        }
        Command::Profile => {
            let profile = client.profile().await.into_diagnostic()?;
            println!("{} <{}>", profile.name, profile.email);
            if let Some(address) = profile.address {
                println!(
                    "{}, {}, {} {}",
                    address.street, address.city, address.country, address.pincode
                );
            }
        }
        Command::Products { search } => {
            let products = client.products().await.into_diagnostic()?;
            for product in products
                .iter()
                .filter(|p| search.as_deref().is_none_or(|q| p.matches(q)))
            {
                println!("{}\t{}\t{}", product.id, product.name, product.price);
            }
        }
        Command::Cart { input } => {
            let cart = read_cart(&input)?;
            let snapshot = cart.snapshot().await.into_diagnostic()?;
            for item in snapshot.items() {
                println!(
                    "{}\t{}\t{} x {}",
                    item.product_id, item.name, item.unit_price, item.quantity
                );
            }
            println!("Total: {}", snapshot.total_amount());
        }
        Command::Checkout { input, method } => {
            let cart = read_cart(&input)?;
            let lifecycle = LifecycleSignal::new(LifecycleState::Active);
            let ports = CheckoutPorts {
                cart: Box::new(cart),
                gateway: Box::new(client.clone()),
                sheet: Box::new(TerminalPaymentSheet),
                linker: Box::new(TerminalDeepLinker::new(
                    config.upi_handlers.clone(),
                    lifecycle.clone(),
                )),
                prompt: Box::new(TerminalPrompt),
            };
            let mut reconciler = CheckoutReconciler::new(ports, config.merchant.clone());

            let outcome = match PaymentMethod::from(method) {
                PaymentMethod::Card => reconciler.pay_with_card().await,
                PaymentMethod::Upi => {
                    let mut subscription = lifecycle.subscribe();
                    reconciler.pay_with_upi(&mut subscription).await
                }
            }
            .into_diagnostic()?;
            report(outcome).into_diagnostic()?;
        }
        Command::History => {
            for record in client.payment_history().await.into_diagnostic()? {
                let method = record.method.map(|m| m.to_string()).unwrap_or_default();
                let amount = record.total_amount.unwrap_or_default();
                let risk = record
                    .fraud_result
                    .map(|v| v.risk_level.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}\t{}\t{:.2}\t{}\t{}",
                    record.id,
                    method,
                    amount,
                    record.status.unwrap_or_default(),
                    risk
                );
            }
        }
        Command::Analytics => {
            let analytics = client.fraud_analytics().await.into_diagnostic()?;
            let overview = &analytics.overview;
            println!("Total payments:   {}", overview.total_payments);
            println!("Checked payments: {}", overview.checked_payments);
            println!("Fraud payments:   {}", overview.fraud_payments);
            println!("Fraud rate:       {}", overview.fraud_rate);
            for bucket in &analytics.risk_distribution {
                println!("risk {}: {}", bucket.key, bucket.count);
            }
            for bucket in &analytics.fraud_by_method {
                println!("fraud via {}: {}", bucket.key, bucket.count);
            }
            for tx in &analytics.high_risk_transactions {
                println!("high risk: {:.2} by {} on {}", tx.amount, tx.method, tx.date);
            }
        }
        Command::FraudCheck { payment_id } => {
            let verdict = client
                .check_transaction_fraud(&payment_id)
                .await
                .into_diagnostic()?;
            println!("{}", verdict.notice());
        }
        Command::Sample { batches } => {
            sample(&config, client, batches).await?;
        }
    }

    Ok(())
}

fn read_cart(path: &Path) -> Result<InMemoryCartStore> {
    let file = File::open(path).into_diagnostic()?;
    let mut items = Vec::new();
    for item in CartReader::new(file).items() {
        match item {
            Ok(item) => items.push(item),
            Err(e) => eprintln!("Error reading cart line: {}", e),
        }
    }
    Ok(InMemoryCartStore::with_items(items))
}

fn report(outcome: CheckoutOutcome) -> std::result::Result<(), CommerceError> {
    match outcome {
        CheckoutOutcome::Settled(receipt) => {
            println!(
                "Payment successful: {} {} ({})",
                receipt.amount, receipt.method, receipt.reference
            );
            if let Some(verdict) = receipt.fraud {
                println!("{}", verdict.notice());
            }
            Ok(())
        }
        CheckoutOutcome::Cancelled { reason } => {
            println!("Payment cancelled: {reason}");
            Ok(())
        }
        CheckoutOutcome::Failed { error } => Err(error),
    }
}

async fn sample(config: &Config, client: ApiClient, batches: Option<u64>) -> Result<()> {
    let lifecycle = LifecycleSignal::new(LifecycleState::Active);
    let [accelerometer, magnetometer, gyroscope] = SensorKind::ALL.map(BroadcastSensor::new);
    let drivers = [&accelerometer, &magnetometer, &gyroscope].map(|s| spawn_synthetic(s.clone()));

    let sensors = SensorSet {
        accelerometer: Arc::new(accelerometer),
        magnetometer: Arc::new(magnetometer),
        gyroscope: Arc::new(gyroscope),
    };
    let sampler = SensorSampler::new(sensors, Box::new(client), config.sampler.clone());
    let mut status = sampler.status();
    let latest = sampler.latest_vector();
    let runner = tokio::spawn(sampler.run(lifecycle.subscribe()));

    let target = batches.unwrap_or(u64::MAX);
    tokio::select! {
        result = status.wait_for(|s| s.flushed >= target) => {
            if let Ok(status) = result {
                println!(
                    "{} batches uploaded, {} failed",
                    status.flushed - status.failed,
                    status.failed
                );
            }
            if let Some(vector) = *latest.borrow() {
                println!("last vector: {:?}", vector.components());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            lifecycle.emit(LifecycleState::Background);
        }
    }

    drop(lifecycle);
    runner.await.into_diagnostic()?;
    for driver in drivers {
        driver.abort();
    }
    Ok(())
}
