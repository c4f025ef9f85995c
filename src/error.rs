use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("No UPI app found on device")]
    NoUpiAppFound,
    #[error("Payment intent creation failed: {0}")]
    IntentCreationFailed(String),
    #[error("Payment UI error: {0}")]
    PaymentUiError(String),
    #[error("Commit notification failed: {0}")]
    CommitNotificationFailed(String),
    #[error("Deep link could not be opened: {0}")]
    DeepLinkFailed(String),
    #[error("Transport failure: {0}")]
    TransportFailure(String),
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Session expired, please log in again")]
    SessionExpired,
    #[error("Not logged in")]
    NotAuthenticated,
    #[error("A payment attempt is already in flight")]
    AttemptInFlight,
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<reqwest::Error> for CommerceError {
    fn from(err: reqwest::Error) -> Self {
        CommerceError::TransportFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CommerceError>;
