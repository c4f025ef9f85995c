use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Buckets a raw probability the same way the scoring service labels its verdicts.
    pub fn from_probability(fraud_probability: f64) -> Self {
        if fraud_probability >= 0.7 {
            RiskLevel::High
        } else if fraud_probability >= 0.3 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        };
        f.write_str(label)
    }
}

/// Server-supplied fraud classification. Consumed as-is, never computed locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudVerdict {
    pub risk_level: RiskLevel,
    pub fraud_probability: f64,
    pub is_fraud: bool,
}

impl FraudVerdict {
    pub fn is_high_risk(&self) -> bool {
        self.risk_level == RiskLevel::High
    }

    pub fn notice(&self) -> FraudNotice {
        FraudNotice::from(self)
    }

    /// Notice shown when asking whether to go ahead with a risky payment.
    ///
    /// Keyed on the risk level alone, so a HIGH verdict always reads as high
    /// risk even when the server did not set the fraud flag.
    pub fn gate_notice(&self) -> FraudNotice {
        FraudNotice::for_level(self.risk_level, self.fraud_probability)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeSeverity {
    Success,
    Warning,
    Error,
}

/// Human-readable rendering of a verdict for prompts and receipts.
#[derive(Debug, Clone, PartialEq)]
pub struct FraudNotice {
    pub title: String,
    pub message: String,
    pub severity: NoticeSeverity,
}

impl FraudNotice {
    fn for_level(level: RiskLevel, probability: f64) -> Self {
        let percent = format!("{:.1}%", probability * 100.0);
        match level {
            RiskLevel::High => FraudNotice {
                title: "High Fraud Risk Detected".to_string(),
                message: format!(
                    "This transaction has a {percent} fraud probability. Please verify your payment method and try again."
                ),
                severity: NoticeSeverity::Error,
            },
            RiskLevel::Medium => FraudNotice {
                title: "Medium Risk Transaction".to_string(),
                message: format!(
                    "This transaction has a {percent} fraud probability. Please proceed with caution."
                ),
                severity: NoticeSeverity::Warning,
            },
            RiskLevel::Low => FraudNotice {
                title: "Low Risk Transaction".to_string(),
                message: format!(
                    "This transaction appears to be legitimate with a {percent} fraud probability."
                ),
                severity: NoticeSeverity::Success,
            },
        }
    }
}

impl From<&FraudVerdict> for FraudNotice {
    fn from(verdict: &FraudVerdict) -> Self {
        // Receipts trust the fraud flag first, then fall back to MEDIUM copy.
        let level = if verdict.is_fraud {
            RiskLevel::High
        } else if verdict.risk_level == RiskLevel::Medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };
        FraudNotice::for_level(level, verdict.fraud_probability)
    }
}

impl fmt::Display for FraudNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudOverview {
    pub total_payments: u64,
    pub fraud_payments: u64,
    pub fraud_rate: serde_json::Value,
    pub checked_payments: u64,
}

/// One `{_id, count}` aggregation bucket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CountBucket {
    #[serde(rename = "_id")]
    pub key: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HighRiskTransaction {
    pub amount: f64,
    pub method: String,
    pub date: chrono::DateTime<chrono::Utc>,
}

/// Aggregate fraud statistics served to the analytics dashboard.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudAnalytics {
    pub overview: FraudOverview,
    #[serde(default)]
    pub risk_distribution: Vec<CountBucket>,
    #[serde(default)]
    pub fraud_by_method: Vec<CountBucket>,
    #[serde(default)]
    pub high_risk_transactions: Vec<HighRiskTransaction>,
}
