// Rust guideline compliant 2026-08-24

//! Rule-based decision engine for the fraud-detection pipeline.
//!
//! [`RuleEngine`] implements the `domain::DecisionEngine` port: a pure
//! function from event to verdict with no I/O and no persistence. Rules run
//! in a fixed order and the first match determines the fraud reason.
//! Configuration via [`RuleConfig::builder`].

use chrono::{DateTime, Utc};
use domain::{DecisionEngine, PolicyError, TransactionEvent, Verdict};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::time::Instant;

/// Reason reported when the amount rule fires.
pub const REASON_AMOUNT: &str = "amount exceeds threshold";
/// Reason reported when the geography rule fires.
pub const REASON_COUNTRY: &str = "suspicious source country";
/// Reason reported when the account-age rule fires.
pub const REASON_ACCOUNT_AGE: &str = "account too new";

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Errors that can occur when configuring the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The supplied configuration is invalid.
    #[error("invalid rule configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// RuleConfig + builder
// ---------------------------------------------------------------------------

/// Rule thresholds for a [`RuleEngine`].
///
/// Construct via [`RuleConfig::builder`].
#[derive(Debug)]
pub struct RuleConfig {
    /// Amounts strictly above this are fraudulent (rule 1).
    pub max_transaction_amount: Decimal,
    /// Source countries in this set are fraudulent (rule 2).
    pub suspicious_countries: HashSet<String>,
    /// Accounts younger than this many whole days are fraudulent (rule 3).
    pub min_account_age_days: i64,
}

/// Builder for [`RuleConfig`].
///
/// Obtain via [`RuleConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct RuleConfigBuilder {
    max_transaction_amount: Decimal,
    suspicious_countries: HashSet<String>,
    min_account_age_days: i64,
}

impl RuleConfig {
    /// Create a builder. `max_transaction_amount` is the only required parameter.
    ///
    /// Default values: empty suspicious-country set, `min_account_age_days = 30`.
    #[must_use]
    pub fn builder(max_transaction_amount: Decimal) -> RuleConfigBuilder {
        RuleConfigBuilder {
            max_transaction_amount,
            suspicious_countries: HashSet::new(),
            min_account_age_days: 30,
        }
    }
}

impl RuleConfigBuilder {
    /// Replace the suspicious-country set.
    #[must_use]
    pub fn suspicious_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suspicious_countries = countries.into_iter().map(Into::into).collect();
        self
    }

    /// Override the minimum account age in whole days.
    #[must_use]
    pub fn min_account_age_days(mut self, days: i64) -> Self {
        self.min_account_age_days = days;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] when the amount threshold is
    /// negative or the minimum account age is negative.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<RuleConfig, EngineError> {
        if self.max_transaction_amount.is_sign_negative() {
            return Err(EngineError::InvalidConfig {
                reason: "max_transaction_amount must be non-negative".to_owned(),
            });
        }
        if self.min_account_age_days < 0 {
            return Err(EngineError::InvalidConfig {
                reason: "min_account_age_days must be >= 0".to_owned(),
            });
        }
        Ok(RuleConfig {
            max_transaction_amount: self.max_transaction_amount,
            suspicious_countries: self.suspicious_countries,
            min_account_age_days: self.min_account_age_days,
        })
    }
}

// ---------------------------------------------------------------------------
// RuleEngine
// ---------------------------------------------------------------------------

/// Evaluates the three-rule fraud policy against one event at a time.
///
/// Rules run in the fixed order amount -> geography -> account age; the
/// first rule that fires determines the reason. Holds no mutable state and
/// is safe to share across worker tasks.
#[derive(Debug)]
pub struct RuleEngine {
    config: RuleConfig,
}

impl RuleEngine {
    /// Create a new engine from `config`.
    #[must_use]
    pub fn new(config: RuleConfig) -> Self {
        Self { config }
    }

    /// Evaluate `event` against the rules as of `now`.
    ///
    /// `now` is injected so the account-age rule is deterministic in tests;
    /// the `DecisionEngine` impl passes `Utc::now()`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Invalid`] for a negative amount.
    pub fn decide_at(
        &self,
        event: &TransactionEvent,
        now: DateTime<Utc>,
    ) -> Result<Verdict, PolicyError> {
        let started = Instant::now();

        if event.amount.is_sign_negative() {
            return Err(PolicyError::Invalid {
                reason: format!("amount must be non-negative, got {}", event.amount),
            });
        }

        let fraud_reason = self.first_matching_rule(event, now);
        let verdict = Verdict {
            transaction_id: event.transaction_id.clone(),
            fraudulent: fraud_reason.is_some(),
            fraud_reason: fraud_reason.map(str::to_owned),
            processing_time_ms: u64::try_from(started.elapsed().as_millis())
                .unwrap_or(u64::MAX),
        };

        log::debug!(
            "engine.decided: tx={} fraudulent={} reason={:?}",
            verdict.transaction_id,
            verdict.fraudulent,
            verdict.fraud_reason
        );
        Ok(verdict)
    }

    /// Apply rules 1 -> 2 -> 3; return the first reason that fires.
    fn first_matching_rule(
        &self,
        event: &TransactionEvent,
        now: DateTime<Utc>,
    ) -> Option<&'static str> {
        if event.amount > self.config.max_transaction_amount {
            return Some(REASON_AMOUNT);
        }
        if self.config.suspicious_countries.contains(&event.source_country) {
            return Some(REASON_COUNTRY);
        }
        if self.is_account_too_new(event.account_creation_date, now) {
            return Some(REASON_ACCOUNT_AGE);
        }
        None
    }

    /// An absent creation date counts as suspicious (age unknown).
    fn is_account_too_new(&self, created: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match created {
            None => true,
            Some(created) => (now - created).num_days() < self.config.min_account_age_days,
        }
    }
}

impl DecisionEngine for RuleEngine {
    fn decide(&self, event: &TransactionEvent) -> Result<Verdict, PolicyError> {
        self.decide_at(event, Utc::now())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
