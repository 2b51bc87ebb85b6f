use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::weights::RateCategory;
use crate::{ExchangeId, GatewayError};

/// Rolling-window quota of one rate category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetQuota {
    pub category: RateCategory,
    pub capacity: u32,
    #[serde(rename = "window_ms", with = "duration_ms")]
    pub window: Duration,
}

impl BudgetQuota {
    pub const fn new(category: RateCategory, capacity: u32, window: Duration) -> Self {
        Self {
            category,
            capacity,
            window,
        }
    }
}

/// Order-count limit applied on top of weight budgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderQuota {
    pub limit: u32,
    #[serde(rename = "window_ms", with = "duration_ms")]
    pub window: Duration,
}

/// Exponential backoff used for server cool-downs and caller retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    #[serde(rename = "initial_delay_ms", with = "duration_ms")]
    pub initial_delay: Duration,
    #[serde(rename = "max_delay_ms", with = "duration_ms")]
    pub max_delay: Duration,
    pub multiplier: f64,
    pub max_retries: u32,
}

impl BackoffPolicy {
    /// Delay before retry `retry_count`, `None` once retries are exhausted.
    pub fn retry_delay(&self, retry_count: u32) -> Option<Duration> {
        if retry_count > self.max_retries {
            return None;
        }
        Some(self.capped_delay(retry_count))
    }

    /// Like [`BackoffPolicy::retry_delay`] but saturates at `max_delay`.
    pub fn capped_delay(&self, retry_count: u32) -> Duration {
        let exponent = i32::try_from(retry_count).unwrap_or(i32::MAX);
        let seconds = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped_seconds = seconds.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped_seconds.max(0.0))
    }
}

/// Per-exchange runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangePolicy {
    pub exchange: ExchangeId,
    pub base_url: String,
    #[serde(rename = "request_timeout_ms", with = "duration_ms")]
    pub request_timeout: Duration,
    /// Longest a call may wait for budget before failing as rate limited.
    #[serde(rename = "admission_timeout_ms", with = "duration_ms")]
    pub admission_timeout: Duration,
    pub budgets: Vec<BudgetQuota>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_quota: Option<OrderQuota>,
    /// Cool-down applied after a server rate-limit rejection without `Retry-After`.
    pub cooldown: BackoffPolicy,
}

impl ExchangePolicy {
    pub fn binance_default() -> Self {
        Self {
            exchange: ExchangeId::Binance,
            base_url: String::from("https://api.binance.com"),
            request_timeout: Duration::from_secs(10),
            admission_timeout: Duration::from_secs(30),
            budgets: vec![BudgetQuota::new(
                RateCategory::RequestWeight,
                6_000,
                Duration::from_secs(60),
            )],
            order_quota: Some(OrderQuota {
                limit: 100,
                window: Duration::from_secs(10),
            }),
            cooldown: BackoffPolicy {
                initial_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(120),
                multiplier: 2.0,
                max_retries: 6,
            },
        }
    }

    pub fn upbit_default() -> Self {
        Self {
            exchange: ExchangeId::Upbit,
            base_url: String::from("https://api.upbit.com"),
            request_timeout: Duration::from_secs(10),
            admission_timeout: Duration::from_secs(5),
            budgets: vec![
                BudgetQuota::new(RateCategory::Quotation, 10, Duration::from_secs(1)),
                BudgetQuota::new(RateCategory::ExchangeOrder, 8, Duration::from_secs(1)),
                BudgetQuota::new(RateCategory::ExchangeNonOrder, 30, Duration::from_secs(1)),
            ],
            order_quota: None,
            cooldown: BackoffPolicy {
                initial_delay: Duration::from_millis(500),
                max_delay: Duration::from_secs(30),
                multiplier: 2.0,
                max_retries: 6,
            },
        }
    }

    pub fn default_for(exchange: ExchangeId) -> Self {
        match exchange {
            ExchangeId::Binance => Self::binance_default(),
            ExchangeId::Upbit => Self::upbit_default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_admission_timeout(mut self, admission_timeout: Duration) -> Self {
        self.admission_timeout = admission_timeout;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Replaces the quota of `category`, adding it when absent.
    pub fn with_budget(mut self, quota: BudgetQuota) -> Self {
        self.budgets.retain(|existing| existing.category != quota.category);
        self.budgets.push(quota);
        self
    }

    pub fn with_order_quota(mut self, order_quota: Option<OrderQuota>) -> Self {
        self.order_quota = order_quota;
        self
    }

    pub fn budget(&self, category: RateCategory) -> Option<&BudgetQuota> {
        self.budgets.iter().find(|quota| quota.category == category)
    }

    /// Checks the policy against the categories an exchange's weight table uses.
    pub fn validate(&self, categories: &BTreeSet<RateCategory>) -> Result<(), GatewayError> {
        if self.base_url.trim().is_empty() {
            return Err(GatewayError::configuration(format!(
                "{} policy has an empty base_url",
                self.exchange
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(GatewayError::configuration(format!(
                "{} policy request_timeout must be greater than zero",
                self.exchange
            )));
        }

        for quota in &self.budgets {
            if quota.capacity == 0 || quota.window.is_zero() {
                return Err(GatewayError::configuration(format!(
                    "{} budget {} must have a positive capacity and window",
                    self.exchange, quota.category
                )));
            }
        }

        if let Some(missing) = categories
            .iter()
            .find(|category| self.budget(**category).is_none())
        {
            return Err(GatewayError::configuration(format!(
                "{} policy has no budget for category {missing}",
                self.exchange
            )));
        }

        match &self.order_quota {
            Some(quota) if quota.limit == 0 || quota.window.is_zero() => {
                Err(GatewayError::configuration(format!(
                    "{} order quota must have a positive limit and window",
                    self.exchange
                )))
            }
            _ => Ok(()),
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
