//! Per-exchange admission control.
//!
//! Each rate category owns a rolling ledger of `(instant, cost)` entries.
//! A call is admitted once `consumed + cost <= capacity` inside the active
//! window; otherwise it sleeps until enough weight expires. Waiters on one
//! category are served in arrival order through a fair async mutex, and
//! weight is only recorded at the moment of admission, so a caller that
//! drops its future while waiting leaves the ledger untouched.

use std::collections::{HashMap, VecDeque};
use std::num::NonZeroU32;
use std::sync::Mutex;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::policy::{BackoffPolicy, ExchangePolicy, OrderQuota};
use crate::weights::RateCategory;
use crate::{ExchangeId, GatewayError};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Point-in-time view of one category budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetSnapshot {
    pub category: RateCategory,
    pub capacity: u32,
    pub consumed: u32,
    pub window: Duration,
    /// Remaining server-imposed cool-down, if any.
    pub halted_for: Option<Duration>,
}

impl BudgetSnapshot {
    pub const fn available(&self) -> u32 {
        self.capacity.saturating_sub(self.consumed)
    }
}

/// Weight recorded for one admitted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightPermit {
    pub category: RateCategory,
    pub cost: u32,
    at: Instant,
}

#[derive(Debug)]
struct Ledger {
    capacity: u32,
    window: Duration,
    entries: VecDeque<(Instant, u32)>,
    consumed: u32,
    halted_until: Option<Instant>,
    consecutive_rejections: u32,
}

enum Admission {
    Granted(Instant),
    WaitUntil(Instant),
}

impl Ledger {
    fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity,
            window,
            entries: VecDeque::new(),
            consumed: 0,
            halted_until: None,
            consecutive_rejections: 0,
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&(at, cost)) = self.entries.front() {
            if at + self.window > now {
                break;
            }
            self.entries.pop_front();
            self.consumed -= cost;
        }
        if self.halted_until.is_some_and(|until| until <= now) {
            self.halted_until = None;
        }
    }

    fn try_admit(&mut self, now: Instant, cost: u32) -> Admission {
        self.prune(now);

        if let Some(until) = self.halted_until {
            return Admission::WaitUntil(until);
        }

        if self.consumed + cost <= self.capacity {
            self.entries.push_back((now, cost));
            self.consumed += cost;
            return Admission::Granted(now);
        }

        // Earliest instant at which enough entries have expired.
        let mut remaining = self.consumed;
        for &(at, entry_cost) in &self.entries {
            remaining -= entry_cost;
            if remaining + cost <= self.capacity {
                return Admission::WaitUntil(at + self.window);
            }
        }
        Admission::WaitUntil(now + self.window)
    }

    /// Drops one entry recorded at `at`; a no-op once it has expired.
    fn refund(&mut self, at: Instant, cost: u32) {
        if let Some(index) = self
            .entries
            .iter()
            .rposition(|&(entry_at, entry_cost)| entry_at == at && entry_cost == cost)
        {
            self.entries.remove(index);
            self.consumed -= cost;
        }
    }
}

#[derive(Debug)]
struct WeightBudget {
    turn: tokio::sync::Mutex<()>,
    ledger: Mutex<Ledger>,
}

impl WeightBudget {
    fn lock(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.ledger
            .lock()
            .expect("weight ledger should not be poisoned")
    }
}

struct OrderLimiter {
    limiter: DirectRateLimiter,
    clock: DefaultClock,
}

/// Admission controller owned by one gateway instance.
pub struct Throttler {
    exchange: ExchangeId,
    budgets: HashMap<RateCategory, WeightBudget>,
    orders: Option<OrderLimiter>,
    admission_timeout: Duration,
    cooldown: BackoffPolicy,
}

impl Throttler {
    pub fn from_policy(policy: &ExchangePolicy) -> Result<Self, GatewayError> {
        let budgets = policy
            .budgets
            .iter()
            .map(|quota| {
                (
                    quota.category,
                    WeightBudget {
                        turn: tokio::sync::Mutex::new(()),
                        ledger: Mutex::new(Ledger::new(quota.capacity, quota.window)),
                    },
                )
            })
            .collect();

        let orders = policy
            .order_quota
            .as_ref()
            .map(|quota| {
                Ok::<_, GatewayError>(OrderLimiter {
                    limiter: RateLimiter::direct(quota_from_window(quota)?),
                    clock: DefaultClock::default(),
                })
            })
            .transpose()?;

        Ok(Self {
            exchange: policy.exchange,
            budgets,
            orders,
            admission_timeout: policy.admission_timeout,
            cooldown: policy.cooldown.clone(),
        })
    }

    pub const fn exchange(&self) -> ExchangeId {
        self.exchange
    }

    fn budget(&self, category: RateCategory) -> Result<&WeightBudget, GatewayError> {
        self.budgets.get(&category).ok_or_else(|| {
            GatewayError::configuration(format!(
                "{} throttler has no budget for category {category}",
                self.exchange
            ))
        })
    }

    /// Waits until `cost` fits into `category`'s window, then records it.
    ///
    /// Fails with `RateLimitExceeded` when the cost can never fit or the
    /// earliest admission lies beyond the admission timeout.
    pub async fn acquire(
        &self,
        category: RateCategory,
        cost: u32,
    ) -> Result<WeightPermit, GatewayError> {
        let budget = self.budget(category)?;
        let capacity = budget.lock().capacity;
        if cost > capacity {
            return Err(GatewayError::RateLimitExceeded(format!(
                "cost {cost} exceeds {category} capacity {capacity} on {}",
                self.exchange
            )));
        }

        let deadline = Instant::now() + self.admission_timeout;
        let _turn = tokio::time::timeout_at(deadline, budget.turn.lock())
            .await
            .map_err(|_| self.admission_timed_out(category, cost))?;

        loop {
            let now = Instant::now();
            let admission = budget.lock().try_admit(now, cost);
            match admission {
                Admission::Granted(at) => {
                    return Ok(WeightPermit { category, cost, at });
                }
                Admission::WaitUntil(until) if until > deadline => {
                    return Err(self.admission_timed_out(category, cost));
                }
                Admission::WaitUntil(until) => {
                    debug!(
                        exchange = %self.exchange,
                        category = %category,
                        cost,
                        wait_ms = until.saturating_duration_since(now).as_millis() as u64,
                        "waiting for weight budget"
                    );
                    tokio::time::sleep_until(until).await;
                }
            }
        }
    }

    /// Returns the weight of a call that was admitted but never sent.
    pub fn refund(&self, permit: WeightPermit) {
        if let Some(budget) = self.budgets.get(&permit.category) {
            budget.lock().refund(permit.at, permit.cost);
            debug!(
                exchange = %self.exchange,
                category = %permit.category,
                cost = permit.cost,
                "refunded unused weight"
            );
        }
    }

    /// Takes one slot of the order-count limit, if the exchange has one.
    pub async fn acquire_order_slot(&self) -> Result<(), GatewayError> {
        let Some(orders) = &self.orders else {
            return Ok(());
        };

        match orders.limiter.check() {
            Ok(()) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(orders.clock.now());
                if wait > self.admission_timeout {
                    return Err(GatewayError::RateLimitExceeded(format!(
                        "order-count limit on {} frees up in {}ms",
                        self.exchange,
                        wait.as_millis()
                    )));
                }
                debug!(exchange = %self.exchange, wait_ms = wait.as_millis() as u64, "waiting for order slot");
                orders.limiter.until_ready().await;
                Ok(())
            }
        }
    }

    /// Halts `category` after the exchange rejected a call as rate limited.
    ///
    /// Uses the server's `Retry-After` when given, otherwise an escalating
    /// cool-down from the policy. Returns the applied cool-down.
    pub fn report_rate_limited(
        &self,
        category: RateCategory,
        retry_after: Option<Duration>,
    ) -> Duration {
        let Ok(budget) = self.budget(category) else {
            return Duration::ZERO;
        };

        let mut ledger = budget.lock();
        let attempt = ledger.consecutive_rejections;
        ledger.consecutive_rejections = attempt.saturating_add(1);
        let cooldown = retry_after.unwrap_or_else(|| self.cooldown.capped_delay(attempt));

        let until = Instant::now() + cooldown;
        ledger.halted_until = Some(ledger.halted_until.map_or(until, |current| current.max(until)));

        warn!(
            exchange = %self.exchange,
            category = %category,
            cooldown_ms = cooldown.as_millis() as u64,
            consecutive = ledger.consecutive_rejections,
            "exchange rejected call as rate limited, halting category"
        );
        cooldown
    }

    /// Resets cool-down escalation after the exchange accepted a call.
    pub fn report_accepted(&self, category: RateCategory) {
        if let Ok(budget) = self.budget(category) {
            budget.lock().consecutive_rejections = 0;
        }
    }

    pub fn snapshot(&self, category: RateCategory) -> Option<BudgetSnapshot> {
        let budget = self.budgets.get(&category)?;
        let now = Instant::now();
        let mut ledger = budget.lock();
        ledger.prune(now);
        Some(BudgetSnapshot {
            category,
            capacity: ledger.capacity,
            consumed: ledger.consumed,
            window: ledger.window,
            halted_for: ledger
                .halted_until
                .map(|until| until.saturating_duration_since(now)),
        })
    }

    fn admission_timed_out(&self, category: RateCategory, cost: u32) -> GatewayError {
        GatewayError::RateLimitExceeded(format!(
            "{category} budget on {} cannot admit cost {cost} within {}ms",
            self.exchange,
            self.admission_timeout.as_millis()
        ))
    }
}

fn quota_from_window(quota: &OrderQuota) -> Result<Quota, GatewayError> {
    let burst = NonZeroU32::new(quota.limit).ok_or_else(|| {
        GatewayError::configuration("order quota limit must be greater than zero")
    })?;

    let seconds_per_cell = (quota.window.as_secs_f64() / f64::from(quota.limit)).max(0.001);
    Quota::with_period(Duration::from_secs_f64(seconds_per_cell))
        .map(|quota| quota.allow_burst(burst))
        .ok_or_else(|| GatewayError::configuration("order quota window must be greater than zero"))
}
