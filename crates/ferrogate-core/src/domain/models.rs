use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{EpochMillis, Symbol, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Limit,
    Market,
}

/// Time-in-force policy for limit orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    #[default]
    Gtc,
    Ioc,
    Fok,
    /// Rejected instead of taking liquidity.
    PostOnly,
}

/// Canonical order lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    PartiallyFilled,
    Filled,
    Cancelled,
}

impl OrderStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::PartiallyFilled => "PARTIALLY_FILLED",
            Self::Filled => "FILLED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::PartiallyFilled)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exchange-agnostic spot order state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotOrder {
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    pub symbol: Symbol,
    /// `None` when the exchange acknowledgement omits it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<OrderSide>,
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub amount: f64,
    pub filled_amount: f64,
    pub remaining_amount: f64,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<EpochMillis>,
}

/// One fill against an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotTrade {
    pub trade_id: String,
    pub order_id: String,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub price: f64,
    pub amount: f64,
    pub fee: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_asset: Option<String>,
    pub is_maker: bool,
    pub timestamp: EpochMillis,
}

/// A market listed on an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair {
    pub symbol: Symbol,
    pub wire_symbol: String,
}

/// Holdings of one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub asset: String,
    pub free: f64,
    pub locked: f64,
}

impl Token {
    pub fn total(&self) -> f64 {
        self.free + self.locked
    }
}

/// Trading rules of one market.
///
/// Rule fields stay `None` when the exchange does not publish that rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInfo {
    pub pair: Pair,
    pub is_trading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_trade_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_notional: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_tick: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_tick: Option<f64>,
}

/// 24h rolling ticker snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: Symbol,
    pub current: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<EpochMillis>,
}

impl Ticker {
    /// Relative change from open, `None` when the open is zero.
    pub fn change_ratio(&self) -> Option<f64> {
        (self.open != 0.0).then(|| (self.current - self.open) / self.open)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub amount: f64,
}

impl PriceLevel {
    pub fn new(price: f64, amount: f64) -> Result<Self, ValidationError> {
        validate_positive("price", price)?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(ValidationError::NonPositiveValue { field: "amount" });
        }
        Ok(Self { price, amount })
    }
}

/// Order book with bids best-first (descending) and asks best-first (ascending).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub symbol: Symbol,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<EpochMillis>,
}

impl OrderBook {
    pub fn new(
        symbol: Symbol,
        mut bids: Vec<PriceLevel>,
        mut asks: Vec<PriceLevel>,
        timestamp: Option<EpochMillis>,
    ) -> Self {
        bids.sort_by(|a, b| b.price.total_cmp(&a.price));
        asks.sort_by(|a, b| a.price.total_cmp(&b.price));
        Self {
            symbol,
            bids,
            asks,
            timestamp,
        }
    }

    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.first().copied()
    }

    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.first().copied()
    }
}

/// OHLCV candle keyed by its open time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: EpochMillis,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTime {
    pub server_time: EpochMillis,
}

/// Outcome of the cancel-then-create composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifyOrderResult {
    pub cancelled: SpotOrder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<SpotOrder>,
}

pub(crate) fn validate_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::NonPositiveValue { field });
    }
    Ok(())
}
