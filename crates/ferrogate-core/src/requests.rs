//! Uniform request payloads, one per gateway operation.
//!
//! Constructors validate what can be checked without knowing the exchange
//! (positive prices and amounts, non-zero limits). Exchange-specific rules
//! such as Upbit's quote-denominated market buys are enforced by the
//! adapter's converter.

use serde::{Deserialize, Serialize};

use crate::domain::validate_positive;
use crate::{BaseRequest, OrderSide, StockAddress, Symbol, TimeInForce, ValidationError};

/// Access to the correlation data every request carries.
pub trait GatewayRequest {
    fn base(&self) -> &BaseRequest;
}

macro_rules! impl_gateway_request {
    ($($request:ty),+ $(,)?) => {
        $(
            impl GatewayRequest for $request {
                fn base(&self) -> &BaseRequest {
                    &self.base
                }
            }
        )+
    };
}

impl_gateway_request!(
    LimitOrderRequest,
    MarketOrderRequest,
    CancelOrderRequest,
    ModifyOrderRequest,
    OrderStatusRequest,
    OpenOrdersRequest,
    BalanceRequest,
    TradeHistoryRequest,
    TickerRequest,
    OrderBookRequest,
    CandlesRequest,
    MarketsRequest,
    ServerTimeRequest,
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitOrderRequest {
    pub base: BaseRequest,
    pub symbol: Symbol,
    pub price: f64,
    pub amount: f64,
    pub time_in_force: TimeInForce,
    pub client_order_id: Option<String>,
}

impl LimitOrderRequest {
    pub fn new(
        base: BaseRequest,
        symbol: Symbol,
        price: f64,
        amount: f64,
    ) -> Result<Self, ValidationError> {
        validate_positive("price", price)?;
        validate_positive("amount", amount)?;
        Ok(Self {
            base,
            symbol,
            price,
            amount,
            time_in_force: TimeInForce::Gtc,
            client_order_id: None,
        })
    }

    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }

    pub fn with_client_order_id(mut self, client_order_id: impl Into<String>) -> Self {
        self.client_order_id = Some(client_order_id.into());
        self
    }
}

/// Size of a market order, either in base units or as a quote total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "unit", content = "value")]
pub enum OrderAmount {
    Base(f64),
    Quote(f64),
}

impl OrderAmount {
    pub const fn value(self) -> f64 {
        match self {
            Self::Base(value) | Self::Quote(value) => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOrderRequest {
    pub base: BaseRequest,
    pub symbol: Symbol,
    pub amount: OrderAmount,
    pub client_order_id: Option<String>,
}

impl MarketOrderRequest {
    pub fn new(
        base: BaseRequest,
        symbol: Symbol,
        amount: OrderAmount,
    ) -> Result<Self, ValidationError> {
        validate_positive("amount", amount.value())?;
        Ok(Self {
            base,
            symbol,
            amount,
            client_order_id: None,
        })
    }

    pub fn with_client_order_id(mut self, client_order_id: impl Into<String>) -> Self {
        self.client_order_id = Some(client_order_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    pub base: BaseRequest,
    pub symbol: Symbol,
    pub order_id: String,
}

impl CancelOrderRequest {
    pub fn new(base: BaseRequest, symbol: Symbol, order_id: impl Into<String>) -> Self {
        Self {
            base,
            symbol,
            order_id: order_id.into(),
        }
    }
}

/// Cancel `order_id`, then place a fresh limit order with the new terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifyOrderRequest {
    pub base: BaseRequest,
    pub symbol: Symbol,
    pub order_id: String,
    pub side: OrderSide,
    pub price: f64,
    pub amount: f64,
    pub time_in_force: TimeInForce,
}

impl ModifyOrderRequest {
    pub fn new(
        base: BaseRequest,
        symbol: Symbol,
        order_id: impl Into<String>,
        side: OrderSide,
        price: f64,
        amount: f64,
    ) -> Result<Self, ValidationError> {
        validate_positive("price", price)?;
        validate_positive("amount", amount)?;
        Ok(Self {
            base,
            symbol,
            order_id: order_id.into(),
            side,
            price,
            amount,
            time_in_force: TimeInForce::Gtc,
        })
    }

    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }

    pub(crate) fn cancel_step(&self) -> CancelOrderRequest {
        CancelOrderRequest::new(self.base.clone(), self.symbol.clone(), self.order_id.clone())
    }

    pub(crate) fn create_step(&self) -> LimitOrderRequest {
        LimitOrderRequest {
            base: self.base.clone(),
            symbol: self.symbol.clone(),
            price: self.price,
            amount: self.amount,
            time_in_force: self.time_in_force,
            client_order_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusRequest {
    pub base: BaseRequest,
    pub symbol: Symbol,
    pub order_id: String,
}

impl OrderStatusRequest {
    pub fn new(base: BaseRequest, symbol: Symbol, order_id: impl Into<String>) -> Self {
        Self {
            base,
            symbol,
            order_id: order_id.into(),
        }
    }
}

/// Open orders for one market, or for every market when `symbol` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrdersRequest {
    pub base: BaseRequest,
    pub symbol: Option<Symbol>,
}

impl OpenOrdersRequest {
    pub fn new(base: BaseRequest, symbol: Option<Symbol>) -> Self {
        Self { base, symbol }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRequest {
    pub base: BaseRequest,
}

impl BalanceRequest {
    pub fn new(base: BaseRequest) -> Self {
        Self { base }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeHistoryRequest {
    pub base: BaseRequest,
    pub symbol: Symbol,
    pub limit: Option<u32>,
}

impl TradeHistoryRequest {
    pub fn new(base: BaseRequest, symbol: Symbol) -> Self {
        Self {
            base,
            symbol,
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Tickers for the listed symbols; an empty list means every market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerRequest {
    pub base: BaseRequest,
    pub symbols: Vec<Symbol>,
}

impl TickerRequest {
    pub fn new(base: BaseRequest, symbols: Vec<Symbol>) -> Self {
        Self { base, symbols }
    }

    pub fn single(base: BaseRequest, symbol: Symbol) -> Self {
        Self::new(base, vec![symbol])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookRequest {
    pub base: BaseRequest,
    pub symbol: Symbol,
    pub depth: Option<u32>,
}

impl OrderBookRequest {
    pub fn new(base: BaseRequest, symbol: Symbol) -> Self {
        Self {
            base,
            symbol,
            depth: None,
        }
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }
}

/// Most recent `limit` candles of the addressed market and timeframe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandlesRequest {
    pub base: BaseRequest,
    pub address: StockAddress,
    pub limit: u32,
}

impl CandlesRequest {
    pub fn new(
        base: BaseRequest,
        address: StockAddress,
        limit: u32,
    ) -> Result<Self, ValidationError> {
        if limit == 0 {
            return Err(ValidationError::NonPositiveValue { field: "limit" });
        }
        Ok(Self {
            base,
            address,
            limit,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketsRequest {
    pub base: BaseRequest,
    pub symbol: Option<Symbol>,
}

impl MarketsRequest {
    pub fn new(base: BaseRequest, symbol: Option<Symbol>) -> Self {
        Self { base, symbol }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTimeRequest {
    pub base: BaseRequest,
}

impl ServerTimeRequest {
    pub fn new(base: BaseRequest) -> Self {
        Self { base }
    }
}
