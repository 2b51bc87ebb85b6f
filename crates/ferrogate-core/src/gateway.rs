//! Gateway capability contract.
//!
//! Every exchange gateway exposes the same fixed operation set through
//! [`Gateway`]. An operation the exchange cannot structurally perform is
//! rejected before any work with [`GatewayError::UnsupportedOperation`].
//!
//! | Operation | Request | Payload |
//! |-----------|---------|---------|
//! | limit buy / sell | [`LimitOrderRequest`] | [`SpotOrder`] |
//! | market buy / sell | [`MarketOrderRequest`] | [`SpotOrder`] |
//! | cancel | [`CancelOrderRequest`] | [`SpotOrder`] |
//! | modify-or-replace | [`ModifyOrderRequest`] | [`ModifyOrderResult`] |
//! | order status | [`OrderStatusRequest`] | [`SpotOrder`] |
//! | open orders | [`OpenOrdersRequest`] | `Vec<SpotOrder>` |
//! | balance | [`BalanceRequest`] | `Vec<Token>` |
//! | trade history | [`TradeHistoryRequest`] | `Vec<SpotTrade>` |
//! | ticker | [`TickerRequest`] | `Vec<Ticker>` |
//! | orderbook | [`OrderBookRequest`] | [`OrderBook`] |
//! | candles | [`CandlesRequest`] | `Vec<Candle>` |
//! | available markets | [`MarketsRequest`] | `Vec<MarketInfo>` |
//! | server time | [`ServerTimeRequest`] | [`ServerTime`] |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::requests::{
    BalanceRequest, CancelOrderRequest, CandlesRequest, LimitOrderRequest, MarketOrderRequest,
    MarketsRequest, ModifyOrderRequest, OpenOrdersRequest, OrderBookRequest, OrderStatusRequest,
    ServerTimeRequest, TickerRequest, TradeHistoryRequest,
};
use crate::{
    Candle, ExchangeId, GatewayError, MarketInfo, ModifyOrderResult, OrderBook, Response,
    ServerTime, SpotOrder, SpotTrade, Ticker, Token,
};

/// One gateway operation, used for capability checks, logging and metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    LimitBuy,
    LimitSell,
    MarketBuy,
    MarketSell,
    Cancel,
    ModifyOrReplace,
    OrderStatus,
    OpenOrders,
    Balance,
    TradeHistory,
    Ticker,
    OrderBook,
    Candles,
    AvailableMarkets,
    ServerTime,
}

impl Operation {
    pub const ALL: [Self; 15] = [
        Self::LimitBuy,
        Self::LimitSell,
        Self::MarketBuy,
        Self::MarketSell,
        Self::Cancel,
        Self::ModifyOrReplace,
        Self::OrderStatus,
        Self::OpenOrders,
        Self::Balance,
        Self::TradeHistory,
        Self::Ticker,
        Self::OrderBook,
        Self::Candles,
        Self::AvailableMarkets,
        Self::ServerTime,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LimitBuy => "limit_buy",
            Self::LimitSell => "limit_sell",
            Self::MarketBuy => "market_buy",
            Self::MarketSell => "market_sell",
            Self::Cancel => "cancel",
            Self::ModifyOrReplace => "modify_or_replace",
            Self::OrderStatus => "order_status",
            Self::OpenOrders => "open_orders",
            Self::Balance => "balance",
            Self::TradeHistory => "trade_history",
            Self::Ticker => "ticker",
            Self::OrderBook => "orderbook",
            Self::Candles => "candles",
            Self::AvailableMarkets => "available_markets",
            Self::ServerTime => "server_time",
        }
    }

    /// Reads are safe to re-issue after an ambiguous network failure.
    pub const fn is_read_only(self) -> bool {
        !matches!(
            self,
            Self::LimitBuy
                | Self::LimitSell
                | Self::MarketBuy
                | Self::MarketSell
                | Self::Cancel
                | Self::ModifyOrReplace
        )
    }

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations an exchange can structurally perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitySet {
    bits: u16,
}

impl CapabilitySet {
    pub const fn full() -> Self {
        let mut bits = 0;
        let mut index = 0;
        while index < Operation::ALL.len() {
            bits |= Operation::ALL[index].bit();
            index += 1;
        }
        Self { bits }
    }

    pub const fn without(self, operation: Operation) -> Self {
        Self {
            bits: self.bits & !operation.bit(),
        }
    }

    pub const fn supports(self, operation: Operation) -> bool {
        self.bits & operation.bit() != 0
    }

    pub fn supported_operations(self) -> Vec<Operation> {
        Operation::ALL
            .into_iter()
            .filter(|operation| self.supports(*operation))
            .collect()
    }

    pub fn ensure(self, operation: Operation, exchange: ExchangeId) -> Result<(), GatewayError> {
        if self.supports(operation) {
            Ok(())
        } else {
            Err(GatewayError::UnsupportedOperation {
                operation,
                exchange,
            })
        }
    }
}

/// Boxed future returned by every gateway operation.
///
/// The outer `Result` only carries contract violations; exchange and
/// transport failures arrive as a failed [`Response`].
pub type GatewayFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<Response<T>, GatewayError>> + Send + 'a>>;

/// Exchange gateway contract.
///
/// Implementations must be `Send + Sync`; many workers run concurrently
/// against one gateway instance.
pub trait Gateway: Send + Sync {
    fn exchange(&self) -> ExchangeId;

    fn capabilities(&self) -> CapabilitySet;

    fn limit_buy<'a>(&'a self, req: LimitOrderRequest) -> GatewayFuture<'a, SpotOrder>;

    fn limit_sell<'a>(&'a self, req: LimitOrderRequest) -> GatewayFuture<'a, SpotOrder>;

    fn market_buy<'a>(&'a self, req: MarketOrderRequest) -> GatewayFuture<'a, SpotOrder>;

    fn market_sell<'a>(&'a self, req: MarketOrderRequest) -> GatewayFuture<'a, SpotOrder>;

    fn cancel<'a>(&'a self, req: CancelOrderRequest) -> GatewayFuture<'a, SpotOrder>;

    /// Cancels the referenced order and, only if that succeeds, places the
    /// replacement.
    fn modify_or_replace<'a>(
        &'a self,
        req: ModifyOrderRequest,
    ) -> GatewayFuture<'a, ModifyOrderResult>;

    fn order_status<'a>(&'a self, req: OrderStatusRequest) -> GatewayFuture<'a, SpotOrder>;

    fn open_orders<'a>(&'a self, req: OpenOrdersRequest) -> GatewayFuture<'a, Vec<SpotOrder>>;

    fn balance<'a>(&'a self, req: BalanceRequest) -> GatewayFuture<'a, Vec<Token>>;

    fn trade_history<'a>(&'a self, req: TradeHistoryRequest)
        -> GatewayFuture<'a, Vec<SpotTrade>>;

    fn ticker<'a>(&'a self, req: TickerRequest) -> GatewayFuture<'a, Vec<Ticker>>;

    fn orderbook<'a>(&'a self, req: OrderBookRequest) -> GatewayFuture<'a, OrderBook>;

    fn candles<'a>(&'a self, req: CandlesRequest) -> GatewayFuture<'a, Vec<Candle>>;

    fn available_markets<'a>(&'a self, req: MarketsRequest)
        -> GatewayFuture<'a, Vec<MarketInfo>>;

    fn server_time<'a>(&'a self, req: ServerTimeRequest) -> GatewayFuture<'a, ServerTime>;
}
