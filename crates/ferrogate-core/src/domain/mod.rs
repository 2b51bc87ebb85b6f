//! # Domain Envelope
//!
//! Immutable value types shared by every gateway operation.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Normalized `BASE/QUOTE` pair with slash/dash/compact projections |
//! | [`StockAddress`] | Archetype, exchange, trade type, pair and timeframe of a market |
//! | [`Timeframe`] | Candle bucket width (1m .. 1w) |
//! | [`SpotOrder`] / [`SpotTrade`] | Exchange-agnostic order and fill state |
//! | [`Ticker`] / [`OrderBook`] / [`Candle`] | Market data snapshots |
//! | [`MarketInfo`] | Trading rules; unpublished rules are `None` |
//!
//! Nothing here performs I/O. Timestamps are epoch milliseconds
//! ([`EpochMillis`]); see [`timestamp`] for exchange-format parsing.

mod address;
mod models;
mod symbol;
mod timeframe;
pub mod timestamp;

pub use address::{Archetype, StockAddress, TradeType};
pub(crate) use models::validate_positive;
pub use models::{
    Candle, MarketInfo, ModifyOrderResult, OrderBook, OrderSide, OrderStatus, OrderType, Pair,
    PriceLevel, ServerTime, SpotOrder, SpotTrade, Ticker, TimeInForce, Token,
};
pub use symbol::Symbol;
pub use timeframe::Timeframe;
pub use timestamp::EpochMillis;
