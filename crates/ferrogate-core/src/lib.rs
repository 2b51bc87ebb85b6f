//! # Ferrogate Core
//!
//! Uniform trading gateway over crypto exchange REST APIs, with per-exchange
//! weight-budget admission control.
//!
//! ## Overview
//!
//! - **Domain envelope**: symbols, market addresses, orders, tickers,
//!   order books and candles shared by every exchange
//! - **Gateway contract**: one fixed operation set with capability checks
//! - **Adapters**: stateless request converters and response parsers for
//!   Binance and Upbit
//! - **Worker**: one round trip per call with exchange-reported timing
//! - **Throttler**: rolling weight budgets per rate category, fail-fast on
//!   admission timeout and cool-down after server rejections
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Binance and Upbit converters, parsers and weight tables |
//! | [`auth`] | Credentials and the external request signer boundary |
//! | [`domain`] | Symbols, addresses, timeframes and market entities |
//! | [`envelope`] | Request correlation and response metadata |
//! | [`error`] | Error taxonomy and canonical error codes |
//! | [`exchange_gateway`] | Gateway implementation generic over an adapter |
//! | [`gateway`] | Operation set, capabilities and the [`Gateway`] trait |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`policy`] | Per-exchange limits and timeouts |
//! | [`requests`] | One request type per operation |
//! | [`retry`] | Caller-side retry with backoff |
//! | [`source`] | Exchange identifiers and wire symbols |
//! | [`throttling`] | Admission control |
//! | [`weights`] | Endpoint weight tables and rate categories |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ferrogate_core::{BaseRequest, Credentials, Gateway, Symbol, TickerRequest, UpbitGateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Credentials::new()
//!         .with("Access key", std::env::var("UPBIT_ACCESS_KEY")?)
//!         .with("Secret key", std::env::var("UPBIT_SECRET_KEY")?);
//!     let gateway = UpbitGateway::new(credentials)?;
//!
//!     let request = TickerRequest::single(
//!         BaseRequest::generate("upbit-main"),
//!         Symbol::parse("BTC/KRW")?,
//!     );
//!     let response = gateway.ticker(request).await?;
//!     if let Some(ticker) = response.data().and_then(|tickers| tickers.first()) {
//!         println!("BTC/KRW {}", ticker.current);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Operations only return `Err` for contract violations (an operation the
//! exchange cannot perform, an endpoint missing from the weight table).
//! Everything else is a failed [`Response`] with an [`ErrorCode`] and
//! category flags:
//!
//! ```rust
//! use ferrogate_core::{ErrorCode, Response};
//!
//! fn handle<T>(response: &Response<T>) {
//!     match response.error_code() {
//!         Some(ErrorCode::RateLimitExceeded) => {
//!             // Back off and retry
//!         }
//!         Some(ErrorCode::OrderNotFound) => {
//!             // Reconcile local order state
//!         }
//!         _ => {}
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - Secrets live in [`Credentials`], whose `Debug` output is redacted
//! - Signing is delegated to a caller-supplied [`RequestSigner`]

pub mod adapters;
pub mod auth;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod exchange_gateway;
pub mod gateway;
pub mod http_client;
pub mod policy;
pub mod requests;
pub mod retry;
pub mod source;
pub mod throttling;
pub mod weights;
mod worker;

pub use adapters::{
    BinanceAdapter, BinanceConverter, BinanceParser, ExchangeAdapter, UpbitAdapter,
    UpbitConverter, UpbitParser,
};
pub use auth::{Credentials, MissingSigner, RequestSigner, Signature, SigningPayload};
pub use domain::{
    Archetype, Candle, EpochMillis, MarketInfo, ModifyOrderResult, OrderBook, OrderSide,
    OrderStatus, OrderType, Pair, PriceLevel, ServerTime, SpotOrder, SpotTrade, StockAddress,
    Symbol, Ticker, TimeInForce, Timeframe, Token, TradeType,
};
pub use envelope::{BaseRequest, BaseResponse, Response, ResponseTiming};
pub use error::{ErrorCode, GatewayError, ValidationError};
pub use exchange_gateway::{BinanceGateway, ExchangeGateway, UpbitGateway};
pub use gateway::{CapabilitySet, Gateway, GatewayFuture, Operation};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
};
pub use policy::{BackoffPolicy, BudgetQuota, ExchangePolicy, OrderQuota};
pub use requests::{
    BalanceRequest, CancelOrderRequest, CandlesRequest, GatewayRequest, LimitOrderRequest,
    MarketOrderRequest, MarketsRequest, ModifyOrderRequest, OpenOrdersRequest, OrderAmount,
    OrderBookRequest, OrderStatusRequest, ServerTimeRequest, TickerRequest, TradeHistoryRequest,
};
pub use retry::{Backoff, RetryConfig};
pub use source::ExchangeId;
pub use throttling::{BudgetSnapshot, Throttler, WeightPermit};
pub use weights::{EndpointCost, EndpointSpec, RateCategory, WeightTable, WireParams};
