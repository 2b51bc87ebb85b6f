//! Exchange adapters.
//!
//! An adapter is a pair of stateless translators. The [`Converter`] turns a
//! uniform request into a [`WireCall`]; the [`Parser`] turns the raw HTTP
//! response back into domain values and classifies exchange error payloads
//! into canonical error codes. Neither performs I/O.

pub mod binance;
pub mod upbit;
mod wire;

pub use binance::{BinanceAdapter, BinanceConverter, BinanceParser};
pub use upbit::{UpbitAdapter, UpbitConverter, UpbitParser};

use crate::gateway::CapabilitySet;
use crate::http_client::{HttpMethod, HttpResponse};
use crate::requests::{
    BalanceRequest, CancelOrderRequest, CandlesRequest, LimitOrderRequest, MarketOrderRequest,
    MarketsRequest, OpenOrdersRequest, OrderBookRequest, OrderStatusRequest, ServerTimeRequest,
    TickerRequest, TradeHistoryRequest,
};
use crate::weights::{WeightTable, WireParams};
use crate::{
    Candle, EpochMillis, ExchangeId, GatewayError, MarketInfo, OrderBook, OrderSide, ServerTime,
    SpotOrder, SpotTrade, Symbol, Ticker, Token,
};

/// Where the parameters of a non-GET call travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyStyle {
    /// Everything in the query string.
    Query,
    /// A JSON object of the parameters as the request body.
    Json,
}

/// One exchange REST call, before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireCall {
    pub method: HttpMethod,
    pub path: String,
    pub params: WireParams,
    pub body_style: BodyStyle,
}

impl WireCall {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: WireParams::new(),
            body_style: BodyStyle::Query,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn with_params(mut self, params: WireParams) -> Self {
        self.params = params;
        self
    }

    pub fn json_body(mut self) -> Self {
        self.body_style = BodyStyle::Json;
        self
    }

    /// Whether the parameters belong in a JSON body rather than the URL.
    pub fn has_json_body(&self) -> bool {
        self.body_style == BodyStyle::Json && self.method != HttpMethod::Get
    }

    /// Parameters as a flat JSON object of strings.
    pub fn json_params(&self) -> String {
        let object = self
            .params
            .iter()
            .map(|(key, value)| (key.to_owned(), serde_json::Value::from(value)))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(object).to_string()
    }
}

/// Decoded payload plus the exchange's own timestamp for the call, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub server_time: Option<EpochMillis>,
}

impl<T> Parsed<T> {
    pub fn new(value: T, server_time: Option<EpochMillis>) -> Self {
        Self { value, server_time }
    }

    pub fn untimed(value: T) -> Self {
        Self::new(value, None)
    }
}

/// Uniform request to wire call translation.
pub trait Converter: Send + Sync {
    fn limit_order(
        &self,
        side: OrderSide,
        req: &LimitOrderRequest,
    ) -> Result<WireCall, GatewayError>;

    fn market_order(
        &self,
        side: OrderSide,
        req: &MarketOrderRequest,
    ) -> Result<WireCall, GatewayError>;

    fn cancel(&self, req: &CancelOrderRequest) -> Result<WireCall, GatewayError>;

    fn order_status(&self, req: &OrderStatusRequest) -> Result<WireCall, GatewayError>;

    fn open_orders(&self, req: &OpenOrdersRequest) -> Result<WireCall, GatewayError>;

    fn balance(&self, req: &BalanceRequest) -> Result<WireCall, GatewayError>;

    fn trade_history(&self, req: &TradeHistoryRequest) -> Result<WireCall, GatewayError>;

    fn ticker(&self, req: &TickerRequest) -> Result<WireCall, GatewayError>;

    fn orderbook(&self, req: &OrderBookRequest) -> Result<WireCall, GatewayError>;

    fn candles(&self, req: &CandlesRequest) -> Result<WireCall, GatewayError>;

    fn markets(&self, req: &MarketsRequest) -> Result<WireCall, GatewayError>;

    fn server_time(&self, req: &ServerTimeRequest) -> Result<WireCall, GatewayError>;

    /// Adds exchange-mandated parameters to a signed call before signing.
    fn prepare_signed(&self, _params: &mut WireParams, _timestamp: EpochMillis) {}
}

/// Raw response to domain translation and error classification.
///
/// Parsers are total over well-formed payloads: calls about one market take
/// the symbol from the request, and list entries on markets that cannot be
/// resolved are skipped rather than failing the whole response.
pub trait Parser: Send + Sync {
    /// Parses the acknowledgement of an order just placed on `symbol`.
    fn placed_order(
        &self,
        symbol: &Symbol,
        response: &HttpResponse,
    ) -> Result<Parsed<SpotOrder>, GatewayError>;

    /// Parses a cancel acknowledgement; fields the exchange omits fall back
    /// to the originating request.
    fn cancelled_order(
        &self,
        req: &CancelOrderRequest,
        response: &HttpResponse,
    ) -> Result<Parsed<SpotOrder>, GatewayError>;

    /// Parses a lookup of an existing order on `symbol`.
    fn order(&self, symbol: &Symbol, response: &HttpResponse)
        -> Result<Parsed<SpotOrder>, GatewayError>;

    /// `symbol` is the market the request was scoped to, if any.
    fn orders(
        &self,
        symbol: Option<&Symbol>,
        response: &HttpResponse,
    ) -> Result<Parsed<Vec<SpotOrder>>, GatewayError>;

    fn balance(&self, response: &HttpResponse) -> Result<Parsed<Vec<Token>>, GatewayError>;

    fn trades(
        &self,
        symbol: &Symbol,
        response: &HttpResponse,
    ) -> Result<Parsed<Vec<SpotTrade>>, GatewayError>;

    /// `requested` is empty when every market was asked for.
    fn tickers(
        &self,
        requested: &[Symbol],
        response: &HttpResponse,
    ) -> Result<Parsed<Vec<Ticker>>, GatewayError>;

    fn orderbook(
        &self,
        symbol: &Symbol,
        response: &HttpResponse,
    ) -> Result<Parsed<OrderBook>, GatewayError>;

    fn candles(&self, response: &HttpResponse) -> Result<Parsed<Vec<Candle>>, GatewayError>;

    fn markets(&self, response: &HttpResponse) -> Result<Parsed<Vec<MarketInfo>>, GatewayError>;

    fn server_time(&self, response: &HttpResponse) -> Result<Parsed<ServerTime>, GatewayError>;

    /// Classifies a non-2xx response into a canonical error.
    fn error(&self, response: &HttpResponse) -> GatewayError;
}

/// Static description of one exchange plus its converter/parser pair.
pub trait ExchangeAdapter: Send + Sync + 'static {
    type Converter: Converter;
    type Parser: Parser;

    const EXCHANGE: ExchangeId;

    /// Credential names construction must find non-blank.
    const REQUIRED_CREDENTIALS: &'static [&'static str];

    fn capabilities() -> CapabilitySet;

    fn weight_table() -> WeightTable;

    fn converter(&self) -> &Self::Converter;

    fn parser(&self) -> &Self::Parser;
}

/// Parses a JSON body, mapping decode failures to a system error.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    exchange: ExchangeId,
    response: &HttpResponse,
) -> Result<T, GatewayError> {
    serde_json::from_str(&response.body).map_err(|e| {
        GatewayError::system(format!("failed to parse {exchange} response: {e}"))
    })
}

/// Maps a wire market back to a symbol, preferring the ones the caller named.
pub(crate) fn resolve_symbol(
    exchange: ExchangeId,
    wire: &str,
    requested: &[Symbol],
) -> Option<Symbol> {
    requested
        .iter()
        .find(|symbol| exchange.wire_symbol(symbol).eq_ignore_ascii_case(wire.trim()))
        .cloned()
        .or_else(|| exchange.parse_wire_symbol(wire).ok())
}

/// Shortens an unparseable error body for inclusion in a message.
pub(crate) fn body_excerpt(body: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(LIMIT) {
        Some((index, _)) => format!("{}...", &trimmed[..index]),
        None => trimmed.to_owned(),
    }
}
