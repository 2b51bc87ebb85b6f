use serde::Deserialize;
use tracing::warn;

use crate::adapters::wire::{f64_lenient, opt_f64_lenient};
use crate::adapters::{body_excerpt, decode, resolve_symbol, Parsed, Parser};
use crate::domain::timestamp::{parse_epoch_millis, parse_http_date};
use crate::http_client::HttpResponse;
use crate::requests::CancelOrderRequest;
use crate::{
    Candle, EpochMillis, ErrorCode, ExchangeId, GatewayError, MarketInfo, OrderBook, OrderSide,
    OrderStatus, OrderType, Pair, PriceLevel, ServerTime, SpotOrder, SpotTrade, Symbol, Ticker,
    Token,
};

const EXCHANGE: ExchangeId = ExchangeId::Upbit;

/// Response translation for the Upbit REST API.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpbitParser;

/// Maps an Upbit `state` onto the canonical lifecycle.
///
/// `wait` covers both untouched and partially executed resting orders, so
/// the executed volume decides between the two.
pub fn map_order_status(state: &str, executed_volume: f64) -> Result<OrderStatus, GatewayError> {
    match state {
        "wait" if executed_volume > 0.0 => Ok(OrderStatus::PartiallyFilled),
        "wait" | "watch" => Ok(OrderStatus::Pending),
        "done" => Ok(OrderStatus::Filled),
        "cancel" => Ok(OrderStatus::Cancelled),
        other => Err(GatewayError::system(format!(
            "unknown upbit order state '{other}'"
        ))),
    }
}

const AUTH_MARKERS: [&str; 5] = [
    "jwt_verification",
    "invalid_access_key",
    "expired_access_key",
    "nonce_used",
    "signature",
];
const PERMISSION_MARKERS: [&str; 3] = ["out_of_scope", "no_authorization_ip", "permission"];

/// Closed classifier over Upbit `{"error": {"name", "message"}}` payloads.
pub fn classify_error(status: u16, name: &str, message: &str) -> ErrorCode {
    let name = name.to_ascii_lowercase();
    let message = message.to_ascii_lowercase();
    let mentions = |marker: &str| name.contains(marker) || message.contains(marker);

    if status == 429 || mentions("too_many_requests") {
        ErrorCode::RateLimitExceeded
    } else if mentions("order_not_found") || mentions("not found") {
        ErrorCode::OrderNotFound
    } else if AUTH_MARKERS.iter().any(|marker| mentions(marker)) {
        ErrorCode::AuthenticationFailed
    } else if PERMISSION_MARKERS.iter().any(|marker| mentions(marker)) {
        ErrorCode::PermissionDenied
    } else if mentions("insufficient_funds") {
        ErrorCode::InsufficientFunds
    } else if mentions("validation") || mentions("invalid") {
        ErrorCode::InvalidRequest
    } else if status >= 500 {
        ErrorCode::System
    } else if (400..500).contains(&status) {
        ErrorCode::InvalidRequest
    } else {
        ErrorCode::System
    }
}

fn parse_time(raw: &str) -> Result<EpochMillis, GatewayError> {
    parse_epoch_millis(raw)
        .map_err(|e| GatewayError::system(format!("upbit payload timestamp: {e}")))
}

#[derive(Debug, Deserialize)]
struct UpbitOrder {
    uuid: String,
    #[serde(default)]
    side: Option<String>,
    #[serde(default)]
    ord_type: Option<String>,
    #[serde(default, deserialize_with = "opt_f64_lenient")]
    price: Option<f64>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    market: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default, deserialize_with = "opt_f64_lenient")]
    volume: Option<f64>,
    #[serde(default, deserialize_with = "opt_f64_lenient")]
    remaining_volume: Option<f64>,
    #[serde(default, deserialize_with = "opt_f64_lenient")]
    executed_volume: Option<f64>,
    #[serde(default)]
    identifier: Option<String>,
}

impl UpbitOrder {
    /// `status` overrides the payload state when the call itself fixes it.
    fn into_order(
        self,
        symbol: Symbol,
        status: Option<OrderStatus>,
    ) -> Result<SpotOrder, GatewayError> {
        let side = match self.side.as_deref() {
            Some("bid") => Some(OrderSide::Buy),
            Some("ask") => Some(OrderSide::Sell),
            Some(other) => {
                return Err(GatewayError::system(format!("unknown upbit side '{other}'")))
            }
            None => None,
        };

        let order_type = match self.ord_type.as_deref() {
            Some("price" | "market" | "best") => OrderType::Market,
            _ => OrderType::Limit,
        };

        let filled_amount = self.executed_volume.unwrap_or(0.0);
        let remaining_amount = self.remaining_volume.unwrap_or(0.0);

        let status = match status {
            Some(status) => status,
            None => {
                let state = self.state.as_deref().ok_or_else(|| {
                    GatewayError::system(format!("upbit order {} carries no state", self.uuid))
                })?;
                map_order_status(state, filled_amount)?
            }
        };

        let created_at = self.created_at.as_deref().map(parse_time).transpose()?;

        Ok(SpotOrder {
            order_id: self.uuid,
            client_order_id: self.identifier,
            symbol,
            side,
            order_type,
            price: match order_type {
                OrderType::Limit => self.price,
                OrderType::Market => None,
            },
            amount: self.volume.unwrap_or(filled_amount + remaining_amount),
            filled_amount,
            remaining_amount,
            status,
            created_at,
        })
    }
}

/// Create and cancel replies are minted as the exchange handles the call, so
/// `created_at` doubles as server time for them and for nothing else.
fn acknowledged(order: SpotOrder) -> Parsed<SpotOrder> {
    let server_time = order.created_at;
    Parsed::new(order, server_time)
}

#[derive(Debug, Deserialize)]
struct UpbitAccount {
    currency: String,
    #[serde(deserialize_with = "f64_lenient")]
    balance: f64,
    #[serde(deserialize_with = "f64_lenient")]
    locked: f64,
}

#[derive(Debug, Deserialize)]
struct UpbitTicker {
    market: String,
    #[serde(deserialize_with = "f64_lenient")]
    trade_price: f64,
    #[serde(deserialize_with = "f64_lenient")]
    opening_price: f64,
    #[serde(deserialize_with = "f64_lenient")]
    high_price: f64,
    #[serde(deserialize_with = "f64_lenient")]
    low_price: f64,
    #[serde(default, deserialize_with = "opt_f64_lenient")]
    acc_trade_volume_24h: Option<f64>,
    #[serde(default)]
    timestamp: Option<EpochMillis>,
}

#[derive(Debug, Deserialize)]
struct UpbitOrderbook {
    market: String,
    #[serde(default)]
    timestamp: Option<EpochMillis>,
    orderbook_units: Vec<UpbitOrderbookUnit>,
}

#[derive(Debug, Deserialize)]
struct UpbitOrderbookUnit {
    #[serde(deserialize_with = "f64_lenient")]
    ask_price: f64,
    #[serde(deserialize_with = "f64_lenient")]
    bid_price: f64,
    #[serde(deserialize_with = "f64_lenient")]
    ask_size: f64,
    #[serde(deserialize_with = "f64_lenient")]
    bid_size: f64,
}

#[derive(Debug, Deserialize)]
struct UpbitCandle {
    candle_date_time_utc: String,
    #[serde(deserialize_with = "f64_lenient")]
    opening_price: f64,
    #[serde(deserialize_with = "f64_lenient")]
    high_price: f64,
    #[serde(deserialize_with = "f64_lenient")]
    low_price: f64,
    #[serde(deserialize_with = "f64_lenient")]
    trade_price: f64,
    #[serde(deserialize_with = "f64_lenient")]
    candle_acc_trade_volume: f64,
}

#[derive(Debug, Deserialize)]
struct UpbitMarket {
    market: String,
    #[serde(default)]
    market_warning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpbitErrorEnvelope {
    error: UpbitErrorBody,
}

#[derive(Debug, Deserialize)]
struct UpbitErrorBody {
    #[serde(default)]
    name: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

fn date_header(response: &HttpResponse) -> Option<EpochMillis> {
    response
        .header("date")
        .and_then(|value| parse_http_date(value).ok())
}

impl Parser for UpbitParser {
    fn placed_order(
        &self,
        symbol: &Symbol,
        response: &HttpResponse,
    ) -> Result<Parsed<SpotOrder>, GatewayError> {
        let raw: UpbitOrder = decode(EXCHANGE, response)?;
        raw.into_order(symbol.clone(), None).map(acknowledged)
    }

    /// Upbit acknowledges a cancel with the order still in `wait`; the
    /// result is reported as cancelled regardless.
    fn cancelled_order(
        &self,
        req: &CancelOrderRequest,
        response: &HttpResponse,
    ) -> Result<Parsed<SpotOrder>, GatewayError> {
        let raw: UpbitOrder = decode(EXCHANGE, response)?;
        raw.into_order(req.symbol.clone(), Some(OrderStatus::Cancelled))
            .map(acknowledged)
    }

    /// A lookup may return an order created long ago; it carries no server time.
    fn order(
        &self,
        symbol: &Symbol,
        response: &HttpResponse,
    ) -> Result<Parsed<SpotOrder>, GatewayError> {
        let raw: UpbitOrder = decode(EXCHANGE, response)?;
        raw.into_order(symbol.clone(), None).map(Parsed::untimed)
    }

    fn orders(
        &self,
        symbol: Option<&Symbol>,
        response: &HttpResponse,
    ) -> Result<Parsed<Vec<SpotOrder>>, GatewayError> {
        let raw: Vec<UpbitOrder> = decode(EXCHANGE, response)?;
        let requested = symbol.map(std::slice::from_ref).unwrap_or_default();
        let mut orders = Vec::with_capacity(raw.len());
        for order in raw {
            let resolved = match order.market.as_deref() {
                Some(market) => resolve_symbol(EXCHANGE, market, requested),
                None => symbol.cloned(),
            };
            let Some(resolved) = resolved else {
                warn!(
                    exchange = %EXCHANGE,
                    market = ?order.market,
                    uuid = %order.uuid,
                    "skipping open order on unrecognized market"
                );
                continue;
            };
            orders.push(order.into_order(resolved, None)?);
        }
        Ok(Parsed::untimed(orders))
    }

    fn balance(&self, response: &HttpResponse) -> Result<Parsed<Vec<Token>>, GatewayError> {
        let raw: Vec<UpbitAccount> = decode(EXCHANGE, response)?;
        let tokens = raw
            .into_iter()
            .map(|account| Token {
                asset: account.currency,
                free: account.balance,
                locked: account.locked,
            })
            .collect();
        Ok(Parsed::new(tokens, date_header(response)))
    }

    fn trades(
        &self,
        _symbol: &Symbol,
        _response: &HttpResponse,
    ) -> Result<Parsed<Vec<SpotTrade>>, GatewayError> {
        Err(GatewayError::UnsupportedOperation {
            operation: crate::gateway::Operation::TradeHistory,
            exchange: EXCHANGE,
        })
    }

    fn tickers(
        &self,
        requested: &[Symbol],
        response: &HttpResponse,
    ) -> Result<Parsed<Vec<Ticker>>, GatewayError> {
        let raw: Vec<UpbitTicker> = decode(EXCHANGE, response)?;
        let server_time = raw.iter().filter_map(|ticker| ticker.timestamp).max();
        let tickers = raw
            .into_iter()
            .filter_map(|ticker| {
                let Some(symbol) = resolve_symbol(EXCHANGE, &ticker.market, requested) else {
                    warn!(
                        exchange = %EXCHANGE,
                        market = %ticker.market,
                        "skipping ticker on unrecognized market"
                    );
                    return None;
                };
                Some(Ticker {
                    symbol,
                    current: ticker.trade_price,
                    open: ticker.opening_price,
                    high: ticker.high_price,
                    low: ticker.low_price,
                    volume: ticker.acc_trade_volume_24h.unwrap_or(0.0),
                    timestamp: ticker.timestamp,
                })
            })
            .collect();
        Ok(Parsed::new(tickers, server_time))
    }

    fn orderbook(
        &self,
        symbol: &Symbol,
        response: &HttpResponse,
    ) -> Result<Parsed<OrderBook>, GatewayError> {
        let raw: Vec<UpbitOrderbook> = decode(EXCHANGE, response)?;
        let wanted = EXCHANGE.wire_symbol(symbol);
        let book = raw
            .into_iter()
            .find(|book| book.market == wanted)
            .ok_or_else(|| GatewayError::system(format!("upbit returned no orderbook for {wanted}")))?;

        let mut bids = Vec::with_capacity(book.orderbook_units.len());
        let mut asks = Vec::with_capacity(book.orderbook_units.len());
        for unit in &book.orderbook_units {
            bids.push(PriceLevel::new(unit.bid_price, unit.bid_size)?);
            asks.push(PriceLevel::new(unit.ask_price, unit.ask_size)?);
        }

        Ok(Parsed::new(
            OrderBook::new(symbol.clone(), bids, asks, book.timestamp),
            book.timestamp,
        ))
    }

    /// Upbit lists candles newest first; they are returned oldest first.
    fn candles(&self, response: &HttpResponse) -> Result<Parsed<Vec<Candle>>, GatewayError> {
        let raw: Vec<UpbitCandle> = decode(EXCHANGE, response)?;
        let mut candles = raw
            .into_iter()
            .map(|candle| {
                Ok(Candle {
                    open_time: parse_time(&candle.candle_date_time_utc)?,
                    open: candle.opening_price,
                    high: candle.high_price,
                    low: candle.low_price,
                    close: candle.trade_price,
                    volume: candle.candle_acc_trade_volume,
                })
            })
            .collect::<Result<Vec<_>, GatewayError>>()?;
        candles.sort_by_key(|candle| candle.open_time);
        Ok(Parsed::untimed(candles))
    }

    /// Upbit publishes no size or tick rules, so those fields stay `None`.
    fn markets(&self, response: &HttpResponse) -> Result<Parsed<Vec<MarketInfo>>, GatewayError> {
        let raw: Vec<UpbitMarket> = decode(EXCHANGE, response)?;
        let markets = raw
            .into_iter()
            .filter_map(|market| {
                let Ok(symbol) = EXCHANGE.parse_wire_symbol(&market.market) else {
                    warn!(
                        exchange = %EXCHANGE,
                        market = %market.market,
                        "skipping unparseable market"
                    );
                    return None;
                };
                Some(MarketInfo {
                    pair: Pair {
                        symbol,
                        wire_symbol: market.market,
                    },
                    is_trading: market.market_warning.as_deref() != Some("DELISTED"),
                    min_trade_amount: None,
                    min_notional: None,
                    price_tick: None,
                    amount_tick: None,
                })
            })
            .collect();
        Ok(Parsed::new(markets, date_header(response)))
    }

    fn server_time(&self, response: &HttpResponse) -> Result<Parsed<ServerTime>, GatewayError> {
        let server_time = date_header(response).ok_or_else(|| {
            GatewayError::system("upbit response carries no parseable Date header")
        })?;
        Ok(Parsed::new(ServerTime { server_time }, Some(server_time)))
    }

    fn error(&self, response: &HttpResponse) -> GatewayError {
        let (name, message) = match serde_json::from_str::<UpbitErrorEnvelope>(&response.body) {
            Ok(envelope) => (
                envelope
                    .error
                    .name
                    .map(|name| match name {
                        serde_json::Value::String(name) => name,
                        other => other.to_string(),
                    })
                    .unwrap_or_default(),
                envelope
                    .error
                    .message
                    .unwrap_or_else(|| body_excerpt(&response.body)),
            ),
            Err(_) => (String::new(), body_excerpt(&response.body)),
        };

        let detail = if name.is_empty() {
            format!("upbit {} {message}", response.status)
        } else {
            format!("upbit {} [{name}] {message}", response.status)
        };
        GatewayError::from_code(classify_error(response.status, &name, &message), detail)
    }
}
