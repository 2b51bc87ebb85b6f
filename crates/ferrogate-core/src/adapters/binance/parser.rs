use serde::Deserialize;
use tracing::warn;

use crate::adapters::wire::{f64_lenient, opt_f64_lenient};
use crate::adapters::{body_excerpt, decode, resolve_symbol, Parsed, Parser};
use crate::http_client::HttpResponse;
use crate::requests::CancelOrderRequest;
use crate::{
    Candle, EpochMillis, ErrorCode, ExchangeId, GatewayError, MarketInfo, OrderBook, OrderSide,
    OrderStatus, OrderType, Pair, PriceLevel, ServerTime, SpotOrder, SpotTrade, Symbol, Ticker,
    Token,
};

const EXCHANGE: ExchangeId = ExchangeId::Binance;

/// Response translation for Binance spot REST.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinanceParser;

/// Maps Binance order states onto the canonical lifecycle.
pub fn map_order_status(raw: &str) -> Result<OrderStatus, GatewayError> {
    match raw {
        "NEW" | "PENDING_NEW" => Ok(OrderStatus::Pending),
        "PARTIALLY_FILLED" => Ok(OrderStatus::PartiallyFilled),
        "FILLED" => Ok(OrderStatus::Filled),
        "CANCELED" | "PENDING_CANCEL" | "REJECTED" | "EXPIRED" | "EXPIRED_IN_MATCH" => {
            Ok(OrderStatus::Cancelled)
        }
        other => Err(GatewayError::system(format!(
            "unknown binance order status '{other}'"
        ))),
    }
}

/// Closed classifier over Binance `{code, msg}` error payloads.
pub fn classify_error(status: u16, code: Option<i64>, message: &str) -> ErrorCode {
    let message = message.to_ascii_lowercase();
    let code = code.unwrap_or_default();

    if status == 429 || status == 418 || code == -1003 || code == -1015 {
        ErrorCode::RateLimitExceeded
    } else if code == -2013
        || code == -2011
        || message.contains("does not exist")
        || message.contains("unknown order")
    {
        ErrorCode::OrderNotFound
    } else if code == -1022 || message.contains("signature") {
        ErrorCode::AuthenticationFailed
    } else if code == -2014
        || code == -2015
        || message.contains("api-key")
        || message.contains("permission")
    {
        ErrorCode::PermissionDenied
    } else if code == -2010 && message.contains("insufficient balance") {
        ErrorCode::InsufficientFunds
    } else if (-1199..=-1100).contains(&code) {
        ErrorCode::InvalidRequest
    } else if status >= 500 || code == -1000 || code == -1001 {
        ErrorCode::System
    } else if (400..500).contains(&status) {
        ErrorCode::InvalidRequest
    } else {
        ErrorCode::System
    }
}

fn parse_side(raw: &str) -> Result<OrderSide, GatewayError> {
    match raw {
        "BUY" => Ok(OrderSide::Buy),
        "SELL" => Ok(OrderSide::Sell),
        other => Err(GatewayError::system(format!("unknown binance side '{other}'"))),
    }
}

fn level(raw: &[String; 2]) -> Result<PriceLevel, GatewayError> {
    let number = |value: &str| {
        value
            .parse::<f64>()
            .map_err(|_| GatewayError::system(format!("binance depth level '{value}' is not a number")))
    };
    PriceLevel::new(number(&raw[0])?, number(&raw[1])?).map_err(GatewayError::from)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceOrder {
    symbol: String,
    order_id: i64,
    #[serde(default)]
    client_order_id: Option<String>,
    #[serde(deserialize_with = "f64_lenient")]
    price: f64,
    #[serde(deserialize_with = "f64_lenient")]
    orig_qty: f64,
    #[serde(deserialize_with = "f64_lenient")]
    executed_qty: f64,
    status: String,
    #[serde(rename = "type")]
    order_type: String,
    side: String,
    #[serde(default)]
    time: Option<EpochMillis>,
    #[serde(default)]
    update_time: Option<EpochMillis>,
    #[serde(default)]
    transact_time: Option<EpochMillis>,
}

impl BinanceOrder {
    fn server_time(&self) -> Option<EpochMillis> {
        self.transact_time.or(self.update_time)
    }

    fn into_order(self, symbol: Symbol) -> Result<SpotOrder, GatewayError> {
        let order_type = if self.order_type == "MARKET" {
            OrderType::Market
        } else {
            OrderType::Limit
        };

        Ok(SpotOrder {
            order_id: self.order_id.to_string(),
            client_order_id: self.client_order_id.filter(|id| !id.is_empty()),
            symbol,
            side: Some(parse_side(&self.side)?),
            order_type,
            price: (order_type == OrderType::Limit && self.price > 0.0).then_some(self.price),
            amount: self.orig_qty,
            filled_amount: self.executed_qty,
            remaining_amount: (self.orig_qty - self.executed_qty).max(0.0),
            status: map_order_status(&self.status)?,
            created_at: self.time.or(self.transact_time),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceAccount {
    balances: Vec<BinanceBalance>,
    #[serde(default)]
    update_time: Option<EpochMillis>,
}

#[derive(Debug, Deserialize)]
struct BinanceBalance {
    asset: String,
    #[serde(deserialize_with = "f64_lenient")]
    free: f64,
    #[serde(deserialize_with = "f64_lenient")]
    locked: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceTrade {
    id: i64,
    order_id: i64,
    #[serde(deserialize_with = "f64_lenient")]
    price: f64,
    #[serde(deserialize_with = "f64_lenient")]
    qty: f64,
    #[serde(deserialize_with = "f64_lenient")]
    commission: f64,
    #[serde(default)]
    commission_asset: Option<String>,
    time: EpochMillis,
    is_buyer: bool,
    is_maker: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceTicker {
    symbol: String,
    #[serde(deserialize_with = "f64_lenient")]
    last_price: f64,
    #[serde(deserialize_with = "f64_lenient")]
    open_price: f64,
    #[serde(deserialize_with = "f64_lenient")]
    high_price: f64,
    #[serde(deserialize_with = "f64_lenient")]
    low_price: f64,
    #[serde(deserialize_with = "f64_lenient")]
    volume: f64,
    #[serde(default)]
    close_time: Option<EpochMillis>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BinanceDepth {
    bids: Vec<[String; 2]>,
    asks: Vec<[String; 2]>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceExchangeInfo {
    #[serde(default)]
    server_time: Option<EpochMillis>,
    symbols: Vec<BinanceSymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceSymbolInfo {
    symbol: String,
    status: String,
    base_asset: String,
    quote_asset: String,
    #[serde(default)]
    filters: Vec<BinanceFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceFilter {
    filter_type: String,
    #[serde(default, deserialize_with = "opt_f64_lenient")]
    tick_size: Option<f64>,
    #[serde(default, deserialize_with = "opt_f64_lenient")]
    step_size: Option<f64>,
    #[serde(default, deserialize_with = "opt_f64_lenient")]
    min_qty: Option<f64>,
    #[serde(default, deserialize_with = "opt_f64_lenient")]
    min_notional: Option<f64>,
}

impl BinanceSymbolInfo {
    fn into_market(self) -> Result<MarketInfo, GatewayError> {
        let symbol = Symbol::new(&self.base_asset, &self.quote_asset)?;
        let mut market = MarketInfo {
            pair: Pair {
                symbol,
                wire_symbol: self.symbol,
            },
            is_trading: self.status == "TRADING",
            min_trade_amount: None,
            min_notional: None,
            price_tick: None,
            amount_tick: None,
        };

        for filter in self.filters {
            match filter.filter_type.as_str() {
                "PRICE_FILTER" => market.price_tick = filter.tick_size,
                "LOT_SIZE" => {
                    market.min_trade_amount = filter.min_qty;
                    market.amount_tick = filter.step_size;
                }
                "NOTIONAL" | "MIN_NOTIONAL" => market.min_notional = filter.min_notional,
                _ => {}
            }
        }
        Ok(market)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceServerTime {
    server_time: EpochMillis,
}

#[derive(Debug, Deserialize)]
struct BinanceErrorPayload {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
}

fn kline(row: &[serde_json::Value]) -> Result<Candle, GatewayError> {
    let malformed = || GatewayError::system("binance kline row is malformed");
    let number = |index: usize| -> Result<f64, GatewayError> {
        match row.get(index).ok_or_else(malformed)? {
            serde_json::Value::String(value) => value.parse().map_err(|_| malformed()),
            serde_json::Value::Number(value) => value.as_f64().ok_or_else(malformed),
            _ => Err(malformed()),
        }
    };

    Ok(Candle {
        open_time: row.first().and_then(serde_json::Value::as_i64).ok_or_else(malformed)?,
        open: number(1)?,
        high: number(2)?,
        low: number(3)?,
        close: number(4)?,
        volume: number(5)?,
    })
}

impl Parser for BinanceParser {
    fn placed_order(
        &self,
        symbol: &Symbol,
        response: &HttpResponse,
    ) -> Result<Parsed<SpotOrder>, GatewayError> {
        self.order(symbol, response)
    }

    fn cancelled_order(
        &self,
        req: &CancelOrderRequest,
        response: &HttpResponse,
    ) -> Result<Parsed<SpotOrder>, GatewayError> {
        self.order(&req.symbol, response)
    }

    fn order(
        &self,
        symbol: &Symbol,
        response: &HttpResponse,
    ) -> Result<Parsed<SpotOrder>, GatewayError> {
        let raw: BinanceOrder = decode(EXCHANGE, response)?;
        let server_time = raw.server_time();
        Ok(Parsed::new(raw.into_order(symbol.clone())?, server_time))
    }

    fn orders(
        &self,
        symbol: Option<&Symbol>,
        response: &HttpResponse,
    ) -> Result<Parsed<Vec<SpotOrder>>, GatewayError> {
        let raw: Vec<BinanceOrder> = decode(EXCHANGE, response)?;
        let requested = symbol.map(std::slice::from_ref).unwrap_or_default();
        let mut orders = Vec::with_capacity(raw.len());
        for order in raw {
            let Some(symbol) = resolve_symbol(EXCHANGE, &order.symbol, requested) else {
                warn!(
                    exchange = %EXCHANGE,
                    wire_symbol = %order.symbol,
                    order_id = order.order_id,
                    "skipping open order on unrecognized market"
                );
                continue;
            };
            orders.push(order.into_order(symbol)?);
        }
        Ok(Parsed::untimed(orders))
    }

    /// Only assets with a non-zero total are reported.
    fn balance(&self, response: &HttpResponse) -> Result<Parsed<Vec<Token>>, GatewayError> {
        let raw: BinanceAccount = decode(EXCHANGE, response)?;
        let tokens = raw
            .balances
            .into_iter()
            .map(|balance| Token {
                asset: balance.asset,
                free: balance.free,
                locked: balance.locked,
            })
            .filter(|token| token.total() > 0.0)
            .collect();
        Ok(Parsed::new(tokens, raw.update_time))
    }

    fn trades(
        &self,
        symbol: &Symbol,
        response: &HttpResponse,
    ) -> Result<Parsed<Vec<SpotTrade>>, GatewayError> {
        let raw: Vec<BinanceTrade> = decode(EXCHANGE, response)?;
        let trades = raw
            .into_iter()
            .map(|trade| SpotTrade {
                trade_id: trade.id.to_string(),
                order_id: trade.order_id.to_string(),
                symbol: symbol.clone(),
                side: if trade.is_buyer {
                    OrderSide::Buy
                } else {
                    OrderSide::Sell
                },
                price: trade.price,
                amount: trade.qty,
                fee: trade.commission,
                fee_asset: trade.commission_asset,
                is_maker: trade.is_maker,
                timestamp: trade.time,
            })
            .collect();
        Ok(Parsed::untimed(trades))
    }

    fn tickers(
        &self,
        requested: &[Symbol],
        response: &HttpResponse,
    ) -> Result<Parsed<Vec<Ticker>>, GatewayError> {
        let raw: OneOrMany<BinanceTicker> = decode(EXCHANGE, response)?;
        let raw = raw.into_vec();
        let server_time = raw.iter().filter_map(|ticker| ticker.close_time).max();
        let tickers = raw
            .into_iter()
            .filter_map(|ticker| {
                let Some(symbol) = resolve_symbol(EXCHANGE, &ticker.symbol, requested) else {
                    warn!(
                        exchange = %EXCHANGE,
                        wire_symbol = %ticker.symbol,
                        "skipping ticker on unrecognized market"
                    );
                    return None;
                };
                Some(Ticker {
                    symbol,
                    current: ticker.last_price,
                    open: ticker.open_price,
                    high: ticker.high_price,
                    low: ticker.low_price,
                    volume: ticker.volume,
                    timestamp: ticker.close_time,
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
        let raw: BinanceDepth = decode(EXCHANGE, response)?;
        let bids = raw.bids.iter().map(level).collect::<Result<Vec<_>, _>>()?;
        let asks = raw.asks.iter().map(level).collect::<Result<Vec<_>, _>>()?;
        Ok(Parsed::untimed(OrderBook::new(symbol.clone(), bids, asks, None)))
    }

    fn candles(&self, response: &HttpResponse) -> Result<Parsed<Vec<Candle>>, GatewayError> {
        let raw: Vec<Vec<serde_json::Value>> = decode(EXCHANGE, response)?;
        let candles = raw
            .iter()
            .map(|row| kline(row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Parsed::untimed(candles))
    }

    fn markets(&self, response: &HttpResponse) -> Result<Parsed<Vec<MarketInfo>>, GatewayError> {
        let raw: BinanceExchangeInfo = decode(EXCHANGE, response)?;
        let markets = raw
            .symbols
            .into_iter()
            .map(BinanceSymbolInfo::into_market)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Parsed::new(markets, raw.server_time))
    }

    fn server_time(&self, response: &HttpResponse) -> Result<Parsed<ServerTime>, GatewayError> {
        let raw: BinanceServerTime = decode(EXCHANGE, response)?;
        Ok(Parsed::new(
            ServerTime {
                server_time: raw.server_time,
            },
            Some(raw.server_time),
        ))
    }

    fn error(&self, response: &HttpResponse) -> GatewayError {
        let (code, message) = match serde_json::from_str::<BinanceErrorPayload>(&response.body) {
            Ok(payload) => (
                payload.code,
                payload
                    .msg
                    .unwrap_or_else(|| body_excerpt(&response.body)),
            ),
            Err(_) => (None, body_excerpt(&response.body)),
        };

        let detail = match code {
            Some(code) => format!("binance {} [{code}] {message}", response.status),
            None => format!("binance {} {message}", response.status),
        };
        GatewayError::from_code(classify_error(response.status, code, &message), detail)
    }
}
