use crate::adapters::wire::format_decimal;
use crate::adapters::{Converter, WireCall};
use crate::requests::{
    BalanceRequest, CancelOrderRequest, CandlesRequest, LimitOrderRequest, MarketOrderRequest,
    MarketsRequest, OpenOrdersRequest, OrderAmount, OrderBookRequest, OrderStatusRequest,
    ServerTimeRequest, TickerRequest, TradeHistoryRequest,
};
use crate::weights::WireParams;
use crate::{EpochMillis, ExchangeId, GatewayError, OrderSide, Symbol, TimeInForce};

const ORDER_PATH: &str = "/api/v3/order";
const RECV_WINDOW_MS: &str = "5000";
const MAX_KLINES: u32 = 1000;

/// Request translation for Binance spot REST.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinanceConverter;

fn wire_symbol(symbol: &Symbol) -> String {
    ExchangeId::Binance.wire_symbol(symbol)
}

/// Numeric ids go out as `orderId`; anything else is treated as a client id.
fn order_reference(params: WireParams, order_id: &str) -> WireParams {
    if order_id.parse::<u64>().is_ok() {
        params.with("orderId", order_id)
    } else {
        params.with("origClientOrderId", order_id)
    }
}

impl Converter for BinanceConverter {
    fn limit_order(
        &self,
        side: OrderSide,
        req: &LimitOrderRequest,
    ) -> Result<WireCall, GatewayError> {
        let mut params = WireParams::new()
            .with("symbol", wire_symbol(&req.symbol))
            .with("side", side.as_str());

        params = match req.time_in_force {
            TimeInForce::PostOnly => params.with("type", "LIMIT_MAKER"),
            TimeInForce::Gtc => params.with("type", "LIMIT").with("timeInForce", "GTC"),
            TimeInForce::Ioc => params.with("type", "LIMIT").with("timeInForce", "IOC"),
            TimeInForce::Fok => params.with("type", "LIMIT").with("timeInForce", "FOK"),
        };

        let params = params
            .with("quantity", format_decimal(req.amount))
            .with("price", format_decimal(req.price))
            .with_opt("newClientOrderId", req.client_order_id.as_deref())
            .with("newOrderRespType", "RESULT");

        Ok(WireCall::post(ORDER_PATH).with_params(params))
    }

    fn market_order(
        &self,
        side: OrderSide,
        req: &MarketOrderRequest,
    ) -> Result<WireCall, GatewayError> {
        let params = WireParams::new()
            .with("symbol", wire_symbol(&req.symbol))
            .with("side", side.as_str())
            .with("type", "MARKET");

        let params = match req.amount {
            OrderAmount::Base(quantity) => params.with("quantity", format_decimal(quantity)),
            OrderAmount::Quote(total) => params.with("quoteOrderQty", format_decimal(total)),
        }
        .with_opt("newClientOrderId", req.client_order_id.as_deref())
        .with("newOrderRespType", "RESULT");

        Ok(WireCall::post(ORDER_PATH).with_params(params))
    }

    fn cancel(&self, req: &CancelOrderRequest) -> Result<WireCall, GatewayError> {
        let params = WireParams::new().with("symbol", wire_symbol(&req.symbol));
        Ok(WireCall::delete(ORDER_PATH).with_params(order_reference(params, &req.order_id)))
    }

    fn order_status(&self, req: &OrderStatusRequest) -> Result<WireCall, GatewayError> {
        let params = WireParams::new().with("symbol", wire_symbol(&req.symbol));
        Ok(WireCall::get(ORDER_PATH).with_params(order_reference(params, &req.order_id)))
    }

    fn open_orders(&self, req: &OpenOrdersRequest) -> Result<WireCall, GatewayError> {
        let params = WireParams::new().with_opt("symbol", req.symbol.as_ref().map(wire_symbol));
        Ok(WireCall::get("/api/v3/openOrders").with_params(params))
    }

    fn balance(&self, _req: &BalanceRequest) -> Result<WireCall, GatewayError> {
        Ok(WireCall::get("/api/v3/account"))
    }

    fn trade_history(&self, req: &TradeHistoryRequest) -> Result<WireCall, GatewayError> {
        let params = WireParams::new()
            .with("symbol", wire_symbol(&req.symbol))
            .with_opt("limit", req.limit.map(|limit| limit.to_string()));
        Ok(WireCall::get("/api/v3/myTrades").with_params(params))
    }

    fn ticker(&self, req: &TickerRequest) -> Result<WireCall, GatewayError> {
        let params = match req.symbols.as_slice() {
            [] => WireParams::new(),
            [symbol] => WireParams::new().with("symbol", wire_symbol(symbol)),
            symbols => {
                let list = symbols.iter().map(wire_symbol).collect::<Vec<_>>();
                let encoded = serde_json::to_string(&list).map_err(|e| {
                    GatewayError::invalid_request(format!("cannot encode ticker symbols: {e}"))
                })?;
                WireParams::new().with("symbols", encoded)
            }
        };
        Ok(WireCall::get("/api/v3/ticker/24hr").with_params(params))
    }

    fn orderbook(&self, req: &OrderBookRequest) -> Result<WireCall, GatewayError> {
        let params = WireParams::new()
            .with("symbol", wire_symbol(&req.symbol))
            .with_opt("limit", req.depth.map(|depth| depth.to_string()));
        Ok(WireCall::get("/api/v3/depth").with_params(params))
    }

    fn candles(&self, req: &CandlesRequest) -> Result<WireCall, GatewayError> {
        if req.address.exchange() != ExchangeId::Binance {
            return Err(GatewayError::invalid_request(format!(
                "candles address '{}' does not belong to binance",
                req.address
            )));
        }
        if req.limit > MAX_KLINES {
            return Err(GatewayError::invalid_request(format!(
                "binance returns at most {MAX_KLINES} klines per call, got limit {}",
                req.limit
            )));
        }

        let params = WireParams::new()
            .with("symbol", req.address.wire_symbol())
            .with("interval", req.address.timeframe().as_str())
            .with("limit", req.limit.to_string());
        Ok(WireCall::get("/api/v3/klines").with_params(params))
    }

    fn markets(&self, req: &MarketsRequest) -> Result<WireCall, GatewayError> {
        let params = WireParams::new().with_opt("symbol", req.symbol.as_ref().map(wire_symbol));
        Ok(WireCall::get("/api/v3/exchangeInfo").with_params(params))
    }

    fn server_time(&self, _req: &ServerTimeRequest) -> Result<WireCall, GatewayError> {
        Ok(WireCall::get("/api/v3/time"))
    }

    fn prepare_signed(&self, params: &mut WireParams, timestamp: EpochMillis) {
        params.push("timestamp", timestamp.to_string());
        params.push("recvWindow", RECV_WINDOW_MS);
    }
}
