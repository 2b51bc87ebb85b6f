use crate::adapters::wire::format_decimal;
use crate::adapters::{Converter, WireCall};
use crate::gateway::Operation;
use crate::requests::{
    BalanceRequest, CancelOrderRequest, CandlesRequest, LimitOrderRequest, MarketOrderRequest,
    MarketsRequest, OpenOrdersRequest, OrderAmount, OrderBookRequest, OrderStatusRequest,
    ServerTimeRequest, TickerRequest, TradeHistoryRequest,
};
use crate::weights::WireParams;
use crate::{ExchangeId, GatewayError, OrderSide, Symbol, TimeInForce, Timeframe};

const MAX_CANDLES: u32 = 200;

/// Request translation for the Upbit REST API.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpbitConverter;

fn market(symbol: &Symbol) -> String {
    ExchangeId::Upbit.wire_symbol(symbol)
}

fn side(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Buy => "bid",
        OrderSide::Sell => "ask",
    }
}

fn time_in_force(value: TimeInForce) -> Option<&'static str> {
    match value {
        TimeInForce::Gtc => None,
        TimeInForce::Ioc => Some("ioc"),
        TimeInForce::Fok => Some("fok"),
        TimeInForce::PostOnly => Some("post_only"),
    }
}

fn candles_path(timeframe: Timeframe) -> String {
    match (timeframe, timeframe.minutes()) {
        (Timeframe::OneWeek, _) => String::from("/v1/candles/weeks"),
        (_, Some(unit)) => format!("/v1/candles/minutes/{unit}"),
        (_, None) => String::from("/v1/candles/days"),
    }
}

impl Converter for UpbitConverter {
    fn limit_order(
        &self,
        order_side: OrderSide,
        req: &LimitOrderRequest,
    ) -> Result<WireCall, GatewayError> {
        let params = WireParams::new()
            .with("market", market(&req.symbol))
            .with("side", side(order_side))
            .with("volume", format_decimal(req.amount))
            .with("price", format_decimal(req.price))
            .with("ord_type", "limit")
            .with_opt("time_in_force", time_in_force(req.time_in_force))
            .with_opt("identifier", req.client_order_id.as_deref());

        Ok(WireCall::post("/v1/orders").with_params(params).json_body())
    }

    /// Upbit sizes market buys by quote total (`price`) and market sells by
    /// base volume (`market`); the other combinations are rejected.
    fn market_order(
        &self,
        order_side: OrderSide,
        req: &MarketOrderRequest,
    ) -> Result<WireCall, GatewayError> {
        let params = WireParams::new()
            .with("market", market(&req.symbol))
            .with("side", side(order_side));

        let params = match (order_side, req.amount) {
            (OrderSide::Buy, OrderAmount::Quote(total)) => params
                .with("price", format_decimal(total))
                .with("ord_type", "price"),
            (OrderSide::Sell, OrderAmount::Base(volume)) => params
                .with("volume", format_decimal(volume))
                .with("ord_type", "market"),
            (OrderSide::Buy, OrderAmount::Base(_)) => {
                return Err(GatewayError::invalid_request(
                    "upbit market buys must be sized in quote currency",
                ));
            }
            (OrderSide::Sell, OrderAmount::Quote(_)) => {
                return Err(GatewayError::invalid_request(
                    "upbit market sells must be sized in base currency",
                ));
            }
        }
        .with_opt("identifier", req.client_order_id.as_deref());

        Ok(WireCall::post("/v1/orders").with_params(params).json_body())
    }

    fn cancel(&self, req: &CancelOrderRequest) -> Result<WireCall, GatewayError> {
        Ok(WireCall::delete("/v1/order")
            .with_params(WireParams::new().with("uuid", req.order_id.as_str())))
    }

    fn order_status(&self, req: &OrderStatusRequest) -> Result<WireCall, GatewayError> {
        Ok(WireCall::get("/v1/order")
            .with_params(WireParams::new().with("uuid", req.order_id.as_str())))
    }

    fn open_orders(&self, req: &OpenOrdersRequest) -> Result<WireCall, GatewayError> {
        let params = WireParams::new()
            .with_opt("market", req.symbol.as_ref().map(market))
            .with("state", "wait");
        Ok(WireCall::get("/v1/orders").with_params(params))
    }

    fn balance(&self, _req: &BalanceRequest) -> Result<WireCall, GatewayError> {
        Ok(WireCall::get("/v1/accounts"))
    }

    fn trade_history(&self, _req: &TradeHistoryRequest) -> Result<WireCall, GatewayError> {
        Err(GatewayError::UnsupportedOperation {
            operation: Operation::TradeHistory,
            exchange: ExchangeId::Upbit,
        })
    }

    fn ticker(&self, req: &TickerRequest) -> Result<WireCall, GatewayError> {
        if req.symbols.is_empty() {
            return Err(GatewayError::invalid_request(
                "upbit ticker requires at least one symbol",
            ));
        }

        let markets = req.symbols.iter().map(market).collect::<Vec<_>>().join(",");
        Ok(WireCall::get("/v1/ticker").with_params(WireParams::new().with("markets", markets)))
    }

    /// Upbit publishes a fixed-depth book; `depth` is not sent.
    fn orderbook(&self, req: &OrderBookRequest) -> Result<WireCall, GatewayError> {
        Ok(WireCall::get("/v1/orderbook")
            .with_params(WireParams::new().with("markets", market(&req.symbol))))
    }

    fn candles(&self, req: &CandlesRequest) -> Result<WireCall, GatewayError> {
        if req.address.exchange() != ExchangeId::Upbit {
            return Err(GatewayError::invalid_request(format!(
                "candles address '{}' does not belong to upbit",
                req.address
            )));
        }
        if req.limit > MAX_CANDLES {
            return Err(GatewayError::invalid_request(format!(
                "upbit returns at most {MAX_CANDLES} candles per call, got limit {}",
                req.limit
            )));
        }

        let params = WireParams::new()
            .with("market", req.address.wire_symbol())
            .with("count", req.limit.to_string());
        Ok(WireCall::get(candles_path(req.address.timeframe())).with_params(params))
    }

    /// Upbit cannot filter server-side; the gateway narrows the list afterwards.
    fn markets(&self, _req: &MarketsRequest) -> Result<WireCall, GatewayError> {
        Ok(WireCall::get("/v1/market/all")
            .with_params(WireParams::new().with("isDetails", "true")))
    }

    fn server_time(&self, _req: &ServerTimeRequest) -> Result<WireCall, GatewayError> {
        Ok(WireCall::get("/v1/market/all"))
    }
}
