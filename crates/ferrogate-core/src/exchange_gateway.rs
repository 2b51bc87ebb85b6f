use std::sync::Arc;

use tracing::debug;

use crate::adapters::{
    BinanceAdapter, Converter, ExchangeAdapter, Parsed, Parser, UpbitAdapter, WireCall,
};
use crate::auth::{Credentials, MissingSigner, RequestSigner};
use crate::gateway::{CapabilitySet, Gateway, GatewayFuture, Operation};
use crate::http_client::{HttpClient, HttpResponse, ReqwestHttpClient};
use crate::policy::ExchangePolicy;
use crate::requests::{
    BalanceRequest, CancelOrderRequest, CandlesRequest, LimitOrderRequest, MarketOrderRequest,
    MarketsRequest, ModifyOrderRequest, OpenOrdersRequest, OrderBookRequest, OrderStatusRequest,
    ServerTimeRequest, TickerRequest, TradeHistoryRequest,
};
use crate::throttling::{BudgetSnapshot, Throttler};
use crate::weights::RateCategory;
use crate::worker::Worker;
use crate::{
    BaseRequest, BaseResponse, Candle, EpochMillis, ExchangeId, GatewayError, MarketInfo,
    ModifyOrderResult, OrderBook, OrderSide, Response, ResponseTiming, ServerTime, SpotOrder,
    SpotTrade, Ticker, Token,
};

pub type BinanceGateway = ExchangeGateway<BinanceAdapter>;
pub type UpbitGateway = ExchangeGateway<UpbitAdapter>;

/// Gateway for one exchange account.
///
/// Owns the account's credentials and its admission controller. Clone an
/// `Arc<ExchangeGateway<_>>` to share one budget across tasks; two gateway
/// instances for the same account would each believe they own the full
/// exchange limit.
pub struct ExchangeGateway<A: ExchangeAdapter> {
    adapter: A,
    policy: ExchangePolicy,
    worker: Worker,
}

impl<A: ExchangeAdapter + Default> ExchangeGateway<A> {
    /// Builds a gateway with the exchange's default policy.
    pub fn new(credentials: Credentials) -> Result<Self, GatewayError> {
        Self::with_policy(credentials, ExchangePolicy::default_for(A::EXCHANGE))
    }

    pub fn with_policy(
        credentials: Credentials,
        policy: ExchangePolicy,
    ) -> Result<Self, GatewayError> {
        Self::from_parts(A::default(), credentials, policy)
    }
}

impl<A: ExchangeAdapter> ExchangeGateway<A> {
    /// Validates credentials and policy, then wires the default reqwest
    /// transport and a signer that rejects every private call.
    pub fn from_parts(
        adapter: A,
        credentials: Credentials,
        policy: ExchangePolicy,
    ) -> Result<Self, GatewayError> {
        if policy.exchange != A::EXCHANGE {
            return Err(GatewayError::configuration(format!(
                "policy for {} cannot drive a {} gateway",
                policy.exchange,
                A::EXCHANGE
            )));
        }
        credentials.validate(A::REQUIRED_CREDENTIALS, A::EXCHANGE)?;

        let weights = A::weight_table();
        policy.validate(&weights.categories())?;
        let throttler = Throttler::from_policy(&policy)?;

        Ok(Self {
            adapter,
            worker: Worker {
                exchange: A::EXCHANGE,
                base_url: policy.base_url.clone(),
                request_timeout: policy.request_timeout,
                weights,
                throttler,
                credentials,
                transport: Arc::new(ReqwestHttpClient::new()),
                signer: Arc::new(MissingSigner),
            },
            policy,
        })
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpClient>) -> Self {
        self.worker.transport = transport;
        self
    }

    pub fn with_signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.worker.signer = signer;
        self
    }

    pub fn policy(&self) -> &ExchangePolicy {
        &self.policy
    }

    pub fn throttler(&self) -> &Throttler {
        &self.worker.throttler
    }

    pub fn budget_snapshot(&self, category: RateCategory) -> Option<BudgetSnapshot> {
        self.worker.throttler.snapshot(category)
    }

    async fn dispatch<T>(
        &self,
        operation: Operation,
        base: &BaseRequest,
        convert: impl FnOnce(&A::Converter) -> Result<WireCall, GatewayError>,
        parse: impl FnOnce(&A::Parser, &HttpResponse) -> Result<Parsed<T>, GatewayError>,
    ) -> Result<Response<T>, GatewayError> {
        A::capabilities().ensure(operation, A::EXCHANGE)?;
        let converter = self.adapter.converter();
        let call = convert(converter);
        self.worker
            .run(converter, self.adapter.parser(), operation, base, call, parse)
            .await
    }

    async fn cancel_order(
        &self,
        req: &CancelOrderRequest,
    ) -> Result<Response<SpotOrder>, GatewayError> {
        self.dispatch(
            Operation::Cancel,
            &req.base,
            |converter| converter.cancel(req),
            |parser, response| parser.cancelled_order(req, response),
        )
        .await
    }

    async fn place_limit(
        &self,
        side: OrderSide,
        req: &LimitOrderRequest,
    ) -> Result<Response<SpotOrder>, GatewayError> {
        self.dispatch(
            limit_operation(side),
            &req.base,
            |converter| converter.limit_order(side, req),
            |parser, response| parser.placed_order(&req.symbol, response),
        )
        .await
    }

    async fn place_market(
        &self,
        side: OrderSide,
        req: &MarketOrderRequest,
    ) -> Result<Response<SpotOrder>, GatewayError> {
        let operation = match side {
            OrderSide::Buy => Operation::MarketBuy,
            OrderSide::Sell => Operation::MarketSell,
        };
        self.dispatch(
            operation,
            &req.base,
            |converter| converter.market_order(side, req),
            |parser, response| parser.placed_order(&req.symbol, response),
        )
        .await
    }

    async fn modify(
        &self,
        req: &ModifyOrderRequest,
    ) -> Result<Response<ModifyOrderResult>, GatewayError> {
        A::capabilities().ensure(Operation::ModifyOrReplace, A::EXCHANGE)?;

        let Response {
            base: cancel_meta,
            data: cancelled,
        } = self.cancel_order(&req.cancel_step()).await?;
        let started = cancel_meta.send_when;

        let Some(cancelled) = cancelled.filter(|_| cancel_meta.is_success) else {
            debug!(
                exchange = %A::EXCHANGE,
                request_id = %req.base.request_id,
                order_id = %req.order_id,
                "cancel step failed, replacement not placed"
            );
            return Ok(Response::failure(composite_meta(started, cancel_meta)));
        };

        let Response {
            base: create_meta,
            data: replacement,
        } = self.place_limit(req.side, &req.create_step()).await?;

        Ok(Response {
            base: composite_meta(started, create_meta),
            data: Some(ModifyOrderResult {
                cancelled,
                replacement,
            }),
        })
    }
}

const fn limit_operation(side: OrderSide) -> Operation {
    match side {
        OrderSide::Buy => Operation::LimitBuy,
        OrderSide::Sell => Operation::LimitSell,
    }
}

/// Relabels the last step's metadata as the composite, timed from the first send.
fn composite_meta(started: EpochMillis, mut meta: BaseResponse) -> BaseResponse {
    let timing = ResponseTiming::new(started, meta.receive_when);
    meta.operation = Operation::ModifyOrReplace;
    meta.send_when = timing.send_when();
    meta.receive_when = timing.receive_when();
    meta.timegaps = timing.timegaps();
    if !meta.is_success {
        meta.processed_when = timing.processed_when(None);
    }
    meta
}

impl<A: ExchangeAdapter> Gateway for ExchangeGateway<A> {
    fn exchange(&self) -> ExchangeId {
        A::EXCHANGE
    }

    fn capabilities(&self) -> CapabilitySet {
        A::capabilities()
    }

    fn limit_buy<'a>(&'a self, req: LimitOrderRequest) -> GatewayFuture<'a, SpotOrder> {
        Box::pin(async move { self.place_limit(OrderSide::Buy, &req).await })
    }

    fn limit_sell<'a>(&'a self, req: LimitOrderRequest) -> GatewayFuture<'a, SpotOrder> {
        Box::pin(async move { self.place_limit(OrderSide::Sell, &req).await })
    }

    fn market_buy<'a>(&'a self, req: MarketOrderRequest) -> GatewayFuture<'a, SpotOrder> {
        Box::pin(async move { self.place_market(OrderSide::Buy, &req).await })
    }

    fn market_sell<'a>(&'a self, req: MarketOrderRequest) -> GatewayFuture<'a, SpotOrder> {
        Box::pin(async move { self.place_market(OrderSide::Sell, &req).await })
    }

    fn cancel<'a>(&'a self, req: CancelOrderRequest) -> GatewayFuture<'a, SpotOrder> {
        Box::pin(async move { self.cancel_order(&req).await })
    }

    fn modify_or_replace<'a>(
        &'a self,
        req: ModifyOrderRequest,
    ) -> GatewayFuture<'a, ModifyOrderResult> {
        Box::pin(async move { self.modify(&req).await })
    }

    fn order_status<'a>(&'a self, req: OrderStatusRequest) -> GatewayFuture<'a, SpotOrder> {
        Box::pin(async move {
            self.dispatch(
                Operation::OrderStatus,
                &req.base,
                |converter| converter.order_status(&req),
                |parser, response| parser.order(&req.symbol, response),
            )
            .await
        })
    }

    fn open_orders<'a>(&'a self, req: OpenOrdersRequest) -> GatewayFuture<'a, Vec<SpotOrder>> {
        Box::pin(async move {
            self.dispatch(
                Operation::OpenOrders,
                &req.base,
                |converter| converter.open_orders(&req),
                |parser, response| parser.orders(req.symbol.as_ref(), response),
            )
            .await
        })
    }

    fn balance<'a>(&'a self, req: BalanceRequest) -> GatewayFuture<'a, Vec<Token>> {
        Box::pin(async move {
            self.dispatch(
                Operation::Balance,
                &req.base,
                |converter| converter.balance(&req),
                |parser, response| parser.balance(response),
            )
            .await
        })
    }

    fn trade_history<'a>(
        &'a self,
        req: TradeHistoryRequest,
    ) -> GatewayFuture<'a, Vec<SpotTrade>> {
        Box::pin(async move {
            self.dispatch(
                Operation::TradeHistory,
                &req.base,
                |converter| converter.trade_history(&req),
                |parser, response| parser.trades(&req.symbol, response),
            )
            .await
        })
    }

    fn ticker<'a>(&'a self, req: TickerRequest) -> GatewayFuture<'a, Vec<Ticker>> {
        Box::pin(async move {
            self.dispatch(
                Operation::Ticker,
                &req.base,
                |converter| converter.ticker(&req),
                |parser, response| parser.tickers(&req.symbols, response),
            )
            .await
        })
    }

    fn orderbook<'a>(&'a self, req: OrderBookRequest) -> GatewayFuture<'a, OrderBook> {
        Box::pin(async move {
            self.dispatch(
                Operation::OrderBook,
                &req.base,
                |converter| converter.orderbook(&req),
                |parser, response| parser.orderbook(&req.symbol, response),
            )
            .await
        })
    }

    fn candles<'a>(&'a self, req: CandlesRequest) -> GatewayFuture<'a, Vec<Candle>> {
        Box::pin(async move {
            self.dispatch(
                Operation::Candles,
                &req.base,
                |converter| converter.candles(&req),
                |parser, response| parser.candles(response),
            )
            .await
        })
    }

    /// Narrows to `req.symbol` after parsing; not every exchange filters
    /// server-side.
    fn available_markets<'a>(
        &'a self,
        req: MarketsRequest,
    ) -> GatewayFuture<'a, Vec<MarketInfo>> {
        Box::pin(async move {
            let mut response = self
                .dispatch(
                    Operation::AvailableMarkets,
                    &req.base,
                    |converter| converter.markets(&req),
                    |parser, response| parser.markets(response),
                )
                .await?;
            if let (Some(symbol), Some(markets)) = (&req.symbol, response.data.as_mut()) {
                markets.retain(|market| &market.pair.symbol == symbol);
            }
            Ok(response)
        })
    }

    fn server_time<'a>(&'a self, req: ServerTimeRequest) -> GatewayFuture<'a, ServerTime> {
        Box::pin(async move {
            self.dispatch(
                Operation::ServerTime,
                &req.base,
                |converter| converter.server_time(&req),
                |parser, response| parser.server_time(response),
            )
            .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::BudgetQuota;
    use std::time::Duration;

    fn binance_credentials() -> Credentials {
        Credentials::new()
            .with("API key", "key")
            .with("API secret", "secret")
    }

    #[test]
    fn rejects_blank_credentials() {
        let credentials = Credentials::new().with("API key", "key").with("API secret", " ");
        let err = BinanceGateway::new(credentials).err().expect("must fail");
        assert!(matches!(err, GatewayError::Configuration(_)));
    }

    #[test]
    fn rejects_policy_for_another_exchange() {
        let err = BinanceGateway::with_policy(binance_credentials(), ExchangePolicy::upbit_default())
            .err()
            .expect("must fail");
        assert!(err.to_string().contains("cannot drive a binance gateway"));
    }

    #[test]
    fn rejects_policy_missing_a_used_category() {
        let mut policy = ExchangePolicy::upbit_default();
        policy
            .budgets
            .retain(|quota| quota.category != RateCategory::ExchangeOrder);
        let credentials = Credentials::new()
            .with("Access key", "a")
            .with("Secret key", "s");

        let err = UpbitGateway::with_policy(credentials, policy)
            .err()
            .expect("must fail");
        assert!(err.to_string().contains("EXCHANGE_ORDER"));
    }

    #[test]
    fn exposes_configured_budgets() {
        let policy = ExchangePolicy::binance_default().with_budget(BudgetQuota {
            category: RateCategory::RequestWeight,
            capacity: 1_200,
            window: Duration::from_secs(60),
        });
        let gateway = BinanceGateway::with_policy(binance_credentials(), policy).expect("valid");

        let snapshot = gateway
            .budget_snapshot(RateCategory::RequestWeight)
            .expect("configured");
        assert_eq!(snapshot.capacity, 1_200);
        assert_eq!(snapshot.consumed, 0);
        assert!(gateway.capabilities().supports(Operation::TradeHistory));
    }

    #[test]
    fn composite_meta_spans_both_steps() {
        let base = BaseRequest::new("req-1", "gw").expect("valid request");
        let create = BaseResponse::success(
            &base,
            ExchangeId::Binance,
            Operation::LimitBuy,
            ResponseTiming::new(1_500, 1_700),
            Some(1_650),
        );

        let meta = composite_meta(1_000, create);
        assert_eq!(meta.operation, Operation::ModifyOrReplace);
        assert_eq!(meta.send_when, 1_000);
        assert_eq!(meta.receive_when, 1_700);
        assert_eq!(meta.timegaps, 700);
        assert_eq!(meta.processed_when, 1_650);
    }
}
