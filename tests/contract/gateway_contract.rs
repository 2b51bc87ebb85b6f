//! Contract tests every exchange gateway must satisfy.
//!
//! The same assertions run against Binance and Upbit through the
//! `Gateway` trait object so neither implementation can drift.

#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;

use ferrogate_core::adapters::ExchangeAdapter;
use ferrogate_core::{
    BinanceAdapter, BinanceConverter, BinanceParser, CapabilitySet, EndpointCost, EndpointSpec,
    ExchangeGateway, ExchangeId, ExchangePolicy, Gateway, GatewayError, HttpMethod, HttpResponse,
    Operation, RateCategory, ServerTimeRequest, TickerRequest, TradeHistoryRequest, WeightTable,
};
use support::{
    base, binance_credentials, binance_gateway, symbol, upbit_gateway, RecordingSigner,
    ScriptedHttpClient,
};

fn binance(transport: Arc<ScriptedHttpClient>) -> Box<dyn Gateway> {
    Box::new(binance_gateway(
        ExchangePolicy::binance_default(),
        transport,
        Arc::new(RecordingSigner::default()),
    ))
}

fn upbit(transport: Arc<ScriptedHttpClient>) -> Box<dyn Gateway> {
    Box::new(upbit_gateway(
        ExchangePolicy::upbit_default(),
        transport,
        Arc::new(RecordingSigner::default()),
    ))
}

fn scripted_tickers() -> Arc<ScriptedHttpClient> {
    Arc::new(
        ScriptedHttpClient::new()
            .on(
                HttpMethod::Get,
                "/api/v3/ticker/24hr",
                HttpResponse::ok_json(
                    r#"{"symbol":"BTCUSDT","lastPrice":"30000","openPrice":"29000",
                        "highPrice":"31000","lowPrice":"28000","volume":"100",
                        "closeTime":1700000000000}"#,
                ),
            )
            .on(
                HttpMethod::Get,
                "/v1/ticker",
                HttpResponse::ok_json(
                    r#"[{"market":"KRW-BTC","trade_price":50000000,"opening_price":48000000,
                         "high_price":51000000,"low_price":47000000,"acc_trade_volume_24h":1.5,
                         "timestamp":1700000000000}]"#,
                ),
            ),
    )
}

fn quote_for(exchange: ExchangeId) -> &'static str {
    match exchange {
        ExchangeId::Binance => "BTC/USDT",
        ExchangeId::Upbit => "BTC/KRW",
    }
}

// =============================================================================
// Capabilities
// =============================================================================

#[test]
fn capabilities_match_each_exchange() {
    let binance = binance(Arc::new(ScriptedHttpClient::new()));
    let upbit = upbit(Arc::new(ScriptedHttpClient::new()));

    assert_eq!(binance.exchange(), ExchangeId::Binance);
    assert_eq!(binance.capabilities(), CapabilitySet::full());

    assert_eq!(upbit.exchange(), ExchangeId::Upbit);
    assert!(!upbit.capabilities().supports(Operation::TradeHistory));
    for operation in Operation::ALL {
        if operation != Operation::TradeHistory {
            assert!(upbit.capabilities().supports(operation), "{operation}");
        }
    }
}

#[tokio::test]
async fn unsupported_operation_is_a_contract_violation() {
    let transport = Arc::new(ScriptedHttpClient::new());
    let upbit = upbit(Arc::clone(&transport));

    let err = upbit
        .trade_history(TradeHistoryRequest::new(base("trades-1"), symbol("BTC/KRW")))
        .await
        .expect_err("trade history is not offered");

    assert!(matches!(
        err,
        GatewayError::UnsupportedOperation {
            operation: Operation::TradeHistory,
            exchange: ExchangeId::Upbit,
        }
    ));
    assert!(err.is_contract_violation());
    assert!(transport.requests().is_empty());
}

// =============================================================================
// Response metadata
// =============================================================================

#[tokio::test]
async fn every_gateway_echoes_request_and_orders_timing() {
    let transport = scripted_tickers();
    let gateways = [binance(Arc::clone(&transport)), upbit(Arc::clone(&transport))];

    for gateway in &gateways {
        let request_id = format!("contract-{}", gateway.exchange());
        let response = gateway
            .ticker(TickerRequest::single(
                base(&request_id),
                symbol(quote_for(gateway.exchange())),
            ))
            .await
            .expect("no contract violation");

        let meta = &response.base;
        assert!(meta.is_success, "{}", gateway.exchange());
        assert_eq!(meta.request_id, request_id);
        assert_eq!(meta.gateway_name, "test-gateway");
        assert_eq!(meta.exchange, gateway.exchange());
        assert_eq!(meta.operation, Operation::Ticker);
        assert!(meta.send_when <= meta.receive_when);
        assert_eq!(meta.timegaps, meta.receive_when - meta.send_when);
        assert_eq!(meta.processed_when, 1_700_000_000_000);
        assert_eq!(meta.error_code, None);
        assert!(!meta.is_permission_denied);
        assert!(!meta.is_network_error);
        assert!(!meta.is_rate_limit_exceeded);
        assert!(!meta.is_system_error);
    }
}

#[tokio::test]
async fn failed_responses_carry_exactly_one_category_flag() {
    let transport = Arc::new(ScriptedHttpClient::new());
    let gateways = [binance(Arc::clone(&transport)), upbit(Arc::clone(&transport))];

    for gateway in &gateways {
        // Unscripted routes answer 404.
        let response = gateway
            .ticker(TickerRequest::single(
                base("missing-route"),
                symbol(quote_for(gateway.exchange())),
            ))
            .await
            .expect("no contract violation");

        let meta = &response.base;
        assert!(!meta.is_success);
        assert!(response.data.is_none());
        assert!(meta.error_code.is_some());
        assert!(meta.error_message.is_some());
        let flags = [
            meta.is_permission_denied,
            meta.is_network_error,
            meta.is_rate_limit_exceeded,
            meta.is_system_error,
        ];
        assert!(flags.iter().filter(|flag| **flag).count() <= 1);
    }
}

// =============================================================================
// Weight table coverage
// =============================================================================

/// Binance adapter whose weight table only knows the klines endpoint.
#[derive(Default)]
struct NarrowTableAdapter {
    inner: BinanceAdapter,
}

impl ExchangeAdapter for NarrowTableAdapter {
    type Converter = BinanceConverter;
    type Parser = BinanceParser;

    const EXCHANGE: ExchangeId = ExchangeId::Binance;
    const REQUIRED_CREDENTIALS: &'static [&'static str] = BinanceAdapter::REQUIRED_CREDENTIALS;

    fn capabilities() -> CapabilitySet {
        BinanceAdapter::capabilities()
    }

    fn weight_table() -> WeightTable {
        WeightTable::new(ExchangeId::Binance).register(
            HttpMethod::Get,
            "/api/v3/klines",
            EndpointSpec::public(RateCategory::RequestWeight, EndpointCost::Static(2)),
        )
    }

    fn converter(&self) -> &Self::Converter {
        self.inner.converter()
    }

    fn parser(&self) -> &Self::Parser {
        self.inner.parser()
    }
}

#[tokio::test]
async fn unregistered_endpoint_is_a_contract_violation() {
    // Given: A gateway whose weight table is missing /api/v3/time
    let transport = Arc::new(ScriptedHttpClient::new().on(
        HttpMethod::Get,
        "/api/v3/time",
        HttpResponse::ok_json(r#"{"serverTime":1}"#),
    ));
    let gateway = ExchangeGateway::from_parts(
        NarrowTableAdapter::default(),
        binance_credentials(),
        ExchangePolicy::binance_default(),
    )
    .expect("valid gateway")
    .with_transport(Arc::clone(&transport) as Arc<dyn ferrogate_core::HttpClient>);

    // When: Server time is requested
    let err = gateway
        .server_time(ServerTimeRequest::new(base("time-1")))
        .await
        .expect_err("endpoint has no registered weight");

    // Then: The call escapes as an error and nothing is sent or consumed
    assert!(matches!(err, GatewayError::UnknownEndpoint { .. }));
    assert!(err.is_contract_violation());
    assert!(transport.requests().is_empty());
    let snapshot = gateway
        .budget_snapshot(RateCategory::RequestWeight)
        .expect("request weight budget");
    assert_eq!(snapshot.consumed, 0);
}

#[test]
fn every_registered_category_has_a_default_budget() {
    for exchange in [ExchangeId::Binance, ExchangeId::Upbit] {
        let policy = ExchangePolicy::default_for(exchange);
        let categories = match exchange {
            ExchangeId::Binance => BinanceAdapter::weight_table().categories(),
            ExchangeId::Upbit => ferrogate_core::UpbitAdapter::weight_table().categories(),
        };
        assert!(policy.validate(&categories).is_ok(), "{exchange}");
    }
}
