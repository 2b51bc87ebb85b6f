//! Behavior-driven tests for the Binance gateway.
//!
//! Focus: signed query strings, parametric request weights and
//! exchange-reported timestamps as seen by a caller.

mod support;

use std::sync::Arc;

use ferrogate_core::{
    BalanceRequest, BinanceGateway, CandlesRequest, ErrorCode, ExchangeId, ExchangePolicy,
    Gateway, HttpMethod, HttpResponse, LimitOrderRequest, MarketOrderRequest, MarketsRequest,
    OpenOrdersRequest, OrderAmount, OrderBookRequest, OrderSide, OrderStatus, OrderStatusRequest,
    RateCategory, ServerTimeRequest, StockAddress, TickerRequest, TimeInForce, Timeframe,
    TradeHistoryRequest,
};
use support::{base, binance_gateway, query_of, symbol, RecordingSigner, ScriptedHttpClient};

fn gateway(
    transport: ScriptedHttpClient,
) -> (BinanceGateway, Arc<ScriptedHttpClient>, Arc<RecordingSigner>) {
    let transport = Arc::new(transport);
    let signer = Arc::new(RecordingSigner::default());
    let gateway = binance_gateway(
        ExchangePolicy::binance_default(),
        Arc::clone(&transport),
        Arc::clone(&signer),
    );
    (gateway, transport, signer)
}

fn consumed(gateway: &BinanceGateway) -> u32 {
    gateway
        .budget_snapshot(RateCategory::RequestWeight)
        .expect("request weight budget")
        .consumed
}

const ORDER_ACK: &str = r#"{
    "symbol": "BTCUSDT", "orderId": 28, "clientOrderId": "client-28",
    "transactTime": 1507725176595, "price": "30000.00000000", "origQty": "0.01000000",
    "executedQty": "0.00000000", "status": "NEW", "timeInForce": "GTC",
    "type": "LIMIT", "side": "BUY"
}"#;

// =============================================================================
// Orders
// =============================================================================

#[tokio::test]
async fn limit_buy_is_signed_in_the_query_string() {
    // Given: Binance acknowledges a new limit order
    let (gateway, transport, signer) = gateway(ScriptedHttpClient::new().on(
        HttpMethod::Post,
        "/api/v3/order",
        HttpResponse::ok_json(ORDER_ACK),
    ));
    let request = LimitOrderRequest::new(base("limit-1"), symbol("BTC/USDT"), 30_000.0, 0.01)
        .expect("valid order")
        .with_client_order_id("client-28");

    // When: The limit buy is placed
    let response = gateway.limit_buy(request).await.expect("no contract violation");

    // Then: The order is pending and timed by transactTime
    assert!(response.is_success());
    assert_eq!(response.base.processed_when, 1_507_725_176_595);
    let order = response.data.expect("order");
    assert_eq!(order.order_id, "28");
    assert_eq!(order.side, Some(OrderSide::Buy));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.client_order_id.as_deref(), Some("client-28"));

    // And: The signer saw the timestamped query, and its signature was appended last
    let signed = signer.calls();
    assert_eq!(signed.len(), 1);
    assert!(signed[0].query.contains("timestamp="));
    assert!(signed[0].query.contains("recvWindow=5000"));
    assert_eq!(signed[0].body, None);

    let requests = transport.requests();
    let query = query_of(&requests[0].url).expect("query string");
    assert!(query.starts_with("symbol=BTCUSDT&side=BUY&type=LIMIT&timeInForce=GTC"));
    assert_eq!(query, format!("{}&signature=deadbeef", signed[0].query));
    assert_eq!(
        requests[0].headers.get("x-mbx-apikey").map(String::as_str),
        Some("binance-key")
    );
    assert_eq!(consumed(&gateway), 1);
}

#[tokio::test]
async fn order_on_a_fiat_quote_keeps_the_requested_symbol() {
    // Given: Binance acknowledges a limit order on BTCBRL
    let (gateway, _, _) = gateway(ScriptedHttpClient::new().on(
        HttpMethod::Post,
        "/api/v3/order",
        HttpResponse::ok_json(
            r#"{"symbol":"BTCBRL","orderId":91,"transactTime":1700000000000,"price":"350000",
                "origQty":"0.001","executedQty":"0","status":"NEW","type":"LIMIT","side":"BUY"}"#,
        ),
    ));
    let request = LimitOrderRequest::new(base("limit-brl"), symbol("BTC/BRL"), 350_000.0, 0.001)
        .expect("valid order");

    // When: The limit buy is placed
    let response = gateway.limit_buy(request).await.expect("no contract violation");

    // Then: The accepted order is reported on the symbol the caller asked for
    assert!(response.is_success());
    let order = response.data.expect("order");
    assert_eq!(order.order_id, "91");
    assert_eq!(order.symbol, symbol("BTC/BRL"));
    assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn post_only_limit_becomes_limit_maker() {
    let (gateway, transport, _) = gateway(ScriptedHttpClient::new().on(
        HttpMethod::Post,
        "/api/v3/order",
        HttpResponse::ok_json(ORDER_ACK),
    ));
    let request = LimitOrderRequest::new(base("limit-2"), symbol("BTC/USDT"), 30_000.0, 0.01)
        .expect("valid order")
        .with_time_in_force(TimeInForce::PostOnly);

    gateway.limit_sell(request).await.expect("no contract violation");

    let url = &transport.requests()[0].url;
    let query = query_of(url).expect("query string");
    assert!(query.contains("type=LIMIT_MAKER"));
    assert!(!query.contains("timeInForce"));
}

#[tokio::test]
async fn quote_sized_market_buy_uses_quote_order_qty() {
    let (gateway, transport, _) = gateway(ScriptedHttpClient::new().on(
        HttpMethod::Post,
        "/api/v3/order",
        HttpResponse::ok_json(
            r#"{"symbol":"ETHUSDT","orderId":7,"transactTime":1700000000000,"price":"0",
                "origQty":"0.05","executedQty":"0.05","status":"FILLED","type":"MARKET","side":"BUY"}"#,
        ),
    ));
    let request = MarketOrderRequest::new(base("mkt-1"), symbol("ETH/USDT"), OrderAmount::Quote(100.0))
        .expect("valid order");

    let response = gateway.market_buy(request).await.expect("no contract violation");

    let order = response.data.expect("order");
    assert_eq!(order.status, OrderStatus::Filled);
    assert_eq!(order.price, None);
    let query = query_of(&transport.requests()[0].url).expect("query").to_owned();
    assert!(query.contains("quoteOrderQty=100"));
    assert!(!query.contains("quantity="));
}

#[tokio::test]
async fn order_status_by_exchange_id_costs_four() {
    let (gateway, transport, _) = gateway(ScriptedHttpClient::new().on(
        HttpMethod::Get,
        "/api/v3/order",
        HttpResponse::ok_json(
            r#"{"symbol":"BTCUSDT","orderId":28,"price":"30000","origQty":"0.01",
                "executedQty":"0.004","status":"PARTIALLY_FILLED","type":"LIMIT","side":"BUY",
                "time":1700000000000,"updateTime":1700000005000}"#,
        ),
    ));

    let response = gateway
        .order_status(OrderStatusRequest::new(base("status-1"), symbol("BTC/USDT"), "28"))
        .await
        .expect("no contract violation");

    let order = response.data.expect("order");
    assert_eq!(order.status, OrderStatus::PartiallyFilled);
    assert_eq!(order.created_at, Some(1_700_000_000_000));
    assert_eq!(response.base.processed_when, 1_700_000_005_000);
    assert!(query_of(&transport.requests()[0].url)
        .expect("query")
        .contains("orderId=28"));
    assert_eq!(consumed(&gateway), 4);
}

#[tokio::test]
async fn open_orders_without_symbol_costs_eighty() {
    let (gateway, _, _) = gateway(ScriptedHttpClient::new().on(
        HttpMethod::Get,
        "/api/v3/openOrders",
        HttpResponse::ok_json("[]"),
    ));

    let response = gateway
        .open_orders(OpenOrdersRequest::new(base("open-1"), None))
        .await
        .expect("no contract violation");

    assert_eq!(response.data, Some(Vec::new()));
    assert_eq!(consumed(&gateway), 80);
}

#[tokio::test]
async fn balance_keeps_only_non_zero_assets() {
    let (gateway, _, _) = gateway(ScriptedHttpClient::new().on(
        HttpMethod::Get,
        "/api/v3/account",
        HttpResponse::ok_json(
            r#"{"updateTime":1700000000000,"balances":[
                {"asset":"BTC","free":"0.5","locked":"0.1"},
                {"asset":"LTC","free":"0","locked":"0"}]}"#,
        ),
    ));

    let response = gateway
        .balance(BalanceRequest::new(base("balance-1")))
        .await
        .expect("no contract violation");

    let tokens = response.data.expect("tokens");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].asset, "BTC");
    assert!((tokens[0].total() - 0.6).abs() < 1e-12);
    assert_eq!(response.base.processed_when, 1_700_000_000_000);
    assert_eq!(consumed(&gateway), 20);
}

#[tokio::test]
async fn trade_history_maps_buyer_flag_to_side() {
    let (gateway, _, _) = gateway(ScriptedHttpClient::new().on(
        HttpMethod::Get,
        "/api/v3/myTrades",
        HttpResponse::ok_json(
            r#"[{"symbol":"BNBBTC","id":28457,"orderId":100234,"price":"4.00000100",
                 "qty":"12.00000000","commission":"10.10000000","commissionAsset":"BNB",
                 "time":1499865549590,"isBuyer":true,"isMaker":false}]"#,
        ),
    ));

    let response = gateway
        .trade_history(TradeHistoryRequest::new(base("trades-1"), symbol("BNB/BTC")))
        .await
        .expect("no contract violation");

    let trades = response.data.expect("trades");
    assert_eq!(trades[0].side, OrderSide::Buy);
    assert_eq!(trades[0].order_id, "100234");
    assert_eq!(trades[0].fee_asset.as_deref(), Some("BNB"));
}

// =============================================================================
// Market data weights
// =============================================================================

#[tokio::test]
async fn ticker_weight_scales_with_symbol_count() {
    let (gateway, transport, signer) = gateway(ScriptedHttpClient::new().on(
        HttpMethod::Get,
        "/api/v3/ticker/24hr",
        HttpResponse::ok_json(
            r#"[{"symbol":"BTCUSDT","lastPrice":"30000","openPrice":"29000","highPrice":"31000",
                 "lowPrice":"28000","volume":"100","closeTime":1700000000000},
                {"symbol":"ETHUSDT","lastPrice":"2000","openPrice":"1900","highPrice":"2100",
                 "lowPrice":"1800","volume":"500","closeTime":1700000001000},
                {"symbol":"BNBUSDT","lastPrice":"300","openPrice":"290","highPrice":"310",
                 "lowPrice":"280","volume":"900","closeTime":1699999999000}]"#,
        ),
    ));
    let request = TickerRequest::new(
        base("ticker-1"),
        vec![symbol("BTC/USDT"), symbol("ETH/USDT"), symbol("BNB/USDT")],
    );

    let response = gateway.ticker(request).await.expect("no contract violation");

    assert_eq!(response.data.map(|tickers| tickers.len()), Some(3));
    assert_eq!(response.base.processed_when, 1_700_000_001_000);
    assert_eq!(consumed(&gateway), 6);
    assert!(signer.calls().is_empty());
    assert!(query_of(&transport.requests()[0].url)
        .expect("query")
        .starts_with("symbols="));
}

#[tokio::test]
async fn all_market_ticker_skips_symbols_it_cannot_split() {
    // Given: The all-markets ticker lists a JPY market and one with an unlisted quote
    let (gateway, _, _) = gateway(ScriptedHttpClient::new().on(
        HttpMethod::Get,
        "/api/v3/ticker/24hr",
        HttpResponse::ok_json(
            r#"[{"symbol":"BTCJPY","lastPrice":"9000000","openPrice":"8900000",
                 "highPrice":"9100000","lowPrice":"8800000","volume":"12",
                 "closeTime":1700000000000},
                {"symbol":"BTCXYZ","lastPrice":"1","openPrice":"1","highPrice":"1",
                 "lowPrice":"1","volume":"1","closeTime":1700000002000},
                {"symbol":"ETHUSDT","lastPrice":"2000","openPrice":"1900","highPrice":"2100",
                 "lowPrice":"1800","volume":"500","closeTime":1700000001000}]"#,
        ),
    ));

    // When: Every market is requested
    let response = gateway
        .ticker(TickerRequest::new(base("ticker-all"), Vec::new()))
        .await
        .expect("no contract violation");

    // Then: The call succeeds with the markets it could name
    assert!(response.is_success());
    let tickers = response.data.expect("tickers");
    let symbols = tickers.iter().map(|t| t.symbol.clone()).collect::<Vec<_>>();
    assert_eq!(symbols, vec![symbol("BTC/JPY"), symbol("ETH/USDT")]);
    assert_eq!(consumed(&gateway), 80);
}

#[tokio::test]
async fn orderbook_weight_follows_depth_tier() {
    let (gateway, _, _) = gateway(ScriptedHttpClient::new().on(
        HttpMethod::Get,
        "/api/v3/depth",
        HttpResponse::ok_json(
            r#"{"lastUpdateId":1027024,"bids":[["4.00000000","431.00000000"]],
                "asks":[["4.00000200","12.00000000"]]}"#,
        ),
    ));

    let response = gateway
        .orderbook(OrderBookRequest::new(base("book-1"), symbol("BTC/USDT")).with_depth(500))
        .await
        .expect("no contract violation");

    // Depth payloads carry no timestamp, so processed_when is the round-trip midpoint.
    let meta = &response.base;
    assert!(meta.processed_when >= meta.send_when);
    assert!(meta.processed_when <= meta.receive_when);
    assert_eq!(
        response.data.and_then(|book| book.best_bid()).map(|level| level.amount),
        Some(431.0)
    );
    assert_eq!(consumed(&gateway), 25);
}

#[tokio::test]
async fn candles_request_klines_with_interval() {
    let (gateway, transport, _) = gateway(ScriptedHttpClient::new().on(
        HttpMethod::Get,
        "/api/v3/klines",
        HttpResponse::ok_json(
            r#"[[1499040000000,"0.0163","0.8","0.0157","0.0157","148976.1",1499644799999,
                 "2434.19",308,"1756.87","28.46","0"]]"#,
        ),
    ));
    let address = StockAddress::crypto_spot(ExchangeId::Binance, symbol("BTC/USDT"), Timeframe::OneHour);

    let response = gateway
        .candles(CandlesRequest::new(base("candles-1"), address, 1).expect("valid request"))
        .await
        .expect("no contract violation");

    assert_eq!(
        response.data.map(|candles| candles[0].open_time),
        Some(1_499_040_000_000)
    );
    assert_eq!(
        query_of(&transport.requests()[0].url),
        Some("symbol=BTCUSDT&interval=1h&limit=1")
    );
    assert_eq!(consumed(&gateway), 2);
}

#[tokio::test]
async fn markets_for_one_symbol_cost_two() {
    let (gateway, _, _) = gateway(ScriptedHttpClient::new().on(
        HttpMethod::Get,
        "/api/v3/exchangeInfo",
        HttpResponse::ok_json(
            r#"{"serverTime":1700000000000,"symbols":[{"symbol":"BTCUSDT","status":"TRADING",
                "baseAsset":"BTC","quoteAsset":"USDT","filters":[
                {"filterType":"PRICE_FILTER","tickSize":"0.01"},
                {"filterType":"LOT_SIZE","stepSize":"0.00001","minQty":"0.00001"},
                {"filterType":"NOTIONAL","minNotional":"5.00000000"}]}]}"#,
        ),
    ));

    let response = gateway
        .available_markets(MarketsRequest::new(base("markets-1"), Some(symbol("BTC/USDT"))))
        .await
        .expect("no contract violation");

    let markets = response.data.expect("markets");
    assert_eq!(markets.len(), 1);
    assert_eq!(markets[0].price_tick, Some(0.01));
    assert_eq!(markets[0].min_notional, Some(5.0));
    assert_eq!(response.base.processed_when, 1_700_000_000_000);
    assert_eq!(consumed(&gateway), 2);
}

#[tokio::test]
async fn server_time_is_public_and_cheap() {
    let (gateway, _, signer) = gateway(ScriptedHttpClient::new().on(
        HttpMethod::Get,
        "/api/v3/time",
        HttpResponse::ok_json(r#"{"serverTime":1499827319559}"#),
    ));

    let response = gateway
        .server_time(ServerTimeRequest::new(base("time-1")))
        .await
        .expect("no contract violation");

    assert_eq!(response.data.map(|time| time.server_time), Some(1_499_827_319_559));
    assert!(signer.calls().is_empty());
    assert_eq!(consumed(&gateway), 1);
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn unknown_order_on_status_is_order_not_found() {
    let (gateway, _, _) = gateway(ScriptedHttpClient::new().on(
        HttpMethod::Get,
        "/api/v3/order",
        HttpResponse::new(400, r#"{"code":-2013,"msg":"Order does not exist."}"#),
    ));

    let response = gateway
        .order_status(OrderStatusRequest::new(base("status-2"), symbol("BTC/USDT"), "999"))
        .await
        .expect("no contract violation");

    assert!(!response.is_success());
    assert_eq!(response.error_code(), Some(ErrorCode::OrderNotFound));
    assert!(response.base.send_when <= response.base.receive_when);
    assert!(response
        .base
        .error_message
        .as_deref()
        .is_some_and(|message| message.contains("-2013")));
}

#[tokio::test]
async fn private_call_without_signer_fails_as_unauthenticated() {
    // Given: A gateway constructed without a signer
    let transport = Arc::new(ScriptedHttpClient::new());
    let gateway = BinanceGateway::new(support::binance_credentials())
        .expect("valid gateway")
        .with_transport(Arc::clone(&transport) as Arc<dyn ferrogate_core::HttpClient>);

    // When: A private endpoint is called
    let response = gateway
        .balance(BalanceRequest::new(base("balance-2")))
        .await
        .expect("no contract violation");

    // Then: It fails with the permission flag and nothing reaches the wire
    assert_eq!(response.error_code(), Some(ErrorCode::AuthenticationFailed));
    assert!(response.base.is_permission_denied);
    assert!(transport.requests().is_empty());
}
