use crate::http_client::HttpMethod;
use crate::weights::{EndpointCost, EndpointSpec, RateCategory, WeightTable, WireParams};
use crate::ExchangeId;

const DEFAULT_DEPTH_LIMIT: u32 = 100;
const ALL_SYMBOLS_TICKER_WEIGHT: u32 = 80;

/// `GET /api/v3/depth` tiers by requested depth.
pub(crate) fn depth_weight(params: &WireParams) -> u32 {
    match params.get_u32("limit").unwrap_or(DEFAULT_DEPTH_LIMIT) {
        0..=100 => 5,
        101..=500 => 25,
        501..=1000 => 50,
        _ => 250,
    }
}

/// `GET /api/v3/ticker/24hr`: two per symbol, capped at the all-symbols weight.
pub(crate) fn ticker_weight(params: &WireParams) -> u32 {
    if params.contains("symbol") {
        return 2;
    }

    let count = params
        .get("symbols")
        .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
        .map_or(0, |symbols| symbols.len());

    if count == 0 {
        ALL_SYMBOLS_TICKER_WEIGHT
    } else {
        u32::try_from(count)
            .unwrap_or(u32::MAX)
            .saturating_mul(2)
            .min(ALL_SYMBOLS_TICKER_WEIGHT)
    }
}

pub(crate) fn open_orders_weight(params: &WireParams) -> u32 {
    if params.contains("symbol") {
        6
    } else {
        80
    }
}

pub(crate) fn exchange_info_weight(params: &WireParams) -> u32 {
    if params.contains("symbol") || params.contains("symbols") {
        2
    } else {
        20
    }
}

pub(crate) fn weight_table() -> WeightTable {
    use EndpointCost::{Parametric, Static};
    use HttpMethod::{Delete, Get, Post};
    use RateCategory::RequestWeight;

    WeightTable::new(ExchangeId::Binance)
        .register(
            Post,
            "/api/v3/order",
            EndpointSpec::signed(RequestWeight, Static(1)).order(),
        )
        .register(
            Delete,
            "/api/v3/order",
            EndpointSpec::signed(RequestWeight, Static(1)),
        )
        .register(
            Get,
            "/api/v3/order",
            EndpointSpec::signed(RequestWeight, Static(4)),
        )
        .register(
            Get,
            "/api/v3/openOrders",
            EndpointSpec::signed(RequestWeight, Parametric(open_orders_weight)),
        )
        .register(
            Get,
            "/api/v3/account",
            EndpointSpec::signed(RequestWeight, Static(20)),
        )
        .register(
            Get,
            "/api/v3/myTrades",
            EndpointSpec::signed(RequestWeight, Static(20)),
        )
        .register(
            Get,
            "/api/v3/ticker/24hr",
            EndpointSpec::public(RequestWeight, Parametric(ticker_weight)),
        )
        .register(
            Get,
            "/api/v3/depth",
            EndpointSpec::public(RequestWeight, Parametric(depth_weight)),
        )
        .register(
            Get,
            "/api/v3/klines",
            EndpointSpec::public(RequestWeight, Static(2)),
        )
        .register(
            Get,
            "/api/v3/exchangeInfo",
            EndpointSpec::public(RequestWeight, Parametric(exchange_info_weight)),
        )
        .register(
            Get,
            "/api/v3/time",
            EndpointSpec::public(RequestWeight, Static(1)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(value: u32) -> WireParams {
        WireParams::new()
            .with("symbol", "BTCUSDT")
            .with("limit", value.to_string())
    }

    #[test]
    fn depth_weight_follows_limit_tiers() {
        assert_eq!(depth_weight(&WireParams::new().with("symbol", "BTCUSDT")), 5);
        assert_eq!(depth_weight(&limit(100)), 5);
        assert_eq!(depth_weight(&limit(101)), 25);
        assert_eq!(depth_weight(&limit(500)), 25);
        assert_eq!(depth_weight(&limit(1000)), 50);
        assert_eq!(depth_weight(&limit(5000)), 250);
        assert_eq!(depth_weight(&limit(6000)), 250);
    }

    #[test]
    fn ticker_weight_scales_with_symbol_count() {
        let symbols = |n: usize| {
            let list = (0..n).map(|i| format!("\"S{i}USDT\"")).collect::<Vec<_>>();
            WireParams::new().with("symbols", format!("[{}]", list.join(",")))
        };

        assert_eq!(ticker_weight(&WireParams::new().with("symbol", "BTCUSDT")), 2);
        assert_eq!(ticker_weight(&symbols(20)), 40);
        assert_eq!(ticker_weight(&symbols(100)), 80);
        assert_eq!(ticker_weight(&symbols(150)), 80);
        assert_eq!(ticker_weight(&WireParams::new()), 80);
    }

    #[test]
    fn symbol_scoped_queries_are_cheaper() {
        let scoped = WireParams::new().with("symbol", "BTCUSDT");
        assert_eq!(open_orders_weight(&scoped), 6);
        assert_eq!(open_orders_weight(&WireParams::new()), 80);
        assert_eq!(exchange_info_weight(&scoped), 2);
        assert_eq!(exchange_info_weight(&WireParams::new()), 20);
    }

    #[test]
    fn table_marks_only_order_placement_as_order_count() {
        let table = weight_table();
        let post = table
            .lookup(HttpMethod::Post, "/api/v3/order")
            .expect("registered");
        assert!(post.counts_as_order);
        assert!(post.signed);

        let account = table
            .lookup(HttpMethod::Get, "/api/v3/account")
            .expect("registered");
        assert!(!account.counts_as_order);
        assert_eq!(account.cost.cost(&WireParams::new()), 20);

        assert!(table.lookup(HttpMethod::Get, "/api/v3/unknown").is_err());
    }
}
