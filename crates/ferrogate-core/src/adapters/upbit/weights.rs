use crate::http_client::HttpMethod;
use crate::weights::{EndpointCost, EndpointSpec, RateCategory, WeightTable};
use crate::ExchangeId;

/// Upbit counts requests, not weight: every call costs one.
pub(crate) fn weight_table() -> WeightTable {
    use HttpMethod::{Delete, Get, Post};
    use RateCategory::{ExchangeNonOrder, ExchangeOrder, Quotation};

    let quotation = EndpointSpec::public(Quotation, EndpointCost::Static(1));
    let order = EndpointSpec::signed(ExchangeOrder, EndpointCost::Static(1));
    let non_order = EndpointSpec::signed(ExchangeNonOrder, EndpointCost::Static(1));

    WeightTable::new(ExchangeId::Upbit)
        .register(Get, "/v1/market/all", quotation)
        .register(Get, "/v1/ticker", quotation)
        .register(Get, "/v1/orderbook", quotation)
        .register(Get, "/v1/trades/ticks", quotation)
        .register(Get, "/v1/candles/*", quotation)
        .register(Post, "/v1/orders", order)
        .register(Delete, "/v1/order", order)
        .register(Get, "/v1/accounts", non_order)
        .register(Get, "/v1/order", non_order)
        .register(Get, "/v1/orders", non_order)
        .register(Get, "/v1/orders/chance", non_order)
        .register(Get, "/v1/deposits", non_order)
        .register(Get, "/v1/withdraws", non_order)
}
