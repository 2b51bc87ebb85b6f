//! Endpoint weight tables.
//!
//! Every (method, path) pair an adapter may call is registered once at
//! gateway construction with its rate category and cost. Costs are either
//! static or a pure function of the wire parameters. Looking up an
//! unregistered pair is a programming error and fails immediately with
//! [`GatewayError::UnknownEndpoint`].

use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::http_client::HttpMethod;
use crate::{ExchangeId, GatewayError};

/// Exchange-defined group of endpoints sharing one quota window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateCategory {
    /// Binance's per-IP request weight.
    RequestWeight,
    Quotation,
    ExchangeOrder,
    ExchangeNonOrder,
}

impl RateCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequestWeight => "REQUEST_WEIGHT",
            Self::Quotation => "QUOTATION",
            Self::ExchangeOrder => "EXCHANGE_ORDER",
            Self::ExchangeNonOrder => "EXCHANGE_NON_ORDER",
        }
    }
}

impl Display for RateCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered wire parameters of one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireParams(Vec<(String, String)>);

impl WireParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    pub fn with_opt(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Percent-encoded `a=1&b=2` form, in insertion order.
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|(key, value)| {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parses a numeric parameter, `None` when absent or not a number.
    pub fn get_u32(&self, name: &str) -> Option<u32> {
        self.get(name)?.trim().parse().ok()
    }
}

/// Cost of one call against its category budget.
#[derive(Debug, Clone, Copy)]
pub enum EndpointCost {
    Static(u32),
    Parametric(fn(&WireParams) -> u32),
}

impl EndpointCost {
    pub fn cost(&self, params: &WireParams) -> u32 {
        match self {
            Self::Static(cost) => *cost,
            Self::Parametric(cost_fn) => cost_fn(params),
        }
    }
}

/// Registered metadata for one endpoint.
#[derive(Debug, Clone, Copy)]
pub struct EndpointSpec {
    pub category: RateCategory,
    pub cost: EndpointCost,
    /// Requires a signature from the external signer.
    pub signed: bool,
    /// Also counts against the exchange's order-count limit.
    pub counts_as_order: bool,
}

impl EndpointSpec {
    pub const fn public(category: RateCategory, cost: EndpointCost) -> Self {
        Self {
            category,
            cost,
            signed: false,
            counts_as_order: false,
        }
    }

    pub const fn signed(category: RateCategory, cost: EndpointCost) -> Self {
        Self {
            category,
            cost,
            signed: true,
            counts_as_order: false,
        }
    }

    pub const fn order(mut self) -> Self {
        self.counts_as_order = true;
        self
    }
}

/// Static endpoint table of one exchange.
#[derive(Debug, Clone)]
pub struct WeightTable {
    exchange: ExchangeId,
    exact: HashMap<HttpMethod, HashMap<&'static str, EndpointSpec>>,
    prefixes: Vec<(HttpMethod, &'static str, EndpointSpec)>,
}

impl WeightTable {
    pub fn new(exchange: ExchangeId) -> Self {
        Self {
            exchange,
            exact: HashMap::new(),
            prefixes: Vec::new(),
        }
    }

    /// Registers an endpoint. A path ending in `/*` matches every sub-path.
    pub fn register(mut self, method: HttpMethod, path: &'static str, spec: EndpointSpec) -> Self {
        match path.strip_suffix('*') {
            Some(prefix) => self.prefixes.push((method, prefix, spec)),
            None => {
                self.exact.entry(method).or_default().insert(path, spec);
            }
        }
        self
    }

    pub const fn exchange(&self) -> ExchangeId {
        self.exchange
    }

    pub fn lookup(&self, method: HttpMethod, path: &str) -> Result<&EndpointSpec, GatewayError> {
        if let Some(spec) = self.exact.get(&method).and_then(|paths| paths.get(path)) {
            return Ok(spec);
        }

        self.prefixes
            .iter()
            .filter(|(prefix_method, prefix, _)| {
                *prefix_method == method && path.starts_with(prefix) && path.len() > prefix.len()
            })
            .max_by_key(|(_, prefix, _)| prefix.len())
            .map(|(_, _, spec)| spec)
            .ok_or_else(|| GatewayError::UnknownEndpoint {
                exchange: self.exchange,
                method: method.as_str(),
                path: path.to_owned(),
            })
    }

    pub fn category(&self, method: HttpMethod, path: &str) -> Result<RateCategory, GatewayError> {
        self.lookup(method, path).map(|spec| spec.category)
    }

    pub fn cost(
        &self,
        method: HttpMethod,
        path: &str,
        params: &WireParams,
    ) -> Result<u32, GatewayError> {
        self.lookup(method, path).map(|spec| spec.cost.cost(params))
    }

    /// Every category referenced by the table.
    pub fn categories(&self) -> BTreeSet<RateCategory> {
        self.exact
            .values()
            .flat_map(HashMap::values)
            .chain(self.prefixes.iter().map(|(_, _, spec)| spec))
            .map(|spec| spec.category)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubled_limit(params: &WireParams) -> u32 {
        params.get_u32("limit").unwrap_or(1) * 2
    }

    fn table() -> WeightTable {
        WeightTable::new(ExchangeId::Upbit)
            .register(
                HttpMethod::Get,
                "/v1/market/all",
                EndpointSpec::public(RateCategory::Quotation, EndpointCost::Static(1)),
            )
            .register(
                HttpMethod::Get,
                "/v1/candles/*",
                EndpointSpec::public(
                    RateCategory::Quotation,
                    EndpointCost::Parametric(doubled_limit),
                ),
            )
    }

    #[test]
    fn exact_and_prefix_lookups_resolve() {
        let table = table();
        assert_eq!(
            table.category(HttpMethod::Get, "/v1/market/all"),
            Ok(RateCategory::Quotation)
        );
        let params = WireParams::new().with("limit", "3");
        assert_eq!(
            table.cost(HttpMethod::Get, "/v1/candles/minutes/5", &params),
            Ok(6)
        );
    }

    #[test]
    fn unknown_pairs_fail_lookup() {
        let table = table();
        let err = table
            .lookup(HttpMethod::Post, "/v1/market/all")
            .expect_err("method mismatch");
        assert!(matches!(err, GatewayError::UnknownEndpoint { .. }));
        assert!(table.lookup(HttpMethod::Get, "/v1/candles/").is_err());
        assert!(table.lookup(HttpMethod::Get, "/v2/nothing").is_err());
    }

    #[test]
    fn lookup_accepts_runtime_built_paths() {
        let table = table();
        let path = format!("/v1/{}/{}", "market", "all");
        let spec = table.lookup(HttpMethod::Get, &path).expect("registered");
        assert_eq!(spec.category, RateCategory::Quotation);
        assert_eq!(spec.cost.cost(&WireParams::new()), 1);
        assert_eq!(table.categories().into_iter().collect::<Vec<_>>(), vec![RateCategory::Quotation]);
    }

    #[test]
    fn params_encode_in_order_with_escaping() {
        let params = WireParams::new()
            .with("symbols", "[\"BTCUSDT\"]")
            .with("limit", "5");
        assert_eq!(params.encode(), "symbols=%5B%22BTCUSDT%22%5D&limit=5");
    }
}
