//! Binance spot adapter.
//!
//! All REST endpoints share one `REQUEST_WEIGHT` budget; order placement
//! additionally counts against the order-count limit. Signed endpoints carry
//! `timestamp` and `recvWindow` before the external signer appends its
//! `signature`.

mod converter;
mod parser;
mod weights;

pub use converter::BinanceConverter;
pub use parser::{classify_error, map_order_status, BinanceParser};

use crate::adapters::ExchangeAdapter;
use crate::gateway::CapabilitySet;
use crate::weights::WeightTable;
use crate::ExchangeId;

#[derive(Debug, Clone, Copy, Default)]
pub struct BinanceAdapter {
    converter: BinanceConverter,
    parser: BinanceParser,
}

impl ExchangeAdapter for BinanceAdapter {
    type Converter = BinanceConverter;
    type Parser = BinanceParser;

    const EXCHANGE: ExchangeId = ExchangeId::Binance;
    const REQUIRED_CREDENTIALS: &'static [&'static str] = &["API key", "API secret"];

    fn capabilities() -> CapabilitySet {
        CapabilitySet::full()
    }

    fn weight_table() -> WeightTable {
        weights::weight_table()
    }

    fn converter(&self) -> &Self::Converter {
        &self.converter
    }

    fn parser(&self) -> &Self::Parser {
        &self.parser
    }
}
