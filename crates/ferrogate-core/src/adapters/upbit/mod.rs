//! Upbit spot adapter.
//!
//! Upbit limits request counts per second in three independent groups:
//! public quotation, order placement/cancellation, and every other private
//! call. Order bodies travel as JSON; the external signer produces the JWT
//! bearer token from the query string form of the same parameters.

mod converter;
mod parser;
mod weights;

pub use converter::UpbitConverter;
pub use parser::{classify_error, map_order_status, UpbitParser};

use crate::adapters::ExchangeAdapter;
use crate::gateway::{CapabilitySet, Operation};
use crate::weights::WeightTable;
use crate::ExchangeId;

#[derive(Debug, Clone, Copy, Default)]
pub struct UpbitAdapter {
    converter: UpbitConverter,
    parser: UpbitParser,
}

impl ExchangeAdapter for UpbitAdapter {
    type Converter = UpbitConverter;
    type Parser = UpbitParser;

    const EXCHANGE: ExchangeId = ExchangeId::Upbit;
    const REQUIRED_CREDENTIALS: &'static [&'static str] = &["Access key", "Secret key"];

    /// The public REST API has no per-account fill history endpoint.
    fn capabilities() -> CapabilitySet {
        CapabilitySet::full().without(Operation::TradeHistory)
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
