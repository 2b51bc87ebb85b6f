use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ExchangeId, Symbol, Timeframe, ValidationError};

/// Broad market family an address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    Crypto,
    Stock,
    Forex,
}

impl Archetype {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Crypto => "crypto",
            Self::Stock => "stock",
            Self::Forex => "forex",
        }
    }
}

impl FromStr for Archetype {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "crypto" => Ok(Self::Crypto),
            "stock" => Ok(Self::Stock),
            "forex" => Ok(Self::Forex),
            other => Err(ValidationError::InvalidArchetype {
                value: other.to_owned(),
            }),
        }
    }
}

/// Settlement style of the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Spot,
    Margin,
    Futures,
}

impl TradeType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spot => "spot",
            Self::Margin => "margin",
            Self::Futures => "futures",
        }
    }
}

impl FromStr for TradeType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "spot" => Ok(Self::Spot),
            "margin" => Ok(Self::Margin),
            "futures" => Ok(Self::Futures),
            other => Err(ValidationError::InvalidTradeType {
                value: other.to_owned(),
            }),
        }
    }
}

/// Canonical identity of one tradable market instance.
///
/// Rendered as `archetype.exchange.trade_type.BASE.QUOTE.timeframe`, for
/// example `crypto.upbit.spot.BTC.KRW.1m`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockAddress {
    archetype: Archetype,
    exchange: ExchangeId,
    trade_type: TradeType,
    symbol: Symbol,
    timeframe: Timeframe,
}

impl StockAddress {
    pub fn new(
        archetype: Archetype,
        exchange: ExchangeId,
        trade_type: TradeType,
        symbol: Symbol,
        timeframe: Timeframe,
    ) -> Self {
        Self {
            archetype,
            exchange,
            trade_type,
            symbol,
            timeframe,
        }
    }

    /// Shorthand for the common crypto spot case.
    pub fn crypto_spot(exchange: ExchangeId, symbol: Symbol, timeframe: Timeframe) -> Self {
        Self::new(
            Archetype::Crypto,
            exchange,
            TradeType::Spot,
            symbol,
            timeframe,
        )
    }

    pub const fn archetype(&self) -> Archetype {
        self.archetype
    }

    pub const fn exchange(&self) -> ExchangeId {
        self.exchange
    }

    pub const fn trade_type(&self) -> TradeType {
        self.trade_type
    }

    pub fn base(&self) -> &str {
        self.symbol.base()
    }

    pub fn quote(&self) -> &str {
        self.symbol.quote()
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub const fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn wire_symbol(&self) -> String {
        self.exchange.wire_symbol(&self.symbol)
    }
}

impl Display for StockAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}.{}.{}",
            self.archetype.as_str(),
            self.exchange,
            self.trade_type.as_str(),
            self.symbol.base(),
            self.symbol.quote(),
            self.timeframe
        )
    }
}

impl FromStr for StockAddress {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts = value.trim().split('.').collect::<Vec<_>>();
        let [archetype, exchange, trade_type, base, quote, timeframe] = parts.as_slice() else {
            return Err(ValidationError::InvalidStockAddress {
                value: value.to_owned(),
            });
        };

        Ok(Self {
            archetype: archetype.parse()?,
            exchange: exchange.parse()?,
            trade_type: trade_type.parse()?,
            symbol: Symbol::new(base, quote)?,
            timeframe: timeframe.parse()?,
        })
    }
}
