use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Symbol, ValidationError};

/// Quote assets recognized when splitting concatenated Binance symbols.
/// Longer suffixes come first so `FDUSD` wins over `USD`-style overlaps.
const BINANCE_QUOTE_ASSETS: [&str; 31] = [
    "FDUSD", "USDT", "BUSD", "USDC", "TUSD", "USDP", "DAI", "AEUR", "EURI", "BTC", "ETH", "BNB",
    "XRP", "DOGE", "TRX", "EUR", "GBP", "AUD", "TRY", "BRL", "JPY", "MXN", "PLN", "ZAR", "UAH",
    "ARS", "COP", "CZK", "RON", "IDR", "BIDR",
];

/// Canonical exchange identifiers used to key gateways and adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeId {
    Binance,
    Upbit,
}

impl ExchangeId {
    pub const ALL: [Self; 2] = [Self::Binance, Self::Upbit];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Binance => "binance",
            Self::Upbit => "upbit",
        }
    }

    /// Renders a symbol in this exchange's wire format.
    ///
    /// Binance concatenates base then quote (`BTCUSDT`); Upbit hyphenates
    /// quote then base (`KRW-BTC`).
    pub fn wire_symbol(self, symbol: &Symbol) -> String {
        match self {
            Self::Binance => symbol.compact(),
            Self::Upbit => format!("{}-{}", symbol.quote(), symbol.base()),
        }
    }

    /// Inverse of [`ExchangeId::wire_symbol`].
    pub fn parse_wire_symbol(self, value: &str) -> Result<Symbol, ValidationError> {
        match self {
            Self::Binance => {
                let upper = value.trim().to_ascii_uppercase();
                // Longest suffix wins: `BTCBIDR` is BTC/BIDR, not BTCB/IDR.
                BINANCE_QUOTE_ASSETS
                    .iter()
                    .filter(|quote| upper.len() > quote.len() && upper.ends_with(*quote))
                    .max_by_key(|quote| quote.len())
                    .map(|quote| Symbol::new(&upper[..upper.len() - quote.len()], *quote))
                    .unwrap_or_else(|| {
                        Err(ValidationError::UnknownWireSymbol {
                            value: value.to_owned(),
                            exchange: self,
                        })
                    })
            }
            Self::Upbit => {
                let (quote, base) =
                    value
                        .split_once('-')
                        .ok_or_else(|| ValidationError::UnknownWireSymbol {
                            value: value.to_owned(),
                            exchange: self,
                        })?;
                Symbol::new(base, quote)
            }
        }
    }
}

impl Display for ExchangeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "binance" => Ok(Self::Binance),
            "upbit" => Ok(Self::Upbit),
            other => Err(ValidationError::InvalidExchange {
                value: other.to_owned(),
            }),
        }
    }
}
