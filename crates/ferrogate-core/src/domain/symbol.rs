use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Normalized trading pair, e.g. `BTC/USDT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol {
    base: String,
    quote: String,
}

impl Symbol {
    /// Builds a symbol from separate base and quote tokens.
    pub fn new(base: &str, quote: &str) -> Result<Self, ValidationError> {
        let base = base.trim();
        let quote = quote.trim();
        if base.is_empty() || quote.is_empty() {
            return Err(ValidationError::EmptySymbolToken {
                value: format!("{base}/{quote}"),
            });
        }

        Ok(Self {
            base: base.to_ascii_uppercase(),
            quote: quote.to_ascii_uppercase(),
        })
    }

    /// Parses `BASE/QUOTE` or `BASE-QUOTE` text.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let tokens = input.trim().split(['/', '-']).collect::<Vec<_>>();
        let [base, quote] = tokens.as_slice() else {
            return Err(ValidationError::InvalidSymbolFormat {
                value: input.to_owned(),
            });
        };

        if base.trim().is_empty() || quote.trim().is_empty() {
            return Err(ValidationError::InvalidSymbolFormat {
                value: input.to_owned(),
            });
        }

        Self::new(base, quote)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    pub fn slash(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }

    pub fn dash(&self) -> String {
        format!("{}-{}", self.base, self.quote)
    }

    pub fn compact(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Symbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.slash()
    }
}
