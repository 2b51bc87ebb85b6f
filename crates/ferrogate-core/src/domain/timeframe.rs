use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Candle bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "3m")]
    ThreeMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
}

impl Timeframe {
    pub const ALL: [Self; 9] = [
        Self::OneMinute,
        Self::ThreeMinutes,
        Self::FiveMinutes,
        Self::FifteenMinutes,
        Self::ThirtyMinutes,
        Self::OneHour,
        Self::FourHours,
        Self::OneDay,
        Self::OneWeek,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::ThreeMinutes => "3m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1h",
            Self::FourHours => "4h",
            Self::OneDay => "1d",
            Self::OneWeek => "1w",
        }
    }

    /// Bucket width in minutes for intraday frames, `None` for day and week.
    pub const fn minutes(self) -> Option<u32> {
        match self {
            Self::OneMinute => Some(1),
            Self::ThreeMinutes => Some(3),
            Self::FiveMinutes => Some(5),
            Self::FifteenMinutes => Some(15),
            Self::ThirtyMinutes => Some(30),
            Self::OneHour => Some(60),
            Self::FourHours => Some(240),
            Self::OneDay | Self::OneWeek => None,
        }
    }
}

impl Display for Timeframe {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|timeframe| timeframe.as_str() == normalized)
            .ok_or(ValidationError::InvalidTimeframe { value: normalized })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timeframe() {
        assert_eq!(Timeframe::from_str("4H"), Ok(Timeframe::FourHours));
        assert_eq!(Timeframe::from_str("1w"), Ok(Timeframe::OneWeek));
    }

    #[test]
    fn rejects_invalid_timeframe() {
        let err = Timeframe::from_str("2h").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidTimeframe { .. }));
    }

    #[test]
    fn intraday_frames_report_minutes() {
        assert_eq!(Timeframe::FourHours.minutes(), Some(240));
        assert_eq!(Timeframe::OneDay.minutes(), None);
    }
}
