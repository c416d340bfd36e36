//! Bar (candle) types and the textual bar-type grammar.
//!
//! A bar type is written `{instrument_id}-{step}-{aggregation}-{price_type}-{source}`,
//! for example `BTCUSDT-PERP.BINANCE-1-MINUTE-LAST-EXTERNAL`. Parsing works from
//! the right so instrument symbols may contain `-`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::id::InstrumentId;
use crate::error::ParseError;

/// Time unit a bar aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarAggregation {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl BarAggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Second => "SECOND",
            Self::Minute => "MINUTE",
            Self::Hour => "HOUR",
            Self::Day => "DAY",
            Self::Week => "WEEK",
            Self::Month => "MONTH",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "SECOND" => Self::Second,
            "MINUTE" => Self::Minute,
            "HOUR" => Self::Hour,
            "DAY" => Self::Day,
            "WEEK" => Self::Week,
            "MONTH" => Self::Month,
            _ => return None,
        })
    }
}

/// Which price a bar is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceType {
    Bid,
    Ask,
    Mid,
    Last,
}

impl PriceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bid => "BID",
            Self::Ask => "ASK",
            Self::Mid => "MID",
            Self::Last => "LAST",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "BID" => Self::Bid,
            "ASK" => Self::Ask,
            "MID" => Self::Mid,
            "LAST" => Self::Last,
            _ => return None,
        })
    }
}

/// Whether bars are aggregated by the venue or locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationSource {
    External,
    Internal,
}

impl AggregationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::External => "EXTERNAL",
            Self::Internal => "INTERNAL",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "EXTERNAL" => Self::External,
            "INTERNAL" => Self::Internal,
            _ => return None,
        })
    }
}

/// Aggregation window plus price field, e.g. `1-MINUTE-LAST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BarSpecification {
    pub step: u32,
    pub aggregation: BarAggregation,
    pub price_type: PriceType,
}

impl fmt::Display for BarSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.step,
            self.aggregation.as_str(),
            self.price_type.as_str()
        )
    }
}

/// Identifies one derived bar feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BarType {
    instrument_id: InstrumentId,
    spec: BarSpecification,
    source: AggregationSource,
}

impl BarType {
    pub fn new(instrument_id: InstrumentId, spec: BarSpecification, source: AggregationSource) -> Self {
        Self {
            instrument_id,
            spec,
            source,
        }
    }

    #[must_use]
    pub fn instrument_id(&self) -> &InstrumentId {
        &self.instrument_id
    }

    #[must_use]
    pub fn spec(&self) -> &BarSpecification {
        &self.spec
    }

    #[must_use]
    pub fn source(&self) -> AggregationSource {
        self.source
    }
}

impl FromStr for BarType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason: String| ParseError::BarType {
            input: s.to_string(),
            reason,
        };

        let mut parts = s.rsplitn(5, '-');
        let (Some(source), Some(price_type), Some(aggregation), Some(step), Some(instrument)) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(err(
                "expected INSTRUMENT-STEP-AGGREGATION-PRICE_TYPE-SOURCE".into(),
            ));
        };

        let source = AggregationSource::parse(source)
            .ok_or_else(|| err(format!("unknown aggregation source '{source}'")))?;
        let price_type = PriceType::parse(price_type)
            .ok_or_else(|| err(format!("unknown price type '{price_type}'")))?;
        let aggregation = BarAggregation::parse(aggregation)
            .ok_or_else(|| err(format!("unknown aggregation '{aggregation}'")))?;
        let step: u32 = step
            .parse()
            .map_err(|_| err(format!("step '{step}' is not a positive integer")))?;
        if step == 0 {
            return Err(err("step must be positive".into()));
        }
        let instrument_id: InstrumentId =
            instrument.parse().map_err(|e: ParseError| err(e.to_string()))?;

        Ok(Self::new(
            instrument_id,
            BarSpecification {
                step,
                aggregation,
                price_type,
            },
            source,
        ))
    }
}

impl fmt::Display for BarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.instrument_id, self.spec, self.source.as_str())
    }
}

/// An aggregated price candle for one bar type.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub bar_type: BarType,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    /// Close time of the bar window.
    pub ts_event: DateTime<Utc>,
    /// When the bar was received locally.
    pub ts_init: DateTime<Utc>,
}

impl fmt::Display for Bar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{}",
            self.bar_type,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.ts_event.timestamp_millis()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_perpetual_bar_type() {
        let bar_type: BarType = "BTCUSDT-PERP.BINANCE-1-MINUTE-LAST-EXTERNAL".parse().unwrap();

        assert_eq!(bar_type.instrument_id().symbol(), "BTCUSDT-PERP");
        assert_eq!(bar_type.instrument_id().venue().as_str(), "BINANCE");
        assert_eq!(bar_type.spec().step, 1);
        assert_eq!(bar_type.spec().aggregation, BarAggregation::Minute);
        assert_eq!(bar_type.spec().price_type, PriceType::Last);
        assert_eq!(bar_type.source(), AggregationSource::External);
    }

    #[test]
    fn display_matches_parsed_input() {
        for input in [
            "BTCUSDT-PERP.BINANCE-1-MINUTE-LAST-EXTERNAL",
            "ETHUSDT.BINANCE-4-HOUR-MID-INTERNAL",
            "BTCUSD_PERP.BINANCE-1-WEEK-LAST-EXTERNAL",
        ] {
            let bar_type: BarType = input.parse().unwrap();
            assert_eq!(bar_type.to_string(), input);
        }
    }

    #[test]
    fn rejects_zero_step() {
        let err = "BTCUSDT.BINANCE-0-MINUTE-LAST-EXTERNAL"
            .parse::<BarType>()
            .unwrap_err();
        assert!(err.to_string().contains("step must be positive"));
    }

    #[test]
    fn rejects_unknown_tokens() {
        assert!("BTCUSDT.BINANCE-1-MINUTES-LAST-EXTERNAL".parse::<BarType>().is_err());
        assert!("BTCUSDT.BINANCE-1-MINUTE-CLOSE-EXTERNAL".parse::<BarType>().is_err());
        assert!("BTCUSDT.BINANCE-1-MINUTE-LAST-REMOTE".parse::<BarType>().is_err());
        assert!("BTCUSDT.BINANCE-x-MINUTE-LAST-EXTERNAL".parse::<BarType>().is_err());
    }

    #[test]
    fn rejects_truncated_input() {
        assert!("1-MINUTE-LAST-EXTERNAL".parse::<BarType>().is_err());
        assert!("BTCUSDT-1-MINUTE-LAST-EXTERNAL".parse::<BarType>().is_err());
    }

    #[test]
    fn spec_display_omits_instrument_and_source() {
        let bar_type: BarType = "BTCUSDT-PERP.BINANCE-15-MINUTE-LAST-EXTERNAL".parse().unwrap();
        assert_eq!(bar_type.spec().to_string(), "15-MINUTE-LAST");
    }
}
