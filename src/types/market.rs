use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Anything stored in a time series keyed by a millisecond timestamp.
pub trait Timestamped {
    fn time_ms(&self) -> i64;
}

/// A single close price at a point in time.
///
/// Series are expected to be sorted ascending by `time` with positive prices;
/// filtering duplicates and bad prints is the caller's job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandlePoint {
    /// Timestamp (ms)
    pub time: i64,
    pub price: f64,
}

impl CandlePoint {
    pub fn new(time: i64, price: f64) -> Self {
        Self { time, price }
    }

    /// Timestamp as a UTC datetime, if representable.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.time)
    }
}

impl Timestamped for CandlePoint {
    fn time_ms(&self) -> i64 {
        self.time
    }
}

/// A perpetual funding observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingPoint {
    /// Timestamp (ms)
    pub time: i64,
    /// Funding rate as a decimal; > 0 means longs pay shorts
    pub funding_rate: f64,
    /// Perp premium over index as a decimal
    #[serde(default)]
    pub premium: f64,
}

impl FundingPoint {
    pub fn new(time: i64, funding_rate: f64, premium: f64) -> Self {
        Self {
            time,
            funding_rate,
            premium,
        }
    }
}

impl Timestamped for FundingPoint {
    fn time_ms(&self) -> i64 {
        self.time
    }
}

/// Candles plus optional funding, as read from a data file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketData {
    pub candles: Vec<CandlePoint>,
    #[serde(default)]
    pub funding: Vec<FundingPoint>,
}

impl MarketData {
    /// Parse `{"candles": [...], "funding": [...]}` and check ordering.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let data: MarketData = serde_json::from_str(json)?;
        data.check_sorted()?;
        Ok(data)
    }

    /// Read and parse a JSON data file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    fn check_sorted(&self) -> Result<()> {
        if let Some(i) = first_unsorted(&self.candles) {
            return Err(AppError::InvalidData(format!(
                "candles not strictly ascending at index {}",
                i
            )));
        }
        if let Some(i) = first_unsorted(&self.funding) {
            return Err(AppError::InvalidData(format!(
                "funding not strictly ascending at index {}",
                i
            )));
        }
        Ok(())
    }
}

fn first_unsorted<T: Timestamped>(points: &[T]) -> Option<usize> {
    points
        .windows(2)
        .position(|w| w[1].time_ms() <= w[0].time_ms())
        .map(|i| i + 1)
}

/// Sampling interval of a cached series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeriesInterval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "8h")]
    EightHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl SeriesInterval {
    /// Parse from the short exchange notation ("1m", "1h", ...).
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "1m" => Some(SeriesInterval::OneMinute),
            "5m" => Some(SeriesInterval::FiveMinutes),
            "15m" => Some(SeriesInterval::FifteenMinutes),
            "1h" => Some(SeriesInterval::OneHour),
            "4h" => Some(SeriesInterval::FourHours),
            "8h" => Some(SeriesInterval::EightHours),
            "1d" => Some(SeriesInterval::OneDay),
            _ => None,
        }
    }

    /// Interval length in milliseconds.
    pub fn millis(&self) -> i64 {
        match self {
            SeriesInterval::OneMinute => 60_000,
            SeriesInterval::FiveMinutes => 300_000,
            SeriesInterval::FifteenMinutes => 900_000,
            SeriesInterval::OneHour => 3_600_000,
            SeriesInterval::FourHours => 14_400_000,
            SeriesInterval::EightHours => 28_800_000,
            SeriesInterval::OneDay => 86_400_000,
        }
    }
}

impl std::fmt::Display for SeriesInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SeriesInterval::OneMinute => "1m",
            SeriesInterval::FiveMinutes => "5m",
            SeriesInterval::FifteenMinutes => "15m",
            SeriesInterval::OneHour => "1h",
            SeriesInterval::FourHours => "4h",
            SeriesInterval::EightHours => "8h",
            SeriesInterval::OneDay => "1d",
        };
        write!(f, "{}", s)
    }
}
