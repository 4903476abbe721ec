// Core structs: price series, derived series, drawdown periods, error types
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// One observation of an asset price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Validated, ascending price history. Cannot be constructed empty, with
/// repeated or decreasing timestamps, or with non-positive prices.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self, AnalysisError> {
        if points.is_empty() {
            return Err(AnalysisError::InvalidInput("price series is empty".into()));
        }

        for (i, point) in points.iter().enumerate() {
            if !point.price.is_finite() || point.price <= 0.0 {
                return Err(AnalysisError::InvalidInput(format!(
                    "non-positive or non-finite price at index {i}: {}",
                    point.price
                )));
            }
            if i > 0 && point.timestamp <= points[i - 1].timestamp {
                return Err(AnalysisError::InvalidInput(format!(
                    "non-monotonic timestamp at index {i}: {} <= {}",
                    point.timestamp,
                    points[i - 1].timestamp
                )));
            }
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> &PricePoint {
        &self.points[0]
    }

    pub fn last(&self) -> &PricePoint {
        &self.points[self.points.len() - 1]
    }
}

/// Running high and relative decline at one point of a [`PriceSeries`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedPoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    /// Running maximum of price up to and including this point.
    pub ath: f64,
    /// `(price - ath) / ath`, always in (-1, 0].
    pub drawdown: f64,
    /// `drawdown <= -threshold` for the series' `threshold`. Informational:
    /// period extraction always re-evaluates it from `drawdown`, so a
    /// hand-built series with flags that disagree is segmented by `drawdown`.
    pub in_drawdown: bool,
}

/// Index-aligned companion of a [`PriceSeries`].
///
/// `drawdown` is the source of truth for segmentation; `in_drawdown` only
/// mirrors it at `threshold`.
#[derive(Debug, Clone)]
pub struct DerivedSeries {
    pub points: Vec<DerivedPoint>,
    /// Threshold the `in_drawdown` flags were evaluated against.
    pub threshold: f64,
}

impl DerivedSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&DerivedPoint> {
        self.points.last()
    }

    /// Points at or after `from`, keeping the ATH accumulated over the full
    /// history. A window can therefore open inside a drawdown.
    pub fn since(&self, from: DateTime<Utc>) -> DerivedSeries {
        DerivedSeries {
            points: self
                .points
                .iter()
                .filter(|p| p.timestamp >= from)
                .copied()
                .collect(),
            threshold: self.threshold,
        }
    }
}

/// One maximal run of points at or below the drawdown threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownPeriod {
    pub start: DateTime<Utc>,
    /// First recovered point, or the final observation when `ongoing`.
    pub end: DateTime<Utc>,
    pub ongoing: bool,
    /// Most negative drawdown inside the run. Never includes the recovery point.
    pub max_drawdown: f64,
    /// Where `max_drawdown` was first reached.
    pub trough: DateTime<Utc>,
    /// ATH in force when the run began.
    pub peak_price: f64,
}

impl DrawdownPeriod {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub period_count: usize,
    pub average_duration: Option<Duration>,
    pub longest_duration: Option<Duration>,
    /// Deepest `max_drawdown` across all periods, 0.0 when there are none.
    pub deepest_drawdown: f64,
    pub deepest_start: Option<DateTime<Utc>>,
    pub ongoing: bool,
    pub current_ath: f64,
    pub current_drawdown: f64,
}

/// Everything the analyzer produces for one series.
#[derive(Debug, Clone)]
pub struct DrawdownReport {
    pub derived: DerivedSeries,
    pub periods: Vec<DrawdownPeriod>,
    pub summary: SummaryStats,
}

impl DrawdownReport {
    pub fn current_period(&self) -> Option<&DrawdownPeriod> {
        self.periods.last().filter(|p| p.ongoing)
    }
}

/// Raw sample as delivered by the chart payload, before cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct HistoryRequest {
    pub symbol: String,
    pub days: u32,
    pub metric: String,
}

/// Persisted per-symbol snapshot of the latest [`SummaryStats`].
#[derive(Debug, Clone)]
pub struct SymbolStats {
    pub symbol: String,
    pub period_count: usize,
    pub deepest_drawdown: f64,
    pub ongoing: bool,
    pub current_drawdown: f64,
    pub current_ath: f64,
    pub average_duration: Option<Duration>,
    pub longest_duration: Option<Duration>,
    pub deepest_start: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(String),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected response status {0}")]
    InvalidResponse(u16),
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("malformed chart payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("metric not present in payload: {0}")]
    MissingMetric(String),
    #[error("invalid sample: {0}")]
    InvalidSample(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("telegram api error: {0}")]
    Api(String),
    #[error("telegram unreachable")]
    Unreachable,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParserError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
    }

    #[test]
    fn price_series_rejects_empty() {
        assert!(matches!(
            PriceSeries::new(vec![]),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn price_series_rejects_non_positive_price() {
        let points = vec![PricePoint::new(day(0), 10.0), PricePoint::new(day(1), 0.0)];
        assert!(PriceSeries::new(points).is_err());

        let points = vec![PricePoint::new(day(0), -1.0)];
        assert!(PriceSeries::new(points).is_err());

        let points = vec![PricePoint::new(day(0), f64::NAN)];
        assert!(PriceSeries::new(points).is_err());
    }

    #[test]
    fn price_series_rejects_duplicate_and_decreasing_timestamps() {
        let dup = vec![PricePoint::new(day(0), 1.0), PricePoint::new(day(0), 2.0)];
        assert!(PriceSeries::new(dup).is_err());

        let back = vec![PricePoint::new(day(1), 1.0), PricePoint::new(day(0), 2.0)];
        assert!(PriceSeries::new(back).is_err());
    }

    #[test]
    fn period_duration_is_end_minus_start() {
        let period = DrawdownPeriod {
            start: day(2),
            end: day(5),
            ongoing: false,
            max_drawdown: -0.3,
            trough: day(3),
            peak_price: 100.0,
        };
        assert_eq!(period.duration(), Duration::days(3));
        assert!(period.contains(day(5)));
        assert!(!period.contains(day(6)));
    }
}
