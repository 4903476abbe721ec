use crate::model::{AnalysisError, PricePoint, PriceSeries, RawSample};
use tracing::{debug, warn};

/// Cleans raw chart samples into a valid [`PriceSeries`].
///
/// Missing, non-finite and non-positive values are dropped, samples are sorted
/// by timestamp and for repeated timestamps the later sample wins.
pub fn normalize_samples(samples: Vec<RawSample>) -> Result<PriceSeries, AnalysisError> {
    let total = samples.len();

    let mut points: Vec<PricePoint> = samples
        .into_iter()
        .filter_map(|s| match s.value {
            Some(v) if v.is_finite() && v > 0.0 => Some(PricePoint::new(s.timestamp, v)),
            _ => None,
        })
        .collect();

    // Stable sort keeps payload order among equal timestamps.
    points.sort_by_key(|p| p.timestamp);

    let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
    for point in points {
        match deduped.last_mut() {
            Some(prev) if prev.timestamp == point.timestamp => *prev = point,
            _ => deduped.push(point),
        }
    }

    let dropped = total - deduped.len();
    if dropped > 0 {
        warn!("Dropped {} of {} samples during normalization", dropped, total);
    }
    debug!("Normalized series: {} points", deduped.len());

    PriceSeries::new(deduped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
    }

    fn sample(n: i64, value: Option<f64>) -> RawSample {
        RawSample { timestamp: day(n), value }
    }

    #[test]
    fn drops_invalid_values_and_sorts() {
        let series = normalize_samples(vec![
            sample(3, Some(30.0)),
            sample(1, Some(10.0)),
            sample(2, None),
            sample(4, Some(0.0)),
            sample(5, Some(-2.0)),
            sample(6, Some(f64::NAN)),
            sample(0, Some(5.0)),
        ])
        .unwrap();

        let prices: Vec<f64> = series.points().iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![5.0, 10.0, 30.0]);
        assert_eq!(series.first().timestamp, day(0));
        assert_eq!(series.last().timestamp, day(3));
    }

    #[test]
    fn later_duplicate_wins() {
        let series = normalize_samples(vec![
            sample(0, Some(1.0)),
            sample(1, Some(2.0)),
            sample(1, Some(3.0)),
        ])
        .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().price, 3.0);
    }

    #[test]
    fn nothing_usable_is_invalid_input() {
        let result = normalize_samples(vec![sample(0, None), sample(1, Some(0.0))]);
        assert!(matches!(result, Err(AnalysisError::InvalidInput(_))));
    }
}
