// ATH / drawdown derivation and drawdown-period segmentation
use crate::model::{AnalysisError, DerivedPoint, DerivedSeries, DrawdownPeriod, PriceSeries};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Checks that `threshold` is a fraction in (0, 1].
pub fn validate_threshold(threshold: f64) -> Result<(), AnalysisError> {
    if !threshold.is_finite() || threshold <= 0.0 || threshold > 1.0 {
        return Err(AnalysisError::InvalidInput(format!(
            "threshold must be in (0, 1], got {threshold}"
        )));
    }
    Ok(())
}

/// Inclusive boundary: a decline of exactly `threshold` counts.
#[inline]
pub fn is_in_drawdown(drawdown: f64, threshold: f64) -> bool {
    drawdown <= -threshold
}

/// Single left-to-right pass accumulating the running maximum.
pub fn compute_derived(series: &PriceSeries, threshold: f64) -> Result<DerivedSeries, AnalysisError> {
    validate_threshold(threshold)?;

    let mut ath = series.first().price;
    let points: Vec<DerivedPoint> = series
        .points()
        .iter()
        .map(|p| {
            ath = ath.max(p.price);
            let drawdown = (p.price - ath) / ath;
            DerivedPoint {
                timestamp: p.timestamp,
                price: p.price,
                ath,
                drawdown,
                in_drawdown: is_in_drawdown(drawdown, threshold),
            }
        })
        .collect();

    debug!("Derived {} points (threshold {})", points.len(), threshold);
    Ok(DerivedSeries { points, threshold })
}

/// Accumulator for the run currently below the threshold.
#[derive(Debug, Clone, Copy)]
struct OpenRun {
    start: DateTime<Utc>,
    peak_price: f64,
    max_drawdown: f64,
    trough: DateTime<Utc>,
}

impl OpenRun {
    fn begin(point: &DerivedPoint) -> Self {
        Self {
            start: point.timestamp,
            peak_price: point.ath,
            max_drawdown: point.drawdown,
            trough: point.timestamp,
        }
    }

    fn observe(&mut self, point: &DerivedPoint) {
        if point.drawdown < self.max_drawdown {
            self.max_drawdown = point.drawdown;
            self.trough = point.timestamp;
        }
    }

    fn close(self, end: DateTime<Utc>, ongoing: bool) -> DrawdownPeriod {
        DrawdownPeriod {
            start: self.start,
            end,
            ongoing,
            max_drawdown: self.max_drawdown,
            trough: self.trough,
            peak_price: self.peak_price,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RunState {
    Normal,
    InDrawdown(OpenRun),
}

/// Segments `derived` into maximal runs with `drawdown <= -threshold`.
///
/// Flags are re-evaluated against `threshold`, so a series derived once can
/// be segmented at several thresholds. A closed period ends on the first
/// recovered point, whose drawdown is excluded from `max_drawdown`. A run
/// still open after the last point is emitted with `ongoing = true` and
/// `end` set to the last timestamp.
pub fn extract_periods(
    derived: &DerivedSeries,
    threshold: f64,
) -> Result<Vec<DrawdownPeriod>, AnalysisError> {
    validate_threshold(threshold)?;

    let mut periods = Vec::new();
    let mut state = RunState::Normal;

    for point in &derived.points {
        let flag = is_in_drawdown(point.drawdown, threshold);
        state = match (state, flag) {
            (RunState::Normal, false) => RunState::Normal,
            (RunState::Normal, true) => RunState::InDrawdown(OpenRun::begin(point)),
            (RunState::InDrawdown(mut run), true) => {
                run.observe(point);
                RunState::InDrawdown(run)
            }
            (RunState::InDrawdown(run), false) => {
                periods.push(run.close(point.timestamp, false));
                RunState::Normal
            }
        };
    }

    if let (RunState::InDrawdown(run), Some(last)) = (state, derived.last()) {
        periods.push(run.close(last.timestamp, true));
    }

    debug!("Extracted {} drawdown periods", periods.len());
    Ok(periods)
}
