use crate::model::{DerivedSeries, DrawdownPeriod, SummaryStats};
use chrono::Duration;

/// Aggregates extracted periods together with the latest derived point.
pub fn summarize(derived: &DerivedSeries, periods: &[DrawdownPeriod]) -> SummaryStats {
    let durations: Vec<Duration> = periods.iter().map(|p| p.duration()).collect();

    let average_duration = if durations.is_empty() {
        None
    } else {
        let total: Duration = durations.iter().copied().sum();
        Some(total / durations.len() as i32)
    };

    let deepest = periods
        .iter()
        .min_by(|a, b| a.max_drawdown.total_cmp(&b.max_drawdown));

    let (current_ath, current_drawdown) = derived
        .last()
        .map(|p| (p.ath, p.drawdown))
        .unwrap_or((0.0, 0.0));

    SummaryStats {
        period_count: periods.len(),
        average_duration,
        longest_duration: durations.iter().copied().max(),
        deepest_drawdown: deepest.map(|p| p.max_drawdown).unwrap_or(0.0),
        deepest_start: deepest.map(|p| p.start),
        ongoing: periods.last().is_some_and(|p| p.ongoing),
        current_ath,
        current_drawdown,
    }
}
