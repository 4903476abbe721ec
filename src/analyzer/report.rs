use crate::analyzer::drawdown::{compute_derived, extract_periods};
use crate::analyzer::summary::summarize;
use crate::model::{AnalysisError, DrawdownReport, PriceSeries};

/// Trait defining the interface for a drawdown analyzer.
pub trait Analyzer: Send + Sync {
    /// Derives ATH/drawdown, segments periods and summarizes them in one go.
    fn analyze(&self, series: &PriceSeries, threshold: f64) -> Result<DrawdownReport, AnalysisError>;
}

/// Stateless implementation; safe to share across concurrent symbol tasks.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnalyzerImpl;

impl AnalyzerImpl {
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for AnalyzerImpl {
    fn analyze(&self, series: &PriceSeries, threshold: f64) -> Result<DrawdownReport, AnalysisError> {
        let derived = compute_derived(series, threshold)?;
        let periods = extract_periods(&derived, threshold)?;
        let summary = summarize(&derived, &periods);

        Ok(DrawdownReport {
            derived,
            periods,
            summary,
        })
    }
}
