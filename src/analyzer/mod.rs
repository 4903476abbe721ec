// Analyzer module: ATH/drawdown derivation, period segmentation and summaries.

pub mod drawdown;
pub mod report;
pub mod summary;

// Re-export the main Analyzer implementation for ease of use.
pub use drawdown::{compute_derived, extract_periods, is_in_drawdown, validate_threshold};
pub use report::{Analyzer, AnalyzerImpl};
pub use summary::summarize;
