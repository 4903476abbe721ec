//! Drawdown watcher: running all-time highs, drawdowns and drawdown periods
//! over price histories, plus the polling service that fetches, stores and
//! alerts on them.

pub mod analyzer;
pub mod config;
pub mod fetcher;
pub mod model;
pub mod normalizer;
pub mod notifier;
pub mod parser;
pub mod pipeline;
pub mod storage;
pub mod utils;
