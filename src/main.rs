use drawdown_sniper::analyzer::AnalyzerImpl;
use drawdown_sniper::config::{load_config, AppConfig, SymbolConfig};
use drawdown_sniper::fetcher::HttpFetcher;
use drawdown_sniper::model::HistoryRequest;
use drawdown_sniper::notifier::TelegramNotifier;
use drawdown_sniper::parser::ChartParser;
use drawdown_sniper::pipeline::analyze_symbol;
use drawdown_sniper::storage::SqliteStorage;
use drawdown_sniper::utils::format_pct;
use futures::future::join_all;
use rand::Rng;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config: Arc<AppConfig> = match load_config(&config_path) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("Config load error ({}): {}", config_path, e);
            return;
        }
    };

    let fetcher = match HttpFetcher::new(&config.provider.base_url, config.provider.timeout_seconds) {
        Ok(f) => f,
        Err(e) => {
            error!("Failed to build HTTP fetcher: {}", e);
            return;
        }
    };
    let parser = ChartParser::new();
    let analyzer = AnalyzerImpl::new();

    let storage = match SqliteStorage::new(&config.db_path) {
        Ok(s) => Arc::new(Mutex::new(s)),
        Err(e) => {
            error!("Failed to initialize storage: {:?}", e);
            return;
        }
    };

    let refresh_notify = Arc::new(Notify::new());
    let notifier = match TelegramNotifier::new(
        config.telegram_bot_token.clone(),
        config.telegram_chat_id,
        storage.clone(),
        config.clone(),
        refresh_notify.clone(),
    ) {
        Ok(n) => Arc::new(n),
        Err(e) => {
            error!("Failed to initialize notifier: {}", e);
            return;
        }
    };

    TelegramNotifier::spawn_listener(notifier.clone());

    info!("Sending startup message...");
    if let Err(e) = notifier.notify_text("🚀 DrawdownSniper started!").await {
        warn!("Startup notification failed: {:?}", e);
    }

    loop {
        info!("Symbols to process: {}", config.symbols.len());

        let tasks: Vec<_> = config
            .symbols
            .iter()
            .map(|symbol_cfg| {
                process_symbol(
                    symbol_cfg,
                    &fetcher,
                    &parser,
                    &analyzer,
                    storage.clone(),
                    config.clone(),
                    notifier.clone(),
                )
            })
            .collect();
        join_all(tasks).await;

        info!(
            "Waiting for timer ({}s) or manual refresh...",
            config.check_interval_seconds
        );
        tokio::select! {
            _ = sleep(Duration::from_secs(config.check_interval_seconds)) => {
                info!("Timer triggered.");
            }
            _ = refresh_notify.notified() => {
                info!("Manual refresh triggered.");
            }
        }
    }
}

/// Runs the analysis for one symbol, stores the result and alerts on a new open period.
async fn process_symbol(
    symbol_cfg: &SymbolConfig,
    fetcher: &HttpFetcher,
    parser: &ChartParser,
    analyzer: &AnalyzerImpl,
    storage: Arc<Mutex<SqliteStorage>>,
    config: Arc<AppConfig>,
    notifier: Arc<TelegramNotifier>,
) {
    // Spread requests so the provider doesn't see a burst.
    let jitter_ms = rand::rng().random_range(0..=750);
    sleep(Duration::from_millis(jitter_ms)).await;

    let request = HistoryRequest {
        symbol: symbol_cfg.symbol.clone(),
        days: config.provider.days,
        metric: config.provider.metric.clone(),
    };
    let threshold = config.threshold_for(symbol_cfg);

    let report = match analyze_symbol(fetcher, parser, analyzer, &request, threshold).await {
        Ok(r) => r,
        Err(e) => {
            warn!("[{}] Analysis failed: {}", request.symbol, e);
            return;
        }
    };

    {
        let mut guard = storage.lock().await;
        if let Some(prev) = guard.get_stats(&request.symbol).ok().flatten() {
            info!(
                "[{}] Previous: {} period(s), drawdown {} | Updated: {}",
                request.symbol,
                prev.period_count,
                format_pct(prev.current_drawdown),
                prev.last_updated
            );
        }
        if let Err(e) = guard.replace_periods(&request.symbol, &report.periods) {
            warn!("[{}] Period save error: {:?}", request.symbol, e);
        }
        if let Err(e) = guard.update_stats(&request.symbol, &report.summary) {
            warn!("[{}] Stats update failed: {:?}", request.symbol, e);
        }
    }

    match report.current_period() {
        Some(period) => {
            info!(
                "[{}] In drawdown since {} ({})",
                request.symbol,
                period.start.date_naive(),
                format_pct(report.summary.current_drawdown)
            );
            notifier
                .check_and_notify_period(&request.symbol, period, &report.summary)
                .await;
        }
        None => info!("[{}] Not in a drawdown period.", request.symbol),
    }
}
