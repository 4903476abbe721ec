// notifier/telegram/command_handler.rs

use crate::notifier::telegram::TelegramNotifier;
use crate::notifier::telegram::sender::fit_lines;
use crate::utils::{format_days, format_pct};
use tracing::{info, warn};

const HELP: &str = "📋 Available commands:\n\
    /ping — check connection\n\
    /status — watcher status\n\
    /help — command list\n\
    /summary — drawdown summary per symbol\n\
    /periods <SYMBOL> — drawdown periods of a symbol\n\
    /config — current configuration\n\
    /refresh — run the check now\n\
    /uptime — service uptime";

/// Computes the reply for a chat command. Side effects (refresh) happen here too.
pub async fn reply_for(command_text: &str, notifier: &TelegramNotifier) -> String {
    let mut parts = command_text.split_whitespace();
    // "/periods@MyBot ACME" -> "/periods"
    let command = parts
        .next()
        .map(|c| c.split('@').next().unwrap_or(c))
        .unwrap_or("");
    let arg = parts.next();

    match command {
        "/ping" => "✅ I am online!".to_string(),
        "/status" => format!(
            "📊 Watching {} symbol(s), checking every {}s.",
            notifier.config.symbols.len(),
            notifier.config.check_interval_seconds
        ),
        "/help" | "/start" => HELP.to_string(),
        "/refresh" => {
            info!("/refresh command received, triggering refresh...");
            notifier.refresh_notify.notify_one();
            "🔄 Check triggered.".to_string()
        }
        "/uptime" => {
            let uptime = notifier.start_time.elapsed();
            format!(
                "⏱ Uptime: {:02}:{:02}:{:02}",
                uptime.as_secs() / 3600,
                (uptime.as_secs() % 3600) / 60,
                uptime.as_secs() % 60
            )
        }
        "/config" => {
            let mut msg = String::from("⚙️ Watched symbols:\n");
            for symbol in &notifier.config.symbols {
                msg.push_str(&format!(
                    "🔸 {} — threshold {}\n",
                    symbol.symbol,
                    format_pct(notifier.config.threshold_for(symbol))
                ));
            }
            msg
        }
        "/summary" => match notifier.storage.lock().await.get_all_stats() {
            Ok(stats) if !stats.is_empty() => {
                let lines: Vec<String> = stats
                    .iter()
                    .map(|s| {
                        format!(
                            "{} {} — now {} (ATH {:.2}), {} period(s), avg {}, deepest {}\n",
                            if s.ongoing { "🔴" } else { "🟢" },
                            s.symbol,
                            format_pct(s.current_drawdown),
                            s.current_ath,
                            s.period_count,
                            s.average_duration.map(format_days).unwrap_or_else(|| "n/a".into()),
                            format_pct(s.deepest_drawdown),
                        )
                    })
                    .collect();
                fit_lines("📊 Drawdown summary:\n".to_string(), lines)
            }
            Ok(_) => "📭 No symbols analyzed yet.".to_string(),
            Err(e) => format!("❌ Error: {}", e),
        },
        "/periods" => {
            let Some(arg) = arg else {
                return "ℹ️ Usage: /periods <SYMBOL>".to_string();
            };
            let symbol = notifier
                .config
                .symbols
                .iter()
                .find(|s| s.symbol.eq_ignore_ascii_case(arg))
                .map(|s| s.symbol.clone())
                .unwrap_or_else(|| arg.to_uppercase());
            match notifier.storage.lock().await.get_periods(&symbol) {
                Ok(periods) if !periods.is_empty() => {
                    // Newest first so the most relevant periods survive the length cap.
                    let lines: Vec<String> = periods
                        .iter()
                        .enumerate()
                        .rev()
                        .map(|(i, p)| {
                            format!(
                                "{}. {} → {}{} | {} | max {}\n",
                                i + 1,
                                p.start.date_naive(),
                                p.end.date_naive(),
                                if p.ongoing { " (ongoing)" } else { "" },
                                format_days(p.duration()),
                                format_pct(p.max_drawdown),
                            )
                        })
                        .collect();
                    fit_lines(format!("📉 Drawdown periods for {} (newest first):\n", symbol), lines)
                }
                Ok(_) => format!("📭 No drawdown periods stored for {}.", symbol),
                Err(e) => format!("❌ Error: {}", e),
            }
        }
        _ => "🤖 Unknown command. Type /help for a list of commands.".to_string(),
    }
}

/// Handles an incoming command and sends the reply back to the chat.
pub async fn handle_command(command_text: &str, notifier: &TelegramNotifier) {
    info!("Handling command: {}", command_text);
    let reply = reply_for(command_text, notifier).await;
    if let Err(e) = notifier.notify_text(&reply).await {
        warn!("{} reply error: {:?}", command_text, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::model::{DrawdownPeriod, SummaryStats};
    use crate::notifier::telegram::sender::MAX_MESSAGE_LEN;
    use crate::storage::SqliteStorage;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;
    use tokio::sync::{Mutex, Notify};

    fn notifier() -> TelegramNotifier {
        let config = parse_config(
            r#"{
                "telegram_bot_token": "t",
                "telegram_chat_id": 42,
                "check_interval_seconds": 600,
                "provider": { "base_url": "https://charts.example.com" },
                "symbols": [{"symbol": "ACME", "threshold": 0.2}]
            }"#,
        )
        .unwrap();
        TelegramNotifier::new(
            "t".into(),
            42,
            Arc::new(Mutex::new(SqliteStorage::in_memory().unwrap())),
            Arc::new(config),
            Arc::new(Notify::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn periods_command_lists_stored_periods() {
        let n = notifier();
        let start = Utc.with_ymd_and_hms(2008, 9, 15, 0, 0, 0).unwrap();
        let period = DrawdownPeriod {
            start,
            end: start + Duration::days(10),
            ongoing: true,
            max_drawdown: -0.5,
            trough: start + Duration::days(5),
            peak_price: 100.0,
        };
        n.storage.lock().await.replace_periods("ACME", &[period]).unwrap();

        let reply = reply_for("/periods ACME", &n).await;
        assert!(reply.contains("2008-09-15 → 2008-09-25 (ongoing)"));
        assert!(reply.contains("10 days"));
        assert!(reply.contains("-50.00%"));

        assert!(reply_for("/periods@SomeBot NONE", &n).await.contains("No drawdown periods"));
        assert!(reply_for("/periods", &n).await.contains("Usage"));
    }

    #[tokio::test]
    async fn periods_argument_is_case_insensitive() {
        let n = notifier();
        let start = Utc.with_ymd_and_hms(2020, 3, 1, 0, 0, 0).unwrap();
        let period = DrawdownPeriod {
            start,
            end: start + Duration::days(3),
            ongoing: false,
            max_drawdown: -0.3,
            trough: start + Duration::days(1),
            peak_price: 100.0,
        };
        n.storage.lock().await.replace_periods("ACME", &[period]).unwrap();

        for arg in ["acme", "Acme", "ACME"] {
            let reply = reply_for(&format!("/periods {}", arg), &n).await;
            assert!(reply.contains("Drawdown periods for ACME"), "{arg}: {reply}");
        }
    }

    #[tokio::test]
    async fn long_period_list_fits_one_message() {
        let n = notifier();
        let base = Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap();
        let periods: Vec<DrawdownPeriod> = (0..300)
            .map(|i| {
                let start = base + Duration::days(i * 10);
                DrawdownPeriod {
                    start,
                    end: start + Duration::days(5),
                    ongoing: false,
                    max_drawdown: -0.3,
                    trough: start + Duration::days(2),
                    peak_price: 100.0,
                }
            })
            .collect();
        n.storage.lock().await.replace_periods("ACME", &periods).unwrap();

        let reply = reply_for("/periods ACME", &n).await;
        assert!(reply.encode_utf16().count() <= MAX_MESSAGE_LEN);
        assert!(reply.contains("more"));
        // Newest period comes first and survives the cut.
        assert!(reply.contains("300. "));
        assert!(!reply.contains("\n1. "));
    }

    #[tokio::test]
    async fn summary_shows_average_duration() {
        let n = notifier();
        let stats = SummaryStats {
            period_count: 2,
            average_duration: Some(Duration::days(12)),
            longest_duration: Some(Duration::days(20)),
            deepest_drawdown: -0.4,
            deepest_start: Some(Utc.with_ymd_and_hms(2020, 3, 1, 0, 0, 0).unwrap()),
            ongoing: false,
            current_ath: 120.0,
            current_drawdown: -0.05,
        };
        n.storage.lock().await.update_stats("ACME", &stats).unwrap();

        let reply = reply_for("/summary", &n).await;
        assert!(reply.contains("ACME"));
        assert!(reply.contains("avg 12 days"));
        assert!(reply.contains("deepest -40.00%"));
    }

    #[tokio::test]
    async fn config_and_unknown_commands() {
        let n = notifier();
        assert!(reply_for("/config", &n).await.contains("ACME — threshold 20.00%"));
        assert!(reply_for("/summary", &n).await.contains("No symbols"));
        assert!(reply_for("hello", &n).await.contains("Unknown command"));
    }

    #[tokio::test]
    async fn refresh_wakes_the_main_loop() {
        let n = notifier();
        reply_for("/refresh", &n).await;
        // notify_one stores a permit when nobody is waiting yet.
        tokio::time::timeout(std::time::Duration::from_secs(1), n.refresh_notify.notified())
            .await
            .expect("refresh permit");
    }
}
