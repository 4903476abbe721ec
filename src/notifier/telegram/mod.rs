pub mod command_handler;
pub mod listener;
pub mod sender;

use crate::config::AppConfig;
use crate::model::{DrawdownPeriod, NotifyError, SummaryStats};
use crate::storage::SqliteStorage;
use reqwest::Client;
use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::time::Instant;
use tokio::sync::{Mutex, Notify};
use tracing::{info, warn};

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Result of [`TelegramNotifier::check_and_notify_period`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    Sent,
    AlreadySent,
    Failed,
}

pub struct TelegramNotifier {
    pub api_base: String,
    pub bot_token: String,
    pub chat_id: i64,
    pub client: Client,
    pub offset: Arc<AtomicI64>,
    pub storage: Arc<Mutex<SqliteStorage>>,
    pub config: Arc<AppConfig>,
    pub start_time: Instant,
    pub refresh_notify: Arc<Notify>,
}

impl TelegramNotifier {
    pub fn new(
        bot_token: String,
        chat_id: i64,
        storage: Arc<Mutex<SqliteStorage>>,
        config: Arc<AppConfig>,
        refresh_notify: Arc<Notify>,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(35))
            .build()
            .map_err(|e| NotifyError::Api(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token,
            chat_id,
            client,
            offset: Arc::new(AtomicI64::new(0)),
            storage,
            config,
            start_time: Instant::now(),
            refresh_notify,
        })
    }

    /// Points the notifier at another Bot API host (a local relay, for instance).
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub async fn notify_text(&self, text: &str) -> Result<(), NotifyError> {
        sender::send_text(self, text).await
    }

    pub async fn notify_period(
        &self,
        symbol: &str,
        period: &DrawdownPeriod,
        summary: &SummaryStats,
    ) -> Result<(), NotifyError> {
        sender::send_period(self, symbol, period, summary).await
    }

    pub async fn listen_for_commands(&self) {
        listener::listen_for_commands(self).await;
    }

    pub async fn set_my_commands(&self) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/setMyCommands", self.api_base, self.bot_token);
        let commands = serde_json::json!({
            "commands": [
                { "command": "ping", "description": "Check connection" },
                { "command": "status", "description": "Show watcher status" },
                { "command": "help", "description": "Command list" },
                { "command": "summary", "description": "Drawdown summary per symbol" },
                { "command": "periods", "description": "Drawdown periods of a symbol" },
                { "command": "config", "description": "Current configuration" },
                { "command": "refresh", "description": "Run the check now" },
                { "command": "uptime", "description": "Service uptime" }
            ]
        });
        self.client
            .post(&url)
            .json(&commands)
            .send()
            .await
            .map_err(|e| NotifyError::Api(e.to_string()))?;
        Ok(())
    }

    pub fn spawn_listener(notifier: Arc<TelegramNotifier>) {
        tokio::spawn(async move {
            if let Err(e) = notifier.set_my_commands().await {
                warn!("setMyCommands failed: {:?}", e);
            }
            info!("▶️ Starting Telegram listener...");
            notifier.listen_for_commands().await;
            info!("🛑 Telegram listener ended.");
        });
    }

    /// Alerts about `period` once; later calls for the same start are no-ops.
    pub async fn check_and_notify_period(
        &self,
        symbol: &str,
        period: &DrawdownPeriod,
        summary: &SummaryStats,
    ) -> AlertOutcome {
        let already = match self.storage.lock().await.is_notified(symbol, period.start) {
            Ok(flag) => flag,
            Err(e) => {
                warn!("❌ [{}] Error checking notification status: {:?}", symbol, e);
                return AlertOutcome::Failed;
            }
        };
        if already {
            info!("✅ [{}] Period starting {} already notified", symbol, period.start.date_naive());
            return AlertOutcome::AlreadySent;
        }

        match self.notify_period(symbol, period, summary).await {
            Ok(()) => {
                if let Err(e) = self.storage.lock().await.mark_notified(symbol, period.start) {
                    warn!("❌ [{}] Mark notified failed: {:?}", symbol, e);
                }
                AlertOutcome::Sent
            }
            Err(e) => {
                warn!("❌ [{}] Error sending notification: {:?}", symbol, e);
                AlertOutcome::Failed
            }
        }
    }
}
