// notifier/telegram/listener.rs

use crate::notifier::telegram::TelegramNotifier;
use crate::notifier::telegram::command_handler::handle_command;
use serde::Deserialize;
use std::sync::atomic::Ordering;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct TelegramApiResponse {
    #[serde(default)]
    result: Vec<TelegramUpdate>,
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    update_id: i64,
    message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    chat: TelegramChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
}

/// Long-polls Telegram for updates and dispatches commands from the configured chat.
pub async fn listen_for_commands(notifier: &TelegramNotifier) {
    let url = format!("{}/bot{}/getUpdates", notifier.api_base, notifier.bot_token);
    loop {
        let offset = notifier.offset.load(Ordering::SeqCst);
        let response = notifier
            .client
            .get(&url)
            .query(&[("offset", offset.to_string()), ("timeout", "25".to_string())])
            .send()
            .await;

        match response {
            Ok(resp) => match resp.json::<TelegramApiResponse>().await {
                Ok(api_response) => {
                    for update in api_response.result {
                        notifier.offset.store(update.update_id + 1, Ordering::SeqCst);
                        let Some(message) = update.message else { continue };
                        if message.chat.id != notifier.chat_id {
                            debug!("Ignoring message from chat {}", message.chat.id);
                            continue;
                        }
                        if let Some(text) = message.text.as_deref() {
                            handle_command(text, notifier).await;
                        }
                    }
                }
                Err(e) => warn!("getUpdates decode error: {:?}", e),
            },
            Err(e) => warn!("getUpdates request error: {:?}", e),
        }
        sleep(Duration::from_secs(1)).await;
    }
}
