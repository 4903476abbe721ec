// notifier/telegram/sender.rs

use crate::model::{DrawdownPeriod, NotifyError, SummaryStats};
use crate::notifier::telegram::TelegramNotifier;
use crate::utils::{format_days, format_pct};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

/// Telegram's message length limit, counted in UTF-16 code units.
pub const MAX_MESSAGE_LEN: usize = 4096;

const MORE_RESERVE: usize = 40;

fn tg_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Appends `lines` to `header` while the message fits, then closes with an
/// "… and N more" line for whatever was left out.
pub fn fit_lines<I>(header: String, lines: I) -> String
where
    I: IntoIterator<Item = String>,
    I::IntoIter: ExactSizeIterator,
{
    let lines = lines.into_iter();
    let total = lines.len();
    let mut msg = header;
    let mut used = tg_len(&msg);
    let mut shown = 0;

    for line in lines {
        let len = tg_len(&line);
        if used + len + MORE_RESERVE > MAX_MESSAGE_LEN {
            break;
        }
        msg.push_str(&line);
        used += len;
        shown += 1;
    }

    if shown < total {
        msg.push_str(&format!("… and {} more", total - shown));
    }
    msg
}

/// Cuts `text` to at most [`MAX_MESSAGE_LEN`] UTF-16 units on a char boundary.
pub fn truncate_message(text: &str) -> String {
    if tg_len(text) <= MAX_MESSAGE_LEN {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let len = ch.len_utf16();
        if used + len > MAX_MESSAGE_LEN - 1 {
            break;
        }
        out.push(ch);
        used += len;
    }
    out.push('…');
    out
}

/// Builds the alert text for a drawdown period that is still open.
pub fn format_period_alert(symbol: &str, period: &DrawdownPeriod, summary: &SummaryStats) -> String {
    format!(
        "📉 {} is in a drawdown!\n\n\
         🔻 Current: {} from ATH {:.2}\n\
         🕳 Deepest so far: {} on {}\n\
         📅 Since {} ({})\n\
         📊 Periods in history: {}",
        symbol,
        format_pct(summary.current_drawdown),
        period.peak_price,
        format_pct(period.max_drawdown),
        period.trough.date_naive(),
        period.start.date_naive(),
        format_days(period.duration()),
        summary.period_count,
    )
}

/// Sends a plain text message via Telegram.
pub async fn send_text(notifier: &TelegramNotifier, text: &str) -> Result<(), NotifyError> {
    let url = format!("{}/bot{}/sendMessage", notifier.api_base, notifier.bot_token);
    let response = match timeout(
        Duration::from_secs(10),
        notifier
            .client
            .post(&url)
            .form(&[("chat_id", notifier.chat_id.to_string()), ("text", truncate_message(text))])
            .send(),
    )
    .await
    {
        Ok(Ok(resp)) => resp,
        Ok(Err(e)) => {
            warn!("❌ Telegram send() failed: {:?}", e);
            return Err(NotifyError::Api(format!("Send failed: {}", e)));
        }
        Err(_) => {
            warn!("⏳ Telegram send() timed out");
            return Err(NotifyError::Unreachable);
        }
    };
    let status = response.status();
    let body = response.text().await.unwrap_or_else(|_| "unknown".into());
    if !status.is_success() {
        warn!("❌ Telegram API responded [{}]: {}", status, body);
        return Err(NotifyError::Api(format!("status {}", status)));
    }
    info!("✅ Telegram response [{}]", status);
    Ok(())
}

/// Sends the alert for an open drawdown period.
pub async fn send_period(
    notifier: &TelegramNotifier,
    symbol: &str,
    period: &DrawdownPeriod,
    summary: &SummaryStats,
) -> Result<(), NotifyError> {
    let message = format_period_alert(symbol, period, summary);
    info!("📤 Sending Telegram message:\n{}", message);
    send_text(notifier, &message).await
}
