// Notification layer: Telegram alerts and chat commands.

pub mod telegram;

pub use telegram::TelegramNotifier;
