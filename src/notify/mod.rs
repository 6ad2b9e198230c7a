// Operator notifications: Telegram or log output, dispatched off the engine's path

pub mod messages;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::NotifierConfig;
use crate::error::{TradingError, TradingResult};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> TradingResult<()>;
}

pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

impl TelegramNotifier {
    pub fn new(config: &NotifierConfig) -> TradingResult<Self> {
        if !config.telegram_ready() {
            return Err(TradingError::ConfigMissing("telegram_token / telegram_chat_id".to_string()));
        }
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(10)).build()?,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            bot_token: config.telegram_token.clone(),
            chat_id: config.telegram_chat_id.clone(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> TradingResult<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.bot_token);
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| TradingError::Notifier(e.to_string()))?;

        if response.status().is_success() {
            debug!("📨 Telegram message sent");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(TradingError::Notifier(format!("Telegram API error {}: {}", status, body)))
        }
    }
}

/// Writes notifications to the log when no chat is configured
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> TradingResult<()> {
        info!("📣 {}", text.replace('\n', " | "));
        Ok(())
    }
}

/// Telegram when configured and enabled, the log otherwise
pub fn notifier_from_config(config: &NotifierConfig) -> TradingResult<Arc<dyn Notifier>> {
    if config.telegram_ready() {
        info!("📨 Telegram notifications enabled");
        Ok(Arc::new(TelegramNotifier::new(config)?))
    } else {
        info!("📣 Telegram not configured, notifications go to the log");
        Ok(Arc::new(LogNotifier))
    }
}

/// Fire-and-forget queue in front of a [`Notifier`].
///
/// Sending never blocks and never fails from the caller's point of view;
/// delivery errors are logged by the background task.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<String>,
}

impl NotificationDispatcher {
    /// The returned task ends once every dispatcher clone is dropped and the queue is drained
    pub fn spawn(notifier: Arc<dyn Notifier>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if let Err(e) = notifier.send(&message).await {
                    warn!("⚠️  Notification failed: {}", e);
                }
            }
        });
        (Self { tx }, handle)
    }

    pub fn notify(&self, text: impl Into<String>) {
        if self.tx.send(text.into()).is_err() {
            warn!("⚠️  Notification dropped: dispatcher closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Flaky {
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for Flaky {
        async fn send(&self, text: &str) -> TradingResult<()> {
            if text.contains("fail") {
                return Err(TradingError::Notifier("boom".to_string()));
            }
            self.delivered.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatcher_survives_send_failures() {
        let notifier = Arc::new(Flaky { delivered: Mutex::new(Vec::new()) });
        let (dispatcher, handle) = NotificationDispatcher::spawn(notifier.clone());

        dispatcher.notify("first");
        dispatcher.notify("fail please");
        dispatcher.notify("third");
        drop(dispatcher);
        handle.await.unwrap();

        assert_eq!(*notifier.delivered.lock().unwrap(), vec!["first", "third"]);
    }

    #[tokio::test]
    async fn test_telegram_send_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bottoken123/sendMessage")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"chat_id":"42","text":"hello","parse_mode":"HTML"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let config = NotifierConfig {
            telegram_token: "token123".to_string(),
            telegram_chat_id: "42".to_string(),
            api_url: server.url(),
            ..NotifierConfig::default()
        };
        TelegramNotifier::new(&config).unwrap().send("hello").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_telegram_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/bottoken123/sendMessage")
            .with_status(403)
            .with_body(r#"{"ok":false,"description":"Forbidden"}"#)
            .create_async()
            .await;

        let config = NotifierConfig {
            telegram_token: "token123".to_string(),
            telegram_chat_id: "42".to_string(),
            api_url: server.url(),
            ..NotifierConfig::default()
        };
        let err = TelegramNotifier::new(&config).unwrap().send("hello").await.unwrap_err();
        assert!(matches!(err, TradingError::Notifier(_)));
    }

    #[test]
    fn test_unconfigured_telegram_is_rejected() {
        assert!(TelegramNotifier::new(&NotifierConfig::default()).is_err());
    }
}
