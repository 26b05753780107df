use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::error::{DeliveryError, DeliveryResult};
use crate::notifier::format::{format_message, LinkBuilder};
use crate::notifier::Notifier;
use crate::types::Notification;

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Base URL of the Bot API, without the `/bot<token>` part.
    pub api_url: String,
    pub bot_token: String,
    pub chat_id: String,
    pub web_base_url: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

/// Delivers notifications through the Telegram Bot API `sendMessage` call.
pub struct TelegramNotifier {
    client: reqwest::Client,
    send_url: String,
    chat_id: String,
    links: LinkBuilder,
}

impl TelegramNotifier {
    /// `client` should carry the bounded timeout from `fetcher::http_client`.
    pub fn new(client: reqwest::Client, config: TelegramConfig) -> Self {
        let send_url = format!(
            "{}/bot{}/sendMessage",
            config.api_url.trim_end_matches('/'),
            config.bot_token
        );
        Self {
            client,
            send_url,
            chat_id: config.chat_id,
            links: LinkBuilder::new(&config.web_base_url),
        }
    }

    /// Send pre-rendered text.
    pub async fn send_text(&self, text: &str) -> DeliveryResult {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "MarkdownV2",
            disable_web_page_preview: true,
        };

        let resp = self
            .client
            .post(&self.send_url)
            .json(&payload)
            .send()
            .await
            .map_err(DeliveryError::Transport)?;

        let status = resp.status();
        if status.is_success() {
            debug!(chat_id = %self.chat_id, "chat message delivered");
            return Ok(());
        }

        let body = resp
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(DeliveryError::Status { status: status.as_u16(), body })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, notification: &Notification) -> DeliveryResult {
        let text = format_message(notification, &self.links);
        self.send_text(&text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};

    use crate::types::Listing;

    type Captured = Arc<Mutex<Vec<(String, serde_json::Value)>>>;

    async fn serve(status: StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let router = Router::new()
            .route(
                "/:bot/sendMessage",
                post(
                    move |State(captured): State<Captured>,
                          axum::extract::Path(bot): axum::extract::Path<String>,
                          Json(body): Json<serde_json::Value>| async move {
                        captured.lock().unwrap().push((bot, body));
                        (status, "{}")
                    },
                ),
            )
            .with_state(Arc::clone(&captured));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{addr}"), captured)
    }

    fn notifier(api_url: String) -> TelegramNotifier {
        notifier_with_timeout(api_url, Duration::from_secs(5))
    }

    fn notifier_with_timeout(api_url: String, timeout: Duration) -> TelegramNotifier {
        let client = crate::fetcher::http_client(timeout).unwrap();
        TelegramNotifier::new(
            client,
            TelegramConfig {
                api_url,
                bot_token: "123:abc".to_string(),
                chat_id: "-4607".to_string(),
                web_base_url: "https://citizenshipper.com".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn posts_markdown_payload_to_bot_endpoint() {
        let (url, captured) = serve(StatusCode::OK).await;
        let listing = Listing { id: "A1".to_string(), ..Listing::default() };

        notifier(url)
            .notify(&Notification::ListingNew { listing })
            .await
            .unwrap();

        let calls = captured.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (bot, body) = &calls[0];
        assert_eq!(bot, "bot123:abc");
        assert_eq!(body["chat_id"], "-4607");
        assert_eq!(body["parse_mode"], "MarkdownV2");
        assert!(body["text"].as_str().unwrap().contains("shipment/A1"));
    }

    #[tokio::test]
    async fn non_success_is_delivery_error() {
        let (url, _captured) = serve(StatusCode::BAD_REQUEST).await;
        let err = notifier(url).send_text("hi").await.unwrap_err();
        match err {
            DeliveryError::Status { status, .. } => assert_eq!(status, 400),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn hung_chat_api_is_transport_error() {
        let router = Router::new().route(
            "/:bot/sendMessage",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                "{}"
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let err = notifier_with_timeout(format!("http://{addr}"), Duration::from_secs(1))
            .send_text("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Transport(_)), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn unreachable_chat_api_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = notifier(format!("http://{addr}")).send_text("hi").await.unwrap_err();
        assert!(matches!(err, DeliveryError::Transport(_)), "unexpected error: {err}");
    }
}
