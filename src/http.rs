//! HTTP client for the chat provider API.
//!
//! Delivers [`BotReply::Send`] messages and manages the webhook registration:
//! - Connection pooling with request timeouts
//! - Automatic retry with exponential backoff on 429 and transport errors
//! - Provider status validation (non-zero `status` is an error)

use log::{debug, info, warn};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::chat::{BotReply, OutgoingMessage, ProviderResponse};
use crate::{Result, StrollError};

const AUTH_HEADER: &str = "X-Viber-Auth-Token";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_RETRIES: u32 = 3;

/// Events the webhook subscribes to.
pub const WEBHOOK_EVENTS: [&str; 6] = [
    "delivered",
    "seen",
    "failed",
    "subscribed",
    "unsubscribed",
    "conversation_started",
];

/// Body of the `set_webhook` call. An empty `url` removes the webhook.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookRegistration {
    pub url: String,
    pub event_types: Vec<String>,
    pub send_name: bool,
    pub send_photo: bool,
}

impl WebhookRegistration {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            event_types: WEBHOOK_EVENTS.iter().map(|e| e.to_string()).collect(),
            send_name: false,
            send_photo: false,
        }
    }

    /// Registration that removes the current webhook.
    pub fn removal() -> Self {
        Self {
            url: String::new(),
            event_types: Vec::new(),
            send_name: false,
            send_photo: false,
        }
    }
}

/// Client for the chat provider's bot API.
pub struct MessagingClient {
    client: Client,
    base_url: String,
    auth_token: String,
}

impl MessagingClient {
    /// Create a client for the API rooted at `base_url`.
    pub fn new(base_url: &str, auth_token: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| StrollError::http(format!("Failed to create HTTP client: {}", e), None))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.to_string(),
        })
    }

    /// Send a plain text message to a user.
    pub async fn send_text(&self, receiver: &str, text: &str) -> Result<()> {
        self.send_message(&OutgoingMessage::text(text).to(receiver)).await
    }

    /// Send a text message with a single reply button.
    pub async fn send_button(&self, receiver: &str, text: &str, label: &str, reply: &str) -> Result<()> {
        self.send_message(&OutgoingMessage::with_button(text, label, reply).to(receiver))
            .await
    }

    /// Deliver a bot reply. Inline replies belong in the webhook response and
    /// are skipped here.
    pub async fn deliver(&self, reply: &BotReply) -> Result<()> {
        match reply {
            BotReply::Send(message) => self.send_message(message).await,
            BotReply::Inline(_) => {
                debug!("[MessagingClient] Inline reply, nothing to send");
                Ok(())
            }
        }
    }

    pub async fn send_message(&self, message: &OutgoingMessage) -> Result<()> {
        let response: ProviderResponse = self.post("send_message", message).await?;
        response.into_result()
    }

    /// Point the provider's webhook at `url`.
    pub async fn set_webhook(&self, url: &str) -> Result<()> {
        info!("[MessagingClient] Registering webhook {}", url);
        let response: ProviderResponse = self.post("set_webhook", &WebhookRegistration::new(url)).await?;
        response.into_result()
    }

    /// Remove the webhook registration.
    pub async fn clear_webhook(&self) -> Result<()> {
        info!("[MessagingClient] Removing webhook");
        let response: ProviderResponse = self.post("set_webhook", &WebhookRegistration::removal()).await?;
        response.into_result()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let mut retries = 0;

        loop {
            let response = self
                .client
                .post(&url)
                .header(AUTH_HEADER, &self.auth_token)
                .json(body)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        retries += 1;
                        if retries > MAX_RETRIES {
                            return Err(StrollError::http(
                                "Max retries exceeded (429)",
                                Some(status.as_u16()),
                            ));
                        }
                        let wait = backoff(retries);
                        warn!(
                            "[MessagingClient] {} 429 Too Many Requests, retry {} with {:?} backoff",
                            path, retries, wait
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }

                    if !status.is_success() {
                        return Err(StrollError::http(format!("HTTP {}", status), Some(status.as_u16())));
                    }

                    let bytes = resp
                        .bytes()
                        .await
                        .map_err(|e| StrollError::http(format!("Body download error: {}", e), None))?;
                    return serde_json::from_slice(&bytes)
                        .map_err(|e| StrollError::http(format!("JSON parse error: {}", e), None));
                }
                Err(e) => {
                    retries += 1;
                    if retries > MAX_RETRIES {
                        return Err(StrollError::http(format!("Request error: {}", e), None));
                    }
                    let wait = backoff(retries);
                    warn!("[MessagingClient] {} error: {}, retry {} after {:?}", path, e, retries, wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

/// Exponential backoff: 400ms, 800ms, 1.6s.
fn backoff(retry: u32) -> Duration {
    Duration::from_millis(200 * (1 << retry.min(3)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    #[test]
    fn test_endpoint_joins_paths() {
        let client = MessagingClient::new("https://chatapi.viber.com/pa/", "token").unwrap();
        assert_eq!(
            client.endpoint("send_message"),
            "https://chatapi.viber.com/pa/send_message"
        );
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        assert_eq!(backoff(1), Duration::from_millis(400));
        assert_eq!(backoff(2), Duration::from_millis(800));
        assert_eq!(backoff(3), Duration::from_millis(1600));
        assert_eq!(backoff(10), Duration::from_millis(1600));
    }

    #[test]
    fn test_webhook_registration_json() {
        let json = serde_json::to_value(WebhookRegistration::new("https://example.org/hook")).unwrap();
        assert_eq!(json["url"], "https://example.org/hook");
        assert_eq!(json["event_types"].as_array().unwrap().len(), 6);
        assert_eq!(json["send_name"], false);

        let removal = serde_json::to_value(WebhookRegistration::removal()).unwrap();
        assert_eq!(removal["url"], "");
        assert!(removal["event_types"].as_array().unwrap().is_empty());
    }

    /// Serve `responses` in order, one connection each, and return the raw requests.
    async fn canned_server(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut socket).await);

                let response = format!(
                    "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    reason(status),
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
            requests
        });

        (base_url, handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn reason(status: u16) -> &'static str {
        match status {
            200 => "OK",
            429 => "Too Many Requests",
            500 => "Internal Server Error",
            _ => "Unknown",
        }
    }

    #[tokio::test]
    async fn test_send_text_ok() {
        let (base_url, server) = canned_server(vec![(200, r#"{"status":0,"status_message":"ok"}"#)]).await;
        let client = MessagingClient::new(&base_url, "secret-token").unwrap();

        client.send_text("user-1", "Total strolls: 2").await.unwrap();

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.starts_with("POST /send_message "));
        assert!(request.to_lowercase().contains("x-viber-auth-token: secret-token"));
        assert!(request.contains(r#""receiver":"user-1""#));
        assert!(request.contains(r#""text":"Total strolls: 2""#));
    }

    #[tokio::test]
    async fn test_provider_status_is_messaging_error() {
        let (base_url, server) =
            canned_server(vec![(200, r#"{"status":2,"status_message":"invalidAuthToken"}"#)]).await;
        let client = MessagingClient::new(&base_url, "wrong-token").unwrap();

        let err = client.send_text("user-1", "hello").await.unwrap_err();
        match err {
            StrollError::Messaging { status, message } => {
                assert_eq!(status, 2);
                assert_eq!(message, "invalidAuthToken");
            }
            other => panic!("expected Messaging error, got {:?}", other),
        }
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let (base_url, server) = canned_server(vec![(500, "{}")]).await;
        let client = MessagingClient::new(&base_url, "token").unwrap();

        let err = client.send_text("user-1", "hello").await.unwrap_err();
        assert!(matches!(err, StrollError::Http { status_code: Some(500), .. }));
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_gives_up_after_max_retries() {
        let (base_url, server) = canned_server(vec![(429, "{}"); 4]).await;
        let client = MessagingClient::new(&base_url, "token").unwrap();

        let err = client.set_webhook("https://example.org/hook").await.unwrap_err();
        assert!(matches!(err, StrollError::Http { status_code: Some(429), .. }));

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 1 + MAX_RETRIES as usize);
        assert!(requests.iter().all(|r| r.starts_with("POST /set_webhook ")));
    }

    #[tokio::test]
    async fn test_rate_limit_then_success() {
        let (base_url, server) =
            canned_server(vec![(429, "{}"), (200, r#"{"status":0,"status_message":"ok"}"#)]).await;
        let client = MessagingClient::new(&base_url, "token").unwrap();

        client.clear_webhook().await.unwrap();

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].contains(r#""url":"""#));
    }

    #[tokio::test]
    async fn test_inline_reply_is_not_sent() {
        // Unroutable endpoint: any real request would fail
        let client = MessagingClient::new("http://127.0.0.1:9", "token").unwrap();
        let reply = BotReply::Inline(OutgoingMessage::text("Enter IMEI"));
        assert!(client.deliver(&reply).await.is_ok());
    }
}
