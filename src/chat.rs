//! Chat command handling.
//!
//! Turns incoming chat events into replies:
//! - `conversation_started` -> prompt for a device id (inline webhook response)
//! - `<imei>` -> stroll summary, with a button asking for the top-N table
//! - `/top <imei>` -> top-N table, with a button going back to the summary
//!
//! The DTOs follow the Viber bot API field names. Transport (webhook serving,
//! signature checks) lives outside this crate; delivery of [`BotReply::Send`]
//! is done by [`MessagingClient`](crate::http) when the `http` feature is on.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::source::collect_strolls;
use crate::{report, stats, DeviceId, Result, StrollConfig, StrollError, TrackSource};

const TOP_PREFIX: &str = "/top ";
const PROMPT_TEXT: &str = "Enter IMEI";
const INVALID_ID_TEXT: &str = "Please enter a valid IMEI";

// ============================================================================
// Incoming DTOs
// ============================================================================

/// Kind of incoming chat event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatEventType {
    Subscribed,
    ConversationStarted,
    Message,
    /// Delivery receipts and anything else the bot ignores
    #[serde(other)]
    Other,
}

/// Event posted by the chat provider to the webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEvent {
    pub event: ChatEventType,
    #[serde(default)]
    pub sender: ChatSender,
    #[serde(default)]
    pub message: Option<ReceivedMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatSender {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivedMessage {
    #[serde(default)]
    pub text: String,
}

// ============================================================================
// Outgoing DTOs
// ============================================================================

/// Message sent to a user, either inline or through the send API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<Keyboard>,
}

impl OutgoingMessage {
    /// Plain text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: text.into(),
            receiver: None,
            keyboard: None,
        }
    }

    /// Text message with a single reply button that sends `reply` back when tapped.
    pub fn with_button(text: impl Into<String>, label: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            keyboard: Some(Keyboard::single(KeyboardButton::reply(label, reply))),
            ..Self::text(text)
        }
    }

    /// Address the message to a user.
    pub fn to(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = Some(receiver.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Keyboard {
    pub buttons: Vec<KeyboardButton>,
    pub default_height: bool,
    #[serde(rename = "Type")]
    pub kind: String,
}

impl Keyboard {
    fn single(button: KeyboardButton) -> Self {
        Self {
            buttons: vec![button],
            default_height: false,
            kind: "keyboard".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyboardButton {
    pub action_type: String,
    pub action_body: String,
    pub text: String,
    pub text_size: String,
}

impl KeyboardButton {
    fn reply(label: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            action_type: "reply".to_string(),
            action_body: reply.into(),
            text: label.into(),
            text_size: "regular".to_string(),
        }
    }
}

/// Status envelope returned by every provider API call. `status == 0` is success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub status: i64,
    #[serde(default)]
    pub status_message: String,
}

impl ProviderResponse {
    pub fn into_result(self) -> Result<()> {
        if self.status == 0 {
            Ok(())
        } else {
            Err(StrollError::Messaging {
                status: self.status,
                message: self.status_message,
            })
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// A user request, holding the device id exactly as typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Summary over all strolls
    Stats(String),
    /// Ranking of the longest strolls
    Top(String),
}

impl Command {
    /// Parse message text. `/top <id>` asks for the ranking; anything else is
    /// taken as a device id for the summary.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text.strip_prefix(TOP_PREFIX) {
            Some(rest) => Command::Top(rest.trim().to_string()),
            None => Command::Stats(text.to_string()),
        }
    }

    fn device_input(&self) -> &str {
        match self {
            Command::Stats(input) | Command::Top(input) => input,
        }
    }
}

/// What the webhook should do in response to an event.
#[derive(Debug, Clone, PartialEq)]
pub enum BotReply {
    /// Return the message as the webhook response body
    Inline(OutgoingMessage),
    /// Send the message through the provider's send API
    Send(OutgoingMessage),
}

impl BotReply {
    pub fn message(&self) -> &OutgoingMessage {
        match self {
            BotReply::Inline(message) | BotReply::Send(message) => message,
        }
    }
}

// ============================================================================
// Bot
// ============================================================================

/// Answers chat events with stroll statistics from a track source.
pub struct StrollBot<S> {
    source: S,
    config: StrollConfig,
}

impl<S: TrackSource> StrollBot<S> {
    pub fn new(source: S, config: StrollConfig) -> Self {
        Self { source, config }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Handle one incoming event.
    ///
    /// Returns `None` for events that need no answer. Track source failures are
    /// returned as errors; invalid ids and empty tracks are ordinary replies.
    pub fn handle(&self, event: &ChatEvent) -> Result<Option<BotReply>> {
        match event.event {
            ChatEventType::ConversationStarted => {
                Ok(Some(BotReply::Inline(OutgoingMessage::text(PROMPT_TEXT))))
            }
            ChatEventType::Message => {
                let text = event
                    .message
                    .as_ref()
                    .map(|m| m.text.trim())
                    .filter(|t| !t.is_empty());
                let Some(text) = text else {
                    debug!("[StrollBot] Ignoring empty message from {}", event.sender.id);
                    return Ok(None);
                };

                let message = self.respond(&Command::parse(text))?;
                Ok(Some(BotReply::Send(message.to(event.sender.id.clone()))))
            }
            ChatEventType::Subscribed | ChatEventType::Other => Ok(None),
        }
    }

    /// Build the reply to a parsed command.
    pub fn respond(&self, command: &Command) -> Result<OutgoingMessage> {
        let device = match DeviceId::parse(command.device_input()) {
            Ok(device) => device,
            Err(StrollError::InvalidDeviceId { input }) => {
                info!("[StrollBot] Rejected device id {:?}", input);
                return Ok(OutgoingMessage::text(INVALID_ID_TEXT));
            }
            Err(e) => return Err(e),
        };

        let strolls = collect_strolls(&self.source, &device, &self.config)?;

        match command {
            Command::Stats(_) => {
                let Some(summary) = stats::summarize(&strolls) else {
                    info!("[StrollBot] {}: no strolls", device);
                    return Ok(OutgoingMessage::text(report::no_strolls(&device)));
                };
                info!(
                    "[StrollBot] {}: {} strolls, {:.3}km",
                    device, summary.count, summary.total_distance_km
                );
                Ok(OutgoingMessage::with_button(
                    report::format_summary(&summary),
                    format!("Top {}", self.config.top_n),
                    format!("{}{}", TOP_PREFIX, device),
                ))
            }
            Command::Top(_) => {
                let ranked = stats::rank_top(&strolls, self.config.top_n);
                if ranked.is_empty() {
                    info!("[StrollBot] {}: no strolls to rank", device);
                    return Ok(OutgoingMessage::text(report::no_strolls(&device)));
                }
                info!("[StrollBot] {}: top {} of {} strolls", device, ranked.len(), strolls.len());
                Ok(OutgoingMessage::with_button(
                    report::format_top(&ranked),
                    "Back",
                    device.to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryTrackSource, TrackPoint};
    use chrono::{DateTime, TimeZone, Utc};

    const IMEI: &str = "356938035643809";

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
    }

    fn bot() -> StrollBot<MemoryTrackSource> {
        let points: Vec<TrackPoint> = [0, 5, 10, 50, 55]
            .iter()
            .enumerate()
            .map(|(i, &m)| TrackPoint::new(at(m), 0.0, i as f64 * 0.001))
            .collect();
        let source =
            MemoryTrackSource::new().with_track(DeviceId::parse(IMEI).unwrap(), points);
        StrollBot::new(source, StrollConfig::default())
    }

    fn message_event(text: &str) -> ChatEvent {
        serde_json::from_value(serde_json::json!({
            "event": "message",
            "timestamp": 1714554000000u64,
            "sender": { "id": "user-1", "name": "Walker" },
            "message": { "type": "text", "text": text }
        }))
        .unwrap()
    }

    struct BrokenSource;

    impl TrackSource for BrokenSource {
        fn visit_points(
            &self,
            _device: &DeviceId,
            _visit: &mut dyn FnMut(TrackPoint) -> Result<()>,
        ) -> Result<()> {
            Err(StrollError::upstream("database unavailable"))
        }
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse(IMEI), Command::Stats(IMEI.to_string()));
        assert_eq!(Command::parse(&format!("  {} ", IMEI)), Command::Stats(IMEI.to_string()));
        assert_eq!(Command::parse(&format!("/top {}", IMEI)), Command::Top(IMEI.to_string()));
        assert_eq!(Command::parse("/top"), Command::Stats("/top".to_string()));
    }

    #[test]
    fn test_conversation_started_prompts_inline() {
        let event: ChatEvent =
            serde_json::from_str(r#"{"event":"conversation_started","user":{"id":"u"}}"#).unwrap();
        let reply = bot().handle(&event).unwrap().unwrap();
        assert_eq!(reply, BotReply::Inline(OutgoingMessage::text("Enter IMEI")));
    }

    #[test]
    fn test_ignored_events() {
        let delivered: ChatEvent =
            serde_json::from_str(r#"{"event":"delivered","message_token":1}"#).unwrap();
        assert_eq!(delivered.event, ChatEventType::Other);
        assert!(bot().handle(&delivered).unwrap().is_none());

        assert!(bot().handle(&message_event("   ")).unwrap().is_none());
    }

    #[test]
    fn test_stats_reply() {
        let reply = bot().handle(&message_event(IMEI)).unwrap().unwrap();
        let BotReply::Send(message) = reply else {
            panic!("expected a sent message");
        };

        assert_eq!(message.receiver.as_deref(), Some("user-1"));
        assert_eq!(
            message.text,
            "Total strolls: 2\nTotal distance km: 0.334\nTotal duration min: 15"
        );
        let button = &message.keyboard.as_ref().unwrap().buttons[0];
        assert_eq!(button.text, "Top 10");
        assert_eq!(button.action_body, format!("/top {}", IMEI));
    }

    #[test]
    fn test_top_reply() {
        let reply = bot().handle(&message_event(&format!("/top {}", IMEI))).unwrap().unwrap();
        let message = reply.message();

        assert_eq!(
            message.text,
            "```| N|      km|     min|\n| 1|   0.222|      10|\n| 2|   0.111|       5|```"
        );
        let button = &message.keyboard.as_ref().unwrap().buttons[0];
        assert_eq!(button.text, "Back");
        assert_eq!(button.action_body, IMEI);
    }

    #[test]
    fn test_invalid_device_id() {
        for text in ["hello", "/top 12345"] {
            let reply = bot().handle(&message_event(text)).unwrap().unwrap();
            assert_eq!(reply.message().text, "Please enter a valid IMEI");
            assert!(reply.message().keyboard.is_none());
        }
    }

    #[test]
    fn test_unknown_device_has_no_strolls() {
        let other = "490154203237518";
        let stats = bot().respond(&Command::Stats(other.to_string())).unwrap();
        assert_eq!(stats.text, format!("No strolls found for IMEI {}", other));

        let top = bot().respond(&Command::Top(other.to_string())).unwrap();
        assert_eq!(top.text, format!("No strolls found for IMEI {}", other));
    }

    #[test]
    fn test_source_failure_is_an_error() {
        let bot = StrollBot::new(BrokenSource, StrollConfig::default());
        let result = bot.handle(&message_event(IMEI));
        assert!(matches!(result, Err(StrollError::Source { .. })));

        // Validation happens before the source is touched
        let reply = bot.handle(&message_event("nope")).unwrap().unwrap();
        assert_eq!(reply.message().text, "Please enter a valid IMEI");
    }

    #[test]
    fn test_outgoing_message_json() {
        let message = OutgoingMessage::with_button("hi", "Back", IMEI).to("user-1");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "text",
                "text": "hi",
                "receiver": "user-1",
                "keyboard": {
                    "Buttons": [{
                        "ActionType": "reply",
                        "ActionBody": IMEI,
                        "Text": "Back",
                        "TextSize": "regular"
                    }],
                    "DefaultHeight": false,
                    "Type": "keyboard"
                }
            })
        );

        let plain = serde_json::to_value(OutgoingMessage::text("Enter IMEI")).unwrap();
        assert_eq!(plain, serde_json::json!({ "type": "text", "text": "Enter IMEI" }));
    }

    #[test]
    fn test_provider_response_status() {
        let ok: ProviderResponse =
            serde_json::from_str(r#"{"status":0,"status_message":"ok"}"#).unwrap();
        assert!(ok.into_result().is_ok());

        let failed: ProviderResponse =
            serde_json::from_str(r#"{"status":2,"status_message":"invalidAuthToken"}"#).unwrap();
        match failed.into_result() {
            Err(StrollError::Messaging { status, message }) => {
                assert_eq!(status, 2);
                assert_eq!(message, "invalidAuthToken");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
