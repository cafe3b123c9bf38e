use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Step of the identity check a session is currently in.
///
/// This is the plain discriminant; the router's session state carries the
/// data each step needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStep {
    /// Waiting for a phone number.
    Phone,
    /// OTP requested, waiting for the code.
    Otp,
    /// OTP verified for a new user, waiting for a display name.
    Name,
    /// Identified; free-text queries go to the NLU backend.
    Authenticated,
}

impl AuthStep {
    /// Parse the step name used by the identity service.
    ///
    /// The service reports the authenticated step as `query`.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "phone" => Some(AuthStep::Phone),
            "otp" => Some(AuthStep::Otp),
            "name" => Some(AuthStep::Name),
            "query" | "authenticated" => Some(AuthStep::Authenticated),
            _ => None,
        }
    }
}

impl fmt::Display for AuthStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthStep::Phone => write!(f, "phone"),
            AuthStep::Otp => write!(f, "otp"),
            AuthStep::Name => write!(f, "name"),
            AuthStep::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Display theme preference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// The other theme.
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

// =============================================================================
// Profile
// =============================================================================

/// What the identity service knows about an authenticated user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub phone_number: String,
}

// =============================================================================
// Messages
// =============================================================================

/// Message body: a single string, or display lines for multi-paragraph
/// bot replies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageText {
    Plain(String),
    Lines(Vec<String>),
}

impl MessageText {
    /// Flatten to a single string, joining lines with `\n`.
    pub fn to_plain(&self) -> String {
        match self {
            MessageText::Plain(text) => text.clone(),
            MessageText::Lines(lines) => lines.join("\n"),
        }
    }

    /// The display lines of this text.
    pub fn lines(&self) -> Vec<&str> {
        match self {
            MessageText::Plain(text) => text.split('\n').collect(),
            MessageText::Lines(lines) => lines.iter().map(String::as_str).collect(),
        }
    }

    /// True only for a plain text equal to `other`. Line lists never match.
    pub fn is_exactly(&self, other: &str) -> bool {
        matches!(self, MessageText::Plain(text) if text == other)
    }
}

impl From<&str> for MessageText {
    fn from(text: &str) -> Self {
        MessageText::Plain(text.to_string())
    }
}

impl From<String> for MessageText {
    fn from(text: String) -> Self {
        MessageText::Plain(text)
    }
}

/// A quick-reply button offered by the NLU backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// What activating a button does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonAction<'a> {
    /// Send this text to the NLU backend.
    Dispatch(&'a str),
    /// Passive hyperlink; never dispatched.
    Link(&'a str),
}

impl Button {
    pub fn with_payload(title: &str, payload: &str) -> Self {
        Self {
            title: title.to_string(),
            payload: Some(payload.to_string()),
            url: None,
        }
    }

    pub fn link(title: &str, url: &str) -> Self {
        Self {
            title: title.to_string(),
            payload: None,
            url: Some(url.to_string()),
        }
    }

    /// A `url` wins over a `payload`; a button with neither dispatches its title.
    pub fn action(&self) -> ButtonAction<'_> {
        if let Some(url) = self.url.as_deref() {
            return ButtonAction::Link(url);
        }
        ButtonAction::Dispatch(self.payload.as_deref().unwrap_or(&self.title))
    }
}

/// Normalized reply from the NLU backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BotReply {
    pub lines: Vec<String>,
    pub buttons: Vec<Button>,
    pub image: Option<String>,
}

/// One transcript entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub text: MessageText,
    pub is_user: bool,
    /// Assigned at creation, never mutated.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_empty"
    )]
    pub buttons: Vec<Button>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Message {
    /// A user-originated message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: MessageText::Plain(text.into()),
            is_user: true,
            timestamp: Utc::now(),
            buttons: Vec::new(),
            image: None,
        }
    }

    /// A bot-originated plain message (greetings, prompts, errors).
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: MessageText::Plain(text.into()),
            is_user: false,
            timestamp: Utc::now(),
            buttons: Vec::new(),
            image: None,
        }
    }

    /// A bot-originated message carrying an NLU reply.
    pub fn from_reply(reply: BotReply) -> Self {
        Self {
            text: MessageText::Lines(reply.lines),
            is_user: false,
            timestamp: Utc::now(),
            buttons: reply.buttons,
            image: reply.image,
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_step_from_wire() {
        assert_eq!(AuthStep::from_wire("phone"), Some(AuthStep::Phone));
        assert_eq!(AuthStep::from_wire("OTP"), Some(AuthStep::Otp));
        assert_eq!(AuthStep::from_wire(" name "), Some(AuthStep::Name));
        assert_eq!(AuthStep::from_wire("query"), Some(AuthStep::Authenticated));
        assert_eq!(
            AuthStep::from_wire("authenticated"),
            Some(AuthStep::Authenticated)
        );
        assert_eq!(AuthStep::from_wire("banana"), None);
    }

    #[test]
    fn test_auth_step_display() {
        assert_eq!(AuthStep::Phone.to_string(), "phone");
        assert_eq!(AuthStep::Authenticated.to_string(), "authenticated");
    }

    #[test]
    fn test_theme_toggle_and_serde() {
        assert_eq!(Theme::default(), Theme::Light);
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!(serde_json::to_string(&Theme::Dark).unwrap(), "\"dark\"");
    }

    #[test]
    fn test_button_action() {
        let b = Button::with_payload("Admissions", "/faq_admissions");
        assert_eq!(b.action(), ButtonAction::Dispatch("/faq_admissions"));

        let b = Button::link("Website", "https://www.ssn.edu.in");
        assert_eq!(b.action(), ButtonAction::Link("https://www.ssn.edu.in"));

        let b = Button {
            title: "Both".to_string(),
            payload: Some("p".to_string()),
            url: Some("https://example.com".to_string()),
        };
        assert_eq!(b.action(), ButtonAction::Link("https://example.com"));

        let b = Button {
            title: "Bare".to_string(),
            payload: None,
            url: None,
        };
        assert_eq!(b.action(), ButtonAction::Dispatch("Bare"));
    }

    #[test]
    fn test_message_text_helpers() {
        let plain = MessageText::from("hello\nworld");
        assert_eq!(plain.lines(), vec!["hello", "world"]);
        assert!(plain.is_exactly("hello\nworld"));

        let lines = MessageText::Lines(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(lines.to_plain(), "a\nb");
        assert!(!lines.is_exactly("a\nb"));
    }

    #[test]
    fn test_message_json_uses_camel_case() {
        let msg = Message::user("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["text"], "hi");
        assert_eq!(json["isUser"], true);
        assert!(json["timestamp"].is_string());
        assert!(json.get("buttons").is_none());
        assert!(json.get("image").is_none());
    }

    #[test]
    fn test_message_deserialize_server_shapes() {
        let json = r#"[
            {"text": "Admissions", "isUser": true, "timestamp": "2024-03-01T10:00:00.000Z"},
            {"text": ["Line one", "Line two"], "isUser": false,
             "timestamp": "2024-03-01T10:00:01Z", "buttons": null, "image": null},
            {"text": "Pick one", "isUser": false,
             "buttons": [{"title": "Fees", "payload": "/fees"}]}
        ]"#;
        let msgs: Vec<Message> = serde_json::from_str(json).unwrap();
        assert_eq!(msgs.len(), 3);
        assert!(msgs[0].is_user);
        assert!(msgs[0].text.is_exactly("Admissions"));
        assert_eq!(
            msgs[1].text,
            MessageText::Lines(vec!["Line one".to_string(), "Line two".to_string()])
        );
        assert!(msgs[1].buttons.is_empty());
        assert!(msgs[1].image.is_none());
        assert_eq!(msgs[2].buttons[0].payload.as_deref(), Some("/fees"));
    }

    #[test]
    fn test_message_from_reply() {
        let reply = BotReply {
            lines: vec!["Hello".to_string()],
            buttons: vec![Button::with_payload("More", "/more")],
            image: Some("https://img.example/x.png".to_string()),
        };
        let msg = Message::from_reply(reply);
        assert!(!msg.is_user);
        assert_eq!(msg.text.to_plain(), "Hello");
        assert_eq!(msg.buttons.len(), 1);
        assert_eq!(msg.image.as_deref(), Some("https://img.example/x.png"));
    }
}
