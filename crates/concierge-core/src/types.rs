//! Session data model shared across the workspace.
//!
//! A `Session` is the unit of conversational continuity: the append-only
//! message history plus the sticky lead-capture fields and the per-turn
//! routing scratch state.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single turn-half in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Epoch seconds at creation.
    pub created_at: i64,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at: Utc::now().timestamp(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now().timestamp(),
        }
    }
}

/// Which flow owns the turn.
///
/// Starts at `Introducing`; the only legal transition is to `Answering`
/// via [`Session::promote`], and only once both lead fields are captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Introducing,
    Answering,
}

/// Main-flow branch selected by the supervisor for the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    Introduction,
    Services,
    Projects,
    Career,
    Fallback,
}

/// Durable per-session conversational state.
///
/// `messages`, `name`, `email`, and `mode` are the durable core; `score`,
/// `options`, `quick_replies`, and `next_branch` are per-turn scratch that
/// is recomputed or cleared on every turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub messages: Vec<Message>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub mode: Mode,
    /// Last FAQ short-circuit similarity score.
    #[serde(default)]
    pub score: f32,
    /// Suggested follow-up questions from the FAQ matcher.
    #[serde(default)]
    pub options: Vec<String>,
    /// Menu options surfaced when lead capture completes.
    #[serde(default)]
    pub quick_replies: Vec<String>,
    /// Routing hint for the current turn only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_branch: Option<Branch>,
}

impl Session {
    /// Create a fresh session in `Introducing` mode.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            name: None,
            email: None,
            mode: Mode::Introducing,
            score: 0.0,
            options: Vec::new(),
            quick_replies: Vec::new(),
            next_branch: None,
        }
    }

    /// Append a message to the history. History is append-only.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The most recent user message, if any.
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }

    /// Sticky merge of a candidate name.
    ///
    /// An empty or whitespace-only candidate never erases a captured value.
    pub fn merge_name(&mut self, candidate: Option<&str>) {
        if let Some(name) = candidate {
            let trimmed = name.trim();
            if !trimmed.is_empty() {
                self.name = Some(trimmed.to_string());
            }
        }
    }

    /// Sticky merge of a candidate email.
    ///
    /// The caller must only pass emails that already passed format
    /// validation; this method enforces the never-erase rule only.
    pub fn merge_email(&mut self, candidate: Option<&str>) {
        if let Some(email) = candidate {
            let trimmed = email.trim();
            if !trimmed.is_empty() {
                self.email = Some(trimmed.to_string());
            }
        }
    }

    /// True once both lead fields are captured.
    pub fn lead_complete(&self) -> bool {
        self.name.is_some() && self.email.is_some()
    }

    /// Promote the session to `Answering` mode.
    ///
    /// Returns true if the promotion happened. A session already in
    /// `Answering` stays there; a session missing either lead field is
    /// left untouched. There is no demotion path.
    pub fn promote(&mut self) -> bool {
        if self.mode == Mode::Answering {
            return false;
        }
        if self.lead_complete() {
            self.mode = Mode::Answering;
            return true;
        }
        false
    }

    /// Clear the per-turn scratch state before processing a new turn.
    pub fn clear_transient(&mut self) {
        self.score = 0.0;
        self.options.clear();
        self.quick_replies.clear();
        self.next_branch = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_introducing() {
        let session = Session::new("s-1");
        assert_eq!(session.mode, Mode::Introducing);
        assert!(session.messages.is_empty());
        assert!(session.name.is_none());
        assert!(session.email.is_none());
    }

    #[test]
    fn test_push_appends_in_order() {
        let mut session = Session::new("s-1");
        session.push(Message::user("hi"));
        session.push(Message::assistant("hello"));
        session.push(Message::user("again"));
        assert_eq!(session.messages.len(), 3);
        assert_eq!(session.messages[0].role, Role::User);
        assert_eq!(session.messages[1].role, Role::Assistant);
        assert_eq!(session.messages[2].content, "again");
    }

    #[test]
    fn test_last_user_message() {
        let mut session = Session::new("s-1");
        assert!(session.last_user_message().is_none());
        session.push(Message::user("first"));
        session.push(Message::assistant("reply"));
        assert_eq!(session.last_user_message().unwrap().content, "first");
        session.push(Message::user("second"));
        assert_eq!(session.last_user_message().unwrap().content, "second");
    }

    #[test]
    fn test_merge_name_sticky() {
        let mut session = Session::new("s-1");
        session.merge_name(Some("Jane"));
        assert_eq!(session.name.as_deref(), Some("Jane"));

        // Empty extraction never erases.
        session.merge_name(None);
        assert_eq!(session.name.as_deref(), Some("Jane"));
        session.merge_name(Some(""));
        assert_eq!(session.name.as_deref(), Some("Jane"));
        session.merge_name(Some("   "));
        assert_eq!(session.name.as_deref(), Some("Jane"));

        // A new valid value does overwrite.
        session.merge_name(Some("Janet"));
        assert_eq!(session.name.as_deref(), Some("Janet"));
    }

    #[test]
    fn test_merge_email_sticky() {
        let mut session = Session::new("s-1");
        session.merge_email(Some("jane@example.com"));
        session.merge_email(None);
        session.merge_email(Some(""));
        assert_eq!(session.email.as_deref(), Some("jane@example.com"));
    }

    #[test]
    fn test_promote_requires_both_fields() {
        let mut session = Session::new("s-1");
        assert!(!session.promote());
        session.merge_name(Some("Jane"));
        assert!(!session.promote());
        assert_eq!(session.mode, Mode::Introducing);

        session.merge_email(Some("jane@example.com"));
        assert!(session.promote());
        assert_eq!(session.mode, Mode::Answering);
    }

    #[test]
    fn test_mode_is_monotonic() {
        let mut session = Session::new("s-1");
        session.merge_name(Some("Jane"));
        session.merge_email(Some("jane@example.com"));
        assert!(session.promote());

        // A second promote is a no-op, and nothing demotes.
        assert!(!session.promote());
        session.merge_name(None);
        session.merge_email(None);
        assert_eq!(session.mode, Mode::Answering);
    }

    #[test]
    fn test_clear_transient_keeps_durable_state() {
        let mut session = Session::new("s-1");
        session.push(Message::user("hi"));
        session.merge_name(Some("Jane"));
        session.score = 0.9;
        session.options = vec!["q1".to_string()];
        session.quick_replies = vec!["Explore services".to_string()];
        session.next_branch = Some(Branch::Services);

        session.clear_transient();

        assert_eq!(session.score, 0.0);
        assert!(session.options.is_empty());
        assert!(session.quick_replies.is_empty());
        assert!(session.next_branch.is_none());
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.name.as_deref(), Some("Jane"));
    }

    #[test]
    fn test_session_round_trips_through_json() {
        let mut session = Session::new("s-1");
        session.push(Message::user("hi"));
        session.push(Message::assistant("hello"));
        session.merge_name(Some("Bob"));
        session.merge_email(Some("bob@example.com"));
        session.promote();

        let json = serde_json::to_string(&session).unwrap();
        let restored: Session = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.session_id, session.session_id);
        assert_eq!(restored.messages, session.messages);
        assert_eq!(restored.name, session.name);
        assert_eq!(restored.email, session.email);
        assert_eq!(restored.mode, session.mode);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }
}
