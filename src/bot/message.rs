//! Conversation history and the messages it owns.

use chrono::{DateTime, Utc};

use crate::bot::responder::Intent;

/// Semantic tag attached to bot replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Traffic,
    Route,
    Alert,
    General,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Traffic => "traffic",
            MessageKind::Route => "route",
            MessageKind::Alert => "alert",
            MessageKind::General => "general",
        }
    }
}

/// One turn in a conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Unique within the owning conversation.
    pub id: u64,
    pub text: String,
    pub is_bot: bool,
    pub timestamp: DateTime<Utc>,
    /// Set on bot replies only.
    pub kind: Option<MessageKind>,
}

/// Per-chat message history in insertion order.
///
/// Ids come from a counter and timestamps never move backwards, even if
/// the wall clock does.
#[derive(Debug)]
pub struct Conversation {
    messages: Vec<Message>,
    next_id: u64,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            next_id: 0,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Append the user's message and the bot's reply, returning the reply.
    pub fn reply_to(&mut self, text: &str) -> &Message {
        self.push(text.to_string(), false, None);
        let intent = Intent::of(text);
        self.push(intent.reply().to_string(), true, Some(intent.kind()))
    }

    fn push(&mut self, text: String, is_bot: bool, kind: Option<MessageKind>) -> &Message {
        let now = Utc::now();
        // Clamp so timestamps are monotonic non-decreasing per conversation
        let timestamp = match self.messages.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        self.next_id += 1;
        self.messages.push(Message {
            id: self.next_id,
            text,
            is_bot,
            timestamp,
            kind,
        });
        self.messages.last().expect("just pushed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_appends_user_and_bot_turns() {
        let mut convo = Conversation::new();
        let reply = convo.reply_to("hello there");
        assert!(reply.is_bot);
        assert_eq!(reply.kind, Some(MessageKind::General));

        let messages = convo.messages();
        assert_eq!(messages.len(), 2);
        assert!(!messages[0].is_bot);
        assert_eq!(messages[0].text, "hello there");
        assert_eq!(messages[0].kind, None);
        assert!(messages[1].is_bot);
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let mut convo = Conversation::new();
        convo.reply_to("first");
        convo.reply_to("second");
        convo.reply_to("third");

        let ids: Vec<u64> = convo.messages().iter().map(|m| m.id).collect();
        let mut deduped = ids.clone();
        deduped.dedup();
        assert_eq!(ids, deduped);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_timestamps_monotonic_non_decreasing() {
        let mut convo = Conversation::new();
        for i in 0..10 {
            convo.reply_to(&format!("message {i}"));
        }
        let stamps: Vec<_> = convo.messages().iter().map(|m| m.timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_bot_reply_carries_intent_tag() {
        let mut convo = Conversation::new();
        let reply = convo.reply_to("/traffic");
        assert_eq!(reply.kind, Some(MessageKind::Traffic));
    }
}
