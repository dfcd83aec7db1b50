//! Conversation Turns
//!
//! The turn log shown by a chat surface. Lives only as long as the surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// Site visitor
    User,
    /// AI assistant
    Agent,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Speaker::User => write!(f, "user"),
            Speaker::Agent => write!(f, "agent"),
        }
    }
}

/// A single exchange unit in a conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,

    pub text: String,

    /// Grounding links attached to an agent reply
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,

    /// Set when the turn is a fallback produced after a failed send
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            links: Vec::new(),
            fallback: false,
            timestamp: Utc::now(),
        }
    }

    pub fn agent(text: impl Into<String>, links: Vec<String>) -> Self {
        Self {
            speaker: Speaker::Agent,
            text: text.into(),
            links,
            fallback: false,
            timestamp: Utc::now(),
        }
    }

    /// Agent turn standing in for a reply that never arrived
    pub fn fallback(text: impl Into<String>) -> Self {
        Self {
            fallback: true,
            ..Self::agent(text, Vec::new())
        }
    }
}

/// Ordered turn log for one chat surface
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// All turns in submission order
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Drop every turn
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
