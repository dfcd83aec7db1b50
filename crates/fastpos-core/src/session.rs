//! Session Management
//!
//! Each chat surface owns one [`SessionSlot`]. The slot creates its session
//! lazily, lends it out for the duration of a send, and drops it for good when
//! a send fails or the surface closes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::provider::{ChatSession, ChatSpec};

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Holder for the single session a chat surface may use
pub struct SessionSlot {
    spec: ChatSpec,
    current: Option<Box<dyn ChatSession>>,
    closed: bool,
    created: u64,
}

impl SessionSlot {
    pub fn new(spec: ChatSpec) -> Self {
        Self {
            spec,
            current: None,
            closed: false,
            created: 0,
        }
    }

    /// Spec used when a new session must be created
    pub fn spec(&self) -> &ChatSpec {
        &self.spec
    }

    /// Take the cached session out for a send.
    ///
    /// `None` means the caller must create a fresh one from [`Self::spec`].
    pub fn checkout(&mut self) -> Option<Box<dyn ChatSession>> {
        self.current.take()
    }

    /// Record that a brand-new session was created for this slot
    pub fn note_created(&mut self, id: &SessionId) {
        self.created += 1;
        tracing::debug!(session = %id, created = self.created, "Chat session created");
    }

    /// Return a session after a successful send
    pub fn checkin(&mut self, session: Box<dyn ChatSession>) {
        if self.closed {
            tracing::debug!(session = %session.id(), "Slot closed, dropping returned session");
            return;
        }
        self.current = Some(session);
    }

    /// Forget the cached session so the next send builds a new one
    pub fn invalidate(&mut self) {
        if let Some(session) = self.current.take() {
            tracing::info!(session = %session.id(), "Chat session invalidated");
        }
    }

    /// Invalidate and refuse any session handed back afterwards
    pub fn close(&mut self) {
        self.invalidate();
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Id of the cached session, if one is parked in the slot
    pub fn current_id(&self) -> Option<&SessionId> {
        self.current.as_ref().map(|s| s.id())
    }

    /// How many sessions this slot has created so far
    pub fn created_count(&self) -> u64 {
        self.created
    }
}

impl std::fmt::Debug for SessionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSlot")
            .field("model", &self.spec.model)
            .field("current", &self.current_id())
            .field("closed", &self.closed)
            .field("created", &self.created)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedSession;

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn test_checkout_empties_slot() {
        let mut slot = SessionSlot::new(ChatSpec::new("test-model"));
        assert!(slot.checkout().is_none());

        let session = ScriptedSession::boxed(Vec::new());
        let id = session.id().clone();
        slot.checkin(session);
        assert_eq!(slot.current_id(), Some(&id));

        assert!(slot.checkout().is_some());
        assert!(slot.current_id().is_none());
    }

    #[test]
    fn test_closed_slot_rejects_checkin() {
        let mut slot = SessionSlot::new(ChatSpec::new("test-model"));
        slot.close();
        slot.checkin(ScriptedSession::boxed(Vec::new()));
        assert!(slot.is_closed());
        assert!(slot.current_id().is_none());
    }

    #[test]
    fn test_invalidate_drops_session() {
        let mut slot = SessionSlot::new(ChatSpec::new("test-model"));
        slot.checkin(ScriptedSession::boxed(Vec::new()));
        slot.invalidate();
        assert!(slot.checkout().is_none());
        assert!(!slot.is_closed());
    }
}
