//! Chat Surface
//!
//! Backs both the floating chatbot and the playground chat tab. Each instance
//! owns its conversation and its session slot; nothing is shared between
//! instances.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{FastPosError, Result};
use crate::message::{Conversation, Turn};
use crate::provider::{ChatSpec, GenAiProvider, ToolCapability};
use crate::session::{SessionId, SessionSlot};

use super::BusyGuard;

const CHATBOT_SYSTEM_PROMPT: &str = "Bạn là trợ lý AI chuyên nghiệp của FastPOS. \
Địa chỉ trụ sở công ty tại 66 Nguyễn Huệ, Quận 1, TP.HCM. \
Nhiệm vụ của bạn là hỗ trợ khách hàng tìm hiểu về các giải pháp quản lý bán hàng, tồn kho, nhân sự của FastPOS. \
Hãy trả lời ngắn gọn, súc tích, thân thiện và sử dụng tiếng Việt. \
Nếu khách hàng hỏi về địa điểm, hãy sử dụng Google Maps để cung cấp thông tin chính xác.";

/// Model, prompt and canned texts for one kind of chat surface
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatProfile {
    pub model: String,
    pub system_prompt: String,
    #[serde(default)]
    pub tools: Vec<ToolCapability>,

    /// Shown when the service answers with no text
    pub empty_reply: String,

    /// Shown as the agent turn after a failed send
    pub fallback_reply: String,

    /// Starter questions offered on an empty conversation
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl ChatProfile {
    /// Floating chatbot: map-grounded, Vietnamese
    pub fn chatbot() -> Self {
        Self {
            model: "gemini-2.5-flash".into(),
            system_prompt: CHATBOT_SYSTEM_PROMPT.into(),
            tools: vec![ToolCapability::MapGrounding],
            empty_reply: "Xin lỗi, tôi không thể phản hồi lúc này.".into(),
            fallback_reply: "Đã có lỗi kết nối. Vui lòng thử lại sau.".into(),
            suggestions: vec![
                "Giá cả thế nào?".into(),
                "Văn phòng ở đâu?".into(),
                "Có dùng thử không?".into(),
            ],
        }
    }

    /// Playground chat tab
    pub fn playground() -> Self {
        Self {
            model: "gemini-3-pro-preview".into(),
            system_prompt: "You are a helpful assistant for the FastPOS application.".into(),
            tools: Vec::new(),
            empty_reply: "No response".into(),
            fallback_reply: "Xin lỗi, đã có lỗi xảy ra. Vui lòng thử lại.".into(),
            suggestions: Vec::new(),
        }
    }

    pub fn spec(&self) -> ChatSpec {
        let mut spec = ChatSpec::new(self.model.clone()).system_prompt(self.system_prompt.clone());
        spec.tools = self.tools.clone();
        spec
    }
}

/// Snapshot rendered by the shell
#[derive(Clone, Debug, Serialize)]
pub struct ChatView {
    pub turns: Vec<Turn>,
    pub loading: bool,
    pub suggestions: Vec<String>,
}

struct ChatState {
    conversation: Conversation,
    slot: SessionSlot,
    loading: bool,
}

/// One chat widget instance
pub struct ChatSurface {
    provider: Arc<dyn GenAiProvider>,
    profile: ChatProfile,
    state: Mutex<ChatState>,
}

impl ChatSurface {
    pub fn new(provider: Arc<dyn GenAiProvider>, profile: ChatProfile) -> Self {
        let slot = SessionSlot::new(profile.spec());
        Self {
            provider,
            profile,
            state: Mutex::new(ChatState {
                conversation: Conversation::new(),
                slot,
                loading: false,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn profile(&self) -> &ChatProfile {
        &self.profile
    }

    pub fn view(&self) -> ChatView {
        let state = self.lock();
        ChatView {
            turns: state.conversation.turns().to_vec(),
            loading: state.loading,
            suggestions: if state.conversation.is_empty() {
                self.profile.suggestions.clone()
            } else {
                Vec::new()
            },
        }
    }

    pub fn conversation(&self) -> Conversation {
        self.lock().conversation.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// Id of the parked session, if any
    pub fn session_id(&self) -> Option<SessionId> {
        self.lock().slot.current_id().cloned()
    }

    /// Send one visitor turn and return the agent turn appended for it.
    ///
    /// On failure a fallback agent turn is appended, the session is dropped
    /// so the next send starts a new one, and the error is returned.
    pub async fn send(&self, text: &str) -> Result<Turn> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FastPosError::Rejected("Vui lòng nhập câu hỏi.".into()));
        }

        let parked = {
            let mut state = self.lock();
            if state.slot.is_closed() {
                return Err(FastPosError::Cancelled);
            }
            if state.loading {
                return Err(FastPosError::Busy);
            }
            state.loading = true;
            state.conversation.push(Turn::user(text));
            state.slot.checkout()
        };

        // A dropped request counts as a failed send
        let guard = BusyGuard::new(&self.state, |state: &mut ChatState| {
            state.loading = false;
            if !state.slot.is_closed() {
                state.conversation.push(Turn::fallback(self.profile.fallback_reply.clone()));
            }
        });

        let mut session = match parked {
            Some(session) => session,
            None => {
                let spec = self.profile.spec();
                match self.provider.start_chat(&spec).await {
                    Ok(session) => {
                        self.lock().slot.note_created(session.id());
                        session
                    }
                    Err(e) => {
                        guard.disarm();
                        return Err(self.fail(e));
                    }
                }
            }
        };

        let result = session.send(text).await;
        guard.disarm();

        let mut state = self.lock();
        state.loading = false;
        if state.slot.is_closed() {
            return Err(FastPosError::Cancelled);
        }

        match result {
            Ok(reply) => {
                let body = if reply.text.trim().is_empty() {
                    self.profile.empty_reply.clone()
                } else {
                    reply.text
                };
                let turn = Turn::agent(body, reply.links);
                state.conversation.push(turn.clone());
                state.slot.checkin(session);
                Ok(turn)
            }
            Err(e) => {
                tracing::error!(session = %session.id(), error = %e, "Chat send failed");
                drop(session);
                state.slot.invalidate();
                state.conversation.push(Turn::fallback(self.profile.fallback_reply.clone()));
                Err(e)
            }
        }
    }

    fn fail(&self, err: FastPosError) -> FastPosError {
        tracing::error!(error = %err, model = %self.profile.model, "Chat session could not be created");
        let mut state = self.lock();
        state.loading = false;
        state.slot.invalidate();
        if !state.slot.is_closed() {
            state.conversation.push(Turn::fallback(self.profile.fallback_reply.clone()));
        }
        err
    }

    /// Discard the conversation and the session
    pub fn close(&self) {
        let mut state = self.lock();
        state.slot.close();
        state.conversation.clear();
        state.loading = false;
    }
}
