//! Scripted collaborators for unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::credential::CredentialProvider;
use crate::error::{FastPosError, Result};
use crate::lead::{LeadAck, LeadRecord, LeadSink};
use crate::media::{EncodedMedia, MediaBlob};
use crate::provider::{
    ChatSession, ChatSpec, ContentRequest, ContentResponse, GenAiProvider, MediaReference,
    Operation, OperationHandle, ProviderInfo, Reply, VideoRequest,
};
use crate::session::SessionId;

/// What the next chat send should do
#[derive(Clone, Debug)]
pub enum ChatOutcome {
    Reply(Reply),
    Fail,
    /// Never answers
    Stall,
}

#[derive(Default)]
struct ChatState {
    outcomes: VecDeque<ChatOutcome>,
    sent: Vec<(SessionId, String)>,
}

pub struct ScriptedSession {
    id: SessionId,
    state: Arc<Mutex<ChatState>>,
}

impl ScriptedSession {
    pub fn boxed(outcomes: Vec<ChatOutcome>) -> Box<dyn ChatSession> {
        Box::new(Self {
            id: SessionId::new(),
            state: Arc::new(Mutex::new(ChatState {
                outcomes: outcomes.into(),
                sent: Vec::new(),
            })),
        })
    }
}

#[async_trait]
impl ChatSession for ScriptedSession {
    fn id(&self) -> &SessionId {
        &self.id
    }

    async fn send(&mut self, text: &str) -> Result<Reply> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            state.sent.push((self.id.clone(), text.to_string()));
            state.outcomes.pop_front()
        };
        tokio::task::yield_now().await;
        match outcome {
            Some(ChatOutcome::Reply(reply)) => Ok(reply),
            Some(ChatOutcome::Fail) => Err(FastPosError::Communication("connection reset".into())),
            Some(ChatOutcome::Stall) => std::future::pending().await,
            None => Ok(Reply {
                text: format!("echo: {}", text),
                links: Vec::new(),
            }),
        }
    }
}

#[derive(Default)]
struct ProviderState {
    specs: Vec<ChatSpec>,
    sessions: Vec<SessionId>,
    content_responses: VecDeque<Result<ContentResponse>>,
    content_requests: Vec<ContentRequest>,
    stall_content: bool,
    submits: u32,
    polls: Vec<Instant>,
}

/// Provider double with scripted chat, content and operation behaviour
pub struct ScriptedProvider {
    chat: Arc<Mutex<ChatState>>,
    state: Mutex<ProviderState>,
    pending_polls: usize,
    auth_failure_on_poll: Option<usize>,
    auth_failure_on_submit: bool,
    with_result: bool,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    pub const VIDEO_URI: &'static str = "https://media.example/video.mp4?alt=media";

    pub fn new() -> Self {
        Self {
            chat: Arc::new(Mutex::new(ChatState::default())),
            state: Mutex::new(ProviderState::default()),
            pending_polls: 0,
            auth_failure_on_poll: None,
            auth_failure_on_submit: false,
            with_result: true,
        }
    }

    /// Number of `done: false` answers before the operation completes
    pub fn pending_polls(mut self, n: usize) -> Self {
        self.pending_polls = n;
        self
    }

    pub fn without_result(mut self) -> Self {
        self.with_result = false;
        self
    }

    /// Fail the k-th status check (1-based) with an auth error
    pub fn auth_failure_on_poll(mut self, k: usize) -> Self {
        self.auth_failure_on_poll = Some(k);
        self
    }

    pub fn auth_failure_on_submit(mut self) -> Self {
        self.auth_failure_on_submit = true;
        self
    }

    pub fn reply(self, text: &str, links: &[&str]) -> Self {
        self.chat.lock().unwrap().outcomes.push_back(ChatOutcome::Reply(Reply {
            text: text.into(),
            links: links.iter().map(|l| (*l).to_string()).collect(),
        }));
        self
    }

    pub fn fail_send(self) -> Self {
        self.chat.lock().unwrap().outcomes.push_back(ChatOutcome::Fail);
        self
    }

    pub fn content(self, response: ContentResponse) -> Self {
        self.state.lock().unwrap().content_responses.push_back(Ok(response));
        self
    }

    pub fn stall_send(self) -> Self {
        self.chat.lock().unwrap().outcomes.push_back(ChatOutcome::Stall);
        self
    }

    /// The next content request never answers
    pub fn stall_content(self) -> Self {
        self.state.lock().unwrap().stall_content = true;
        self
    }

    pub fn content_failure(self) -> Self {
        self.state
            .lock()
            .unwrap()
            .content_responses
            .push_back(Err(FastPosError::Communication("service unavailable".into())));
        self
    }

    pub fn sessions(&self) -> Vec<SessionId> {
        self.state.lock().unwrap().sessions.clone()
    }

    pub fn specs(&self) -> Vec<ChatSpec> {
        self.state.lock().unwrap().specs.clone()
    }

    /// Texts sent so far, tagged with the session that carried them
    pub fn sent(&self) -> Vec<(SessionId, String)> {
        self.chat.lock().unwrap().sent.clone()
    }

    pub fn content_requests(&self) -> Vec<ContentRequest> {
        self.state.lock().unwrap().content_requests.clone()
    }

    pub fn submit_count(&self) -> u32 {
        self.state.lock().unwrap().submits
    }

    pub fn poll_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().polls.clone()
    }
}

#[async_trait]
impl GenAiProvider for ScriptedProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        Ok(ProviderInfo {
            name: "Scripted".into(),
            chat_model: "test-model".into(),
            supports_video: true,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn start_chat(&self, spec: &ChatSpec) -> Result<Box<dyn ChatSession>> {
        let id = SessionId::new();
        let mut state = self.state.lock().unwrap();
        state.specs.push(spec.clone());
        state.sessions.push(id.clone());
        Ok(Box::new(ScriptedSession {
            id,
            state: self.chat.clone(),
        }))
    }

    async fn generate_content(&self, request: &ContentRequest) -> Result<ContentResponse> {
        let (next, stall) = {
            let mut state = self.state.lock().unwrap();
            state.content_requests.push(request.clone());
            let stall = std::mem::take(&mut state.stall_content);
            (state.content_responses.pop_front(), stall)
        };
        if stall {
            return std::future::pending().await;
        }
        next.unwrap_or_else(|| Ok(ContentResponse::default()))
    }

    async fn submit_video(&self, _request: &VideoRequest) -> Result<Operation> {
        self.state.lock().unwrap().submits += 1;
        if self.auth_failure_on_submit {
            return Err(FastPosError::Auth("Requested entity was not found.".into()));
        }
        Ok(Operation::pending(OperationHandle::new("operations/test-1")))
    }

    async fn poll_operation(&self, handle: &OperationHandle) -> Result<Operation> {
        let count = {
            let mut state = self.state.lock().unwrap();
            state.polls.push(Instant::now());
            state.polls.len()
        };
        if self.auth_failure_on_poll == Some(count) {
            return Err(FastPosError::Auth("Requested entity was not found.".into()));
        }
        let done = count > self.pending_polls;
        Ok(Operation {
            handle: handle.clone(),
            done,
            result: (done && self.with_result).then(|| MediaReference {
                uri: Self::VIDEO_URI.into(),
            }),
            error: None,
        })
    }

    async fn fetch_media(&self, _reference: &MediaReference) -> Result<MediaBlob> {
        Ok(MediaBlob::new("video/mp4", vec![0, 0, 0, 24, b'f', b't', b'y', b'p']))
    }
}

/// Credential double
#[derive(Debug, Default)]
pub struct StaticCredentials {
    available: AtomicBool,
    grant_on_prompt: bool,
    prompts: AtomicU32,
}

impl StaticCredentials {
    pub fn available() -> Self {
        Self {
            available: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }

    /// Missing until the first prompt
    pub fn granted_on_prompt() -> Self {
        Self {
            grant_on_prompt: true,
            ..Default::default()
        }
    }

    pub fn prompt_count(&self) -> u32 {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn has_credential(&self) -> Result<bool> {
        Ok(self.available.load(Ordering::SeqCst))
    }

    async fn prompt_for_credential(&self) -> Result<()> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if self.grant_on_prompt {
            self.available.store(true, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Lead sink that always fails
pub struct FailingLeadSink;

#[async_trait]
impl LeadSink for FailingLeadSink {
    async fn submit(&self, _record: &LeadRecord) -> Result<LeadAck> {
        Err(FastPosError::Communication("crm offline".into()))
    }
}

pub fn video_request() -> VideoRequest {
    VideoRequest {
        model: "veo-test".into(),
        image: EncodedMedia::from_bytes("image/png", &[1, 2, 3]),
        prompt: None,
        number_of_videos: 1,
        resolution: "720p".into(),
        aspect_ratio: "16:9".into(),
    }
}

pub fn png_upload() -> crate::media::UploadFile {
    crate::media::UploadFile::new("shop.png", "image/png", vec![0x89, b'P', b'N', b'G', 1, 2, 3])
}
