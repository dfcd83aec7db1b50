//! Lead Form Surface

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::error::{FastPosError, Result};
use crate::lead::{
    confirmation_email_prompt, LeadForm, LeadRecord, LeadSink, FALLBACK_CONFIRMATION,
};
use crate::provider::{ContentPart, ContentRequest, GenAiProvider};

/// Model that writes the confirmation email
pub const CONFIRMATION_MODEL: &str = "gemini-3-flash-preview";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum LeadStep {
    Form,
    Success { email: String },
}

/// Result of a successful submission
#[derive(Clone, Debug, Serialize)]
pub struct LeadOutcome {
    pub record: LeadRecord,
    pub confirmation: String,
}

struct LeadState {
    step: LeadStep,
    loading: bool,
}

pub struct LeadFormSurface {
    provider: Arc<dyn GenAiProvider>,
    sink: Arc<dyn LeadSink>,
    model: String,
    source: String,
    state: Mutex<LeadState>,
}

impl LeadFormSurface {
    pub fn new(
        provider: Arc<dyn GenAiProvider>,
        sink: Arc<dyn LeadSink>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            sink,
            model: CONFIRMATION_MODEL.into(),
            source: source.into(),
            state: Mutex::new(LeadState {
                step: LeadStep::Form,
                loading: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LeadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn step(&self) -> LeadStep {
        self.lock().step.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// Validate, hand the record to the sink, then draft the confirmation.
    ///
    /// A failed or empty draft falls back to a fixed message; the lead is
    /// already accepted at that point.
    pub async fn submit(&self, form: &LeadForm) -> Result<LeadOutcome> {
        let form = form.validated()?;
        {
            let mut state = self.lock();
            if state.loading {
                return Err(FastPosError::Busy);
            }
            state.loading = true;
        }

        let record = LeadRecord::new(form, self.source.clone());
        if let Err(e) = self.sink.submit(&record).await {
            tracing::error!(lead = %record.id, error = %e, "Lead sink rejected record");
            self.lock().loading = false;
            return Err(e);
        }

        let confirmation = self.draft_confirmation(&record).await;
        tracing::debug!(lead = %record.id, email = %confirmation, "Confirmation email drafted");

        let mut state = self.lock();
        state.loading = false;
        state.step = LeadStep::Success {
            email: confirmation.clone(),
        };
        Ok(LeadOutcome {
            record,
            confirmation,
        })
    }

    async fn draft_confirmation(&self, record: &LeadRecord) -> String {
        let request = ContentRequest::new(self.model.clone())
            .part(ContentPart::text(confirmation_email_prompt(record)));

        match self.provider.generate_content(&request).await {
            Ok(response) => {
                let text = response.text();
                if text.trim().is_empty() {
                    FALLBACK_CONFIRMATION.to_string()
                } else {
                    text
                }
            }
            Err(e) => {
                tracing::warn!(lead = %record.id, error = %e, "Confirmation draft failed, using fallback");
                FALLBACK_CONFIRMATION.to_string()
            }
        }
    }

    /// Back to an empty form
    pub fn reset(&self) {
        let mut state = self.lock();
        state.step = LeadStep::Form;
        state.loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead::MemoryLeadSink;
    use crate::provider::ContentResponse;
    use crate::testing::{FailingLeadSink, ScriptedProvider};

    fn form() -> LeadForm {
        LeadForm {
            name: "Trần Thị B".into(),
            email: "b@cuahang.vn".into(),
            phone: "0912345678".into(),
            company: "Tạp hóa B".into(),
            note: String::new(),
        }
    }

    #[tokio::test]
    async fn test_submit_records_lead_and_drafts_email() {
        let provider = Arc::new(ScriptedProvider::new().content(ContentResponse {
            parts: vec![ContentPart::text("Kính gửi Quý khách Trần Thị B, ...")],
        }));
        let sink = Arc::new(MemoryLeadSink::new());
        let surface = LeadFormSurface::new(provider.clone(), sink.clone(), "Pricing");

        let outcome = surface.submit(&form()).await.unwrap();

        assert_eq!(outcome.confirmation, "Kính gửi Quý khách Trần Thị B, ...");
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].source, "Pricing");

        let request = &provider.content_requests()[0];
        assert_eq!(request.model, CONFIRMATION_MODEL);
        match &request.parts[0] {
            ContentPart::Text { text } => assert!(text.contains("0912345678")),
            other => panic!("unexpected part {other:?}"),
        }
        assert_eq!(
            surface.step(),
            LeadStep::Success {
                email: outcome.confirmation
            }
        );
    }

    #[tokio::test]
    async fn test_draft_failure_uses_fallback() {
        let provider = Arc::new(ScriptedProvider::new().content_failure());
        let sink = Arc::new(MemoryLeadSink::new());
        let surface = LeadFormSurface::new(provider, sink.clone(), "");

        let outcome = surface.submit(&form()).await.unwrap();
        assert_eq!(outcome.confirmation, FALLBACK_CONFIRMATION);
        assert_eq!(outcome.record.source, "General");
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_draft_uses_fallback() {
        let provider = Arc::new(ScriptedProvider::new());
        let surface = LeadFormSurface::new(provider, Arc::new(MemoryLeadSink::new()), "Hero");
        let outcome = surface.submit(&form()).await.unwrap();
        assert_eq!(outcome.confirmation, FALLBACK_CONFIRMATION);
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_sink() {
        let provider = Arc::new(ScriptedProvider::new());
        let sink = Arc::new(MemoryLeadSink::new());
        let surface = LeadFormSurface::new(provider.clone(), sink.clone(), "Hero");

        let mut bad = form();
        bad.email = "not-an-email".into();
        assert!(matches!(surface.submit(&bad).await, Err(FastPosError::Rejected(_))));
        assert!(sink.is_empty());
        assert!(provider.content_requests().is_empty());
        assert_eq!(surface.step(), LeadStep::Form);
    }

    #[tokio::test]
    async fn test_sink_failure_keeps_form() {
        let provider = Arc::new(ScriptedProvider::new());
        let surface = LeadFormSurface::new(provider.clone(), Arc::new(FailingLeadSink), "Hero");

        let err = surface.submit(&form()).await.unwrap_err();
        assert!(matches!(err, FastPosError::Communication(_)));
        assert_eq!(surface.step(), LeadStep::Form);
        assert!(!surface.is_loading());
        assert!(provider.content_requests().is_empty());
    }

    #[tokio::test]
    async fn test_reset_returns_to_form() {
        let surface = LeadFormSurface::new(
            Arc::new(ScriptedProvider::new()),
            Arc::new(MemoryLeadSink::new()),
            "Hero",
        );
        surface.submit(&form()).await.unwrap();
        surface.reset();
        assert_eq!(surface.step(), LeadStep::Form);
    }
}
