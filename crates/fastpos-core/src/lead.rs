//! Lead Capture
//!
//! Consultation requests collected by the lead form. Records go to a
//! [`LeadSink`]; the default sink only logs them.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FastPosError, Result};

/// Source label used when the opener does not name one
pub const DEFAULT_SOURCE: &str = "General";

/// Raw form input
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LeadForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub note: String,
}

impl LeadForm {
    /// Check required fields; returns the trimmed form
    pub fn validated(&self) -> Result<LeadForm> {
        let form = LeadForm {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            company: self.company.trim().to_string(),
            note: self.note.trim().to_string(),
        };

        if form.name.is_empty() {
            return Err(FastPosError::Rejected("Vui lòng nhập họ và tên.".into()));
        }
        if !is_plausible_email(&form.email) {
            return Err(FastPosError::Rejected("Email không hợp lệ.".into()));
        }
        if form.phone.chars().filter(char::is_ascii_digit).count() < 8 {
            return Err(FastPosError::Rejected("Số điện thoại không hợp lệ.".into()));
        }
        Ok(form)
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

/// A submitted consultation request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeadRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub note: String,
    /// Which call-to-action opened the form
    pub source: String,
    pub submitted_at: DateTime<Utc>,
}

impl LeadRecord {
    pub fn new(form: LeadForm, source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            id: Uuid::new_v4(),
            name: form.name,
            email: form.email,
            phone: form.phone,
            company: form.company,
            note: form.note,
            source: if source.trim().is_empty() {
                DEFAULT_SOURCE.to_string()
            } else {
                source
            },
            submitted_at: Utc::now(),
        }
    }
}

/// Acknowledgement from a sink
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeadAck {
    pub id: Uuid,
    pub accepted_at: DateTime<Utc>,
}

/// Where lead records go (CRM, database, log)
#[async_trait]
pub trait LeadSink: Send + Sync {
    async fn submit(&self, record: &LeadRecord) -> Result<LeadAck>;
}

/// Sink that only writes the record to the log
#[derive(Clone, Debug, Default)]
pub struct TracingLeadSink;

#[async_trait]
impl LeadSink for TracingLeadSink {
    async fn submit(&self, record: &LeadRecord) -> Result<LeadAck> {
        tracing::info!(
            lead = %record.id,
            name = %record.name,
            email = %record.email,
            phone = %record.phone,
            company = %record.company,
            source = %record.source,
            submitted_at = %record.submitted_at.to_rfc3339(),
            "Lead captured"
        );
        Ok(LeadAck {
            id: record.id,
            accepted_at: Utc::now(),
        })
    }
}

/// In-memory sink (for development/testing)
#[derive(Debug, Default)]
pub struct MemoryLeadSink {
    records: RwLock<Vec<LeadRecord>>,
}

impl MemoryLeadSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LeadRecord> {
        self.records.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LeadSink for MemoryLeadSink {
    async fn submit(&self, record: &LeadRecord) -> Result<LeadAck> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(LeadAck {
            id: record.id,
            accepted_at: Utc::now(),
        })
    }
}

/// Instruction asking the model for a formal confirmation email
pub fn confirmation_email_prompt(record: &LeadRecord) -> String {
    format!(
        r#"Bạn là hệ thống trả lời tự động của công ty FastPOS.
Khách hàng tên là "{name}" vừa đăng ký tư vấn qua website.
Hãy viết một email phản hồi (chỉ nội dung email, không cần tiêu đề phụ) với giọng văn:
1. Cực kỳ trang trọng, chuyên nghiệp (Formal).
2. Cảm ơn khách hàng đã quan tâm đến giải pháp FastPOS.
3. Xác nhận đã nhận được thông tin (SĐT: {phone}).
4. Thông báo rằng chuyên viên tư vấn sẽ liên hệ lại trong vòng 2 giờ làm việc.
5. Ký tên: Ban Quản Trị FastPOS."#,
        name = record.name,
        phone = record.phone,
    )
}

/// Used when the model returns no text
pub const FALLBACK_CONFIRMATION: &str = "Cảm ơn bạn đã đăng ký. Chúng tôi sẽ liên hệ sớm.";

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> LeadForm {
        LeadForm {
            name: " Nguyễn Văn A ".into(),
            email: "a@shop.vn".into(),
            phone: "0901 234 567".into(),
            company: "Cà phê Sáng".into(),
            note: String::new(),
        }
    }

    #[test]
    fn test_validation_trims() {
        let form = form().validated().unwrap();
        assert_eq!(form.name, "Nguyễn Văn A");
    }

    #[test]
    fn test_validation_rejects_bad_email() {
        let mut bad = form();
        bad.email = "not-an-email".into();
        assert!(matches!(bad.validated(), Err(FastPosError::Rejected(_))));
    }

    #[test]
    fn test_validation_rejects_missing_name() {
        let mut bad = form();
        bad.name = "  ".into();
        assert!(bad.validated().is_err());
    }

    #[test]
    fn test_blank_source_defaults() {
        let record = LeadRecord::new(form(), "  ");
        assert_eq!(record.source, DEFAULT_SOURCE);
    }

    #[test]
    fn test_prompt_mentions_name_and_phone() {
        let record = LeadRecord::new(form().validated().unwrap(), "Hero: Trải nghiệm ngay");
        let prompt = confirmation_email_prompt(&record);
        assert!(prompt.contains("\"Nguyễn Văn A\""));
        assert!(prompt.contains("0901 234 567"));
    }

    #[tokio::test]
    async fn test_memory_sink() {
        let sink = MemoryLeadSink::new();
        let record = LeadRecord::new(form(), "CTA: Lên Lịch Demo");
        let ack = sink.submit(&record).await.unwrap();
        assert_eq!(ack.id, record.id);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].source, "CTA: Lên Lịch Demo");
    }
}
