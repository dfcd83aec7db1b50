//! Error Types

use thiserror::Error;

/// Result type alias for FastPOS operations
pub type Result<T> = std::result::Result<T, FastPosError>;

/// Errors raised by the AI interaction layer and the surfaces built on it
#[derive(Error, Debug)]
pub enum FastPosError {
    /// Session send failed (network or service fault)
    #[error("Communication error: {0}")]
    Communication(String),

    /// Local file could not be read or encoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Operation completed without a usable result
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Credential invalid, expired or unknown to the service
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Input rejected before reaching the service
    #[error("Rejected: {0}")]
    Rejected(String),

    /// A request is already in flight on this surface
    #[error("Surface busy")]
    Busy,

    /// No credential has been selected yet
    #[error("Credential required")]
    CredentialRequired,

    /// The owning surface was closed while the task was running
    #[error("Cancelled")]
    Cancelled,

    /// Unknown surface, media or operation
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Response could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl FastPosError {
    /// Short machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            FastPosError::Communication(_) => "COMMUNICATION_ERROR",
            FastPosError::Decode(_) => "DECODE_ERROR",
            FastPosError::GenerationFailed(_) => "GENERATION_FAILED",
            FastPosError::Auth(_) => "AUTH_ERROR",
            FastPosError::Rejected(_) => "REJECTED",
            FastPosError::Busy => "BUSY",
            FastPosError::CredentialRequired => "CREDENTIAL_REQUIRED",
            FastPosError::Cancelled => "CANCELLED",
            FastPosError::NotFound(_) => "NOT_FOUND",
            FastPosError::Config(_) => "CONFIG_ERROR",
            FastPosError::Parse(_) => "PARSE_ERROR",
            FastPosError::Io(_) | FastPosError::Json(_) | FastPosError::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Localized message shown to site visitors
    pub fn user_message(&self) -> String {
        match self {
            FastPosError::Communication(_) => "Đã có lỗi kết nối. Vui lòng thử lại sau.".into(),
            FastPosError::Decode(_) => "Không thể đọc tệp đã chọn. Vui lòng chọn lại.".into(),
            FastPosError::GenerationFailed(_) => "Không thể tạo nội dung. Vui lòng thử lại.".into(),
            FastPosError::Auth(_) => "API Key không hợp lệ hoặc đã hết hạn. Vui lòng chọn lại.".into(),
            FastPosError::Rejected(msg) => msg.clone(),
            FastPosError::Busy => "Yêu cầu trước đó vẫn đang được xử lý.".into(),
            FastPosError::CredentialRequired => "Yêu cầu API Key trả phí.".into(),
            FastPosError::Cancelled => "Yêu cầu đã bị hủy.".into(),
            FastPosError::NotFound(_) => "Không tìm thấy dữ liệu yêu cầu.".into(),
            _ => "Đã có lỗi xảy ra. Vui lòng thử lại.".into(),
        }
    }
}

impl From<anyhow::Error> for FastPosError {
    fn from(err: anyhow::Error) -> Self {
        FastPosError::Other(err.to_string())
    }
}
