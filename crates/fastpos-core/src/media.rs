//! Media Upload Encoding
//!
//! Turns a visitor-selected image into a base64 payload the AI service accepts,
//! and keeps locally viewable copies (previews, generated results) in a
//! [`MediaStore`] until their owner releases them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FastPosError, Result};

/// Upper bound for uploads when nothing else is configured
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Strip a `data:<mime>;base64,` prefix if one is present
pub fn strip_data_url_prefix(payload: &str) -> &str {
    if payload.starts_with("data:") {
        if let Some((_, data)) = payload.split_once(',') {
            return data;
        }
    }
    payload
}

/// Build a data URL around an already-encoded payload
pub fn data_url(mime_type: &str, payload: &str) -> String {
    format!("data:{};base64,{}", mime_type, strip_data_url_prefix(payload))
}

/// Decode a base64 payload, with or without a data-URL prefix
pub fn decode(payload: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(strip_data_url_prefix(payload).trim())
        .map_err(|e| FastPosError::Decode(format!("Invalid base64 payload: {}", e)))
}

/// Base64 payload plus its declared media type
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedMedia {
    pub mime_type: String,

    /// Base64 data without any data-URL prefix
    pub data: String,
}

impl EncodedMedia {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        let data = data.into();
        Self {
            mime_type: mime_type.into(),
            data: strip_data_url_prefix(&data).to_string(),
        }
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: BASE64.encode(bytes),
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        decode(&self.data)
    }

    pub fn to_data_url(&self) -> String {
        data_url(&self.mime_type, &self.data)
    }
}

/// Raw media bytes, e.g. a downloaded video or a decoded image
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaBlob {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl MediaBlob {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn from_encoded(media: &EncodedMedia) -> Result<Self> {
        Ok(Self::new(media.mime_type.clone(), media.decode()?))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A file chosen by the visitor, before encoding
#[derive(Clone, Debug)]
pub struct UploadFile {
    pub name: String,
    /// Media type declared by the browser
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk
    pub async fn read(path: impl AsRef<Path>, mime_type: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| FastPosError::Decode(format!("Cannot read {}: {}", path.display(), e)))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, mime_type, bytes))
    }
}

/// Validation rules applied before a file is encoded
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadPolicy {
    /// Largest accepted file, in bytes
    pub max_bytes: usize,

    /// Accepted media type prefix
    pub accepted_prefix: String,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            accepted_prefix: "image/".into(),
        }
    }
}

impl UploadPolicy {
    pub fn validate(&self, file: &UploadFile) -> Result<()> {
        if !file.mime_type.starts_with(&self.accepted_prefix) {
            return Err(FastPosError::Rejected("Chỉ hỗ trợ tệp hình ảnh.".into()));
        }
        if file.bytes.is_empty() {
            return Err(FastPosError::Rejected("Tệp đã chọn không có dữ liệu.".into()));
        }
        if file.bytes.len() > self.max_bytes {
            return Err(FastPosError::Rejected(format!(
                "Tệp quá lớn (tối đa {} MB).",
                self.max_bytes / (1024 * 1024)
            )));
        }
        Ok(())
    }
}

/// Identifier of a blob held in the [`MediaStore`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaId(Uuid);

impl MediaId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| FastPosError::NotFound(format!("media {}", s)))
    }

    /// Local URL the web shell can render
    pub fn url(&self) -> String {
        format!("/media/{}", self.0)
    }
}

impl Default for MediaId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MediaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Locally viewable media (upload previews and generated results)
///
/// Entries stay until released explicitly.
#[derive(Debug, Default)]
pub struct MediaStore {
    blobs: RwLock<HashMap<MediaId, Arc<MediaBlob>>>,
}

impl MediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, blob: MediaBlob) -> MediaId {
        let id = MediaId::new();
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(blob));
        id
    }

    pub fn get(&self, id: &MediaId) -> Option<Arc<MediaBlob>> {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Release a blob. Returns whether it was still held.
    pub fn release(&self, id: &MediaId) -> bool {
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An encoded upload and its preview, owned by one surface
#[derive(Clone, Debug)]
pub struct UploadAsset {
    pub file_name: String,
    pub encoded: EncodedMedia,
    pub preview: MediaId,
    pub size: usize,
}

impl UploadAsset {
    pub fn preview_url(&self) -> String {
        self.preview.url()
    }

    /// Release the preview held for this asset
    pub fn release(&self, store: &MediaStore) {
        if store.release(&self.preview) {
            tracing::debug!(preview = %self.preview, file = %self.file_name, "Preview released");
        }
    }
}

/// Validates and encodes uploads, registering a preview for each
#[derive(Clone, Debug)]
pub struct MediaEncoder {
    policy: UploadPolicy,
    store: Arc<MediaStore>,
}

impl MediaEncoder {
    pub fn new(policy: UploadPolicy, store: Arc<MediaStore>) -> Self {
        Self { policy, store }
    }

    pub fn store(&self) -> &Arc<MediaStore> {
        &self.store
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Validate, encode and register a preview for a selected file
    pub async fn encode(&self, file: UploadFile) -> Result<UploadAsset> {
        self.policy.validate(&file)?;

        let size = file.bytes.len();
        let encoded = EncodedMedia::from_bytes(file.mime_type.clone(), &file.bytes);
        let preview = self.store.insert(MediaBlob::new(file.mime_type, file.bytes));

        tracing::debug!(file = %file.name, size, preview = %preview, "Upload encoded");

        Ok(UploadAsset {
            file_name: file.name,
            encoded,
            preview,
            size,
        })
    }

    /// Read a file from disk and encode it
    pub async fn encode_path(
        &self,
        path: impl AsRef<Path>,
        mime_type: impl Into<String>,
    ) -> Result<UploadAsset> {
        let file = UploadFile::read(path, mime_type).await?;
        self.encode(file).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Smallest valid PNG: 1x1 transparent pixel
    const PNG_1X1: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    fn encoder() -> MediaEncoder {
        MediaEncoder::new(UploadPolicy::default(), Arc::new(MediaStore::new()))
    }

    /// JPEG-shaped payload: SOI marker, pseudo-random body, EOI marker
    fn large_jpeg() -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        let mut state: u32 = 0x1234_5678;
        while bytes.len() < 1_200_000 {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            bytes.push((state & 0xFF) as u8);
        }
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        bytes
    }

    #[test]
    fn test_strip_prefix() {
        assert_eq!(strip_data_url_prefix("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_url_prefix("AAAA"), "AAAA");
    }

    #[tokio::test]
    async fn test_png_round_trip() {
        let asset = encoder()
            .encode(UploadFile::new("pixel.png", "image/png", PNG_1X1.to_vec()))
            .await
            .unwrap();

        assert!(!asset.encoded.data.starts_with("data:"));
        assert_eq!(asset.encoded.decode().unwrap(), PNG_1X1);
        assert_eq!(decode(&asset.encoded.to_data_url()).unwrap(), PNG_1X1);
    }

    #[tokio::test]
    async fn test_large_jpeg_round_trip() {
        let original = large_jpeg();
        let asset = encoder()
            .encode(UploadFile::new("shop.jpg", "image/jpeg", original.clone()))
            .await
            .unwrap();

        assert_eq!(asset.size, original.len());
        assert_eq!(asset.encoded.decode().unwrap(), original);
    }

    #[tokio::test]
    async fn test_rejects_non_image() {
        let err = encoder()
            .encode(UploadFile::new("notes.pdf", "application/pdf", vec![1, 2, 3]))
            .await
            .unwrap_err();
        assert!(matches!(err, FastPosError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_rejects_oversized() {
        let policy = UploadPolicy {
            max_bytes: 16,
            ..Default::default()
        };
        let encoder = MediaEncoder::new(policy, Arc::new(MediaStore::new()));
        let err = encoder
            .encode(UploadFile::new("big.png", "image/png", vec![0; 17]))
            .await
            .unwrap_err();
        assert!(matches!(err, FastPosError::Rejected(_)));
        assert!(encoder.store().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_decode_error() {
        let err = encoder()
            .encode_path("/definitely/not/here.png", "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, FastPosError::Decode(_)));
    }

    #[tokio::test]
    async fn test_preview_release() {
        let encoder = encoder();
        let asset = encoder
            .encode(UploadFile::new("pixel.png", "image/png", PNG_1X1.to_vec()))
            .await
            .unwrap();

        assert_eq!(encoder.store().len(), 1);
        assert!(asset.preview_url().starts_with("/media/"));

        asset.release(encoder.store());
        assert!(encoder.store().is_empty());
        assert!(!encoder.store().release(&asset.preview));
    }

    #[test]
    fn test_invalid_base64_is_decode_error() {
        assert!(matches!(decode("not base64!!"), Err(FastPosError::Decode(_))));
    }
}
