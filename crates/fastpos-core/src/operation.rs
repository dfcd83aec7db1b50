//! Long-Running Operation Polling
//!
//! Video synthesis runs in the background on the service side. The poller
//! submits the request, re-checks the operation on a fixed interval and hands
//! back the finished media. Every wait is raced against a [`CancelToken`] so a
//! closed surface stops polling at the next suspension point.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{FastPosError, Result};
use crate::media::MediaBlob;
use crate::provider::{GenAiProvider, MediaReference, Operation, VideoRequest};

/// Polling cadence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay before each status check
    #[serde(with = "duration_secs")]
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// Create a linked cancel handle / token pair
pub fn cancellation() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelToken(rx))
}

/// Owner side: fires cancellation
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }
}

/// Task side: observes cancellation
///
/// Dropping the [`CancelHandle`] counts as cancellation.
#[derive(Clone, Debug)]
pub struct CancelToken(watch::Receiver<bool>);

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow() || self.0.has_changed().is_err()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&mut self) {
        // Err means the handle is gone.
        let _ = self.0.wait_for(|cancelled| *cancelled).await;
    }
}

/// Drives one operation from submission to downloaded media
#[derive(Clone)]
pub struct OperationPoller {
    provider: Arc<dyn GenAiProvider>,
    config: PollConfig,
}

impl OperationPoller {
    pub fn new(provider: Arc<dyn GenAiProvider>, config: PollConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Hand the request to the service; returns the pending operation
    pub async fn submit(&self, request: &VideoRequest) -> Result<Operation> {
        let operation = self.provider.submit_video(request).await?;
        tracing::info!(operation = %operation.handle, model = %request.model, "Video generation submitted");
        Ok(operation)
    }

    /// Wait for the operation to finish and return its result reference.
    ///
    /// Sleeps the configured interval before every status check, so a service
    /// that reports `done: false` N times is checked exactly N + 1 times.
    pub async fn await_completion(
        &self,
        mut operation: Operation,
        cancel: &mut CancelToken,
    ) -> Result<MediaReference> {
        let mut checks = 0u32;

        while !operation.done {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(operation = %operation.handle, checks, "Polling cancelled");
                    return Err(FastPosError::Cancelled);
                }
                _ = tokio::time::sleep(self.config.interval) => {}
            }

            checks += 1;
            operation = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(operation = %operation.handle, checks, "Polling cancelled");
                    return Err(FastPosError::Cancelled);
                }
                polled = self.provider.poll_operation(&operation.handle) => polled?,
            };
            tracing::debug!(operation = %operation.handle, checks, done = operation.done, "Operation status");
        }

        if let Some(message) = operation.error {
            return Err(FastPosError::GenerationFailed(message));
        }

        operation.result.ok_or_else(|| {
            FastPosError::GenerationFailed(format!(
                "operation {} finished without a video",
                operation.handle
            ))
        })
    }

    /// Download finished media, still honouring cancellation
    pub async fn fetch_result(
        &self,
        reference: &MediaReference,
        cancel: &mut CancelToken,
    ) -> Result<MediaBlob> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FastPosError::Cancelled),
            blob = self.provider.fetch_media(reference) => blob,
        }
    }

    /// Submit, poll to completion and download in one go
    pub async fn run(&self, request: &VideoRequest, cancel: &mut CancelToken) -> Result<MediaBlob> {
        if cancel.is_cancelled() {
            return Err(FastPosError::Cancelled);
        }
        let operation = self.submit(request).await?;
        let reference = self.await_completion(operation, cancel).await?;
        self.fetch_result(&reference, cancel).await
    }
}
