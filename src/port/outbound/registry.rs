//! Image registry port.

use async_trait::async_trait;

use crate::error::Result;

/// Lists published tags for an image.
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Tags for `image`, newest first.
    ///
    /// # Errors
    ///
    /// Connection failures, timeouts and server errors are returned as
    /// network errors so callers can offer a retry. Other non-success
    /// responses are registry errors.
    async fn list_available_versions(&self, image: &str) -> Result<Vec<String>>;
}
