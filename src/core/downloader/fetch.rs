use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::cache::CacheEntry;
use super::validator::Validator;
use crate::core::config::NetMode;
use crate::core::error::InstallResult;

/// One manifest download: where from, where to, and whether the network
/// may be used.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub cache: CacheEntry,
    pub mode: NetMode,
}

/// Transport that downloads through a [`Validator`].
///
/// Contract for implementors:
/// - call `start` first, then `on_data` per chunk;
/// - on success, call `finalize` and store the bytes in `request.cache` only
///   if it returned `true`; a `false` is an error;
/// - on transport failure or cancellation, call `abort` instead and store
///   nothing;
/// - return exactly once.
///
/// Retries and timeouts belong here, not to the caller.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(
        &self,
        request: &FetchRequest,
        validator: &mut dyn Validator,
        cancel: &CancellationToken,
    ) -> InstallResult<()>;
}
