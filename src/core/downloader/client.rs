use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Url};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::fetch::{Fetch, FetchRequest};
use super::validator::Validator;
use crate::core::config::{FetchConfig, NetMode};
use crate::core::error::{InstallError, InstallResult};
use crate::core::http::build_http_client;

const MAX_PREALLOC: u64 = 1 << 20;

/// Streaming HTTP fetcher. Bytes reach the cache only after the validator
/// accepted the complete body.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> InstallResult<Self> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Feed the body to the validator chunk by chunk and keep a copy for
    /// the cache.
    async fn receive(
        &self,
        request: &FetchRequest,
        validator: &mut dyn Validator,
    ) -> InstallResult<Vec<u8>> {
        if request.mode == NetMode::Offline {
            if !request.cache.exists() {
                return Err(InstallError::OfflineCacheMiss {
                    url: request.url.clone(),
                });
            }
            let body = request.cache.read().await?;
            validator.on_data(&body);
            return Ok(body);
        }

        let url = parse_url(&request.url)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InstallError::DownloadFailed {
                url: request.url.clone(),
                status: status.as_u16(),
            });
        }

        let hint = response.content_length().unwrap_or(0).min(MAX_PREALLOC);
        let mut body = Vec::with_capacity(hint as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            validator.on_data(&chunk);
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(
        &self,
        request: &FetchRequest,
        validator: &mut dyn Validator,
        cancel: &CancellationToken,
    ) -> InstallResult<()> {
        debug!("Fetching manifest {} ({:?})", request.url, request.mode);
        validator.start();

        let received = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(InstallError::Cancelled),
            result = self.receive(request, &mut *validator) => result,
        };

        let body = match received {
            Ok(body) => body,
            Err(e) => {
                validator.abort();
                return Err(e);
            }
        };

        if !validator.finalize() {
            warn!("Manifest from {} failed validation, discarding", request.url);
            return Err(InstallError::ManifestRejected {
                url: request.url.clone(),
            });
        }

        // Offline bodies came from the cache already.
        if request.mode == NetMode::Online {
            request.cache.commit(&body).await?;
        }

        info!("Manifest {} accepted ({} bytes)", request.url, body.len());
        Ok(())
    }
}

fn parse_url(raw: &str) -> InstallResult<Url> {
    let url =
        Url::parse(raw).map_err(|e| InstallError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(InstallError::InvalidUrl(format!(
            "{}: unsupported scheme {}",
            raw, scheme
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::downloader::{CacheEntry, ParsingValidator};

    #[test]
    fn only_http_schemes_are_fetched() {
        assert!(parse_url("https://example.com/m.json").is_ok());
        assert!(matches!(
            parse_url("file:///etc/m.json"),
            Err(InstallError::InvalidUrl(_))
        ));
        assert!(matches!(parse_url("not a url"), Err(InstallError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn offline_miss_aborts_validator() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let request = FetchRequest {
            url: "https://example.com/m.json".into(),
            cache: CacheEntry::new(dir.path().join("m.json")),
            mode: NetMode::Offline,
        };
        let mut validator = ParsingValidator::new();

        let result = fetcher
            .fetch(&request, &mut validator, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(InstallError::OfflineCacheMiss { .. })));
        assert!(!validator.package().is_valid());
    }

    #[tokio::test]
    async fn offline_hit_serves_cached_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheEntry::new(dir.path().join("m.json"));
        cache
            .commit(br#"{ "files": { "bin": { "type": "directory" } } }"#)
            .await
            .unwrap();

        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let request = FetchRequest {
            url: "https://example.com/m.json".into(),
            cache,
            mode: NetMode::Offline,
        };
        let mut validator = ParsingValidator::new();

        fetcher
            .fetch(&request, &mut validator, &CancellationToken::new())
            .await
            .unwrap();
        assert!(validator.into_package().folders().contains("bin"));
    }

    #[tokio::test]
    async fn cancelled_before_start_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let request = FetchRequest {
            url: "https://example.invalid/m.json".into(),
            cache: CacheEntry::new(dir.path().join("m.json")),
            mode: NetMode::Online,
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut validator = ParsingValidator::new();
        let result = fetcher.fetch(&request, &mut validator, &cancel).await;
        assert!(matches!(result, Err(InstallError::Cancelled)));
        assert!(!request.cache.exists());
    }
}
