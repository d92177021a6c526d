// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retrieval of generated IaC code by generation job id.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default base URL of the code-generation service.
pub const DEFAULT_GENERATOR_URL: &str = "http://iac-generator:3002/api";

/// Errors from fetching generated code
#[derive(Debug, Error)]
pub enum CodeSourceError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("failed to fetch generated code: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("code generator returned {status} for {url}")]
    Status { status: u16, url: String },
    #[error("no generated code for job {0}")]
    NotFound(String),
}

/// Source of generated IaC code
#[async_trait]
pub trait CodeSource: Send + Sync + 'static {
    /// Fetch the code produced by `generation_job_id`.
    async fn fetch(&self, generation_job_id: &str) -> Result<String, CodeSourceError>;
}

/// Fetches code from the code-generation service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCodeSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCodeSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CodeSourceError> {
        let client =
            reqwest::Client::builder().timeout(timeout).build().map_err(CodeSourceError::Client)?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn download_url(&self, generation_job_id: &str) -> String {
        format!("{}/generate/{}/download", self.base_url, generation_job_id)
    }
}

#[async_trait]
impl CodeSource for HttpCodeSource {
    async fn fetch(&self, generation_job_id: &str) -> Result<String, CodeSourceError> {
        let url = self.download_url(generation_job_id);
        let start = Instant::now();
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "code fetch failed");
            return Err(CodeSourceError::Status { status: status.as_u16(), url });
        }
        let code = response.text().await?;
        tracing::info!(
            generation_job_id,
            bytes = code.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "fetched generated code"
        );
        Ok(code)
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{CodeSource, CodeSourceError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeCodeSourceState {
        code: HashMap<String, String>,
        fallback: Option<String>,
        fetched: Vec<String>,
    }

    /// Fake code source for testing.
    ///
    /// Unknown job ids return the fallback code if set, else `NotFound`.
    #[derive(Clone, Default)]
    pub struct FakeCodeSource {
        inner: Arc<Mutex<FakeCodeSourceState>>,
    }

    impl FakeCodeSource {
        pub fn new() -> Self {
            Self::default()
        }

        /// A source that returns `code` for any job id.
        pub fn serving(code: &str) -> Self {
            let source = Self::new();
            source.inner.lock().fallback = Some(code.to_string());
            source
        }

        pub fn insert(&self, generation_job_id: &str, code: &str) {
            self.inner.lock().code.insert(generation_job_id.to_string(), code.to_string());
        }

        /// Job ids fetched so far, in order
        pub fn fetched(&self) -> Vec<String> {
            self.inner.lock().fetched.clone()
        }
    }

    #[async_trait]
    impl CodeSource for FakeCodeSource {
        async fn fetch(&self, generation_job_id: &str) -> Result<String, CodeSourceError> {
            let mut inner = self.inner.lock();
            inner.fetched.push(generation_job_id.to_string());
            inner
                .code
                .get(generation_job_id)
                .or(inner.fallback.as_ref())
                .cloned()
                .ok_or_else(|| CodeSourceError::NotFound(generation_job_id.to_string()))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeCodeSource;

#[cfg(test)]
#[path = "codegen_tests.rs"]
mod tests;
