//! HTTP object store client.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, StatusCode, Url, header};
use tracing::{debug, warn};

use crate::domain::entities::StoredObjectName;
use crate::domain::errors::StoreError;
use crate::domain::ports::ObjectStorePort;

use super::{object_url, parse_base_url};

const USER_AGENT: &str = concat!("academy-avatar/", env!("CARGO_PKG_VERSION"));

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Object store speaking plain HTTP verbs against `{base_url}/{name}`.
///
/// `HEAD` checks existence, `PUT` writes and `DELETE` removes. Objects are
/// served publicly from `public_base_url`.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: Client,
    base_url: Url,
    public_base_url: Url,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpObjectStore {
    /// Creates a client.
    ///
    /// # Errors
    /// Returns error if either base URL is invalid or HTTP client creation fails.
    pub fn new(
        base_url: &str,
        public_base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
            public_base_url: parse_base_url(public_base_url)?,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            timeout,
        })
    }

    fn object_url(&self, name: &StoredObjectName) -> Url {
        object_url(&self.base_url, name)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    fn map_send_error(&self, e: &reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout {
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else if e.is_connect() {
            StoreError::network("failed to connect to object store")
        } else {
            StoreError::network(e.to_string())
        }
    }

    async fn send(
        &self,
        request: RequestBuilder,
        name: &StoredObjectName,
    ) -> Result<reqwest::Response, StoreError> {
        self.authorize(request).send().await.map_err(|e| {
            warn!(name = %name, error = %e, "Object store request failed");
            self.map_send_error(&e)
        })
    }
}

async fn rejection(operation: &'static str, response: reqwest::Response) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        body.trim().to_string()
    };
    StoreError::backend(operation, status.as_u16(), message)
}

#[async_trait]
impl ObjectStorePort for HttpObjectStore {
    async fn put(
        &self,
        name: &StoredObjectName,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let size = bytes.len();
        let request = self
            .client
            .put(self.object_url(name))
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes);
        let response = self.send(request, name).await?;

        if !response.status().is_success() {
            return Err(rejection("put", response).await);
        }
        debug!(name = %name, size, "Uploaded object");
        Ok(())
    }

    async fn delete(&self, names: &[StoredObjectName]) -> Result<(), StoreError> {
        for name in names {
            let request = self.client.delete(self.object_url(name));
            let response = self.send(request, name).await?;
            let status = response.status();

            if status == StatusCode::NOT_FOUND {
                debug!(name = %name, "Object already absent");
            } else if status.is_success() {
                debug!(name = %name, "Deleted object");
            } else {
                return Err(rejection("delete", response).await);
            }
        }
        Ok(())
    }

    async fn exists(&self, name: &StoredObjectName) -> Result<bool, StoreError> {
        let request = self.client.head(self.object_url(name));
        let response = self.send(request, name).await?;
        let status = response.status();

        match status {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND | StatusCode::GONE => Ok(false),
            _ => Err(rejection("head", response).await),
        }
    }

    fn public_url(&self, name: &StoredObjectName) -> String {
        object_url(&self.public_base_url, name).into()
    }
}
