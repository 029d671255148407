//! Where the issuer's key document comes from.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

use crate::services::auth::key_set::KeySet;

/// Key-document fetch errors.
///
/// Kept apart from `AuthError`: the cache logs these and reports a single
/// `KeySourceUnavailable` to callers.
#[derive(Debug, Error)]
pub enum KeySourceError {
    #[error("key document request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("key document request returned {0}")]
    Status(StatusCode),
    #[error("key document fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid key document: {0}")]
    Document(#[from] serde_json::Error),
}

/// Implementations must be cheap to share (`Arc<dyn KeySource>`).
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn fetch(&self) -> Result<KeySet, KeySourceError>;
}

/// Fetches a JWKS document over HTTP(S).
#[derive(Clone, Debug)]
pub struct HttpKeySource {
    client: Client,
    url: Url,
}

impl HttpKeySource {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, KeySourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch(&self) -> Result<KeySet, KeySourceError> {
        let response = self.client.get(self.url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(KeySourceError::Status(response.status()));
        }

        let body = response.bytes().await?;
        Ok(KeySet::parse(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::testutil::{TestSigner, key_document};
    use axum::{Json, Router, http::StatusCode as AxumStatus, routing::get};

    async fn serve(router: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/.well-known/jwks.json")).unwrap()
    }

    #[tokio::test]
    async fn fetches_and_parses_key_document() {
        let signer = TestSigner::new("kid-1", 9);
        let document = key_document(&[&signer]);
        let url = serve(Router::new().route(
            "/.well-known/jwks.json",
            get(move || async move { Json(document) }),
        ))
        .await;

        let source = HttpKeySource::new(url, Duration::from_secs(2)).unwrap();
        let set = source.fetch().await.unwrap();

        assert_eq!(set.len(), 1);
        assert!(set.get("kid-1").is_some());
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let url = serve(Router::new().route(
            "/.well-known/jwks.json",
            get(|| async { AxumStatus::INTERNAL_SERVER_ERROR }),
        ))
        .await;

        let source = HttpKeySource::new(url, Duration::from_secs(2)).unwrap();
        let err = source.fetch().await.unwrap_err();

        assert!(matches!(err, KeySourceError::Status(s) if s == StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn malformed_document_is_an_error() {
        let url = serve(Router::new().route(
            "/.well-known/jwks.json",
            get(|| async { "<html>maintenance</html>" }),
        ))
        .await;

        let source = HttpKeySource::new(url, Duration::from_secs(2)).unwrap();
        let err = source.fetch().await.unwrap_err();

        assert!(matches!(err, KeySourceError::Document(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{addr}/jwks.json")).unwrap();
        let source = HttpKeySource::new(url, Duration::from_secs(2)).unwrap();

        assert!(matches!(
            source.fetch().await.unwrap_err(),
            KeySourceError::Request(_)
        ));
    }
}
