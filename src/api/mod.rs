//! Thin typed wrappers over the remote REST APIs.
//!
//! Each submodule covers one API surface. The wrappers add URLs, auth, and
//! response typing on top of a shared [`ApiClient`]; every non-success status
//! is propagated to the caller as [`HarborError::Api`] with the response body
//! as the message. No retries, no caching.

pub mod custom_objects;
pub mod filemapper;
pub mod secrets;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::{AccountConfig, Environment};
use crate::error::HarborError;

/// Base API URL for an environment.
pub fn api_base_url(env: Environment) -> &'static str {
    match env {
        Environment::Prod => "https://api.harborhub.dev",
        Environment::Qa => "https://api.qa.harborhub.dev",
    }
}

/// Authenticated HTTP client bound to one account's environment and token.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Client for a configured account, using its stored credential.
    ///
    /// OAuth2 accounts keep no usable token on disk — the CLI session layer
    /// must construct the client with [`ApiClient::new`] instead.
    pub fn for_account(account: &AccountConfig) -> crate::Result<Self> {
        let token = account.auth_token().ok_or_else(|| {
            HarborError::InvalidAccount(
                account.name.clone(),
                "no stored credential usable as a bearer token".to_string(),
            )
        })?;
        Ok(Self::new(api_base_url(account.env), token))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn check(response: reqwest::Response) -> crate::Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(HarborError::Api {
            status: status.as_u16(),
            message,
        })
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> crate::Result<T> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub(crate) async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> crate::Result<T> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub(crate) async fn post<B: Serialize>(&self, path: &str, body: &B) -> crate::Result<()> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub(crate) async fn put<B: Serialize>(&self, path: &str, body: &B) -> crate::Result<()> {
        let response = self
            .http
            .put(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub(crate) async fn delete(&self, path: &str) -> crate::Result<()> {
        let response = self
            .http
            .delete(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub(crate) async fn post_form(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> crate::Result<()> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
