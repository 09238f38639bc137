//! reqwest-backed implementation of the LMS API.
//!
//! Every request carries the stored access token. A 401 triggers at most one
//! refresh through `/accounts/token/refresh/` followed by a single retry; if
//! the refresh fails the stored tokens are cleared and the caller gets
//! [`ApiError::SessionExpired`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::instrument;

use testdesk_core::error::extract_error_message;
use testdesk_core::model::{
    AnswerSubmission, AssignedTests, Assignment, AuthResponse, Credentials, RetakeResponse,
    SubmitSummary, TestAttempt, TestHistory, TestResult, User,
};
use testdesk_core::traits::TestsApi;
use testdesk_core::ApiError;

use crate::config::ClientConfig;
use crate::token_store::TokenStore;

const REFRESH_PATH: &str = "/accounts/token/refresh/";
const LOGIN_PATH: &str = "/accounts/student/login/";
const LOGOUT_PATH: &str = "/accounts/logout/";
const PROFILE_PATH: &str = "/accounts/student/profile/";

/// Authenticated client for the LMS REST API.
pub struct HttpClient {
    base_url: String,
    timeout_secs: u64,
    client: reqwest::Client,
    tokens: Arc<dyn TokenStore>,
    refresh_lock: Mutex<()>,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
}

#[derive(Serialize)]
struct RetakeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    due_at: Option<DateTime<Utc>>,
}

impl HttpClient {
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
            client,
            tokens,
            refresh_lock: Mutex::new(()),
        })
    }

    /// Whether a token pair is stored. Says nothing about its validity.
    pub fn is_authenticated(&self) -> bool {
        self.tokens.load().is_some()
    }

    /// Sign in and persist the returned token pair.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &Credentials) -> Result<User> {
        let body = serde_json::to_value(credentials).context("failed to encode credentials")?;
        let response = self
            .execute(self.request(&Method::POST, LOGIN_PATH, Some(&body), None))
            .await?;
        let auth: AuthResponse = match Self::decode(response).await {
            Ok(auth) => auth,
            Err(ApiError::Unauthorized) => anyhow::bail!("invalid email or password"),
            Err(ApiError::Api { status, message }) if status == 400 => {
                anyhow::bail!("login rejected: {message}")
            }
            Err(e) => return Err(e).context("login failed"),
        };
        self.tokens.save(&auth.tokens())?;
        tracing::info!(role = ?auth.user.role, "signed in");
        Ok(auth.user)
    }

    /// Invalidate the refresh token server-side and forget both tokens.
    ///
    /// The local tokens are cleared even when the server call fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        if let Some(tokens) = self.tokens.load() {
            let body = serde_json::json!({ "refresh": tokens.refresh_token });
            let outcome = match self.send(Method::POST, LOGOUT_PATH, Some(body)).await {
                Ok(response) => Self::expect_success(response).await,
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                tracing::warn!("logout request failed: {e}");
            }
        }
        self.tokens.clear()
    }

    /// Profile of the signed-in account.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.get(PROFILE_PATH).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(
        &self,
        method: &Method,
        path: &str,
        body: Option<&serde_json::Value>,
        access: Option<&str>,
    ) -> RequestBuilder {
        let mut req = self
            .client
            .request(method.clone(), self.url(path))
            .header("content-type", "application/json");
        if let Some(token) = access {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        req
    }

    async fn execute(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        req.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.timeout_secs)
            } else {
                ApiError::Network(e.to_string())
            }
        })
    }

    /// Send with the stored token, refreshing once on 401.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response, ApiError> {
        let sent = self.tokens.load().map(|t| t.access_token);
        let response = self
            .execute(self.request(&method, path, body.as_ref(), sent.as_deref()))
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let access = self.refresh_access(sent.as_deref()).await?;
        tracing::debug!(path, "retrying after token refresh");
        self.execute(self.request(&method, path, body.as_ref(), Some(&access)))
            .await
    }

    /// Obtain a fresh access token.
    ///
    /// If another request refreshed while this one waited on the lock, its
    /// token is reused instead of refreshing again.
    async fn refresh_access(&self, stale: Option<&str>) -> Result<String, ApiError> {
        let _guard = self.refresh_lock.lock().await;

        let Some(tokens) = self.tokens.load() else {
            return Err(ApiError::Unauthorized);
        };
        if stale != Some(tokens.access_token.as_str()) {
            return Ok(tokens.access_token);
        }

        let outcome = self
            .client
            .post(self.url(REFRESH_PATH))
            .json(&RefreshRequest {
                refresh: &tokens.refresh_token,
            })
            .send()
            .await;

        let access = match outcome {
            Ok(resp) if resp.status().is_success() => resp
                .json::<RefreshResponse>()
                .await
                .map(|r| r.access)
                .map_err(|e| tracing::warn!("malformed refresh response: {e}"))
                .ok(),
            Ok(resp) => {
                tracing::debug!(status = resp.status().as_u16(), "refresh rejected");
                None
            }
            Err(e) => {
                tracing::warn!("refresh request failed: {e}");
                None
            }
        };

        match access {
            Some(access) => {
                if let Err(e) = self.tokens.set_access(&access) {
                    tracing::warn!("failed to persist refreshed token: {e:#}");
                }
                tracing::info!("access token refreshed");
                Ok(access)
            }
            None => {
                tracing::warn!("token refresh failed, signing out");
                if let Err(e) = self.tokens.clear() {
                    tracing::warn!("failed to clear tokens: {e:#}");
                }
                Err(ApiError::SessionExpired)
            }
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()));
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(
            status.as_u16(),
            extract_error_message(&body),
        ))
    }

    async fn expect_success(response: Response) -> Result<(), ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(
            status.as_u16(),
            extract_error_message(&body),
        ))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(Method::GET, path, None).await?;
        Self::decode(response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        let response = self.send(Method::POST, path, Some(body)).await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl TestsApi for HttpClient {
    #[instrument(skip(self))]
    async fn assigned_tests(&self) -> Result<AssignedTests, ApiError> {
        self.get("/tests/student/my-tests/").await
    }

    #[instrument(skip(self))]
    async fn start_test(&self, test_id: u64) -> Result<TestAttempt, ApiError> {
        self.get(&format!("/tests/student/start/{test_id}/")).await
    }

    #[instrument(skip(self, answers), fields(answers = answers.len()))]
    async fn submit_test(
        &self,
        test_id: u64,
        answers: &[AnswerSubmission],
    ) -> Result<SubmitSummary, ApiError> {
        self.post(&format!("/tests/student/submit/{test_id}/"), answers)
            .await
    }

    #[instrument(skip(self))]
    async fn test_results(&self, test_id: u64) -> Result<TestResult, ApiError> {
        self.get(&format!("/tests/student/result/{test_id}/")).await
    }

    #[instrument(skip(self))]
    async fn test_history(&self, test_id: u64) -> Result<TestHistory, ApiError> {
        self.get(&format!("/tests/student/test/{test_id}/history/"))
            .await
    }

    #[instrument(skip(self))]
    async fn retake_test(
        &self,
        test_id: u64,
        due_at: Option<DateTime<Utc>>,
    ) -> Result<RetakeResponse, ApiError> {
        self.post(
            &format!("/tests/student/retake/{test_id}/"),
            &RetakeRequest { due_at },
        )
        .await
    }

    #[instrument(skip(self))]
    async fn test_attempt(
        &self,
        test_id: u64,
        attempt_number: u32,
    ) -> Result<Assignment, ApiError> {
        self.get(&format!(
            "/tests/student/test/{test_id}/attempt/{attempt_number}/"
        ))
        .await
    }
}
