use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    AnalyzeResponse, ErrorBody, FormAnswers, HealthResponse, Problem, Recommendation,
    RecommendRequest, RecommendResponse,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// The two service endpoints driven by the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endpoint {
    Analyze,
    Recommend,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Analyze => "/api/analyze",
            Endpoint::Recommend => "/api/recommend",
        }
    }

    /// Message shown when the service fails without a usable `detail`.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Endpoint::Analyze => "Nepodařilo se analyzovat problémy",
            Endpoint::Recommend => "Nepodařilo se získat doporučení",
        }
    }
}

pub const GENERIC_ERROR_MESSAGE: &str = "Došlo k neočekávané chybě";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{endpoint:?} returned {status}")]
    Status {
        endpoint: Endpoint,
        status: StatusCode,
        detail: Option<String>,
    },
    #[error("request to {endpoint:?} failed: {source}")]
    Transport {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid response from {endpoint:?}: {message}")]
    Decode { endpoint: Endpoint, message: String },
}

impl ApiError {
    /// Text suitable for the user-facing error box.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => detail.clone(),
            ApiError::Status { endpoint, .. } => endpoint.fallback_message().to_string(),
            ApiError::Transport { .. } | ApiError::Decode { .. } => {
                GENERIC_ERROR_MESSAGE.to_string()
            }
        }
    }
}

/// Remote service that turns answers into problems and problems into advice.
#[async_trait]
pub trait CoachApi: Send + Sync {
    /// Identify problems from the three answers.
    async fn analyze(&self, answers: &FormAnswers) -> Result<Vec<Problem>, ApiError>;

    /// Generate one recommendation per problem.
    async fn recommend(&self, problems: &[Problem]) -> Result<Vec<Recommendation>, ApiError>;
}

/// reqwest-backed client for the coaching service.
#[derive(Debug, Clone)]
pub struct HttpCoachApi {
    base_url: String,
    client: Client,
}

impl HttpCoachApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Query `GET /health`; returns the reported status.
    pub async fn health(&self) -> anyhow::Result<String> {
        use anyhow::Context;

        let resp = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.base_url))?;
        if !resp.status().is_success() {
            return Err(anyhow::anyhow!("Health check returned {}", resp.status()));
        }
        let body: HealthResponse = resp
            .json()
            .await
            .context("Failed to parse health response")?;
        Ok(body.status)
    }

    async fn post<B, T>(&self, endpoint: Endpoint, body: &B) -> Result<T, ApiError>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(endpoint.path());
        debug!("POST {}", url);

        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::Transport { endpoint, source })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.detail);
            warn!("{} failed with {}: {}", endpoint.path(), status, text);
            return Err(ApiError::Status {
                endpoint,
                status,
                detail,
            });
        }

        let text = resp
            .text()
            .await
            .map_err(|source| ApiError::Transport { endpoint, source })?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode {
            endpoint,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl CoachApi for HttpCoachApi {
    async fn analyze(&self, answers: &FormAnswers) -> Result<Vec<Problem>, ApiError> {
        let resp: AnalyzeResponse = self.post(Endpoint::Analyze, answers).await?;
        Ok(resp.problems)
    }

    async fn recommend(&self, problems: &[Problem]) -> Result<Vec<Recommendation>, ApiError> {
        let resp: RecommendResponse = self
            .post(Endpoint::Recommend, &RecommendRequest { problems })
            .await?;
        Ok(resp.recommendations)
    }
}
