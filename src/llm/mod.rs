//! Reqwest-based client for the DashScope application completion endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    StatusCode,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/api/v1";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing API key: set DASHSCOPE_API_KEY or pass --api-key")]
    MissingApiKey,
    #[error("API key contains characters not allowed in an HTTP header")]
    InvalidApiKey,
    #[error("request_id={request_id} code={code} message={message} (HTTP {status})")]
    Status {
        status: StatusCode,
        code: String,
        message: String,
        request_id: String,
    },
    #[error("response contained no output text (request_id={request_id})")]
    EmptyOutput { request_id: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Anything that turns a prompt into reply text.
#[allow(async_fn_in_trait)]
pub trait Completer {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Explicit connection settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub app_id: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl ClientSettings {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let app_id = cfg
            .get("DASHSCOPE_APP_ID")
            .context("missing application id: set DASHSCOPE_APP_ID or pass --app-id")?;
        let api_base_url = cfg.get("API_BASE_URL").unwrap_or_else(|| "default".into());
        let base_url = if api_base_url == "default" {
            DEFAULT_BASE_URL.to_string()
        } else {
            api_base_url.trim_end_matches('/').to_string()
        };
        Ok(Self {
            base_url,
            app_id,
            api_key: cfg.get("DASHSCOPE_API_KEY"),
            timeout: cfg.request_timeout(),
        })
    }
}

#[derive(Debug)]
pub struct LlmClient {
    http: reqwest::Client,
    settings: ClientSettings,
}

impl LlmClient {
    pub fn new(settings: ClientSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, settings })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(ClientSettings::from_config(cfg)?)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/apps/{}/completion",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.app_id
        )
    }
}

impl Completer for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let key = self.settings.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let hv = HeaderValue::from_str(&format!("Bearer {}", key))
            .map_err(|_| LlmError::InvalidApiKey)?;
        headers.insert(AUTHORIZATION, hv);

        let body = serde_json::json!({
            "input": { "prompt": prompt },
            "parameters": {},
            "debug": {}
        });

        let url = self.endpoint();
        debug!(%url, prompt_len = prompt.len(), "sending completion request");
        let resp = self.http.post(url).headers(headers).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            // Error bodies are best-effort; the status alone is still reported.
            let err: ErrorBody = resp.json().await.unwrap_or_default();
            return Err(LlmError::Status {
                status,
                code: err.code.unwrap_or_else(|| status.as_u16().to_string()),
                message: err.message.unwrap_or_default(),
                request_id: err.request_id.unwrap_or_default(),
            });
        }

        let reply: CompletionBody = resp.json().await?;
        let request_id = reply.request_id.unwrap_or_default();
        debug!(%request_id, "completion received");
        match reply.output.and_then(|o| o.text) {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(LlmError::EmptyOutput { request_id }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionBody {
    output: Option<Output>,
    request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Output {
    text: Option<String>,
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    request_id: Option<String>,
}
