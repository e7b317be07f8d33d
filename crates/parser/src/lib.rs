//! HTTP client for the semantic parsing service.
//!
//! The service exposes two GET endpoints:
//! - `/query?locale=..&limit=..&q=..[&sessionId=..][&expect=..][&choice[i]=..]`
//!   returning `{"sessionId": .., "candidates": [..]}` or `{"error": ..}`
//! - `/learn?locale=..&q=..&sessionId=..&target=..` for online learning
//!
//! The service assigns a session id on the first query; it is echoed back on
//! every later request so that the parser can keep per-user state.

use async_trait::async_trait;
use rulecraft_core::error::ParserError;
use rulecraft_core::parser::{Candidate, CommandParser};
use rulecraft_core::{Command, ValueCategory};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_URL: &str = "http://127.0.0.1:8400";
pub const DEFAULT_LOCALE: &str = "en_US";
pub const DEFAULT_LIMIT: usize = 20;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A [`CommandParser`] backed by the parsing service.
pub struct ParserClient {
    base_url: String,
    locale: String,
    limit: usize,
    client: reqwest::Client,
    session_id: Arc<Mutex<Option<String>>>,
}

impl ParserClient {
    pub fn new(
        base_url: impl Into<String>,
        locale: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ParserError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ParserError::Network(format!("failed to create HTTP client: {e}")))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let locale = locale.into();
        info!(url = %base_url, %locale, "Using parser service");

        Ok(Self {
            base_url,
            locale,
            limit: DEFAULT_LIMIT,
            client,
            session_id: Arc::new(Mutex::new(None)),
        })
    }

    /// Maximum number of candidates to request.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The session id assigned by the service, once a query went through.
    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().ok().and_then(|id| id.clone())
    }

    fn remember_session(&self, id: Option<String>) {
        if let Ok(mut current) = self.session_id.lock() {
            *current = id;
        }
    }

    fn query_params(
        &self,
        utterance: &str,
        expecting: Option<&ValueCategory>,
        choices: &[String],
    ) -> Vec<(String, String)> {
        let mut params = vec![
            ("locale".to_string(), self.locale.clone()),
            ("limit".to_string(), self.limit.to_string()),
            ("q".to_string(), utterance.to_string()),
        ];
        if let Some(id) = self.session_id() {
            params.push(("sessionId".into(), id));
        }
        if let Some(expecting) = expecting {
            params.push(("expect".into(), expect_param(expecting).into()));
        }
        for (i, choice) in choices.iter().enumerate() {
            if !choice.is_empty() {
                params.push((format!("choice[{i}]"), choice.clone()));
            }
        }
        params
    }
}

/// The modality name the service understands.
pub fn expect_param(category: &ValueCategory) -> &'static str {
    match category {
        ValueCategory::YesNo => "YesNo",
        ValueCategory::MultipleChoice => "MultipleChoice",
        ValueCategory::RawString => "RawString",
        ValueCategory::Number => "Number",
        ValueCategory::Measure(_) => "Measure",
        ValueCategory::Date => "Date",
        ValueCategory::Picture => "Picture",
        ValueCategory::Location => "Location",
        ValueCategory::PhoneNumber => "PhoneNumber",
        ValueCategory::EmailAddress => "EmailAddress",
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default, rename = "sessionId")]
    session_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    candidates: Vec<Candidate>,
}

fn request_error(e: reqwest::Error) -> ParserError {
    if e.is_redirect() {
        ParserError::Network(format!("too many redirects: {e}"))
    } else {
        ParserError::Network(e.to_string())
    }
}

async fn get(
    client: &reqwest::Client,
    url: &str,
    params: &[(String, String)],
) -> Result<String, ParserError> {
    let response = client
        .get(url)
        .query(params)
        .send()
        .await
        .map_err(request_error)?;

    let status = response.status();
    let body = response.text().await.map_err(request_error)?;
    if !status.is_success() {
        warn!(status = status.as_u16(), body = %body, "Parser returned error");
        return Err(ParserError::Http {
            status_code: status.as_u16(),
            message: body,
        });
    }
    Ok(body)
}

#[async_trait]
impl CommandParser for ParserClient {
    async fn parse(
        &self,
        utterance: &str,
        expecting: Option<&ValueCategory>,
        choices: &[String],
    ) -> Result<Vec<Candidate>, ParserError> {
        let url = format!("{}/query", self.base_url);
        let params = self.query_params(utterance, expecting, choices);
        debug!(utterance, expecting = ?expecting, choices = choices.len(), "Sending utterance");

        let body = get(&self.client, &url, &params).await?;
        let parsed: QueryResponse = serde_json::from_str(&body)
            .map_err(|e| ParserError::Malformed(format!("failed to parse response: {e}")))?;

        self.remember_session(parsed.session_id);
        if let Some(error) = parsed.error {
            return Err(ParserError::Remote(error));
        }
        debug!(candidates = parsed.candidates.len(), "Parsed utterance");
        Ok(parsed.candidates)
    }

    fn learn(&self, utterance: &str, target: &Command) {
        let target = match serde_json::to_string(target) {
            Ok(json) => json,
            Err(e) => {
                warn!(utterance, "Cannot encode learning target: {e}");
                return;
            }
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(utterance, "No async runtime, not sending utterance for learning");
            return;
        };

        let client = self.client.clone();
        let url = format!("{}/learn", self.base_url);
        let params = vec![
            ("locale".to_string(), self.locale.clone()),
            ("q".to_string(), utterance.to_string()),
            ("sessionId".to_string(), self.session_id().unwrap_or_default()),
            ("target".to_string(), target),
        ];
        let utterance = utterance.to_string();
        runtime.spawn(async move {
            match get(&client, &url, &params).await {
                Ok(_) => info!(%utterance, "Sent utterance for learning"),
                Err(e) => warn!(%utterance, "Failed to send utterance for learning: {e}"),
            }
        });
    }
}
