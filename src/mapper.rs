//! Text-completion capability that proposes column correspondences.
//!
//! A [`Mapper`] never fails from the caller's point of view: transport and
//! service errors come back as an `{"ERROR": "..."}` payload, which the
//! response parser then reduces to a mapping with no usable targets.

use std::time::Duration;

use log::{debug, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::{
    config::MapperSettings,
    error::{MapError, Result},
};

pub trait Mapper: Send + Sync {
    fn invoke(&self, prompt: &str) -> String;
}

pub fn error_payload(err: &MapError) -> String {
    serde_json::json!({ "ERROR": err.to_string() }).to_string()
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Messages-style HTTP completion endpoint.
pub struct HttpMapper {
    client: Client,
    settings: MapperSettings,
    api_key: Option<String>,
}

impl HttpMapper {
    pub fn new(settings: MapperSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|err| MapError::MapperInvocation {
                model: settings.model.clone(),
                reason: err.to_string(),
            })?;
        let api_key = std::env::var(&settings.api_key_env).ok();
        if api_key.is_none() {
            warn!(
                "{} is not set; mapper requests will be sent without credentials",
                settings.api_key_env
            );
        }
        Ok(Self {
            client,
            settings,
            api_key,
        })
    }

    pub fn request(&self, prompt: &str) -> Result<String> {
        let fail = |reason: String| MapError::MapperInvocation {
            model: self.settings.model.clone(),
            reason,
        };
        let body = CompletionRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };
        let mut request = self
            .client
            .post(&self.settings.endpoint)
            .header("anthropic-version", &self.settings.api_version)
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }
        let response = request.send().map_err(|err| fail(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(fail(format!("HTTP {}: {}", status.as_u16(), detail.trim())));
        }
        let parsed: CompletionResponse = response.json().map_err(|err| fail(err.to_string()))?;
        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| fail("response carried no text content".to_string()))
    }
}

impl Mapper for HttpMapper {
    fn invoke(&self, prompt: &str) -> String {
        debug!("Invoking {} with {} byte prompt", self.settings.model, prompt.len());
        match self.request(prompt) {
            Ok(text) => text,
            Err(err) => {
                warn!("{err}");
                error_payload(&err)
            }
        }
    }
}

/// Returns a fixed response for every prompt; used for offline runs.
#[derive(Debug, Clone)]
pub struct CannedMapper {
    response: String,
}

impl CannedMapper {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

impl Mapper for CannedMapper {
    fn invoke(&self, _prompt: &str) -> String {
        self.response.clone()
    }
}
