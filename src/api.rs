//! Extraction client for an OpenAI-compatible chat completion service.
//!
//! Sends the run's two role-tagged messages in a single non-streaming
//! request and returns the completion text. The request is issued exactly
//! once: a service failure is returned to the caller, who can re-invoke the
//! whole run, rather than retried here where a duplicate extraction would be
//! paid for twice.

use crate::prompt::PromptParts;
use crate::utils::truncate_for_log;
use serde::Deserialize;
use serde_json::{Value, json};
use std::error::Error;
use std::time::Instant;
use tracing::{error, info, instrument};

/// Client for the completion endpoint at `{base_url}/chat/completions`.
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl ChatCompletionsClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f64,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, prompt: &PromptParts) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "developer", "content": prompt.rules},
                {"role": "user", "content": prompt.task},
            ],
            "temperature": self.temperature,
        })
    }

    /// Send the prompt and return the raw completion text.
    ///
    /// Fails on network errors, non-success statuses, undecodable response
    /// bodies, and an empty choices array. There is no fallback record set:
    /// without a completion the run has nothing to validate.
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    pub async fn ask(&self, prompt: &PromptParts) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let body = self.request_body(prompt);

        let response = self
            .http
            .post(self.endpoint())
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        let dt = t0.elapsed();

        if !status.is_success() {
            error!(
                %status,
                elapsed_ms = dt.as_millis() as u64,
                response_preview = %truncate_for_log(&text, 300),
                "Completion request failed"
            );
            return Err(format!("completion request failed with status {status}").into());
        }

        let completion: ChatCompletion = serde_json::from_str(&text)?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or("completion response contained no choices")?;

        info!(
            elapsed_ms = dt.as_millis() as u64,
            bytes = content.len(),
            "Completion succeeded"
        );
        Ok(content)
    }
}
