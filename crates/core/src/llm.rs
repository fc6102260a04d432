use crate::config::{LlmConfig, SenderProfile};
use crate::error::LlmError;
use crate::models::{JobPosting, LinkMetadata};
use crate::prompts::{EXTRACT_JOBS_PROMPT, WRITE_MAIL_PROMPT};
use crate::traits::LlmChain;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// LLM chain over an OpenAI-compatible `/chat/completions` endpoint.
///
/// Retries 429 and 5xx responses up to `max_retries` times with exponential backoff.
/// Transport errors and other statuses are returned to the caller on the first attempt.
#[derive(Clone)]
pub struct ChatCompletionsChain {
    client: Client,
    config: LlmConfig,
    sender: SenderProfile,
}

impl ChatCompletionsChain {
    pub fn new(config: LlmConfig, sender: SenderProfile) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            sender,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request_body = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut retries = 0;
        loop {
            let response = self
                .client
                .post(self.endpoint())
                .bearer_auth(&self.config.api_key)
                .json(&request_body)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                let parsed: ChatResponse = response.json().await?;
                return first_content(parsed);
            }

            let body = response.text().await.unwrap_or_default();
            let error = LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(body),
            };
            if !is_retryable(status) || retries >= self.config.max_retries {
                return Err(error);
            }

            retries += 1;
            let delay = backoff_delay(self.config.retry_base_delay, retries);
            warn!(
                status = status.as_u16(),
                retry = retries,
                delay_ms = delay.as_millis() as u64,
                "llm endpoint returned a retryable status"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn backoff_delay(base: Duration, retry: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
}

/// The provider's `error.message` when the body carries one, the raw body otherwise.
fn api_error_message(body: String) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body)
}

fn first_content(response: ChatResponse) -> Result<String, LlmError> {
    if let Some(usage) = &response.usage {
        debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "llm call succeeded"
        );
    }

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(LlmError::EmptyContent)
}

#[async_trait]
impl LlmChain for ChatCompletionsChain {
    async fn extract_jobs(&self, page_text: &str) -> Result<Vec<JobPosting>, LlmError> {
        let prompt = EXTRACT_JOBS_PROMPT.replace("{page_data}", page_text);
        let reply = self.complete(&prompt).await?;
        let jobs = parse_jobs(&reply)?;
        info!(jobs = jobs.len(), "extracted job postings");
        Ok(jobs)
    }

    async fn write_mail(&self, job: &JobPosting, links: &[LinkMetadata]) -> Result<String, LlmError> {
        let prompt = render_mail_prompt(job, links, &self.sender)?;
        self.complete(&prompt).await
    }
}

pub(crate) fn render_mail_prompt(
    job: &JobPosting,
    links: &[LinkMetadata],
    sender: &SenderProfile,
) -> Result<String, LlmError> {
    let job_description = serde_json::to_string_pretty(job)?;
    let link_list = if links.is_empty() {
        "(no portfolio links matched)".to_string()
    } else {
        links
            .iter()
            .map(|item| format!("- {}", item.links))
            .collect::<Vec<_>>()
            .join("\n")
    };

    Ok(WRITE_MAIL_PROMPT
        .replace("{job_description}", &job_description)
        .replace("{link_list}", &link_list)
        .replace("{sender_name}", &sender.name)
        .replace("{company}", &sender.company))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JobsPayload {
    Many(Vec<JobPosting>),
    Wrapped { jobs: Vec<JobPosting> },
    One(JobPosting),
}

/// Parses model output into job postings, tolerating code fences and prose around the JSON.
pub(crate) fn parse_jobs(reply: &str) -> Result<Vec<JobPosting>, LlmError> {
    let body = json_region(strip_json_fences(reply)).ok_or_else(|| {
        LlmError::Parse("context too big or no json found, unable to parse jobs".to_string())
    })?;

    let payload: JobsPayload = serde_json::from_str(body)
        .map_err(|error| LlmError::Parse(format!("unable to parse jobs: {error}")))?;

    Ok(match payload {
        JobsPayload::Many(jobs) | JobsPayload::Wrapped { jobs } => jobs,
        JobsPayload::One(job) => vec![job],
    })
}

fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));

    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(str::trim)
            .unwrap_or(stripped.trim_start()),
        None => text,
    }
}

/// The span from the first `[` or `{` to the matching last closer.
fn json_region(text: &str) -> Option<&str> {
    let start = text.find(|c: char| c == '[' || c == '{')?;
    let closer = if text[start..].starts_with('[') { ']' } else { '}' };
    let end = text.rfind(closer)?;
    (end > start).then(|| &text[start..=end])
}
