use crate::advertisements::keyword_category;
use crate::traits::LlmAdapter;
use crate::types::{GeneratedArticle, GeneratedBatch, HttpConfig, NewsError, Post, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";

const COMMENTS_MARKER: &str = "Here are the comments: ";

/// Render posts oldest first as `"content" (reported by name)` joined by spaces.
pub fn format_posts(posts: &[Post]) -> String {
    posts
        .iter()
        .map(|post| match post.reporter_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                format!("\"{}\" (reported by {})", post.content.trim(), name)
            }
            _ => format!("\"{}\"", post.content.trim()),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn generation_prompt(posts: &[Post]) -> String {
    format!(
        "Based on the diverse comments collected from individuals in my area, please create a \
         series of engaging local news articles that group similar topics and themes together. \
         For every article give a short title, the article content, a one-word category, a few \
         keywords describing a fitting cover photo, and the name of the reporter when a comment \
         credits one. {}{}",
        COMMENTS_MARKER,
        format_posts(posts)
    )
}

pub fn categorization_prompt(content: &str) -> String {
    format!(
        "Classify the following classified advertisement into exactly one of these categories: \
         jobs, housing, for-sale, services, community, gigs, resumes. Answer with the category \
         name only.\n\nAdvertisement: {}",
        content
    )
}

/// Parse generator output into article records. Accepts the requested
/// `{"articles": [...]}` object, a bare array, and either wrapped in a
/// markdown code fence.
pub fn parse_generated_articles(text: &str) -> Result<Vec<GeneratedArticle>> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(NewsError::Parse("empty generator response".to_string()));
    }

    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| NewsError::Parse(format!("generator response is not JSON: {}", e)))?;

    let articles = if value.is_array() {
        serde_json::from_value::<Vec<GeneratedArticle>>(value)
    } else {
        serde_json::from_value::<GeneratedBatch>(value).map(|batch| batch.articles)
    };

    articles.map_err(|e| NewsError::Parse(format!("generator response does not match schema: {}", e)))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the language tag line
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn article_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "articles": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "content": { "type": "STRING" },
                        "category": { "type": "STRING" },
                        "image_keywords": { "type": "STRING" },
                        "reporter_name": { "type": "STRING" }
                    },
                    "required": ["title", "content"]
                }
            }
        },
        "required": ["articles"]
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Pull the first candidate's text out of a `generateContent` response body.
pub fn extract_candidate_text(body: &str) -> Result<String> {
    let response: GenerateResponse = serde_json::from_str(body)?;
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| NewsError::collaborator("gemini", "response has no candidate text"))
}

/// Google Gemini `generateContent` client.
pub struct GeminiAdapter {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiAdapter {
    pub fn new(api_key: &str, http: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&http.user_agent)
            .timeout(Duration::from_secs(http.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn generate_content(&self, prompt: &str, generation_config: Option<serde_json::Value>) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt.to_string() }],
            }],
            generation_config,
        };

        debug!("Gemini request to model {} ({} prompt bytes)", self.model, prompt.len());

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(NewsError::collaborator(
                "gemini",
                format!("HTTP {}: {}", status, crate::utils::text::truncate_for_log(&body, 300)),
            ));
        }

        extract_candidate_text(&body)
    }
}

#[async_trait]
impl LlmAdapter for GeminiAdapter {
    fn adapter_name(&self) -> String {
        format!("Gemini ({})", self.model)
    }

    async fn generate_articles(&self, prompt: &str) -> Result<Vec<GeneratedArticle>> {
        let config = json!({
            "responseMimeType": "application/json",
            "responseSchema": article_schema(),
        });
        let text = self.generate_content(prompt, Some(config)).await?;
        let articles = parse_generated_articles(&text)?;
        info!("Gemini returned {} article records", articles.len());
        Ok(articles)
    }

    async fn categorize_advertisement(&self, content: &str) -> Result<String> {
        let text = self.generate_content(&categorization_prompt(content), None).await?;
        Ok(text.trim().to_string())
    }
}

/// Stand-in used when no text-generation credential is configured. Every
/// call fails with a configuration error, so generation never advances a
/// watermark and ad classification falls back to keyword scoring.
pub struct UnconfiguredLlm {
    variable: String,
}

impl UnconfiguredLlm {
    pub fn new(variable: &str) -> Self {
        Self {
            variable: variable.to_string(),
        }
    }

    fn error(&self) -> NewsError {
        NewsError::Config(format!("{} is not set", self.variable))
    }
}

#[async_trait]
impl LlmAdapter for UnconfiguredLlm {
    fn adapter_name(&self) -> String {
        "Unconfigured LLM".to_string()
    }

    async fn generate_articles(&self, _prompt: &str) -> Result<Vec<GeneratedArticle>> {
        Err(self.error())
    }

    async fn categorize_advertisement(&self, _content: &str) -> Result<String> {
        Err(self.error())
    }
}

/// Scripted reply for [`MockLlmAdapter`].
#[derive(Debug, Clone)]
pub enum MockReply {
    Articles(Vec<GeneratedArticle>),
    Label(String),
    Fail(String),
}

/// Deterministic adapter for tests.
///
/// Scripted replies are consumed in order. With nothing scripted, article
/// generation answers with a single roundup of the prompt's comments and
/// categorization falls back to keyword scoring.
pub struct MockLlmAdapter {
    name: String,
    replies: Mutex<VecDeque<MockReply>>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmAdapter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reply(self, reply: MockReply) -> Self {
        self.push_reply(reply);
        self
    }

    pub fn push_reply(&self, reply: MockReply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    /// Every prompt received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    fn next_reply(&self, prompt: &str) -> Option<MockReply> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.replies.lock().ok().and_then(|mut r| r.pop_front())
    }
}

#[async_trait]
impl LlmAdapter for MockLlmAdapter {
    fn adapter_name(&self) -> String {
        format!("Mock LLM Adapter ({})", self.name)
    }

    async fn generate_articles(&self, prompt: &str) -> Result<Vec<GeneratedArticle>> {
        match self.next_reply(prompt) {
            Some(MockReply::Articles(articles)) => Ok(articles),
            Some(MockReply::Fail(message)) => Err(NewsError::collaborator("mock llm", message)),
            Some(MockReply::Label(label)) => Err(NewsError::Parse(format!(
                "expected article records, got label '{}'",
                label
            ))),
            None => {
                let comments = prompt
                    .split_once(COMMENTS_MARKER)
                    .map(|(_, rest)| rest.trim())
                    .unwrap_or_default();
                if comments.is_empty() {
                    return Ok(Vec::new());
                }
                Ok(vec![GeneratedArticle::new("Neighborhood roundup", comments).with_category("community")])
            }
        }
    }

    async fn categorize_advertisement(&self, content: &str) -> Result<String> {
        match self.next_reply(content) {
            Some(MockReply::Label(label)) => Ok(label),
            Some(MockReply::Fail(message)) => Err(NewsError::collaborator("mock llm", message)),
            Some(MockReply::Articles(_)) => Err(NewsError::Parse("expected a label".to_string())),
            None => Ok(keyword_category(content).as_str().to_string()),
        }
    }
}
