//! Writing assistant: a closed set of writing tasks, each with its own
//! system prompt, sent to the chat model with the user's text.

use crate::config::{ChatSettings, PipelineConfig, RetryPolicy};
use crate::error::PipelineError;
use crate::pipeline::llm::{ChatBackend, ChatRequest};
use crate::pipeline::retry::with_retry;
use crate::prompts;
use std::sync::Arc;
use tracing::info;

/// Paragraph count used when an essay request does not give one.
pub const DEFAULT_ESSAY_PARAGRAPHS: u32 = 3;

/// Upper bound on requested essay paragraphs.
pub const MAX_ESSAY_PARAGRAPHS: u32 = 20;

/// What the writing assistant should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritingTask {
    Essay { paragraphs: u32 },
    BlogPost,
    ColdEmail,
    Summary,
    JsonToXml,
    Paragraph,
    Rewrite,
    Grammar,
    Tone,
    ProductCopy,
    SocialPost,
    Story,
    General,
}

impl WritingTask {
    /// Map a caller-supplied prompt key to a task.
    ///
    /// Unknown keys fall back to [`WritingTask::General`]. `paragraphs` only
    /// matters for essays and is clamped to `1..=20`.
    pub fn from_key(key: &str, paragraphs: Option<u32>) -> Self {
        match key.trim() {
            "assay" | "essay" => WritingTask::Essay {
                paragraphs: paragraphs
                    .unwrap_or(DEFAULT_ESSAY_PARAGRAPHS)
                    .clamp(1, MAX_ESSAY_PARAGRAPHS),
            },
            "blogPost" => WritingTask::BlogPost,
            "coldEmail" => WritingTask::ColdEmail,
            "summarizing" => WritingTask::Summary,
            "jsonToXml" => WritingTask::JsonToXml,
            "paragraph" => WritingTask::Paragraph,
            "rewriter" => WritingTask::Rewrite,
            "grammar" => WritingTask::Grammar,
            "tone" => WritingTask::Tone,
            "product" => WritingTask::ProductCopy,
            "social" => WritingTask::SocialPost,
            "story" => WritingTask::Story,
            _ => WritingTask::General,
        }
    }

    /// Like [`WritingTask::from_key`], but an empty key is a validation error.
    pub fn parse(key: &str, paragraphs: Option<u32>) -> Result<Self, PipelineError> {
        if key.trim().is_empty() {
            return Err(PipelineError::validation("Please provide a prompt type"));
        }
        Ok(Self::from_key(key, paragraphs))
    }

    pub fn system_prompt(&self) -> String {
        match self {
            WritingTask::Essay { paragraphs } => prompts::ESSAY_PROMPT
                .replace("{paragraphs}", &paragraphs.to_string()),
            WritingTask::BlogPost => prompts::BLOG_POST_PROMPT.to_string(),
            WritingTask::ColdEmail => prompts::COLD_EMAIL_PROMPT.to_string(),
            WritingTask::Summary => prompts::SUMMARY_PROMPT.to_string(),
            WritingTask::JsonToXml => prompts::JSON_TO_XML_PROMPT.to_string(),
            WritingTask::Paragraph => prompts::PARAGRAPH_PROMPT.to_string(),
            WritingTask::Rewrite => prompts::REWRITE_PROMPT.to_string(),
            WritingTask::Grammar => prompts::GRAMMAR_PROMPT.to_string(),
            WritingTask::Tone => prompts::TONE_PROMPT.to_string(),
            WritingTask::ProductCopy => prompts::PRODUCT_COPY_PROMPT.to_string(),
            WritingTask::SocialPost => prompts::SOCIAL_POST_PROMPT.to_string(),
            WritingTask::Story => prompts::STORY_PROMPT.to_string(),
            WritingTask::General => prompts::GENERAL_WRITING_PROMPT.to_string(),
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            WritingTask::Essay { .. } => "essay",
            WritingTask::BlogPost => "blog post",
            WritingTask::ColdEmail => "cold email",
            WritingTask::Summary => "summary",
            WritingTask::JsonToXml => "JSON to XML",
            WritingTask::Paragraph => "paragraph",
            WritingTask::Rewrite => "rewrite",
            WritingTask::Grammar => "grammar",
            WritingTask::Tone => "tone",
            WritingTask::ProductCopy => "product copy",
            WritingTask::SocialPost => "social post",
            WritingTask::Story => "story",
            WritingTask::General => "general",
        }
    }
}

#[derive(Clone)]
pub struct Writer {
    chat: Arc<dyn ChatBackend>,
    policy: RetryPolicy,
    settings: ChatSettings,
}

impl Writer {
    pub fn new(chat: Arc<dyn ChatBackend>, config: &PipelineConfig) -> Self {
        Self {
            chat,
            policy: config.chat_retry,
            settings: config.writing,
        }
    }

    pub async fn generate(&self, task: WritingTask, text: &str) -> Result<String, PipelineError> {
        if text.trim().is_empty() {
            return Err(PipelineError::validation("Please provide input text"));
        }

        info!("Generating {} content ({} chars of input)", task.name(), text.len());
        let request = ChatRequest::new(text, self.settings).with_system(task.system_prompt());
        let output = with_retry("Chat", &self.policy, |_| self.chat.complete(&request)).await?;
        Ok(output)
    }
}
