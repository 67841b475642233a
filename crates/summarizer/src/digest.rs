use async_trait::async_trait;
use recap_core::ConversationMessage;
use thiserror::Error;
use tracing::debug;

use crate::client::{ChatCompletionRequest, ChatMessage, CompletionClient, CompletionError};

pub const DEFAULT_PRE_PROMPT: &str = "Summarize the following Slack conversation:";
pub const DEFAULT_POST_PROMPT: &str = "Make sure to keep it concise and professional.";

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("completion response contained no choices")]
    EmptyCompletion,
}

/// Strategy seam for turning channel history into a digest. Implementations
/// are selected once at startup and injected into the command path.
#[async_trait]
pub trait ChannelSummarizer: Send + Sync {
    async fn summarize(&self, messages: &[ConversationMessage]) -> Result<String, SummarizeError>;
}

/// Digest strategy backed by a chat-completion model.
pub struct CompletionSummarizer<C> {
    client: C,
    model: String,
    pre_prompt: Option<String>,
    post_prompt: Option<String>,
}

impl<C> CompletionSummarizer<C> {
    pub fn new(client: C, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            pre_prompt: Some(DEFAULT_PRE_PROMPT.to_string()),
            post_prompt: Some(DEFAULT_POST_PROMPT.to_string()),
        }
    }

    /// Replaces the framing prompts. `None` omits that system turn entirely.
    pub fn with_prompts(
        mut self,
        pre_prompt: Option<String>,
        post_prompt: Option<String>,
    ) -> Self {
        self.pre_prompt = pre_prompt;
        self.post_prompt = post_prompt;
        self
    }

    fn build_messages(&self, messages: &[ConversationMessage]) -> Vec<ChatMessage> {
        let mut turns = Vec::with_capacity(messages.len() + 2);

        if let Some(pre_prompt) = &self.pre_prompt {
            turns.push(ChatMessage::system(pre_prompt.clone()));
        }

        // Author ids and timestamps are dropped on purpose. The model sees
        // raw message bodies only, one user turn per channel message.
        for message in messages {
            turns.push(ChatMessage::user(message.text.clone()));
        }

        if let Some(post_prompt) = &self.post_prompt {
            turns.push(ChatMessage::system(post_prompt.clone()));
        }

        turns
    }
}

#[async_trait]
impl<C: CompletionClient> ChannelSummarizer for CompletionSummarizer<C> {
    async fn summarize(&self, messages: &[ConversationMessage]) -> Result<String, SummarizeError> {
        // TODO: restrict tokens used per call to avoid abuse of the
        // completion account; today the full history goes out untrimmed.
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: self.build_messages(messages),
        };

        debug!(
            event_name = "summarizer.completion_request",
            model = %self.model,
            turn_count = request.messages.len(),
            "sending completion request"
        );

        let response = self.client.complete(request).await?;
        let first_choice =
            response.choices.into_iter().next().ok_or(SummarizeError::EmptyCompletion)?;

        Ok(first_choice.message.content)
    }
}

/// Digest strategy that reports history size without calling a model. Useful
/// for smoke-testing the Slack plumbing with no completion account wired up.
pub struct MessageCountSummarizer;

#[async_trait]
impl ChannelSummarizer for MessageCountSummarizer {
    async fn summarize(&self, messages: &[ConversationMessage]) -> Result<String, SummarizeError> {
        Ok(format!("This channel has {} messages in its recent history.", messages.len()))
    }
}
