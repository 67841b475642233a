//! Digest strategies for Recap.
//!
//! A [`ChannelSummarizer`] turns a slice of [`recap_core::ConversationMessage`]
//! into the text the bot posts back to Slack. Two strategies ship:
//!
//! - [`CompletionSummarizer`] frames the history as a chat-completion request
//!   (system pre-prompt, one user turn per message, system post-prompt) and
//!   returns the first choice of the model's response.
//! - [`MessageCountSummarizer`] reports the history size without any model
//!   call, which keeps the Slack plumbing testable with no completion account.
//!
//! The HTTP side lives behind [`CompletionClient`] so the strategies stay
//! network-free in tests.

pub mod client;
pub mod digest;

pub use client::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChatRole, CompletionClient,
    CompletionError, HttpCompletionClient, DEFAULT_OPENAI_BASE_URL,
};
pub use digest::{
    ChannelSummarizer, CompletionSummarizer, MessageCountSummarizer, SummarizeError,
    DEFAULT_POST_PROMPT, DEFAULT_PRE_PROMPT,
};
