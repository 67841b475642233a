pub mod config;
pub mod message;

pub use config::{
    AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat, SummaryStrategy,
};
pub use message::ConversationMessage;
