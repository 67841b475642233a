use std::sync::Arc;
use std::time::Duration;

use recap_core::config::{AppConfig, ConfigError, LoadOptions, SummaryStrategy};
use recap_slack::api::{ApiError, SlackWebApi};
use recap_slack::commands::CommandRouter;
use recap_slack::socket::{ReconnectPolicy, SocketModeRunner, SocketTransport, WebsocketTransport};
use recap_summarizer::{
    ChannelSummarizer, CompletionError, CompletionSummarizer, HttpCompletionClient,
    MessageCountSummarizer, DEFAULT_OPENAI_BASE_URL,
};
use thiserror::Error;
use tracing::info;

use crate::service::ChannelDigestService;

pub struct Application {
    pub config: AppConfig,
    pub transport: Arc<dyn SocketTransport>,
    pub runner: SocketModeRunner<ChannelDigestService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("slack client setup failed: {0}")]
    SlackClient(#[from] ApiError),
    #[error("completion client setup failed: {0}")]
    CompletionClient(#[from] CompletionError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let api = SlackWebApi::new(config.slack.app_token.clone(), config.slack.bot_token.clone())?;
    let summarizer = build_summarizer(&config)?;
    let service = ChannelDigestService::new(Arc::new(api.clone()), summarizer);

    let router = Arc::new(CommandRouter::new(
        service,
        Duration::from_millis(config.socket.ack_deadline_ms),
    ));
    let transport: Arc<dyn SocketTransport> = Arc::new(WebsocketTransport::new(api));
    let runner = SocketModeRunner::new(transport.clone(), router, ReconnectPolicy::default());

    info!(
        event_name = "system.bootstrap.ready",
        strategy = ?config.summary.strategy,
        "application bootstrap complete"
    );

    Ok(Application { config, transport, runner })
}

fn build_summarizer(config: &AppConfig) -> Result<Arc<dyn ChannelSummarizer>, BootstrapError> {
    match config.summary.strategy {
        SummaryStrategy::Count => Ok(Arc::new(MessageCountSummarizer)),
        SummaryStrategy::Llm => {
            let base_url = config
                .llm
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
            let client = HttpCompletionClient::new(
                base_url,
                config.llm.api_key.clone(),
                Duration::from_secs(config.llm.timeout_secs),
            )?;

            Ok(Arc::new(CompletionSummarizer::new(client, config.llm.model.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use recap_core::config::{ConfigOverrides, LoadOptions, SummaryStrategy};

    use crate::bootstrap::bootstrap;

    #[test]
    fn bootstrap_fails_fast_without_required_slack_tokens() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                slack_app_token: Some("invalid-token".to_string()),
                slack_bot_token: Some("xoxb-valid".to_string()),
                summary_strategy: Some(SummaryStrategy::Count),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.app_token"));
    }

    #[test]
    fn bootstrap_wires_count_strategy_without_a_completion_key() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                slack_app_token: Some("xapp-test".to_string()),
                slack_bot_token: Some("xoxb-test".to_string()),
                summary_strategy: Some(SummaryStrategy::Count),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("bootstrap should succeed with valid overrides");

        assert!(!app.transport.is_connected());
        assert!(matches!(app.config.summary.strategy, SummaryStrategy::Count));
    }
}
