use std::sync::Arc;

use async_trait::async_trait;
use recap_slack::api::ChatApi;
use recap_slack::commands::{ServiceError, SummaryService};
use recap_summarizer::ChannelSummarizer;
use tracing::{debug, info};
use uuid::Uuid;

/// Production summary backend: pulls channel history over the Web API and
/// hands it to the configured digest strategy.
pub struct ChannelDigestService {
    api: Arc<dyn ChatApi>,
    summarizer: Arc<dyn ChannelSummarizer>,
}

impl ChannelDigestService {
    pub fn new(api: Arc<dyn ChatApi>, summarizer: Arc<dyn ChannelSummarizer>) -> Self {
        Self { api, summarizer }
    }
}

#[async_trait]
impl SummaryService for ChannelDigestService {
    async fn channel_digest(&self, channel_id: &str) -> Result<String, ServiceError> {
        // TODO: cache digests keyed by channel id so back-to-back invocations
        // skip the history fetch.
        let correlation_id = Uuid::new_v4();

        info!(
            event_name = "digest.fetch_history",
            channel_id = %channel_id,
            correlation_id = %correlation_id,
            "fetching channel history"
        );
        let messages = self
            .api
            .fetch_history(channel_id)
            .await
            .map_err(|err| ServiceError::Digest(err.to_string()))?;
        debug!(
            event_name = "digest.history_fetched",
            channel_id = %channel_id,
            correlation_id = %correlation_id,
            message_count = messages.len(),
            "channel history fetched"
        );

        let digest = self
            .summarizer
            .summarize(&messages)
            .await
            .map_err(|err| ServiceError::Digest(err.to_string()))?;
        info!(
            event_name = "digest.ready",
            channel_id = %channel_id,
            correlation_id = %correlation_id,
            "digest ready"
        );

        Ok(digest)
    }

    async fn post_to_channel(&self, channel_id: &str, text: &str) -> Result<(), ServiceError> {
        self.api
            .post_message(channel_id, text)
            .await
            .map_err(|err| ServiceError::Post(err.to_string()))
    }
}
