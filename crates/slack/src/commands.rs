use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::socket::AckHandle;

pub const HELP_TEXT: &str =
    "Usage: /summarize [flag]\n--to-channel: Send message to channel\n--to-me: Send message to me\n";
pub const NOT_A_FLAG_TEXT: &str =
    "Please provide a valid flag, use /summarize --help for more information";
pub const UNKNOWN_FLAG_TEXT: &str = "Invalid flag, use /summarize --help for more information";

/// Where the digest goes, derived from the slash command's argument text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseMode {
    /// Post the digest publicly. The empty argument and `--to-channel` both
    /// land here.
    ChannelBroadcast,
    /// Carry the digest in the ack payload, visible only to the caller.
    PrivateReply,
    HelpText,
    InvalidFlag(InvalidReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidReason {
    /// The argument does not even look like a flag.
    NotAFlag,
    /// The argument is flag-shaped but not one of ours.
    UnknownFlag,
}

impl InvalidReason {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotAFlag => NOT_A_FLAG_TEXT,
            Self::UnknownFlag => UNKNOWN_FLAG_TEXT,
        }
    }
}

/// Classifies the raw argument text. Matching is verbatim: no trimming, no
/// case folding, and the bare-word check runs before any flag comparison, so
/// ` --to-me` and `--to-me extra` are both rejected.
pub fn parse_response_mode(text: &str) -> ResponseMode {
    if !text.is_empty() && !text.starts_with("--") {
        return ResponseMode::InvalidFlag(InvalidReason::NotAFlag);
    }
    if text.is_empty() || text == "--to-channel" {
        return ResponseMode::ChannelBroadcast;
    }
    if text == "--to-me" {
        return ResponseMode::PrivateReply;
    }
    if text == "--help" {
        return ResponseMode::HelpText;
    }

    ResponseMode::InvalidFlag(InvalidReason::UnknownFlag)
}

/// One slash command ready to route: the payload fields that matter plus the
/// single-use ack for its envelope.
#[derive(Debug)]
pub struct CommandInvocation {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub ack: AckHandle,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("channel digest failed: {0}")]
    Digest(String),
    #[error("channel post failed: {0}")]
    Post(String),
}

/// Backing operations the router needs: produce a digest for a channel and
/// post text into it. Implementations own history fetching and summarizing.
#[async_trait]
pub trait SummaryService: Send + Sync {
    async fn channel_digest(&self, channel_id: &str) -> Result<String, ServiceError>;
    async fn post_to_channel(&self, channel_id: &str, text: &str) -> Result<(), ServiceError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    Posted,
    BroadcastAborted,
    Replied,
    ReplySkipped,
    Help,
    Rejected(InvalidReason),
}

/// Routes parsed invocations to the summary service and answers Slack.
///
/// Every path consumes the invocation's [`AckHandle`] at most once; the
/// handle's move semantics make a second ack unrepresentable.
pub struct CommandRouter<S> {
    service: S,
    ack_deadline: Duration,
}

impl<S> CommandRouter<S>
where
    S: SummaryService,
{
    pub fn new(service: S, ack_deadline: Duration) -> Self {
        Self { service, ack_deadline }
    }

    pub async fn route(&self, invocation: CommandInvocation) -> RouteOutcome {
        let CommandInvocation { channel_id, user_id, text, ack } = invocation;
        let mode = parse_response_mode(&text);

        info!(
            event_name = "command.route",
            channel_id = %channel_id,
            user_id = %user_id,
            mode = ?mode,
            "routing slash command"
        );

        match mode {
            ResponseMode::ChannelBroadcast => {
                // Ack goes out before any Web API work so Slack never times
                // the command out while history is being fetched.
                if let Err(err) = ack.ack().await {
                    warn!(
                        event_name = "command.ack_failed",
                        channel_id = %channel_id,
                        error = %err,
                        "broadcast ack failed; continuing with digest"
                    );
                }

                let digest = match self.service.channel_digest(&channel_id).await {
                    Ok(digest) => digest,
                    Err(err) => {
                        error!(
                            event_name = "command.digest_failed",
                            channel_id = %channel_id,
                            error = %err,
                            "digest failed after broadcast ack"
                        );
                        return RouteOutcome::BroadcastAborted;
                    }
                };

                match self.service.post_to_channel(&channel_id, &digest).await {
                    Ok(()) => RouteOutcome::Posted,
                    Err(err) => {
                        error!(
                            event_name = "command.post_failed",
                            channel_id = %channel_id,
                            error = %err,
                            "digest post failed"
                        );
                        RouteOutcome::BroadcastAborted
                    }
                }
            }
            ResponseMode::PrivateReply => {
                // The digest must land inside the ack window. On failure or
                // deadline no ack is sent at all; Slack surfaces its own
                // timeout error to the caller.
                let digest = tokio::time::timeout(
                    self.ack_deadline,
                    self.service.channel_digest(&channel_id),
                )
                .await;

                match digest {
                    Ok(Ok(digest)) => {
                        if let Err(err) = ack.ack_with_text(&digest).await {
                            warn!(
                                event_name = "command.ack_failed",
                                channel_id = %channel_id,
                                error = %err,
                                "private reply ack failed"
                            );
                        }
                        RouteOutcome::Replied
                    }
                    Ok(Err(err)) => {
                        error!(
                            event_name = "command.digest_failed",
                            channel_id = %channel_id,
                            error = %err,
                            "digest failed; withholding ack"
                        );
                        RouteOutcome::ReplySkipped
                    }
                    Err(_) => {
                        error!(
                            event_name = "command.digest_deadline",
                            channel_id = %channel_id,
                            deadline_ms = self.ack_deadline.as_millis() as u64,
                            "digest exceeded ack deadline; withholding ack"
                        );
                        RouteOutcome::ReplySkipped
                    }
                }
            }
            ResponseMode::HelpText => {
                if let Err(err) = ack.ack_with_text(HELP_TEXT).await {
                    warn!(
                        event_name = "command.ack_failed",
                        channel_id = %channel_id,
                        error = %err,
                        "help ack failed"
                    );
                }
                RouteOutcome::Help
            }
            ResponseMode::InvalidFlag(reason) => {
                if let Err(err) = ack.ack_with_text(reason.user_message()).await {
                    warn!(
                        event_name = "command.ack_failed",
                        channel_id = %channel_id,
                        error = %err,
                        "rejection ack failed"
                    );
                }
                RouteOutcome::Rejected(reason)
            }
        }
    }
}
