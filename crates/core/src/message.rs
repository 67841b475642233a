use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One message pulled from a channel's history, reduced to the fields the
/// digest pipeline actually reads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Authoring user id. Bot and system messages may not carry one.
    pub author: Option<String>,
    pub text: String,
    /// Slack timestamp in `seconds.fraction` form, e.g. `1716210000.000100`.
    /// Doubles as the message's unique id within a channel, so it is kept
    /// verbatim rather than parsed eagerly.
    pub ts: String,
}

impl ConversationMessage {
    pub fn new(
        author: Option<impl Into<String>>,
        text: impl Into<String>,
        ts: impl Into<String>,
    ) -> Self {
        Self { author: author.map(Into::into), text: text.into(), ts: ts.into() }
    }

    /// Interprets the raw `ts` as a UTC instant. Returns `None` when the
    /// timestamp is not in Slack's `seconds.fraction` shape.
    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        let (secs_raw, frac_raw) = match self.ts.split_once('.') {
            Some((secs, frac)) => (secs, frac),
            None => (self.ts.as_str(), ""),
        };

        let secs = secs_raw.parse::<i64>().ok()?;
        let digits: String = frac_raw.chars().take(6).collect();
        let micros = if digits.is_empty() {
            0
        } else {
            format!("{digits:0<6}").parse::<u32>().ok()?
        };

        Utc.timestamp_opt(secs, micros * 1_000).single()
    }
}
