use serde::Deserialize;
use thiserror::Error;

/// One decoded Socket Mode frame. Slack multiplexes control frames (`hello`,
/// `disconnect`) and ack-requiring envelopes over the same websocket; this
/// enum keeps the distinction explicit for the pump loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Hello,
    Disconnect { reason: Option<String> },
    Envelope(SocketEnvelope),
    /// Control frames this bot does not understand. Recognized but ignored;
    /// without an `envelope_id` there is nothing to acknowledge.
    Unsupported { frame_type: String },
}

/// A frame Slack expects an acknowledgment for, keyed by `envelope_id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SocketEnvelope {
    pub envelope_id: String,
    pub event: SocketEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketEvent {
    SlashCommand(SlashCommandPayload),
    /// Envelope types the bot does not handle, e.g. `events_api`. Kept so the
    /// pump can still acknowledge them.
    Unsupported { event_type: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SlashCommandPayload {
    pub command: String,
    #[serde(default)]
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    Json(String),
    #[error("frame has no `type` field")]
    MissingType,
    #[error("envelope frame has no `envelope_id` field")]
    MissingEnvelopeId,
    #[error("slash command payload is malformed: {0}")]
    MalformedSlashCommand(String),
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    frame_type: Option<String>,
    envelope_id: Option<String>,
    payload: Option<serde_json::Value>,
    reason: Option<String>,
}

/// Decodes one raw websocket text frame. Callers decide what to do with a
/// `DecodeError`; the runner logs and drops the frame without acknowledging.
pub fn decode_frame(raw: &str) -> Result<Frame, DecodeError> {
    let frame: RawFrame =
        serde_json::from_str(raw).map_err(|err| DecodeError::Json(err.to_string()))?;
    let frame_type = frame.frame_type.ok_or(DecodeError::MissingType)?;

    match frame_type.as_str() {
        "hello" => Ok(Frame::Hello),
        "disconnect" => Ok(Frame::Disconnect { reason: frame.reason }),
        "slash_commands" => {
            let envelope_id = frame.envelope_id.ok_or(DecodeError::MissingEnvelopeId)?;
            let payload = frame.payload.ok_or_else(|| {
                DecodeError::MalformedSlashCommand("payload field is missing".to_string())
            })?;
            let payload = serde_json::from_value::<SlashCommandPayload>(payload)
                .map_err(|err| DecodeError::MalformedSlashCommand(err.to_string()))?;

            Ok(Frame::Envelope(SocketEnvelope {
                envelope_id,
                event: SocketEvent::SlashCommand(payload),
            }))
        }
        other => match frame.envelope_id {
            Some(envelope_id) => Ok(Frame::Envelope(SocketEnvelope {
                envelope_id,
                event: SocketEvent::Unsupported { event_type: other.to_string() },
            })),
            None => Ok(Frame::Unsupported { frame_type: other.to_string() }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_frame, DecodeError, Frame, SocketEvent};

    #[test]
    fn decodes_hello_frames() {
        let frame = decode_frame(r#"{"type":"hello","num_connections":1}"#)
            .expect("hello frame should decode");
        assert_eq!(frame, Frame::Hello);
    }

    #[test]
    fn decodes_disconnect_frames_with_reason() {
        let frame = decode_frame(r#"{"type":"disconnect","reason":"refresh_requested"}"#)
            .expect("disconnect frame should decode");
        assert_eq!(frame, Frame::Disconnect { reason: Some("refresh_requested".to_string()) });
    }

    #[test]
    fn decodes_slash_command_envelopes() {
        let raw = r#"{
            "type": "slash_commands",
            "envelope_id": "env-1",
            "payload": {
                "command": "/summarize",
                "text": "--to-me",
                "channel_id": "C123",
                "user_id": "U456"
            }
        }"#;

        let frame = decode_frame(raw).expect("slash command envelope should decode");
        let envelope = match frame {
            Frame::Envelope(envelope) => envelope,
            other => panic!("expected envelope, got {other:?}"),
        };

        assert_eq!(envelope.envelope_id, "env-1");
        let payload = match envelope.event {
            SocketEvent::SlashCommand(payload) => payload,
            other => panic!("expected slash command, got {other:?}"),
        };
        assert_eq!(payload.command, "/summarize");
        assert_eq!(payload.text, "--to-me");
        assert_eq!(payload.channel_id, "C123");
        assert_eq!(payload.user_id, "U456");
    }

    #[test]
    fn missing_command_text_defaults_to_empty() {
        let raw = r#"{
            "type": "slash_commands",
            "envelope_id": "env-2",
            "payload": {"command": "/summarize", "channel_id": "C123", "user_id": "U456"}
        }"#;

        let frame = decode_frame(raw).expect("payload without text should decode");
        let Frame::Envelope(envelope) = frame else { panic!("expected envelope") };
        let SocketEvent::SlashCommand(payload) = envelope.event else {
            panic!("expected slash command")
        };
        assert_eq!(payload.text, "");
    }

    #[test]
    fn slash_command_without_channel_is_malformed() {
        let raw = r#"{
            "type": "slash_commands",
            "envelope_id": "env-3",
            "payload": {"command": "/summarize", "user_id": "U456"}
        }"#;

        let error = decode_frame(raw).expect_err("missing channel_id should fail");
        assert!(matches!(error, DecodeError::MalformedSlashCommand(_)));
    }

    #[test]
    fn other_envelope_types_decode_as_unsupported() {
        let raw = r#"{"type":"events_api","envelope_id":"env-4","payload":{"event":{}}}"#;

        let frame = decode_frame(raw).expect("events_api envelope should decode");
        let Frame::Envelope(envelope) = frame else { panic!("expected envelope") };
        assert_eq!(
            envelope.event,
            SocketEvent::Unsupported { event_type: "events_api".to_string() }
        );
    }

    #[test]
    fn unknown_control_frames_decode_as_unsupported() {
        let frame = decode_frame(r#"{"type":"goodbye"}"#)
            .expect("unknown control frame should decode");
        assert_eq!(frame, Frame::Unsupported { frame_type: "goodbye".to_string() });

        let frame = decode_frame(r#"{"type":"events_api","payload":{}}"#)
            .expect("envelope type without id should decode");
        assert_eq!(frame, Frame::Unsupported { frame_type: "events_api".to_string() });
    }

    #[test]
    fn slash_command_without_envelope_id_is_rejected() {
        let raw = r#"{
            "type": "slash_commands",
            "payload": {"command": "/summarize", "channel_id": "C123", "user_id": "U456"}
        }"#;

        let error = decode_frame(raw).expect_err("slash command without id should fail");
        assert_eq!(error, DecodeError::MissingEnvelopeId);
    }

    #[test]
    fn garbage_input_is_rejected() {
        let error = decode_frame("not json at all").expect_err("garbage should fail");
        assert!(matches!(error, DecodeError::Json(_)));

        let error =
            decode_frame(r#"{"envelope_id":"env-5"}"#).expect_err("typeless frame should fail");
        assert_eq!(error, DecodeError::MissingType);
    }
}
