//! Slack Integration - Socket Mode bot interface
//!
//! This crate provides the Slack interface for recap:
//! - **Socket Mode** (`socket`) - WebSocket connection to Slack (no public URL needed)
//! - **Slash Commands** (`commands`) - `/summarize` flag parsing and routing
//! - **Events** (`events`) - Socket Mode frame decoding
//! - **Web API** (`api`) - `conversations.history`, `chat.postMessage`
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Enable Socket Mode
//! 3. Add the slash command: `/summarize`
//! 4. Set env vars: `SLACK_APP_TOKEN`, `SLACK_BOT_TOKEN`
//!
//! # Architecture
//!
//! ```text
//! Socket Mode frames → SocketModeRunner → CommandRouter → SummaryService
//!                           ↓
//!                      ack (± text) ← ResponseMode
//! ```
//!
//! # Key Types
//!
//! - `SocketModeRunner` - WebSocket event loop with reconnection logic
//! - `CommandRouter` - Parses `/summarize` flags and drives the response
//! - `AckHandle` - Single-use envelope acknowledgment
//! - `SummaryService` - Trait for the digest backend

pub mod api;
pub mod commands;
pub mod events;
pub mod socket;
