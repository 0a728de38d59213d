#![deny(missing_docs)]
//! Агентолог: a chat front-end for AI-agent initiative ideas.
//!
//! Checks a submitted idea against the spreadsheet registry of existing agents
//! with an LLM, walks the author through the initiative template and renders
//! Word/Excel artifacts. Served over Telegram and a JSON webhook.

/// Configuration management.
pub mod config;
/// Conversation engine shared by all transports.
pub mod dialog;
/// Word/Excel artifact generation.
pub mod documents;
/// Template fields and text command parsing.
pub mod form;
/// Idea uniqueness and cost-estimation pipeline.
pub mod idea;
/// LLM providers and client.
pub mod llm;
/// Log output redaction.
pub mod logging;
/// Registry of existing agents and the idea journal.
pub mod registry;
/// Per-user conversation state.
pub mod session;
/// Chat transports (Telegram, HTTP webhook).
pub mod transport;
/// Text formatting helpers.
pub mod utils;
