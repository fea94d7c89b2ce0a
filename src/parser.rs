// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! JSON parsing for LM Studio conversation exports.
//!
//! This module handles deserialization of the JSON format LM Studio uses to
//! store chat conversations on disk. The format is a single conversation
//! record containing ordered messages; each message holds one or more
//! alternate versions (edits/regenerations), and assistant versions may be
//! composed of multiple generation steps.
//!
//! # Format Overview
//!
//! A conversation file contains:
//! - Metadata (name, creation time, last used model, token count)
//! - An optional system prompt, either as a legacy scalar field or inside
//!   the per-chat prediction config
//! - A list of messages, each with versioned content
//!
//! Message content appears in two shapes: a plain string, or an ordered list
//! of typed content blocks where only `"text"` blocks carry renderable text.
//! [`Version::text`] and [`Step::text`] resolve both shapes to a single
//! string.
//!
//! # Example
//!
//! ```
//! use lms2doc::parser::parse_conversation;
//!
//! let json = r#"{
//!     "name": "Quick question",
//!     "messages": [{
//!         "versions": [{ "role": "user", "content": "Hello" }]
//!     }]
//! }"#;
//!
//! let conversation = parse_conversation(json).unwrap();
//! assert_eq!(conversation.messages.len(), 1);
//! ```

use serde::Deserialize;
use snafu::prelude::*;

/// The prediction-config key carrying the per-chat system prompt.
pub const SYSTEM_PROMPT_KEY: &str = "llm.prediction.systemPrompt";

/// Error type for JSON parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// The file did not decode as a valid conversation record.
    ///
    /// This covers both malformed JSON and structurally invalid records
    /// (missing `name` or `messages`).
    #[snafu(display("failed to parse conversation: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },
}

/// The root structure of an LM Studio conversation export.
///
/// `name` and `messages` are required; a record missing either is rejected
/// at parse time. Every other field is optional and substituted with a
/// fallback literal at render time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// The conversation's display name.
    pub name: String,

    /// Creation time as a Unix timestamp in milliseconds.
    #[serde(default)]
    pub created_at: Option<i64>,

    /// The model last used in this conversation.
    #[serde(default)]
    pub last_used_model: Option<ModelInfo>,

    /// Total token count for the conversation, when recorded.
    #[serde(default)]
    pub token_count: Option<u64>,

    /// Legacy scalar system prompt field from older exports.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Per-chat prediction configuration, which may carry the system prompt
    /// under [`SYSTEM_PROMPT_KEY`].
    #[serde(default)]
    pub per_chat_prediction_config: Option<PredictionConfig>,

    /// The ordered sequence of messages in the conversation.
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Returns the system prompt stored in the per-chat prediction config,
    /// if present and non-empty.
    #[must_use]
    pub fn config_system_prompt(&self) -> Option<&str> {
        self.per_chat_prediction_config
            .as_ref()?
            .fields
            .iter()
            .find(|field| field.key == SYSTEM_PROMPT_KEY)?
            .value
            .as_ref()?
            .as_str()
            .filter(|prompt| !prompt.is_empty())
    }
}

/// Identifies the model used for generation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelInfo {
    /// The model identifier (e.g., "qwen2.5-7b-instruct").
    #[serde(default)]
    pub identifier: Option<String>,
}

/// Per-chat prediction configuration: a list of key/value fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PredictionConfig {
    /// The configuration fields.
    #[serde(default)]
    pub fields: Vec<ConfigField>,
}

/// A single key/value entry in the prediction config.
///
/// Values are arbitrary JSON; only string values under
/// [`SYSTEM_PROMPT_KEY`] are consumed by the renderers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConfigField {
    /// The configuration key.
    pub key: String,

    /// The configuration value, if any.
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

/// A single message in the conversation.
///
/// A message is a list of alternate versions plus an index marking which
/// one is currently selected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Alternate edits/regenerations of this message.
    pub versions: Vec<Version>,

    /// Index of the currently selected version.
    ///
    /// Absent, negative, or out-of-range values fall back to the first
    /// version.
    #[serde(default)]
    pub currently_selected: Option<i64>,
}

impl Message {
    /// Returns the currently selected version of this message.
    ///
    /// Selects `versions[currently_selected]` when the index is valid,
    /// otherwise the first version. Returns `None` only when `versions`
    /// is empty, which callers must treat as malformed input.
    #[must_use]
    pub fn current_version(&self) -> Option<&Version> {
        let selected = self
            .currently_selected
            .and_then(|index| usize::try_from(index).ok())
            .filter(|&index| index < self.versions.len())
            .unwrap_or(0);
        self.versions.get(selected)
    }
}

/// The role of a message version's author.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A user message.
    User,
    /// An assistant message.
    Assistant,
    /// Any other role. Messages with this role are skipped by renderers.
    #[default]
    #[serde(other)]
    Other,
}

/// Marks how a version's content is structured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VersionKind {
    /// An assistant version composed of generation steps.
    MultiStep,
    /// A plain single-block version.
    SingleStep,
    /// An unrecognized kind, treated like single-step content.
    #[serde(other)]
    Other,
}

/// One alternate edit/regeneration of a message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    /// Who authored this version.
    #[serde(default)]
    pub role: Role,

    /// How the content is structured. `MultiStep` marks an assistant
    /// version whose content lives in [`Version::steps`].
    #[serde(default, rename = "type")]
    pub kind: Option<VersionKind>,

    /// The version's content: either a plain string or a list of typed
    /// content blocks.
    #[serde(default)]
    pub content: Option<VersionContent>,

    /// Generation steps, present only for multi-step versions.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Version {
    /// Returns `true` when this version's content lives in its steps.
    #[must_use]
    pub fn is_multi_step(&self) -> bool {
        self.kind == Some(VersionKind::MultiStep)
    }

    /// Resolves this version's textual content.
    ///
    /// A plain string is returned verbatim. A block list is filtered to
    /// `"text"` blocks whose payloads are joined with newlines, in their
    /// original order. Missing content yields an empty string.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.content {
            Some(VersionContent::Text(text)) => text.clone(),
            Some(VersionContent::Blocks(blocks)) => join_text_blocks(blocks),
            None => String::new(),
        }
    }
}

/// The union of content representations a version can carry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum VersionContent {
    /// Content as a single plain string.
    Text(String),
    /// Content as an ordered list of typed blocks.
    Blocks(Vec<ContentBlock>),
}

/// One typed fragment of a version's or step's content.
///
/// Only `"text"` blocks carry renderable text; all other kinds (images,
/// attachments, future types) are silently skipped during extraction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentBlock {
    /// The block's type tag (e.g., "text", "image").
    #[serde(rename = "type")]
    pub kind: String,

    /// The text payload, present on text blocks.
    #[serde(default)]
    pub text: Option<String>,
}

/// Marks what a generation step contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    /// A step carrying renderable content blocks.
    ContentBlock,
    /// An unrecognized step kind. Skipped by renderers.
    #[serde(other)]
    Other,
}

/// One sub-unit of a multi-step assistant response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// What this step contains. Only `ContentBlock` steps are rendered.
    #[serde(default, rename = "type")]
    pub kind: Option<StepKind>,

    /// The step's content blocks. A step never carries scalar-string
    /// content.
    #[serde(default)]
    pub content: Option<Vec<ContentBlock>>,

    /// Generation info attached to this step.
    #[serde(default)]
    pub gen_info: Option<GenInfo>,
}

impl Step {
    /// Resolves this step's textual content using the same block-filtering
    /// rule as [`Version::text`].
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .as_deref()
            .map(join_text_blocks)
            .unwrap_or_default()
    }

    /// Returns the generation statistics attached to this step, if any.
    #[must_use]
    pub fn stats(&self) -> Option<&GenerationStats> {
        self.gen_info.as_ref()?.stats.as_ref()
    }
}

/// Generation info recorded for a step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenInfo {
    /// Performance statistics for the generation.
    #[serde(default)]
    pub stats: Option<GenerationStats>,
}

/// Numeric performance metrics attached to a generation step.
///
/// Every field is independently optional; absent fields render as a
/// literal `N/A`, never as an error.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStats {
    /// Generation throughput in tokens per second.
    #[serde(default)]
    pub tokens_per_second: Option<f64>,

    /// Seconds until the first token was produced.
    #[serde(default)]
    pub time_to_first_token_sec: Option<f64>,

    /// Total generation time in seconds.
    #[serde(default)]
    pub total_time_sec: Option<f64>,

    /// Number of prompt tokens.
    #[serde(default)]
    pub prompt_tokens_count: Option<u64>,

    /// Number of generated tokens.
    #[serde(default)]
    pub predicted_tokens_count: Option<u64>,

    /// Total token count for the step.
    #[serde(default)]
    pub total_tokens_count: Option<u64>,
}

/// Joins the text payloads of all `"text"` blocks with newlines.
fn join_text_blocks(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter(|block| block.kind == "text")
        .map(|block| block.text.as_deref().unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses a JSON string into a [`Conversation`] structure.
///
/// This is the main entry point for loading conversation exports.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or the record is missing its
/// required `name` or `messages` fields. A failed parse yields no value at
/// all; there is never a partially populated conversation.
///
/// # Example
///
/// ```
/// use lms2doc::parser::parse_conversation;
///
/// let json = r#"{ "name": "Empty chat", "messages": [] }"#;
/// let conversation = parse_conversation(json).unwrap();
/// assert_eq!(conversation.name, "Empty chat");
/// ```
pub fn parse_conversation(json_str: &str) -> Result<Conversation, ParseError> {
    serde_json::from_str(json_str).context(JsonSnafu)
}
