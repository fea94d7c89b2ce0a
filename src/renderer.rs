// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Rendering of parsed conversations into the flat-text output formats.
//!
//! This module owns everything the four output formats share: the
//! [`RenderOptions`] inclusion flags, the [`Format`] selector, the
//! fallback literals substituted for missing optional fields, the
//! fixed-precision statistics formatting, and the single traversal
//! ([`walk`]) that feeds every renderer.
//!
//! The traversal visits, in order: the metadata header, the configured
//! system prompt, and each message's currently selected version. Each
//! format supplies a sink that turns those visits into format-specific
//! markup; the text and Markdown sinks live here, the HTML and PDF sinks
//! in their own modules.
//!
//! # Example
//!
//! ```
//! use lms2doc::parser::parse_conversation;
//! use lms2doc::renderer::{RenderOptions, render_markdown};
//!
//! let json = r#"{
//!     "name": "Demo",
//!     "messages": [{
//!         "versions": [{ "role": "user", "content": "Hi!" }]
//!     }]
//! }"#;
//! let conversation = parse_conversation(json).unwrap();
//!
//! let markdown = render_markdown(&conversation, &RenderOptions::default()).unwrap();
//! assert!(markdown.contains("## User"));
//! assert!(markdown.contains("Hi!"));
//! ```

use crate::parser::{Conversation, GenerationStats, Role, StepKind};
use chrono::DateTime;
use snafu::prelude::*;
use std::fmt::Write;
use std::str::FromStr;

/// Fallback title for conversations without a usable name.
pub const UNTITLED_CONVERSATION: &str = "Untitled Conversation";

/// Fallback literal for absent metadata fields (model, tokens, created).
pub const UNKNOWN_FIELD: &str = "Unknown";

/// Fallback literal for absent numeric statistics.
pub const MISSING_STAT: &str = "N/A";

/// Fallback filename stem for conversations without a usable name.
pub const FALLBACK_FILE_STEM: &str = "conversation";

/// Timestamp layout for the created-at metadata line.
const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// An output format for conversation conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Plain text.
    Text,
    /// Markdown.
    Markdown,
    /// A standalone HTML document.
    Html,
    /// A paginated PDF document.
    Pdf,
}

impl Format {
    /// Returns the file extension for this format, without a dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Markdown => "md",
            Self::Html => "html",
            Self::Pdf => "pdf",
        }
    }

    /// Returns the MIME type for this format.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Text => "text/plain",
            Self::Markdown => "text/markdown",
            Self::Html => "text/html",
            Self::Pdf => "application/pdf",
        }
    }
}

/// Error for an unrecognized format name.
#[derive(Debug, Snafu)]
#[snafu(display("unknown format {value:?} (expected txt, md, html, or pdf)"))]
pub struct UnknownFormatError {
    value: String,
}

impl FromStr for Format {
    type Err = UnknownFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "txt" | "text" => Ok(Self::Text),
            "md" | "markdown" => Ok(Self::Markdown),
            "html" => Ok(Self::Html),
            "pdf" => Ok(Self::Pdf),
            other => UnknownFormatSnafu { value: other }.fail(),
        }
    }
}

/// Configuration options controlling which parts of the conversation are
/// included in the rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Whether to include the metadata header (title, creation time,
    /// model identifier, token count).
    pub include_metadata: bool,

    /// Whether the metadata header carries the created-at line.
    ///
    /// Has no effect when `include_metadata` is disabled.
    pub include_timestamps: bool,

    /// Whether to include the system prompt from the per-chat prediction
    /// config as its own labeled block.
    pub include_system_prompts: bool,

    /// Whether to include per-step generation statistics for multi-step
    /// assistant responses.
    pub include_stats: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            include_metadata: true,
            include_timestamps: true,
            include_system_prompts: true,
            include_stats: true,
        }
    }
}

/// Error type for structural failures during rendering.
#[derive(Debug, Snafu)]
pub enum RenderError {
    /// A message had an empty `versions` list, so no current version
    /// could be resolved.
    #[snafu(display("message {index} has no versions"))]
    EmptyVersions {
        /// Zero-based index of the malformed message.
        index: usize,
    },
}

/// The metadata header fields with fallback literals already applied.
pub(crate) struct Metadata {
    pub title: String,
    pub created: Option<String>,
    pub model: String,
    pub tokens: String,
    pub legacy_system_prompt: Option<String>,
}

impl Metadata {
    pub(crate) fn resolve(conversation: &Conversation, options: &RenderOptions) -> Self {
        let created = options
            .include_timestamps
            .then(|| format_created(conversation.created_at));
        Self {
            title: display_title(conversation).to_owned(),
            created,
            model: conversation
                .last_used_model
                .as_ref()
                .and_then(|model| model.identifier.clone())
                .unwrap_or_else(|| UNKNOWN_FIELD.to_owned()),
            tokens: conversation
                .token_count
                .map_or_else(|| UNKNOWN_FIELD.to_owned(), |count| count.to_string()),
            legacy_system_prompt: conversation.system_prompt.clone(),
        }
    }
}

/// Returns the conversation's display title, substituting the fallback for
/// absent or empty names.
pub(crate) fn display_title(conversation: &Conversation) -> &str {
    if conversation.name.is_empty() {
        UNTITLED_CONVERSATION
    } else {
        &conversation.name
    }
}

/// Formats an epoch-milliseconds timestamp for the created-at line.
fn format_created(millis: Option<i64>) -> String {
    millis
        .and_then(DateTime::from_timestamp_millis)
        .map_or_else(
            || UNKNOWN_FIELD.to_owned(),
            |datetime| datetime.format(CREATED_FORMAT).to_string(),
        )
}

/// Generation statistics formatted to their fixed precisions.
///
/// Built once per step and consumed by every sink so all formats agree on
/// values: throughput to 2 decimal places, durations to 3, counters
/// verbatim, absent fields as [`MISSING_STAT`].
pub(crate) struct StatsView {
    pub tokens_per_second: String,
    pub time_to_first_token: String,
    pub total_time: String,
    pub prompt_tokens: String,
    pub predicted_tokens: String,
    pub total_tokens: String,
}

impl StatsView {
    pub(crate) fn new(stats: &GenerationStats) -> Self {
        Self {
            tokens_per_second: fixed(stats.tokens_per_second, 2),
            time_to_first_token: fixed(stats.time_to_first_token_sec, 3),
            total_time: fixed(stats.total_time_sec, 3),
            prompt_tokens: count(stats.prompt_tokens_count),
            predicted_tokens: count(stats.predicted_tokens_count),
            total_tokens: count(stats.total_tokens_count),
        }
    }
}

/// Renders an optional float at a fixed number of decimal places.
fn fixed(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(
        || MISSING_STAT.to_owned(),
        |value| format!("{value:.decimals$}"),
    )
}

/// Renders an optional integer counter verbatim.
fn count(value: Option<u64>) -> String {
    value.map_or_else(|| MISSING_STAT.to_owned(), |value| value.to_string())
}

/// A per-format output target for the shared conversation traversal.
///
/// [`walk`] drives a sink through the conversation in a fixed order;
/// each method appends that piece in the sink's own markup.
pub(crate) trait RenderSink {
    /// Called once before anything else. Formats with an unconditional
    /// document frame (HTML, PDF) emit their title here.
    fn begin(&mut self, _conversation: &Conversation) {}

    /// Emits the metadata header. Only called when metadata is included.
    fn metadata(&mut self, metadata: &Metadata);

    /// Emits the configured system prompt as a labeled block.
    fn system_prompt(&mut self, prompt: &str);

    /// Emits one labeled message block, optionally followed by its
    /// generation statistics.
    fn message(&mut self, role: Role, content: &str, stats: Option<&StatsView>);
}

/// Drives a sink through the conversation in the traversal order all
/// formats share: metadata, system prompt, then messages.
///
/// For each message the currently selected version decides the output:
/// user versions produce one block, multi-step assistant versions one
/// block per content-block step with non-empty extracted text (with
/// per-step statistics when enabled), single-step assistant versions one
/// block without statistics. Versions with any other role are skipped.
pub(crate) fn walk<S: RenderSink>(
    conversation: &Conversation,
    options: &RenderOptions,
    sink: &mut S,
) -> Result<(), RenderError> {
    sink.begin(conversation);

    if options.include_metadata {
        sink.metadata(&Metadata::resolve(conversation, options));
    }

    if options.include_system_prompts
        && let Some(prompt) = conversation.config_system_prompt()
    {
        sink.system_prompt(prompt);
    }

    for (index, message) in conversation.messages.iter().enumerate() {
        let version = message
            .current_version()
            .context(EmptyVersionsSnafu { index })?;

        match version.role {
            Role::User => sink.message(Role::User, &version.text(), None),
            Role::Assistant if version.is_multi_step() => {
                for step in &version.steps {
                    if step.kind != Some(StepKind::ContentBlock) {
                        continue;
                    }
                    let content = step.text();
                    if content.is_empty() {
                        continue;
                    }
                    let stats = if options.include_stats {
                        step.stats().map(StatsView::new)
                    } else {
                        None
                    };
                    sink.message(Role::Assistant, &content, stats.as_ref());
                }
            }
            Role::Assistant => sink.message(Role::Assistant, &version.text(), None),
            Role::Other => {}
        }
    }

    Ok(())
}

/// Sink producing the plain-text layout.
#[derive(Default)]
struct TextSink {
    out: String,
}

impl TextSink {
    fn separator(&mut self) {
        let _ = writeln!(self.out, "\n{}\n", "=".repeat(80));
    }
}

impl RenderSink for TextSink {
    fn metadata(&mut self, metadata: &Metadata) {
        let _ = writeln!(self.out, "Conversation: {}", metadata.title);
        if let Some(created) = &metadata.created {
            let _ = writeln!(self.out, "Created: {created}");
        }
        let _ = writeln!(self.out, "Model: {}", metadata.model);
        let _ = writeln!(self.out, "Token Count: {}", metadata.tokens);
        if let Some(prompt) = &metadata.legacy_system_prompt {
            let _ = writeln!(self.out, "System Prompt: {prompt}");
        }
        self.separator();
    }

    fn system_prompt(&mut self, prompt: &str) {
        let _ = writeln!(self.out, "SYSTEM PROMPT:\n{prompt}");
        self.separator();
    }

    fn message(&mut self, role: Role, content: &str, stats: Option<&StatsView>) {
        let label = match role {
            Role::User => "USER",
            _ => "ASSISTANT",
        };
        let _ = write!(self.out, "{label}:\n{content}\n\n");

        if let Some(stats) = stats {
            let _ = writeln!(self.out, "Generation Stats:");
            let _ = writeln!(self.out, "  Tokens/sec: {}", stats.tokens_per_second);
            let _ = writeln!(
                self.out,
                "  Time to first token: {}s",
                stats.time_to_first_token
            );
            let _ = writeln!(self.out, "  Total time: {}s", stats.total_time);
            let _ = writeln!(self.out, "  Prompt tokens: {}", stats.prompt_tokens);
            let _ = writeln!(self.out, "  Generated tokens: {}", stats.predicted_tokens);
            let _ = writeln!(self.out, "  Total tokens: {}\n", stats.total_tokens);
        }
    }
}

/// Sink producing the Markdown layout.
#[derive(Default)]
struct MarkdownSink {
    out: String,
}

impl RenderSink for MarkdownSink {
    fn metadata(&mut self, metadata: &Metadata) {
        let _ = write!(self.out, "# {}\n\n", metadata.title);
        if let Some(created) = &metadata.created {
            let _ = writeln!(self.out, "**Created:** {created}");
        }
        let _ = writeln!(self.out, "**Model:** {}", metadata.model);
        let _ = write!(self.out, "**Token Count:** {}\n\n", metadata.tokens);
        if let Some(prompt) = &metadata.legacy_system_prompt {
            let _ = write!(self.out, "**System Prompt:** {prompt}\n\n");
        }
        self.out.push_str("---\n\n");
    }

    fn system_prompt(&mut self, prompt: &str) {
        let _ = write!(self.out, "## System Prompt\n\n{prompt}\n\n---\n\n");
    }

    fn message(&mut self, role: Role, content: &str, stats: Option<&StatsView>) {
        let label = match role {
            Role::User => "User",
            _ => "Assistant",
        };
        let _ = write!(self.out, "## {label}\n\n{content}\n\n");

        if let Some(stats) = stats {
            let _ = write!(self.out, "\n### Generation Statistics\n\n");
            let _ = writeln!(
                self.out,
                "- **Tokens per second:** {}",
                stats.tokens_per_second
            );
            let _ = writeln!(
                self.out,
                "- **Time to first token:** {}s",
                stats.time_to_first_token
            );
            let _ = writeln!(self.out, "- **Total time:** {}s", stats.total_time);
            let _ = writeln!(self.out, "- **Prompt tokens:** {}", stats.prompt_tokens);
            let _ = writeln!(
                self.out,
                "- **Generated tokens:** {}",
                stats.predicted_tokens
            );
            let _ = write!(self.out, "- **Total tokens:** {}\n\n", stats.total_tokens);
        }
    }
}

/// Renders a conversation as plain text.
///
/// # Errors
///
/// Returns an error if any message has an empty `versions` list.
pub fn render_text(
    conversation: &Conversation,
    options: &RenderOptions,
) -> Result<String, RenderError> {
    let mut sink = TextSink::default();
    walk(conversation, options, &mut sink)?;
    Ok(sink.out)
}

/// Renders a conversation as Markdown.
///
/// # Errors
///
/// Returns an error if any message has an empty `versions` list.
pub fn render_markdown(
    conversation: &Conversation,
    options: &RenderOptions,
) -> Result<String, RenderError> {
    let mut sink = MarkdownSink::default();
    walk(conversation, options, &mut sink)?;
    Ok(sink.out)
}
