// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Export coordination: previews, downloadable artifacts, and copyable text.
//!
//! Every operation here regenerates its output fresh from the conversation
//! and the current options; nothing is cached between calls. An operation
//! either succeeds completely or reports a single error — a blank render
//! never becomes a file, and a failed PDF generation never exposes partial
//! bytes.

use crate::html::render_html;
use crate::parser::Conversation;
use crate::pdf::{PdfError, render_pdf};
use crate::renderer::{
    FALLBACK_FILE_STEM, Format, RenderError, RenderOptions, render_markdown, render_text,
};
use snafu::prelude::*;

/// Maximum number of characters shown in a preview before truncation.
pub const PREVIEW_LIMIT: usize = 2000;

/// Marker appended to a preview that was truncated.
pub const TRUNCATION_MARKER: &str = "\n\n... (truncated for preview)";

/// Advisory shown instead of a preview for the PDF format.
pub const PDF_PREVIEW_NOTE: &str =
    "PDF preview is not available. Export the conversation to generate the PDF file.";

/// A fully rendered export, ready to be written out.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// The rendered document bytes.
    pub bytes: Vec<u8>,
    /// Filename derived from the conversation name and format.
    pub filename: String,
    /// MIME type for the chosen format.
    pub mime_type: &'static str,
}

/// Error type for export operations.
#[derive(Debug, Snafu)]
pub enum ExportError {
    /// No conversation was loaded.
    #[snafu(display("no conversation loaded"))]
    NoConversation,

    /// The rendered output was empty or whitespace-only.
    #[snafu(display("rendered output is empty; nothing to export"))]
    EmptyContent,

    /// The conversation was structurally malformed.
    #[snafu(display("{source}"), context(false))]
    Render {
        /// The underlying render error.
        source: RenderError,
    },

    /// PDF generation failed; another format may still work.
    #[snafu(display("failed to generate PDF (try another format): {source}"), context(false))]
    Pdf {
        /// The underlying PDF error.
        source: PdfError,
    },
}

/// Renders the textual representation of a format.
///
/// The PDF format maps to the plain-text layout, since its binary form has
/// no direct textual rendering.
fn render_string(
    conversation: &Conversation,
    options: &RenderOptions,
    format: Format,
) -> Result<String, RenderError> {
    match format {
        Format::Text | Format::Pdf => render_text(conversation, options),
        Format::Markdown => render_markdown(conversation, options),
        Format::Html => render_html(conversation, options),
    }
}

/// Produces a truncated preview of the rendered output.
///
/// Returns an empty string when no conversation is loaded, and a fixed
/// advisory for the PDF format. Other formats render in full and are cut
/// to [`PREVIEW_LIMIT`] characters with [`TRUNCATION_MARKER`] appended
/// when anything was cut. Truncation happens on the already-escaped
/// output, so an HTML preview is never left mid-entity.
///
/// # Errors
///
/// Returns an error if the conversation is structurally malformed.
pub fn preview(
    conversation: Option<&Conversation>,
    options: &RenderOptions,
    format: Format,
) -> Result<String, ExportError> {
    let Some(conversation) = conversation else {
        return Ok(String::new());
    };
    if format == Format::Pdf {
        return Ok(PDF_PREVIEW_NOTE.to_owned());
    }

    let full = render_string(conversation, options, format)?;
    Ok(truncate_for_preview(full))
}

/// Truncates rendered output to the preview budget.
fn truncate_for_preview(full: String) -> String {
    if full.chars().count() <= PREVIEW_LIMIT {
        return full;
    }
    let mut truncated: String = full.chars().take(PREVIEW_LIMIT).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Renders a downloadable artifact for the chosen format.
///
/// Output is regenerated fresh on every call. The filename is derived
/// from the conversation name (falling back to `"conversation"`), with
/// path separators replaced so it stays a plain filename.
///
/// # Errors
///
/// Returns an error when no conversation is loaded, when the rendered
/// textual output is blank after trimming, when the conversation is
/// structurally malformed, or when PDF generation fails.
pub fn export_downloadable(
    conversation: Option<&Conversation>,
    options: &RenderOptions,
    format: Format,
) -> Result<Artifact, ExportError> {
    let conversation = conversation.context(NoConversationSnafu)?;
    let filename = format!("{}.{}", file_stem(&conversation.name), format.extension());

    let bytes = if format == Format::Pdf {
        render_pdf(conversation, options)?
    } else {
        let rendered = render_string(conversation, options, format)?;
        ensure!(!rendered.trim().is_empty(), EmptyContentSnafu);
        rendered.into_bytes()
    };

    Ok(Artifact {
        bytes,
        filename,
        mime_type: format.mime_type(),
    })
}

/// Renders the clipboard-ready text for the chosen format.
///
/// Uses the format's textual representation (plain text when PDF is
/// selected) and regenerates on every call.
///
/// # Errors
///
/// Returns an error when no conversation is loaded, when the output is
/// blank after trimming, or when the conversation is structurally
/// malformed.
pub fn copyable_text(
    conversation: Option<&Conversation>,
    options: &RenderOptions,
    format: Format,
) -> Result<String, ExportError> {
    let conversation = conversation.context(NoConversationSnafu)?;
    let rendered = render_string(conversation, options, format)?;
    ensure!(!rendered.trim().is_empty(), EmptyContentSnafu);
    Ok(rendered)
}

/// Derives the filename stem from a conversation name.
fn file_stem(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return FALLBACK_FILE_STEM.to_owned();
    }
    trimmed.replace(['/', '\\'], "-")
}
