// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Paginated PDF rendering for parsed conversations.
//!
//! The conversation traversal drives a [`PageBuilder`]: a fixed-size page
//! with fixed margins and a top-down cursor. Text is wrapped to the page
//! width, and a page break is taken before any line that would not fit in
//! the remaining vertical space. Role labels are bold and tinted per role;
//! metadata and statistics render smaller and gray.
//!
//! The whole document is assembled in memory and only returned on success,
//! so a failed generation never exposes partial output.

use crate::parser::{Conversation, Role};
use crate::renderer::{Metadata, RenderError, RenderOptions, RenderSink, StatsView, display_title, walk};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use snafu::prelude::*;

/// Error type for PDF generation failures.
#[derive(Debug, Snafu)]
pub enum PdfError {
    /// Assembling or encoding the PDF document failed.
    #[snafu(display("failed to assemble PDF document: {source}"), context(false))]
    Document {
        /// The underlying lopdf error.
        source: lopdf::Error,
    },

    /// The conversation itself was structurally malformed.
    #[snafu(display("{source}"), context(false))]
    Conversation {
        /// The underlying render error.
        source: RenderError,
    },
}

// A4 page geometry in points.
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 56.0;
const MAX_TEXT_WIDTH: f32 = PAGE_WIDTH - MARGIN * 2.0;

/// Average glyph width as a fraction of the font size, used to estimate
/// how many characters fit on one wrapped line of Helvetica.
const GLYPH_WIDTH_FACTOR: f32 = 0.5;

/// Line height as a multiple of the font size.
const LINE_HEIGHT_FACTOR: f32 = 1.2;

const BLACK: Rgb = (0.0, 0.0, 0.0);
const GRAY: Rgb = (0.39, 0.39, 0.39);
const LIGHT_GRAY: Rgb = (0.47, 0.47, 0.47);
const DARK_GRAY: Rgb = (0.2, 0.2, 0.2);
const USER_GREEN: Rgb = (0.06, 0.73, 0.51);
const ASSISTANT_INDIGO: Rgb = (0.39, 0.4, 0.95);

type Rgb = (f32, f32, f32);

/// The Helvetica variant to set for a text block.
#[derive(Clone, Copy)]
enum FontStyle {
    Regular,
    Bold,
    Oblique,
}

impl FontStyle {
    /// The font resource name registered for this style.
    const fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
            Self::Oblique => "F3",
        }
    }
}

/// The page-layout primitive: wrapped-text placement with a vertical
/// cursor and automatic page breaks.
struct PageBuilder {
    finished_pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    cursor: f32,
}

impl PageBuilder {
    fn new() -> Self {
        Self {
            finished_pages: Vec::new(),
            ops: Vec::new(),
            cursor: MARGIN,
        }
    }

    /// Starts a new page and resets the cursor to the top margin.
    fn break_page(&mut self) {
        self.finished_pages.push(std::mem::take(&mut self.ops));
        self.cursor = MARGIN;
    }

    /// Breaks the page unless `needed` points of vertical space remain.
    fn ensure_room(&mut self, needed: f32) {
        if self.cursor + needed > PAGE_HEIGHT - MARGIN {
            self.break_page();
        }
    }

    /// Moves the cursor down without emitting text.
    fn advance(&mut self, amount: f32) {
        self.cursor += amount;
    }

    /// Writes text wrapped to the page width, breaking pages as needed.
    fn add_wrapped(&mut self, text: &str, size: f32, style: FontStyle, color: Rgb) {
        let line_height = size * LINE_HEIGHT_FACTOR;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let max_chars = (MAX_TEXT_WIDTH / (size * GLYPH_WIDTH_FACTOR)).max(1.0) as usize;

        for line in wrap_lines(text, max_chars) {
            self.ensure_room(line_height);
            self.cursor += line_height;
            let y = PAGE_HEIGHT - self.cursor;
            self.ops.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![style.resource().into(), size.into()]),
                Operation::new("rg", vec![color.0.into(), color.1.into(), color.2.into()]),
                Operation::new("Td", vec![MARGIN.into(), y.into()]),
                Operation::new("Tj", vec![Object::string_literal(encode_latin1(&line))]),
                Operation::new("ET", vec![]),
            ]);
        }
    }

    /// Assembles the accumulated pages into a serialized PDF.
    fn finish(mut self) -> Result<Vec<u8>, PdfError> {
        self.finished_pages.push(std::mem::take(&mut self.ops));

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let bold = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        });
        let oblique = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Oblique",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => regular,
                "F2" => bold,
                "F3" => oblique,
            },
        });

        let mut kids = Vec::with_capacity(self.finished_pages.len());
        for operations in self.finished_pages {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).map_err(lopdf::Error::from)?;
        Ok(bytes)
    }
}

/// Splits text into lines no longer than `max_chars`, respecting existing
/// newlines and breaking on word boundaries where possible.
fn wrap_lines(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for source_line in text.lines() {
        if source_line.chars().count() <= max_chars {
            lines.push(source_line.to_owned());
            continue;
        }

        let mut current = String::new();
        for word in source_line.split_whitespace() {
            let word_len = word.chars().count();
            let current_len = current.chars().count();

            if current.is_empty() {
                if word_len <= max_chars {
                    current.push_str(word);
                } else {
                    // Hard-split words longer than a full line.
                    let mut chars = word.chars().peekable();
                    while chars.peek().is_some() {
                        let chunk: String = chars.by_ref().take(max_chars).collect();
                        if chars.peek().is_some() {
                            lines.push(chunk);
                        } else {
                            current = chunk;
                        }
                    }
                }
            } else if current_len + 1 + word_len <= max_chars {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current));
                if word_len <= max_chars {
                    current.push_str(word);
                } else {
                    let mut chars = word.chars().peekable();
                    while chars.peek().is_some() {
                        let chunk: String = chars.by_ref().take(max_chars).collect();
                        if chars.peek().is_some() {
                            lines.push(chunk);
                        } else {
                            current = chunk;
                        }
                    }
                }
            }
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Encodes text for the builtin Type1 fonts, replacing characters outside
/// Latin-1 with `?`.
fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Sink producing the paginated document.
struct PdfSink {
    page: PageBuilder,
}

impl RenderSink for PdfSink {
    fn begin(&mut self, conversation: &Conversation) {
        self.page
            .add_wrapped(display_title(conversation), 18.0, FontStyle::Bold, BLACK);
        self.page.advance(5.0);
    }

    fn metadata(&mut self, metadata: &Metadata) {
        if let Some(created) = &metadata.created {
            self.page
                .add_wrapped(&format!("Created: {created}"), 10.0, FontStyle::Regular, GRAY);
        }
        self.page
            .add_wrapped(&format!("Model: {}", metadata.model), 10.0, FontStyle::Regular, GRAY);
        self.page.add_wrapped(
            &format!("Token Count: {}", metadata.tokens),
            10.0,
            FontStyle::Regular,
            GRAY,
        );
        self.page.advance(10.0);
    }

    fn system_prompt(&mut self, prompt: &str) {
        self.page.ensure_room(20.0);
        self.page
            .add_wrapped("SYSTEM PROMPT:", 11.0, FontStyle::Bold, ASSISTANT_INDIGO);
        self.page.advance(2.0);
        self.page.add_wrapped(prompt, 10.0, FontStyle::Regular, DARK_GRAY);
        self.page.advance(10.0);
    }

    fn message(&mut self, role: Role, content: &str, stats: Option<&StatsView>) {
        self.page.ensure_room(30.0);
        let (label, color) = match role {
            Role::User => ("USER:", USER_GREEN),
            _ => ("ASSISTANT:", ASSISTANT_INDIGO),
        };
        self.page.add_wrapped(label, 11.0, FontStyle::Bold, color);
        self.page.advance(2.0);
        self.page.add_wrapped(content, 10.0, FontStyle::Regular, BLACK);

        if let Some(stats) = stats {
            self.page.advance(3.0);
            self.page
                .add_wrapped("Generation Stats:", 9.0, FontStyle::Oblique, GRAY);
            let line = format!(
                "Tokens/sec: {} | First token: {}s | Total time: {}s | Prompt tokens: {} | Generated: {} | Total: {}",
                stats.tokens_per_second,
                stats.time_to_first_token,
                stats.total_time,
                stats.prompt_tokens,
                stats.predicted_tokens,
                stats.total_tokens,
            );
            self.page.add_wrapped(&line, 8.0, FontStyle::Regular, LIGHT_GRAY);
        }

        self.page.advance(8.0);
    }
}

/// Renders a conversation as a paginated PDF document.
///
/// # Errors
///
/// Returns an error if any message has an empty `versions` list or if
/// document assembly fails. No partial output is produced on failure.
pub fn render_pdf(
    conversation: &Conversation,
    options: &RenderOptions,
) -> Result<Vec<u8>, PdfError> {
    let mut sink = PdfSink {
        page: PageBuilder::new(),
    };
    walk(conversation, options, &mut sink)?;
    sink.page.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Message, Version, VersionContent};

    fn make_conversation(messages: Vec<Message>) -> Conversation {
        Conversation {
            name: "PDF Chat".into(),
            created_at: Some(1_733_356_800_000),
            last_used_model: None,
            token_count: Some(42),
            system_prompt: None,
            per_chat_prediction_config: None,
            messages,
        }
    }

    fn make_message(role: Role, content: &str) -> Message {
        Message {
            versions: vec![Version {
                role,
                kind: None,
                content: Some(VersionContent::Text(content.into())),
                steps: vec![],
            }],
            currently_selected: None,
        }
    }

    #[test]
    fn produces_pdf_bytes() {
        let conversation = make_conversation(vec![make_message(Role::User, "hello")]);
        let bytes = render_pdf(&conversation, &RenderOptions::default()).unwrap();

        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn produced_document_is_loadable() {
        let conversation = make_conversation(vec![
            make_message(Role::User, "hello"),
            make_message(Role::Assistant, "world"),
        ]);
        let bytes = render_pdf(&conversation, &RenderOptions::default()).unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn long_conversations_break_across_pages() {
        let long_text = "This sentence is repeated to fill the page with text. ".repeat(40);
        let messages = (0..20)
            .map(|_| make_message(Role::User, &long_text))
            .collect();
        let conversation = make_conversation(messages);
        let bytes = render_pdf(&conversation, &RenderOptions::default()).unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() > 1);
    }

    #[test]
    fn generation_is_deterministic() {
        let conversation = make_conversation(vec![make_message(Role::User, "same input")]);
        let options = RenderOptions::default();

        let first = render_pdf(&conversation, &options).unwrap();
        let second = render_pdf(&conversation, &options).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_versions_is_an_error() {
        let conversation = make_conversation(vec![Message {
            versions: vec![],
            currently_selected: None,
        }]);

        assert!(render_pdf(&conversation, &RenderOptions::default()).is_err());
    }

    // Tests for the wrap_lines helper
    #[test]
    fn short_lines_pass_through() {
        assert_eq!(wrap_lines("hello world", 80), vec!["hello world"]);
    }

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(
            wrap_lines("one two three four", 9),
            vec!["one two", "three", "four"]
        );
    }

    #[test]
    fn preserves_existing_newlines() {
        assert_eq!(wrap_lines("a\nb", 80), vec!["a", "b"]);
    }

    #[test]
    fn hard_splits_overlong_words() {
        let lines = wrap_lines("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn empty_text_yields_one_empty_line() {
        assert_eq!(wrap_lines("", 80), vec![""]);
    }

    // Tests for the encode_latin1 helper
    #[test]
    fn latin1_passes_ascii() {
        assert_eq!(encode_latin1("abc"), b"abc");
    }

    #[test]
    fn latin1_replaces_wide_characters() {
        assert_eq!(encode_latin1("a\u{1F600}b"), b"a?b");
    }
}
