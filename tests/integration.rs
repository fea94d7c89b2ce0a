// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Integration tests for lms2doc parsing, rendering, and export.

use lms2doc::export;
use lms2doc::parser;
use lms2doc::renderer::{self, Format, RenderOptions};
use std::fs;
use std::path::Path;

/// A realistic conversation export covering versioned messages, multi-step
/// assistant responses, generation stats, and a per-chat system prompt.
const SAMPLE: &str = r#"{
    "name": "Rust lifetimes",
    "createdAt": 1733356800000,
    "tokenCount": 512,
    "lastUsedModel": {
        "identifier": "qwen2.5-7b-instruct",
        "displayName": "Qwen 2.5 7B Instruct"
    },
    "perChatPredictionConfig": {
        "fields": [
            { "key": "llm.prediction.systemPrompt", "value": "You are a helpful assistant." }
        ]
    },
    "messages": [
        {
            "versions": [
                { "role": "user", "content": "What is a lifetime?" }
            ]
        },
        {
            "currentlySelected": 1,
            "versions": [
                {
                    "role": "assistant",
                    "type": "singleStep",
                    "content": "An earlier draft."
                },
                {
                    "role": "assistant",
                    "type": "multiStep",
                    "steps": [
                        {
                            "type": "contentBlock",
                            "content": [
                                { "type": "text", "text": "A lifetime names how long a reference is valid." }
                            ],
                            "genInfo": {
                                "stats": {
                                    "tokensPerSecond": 42.5,
                                    "timeToFirstTokenSec": 0.312,
                                    "totalTimeSec": 2.75,
                                    "promptTokensCount": 24,
                                    "predictedTokensCount": 117,
                                    "totalTokensCount": 141
                                }
                            }
                        }
                    ]
                }
            ]
        }
    ]
}"#;

/// Parses all JSON files in the chats directory and verifies they convert.
#[test]
fn parses_all_sample_chats() {
    let chats_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("chats");

    if !chats_dir.exists() {
        // Skip if no sample chats directory
        return;
    }

    for entry in fs::read_dir(&chats_dir).expect("Failed to read chats directory") {
        let entry = entry.expect("Failed to read directory entry");
        let path = entry.path();

        if path.extension().is_some_and(|ext| ext == "json") {
            let json = fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));

            let conversation = parser::parse_conversation(&json)
                .unwrap_or_else(|e| panic!("Failed to parse {}: {e}", path.display()));

            let opts = RenderOptions::default();
            for format in [Format::Text, Format::Markdown, Format::Html, Format::Pdf] {
                export::export_downloadable(Some(&conversation), &opts, format)
                    .unwrap_or_else(|e| panic!("Failed to convert {}: {e}", path.display()));
            }
        }
    }
}

/// The selected version wins in every format, and the unselected draft
/// never leaks into the output.
#[test]
fn selected_version_rendered_in_all_text_formats() {
    let conversation = parser::parse_conversation(SAMPLE).unwrap();
    let opts = RenderOptions::default();

    for format in [Format::Text, Format::Markdown, Format::Html] {
        let output = export::copyable_text(Some(&conversation), &opts, format).unwrap();
        assert!(
            output.contains("A lifetime names how long a reference is valid."),
            "selected version missing from {format:?} output"
        );
        assert!(
            !output.contains("An earlier draft."),
            "unselected version leaked into {format:?} output"
        );
    }
}

/// All display toggles are honored across formats.
#[test]
fn hidden_sections_are_absent() {
    let conversation = parser::parse_conversation(SAMPLE).unwrap();
    let opts = RenderOptions {
        include_metadata: false,
        include_timestamps: false,
        include_system_prompts: false,
        include_stats: false,
    };

    for format in [Format::Text, Format::Markdown, Format::Html] {
        let output = export::copyable_text(Some(&conversation), &opts, format).unwrap();
        assert!(!output.contains("qwen2.5-7b-instruct"));
        assert!(!output.contains("You are a helpful assistant."));
        assert!(!output.contains("42.50"));
        // Message content survives regardless of toggles
        assert!(output.contains("What is a lifetime?"));
    }
}

/// Stats formatting: rates at two decimals, durations at three with a
/// trailing unit, counters verbatim.
#[test]
fn stats_formatted_with_fixed_precision() {
    let conversation = parser::parse_conversation(SAMPLE).unwrap();
    let output = renderer::render_text(&conversation, &RenderOptions::default()).unwrap();

    assert!(output.contains("42.50"));
    assert!(output.contains("0.312s"));
    assert!(output.contains("2.750s"));
    assert!(output.contains("117"));
}

/// Timestamps use the fixed UTC layout.
#[test]
fn created_timestamp_formatted_as_utc() {
    let conversation = parser::parse_conversation(SAMPLE).unwrap();
    let output = renderer::render_text(&conversation, &RenderOptions::default()).unwrap();

    assert!(output.contains("2024-12-05 00:00:00 UTC"));
}

/// A record missing the required fields is rejected up front.
#[test]
fn invalid_record_fails_to_parse() {
    assert!(parser::parse_conversation(r#"{ "name": "No messages" }"#).is_err());
    assert!(parser::parse_conversation(r#"{ "messages": [] }"#).is_err());
    assert!(parser::parse_conversation("not json").is_err());
}

/// A message with an empty versions array fails conversion, not parsing.
#[test]
fn empty_versions_fails_conversion() {
    let json = r#"{
        "name": "Broken",
        "messages": [ { "versions": [] } ]
    }"#;
    let conversation = parser::parse_conversation(json).unwrap();
    let error = export::copyable_text(
        Some(&conversation),
        &RenderOptions::default(),
        Format::Text,
    )
    .unwrap_err();

    assert!(error.to_string().contains("no versions"));
}

/// Previews are truncated to the fixed character budget with a marker.
#[test]
fn preview_truncates_long_conversations() {
    let long_content = "word ".repeat(1000);
    let json = format!(
        r#"{{
            "name": "Long chat",
            "messages": [ {{ "versions": [ {{ "role": "user", "content": "{long_content}" }} ] }} ]
        }}"#
    );
    let conversation = parser::parse_conversation(&json).unwrap();
    let preview = export::preview(
        Some(&conversation),
        &RenderOptions::default(),
        Format::Text,
    )
    .unwrap();

    assert!(preview.ends_with(export::TRUNCATION_MARKER));
    assert_eq!(
        preview.chars().count(),
        export::PREVIEW_LIMIT + export::TRUNCATION_MARKER.chars().count()
    );
}

/// The PDF format has no preview; a fixed advisory appears instead.
#[test]
fn pdf_preview_is_advisory() {
    let conversation = parser::parse_conversation(SAMPLE).unwrap();
    let preview = export::preview(
        Some(&conversation),
        &RenderOptions::default(),
        Format::Pdf,
    )
    .unwrap();

    assert_eq!(preview, export::PDF_PREVIEW_NOTE);
}

/// PDF export yields a loadable document; the other formats stay textual.
#[test]
fn pdf_export_is_loadable() {
    let conversation = parser::parse_conversation(SAMPLE).unwrap();
    let artifact = export::export_downloadable(
        Some(&conversation),
        &RenderOptions::default(),
        Format::Pdf,
    )
    .unwrap();

    assert_eq!(artifact.filename, "Rust lifetimes.pdf");
    assert_eq!(artifact.mime_type, "application/pdf");
    assert!(artifact.bytes.starts_with(b"%PDF"));

    let doc = lopdf::Document::load_mem(&artifact.bytes).expect("PDF should load");
    assert!(!doc.get_pages().is_empty());
}

/// HTML output is a complete standalone document with escaped content.
#[test]
fn html_export_is_standalone_and_escaped() {
    let json = r#"{
        "name": "Tags & <brackets>",
        "messages": [
            { "versions": [ { "role": "user", "content": "Is 1 < 2?" } ] }
        ]
    }"#;
    let conversation = parser::parse_conversation(json).unwrap();
    let artifact = export::export_downloadable(
        Some(&conversation),
        &RenderOptions::default(),
        Format::Html,
    )
    .unwrap();

    let html = String::from_utf8(artifact.bytes).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Tags &amp; &lt;brackets&gt;"));
    assert!(html.contains("Is 1 &lt; 2?"));
    assert!(!html.contains("<brackets>"));
}

/// Artifacts write cleanly to disk under the conversation-derived name.
#[test]
fn artifact_written_to_disk() {
    let conversation = parser::parse_conversation(SAMPLE).unwrap();
    let artifact = export::export_downloadable(
        Some(&conversation),
        &RenderOptions::default(),
        Format::Markdown,
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(&artifact.filename);
    fs::write(&path, &artifact.bytes).unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("# Rust lifetimes"));
}
