// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Convert LM Studio conversation exports to readable documents.
//!
//! This crate provides parsing and rendering functionality for transforming
//! LM Studio's JSON conversation format into plain text, Markdown,
//! standalone HTML, or paginated PDF documents.
//!
//! # Overview
//!
//! LM Studio stores chat conversations as JSON files with versioned
//! messages: each message holds alternate edits/regenerations, and
//! assistant responses may be split into generation steps with performance
//! statistics. This crate:
//!
//! 1. Parses the JSON structure into typed Rust representations
//! 2. Resolves the currently selected version of each message
//! 3. Renders the conversation in the chosen format with configurable
//!    inclusion of metadata, system prompts, and generation statistics
//!
//! # Example
//!
//! ```
//! use lms2doc::parser::parse_conversation;
//! use lms2doc::renderer::{Format, RenderOptions};
//! use lms2doc::export;
//!
//! let json = r#"{
//!     "name": "Quick question",
//!     "messages": [
//!         { "versions": [{ "role": "user", "content": "Hello!" }] },
//!         { "versions": [{ "role": "assistant", "content": "Hi there!" }] }
//!     ]
//! }"#;
//!
//! let conversation = parse_conversation(json).unwrap();
//! let options = RenderOptions::default();
//!
//! let artifact =
//!     export::export_downloadable(Some(&conversation), &options, Format::Markdown).unwrap();
//! assert_eq!(artifact.filename, "Quick question.md");
//! ```
//!
//! # Modules
//!
//! - [`parser`]: JSON parsing and type definitions for conversation exports
//! - [`renderer`]: the shared traversal plus text and Markdown rendering
//! - [`html`]: standalone HTML document rendering
//! - [`pdf`]: paginated PDF document rendering
//! - [`export`]: previews, downloadable artifacts, and copyable text

#![deny(missing_docs)]

pub mod export;
pub mod html;
pub mod parser;
pub mod pdf;
pub mod renderer;
