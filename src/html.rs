// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Standalone HTML rendering for parsed conversations.
//!
//! The produced document is fully self-contained: embedded styling, no
//! scripts, and no external dependency beyond an optional webfont link.
//! User and assistant turns get distinct visual treatment, and every piece
//! of user-supplied text (name, model identifier, system prompt, message
//! content) is escaped before it is embedded.

use crate::parser::{Conversation, Role};
use crate::renderer::{
    Metadata, RenderError, RenderOptions, RenderSink, StatsView, display_title, walk,
};
use std::fmt::Write;

/// Escapes text for embedding in HTML element content or attributes.
///
/// Replaces `&`, `<`, `>`, `"`, and `'` with their entity forms.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// The embedded stylesheet for exported documents.
const STYLE: &str = r#"
        * {
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }
        body {
            font-family: 'IBM Plex Sans', -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
            background: #1a1a1a;
            color: #f8fafc;
            line-height: 1.6;
            padding: 40px 20px;
        }
        .container {
            max-width: 900px;
            margin: 0 auto;
            background: #242428;
            border-radius: 16px;
            padding: 40px;
            box-shadow: 0 8px 32px rgba(0, 0, 0, 0.3);
        }
        .header {
            border-bottom: 2px solid #35353b;
            padding-bottom: 24px;
            margin-bottom: 32px;
        }
        h1 {
            font-size: 2rem;
            font-weight: 500;
            color: #ffffff;
            margin-bottom: 16px;
            letter-spacing: -0.02em;
        }
        .metadata {
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
            gap: 12px;
            font-size: 14px;
            color: #cbd5e1;
        }
        .metadata-item {
            display: flex;
            gap: 8px;
        }
        .metadata-label {
            font-weight: 600;
            color: #94a3b8;
        }
        .system-prompt {
            background: #1f1f23;
            border-left: 4px solid #6366f1;
            padding: 20px;
            border-radius: 8px;
            margin-bottom: 32px;
        }
        .system-prompt-title {
            font-weight: 600;
            color: #6366f1;
            margin-bottom: 12px;
            font-size: 14px;
            text-transform: uppercase;
            letter-spacing: 0.05em;
        }
        .message {
            margin-bottom: 32px;
            display: flex;
            flex-direction: column;
            gap: 12px;
        }
        .message-role {
            font-weight: 600;
            font-size: 14px;
            text-transform: uppercase;
            letter-spacing: 0.05em;
        }
        .user-role {
            color: #10b981;
        }
        .assistant-role {
            color: #6366f1;
        }
        .message-content {
            background: #1f1f23;
            padding: 20px;
            border-radius: 12px;
            white-space: pre-wrap;
            word-wrap: break-word;
            font-size: 15px;
            line-height: 1.7;
        }
        .stats {
            background: #28282e;
            padding: 16px;
            border-radius: 8px;
            margin-top: 12px;
            font-size: 13px;
            font-family: 'IBM Plex Mono', monospace;
        }
        .stats-title {
            font-weight: 600;
            color: #94a3b8;
            margin-bottom: 8px;
        }
        .stats-grid {
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(150px, 1fr));
            gap: 8px;
            color: #cbd5e1;
        }
"#;

/// Sink producing the standalone HTML document.
struct HtmlSink {
    out: String,
    header_open: bool,
}

impl HtmlSink {
    fn new() -> Self {
        Self {
            out: String::new(),
            header_open: false,
        }
    }

    /// Closes the header container before the first body element.
    fn close_header(&mut self) {
        if self.header_open {
            self.out.push_str("        </div>\n");
            self.header_open = false;
        }
    }

    fn metadata_item(&mut self, label: &str, value: &str) {
        let _ = write!(
            self.out,
            "                <div class=\"metadata-item\">\n                    \
             <span class=\"metadata-label\">{label}:</span>\n                    \
             <span>{value}</span>\n                </div>\n"
        );
    }

    fn finish(mut self) -> String {
        self.close_header();
        self.out.push_str("    </div>\n</body>\n</html>\n");
        self.out
    }
}

impl RenderSink for HtmlSink {
    fn begin(&mut self, conversation: &Conversation) {
        let title = escape_html(display_title(conversation));
        let _ = write!(
            self.out,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n    <meta charset=\"UTF-8\">\n    \
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n    \
             <title>{title}</title>\n    \
             <link href=\"https://fonts.googleapis.com/css2?family=IBM+Plex+Sans:wght@300;400;500;600&family=IBM+Plex+Mono:wght@400;500&display=swap\" rel=\"stylesheet\">\n    \
             <style>{STYLE}    </style>\n</head>\n<body>\n    \
             <div class=\"container\">\n        <div class=\"header\">\n            \
             <h1>{title}</h1>\n"
        );
        self.header_open = true;
    }

    fn metadata(&mut self, metadata: &Metadata) {
        self.out.push_str("            <div class=\"metadata\">\n");
        if let Some(created) = &metadata.created {
            self.metadata_item("Created", &escape_html(created));
        }
        self.metadata_item("Model", &escape_html(&metadata.model));
        self.metadata_item("Tokens", &escape_html(&metadata.tokens));
        self.out.push_str("            </div>\n");
    }

    fn system_prompt(&mut self, prompt: &str) {
        self.close_header();
        let _ = write!(
            self.out,
            "        <div class=\"system-prompt\">\n            \
             <div class=\"system-prompt-title\">System Prompt</div>\n            \
             <div>{}</div>\n        </div>\n",
            escape_html(prompt)
        );
    }

    fn message(&mut self, role: Role, content: &str, stats: Option<&StatsView>) {
        self.close_header();
        let (label, class) = match role {
            Role::User => ("User", "user-role"),
            _ => ("Assistant", "assistant-role"),
        };
        let _ = write!(
            self.out,
            "        <div class=\"message\">\n            \
             <div class=\"message-role {class}\">{label}</div>\n            \
             <div class=\"message-content\">{}</div>\n",
            escape_html(content)
        );

        if let Some(stats) = stats {
            let _ = write!(
                self.out,
                "            <div class=\"stats\">\n                \
                 <div class=\"stats-title\">Generation Statistics</div>\n                \
                 <div class=\"stats-grid\">\n                    \
                 <div>Tokens/sec: {}</div>\n                    \
                 <div>First token: {}s</div>\n                    \
                 <div>Total time: {}s</div>\n                    \
                 <div>Prompt tokens: {}</div>\n                    \
                 <div>Generated: {}</div>\n                    \
                 <div>Total: {}</div>\n                \
                 </div>\n            </div>\n",
                stats.tokens_per_second,
                stats.time_to_first_token,
                stats.total_time,
                stats.prompt_tokens,
                stats.predicted_tokens,
                stats.total_tokens,
            );
        }

        self.out.push_str("        </div>\n");
    }
}

/// Renders a conversation as a standalone HTML document.
///
/// # Errors
///
/// Returns an error if any message has an empty `versions` list.
pub fn render_html(
    conversation: &Conversation,
    options: &RenderOptions,
) -> Result<String, RenderError> {
    let mut sink = HtmlSink::new();
    walk(conversation, options, &mut sink)?;
    Ok(sink.finish())
}
