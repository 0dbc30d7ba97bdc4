//! Page text extraction for enrichment prompts.

use scraper::node::Node;
use scraper::{Html, Selector};

/// Elements whose text is never shown to a reader.
const HIDDEN: &[&str] = &["script", "style", "noscript", "template"];

/// What the prompt gets from a company website.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSummary {
    pub description: Option<String>,
    /// Visible body text, whitespace collapsed, truncated.
    pub text: String,
}

impl PageSummary {
    pub fn from_html(html: &str, max_chars: usize) -> Self {
        let doc = Html::parse_document(html);

        let description = Selector::parse(r#"meta[name="description"]"#)
            .ok()
            .and_then(|sel| {
                doc.select(&sel)
                    .next()
                    .and_then(|m| m.value().attr("content"))
                    .map(|s| s.trim().to_string())
            })
            .filter(|s| !s.is_empty());

        let mut raw = String::new();
        if let Ok(body_sel) = Selector::parse("body") {
            for body in doc.select(&body_sel) {
                for node in body.descendants() {
                    let Node::Text(text) = node.value() else {
                        continue;
                    };
                    let hidden = node.ancestors().any(|a| {
                        a.value()
                            .as_element()
                            .map(|el| HIDDEN.contains(&el.name()))
                            .unwrap_or(false)
                    });
                    if !hidden {
                        raw.push_str(text);
                        raw.push(' ');
                    }
                }
            }
        }

        let text = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .take(max_chars)
            .collect();

        Self { description, text }
    }
}
