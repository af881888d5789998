//! Content normalization
//!
//! Turns rendered markup into comparable text: non-content elements are
//! removed together with their subtree, remaining text nodes are joined and
//! every whitespace run collapses to a single space.

use scraper::{ElementRef, Html};
use std::collections::HashSet;

use crate::config::NormalizerConfig;

/// Converts rendered HTML into plain text for similarity comparison
#[derive(Debug, Clone)]
pub struct ContentNormalizer {
    strip_tags: HashSet<String>,
}

impl ContentNormalizer {
    pub fn new(config: &NormalizerConfig) -> Self {
        Self {
            strip_tags: config
                .strip_tags
                .iter()
                .map(|t| t.trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Normalize a rendered page.
    pub fn normalize(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        let mut text = String::with_capacity(html.len() / 4);
        self.collect_text(document.root_element(), &mut text);
        Self::collapse_whitespace(&text)
    }

    fn collect_text(&self, element: ElementRef<'_>, out: &mut String) {
        if self.strip_tags.contains(element.value().name()) {
            return;
        }

        for child in element.children() {
            if let Some(child_element) = ElementRef::wrap(child) {
                self.collect_text(child_element, out);
            } else if let Some(text) = child.value().as_text() {
                out.push_str(text);
                // Adjacent blocks must not glue their words together
                out.push(' ');
            }
        }
    }

    /// Collapse every whitespace run to one space and trim both ends.
    pub fn collapse_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl Default for ContentNormalizer {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default())
    }
}
