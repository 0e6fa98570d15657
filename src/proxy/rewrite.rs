//! Structure-aware HTML text substitution.
//!
//! # Responsibilities
//! - Decide whether a body is an HTML page (first non-whitespace content
//!   starts with `<html`, case-insensitive)
//! - Parse tolerantly, swallowing parse errors like a browser would
//! - Apply the substitution rules to leaf text nodes only, never to tag
//!   names, attributes, or element structure
//! - Serialize back preserving tag nesting and attributes
//!
//! # Design Decisions
//! - Rules are an injectable (pattern, replacement) list, not hard-coded;
//!   the default decorates runs of six or more word characters with ™
//! - `<script>`/`<style>` raw text parses as a leaf text node and is
//!   therefore rewritten too; text is text, wherever the parser finds it

use regex::Regex;
use scraper::node::Node;
use scraper::Html;

use crate::config::schema::RewriteConfig;

/// Compiled substitution rules, applied in order to each leaf text node.
#[derive(Debug, Clone)]
pub struct RewriteRules {
    rules: Vec<(Regex, String)>,
}

impl RewriteRules {
    /// Compile the configured pattern/replacement pairs.
    pub fn from_config(config: &RewriteConfig) -> Result<Self, regex::Error> {
        let mut rules = Vec::with_capacity(config.rules.len());
        for rule in &config.rules {
            rules.push((Regex::new(&rule.pattern)?, rule.replacement.clone()));
        }
        Ok(Self { rules })
    }

    /// Apply every rule to the given text.
    pub fn apply(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (pattern, replacement) in &self.rules {
            result = pattern.replace_all(&result, replacement.as_str()).into_owned();
        }
        result
    }
}

impl Default for RewriteRules {
    fn default() -> Self {
        Self::from_config(&RewriteConfig::default()).expect("default rules compile")
    }
}

/// Rewrites leaf text nodes of HTML documents; anything else passes through
/// byte-identical.
#[derive(Debug, Clone, Default)]
pub struct HtmlTextTransformer {
    rules: RewriteRules,
}

impl HtmlTextTransformer {
    pub fn new(rules: RewriteRules) -> Self {
        Self { rules }
    }

    /// Transform the body if it is an HTML page, otherwise return it
    /// unchanged.
    pub fn transform(&self, body: Vec<u8>) -> Vec<u8> {
        if !is_html_page(&body) {
            return body;
        }
        let text = String::from_utf8_lossy(&body);
        self.transform_document(&text).into_bytes()
    }

    fn transform_document(&self, html: &str) -> String {
        let mut document = Html::parse_document(html);

        // Leaf nodes only: nodes with children are recursed into by the
        // descendants traversal, their own text is never touched directly.
        let leaf_text_ids: Vec<_> = document
            .tree
            .root()
            .descendants()
            .filter(|node| node.children().next().is_none() && node.value().is_text())
            .map(|node| node.id())
            .collect();

        for id in leaf_text_ids {
            if let Some(mut node) = document.tree.get_mut(id) {
                if let Node::Text(text) = node.value() {
                    let rewritten = self.rules.apply(&text.text);
                    if rewritten != *text.text {
                        text.text = rewritten.as_str().into();
                    }
                }
            }
        }

        document.html()
    }
}

/// True if the first non-whitespace content begins with `<html`,
/// case-insensitively. CSS, JS, JSON, and partial fragments stay untouched.
pub fn is_html_page(body: &[u8]) -> bool {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim_start().as_bytes();
    trimmed.len() >= 5 && trimmed[..5].eq_ignore_ascii_case(b"<html")
}
