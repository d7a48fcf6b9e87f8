use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use watch_logging::watch_debug;

use crate::text::visible_text;

/// Main-content candidates, highest priority first.
pub const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "div#content-core",
    "main",
    "article",
    "div#content",
    "div.portal-column-content",
    "div.section",
];

const NON_CONTENT_SELECTOR: &str = "script, style, noscript";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    /// Canonical text; the only input to fingerprinting.
    pub normalized_text: String,
    /// Serialized HTML of the selected element, archived but never compared.
    pub normalized_markup: String,
    /// Candidate that matched, `None` when the body fallback was used.
    pub matched_selector: Option<&'static str>,
}

pub trait Extractor: Send + Sync {
    fn extract(&self, html: &str) -> ExtractedContent;
}

/// Picks the first candidate selector whose first match has visible text,
/// falling back to `<body>` (or the whole document).
#[derive(Debug)]
pub struct MainContentExtractor {
    candidates: Vec<(&'static str, Selector)>,
}

impl MainContentExtractor {
    pub fn new() -> Self {
        Self::with_selectors(MAIN_CONTENT_SELECTORS)
    }

    /// Selectors that fail to parse are skipped.
    pub fn with_selectors(selectors: &[&'static str]) -> Self {
        let candidates = selectors
            .iter()
            .filter_map(|raw| Selector::parse(raw).ok().map(|sel| (*raw, sel)))
            .collect();
        Self { candidates }
    }
}

impl Default for MainContentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for MainContentExtractor {
    fn extract(&self, html: &str) -> ExtractedContent {
        let mut doc = Html::parse_document(html);
        strip_non_content(&mut doc);

        for (raw, selector) in &self.candidates {
            if let Some(element) = doc.select(selector).next() {
                let text = visible_text(element);
                if !text.is_empty() {
                    return ExtractedContent {
                        normalized_text: text,
                        normalized_markup: element.html(),
                        matched_selector: Some(*raw),
                    };
                }
            }
        }

        watch_debug!("No main content candidate matched; falling back to <body>");
        let fallback = body_element(&doc).unwrap_or_else(|| doc.root_element());
        ExtractedContent {
            normalized_text: visible_text(fallback),
            normalized_markup: fallback.html(),
            matched_selector: None,
        }
    }
}

fn strip_non_content(doc: &mut Html) {
    let Ok(selector) = Selector::parse(NON_CONTENT_SELECTOR) else {
        return;
    };
    let ids: Vec<NodeId> = doc.select(&selector).map(|element| element.id()).collect();
    for id in ids {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn body_element(doc: &Html) -> Option<ElementRef<'_>> {
    let selector = Selector::parse("body").ok()?;
    doc.select(&selector).next()
}
