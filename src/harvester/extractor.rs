//! Article extraction
//!
//! Turns an article page into an [`ArticleCandidate`]. The body is read from
//! the first primary content container with noise elements skipped; when no
//! such container yields text, long paragraphs from a wider column are used
//! instead. Bodies below the minimum length are rejected as boilerplate.

use crate::config::{parse_selector, ExtractConfig};
use crate::storage::ArticleCandidate;
use crate::ConfigError;
use scraper::{ElementRef, Html, Node, Selector};
use std::fmt;

/// Result of extracting one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Accepted(ArticleCandidate),
    Rejected(RejectReason),
}

/// Why a page was not accepted as an article
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Neither the primary nor the fallback path produced text
    EmptyBody,

    /// The body exists but is shorter than the minimum
    TooShort { chars: usize, min: usize },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyBody => write!(f, "no article body found"),
            Self::TooShort { chars, min } => {
                write!(f, "body has {} characters, need at least {}", chars, min)
            }
        }
    }
}

/// Compiled extraction rules
pub struct Extractor {
    title: Selector,
    placeholder_title: String,
    content: Vec<Selector>,
    noise: Vec<Selector>,
    fallback: Selector,
    paragraph: Selector,
    published: Option<Selector>,
    min_body_chars: usize,
    min_paragraph_chars: usize,
}

impl Extractor {
    /// Compiles every selector in the configuration
    pub fn new(config: &ExtractConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            title: parse_selector(&config.title_selector)?,
            placeholder_title: config.placeholder_title.clone(),
            content: config
                .content_selectors
                .iter()
                .map(|s| parse_selector(s))
                .collect::<Result<_, _>>()?,
            noise: config
                .noise_selectors
                .iter()
                .map(|s| parse_selector(s))
                .collect::<Result<_, _>>()?,
            fallback: parse_selector(&config.fallback_selector)?,
            paragraph: parse_selector(&config.paragraph_selector)?,
            published: config
                .published_selector
                .as_deref()
                .map(parse_selector)
                .transpose()?,
            min_body_chars: config.min_body_chars,
            min_paragraph_chars: config.min_paragraph_chars,
        })
    }

    /// Extracts an article from page HTML
    ///
    /// # Arguments
    ///
    /// * `html` - The page content
    /// * `url` - The URL the page was requested from; stored as-is
    pub fn extract(&self, html: &str, url: &str) -> Extraction {
        let document = Html::parse_document(html);

        let body = self
            .primary_body(&document)
            .filter(|body| !body.is_empty())
            .or_else(|| self.fallback_body(&document))
            .unwrap_or_default();

        if body.is_empty() {
            return Extraction::Rejected(RejectReason::EmptyBody);
        }

        let chars = body.chars().count();
        if chars < self.min_body_chars {
            return Extraction::Rejected(RejectReason::TooShort {
                chars,
                min: self.min_body_chars,
            });
        }

        let title = first_text(&document, &self.title)
            .unwrap_or_else(|| self.placeholder_title.clone());

        let published_at = self
            .published
            .as_ref()
            .and_then(|selector| first_text(&document, selector));

        Extraction::Accepted(ArticleCandidate {
            title,
            description: body,
            url: url.to_string(),
            published_at,
        })
    }

    /// Text of the first primary container, noise removed, one line per text node
    fn primary_body(&self, document: &Html) -> Option<String> {
        let container = self
            .content
            .iter()
            .find_map(|selector| document.select(selector).next())?;

        let noise: Vec<ElementRef<'_>> = self
            .noise
            .iter()
            .flat_map(|selector| container.select(selector))
            .collect();

        let mut lines = Vec::new();
        collect_visible_text(container, &noise, &mut lines);
        Some(lines.join("\n"))
    }

    /// Long paragraphs of the fallback column
    fn fallback_body(&self, document: &Html) -> Option<String> {
        let column = document.select(&self.fallback).next()?;

        let paragraphs: Vec<String> = column
            .select(&self.paragraph)
            .map(|p| p.text().collect::<String>().trim().to_string())
            .filter(|text| text.chars().count() > self.min_paragraph_chars)
            .collect();

        Some(paragraphs.join("\n"))
    }
}

fn collect_visible_text<'a>(
    element: ElementRef<'a>,
    noise: &[ElementRef<'a>],
    lines: &mut Vec<String>,
) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if !noise.contains(&child_element) {
                collect_visible_text(child_element, noise, lines);
            }
        } else if let Node::Text(text) = child.value() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
    }
}

/// Whitespace-collapsed text of the first match, if non-empty
fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|element| element.text().collect::<Vec<_>>().join(" "))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "http://www.example.com/news/42/";

    fn extractor() -> Extractor {
        Extractor::new(&ExtractConfig::default()).unwrap()
    }

    fn accepted(extraction: Extraction) -> ArticleCandidate {
        match extraction {
            Extraction::Accepted(candidate) => candidate,
            Extraction::Rejected(reason) => panic!("unexpected rejection: {}", reason),
        }
    }

    #[test]
    fn test_primary_container() {
        let html = r#"<html><body>
            <h1>  Bridge reopens after repairs </h1>
            <div class="block1__wrap__textb">12.03.2024 10:15</div>
            <div class="detail_text">
                <p>The bridge over the river reopened on Monday morning.</p>
                <p>Traffic is expected to return to normal by Friday.</p>
            </div>
        </body></html>"#;

        let candidate = accepted(extractor().extract(html, URL));
        assert_eq!(candidate.title, "Bridge reopens after repairs");
        assert_eq!(
            candidate.description,
            "The bridge over the river reopened on Monday morning.\nTraffic is expected to return to normal by Friday."
        );
        assert_eq!(candidate.url, URL);
        assert_eq!(candidate.published_at.as_deref(), Some("12.03.2024 10:15"));
    }

    #[test]
    fn test_noise_is_stripped() {
        let html = r#"<html><body><h1>Title</h1>
            <div class="detail_text">
                <script>var tracking = "should not appear";</script>
                <style>.x { color: red }</style>
                <div class="banner">Buy now, limited offer</div>
                <div class="news-date-time">01.01.2024</div>
                <noindex>hidden from search engines</noindex>
                <iframe src="/ad"></iframe>
                Residents were advised to boil tap water until further notice.
            </div>
        </body></html>"#;

        let candidate = accepted(extractor().extract(html, URL));
        assert_eq!(
            candidate.description,
            "Residents were advised to boil tap water until further notice."
        );
    }

    #[test]
    fn test_second_container_selector() {
        let html = r#"<html><body><h1>Title</h1>
            <div class="news-detail">The festival will run for three days in the central park.</div>
        </body></html>"#;

        let candidate = accepted(extractor().extract(html, URL));
        assert_eq!(
            candidate.description,
            "The festival will run for three days in the central park."
        );
    }

    #[test]
    fn test_container_priority_order() {
        let html = r#"<html><body>
            <div class="news-detail">Secondary container text that is long enough here.</div>
            <div class="detail_text">Primary container text that is also long enough here.</div>
        </body></html>"#;

        let candidate = accepted(extractor().extract(html, URL));
        assert_eq!(
            candidate.description,
            "Primary container text that is also long enough here."
        );
    }

    #[test]
    fn test_fallback_paragraphs() {
        let html = r#"<html><body><h1>Title</h1>
            <div class="page_center-column">
                <p>Short caption</p>
                <p>The school year will start a week later than usual this autumn.</p>
                <p>Parents can find the updated schedule on the city portal.</p>
            </div>
        </body></html>"#;

        let candidate = accepted(extractor().extract(html, URL));
        assert_eq!(
            candidate.description,
            "The school year will start a week later than usual this autumn.\nParents can find the updated schedule on the city portal."
        );
    }

    #[test]
    fn test_empty_primary_falls_back() {
        let html = r#"<html><body>
            <div class="page_center-column">
                <div class="detail_text"><script>only()</script></div>
                <p>Fallback paragraph text long enough to count as body content.</p>
            </div>
        </body></html>"#;

        let candidate = accepted(extractor().extract(html, URL));
        assert_eq!(
            candidate.description,
            "Fallback paragraph text long enough to count as body content."
        );
    }

    #[test]
    fn test_missing_title_uses_placeholder() {
        let html = r#"<html><body>
            <div class="detail_text">A body without any heading but with enough text.</div>
        </body></html>"#;

        let candidate = accepted(extractor().extract(html, URL));
        assert_eq!(candidate.title, "Untitled");
        assert_eq!(candidate.published_at, None);
    }

    #[test]
    fn test_title_pieces_are_space_joined() {
        let html = r#"<html><body>
            <h1>Flood<span>warning</span>
                issued</h1>
            <div class="detail_text">River levels are rising across the northern districts.</div>
        </body></html>"#;

        let candidate = accepted(extractor().extract(html, URL));
        assert_eq!(candidate.title, "Flood warning issued");
    }

    #[test]
    fn test_rejects_page_without_body() {
        let html = r#"<html><body><h1>Gallery</h1><img src="/a.jpg"></body></html>"#;
        assert_eq!(
            extractor().extract(html, URL),
            Extraction::Rejected(RejectReason::EmptyBody)
        );
    }

    #[test]
    fn test_rejects_short_body() {
        let html = r#"<html><body><h1>Title</h1>
            <div class="detail_text">Too short to count.</div>
        </body></html>"#;

        assert_eq!(
            extractor().extract(html, URL),
            Extraction::Rejected(RejectReason::TooShort { chars: 19, min: 30 })
        );
    }

    #[test]
    fn test_body_length_counts_characters_not_bytes() {
        let body = "Мост открыли после ремонта утр";
        assert_eq!(body.chars().count(), 30);
        assert!(body.len() > 30);

        let html = format!(
            r#"<html><body><div class="detail_text">{}</div></body></html>"#,
            body
        );
        let candidate = accepted(extractor().extract(&html, URL));
        assert_eq!(candidate.description, body);

        let html = format!(
            r#"<html><body><div class="detail_text">{}</div></body></html>"#,
            &body[..body.len() - "р".len()]
        );
        assert_eq!(
            extractor().extract(&html, URL),
            Extraction::Rejected(RejectReason::TooShort { chars: 29, min: 30 })
        );
    }

    #[test]
    fn test_fallback_without_long_paragraphs_is_rejected() {
        let html = r#"<html><body><div class="page_center-column">
            <p>Share</p><p>Comments (0)</p>
        </div></body></html>"#;

        assert_eq!(
            extractor().extract(html, URL),
            Extraction::Rejected(RejectReason::EmptyBody)
        );
    }

    #[test]
    fn test_custom_rules() {
        let config = ExtractConfig {
            title_selector: "header .headline".to_string(),
            content_selectors: vec!["article".to_string()],
            noise_selectors: vec!["aside".to_string()],
            published_selector: Some("time".to_string()),
            ..ExtractConfig::default()
        };
        let extractor = Extractor::new(&config).unwrap();

        let html = r#"<html><body>
            <header><span class="headline">Custom headline</span></header>
            <article><time>yesterday</time><aside>Related links</aside>Body text from a differently structured site.</article>
        </body></html>"#;

        let candidate = accepted(extractor.extract(html, URL));
        assert_eq!(candidate.title, "Custom headline");
        assert_eq!(
            candidate.description,
            "yesterday\nBody text from a differently structured site."
        );
        assert_eq!(candidate.published_at.as_deref(), Some("yesterday"));
    }

    #[test]
    fn test_invalid_selector_is_config_error() {
        let config = ExtractConfig {
            title_selector: "h1[".to_string(),
            ..ExtractConfig::default()
        };
        assert!(matches!(
            Extractor::new(&config),
            Err(ConfigError::InvalidSelector(_))
        ));
    }
}
