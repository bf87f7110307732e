//! Listing paginator
//!
//! Maps a page index to its listing URL and pulls candidate article links out
//! of a listing page.

use crate::config::{parse_selector, SiteConfig};
use crate::ConfigError;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// A candidate article link found on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    /// Absolute article URL
    pub url: String,

    /// Listing page the link was found on
    pub page: u64,
}

pub struct ListingPaginator {
    root: Url,
    /// Site root without its trailing slash, prefixed to root-relative hrefs
    origin: String,
    listing: Url,
    page_param: String,
    links: Selector,
}

impl ListingPaginator {
    pub fn new(config: &SiteConfig) -> Result<Self, ConfigError> {
        let root = Url::parse(&config.root).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid site root '{}': {}", config.root, e))
        })?;
        let listing = root.join(&config.listing_path).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Invalid listing path '{}': {}",
                config.listing_path, e
            ))
        })?;

        let origin = config.root.trim().trim_end_matches('/').to_string();

        Ok(Self {
            root,
            origin,
            listing,
            page_param: config.page_param.clone(),
            links: parse_selector(&config.link_selector)?,
        })
    }

    /// URL of the listing page at `index`
    ///
    /// Page 1 is the bare listing URL; indexes below 1 are treated as page 1.
    pub fn page_target(&self, index: u64) -> Url {
        let mut url = self.listing.clone();
        if index > 1 {
            url.query_pairs_mut()
                .append_pair(&self.page_param, &index.to_string());
        }
        url
    }

    /// Extracts candidate article links from listing page HTML
    ///
    /// # Link Rules
    ///
    /// - Only anchors matching the link selector are considered
    /// - Absolute hrefs are kept exactly as written
    /// - Root-relative hrefs (`/...`) are appended to the site root as written
    /// - Other relative hrefs are resolved against the site root
    /// - `javascript:`, `mailto:`, `tel:`, `data:` and fragment-only hrefs are dropped
    /// - Repeated links keep their first position
    pub fn extract_links(&self, html: &str, page: u64) -> Vec<PageLink> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for element in document.select(&self.links) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };

            let Some(url) = self.resolve(href) else {
                tracing::trace!("Skipping listing href {:?} on page {}", href, page);
                continue;
            };

            if seen.insert(url.clone()) {
                links.push(PageLink { url, page });
            }
        }

        links
    }

    fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();

        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with("data:")
        {
            return None;
        }

        // Keys keep the href text as written so earlier runs' rows still match
        if let Ok(absolute) = Url::parse(href) {
            return match absolute.scheme() {
                "http" | "https" => Some(href.to_string()),
                _ => None,
            };
        }

        self.root.join(href).ok()?;

        if href.starts_with('/') && !href.starts_with("//") {
            Some(format!("{}{}", self.origin, href))
        } else {
            self.root.join(href).ok().map(|url| url.to_string())
        }
    }
}
