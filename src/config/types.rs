use serde::Deserialize;
use std::time::Duration;

/// Browser identities rotated across fetch attempts when none are configured
pub const DEFAULT_IDENTITIES: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:123.0) Gecko/20100101 Firefox/123.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36 Edg/121.0.0.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_3 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.3 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (iPad; CPU OS 17_3 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.3 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36 OPR/105.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_3) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.3 Safari/605.1.15",
];

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
}

impl Config {
    /// Builds a configuration for `root` with every other setting at its default
    pub fn for_site(root: &str) -> Self {
        Self {
            storage: StorageConfig::default(),
            harvest: HarvestConfig::default(),
            site: SiteConfig::new(root),
            fetch: FetchConfig::default(),
            extract: ExtractConfig::default(),
        }
    }
}

/// Where and how records are persisted
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Capacity of the single writer's request queue
    pub writer_queue: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "articles.db".to_string(),
            writer_queue: 64,
        }
    }
}

/// Goal and pacing of the page loop
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HarvestConfig {
    /// Stop once this many articles are stored
    pub goal_total: u64,

    /// Maximum number of articles processed concurrently
    pub workers: usize,

    /// Articles listed per listing page, used to estimate the resume page
    pub page_size: u64,

    /// Pause after each processed listing page (milliseconds)
    pub page_pause_ms: u64,

    /// Pause after a listing page without candidate links (milliseconds)
    pub empty_page_pause_ms: u64,

    /// Log a milestone every time the saved count crosses a multiple of this
    pub progress_every: u64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            goal_total: 5000,
            workers: 30,
            page_size: 30,
            page_pause_ms: 500,
            empty_page_pause_ms: 10_000,
            progress_every: 50,
        }
    }
}

impl HarvestConfig {
    pub fn page_pause(&self) -> Duration {
        Duration::from_millis(self.page_pause_ms)
    }

    pub fn empty_page_pause(&self) -> Duration {
        Duration::from_millis(self.empty_page_pause_ms)
    }
}

/// The site being harvested
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Site root that relative article links are resolved against
    pub root: String,

    /// Path of the first listing page, relative to the root
    #[serde(default = "default_listing_path")]
    pub listing_path: String,

    /// Query parameter carrying the listing page index
    #[serde(default = "default_page_param")]
    pub page_param: String,

    /// Selector for article anchors on a listing page
    #[serde(default = "default_link_selector")]
    pub link_selector: String,
}

impl SiteConfig {
    pub fn new(root: &str) -> Self {
        Self {
            root: root.to_string(),
            listing_path: default_listing_path(),
            page_param: default_page_param(),
            link_selector: default_link_selector(),
        }
    }
}

fn default_listing_path() -> String {
    "/news/".to_string()
}

fn default_page_param() -> String {
    "PAGEN_1".to_string()
}

fn default_link_selector() -> String {
    "a.news_block".to_string()
}

/// Retry and identity settings for page retrieval
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Attempts per URL before giving up
    pub max_attempts: u32,

    /// Timeout of a single attempt (milliseconds)
    pub attempt_timeout_ms: u64,

    /// Base of the linear backoff after transport errors (milliseconds)
    pub backoff_base_ms: u64,

    /// Pause after an unexpected HTTP status (milliseconds)
    pub status_pause_ms: u64,

    /// Lower bound of the random delay before each attempt (milliseconds)
    pub jitter_min_ms: u64,

    /// Upper bound of the random delay before each attempt (milliseconds)
    pub jitter_max_ms: u64,

    /// Accept invalid TLS certificates
    pub accept_invalid_certs: bool,

    /// User-Agent strings rotated per attempt
    pub identities: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            attempt_timeout_ms: 5_000,
            backoff_base_ms: 5_000,
            status_pause_ms: 5_000,
            jitter_min_ms: 100,
            jitter_max_ms: 300,
            accept_invalid_certs: false,
            identities: DEFAULT_IDENTITIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FetchConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

/// Selectors and thresholds for turning an article page into a record
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExtractConfig {
    pub title_selector: String,

    /// Title used when the page has no heading
    pub placeholder_title: String,

    /// Primary body containers, tried in order
    pub content_selectors: Vec<String>,

    /// Elements removed from the primary container before reading its text
    pub noise_selectors: Vec<String>,

    /// Wider container searched for paragraphs when no primary container matches
    pub fallback_selector: String,

    pub paragraph_selector: String,

    /// Element holding the free-text publication date
    pub published_selector: Option<String>,

    /// Bodies shorter than this many characters are rejected
    pub min_body_chars: usize,

    /// Fallback paragraphs must be longer than this many characters
    pub min_paragraph_chars: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            title_selector: "h1".to_string(),
            placeholder_title: "Untitled".to_string(),
            content_selectors: vec!["div.detail_text".to_string(), "div.news-detail".to_string()],
            noise_selectors: vec![
                "script".to_string(),
                "style".to_string(),
                "iframe".to_string(),
                "div.banner".to_string(),
                "noindex".to_string(),
                "div.news-date-time".to_string(),
            ],
            fallback_selector: "div.page_center-column".to_string(),
            paragraph_selector: "p".to_string(),
            published_selector: Some("div.block1__wrap__textb".to_string()),
            min_body_chars: 30,
            min_paragraph_chars: 30,
        }
    }
}
