//! Integration tests for the harvester
//!
//! These tests use wiremock to serve a small paginated listing and run
//! complete harvests against it.

use article_harvester::config::Config;
use article_harvester::harvester::{stop_channel, Harvester, StopSignal};
use article_harvester::storage::{ArticleCandidate, ArticleStore, RunStatus, SqliteStorage};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Matches requests without a query string
struct NoQuery;

impl Match for NoQuery {
    fn matches(&self, request: &Request) -> bool {
        request.url.query().is_none()
    }
}

/// Creates a test configuration pointing at the mock server
fn create_test_config(root: &str, db_path: &Path, goal_total: u64) -> Config {
    let mut config = Config::for_site(root);
    config.storage.database_path = db_path.to_string_lossy().into_owned();
    config.harvest.goal_total = goal_total;
    config.harvest.workers = 4;
    config.harvest.page_pause_ms = 0;
    config.harvest.empty_page_pause_ms = 0;
    config.fetch.max_attempts = 2;
    config.fetch.attempt_timeout_ms = 2_000;
    config.fetch.backoff_base_ms = 10;
    config.fetch.status_pause_ms = 10;
    config.fetch.jitter_min_ms = 0;
    config.fetch.jitter_max_ms = 0;
    config
}

fn listing_html(hrefs: &[&str]) -> String {
    let anchors: String = hrefs
        .iter()
        .map(|href| format!(r#"<a class="news_block" href="{}">story</a>"#, href))
        .collect();
    format!(
        r#"<html><body><a href="/about/">About</a>{}</body></html>"#,
        anchors
    )
}

fn article_html(title: &str) -> String {
    format!(
        r#"<html><body><h1>{}</h1>
        <div class="block1__wrap__textb">01.02.2024 09:00</div>
        <div class="detail_text"><script>track();</script>
            <p>{} was reported by the city newsroom this morning.</p>
        </div></body></html>"#,
        title, title
    )
}

/// Mounts listing page `page` with the given links
async fn mount_listing(server: &MockServer, page: u64, hrefs: &[&str]) {
    let response = ResponseTemplate::new(200).set_body_string(listing_html(hrefs));

    if page == 1 {
        Mock::given(method("GET"))
            .and(path("/news/"))
            .and(NoQuery)
            .respond_with(response)
            .mount(server)
            .await;
    } else {
        Mock::given(method("GET"))
            .and(path("/news/"))
            .and(query_param("PAGEN_1", page.to_string()))
            .respond_with(response)
            .mount(server)
            .await;
    }
}

/// Mounts an article that must be fetched exactly once
async fn mount_article(server: &MockServer, article_path: &str) {
    Mock::given(method("GET"))
        .and(path(article_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(article_html(article_path)))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_missing(server: &MockServer, article_path: &str) {
    Mock::given(method("GET"))
        .and(path(article_path))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(server)
        .await;
}

/// Mounts a listing page that must never be requested
async fn forbid_listing(server: &MockServer, page: u64) {
    let mock = Mock::given(method("GET")).and(path("/news/"));
    let mock = if page == 1 {
        mock.and(NoQuery)
    } else {
        mock.and(query_param("PAGEN_1", page.to_string()))
    };
    mock.respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

fn seed_articles(db_path: &Path, root: &str, count: u64) {
    let mut storage = SqliteStorage::new(db_path).unwrap();
    for i in 0..count {
        storage
            .insert_article(&ArticleCandidate {
                title: format!("Archived story {}", i),
                description: "An older article stored by a previous harvest run.".to_string(),
                url: format!("{}/archive/{}/", root, i),
                published_at: None,
            })
            .unwrap();
    }
}

#[tokio::test]
async fn test_full_harvest_three_pages() {
    let server = MockServer::start().await;
    let root = server.uri();
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("articles.db");

    for page in 1..=3u64 {
        let a = format!("/news/p{}-a/", page);
        let b = format!("/news/p{}-b/", page);
        let missing = format!("/news/p{}-missing/", page);

        mount_listing(&server, page, &[a.as_str(), b.as_str(), missing.as_str()]).await;
        mount_article(&server, &a).await;
        mount_article(&server, &b).await;
        mount_missing(&server, &missing).await;
    }
    forbid_listing(&server, 4).await;

    let config = create_test_config(&root, &db_path, 6);
    let summary = Harvester::new(config, StopSignal::never())
        .unwrap()
        .with_config_hash("integration")
        .run()
        .await
        .unwrap();

    assert!(summary.goal_reached);
    assert_eq!(summary.start_page, 1);
    assert_eq!(summary.last_page, 3);
    assert_eq!(summary.pages_visited, 3);
    assert_eq!(summary.saved_at_start, 0);
    assert_eq!(summary.saved_this_run, 6);
    assert_eq!(summary.saved_total, 6);
    assert_eq!(summary.totals.saved, 6);
    assert_eq!(summary.totals.not_found, 3);
    assert_eq!(summary.totals.failed, 0);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_articles().unwrap(), 6);

    let record = storage
        .get_article_by_url(&format!("{}/news/p2-a/", root))
        .unwrap()
        .expect("article stored");
    assert_eq!(record.title, "/news/p2-a/");
    assert_eq!(
        record.description,
        "/news/p2-a/ was reported by the city newsroom this morning."
    );
    assert_eq!(record.published_at.as_deref(), Some("01.02.2024 09:00"));
    assert_eq!(record.comment_count, 0);
    assert_eq!(record.rating, 0);

    let run = storage.get_run(summary.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "integration");
    assert_eq!(run.start_page, 1);
    assert_eq!(run.last_page, Some(3));
    assert_eq!(run.saved_count, 6);
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_known_links_are_not_dispatched_again() {
    let server = MockServer::start().await;
    let root = server.uri();
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("articles.db");

    mount_listing(&server, 1, &["/news/a/", "/news/b/"]).await;
    mount_listing(&server, 2, &["/news/b/", "/news/c/"]).await;
    mount_listing(&server, 3, &["/news/c/", "/news/d/"]).await;
    for article in ["/news/a/", "/news/b/", "/news/c/", "/news/d/"] {
        mount_article(&server, article).await;
    }

    let config = create_test_config(&root, &db_path, 4);
    let summary = Harvester::new(config, StopSignal::never())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(summary.goal_reached);
    assert_eq!(summary.saved_total, 4);
    assert_eq!(summary.totals.saved, 4);
    assert_eq!(summary.totals.duplicates, 0);
    assert_eq!(summary.totals.total(), 4);
}

#[tokio::test]
async fn test_resume_starts_from_estimated_page() {
    let server = MockServer::start().await;
    let root = server.uri();
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("articles.db");

    seed_articles(&db_path, &root, 90);

    forbid_listing(&server, 1).await;
    forbid_listing(&server, 2).await;
    mount_listing(&server, 3, &["/news/fresh-1/", "/news/fresh-2/"]).await;
    mount_article(&server, "/news/fresh-1/").await;
    mount_article(&server, "/news/fresh-2/").await;

    let config = create_test_config(&root, &db_path, 92);
    let harvester = Harvester::new(config, StopSignal::never()).unwrap();
    assert_eq!(harvester.starting_page().unwrap(), 3);

    let summary = harvester.run().await.unwrap();

    assert!(summary.goal_reached);
    assert_eq!(summary.start_page, 3);
    assert_eq!(summary.last_page, 3);
    assert_eq!(summary.saved_at_start, 90);
    assert_eq!(summary.saved_this_run, 2);
    assert_eq!(summary.saved_total, 92);
}

#[tokio::test]
async fn test_empty_and_failing_listing_pages_are_skipped() {
    let server = MockServer::start().await;
    let root = server.uri();
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("articles.db");

    mount_listing(&server, 1, &[]).await;
    Mock::given(method("GET"))
        .and(path("/news/"))
        .and(query_param("PAGEN_1", "2"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&server)
        .await;
    mount_listing(&server, 3, &["/news/only/"]).await;
    mount_article(&server, "/news/only/").await;

    let config = create_test_config(&root, &db_path, 1);
    let summary = Harvester::new(config, StopSignal::never())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(summary.goal_reached);
    assert_eq!(summary.pages_visited, 3);
    assert_eq!(summary.last_page, 3);
    assert_eq!(summary.saved_total, 1);
}

#[tokio::test]
async fn test_rejected_articles_are_not_stored() {
    let server = MockServer::start().await;
    let root = server.uri();
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("articles.db");

    mount_listing(&server, 1, &["/news/short/", "/news/good/"]).await;
    mount_listing(&server, 2, &["/news/good-2/"]).await;
    Mock::given(method("GET"))
        .and(path("/news/short/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><h1>Brief</h1><div class="detail_text">Too short.</div></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    mount_article(&server, "/news/good/").await;
    mount_article(&server, "/news/good-2/").await;

    let config = create_test_config(&root, &db_path, 2);
    let summary = Harvester::new(config, StopSignal::never())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.saved_total, 2);
    assert_eq!(summary.totals.rejected, 1);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert!(!storage
        .article_exists(&format!("{}/news/short/", root))
        .unwrap());
}

#[tokio::test]
async fn test_stop_before_run_fetches_nothing() {
    let server = MockServer::start().await;
    let root = server.uri();
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("articles.db");

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (handle, signal) = stop_channel();
    handle.stop();

    let config = create_test_config(&root, &db_path, 10);
    let summary = Harvester::new(config, signal).unwrap().run().await.unwrap();

    assert!(!summary.goal_reached);
    assert_eq!(summary.pages_visited, 0);
    assert_eq!(summary.saved_total, 0);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let run = storage.get_latest_run().unwrap().expect("run recorded");
    assert_eq!(run.status, RunStatus::Interrupted);
    assert_eq!(run.saved_count, 0);
}
