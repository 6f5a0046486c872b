//! Listing and single-article crawls against a mock site

use crate::common::{
    article_html, article_url, controller, crawl_config, listing_html, mount_page, mount_site,
};
use news_archiver::crawler::{CONTENT_PLACEHOLDER, HEADLINE_PLACEHOLDER};
use news_archiver::storage::{lock_storage, Storage};
use news_archiver::{ArchiverError, FetchError};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SITE: &[(&str, &str, &str)] = &[
    ("/inland/a-1.html", "Erste Meldung", "Inhalt eins"),
    ("/ausland/a-2.html", "Zweite Meldung", "Inhalt zwei"),
    ("/wirtschaft/a-3.html", "Dritte Meldung", "Inhalt drei"),
];

#[tokio::test]
async fn test_first_crawl_creates_every_article() {
    let server = MockServer::start().await;
    mount_site(&server, SITE).await;
    let dir = TempDir::new().unwrap();
    let controller = controller(&server, &dir, false);

    let report = controller.trigger_listing_crawl().await.unwrap();

    assert_eq!(report.links_found, 3);
    assert_eq!(report.created, 3);
    assert_eq!(report.new_versions(), 3);
    assert_eq!(report.failed, 0);

    let storage = lock_storage(controller.storage()).unwrap();
    assert_eq!(storage.count_articles().unwrap(), 3);
    for (page_path, headline, content) in SITE {
        let article = storage
            .get_article_by_url(&article_url(&server, page_path))
            .unwrap()
            .unwrap();
        assert_eq!(article.headline, *headline);
        assert_eq!(article.sub_headline, "Inland");
        assert_eq!(article.content, *content);
        assert!(article.updated_at.is_some());
        assert_eq!(storage.count_versions(article.id).unwrap(), 0);
    }
    assert_eq!(storage.count_all_versions().unwrap(), 0);
    assert!(storage.get_crawl_config().unwrap().last_run.is_some());
}

#[tokio::test]
async fn test_identical_recrawl_adds_nothing() {
    let server = MockServer::start().await;
    mount_site(&server, SITE).await;
    let dir = TempDir::new().unwrap();
    let controller = controller(&server, &dir, false);

    controller.trigger_listing_crawl().await.unwrap();
    let first_seen = {
        let storage = lock_storage(controller.storage()).unwrap();
        storage
            .get_article_by_url(&article_url(&server, SITE[0].0))
            .unwrap()
            .unwrap()
    };

    let report = controller.trigger_listing_crawl().await.unwrap();
    assert_eq!(report.new_versions(), 0);
    assert_eq!(report.unchanged, 3);

    let storage = lock_storage(controller.storage()).unwrap();
    assert_eq!(storage.count_articles().unwrap(), 3);
    assert_eq!(storage.count_all_versions().unwrap(), 0);

    let recrawled = storage
        .get_article_by_url(&article_url(&server, SITE[0].0))
        .unwrap()
        .unwrap();
    assert_eq!(recrawled.first_crawled_at, first_seen.first_crawled_at);
    assert!(recrawled.last_crawled_at > first_seen.last_crawled_at);
}

#[tokio::test]
async fn test_changed_article_gets_exactly_one_version() {
    let server = MockServer::start().await;
    mount_site(&server, SITE).await;
    let dir = TempDir::new().unwrap();
    let controller = controller(&server, &dir, false);

    controller.trigger_listing_crawl().await.unwrap();
    let before = {
        let storage = lock_storage(controller.storage()).unwrap();
        storage
            .get_article_by_url(&article_url(&server, SITE[1].0))
            .unwrap()
            .unwrap()
    };

    server.reset().await;
    mount_site(
        &server,
        &[
            SITE[0],
            ("/ausland/a-2.html", "Zweite Meldung (aktualisiert)", "Neuer Inhalt"),
            SITE[2],
        ],
    )
    .await;

    let report = controller.trigger_listing_crawl().await.unwrap();
    assert_eq!(report.changed, 1);
    assert_eq!(report.unchanged, 2);
    assert_eq!(report.new_versions(), 1);

    let storage = lock_storage(controller.storage()).unwrap();
    let after = storage.get_article(before.id).unwrap().unwrap();
    assert_eq!(after.headline, "Zweite Meldung (aktualisiert)");
    assert_eq!(after.content, "Neuer Inhalt");

    let versions = storage.get_versions(before.id).unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].headline, "Zweite Meldung");
    assert_eq!(versions[0].content, "Inhalt zwei");
    assert_eq!(versions[0].crawled_at, before.last_crawled_at);
    assert_eq!(storage.count_all_versions().unwrap(), 1);
}

#[tokio::test]
async fn test_failing_articles_do_not_affect_the_others() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        listing_html(&[
            "/inland/a-1.html",
            "/inland/kaputt.html",
            "/inland/langsam.html",
            "/ausland/a-2.html",
        ]),
    )
    .await;
    mount_page(&server, "/inland/a-1.html", article_html("Eins", "Text eins")).await;
    mount_page(&server, "/ausland/a-2.html", article_html("Zwei", "Text zwei")).await;
    Mock::given(method("GET"))
        .and(path("/inland/kaputt.html"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/inland/langsam.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(article_html("Langsam", "Text"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let controller = controller(&server, &dir, false);

    let report = controller.trigger_listing_crawl().await.unwrap();
    assert_eq!(report.links_found, 4);
    assert_eq!(report.created, 2);
    assert_eq!(report.failed, 2);
    assert_eq!(report.new_versions(), 2);

    let storage = lock_storage(controller.storage()).unwrap();
    assert_eq!(storage.count_articles().unwrap(), 2);
    assert!(storage
        .get_article_by_url(&article_url(&server, "/inland/kaputt.html"))
        .unwrap()
        .is_none());
    // A crawl with failed articles still counts as completed
    assert!(storage.get_crawl_config().unwrap().last_run.is_some());
}

#[tokio::test]
async fn test_listing_failure_is_not_a_completed_crawl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let controller = controller(&server, &dir, false);

    let result = controller.trigger_listing_crawl().await;
    assert!(matches!(
        result,
        Err(ArchiverError::Fetch(FetchError::HttpStatus { status: 503, .. }))
    ));

    assert_eq!(crawl_config(&controller).last_run, None);
    let storage = lock_storage(controller.storage()).unwrap();
    assert_eq!(storage.count_articles().unwrap(), 0);
}

#[tokio::test]
async fn test_duplicate_teasers_crawled_once() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        listing_html(&[
            "/inland/a-1.html",
            "/inland/a-1.html",
            "/inland/a-1.html#kommentare",
            "https://www.example.com/fremd.html",
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/inland/a-1.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(article_html("Eins", "Text")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let controller = controller(&server, &dir, false);

    let report = controller.trigger_listing_crawl().await.unwrap();
    assert_eq!(report.links_found, 1);
    assert_eq!(report.created, 1);
}

#[tokio::test]
async fn test_degraded_article_is_stored_with_placeholders() {
    let server = MockServer::start().await;
    mount_page(&server, "/", listing_html(&["/live/ticker.html"])).await;
    mount_page(
        &server,
        "/live/ticker.html",
        "<html><body><div id=\"app\"></div></body></html>".to_string(),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let controller = controller(&server, &dir, false);

    let report = controller.trigger_listing_crawl().await.unwrap();
    assert_eq!(report.created, 1);

    let storage = lock_storage(controller.storage()).unwrap();
    let article = storage
        .get_article_by_url(&article_url(&server, "/live/ticker.html"))
        .unwrap()
        .unwrap();
    assert_eq!(article.headline, HEADLINE_PLACEHOLDER);
    assert_eq!(article.sub_headline, "");
    assert_eq!(article.content, CONTENT_PLACEHOLDER);
    assert_eq!(article.updated_at, None);
}

#[tokio::test]
async fn test_single_article_crawl() {
    let server = MockServer::start().await;
    mount_page(&server, "/inland/a-1.html", article_html("Eins", "Text")).await;
    let dir = TempDir::new().unwrap();
    let controller = controller(&server, &dir, false);
    let url = article_url(&server, "/inland/a-1.html");

    assert!(controller.trigger_article_crawl(&url).await.unwrap());
    assert!(!controller.trigger_article_crawl(&url).await.unwrap());

    server.reset().await;
    mount_page(&server, "/inland/a-1.html", article_html("Eins", "Neuer Text")).await;
    assert!(controller.trigger_article_crawl(&url).await.unwrap());

    // Single-article crawls never touch the crawl configuration
    let config = crawl_config(&controller);
    assert_eq!(config.last_run, None);
    assert_eq!(config.next_run, None);

    let storage = lock_storage(controller.storage()).unwrap();
    let article = storage.get_article_by_url(&url).unwrap().unwrap();
    assert_eq!(storage.count_versions(article.id).unwrap(), 1);
}

#[tokio::test]
async fn test_single_article_crawl_reports_fetch_failure() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let controller = controller(&server, &dir, false);

    // Nothing mounted: wiremock answers 404
    let result = controller
        .trigger_article_crawl(&article_url(&server, "/fehlt.html"))
        .await;
    assert!(matches!(
        result,
        Err(ArchiverError::Fetch(FetchError::HttpStatus { status: 404, .. }))
    ));
}
