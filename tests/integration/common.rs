use news_archiver::config::{parse_config, Config};
use news_archiver::storage::{lock_storage, CrawlConfig, Storage};
use news_archiver::Controller;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a listing page with one teaser per path
pub fn listing_html(paths: &[&str]) -> String {
    let teasers: String = paths
        .iter()
        .map(|p| format!(r#"<div class="teaser"><a class="teaser__link" href="{}">Teaser</a></div>"#, p))
        .collect();
    format!(
        r#"<html><body><nav><a href="/impressum">Impressum</a></nav>{}</body></html>"#,
        teasers
    )
}

/// Builds an article page in the primary template
pub fn article_html(headline: &str, content: &str) -> String {
    format!(
        r#"<html><body>
        <span class="seitenkopf__topline">Inland</span>
        <span class="seitenkopf__headline--text">{}</span>
        <p class="metatextline">Stand: 01.03.2024 09:30 Uhr</p>
        <div class="article__body"><p>{}</p></div>
        </body></html>"#,
        headline, content
    )
}

pub async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Mounts a listing page at `/` and an article page per `(path, headline, content)`
pub async fn mount_site(server: &MockServer, articles: &[(&str, &str, &str)]) {
    let paths: Vec<&str> = articles.iter().map(|(p, _, _)| *p).collect();
    mount_page(server, "/", listing_html(&paths)).await;

    for (page_path, headline, content) in articles {
        mount_page(server, page_path, article_html(headline, content)).await;
    }
}

/// Configuration against `server` with a one-second polling quantum
pub fn settings(server: &MockServer, dir: &TempDir, enabled_on_start: bool) -> Config {
    let database_path = dir.path().join("archive.db");

    parse_config(&format!(
        r#"
[site]
listing-url = "{}/"
user-agent = "IntegrationTest/1.0"

[fetch]
article-timeout-secs = 1
listing-crawl-timeout-secs = 30
control-timeout-secs = 5

[scheduler]
poll-interval-secs = 1
default-interval-hours = 2
enabled-on-start = {}

[storage]
database-path = "{}"
"#,
        server.uri(),
        enabled_on_start,
        database_path.display()
    ))
    .unwrap()
}

pub fn controller(server: &MockServer, dir: &TempDir, enabled_on_start: bool) -> Controller {
    Controller::from_config(settings(server, dir, enabled_on_start)).unwrap()
}

pub fn crawl_config(controller: &Controller) -> CrawlConfig {
    lock_storage(controller.storage())
        .unwrap()
        .get_crawl_config()
        .unwrap()
}

/// Waits until the stored crawl configuration satisfies `ready`
pub async fn wait_for_config(
    controller: &Controller,
    ready: impl Fn(&CrawlConfig) -> bool,
) -> CrawlConfig {
    tokio::time::timeout(Duration::from_secs(15), async {
        loop {
            let config = crawl_config(controller);
            if ready(&config) {
                return config;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("crawl configuration did not reach the expected state in time")
}

/// Waits until the scheduler has recorded a completed crawl
pub async fn wait_for_completed_crawl(controller: &Controller) -> CrawlConfig {
    wait_for_config(controller, |config| config.last_run.is_some()).await
}

pub fn article_url(server: &MockServer, page_path: &str) -> String {
    format!("{}{}", server.uri(), page_path)
}
