//! End-to-end mirror runs
//!
//! Every test starts a mock site, points a fresh config directory at it and
//! runs the coordinator the way the binary does.

use gallery_mirror::config::Config;
use gallery_mirror::crawler::Coordinator;
use gallery_mirror::output::RunStatistics;
use gallery_mirror::storage::{Ledger, LedgerEntry, SqliteLedger};
use gallery_mirror::MirrorError;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FRONT_PAGE: &str = r#"<html><head><title>Front</title></head>
    <body><a href="/user/tester/">tester</a></body></html>"#;

/// Creates a test configuration pointing at the mock site
fn create_test_config(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.site.base_url = format!("{}/", server.uri());
    config.crawler.requests_per_second = 100;
    config.paths.config_directory = dir.path().join("config");
    config.paths.download_directory = dir.path().join("images");
    config
}

fn images(dir: &TempDir) -> PathBuf {
    dir.path().join("images")
}

fn open_ledger(dir: &TempDir) -> SqliteLedger {
    SqliteLedger::new(&dir.path().join("config").join("downloaded.sqlite"))
        .expect("Failed to open ledger")
}

/// Every ledger row for `keys`, in order
fn ledger_snapshot(dir: &TempDir, keys: &[&str]) -> Vec<LedgerEntry> {
    let ledger = open_ledger(dir);
    keys.iter()
        .map(|key| ledger.get(key).unwrap().expect("Missing entry"))
        .collect()
}

fn mtime_secs(path: &Path) -> u64 {
    std::fs::metadata(path)
        .expect("Missing file")
        .modified()
        .expect("No mtime")
        .duration_since(UNIX_EPOCH)
        .expect("mtime before epoch")
        .as_secs()
}

async fn mount_front_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FRONT_PAGE))
        .mount(server)
        .await;
}

/// Mounts a listing page linking to the given submissions
async fn mount_listing(server: &MockServer, listing: &str, ids: &[u32], next: Option<&str>) {
    let mut body = String::from("<html><head><title>Listing</title></head><body>");
    for id in ids {
        body.push_str(&format!(r#"<a href="/view/{}/"><img alt=""></a>"#, id));
    }
    if let Some(next) = next {
        body.push_str(&format!(r#"<a href="{}">Next</a>"#, next));
    }
    body.push_str("</body></html>");

    Mock::given(method("GET"))
        .and(path(listing))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Mounts a submission page whose download link points at `image_path`
async fn mount_submission(server: &MockServer, id: u32, image_path: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/view/{}/", id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<html><head><title>Submission {}</title></head>
               <body><a href="{}">Download</a></body></html>"#,
            id, image_path
        )))
        .mount(server)
        .await;
}

/// Mounts HEAD and GET for an image, expecting `gets` body transfers
async fn mount_image(server: &MockServer, image_path: &str, body: &[u8], gets: u64) {
    Mock::given(method("HEAD"))
        .and(path(image_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(image_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(gets)
        .mount(server)
        .await;
}

async fn run_once(config: Config, artists: &[&str]) -> Result<RunStatistics, MirrorError> {
    let artists: Vec<String> = artists.iter().map(|a| a.to_string()).collect();
    let coordinator = Coordinator::from_config(config).await?;
    coordinator.run(&artists).await
}

#[tokio::test]
async fn test_second_run_transfers_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    mount_front_page(&server).await;
    mount_listing(&server, "/gallery/foo/", &[1, 2], Some("/gallery/foo/2/")).await;
    mount_listing(&server, "/gallery/foo/2/", &[3], None).await;
    mount_submission(&server, 1, "/art/foo/1420070400.foo_one.png").await;
    mount_submission(&server, 2, "/art/foo/1420070500.foo_two.png").await;
    mount_submission(&server, 3, "/art/foo/three.png").await;
    // Exactly one body transfer per image across both runs
    mount_image(&server, "/art/foo/1420070400.foo_one.png", b"first image", 1).await;
    mount_image(&server, "/art/foo/1420070500.foo_two.png", b"second", 1).await;
    mount_image(&server, "/art/foo/three.png", b"third image bytes", 1).await;

    let first = run_once(create_test_config(&server, &dir), &["foo"])
        .await
        .expect("First run failed");
    assert_eq!(first.listing_pages, 2);
    assert_eq!(first.queued, 3);
    assert_eq!(first.downloaded, 3);
    assert_eq!(first.failed, 0);
    assert_eq!(first.bytes, 11 + 6 + 17);
    let before = ledger_snapshot(&dir, &["/view/1/", "/view/2/", "/view/3/"]);

    let second = run_once(create_test_config(&server, &dir), &["foo"])
        .await
        .expect("Second run failed");
    assert_eq!(second.queued, 0);
    assert_eq!(second.downloaded, 0);
    // Fast scan stops after the first listing page
    assert_eq!(second.listing_pages, 1);
    // The second run leaves every ledger row untouched
    assert_eq!(
        ledger_snapshot(&dir, &["/view/1/", "/view/2/", "/view/3/"]),
        before
    );

    let ledger = open_ledger(&dir);
    assert_eq!(ledger.count_downloaded().unwrap(), 3);
    let entry = ledger.get("/view/1/").unwrap().expect("Missing entry");
    assert_eq!(entry.filename, "1420070400.foo_one.png");
    assert!(entry.image_url.ends_with("/art/foo/1420070400.foo_one.png"));

    let stored = images(&dir).join("1420070400.foo_one.png");
    assert_eq!(std::fs::read(&stored).unwrap(), b"first image");
    assert_eq!(mtime_secs(&stored), 1_420_070_400);
    assert!(images(&dir).join("three.png").exists());
}

#[tokio::test]
async fn test_existing_file_of_matching_size_is_not_fetched() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    mount_front_page(&server).await;
    mount_listing(&server, "/gallery/foo/", &[1], None).await;
    mount_submission(&server, 1, "/art/foo/1420070400.foo_kept.png").await;
    mount_image(&server, "/art/foo/1420070400.foo_kept.png", b"0123456789", 0).await;

    std::fs::create_dir_all(images(&dir)).unwrap();
    let existing = images(&dir).join("1420070400.foo_kept.png");
    std::fs::write(&existing, b"abcdefghij").unwrap();

    let stats = run_once(create_test_config(&server, &dir), &["foo"])
        .await
        .expect("Run failed");
    assert_eq!(stats.already_present, 1);
    assert_eq!(stats.downloaded, 0);

    // Content is left alone; only the size is compared
    assert_eq!(std::fs::read(&existing).unwrap(), b"abcdefghij");
    assert_eq!(mtime_secs(&existing), 1_420_070_400);

    let ledger = open_ledger(&dir);
    assert!(ledger.is_downloaded("/view/1/").unwrap());
}

#[tokio::test]
async fn test_existing_file_of_other_size_is_replaced() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    mount_front_page(&server).await;
    mount_listing(&server, "/gallery/foo/", &[1], None).await;
    mount_submission(&server, 1, "/art/foo/partial.png").await;
    mount_image(&server, "/art/foo/partial.png", b"complete image", 1).await;

    std::fs::create_dir_all(images(&dir)).unwrap();
    std::fs::write(images(&dir).join("partial.png"), b"comp").unwrap();

    let stats = run_once(create_test_config(&server, &dir), &["foo"])
        .await
        .expect("Run failed");
    assert_eq!(stats.downloaded, 1);
    assert_eq!(
        std::fs::read(images(&dir).join("partial.png")).unwrap(),
        b"complete image"
    );
}

#[tokio::test]
async fn test_failed_download_does_not_stop_siblings() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    mount_front_page(&server).await;
    mount_listing(&server, "/gallery/foo/", &[1, 2, 3], None).await;
    mount_submission(&server, 1, "/art/foo/a.png").await;
    mount_submission(&server, 2, "/art/foo/b.png").await;
    mount_submission(&server, 3, "/art/foo/c.png").await;
    mount_image(&server, "/art/foo/a.png", b"aaaa", 1).await;
    mount_image(&server, "/art/foo/c.png", b"cccc", 1).await;
    Mock::given(method("HEAD"))
        .and(path("/art/foo/b.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"bbbb".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/art/foo/b.png"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let stats = run_once(create_test_config(&server, &dir), &["foo"])
        .await
        .expect("Run failed");
    assert_eq!(stats.downloaded, 2);
    assert_eq!(stats.failed, 1);

    let ledger = open_ledger(&dir);
    assert!(ledger.is_downloaded("/view/1/").unwrap());
    assert!(!ledger.is_downloaded("/view/2/").unwrap());
    assert!(ledger.get("/view/2/").unwrap().is_none());
    assert!(ledger.is_downloaded("/view/3/").unwrap());

    assert!(!images(&dir).join("b.png").exists());
    assert!(!images(&dir).join("b.png.download").exists());
}

#[tokio::test]
async fn test_short_body_leaves_no_file() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    mount_front_page(&server).await;
    mount_listing(&server, "/gallery/foo/", &[1], None).await;
    mount_submission(&server, 1, "/art/foo/truncated.png").await;
    Mock::given(method("HEAD"))
        .and(path("/art/foo/truncated.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 64]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/art/foo/truncated.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 32]))
        .mount(&server)
        .await;

    let stats = run_once(create_test_config(&server, &dir), &["foo"])
        .await
        .expect("Run failed");
    assert_eq!(stats.failed, 1);
    assert!(!images(&dir).join("truncated.png").exists());
    assert!(!images(&dir).join("truncated.png.download").exists());
    assert_eq!(open_ledger(&dir).count_entries().unwrap(), 0);
}

#[tokio::test]
async fn test_broken_filename_is_corrected() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    mount_front_page(&server).await;
    mount_listing(&server, "/gallery/foo/", &[1], None).await;
    mount_submission(&server, 1, "/art/foo/1420070400.").await;
    mount_image(&server, "/art/foo/1420070400.", b"jpeg bytes", 1).await;

    let stats = run_once(create_test_config(&server, &dir), &["foo"])
        .await
        .expect("Run failed");
    assert_eq!(stats.downloaded, 1);

    let fixed = images(&dir).join("1420070400foo.unnamedimage.jpg");
    assert_eq!(std::fs::read(&fixed).unwrap(), b"jpeg bytes");
    assert_eq!(mtime_secs(&fixed), 1_420_070_400);

    let entry = open_ledger(&dir).get("/view/1/").unwrap().expect("Missing entry");
    assert_eq!(entry.filename, "1420070400foo.unnamedimage.jpg");
}

#[tokio::test]
async fn test_implausible_timestamp_leaves_mtime_alone() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    mount_front_page(&server).await;
    mount_listing(&server, "/gallery/foo/", &[1], None).await;
    mount_submission(&server, 1, "/art/foo/0000000001.foo_old.png").await;
    mount_image(&server, "/art/foo/0000000001.foo_old.png", b"old", 1).await;

    run_once(create_test_config(&server, &dir), &["foo"])
        .await
        .expect("Run failed");

    let stored = images(&dir).join("0000000001.foo_old.png");
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    assert!(now.saturating_sub(mtime_secs(&stored)) < 3600);
}

#[tokio::test]
async fn test_listing_error_only_ends_that_listing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    mount_front_page(&server).await;
    Mock::given(method("GET"))
        .and(path("/gallery/foo/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_listing(&server, "/scraps/foo/", &[1], None).await;
    mount_submission(&server, 1, "/art/foo/scrap.png").await;
    mount_image(&server, "/art/foo/scrap.png", b"scrap", 1).await;

    let mut config = create_test_config(&server, &dir);
    config.crawler.scraps = true;
    let stats = run_once(config, &["foo"]).await.expect("Run failed");

    assert_eq!(stats.listing_pages, 1);
    assert_eq!(stats.downloaded, 1);
}

#[tokio::test]
async fn test_missing_login_aborts_before_crawling() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body><a href="/login/">Log In</a></body></html>"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gallery/foo/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = run_once(create_test_config(&server, &dir), &["foo"]).await;
    assert!(matches!(result, Err(MirrorError::Session(_))));
}

#[tokio::test]
async fn test_setup_creates_ledger_and_cookie_file() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");
    mount_front_page(&server).await;

    let stats = run_once(create_test_config(&server, &dir), &[])
        .await
        .expect("Run failed");
    assert_eq!(stats, RunStatistics { elapsed: stats.elapsed, ..Default::default() });

    let config_dir = dir.path().join("config");
    assert!(config_dir.join("downloaded.sqlite").exists());
    assert!(config_dir.join("cookies.txt").exists());
    assert!(!images(&dir).exists());
}
