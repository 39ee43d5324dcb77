//! End-to-end scraper runs against a local stand-in for D&D Beyond.
//!
//! The client is blocking, so each run happens on a `spawn_blocking` thread
//! while wiremock serves requests on the test runtime.

use ddb_sheets::api::DdbClient;
use ddb_sheets::config::ScraperConfig;
use ddb_sheets::error::ApiError;
use ddb_sheets::scrape::{campaign_dir_name, scrape_all, scrape_campaign, ScrapeOutcome, ScrapeReport};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CAMPAIGN_ID: u64 = 77;

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/cobalt-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok", "ttl": 300})))
        .mount(server)
        .await;
}

async fn mount_campaign_page(server: &MockServer, ids: &[u64]) {
    let page: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<div class="card"><div class="character-info-primary">Hero {id}</div>
                   <span>Player: player{id}</span><a href="/characters/{id}">View</a></div>"#
            )
        })
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/campaigns/{CAMPAIGN_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(server)
        .await;
}

async fn mount_character(server: &MockServer, id: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/character/v5/character/{id}")))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Character successfully received.",
            "data": {
                "id": id,
                "name": format!("Hero {id}"),
                "stats": [{"id": 1, "value": 12}]
            }
        })))
        .mount(server)
        .await;
}

async fn scrape(server: &MockServer, base: PathBuf) -> anyhow::Result<ScrapeReport> {
    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        let cfg = ScraperConfig::with_base_url("cookie-value", &uri);
        let client = DdbClient::new(&cfg)?;
        scrape_campaign(&client, CAMPAIGN_ID, Some("bkb-primary"), &base)
    })
    .await
    .expect("scrape thread panicked")
}

#[tokio::test(flavor = "multi_thread")]
async fn one_failing_character_does_not_stop_the_batch() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_campaign_page(&server, &[1, 2, 3, 4, 5]).await;
    for id in [1, 2, 4, 5] {
        mount_character(&server, id).await;
    }
    Mock::given(method("GET"))
        .and(path("/character/v5/character/3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let report = scrape(&server, tmp.path().to_path_buf()).await.unwrap();

    assert_eq!(report.found, 5);
    assert_eq!(report.written.len(), 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].character_id, 3);
    assert_eq!(report.outcome(), ScrapeOutcome::Partial);

    let dir = tmp.path().join("bkb-primary").join("characters");
    for id in [1, 2, 4, 5] {
        assert!(dir.join(format!("Hero_{id}_{id}.json")).is_file());
    }
    assert!(!dir.join("Hero_3_3.json").exists());

    let saved: Value =
        serde_json::from_str(&fs::read_to_string(dir.join("Hero_1_1.json")).unwrap()).unwrap();
    assert_eq!(saved["_player"], "player1");
    assert_eq!(saved["stats"][0]["name"], "Strength");
}

#[tokio::test(flavor = "multi_thread")]
async fn inaccessible_campaign_yields_empty_report() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("/campaigns/{CAMPAIGN_ID}")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let report = scrape(&server, tmp.path().to_path_buf()).await.unwrap();
    assert_eq!(report.found, 0);
    assert_eq!(report.outcome(), ScrapeOutcome::Empty);
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_session_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/cobalt-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    mount_campaign_page(&server, &[1, 2]).await;

    let tmp = TempDir::new().unwrap();
    let err = scrape(&server, tmp.path().to_path_buf()).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::Unauthorized { .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn unsuccessful_envelope_counts_as_failure() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_campaign_page(&server, &[9]).await;
    Mock::given(method("GET"))
        .and(path("/character/v5/character/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Character is private",
            "data": null
        })))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let report = scrape(&server, tmp.path().to_path_buf()).await.unwrap();
    assert_eq!(report.outcome(), ScrapeOutcome::Failed);
    let msg = format!("{:#}", report.failures[0].error);
    assert!(msg.contains("Character is private"), "{msg}");
}

#[tokio::test(flavor = "multi_thread")]
async fn campaigns_are_listed_from_the_envelope() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/campaign/stt/active-campaigns"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": [
                {"id": 77, "name": "BKB Primary", "dmUsername": "dm1"},
                {"name": "No Id"}
            ]
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    let campaigns = tokio::task::spawn_blocking(move || {
        let client = DdbClient::new(&ScraperConfig::with_base_url("c", &uri)).unwrap();
        client.list_campaigns()
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(campaigns.len(), 1);
    assert_eq!(campaigns[0].id, 77);
    assert_eq!(campaigns[0].name, "BKB Primary");
    assert_eq!(campaigns[0].dm.as_deref(), Some("dm1"));
    assert!(campaigns[0].url.ends_with("/campaigns/77"));
}

#[tokio::test(flavor = "multi_thread")]
async fn expired_bearer_is_refreshed_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/cobalt-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "stale"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/cobalt-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "fresh"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/character/v5/character/42"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/character/v5/character/42"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": 42, "name": "Trigger"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let doc = tokio::task::spawn_blocking(move || {
        let client = DdbClient::new(&ScraperConfig::with_base_url("c", &uri)).unwrap();
        client.character(42)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(doc["name"], "Trigger");
}

async fn mount_campaign_list(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/campaign/stt/active-campaigns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": [
                {"id": 77, "name": "Broken Game"},
                {"id": 88, "name": "BKB Primary"}
            ]
        })))
        .mount(server)
        .await;
}

async fn scrape_everything(server: &MockServer, base: PathBuf) -> anyhow::Result<Vec<ScrapeReport>> {
    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        let client = DdbClient::new(&ScraperConfig::with_base_url("c", &uri))?;
        scrape_all(&client, &base)
    })
    .await
    .expect("scrape thread panicked")
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_campaign_is_skipped_by_full_scrape() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_campaign_list(&server).await;
    Mock::given(method("GET"))
        .and(path("/campaigns/77"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/campaigns/88"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div class="character-info-primary">Hero 5</div>
               <span>Player: player5</span><a href="/characters/5">View</a>"#,
        ))
        .mount(&server)
        .await;
    mount_character(&server, 5).await;

    let tmp = TempDir::new().unwrap();
    let reports = scrape_everything(&server, tmp.path().to_path_buf()).await.unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].campaign_id, 88);
    assert_eq!(reports[0].outcome(), ScrapeOutcome::Complete);
    let saved = tmp
        .path()
        .join(campaign_dir_name("BKB Primary"))
        .join("characters")
        .join("Hero_5_5.json");
    assert!(saved.is_file(), "missing {}", saved.display());
}

#[tokio::test(flavor = "multi_thread")]
async fn full_scrape_stops_on_rejected_bearer() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_campaign_list(&server).await;
    mount_campaign_page(&server, &[1]).await;
    Mock::given(method("GET"))
        .and(path("/character/v5/character/1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/campaigns/88"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(0)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let err = scrape_everything(&server, tmp.path().to_path_buf()).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::Unauthorized { .. })
    ));
}
