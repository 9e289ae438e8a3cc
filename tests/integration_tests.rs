//! Integration tests using a mock HTTP server
//!
//! Exercises the full flow: OData paging over HTTP, schema negotiation,
//! estimation, and both sinks.

use bionet_sync::config::Profile;
use bionet_sync::engine::{SyncEngine, SyncOptions};
use bionet_sync::error::Error;
use bionet_sync::estimate::estimate_unique_count;
use bionet_sync::http::{HttpClient, HttpClientConfig};
use bionet_sync::pager::{HttpPageFetcher, Pager, PagerConfig, StopReason};
use bionet_sync::query::{FieldSet, FilterExpression};
use bionet_sync::sink::{HostedTableConfig, HostedTableSink, RecordSink, TableSink};
use bionet_sync::types::{Credentials, FaunaGroup};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn quiet_client() -> HttpClient {
    let config = HttpClientConfig::builder()
        .max_retries(0)
        .no_rate_limit()
        .build();
    HttpClient::with_config(config)
}

fn sighting(name: &str, class: &str) -> serde_json::Value {
    json!({
        "ScientificName": name,
        "CommonName": format!("common {name}"),
        "Class": class,
        "BCActStatus": "Not Listed",
        "EPBCActStatus": null,
        "SightingDate": "2023-05-14T10:30:00"
    })
}

// ============================================================================
// Paging over HTTP
// ============================================================================

#[tokio::test]
async fn test_offset_paging_deduplicates_across_pages() {
    let server = MockServer::start().await;

    // second page, selected by $skip
    Mock::given(method("GET"))
        .and(path("/odata"))
        .and(query_param("$skip", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [sighting("Canis lupus", "Mammalia")]
        })))
        .with_priority(1)
        .mount(&server)
        .await;

    // first page: a full page with a case-variant duplicate
    Mock::given(method("GET"))
        .and(path("/odata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                sighting("Vulpes vulpes", "Mammalia"),
                sighting("VULPES VULPES", "Mammalia")
            ]
        })))
        .mount(&server)
        .await;

    let client = quiet_client();
    let filter = FilterExpression::for_group(FaunaGroup::Mammals);
    let fetcher = HttpPageFetcher::new(&client, format!("{}/odata", server.uri()), filter);
    let config = PagerConfig::new().with_page_size(2);
    let outcome = Pager::new(config, FieldSet::default()).run(&fetcher).await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.stop, StopReason::SourceExhausted);
    assert_eq!(outcome.unique, 2);
    assert_eq!(outcome.raw_rows, 3);
    assert_eq!(
        outcome.records[0].get("ScientificName").unwrap(),
        "Canis lupus"
    );
    assert_eq!(
        outcome.records[1].get("ScientificName").unwrap(),
        "Vulpes vulpes"
    );
}

#[tokio::test]
async fn test_continuation_link_is_followed_verbatim() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/odata"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [sighting("Canis lupus", "Mammalia")]
        })))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/odata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "@odata.nextLink": format!("{}/odata?page=2", server.uri()),
            "value": [
                sighting("Vulpes vulpes", "Mammalia"),
                sighting("Petaurus breviceps", "Mammalia")
            ]
        })))
        .mount(&server)
        .await;

    let client = quiet_client();
    let filter = FilterExpression::for_group(FaunaGroup::Mammals);
    let fetcher = HttpPageFetcher::new(&client, format!("{}/odata", server.uri()), filter);
    let config = PagerConfig::new().with_page_size(2);
    let outcome = Pager::new(config, FieldSet::default()).run(&fetcher).await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.unique, 3);
    assert_eq!(outcome.pages, 2);
}

// ============================================================================
// Schema negotiation over HTTP
// ============================================================================

#[tokio::test]
async fn test_rejected_select_field_is_negotiated_away() {
    let server = MockServer::start().await;

    // the server rejects any $select mentioning Foo
    Mock::given(method("GET"))
        .and(path("/odata"))
        .and(query_param("$select", "ScientificName,Foo"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": "400",
                "message": "Could not find a property named 'Foo' on type 'CoreData'."
            }
        })))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/odata"))
        .and(query_param("$select", "ScientificName"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [sighting("Vulpes vulpes", "Mammalia")]
        })))
        .mount(&server)
        .await;

    let client = quiet_client();
    let filter = FilterExpression::for_group(FaunaGroup::Mammals);
    let fetcher = HttpPageFetcher::new(&client, format!("{}/odata", server.uri()), filter);
    let fields = FieldSet::new(["ScientificName", "Foo"]).unwrap();
    let outcome = Pager::new(PagerConfig::new(), fields).run(&fetcher).await;

    assert!(outcome.is_complete());
    assert_eq!(outcome.unique, 1);
    assert_eq!(outcome.pages, 1);
}

// ============================================================================
// Estimation
// ============================================================================

#[tokio::test]
async fn test_estimator_reads_inline_count() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/odata"))
        .and(query_param("$apply", "groupby((ScientificName))"))
        .and(query_param("$count", "true"))
        .and(query_param("$top", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "@odata.count": 917,
            "value": []
        })))
        .mount(&server)
        .await;

    let client = quiet_client();
    let filter = FilterExpression::for_group(FaunaGroup::Birds);
    let count =
        estimate_unique_count(&client, &format!("{}/odata", server.uri()), &filter).await;
    assert_eq!(count, Some(917));
}

#[tokio::test]
async fn test_estimator_degrades_to_none_on_unsupported_apply() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/odata"))
        .respond_with(ResponseTemplate::new(501).set_body_string("apply not supported"))
        .mount(&server)
        .await;

    let client = quiet_client();
    let filter = FilterExpression::for_group(FaunaGroup::Birds);
    let count =
        estimate_unique_count(&client, &format!("{}/odata", server.uri()), &filter).await;
    assert_eq!(count, None);
}

#[tokio::test]
async fn test_known_target_prevents_extra_page_fetches() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/odata"))
        .and(query_param("$apply", "groupby((ScientificName))"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "@odata.count": 2,
            "value": []
        })))
        .with_priority(1)
        .mount(&server)
        .await;

    // a full page that satisfies the target; nothing further may be requested
    Mock::given(method("GET"))
        .and(path("/odata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                sighting("Vulpes vulpes", "Mammalia"),
                sighting("Canis lupus", "Mammalia")
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = format!("{}/odata", server.uri());
    let options = SyncOptions {
        endpoint,
        group: FaunaGroup::Mammals,
        pager: PagerConfig::new().with_page_size(2),
        estimate: true,
        ..SyncOptions::default()
    };
    let engine = SyncEngine::new(quiet_client(), options);

    let dir = tempfile::tempdir().unwrap();
    let sink = TableSink::new(dir.path().join("species.csv"));
    let report = engine.run(&sink).await;

    assert!(report.is_success());
    assert_eq!(report.stats.unique_records, 2);
    assert_eq!(report.stats.pages_fetched, 1);
}

// ============================================================================
// End-to-end fetch to CSV
// ============================================================================

#[tokio::test]
async fn test_fetch_pipeline_writes_ordered_csv() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/odata"))
        .and(query_param("$filter", "Class eq 'Mammalia'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                sighting("Vulpes vulpes", "Mammalia"),
                sighting("Canis lupus", "Mammalia")
            ]
        })))
        .mount(&server)
        .await;

    let options = SyncOptions {
        endpoint: format!("{}/odata", server.uri()),
        group: FaunaGroup::Mammals,
        estimate: false,
        ..SyncOptions::default()
    };
    let engine = SyncEngine::new(quiet_client(), options);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mammals.csv");
    let report = engine.run(&TableSink::new(&path)).await;

    assert!(report.is_success());
    assert_eq!(report.stats.rows_written, 2);

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert!(lines[0].starts_with("ScientificName,"));
    assert!(lines[1].starts_with("Canis lupus,"));
    assert!(lines[2].starts_with("Vulpes vulpes,"));
}

// ============================================================================
// Transport behavior
// ============================================================================

#[tokio::test]
async fn test_auth_failure_gets_its_own_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/odata"))
        .respond_with(ResponseTemplate::new(401).set_body_string("credentials rejected"))
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .max_retries(0)
        .no_rate_limit()
        .build();
    let client =
        HttpClient::with_credentials(config, Credentials::new("licensed", "wrong-password"));
    let result = client.get(&format!("{}/odata", server.uri())).await;

    assert!(matches!(
        result,
        Err(Error::Unauthorized { status: 401, .. })
    ));
}

#[tokio::test]
async fn test_server_hiccup_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/odata"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/odata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .max_retries(2)
        .backoff(
            bionet_sync::types::BackoffType::Constant,
            std::time::Duration::from_millis(1),
            std::time::Duration::from_millis(10),
        )
        .no_rate_limit()
        .build();
    let client = HttpClient::with_config(config);
    let response = client.get(&format!("{}/odata", server.uri())).await;

    assert!(response.is_ok());
}

// ============================================================================
// Hosted table sink
// ============================================================================

fn hosted_records(count: usize) -> Vec<bionet_sync::types::JsonObject> {
    (0..count)
        .map(|i| {
            sighting(&format!("Species {i}"), "Mammalia")
                .as_object()
                .unwrap()
                .clone()
        })
        .collect()
}

#[tokio::test]
async fn test_hosted_sync_creates_absent_table_from_csv() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tables/fauna_species"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/tables"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "name": "fauna_species" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = quiet_client();
    let config = HostedTableConfig::new(server.uri(), "fauna_species").with_maintenance(false);
    let sink = HostedTableSink::new(&client, config);

    let report = sink.deliver(&hosted_records(3)).await.unwrap();
    assert_eq!(report.rows_written, 3);
    assert!(report.destination.ends_with("/tables/fauna_species"));
}

#[tokio::test]
async fn test_hosted_sync_truncates_and_appends_in_batches() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tables/fauna_species"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "fields": [] })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/tables/fauna_species/truncate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    // five records at batch size two means three append calls
    Mock::given(method("POST"))
        .and(path("/tables/fauna_species/records"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let client = quiet_client();
    let config = HostedTableConfig::new(server.uri(), "fauna_species")
        .with_batch_size(2)
        .with_maintenance(false);
    let sink = HostedTableSink::new(&client, config);

    let report = sink.deliver(&hosted_records(5)).await.unwrap();
    assert_eq!(report.rows_written, 5);
}

#[tokio::test]
async fn test_hosted_sync_falls_back_to_delete_all() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tables/fauna_species"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "fields": [] })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/tables/fauna_species/truncate"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/tables/fauna_species/records/delete"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/tables/fauna_species/records"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = quiet_client();
    let config = HostedTableConfig::new(server.uri(), "fauna_species").with_maintenance(false);
    let sink = HostedTableSink::new(&client, config);

    let report = sink.deliver(&hosted_records(1)).await.unwrap();
    assert_eq!(report.rows_written, 1);
}

// ============================================================================
// Profiles
// ============================================================================

#[test]
fn test_profile_round_trip_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profile.yaml");
    std::fs::write(&path, "group: reptiles\npage_size: 50\n").unwrap();

    let profile = Profile::load(&path).unwrap();
    assert_eq!(profile.group, FaunaGroup::Reptiles);
    assert_eq!(profile.page_size, 50);
}
