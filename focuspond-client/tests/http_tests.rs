use focuspond_client::{ClientConfig, ClientError, HttpResourceClient, RemoteResources};
use focuspond_types::{AccountId, CreatureId, Currency, Operation, OwnedCreature};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ALICE: Option<AccountId> = Some(AccountId::new(7));

fn client_for(server: &MockServer) -> HttpResourceClient {
    HttpResourceClient::new(ClientConfig::with_base_url(server.uri())).unwrap()
}

// ── Config ───────────────────────────────────────────────────────

#[test]
fn config_defaults() {
    let cfg = ClientConfig::default();
    assert_eq!(cfg.base_url, "http://localhost:8000/api");
    assert_eq!(cfg.timeout_secs, 10);
    assert_eq!(cfg.timeout(), Duration::from_secs(10));
    assert_eq!(cfg.account_header, "X-User-Id");
}

#[test]
fn config_serde_roundtrip() {
    let cfg = ClientConfig::with_base_url("https://pond.example/api");
    let json = serde_json::to_string(&cfg).unwrap();
    let back: ClientConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cfg);
}

// ── Reads ────────────────────────────────────────────────────────

#[tokio::test]
async fn get_currency_sends_account_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/currency"))
        .and(header("X-User-Id", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "amount": 320})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.get_currency(ALICE).await.unwrap(), Currency::new(320));
}

#[tokio::test]
async fn get_owned_creatures_decodes_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/owned-fish"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"fish_id": 3, "quantity": 1, "time_studied": 25, "total_time_needed": 180}
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let owned = client.get_owned_creatures(ALICE).await.unwrap();
    assert_eq!(
        owned,
        vec![OwnedCreature {
            creature_id: CreatureId::new(3),
            quantity: 1,
            minutes_studied: 25,
            minutes_required: 180,
        }]
    );
}

#[tokio::test]
async fn get_pond_and_images() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pond-fish"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 4, "fish_id": 1}])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fish-images"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "egg_url": "e", "fry_url": "f", "fish_url": "a"}
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.get_pond_creatures(None).await.unwrap()[0].id, 4);
    assert_eq!(client.get_creature_images(None).await.unwrap()[0].adult_url, "a");
}

#[tokio::test]
async fn anonymous_calls_omit_account_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/currency"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"amount": 0})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.get_currency(None).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("x-user-id"));
}

#[tokio::test]
async fn malformed_body_is_a_serialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/currency"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).get_currency(ALICE).await.unwrap_err();
    assert!(matches!(err, ClientError::Serialization(_)));
    assert!(!err.is_transient());
}

// ── Writes ───────────────────────────────────────────────────────

#[tokio::test]
async fn set_currency_puts_amount() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/currency"))
        .and(body_json(json!({"amount": 90})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    tokio_test::assert_ok!(client_for(&server).set_currency(ALICE, 90).await);
}

#[tokio::test]
async fn apply_routes_each_operation() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/currency"))
        .and(body_json(json!({"amount": 5})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/owned-fish"))
        .and(body_json(json!({"fish_id": 5})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/owned-fish/3/study-time"))
        .and(body_json(json!({"minutes": 25})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/owned-fish/5"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/pond-fish"))
        .and(body_json(json!({"fish_id": 2})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let ops = [
        Operation::UpdateCurrency { amount: 5 },
        Operation::AddOwnedCreature {
            creature_id: CreatureId::new(5),
        },
        Operation::AddStudyMinutes {
            creature_id: CreatureId::new(3),
            minutes: 25,
        },
        Operation::ResetCreatureProgress {
            creature_id: CreatureId::new(5),
        },
        Operation::AddCreatureToPond {
            creature_id: CreatureId::new(2),
        },
    ];
    for op in &ops {
        client.apply(ALICE, op).await.unwrap();
    }
}

// ── Failures ─────────────────────────────────────────────────────

#[tokio::test]
async fn non_success_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/owned-fish"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .add_owned_creature(ALICE, CreatureId::new(1))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(err.is_transient());
    assert!(err.to_string().contains("maintenance"));
}

#[tokio::test]
async fn client_errors_are_not_transient() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/owned-fish/9"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .reset_progress(ALICE, CreatureId::new(9))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/currency"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"amount": 1}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = ClientConfig {
        timeout_secs: 1,
        ..ClientConfig::with_base_url(server.uri())
    };
    let client = HttpResourceClient::new(config).unwrap();
    let err = client.get_currency(ALICE).await.unwrap_err();
    assert!(err.is_timeout());
    assert!(err.is_transient());
}

#[tokio::test]
async fn unreachable_host_is_transient() {
    // Nothing listens on the discard port.
    let client = HttpResourceClient::new(ClientConfig::with_base_url("http://127.0.0.1:9/api")).unwrap();
    let err = client.set_currency(ALICE, 1).await.unwrap_err();
    assert!(matches!(err, ClientError::Http(_)));
    assert!(err.is_transient());
}

// ── Health ───────────────────────────────────────────────────────

#[tokio::test]
async fn health_ok_on_200() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    tokio_test::assert_ok!(client_for(&server).check_health().await);
}

#[tokio::test]
async fn health_fails_on_other_success_codes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let err = tokio_test::assert_err!(client_for(&server).check_health().await);
    assert_eq!(err.status(), Some(204));
}

#[tokio::test]
async fn base_url_trailing_slash_is_tolerated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client =
        HttpResourceClient::new(ClientConfig::with_base_url(format!("{}/", server.uri()))).unwrap();
    client.check_health().await.unwrap();
}
