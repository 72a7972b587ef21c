//! Whole-pipeline tests over the in-process bus and the push endpoints.
//!
//! UPLOAD → INTAKE → RESOLVER → NOTIFIER → PERSISTER, all collaborators mocked.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use songsnap_bus::{LocalBus, MemoryPublisher, Publisher};
use songsnap_common::{decode_payload, NotificationResult, PushEnvelope, SongSnapError, Topics};
use songsnap_pipeline::server::{app, AppState};
use songsnap_pipeline::stages::TokenStore;
use songsnap_pipeline::storage::MemoryBlobStore;
use songsnap_pipeline::testing::{FixedTextDetector, RecordingSms, ScriptedCatalog};
use songsnap_pipeline::{PipelineDeps, PipelineRouter, PipelineSettings, Stage};
use tower::ServiceExt;

const DEFAULT_NUMBER: &str = "+15550001111";
const RADIO_TEXT: &str = "FM1\n97.3\nBoston (FM)\nMore Than a Feeling\nPresets";

struct Harness {
    pipeline: Arc<PipelineRouter>,
    sms: Arc<RecordingSms>,
    store: Arc<MemoryBlobStore>,
    catalog: Arc<ScriptedCatalog>,
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        topics: Topics::default(),
        result_bucket: "results".to_string(),
        default_to_number: DEFAULT_NUMBER.to_string(),
        unauthorized_retries: 1,
    }
}

fn harness(publisher: Arc<dyn Publisher>, catalog: ScriptedCatalog) -> Harness {
    harness_with_sms(publisher, catalog, RecordingSms::new())
}

fn harness_with_sms(
    publisher: Arc<dyn Publisher>,
    catalog: ScriptedCatalog,
    sms: RecordingSms,
) -> Harness {
    let sms = Arc::new(sms);
    let store = Arc::new(MemoryBlobStore::new());
    let catalog = Arc::new(catalog);
    let detector = Arc::new(
        FixedTextDetector::new()
            .on_image("12065551234.jpg", RADIO_TEXT)
            .on_image("photo.jpg", "FM2\n101.1\nPresets"),
    );

    let pipeline = Arc::new(PipelineRouter::new(
        settings(),
        PipelineDeps {
            publisher,
            detector,
            catalog: catalog.clone(),
            tokens: Arc::new(TokenStore::new()),
            sms: sms.clone(),
            store: store.clone(),
        },
    ));

    Harness {
        pipeline,
        sms,
        store,
        catalog,
    }
}

fn envelope(json: &str) -> PushEnvelope {
    PushEnvelope::wrap(json.as_bytes(), "test-message", "test-subscription")
}

fn upload(name: &str) -> PushEnvelope {
    envelope(&format!(r#"{{"bucket": "uploads", "name": "{name}"}}"#))
}

// ---------------------------------------------------------------------------
// End to end over LocalBus
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_flows_to_sms_and_result_object() {
    let bus = Arc::new(LocalBus::new());
    let h = harness(
        bus.clone(),
        ScriptedCatalog::new().finds("1QEEqeFIZktqIpPI4jSVSF", "More Than a Feeling"),
    );

    h.pipeline
        .deliver(Stage::Intake, &upload("12065551234.jpg"))
        .await
        .unwrap();
    let report = bus.drain(&*h.pipeline).await;

    assert_eq!(report.delivered, 3);
    assert_eq!(report.failed, 0);

    let sent = h.sms.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "+12065551234");
    assert_eq!(sent[0].body, "https://open.spotify.com/track/1QEEqeFIZktqIpPI4jSVSF");

    let stored = h.store.get("results", "12065551234.jpg.txt").unwrap();
    let result: NotificationResult = decode_payload(&stored).unwrap();
    assert_eq!(result.href, "https://open.spotify.com/track/1QEEqeFIZktqIpPI4jSVSF");
    assert_eq!(result.filename, "12065551234.jpg");

    assert_eq!(h.catalog.queries(), vec!["Boston More Than a Feeling".to_string()]);
}

#[tokio::test]
async fn unreadable_image_degrades_to_empty_link_at_default_number() {
    let bus = Arc::new(LocalBus::new());
    let h = harness(bus.clone(), ScriptedCatalog::new());

    h.pipeline
        .deliver(Stage::Intake, &upload("photo.jpg"))
        .await
        .unwrap();
    let report = bus.drain(&*h.pipeline).await;

    assert_eq!(report.delivered, 3);
    assert_eq!(h.catalog.search_calls(), 0);
    assert_eq!(h.sms.sent()[0].to, DEFAULT_NUMBER);
    assert_eq!(h.sms.sent()[0].body, "");

    let result: NotificationResult =
        decode_payload(&h.store.get("results", "photo.jpg.txt").unwrap()).unwrap();
    assert_eq!(result.href, "");
}

#[tokio::test]
async fn deletion_event_stops_the_pipeline() {
    let bus = Arc::new(LocalBus::new());
    let h = harness(bus.clone(), ScriptedCatalog::new());

    let deletion = envelope(r#"{"bucket": "uploads", "name": "12065551234.jpg", "resourceState": "not_exists"}"#);
    h.pipeline.deliver(Stage::Intake, &deletion).await.unwrap();

    assert_eq!(bus.pending().await, 0);
    assert!(h.sms.sent().is_empty());
    assert!(h.store.is_empty());
}

// ---------------------------------------------------------------------------
// Validation: a missing required field fails the stage and publishes nothing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_required_fields_fail_without_side_effects() {
    let cases: &[(Stage, &str, &str)] = &[
        (Stage::Intake, r#"{"name": "a.jpg"}"#, "bucket"),
        (Stage::Intake, r#"{"bucket": "uploads"}"#, "name"),
        (Stage::Resolver, r#"{"band": "Boston", "song": "Foreplay"}"#, "filename"),
        (Stage::Notifier, r#"{"filename": "a.jpg"}"#, "href"),
        (Stage::Notifier, r#"{"href": ""}"#, "filename"),
        (Stage::Persister, r#"{"filename": "a.jpg"}"#, "href"),
        (Stage::Persister, r#"{"href": "https://open.spotify.com/track/x"}"#, "filename"),
    ];

    for (stage, json, field) in cases {
        let publisher = Arc::new(MemoryPublisher::new());
        let h = harness(publisher.clone(), ScriptedCatalog::new().always_finds("x", "X"));

        let err = h.pipeline.deliver(*stage, &envelope(json)).await.unwrap_err();

        match err {
            SongSnapError::Validation(e) => assert_eq!(e.field, *field, "{stage} {json}"),
            other => panic!("{stage} {json}: expected validation error, got {other:?}"),
        }
        assert_eq!(publisher.count(), 0, "{stage} published despite invalid payload");
        assert!(h.sms.sent().is_empty());
        assert!(h.store.is_empty());
        assert_eq!(h.catalog.authorize_calls(), 0);
    }
}

#[tokio::test]
async fn router_rejects_unknown_topic() {
    let bus = Arc::new(LocalBus::new());
    let h = harness(bus.clone(), ScriptedCatalog::new());

    bus.publish("mysteryTopic", br#"{"filename": "a.jpg"}"#.to_vec())
        .await
        .unwrap();
    let report = bus.drain(&*h.pipeline).await;

    assert_eq!(report.failed, 1);
    assert_eq!(h.pipeline.stage_for_topic("getSongInfoTopic"), Some(Stage::Resolver));
    assert_eq!(h.pipeline.stage_for_topic("mysteryTopic"), None);
}

// ---------------------------------------------------------------------------
// Push endpoints
// ---------------------------------------------------------------------------

fn push_request(path: &str, envelope: &PushEnvelope) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(envelope).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn push_endpoint_status_codes() {
    let publisher = Arc::new(MemoryPublisher::new());
    let h = harness(publisher.clone(), ScriptedCatalog::new());
    let router = app(Arc::new(AppState {
        pipeline: h.pipeline.clone(),
    }));

    let ok = router
        .clone()
        .oneshot(push_request(
            "/push/result",
            &envelope(r#"{"href": "", "filename": "a.jpg"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::NO_CONTENT);
    assert!(h.store.get("results", "a.jpg.txt").is_some());

    let invalid = router
        .clone()
        .oneshot(push_request("/push/send-sms", &envelope(r#"{"href": ""}"#)))
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    // OCR has nothing registered for this image: collaborator failure.
    let failed = router
        .clone()
        .oneshot(push_request("/push/intake", &upload("unknown.jpg")))
        .await
        .unwrap();
    assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let health = router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    assert_eq!(publisher.count(), 0);
}

#[tokio::test]
async fn rejected_empty_sms_is_a_server_error_and_nothing_is_persisted() {
    let publisher = Arc::new(MemoryPublisher::new());
    let h = harness_with_sms(
        publisher.clone(),
        ScriptedCatalog::new(),
        RecordingSms::rejecting_empty_body(),
    );
    let router = app(Arc::new(AppState {
        pipeline: h.pipeline.clone(),
    }));

    // Degraded track: the push is answered 500, so Pub/Sub keeps redelivering it.
    for _ in 0..2 {
        let resp = router
            .clone()
            .oneshot(push_request(
                "/push/send-sms",
                &envelope(r#"{"href": "", "filename": "photo.jpg"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    assert!(h.sms.sent().is_empty());
    assert_eq!(publisher.count(), 0);
    assert!(h.store.is_empty());
}
