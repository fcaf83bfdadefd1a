//! End-to-end engine tests: mocked Jenkins plus mocked webhook receiver

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use buildboard::config::AlertingConfig;
use buildboard::db::NotificationHistoryRepository;
use buildboard::models::NotificationStatus;
use buildboard::services::{AlertEngine, NotificationDispatcher};

use crate::common::test_app::{seed_alert, seed_integration, test_pool};

fn engine(pool: &buildboard::db::DbPool) -> AlertEngine {
    AlertEngine::new(
        pool.clone(),
        AlertingConfig::default(),
        Arc::new(NotificationDispatcher::new(None)),
    )
}

/// Mount a Jenkins lastBuild response for one job
async fn mount_last_build(server: &MockServer, job: &str, result: &str, minutes_ago: i64) {
    let timestamp = (Utc::now() - Duration::minutes(minutes_ago)).timestamp_millis();
    Mock::given(method("GET"))
        .and(path(format!("/job/{}/api/json", job)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lastBuild": {
                "number": 42,
                "building": false,
                "result": result,
                "timestamp": timestamp,
                "duration": 95_000,
                "url": format!("http://internal:8080/job/{}/42/", job)
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_failure_alert_sends_once_then_dedups() {
    let jenkins = MockServer::start().await;
    let receiver = MockServer::start().await;

    mount_last_build(&jenkins, "svc-ci", "FAILURE", 10).await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&receiver)
        .await;

    let pool = test_pool().await;
    seed_integration(&pool, "jenkins", "jenkins", &jenkins.uri()).await;
    let alert_id = seed_alert(
        &pool,
        "main failures",
        json!({"event": "FAILURE", "recent_minutes": 60, "target": "svc-ci"}),
        json!({"webhook": {"url": format!("{}/hook", receiver.uri())}}),
        true,
    )
    .await;

    let engine = engine(&pool);

    let first = engine.evaluate_all().await.unwrap();
    assert_eq!(first.alerts_evaluated, 1);
    assert_eq!(first.notifications_sent, 1);
    assert_eq!(first.results[0].matched, 1);
    assert_eq!(first.results[0].notified, 1);

    let history = NotificationHistoryRepository::new(&pool);
    let events = history.recent(10).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].alert_id, alert_id);
    assert_eq!(events[0].status, NotificationStatus::Sent);
    assert_eq!(events[0].message, "svc-ci #42 failure");
    assert_eq!(events[0].run_number, Some(42));

    // Second pass matches the same run but is suppressed by the window
    let second = engine.evaluate_all().await.unwrap();
    assert_eq!(second.results[0].matched, 1);
    assert_eq!(second.notifications_sent, 0);
    assert_eq!(history.recent(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_inactive_alert_polls_nothing() {
    let jenkins = MockServer::start().await;

    // No provider call may happen for an inactive alert
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&jenkins)
        .await;

    let pool = test_pool().await;
    seed_integration(&pool, "jenkins", "jenkins", &jenkins.uri()).await;
    seed_alert(
        &pool,
        "disabled",
        json!({"event": "FAILURE", "target": "svc-ci"}),
        json!({"webhook": {"url": "https://chat.example.com/hook"}}),
        false,
    )
    .await;

    let summary = engine(&pool).evaluate_all().await.unwrap();
    assert_eq!(summary.alerts_evaluated, 0);
    assert_eq!(summary.notifications_sent, 0);
}

#[tokio::test]
async fn test_stale_run_outside_window_is_ignored() {
    let jenkins = MockServer::start().await;
    mount_last_build(&jenkins, "svc-ci", "FAILURE", 120).await;

    let pool = test_pool().await;
    seed_integration(&pool, "jenkins", "jenkins", &jenkins.uri()).await;
    seed_alert(
        &pool,
        "main failures",
        json!({"event": "FAILURE", "recent_minutes": 60, "target": "svc-ci"}),
        json!({"webhook": {"url": "https://chat.example.com/hook"}}),
        true,
    )
    .await;

    let summary = engine(&pool).evaluate_all().await.unwrap();
    assert_eq!(summary.results[0].matched, 0);
    assert!(NotificationHistoryRepository::new(&pool)
        .recent(10)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_success_event_does_not_match_failure_run() {
    let jenkins = MockServer::start().await;
    mount_last_build(&jenkins, "svc-ci", "FAILURE", 5).await;

    let pool = test_pool().await;
    seed_integration(&pool, "jenkins", "jenkins", &jenkins.uri()).await;
    seed_alert(
        &pool,
        "green builds",
        json!({"event": "SUCCESS", "recent_minutes": 60, "target": "svc-ci"}),
        json!({"webhook": {"url": "https://chat.example.com/hook"}}),
        true,
    )
    .await;

    let summary = engine(&pool).evaluate_all().await.unwrap();
    assert_eq!(summary.results[0].matched, 0);
}

#[tokio::test]
async fn test_failed_delivery_is_recorded_and_retried() {
    let jenkins = MockServer::start().await;
    let receiver = MockServer::start().await;

    mount_last_build(&jenkins, "svc-ci", "FAILURE", 10).await;
    // The receiver rejects every delivery; each pass retries because a
    // failed event does not count against the dedup window
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&receiver)
        .await;

    let pool = test_pool().await;
    seed_integration(&pool, "jenkins", "jenkins", &jenkins.uri()).await;
    seed_alert(
        &pool,
        "main failures",
        json!({"event": "FAILURE", "recent_minutes": 60, "target": "svc-ci"}),
        json!({"webhook": {"url": format!("{}/hook", receiver.uri())}}),
        true,
    )
    .await;

    let engine = engine(&pool);
    let history = NotificationHistoryRepository::new(&pool);

    let first = engine.evaluate_all().await.unwrap();
    assert_eq!(first.notifications_sent, 0);
    let events = history.recent(10).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, NotificationStatus::Failed);
    assert!(events[0].error.as_deref().unwrap().contains("webhook"));

    let second = engine.evaluate_all().await.unwrap();
    assert_eq!(second.notifications_sent, 0);
    assert_eq!(history.recent(10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_unreachable_integration_does_not_fail_the_pass() {
    let pool = test_pool().await;
    // Port 1 refuses connections
    seed_integration(&pool, "gone jenkins", "jenkins", "http://127.0.0.1:1").await;
    seed_alert(
        &pool,
        "main failures",
        json!({"event": "FAILURE", "recent_minutes": 60, "target": "svc-ci"}),
        json!({"webhook": {"url": "https://chat.example.com/hook"}}),
        true,
    )
    .await;

    let summary = engine(&pool).evaluate_all().await.unwrap();
    assert_eq!(summary.alerts_evaluated, 1);
    assert!(summary.results[0].error.is_none());
    assert_eq!(summary.results[0].matched, 0);
}
