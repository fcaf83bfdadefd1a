//! GitHub Actions client tests against a mocked API

use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use buildboard::models::{ProviderIntegration, ProviderKind, RunOutcome};
use buildboard::services::providers::{GithubActionsClient, ProviderClient};

fn github_integration(endpoint: &str) -> ProviderIntegration {
    ProviderIntegration {
        id: Uuid::new_v4(),
        name: "mock github".to_string(),
        kind: ProviderKind::GithubActions,
        endpoint: endpoint.to_string(),
        username: None,
        token: Some("ghp_test".to_string()),
        is_active: true,
    }
}

fn workflow_listing() -> serde_json::Value {
    json!({
        "total_count": 1,
        "workflows": [
            {"id": 5, "name": "CI", "path": ".github/workflows/ci.yml", "state": "active"}
        ]
    })
}

/// Three completed runs with durations 30, 60 and 90 seconds; two succeed
fn sample_runs() -> serde_json::Value {
    json!({
        "workflow_runs": [
            {
                "id": 103, "name": "CI", "run_number": 12, "status": "completed",
                "conclusion": "success",
                "run_started_at": "2026-08-30T10:00:00Z", "updated_at": "2026-08-30T10:00:30Z",
                "html_url": "https://github.com/acme/svc/actions/runs/103"
            },
            {
                "id": 102, "name": "CI", "run_number": 11, "status": "completed",
                "conclusion": "failure",
                "run_started_at": "2026-08-30T09:00:00Z", "updated_at": "2026-08-30T09:01:00Z",
                "html_url": "https://github.com/acme/svc/actions/runs/102"
            },
            {
                "id": 101, "name": "CI", "run_number": 10, "status": "completed",
                "conclusion": "success",
                "run_started_at": "2026-08-30T08:00:00Z", "updated_at": "2026-08-30T08:01:30Z",
                "html_url": "https://github.com/acme/svc/actions/runs/101"
            }
        ]
    })
}

async fn mount_workflows(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/actions/workflows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(workflow_listing()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_target_summary_from_workflow_runs() {
    let server = MockServer::start().await;
    mount_workflows(&server).await;

    Mock::given(method("GET"))
        .and(path("/actions/workflows/5/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_runs()))
        .mount(&server)
        .await;

    let client = GithubActionsClient::new(&github_integration(&server.uri())).unwrap();
    let summary = client.target_summary("CI").await.unwrap();

    assert_eq!(summary.target, "CI");
    assert_eq!(summary.avg_duration_secs, Some(60));
    assert_eq!(summary.success_rate, Some(67));
    assert_eq!(summary.sampled_runs, 3);
    assert_eq!(summary.last_status.as_deref(), Some("success"));
}

#[tokio::test]
async fn test_target_summary_falls_back_to_repo_runs() {
    let server = MockServer::start().await;
    mount_workflows(&server).await;

    // Lookup by workflow id and by file path both come back empty
    Mock::given(method("GET"))
        .and(path("/actions/workflows/5/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"workflow_runs": []})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/actions/workflows/ci.yml/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"workflow_runs": []})))
        .mount(&server)
        .await;

    // Repo-wide list mixes in another workflow's run
    let mut mixed = sample_runs();
    mixed["workflow_runs"].as_array_mut().unwrap().push(json!({
        "id": 200, "name": "Release", "run_number": 3, "status": "completed",
        "conclusion": "failure",
        "run_started_at": "2026-08-30T07:00:00Z", "updated_at": "2026-08-30T07:05:00Z",
        "html_url": "https://github.com/acme/svc/actions/runs/200"
    }));
    Mock::given(method("GET"))
        .and(path("/actions/runs"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mixed))
        .mount(&server)
        .await;

    let client = GithubActionsClient::new(&github_integration(&server.uri())).unwrap();
    let summary = client.target_summary("CI").await.unwrap();

    // Only the three CI runs are sampled; the Release failure is excluded
    assert_eq!(summary.sampled_runs, 3);
    assert_eq!(summary.success_rate, Some(67));
}

#[tokio::test]
async fn test_latest_run_derives_duration() {
    let server = MockServer::start().await;
    mount_workflows(&server).await;

    Mock::given(method("GET"))
        .and(path("/actions/workflows/5/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_runs()))
        .mount(&server)
        .await;

    let client = GithubActionsClient::new(&github_integration(&server.uri())).unwrap();
    let run = client.latest_run("CI").await.unwrap().unwrap();

    assert_eq!(run.number, 12);
    assert_eq!(run.outcome, Some(RunOutcome::Success));
    assert_eq!(run.duration_secs, Some(30));
    assert_eq!(
        run.url.as_deref(),
        Some("https://github.com/acme/svc/actions/runs/103")
    );
}

#[tokio::test]
async fn test_unknown_workflow_has_no_runs() {
    let server = MockServer::start().await;
    mount_workflows(&server).await;

    let client = GithubActionsClient::new(&github_integration(&server.uri())).unwrap();
    assert!(client.latest_run("does-not-exist").await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_targets_returns_workflow_names() {
    let server = MockServer::start().await;
    mount_workflows(&server).await;

    let client = GithubActionsClient::new(&github_integration(&server.uri())).unwrap();
    assert_eq!(client.list_targets().await.unwrap(), vec!["CI".to_string()]);
}
