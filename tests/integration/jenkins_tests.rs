//! Jenkins client tests against a mocked server

use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use buildboard::models::{ProviderIntegration, ProviderKind, RunOutcome, RunStatus};
use buildboard::services::providers::{JenkinsClient, ProviderClient};
use buildboard::utils::AppError;

fn jenkins_integration(endpoint: &str) -> ProviderIntegration {
    ProviderIntegration {
        id: Uuid::new_v4(),
        name: "mock jenkins".to_string(),
        kind: ProviderKind::Jenkins,
        endpoint: endpoint.to_string(),
        username: None,
        token: None,
        is_active: true,
    }
}

#[tokio::test]
async fn test_list_targets_flattens_folders() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobs": [
                {"name": "A", "_class": "com.cloudbees.hudson.plugins.folder.Folder"}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/job/A/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobs": [
                {"name": "B", "_class": "jenkins.branch.MultiBranchProject"},
                {"name": "job2", "_class": "hudson.model.FreeStyleProject"}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/job/A/job/B/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobs": [
                {"name": "job1", "_class": "org.jenkinsci.plugins.workflow.job.WorkflowJob"}
            ]
        })))
        .mount(&server)
        .await;

    let client = JenkinsClient::new(&jenkins_integration(&server.uri())).unwrap();
    let targets = client.list_targets().await.unwrap();

    assert_eq!(targets, vec!["A/B/job1".to_string(), "A/job2".to_string()]);
}

#[tokio::test]
async fn test_latest_run_maps_last_build() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/job/svc-ci/api/json"))
        .and(query_param(
            "tree",
            "lastBuild[number,building,result,timestamp,duration,url]",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lastBuild": {
                "number": 42,
                "building": false,
                "result": "FAILURE",
                "timestamp": 1_714_560_000_000i64,
                "duration": 95_000,
                "url": "http://internal:8080/job/svc-ci/42/"
            }
        })))
        .mount(&server)
        .await;

    let client = JenkinsClient::new(&jenkins_integration(&server.uri())).unwrap();
    let run = client.latest_run("svc-ci").await.unwrap().unwrap();

    assert_eq!(run.number, 42);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.outcome, Some(RunOutcome::Failure));
    assert_eq!(run.duration_secs, Some(95));
    // Upstream link is rewritten onto the configured endpoint
    assert!(run.url.unwrap().starts_with(&server.uri()));
}

#[tokio::test]
async fn test_latest_run_without_builds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/job/new-job/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"lastBuild": null})))
        .mount(&server)
        .await;

    let client = JenkinsClient::new(&jenkins_integration(&server.uri())).unwrap();
    assert!(client.latest_run("new-job").await.unwrap().is_none());
}

#[tokio::test]
async fn test_upstream_error_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/job/broken/api/json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = JenkinsClient::new(&jenkins_integration(&server.uri())).unwrap();
    let err = client.latest_run("broken").await.unwrap_err();
    assert!(matches!(err, AppError::Upstream(_)));
}

#[tokio::test]
async fn test_log_text_fetches_console() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/job/svc-ci/42/consoleText"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Started by timer\nFinished: FAILURE\n"))
        .mount(&server)
        .await;

    let client = JenkinsClient::new(&jenkins_integration(&server.uri())).unwrap();
    let log = client.log_text("svc-ci", 42).await.unwrap();
    assert!(log.contains("Finished: FAILURE"));
}
