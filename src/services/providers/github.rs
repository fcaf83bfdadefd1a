//! GitHub Actions client
//!
//! Speaks the GitHub REST API for one repository. Workflows and runs are
//! fetched via paginated listing; run duration is derived from timestamps
//! since the API does not supply it directly. Run lookup by workflow id is
//! sometimes empty upstream, so summary statistics fall back to lookup by
//! workflow path and finally to filtering a repo-wide run list by the
//! workflow's display name.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::models::{
    ProviderIntegration, ProviderKind, RunOutcome, RunRecord, RunStatus, TargetSummary,
};
use crate::services::providers::{require_endpoint, summarize_runs, ProviderClient};
use crate::utils::{AppError, AppResult};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const PAGE_SIZE: u32 = 100;

/// GitHub Actions API client for one repository integration
#[derive(Debug)]
pub struct GithubActionsClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Clone, Deserialize)]
struct Workflow {
    id: i64,
    name: String,
    path: String,
}

#[derive(Debug, Deserialize)]
struct WorkflowListing {
    #[serde(default)]
    workflows: Vec<Workflow>,
}

#[derive(Debug, Clone, Deserialize)]
struct WorkflowRun {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    display_title: Option<String>,
    run_number: i64,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    conclusion: Option<String>,
    #[serde(default)]
    run_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunListing {
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Deserialize)]
struct JobsListing {
    #[serde(default)]
    jobs: Vec<WorkflowJob>,
}

#[derive(Debug, Deserialize)]
struct WorkflowJob {
    id: i64,
    #[serde(default)]
    name: Option<String>,
}

impl GithubActionsClient {
    /// Create a client from a resolved integration
    ///
    /// The endpoint is the repository API base, e.g.
    /// `https://api.github.com/repos/acme/svc-ci`.
    pub fn new(integration: &ProviderIntegration) -> AppResult<Self> {
        let endpoint = require_endpoint(integration)?;
        let base_url = Url::parse(endpoint).map_err(|e| {
            AppError::NotConfigured(format!(
                "integration '{}' endpoint is not a valid URL: {}",
                integration.name, e
            ))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("buildboard/", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(ref token) = integration.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                AppError::NotConfigured(format!(
                    "integration '{}' token contains invalid characters",
                    integration.name
                ))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        // Redirects are handled manually: job log responses point at a
        // temporary signed URL that must be fetched without auth headers.
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .default_headers(headers)
            .build()
            .unwrap_or_default();

        Ok(Self { client, base_url })
    }

    fn api_url(&self, tail: &[&str], query: &[(&str, String)]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| AppError::NotConfigured("endpoint URL cannot be a base".to_string()))?;
            segments.pop_if_empty();
            for part in tail {
                segments.push(part);
            }
        }
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> AppResult<T> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("GitHub request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "GitHub returned {} for {}",
                response.status(),
                url.path()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid GitHub response: {}", e)))
    }

    /// Fetch every workflow of the repository, following pagination
    async fn list_workflows(&self) -> AppResult<Vec<Workflow>> {
        let mut workflows = Vec::new();
        let mut page = 1u32;

        loop {
            let url = self.api_url(
                &["actions", "workflows"],
                &[
                    ("per_page", PAGE_SIZE.to_string()),
                    ("page", page.to_string()),
                ],
            )?;
            let listing: WorkflowListing = self.get_json(url).await?;
            let fetched = listing.workflows.len();
            workflows.extend(listing.workflows);

            if fetched < PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }

        Ok(workflows)
    }

    async fn find_workflow(&self, target: &str) -> AppResult<Option<Workflow>> {
        let workflows = self.list_workflows().await?;
        Ok(workflows
            .into_iter()
            .find(|w| w.name == target || w.path.ends_with(target)))
    }

    async fn runs_for_workflow_ref(&self, workflow_ref: &str, limit: u32) -> AppResult<Vec<WorkflowRun>> {
        let url = self.api_url(
            &["actions", "workflows", workflow_ref, "runs"],
            &[("per_page", limit.to_string())],
        )?;
        let listing: RunListing = self.get_json(url).await?;
        Ok(listing.workflow_runs)
    }

    async fn repo_runs(&self, limit: u32) -> AppResult<Vec<WorkflowRun>> {
        let url = self.api_url(
            &["actions", "runs"],
            &[("per_page", limit.to_string())],
        )?;
        let listing: RunListing = self.get_json(url).await?;
        Ok(listing.workflow_runs)
    }

    /// Resolve a workflow's runs with the three-tier fallback: by id, then
    /// by workflow file path, then from the repo-wide run list filtered by
    /// display-name substring.
    async fn resolve_runs(&self, workflow: &Workflow, limit: u32) -> AppResult<Vec<WorkflowRun>> {
        let by_id = self
            .runs_for_workflow_ref(&workflow.id.to_string(), limit)
            .await?;
        if !by_id.is_empty() {
            return Ok(by_id);
        }

        let file_name = workflow
            .path
            .rsplit('/')
            .next()
            .unwrap_or(workflow.path.as_str());
        let by_path = self.runs_for_workflow_ref(file_name, limit).await?;
        if !by_path.is_empty() {
            return Ok(by_path);
        }

        let all = self.repo_runs(PAGE_SIZE).await?;
        let mut filtered: Vec<WorkflowRun> = all
            .into_iter()
            .filter(|run| {
                run.name
                    .as_deref()
                    .map(|n| n.contains(&workflow.name))
                    .unwrap_or(false)
                    || run
                        .display_title
                        .as_deref()
                        .map(|t| t.contains(&workflow.name))
                        .unwrap_or(false)
            })
            .collect();
        filtered.truncate(limit as usize);
        Ok(filtered)
    }

    fn run_to_record(target: &str, run: WorkflowRun) -> RunRecord {
        let (status, outcome) = match run.status.as_deref() {
            Some("completed") => {
                let outcome = match run.conclusion.as_deref() {
                    Some("success") => RunOutcome::Success,
                    Some("failure") | Some("timed_out") | Some("startup_failure") => {
                        RunOutcome::Failure
                    }
                    Some("cancelled") => RunOutcome::Cancelled,
                    _ => RunOutcome::Unknown,
                };
                (RunStatus::Completed, Some(outcome))
            }
            Some("queued") => (RunStatus::Queued, None),
            _ => (RunStatus::InProgress, None),
        };

        let started_at = run.run_started_at.or(run.created_at);

        // The API carries no duration field; derive it from timestamps
        // once the run has completed.
        let duration_secs = match (status, started_at, run.updated_at) {
            (RunStatus::Completed, Some(start), Some(end)) if end >= start => {
                Some((end - start).num_seconds())
            }
            _ => None,
        };

        RunRecord {
            target: target.to_string(),
            number: run.run_number,
            status,
            outcome,
            started_at,
            updated_at: run.updated_at,
            duration_secs,
            url: run.html_url,
        }
    }

    /// Fetch a plain-text log, following the redirect to the signed URL
    async fn fetch_log(&self, job_id: i64) -> AppResult<String> {
        let url = self.api_url(&["actions", "jobs", &job_id.to_string(), "logs"], &[])?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("GitHub log request failed: {}", e)))?;

        let response = if response.status().is_redirection() {
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    AppError::Upstream("Log redirect without Location header".to_string())
                })?
                .to_string();

            // The signed URL must be fetched without the API auth headers
            reqwest::Client::new()
                .get(&location)
                .send()
                .await
                .map_err(|e| AppError::Upstream(format!("Signed log URL fetch failed: {}", e)))?
        } else if response.status() == StatusCode::OK {
            response
        } else {
            return Err(AppError::Upstream(format!(
                "GitHub returned {} for job log",
                response.status()
            )));
        };

        response
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to read job log: {}", e)))
    }
}

#[async_trait]
impl ProviderClient for GithubActionsClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GithubActions
    }

    async fn list_targets(&self) -> AppResult<Vec<String>> {
        let mut names: Vec<String> = self
            .list_workflows()
            .await?
            .into_iter()
            .map(|w| w.name)
            .collect();
        names.sort();
        Ok(names)
    }

    async fn latest_run(&self, target: &str) -> AppResult<Option<RunRecord>> {
        let Some(workflow) = self.find_workflow(target).await? else {
            tracing::warn!(target = %target, "Workflow not found, treating as no runs");
            return Ok(None);
        };

        let runs = self.resolve_runs(&workflow, 1).await?;
        Ok(runs
            .into_iter()
            .next()
            .map(|run| Self::run_to_record(target, run)))
    }

    async fn recent_runs(&self, limit: u32, target: Option<&str>) -> AppResult<Vec<RunRecord>> {
        match target {
            Some(target) => {
                let Some(workflow) = self.find_workflow(target).await? else {
                    return Ok(Vec::new());
                };
                let runs = self.resolve_runs(&workflow, limit).await?;
                Ok(runs
                    .into_iter()
                    .map(|run| Self::run_to_record(target, run))
                    .collect())
            }
            None => {
                let runs = self.repo_runs(limit).await?;
                Ok(runs
                    .into_iter()
                    .map(|run| {
                        let target = run.name.clone().unwrap_or_else(|| "unknown".to_string());
                        Self::run_to_record(&target, run)
                    })
                    .collect())
            }
        }
    }

    async fn target_summary(&self, target: &str) -> AppResult<TargetSummary> {
        let Some(workflow) = self.find_workflow(target).await? else {
            return Err(AppError::NotFound(format!("workflow '{}' not found", target)));
        };

        let runs: Vec<RunRecord> = self
            .resolve_runs(&workflow, 30)
            .await?
            .into_iter()
            .map(|run| Self::run_to_record(target, run))
            .collect();

        Ok(summarize_runs(target, &runs))
    }

    async fn log_text(&self, target: &str, run_number: i64) -> AppResult<String> {
        let Some(workflow) = self.find_workflow(target).await? else {
            return Err(AppError::NotFound(format!("workflow '{}' not found", target)));
        };

        let run = self
            .resolve_runs(&workflow, PAGE_SIZE)
            .await?
            .into_iter()
            .find(|r| r.run_number == run_number)
            .ok_or_else(|| {
                AppError::NotFound(format!("run #{} of '{}' not found", run_number, target))
            })?;

        let url = self.api_url(&["actions", "runs", &run.id.to_string(), "jobs"], &[])?;
        let jobs: JobsListing = self.get_json(url).await?;

        let mut sections = Vec::new();
        for job in jobs.jobs {
            let text = self.fetch_log(job.id).await?;
            match job.name {
                Some(name) => sections.push(format!("=== {} ===\n{}", name, text)),
                None => sections.push(text),
            }
        }
        Ok(sections.join("\n"))
    }
}
