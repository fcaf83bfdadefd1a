//! Jenkins client
//!
//! Speaks the Jenkins JSON API. Jobs may be organized in a folder
//! hierarchy; target names are the `/`-joined composite path of a job
//! (e.g. `TeamA/Deploy`), with folder nodes themselves excluded. All
//! resource links returned upstream are rewritten onto the configured
//! integration endpoint so they stay valid behind proxies or path remaps.

use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeZone;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::models::{
    ProviderIntegration, ProviderKind, RunOutcome, RunRecord, RunStatus, TargetSummary,
};
use crate::services::providers::{require_endpoint, summarize_runs, ProviderClient};
use crate::utils::{AppError, AppResult};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Jenkins API client for one integration
#[derive(Debug)]
pub struct JenkinsClient {
    client: Client,
    base_url: Url,
    auth: Option<(String, String)>,
}

/// Job entry in a folder listing
#[derive(Debug, Clone, Deserialize)]
struct JenkinsJob {
    name: String,
    #[serde(rename = "_class", default)]
    class: Option<String>,
}

impl JenkinsJob {
    /// Folder-ish nodes are descended into, not reported as targets
    fn is_folder(&self) -> bool {
        self.class
            .as_deref()
            .map(|c| c.contains("Folder") || c.contains("MultiBranch"))
            .unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
struct JenkinsJobListing {
    #[serde(default)]
    jobs: Vec<JenkinsJob>,
}

/// Build entry as returned by the build-tree query
#[derive(Debug, Clone, Deserialize)]
struct JenkinsBuild {
    number: i64,
    #[serde(default)]
    building: Option<bool>,
    #[serde(default)]
    result: Option<String>,
    /// Epoch milliseconds
    #[serde(default)]
    timestamp: Option<i64>,
    /// Milliseconds; 0 while still running
    #[serde(default)]
    duration: Option<i64>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JenkinsBuildListing {
    #[serde(default)]
    builds: Vec<JenkinsBuild>,
}

#[derive(Debug, Deserialize)]
struct JenkinsJobDetail {
    #[serde(rename = "lastBuild", default)]
    last_build: Option<JenkinsBuild>,
}

impl JenkinsClient {
    /// Create a client from a resolved integration
    pub fn new(integration: &ProviderIntegration) -> AppResult<Self> {
        let endpoint = require_endpoint(integration)?;
        let base_url = Url::parse(endpoint).map_err(|e| {
            AppError::NotConfigured(format!(
                "integration '{}' endpoint is not a valid URL: {}",
                integration.name, e
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        let auth = match (&integration.username, &integration.token) {
            (Some(user), Some(token)) => Some((user.clone(), token.clone())),
            _ => None,
        };

        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    /// Build a URL under a job path: `job/<seg>/job/<seg>/.../<tail...>`
    ///
    /// An empty target addresses the Jenkins root (for folder listing).
    fn job_url(&self, target: &str, tail: &[&str], query: Option<&str>) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| AppError::NotConfigured("endpoint URL cannot be a base".to_string()))?;
            segments.pop_if_empty();
            if !target.is_empty() {
                for part in target.split('/') {
                    segments.push("job");
                    segments.push(part);
                }
            }
            for part in tail {
                segments.push(part);
            }
        }
        url.set_query(query);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> AppResult<T> {
        let mut request = self.client.get(url.clone());
        if let Some((ref user, ref token)) = self.auth {
            request = request.basic_auth(user, Some(token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Jenkins request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Jenkins returned {} for {}",
                response.status(),
                url.path()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid Jenkins response: {}", e)))
    }

    /// Rewrite an upstream resource link onto the configured endpoint's
    /// origin and base path, preserving the upstream path/query/fragment.
    fn rewrite_link(&self, upstream: &str) -> Option<String> {
        let upstream = Url::parse(upstream).ok()?;
        let base_path = self.base_url.path().trim_end_matches('/');

        let path = if !base_path.is_empty() && upstream.path().starts_with(base_path) {
            upstream.path().to_string()
        } else {
            format!("{}{}", base_path, upstream.path())
        };

        let mut rewritten = self.base_url.clone();
        rewritten.set_path(&path);
        rewritten.set_query(upstream.query());
        rewritten.set_fragment(upstream.fragment());
        Some(rewritten.to_string())
    }

    fn build_to_run(&self, target: &str, build: JenkinsBuild) -> RunRecord {
        let started_at = build
            .timestamp
            .and_then(|ms| chrono::Utc.timestamp_millis_opt(ms).single());
        let duration_secs = build.duration.filter(|d| *d > 0).map(|d| d / 1000);
        let updated_at = match (started_at, duration_secs) {
            (Some(start), Some(secs)) => Some(start + chrono::Duration::seconds(secs)),
            _ => started_at,
        };

        let building = build.building.unwrap_or(false);
        let (status, outcome) = if building {
            (RunStatus::InProgress, None)
        } else {
            match build.result.as_deref() {
                Some("SUCCESS") => (RunStatus::Completed, Some(RunOutcome::Success)),
                Some("FAILURE") | Some("UNSTABLE") => {
                    (RunStatus::Completed, Some(RunOutcome::Failure))
                }
                Some("ABORTED") => (RunStatus::Completed, Some(RunOutcome::Cancelled)),
                Some(_) => (RunStatus::Completed, Some(RunOutcome::Unknown)),
                None => (RunStatus::InProgress, None),
            }
        };

        let url = build.url.as_deref().and_then(|u| self.rewrite_link(u));

        RunRecord {
            target: target.to_string(),
            number: build.number,
            status,
            outcome,
            started_at,
            updated_at,
            duration_secs,
            url,
        }
    }
}

#[async_trait]
impl ProviderClient for JenkinsClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Jenkins
    }

    /// Recursively descend the folder hierarchy and return the flat list
    /// of composite job names, excluding folder nodes themselves.
    async fn list_targets(&self) -> AppResult<Vec<String>> {
        let mut targets = Vec::new();
        let mut pending: Vec<String> = vec![String::new()];

        while let Some(prefix) = pending.pop() {
            let url = self.job_url(
                &prefix,
                &["api", "json"],
                Some("tree=jobs[name,_class]"),
            )?;
            let listing: JenkinsJobListing = self.get_json(url).await?;

            for job in listing.jobs {
                let full_name = if prefix.is_empty() {
                    job.name.clone()
                } else {
                    format!("{}/{}", prefix, job.name)
                };
                if job.is_folder() {
                    pending.push(full_name);
                } else {
                    targets.push(full_name);
                }
            }
        }

        targets.sort();
        Ok(targets)
    }

    /// Fast path: only the lastBuild subtree is requested
    async fn latest_run(&self, target: &str) -> AppResult<Option<RunRecord>> {
        let url = self.job_url(
            target,
            &["api", "json"],
            Some("tree=lastBuild[number,building,result,timestamp,duration,url]"),
        )?;
        let detail: JenkinsJobDetail = self.get_json(url).await?;

        Ok(detail
            .last_build
            .map(|build| self.build_to_run(target, build)))
    }

    async fn recent_runs(&self, limit: u32, target: Option<&str>) -> AppResult<Vec<RunRecord>> {
        match target {
            Some(target) => {
                let query = format!(
                    "tree=builds[number,building,result,timestamp,duration,url]{{0,{}}}",
                    limit
                );
                let url = self.job_url(target, &["api", "json"], Some(&query))?;
                let listing: JenkinsBuildListing = self.get_json(url).await?;

                Ok(listing
                    .builds
                    .into_iter()
                    .map(|build| self.build_to_run(target, build))
                    .collect())
            }
            None => {
                // No single endpoint lists builds across jobs; take the
                // latest build of every job and keep the newest `limit`.
                let mut runs = Vec::new();
                for target in self.list_targets().await? {
                    if let Some(run) = self.latest_run(&target).await? {
                        runs.push(run);
                    }
                }
                runs.sort_by_key(|r| std::cmp::Reverse(r.effective_timestamp()));
                runs.truncate(limit as usize);
                Ok(runs)
            }
        }
    }

    async fn target_summary(&self, target: &str) -> AppResult<TargetSummary> {
        let runs = self.recent_runs(20, Some(target)).await?;
        Ok(summarize_runs(target, &runs))
    }

    async fn log_text(&self, target: &str, run_number: i64) -> AppResult<String> {
        let run = run_number.to_string();
        let url = self.job_url(target, &[&run, "consoleText"], None)?;

        let mut request = self.client.get(url.clone());
        if let Some((ref user, ref token)) = self.auth {
            request = request.basic_auth(user, Some(token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Jenkins log request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Jenkins returned {} for console log",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to read console log: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_integration(endpoint: &str) -> ProviderIntegration {
        ProviderIntegration {
            id: Uuid::new_v4(),
            name: "test jenkins".to_string(),
            kind: ProviderKind::Jenkins,
            endpoint: endpoint.to_string(),
            username: None,
            token: None,
            is_active: true,
        }
    }

    #[test]
    fn test_missing_endpoint_fails_fast() {
        let err = JenkinsClient::new(&test_integration("  ")).unwrap_err();
        assert!(matches!(err, AppError::NotConfigured(_)));
    }

    #[test]
    fn test_job_url_nested_target() {
        let client = JenkinsClient::new(&test_integration("https://ci.example.com/jenkins")).unwrap();
        let url = client
            .job_url("TeamA/Deploy", &["api", "json"], Some("tree=jobs[name]"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://ci.example.com/jenkins/job/TeamA/job/Deploy/api/json?tree=jobs[name]"
        );
    }

    #[test]
    fn test_rewrite_link_preserves_path_query_fragment() {
        let client = JenkinsClient::new(&test_integration("https://proxy.example.com/jenkins")).unwrap();
        let rewritten = client
            .rewrite_link("http://internal-jenkins:8080/job/TeamA/job/Deploy/42/?depth=1#console")
            .unwrap();
        assert_eq!(
            rewritten,
            "https://proxy.example.com/jenkins/job/TeamA/job/Deploy/42/?depth=1#console"
        );
    }

    #[test]
    fn test_rewrite_link_does_not_double_base_path() {
        let client = JenkinsClient::new(&test_integration("https://proxy.example.com/jenkins")).unwrap();
        let rewritten = client
            .rewrite_link("http://internal:8080/jenkins/job/Build/7/")
            .unwrap();
        assert_eq!(rewritten, "https://proxy.example.com/jenkins/job/Build/7/");
    }

    #[test]
    fn test_build_mapping_completed_failure() {
        let client = JenkinsClient::new(&test_integration("https://ci.example.com")).unwrap();
        let run = client.build_to_run(
            "svc-ci",
            JenkinsBuild {
                number: 42,
                building: Some(false),
                result: Some("FAILURE".to_string()),
                timestamp: Some(1_714_560_000_000),
                duration: Some(95_000),
                url: Some("http://internal:8080/job/svc-ci/42/".to_string()),
            },
        );

        assert_eq!(run.number, 42);
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.outcome, Some(RunOutcome::Failure));
        assert_eq!(run.duration_secs, Some(95));
        assert!(run.url.unwrap().starts_with("https://ci.example.com/"));
    }

    #[test]
    fn test_build_mapping_in_progress() {
        let client = JenkinsClient::new(&test_integration("https://ci.example.com")).unwrap();
        let run = client.build_to_run(
            "svc-ci",
            JenkinsBuild {
                number: 43,
                building: Some(true),
                result: None,
                timestamp: Some(1_714_560_000_000),
                duration: Some(0),
                url: None,
            },
        );

        assert_eq!(run.status, RunStatus::InProgress);
        assert!(run.outcome.is_none());
        assert!(run.duration_secs.is_none());
    }

    #[test]
    fn test_folder_detection() {
        let folder = JenkinsJob {
            name: "TeamA".to_string(),
            class: Some("com.cloudbees.hudson.plugins.folder.Folder".to_string()),
        };
        let job = JenkinsJob {
            name: "Deploy".to_string(),
            class: Some("hudson.model.FreeStyleProject".to_string()),
        };
        assert!(folder.is_folder());
        assert!(!job.is_folder());
    }
}
