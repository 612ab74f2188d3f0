// Hub client: the uploader the form talks to in the real binary.
// Creates the target repository if needed and commits each selected file
// through the Hub's commit endpoint. Per-file failures are collected in the
// report instead of aborting the whole batch.

use crate::files::{FileSelection, SelectedFile};
use crate::form::Uploader;
use crate::settings::Settings;
use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::future::Future;
use tracing::{debug, info, warn};

/// `username/repository`, exactly as typed.
pub fn repo_id(username: &str, repository: &str) -> String {
    format!("{}/{}", username, repository)
}

/// What the Hub returns for a successful commit.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CommitInfo {
    pub commit_url: String,
    pub commit_oid: String,
    pub pull_request_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct FileOutcome {
    pub name: String,
    pub result: Result<CommitInfo, String>,
}

/// Outcome of one upload call: one entry per file, in upload order.
#[derive(Clone, Debug)]
pub struct UploadReport {
    pub repo_id: String,
    pub outcomes: Vec<FileOutcome>,
}

impl UploadReport {
    pub fn new(repo_id: impl Into<String>) -> Self {
        UploadReport {
            repo_id: repo_id.into(),
            outcomes: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

impl fmt::Display for UploadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self
            .outcomes
            .iter()
            .flat_map(|outcome| {
                let result = match &outcome.result {
                    Ok(_) => format!("✓ Successfully uploaded {}", outcome.name),
                    Err(e) => format!("✗ Error uploading {}: {}", outcome.name, e),
                };
                [format!("Uploading: {}", outcome.name), result, "-".repeat(40)]
            })
            .collect();
        write!(f, "{}", lines.join("\n"))
    }
}

#[derive(Deserialize)]
struct WhoAmI {
    name: String,
}

/// HTTP client for the Hugging Face Hub.
#[derive(Clone)]
pub struct HubClient {
    client: Client,
    settings: Settings,
}

impl HubClient {
    pub fn new(settings: Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HubClient { client, settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The key typed into the form wins; the stored one is the fallback.
    fn resolve_token<'a>(&'a self, write_key: &'a str) -> Result<&'a str> {
        if !write_key.is_empty() {
            return Ok(write_key);
        }
        if self.settings.has_write_key() {
            return Ok(self.settings.token());
        }
        bail!("No Hugging Face write key provided")
    }

    /// Ask the Hub who owns `token`.
    pub async fn whoami(&self, token: &str) -> Result<String> {
        let url = format!("{}/api/whoami-v2", self.settings.endpoint());
        let res = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to send whoami request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().await.unwrap_or_default();
            bail!("Token check failed: {} - {}", status, txt);
        }
        let who: WhoAmI = res.json().await.context("Parsing whoami response json")?;
        Ok(who.name)
    }

    /// Create `repo_id` as a model repository. An existing repository is fine.
    /// `organization` is only sent when the namespace part is non-empty.
    pub async fn create_repo(&self, token: &str, repo_id: &str) -> Result<()> {
        let url = format!("{}/api/repos/create", self.settings.endpoint());
        let (organization, name) = repo_id.split_once('/').unwrap_or(("", repo_id));
        let mut body = json!({
            "type": "model",
            "name": name,
            "private": self.settings.private,
        });
        if !organization.is_empty() {
            body["organization"] = json!(organization);
        }

        let res = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .context("Failed to send create repo request")?;

        match res.status() {
            s if s.is_success() => info!(repo = %repo_id, "created repository"),
            StatusCode::CONFLICT => debug!(repo = %repo_id, "repository already exists"),
            status => {
                let txt = res.text().await.unwrap_or_default();
                bail!("Error creating/accessing repository {}: {} - {}", repo_id, status, txt);
            }
        }
        Ok(())
    }

    /// Commit a single file to the root of `repo_id`.
    pub async fn commit_file(&self, token: &str, repo_id: &str, file: &SelectedFile) -> Result<CommitInfo> {
        let bytes = tokio::fs::read(&file.path)
            .await
            .with_context(|| format!("Failed to read {}", file.path.display()))?;

        let header = json!({
            "key": "header",
            "value": {
                "summary": format!("{}: {}", self.settings.commit_message, file.name),
                "description": "",
            },
        });
        let entry = json!({
            "key": "file",
            "value": {
                "content": STANDARD.encode(&bytes),
                "path": file.name,
                "encoding": "base64",
            },
        });
        let body = format!("{}\n{}\n", header, entry);

        let url = format!("{}/api/models/{}/commit/main", self.settings.endpoint(), repo_id);
        let mut req = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body);
        if self.settings.create_pr {
            req = req.query(&[("create_pr", "1")]);
        }

        let res = req.send().await.context("Failed to send commit request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().await.unwrap_or_default();
            bail!("Commit failed: {} - {}", status, txt);
        }
        let info: CommitInfo = res.json().await.context("Parsing commit response json")?;
        Ok(info)
    }

    /// Upload every file in `files` to `username/repository`.
    pub async fn upload_files(
        &self,
        username: &str,
        repository: &str,
        write_key: &str,
        files: &FileSelection,
    ) -> Result<UploadReport> {
        let token = self.resolve_token(write_key)?;
        if files.is_empty() {
            bail!("No files selected for upload");
        }

        let repo_id = repo_id(username, repository);
        self.create_repo(token, &repo_id).await?;

        let mut report = UploadReport::new(repo_id.clone());
        for file in files {
            debug!(file = %file.name, repo = %repo_id, "uploading");
            let result = self
                .commit_file(token, &repo_id, file)
                .await
                .map_err(|e| format!("{:#}", e));
            match &result {
                Ok(info) => info!(file = %file.name, commit = %info.commit_oid, "uploaded"),
                Err(e) => warn!(file = %file.name, error = %e, "upload failed"),
            }
            report.outcomes.push(FileOutcome {
                name: file.name.clone(),
                result,
            });
        }
        Ok(report)
    }
}

impl Uploader for HubClient {
    type Output = UploadReport;
    type Error = anyhow::Error;

    fn upload(
        &self,
        username: String,
        repository: String,
        write_key: String,
        files: FileSelection,
    ) -> impl Future<Output = Result<UploadReport>> + Send {
        async move {
            self.upload_files(&username, &repository, &write_key, &files)
                .await
        }
    }
}
