use hfbackup_cli::files::FileSelection;
use hfbackup_cli::form::{FormValues, UploadForm};
use hfbackup_cli::hub::{repo_id, HubClient};
use hfbackup_cli::settings::Settings;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::instrument::WithSubscriber;
use wiremock::{
    matchers::{body_json, body_string_contains, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

mod common;
use common::CapturedLogs;

fn settings_for(server: &MockServer) -> Settings {
    Settings {
        endpoint: server.uri(),
        ..Settings::default()
    }
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

async fn mock_create_repo(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/api/repos/create"))
        .and(header("authorization", "Bearer hf_xxx"))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({
            "url": format!("{}/alice/my-model", server.uri()),
        })))
        .mount(server)
        .await;
}

fn commit_response(oid: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "commitUrl": format!("https://huggingface.co/alice/my-model/commit/{}", oid),
        "commitOid": oid,
    }))
}

#[tokio::test]
async fn creates_repo_and_commits_each_file() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let a = write_file(tmp.path(), "a.safetensors", "hello");
    let b = write_file(tmp.path(), "b.ckpt", "world");

    Mock::given(method("POST"))
        .and(path("/api/repos/create"))
        .and(body_json(json!({
            "type": "model",
            "name": "my-model",
            "organization": "alice",
            "private": true,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/models/alice/my-model/commit/main"))
        .and(header("authorization", "Bearer hf_xxx"))
        .and(header("content-type", "application/x-ndjson"))
        .and(body_string_contains(r#""path":"a.safetensors""#))
        .and(body_string_contains("aGVsbG8="))
        .and(body_string_contains("Backup files: a.safetensors"))
        .respond_with(commit_response("aaa"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/models/alice/my-model/commit/main"))
        .and(body_string_contains(r#""path":"b.ckpt""#))
        .and(body_string_contains("d29ybGQ="))
        .respond_with(commit_response("bbb"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HubClient::new(settings_for(&server)).unwrap();
    let files = FileSelection::from_paths([a, b]);
    let report = client
        .upload_files("alice", "my-model", "hf_xxx", &files)
        .await
        .unwrap();

    assert_eq!(report.repo_id, "alice/my-model");
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 0);
    let oids: Vec<String> = report
        .outcomes
        .iter()
        .map(|o| o.result.as_ref().unwrap().commit_oid.clone())
        .collect();
    assert_eq!(oids, vec!["aaa", "bbb"]);
}

#[tokio::test]
async fn empty_namespace_omits_organization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/repos/create"))
        .and(body_json(json!({
            "type": "model",
            "name": "my-model",
            "private": true,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HubClient::new(settings_for(&server)).unwrap();
    client
        .create_repo("hf_xxx", &repo_id("", "my-model"))
        .await
        .unwrap();
}

#[tokio::test]
async fn existing_repo_is_accepted() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let file = write_file(tmp.path(), "model.bin", "weights");

    mock_create_repo(&server, 409).await;
    Mock::given(method("POST"))
        .and(path("/api/models/alice/my-model/commit/main"))
        .respond_with(commit_response("ccc"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HubClient::new(settings_for(&server)).unwrap();
    let report = client
        .upload_files("alice", "my-model", "hf_xxx", &FileSelection::from_paths([file]))
        .await
        .unwrap();
    assert_eq!(report.succeeded(), 1);
}

#[tokio::test]
async fn repo_creation_failure_aborts() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let file = write_file(tmp.path(), "model.bin", "weights");

    Mock::given(method("POST"))
        .and(path("/api/repos/create"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid token"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/models/alice/my-model/commit/main"))
        .respond_with(commit_response("never"))
        .expect(0)
        .mount(&server)
        .await;

    let client = HubClient::new(settings_for(&server)).unwrap();
    let err = client
        .upload_files("alice", "my-model", "hf_xxx", &FileSelection::from_paths([file]))
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("401"), "{}", msg);
    assert!(msg.contains("Invalid token"), "{}", msg);
}

#[tokio::test]
async fn failed_file_does_not_stop_the_rest() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("missing.ckpt");
    let present = write_file(tmp.path(), "present.ckpt", "ok");

    mock_create_repo(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/api/models/alice/my-model/commit/main"))
        .respond_with(commit_response("ddd"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HubClient::new(settings_for(&server)).unwrap();
    let report = client
        .upload_files(
            "alice",
            "my-model",
            "hf_xxx",
            &FileSelection::from_paths([missing, present]),
        )
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);
    let text = report.to_string();
    assert!(text.contains("✗ Error uploading missing.ckpt: Failed to read"), "{}", text);
    assert!(text.contains("✓ Successfully uploaded present.ckpt"), "{}", text);
}

#[tokio::test]
async fn commit_rejection_is_recorded() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let file = write_file(tmp.path(), "model.bin", "weights");

    mock_create_repo(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/api/models/alice/my-model/commit/main"))
        .respond_with(ResponseTemplate::new(403).set_body_string("read-only token"))
        .mount(&server)
        .await;

    let client = HubClient::new(settings_for(&server)).unwrap();
    let report = client
        .upload_files("alice", "my-model", "hf_xxx", &FileSelection::from_paths([file]))
        .await
        .unwrap();

    assert_eq!(report.failed(), 1);
    let err = report.outcomes[0].result.as_ref().unwrap_err();
    assert!(err.contains("403"), "{}", err);
    assert!(err.contains("read-only token"), "{}", err);
}

#[tokio::test]
async fn stored_key_and_pull_request_mode() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let file = write_file(tmp.path(), "model.bin", "weights");

    mock_create_repo(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/api/models/alice/my-model/commit/main"))
        .and(query_param("create_pr", "1"))
        .and(header("authorization", "Bearer hf_xxx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "commitOid": "eee",
            "pullRequestUrl": "https://huggingface.co/alice/my-model/discussions/1",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let settings = Settings {
        write_key: "hf_xxx".into(),
        create_pr: true,
        ..settings_for(&server)
    };
    let client = HubClient::new(settings).unwrap();
    let report = client
        .upload_files("alice", "my-model", "", &FileSelection::from_paths([file]))
        .await
        .unwrap();

    let info = report.outcomes[0].result.as_ref().unwrap();
    assert_eq!(
        info.pull_request_url.as_deref(),
        Some("https://huggingface.co/alice/my-model/discussions/1")
    );
}

#[tokio::test]
async fn whoami_returns_account_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/whoami-v2"))
        .and(header("authorization", "Bearer hf_xxx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "user",
            "name": "alice",
        })))
        .mount(&server)
        .await;

    let client = HubClient::new(settings_for(&server)).unwrap();
    assert_eq!(client.whoami("hf_xxx").await.unwrap(), "alice");
    assert!(client.whoami("hf_wrong").await.is_err());
}

#[tokio::test]
async fn form_logs_hub_report() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let file = write_file(tmp.path(), "model.bin", "weights");

    mock_create_repo(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/api/models/alice/my-model/commit/main"))
        .respond_with(commit_response("fff"))
        .mount(&server)
        .await;

    let logs = CapturedLogs::default();
    let form = UploadForm::new(HubClient::new(settings_for(&server)).unwrap());
    let fields = FormValues {
        username: "alice".into(),
        repository: "my-model".into(),
        write_key: "hf_xxx".into(),
        files: FileSelection::from_paths([file]),
    };
    form.submit(&fields).with_subscriber(logs.subscriber()).await;

    let out = logs.contents();
    assert!(out.contains("✓ Successfully uploaded model.bin"), "{}", out);
    assert!(!out.contains("hf_xxx"), "write key leaked: {}", out);
}

#[tokio::test]
async fn form_logs_missing_key_error() {
    let logs = CapturedLogs::default();
    let form = UploadForm::new(HubClient::new(Settings::default()).unwrap());

    form.submit(&FormValues::default())
        .with_subscriber(logs.subscriber())
        .await;

    let out = logs.contents();
    assert!(out.contains("ERROR"), "{}", out);
    assert!(out.contains("No Hugging Face write key provided"), "{}", out);
}
