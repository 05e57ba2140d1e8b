//! HTTP capability implementations against wiremock.

use ferry_migrate::{
    BitbucketClient, ClientError, Credentials, GitHubClient, HttpSettings, PermissionLevel,
    PipelineTrigger, SecretString, SourceClient, TargetClient, TargetRepository, WebhookConfig,
    WebhookPipelineTrigger,
};
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings() -> HttpSettings {
    HttpSettings {
        timeout: Duration::from_secs(5),
        user_agent: "ferry-test".to_string(),
    }
}

fn github(server: &MockServer) -> GitHubClient {
    GitHubClient::new(server.uri(), SecretString::new("ghp_test"), &settings()).unwrap()
}

fn target() -> TargetRepository {
    TargetRepository {
        full_name: "acme/app".to_string(),
        name: "app".to_string(),
        clone_url: "https://github.com/acme/app.git".to_string(),
        html_url: "https://github.com/acme/app".to_string(),
    }
}

#[tokio::test]
async fn test_bitbucket_get_repository() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/1.0/projects/PROJ/repos/app"))
        .and(header("authorization", "Basic YWxpY2U6c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "slug": "app",
            "name": "App",
            "project": { "key": "PROJ", "name": "Project" },
            "links": {
                "clone": [
                    { "href": "ssh://git@bitbucket.example.com:7999/proj/app.git", "name": "ssh" },
                    { "href": "https://alice@bitbucket.example.com/scm/proj/app.git", "name": "http" }
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        BitbucketClient::new(server.uri(), Credentials::basic("alice", "secret"), &settings())
            .unwrap();
    let repo = client
        .get_repository("PROJ", "app", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(repo.project_key, "PROJ");
    assert_eq!(repo.slug, "app");
    assert_eq!(repo.full_name, "PROJ/app");
    assert_eq!(repo.clone_url, "https://bitbucket.example.com/scm/proj/app.git");
}

#[tokio::test]
async fn test_bitbucket_status_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/1.0/projects/PROJ/repos/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("No such repository"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/1.0/projects/PROJ/repos/private"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/1.0/projects/PROJ/repos/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client =
        BitbucketClient::new(server.uri(), Credentials::basic("alice", "secret"), &settings())
            .unwrap();
    let ctx = CancellationToken::new();

    match client.get_repository("PROJ", "missing", &ctx).await {
        Err(ClientError::NotFound(detail)) => assert!(detail.contains("No such repository")),
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert!(matches!(
        client.get_repository("PROJ", "private", &ctx).await,
        Err(ClientError::Unauthorized(_))
    ));
    assert!(matches!(
        client.get_repository("PROJ", "flaky", &ctx).await,
        Err(ClientError::Transport(_))
    ));
}

#[tokio::test]
async fn test_bitbucket_missing_clone_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/1.0/projects/PROJ/repos/app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "slug": "app",
            "project": { "key": "PROJ" },
            "links": {}
        })))
        .mount(&server)
        .await;

    let client =
        BitbucketClient::new(server.uri(), Credentials::basic("alice", "secret"), &settings())
            .unwrap();
    let err = client
        .get_repository("PROJ", "app", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}

#[tokio::test]
async fn test_bitbucket_cancellation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let client =
        BitbucketClient::new(server.uri(), Credentials::basic("alice", "secret"), &settings())
            .unwrap();
    let ctx = CancellationToken::new();
    let canceler = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceler.cancel();
    });

    let err = client.get_repository("PROJ", "app", &ctx).await.unwrap_err();
    assert_eq!(err, ClientError::Canceled);
}

#[tokio::test]
async fn test_github_create_repository() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orgs/acme/repos"))
        .and(header("authorization", "Bearer ghp_test"))
        .and(header("accept", "application/vnd.github+json"))
        .and(body_json(json!({
            "name": "app",
            "description": "Migrated from /scm/PROJ/app.git",
            "private": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 1,
            "name": "app",
            "full_name": "acme/app",
            "private": true,
            "clone_url": "https://github.com/acme/app.git",
            "html_url": "https://github.com/acme/app"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let repo = github(&server)
        .create_repository(
            "app",
            "acme",
            true,
            "Migrated from /scm/PROJ/app.git",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(repo, target());
}

#[tokio::test]
async fn test_github_create_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orgs/acme/repos"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Repository creation failed.",
            "errors": [{ "message": "name already exists on this account" }]
        })))
        .mount(&server)
        .await;

    let err = github(&server)
        .create_repository("app", "acme", true, "", &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ClientError::Conflict(detail) => assert!(detail.contains("name already exists")),
        other => panic!("expected Conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_github_forbidden_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = github(&server)
        .create_repository("app", "acme", true, "", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(_)));
}

#[tokio::test]
async fn test_github_add_team() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/orgs/acme/teams/platform/repos/acme/app"))
        .and(body_json(json!({ "permission": "push" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    github(&server)
        .add_team_to_repository(
            "acme",
            "platform",
            "app",
            PermissionLevel::Write,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_github_encodes_path_segments() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/orgs/acme/teams/platform%2Fops/repos/acme/app"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/my%20app/hooks"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = github(&server);
    let ctx = CancellationToken::new();
    client
        .add_team_to_repository("acme", "platform/ops", "app", PermissionLevel::Write, &ctx)
        .await
        .unwrap();
    client
        .create_webhook("acme", "my app", &WebhookConfig::new("https://ci.example.com/hook"), &ctx)
        .await
        .unwrap();

    let err = client
        .add_team_to_repository("acme", "..", "app", PermissionLevel::Write, &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}

#[tokio::test]
async fn test_github_add_missing_team() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = github(&server)
        .add_team_to_repository(
            "acme",
            "ghosts",
            "app",
            PermissionLevel::Read,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));
}

#[tokio::test]
async fn test_github_create_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/app/hooks"))
        .and(body_json(json!({
            "name": "web",
            "active": true,
            "events": ["push", "pull_request", "issues"],
            "config": {
                "url": "https://ci.example.com/hook",
                "content_type": "json"
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 7 })))
        .expect(1)
        .mount(&server)
        .await;

    github(&server)
        .create_webhook(
            "acme",
            "app",
            &WebhookConfig::new("https://ci.example.com/hook"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_pipeline_trigger_posts_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/migrated"))
        .and(body_json(json!({
            "event": "repository_migrated",
            "repository": "acme/app",
            "clone_url": "https://github.com/acme/app.git",
            "html_url": "https://github.com/acme/app"
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let trigger =
        WebhookPipelineTrigger::new(format!("{}/hooks/migrated", server.uri()), &settings())
            .unwrap();
    trigger
        .trigger(&target(), &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_pipeline_trigger_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let trigger = WebhookPipelineTrigger::new(server.uri(), &settings()).unwrap();
    let err = trigger
        .trigger(&target(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ClientError::Transport(detail) => assert!(detail.contains("boom")),
        other => panic!("expected Transport, got {other:?}"),
    }
}
