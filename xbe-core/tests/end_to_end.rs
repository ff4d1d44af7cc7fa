//! End-to-end flow: normalize, resolve from the store, request, decode.

use serde_json::json;
use tempfile::TempDir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param},
};
use xbe_core::{
    BackendKind, BaseUrl, Client, CredentialStore, FileBackend, MemoryBackend, Query,
    RequestContext, Secret, TokenResolver, TokenSource, XbeError, attrs,
};

#[tokio::test]
async fn test_staging_shorthand_resolves_stored_token() {
    let temp = TempDir::new().unwrap();
    let store = CredentialStore::with_backends(
        MemoryBackend::new().with_kind(BackendKind::Keychain),
        FileBackend::new(temp.path().join("config.json")),
    );

    let base_url = BaseUrl::normalize("staging");
    assert_eq!(base_url.as_str(), "https://staging.x-b-e.com");

    store.set(&base_url, &Secret::new("tok_staging")).await.unwrap();

    let resolved = TokenResolver::new(&store)
        .with_env(|_| None)
        .resolve(&RequestContext::background(), &base_url, None)
        .await
        .unwrap();

    assert_eq!(resolved.token.expose(), "tok_staging");
    assert_eq!(resolved.source, TokenSource::Store(BackendKind::Keychain));
    assert_eq!(resolved.source.label(), "keychain");
}

#[tokio::test]
async fn test_resolve_request_decode() -> Result<(), XbeError> {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/widgets"))
        .and(query_param("page[limit]", "10"))
        .and(header("authorization", "Bearer tok_local"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"type": "widgets", "id": "1", "attributes": {"name": "Sprocket"}},
                {"type": "widgets", "id": "2", "attributes": {"name": "Gear"}}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let store = CredentialStore::file_only(FileBackend::new(temp.path().join("config.json")));
    let base_url = BaseUrl::normalize(&format!("{}/", mock_server.uri()));
    store.set(&base_url, &Secret::new("tok_local")).await?;

    let ctx = RequestContext::background();
    let resolved = TokenResolver::new(&store)
        .with_env(|_| None)
        .resolve(&ctx, &base_url, None)
        .await?;
    assert_eq!(resolved.source.label(), "file");

    let client = Client::new(base_url, Some(resolved.token))?;
    let response = client
        .get(&ctx, "/v1/widgets", &Query::new().page_limit(10))
        .await?;
    let doc = response.decode()?;

    let names: Vec<String> = doc
        .resources()
        .iter()
        .map(|w| attrs::string_attr(&w.attributes, "name"))
        .collect();
    assert_eq!(names, vec!["Sprocket", "Gear"]);
    assert!(doc.resources().iter().all(|w| w.resource_type == "widgets"));
    Ok(())
}

#[tokio::test]
async fn test_missing_token_is_auth_required() {
    let temp = TempDir::new().unwrap();
    let store = CredentialStore::file_only(FileBackend::new(temp.path().join("config.json")));

    let err: XbeError = TokenResolver::new(&store)
        .with_env(|_| None)
        .resolve(&RequestContext::background(), &BaseUrl::default_root(), None)
        .await
        .unwrap_err()
        .into();

    assert!(err.is_auth_required());
}
