//! Token cache and client secrets handling.

mod common;

use common::{sample_token, write_client_secrets, StaticAuthorizer};
use gsc_etl::credentials::{
    authorization_url, parse_token_response, ClientSecrets, CredentialCache,
};
use gsc_etl::EtlError;
use std::fs;

// ---------------------------------------------------------------------------
// obtain
// ---------------------------------------------------------------------------

#[test]
fn cached_token_is_returned_without_authorizing() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = CredentialCache::new(Some(tmp.path().join("token.json")));
    let token = sample_token("cached-access");
    cache.store(&token).unwrap();

    let auth = StaticAuthorizer::granting(sample_token("fresh-access"));
    // The source path does not exist: it must never be read.
    let got = cache
        .obtain(&tmp.path().join("missing.json"), &auth)
        .unwrap();

    assert_eq!(got, token);
    assert_eq!(auth.calls.get(), 0);
}

#[test]
fn empty_cache_authorizes_and_persists() {
    let tmp = tempfile::tempdir().unwrap();
    let secrets = write_client_secrets(tmp.path());
    let cache = CredentialCache::new(Some(tmp.path().join("nested").join("token.json")));
    let auth = StaticAuthorizer::granting(sample_token("fresh-access"));

    let first = cache.obtain(&secrets, &auth).unwrap();
    assert_eq!(first.access_token, "fresh-access");
    assert_eq!(auth.calls.get(), 1);
    assert!(cache.path().exists());

    let second = cache.obtain(&secrets, &auth).unwrap();
    assert_eq!(second, first);
    assert_eq!(auth.calls.get(), 1);
}

#[test]
fn cache_file_is_plain_json() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = CredentialCache::new(Some(tmp.path().join("token.json")));
    cache.store(&sample_token("abc")).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(cache.path()).unwrap()).unwrap();
    assert_eq!(raw["access_token"], "abc");
    assert_eq!(raw["token_type"], "Bearer");
}

#[test]
fn missing_source_is_a_credential_error() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = CredentialCache::new(Some(tmp.path().join("token.json")));
    let auth = StaticAuthorizer::granting(sample_token("x"));

    let err = cache
        .obtain(&tmp.path().join("missing.json"), &auth)
        .unwrap_err();

    assert!(matches!(err, EtlError::Credential(_)));
    assert_eq!(auth.calls.get(), 0);
    assert!(!cache.path().exists());
}

#[test]
fn denied_authorization_leaves_cache_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let secrets = write_client_secrets(tmp.path());
    let cache = CredentialCache::new(Some(tmp.path().join("token.json")));
    let auth = StaticAuthorizer::denying();

    let err = cache.obtain(&secrets, &auth).unwrap_err();

    assert!(matches!(err, EtlError::Credential(_)));
    assert!(!cache.path().exists());
}

#[test]
fn corrupt_cache_is_removed() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("token.json");
    fs::write(&path, "\u{80}pickle-bytes").unwrap();
    let cache = CredentialCache::new(Some(path.clone()));

    let err = cache.load().unwrap_err();
    assert!(matches!(err, EtlError::Credential(_)));
    assert!(!path.exists());
    assert!(cache.load().unwrap().is_none());
}

#[test]
fn clear_removes_token() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = CredentialCache::new(Some(tmp.path().join("token.json")));
    cache.store(&sample_token("abc")).unwrap();

    cache.clear().unwrap();
    assert!(cache.load().unwrap().is_none());
    cache.clear().unwrap();
}

#[test]
fn expired_tokens_are_returned_as_is() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = CredentialCache::new(Some(tmp.path().join("token.json")));
    let mut token = sample_token("old");
    token.expires_at = Some(chrono::Utc::now() - chrono::Duration::days(30));
    cache.store(&token).unwrap();

    let auth = StaticAuthorizer::granting(sample_token("new"));
    let got = cache.obtain(&tmp.path().join("unused.json"), &auth).unwrap();
    assert_eq!(got.access_token, "old");
    assert_eq!(auth.calls.get(), 0);
}

// ---------------------------------------------------------------------------
// client secrets
// ---------------------------------------------------------------------------

#[test]
fn reads_installed_and_web_layouts() {
    let installed = ClientSecrets::from_json(
        r#"{"installed": {"client_id": "a", "client_secret": "b"}}"#,
    )
    .unwrap();
    assert_eq!(installed.client_id, "a");
    assert_eq!(installed.token_uri, "https://oauth2.googleapis.com/token");

    let web = ClientSecrets::from_json(
        r#"{"web": {"client_id": "c", "client_secret": "d", "token_uri": "https://t"}}"#,
    )
    .unwrap();
    assert_eq!(web.client_secret, "d");
    assert_eq!(web.token_uri, "https://t");
}

#[test]
fn invalid_secrets_are_credential_errors() {
    assert!(matches!(
        ClientSecrets::from_json("not json"),
        Err(EtlError::Credential(_))
    ));
    assert!(matches!(
        ClientSecrets::from_json(r#"{"installed": {"client_id": "a"}}"#),
        Err(EtlError::Credential(_))
    ));
}

// ---------------------------------------------------------------------------
// consent URL and token response
// ---------------------------------------------------------------------------

#[test]
fn authorization_url_encodes_scopes_and_redirect() {
    let secrets = ClientSecrets::from_json(r#"{"client_id": "id 1", "client_secret": "s"}"#).unwrap();
    let url = authorization_url(
        &secrets,
        &["https://www.googleapis.com/auth/webmasters.readonly"],
        "xyz",
    );

    assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
    assert!(url.contains("client_id=id%201"));
    assert!(url.contains("redirect_uri=urn%3Aietf%3Awg%3Aoauth%3A2.0%3Aoob"));
    assert!(url.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fwebmasters.readonly"));
    assert!(url.contains("state=xyz"));
}

#[test]
fn parses_successful_token_response() {
    let token = parse_token_response(
        r#"{"access_token": "ya29", "refresh_token": "1//r", "expires_in": 3599,
            "token_type": "Bearer", "scope": "a b"}"#,
    )
    .unwrap();

    assert_eq!(token.access_token, "ya29");
    assert_eq!(token.refresh_token.as_deref(), Some("1//r"));
    assert_eq!(token.scopes, vec!["a", "b"]);
    assert!(token.expires_at.is_some());
    assert_eq!(token.authorization_header(), "Bearer ya29");
}

#[test]
fn token_error_response_is_credential_error() {
    let err = parse_token_response(
        r#"{"error": "invalid_grant", "error_description": "Bad Request"}"#,
    )
    .unwrap_err();
    assert!(matches!(err, EtlError::Credential(ref m) if m == "Bad Request"));

    let err = parse_token_response(r#"{"token_type": "Bearer"}"#).unwrap_err();
    assert!(matches!(err, EtlError::Credential(_)));
}
