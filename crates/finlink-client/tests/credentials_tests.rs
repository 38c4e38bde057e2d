/*
[INPUT]:  Static values, fixed env maps, temporary credentials files
[OUTPUT]: Test results for credential resolution across providers
[POS]:    Integration tests - credentials chain end to end
[UPDATE]: When provider order or diagnostics change
*/

mod common;

use std::io::Write;

use finlink_client::credentials::{CredentialProvider, PRODUCTION_BASE_URL, SANDBOX_BASE_URL};
use finlink_client::{
    ApiClient, ChainProvider, ClientConfig, CredentialsError, EnvProvider, FileProvider,
    FinlinkError, StaticProvider,
};
use tempfile::NamedTempFile;
use tokio_test::assert_ok;

fn credentials_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write credentials");
    file
}

fn chain(
    explicit: StaticProvider,
    env: EnvProvider,
    file: FileProvider,
) -> ChainProvider<CredentialProvider> {
    ChainProvider::new(vec![explicit.into(), env.into(), file.into()])
}

#[test]
fn test_explicit_values_win() {
    let file = credentials_file("[default]\naccess_key = file-ak\nsecret_key = file-sk\n");
    let chain = chain(
        StaticProvider::new("explicit-ak", "explicit-sk"),
        EnvProvider::from_vars([("ACCESS_KEY", "env-ak"), ("SECRET_KEY", "env-sk")]),
        FileProvider::new(file.path(), "default"),
    );

    let (source, credentials) = assert_ok!(chain.resolve_with_source());
    assert_eq!(source, "static");
    assert_eq!(credentials.access_key, "explicit-ak");
}

#[test]
fn test_env_only() {
    let chain = chain(
        StaticProvider::empty(),
        EnvProvider::from_vars([("ACCESS_KEY", "abc"), ("SECRET_KEY", "xyz")]),
        FileProvider::new("/nonexistent/finlink/credentials", "default"),
    );

    let (source, credentials) = assert_ok!(chain.resolve_with_source());
    assert_eq!(source, "env");
    assert_eq!(credentials.access_key, "abc");
    assert_eq!(credentials.secret_key, "xyz");
    assert_eq!(credentials.base_url, PRODUCTION_BASE_URL);
    assert!(!credentials.sandbox);
}

#[test]
fn test_file_profile_selected() {
    let file = credentials_file(
        "[default]\naccess_key = prod-ak\nsecret_key = prod-sk\n\n[dev]\naccess_key = dev-ak\nsandbox = true\n",
    );
    let chain = chain(
        StaticProvider::empty(),
        EnvProvider::from_vars(Vec::<(String, String)>::new()),
        FileProvider::new(file.path(), "dev"),
    );

    let (source, credentials) = assert_ok!(chain.resolve_with_source());
    assert_eq!(source, "file");
    assert_eq!(credentials.access_key, "dev-ak");
    assert!(credentials.sandbox);
    assert_eq!(credentials.base_url, SANDBOX_BASE_URL);
}

#[test]
fn test_all_failures_are_reported() {
    let file = credentials_file("[default]\naccess_key = only-ak\n");
    let chain = chain(
        StaticProvider::empty(),
        EnvProvider::from_vars([("SECRET_KEY", "orphan")]),
        FileProvider::new(file.path(), "default"),
    );

    let err = chain.resolve().unwrap_err();
    match &err {
        CredentialsError::NoCredentials { failures } => {
            assert_eq!(failures.len(), 3);
            assert_eq!(failures[0].provider(), "static");
            assert_eq!(failures[1].provider(), "env");
            assert_eq!(failures[2].provider(), "file");
        }
        other => panic!("expected NoCredentials, got {other:?}"),
    }

    let message = err.to_string();
    assert!(message.contains("ACCESS_KEY is not set"), "{message}");
    assert!(message.contains("missing required keys: secret_key"), "{message}");
}

#[test]
fn test_missing_profile_is_distinguished_from_missing_file() {
    let file = credentials_file("[default]\naccess_key = a\nsecret_key = b\n");

    let missing_profile = FileProvider::new(file.path(), "staging");
    let missing_file = FileProvider::new("/nonexistent/finlink/credentials", "default");

    let chain = ChainProvider::<CredentialProvider>::new(vec![missing_profile.into()]);
    let message = chain.resolve().unwrap_err().to_string();
    assert!(message.contains("profile [staging] not found"), "{message}");

    let chain = ChainProvider::<CredentialProvider>::new(vec![missing_file.into()]);
    let message = chain.resolve().unwrap_err().to_string();
    assert!(message.contains("not found"), "{message}");
    assert!(!message.contains("profile"), "{message}");
}

#[test]
fn test_client_from_chain_reports_no_credentials() {
    let chain = ChainProvider::<CredentialProvider>::new(vec![StaticProvider::empty().into()]);
    let err = ApiClient::from_chain(&chain, ClientConfig::default()).unwrap_err();

    assert!(err.is_auth_error());
    assert!(matches!(
        err,
        FinlinkError::Credentials(CredentialsError::NoCredentials { .. })
    ));
}

#[test]
fn test_client_from_chain_uses_resolved_credentials() {
    let chain = ChainProvider::<CredentialProvider>::new(vec![
        StaticProvider::empty().into(),
        EnvProvider::from_vars([
            ("ACCESS_KEY", "sbx"),
            ("SANDBOX", "true"),
            ("BASE_URL", "http://127.0.0.1:9/api"),
        ])
        .into(),
    ]);

    let client = assert_ok!(ApiClient::from_chain(&chain, ClientConfig::default()));
    assert!(client.credentials().sandbox);
    assert_eq!(client.base_url().as_str(), "http://127.0.0.1:9/api/");
    assert_eq!(client.transport().authenticator().scheme(), "bearer");
}
