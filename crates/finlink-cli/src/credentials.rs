/*
[INPUT]:  Optional profile / credentials-file overrides, process environment
[OUTPUT]: One-line report of which provider supplied credentials
[POS]:    Command layer - `finlink check-credentials`
[UPDATE]: When the default chain or report format changes
*/

use std::path::PathBuf;

use anyhow::Context;
use finlink_client::credentials::CredentialProvider;
use finlink_client::{ChainProvider, Credentials, EnvProvider, FileProvider, StaticProvider};

/// Default chain, with the file provider pointed at the overrides if given
pub fn build_chain(profile: Option<String>, credentials_file: Option<PathBuf>) -> ChainProvider<CredentialProvider> {
    let from_env = FileProvider::from_env();
    let path = credentials_file.unwrap_or_else(|| from_env.path().to_path_buf());
    let profile = profile.unwrap_or_else(|| from_env.profile().to_string());

    ChainProvider::new(vec![
        StaticProvider::empty().into(),
        EnvProvider::new().into(),
        FileProvider::new(path, profile).into(),
    ])
}

pub fn describe(source: &str, credentials: &Credentials) -> String {
    let mode = if credentials.sandbox { "sandbox" } else { "production" };
    format!(
        "credentials resolved from {source}: access key {} ({mode}, {})",
        credentials.redacted_access_key(),
        credentials.base_url
    )
}

pub fn check(chain: &ChainProvider<CredentialProvider>) -> anyhow::Result<String> {
    let (source, credentials) = chain.resolve_with_source().context("resolve credentials")?;
    Ok(describe(&source, &credentials))
}
