/*
[INPUT]:  INI credentials file path and profile name
[OUTPUT]: Credentials from the named profile section
[POS]:    Credentials layer - lowest-priority provider in the default chain
[UPDATE]: When the credentials file format or default location changes
*/

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ini::{Ini, ParseOption};

use super::model::{default_base_url, parse_flag, Credentials};
use super::provider::{ProvideCredentials, ProviderCause, ProviderError};

/// Overrides the credentials file location
pub const CREDENTIALS_FILE_VAR: &str = "FINLINK_CREDENTIALS_FILE";
/// Overrides the profile section name
pub const PROFILE_VAR: &str = "FINLINK_PROFILE";
pub const DEFAULT_PROFILE: &str = "default";

const NAME: &str = "file";

/// Reads one profile section of an INI-style credentials file
///
/// ```ini
/// [default]
/// access_key = abc
/// secret_key = xyz
/// base_url = https://api.finlink.io
///
/// [dev]
/// access_key = sandbox-key
/// sandbox = true
/// ```
#[derive(Debug, Clone)]
pub struct FileProvider {
    path: PathBuf,
    profile: String,
}

impl FileProvider {
    pub fn new(path: impl AsRef<Path>, profile: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            profile: profile.into(),
        }
    }

    /// Location and profile taken from `FINLINK_CREDENTIALS_FILE` /
    /// `FINLINK_PROFILE`, falling back to `~/.finlink/credentials` and `default`.
    pub fn from_env() -> Self {
        let path = std::env::var_os(CREDENTIALS_FILE_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(default_credentials_path);
        let profile = std::env::var(PROFILE_VAR)
            .ok()
            .filter(|profile| !profile.is_empty())
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string());
        Self::new(path, profile)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    // Values are taken literally so secrets may contain backslashes and quotes.
    fn load(&self) -> Result<Ini, ProviderError> {
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        Ini::load_from_file_opt(&self.path, options).map_err(|err| {
            ProviderError::new(
                NAME,
                format!("credentials file {} could not be parsed: {err}", self.path.display()),
                match err {
                    ini::Error::Io(io) => ProviderCause::Io(io),
                    ini::Error::Parse(parse) => ProviderCause::Parse(parse),
                },
            )
        })
    }

    fn profile_section(&self) -> Result<HashMap<String, String>, ProviderError> {
        let ini = self.load()?;
        ini.iter()
            .find(|(name, _)| name.is_some_and(|name| name.trim().eq_ignore_ascii_case(&self.profile)))
            .map(|(_, properties)| {
                properties
                    .iter()
                    .map(|(key, value)| (key.to_ascii_lowercase(), value.to_string()))
                    .collect()
            })
            .ok_or_else(|| {
                ProviderError::malformed(
                    NAME,
                    format!(
                        "profile [{}] not found in credentials file {}",
                        self.profile,
                        self.path.display()
                    ),
                )
            })
    }
}

impl ProvideCredentials for FileProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn retrieve(&self) -> Result<Credentials, ProviderError> {
        if !self.path.is_file() {
            return Err(ProviderError::absent(
                NAME,
                format!("credentials file {} not found", self.path.display()),
            ));
        }

        let section = self.profile_section()?;
        let access_key = lookup(&section, "access_key");
        let secret_key = lookup(&section, "secret_key");

        let sandbox = match lookup(&section, "sandbox") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                ProviderError::malformed(
                    NAME,
                    format!("profile [{}] has unrecognised sandbox value {raw:?}", self.profile),
                )
            })?,
            None => false,
        };

        let mut missing = Vec::new();
        if access_key.is_none() {
            missing.push("access_key");
        }
        if secret_key.is_none() && !sandbox {
            missing.push("secret_key");
        }
        if !missing.is_empty() {
            return Err(ProviderError::malformed(
                NAME,
                format!(
                    "profile [{}] in {} is missing required keys: {}",
                    self.profile,
                    self.path.display(),
                    missing.join(", ")
                ),
            ));
        }

        let credentials = Credentials {
            access_key: access_key.unwrap_or_default(),
            secret_key: secret_key.unwrap_or_default(),
            base_url: lookup(&section, "base_url")
                .unwrap_or_else(|| default_base_url(sandbox).to_string()),
            sandbox,
        };

        credentials
            .validate()
            .map_err(|reason| ProviderError::invalid(NAME, reason))?;
        Ok(credentials)
    }
}

/// Default credentials file: `~/.finlink/credentials`
pub fn default_credentials_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".finlink")
        .join("credentials")
}

// Keys are lowercased on load so `ACCESS_KEY = ...` works too.
fn lookup(section: &HashMap<String, String>, key: &str) -> Option<String> {
    section
        .get(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
