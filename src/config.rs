//! Process configuration for the OTRS connector.
//!
//! This module loads the handful of environment variables that locate the
//! persisted settings file and select the credential protection scope. The
//! endpoint itself (`uri`, `resource`, `user`, ...) lives in the settings
//! store, see [`crate::settings`].

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConnectorError;
use crate::vault::ProtectionScope;

/// Name of the key directory inside the application data directory.
const DEFAULT_KEY_DIR_NAME: &str = "keys";

/// Application directory under the per-user data directory.
const APP_DIR_NAME: &str = "otrs-connector";

/// Process configuration, constructed once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the persisted settings file.
    pub settings_path: PathBuf,

    /// Scope the stored password is protected under.
    pub protection_scope: ProtectionScope,

    /// Directory holding the per-scope master keys.
    pub key_dir: PathBuf,

    /// Optional transport timeout. `None` leaves the request unbounded.
    pub request_timeout: Option<Duration>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `OTRS_SETTINGS_PATH`: path of the settings file
    ///
    /// # Optional Environment Variables
    ///
    /// - `OTRS_PROTECTION_SCOPE`: `user` (default) or `machine`
    /// - `OTRS_KEY_DIR`: master key directory (default
    ///   `<user data dir>/otrs-connector/keys`)
    /// - `OTRS_TIMEOUT_SECS`: transport timeout in seconds
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Config` if a required variable is missing
    /// or a value fails validation.
    pub fn from_env() -> Result<Self, ConnectorError> {
        let settings_path = PathBuf::from(Self::get_required_env("OTRS_SETTINGS_PATH")?);

        let protection_scope = match Self::get_optional_env("OTRS_PROTECTION_SCOPE") {
            Some(value) => ProtectionScope::from_str(&value)?,
            None => ProtectionScope::default(),
        };

        let key_dir = Self::get_optional_env("OTRS_KEY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::default_key_dir(&settings_path));

        let request_timeout = Self::get_optional_env("OTRS_TIMEOUT_SECS")
            .map(|value| Self::parse_timeout(&value))
            .transpose()?;

        Ok(Config {
            settings_path,
            protection_scope,
            key_dir,
            request_timeout,
        })
    }

    /// Creates a configuration for an explicit settings file, using defaults
    /// for everything else.
    pub fn for_settings_file(settings_path: impl Into<PathBuf>) -> Self {
        let settings_path = settings_path.into();
        let key_dir = Self::default_key_dir(&settings_path);
        Config {
            settings_path,
            protection_scope: ProtectionScope::default(),
            key_dir,
            request_timeout: None,
        }
    }

    /// Gets a required environment variable, returning an error if missing or empty.
    fn get_required_env(name: &str) -> Result<String, ConnectorError> {
        Self::get_optional_env(name).ok_or_else(|| ConnectorError::missing_env(name))
    }

    /// Gets an optional environment variable, treating blank values as unset.
    fn get_optional_env(name: &str) -> Option<String> {
        env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Key directory used when `OTRS_KEY_DIR` is unset.
    ///
    /// Keys live in the per-user data directory so that copying the settings
    /// directory does not carry them along. Only when no data directory can
    /// be resolved does the key directory sit next to the settings file.
    fn default_key_dir(settings_path: &Path) -> PathBuf {
        Self::key_dir_in(Self::user_data_dir(Self::get_optional_env), settings_path)
    }

    fn key_dir_in(data_dir: Option<PathBuf>, settings_path: &Path) -> PathBuf {
        match data_dir {
            Some(dir) => dir.join(APP_DIR_NAME).join(DEFAULT_KEY_DIR_NAME),
            None => settings_path
                .parent()
                .map(|dir| dir.join(DEFAULT_KEY_DIR_NAME))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_KEY_DIR_NAME)),
        }
    }

    /// Resolves the per-user data directory: `XDG_DATA_HOME`, then
    /// `LOCALAPPDATA`, then `$HOME/.local/share`.
    fn user_data_dir(lookup: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
        lookup("XDG_DATA_HOME")
            .or_else(|| lookup("LOCALAPPDATA"))
            .map(PathBuf::from)
            .or_else(|| lookup("HOME").map(|home| Path::new(&home).join(".local").join("share")))
    }

    fn parse_timeout(value: &str) -> Result<Duration, ConnectorError> {
        match value.parse::<u64>() {
            Ok(0) | Err(_) => Err(ConnectorError::invalid_config(
                "OTRS_TIMEOUT_SECS must be a positive number of seconds",
            )),
            Ok(secs) => Ok(Duration::from_secs(secs)),
        }
    }

    /// Validates and normalizes an endpoint base URI.
    ///
    /// Surrounding whitespace and trailing slashes are removed.
    pub fn validate_base_url(url: &str) -> Result<String, ConnectorError> {
        let url = url.trim().trim_end_matches('/').to_string();

        if url.is_empty() {
            return Err(ConnectorError::invalid_config(
                "the 'uri' setting is empty - set it to the OTRS web service base address",
            ));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConnectorError::invalid_config(
                "the 'uri' setting must start with http:// or https://",
            ));
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: from_env() is not exercised here because tests share the process
    // environment and run in parallel.

    #[test]
    fn test_validate_base_url_removes_trailing_slash() {
        let result = Config::validate_base_url("https://otrs.example.com/otrs/").unwrap();
        assert_eq!(result, "https://otrs.example.com/otrs");
    }

    #[test]
    fn test_validate_base_url_requires_scheme() {
        assert!(Config::validate_base_url("otrs.example.com").is_err());
    }

    #[test]
    fn test_validate_base_url_rejects_empty() {
        let err = Config::validate_base_url("   ").unwrap_err();
        assert!(err.to_string().contains("uri"));
    }

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name: &str| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn test_user_data_dir_precedence() {
        assert_eq!(
            Config::user_data_dir(lookup(&[("XDG_DATA_HOME", "/xdg"), ("HOME", "/home/ann")])),
            Some(PathBuf::from("/xdg"))
        );
        assert_eq!(
            Config::user_data_dir(lookup(&[("HOME", "/home/ann")])),
            Some(PathBuf::from("/home/ann/.local/share"))
        );
        assert_eq!(Config::user_data_dir(lookup(&[])), None);
    }

    #[test]
    fn test_default_key_dir_is_outside_settings_dir() {
        let key_dir = Config::key_dir_in(
            Some(PathBuf::from("/home/ann/.local/share")),
            Path::new("/var/lib/otrs/settings.json"),
        );
        assert_eq!(key_dir, PathBuf::from("/home/ann/.local/share/otrs-connector/keys"));
        assert!(!key_dir.starts_with("/var/lib/otrs"));
    }

    #[test]
    fn test_key_dir_without_data_dir_falls_back_to_settings_dir() {
        let key_dir = Config::key_dir_in(None, Path::new("/var/lib/otrs/settings.json"));
        assert_eq!(key_dir, PathBuf::from("/var/lib/otrs/keys"));
    }

    #[test]
    fn test_for_settings_file_defaults() {
        let config = Config::for_settings_file("/var/lib/otrs/settings.json");
        assert_eq!(config.settings_path, PathBuf::from("/var/lib/otrs/settings.json"));
        assert_eq!(config.protection_scope, ProtectionScope::CurrentUser);
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(Config::parse_timeout("15").unwrap(), Duration::from_secs(15));
        assert!(Config::parse_timeout("0").is_err());
        assert!(Config::parse_timeout("soon").is_err());
    }
}
