//! Client configuration loaded via OrthoConfig.
//!
//! Values come from `STOREFRONT_*` environment variables or a configuration
//! file; command-line flags are applied on top by the binary.

use std::ffi::OsString;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::domain::Locale;

const DEFAULT_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration value that failed to parse.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// `base_url` is not an absolute URL.
    #[error("invalid base URL `{value}`: {source}")]
    BaseUrl {
        /// Offending value.
        value: String,
        /// Parser error.
        source: url::ParseError,
    },
    /// `locale` names no supported locale.
    #[error("unsupported locale `{0}`")]
    Locale(String),
    /// Sources could not be read or merged.
    #[error("failed to load settings: {0}")]
    Load(String),
}

/// Settings for talking to the storefront API.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "STOREFRONT")]
pub struct StorefrontSettings {
    /// Base URL of the REST API.
    pub base_url: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Locale for fallback error copy.
    pub locale: Option<String>,
}

impl StorefrontSettings {
    /// Load from the environment and configuration files only.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Load`] when a source cannot be merged.
    pub fn from_environment() -> Result<Self, SettingsError> {
        Self::load_from_iter([OsString::from("storefront")])
            .map_err(|error| SettingsError::Load(error.to_string()))
    }

    /// Replace values with the ones given explicitly, leaving the rest.
    #[must_use]
    pub fn overridden_by(self, overrides: Self) -> Self {
        Self {
            base_url: overrides.base_url.or(self.base_url),
            request_timeout_secs: overrides.request_timeout_secs.or(self.request_timeout_secs),
            locale: overrides.locale.or(self.locale),
        }
    }

    /// Configured base URL, falling back to the local development server.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::BaseUrl`] when the value does not parse.
    pub fn base_url(&self) -> Result<Url, SettingsError> {
        let value = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        Url::parse(value).map_err(|source| SettingsError::BaseUrl {
            value: value.to_owned(),
            source,
        })
    }

    /// Configured request timeout; zero is raised to one second.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
                .max(1),
        )
    }

    /// Configured locale, falling back to English.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Locale`] for unsupported tags.
    pub fn locale(&self) -> Result<Locale, SettingsError> {
        self.locale.as_deref().map_or(Ok(Locale::default()), |tag| {
            tag.parse()
                .map_err(|_| SettingsError::Locale(tag.to_owned()))
        })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing.

    use super::*;

    use env_lock::lock_env;
    use rstest::rstest;

    fn load() -> StorefrontSettings {
        StorefrontSettings::from_environment().expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env([
            ("STOREFRONT_BASE_URL", None::<String>),
            ("STOREFRONT_REQUEST_TIMEOUT_SECS", None::<String>),
            ("STOREFRONT_LOCALE", None::<String>),
        ]);

        let settings = load();
        assert_eq!(
            settings.base_url().expect("default parses").as_str(),
            "http://localhost:5000/"
        );
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.locale().expect("default locale"), Locale::En);
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("STOREFRONT_BASE_URL", Some("https://shop.example".to_owned())),
            ("STOREFRONT_REQUEST_TIMEOUT_SECS", Some("5".to_owned())),
            ("STOREFRONT_LOCALE", Some("fr-CA".to_owned())),
        ]);

        let settings = load();
        assert_eq!(
            settings.base_url().expect("url parses").host_str(),
            Some("shop.example")
        );
        assert_eq!(settings.request_timeout(), Duration::from_secs(5));
        assert_eq!(settings.locale().expect("locale parses"), Locale::Fr);
    }

    #[rstest]
    fn explicit_values_win_over_loaded_ones() {
        let loaded = StorefrontSettings {
            base_url: Some("https://env.example".into()),
            request_timeout_secs: Some(10),
            locale: None,
        };
        let flags = StorefrontSettings {
            locale: Some("es".into()),
            request_timeout_secs: Some(0),
            ..StorefrontSettings::default()
        };

        let merged = loaded.overridden_by(flags);
        assert_eq!(merged.base_url.as_deref(), Some("https://env.example"));
        assert_eq!(merged.request_timeout(), Duration::from_secs(1));
        assert_eq!(merged.locale().expect("locale parses"), Locale::Es);
    }

    #[rstest]
    #[case(StorefrontSettings { base_url: Some("not a url".into()), ..StorefrontSettings::default() })]
    fn malformed_base_url_is_reported(#[case] settings: StorefrontSettings) {
        assert!(matches!(
            settings.base_url(),
            Err(SettingsError::BaseUrl { .. })
        ));
    }

    #[test]
    fn unknown_locale_is_reported() {
        let settings = StorefrontSettings {
            locale: Some("de".into()),
            ..StorefrontSettings::default()
        };
        assert!(matches!(settings.locale(), Err(SettingsError::Locale(tag)) if tag == "de"));
    }
}
