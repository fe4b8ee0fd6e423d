//! Engine configuration loaded via OrthoConfig.
//!
//! The request timeout defaults to thirty seconds. The remaining values are
//! optional; accessors fall back to the public service endpoints and a local
//! API prefix.

use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_API_PREFIX: &str = "http://localhost:8080/api/";
const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/";
const DEFAULT_ROUTER_URL: &str = "https://router.project-osrm.org/";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_USER_AGENT: &str = concat!("quickroute-engine/", env!("CARGO_PKG_VERSION"));

/// Errors raised while interpreting configured values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// A configured URL could not be parsed.
    #[error("invalid {field} '{value}': {reason}")]
    InvalidUrl {
        /// Setting name.
        field: &'static str,
        /// Configured text.
        value: String,
        /// Parser message.
        reason: String,
    },
    /// The request timeout must be positive.
    #[error("request_timeout_secs must be greater than zero")]
    ZeroTimeout,
}

/// Configuration values for the outbound adapters and the state store.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "QUICKROUTE")]
pub struct EngineSettings {
    /// Base URL of the QuickRoute API (driver import and optimization).
    pub api_prefix: Option<String>,
    /// Base URL of the Nominatim instance.
    pub geocoder_url: Option<String>,
    /// Base URL of the OSRM instance.
    pub router_url: Option<String>,
    /// Per-request timeout for every outbound call, in seconds.
    #[ortho_config(default = 30)]
    pub request_timeout_secs: u64,
    /// User-agent sent to every service.
    pub user_agent: Option<String>,
    /// Directory holding the JSON state snapshot. Persistence is off when
    /// unset.
    pub state_dir: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            api_prefix: None,
            geocoder_url: None,
            router_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: None,
            state_dir: None,
        }
    }
}

impl EngineSettings {
    /// QuickRoute API prefix.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] when the value is not a URL.
    pub fn api_prefix(&self) -> Result<Url, SettingsError> {
        base_url("api_prefix", self.api_prefix.as_deref(), DEFAULT_API_PREFIX)
    }

    /// Nominatim base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] when the value is not a URL.
    pub fn geocoder_url(&self) -> Result<Url, SettingsError> {
        base_url("geocoder_url", self.geocoder_url.as_deref(), DEFAULT_GEOCODER_URL)
    }

    /// OSRM base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] when the value is not a URL.
    pub fn router_url(&self) -> Result<Url, SettingsError> {
        base_url("router_url", self.router_url.as_deref(), DEFAULT_ROUTER_URL)
    }

    /// Timeout applied to every outbound request.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::ZeroTimeout`] for a zero timeout.
    pub fn request_timeout(&self) -> Result<Duration, SettingsError> {
        match self.request_timeout_secs {
            0 => Err(SettingsError::ZeroTimeout),
            secs => Ok(Duration::from_secs(secs)),
        }
    }

    /// User-agent for outbound requests.
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    /// State snapshot directory, if persistence is enabled.
    pub fn state_dir(&self) -> Option<&PathBuf> {
        self.state_dir.as_ref()
    }
}

/// Parse `value` (or `default`) as a base URL, adding the trailing slash
/// that `Url::join` needs to keep the last path segment.
fn base_url(field: &'static str, value: Option<&str>, default: &str) -> Result<Url, SettingsError> {
    let raw = value.map_or(default, str::trim);
    let normalised = if raw.ends_with('/') {
        raw.to_owned()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&normalised).map_err(|error| SettingsError::InvalidUrl {
        field,
        value: raw.to_owned(),
        reason: error.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(SettingsError::InvalidUrl {
            field,
            value: raw.to_owned(),
            reason: "URL cannot be used as a base".to_owned(),
        });
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    //! Unit tests for engine configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 6] = [
        "QUICKROUTE_API_PREFIX",
        "QUICKROUTE_GEOCODER_URL",
        "QUICKROUTE_ROUTER_URL",
        "QUICKROUTE_REQUEST_TIMEOUT_SECS",
        "QUICKROUTE_USER_AGENT",
        "QUICKROUTE_STATE_DIR",
    ];

    fn load_from_empty_args() -> EngineSettings {
        EngineSettings::load_from_iter([OsString::from("resolve-route")])
            .expect("config should load")
    }

    #[rstest]
    fn defaults_are_used_when_missing() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.api_prefix().expect("default url").as_str(),
            DEFAULT_API_PREFIX
        );
        assert_eq!(
            settings.geocoder_url().expect("default url").as_str(),
            DEFAULT_GEOCODER_URL
        );
        assert_eq!(
            settings.router_url().expect("default url").as_str(),
            DEFAULT_ROUTER_URL
        );
        assert_eq!(
            settings.request_timeout().expect("default timeout"),
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
        assert_eq!(settings.user_agent(), DEFAULT_USER_AGENT);
        assert!(settings.state_dir().is_none());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("QUICKROUTE_API_PREFIX", Some("https://dispatch.example.test/api".to_owned())),
            ("QUICKROUTE_GEOCODER_URL", None),
            ("QUICKROUTE_ROUTER_URL", Some("http://osrm.internal:5000".to_owned())),
            ("QUICKROUTE_REQUEST_TIMEOUT_SECS", Some("5".to_owned())),
            ("QUICKROUTE_USER_AGENT", Some("dispatch-desk/2".to_owned())),
            ("QUICKROUTE_STATE_DIR", Some("/tmp/quickroute".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(
            settings.api_prefix().expect("valid url").as_str(),
            "https://dispatch.example.test/api/"
        );
        assert_eq!(
            settings.router_url().expect("valid url").as_str(),
            "http://osrm.internal:5000/"
        );
        assert_eq!(
            settings.request_timeout().expect("valid timeout"),
            Duration::from_secs(5)
        );
        assert_eq!(settings.user_agent(), "dispatch-desk/2");
        assert_eq!(settings.state_dir(), Some(&PathBuf::from("/tmp/quickroute")));
    }

    #[rstest]
    fn manual_default_matches_loaded_default() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let loaded = load_from_empty_args();
        let manual = EngineSettings::default();
        assert_eq!(loaded.request_timeout_secs, manual.request_timeout_secs);
        assert_eq!(loaded.user_agent(), manual.user_agent());
    }

    #[rstest]
    #[case::not_a_url("not a url")]
    #[case::no_base("mailto:ops@example.test")]
    fn unusable_urls_are_reported(#[case] raw: &str) {
        let settings = EngineSettings {
            geocoder_url: Some(raw.to_owned()),
            ..EngineSettings::default()
        };
        let error = settings.geocoder_url().expect_err("invalid url");
        assert!(
            matches!(error, SettingsError::InvalidUrl { field: "geocoder_url", .. }),
            "{error}"
        );
    }

    #[rstest]
    fn zero_timeout_is_rejected() {
        let settings = EngineSettings {
            request_timeout_secs: 0,
            ..EngineSettings::default()
        };
        assert_eq!(settings.request_timeout(), Err(SettingsError::ZeroTimeout));
    }
}
