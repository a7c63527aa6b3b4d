use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::Error;

/// How concurrent authorization failures share a token refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// One refresh at a time; callers that queued behind it reuse the new token.
    #[default]
    Coalesced,
    /// Every failing call refreshes on its own.
    Independent,
}

impl std::str::FromStr for RefreshPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coalesced" => Ok(Self::Coalesced),
            "independent" => Ok(Self::Independent),
            other => Err(Error::Config(format!(
                "TRACKER_REFRESH_POLICY: expected `coalesced` or `independent`, got {other:?}"
            ))),
        }
    }
}

/// Tracker client configuration.
///
/// The API base URL is the only required value. Everything else has a default
/// and can be overridden with the `with_*` methods.
///
/// ```rust,ignore
/// use tracker_client::ClientConfig;
///
/// let config = ClientConfig::new("https://tracker.example.com/api".parse()?)
///     .with_session_file("/var/lib/tracker/session.json");
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) api_url: Url,
    pub(crate) session_file: Option<PathBuf>,
    pub(crate) refresh_policy: RefreshPolicy,
    pub(crate) request_timeout: Duration,
}

impl ClientConfig {
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            session_file: None,
            refresh_policy: RefreshPolicy::default(),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `TRACKER_API_URL`: API base URL
    ///
    /// # Optional env vars
    /// - `TRACKER_SESSION_FILE`: persist the session to this JSON file (default: in memory)
    /// - `TRACKER_REFRESH_POLICY`: `coalesced` (default) or `independent`
    /// - `TRACKER_TIMEOUT_SECS`: per-request timeout
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or a value is invalid.
    pub fn from_env() -> Result<Self, Error> {
        let api_url = std::env::var("TRACKER_API_URL")
            .map_err(|_| Error::Config("TRACKER_API_URL is required".into()))?;
        let api_url: Url = api_url
            .parse()
            .map_err(|e| Error::Config(format!("TRACKER_API_URL: {e}")))?;

        let mut config = Self::new(api_url);

        if let Ok(path) = std::env::var("TRACKER_SESSION_FILE") {
            config = config.with_session_file(path);
        }
        if let Ok(policy) = std::env::var("TRACKER_REFRESH_POLICY") {
            config = config.with_refresh_policy(policy.parse()?);
        }
        if let Ok(secs) = std::env::var("TRACKER_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|e| Error::Config(format!("TRACKER_TIMEOUT_SECS: {e}")))?;
            config = config.with_request_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    #[must_use]
    pub fn session_file(&self) -> Option<&std::path::Path> {
        self.session_file.as_deref()
    }

    #[must_use]
    pub fn refresh_policy(&self) -> RefreshPolicy {
        self.refresh_policy
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        "https://tracker.example.com/api".parse().unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::new(base());

        assert_eq!(config.api_url().as_str(), "https://tracker.example.com/api");
        assert!(config.session_file().is_none());
        assert_eq!(config.refresh_policy(), RefreshPolicy::Coalesced);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_config_with_overrides() {
        let config = ClientConfig::new(base())
            .with_session_file("/tmp/session.json")
            .with_refresh_policy(RefreshPolicy::Independent)
            .with_request_timeout(Duration::from_secs(5));

        assert_eq!(
            config.session_file(),
            Some(std::path::Path::new("/tmp/session.json"))
        );
        assert_eq!(config.refresh_policy(), RefreshPolicy::Independent);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_refresh_policy_parse() {
        assert_eq!("Coalesced".parse::<RefreshPolicy>().unwrap(), RefreshPolicy::Coalesced);
        assert_eq!(
            " independent ".parse::<RefreshPolicy>().unwrap(),
            RefreshPolicy::Independent
        );
        assert!(matches!(
            "lock".parse::<RefreshPolicy>(),
            Err(Error::Config(_))
        ));
    }
}
