use crate::auth::AuthClient;
use crate::config::RefreshPolicy;
use crate::guard::RouteGuard;
use crate::pipeline::ApiClient;
use crate::resources::TrackerApi;
use crate::session::SessionStore;
use crate::transport::Transport;

/// All client components wired to one session store.
pub struct Tracker<T> {
    pub session: SessionStore,
    pub auth: AuthClient<T>,
    pub api: TrackerApi<T>,
    pub guard: RouteGuard,
}

impl<T: Transport> Tracker<T> {
    #[must_use]
    pub fn new(transport: T, session: SessionStore, policy: RefreshPolicy) -> Self {
        let client = ApiClient::new(transport, session.clone()).with_refresh_policy(policy);
        Self {
            auth: AuthClient::new(client.clone()),
            api: TrackerApi::new(client),
            guard: RouteGuard::new(session.clone()),
            session,
        }
    }
}

#[cfg(feature = "http")]
impl Tracker<crate::transport::HttpTransport> {
    /// Build an HTTP-backed client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the HTTP client cannot be
    /// built, or [`Error::Storage`](crate::Error::Storage) if an existing session
    /// file cannot be read.
    pub async fn connect(config: &crate::config::ClientConfig) -> Result<Self, crate::Error> {
        let transport = crate::transport::HttpTransport::new(config)?;
        let session = SessionStore::from_config(config).await?;
        tracing::debug!(
            api_url = %config.api_url(),
            persistent = config.session_file().is_some(),
            "Tracker client ready"
        );
        Ok(Self::new(transport, session, config.refresh_policy()))
    }
}
