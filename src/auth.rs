use serde::{Deserialize, Serialize};

use crate::error::{ApiErrorBody, Error};
use crate::pipeline::ApiClient;
use crate::session::{Session, SessionStore};
use crate::transport::{Method, OutboundRequest, RawResponse, Transport};
use crate::types::{Role, UserId};

/// Username/password pair sent to the auth endpoints.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of a successful `POST /auth/login`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    role: String,
    #[serde(default)]
    user_id: Option<UserId>,
}

/// Login, registration and logout against the tracker API.
///
/// Auth calls go straight to the transport: they never carry a bearer
/// credential and are never part of the refresh-and-retry cycle.
pub struct AuthClient<T> {
    api: ApiClient<T>,
}

impl<T> Clone for AuthClient<T> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
        }
    }
}

impl<T: Transport> AuthClient<T> {
    #[must_use]
    pub fn new(api: ApiClient<T>) -> Self {
        Self { api }
    }

    fn session(&self) -> &SessionStore {
        self.api.session()
    }

    /// Authenticate and persist the resulting session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the API rejects the credentials (the body
    /// carries its `message`), [`Error::Decode`] if the response is malformed
    /// or names an unknown role, and [`Error::Network`] on transport failure.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, Error> {
        let response = self.post("/auth/login", credentials).await?;
        let response = ensure_success(response)?;
        let login: LoginResponse = serde_json::from_str(&response.body)?;
        let role: Role = login.role.parse()?;

        let session = Session {
            access_token: Some(login.access_token),
            refresh_token: Some(login.refresh_token),
            role: Some(role),
            user_id: login.user_id,
        };
        self.session().save(session.clone()).await?;

        tracing::info!(
            username = %credentials.username,
            role = %role,
            user_id = ?session.user_id,
            "Login successful"
        );
        Ok(session)
    }

    /// Create an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the passwords differ (nothing is sent),
    /// or [`Error::Api`] / [`Error::Network`] from the call itself.
    pub async fn register(
        &self,
        credentials: &Credentials,
        confirm_password: &str,
    ) -> Result<(), Error> {
        if credentials.password != confirm_password {
            return Err(Error::Validation("Passwords do not match.".into()));
        }
        let response = self.post("/auth/register", credentials).await?;
        ensure_success(response)?;
        tracing::info!(username = %credentials.username, "Registration successful");
        Ok(())
    }

    /// Forget the session, then tell the API to revoke the refresh token.
    ///
    /// Local state is cleared before the network call, so a failed or skipped
    /// revocation still leaves the client logged out.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] only if the session could not be cleared.
    pub async fn logout(&self) -> Result<(), Error> {
        let refresh_token = self.session().read().await?.refresh_token;
        self.session().clear().await?;

        let Some(refresh_token) = refresh_token else {
            return Ok(());
        };

        let body = serde_json::json!({ "refreshToken": refresh_token });
        match self.post("/auth/logout", &body).await.and_then(ensure_success) {
            Ok(_) => tracing::info!("Logged out"),
            Err(e) => tracing::warn!(error = %e, "Logout call failed; session already cleared"),
        }
        Ok(())
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<RawResponse, Error> {
        self.api
            .transport()
            .send(OutboundRequest {
                method: Method::Post,
                path: path.to_owned(),
                query: Vec::new(),
                bearer: None,
                body: Some(serde_json::to_value(body)?),
            })
            .await
    }
}

/// Returns the response on 2xx, or an [`Error::Api`] with its details.
fn ensure_success(response: RawResponse) -> Result<RawResponse, Error> {
    if response.is_success() {
        return Ok(response);
    }
    Err(Error::Api {
        status: response.status,
        body: ApiErrorBody::from_text(response.body),
    })
}
