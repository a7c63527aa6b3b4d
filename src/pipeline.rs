//! Authorized request pipeline.
//!
//! Every call reads the session fresh, attaches the access token as a bearer
//! credential, and on a 403 performs a single refresh-and-retry before giving
//! up with [`Error::SessionExpired`].

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::RefreshPolicy;
use crate::error::{ApiErrorBody, Error};
use crate::session::SessionStore;
use crate::transport::{Method, OutboundRequest, RawResponse, Transport};

const REFRESH_PATH: &str = "/auth/refresh";
const FORBIDDEN: u16 = 403;

/// Description of one logical API operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<JsonValue>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    #[must_use]
    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    fn outbound(&self, bearer: Option<String>) -> OutboundRequest {
        OutboundRequest {
            method: self.method,
            path: self.path.clone(),
            query: self.query.clone(),
            bearer,
            body: self.body.clone(),
        }
    }
}

/// Which attempt of a logical operation is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    Retried,
}

/// Successful (2xx) response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_str(&self.body).map_err(Into::into)
    }
}

enum Step {
    Complete(ApiResponse),
    /// First attempt got 403. Carries the token that was presented.
    Forbidden(Option<String>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

/// Executes API calls with credential attachment and one-shot token renewal.
pub struct ApiClient<T> {
    transport: Arc<T>,
    session: SessionStore,
    policy: RefreshPolicy,
    refresh_gate: Arc<Mutex<()>>,
}

// Manual Clone: avoid derive adding a `T: Clone` bound.
impl<T> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            session: self.session.clone(),
            policy: self.policy,
            refresh_gate: self.refresh_gate.clone(),
        }
    }
}

impl<T: Transport> ApiClient<T> {
    #[must_use]
    pub fn new(transport: T, session: SessionStore) -> Self {
        Self {
            transport: Arc::new(transport),
            session,
            policy: RefreshPolicy::default(),
            refresh_gate: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run `request`, renewing the access token once if the API answers 403.
    ///
    /// If `cancel` has already fired, returns [`Error::Cancelled`] without
    /// touching the session. Cancellation while a call is in flight also yields
    /// `Cancelled` and leaves the session as it was.
    ///
    /// # Errors
    ///
    /// - [`Error::Api`] for any non-2xx other than 403, unchanged.
    /// - [`Error::SessionExpired`] when renewal is impossible or the retry is
    ///   also refused; the session has been cleared.
    /// - [`Error::Network`] when no response was received.
    /// - [`Error::Cancelled`] as above.
    pub async fn execute(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, Error> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut attempt = Attempt::First;
        loop {
            match self.send(&request, attempt, cancel).await? {
                Step::Complete(response) => return Ok(response),
                Step::Forbidden(presented) => {
                    self.renew(presented.as_deref(), cancel).await?;
                    attempt = Attempt::Retried;
                }
            }
        }
    }

    /// [`execute`](Self::execute), then decode the body as `R`.
    ///
    /// # Errors
    ///
    /// As [`execute`](Self::execute), plus [`Error::Decode`].
    pub async fn execute_json<R: DeserializeOwned>(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<R, Error> {
        self.execute(request, cancel).await?.json()
    }

    async fn send(
        &self,
        request: &ApiRequest,
        attempt: Attempt,
        cancel: &CancellationToken,
    ) -> Result<Step, Error> {
        let bearer = self.session.read().await?.access_token;
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            authenticated = bearer.is_some(),
            ?attempt,
            "Sending API request"
        );

        let raw = race(cancel, self.transport.send(request.outbound(bearer.clone()))).await?;

        if raw.status == FORBIDDEN {
            return match attempt {
                Attempt::First => Ok(Step::Forbidden(bearer)),
                Attempt::Retried => {
                    tracing::warn!(path = %request.path, "Retried request refused again");
                    Err(self.expire().await)
                }
            };
        }
        if raw.is_success() {
            return Ok(Step::Complete(ApiResponse {
                status: raw.status,
                body: raw.body,
            }));
        }
        Err(api_error(raw))
    }

    /// Obtain a fresh access token, or clear the session and fail.
    async fn renew(&self, presented: Option<&str>, cancel: &CancellationToken) -> Result<(), Error> {
        let _gate = match self.policy {
            RefreshPolicy::Coalesced => Some(race_ok(cancel, self.refresh_gate.lock()).await?),
            RefreshPolicy::Independent => None,
        };

        let session = self.session.read().await?;
        if self.policy == RefreshPolicy::Coalesced
            && session.access_token.is_some()
            && session.access_token.as_deref() != presented
        {
            tracing::debug!("Access token already renewed by a concurrent request");
            return Ok(());
        }

        let Some(refresh_token) = session.refresh_token else {
            tracing::warn!("Authorization refused and no refresh token stored");
            return Err(self.expire().await);
        };

        let outbound = OutboundRequest {
            method: Method::Post,
            path: REFRESH_PATH.to_owned(),
            query: Vec::new(),
            bearer: None,
            body: Some(serde_json::json!({ "refreshToken": &refresh_token })),
        };

        let access_token = match race(cancel, self.transport.send(outbound)).await {
            Ok(raw) if raw.is_success() => {
                match serde_json::from_str::<RefreshResponse>(&raw.body) {
                    Ok(parsed) => parsed.access_token,
                    Err(e) => {
                        tracing::warn!(error = %e, "Malformed refresh response");
                        return Err(self.expire().await);
                    }
                }
            }
            Ok(raw) => {
                tracing::warn!(status = raw.status, "Token refresh rejected");
                return Err(self.expire().await);
            }
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed");
                return Err(self.expire().await);
            }
        };

        if !self
            .session
            .update_access_token(&refresh_token, access_token)
            .await?
        {
            tracing::warn!("Session cleared or replaced while refreshing; not retrying");
            return Err(Error::SessionExpired);
        }
        tracing::info!("Access token refreshed");
        Ok(())
    }

    /// Clear the session; yields the error the caller should return.
    async fn expire(&self) -> Error {
        match self.session.clear().await {
            Ok(()) => Error::SessionExpired,
            Err(e) => e,
        }
    }
}

async fn race<F>(cancel: &CancellationToken, call: F) -> Result<RawResponse, Error>
where
    F: Future<Output = Result<RawResponse, Error>>,
{
    tokio::select! {
        () = cancel.cancelled() => Err(Error::Cancelled),
        result = call => result,
    }
}

async fn race_ok<F: Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output, Error> {
    tokio::select! {
        () = cancel.cancelled() => Err(Error::Cancelled),
        out = fut => Ok(out),
    }
}

fn api_error(raw: RawResponse) -> Error {
    Error::Api {
        status: raw.status,
        body: ApiErrorBody::from_text(raw.body),
    }
}
