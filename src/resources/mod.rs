//! Typed access to the tracker's resource endpoints.
//!
//! Every call runs through the authorized [`ApiClient`] pipeline, so token
//! renewal is transparent here.

mod models;
mod projects;
mod reports;
mod users;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

pub use models::{
    Dependency, Milestone, ProfileUpdate, Project, ProjectBundle, ProjectDraft, ReportKind,
    ReportQuery, User,
};

use crate::error::Error;
use crate::pipeline::{ApiClient, ApiRequest};
use crate::transport::Transport;

/// Resource API bound to a cancellation scope.
///
/// Views take a [`scoped`](TrackerApi::scoped) copy tied to their own
/// lifetime and cancel it on teardown.
pub struct TrackerApi<T> {
    api: ApiClient<T>,
    cancel: CancellationToken,
}

impl<T> Clone for TrackerApi<T> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<T: Transport> TrackerApi<T> {
    #[must_use]
    pub fn new(api: ApiClient<T>) -> Self {
        Self {
            api,
            cancel: CancellationToken::new(),
        }
    }

    /// Copy whose calls abort when `cancel` fires.
    #[must_use]
    pub fn scoped(&self, cancel: CancellationToken) -> Self {
        Self {
            api: self.api.clone(),
            cancel,
        }
    }

    #[must_use]
    pub fn client(&self) -> &ApiClient<T> {
        &self.api
    }

    async fn fetch<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, Error> {
        self.api.execute_json(request, &self.cancel).await
    }

    /// Run `request` and discard the body.
    async fn send(&self, request: ApiRequest) -> Result<(), Error> {
        self.api.execute(request, &self.cancel).await.map(drop)
    }
}

/// Encode a user-supplied identifier as one path segment.
fn segment(id: &impl std::fmt::Display) -> String {
    urlencoding::encode(&id.to_string()).into_owned()
}
