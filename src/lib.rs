#![doc = include_str!("../README.md")]

pub mod auth;
mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod pipeline;
pub mod resources;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;
pub mod types;
pub mod view;

// Re-exports for convenient access
pub use auth::{AuthClient, Credentials};
pub use client::Tracker;
pub use config::{ClientConfig, RefreshPolicy};
pub use error::{ApiErrorBody, Error};
pub use guard::{Action, Navigation, Redirect, Route, RouteGuard, authorize};
pub use pipeline::{ApiClient, ApiRequest, ApiResponse, Attempt};
pub use resources::TrackerApi;
pub use session::{FileStorage, MemoryStorage, Session, SessionStorage, SessionStore};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{Method, Transport};
pub use types::{DependencyId, MilestoneId, ProjectId, Role, UserId};
pub use tokio_util::sync::CancellationToken;
