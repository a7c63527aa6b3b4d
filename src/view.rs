//! What a view does with the result of a call.
//!
//! Failed loads never blank a view: [`Loadable`] keeps the last good value and
//! turns the error into an [`Outcome`] the view acts on.

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Success,
    Warning,
    Info,
}

/// A dismissible message shown above a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
}

/// Ordered, dismissible notices.
#[derive(Debug, Default)]
pub struct Notices {
    next_id: u64,
    items: Vec<Notice>,
}

impl Notices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a notice and return its id.
    pub fn push(&mut self, kind: NoticeKind, message: impl Into<String>) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.items.push(Notice {
            id,
            kind,
            message: message.into(),
        });
        id
    }

    /// Remove the notice with `id`; returns whether it was present.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    #[must_use]
    pub fn items(&self) -> &[Notice] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// How a view should react to a finished call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Loaded,
    /// Keep showing current data and display this message.
    Notify(NoticeKind, String),
    /// Credentials are gone; leave for the login view.
    RedirectToLogin,
    /// The view gave up on the call; nothing to show.
    Ignored,
}

impl Outcome {
    #[must_use]
    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::SessionExpired => Outcome::RedirectToLogin,
            Error::Cancelled => Outcome::Ignored,
            Error::Api { body, .. } => Outcome::Notify(NoticeKind::Error, body.message()),
            other => Outcome::Notify(NoticeKind::Error, other.to_string()),
        }
    }

    /// Push the notice, if any, onto `notices`.
    pub fn report(&self, notices: &mut Notices) {
        if let Outcome::Notify(kind, message) = self {
            notices.push(*kind, message.clone());
        }
    }
}

/// Last successfully loaded value of a view.
#[derive(Debug, Clone, PartialEq)]
pub struct Loadable<T> {
    value: Option<T>,
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T> Loadable<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a fresh result: success replaces the value, failure keeps it.
    pub fn apply(&mut self, result: Result<T, Error>) -> Outcome {
        match result {
            Ok(value) => {
                self.value = Some(value);
                Outcome::Loaded
            }
            Err(e) => {
                tracing::debug!(error = %e, "Keeping previously loaded data");
                Outcome::from_error(&e)
            }
        }
    }

    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Drop the value, e.g. when the view's subject changes.
    pub fn reset(&mut self) {
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorBody;

    #[test]
    fn failure_keeps_stale_value() {
        let mut projects = Loadable::new();
        assert_eq!(projects.apply(Ok(vec![1, 2])), Outcome::Loaded);

        let outcome = projects.apply(Err(Error::Network("timeout".into())));

        assert!(matches!(outcome, Outcome::Notify(NoticeKind::Error, _)));
        assert_eq!(projects.get(), Some(&vec![1, 2]));
    }

    #[test]
    fn session_expiry_redirects() {
        let mut data: Loadable<u8> = Loadable::new();
        assert_eq!(data.apply(Err(Error::SessionExpired)), Outcome::RedirectToLogin);
    }

    #[test]
    fn cancelled_call_is_ignored_silently() {
        let mut data = Loadable::new();
        data.apply(Ok("kept"));
        let mut notices = Notices::new();

        let outcome = data.apply(Err(Error::Cancelled));
        outcome.report(&mut notices);

        assert_eq!(outcome, Outcome::Ignored);
        assert!(notices.is_empty());
        assert_eq!(data.get(), Some(&"kept"));
    }

    #[test]
    fn api_error_uses_server_message() {
        let err = Error::Api {
            status: 409,
            body: ApiErrorBody::Json(serde_json::json!({ "error": "already cleared" })),
        };
        assert_eq!(
            Outcome::from_error(&err),
            Outcome::Notify(NoticeKind::Error, "already cleared".into())
        );
    }

    #[test]
    fn notices_dismiss_by_id() {
        let mut notices = Notices::new();
        let a = notices.push(NoticeKind::Success, "Milestone added successfully!");
        let b = notices.push(NoticeKind::Error, "Error adding dependency.");
        assert!(b > a);

        assert!(notices.dismiss(a));
        assert!(!notices.dismiss(a));
        assert_eq!(notices.items().len(), 1);
        assert_eq!(notices.items()[0].id, b);
    }

    #[test]
    fn outcome_report_only_pushes_notifications() {
        let mut notices = Notices::new();
        Outcome::Loaded.report(&mut notices);
        Outcome::RedirectToLogin.report(&mut notices);
        assert!(notices.is_empty());

        Outcome::Notify(NoticeKind::Warning, "stale".into()).report(&mut notices);
        assert_eq!(notices.items()[0].kind, NoticeKind::Warning);
    }
}
