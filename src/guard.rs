//! Role-gated navigation.
//!
//! One static table maps every route and every role-sensitive view action to
//! the roles allowed to use it. Views consult [`Action::is_visible_to`];
//! navigation goes through [`RouteGuard`].

use tokio::sync::watch;

use crate::error::Error;
use crate::session::{Session, SessionStore};
use crate::types::{ProjectId, Role, UserId};

const ANY_ROLE: &[Role] = &[Role::User, Role::Editor, Role::Admin];
const EDITOR: &[Role] = &[Role::Editor];
const EDITOR_OR_ADMIN: &[Role] = &[Role::Editor, Role::Admin];
const ADMIN: &[Role] = &[Role::Admin];
const CONTRACTOR: &[Role] = &[Role::User];

/// Navigable views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Unauthorized,
    /// Dashboard with the project list.
    Home,
    ProjectDetails(ProjectId),
    CreateProject,
    EditProject(ProjectId),
    Report,
    UserProfile(UserId),
    Users,
    NotFound,
}

impl Route {
    /// Map a location path to its route.
    #[must_use]
    pub fn resolve(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Route::Home,
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["unauthorized"] => Route::Unauthorized,
            ["create"] => Route::CreateProject,
            ["report"] => Route::Report,
            ["users"] => Route::Users,
            ["projects", id] => id
                .parse()
                .map_or(Route::NotFound, |id| Route::ProjectDetails(ProjectId(id))),
            ["edit", id] => id
                .parse()
                .map_or(Route::NotFound, |id| Route::EditProject(ProjectId(id))),
            ["user", id] => urlencoding::decode(id)
                .map_or(Route::NotFound, |id| Route::UserProfile(UserId(id.into_owned()))),
            _ => Route::NotFound,
        }
    }

    /// Canonical location path.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".into(),
            Route::Register => "/register".into(),
            Route::Unauthorized => "/unauthorized".into(),
            Route::Home => "/".into(),
            Route::ProjectDetails(id) => format!("/projects/{id}"),
            Route::CreateProject => "/create".into(),
            Route::EditProject(id) => format!("/edit/{id}"),
            Route::Report => "/report".into(),
            Route::UserProfile(id) => format!("/user/{}", urlencoding::encode(&id.0)),
            Route::Users => "/users".into(),
            Route::NotFound => "/404".into(),
        }
    }

    /// Roles admitted to this route; `None` for public routes.
    #[must_use]
    pub fn allowed_roles(&self) -> Option<&'static [Role]> {
        match self {
            Route::Login | Route::Register | Route::Unauthorized | Route::NotFound => None,
            Route::Home
            | Route::ProjectDetails(_)
            | Route::Report
            | Route::UserProfile(_) => Some(ANY_ROLE),
            Route::CreateProject => Some(EDITOR),
            Route::EditProject(_) => Some(EDITOR_OR_ADMIN),
            Route::Users => Some(ADMIN),
        }
    }
}

/// Role-sensitive controls within views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreateProject,
    DeleteProject,
    EditProject,
    AddMilestone,
    AddDependency,
    ClearDependency,
    ManageUsers,
}

impl Action {
    #[must_use]
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Action::CreateProject | Action::DeleteProject => EDITOR,
            Action::EditProject | Action::ClearDependency => EDITOR_OR_ADMIN,
            Action::AddMilestone | Action::AddDependency => CONTRACTOR,
            Action::ManageUsers => ADMIN,
        }
    }

    #[must_use]
    pub fn is_visible_to(&self, role: Option<Role>) -> bool {
        authorize(self.allowed_roles(), role) == Navigation::Admit
    }
}

/// Where a navigation attempt ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Admit,
    Redirect(Redirect),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    /// No session at all.
    Login,
    /// Logged in, but the role is not allowed here.
    Unauthorized,
}

impl Redirect {
    #[must_use]
    pub fn route(&self) -> Route {
        match self {
            Redirect::Login => Route::Login,
            Redirect::Unauthorized => Route::Unauthorized,
        }
    }
}

/// Admit iff `current` is present and in `required`. An empty `required` admits nobody.
#[must_use]
pub fn authorize(required: &[Role], current: Option<Role>) -> Navigation {
    match current {
        None => Navigation::Redirect(Redirect::Login),
        Some(role) if required.contains(&role) => Navigation::Admit,
        Some(_) => Navigation::Redirect(Redirect::Unauthorized),
    }
}

fn decide(route: &Route, session: &Session) -> Navigation {
    match route.allowed_roles() {
        None => Navigation::Admit,
        Some(required) => authorize(required, session.effective_role()),
    }
}

/// Admits or redirects navigation using the role held by the session store.
#[derive(Clone)]
pub struct RouteGuard {
    session: SessionStore,
}

impl RouteGuard {
    #[must_use]
    pub fn new(session: SessionStore) -> Self {
        Self { session }
    }

    /// Decide `route` from the role as persisted right now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the session cannot be read.
    pub async fn check(&self, route: &Route) -> Result<Navigation, Error> {
        let session = self.session.read().await?;
        let decision = decide(route, &session);
        if let Navigation::Redirect(to) = decision {
            tracing::debug!(route = %route.path(), ?to, "Navigation denied");
        }
        Ok(decision)
    }

    /// Keep deciding `route` as the session changes, e.g. after a logout in
    /// another context.
    #[must_use]
    pub fn watch(&self, route: Route) -> GuardWatch {
        GuardWatch {
            route,
            changes: self.session.subscribe(),
        }
    }
}

/// Re-evaluates one route on each session change.
pub struct GuardWatch {
    route: Route,
    changes: watch::Receiver<Session>,
}

impl GuardWatch {
    #[must_use]
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Decision for the latest published session.
    #[must_use]
    pub fn current(&self) -> Navigation {
        decide(&self.route, &self.changes.borrow())
    }

    /// Wait for the next session change and return the new decision.
    ///
    /// Returns `None` once the session store has been dropped.
    pub async fn changed(&mut self) -> Option<Navigation> {
        self.changes.changed().await.ok()?;
        Some(decide(&self.route, &self.changes.borrow_and_update()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_known_paths() {
        assert_eq!(Route::resolve("/"), Route::Home);
        assert_eq!(Route::resolve("/create"), Route::CreateProject);
        assert_eq!(Route::resolve("/projects/14"), Route::ProjectDetails(ProjectId(14)));
        assert_eq!(Route::resolve("/edit/3/"), Route::EditProject(ProjectId(3)));
        assert_eq!(Route::resolve("/user/u%2F1"), Route::UserProfile(UserId::from("u/1")));
        assert_eq!(Route::resolve("/report?type=projects"), Route::Report);
        assert_eq!(Route::resolve("/users"), Route::Users);
    }

    #[test]
    fn resolve_unknown_paths() {
        assert_eq!(Route::resolve("/projects/abc"), Route::NotFound);
        assert_eq!(Route::resolve("/settings"), Route::NotFound);
        assert_eq!(Route::resolve("/projects/1/extra"), Route::NotFound);
    }

    #[test]
    fn path_resolves_back_to_route() {
        for route in [
            Route::Home,
            Route::ProjectDetails(ProjectId(8)),
            Route::EditProject(ProjectId(2)),
            Route::UserProfile(UserId::from("a b")),
            Route::Users,
        ] {
            assert_eq!(Route::resolve(&route.path()), route);
        }
    }

    #[test]
    fn authorize_membership() {
        assert_eq!(authorize(EDITOR, Some(Role::User)), Navigation::Redirect(Redirect::Unauthorized));
        assert_eq!(authorize(ANY_ROLE, Some(Role::User)), Navigation::Admit);
        assert_eq!(authorize(EDITOR, None), Navigation::Redirect(Redirect::Login));
        assert_eq!(authorize(&[], Some(Role::Admin)), Navigation::Redirect(Redirect::Unauthorized));
    }

    #[test]
    fn permission_table() {
        let admitted = |route: Route, role: Role| {
            authorize(route.allowed_roles().unwrap(), Some(role)) == Navigation::Admit
        };

        assert!(admitted(Route::CreateProject, Role::Editor));
        assert!(!admitted(Route::CreateProject, Role::Admin));
        assert!(admitted(Route::EditProject(ProjectId(1)), Role::Admin));
        assert!(!admitted(Route::EditProject(ProjectId(1)), Role::User));
        assert!(admitted(Route::Users, Role::Admin));
        assert!(!admitted(Route::Users, Role::Editor));
        for role in Role::ALL {
            assert!(admitted(Route::Report, role));
            assert!(admitted(Route::ProjectDetails(ProjectId(1)), role));
        }
        assert_eq!(Route::Login.allowed_roles(), None);
    }

    #[test]
    fn action_visibility() {
        assert!(Action::AddMilestone.is_visible_to(Some(Role::User)));
        assert!(!Action::AddMilestone.is_visible_to(Some(Role::Editor)));
        assert!(Action::CreateProject.is_visible_to(Some(Role::Editor)));
        assert!(!Action::ClearDependency.is_visible_to(Some(Role::User)));
        assert!(Action::ManageUsers.is_visible_to(Some(Role::Admin)));
        assert!(!Action::EditProject.is_visible_to(None));
    }

    #[tokio::test]
    async fn check_reads_role_fresh() {
        let store = SessionStore::in_memory();
        let guard = RouteGuard::new(store.clone());

        assert_eq!(
            guard.check(&Route::CreateProject).await.unwrap(),
            Navigation::Redirect(Redirect::Login)
        );

        store
            .save(Session::authenticated("A", "R", Role::Editor, "1"))
            .await
            .unwrap();
        assert_eq!(guard.check(&Route::CreateProject).await.unwrap(), Navigation::Admit);

        store
            .save(Session::authenticated("A", "R", Role::User, "2"))
            .await
            .unwrap();
        assert_eq!(
            guard.check(&Route::CreateProject).await.unwrap(),
            Navigation::Redirect(Redirect::Unauthorized)
        );
    }

    #[tokio::test]
    async fn public_routes_always_admit() {
        let guard = RouteGuard::new(SessionStore::in_memory());
        assert_eq!(guard.check(&Route::Login).await.unwrap(), Navigation::Admit);
        assert_eq!(guard.check(&Route::Unauthorized).await.unwrap(), Navigation::Admit);
    }

    #[tokio::test]
    async fn watch_redirects_after_logout() {
        let store = SessionStore::in_memory();
        store
            .save(Session::authenticated("A", "R", Role::Admin, "1"))
            .await
            .unwrap();
        let guard = RouteGuard::new(store.clone());
        let mut watch = guard.watch(Route::Users);
        assert_eq!(watch.current(), Navigation::Admit);

        store.clear().await.unwrap();

        assert_eq!(
            watch.changed().await,
            Some(Navigation::Redirect(Redirect::Login))
        );
    }
}
