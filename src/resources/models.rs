use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::Error;
use crate::types::{DependencyId, MilestoneId, ProjectId, Role, UserId};

/// A tracked project. Unrecognised fields are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<JsonValue>,
    #[serde(default)]
    pub assigned_user: Option<JsonValue>,
    #[serde(default, rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(default, rename = "endDate")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub completed_milestones: Option<u32>,
    #[serde(default)]
    pub cleared_dependencies: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Milestone {
    pub id: MilestoneId,
    pub name: String,
    #[serde(default)]
    pub sequence: Option<i64>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Dependency {
    pub id: DependencyId,
    pub name: String,
    #[serde(default)]
    pub cleared: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Raw role string; see [`User::role`].
    #[serde(default, rename = "role")]
    pub role_name: Option<String>,
}

impl User {
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.role_name.as_deref().and_then(|r| r.parse().ok())
    }

    /// Contractors are the only users projects can be assigned to.
    #[must_use]
    pub fn is_assignable(&self) -> bool {
        self.role() == Some(Role::User)
    }
}

/// Fields sent when creating or updating a project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectDraft {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_user_id: Option<UserId>,
}

impl ProjectDraft {
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            assigned_user_id: None,
        }
    }

    #[must_use]
    pub fn with_assigned_user(mut self, user: UserId) -> Self {
        self.assigned_user_id = Some(user);
        self
    }
}

/// Profile change. The password is only sent when a new one is given.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileUpdate {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProfileUpdate {
    /// Build an update, checking the new password against its confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when a password is given and differs from
    /// `confirm_password`.
    pub fn new(
        username: impl Into<String>,
        password: Option<&str>,
        confirm_password: Option<&str>,
    ) -> Result<Self, Error> {
        let password = password.filter(|p| !p.is_empty());
        if password.is_some_and(|p| Some(p) != confirm_password) {
            return Err(Error::Validation("Passwords do not match".into()));
        }
        Ok(Self {
            username: username.into(),
            password: password.map(str::to_owned),
        })
    }
}

/// Report families offered by `GET /reports`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportKind {
    #[default]
    Projects,
    SingleProject,
    ProjectsByUser,
    ProjectsByMilestone,
    ProjectsByUnclearedDependency,
    ProjectDurationByMilestone,
}

impl ReportKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Projects => "projects",
            ReportKind::SingleProject => "single_project",
            ReportKind::ProjectsByUser => "projects_by_user",
            ReportKind::ProjectsByMilestone => "projects_by_milestone",
            ReportKind::ProjectsByUnclearedDependency => "project_by_dependencies",
            ReportKind::ProjectDurationByMilestone => "project_duration_by_milestone",
        }
    }
}

/// Parameters of a report request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportQuery {
    pub kind: ReportKind,
    /// Selected user, milestone or dependency id, depending on `kind`.
    pub value: Option<String>,
    pub project_id: Option<ProjectId>,
    /// Required for [`ReportKind::ProjectDurationByMilestone`].
    pub duration: Option<String>,
}

impl ReportQuery {
    #[must_use]
    pub fn new(kind: ReportKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_project(mut self, project: ProjectId) -> Self {
        self.project_id = Some(project);
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    /// Query string pairs, omitting unset values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if a duration report has no duration.
    pub fn to_pairs(&self) -> Result<Vec<(String, String)>, Error> {
        let duration = match self.kind {
            ReportKind::ProjectDurationByMilestone => {
                let d = self
                    .duration
                    .as_deref()
                    .filter(|d| !d.trim().is_empty())
                    .ok_or_else(|| Error::Validation("Please enter a duration".into()))?;
                Some(d.to_owned())
            }
            _ => None,
        };

        let mut pairs = vec![("type".to_owned(), self.kind.as_str().to_owned())];
        if let Some(v) = self.value.as_ref().filter(|v| !v.is_empty()) {
            pairs.push(("value".to_owned(), v.clone()));
        }
        if let Some(d) = duration {
            pairs.push(("duration".to_owned(), d));
        }
        if let Some(p) = self.project_id {
            pairs.push(("projectId".to_owned(), p.to_string()));
        }
        Ok(pairs)
    }
}

/// Everything the project details view loads at once.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectBundle {
    pub project: Project,
    /// Global milestone catalogue.
    pub milestones: Vec<Milestone>,
    /// Global dependency catalogue.
    pub dependencies: Vec<Dependency>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn project_tolerates_missing_and_extra_fields() {
        let project: Project = serde_json::from_value(json!({
            "id": 4,
            "title": "Fibre rollout",
            "startDate": "2024-01-01",
            "milestones": [{ "id": 1, "name": "Survey", "sequence": 1 }],
            "region": "Nairobi"
        }))
        .unwrap();

        assert_eq!(project.id, ProjectId(4));
        assert_eq!(project.start_date.as_deref(), Some("2024-01-01"));
        assert_eq!(project.milestones[0].name, "Survey");
        assert!(project.dependencies.is_empty());
        assert_eq!(project.extra.get("region"), Some(&json!("Nairobi")));
    }

    #[test]
    fn user_role_is_lenient() {
        let user: User =
            serde_json::from_value(json!({ "id": 3, "username": "k", "role": "user" })).unwrap();
        assert!(user.is_assignable());

        let odd: User =
            serde_json::from_value(json!({ "id": "x", "username": "q", "role": "auditor" }))
                .unwrap();
        assert_eq!(odd.role(), None);
        assert!(!odd.is_assignable());
    }

    #[test]
    fn draft_omits_unassigned_user() {
        let body = serde_json::to_value(ProjectDraft::new("T", "D")).unwrap();
        assert_eq!(body, json!({ "title": "T", "description": "D" }));
    }

    #[test]
    fn profile_update_checks_confirmation() {
        assert!(matches!(
            ProfileUpdate::new("k", Some("a"), Some("b")),
            Err(Error::Validation(_))
        ));

        let keep_password = ProfileUpdate::new("k", Some(""), None).unwrap();
        assert_eq!(
            serde_json::to_value(keep_password).unwrap(),
            json!({ "username": "k" })
        );

        let change = ProfileUpdate::new("k", Some("new"), Some("new")).unwrap();
        assert_eq!(change.password.as_deref(), Some("new"));
    }

    #[test]
    fn duration_report_requires_duration() {
        let query = ReportQuery::new(ReportKind::ProjectDurationByMilestone).with_value("2");
        assert!(matches!(query.to_pairs(), Err(Error::Validation(_))));

        let pairs = query.with_duration("30").to_pairs().unwrap();
        assert!(pairs.contains(&("duration".into(), "30".into())));
    }

    #[test]
    fn report_pairs_skip_unset_values() {
        let pairs = ReportQuery::new(ReportKind::SingleProject)
            .with_project(ProjectId(9))
            .to_pairs()
            .unwrap();
        assert_eq!(
            pairs,
            vec![
                ("type".to_string(), "single_project".to_string()),
                ("projectId".to_string(), "9".to_string()),
            ]
        );
    }
}
