use serde_json::json;

use super::models::{Dependency, Milestone, Project, ProjectBundle, ProjectDraft};
use super::TrackerApi;
use crate::error::Error;
use crate::pipeline::ApiRequest;
use crate::transport::Transport;
use crate::types::{DependencyId, MilestoneId, ProjectId};

impl<T: Transport> TrackerApi<T> {
    pub async fn projects(&self) -> Result<Vec<Project>, Error> {
        self.fetch(ApiRequest::get("/projects")).await
    }

    pub async fn project(&self, id: ProjectId) -> Result<Project, Error> {
        self.fetch(ApiRequest::get(format!("/projects/{id}"))).await
    }

    pub async fn create_project(&self, draft: &ProjectDraft) -> Result<Project, Error> {
        self.fetch(ApiRequest::post("/projects").json(serde_json::to_value(draft)?))
            .await
    }

    pub async fn update_project(&self, id: ProjectId, draft: &ProjectDraft) -> Result<(), Error> {
        self.send(ApiRequest::put(format!("/projects/{id}")).json(serde_json::to_value(draft)?))
            .await
    }

    pub async fn delete_project(&self, id: ProjectId) -> Result<(), Error> {
        self.send(ApiRequest::delete(format!("/projects/{id}"))).await
    }

    pub async fn project_milestones(&self, id: ProjectId) -> Result<Vec<Milestone>, Error> {
        self.fetch(ApiRequest::get(format!("/projects/{id}/milestones")))
            .await
    }

    /// Attach a catalogue milestone. Ordering rules are enforced by the API.
    pub async fn add_milestone(&self, id: ProjectId, milestone: MilestoneId) -> Result<(), Error> {
        self.send(
            ApiRequest::post(format!("/projects/{id}/milestones"))
                .json(json!({ "milestoneId": milestone })),
        )
        .await
    }

    pub async fn project_dependencies(&self, id: ProjectId) -> Result<Vec<Dependency>, Error> {
        self.fetch(ApiRequest::get(format!("/projects/{id}/dependencies")))
            .await
    }

    pub async fn add_dependency(
        &self,
        id: ProjectId,
        dependency: DependencyId,
    ) -> Result<(), Error> {
        self.send(
            ApiRequest::post(format!("/projects/{id}/dependencies"))
                .json(json!({ "dependencyId": dependency })),
        )
        .await
    }

    /// Mark a project dependency as cleared.
    pub async fn clear_dependency(
        &self,
        id: ProjectId,
        dependency: DependencyId,
    ) -> Result<(), Error> {
        self.send(ApiRequest::patch(format!(
            "/projects/{id}/dependencies/{dependency}"
        )))
        .await
    }

    /// Global milestone catalogue.
    pub async fn milestones(&self) -> Result<Vec<Milestone>, Error> {
        self.fetch(ApiRequest::get("/milestones")).await
    }

    /// Global dependency catalogue.
    pub async fn dependencies(&self) -> Result<Vec<Dependency>, Error> {
        self.fetch(ApiRequest::get("/dependencies")).await
    }

    /// Load the project and both catalogues concurrently. Fails if any call fails.
    pub async fn project_bundle(&self, id: ProjectId) -> Result<ProjectBundle, Error> {
        let (milestones, dependencies, project) =
            tokio::try_join!(self.milestones(), self.dependencies(), self.project(id))?;
        Ok(ProjectBundle {
            project,
            milestones,
            dependencies,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pipeline::ApiClient;
    use crate::session::{Session, SessionStore};
    use crate::testing::{Reply, ScriptedTransport};
    use crate::transport::Method;
    use crate::types::Role;

    async fn api() -> (TrackerApi<ScriptedTransport>, ScriptedTransport) {
        let store = SessionStore::in_memory();
        store
            .save(Session::authenticated("T", "R", Role::Editor, "1"))
            .await
            .unwrap();
        let transport = ScriptedTransport::new();
        (TrackerApi::new(ApiClient::new(transport.clone(), store)), transport)
    }

    #[tokio::test]
    async fn add_milestone_posts_id() {
        let (api, transport) = api().await;
        transport.reply(Method::Post, "/projects/3/milestones", Reply::status(201));

        api.add_milestone(ProjectId(3), MilestoneId(7)).await.unwrap();

        let call = &transport.calls()[0];
        assert_eq!(call.body, Some(json!({ "milestoneId": 7 })));
        assert_eq!(call.bearer.as_deref(), Some("T"));
    }

    #[tokio::test]
    async fn clear_dependency_patches_without_body() {
        let (api, transport) = api().await;
        transport.reply(Method::Patch, "/projects/3/dependencies/5", Reply::status(204));

        api.clear_dependency(ProjectId(3), DependencyId(5)).await.unwrap();

        assert_eq!(transport.calls()[0].body, None);
    }

    #[tokio::test]
    async fn project_bundle_loads_all_three() {
        let (api, transport) = api().await;
        transport
            .reply(
                Method::Get,
                "/milestones",
                Reply::json(200, json!([{ "id": 1, "name": "Survey" }])),
            )
            .reply(
                Method::Get,
                "/dependencies",
                Reply::json(200, json!([{ "id": 2, "name": "Wayleave" }])),
            )
            .reply(
                Method::Get,
                "/projects/4",
                Reply::json(200, json!({ "id": 4, "title": "Ring 4" })),
            );

        let bundle = api.project_bundle(ProjectId(4)).await.unwrap();

        assert_eq!(bundle.project.title, "Ring 4");
        assert_eq!(bundle.milestones.len(), 1);
        assert_eq!(bundle.dependencies[0].name, "Wayleave");
    }

    #[tokio::test]
    async fn project_bundle_fails_if_any_part_fails() {
        let (api, transport) = api().await;
        transport
            .reply(Method::Get, "/milestones", Reply::json(200, json!([])))
            .reply(Method::Get, "/dependencies", Reply::json(500, json!({ "error": "db" })))
            .reply(Method::Get, "/projects/4", Reply::json(200, json!({ "id": 4, "title": "x" })));

        let err = api.project_bundle(ProjectId(4)).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn create_project_returns_created() {
        let (api, transport) = api().await;
        transport.reply(
            Method::Post,
            "/projects",
            Reply::json(201, json!({ "id": 11, "title": "New" })),
        );

        let created = api
            .create_project(&ProjectDraft::new("New", "desc").with_assigned_user("9".into()))
            .await
            .unwrap();

        assert_eq!(created.id, ProjectId(11));
        assert_eq!(
            transport.calls()[0].body,
            Some(json!({ "title": "New", "description": "desc", "assigned_user_id": "9" }))
        );
    }
}
