use serde_json::json;

use super::models::{ProfileUpdate, User};
use super::{TrackerApi, segment};
use crate::error::Error;
use crate::pipeline::ApiRequest;
use crate::transport::Transport;
use crate::types::{Role, UserId};

impl<T: Transport> TrackerApi<T> {
    pub async fn users(&self) -> Result<Vec<User>, Error> {
        self.fetch(ApiRequest::get("/user")).await
    }

    pub async fn user(&self, id: &UserId) -> Result<User, Error> {
        self.fetch(ApiRequest::get(format!("/user/{}", segment(id))))
            .await
    }

    pub async fn update_profile(&self, id: &UserId, update: &ProfileUpdate) -> Result<(), Error> {
        self.send(
            ApiRequest::put(format!("/user/{}/profile", segment(id)))
                .json(serde_json::to_value(update)?),
        )
        .await
    }

    pub async fn update_role(&self, id: &UserId, role: Role) -> Result<(), Error> {
        self.send(
            ApiRequest::put(format!("/user/{}/role", segment(id))).json(json!({ "role": role })),
        )
        .await
    }

    pub async fn delete_user(&self, id: &UserId) -> Result<(), Error> {
        self.send(ApiRequest::delete(format!("/user/{}", segment(id))))
            .await
    }
}
