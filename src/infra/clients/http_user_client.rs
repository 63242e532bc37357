use async_trait::async_trait;
use crate::domain::models::collaborators::UserProfile;
use crate::domain::ports::UserDirectory;
use crate::error::AppError;
use super::collaborator_http::CollaboratorHttp;

pub struct HttpUserClient {
    http: CollaboratorHttp,
}

impl HttpUserClient {
    pub fn new(http: CollaboratorHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl UserDirectory for HttpUserClient {
    async fn get_user(&self, user_id: &str) -> Result<UserProfile, AppError> {
        self.http
            .get_json(&["api", "v1", "users", user_id], &format!("User {} not found", user_id))
            .await
    }
}
