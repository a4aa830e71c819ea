//! Project endpoints.

use masterplan_common::AppResult;
use masterplan_core::models::{Project, ProjectListParams};

use crate::client::ApiClient;

impl ApiClient {
    /// `GET /projects`.
    pub async fn list_projects(&self, params: &ProjectListParams) -> AppResult<Vec<Project>> {
        let request = self.get("projects")?.query(params);
        self.send_json(request).await
    }

    /// `GET /projects/{id}`.
    pub async fn get_project(&self, id: i64) -> AppResult<Project> {
        let request = self.get(&format!("projects/{id}"))?;
        self.send_json(request).await
    }
}
