//! Classification endpoints.

use async_trait::async_trait;
use masterplan_common::AppResult;
use masterplan_core::ClassificationBackend;
use masterplan_core::models::{
    Classification, ClassificationCreate, ClassificationListParams, ClassificationNode,
    ClassificationUpdate, TaskListParams,
};
use tracing::debug;

use crate::client::ApiClient;

impl ApiClient {
    /// `GET /classifications/tree`: the project's nested tree.
    pub async fn classification_tree(&self, project_id: i64) -> AppResult<Vec<ClassificationNode>> {
        let request = self
            .get("classifications/tree")?
            .query(&[("project_id", project_id)]);
        self.send_json(request).await
    }

    /// `GET /classifications`: flat records filtered by `params`.
    pub async fn list_classifications(
        &self,
        params: &ClassificationListParams,
    ) -> AppResult<Vec<Classification>> {
        let request = self.get("classifications")?.query(params);
        self.send_json(request).await
    }

    /// `GET /classifications/{id}`.
    pub async fn get_classification(&self, id: i64) -> AppResult<Classification> {
        let request = self.get(&format!("classifications/{id}"))?;
        self.send_json(request).await
    }

    /// `POST /classifications`.
    pub async fn create_classification(
        &self,
        payload: &ClassificationCreate,
    ) -> AppResult<Classification> {
        let request = self.post("classifications")?.json(payload);
        self.send_json(request).await
    }

    /// `PATCH /classifications/{id}`.
    pub async fn update_classification(
        &self,
        id: i64,
        changes: &ClassificationUpdate,
    ) -> AppResult<Classification> {
        let request = self.patch(&format!("classifications/{id}"))?.json(changes);
        self.send_json(request).await
    }

    /// `DELETE /classifications/{id}`.
    pub async fn delete_classification(&self, id: i64) -> AppResult<()> {
        let request = self.delete(&format!("classifications/{id}"))?;
        self.send_empty(request).await
    }

    /// Whether any task references `classification_id`.
    pub async fn has_linked_tasks(&self, classification_id: i64) -> AppResult<bool> {
        let linked = self
            .list_tasks(&TaskListParams::linked_to(classification_id))
            .await?;
        debug!(classification_id, linked = !linked.is_empty(), "Linked-task probe");
        Ok(!linked.is_empty())
    }
}

#[async_trait]
impl ClassificationBackend for ApiClient {
    async fn fetch_tree(&self, project_id: i64) -> AppResult<Vec<ClassificationNode>> {
        self.classification_tree(project_id).await
    }

    async fn create_classification(
        &self,
        payload: &ClassificationCreate,
    ) -> AppResult<Classification> {
        Self::create_classification(self, payload).await
    }

    async fn update_classification(
        &self,
        id: i64,
        changes: &ClassificationUpdate,
    ) -> AppResult<Classification> {
        Self::update_classification(self, id, changes).await
    }

    async fn delete_classification(&self, id: i64) -> AppResult<()> {
        Self::delete_classification(self, id).await
    }

    async fn has_linked_tasks(&self, classification_id: i64) -> AppResult<bool> {
        Self::has_linked_tasks(self, classification_id).await
    }
}
