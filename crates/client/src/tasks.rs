//! Task endpoints.

use masterplan_common::AppResult;
use masterplan_core::models::{Task, TaskCreate, TaskListParams, TaskUpdate};

use crate::client::ApiClient;

impl ApiClient {
    /// `GET /tasks`.
    pub async fn list_tasks(&self, params: &TaskListParams) -> AppResult<Vec<Task>> {
        let request = self.get("tasks")?.query(params);
        self.send_json(request).await
    }

    /// `GET /tasks/{id}`.
    pub async fn get_task(&self, id: i64) -> AppResult<Task> {
        let request = self.get(&format!("tasks/{id}"))?;
        self.send_json(request).await
    }

    /// `POST /tasks`.
    pub async fn create_task(&self, payload: &TaskCreate) -> AppResult<Task> {
        let request = self.post("tasks")?.json(payload);
        self.send_json(request).await
    }

    /// `PATCH /tasks/{id}`.
    pub async fn update_task(&self, id: i64, changes: &TaskUpdate) -> AppResult<Task> {
        let request = self.patch(&format!("tasks/{id}"))?.json(changes);
        self.send_json(request).await
    }

    /// `DELETE /tasks/{id}`.
    pub async fn delete_task(&self, id: i64) -> AppResult<()> {
        let request = self.delete(&format!("tasks/{id}"))?;
        self.send_empty(request).await
    }

    /// `POST /tasks/{id}/complete`: sets status `closed`.
    pub async fn complete_task(&self, id: i64) -> AppResult<Task> {
        let request = self.post(&format!("tasks/{id}/complete"))?;
        self.send_json(request).await
    }

    /// `POST /tasks/{id}/reopen`: sets status `open`.
    pub async fn reopen_task(&self, id: i64) -> AppResult<Task> {
        let request = self.post(&format!("tasks/{id}/reopen"))?;
        self.send_json(request).await
    }
}
