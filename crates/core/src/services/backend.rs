//! Backend abstraction for classification data.
//!
//! The HTTP implementation lives in the client crate; tests use the in-memory
//! backend from `test_utils`.

use async_trait::async_trait;
use masterplan_common::AppResult;
use std::sync::Arc;

use crate::models::{Classification, ClassificationCreate, ClassificationNode, ClassificationUpdate};

/// Operations the store needs from the REST backend.
#[async_trait]
pub trait ClassificationBackend: Send + Sync {
    /// `GET /classifications/tree?project_id={id}`. Empty when the project has no nodes.
    async fn fetch_tree(&self, project_id: i64) -> AppResult<Vec<ClassificationNode>>;

    /// `POST /classifications`.
    async fn create_classification(&self, payload: &ClassificationCreate)
    -> AppResult<Classification>;

    /// `PATCH /classifications/{id}`.
    async fn update_classification(
        &self,
        id: i64,
        changes: &ClassificationUpdate,
    ) -> AppResult<Classification>;

    /// `DELETE /classifications/{id}`.
    async fn delete_classification(&self, id: i64) -> AppResult<()>;

    /// Whether at least one task references `classification_id`.
    async fn has_linked_tasks(&self, classification_id: i64) -> AppResult<bool>;
}

/// Wrapper for boxed `ClassificationBackend` trait object.
pub type BackendService = Arc<dyn ClassificationBackend>;
