//! Classification store.
//!
//! Holds one project's tree snapshot and runs every mutation through the same
//! sequence: local guard, backend request, full refetch, change notification.
//! The backend is the source of truth; the snapshot is never patched locally.

use std::sync::atomic::{AtomicBool, Ordering};

use masterplan_common::{AppError, AppResult};
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};
use validator::Validate;

use super::backend::BackendService;
use super::event_publisher::EventPublisherService;
use crate::guard::{self, GuardError};
use crate::models::{Classification, ClassificationCreate, ClassificationNode, ClassificationUpdate};
use crate::tree::{self, LeafEntry};

/// Input for creating a classification.
#[derive(Debug, Clone)]
pub struct NewClassification {
    /// Parent node; ROOT when `None`.
    pub parent_id: Option<i64>,
    pub name: String,
    /// Sibling order; suggested from the current siblings when `None`.
    pub sort_no: Option<i32>,
    pub is_active: bool,
    pub owner_dept_id: Option<i64>,
}

impl NewClassification {
    /// An active node named `name` under `parent_id`, with a suggested order.
    #[must_use]
    pub fn named(parent_id: Option<i64>, name: impl Into<String>) -> Self {
        Self {
            parent_id,
            name: name.into(),
            sort_no: None,
            is_active: true,
            owner_dept_id: None,
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    project_id: Option<i64>,
    tree: Vec<ClassificationNode>,
    last_error: Option<String>,
}

/// Clears the pending flag when an action finishes, however it finishes.
struct PendingGuard<'a>(&'a AtomicBool);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The classification tree of the selected project, shared by every consumer.
pub struct ClassificationStore {
    backend: BackendService,
    publisher: EventPublisherService,
    state: RwLock<StoreState>,
    pending: AtomicBool,
    changes: watch::Sender<u64>,
}

impl ClassificationStore {
    /// Create a store with no project selected.
    #[must_use]
    pub fn new(backend: BackendService, publisher: EventPublisherService) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            backend,
            publisher,
            state: RwLock::new(StoreState::default()),
            pending: AtomicBool::new(false),
            changes,
        }
    }

    // ==================== Snapshot Access ====================

    /// The selected project.
    pub async fn project_id(&self) -> Option<i64> {
        self.state.read().await.project_id
    }

    /// A copy of the current tree.
    pub async fn tree(&self) -> Vec<ClassificationNode> {
        self.state.read().await.tree.clone()
    }

    /// A copy of the ROOT node, if loaded.
    pub async fn root(&self) -> Option<ClassificationNode> {
        tree::find_root(&self.state.read().await.tree).cloned()
    }

    /// Active leaves with their paths, for task assignment.
    pub async fn leaves(&self) -> Vec<LeafEntry> {
        tree::flatten_leaves_with_path(&self.state.read().await.tree)
    }

    /// Suggested `sort_no` for a new child of `parent_id`.
    pub async fn suggest_sort_no(&self, parent_id: Option<i64>) -> i32 {
        tree::suggest_sort_no(&self.state.read().await.tree, parent_id)
    }

    /// The persistent error of the last load, if any.
    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }

    /// Whether a mutation is in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Receiver that ticks every time a new snapshot is installed.
    #[must_use]
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Whether an update announced for `event_project` concerns this store.
    pub async fn should_refresh(&self, event_project: Option<i64>) -> bool {
        match (event_project, self.project_id().await) {
            (None, _) | (_, None) => true,
            (Some(event), Some(shown)) => event == shown,
        }
    }

    // ==================== Loading ====================

    /// Switch to `project_id` and drop the previous snapshot.
    pub async fn select_project(&self, project_id: Option<i64>) {
        let mut state = self.state.write().await;
        state.project_id = project_id.filter(|id| *id > 0);
        state.tree.clear();
        state.last_error = None;
        drop(state);
        self.changes.send_modify(|generation| *generation += 1);
    }

    /// Load the selected project's tree, creating ROOT once if the project has
    /// no classifications yet.
    pub async fn load(&self) -> AppResult<()> {
        let Some(project_id) = self.project_id().await else {
            self.install(None, Vec::new()).await;
            return Ok(());
        };

        let tree = self.fetch(project_id).await?;
        if !tree.is_empty() {
            self.install(Some(project_id), tree).await;
            return Ok(());
        }

        self.create_missing_root(project_id).await
    }

    /// Refetch the selected project's tree.
    pub async fn refresh(&self) -> AppResult<()> {
        let Some(project_id) = self.project_id().await else {
            self.install(None, Vec::new()).await;
            return Ok(());
        };

        let tree = self.fetch(project_id).await?;
        self.install(Some(project_id), tree).await;
        Ok(())
    }

    async fn fetch(&self, project_id: i64) -> AppResult<Vec<ClassificationNode>> {
        debug!(project_id, "Fetching classification tree");
        match self.backend.fetch_tree(project_id).await {
            Ok(tree) => Ok(tree),
            Err(e) => {
                let mut state = self.state.write().await;
                if state.project_id == Some(project_id) {
                    state.tree.clear();
                    state.last_error = Some(e.user_message());
                    drop(state);
                    self.changes.send_modify(|generation| *generation += 1);
                }
                Err(e)
            }
        }
    }

    async fn create_missing_root(&self, project_id: i64) -> AppResult<()> {
        info!(project_id, "Project has no classifications, creating ROOT");

        let created = self
            .backend
            .create_classification(&ClassificationCreate::root(project_id))
            .await;
        let refetched = match created {
            Ok(_) => self.backend.fetch_tree(project_id).await,
            Err(e) => Err(e),
        };

        match refetched {
            Ok(tree) if tree::find_root(&tree).is_some() => {
                self.install(Some(project_id), tree).await;
                self.announce(project_id).await;
                Ok(())
            }
            outcome => {
                if let Err(e) = outcome {
                    warn!(project_id, error = %e, "ROOT auto-creation failed");
                }
                let err = AppError::MissingRoot(project_id);
                let mut state = self.state.write().await;
                if state.project_id == Some(project_id) {
                    state.tree.clear();
                    state.last_error = Some(err.user_message());
                    drop(state);
                    self.changes.send_modify(|generation| *generation += 1);
                }
                Err(err)
            }
        }
    }

    async fn install(&self, project_id: Option<i64>, tree: Vec<ClassificationNode>) {
        let mut state = self.state.write().await;
        // A response for a project that is no longer selected is discarded.
        if state.project_id != project_id {
            debug!(?project_id, "Discarding tree for deselected project");
            return;
        }
        state.tree = tree;
        state.last_error = None;
        drop(state);
        self.changes.send_modify(|generation| *generation += 1);
    }

    // ==================== Mutations ====================

    fn begin(&self) -> AppResult<PendingGuard<'_>> {
        self.pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::Busy)?;
        Ok(PendingGuard(&self.pending))
    }

    async fn require_project(&self) -> AppResult<i64> {
        self.project_id()
            .await
            .ok_or_else(|| AppError::Validation("project required".to_string()))
    }

    /// Create a classification under `input.parent_id` (ROOT by default).
    pub async fn create(&self, input: NewClassification) -> AppResult<Classification> {
        let _pending = self.begin()?;
        let name = guard::check_create(&input.name)?;
        let project_id = self.require_project().await?;

        let payload = {
            let state = self.state.read().await;
            let parent_id = match input.parent_id {
                Some(parent_id) => parent_id,
                None => tree::find_root(&state.tree)
                    .map(|root| root.id)
                    .ok_or(AppError::MissingRoot(project_id))?,
            };
            ClassificationCreate {
                project_id,
                parent_id: Some(parent_id),
                name,
                sort_no: input
                    .sort_no
                    .unwrap_or_else(|| tree::suggest_sort_no(&state.tree, Some(parent_id))),
                is_active: input.is_active,
                owner_dept_id: input.owner_dept_id,
            }
        };
        payload.validate()?;

        let created = self.backend.create_classification(&payload).await?;
        info!(
            project_id,
            id = created.id,
            parent_id = ?created.parent_id,
            "Classification created"
        );

        self.after_mutation(project_id).await;
        Ok(created)
    }

    /// Update name, order, activity or parent of node `id`.
    pub async fn update(&self, id: i64, changes: ClassificationUpdate) -> AppResult<Classification> {
        let _pending = self.begin()?;
        let project_id = self.require_project().await?;

        let changes = {
            let state = self.state.read().await;
            guard::check_update(&state.tree, id, &changes)?
        };
        changes.validate()?;

        let updated = self.backend.update_classification(id, &changes).await?;
        info!(project_id, id, "Classification updated");

        self.after_mutation(project_id).await;
        Ok(updated)
    }

    /// Delete leaf node `id`.
    ///
    /// Rejected locally for ROOT, for categories, and for nodes with linked
    /// tasks. If the linked-task probe itself fails the request is sent anyway
    /// and the backend decides.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let _pending = self.begin()?;
        let project_id = self.require_project().await?;

        {
            let state = self.state.read().await;
            let node = tree::find_node_by_id(&state.tree, id).ok_or(GuardError::NotFound)?;
            guard::check_delete(node)?;
        }

        match self.backend.has_linked_tasks(id).await {
            Ok(true) => return Err(GuardError::HasLinkedTasks.into()),
            Ok(false) => {}
            Err(e) => {
                warn!(id, error = %e, "Linked-task check failed, deferring to server");
            }
        }

        self.backend.delete_classification(id).await?;
        info!(project_id, id, "Classification deleted");

        self.after_mutation(project_id).await;
        Ok(())
    }

    /// Resynchronize with the backend and notify other views.
    ///
    /// The mutation already succeeded, so failures here are logged and kept
    /// as `last_error` rather than returned.
    async fn after_mutation(&self, project_id: i64) {
        if let Err(e) = self.refresh().await {
            warn!(project_id, error = %e, "Refetch after mutation failed");
        }
        self.announce(project_id).await;
    }

    async fn announce(&self, project_id: i64) {
        if let Err(e) = self
            .publisher
            .publish_classification_updated(Some(project_id))
            .await
        {
            warn!(project_id, error = %e, "Failed to publish classification update");
        }
    }
}
