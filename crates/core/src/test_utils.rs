//! Test utilities: tree fixtures and in-memory collaborators.
//!
//! Enabled for this crate's own tests and, through the `test-utils` feature,
//! for the tests of downstream crates.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use masterplan_common::{AppError, AppResult};

use crate::models::{
    Classification, ClassificationCreate, ClassificationNode, ClassificationUpdate,
    PATH_SEPARATOR, ROOT_NAME,
};
use crate::services::{ClassificationBackend, EventPublisher};
use crate::tree::build_tree;

/// Builds trees from flat records with consistent `depth` and `path` values.
#[derive(Debug, Clone)]
pub struct TreeFixture {
    project_id: i64,
    records: Vec<Classification>,
}

impl TreeFixture {
    /// Start an empty fixture for `project_id`.
    #[must_use]
    pub const fn new(project_id: i64) -> Self {
        Self {
            project_id,
            records: Vec::new(),
        }
    }

    /// A standalone record with no derived fields filled in.
    #[must_use]
    pub fn record(&self, id: i64, parent_id: Option<i64>, name: &str, sort_no: i32) -> Classification {
        Classification {
            id,
            project_id: self.project_id,
            parent_id,
            name: name.to_string(),
            depth: 0,
            path: name.to_string(),
            sort_no,
            is_active: true,
            owner_dept_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Add the ROOT node.
    #[must_use]
    pub fn root(mut self, id: i64) -> Self {
        let record = self.record(id, None, ROOT_NAME, 0);
        self.records.push(record);
        self
    }

    /// Add a child under `parent_id`.
    ///
    /// # Panics
    ///
    /// Panics if the parent has not been added yet.
    #[must_use]
    pub fn child(mut self, parent_id: i64, id: i64, name: &str, sort_no: i32) -> Self {
        let parent = self
            .records
            .iter()
            .find(|r| r.id == parent_id)
            .cloned()
            .unwrap_or_else(|| panic!("fixture parent {parent_id} missing"));

        let mut record = self.record(id, Some(parent_id), name, sort_no);
        record.depth = parent.depth + 1;
        record.path = if parent.parent_id.is_none() {
            name.to_string()
        } else {
            format!("{}{PATH_SEPARATOR}{name}", parent.path)
        };
        self.records.push(record);
        self
    }

    /// Mark a node inactive.
    #[must_use]
    pub fn inactive(mut self, id: i64) -> Self {
        if let Some(record) = self.records.iter_mut().find(|r| r.id == id) {
            record.is_active = false;
        }
        self
    }

    /// The flat records added so far.
    #[must_use]
    pub fn records(&self) -> Vec<Classification> {
        self.records.clone()
    }

    /// All top-level nodes.
    #[must_use]
    pub fn build_forest(self) -> Vec<ClassificationNode> {
        build_tree(self.records)
    }

    /// The single top-level node.
    ///
    /// # Panics
    ///
    /// Panics if the fixture has no top-level node.
    #[must_use]
    pub fn build(self) -> ClassificationNode {
        self.build_forest()
            .into_iter()
            .next()
            .unwrap_or_else(|| panic!("fixture has no top-level node"))
    }
}

/// Records of project 42.
///
/// ```text
/// ROOT (1)
/// ├── Electrical (7, sort 0)
/// │   └── Wiring (15, sort 0, leaf)
/// └── Plumbing (20, sort 1)
///     ├── Pipes (21, sort 0)
///     │   └── Copper (23, sort 0, leaf)
///     └── Drains (22, sort 5, leaf, inactive)
/// ```
#[must_use]
pub fn sample_fixture() -> TreeFixture {
    TreeFixture::new(42)
        .root(1)
        .child(1, 7, "Electrical", 0)
        .child(7, 15, "Wiring", 0)
        .child(1, 20, "Plumbing", 1)
        .child(20, 21, "Pipes", 0)
        .child(20, 22, "Drains", 5)
        .child(21, 23, "Copper", 0)
        .inactive(22)
}

/// The tree of [`sample_fixture`].
#[must_use]
pub fn sample_tree() -> Vec<ClassificationNode> {
    sample_fixture().build_forest()
}

#[derive(Debug, Default)]
struct BackendState {
    records: HashMap<i64, Classification>,
    linked_tasks: HashSet<i64>,
    next_id: i64,
    fail_tree: bool,
    fail_create: bool,
    fail_probe: bool,
}

/// In-memory backend that enforces the same integrity rules as the server.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<BackendState>,
    tree_requests: AtomicUsize,
    mutation_requests: AtomicUsize,
    probe_requests: AtomicUsize,
}

impl InMemoryBackend {
    /// An empty backend.
    #[must_use]
    pub fn new() -> Self {
        let backend = Self::default();
        backend.lock().next_id = 1000;
        backend
    }

    /// A backend seeded with the fixture's records.
    #[must_use]
    pub fn with_fixture(fixture: &TreeFixture) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.lock();
            for record in fixture.records() {
                state.records.insert(record.id, record);
            }
        }
        backend
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Record that a task references `classification_id`.
    pub fn link_task(&self, classification_id: i64) {
        self.lock().linked_tasks.insert(classification_id);
    }

    /// Make tree fetches fail with a transport error.
    pub fn fail_tree(&self, fail: bool) {
        self.lock().fail_tree = fail;
    }

    /// Make creates fail with a server rejection.
    pub fn fail_create(&self, fail: bool) {
        self.lock().fail_create = fail;
    }

    /// Make the linked-task probe fail with a transport error.
    pub fn fail_probe(&self, fail: bool) {
        self.lock().fail_probe = fail;
    }

    /// Insert or replace a record behind the client's back (another editor).
    pub fn put(&self, record: Classification) {
        let mut state = self.lock();
        state.records.insert(record.id, record);
        Self::recompute_paths(&mut state);
    }

    /// Remove a record behind the client's back (another editor).
    pub fn remove(&self, id: i64) {
        self.lock().records.remove(&id);
    }

    /// Number of tree fetches served.
    pub fn tree_requests(&self) -> usize {
        self.tree_requests.load(Ordering::SeqCst)
    }

    /// Number of create/update/delete requests received.
    pub fn mutation_requests(&self) -> usize {
        self.mutation_requests.load(Ordering::SeqCst)
    }

    /// Number of linked-task probes received.
    pub fn probe_requests(&self) -> usize {
        self.probe_requests.load(Ordering::SeqCst)
    }

    fn recompute_paths(state: &mut BackendState) {
        let mut ids: Vec<i64> = state.records.keys().copied().collect();
        ids.sort_unstable();
        // Parents may be recomputed after their children; iterate to a fixed point.
        for _ in 0..=ids.len() {
            let mut changed = false;
            for id in &ids {
                let Some(record) = state.records.get(id) else {
                    continue;
                };
                let (depth, path) = match record.parent_id.and_then(|p| state.records.get(&p)) {
                    None => (0, record.name.clone()),
                    Some(parent) if parent.parent_id.is_none() => (1, record.name.clone()),
                    Some(parent) => (
                        parent.depth + 1,
                        format!("{}{PATH_SEPARATOR}{}", parent.path, record.name),
                    ),
                };
                if let Some(record) = state.records.get_mut(id)
                    && (record.depth != depth || record.path != path)
                {
                    record.depth = depth;
                    record.path = path;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }
}

#[async_trait]
impl ClassificationBackend for InMemoryBackend {
    async fn fetch_tree(&self, project_id: i64) -> AppResult<Vec<ClassificationNode>> {
        self.tree_requests.fetch_add(1, Ordering::SeqCst);
        let state = self.lock();
        if state.fail_tree {
            return Err(AppError::Transport("connection refused".to_string()));
        }
        let records = state
            .records
            .values()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect();
        Ok(build_tree(records))
    }

    async fn create_classification(
        &self,
        payload: &ClassificationCreate,
    ) -> AppResult<Classification> {
        self.mutation_requests.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        if state.fail_create {
            return Err(AppError::ExternalService {
                status: 500,
                detail: "insert failed".to_string(),
            });
        }

        match payload.parent_id {
            None => {
                if payload.name.to_uppercase() != ROOT_NAME {
                    return Err(AppError::Conflict(
                        "Only ROOT may have no parent".to_string(),
                    ));
                }
                if state
                    .records
                    .values()
                    .any(|r| r.project_id == payload.project_id && r.parent_id.is_none())
                {
                    return Err(AppError::Conflict("ROOT already exists".to_string()));
                }
            }
            Some(parent_id) => {
                let parent_ok = state.records.get(&parent_id).is_some_and(|p| {
                    p.project_id == payload.project_id && p.is_active
                });
                if !parent_ok {
                    return Err(AppError::NotFound(format!(
                        "Parent classification {parent_id} not found or inactive"
                    )));
                }
            }
        }

        if state.records.values().any(|r| {
            r.project_id == payload.project_id
                && r.parent_id == payload.parent_id
                && r.name == payload.name
        }) {
            return Err(AppError::Conflict(format!(
                "Duplicate classification name '{}'",
                payload.name
            )));
        }

        state.next_id += 1;
        let id = state.next_id;
        let record = Classification {
            id,
            project_id: payload.project_id,
            parent_id: payload.parent_id,
            name: payload.name.clone(),
            depth: 0,
            path: payload.name.clone(),
            sort_no: payload.sort_no,
            is_active: payload.is_active,
            owner_dept_id: payload.owner_dept_id,
            created_at: None,
            updated_at: None,
        };
        state.records.insert(id, record);
        Self::recompute_paths(&mut state);
        state
            .records
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::Internal("record vanished".to_string()))
    }

    async fn update_classification(
        &self,
        id: i64,
        changes: &ClassificationUpdate,
    ) -> AppResult<Classification> {
        self.mutation_requests.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        let Some(existing) = state.records.get(&id).cloned() else {
            return Err(AppError::NotFound(format!("Classification {id} not found")));
        };
        if existing.parent_id.is_none() {
            return Err(AppError::Conflict("ROOT cannot be modified".to_string()));
        }
        if changes.is_empty() {
            return Err(AppError::Conflict("No fields to update".to_string()));
        }
        if let Some(parent_id) = changes.parent_id
            && !state.records.get(&parent_id).is_some_and(|p| p.is_active)
        {
            return Err(AppError::NotFound(format!(
                "Parent classification {parent_id} not found or inactive"
            )));
        }

        if let Some(record) = state.records.get_mut(&id) {
            if let Some(name) = &changes.name {
                record.name.clone_from(name);
            }
            if let Some(parent_id) = changes.parent_id {
                record.parent_id = Some(parent_id);
            }
            if let Some(sort_no) = changes.sort_no {
                record.sort_no = sort_no;
            }
            if let Some(is_active) = changes.is_active {
                record.is_active = is_active;
            }
            if changes.owner_dept_id.is_some() {
                record.owner_dept_id = changes.owner_dept_id;
            }
        }
        Self::recompute_paths(&mut state);
        state
            .records
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::Internal("record vanished".to_string()))
    }

    async fn delete_classification(&self, id: i64) -> AppResult<()> {
        self.mutation_requests.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        if !state.records.contains_key(&id) {
            return Err(AppError::NotFound(format!("Classification {id} not found")));
        }
        let child_count = state
            .records
            .values()
            .filter(|r| r.parent_id == Some(id))
            .count();
        if child_count > 0 {
            return Err(AppError::Conflict(format!(
                "Cannot delete: {child_count} child classifications exist"
            )));
        }
        if state.linked_tasks.contains(&id) {
            return Err(AppError::Conflict(
                "Cannot delete: linked tasks exist".to_string(),
            ));
        }
        state.records.remove(&id);
        Ok(())
    }

    async fn has_linked_tasks(&self, classification_id: i64) -> AppResult<bool> {
        self.probe_requests.fetch_add(1, Ordering::SeqCst);
        let state = self.lock();
        if state.fail_probe {
            return Err(AppError::Transport("probe timed out".to_string()));
        }
        Ok(state.linked_tasks.contains(&classification_id))
    }
}

/// Publisher that records every project id it is asked to announce.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<Option<i64>>>,
    fail: std::sync::atomic::AtomicBool,
}

impl RecordingPublisher {
    /// A publisher that accepts every event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every publish fail.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Project ids published so far.
    pub fn published(&self) -> Vec<Option<i64>> {
        self.published
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish_classification_updated(&self, project_id: Option<i64>) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::PubSub("channel closed".to_string()));
        }
        self.published
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(project_id);
        Ok(())
    }
}
