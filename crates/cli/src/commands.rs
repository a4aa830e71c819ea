//! Subcommand handlers.

use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use masterplan_client::ApiClient;
use masterplan_common::{AppError, Config};
use masterplan_core::models::{ClassificationUpdate, ProjectListParams, TaskListParams};
use masterplan_core::services::{
    ClassificationStore, EventPublisherService, NewClassification, TaskDraft,
};
use masterplan_sync::{LocalBus, RedisPubSub, RefreshBridge};
use tokio::signal;
use tracing::info;

use crate::render::{self, OutputMode};

/// Shared state for one CLI invocation.
pub struct App {
    pub config: Config,
    pub client: Arc<ApiClient>,
    pub output: OutputMode,
}

#[derive(Args, Debug)]
pub struct ProjectArg {
    /// Project id.
    #[arg(long, short)]
    pub project: i64,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[command(flatten)]
    pub project: ProjectArg,
    /// Parent classification; ROOT when omitted.
    #[arg(long)]
    pub parent: Option<i64>,
    /// Display name.
    #[arg(long)]
    pub name: String,
    /// Sibling order; next free number when omitted.
    #[arg(long)]
    pub sort_no: Option<i32>,
    /// Create the node inactive.
    #[arg(long)]
    pub inactive: bool,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Classification id.
    pub id: i64,
    #[command(flatten)]
    pub project: ProjectArg,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub sort_no: Option<i32>,
    /// Move under another parent.
    #[arg(long)]
    pub parent: Option<i64>,
    #[arg(long, conflicts_with = "inactive")]
    pub active: bool,
    #[arg(long)]
    pub inactive: bool,
}

impl EditArgs {
    fn changes(&self) -> ClassificationUpdate {
        let is_active = match (self.active, self.inactive) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        ClassificationUpdate {
            name: self.name.clone(),
            parent_id: self.parent,
            sort_no: self.sort_no,
            is_active,
            owner_dept_id: None,
        }
    }
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Classification id.
    pub id: i64,
    #[command(flatten)]
    pub project: ProjectArg,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// List tasks of a project.
    List(ProjectArg),
    /// Create a task on an active leaf classification.
    Add(TaskAddArgs),
    /// Mark a task closed.
    Done { id: i64 },
    /// Reopen a closed task.
    Reopen { id: i64 },
    /// Delete a task.
    Delete { id: i64 },
}

#[derive(Args, Debug)]
pub struct TaskAddArgs {
    #[command(flatten)]
    pub project: ProjectArg,
    /// Leaf classification the task belongs to.
    #[arg(long)]
    pub classification: i64,
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
    /// Actual start date (YYYY-MM-DD).
    #[arg(long)]
    pub start: Option<NaiveDate>,
    /// Actual end date (YYYY-MM-DD).
    #[arg(long)]
    pub end: Option<NaiveDate>,
}

impl App {
    /// The publisher for mutations: Redis when configured, otherwise in-process.
    async fn publisher(&self) -> anyhow::Result<EventPublisherService> {
        if self.config.sync.redis_url.is_some() {
            let pubsub = RedisPubSub::connect(&self.config.sync).await?;
            Ok(Arc::new(pubsub))
        } else {
            Ok(Arc::new(LocalBus::new(self.config.sync.buffer)))
        }
    }

    async fn store(&self, project_id: i64) -> anyhow::Result<Arc<ClassificationStore>> {
        let publisher = self.publisher().await?;
        self.store_with(project_id, publisher).await
    }

    async fn store_with(
        &self,
        project_id: i64,
        publisher: EventPublisherService,
    ) -> anyhow::Result<Arc<ClassificationStore>> {
        let store = Arc::new(ClassificationStore::new(self.client.clone(), publisher));
        store.select_project(Some(project_id)).await;
        store.load().await?;
        Ok(store)
    }

    pub async fn projects(&self) -> anyhow::Result<()> {
        let projects = self.client.list_projects(&ProjectListParams::default()).await?;
        self.output.emit(&projects, || render::project_lines(&projects))
    }

    pub async fn tree(&self, args: &ProjectArg) -> anyhow::Result<()> {
        let tree = self.store(args.project).await?.tree().await;
        self.output.emit(&tree, || render::tree_lines(&tree))
    }

    pub async fn leaves(&self, args: &ProjectArg) -> anyhow::Result<()> {
        let leaves = self.store(args.project).await?.leaves().await;
        self.output.emit(&leaves, || render::leaf_lines(&leaves))
    }

    pub async fn add(&self, args: &AddArgs) -> anyhow::Result<()> {
        let store = self.store(args.project.project).await?;
        let created = store
            .create(NewClassification {
                parent_id: args.parent,
                name: args.name.clone(),
                sort_no: args.sort_no,
                is_active: !args.inactive,
                owner_dept_id: None,
            })
            .await?;
        self.output
            .emit(&created, || vec![render::classification_line(&created)])
    }

    pub async fn edit(&self, args: &EditArgs) -> anyhow::Result<()> {
        let store = self.store(args.project.project).await?;
        let updated = store.update(args.id, args.changes()).await?;
        self.output
            .emit(&updated, || vec![render::classification_line(&updated)])
    }

    pub async fn delete(&self, args: &DeleteArgs) -> anyhow::Result<()> {
        let store = self.store(args.project.project).await?;
        store.delete(args.id).await?;
        self.output.emit(&serde_json::json!({ "deleted": args.id }), || {
            vec![format!("deleted {}", args.id)]
        })
    }

    /// Render the tree, then re-render whenever another process changes it.
    pub async fn watch(&self, args: &ProjectArg) -> anyhow::Result<()> {
        if self.config.sync.redis_url.is_none() {
            return Err(AppError::Config(
                "watch needs sync.redis_url to receive updates".to_string(),
            )
            .into());
        }
        let pubsub = RedisPubSub::connect(&self.config.sync).await?;
        pubsub.start().await?;

        // ROOT auto-creation announces over the same connection.
        let store = self
            .store_with(args.project, Arc::new(pubsub.clone()))
            .await?;
        let mut changes = store.subscribe_changes();
        let bridge = RefreshBridge::new(store.clone()).start(pubsub.subscribe_local());
        info!(project_id = args.project, channel = pubsub.channel(), "Watching for updates");

        let tree = store.tree().await;
        self.output.emit(&tree, || render::tree_lines(&tree))?;

        loop {
            tokio::select! {
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let tree = store.tree().await;
                    if let Some(message) = store.last_error().await {
                        eprintln!("{message}");
                    }
                    self.output.emit(&tree, || render::tree_lines(&tree))?;
                }
                result = signal::ctrl_c() => {
                    result.context("failed to listen for Ctrl+C")?;
                    info!("Received SIGINT, stopping watch");
                    break;
                }
            }
        }

        bridge.abort();
        pubsub.shutdown().await?;
        Ok(())
    }

    pub async fn task(&self, command: &TaskCommand) -> anyhow::Result<()> {
        match command {
            TaskCommand::List(args) => {
                let params = TaskListParams {
                    project_id: Some(args.project),
                    ..Default::default()
                };
                let tasks = self.client.list_tasks(&params).await?;
                self.output.emit(&tasks, || render::task_lines(&tasks))
            }
            TaskCommand::Add(args) => {
                let store = self.store(args.project.project).await?;
                let draft = TaskDraft {
                    project_id: Some(args.project.project),
                    classification_id: Some(args.classification),
                    title: args.title.clone(),
                    description: args.description.clone(),
                    actual_start_date: args.start,
                    actual_end_date: args.end,
                    ..Default::default()
                };
                let payload = draft.prepare(&store.tree().await)?;
                let task = self.client.create_task(&payload).await?;
                info!(task_id = task.id, "Task created");
                self.output
                    .emit(&task, || render::task_lines(std::slice::from_ref(&task)))
            }
            TaskCommand::Done { id } => {
                let task = self.client.complete_task(*id).await?;
                self.output
                    .emit(&task, || render::task_lines(std::slice::from_ref(&task)))
            }
            TaskCommand::Reopen { id } => {
                let task = self.client.reopen_task(*id).await?;
                self.output
                    .emit(&task, || render::task_lines(std::slice::from_ref(&task)))
            }
            TaskCommand::Delete { id } => {
                self.client.delete_task(*id).await?;
                self.output.emit(&serde_json::json!({ "deleted": id }), || {
                    vec![format!("deleted task {id}")]
                })
            }
        }
    }
}
