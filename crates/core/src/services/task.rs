//! Task draft validation.
//!
//! Tasks are assigned to active leaf classifications only; the candidate list
//! comes from the same tree snapshot the store displays.

use chrono::{DateTime, NaiveDate, Utc};
use masterplan_common::{AppError, AppResult};
use validator::Validate;

use crate::models::{ClassificationNode, DEFAULT_TASK_STATUS, TaskCreate};
use crate::tree::flatten_leaves_with_path;

/// A task as entered by the user, before validation.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub project_id: Option<i64>,
    pub classification_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub baseline_start: Option<DateTime<Utc>>,
    pub baseline_end: Option<DateTime<Utc>>,
    pub actual_start_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
}

impl TaskDraft {
    /// Check the draft against `tree` and build the create payload.
    pub fn prepare(&self, tree: &[ClassificationNode]) -> AppResult<TaskCreate> {
        let title = self.title.trim();
        let (Some(project_id), Some(classification_id), false) =
            (self.project_id, self.classification_id, title.is_empty())
        else {
            return Err(AppError::Validation(
                "project, classification and title are required".to_string(),
            ));
        };

        let assignable = flatten_leaves_with_path(tree)
            .iter()
            .any(|leaf| leaf.id == classification_id);
        let same_project = tree.iter().all(|top| top.project_id == project_id);
        if !assignable || !same_project {
            return Err(AppError::Validation(
                "classification is not an assignable work item".to_string(),
            ));
        }

        if let (Some(start), Some(end)) = (self.baseline_start, self.baseline_end)
            && end < start
        {
            return Err(AppError::Validation(
                "baseline end precedes baseline start".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (self.actual_start_date, self.actual_end_date)
            && end < start
        {
            return Err(AppError::Validation(
                "actual end date precedes actual start date".to_string(),
            ));
        }

        let payload = TaskCreate {
            project_id,
            classification_id,
            title: title.to_string(),
            description: self
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            status: self
                .status
                .clone()
                .unwrap_or_else(|| DEFAULT_TASK_STATUS.to_string()),
            baseline_start: self.baseline_start,
            baseline_end: self.baseline_end,
            actual_start_date: self.actual_start_date,
            actual_end_date: self.actual_end_date,
        };
        payload.validate()?;
        Ok(payload)
    }
}
