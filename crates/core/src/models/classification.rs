//! Classification records as exchanged with the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::timestamp;

/// Name of the mandatory top-level node of every project tree.
pub const ROOT_NAME: &str = "ROOT";

/// Separator used to join ancestor names into a path.
pub const PATH_SEPARATOR: char = '/';

/// Longest name the backend accepts.
pub const MAX_NAME_LEN: usize = 200;

/// A flat classification record (`GET /classifications`, create/update responses).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub id: i64,
    pub project_id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub depth: i32,
    pub path: String,
    pub sort_no: i32,
    pub is_active: bool,
    #[serde(default)]
    pub owner_dept_id: Option<i64>,
    #[serde(default, with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A node of the nested tree returned by `GET /classifications/tree`.
///
/// `children` is always present. The parent is reachable only through
/// `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationNode {
    pub id: i64,
    pub project_id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub depth: i32,
    pub path: String,
    pub sort_no: i32,
    pub is_active: bool,
    #[serde(default)]
    pub owner_dept_id: Option<i64>,
    #[serde(default, with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub children: Vec<ClassificationNode>,
}

impl ClassificationNode {
    /// Whether this is the project's ROOT node. Only ROOT has no parent,
    /// whatever the casing of its name.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// A leaf has no children and represents an assignable unit of work.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Drop the children and keep the flat record.
    #[must_use]
    pub fn to_record(&self) -> Classification {
        Classification {
            id: self.id,
            project_id: self.project_id,
            parent_id: self.parent_id,
            name: self.name.clone(),
            depth: self.depth,
            path: self.path.clone(),
            sort_no: self.sort_no,
            is_active: self.is_active,
            owner_dept_id: self.owner_dept_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<Classification> for ClassificationNode {
    fn from(record: Classification) -> Self {
        Self {
            id: record.id,
            project_id: record.project_id,
            parent_id: record.parent_id,
            name: record.name,
            depth: record.depth,
            path: record.path,
            sort_no: record.sort_no,
            is_active: record.is_active,
            owner_dept_id: record.owner_dept_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
            children: Vec::new(),
        }
    }
}

/// Body of `POST /classifications`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ClassificationCreate {
    #[validate(range(min = 1))]
    pub project_id: i64,
    #[validate(range(min = 1))]
    pub parent_id: Option<i64>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub sort_no: i32,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_dept_id: Option<i64>,
}

impl ClassificationCreate {
    /// The payload that creates a project's ROOT node.
    #[must_use]
    pub fn root(project_id: i64) -> Self {
        Self {
            project_id,
            parent_id: None,
            name: ROOT_NAME.to_string(),
            sort_no: 0,
            is_active: true,
            owner_dept_id: None,
        }
    }
}

/// Body of `PATCH /classifications/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ClassificationUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub parent_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_no: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_dept_id: Option<i64>,
}

impl ClassificationUpdate {
    /// Whether the update carries no field at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.parent_id.is_none()
            && self.sort_no.is_none()
            && self.is_active.is_none()
            && self.owner_dept_id.is_none()
    }
}

/// Query parameters of `GET /classifications`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassificationListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    /// `Some(0)` asks for top-level nodes (`parent_id IS NULL`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}
