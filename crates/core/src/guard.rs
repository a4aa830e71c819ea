//! Client-side pre-validation of classification mutations.
//!
//! These checks run against the local tree snapshot and reject obviously
//! invalid requests before they leave the client. The snapshot may be stale,
//! so the backend re-validates every rule and has the final word.

use masterplan_common::AppError;
use thiserror::Error;

use crate::models::{ClassificationNode, ClassificationUpdate, MAX_NAME_LEN, PATH_SEPARATOR};
use crate::tree::{find_node_by_id, is_descendant};

/// Reason a mutation was rejected locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("name required")]
    NameRequired,
    #[error("invalid character")]
    InvalidCharacter,
    #[error("name too long")]
    NameTooLong,
    #[error("ROOT is immutable")]
    RootImmutable,
    #[error("has children")]
    HasChildren,
    #[error("has linked tasks")]
    HasLinkedTasks,
    #[error("not found")]
    NotFound,
    #[error("invalid parent")]
    InvalidParent,
    #[error("nothing to update")]
    NothingToUpdate,
}

impl From<GuardError> for AppError {
    fn from(err: GuardError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Validate a display name and return it trimmed.
pub fn validate_name(name: &str) -> Result<String, GuardError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(GuardError::NameRequired);
    }
    if trimmed.contains(PATH_SEPARATOR) {
        return Err(GuardError::InvalidCharacter);
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(GuardError::NameTooLong);
    }
    Ok(trimmed.to_string())
}

/// Validate a create request. Returns the normalized name.
pub fn check_create(name: &str) -> Result<String, GuardError> {
    validate_name(name)
}

/// Validate an update of node `id` and return the normalized change set.
pub fn check_update(
    tree: &[ClassificationNode],
    id: i64,
    changes: &ClassificationUpdate,
) -> Result<ClassificationUpdate, GuardError> {
    let node = find_node_by_id(tree, id).ok_or(GuardError::NotFound)?;
    if node.is_root() {
        return Err(GuardError::RootImmutable);
    }
    if changes.is_empty() {
        return Err(GuardError::NothingToUpdate);
    }

    let mut normalized = changes.clone();
    if let Some(name) = &changes.name {
        normalized.name = Some(validate_name(name)?);
    }
    if let Some(parent_id) = changes.parent_id
        && (parent_id == id || is_descendant(tree, id, parent_id))
    {
        return Err(GuardError::InvalidParent);
    }

    Ok(normalized)
}

/// Structural delete checks: ROOT and categories are never deletable.
///
/// The linked-task rule needs the task collaborator and is checked by the
/// caller afterwards.
pub fn check_delete(node: &ClassificationNode) -> Result<(), GuardError> {
    if node.is_root() {
        return Err(GuardError::RootImmutable);
    }
    if !node.is_leaf() {
        return Err(GuardError::HasChildren);
    }
    Ok(())
}
