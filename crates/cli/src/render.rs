//! Human-readable and JSON output.

use masterplan_core::models::{Classification, ClassificationNode, Project, Task};
use masterplan_core::tree::{LeafEntry, flatten_with_depth};
use serde::Serialize;

/// Output format selected by `--json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    /// Print `value` as JSON, or the `human` lines otherwise.
    pub fn emit<T: Serialize>(self, value: &T, human: impl FnOnce() -> Vec<String>) -> anyhow::Result<()> {
        match self {
            Self::Json => println!("{}", serde_json::to_string_pretty(value)?),
            Self::Human => {
                for line in human() {
                    println!("{line}");
                }
            }
        }
        Ok(())
    }
}

/// One indented line per node, pre-order.
pub fn tree_lines(tree: &[ClassificationNode]) -> Vec<String> {
    flatten_with_depth(tree)
        .into_iter()
        .map(|flat| {
            let node = flat.node;
            let mut line = format!(
                "{}{} [{}] #{}",
                "  ".repeat(flat.depth),
                node.name,
                node.id,
                node.sort_no
            );
            if !node.is_active {
                line.push_str(" (inactive)");
            }
            line
        })
        .collect()
}

pub fn leaf_lines(leaves: &[LeafEntry]) -> Vec<String> {
    leaves
        .iter()
        .map(|leaf| format!("{:>6}  {}", leaf.id, leaf.path))
        .collect()
}

pub fn classification_line(record: &Classification) -> String {
    format!("{} [{}] {}", record.path, record.id, if record.is_active { "active" } else { "inactive" })
}

pub fn project_lines(projects: &[Project]) -> Vec<String> {
    projects
        .iter()
        .map(|p| {
            format!(
                "{:>6}  {:<12}  {:<11}  {}",
                p.id,
                p.code.as_deref().unwrap_or("-"),
                p.status.as_str(),
                p.name
            )
        })
        .collect()
}

pub fn task_lines(tasks: &[Task]) -> Vec<String> {
    tasks
        .iter()
        .map(|t| format!("{:>6}  {:<8}  [{}] {}", t.id, t.status, t.classification_id, t.title))
        .collect()
}
