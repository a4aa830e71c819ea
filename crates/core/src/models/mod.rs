//! Records exchanged with the REST backend.

pub mod classification;
pub mod project;
pub mod task;
mod timestamp;

pub use classification::{
    Classification, ClassificationCreate, ClassificationListParams, ClassificationNode,
    ClassificationUpdate, MAX_NAME_LEN, PATH_SEPARATOR, ROOT_NAME,
};
pub use project::{Project, ProjectListParams, ProjectStatus};
pub use task::{DEFAULT_TASK_STATUS, Task, TaskCreate, TaskListParams, TaskUpdate};
