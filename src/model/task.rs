use serde::{Deserialize, Serialize};

/// Task status as stored on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "to-do")]
    Todo,
    /// Accepted on load and written back unchanged; nothing transitions into it.
    #[serde(rename = "doing")]
    Doing,
    #[serde(rename = "done")]
    Done,
}

impl TaskStatus {
    /// The character used inside the checkbox `[ ]`
    pub fn checkbox_char(self) -> char {
        match self {
            TaskStatus::Todo => ' ',
            TaskStatus::Doing => '>',
            TaskStatus::Done => 'x',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "to-do",
            TaskStatus::Doing => "doing",
            TaskStatus::Done => "done",
        }
    }
}

/// Lifecycle of an attached image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    Generating,
    Ready,
}

/// Reference to an entry in the blob store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskImage {
    pub image_id: String,
    pub status: ImageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TaskImage {
    pub fn ready(image_id: impl Into<String>) -> Self {
        TaskImage {
            image_id: image_id.into(),
            status: ImageStatus::Ready,
            description: None,
        }
    }

    pub fn generating(image_id: impl Into<String>) -> Self {
        TaskImage {
            image_id: image_id.into(),
            status: ImageStatus::Generating,
            description: None,
        }
    }
}

/// A node in the task tree.
///
/// `subtasks` order is display order and execution order. A task with no
/// subtasks is a leaf; only leaves are ever played.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    /// Empty while a freshly created task has not been named yet
    #[serde(default)]
    pub name: String,
    /// Estimated seconds. Only meaningful on leaves, see [`Task::effective_duration`].
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<TaskImage>,
    #[serde(default)]
    pub subtasks: Vec<Task>,
}

impl Task {
    /// A fresh `to-do` leaf
    pub fn new(id: impl Into<String>, name: impl Into<String>, duration: u64) -> Self {
        Task {
            id: id.into(),
            name: name.into(),
            duration,
            status: TaskStatus::Todo,
            image: None,
            subtasks: Vec::new(),
        }
    }

    /// Generate an id for a new task
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Builder used mostly by tests and the decomposition path
    pub fn with_subtasks(mut self, subtasks: Vec<Task>) -> Self {
        self.subtasks = subtasks;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.subtasks.is_empty()
    }

    /// Name shown to the user; unnamed tasks get a placeholder.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "(unnamed)"
        } else {
            &self.name
        }
    }

    /// Own duration for a leaf, sum of descendant leaf durations otherwise.
    pub fn effective_duration(&self) -> u64 {
        if self.is_leaf() {
            self.duration
        } else {
            self.subtasks.iter().map(Task::effective_duration).sum()
        }
    }
}

/// Generate an id for a new blob store entry
pub fn generate_image_id() -> String {
    format!("img_{}", uuid::Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_dashed_wire_names() {
        assert_eq!(serde_json::to_string(&TaskStatus::Todo).unwrap(), "\"to-do\"");
        assert_eq!(serde_json::to_string(&TaskStatus::Done).unwrap(), "\"done\"");
        let doing: TaskStatus = serde_json::from_str("\"doing\"").unwrap();
        assert_eq!(doing, TaskStatus::Doing);
    }

    #[test]
    fn legacy_record_without_status_or_image_loads_as_todo_leaf() {
        let task: Task = serde_json::from_str(r#"{"id":"a","name":"Read","duration":60}"#).unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
        assert!(task.image.is_none());
        assert!(task.is_leaf());
    }

    #[test]
    fn image_reference_is_camel_case() {
        let task = Task {
            image: Some(TaskImage::ready("img_1")),
            ..Task::new("a", "Read", 60)
        };
        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains(r#""imageId":"img_1""#));
        assert!(json.contains(r#""status":"ready""#));
        assert!(!json.contains("description"));
    }

    #[test]
    fn effective_duration_sums_leaves() {
        let task = Task::new("a", "A", 999).with_subtasks(vec![
            Task::new("b", "B", 60),
            Task::new("c", "C", 0).with_subtasks(vec![
                Task::new("d", "D", 120),
                Task::new("e", "E", 30),
            ]),
        ]);
        assert_eq!(task.effective_duration(), 210);
        assert_eq!(task.subtasks[0].effective_duration(), 60);
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(Task::generate_id(), Task::generate_id());
        assert!(generate_image_id().starts_with("img_"));
    }
}
