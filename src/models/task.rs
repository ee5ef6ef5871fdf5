use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of task categories. The serialized names are part of the wire
/// format shared with other devices, so they must not change.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Category {
    DeepWork,
    Meetings,
    AdminEmail,
    PlanningReview,
    ResearchLearning,
    WritingCreative,
    HealthFitness,
    FamilyFriends,
    ErrandsChores,
    HobbiesGrowth,
}

impl Category {
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::DeepWork => "Deep work",
            Category::Meetings => "Meetings",
            Category::AdminEmail => "Admin & email",
            Category::PlanningReview => "Planning & review",
            Category::ResearchLearning => "Research & learning",
            Category::WritingCreative => "Writing & creative",
            Category::HealthFitness => "Health & fitness",
            Category::FamilyFriends => "Family & friends",
            Category::ErrandsChores => "Errands & chores",
            Category::HobbiesGrowth => "Hobbies & growth",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Priority {
    P1,
    P2,
    P3,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Energy {
    High,
    Medium,
    Low,
}

/// Where the task can be done.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Context {
    Office,
    Home,
    Mobile,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum TaskDuration {
    #[serde(rename = "15m")]
    #[value(name = "15m")]
    Minutes15,
    #[serde(rename = "30m")]
    #[value(name = "30m")]
    Minutes30,
    #[serde(rename = "60m")]
    #[value(name = "60m")]
    Minutes60,
    #[serde(rename = "90m+")]
    #[value(name = "90m+")]
    Minutes90Plus,
}

impl TaskDuration {
    pub fn display_name(&self) -> &'static str {
        match self {
            TaskDuration::Minutes15 => "15m",
            TaskDuration::Minutes30 => "30m",
            TaskDuration::Minutes60 => "60m",
            TaskDuration::Minutes90Plus => "90m+",
        }
    }
}

/// Optional label set on a task. Every axis is independently optional; a task
/// with no labels serializes without the `labels` field at all.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Labels {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<Energy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<TaskDuration>,
}

impl Labels {
    pub fn is_empty(&self) -> bool {
        self.priority.is_none()
            && self.energy.is_none()
            && self.context.is_none()
            && self.duration.is_none()
    }
}

/// Calendar platform a task was imported from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourcePlatform {
    Google,
    Teams,
    Zoom,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque id, unique within its day
    pub id: String,
    pub title: String,
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
    /// Provenance for calendar-imported tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourcePlatform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_iso: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_iso: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendee: Option<String>,
    /// Unvalidated reference; dangling ids render as "Unknown"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_item_id: Option<String>,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            done: false,
            category: None,
            labels: None,
            source: None,
            start_iso: None,
            end_iso: None,
            attendee: None,
            project_id: None,
            project_item_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_serializes_to_snake_case_names() {
        let json = serde_json::to_string(&Category::DeepWork).unwrap();
        assert_eq!(json, "\"deep_work\"");
        let back: Category = serde_json::from_str("\"admin_email\"").unwrap();
        assert_eq!(back, Category::AdminEmail);
    }

    #[test]
    fn duration_round_trips_through_wire_names() {
        let json = serde_json::to_string(&TaskDuration::Minutes90Plus).unwrap();
        assert_eq!(json, "\"90m+\"");
        let back: TaskDuration = serde_json::from_str("\"15m\"").unwrap();
        assert_eq!(back, TaskDuration::Minutes15);
    }

    #[test]
    fn bare_task_omits_optional_fields() {
        let task = Task::new("Write report");
        let json = serde_json::to_value(&task).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert!(obj.contains_key("id"));
        assert!(obj.contains_key("title"));
        assert!(obj.contains_key("done"));
    }

    #[test]
    fn task_parses_camel_case_wire_fields() {
        let json = r#"{
            "id": "t1",
            "title": "Standup",
            "done": false,
            "source": "teams",
            "startIso": "2025-06-01T09:00:00Z",
            "projectId": "p1",
            "projectItemId": "i1"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.source, Some(SourcePlatform::Teams));
        assert_eq!(task.start_iso.as_deref(), Some("2025-06-01T09:00:00Z"));
        assert_eq!(task.project_id.as_deref(), Some("p1"));
        assert_eq!(task.project_item_id.as_deref(), Some("i1"));
    }
}
