use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum ProjectItemType {
    Deadline,
    Milestone,
    Deliverable,
    Goal,
}

impl ProjectItemType {
    pub fn display_name(&self) -> &'static str {
        match self {
            ProjectItemType::Deadline => "Deadline",
            ProjectItemType::Milestone => "Milestone",
            ProjectItemType::Deliverable => "Deliverable",
            ProjectItemType::Goal => "Goal",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ProjectItemType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_iso: Option<String>,
}

impl ProjectItem {
    pub fn new(kind: ProjectItemType, title: impl Into<String>, date_iso: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            title: title.into(),
            date_iso,
        }
    }
}

/// Projects have a lifecycle independent from days; tasks may reference them
/// by id without validation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<ProjectItem>,
}

impl Project {
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description,
            items: vec![],
        }
    }
}
