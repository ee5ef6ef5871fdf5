use thiserror::Error;

use crate::models::day::parse_date_key;
use crate::models::project::{Project, ProjectItem, ProjectItemType};
use crate::storage::local::LocalStore;

#[derive(Debug, Error)]
pub enum CreateProjectError {
    #[error("Project title cannot be empty")]
    EmptyTitle,

    #[error("Project with title '{0}' already exists")]
    ProjectAlreadyExists(String),

    #[error("Could not persist projects to any storage tier")]
    PersistFailed,
}

pub struct CreateProjectParameters {
    pub title: String,
    pub description: Option<String>,
}

pub fn create_project(
    store: &LocalStore,
    parameters: CreateProjectParameters,
) -> Result<Project, CreateProjectError> {
    let title = parameters.title.trim();
    if title.is_empty() {
        return Err(CreateProjectError::EmptyTitle);
    }

    let mut projects = store.load_projects();
    if projects
        .iter()
        .any(|p| p.title.eq_ignore_ascii_case(title))
    {
        return Err(CreateProjectError::ProjectAlreadyExists(title.to_string()));
    }

    let project = Project::new(title, parameters.description);
    projects.push(project.clone());
    if !store.save_projects(&projects) {
        return Err(CreateProjectError::PersistFailed);
    }
    Ok(project)
}

#[derive(Debug, Error)]
pub enum ProjectLookupError {
    #[error("Project '{0}' not found")]
    ProjectNotFound(String),

    #[error("Project name is ambiguous. Multiple projects found: {}", .0.join(", "))]
    AmbiguousProjectName(Vec<String>),

    #[error("No item #{0} in that project")]
    NoSuchItem(usize),

    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Could not persist projects to any storage tier")]
    PersistFailed,
}

/// Delete a project resolved by partial title. Task references to its id are
/// left dangling on purpose; views render them as "Unknown".
pub fn delete_project(store: &LocalStore, name: &str) -> Result<Project, ProjectLookupError> {
    let mut projects = store.load_projects();
    let index = find_project(&projects, name)?;
    let removed = projects.remove(index);
    if !store.save_projects(&projects) {
        return Err(ProjectLookupError::PersistFailed);
    }
    Ok(removed)
}

pub struct AddItemParameters {
    pub project: String,
    pub kind: ProjectItemType,
    pub title: String,
    pub date: Option<String>,
}

pub fn add_project_item(
    store: &LocalStore,
    parameters: AddItemParameters,
) -> Result<ProjectItem, ProjectLookupError> {
    let date_iso = match parameters.date {
        Some(raw) => {
            Some(parse_date_key(&raw).ok_or(ProjectLookupError::InvalidDate(raw))?)
        }
        None => None,
    };

    let mut projects = store.load_projects();
    let index = find_project(&projects, &parameters.project)?;
    let item = ProjectItem::new(parameters.kind, parameters.title, date_iso);
    projects[index].items.push(item.clone());
    if !store.save_projects(&projects) {
        return Err(ProjectLookupError::PersistFailed);
    }
    Ok(item)
}

/// Remove the `position`-th item (1-based) of a project.
pub fn remove_project_item(
    store: &LocalStore,
    project_name: &str,
    position: usize,
) -> Result<ProjectItem, ProjectLookupError> {
    let mut projects = store.load_projects();
    let index = find_project(&projects, project_name)?;
    let items = &mut projects[index].items;
    if position == 0 || position > items.len() {
        return Err(ProjectLookupError::NoSuchItem(position));
    }
    let removed = items.remove(position - 1);
    if !store.save_projects(&projects) {
        return Err(ProjectLookupError::PersistFailed);
    }
    Ok(removed)
}

fn find_project(projects: &[Project], name: &str) -> Result<usize, ProjectLookupError> {
    let matching: Vec<usize> = projects
        .iter()
        .enumerate()
        .filter(|(_, p)| p.title.to_lowercase().contains(&name.to_lowercase()))
        .map(|(i, _)| i)
        .collect();
    match matching.len() {
        0 => Err(ProjectLookupError::ProjectNotFound(name.to_string())),
        1 => Ok(matching[0]),
        _ => Err(ProjectLookupError::AmbiguousProjectName(
            matching
                .into_iter()
                .map(|i| projects[i].title.clone())
                .collect(),
        )),
    }
}
