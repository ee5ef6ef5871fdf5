use thiserror::Error;

use crate::models::day::{DailyTasks, parse_date_key, today_key};
use crate::models::task::{Category, Context, Energy, Labels, Priority, Task, TaskDuration};
use crate::storage::local::LocalStore;

#[derive(Debug, Error)]
pub enum AddTaskError {
    #[error("Task title cannot be empty")]
    EmptyTitle,

    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Project '{0}' not found")]
    ProjectNotFound(String),

    #[error("Project name is ambiguous. Multiple projects found: {}", .0.join(", "))]
    AmbiguousProjectName(Vec<String>),

    #[error("Project item '{0}' not found in that project")]
    ProjectItemNotFound(String),

    #[error("Could not persist tasks to any storage tier")]
    PersistFailed,
}

pub struct AddTaskParameters {
    pub title: String,
    /// Day to add to; today when absent
    pub date: Option<String>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub energy: Option<Energy>,
    pub context: Option<Context>,
    pub duration: Option<TaskDuration>,
    pub project: Option<String>,
    pub project_item: Option<String>,
}

pub fn add_task(store: &LocalStore, parameters: AddTaskParameters) -> Result<Task, AddTaskError> {
    let title = parameters.title.trim();
    if title.is_empty() {
        return Err(AddTaskError::EmptyTitle);
    }

    let date_key = resolve_date_key(parameters.date, AddTaskError::InvalidDate)?;

    // Resolve a project reference by (partial) title, the same way the views
    // name projects. Task references stay unvalidated after this point; a
    // later project deletion just leaves the id dangling.
    let (project_id, project_item_id) = if let Some(project_name) = parameters.project {
        let projects = store.load_projects();
        let matching: Vec<_> = projects
            .iter()
            .filter(|p| p.title.to_lowercase().contains(&project_name.to_lowercase()))
            .collect();
        let project = match matching.len() {
            0 => return Err(AddTaskError::ProjectNotFound(project_name)),
            1 => matching[0],
            _ => {
                let titles: Vec<String> = matching.iter().map(|p| p.title.clone()).collect();
                return Err(AddTaskError::AmbiguousProjectName(titles));
            }
        };
        let item_id = if let Some(item_name) = parameters.project_item {
            let item = project
                .items
                .iter()
                .find(|i| i.title.to_lowercase().contains(&item_name.to_lowercase()))
                .ok_or(AddTaskError::ProjectItemNotFound(item_name))?;
            Some(item.id.clone())
        } else {
            None
        };
        (Some(project.id.clone()), item_id)
    } else {
        (None, None)
    };

    let labels = Labels {
        priority: parameters.priority,
        energy: parameters.energy,
        context: parameters.context,
        duration: parameters.duration,
    };

    let mut task = Task::new(title);
    task.category = parameters.category;
    task.labels = (!labels.is_empty()).then_some(labels);
    task.project_id = project_id;
    task.project_item_id = project_item_id;

    let mut days = store.load_days();
    days.entry(date_key.clone())
        .or_insert_with(|| DailyTasks::empty(&date_key))
        .upsert_task(task.clone());
    if !store.save_days(&days) {
        return Err(AddTaskError::PersistFailed);
    }
    Ok(task)
}

#[derive(Debug, Error)]
pub enum EditTaskError {
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("No tasks recorded for {0}")]
    NoSuchDay(String),

    #[error("No task #{0} on that day")]
    NoSuchTask(usize),

    #[error("Could not persist tasks to any storage tier")]
    PersistFailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Flip completion of the `position`-th task (1-based display order).
pub fn toggle_task(
    store: &LocalStore,
    date: Option<String>,
    position: usize,
) -> Result<Task, EditTaskError> {
    edit_day(store, date, |day| {
        let task_id = task_id_at(day, position)?;
        day.toggle_task(&task_id);
        Ok(task_id)
    })
}

pub fn remove_task(
    store: &LocalStore,
    date: Option<String>,
    position: usize,
) -> Result<Task, EditTaskError> {
    let date_key = resolve_date_key(date, EditTaskError::InvalidDate)?;
    let mut days = store.load_days();
    let day = days
        .get_mut(&date_key)
        .ok_or_else(|| EditTaskError::NoSuchDay(date_key.clone()))?;
    let task_id = task_id_at(day, position)?;
    let removed = day
        .tasks
        .iter()
        .find(|t| t.id == task_id)
        .cloned()
        .ok_or(EditTaskError::NoSuchTask(position))?;
    day.remove_task(&task_id);
    if !store.save_days(&days) {
        return Err(EditTaskError::PersistFailed);
    }
    Ok(removed)
}

pub fn move_task(
    store: &LocalStore,
    date: Option<String>,
    position: usize,
    direction: MoveDirection,
) -> Result<Task, EditTaskError> {
    let offset = match direction {
        MoveDirection::Up => -1,
        MoveDirection::Down => 1,
    };
    edit_day(store, date, |day| {
        let task_id = task_id_at(day, position)?;
        day.move_task(&task_id, offset);
        Ok(task_id)
    })
}

/// Move the task at `from` to position `to` (both 1-based, `to` clamped).
pub fn reorder_tasks(
    store: &LocalStore,
    date: Option<String>,
    from: usize,
    to: usize,
) -> Result<Task, EditTaskError> {
    edit_day(store, date, |day| {
        let task_id = task_id_at(day, from)?;
        day.reorder(from - 1, to.saturating_sub(1));
        Ok(task_id)
    })
}

fn resolve_date_key<E>(date: Option<String>, invalid: impl FnOnce(String) -> E) -> Result<String, E> {
    match date {
        Some(raw) => parse_date_key(&raw).ok_or_else(|| invalid(raw)),
        None => Ok(today_key()),
    }
}

fn task_id_at(day: &DailyTasks, position: usize) -> Result<String, EditTaskError> {
    day.tasks
        .get(position.wrapping_sub(1))
        .map(|t| t.id.clone())
        .ok_or(EditTaskError::NoSuchTask(position))
}

fn edit_day(
    store: &LocalStore,
    date: Option<String>,
    apply: impl FnOnce(&mut DailyTasks) -> Result<String, EditTaskError>,
) -> Result<Task, EditTaskError> {
    let date_key = resolve_date_key(date, EditTaskError::InvalidDate)?;
    let mut days = store.load_days();
    let day = days
        .get_mut(&date_key)
        .ok_or_else(|| EditTaskError::NoSuchDay(date_key.clone()))?;
    let task_id = apply(day)?;
    let task = day
        .tasks
        .iter()
        .find(|t| t.id == task_id)
        .cloned()
        .expect("edited task stays in its day");
    if !store.save_days(&days) {
        return Err(EditTaskError::PersistFailed);
    }
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::bus::EventBus;
    use crate::models::project::{Project, ProjectItem, ProjectItemType};

    fn store() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open_at(dir.path().to_path_buf(), Arc::new(EventBus::new()));
        (dir, store)
    }

    fn bare_add(title: &str, date: &str) -> AddTaskParameters {
        AddTaskParameters {
            title: title.into(),
            date: Some(date.into()),
            category: None,
            priority: None,
            energy: None,
            context: None,
            duration: None,
            project: None,
            project_item: None,
        }
    }

    #[test]
    fn add_creates_the_day_on_first_task() {
        let (_dir, store) = store();
        let task = add_task(&store, bare_add("Write report", "2025-06-01")).unwrap();
        assert_eq!(task.title, "Write report");

        let days = store.load_days();
        assert_eq!(days["2025-06-01"].tasks.len(), 1);
        assert_eq!(days["2025-06-01"].date_key, "2025-06-01");
    }

    #[test]
    fn add_rejects_blank_titles_and_bad_dates() {
        let (_dir, store) = store();
        assert!(matches!(
            add_task(&store, bare_add("  ", "2025-06-01")),
            Err(AddTaskError::EmptyTitle)
        ));
        assert!(matches!(
            add_task(&store, bare_add("ok", "tomorrow")),
            Err(AddTaskError::InvalidDate(_))
        ));
    }

    #[test]
    fn add_defaults_to_today() {
        let (_dir, store) = store();
        let params = AddTaskParameters {
            date: None,
            ..bare_add("Now", "ignored")
        };
        add_task(&store, params).unwrap();
        assert!(store.load_days().contains_key(&today_key()));
    }

    #[test]
    fn labels_are_dropped_when_no_axis_is_set() {
        let (_dir, store) = store();
        let plain = add_task(&store, bare_add("plain", "2025-06-01")).unwrap();
        assert!(plain.labels.is_none());

        let mut params = bare_add("labeled", "2025-06-01");
        params.priority = Some(Priority::P1);
        let labeled = add_task(&store, params).unwrap();
        assert_eq!(labeled.labels.unwrap().priority, Some(Priority::P1));
    }

    #[test]
    fn project_references_resolve_by_partial_title() {
        let (_dir, store) = store();
        let mut project = Project::new("Thesis draft", None);
        let item = ProjectItem::new(ProjectItemType::Milestone, "Chapter one", None);
        project.items.push(item.clone());
        store.save_projects(&[project.clone()]);

        let mut params = bare_add("Outline", "2025-06-01");
        params.project = Some("thesis".into());
        params.project_item = Some("chapter".into());
        let task = add_task(&store, params).unwrap();
        assert_eq!(task.project_id.as_deref(), Some(project.id.as_str()));
        assert_eq!(task.project_item_id.as_deref(), Some(item.id.as_str()));
    }

    #[test]
    fn ambiguous_and_missing_projects_are_reported() {
        let (_dir, store) = store();
        store.save_projects(&[
            Project::new("Garden front", None),
            Project::new("Garden back", None),
        ]);

        let mut params = bare_add("Weed", "2025-06-01");
        params.project = Some("garden".into());
        assert!(matches!(
            add_task(&store, params),
            Err(AddTaskError::AmbiguousProjectName(titles)) if titles.len() == 2
        ));

        let mut params = bare_add("Weed", "2025-06-01");
        params.project = Some("kitchen".into());
        assert!(matches!(
            add_task(&store, params),
            Err(AddTaskError::ProjectNotFound(_))
        ));
    }

    #[test]
    fn toggle_remove_move_and_reorder_by_position() {
        let (_dir, store) = store();
        for title in ["a", "b", "c"] {
            add_task(&store, bare_add(title, "2025-06-01")).unwrap();
        }
        let date = Some("2025-06-01".to_string());

        let toggled = toggle_task(&store, date.clone(), 2).unwrap();
        assert_eq!(toggled.title, "b");
        assert!(toggled.done);

        move_task(&store, date.clone(), 3, MoveDirection::Up).unwrap();
        let titles: Vec<String> = store.load_days()["2025-06-01"]
            .tasks
            .iter()
            .map(|t| t.title.clone())
            .collect();
        assert_eq!(titles, ["a", "c", "b"]);

        reorder_tasks(&store, date.clone(), 3, 1).unwrap();
        let titles: Vec<String> = store.load_days()["2025-06-01"]
            .tasks
            .iter()
            .map(|t| t.title.clone())
            .collect();
        assert_eq!(titles, ["b", "a", "c"]);

        let removed = remove_task(&store, date.clone(), 1).unwrap();
        assert_eq!(removed.title, "b");
        assert_eq!(store.load_days()["2025-06-01"].tasks.len(), 2);
    }

    #[test]
    fn edits_on_missing_days_and_positions_fail_cleanly() {
        let (_dir, store) = store();
        assert!(matches!(
            toggle_task(&store, Some("2025-06-01".into()), 1),
            Err(EditTaskError::NoSuchDay(_))
        ));

        add_task(&store, bare_add("only", "2025-06-01")).unwrap();
        assert!(matches!(
            toggle_task(&store, Some("2025-06-01".into()), 5),
            Err(EditTaskError::NoSuchTask(5))
        ));
    }
}
