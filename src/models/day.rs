use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::task::Task;

/// The entire task dataset: date key (`YYYY-MM-DD`) to the tasks of that day.
/// Map key always equals the contained day's `date_key`.
pub type DayMap = BTreeMap<String, DailyTasks>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyTasks {
    pub date_key: String,
    pub tasks: Vec<Task>,
}

impl DailyTasks {
    pub fn empty(date_key: impl Into<String>) -> Self {
        Self {
            date_key: date_key.into(),
            tasks: vec![],
        }
    }

    /// Replace the task with the same id, or append.
    pub fn upsert_task(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
    }

    /// Flip the completion flag. Returns false when no task has this id.
    pub fn toggle_task(&mut self, task_id: &str) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == task_id) {
            Some(task) => {
                task.done = !task.done;
                true
            }
            None => false,
        }
    }

    pub fn remove_task(&mut self, task_id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != task_id);
        self.tasks.len() != before
    }

    /// Move a task one slot up or down, clamped at the ends.
    pub fn move_task(&mut self, task_id: &str, offset: isize) -> bool {
        let Some(index) = self.tasks.iter().position(|t| t.id == task_id) else {
            return false;
        };
        let target = (index as isize + offset).clamp(0, self.tasks.len() as isize - 1) as usize;
        let task = self.tasks.remove(index);
        self.tasks.insert(target, task);
        true
    }

    /// Move the task at `from` to position `to` (clamped). Display order is
    /// the priority order.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from >= self.tasks.len() {
            return false;
        }
        let clamped_to = to.min(self.tasks.len() - 1);
        let task = self.tasks.remove(from);
        self.tasks.insert(clamped_to, task);
        true
    }

    /// A day counts as completed when it has at least one task and all are done.
    pub fn is_completed(&self) -> bool {
        !self.tasks.is_empty() && self.tasks.iter().all(|t| t.done)
    }
}

/// Today's date key in the local calendar.
pub fn today_key() -> String {
    jiff::Zoned::now().date().to_string()
}

/// Validate a user-supplied date key, normalizing through `jiff`.
pub fn parse_date_key(raw: &str) -> Option<String> {
    raw.parse::<jiff::civil::Date>().ok().map(|d| d.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day_with(titles: &[&str]) -> DailyTasks {
        let mut day = DailyTasks::empty("2025-06-01");
        for title in titles {
            day.tasks.push(Task::new(*title));
        }
        day
    }

    #[test]
    fn upsert_replaces_by_id_and_appends_otherwise() {
        let mut day = day_with(&["a", "b"]);
        let mut edited = day.tasks[0].clone();
        edited.title = "a2".into();
        day.upsert_task(edited);
        assert_eq!(day.tasks.len(), 2);
        assert_eq!(day.tasks[0].title, "a2");

        day.upsert_task(Task::new("c"));
        assert_eq!(day.tasks.len(), 3);
        assert_eq!(day.tasks[2].title, "c");
    }

    #[test]
    fn toggle_flips_done_and_reports_missing_ids() {
        let mut day = day_with(&["a"]);
        let id = day.tasks[0].id.clone();
        assert!(day.toggle_task(&id));
        assert!(day.tasks[0].done);
        assert!(day.toggle_task(&id));
        assert!(!day.tasks[0].done);
        assert!(!day.toggle_task("missing"));
    }

    #[test]
    fn move_task_clamps_at_the_ends() {
        let mut day = day_with(&["a", "b", "c"]);
        let first = day.tasks[0].id.clone();
        assert!(day.move_task(&first, -1));
        assert_eq!(day.tasks[0].title, "a");

        assert!(day.move_task(&first, 1));
        assert_eq!(day.tasks[1].title, "a");
        assert!(day.move_task(&first, 5));
        assert_eq!(day.tasks[2].title, "a");
    }

    #[test]
    fn reorder_moves_and_rejects_out_of_range_source() {
        let mut day = day_with(&["a", "b", "c"]);
        assert!(day.reorder(2, 0));
        let titles: Vec<_> = day.tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["c", "a", "b"]);
        assert!(!day.reorder(9, 0));
    }

    #[test]
    fn completed_requires_at_least_one_done_task() {
        let mut day = DailyTasks::empty("2025-06-01");
        assert!(!day.is_completed());
        day.tasks.push(Task::new("a"));
        assert!(!day.is_completed());
        day.tasks[0].done = true;
        assert!(day.is_completed());
    }

    #[test]
    fn date_keys_parse_strictly() {
        assert_eq!(parse_date_key("2025-06-01").as_deref(), Some("2025-06-01"));
        assert!(parse_date_key("June 1st").is_none());
        assert!(parse_date_key("2025-13-01").is_none());
    }

    #[test]
    fn day_serializes_with_camel_case_date_key() {
        let day = DailyTasks::empty("2025-06-01");
        let json = serde_json::to_value(&day).unwrap();
        assert_eq!(json["dateKey"], "2025-06-01");
    }
}
