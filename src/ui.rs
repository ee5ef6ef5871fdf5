use colored::*;

use crate::models::day::{DailyTasks, DayMap};
use crate::models::payload::SyncInfo;
use crate::models::project::Project;
use crate::models::task::Task;
use crate::services::achievements::{Badge, Streaks};

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

fn status_glyph(task: &Task) -> ColoredString {
    if task.done { "✓".dimmed() } else { "○".normal() }
}

/// Build the right-aligned context string for a task: category, labels and
/// project reference. A dangling project id renders as "Unknown".
fn task_context(task: &Task, projects: &[Project]) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    if let Some(category) = task.category {
        parts.push(category.display_name().to_string());
    }
    if let Some(labels) = task.labels {
        if let Some(priority) = labels.priority {
            parts.push(format!("{priority:?}"));
        }
        if let Some(duration) = labels.duration {
            parts.push(duration.display_name().to_string());
        }
    }
    if let Some(project_id) = &task.project_id {
        let title = projects
            .iter()
            .find(|p| &p.id == project_id)
            .map(|p| p.title.as_str())
            .unwrap_or("Unknown");
        parts.push(title.to_string());
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" · "))
    }
}

pub fn render_task_line(position: usize, task: &Task, projects: &[Project]) {
    let terminal_width = get_terminal_width();

    let id_str = format!("{position:>3}");
    let glyph = status_glyph(task);
    let left_section = format!("  {}  {}  {}", id_str, glyph, task.title);
    let styled_left = if task.done {
        left_section.dimmed()
    } else {
        left_section.bold()
    };

    if let Some(context) = task_context(task, projects) {
        let left_visible_len = format!("  {}  {}  {}", id_str, " ", task.title)
            .chars()
            .count();
        let right_visible_len = context.chars().count();
        let total_content = left_visible_len + right_visible_len;

        if total_content + 4 < terminal_width {
            let padding = terminal_width - total_content - 2;
            println!("{}{}{}", styled_left, " ".repeat(padding), context.dimmed());
        } else {
            println!("{}", styled_left);
        }
    } else {
        println!("{}", styled_left);
    }
}

/// Render a view header with title and count
pub fn render_view_header(title: &str, count: usize) {
    let task_word = if count == 1 { "task" } else { "tasks" };
    println!("\n  {} ({} {})\n", title.cyan().bold(), count, task_word);
}

pub fn render_day(day: &DailyTasks, projects: &[Project]) {
    render_view_header(&day.date_key, day.tasks.len());
    if day.tasks.is_empty() {
        println!("  No tasks for this day");
        return;
    }
    for (index, task) in day.tasks.iter().enumerate() {
        render_task_line(index + 1, task, projects);
    }
}

pub fn render_history(days: &DayMap) {
    if days.is_empty() {
        println!("No days recorded yet");
        return;
    }
    render_view_header("History", days.len());
    for day in days.values().rev() {
        let done = day.tasks.iter().filter(|t| t.done).count();
        let summary = format!("{}/{} done", done, day.tasks.len());
        let marker = if day.is_completed() {
            "●".green()
        } else {
            "○".normal()
        };
        println!(
            "  {}  {}  {}",
            marker,
            day.date_key.bold(),
            summary.dimmed()
        );
    }
}

pub fn render_streaks(streaks: &Streaks, badges: &[Badge]) {
    println!(
        "\n  Current streak: {}   Best: {}\n",
        format!("{} days", streaks.current).green().bold(),
        format!("{} days", streaks.best).bold()
    );
    for badge in badges {
        let marker = if badge.earned {
            badge.icon.normal()
        } else {
            "—".dimmed()
        };
        let title = if badge.earned {
            badge.title.bold()
        } else {
            badge.title.dimmed()
        };
        println!("  {}  {}  {}", marker, title, badge.description.dimmed());
    }
}

pub fn render_projects(projects: &[Project]) {
    if projects.is_empty() {
        println!("No projects yet");
        return;
    }
    let project_word = if projects.len() == 1 {
        "project"
    } else {
        "projects"
    };
    println!("\n  {} ({} {})\n", "Projects".cyan().bold(), projects.len(), project_word);
    for project in projects {
        println!("  {}", project.title.bold());
        if let Some(description) = &project.description {
            println!("    {}", description.dimmed());
        }
        for (index, item) in project.items.iter().enumerate() {
            let date = item
                .date_iso
                .as_deref()
                .map(|d| format!("  {d}"))
                .unwrap_or_default();
            println!(
                "    {}  [{}] {}{}",
                format!("{:>2}", index + 1).dimmed(),
                item.kind.display_name(),
                item.title,
                date.dimmed()
            );
        }
    }
}

pub fn render_sync_status(signed_in_as: Option<&str>, info: &SyncInfo) {
    match signed_in_as {
        Some(user) => println!("  Signed in as {}", user.bold()),
        None => println!("  {}", "Signed out".dimmed()),
    }
    match (&info.at, &info.device) {
        (Some(at), Some(device)) => {
            println!("  Last synced {} from {}", at, device.label.bold());
        }
        (Some(at), None) => println!("  Last synced {at}"),
        _ => println!("  {}", "Never synced".dimmed()),
    }
}
