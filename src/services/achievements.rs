use std::collections::HashSet;

use jiff::civil::Date;

use crate::models::day::DayMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Streaks {
    pub current: u32,
    pub best: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Badge {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub earned: bool,
}

fn is_next_day(a: &str, b: &str) -> bool {
    let (Ok(a), Ok(b)) = (a.parse::<Date>(), b.parse::<Date>()) else {
        return false;
    };
    a.tomorrow().is_ok_and(|next| next == b)
}

/// Current and best runs of consecutive completed days. A completed day has
/// at least one task and all of them done.
pub fn compute_streaks(days: &DayMap) -> Streaks {
    let keys: Vec<&str> = days.keys().map(String::as_str).collect();
    if keys.is_empty() {
        return Streaks::default();
    }
    let completed: HashSet<&str> = keys
        .iter()
        .copied()
        .filter(|k| days[*k].is_completed())
        .collect();

    let mut best = 0u32;
    let mut run = 0u32;
    let mut prev: Option<&str> = None;
    for key in &keys {
        if !completed.contains(key) {
            best = best.max(run);
            run = 0;
            prev = Some(key);
            continue;
        }
        run = match prev {
            Some(p) if is_next_day(p, key) => run + 1,
            _ => 1,
        };
        prev = Some(key);
    }
    best = best.max(run);

    // The current streak counts back from the most recent recorded day.
    let mut current = 0u32;
    for i in (0..keys.len()).rev() {
        if i == keys.len() - 1 {
            if completed.contains(keys[i]) {
                current = 1;
            } else {
                break;
            }
        } else if is_next_day(keys[i], keys[i + 1]) && completed.contains(keys[i]) {
            current += 1;
        } else {
            break;
        }
    }

    Streaks { current, best }
}

pub fn compute_badges(streaks: &Streaks, days: &DayMap) -> Vec<Badge> {
    let completed_days = days.values().filter(|d| d.is_completed()).count();
    let tasks_done: usize = days
        .values()
        .map(|d| d.tasks.iter().filter(|t| t.done).count())
        .sum();
    let streak = streaks.best.max(streaks.current);

    vec![
        Badge {
            id: "first-day",
            title: "First Day",
            description: "Complete your first full day",
            icon: "🌱",
            earned: completed_days >= 1,
        },
        Badge {
            id: "three-days",
            title: "3-Day Streak",
            description: "Keep the momentum 3 days in a row",
            icon: "🔥",
            earned: streak >= 3,
        },
        Badge {
            id: "seven-days",
            title: "7-Day Streak",
            description: "A full week streak",
            icon: "🗓️",
            earned: streak >= 7,
        },
        Badge {
            id: "thirty-days",
            title: "30-Day Streak",
            description: "One month of consistency",
            icon: "🏆",
            earned: streak >= 30,
        },
        Badge {
            id: "hundred-tasks",
            title: "Century",
            description: "Complete 100 tasks total",
            icon: "💯",
            earned: tasks_done >= 100,
        },
        Badge {
            id: "five-in-a-day",
            title: "Max Focus",
            description: "Complete 5 tasks in a single day",
            icon: "🎯",
            earned: days
                .values()
                .any(|d| d.tasks.len() >= 5 && d.is_completed()),
        },
    ]
}
