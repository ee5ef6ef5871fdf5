use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::*;

use crate::bus::{AppEvent, EventBus};
use crate::identity::{Identity, StoredSession, UserId};
use crate::models::day::{DailyTasks, today_key};
use crate::models::payload::DeviceInfo;
use crate::models::project::ProjectItemType;
use crate::models::task::{Category, Context, Energy, Priority, TaskDuration};
use crate::services::achievements::{compute_badges, compute_streaks};
use crate::services::projects::{
    AddItemParameters, CreateProjectParameters, add_project_item, create_project, delete_project,
    remove_project_item,
};
use crate::services::tasks::{
    AddTaskParameters, MoveDirection, add_task, move_task, remove_task, reorder_tasks, toggle_task,
};
use crate::services::transfer::{export_to_path, import_from_path};
use crate::settings::{Settings, load_settings, save_settings};
use crate::storage::local::LocalStore;
use crate::sync::engine::{SyncEngine, last_sync_info};
use crate::sync::rest::RestRemote;
use crate::sync::scheduler::{SchedulerConfig, SyncScheduler};

mod bus;
mod device;
mod identity;
mod models;
mod services;
mod settings;
mod storage;
mod sync;
mod ui;

#[derive(Parser)]
#[command(
    name = "prio",
    about = "A daily priorities tracker with streaks and multi-device sync"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's priorities
    Today,

    /// Show the tasks of a specific day
    List {
        /// Day to show (YYYY-MM-DD)
        date: String,
    },

    /// Add a task
    Add {
        /// Task title
        title: String,

        /// Day to add to (YYYY-MM-DD), today when omitted
        #[arg(short, long)]
        date: Option<String>,

        /// Category
        #[arg(short, long)]
        category: Option<Category>,

        /// Priority label
        #[arg(long)]
        priority: Option<Priority>,

        /// Energy label
        #[arg(long)]
        energy: Option<Energy>,

        /// Context label
        #[arg(long)]
        context: Option<Context>,

        /// Duration label
        #[arg(long)]
        duration: Option<TaskDuration>,

        /// Attach to a project (by title, partial match)
        #[arg(short, long)]
        project: Option<String>,

        /// Attach to a project item (by title, partial match)
        #[arg(long)]
        item: Option<String>,
    },

    /// Toggle completion of a task by its position
    Done {
        position: usize,

        #[arg(short, long)]
        date: Option<String>,
    },

    /// Remove a task by its position
    Rm {
        position: usize,

        #[arg(short, long)]
        date: Option<String>,
    },

    /// Move a task one slot up or down
    Move {
        position: usize,
        direction: MoveDirection,

        #[arg(short, long)]
        date: Option<String>,
    },

    /// Move a task to a new position
    Reorder {
        from: usize,
        to: usize,

        #[arg(short, long)]
        date: Option<String>,
    },

    /// Show all recorded days
    History,

    /// Show streaks and badges
    Streaks,

    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Export the full dataset to a JSON file
    Export { path: PathBuf },

    /// Replace the local dataset with the contents of a JSON file
    Import { path: PathBuf },

    /// Update stored configuration
    Config {
        /// Base URL of the remote sync service
        #[arg(long)]
        remote_url: Option<String>,

        /// API key sent as a bearer token
        #[arg(long)]
        api_key: Option<String>,

        /// Label shown to other devices as "last synced from"
        #[arg(long)]
        device_label: Option<String>,
    },

    /// Sign in for cloud sync
    Login {
        /// User id from the identity provider
        user: String,

        /// Keep the session only until the temp dir is cleared
        #[arg(long)]
        no_remember: bool,
    },

    /// Sign out of cloud sync
    Logout,

    /// Cloud synchronization
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Create a project
    Add {
        title: String,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// List projects and their items
    List,

    /// Delete a project (by title, partial match)
    Rm { title: String },

    /// Manage project items
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },
}

#[derive(Subcommand)]
enum ItemCommands {
    /// Add an item to a project
    Add {
        /// Project title (partial match)
        project: String,
        kind: ProjectItemType,
        title: String,

        /// Target date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Remove an item by its position
    Rm { project: String, position: usize },
}

#[derive(Subcommand)]
enum SyncCommands {
    /// Pull then push once
    Now,

    /// Show sign-in state and last-sync metadata
    Status,

    /// Run the sync scheduler until interrupted
    Watch,
}

/// Everything a command needs, constructed once per invocation. No ambient
/// globals; tests build their own instances against temp dirs.
struct App {
    bus: Arc<EventBus>,
    store: Arc<LocalStore>,
    session: Arc<StoredSession>,
    settings: Settings,
}

impl App {
    fn open() -> Self {
        let bus = Arc::new(EventBus::new());
        let store = Arc::new(LocalStore::open(Arc::clone(&bus)));
        store.restore_durable();
        let settings = load_settings(&store);
        let session = Arc::new(StoredSession::new(Arc::clone(&store)));
        Self {
            bus,
            store,
            session,
            settings,
        }
    }

    /// The engine exists only once a remote endpoint is configured.
    fn sync_engine(&self) -> Option<Arc<SyncEngine>> {
        let url = self.settings.remote_url.as_ref()?;
        let remote = Arc::new(RestRemote::new(
            url.clone(),
            self.settings.remote_api_key.clone(),
        ));
        let label = self
            .settings
            .device_label
            .clone()
            .unwrap_or_else(device::device_label);
        let device = DeviceInfo {
            id: device::device_id(&self.store),
            label,
        };
        Some(Arc::new(SyncEngine::new(
            Arc::clone(&self.store),
            remote,
            Arc::clone(&self.session) as Arc<dyn Identity>,
            device,
        )))
    }
}

fn fail(error: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), error);
    std::process::exit(1);
}

fn no_remote() -> ! {
    fail("No remote configured. Set one with `prio config --remote-url <URL>`")
}

fn show_day(app: &App, date_key: &str) {
    let days = app.store.load_days();
    let projects = app.store.load_projects();
    let day = days
        .get(date_key)
        .cloned()
        .unwrap_or_else(|| DailyTasks::empty(date_key));
    ui::render_day(&day, &projects);
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app = App::open();

    let command = cli.command.unwrap_or(Commands::Today);
    match command {
        Commands::Today => {
            show_day(&app, &today_key());
        }
        Commands::List { date } => match crate::models::day::parse_date_key(&date) {
            Some(key) => show_day(&app, &key),
            None => fail(format!("Invalid date '{date}': expected YYYY-MM-DD")),
        },
        Commands::Add {
            title,
            date,
            category,
            priority,
            energy,
            context,
            duration,
            project,
            item,
        } => {
            let parameters = AddTaskParameters {
                title,
                date,
                category,
                priority,
                energy,
                context,
                duration,
                project,
                project_item: item,
            };
            match add_task(&app.store, parameters) {
                Ok(task) => println!("Added {}", task.title.bold()),
                Err(e) => fail(e),
            }
        }
        Commands::Done { position, date } => match toggle_task(&app.store, date, position) {
            Ok(task) if task.done => println!("Completed {}", task.title.bold()),
            Ok(task) => println!("Reopened {}", task.title.bold()),
            Err(e) => fail(e),
        },
        Commands::Rm { position, date } => match remove_task(&app.store, date, position) {
            Ok(task) => println!("Removed {}", task.title.bold()),
            Err(e) => fail(e),
        },
        Commands::Move {
            position,
            direction,
            date,
        } => match move_task(&app.store, date, position, direction) {
            Ok(task) => println!("Moved {}", task.title.bold()),
            Err(e) => fail(e),
        },
        Commands::Reorder { from, to, date } => {
            match reorder_tasks(&app.store, date, from, to) {
                Ok(task) => println!("Moved {} to position {}", task.title.bold(), to),
                Err(e) => fail(e),
            }
        }
        Commands::History => {
            ui::render_history(&app.store.load_days());
        }
        Commands::Streaks => {
            let days = app.store.load_days();
            let streaks = compute_streaks(&days);
            let badges = compute_badges(&streaks, &days);
            ui::render_streaks(&streaks, &badges);
        }
        Commands::Project { command } => match command {
            ProjectCommands::Add { title, description } => {
                match create_project(&app.store, CreateProjectParameters { title, description }) {
                    Ok(project) => println!("Created project {}", project.title.bold()),
                    Err(e) => fail(e),
                }
            }
            ProjectCommands::List => {
                ui::render_projects(&app.store.load_projects());
            }
            ProjectCommands::Rm { title } => match delete_project(&app.store, &title) {
                Ok(project) => println!("Deleted project {}", project.title.bold()),
                Err(e) => fail(e),
            },
            ProjectCommands::Item { command } => match command {
                ItemCommands::Add {
                    project,
                    kind,
                    title,
                    date,
                } => {
                    let parameters = AddItemParameters {
                        project,
                        kind,
                        title,
                        date,
                    };
                    match add_project_item(&app.store, parameters) {
                        Ok(item) => println!("Added {}", item.title.bold()),
                        Err(e) => fail(e),
                    }
                }
                ItemCommands::Rm { project, position } => {
                    match remove_project_item(&app.store, &project, position) {
                        Ok(item) => println!("Removed {}", item.title.bold()),
                        Err(e) => fail(e),
                    }
                }
            },
        },
        Commands::Export { path } => match export_to_path(&app.store, &path) {
            Ok(()) => println!("Exported to {}", path.display()),
            Err(e) => fail(e),
        },
        Commands::Import { path } => match import_from_path(&app.store, &path) {
            Ok(summary) => println!(
                "Imported {} days, {} tasks, {} projects",
                summary.days, summary.tasks, summary.projects
            ),
            Err(e) => fail(e),
        },
        Commands::Config {
            remote_url,
            api_key,
            device_label,
        } => {
            let mut settings = app.settings.clone();
            if let Some(url) = remote_url {
                settings.remote_url = Some(url);
            }
            if let Some(key) = api_key {
                settings.remote_api_key = Some(key);
            }
            if let Some(label) = device_label {
                settings.device_label = Some(label);
            }
            if !save_settings(&app.store, &settings) {
                fail("Could not persist settings to any storage tier");
            }
            println!("Configuration saved");
        }
        Commands::Login { user, no_remember } => {
            let remember = !no_remember && app.settings.remember_session;
            app.session.sign_in(UserId::new(user.clone()), remember);
            println!("Signed in as {}", user.bold());
            // Same order as the scheduler's sign-in trigger: pull first so
            // the remote row wins, then push to seed the row if it is new.
            if let Some(engine) = app.sync_engine() {
                let pulled = engine.pull().await;
                let pushed = engine.push().await;
                app.bus.publish(AppEvent::RefreshRequested);
                if pulled && pushed {
                    println!("Synced");
                } else {
                    println!("Sync deferred; it will retry on the next `prio sync now` or watch");
                }
            }
        }
        Commands::Logout => {
            app.session.sign_out();
            println!("Signed out");
        }
        Commands::Sync { command } => match command {
            SyncCommands::Now => {
                let Some(engine) = app.sync_engine() else {
                    no_remote();
                };
                if app.session.current_user().is_none() {
                    fail("Signed out. Sign in with `prio login <user>`");
                }
                let pulled = engine.pull().await;
                let pushed = engine.push().await;
                if pulled && pushed {
                    app.bus.publish(AppEvent::RefreshRequested);
                    println!("Synced");
                } else {
                    fail("Sync failed; will succeed on a later retry if the remote recovers");
                }
            }
            SyncCommands::Status => {
                let user = app.session.current_user();
                let info = last_sync_info(&app.store);
                ui::render_sync_status(user.as_ref().map(|u| u.as_str()), &info);
                if user.is_some() && !app.session.remembers() {
                    println!("  {}", "Session ends when this device restarts".dimmed());
                }
                if app.settings.remote_url.is_none() {
                    println!("  {}", "No remote configured".dimmed());
                }
            }
            SyncCommands::Watch => {
                let Some(engine) = app.sync_engine() else {
                    no_remote();
                };
                let scheduler = SyncScheduler::new(
                    Arc::clone(&engine),
                    Arc::clone(&app.bus),
                    Arc::clone(&app.session) as Arc<dyn Identity>,
                    None,
                    SchedulerConfig::from_settings(&app.settings),
                );
                scheduler.start().await;
                println!(
                    "Watching for changes (push every {}s, pull every {}s). Ctrl-C to stop.",
                    app.settings.push_interval_secs, app.settings.pull_interval_secs
                );
                let _ = tokio::signal::ctrl_c().await;
                // An edit still inside the debounce window would be lost with
                // the timers; push it before leaving.
                let flush = scheduler.push_pending();
                scheduler.shutdown();
                if flush {
                    engine.push().await;
                }
                println!("Stopped");
            }
        },
    }
}
