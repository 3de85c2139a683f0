use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Context, Result, eyre};
use std::io;
use std::path::PathBuf;
use tasklist::interactive;
use tasklist::screen::{ListScreen, ScreenEvent};
use tasklist::{Config, Store};
use tracing::Level;

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "Task List - a single-screen to-do list kept in a local store")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Directory holding the store (default: from config, then the user data dir)
    #[arg(short, long)]
    store_path: Option<PathBuf>,

    /// Path to the YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show all tasks
    List {
        /// Include ids and timestamps
        #[arg(short, long)]
        long: bool,
    },

    /// Add a task
    Add { title: String },

    /// Rename the task at ROW (1-based)
    Edit { row: usize, title: String },

    /// Delete the task at ROW (1-based)
    Delete { row: usize },

    /// Rebuild the SQLite cache from the journal
    Sync,

    /// Open the list screen (default)
    Interactive,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;

    let level = match cli.verbose {
        0 => config.log_level()?.unwrap_or(Level::WARN),
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let store_path = config.store_path(cli.store_path.as_deref());
    let store = Store::open(&store_path)
        .with_context(|| format!("Failed to open task store at {}", store_path.display()))?;

    let mut screen = ListScreen::new(store, config.reconcile);

    match cli.command.unwrap_or(Commands::Interactive) {
        Commands::List { long } => {
            if long {
                print_long(&screen);
            } else {
                interactive::print_rows(&screen, &mut io::stdout())?;
            }
        }
        Commands::Add { title } => {
            let event = interactive::add_task(&mut screen, title)?;
            finish(&screen, event)?;
        }
        Commands::Edit { row, title } => {
            let event = interactive::edit_task(&mut screen, row, title)?;
            finish(&screen, event)?;
        }
        Commands::Delete { row } => {
            let index = row.checked_sub(1).ok_or_else(|| eyre!("Rows are numbered from 1"))?;
            let event = screen.delete(index)?;
            finish(&screen, event)?;
        }
        Commands::Sync => {
            let mut store = screen.into_store();
            println!("Syncing database from journal...");
            store.sync()?;
            println!("Sync complete ({} tasks)", store.fetch_all().len());
        }
        Commands::Interactive => {
            let stdin = io::stdin();
            interactive::run(&mut screen, stdin.lock(), &mut io::stdout())?;
        }
    }

    Ok(())
}

fn finish(screen: &ListScreen, event: ScreenEvent) -> Result<()> {
    if event == ScreenEvent::Unchanged {
        eprintln!("{}", "No changes were saved.".yellow());
    }
    interactive::print_rows(screen, &mut io::stdout())
}

fn print_long(screen: &ListScreen) {
    println!("{}", interactive::SCREEN_TITLE.bold());
    for (i, task) in screen.rows().iter().enumerate() {
        println!(
            "{}. {}  {}",
            format!("{:>3}", i + 1).as_str().cyan(),
            task.title,
            task.id.as_str().dimmed()
        );
        println!(
            "     created {}  updated {}",
            fmt_time(task.created_local()),
            fmt_time(task.updated_local())
        );
    }
}

fn fmt_time(time: Option<DateTime<Local>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}
