mod api;
mod app;
mod cache;
mod config;
mod error;
mod models;
mod pipeline;
mod render;
mod ui;
mod utils;

use crate::api::StackExchangeClient;
use crate::app::{ once_snapshot, App };
use crate::cache::{ FileStore, KeyValueStore, MemoryStore };
use crate::config::Config;
use crate::models::TagSet;
use crate::pipeline::{ Context, Orchestrator };
use crate::render::render;
use crate::ui::{ render_plain, run_app };

use clap::Parser;
use crossterm::{
    execute,
    terminal::{ enable_raw_mode, disable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen },
};
use std::{ fs, io, sync::{ Arc, Mutex }, time::Duration };
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt, EnvFilter };
use tui::{ backend::CrosstermBackend, Terminal };

const PLAIN_WIDTH: usize = 60;

/// Shows the most recently active featured (bounty) question for a set of tags.
#[derive(Parser, Debug)]
#[command(name = "bounty-widget", long_about = None)]
struct Args {
    /// Tags to filter by. Repeat the flag or separate with `;`.
    #[arg(short, long, value_delimiter = ';')]
    tags: Vec<String>,

    /// Run one refresh cycle, print the widget as text and exit.
    #[arg(long)]
    once: bool,

    /// With --once, print the cached snapshot instead of fetching.
    #[arg(long, requires = "once")]
    cached: bool,

    /// With --cached, render as a preview (no avatar download).
    #[arg(long, requires = "cached")]
    preview: bool,

    /// Keep the cache in memory instead of on disk.
    #[arg(long)]
    ephemeral: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::from_env()?;
    init_tracing(&args, &config)?;

    let tags = if args.tags.is_empty() {
        config.tags.clone()
    } else {
        TagSet::new(args.tags.iter().map(|tag| tag.trim()).filter(|tag| !tag.is_empty()))
    };

    tracing::info!(
        tags = %tags.label(),
        site = %config.site,
        api_base = %config.api_base,
        cache_dir = %config.cache_dir.display(),
        ephemeral = args.ephemeral,
        "widget configuration loaded"
    );

    let client = StackExchangeClient::new(&config.api_base, &config.site)?;
    let store: Box<dyn KeyValueStore> = if args.ephemeral {
        Box::new(MemoryStore::default())
    } else {
        Box::new(FileStore::new(&config.cache_dir))
    };
    let orchestrator = Orchestrator::new(client, store);

    if args.once {
        let cached = args.cached.then_some(Context { is_preview: args.preview });
        let snapshot = once_snapshot(&orchestrator, &tags, cached)?;
        println!("{}", render_plain(&render(&snapshot), PLAIN_WIDTH));
        return Ok(());
    }

    let app = App::new(tags, orchestrator.placeholder());
    let orchestrator = Arc::new(orchestrator);

    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    let stdout = io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let tick_rate = Duration::from_millis(200);
    let res = run_app(&mut terminal, app, orchestrator, tick_rate);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    if let Err(err) = res {
        eprintln!("{:?}", err);
    }

    Ok(())
}

/// Logs go to stderr for `--once` and to a file next to the cache otherwise,
/// since the TUI owns the terminal.
fn init_tracing(args: &Args, config: &Config) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    if args.once {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    } else {
        fs::create_dir_all(&config.cache_dir)?;
        let log_file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(config.cache_dir.join("bounty-widget.log"))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(Mutex::new(log_file)))
            .init();
    }
    Ok(())
}
