//! Strata host binary.
//!
//! Wires one state tree, one dispatcher, and the demo widget stores together,
//! then loads `--pages` simulated pages with at most `--concurrency` fetches in
//! flight. Every finished page dispatches its widgets; the frame loop ticks the
//! [`FrameClock`] so listeners see one change batch per frame.
//!
//! ```text
//! fetch page ──► Semaphore ──► dispatch(WIDGET_LIST) ──► WidgetStore ──► StateTree
//!                                                                         │
//! frame loop ──► FrameClock::tick ──► change listeners ◄── one batch ────┘
//! ```

mod widgets;

use anyhow::{Context, Result, bail};
use futures_util::future::join_all;
use std::{
    env,
    fs::{self, OpenOptions},
    io,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::time::{self, MissedTickBehavior};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use strata_config::{ConfigError, Settings, StrataConfig, TickMode};
use strata_pool::{Semaphore, SemaphoreSize};
use strata_state::{FrameClock, StateTree};
use strata_store::{Dispatcher, Store, register_store};

use crate::widgets::{
    AppAction, ProgressAction, ProgressStore, Widget, WidgetAction, WidgetStore,
};

const USAGE: &str = "usage: strata [--pages N] [--concurrency N]";
const DEFAULT_PAGES: usize = 8;
const PAGE_SIZE: usize = 5;

fn init_tracing(filter: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_strata_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No writable log file: the summary goes to stdout, so logs take stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_strata_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in strata_log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn strata_log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.strata/logs/strata.log
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".strata").join("logs").join("strata.log"));
    }

    // Fallback: ./.strata/logs/strata.log
    candidates.push(PathBuf::from(".strata").join("logs").join("strata.log"));

    candidates
}

/// The resolved filter, if settings resolved at all.
fn log_filter(settings: &Result<Settings, ConfigError>) -> Option<&str> {
    settings
        .as_ref()
        .ok()
        .and_then(|settings| settings.log_filter.as_deref())
}

#[derive(Debug, PartialEq)]
struct Args {
    pages: usize,
    concurrency: Option<SemaphoreSize>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args {
        pages: DEFAULT_PAGES,
        concurrency: None,
    };
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        let mut value = || {
            inline
                .clone()
                .or_else(|| args.next())
                .with_context(|| format!("{flag} needs a value\n{USAGE}"))
        };
        match flag.as_str() {
            "--pages" => {
                let raw = value()?;
                parsed.pages = raw
                    .parse()
                    .with_context(|| format!("--pages: not a page count: {raw}"))?;
            }
            "--concurrency" => {
                let raw = value()?;
                parsed.concurrency = Some(raw.parse().context("--concurrency")?);
            }
            "-h" | "--help" => bail!("{USAGE}"),
            other => bail!("unknown argument {other:?}\n{USAGE}"),
        }
    }
    Ok(parsed)
}

/// Stand-in for an HTTP page fetch: later pages answer sooner, so pages
/// complete out of order.
async fn fetch_page(page: usize, pages: usize) -> Vec<Widget> {
    let delay = 2 * (pages + 1 - page) as u64;
    time::sleep(Duration::from_millis(delay)).await;
    (0..PAGE_SIZE)
        .map(|idx| {
            let n = (page - 1) * PAGE_SIZE + idx + 1;
            Widget {
                id: format!("w{n}"),
                name: format!("widget {n}"),
                page,
            }
        })
        .collect()
}

struct Summary {
    widgets: usize,
    batches: usize,
    writes: u64,
    frames: u64,
}

async fn run(settings: &Settings, args: &Args) -> Result<Summary> {
    let clock = Arc::new(FrameClock::new());
    let tree = match settings.tick_mode {
        TickMode::Frame => StateTree::with_frame_clock(settings.root_key.as_str(), &clock),
        TickMode::Immediate => StateTree::immediate(settings.root_key.as_str()),
    };
    let batches = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&batches);
    tree.subscribe(move || {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    let dispatcher = Dispatcher::<AppAction>::new();
    let widgets = WidgetStore::new(&tree);
    let progress = ProgressStore::new(&tree);
    register_store(&widgets, &dispatcher)?;
    register_store(&progress, &dispatcher)?;

    let concurrency = args.concurrency.unwrap_or(settings.concurrency);
    let semaphore = Semaphore::new(concurrency);
    tracing::info!(
        pages = args.pages,
        concurrency = concurrency.get(),
        scheduler = settings.tick_mode.as_str(),
        "loading widgets"
    );

    dispatcher.dispatch(&AppAction::Progress(ProgressAction::Started {
        total: args.pages,
    }))?;

    let dispatcher = &dispatcher;
    let loads = join_all((1..=args.pages).map(|page| {
        semaphore.with_permit(move |token| async move {
            tracing::debug!(page, token = %token, "fetching page");
            let page_widgets = fetch_page(page, args.pages).await;
            dispatcher.dispatch(&AppAction::Widgets(WidgetAction::List(page_widgets)))?;
            dispatcher.dispatch(&AppAction::Progress(ProgressAction::PageLoaded))
        })
    }));
    tokio::pin!(loads);

    let mut frames = time::interval(settings.frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let results = loop {
        tokio::select! {
            results = &mut loads => break results,
            _ = frames.tick() => {
                clock.tick();
            }
        }
    };
    for result in results {
        result??;
    }

    tree.flush_now();
    let loaded = progress.current()?;
    tracing::info!(loaded = loaded.loaded, total = loaded.total, "load finished");

    Ok(Summary {
        widgets: widgets.cache().len(),
        batches: batches.load(Ordering::Relaxed),
        writes: tree.revision(),
        frames: clock.frames(),
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = parse_args(env::args().skip(1))?;

    let (config, config_error) = match StrataConfig::load() {
        Ok(config) => (config, None),
        Err(err) => (None, Some(err)),
    };
    let settings = Settings::resolve(config.as_ref());
    init_tracing(log_filter(&settings));
    if let Some(err) = config_error {
        tracing::warn!("Ignoring config: {err}");
    }

    let settings = settings?;
    let summary = run(&settings, &args).await?;

    println!(
        "cached {} widgets from {} pages: {} writes, {} change batches over {} frames",
        summary.widgets, args.pages, summary.writes, summary.batches, summary.frames
    );
    Ok(())
}
