mod alarm;
mod clock;
mod config;
mod display;
mod duration;
mod error;
mod logging;
mod notify;
mod parse;
mod render;
mod timer;

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::alarm::Scheduler;
use crate::clock::{Clock, SystemClock, Zone};
use crate::config::Config;
use crate::notify::DesktopNotifier;
use crate::parse::{Expression, ExpressionKind};
use crate::timer::{Timer, TimerOptions};

#[derive(Parser)]
#[command(name = "ttimer", about = "A terminal countdown timer", version)]
struct Cli {
    /// Minutes (5, 1.5), a duration (2h30m, 90s) or a clock time (130p, 9a, 930)
    #[arg(default_value = "1")]
    time: String,

    /// Timezone for clock times (e.g., America/Los_Angeles); remembered for later runs
    #[arg(short, long)]
    zone: Option<String>,

    /// Quit as soon as the countdown finishes
    #[arg(short = 'q', long)]
    auto_quit: bool,

    /// Show clock diagnostics under the countdown
    #[arg(long)]
    debug: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn resolve_zone(cli: &Cli, config: &mut Config) -> Zone {
    let name = cli.zone.as_deref().or(config.timezone.as_deref());
    let zone = match Zone::resolve(name) {
        Ok(zone) => zone,
        Err(e) => {
            eprintln!("{e}, using local time");
            warn!("{e}, using local time");
            return Zone::Local;
        }
    };

    if let Some(name) = cli.zone.as_deref() {
        if config.remember_timezone(name) {
            if let Err(e) = config.save() {
                warn!("failed to save timezone preference: {e}");
            }
        }
    }
    zone
}

fn fallback(text: &str, minutes: u64) -> Expression {
    eprintln!("{text:?} couldn't be parsed, starting {minutes}m timer");
    Expression {
        duration: Duration::from_secs(minutes.saturating_mul(60)),
        title: format!("{minutes}m Timer"),
        kind: ExpressionKind::Minutes,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = Config::load();
    let zone = resolve_zone(&cli, &mut config);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let expr = match parse::parse(&cli.time, zone, clock.now()) {
        Ok(expr) => expr,
        Err(e) => {
            warn!("{e}");
            fallback(e.text(), config.fallback_minutes)
        }
    };
    info!(title = %expr.title, duration = ?expr.duration, "parsed expression");

    let options = TimerOptions {
        auto_quit: cli.auto_quit || config.auto_quit,
        debug: cli.debug,
        zone: Some(zone),
    };
    let duration = expr.duration;
    let mut timer = Timer::new(expr, options, clock);
    timer.start(duration);

    let mut renderer = render::Renderer::setup().context("cannot start countdown display")?;
    let (tx, rx) = mpsc::unbounded_channel();
    render::spawn_input_reader(tx);

    let scheduler = Scheduler::new(Arc::new(DesktopNotifier));
    let outcome = display::run(&mut timer, &scheduler, &mut renderer, rx).await;

    if let Err(e) = renderer.teardown() {
        warn!("failed to restore terminal: {e}");
    }
    let exit = outcome?;
    info!(?exit, "countdown closed");
    Ok(())
}
