//! CLI binary for vandydine.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Datelike, Local, NaiveDateTime, TimeDelta, Utc, Weekday};
use clap::{Parser, Subcommand};
use netnutrition::{CatalogSource, HoursBlock, NetNutritionSource};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vandydine::classifier::{normalize_token, parse_day};
use vandydine::model::HoursStatus;
use vandydine::registry::Operation;
use vandydine::service::HoursLine;
use vandydine::{
    AliasRegistry, Classifier, CycleOutcome, DiningConfig, DiningError, DiningService,
    JsonSnapshotStore, MealSlot, RefreshPolicy, RefreshScheduler, SnapshotStore,
};

/// A persisted snapshot older than this is reported as stale.
const STALE_AFTER_HOURS: i64 = 36;

/// vandydine: campus dining menus and hours from a daily cache.
#[derive(Parser)]
#[command(name = "vandydine", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Start the daily refresh and answer queries read from stdin.
    Run,

    /// Answer one query, e.g. `query kissam lunch tomorrow` or `query rand hours`.
    Query {
        /// Facility, meal and day tokens, or a shortcut command and its scope.
        #[arg(required = true, num_args = 1..)]
        tokens: Vec<String>,
    },

    /// Run a single refresh cycle and exit.
    Refresh,

    /// Print the effective configuration as TOML.
    Config,
}

type Scheduler = RefreshScheduler<Arc<NetNutritionSource>, JsonSnapshotStore>;

/// Everything a query needs besides the snapshot.
struct App {
    config: DiningConfig,
    classifier: Classifier,
    registry: AliasRegistry,
    source: Arc<NetNutritionSource>,
    units: HashMap<String, String>,
}

impl App {
    fn new(config: DiningConfig) -> anyhow::Result<Self> {
        let classifier = Classifier::from_config(&config);
        let registry = AliasRegistry::from_facilities(&config.facilities)?;
        let source = Arc::new(NetNutritionSource::new(config.source.clone())?);
        let units = config
            .facilities
            .iter()
            .map(|f| (f.id.clone(), f.unit.clone()))
            .collect();
        Ok(Self {
            config,
            classifier,
            registry,
            source,
            units,
        })
    }

    fn store(&self) -> JsonSnapshotStore {
        JsonSnapshotStore::new(self.config.storage.snapshot_path())
    }

    fn scheduler(&self) -> anyhow::Result<Scheduler> {
        let policy = RefreshPolicy::from_config(&self.config.refresh)?;
        Ok(RefreshScheduler::new(
            Arc::clone(&self.source),
            self.store(),
            self.config.facilities.clone(),
            policy,
        ))
    }

    /// Scheduler for a single cycle: gives up once retries run out and
    /// stops on Ctrl+C.
    fn one_shot_scheduler(&self) -> anyhow::Result<Scheduler> {
        let mut policy = RefreshPolicy::from_config(&self.config.refresh)?;
        policy.retry_until_data = false;
        let scheduler = RefreshScheduler::new(
            Arc::clone(&self.source),
            self.store(),
            self.config.facilities.clone(),
            policy,
        );

        let cancel = scheduler.cancel_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received Ctrl+C, shutting down...");
                cancel.cancel();
            }
        });
        Ok(scheduler)
    }

    fn unit<'a>(&'a self, facility: &'a str) -> &'a str {
        self.units.get(facility).map_or(facility, String::as_str)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vandydine=info,netnutrition=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(App::new(config)?).await,
        Command::Query { tokens } => query(App::new(config)?, &tokens).await,
        Command::Refresh => refresh(App::new(config)?).await,
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<DiningConfig> {
    let config = match path {
        Some(path) => DiningConfig::from_file(path)
            .with_context(|| format!("cannot load {}", path.display()))?,
        None => {
            let default = DiningConfig::default_config_path();
            if default.exists() {
                DiningConfig::from_file(&default)
                    .with_context(|| format!("cannot load {}", default.display()))?
            } else {
                DiningConfig::default()
            }
        }
    };
    config.validate()?;
    Ok(config)
}

async fn run(app: App) -> anyhow::Result<()> {
    println!("vandydine v{}", env!("CARGO_PKG_VERSION"));

    let scheduler = app.scheduler()?;

    // Serve the persisted snapshot until the first refresh lands.
    let service = match app.store().load()? {
        Some(persisted) => {
            info!(fetched_at = %persisted.fetched_at, "serving persisted snapshot");
            DiningService::from_snapshot(persisted)
        }
        None => scheduler.service(),
    };

    serve(&app, &scheduler, service).await;
    Ok(())
}

/// Answer stdin lines until EOF or Ctrl+C. Switches to the live snapshot
/// once the scheduler publishes one.
async fn serve(app: &App, scheduler: &Scheduler, initial: DiningService) {
    let cancel = scheduler.cancel_token();
    let handle = scheduler.spawn();
    let mut published = scheduler.subscribe();
    let mut service = initial;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Enter a query (e.g. \"kissam lunch tomorrow\"). Ctrl+D or Ctrl+C to quit.");
    let shortcuts = app.registry.commands();
    if !shortcuts.is_empty() {
        println!("Shortcuts (add `menu` or `hours`): {}", shortcuts.join(", "));
    }
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C, shutting down...");
                break;
            }
            changed = published.changed() => {
                if changed.is_err() {
                    break;
                }
                service = scheduler.service();
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let tokens: Vec<String> =
                            line.split_whitespace().map(str::to_owned).collect();
                        if tokens.is_empty() {
                            continue;
                        }
                        if let Err(e) = answer_tokens(app, &service, &tokens).await {
                            println!("{e}");
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "cannot read stdin");
                        break;
                    }
                }
            }
        }
    }

    cancel.cancel();
    if let Err(e) = handle.await {
        warn!(error = %e, "refresh task ended abnormally");
    }
}

async fn query(app: App, tokens: &[String]) -> anyhow::Result<()> {
    let service = match app.store().load()? {
        Some(snapshot) if !snapshot.is_empty() => DiningService::from_snapshot(snapshot),
        _ => {
            info!("no persisted snapshot; refreshing once");
            let scheduler = app.one_shot_scheduler()?;
            match scheduler.trigger().await {
                CycleOutcome::Published { .. } | CycleOutcome::FallbackRestored { .. } => {}
                outcome => anyhow::bail!("no dining data available: {}", outcome_text(&outcome)),
            }
            scheduler.service()
        }
    };

    if service.is_stale(Utc::now(), TimeDelta::hours(STALE_AFTER_HOURS)) {
        warn!(
            age_hours = service.snapshot_age(Utc::now()).num_hours(),
            "snapshot is stale; run `vandydine refresh`"
        );
    }

    answer_tokens(&app, &service, tokens).await?;
    Ok(())
}

async fn refresh(app: App) -> anyhow::Result<()> {
    let scheduler = app.one_shot_scheduler()?;
    let outcome = scheduler.trigger().await;
    println!("{}", outcome_text(&outcome));
    if let CycleOutcome::Failed { reason, .. } = outcome {
        anyhow::bail!(reason);
    }
    Ok(())
}

fn outcome_text(outcome: &CycleOutcome) -> String {
    match outcome {
        CycleOutcome::Published {
            facilities,
            retries,
        } => format!("Published {facilities} facilities after {retries} retries."),
        CycleOutcome::FallbackRestored { fetched_at } => {
            format!("Refresh failed; restored snapshot from {fetched_at}.")
        }
        CycleOutcome::KeptCurrent { fetched_at } => {
            format!("Refresh failed; kept snapshot from {fetched_at}.")
        }
        CycleOutcome::Exhausted { attempts } => {
            format!("Refresh failed after {attempts} attempts and no snapshot is saved.")
        }
        CycleOutcome::Failed { reason, .. } => format!("Refresh failed: {reason}"),
        CycleOutcome::AlreadyRunning => "A refresh is already running.".into(),
        CycleOutcome::Cancelled => "Refresh cancelled.".into(),
    }
}

/// Expand a shortcut command if present, then classify and print.
async fn answer_tokens(
    app: &App,
    service: &DiningService,
    tokens: &[String],
) -> Result<(), DiningError> {
    let now = Local::now().naive_local();
    let today = now.weekday();

    let Some((command, args)) = tokens.split_first() else {
        return Ok(());
    };

    // A shortcut that doubles as a facility name still works as a plain query.
    let expansion = match app.registry.expand(command, args) {
        Err(DiningError::MissingScope { .. }) if app.classifier.facility_id(command).is_some() => {
            None
        }
        other => other?,
    };

    match expansion {
        Some(expansion) if expansion.operation == Operation::Hours => {
            print_hours(app, service, &expansion.facility, &expansion.tokens[1..], today).await
        }
        Some(expansion) => print_menus(app, service, &expansion.tokens, now),
        None => print_menus(app, service, tokens, now),
    }
}

fn print_menus(
    app: &App,
    service: &DiningService,
    tokens: &[String],
    now: NaiveDateTime,
) -> Result<(), DiningError> {
    let selection = app.classifier.classify(tokens, now.weekday())?;
    for answer in service.answer(&selection, now) {
        match answer.result {
            Ok(slot) => print_slot(app, &slot),
            Err(e) => println!("{e}\n"),
        }
    }
    Ok(())
}

fn print_slot(app: &App, slot: &MealSlot) {
    println!(
        "{} - {} ({}) - {}",
        app.unit(&slot.facility),
        slot.name,
        slot.category().tag,
        day_name(slot.day),
    );
    println!("  {}", hours_text(&hours_line(slot)));
    match slot.item_count() {
        0 => println!("  No items published yet."),
        n => println!("  {n} items"),
    }
    for (station, items) in &slot.items {
        println!("  {station}: {}", items.join(", "));
    }
    println!();
}

/// Hours for `facility` on each requested day (today by default).
///
/// Hours-only facilities are not cached, so their hours are fetched live.
async fn print_hours(
    app: &App,
    service: &DiningService,
    facility: &str,
    args: &[String],
    today: Weekday,
) -> Result<(), DiningError> {
    let mut days = Vec::new();
    for arg in args {
        match parse_day(&normalize_token(arg), today) {
            Some(day) if !days.contains(&day) => days.push(day),
            Some(_) => {}
            None => {
                return Err(DiningError::UnrecognizedArgument {
                    token: arg.clone(),
                });
            }
        }
    }
    if days.is_empty() {
        days.push(today);
    }

    let unit = app.unit(facility);
    let menu_facility = app
        .config
        .facilities
        .iter()
        .any(|f| f.id == facility && f.menu);

    if menu_facility {
        for day in days {
            println!("{unit} - {}", day_name(day));
            for line in service.facility_hours(facility, day)? {
                println!("  {}: {}", line.name, hours_text(&line));
            }
            println!();
        }
        return Ok(());
    }

    let hours = app
        .source
        .fetch_hours(unit)
        .await
        .map_err(|e| DiningError::from_source(facility, e))?;
    for day in days {
        println!("{unit} - {}", day_name(day));
        let blocks = hours.blocks_for(day);
        if blocks.is_empty() {
            println!("  Hours not found");
        }
        for block in blocks {
            match block {
                HoursBlock::Open { opens, closes } => {
                    println!("  {} - {}", opens.format("%-I:%M %p"), closes.format("%-I:%M %p"));
                }
                HoursBlock::Closed => println!("  Closed"),
            }
        }
        println!();
    }
    Ok(())
}

fn hours_line(slot: &MealSlot) -> HoursLine {
    HoursLine {
        kind: slot.kind.clone(),
        name: slot.name.clone(),
        status: slot.hours_status,
        opens_at: slot.opens_at,
        closes_at: slot.closes_at,
        crosses_midnight: slot.crosses_midnight,
    }
}

fn hours_text(line: &HoursLine) -> String {
    match line.status {
        HoursStatus::Available => format!(
            "{} - {}{}",
            line.opens_at.format("%-I:%M %p"),
            line.closes_at.format("%-I:%M %p"),
            if line.crosses_midnight { " (next day)" } else { "" },
        ),
        HoursStatus::Closed => "Closed".into(),
        HoursStatus::NotFound => "Hours not found".into(),
    }
}

fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
