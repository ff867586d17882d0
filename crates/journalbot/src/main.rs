use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use journalbot_core::abbrev::AbbrevCache;
use journalbot_core::budget::Editor;
use journalbot_core::config::{BotConfig, load_config};
use journalbot_core::hatnote::{HatnoteOutcome, HatnoteReport};
use journalbot_core::mediawiki::{MediaWikiClient, MediaWikiClientConfig};
use journalbot_core::redirect::{RedirectCheck, RedirectTarget, TitleOutcome, TitleReport};
use journalbot_core::run::{RunReport, RunSettings, read_title_list, run_titles};
use journalbot_core::runtime::{
    PathOverrides, ResolutionContext, ResolvedPaths, init_layout, normalize_for_display,
    resolve_paths,
};
use tracing::{Level, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(
    name = "journalbot",
    version,
    about = "Maintain redirects and hatnotes for predatory-publisher journals"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    project_root: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved runtime diagnostics")]
    diagnostics: bool,
    #[arg(short, long, global = true, help = "Log at debug level")]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    project_root: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            project_root: cli.project_root.clone(),
            data_dir: cli.data_dir.clone(),
            config: cli.config.clone(),
            diagnostics: cli.diagnostics,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Create the .journalbot/ layout and a default config")]
    Init(InitArgs),
    #[command(about = "Create and fix redirects for every title in a list")]
    Redirects(RedirectsArgs),
    #[command(about = "Only add hatnotes to journals imitated by listed titles")]
    Hatnotes(HatnotesArgs),
    #[command(about = "Inspect and fill the ISO 4 abbreviation cache")]
    Abbrev(AbbrevArgs),
}

#[derive(Debug, Args)]
struct InitArgs {
    #[arg(long, help = "Overwrite an existing config file")]
    force: bool,
}

#[derive(Debug, Args)]
struct RedirectsArgs {
    #[arg(value_name = "INPUT", help = "Title list, one title per line")]
    input: Option<PathBuf>,
    #[arg(long, value_name = "TITLE", help = "Page every redirect points to")]
    target: Option<String>,
    #[arg(long, value_name = "NAME", help = "Category for plain redirects")]
    category: Option<String>,
    #[arg(long, help = "Report edits without saving")]
    simulate: bool,
    #[arg(long, help = "Also add hatnotes to imitated journals")]
    hatnotes: bool,
    #[arg(long, help = "Print the run report as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct HatnotesArgs {
    #[arg(value_name = "INPUT", help = "Title list, one title per line")]
    input: Option<PathBuf>,
    #[arg(long, value_name = "NAME", help = "Publisher named in the hatnote")]
    publisher: Option<String>,
    #[arg(long, help = "Report edits without saving")]
    simulate: bool,
    #[arg(long, help = "Print the run report as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct AbbrevArgs {
    #[command(subcommand)]
    command: AbbrevSubcommand,
}

#[derive(Debug, Subcommand)]
enum AbbrevSubcommand {
    #[command(about = "List recorded titles that still lack an abbreviation")]
    Pending,
    #[command(about = "Load title<TAB>scope<TAB>abbreviation lines")]
    Import { path: PathBuf },
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(if cli.verbose { Level::DEBUG } else { Level::INFO });
    let runtime = RuntimeOptions::from_cli(&cli);

    match cli.command {
        Some(Commands::Init(args)) => run_init(&runtime, args),
        Some(Commands::Redirects(args)) => run_redirects(&runtime, args),
        Some(Commands::Hatnotes(args)) => run_hatnotes(&runtime, args),
        Some(Commands::Abbrev(AbbrevArgs { command })) => match command {
            AbbrevSubcommand::Pending => run_abbrev_pending(&runtime),
            AbbrevSubcommand::Import { path } => run_abbrev_import(&runtime, path),
            AbbrevSubcommand::Stats => run_abbrev_stats(&runtime),
        },
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Progress logs go to stderr so stdout stays a clean report. `RUST_LOG` wins
/// over `level` when set.
fn init_tracing(level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .ok();
}

fn run_init(runtime: &RuntimeOptions, args: InitArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let report = init_layout(&paths, args.force)?;

    println!("Initialized journalbot runtime layout");
    println!("project_root: {}", normalize_for_display(&paths.project_root));
    println!("state_dir: {}", normalize_for_display(&paths.state_dir));
    println!("data_dir: {}", normalize_for_display(&paths.data_dir));
    println!("db_path: {}", normalize_for_display(&paths.db_path));
    println!("config_path: {}", normalize_for_display(&paths.config_path));
    println!("created_dirs: {}", report.created_dirs.len());
    println!("wrote_config: {}", report.wrote_config);
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn run_redirects(runtime: &RuntimeOptions, args: RedirectsArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let mut config = load_config(&paths.config_path)?;
    if args.simulate {
        config.bot.simulate = true;
    }

    let Some(target) = args.target.or_else(|| config.run.target.clone()) else {
        bail!("no redirect target: pass --target or set [run].target in the config");
    };
    let category = args
        .category
        .or_else(|| config.run.category.clone())
        .unwrap_or_default();
    let hatnotes = args.hatnotes || config.run.hatnotes;
    let settings = RunSettings {
        redirects: Some(RedirectTarget::new(target, category)),
        hatnote_publisher: hatnotes.then(|| config.hatnote_publisher().to_string()),
    };

    let input = run_input(&paths, &config, args.input)?;
    let report = execute_run(&paths, &config, &input, &settings)?;
    emit_report("redirects run", runtime, &paths, &input, &report, args.json)
}

fn run_hatnotes(runtime: &RuntimeOptions, args: HatnotesArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let mut config = load_config(&paths.config_path)?;
    if args.simulate {
        config.bot.simulate = true;
    }

    let publisher = args
        .publisher
        .unwrap_or_else(|| config.hatnote_publisher().to_string());
    let settings = RunSettings {
        redirects: None,
        hatnote_publisher: Some(publisher),
    };

    let input = run_input(&paths, &config, args.input)?;
    let report = execute_run(&paths, &config, &input, &settings)?;
    emit_report("hatnotes run", runtime, &paths, &input, &report, args.json)
}

fn run_input(paths: &ResolvedPaths, config: &BotConfig, flag: Option<PathBuf>) -> Result<PathBuf> {
    match flag.or_else(|| config.run.input.as_ref().map(PathBuf::from)) {
        Some(path) => Ok(paths.input_path(&path)),
        None => bail!("no title list: pass INPUT or set [run].input in the config"),
    }
}

fn execute_run(
    paths: &ResolvedPaths,
    config: &BotConfig,
    input: &Path,
    settings: &RunSettings,
) -> Result<RunReport> {
    let titles = read_title_list(input)?;
    let mut cache = AbbrevCache::open(&paths.db_path)?;
    let mut client = MediaWikiClient::new(MediaWikiClientConfig::from_config(config))?;
    let mut editor = Editor::from_config(config);

    match bot_credentials() {
        Some((username, password)) => {
            client
                .login(&username, &password)
                .with_context(|| format!("failed to log in as {username}"))?;
            info!("Logged in as {username}.");
        }
        None if editor.simulate() => {
            info!("No bot credentials; simulating anonymously.");
        }
        None => bail!("WIKI_BOT_USER and WIKI_BOT_PASS must be set unless simulating"),
    }

    run_titles(&titles, settings, &mut client, &mut cache, &mut editor)
}

fn bot_credentials() -> Option<(String, String)> {
    let username = env::var("WIKI_BOT_USER").ok()?;
    let password = env::var("WIKI_BOT_PASS").ok()?;
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return None;
    }
    Some((username.to_string(), password))
}

fn emit_report(
    heading: &str,
    runtime: &RuntimeOptions,
    paths: &ResolvedPaths,
    input: &Path,
    report: &RunReport,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{heading}");
    println!("project_root: {}", normalize_for_display(&paths.project_root));
    println!("input: {}", normalize_for_display(input));
    println!("simulate: {}", format_flag(report.simulate));
    println!("titles: {}", report.counts.titles);
    for title in &report.titles {
        print_title_report(title);
    }
    for hatnote in &report.hatnotes {
        print_hatnote_report(hatnote);
    }
    println!("counts.applied: {}", report.counts.applied);
    println!("counts.abandoned: {}", report.counts.abandoned);
    println!("counts.skipped: {}", report.counts.skipped);
    println!("counts.hatnotes_added: {}", report.counts.hatnotes_added);
    for usage in &report.budget {
        println!("budget.{}: {}/{}", usage.kind, usage.used, usage.limit);
    }
    println!("requests: {}", report.request_count);
    print_diagnostics(runtime, paths);
    Ok(())
}

fn print_title_report(report: &TitleReport) {
    match &report.outcome {
        TitleOutcome::Skipped { skip } => {
            println!("title: {} (skipped: {skip})", report.title);
        }
        TitleOutcome::Abandoned { conflicts } => {
            println!("title: {} (abandoned)", report.title);
            for conflict in conflicts {
                print_check(conflict);
                println!("    existing:");
                print_block(conflict.existing.as_deref().unwrap_or_default());
                println!("    expected:");
                print_block(&conflict.expected);
                println!("    diff:");
                print_block(&conflict.diff());
            }
        }
        TitleOutcome::Applied { checks } => {
            println!("title: {} (applied)", report.title);
            for check in checks {
                print_check(check);
            }
        }
    }
}

fn print_check(check: &RedirectCheck) {
    println!(
        "  redirect: {} (type={}, {})",
        check.title,
        check.kind,
        check.disposition.as_str()
    );
    for edit in &check.edits {
        println!(
            "    edit.{}: {} (saved: {})",
            edit.kind,
            edit.title,
            format_flag(edit.saved)
        );
    }
}

fn print_hatnote_report(report: &HatnoteReport) {
    let detail = match &report.outcome {
        HatnoteOutcome::NoDeceptiveSuffix => "no deceptive suffix".to_string(),
        HatnoteOutcome::NoLegitimatePage { candidate } => format!("no article at {candidate}"),
        HatnoteOutcome::LegitimatePageIsRedirect { page } => format!("{page} is a redirect"),
        HatnoteOutcome::AlreadyHatnoted { page } => format!("{page} already has a hatnote"),
        HatnoteOutcome::Added { page, saved } => {
            format!("added to {page} (saved: {})", format_flag(*saved))
        }
    };
    println!("hatnote: {} ({detail})", report.title);
}

fn print_block(text: &str) {
    for line in text.lines() {
        println!("      {line}");
    }
}

fn run_abbrev_pending(runtime: &RuntimeOptions) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let cache = AbbrevCache::open(&paths.db_path)?;
    let pending = cache.pending_titles()?;

    println!("abbrev pending");
    println!("db_path: {}", normalize_for_display(&paths.db_path));
    println!("pending.count: {}", pending.len());
    for item in &pending {
        println!("pending: {}\t{}", item.title, item.scope);
    }
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn run_abbrev_import(runtime: &RuntimeOptions, path: PathBuf) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let source = paths.input_path(&path);
    let mut cache = AbbrevCache::open(&paths.db_path)?;
    let report = cache.import_tsv(&source)?;

    println!("abbrev import");
    println!("source: {}", normalize_for_display(&source));
    println!("db_path: {}", normalize_for_display(&paths.db_path));
    println!("imported: {}", report.imported);
    println!("ignored_lines: {}", report.ignored_lines);
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn run_abbrev_stats(runtime: &RuntimeOptions) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let cache = AbbrevCache::open(&paths.db_path)?;
    let stats = cache.stats()?;

    println!("abbrev stats");
    println!("db_path: {}", normalize_for_display(&paths.db_path));
    println!("recorded_titles: {}", stats.recorded_titles);
    println!("abbreviations: {}", stats.abbreviations);
    println!("pending: {}", stats.pending);
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn print_diagnostics(runtime: &RuntimeOptions, paths: &ResolvedPaths) {
    if runtime.diagnostics {
        println!("\n[diagnostics]\n{}", paths.diagnostics());
    }
}

fn resolve_runtime_paths(runtime: &RuntimeOptions) -> Result<ResolvedPaths> {
    dotenvy::dotenv().ok();

    let context = ResolutionContext::from_process()?;
    let overrides = PathOverrides {
        project_root: runtime.project_root.clone(),
        data_dir: runtime.data_dir.clone(),
        config: runtime.config.clone(),
    };

    let initial = resolve_paths(&context, &overrides)?;
    let project_env = initial.project_root.join(".env");
    if project_env.exists() {
        let _ = dotenvy::from_path_override(&project_env);
    }

    resolve_paths(&context, &overrides)
}

fn format_flag(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
