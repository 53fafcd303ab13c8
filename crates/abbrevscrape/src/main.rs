use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use abbrevscrape_core::ScrapeError;
use abbrevscrape_core::config::{RequestOverrides, load_config};
use abbrevscrape_core::confirm::{Confirmation, parse_confirmation};
use abbrevscrape_core::fetch::{
    HttpListingSource, HttpSourceConfig, ListingRequest, validate_request,
};
use abbrevscrape_core::filter::is_valid_abbreviation;
use abbrevscrape_core::pipeline::{self, UpdateOutcome, UpdateReport};
use abbrevscrape_core::runtime::{
    PathOverrides, ResolutionContext, ResolvedPaths, init_layout, inspect_runtime,
    normalize_for_display, resolve_paths,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: u8 = 1;
const EXIT_USAGE: u8 = 2;
const EXIT_INVALID_ARGUMENT: u8 = 64;
const EXIT_DATA_ERROR: u8 = 65;

#[derive(Debug, Parser)]
#[command(
    name = "abbrevscrape",
    version,
    about = "Build abbreviations.txt from the Wiktionary abbreviation category plus local add/remove lists"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    project_root: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved paths and scrape settings")]
    diagnostics: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    project_root: Option<PathBuf>,
    config: Option<PathBuf>,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            project_root: cli.project_root.clone(),
            config: cli.config.clone(),
            diagnostics: cli.diagnostics,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Scrape the listing and rewrite wiktionary.txt and abbreviations.txt")]
    Update(UpdateArgs),
    #[command(about = "Re-apply add.txt/remove.txt to the saved wiktionary.txt without scraping")]
    Rebuild(ReportArgs),
    #[command(about = "Report whether each candidate is a valid abbreviation")]
    Check(CheckArgs),
    #[command(about = "Write a default config and empty add/remove lists")]
    Init(InitArgs),
    Status,
}

#[derive(Debug, Args, Default)]
struct UpdateArgs {
    #[arg(short = 'y', long, help = "Skip the confirmation prompt")]
    yes: bool,
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    max_pages: Option<i64>,
    #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
    delay: Option<f64>,
    #[arg(long, value_name = "URL")]
    start_url: Option<String>,
    #[arg(long, value_name = "URL")]
    site_root: Option<String>,
    #[arg(long, help = "Print the report as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct ReportArgs {
    #[arg(long, help = "Print the report as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[arg(required = true)]
    candidates: Vec<String>,
}

#[derive(Debug, Args)]
struct InitArgs {
    #[arg(long, help = "Overwrite an existing abbrevscrape.toml")]
    force: bool,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let runtime = RuntimeOptions::from_cli(&cli);

    let result = match cli.command {
        Some(Commands::Update(args)) => run_update(&runtime, args),
        Some(Commands::Rebuild(args)) => run_rebuild(&runtime, args).map(|()| ExitCode::SUCCESS),
        Some(Commands::Check(args)) => {
            run_check(&args);
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Init(args)) => run_init(&runtime, args).map(|()| ExitCode::SUCCESS),
        Some(Commands::Status) => run_status(&runtime).map(|()| ExitCode::SUCCESS),
        None => run_update(&runtime, UpdateArgs::default()),
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(exit_status_for(&error))
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn exit_status_for(error: &anyhow::Error) -> u8 {
    let scrape_error = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ScrapeError>());
    match scrape_error {
        Some(ScrapeError::EmptyResult) => EXIT_DATA_ERROR,
        Some(ScrapeError::InvalidArgument(_)) => EXIT_INVALID_ARGUMENT,
        _ => EXIT_FAILURE,
    }
}

fn run_update(runtime: &RuntimeOptions, args: UpdateArgs) -> Result<ExitCode> {
    let paths = resolve_runtime_paths(runtime)?;
    let config = load_config(&paths.config_path)?;
    let request = config.listing_request(&RequestOverrides {
        start_url: args.start_url,
        site_root: args.site_root,
        max_pages: args.max_pages,
        delay_seconds: args.delay,
    })?;
    let http = config.http_source()?;
    if runtime.diagnostics {
        print_diagnostics(&paths, &request, &http);
    }
    validate_request(&request)?;

    let confirmed = if args.yes {
        true
    } else {
        let mut answer = io::stdin().lock();
        match prompt_confirmation(&mut answer, &mut io::stderr())? {
            Confirmation::Proceed => true,
            Confirmation::Decline => false,
            Confirmation::Invalid => {
                eprintln!("Invalid input. Quitting.");
                return Ok(ExitCode::from(EXIT_USAGE));
            }
        }
    };

    let mut source = HttpListingSource::new(http);
    let outcome = pipeline::run_update(&paths, &request, &mut source, confirmed)?;
    debug!(requests = source.request_count(), "listing source closed");
    match outcome {
        UpdateOutcome::Declined => eprintln!("Update cancelled; no files were changed."),
        UpdateOutcome::Updated(report) => print_report("update", &report, args.json)?,
    }
    Ok(ExitCode::SUCCESS)
}

// Banner and question go to `prompt`; stdout carries only the report.
fn prompt_confirmation<R, W>(input: &mut R, prompt: &mut W) -> Result<Confirmation>
where
    R: BufRead,
    W: Write,
{
    writeln!(prompt, "Welcome to abbrevscrape!")?;
    writeln!(
        prompt,
        "This will update abbreviations.txt with any new abbreviations from the listing site."
    )?;
    writeln!(prompt, "***IMPORTANT!!***")?;
    writeln!(
        prompt,
        "Before scraping any website, verify that it's legal to do so by reading its terms of service and/or checking its robots.txt file."
    )?;
    write!(prompt, "Would you like to continue (Y/N)? ")?;
    prompt.flush().context("failed to flush confirmation prompt")?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("failed to read confirmation from stdin")?;
    Ok(parse_confirmation(&answer))
}

fn run_rebuild(runtime: &RuntimeOptions, args: ReportArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    if runtime.diagnostics {
        println!("[diagnostics]\n{}\n", paths.diagnostics());
    }
    let report = pipeline::rebuild_from_snapshot(&paths)?;
    print_report("rebuild", &report, args.json)
}

fn run_check(args: &CheckArgs) {
    for candidate in &args.candidates {
        let verdict = if is_valid_abbreviation(candidate) {
            "valid"
        } else {
            "invalid"
        };
        println!("{verdict}\t{candidate}");
    }
}

fn run_init(runtime: &RuntimeOptions, args: InitArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let report = init_layout(&paths, args.force)?;

    println!("Initialized abbrevscrape project");
    println!("project_root: {}", normalize_for_display(&paths.project_root));
    println!("config_path: {}", normalize_for_display(&paths.config_path));
    println!("wrote_config: {}", format_flag(report.wrote_config));
    if report.created_lists.is_empty() {
        println!("created_lists: <none>");
    } else {
        for list in &report.created_lists {
            println!("created_list: {}", normalize_for_display(list));
        }
    }
    if runtime.diagnostics {
        println!("\n[diagnostics]\n{}", paths.diagnostics());
    }
    Ok(())
}

fn run_status(runtime: &RuntimeOptions) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let status = inspect_runtime(&paths)?;

    println!("project status");
    println!("project_root: {}", normalize_for_display(&paths.project_root));
    println!("config_exists: {}", format_flag(status.config_exists));
    print_count("add_list", &paths.add_path, status.add_entries);
    print_count("remove_list", &paths.remove_path, status.remove_entries);
    print_count("snapshot", &paths.snapshot_path, status.snapshot_entries);
    print_count("output", &paths.output_path, status.output_entries);
    if !status.warnings.is_empty() {
        println!("warnings:");
        for warning in &status.warnings {
            println!("  - {warning}");
        }
    }
    if runtime.diagnostics {
        println!("\n[diagnostics]\n{}", paths.diagnostics());
    }
    Ok(())
}

fn print_report(label: &str, report: &UpdateReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!("{label} complete");
    println!("pages_fetched: {}", report.pages_fetched);
    println!("raw_candidates: {}", report.raw_candidates);
    println!("scraped_abbreviations: {}", report.scraped_abbreviations);
    println!("add_entries: {}", report.add_entries);
    println!("remove_entries: {}", report.remove_entries);
    println!("final_entries: {}", report.final_entries);
    println!("snapshot: {}", normalize_for_display(&report.snapshot_path));
    println!("output: {}", normalize_for_display(&report.output_path));
    Ok(())
}

fn print_count(label: &str, path: &Path, entries: Option<usize>) {
    match entries {
        Some(count) => println!("{label}: {} ({count} entries)", normalize_for_display(path)),
        None => println!("{label}: {} (missing)", normalize_for_display(path)),
    }
}

fn print_diagnostics(paths: &ResolvedPaths, request: &ListingRequest, http: &HttpSourceConfig) {
    println!("[diagnostics]\n{}", paths.diagnostics());
    println!("start_url={}", request.start_url);
    println!("site_root={}", request.site_root);
    println!("max_pages={}", request.max_pages);
    println!("delay_seconds={}", request.delay_seconds);
    println!("container_id={}", request.markers.container_id);
    println!("next_label={}", request.markers.next_label);
    println!("user_agent={}", http.user_agent);
    println!("timeout_ms={}\n", http.timeout_ms);
}

fn resolve_runtime_paths(runtime: &RuntimeOptions) -> Result<ResolvedPaths> {
    let context = ResolutionContext::from_process()?;
    let overrides = PathOverrides {
        project_root: runtime.project_root.clone(),
        config: runtime.config.clone(),
    };

    let initial = resolve_paths(&context, &overrides)?;
    let project_env = initial.project_root.join(".env");
    if project_env.exists() {
        let _ = dotenvy::from_path_override(&project_env);
    }

    let paths = resolve_paths(&context, &overrides)?;
    debug!(
        project_root = %paths.project_root.display(),
        root_source = paths.root_source.as_str(),
        config = %paths.config_path.display(),
        "resolved project paths"
    );
    Ok(paths)
}

fn format_flag(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
