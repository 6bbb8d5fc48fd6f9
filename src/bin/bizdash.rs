use std::fs;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use bizdash::config::{ConfigLoader, ResolvedConfig};
use bizdash::connectivity::{HttpProbe, SharedConnectivity};
use bizdash::credentials;
use bizdash::domain::DatasetName;
use bizdash::error::DashError;
use bizdash::output::{
    FailedRefresh, JsonOutput, LoginResult, OutputMode, RefreshResult, StatusLines, SummaryResult,
};
use bizdash::report::{financial_statement_document, table_document};
use bizdash::sheets::SheetsHttpClient;
use bizdash::stats::summarize;
use bizdash::store::FileCache;
use bizdash::sync::{SyncManager, SyncSink};

type Dashboard = SyncManager<FileCache, SheetsHttpClient, SharedConnectivity>;

const STATEMENT_DATASETS: [&str; 4] = ["income", "expenses", "assets", "liabilities"];

#[derive(Parser)]
#[command(name = "bizdash")]
#[command(about = "Offline-first business metrics: sync spreadsheet datasets, summarize, export reports")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Load cached datasets and refresh them when online")]
    Sync(SyncArgs),
    #[command(about = "Refresh datasets from the network now")]
    Refresh(RefreshArgs),
    #[command(about = "Lowest, average and highest value of a dataset")]
    Summary(DatasetArgs),
    #[command(about = "Export one dataset as an HTML table")]
    Report(ReportArgs),
    #[command(about = "Export income, expenses, assets and liabilities with net income")]
    Statement(OutputArgs),
    #[command(about = "Check an email and password against the credential sheet")]
    Login(LoginArgs),
}

#[derive(Args)]
struct SyncArgs {
    #[arg(long)]
    watch: bool,
}

#[derive(Args)]
struct RefreshArgs {
    names: Vec<String>,
}

#[derive(Args)]
struct DatasetArgs {
    name: String,
}

#[derive(Args)]
struct ReportArgs {
    name: String,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    output: Option<String>,
}

#[derive(Args)]
struct OutputArgs {
    #[arg(long)]
    output: Option<String>,
}

#[derive(Args)]
struct LoginArgs {
    #[arg(long)]
    email: String,

    #[arg(long)]
    password: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(dash) = report.downcast_ref::<DashError>() {
            return ExitCode::from(map_exit_code(dash));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &DashError) -> u8 {
    match error {
        DashError::DatasetUnavailable(_)
        | DashError::UnknownDataset(_)
        | DashError::MissingConfig => 2,
        DashError::NoConnectivity => 4,
        error if error.is_network() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    runtime.block_on(run_command(cli.command, config, output_mode))
}

async fn run_command(
    command: Commands,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match command {
        Commands::Sync(args) => run_sync(args, config, output_mode).await,
        Commands::Refresh(args) => run_refresh(args, config, output_mode).await,
        Commands::Summary(args) => run_summary(args, config, output_mode).await,
        Commands::Report(args) => run_report(args, config, output_mode).await,
        Commands::Statement(args) => run_statement(args, config, output_mode).await,
        Commands::Login(args) => run_login(args, config, output_mode).await,
    }
}

struct Opened {
    dashboard: Dashboard,
    connectivity: SharedConnectivity,
    probe: HttpProbe,
}

async fn open_dashboard(
    config: &ResolvedConfig,
    spreadsheet_id: &str,
    cache_subdir: Option<&str>,
    names: Vec<DatasetName>,
    output_mode: OutputMode,
) -> miette::Result<Opened> {
    let cache = match &config.cache_dir {
        Some(dir) => FileCache::new_with_root(dir.clone()),
        None => FileCache::new()?,
    };
    let cache = match cache_subdir {
        Some(subdir) => FileCache::new_with_root(cache.root().join(subdir)),
        None => cache,
    };
    if let Err(err) = cache.ensure_root() {
        tracing::warn!(error = %err, "cache directory unavailable; refreshed data will not persist");
    }

    let remote = SheetsHttpClient::new(&config.base_url, spreadsheet_id, config.api_key.clone())?;
    let probe = HttpProbe::new(&config.probe_url, Duration::from_secs(5))?;
    let connectivity = SharedConnectivity::new(probe.check().await);

    let sink: Arc<dyn SyncSink> = match output_mode {
        OutputMode::Interactive => Arc::new(StatusLines),
        OutputMode::NonInteractive => Arc::new(JsonOutput),
    };
    let dashboard = SyncManager::new_with_sink(cache, remote, connectivity.clone(), names, sink);
    Ok(Opened {
        dashboard,
        connectivity,
        probe,
    })
}

fn parse_names(values: &[String]) -> miette::Result<Vec<DatasetName>> {
    values
        .iter()
        .map(|value| Ok(value.parse::<DatasetName>()?))
        .collect()
}

async fn run_sync(
    args: SyncArgs,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let opened = open_dashboard(
        &config,
        &config.spreadsheet_id,
        None,
        config.dataset_names(),
        output_mode,
    )
    .await?;
    let session = opened.dashboard.activate();
    opened.dashboard.wait_ready().await;

    if args.watch {
        let poller = opened
            .probe
            .clone()
            .spawn(opened.connectivity.clone(), config.probe_interval);
        tracing::info!("watching connectivity; press Ctrl-C to stop");
        tokio::signal::ctrl_c().await.into_diagnostic()?;
        poller.abort();
    }
    session.end();

    JsonOutput::print_status(&opened.dashboard.status()).into_diagnostic()?;
    Ok(())
}

async fn run_refresh(
    args: RefreshArgs,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let names = if args.names.is_empty() {
        config.dataset_names()
    } else {
        parse_names(&args.names)?
    };
    let opened = open_dashboard(
        &config,
        &config.spreadsheet_id,
        None,
        config.dataset_names(),
        output_mode,
    )
    .await?;

    let report = opened.dashboard.refresh(&names).await?;
    let result = RefreshResult {
        refreshed: report
            .outcomes
            .iter()
            .filter(|outcome| outcome.result.is_ok())
            .map(|outcome| outcome.name.to_string())
            .collect(),
        failed: report
            .failed()
            .map(|outcome| FailedRefresh {
                dataset: outcome.name.to_string(),
                error: outcome
                    .result
                    .as_ref()
                    .err()
                    .map(|err| err.to_string())
                    .unwrap_or_default(),
            })
            .collect(),
    };
    JsonOutput::print_refresh(&result).into_diagnostic()?;
    if !report.all_succeeded() {
        tracing::warn!(failed = result.failed.len(), "some datasets kept their previous copy");
    }
    Ok(())
}

/// Opens a dashboard over `names`, waits for every slot to settle and
/// returns it with the session already ended.
async fn load_settled(
    config: &ResolvedConfig,
    names: Vec<DatasetName>,
    output_mode: OutputMode,
) -> miette::Result<Dashboard> {
    let opened = open_dashboard(config, &config.spreadsheet_id, None, names, output_mode).await?;
    let session = opened.dashboard.activate();
    opened.dashboard.wait_ready().await;
    session.end();
    Ok(opened.dashboard)
}

async fn run_summary(
    args: DatasetArgs,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let name: DatasetName = args.name.parse()?;
    let dashboard = load_settled(&config, vec![name.clone()], output_mode).await?;
    let dataset = dashboard.current(&name);
    let summary = summarize(dataset.as_deref());
    let result = SummaryResult {
        dataset: name.to_string(),
        title: config.title_of(&name),
        sentence: summary.sentence(),
        summary,
    };
    JsonOutput::print_summary(&result).into_diagnostic()?;
    Ok(())
}

async fn run_report(
    args: ReportArgs,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let name: DatasetName = args.name.parse()?;
    let dashboard = load_settled(&config, vec![name.clone()], output_mode).await?;
    let dataset = dashboard.current(&name);
    if dataset.is_none() {
        tracing::warn!(dataset = %name, "no cached or fetched data; exporting an empty table");
    }
    let title = args.title.unwrap_or_else(|| config.title_of(&name));
    write_document(&table_document(dataset.as_deref(), &title), args.output.as_deref())
}

async fn run_statement(
    args: OutputArgs,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let names = STATEMENT_DATASETS
        .iter()
        .map(|name| Ok(name.parse::<DatasetName>()?))
        .collect::<miette::Result<Vec<_>>>()?;
    let dashboard = load_settled(&config, names.clone(), output_mode).await?;
    let income = dashboard.current(&names[0]);
    let expenses = dashboard.current(&names[1]);
    let assets = dashboard.current(&names[2]);
    let liabilities = dashboard.current(&names[3]);
    let html = financial_statement_document(
        income.as_deref(),
        expenses.as_deref(),
        assets.as_deref(),
        liabilities.as_deref(),
    );
    write_document(&html, args.output.as_deref())
}

async fn run_login(
    args: LoginArgs,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let source = config.credentials.clone().ok_or_else(|| {
        miette::Report::msg("no credentials sheet configured (add `credentials` to bizdash.json)")
    })?;
    let opened = open_dashboard(
        &config,
        &source.spreadsheet_id,
        Some("credentials"),
        vec![source.sheet.clone()],
        output_mode,
    )
    .await?;
    let session = opened.dashboard.activate();
    opened.dashboard.wait_ready().await;
    session.end();

    let accounts = opened.dashboard.current(&source.sheet);
    if accounts.is_none() {
        return Err(DashError::DatasetUnavailable(source.sheet.to_string()).into());
    }
    let authorized = credentials::exists(accounts.as_deref(), &args.email, &args.password);
    JsonOutput::print_login(&LoginResult {
        email: args.email.trim().to_string(),
        authorized,
    })
    .into_diagnostic()?;
    if !authorized {
        return Err(miette::Report::msg("incorrect credentials"));
    }
    Ok(())
}

fn write_document(html: &str, output: Option<&str>) -> miette::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, html).into_diagnostic()?;
            tracing::info!(path, "report written");
            Ok(())
        }
        None => {
            print!("{html}");
            Ok(())
        }
    }
}
