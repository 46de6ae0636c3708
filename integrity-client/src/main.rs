//! integrity-os - IntegrityOS command-line client
//!
//! Talks to the IntegrityOS backend (default http://localhost:8000) to list
//! inspection objects, import data, issue work permits, export reports and
//! run the dashboard stores headless with periodic refresh.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use integrity_client::api::{ApiClient, InspectionApi, MlApi};
use integrity_client::batch::fetch_diagnostics;
use integrity_client::chat::ChatSession;
use integrity_client::fallback::load_analytics;
use integrity_client::import::ImportClient;
use integrity_client::map::MapView;
use integrity_client::permits::PermitService;
use integrity_client::report::{
    export_to_dir, technical_state_report, work_permit_document, ExportFormat, PermitDocumentInput,
    TechnicalReportInput,
};
use integrity_client::store::Dashboard;
use integrity_common::config::{default_config_path, TomlConfig};
use integrity_common::events::{EventBus, IntegrityEvent};
use integrity_common::models::{
    DiagnosticMethod, Filter, ObjectId, PermitQuery, PermitSort, PermitStatus, RiskLevel, TemplateKind,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for integrity-os
#[derive(Parser, Debug)]
#[command(name = "integrity-os")]
#[command(about = "IntegrityOS pipeline inspection client")]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(short, long, env = "INTEGRITY_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL, overrides INTEGRITY_API_URL and the config file
    #[arg(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List inspection objects
    Objects(FilterArgs),
    /// Show dashboard statistics
    Stats,
    /// Import CSV/XLSX files, the sample dataset, or download templates
    Import(ImportArgs),
    /// Export a report
    Report(ReportArgs),
    /// Work permits
    #[command(subcommand)]
    Permits(PermitCommand),
    /// Risk-model status and monitoring
    #[command(subcommand)]
    Ml(MlCommand),
    /// Ask the AI assistant; reads questions from stdin if none given
    Chat { message: Option<String> },
    /// Run the dashboard stores with periodic refresh until Ctrl+C
    Watch {
        #[command(flatten)]
        filter: FilterArgs,
        /// Refresh period in seconds (overrides the config file)
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    #[arg(long)]
    pipeline: Option<String>,
    #[arg(long)]
    method: Option<DiagnosticMethod>,
    #[arg(long)]
    risk: Option<RiskLevel>,
    /// Earliest diagnostic date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Latest diagnostic date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
}

impl FilterArgs {
    fn to_filter(&self) -> Option<Filter> {
        let filter = Filter {
            pipeline_id: self.pipeline.clone(),
            method: self.method,
            risk_level: self.risk,
            ..Default::default()
        }
        .with_dates(self.from, self.to);
        Filter::normalize(Some(filter))
    }
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// One or two .csv/.xlsx/.xls files
    files: Vec<PathBuf>,
    /// Replace existing data
    #[arg(long)]
    clear: bool,
    /// Import the backend's bundled sample dataset instead of files
    #[arg(long, conflicts_with = "files")]
    sample: bool,
    /// Download a template instead of importing
    #[arg(long, value_enum, conflicts_with_all = ["files", "sample"])]
    template: Option<TemplateArg>,
    /// Directory for downloaded templates
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum TemplateArg {
    Objects,
    Diagnostics,
    Both,
}

impl From<TemplateArg> for TemplateKind {
    fn from(arg: TemplateArg) -> Self {
        match arg {
            TemplateArg::Objects => TemplateKind::Objects,
            TemplateArg::Diagnostics => TemplateKind::Diagnostics,
            TemplateArg::Both => TemplateKind::Both,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq)]
enum ReportKind {
    Technical,
    Permit,
}

#[derive(Args, Debug)]
struct ReportArgs {
    #[arg(value_enum)]
    kind: ReportKind,
    /// html, pdf or xlsx
    #[arg(short, long, default_value = "pdf")]
    format: ExportFormat,
    /// Object for a permit document
    #[arg(long, required_if_eq("kind", "permit"))]
    object: Option<ObjectId>,
    /// Permit to print; omitted prints a draft
    #[arg(long)]
    permit: Option<i64>,
    /// Output directory (defaults to export_dir from the config)
    #[arg(long)]
    out: Option<PathBuf>,
    #[command(flatten)]
    filter: FilterArgs,
}

#[derive(Subcommand, Debug)]
enum PermitCommand {
    List {
        #[arg(long)]
        object: Option<ObjectId>,
        #[arg(long)]
        status: Option<PermitStatus>,
        #[arg(long, default_value = "50")]
        limit: u32,
    },
    /// Issue a permit for an object
    Create {
        object: ObjectId,
        #[arg(long)]
        issued_by: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show a permit by number (ND-YYYY-NNNN)
    Show { number: String },
    Close {
        permit_id: i64,
        #[arg(long = "by")]
        closed_by: String,
    },
}

#[derive(Subcommand, Debug)]
enum MlCommand {
    /// Whether the model is trained and on how many samples
    Status,
    /// Label distribution and prediction counts
    Metrics,
    /// Data and target drift checks
    Drift,
    /// Improvement suggestions, most urgent first
    Suggestions,
}

/// Load the config before logging is up; problems are reported afterwards
fn load_config(path: Option<PathBuf>) -> (TomlConfig, Option<String>) {
    let Some(path) = path.or_else(default_config_path) else {
        return (TomlConfig::default(), None);
    };
    if !path.exists() {
        return (TomlConfig::default(), None);
    }
    match TomlConfig::load(&path) {
        Ok(config) => (config, None),
        Err(e) => (
            TomlConfig::default(),
            Some(format!("{}: {}, using defaults", path.display(), e.user_message())),
        ),
    }
}

fn init_logging(config: &TomlConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let file_layer = match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, config_problem) = load_config(cli.config.clone());
    init_logging(&config)?;
    if let Some(problem) = config_problem {
        warn!("Config file unusable: {}", problem);
    }
    config.resolve_api_base_url(cli.api_url.as_deref());

    info!(build = %integrity_client::build_info(), api = %config.api_base_url, "integrity-os starting");

    let client = Arc::new(
        ApiClient::new(&config.api_base_url, config.request_timeout()).context("Failed to build HTTP client")?,
    );

    run(cli.command, client, &config).await.map_err(user_facing)
}

/// Client errors become their inline message; anything else passes through
fn user_facing(e: anyhow::Error) -> anyhow::Error {
    match e.downcast_ref::<integrity_common::Error>() {
        Some(err) => anyhow!(err.user_message()),
        None => e,
    }
}

async fn run(command: Command, client: Arc<ApiClient>, config: &TomlConfig) -> Result<()> {
    match command {
        Command::Objects(filter) => {
            let objects = client.list_objects(filter.to_filter().as_ref()).await?;
            for o in &objects {
                let location = o
                    .map_location()
                    .map(|p| format!("{:.5}, {:.5}", p.lat, p.lon))
                    .unwrap_or_else(|| "no location".to_string());
                println!(
                    "{:>6}  {:<32}  {:<16}  {:<8}  {:<7}  {}",
                    o.id,
                    o.name,
                    o.category.label(),
                    o.pipeline_id.as_deref().unwrap_or("-"),
                    o.risk_level.map(|r| r.label()).unwrap_or("-"),
                    location
                );
            }
            println!("{} objects ({})", objects.len(), Filter::describe(filter.to_filter().as_ref()));
        }

        Command::Stats => {
            let analytics = load_analytics(client.as_ref(), 5).await?;
            if analytics.has_demo() {
                println!("(backend unavailable: showing demo data)");
            }
            let s = analytics.stats.value();
            println!("Objects:           {}", s.total_objects);
            println!("Diagnostics:       {}", s.total_diagnostics);
            println!("Defects:           {} ({:.2}%)", s.total_defects, s.defects_percentage);
            println!("Active defects:    {}", s.active_defects);
            println!("Repairs this year: {}", s.repairs_this_year);
            println!(
                "Criticality:       high {} / medium {} / normal {}",
                s.criticality.high, s.criticality.medium, s.criticality.normal
            );
            println!("Top risks:");
            for r in analytics.top_risks.value() {
                println!("  {:>6}  {:<32}  {} high-risk defects", r.object_id, r.object_name, r.high_defects_count);
            }
        }

        Command::Import(args) => {
            let importer = ImportClient::new(client, EventBus::new(16));
            if let Some(kind) = args.template {
                let path = importer.download_template(kind.into(), &args.out).await?;
                println!("Template saved to {}", path.display());
                return Ok(());
            }
            let stats = if args.sample {
                importer.import_sample_dataset(args.clear).await?
            } else {
                importer.import_paths(&args.files, args.clear).await?
            };
            println!("Imported {}", stats.summary());
            for e in &stats.errors {
                println!("  warning: {}", e);
            }
        }

        Command::Report(args) => {
            let dir = args.out.clone().unwrap_or_else(|| config.export_dir());
            let mut doc = match args.kind {
                ReportKind::Technical => {
                    let filter = args.filter.to_filter();
                    let objects = client.list_objects(filter.as_ref()).await?;
                    let ids: Vec<ObjectId> = objects.iter().map(|o| o.id).collect();
                    let (diagnostics, analytics) = tokio::join!(
                        fetch_diagnostics(client.as_ref(), &ids, config.diagnostics_batch_size),
                        load_analytics(client.as_ref(), 10),
                    );
                    technical_state_report(&TechnicalReportInput {
                        objects,
                        diagnostics,
                        analytics: analytics?,
                        filter,
                        generated_at: Utc::now(),
                    })
                }
                ReportKind::Permit => {
                    let Some(object_id) = args.object else {
                        bail!("--object is required for a permit document");
                    };
                    let object = client
                        .list_objects(None)
                        .await?
                        .into_iter()
                        .find(|o| o.id == object_id)
                        .ok_or_else(|| integrity_common::Error::NotFound(format!("Object {}", object_id)))?;
                    let diagnostics = client.object_diagnostics(object_id).await?;
                    let permit = match args.permit {
                        Some(id) => Some(PermitService::new(client.clone(), EventBus::new(16)).get(id).await?),
                        None => None,
                    };
                    work_permit_document(&PermitDocumentInput {
                        object,
                        diagnostics,
                        permit,
                        generated_at: Utc::now(),
                    })
                }
            };
            let path = export_to_dir(&mut doc, args.format, &dir).await?;
            println!("Report written to {}", path.display());
        }

        Command::Permits(cmd) => {
            let permits = PermitService::new(client, EventBus::new(16));
            match cmd {
                PermitCommand::List { object, status, limit } => {
                    let query = PermitQuery {
                        object_id: object,
                        status,
                        limit: Some(limit),
                        sort_by: Some(PermitSort::IssuedDate),
                        descending: true,
                    };
                    for p in permits.list(&query).await? {
                        println!(
                            "{:>5}  {}  {:<9}  {}  {}",
                            p.permit_id,
                            p.permit_number,
                            p.status.as_str(),
                            integrity_common::time::display_date(p.issued_date),
                            p.object_name.as_deref().unwrap_or("-")
                        );
                    }
                }
                PermitCommand::Create { object, issued_by, notes } => {
                    let permit = permits.issue(object, issued_by.as_deref(), notes.as_deref()).await?;
                    println!("Issued {} for object {}", permit.permit_number, permit.object_id);
                }
                PermitCommand::Show { number } => {
                    let p = permits.by_number(&number).await?;
                    println!("{} [{}] object {}", p.permit_number, p.status, p.object_id);
                    println!("  issued {} by {}", p.issued_date, p.issued_by.as_deref().unwrap_or("-"));
                    if let Some(closed) = p.closed_date {
                        println!("  closed {} by {}", closed, p.closed_by.as_deref().unwrap_or("-"));
                    }
                }
                PermitCommand::Close { permit_id, closed_by } => {
                    let p = permits.close(permit_id, &closed_by).await?;
                    println!("{} is now {}", p.permit_number, p.status);
                }
            }
        }

        Command::Ml(cmd) => match cmd {
            MlCommand::Status => {
                let s = client.ml_status().await?;
                println!("Trained:         {}", if s.is_trained { "yes" } else { "no" });
                println!("Model:           {}", if s.model_type.is_empty() { "-" } else { s.model_type.as_str() });
                println!("Labeled samples: {} of {}", s.labeled_samples, s.total_samples);
                if !s.has_enough_labels() {
                    println!("(fewer labeled samples than training needs)");
                }
                if let Some(run) = &s.mlflow_run_id {
                    println!("MLflow run:      {}", run);
                }
            }
            MlCommand::Metrics => {
                let m = client.ml_metrics().await?;
                println!("Diagnostics:        {} ({} labeled)", m.total_diagnostics, m.with_ml_label);
                println!("Defect rate:        {:.2}%", m.defect_rate);
                println!("Recent predictions: {}", m.recent_predictions);
                if let Some(share) = m.high_share() {
                    println!("High-risk share:    {:.1}%", share);
                }
                for (label, count) in &m.predictions_distribution {
                    println!("  {:<8} {}", label, count);
                }
            }
            MlCommand::Drift => {
                let d = client.ml_drift().await?;
                let describe = |c: &Option<integrity_common::models::DriftCheck>| {
                    c.as_ref().map(|c| c.summary()).unwrap_or_else(|| "unavailable".to_string())
                };
                println!("Data drift:   {}", describe(&d.data_drift));
                println!("Target drift: {}", describe(&d.target_drift));
            }
            MlCommand::Suggestions => {
                let s = client.ml_suggestions().await?;
                if s.suggestions.is_empty() {
                    println!("No suggestions");
                }
                for item in s.by_priority() {
                    println!("[{:?}] {}: {}", item.priority, item.kind, item.message);
                    if let Some(action) = &item.action {
                        println!("    {}", action);
                    }
                }
            }
        },

        Command::Chat { message } => {
            let mut session = ChatSession::new(client, config.chat_history_limit);
            match message {
                Some(m) => println!("{}", session.send(&m).await?.message),
                None => {
                    let mut lines = BufReader::new(tokio::io::stdin()).lines();
                    while let Some(line) = lines.next_line().await? {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match session.send(&line).await {
                            Ok(reply) => println!("{}\n", reply.message),
                            Err(e) => eprintln!("{}", e.user_message()),
                        }
                    }
                }
            }
        }

        Command::Watch { filter, interval } => {
            let period = interval
                .map(std::time::Duration::from_secs)
                .unwrap_or_else(|| config.refresh_interval());
            watch(client, filter.to_filter(), period).await?;
        }
    }
    Ok(())
}

/// Run both stores headless, logging sync events until Ctrl+C
async fn watch(client: Arc<ApiClient>, filter: Option<Filter>, period: std::time::Duration) -> Result<()> {
    let mut dashboard = Dashboard::new(client);
    let mut events = dashboard.event_bus().subscribe();
    dashboard.start_with_refresh(period);
    if filter.is_some() {
        dashboard.map().set_filter(filter).await?;
    }

    let mut view = MapView::mount(dashboard.map(), &[]);
    info!(period_secs = period.as_secs(), "Watching; press Ctrl+C to stop");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Ok(IntegrityEvent::DataRefreshed { object_count, filter, .. }) => {
                    view.update(&dashboard.data().located_objects().await);
                    info!(
                        objects = object_count,
                        markers = view.markers().len(),
                        filter = %Filter::describe(filter.as_ref()),
                        "Data refreshed"
                    );
                }
                Ok(IntegrityEvent::RefreshFailed { message, .. }) => warn!("Refresh failed: {}", message),
                Ok(other) => debug!(event = other.event_type(), "Event"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => warn!(skipped = n, "Event log lagged"),
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    drop(view);
    dashboard.shutdown().await;
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
