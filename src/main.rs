use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use configuration::Config;
use database::StorageBackend;
use manager::{DataManager, metrics_to_json, transactions_to_json};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// The main entry point for the finmart integration client.
#[tokio::main]
async fn main() -> Result<()> {
    // Credentials and overrides may live in a .env file; its absence is fine.
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = configuration::load_config().context("failed to load finmart.toml")?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Projects => handle_projects(&config).await,
        Commands::Search(args) => handle_search(&config, args).await,
        Commands::Library(args) => handle_library(&config, args).await,
        Commands::Report(args) => handle_report(&config, args).await,
        Commands::Summary(args) => handle_summary(&config, args).await,
        Commands::Metrics(args) => handle_metrics(&config, args).await,
        Commands::Sync(args) => handle_sync(&config, args).await,
        Commands::Push(args) => handle_push(&config, args).await,
        Commands::UpdateCube(args) => handle_update_cube(&config, args).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Pulls financial data from a BI server into local storage, derives
/// financial metrics, and publishes them back as datasets and cubes.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the projects visible to the configured user.
    Projects,
    /// Search the server for objects by name and/or type.
    Search(SearchArgs),
    /// List the user's library.
    Library(LibraryArgs),
    /// Execute a report (or fetch its definition) and print the raw body.
    Report(ReportArgs),
    /// Summarize the local transaction store.
    Summary(SummaryArgs),
    /// Derive financial metrics from the stored records.
    Metrics(MetricsArgs),
    /// Pull a cube's rows into the local store.
    Sync(SyncArgs),
    /// Create (if needed) and publish the metrics dataset.
    Push(PushArgs),
    /// Refresh an existing cube with the current metrics in one call.
    UpdateCube(CubeArgs),
}

#[derive(Parser)]
struct SearchArgs {
    /// Object name filter.
    #[arg(long)]
    name: Option<String>,

    /// Numeric object type filter (e.g. 3 for reports, 776 for cubes).
    #[arg(long)]
    object_type: Option<u32>,

    /// Maximum number of hits.
    #[arg(long, default_value_t = 50)]
    limit: u32,
}

#[derive(Parser)]
struct LibraryArgs {
    /// Maximum number of entries.
    #[arg(long, default_value_t = 50)]
    limit: u32,
}

#[derive(Parser)]
struct ReportArgs {
    /// Report id; defaults to api.report_id from the configuration.
    #[arg(long)]
    id: Option<String>,

    /// Fetch the report's definition tree instead of executing it.
    #[arg(long)]
    definition: bool,
}

#[derive(Parser)]
struct SummaryArgs {
    /// Emit the recent transactions as JSON instead of the summary tables.
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct MetricsArgs {
    /// Restrict to one company.
    #[arg(long)]
    company: Option<String>,

    /// Emit the full metrics set as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct SyncArgs {
    /// Cube id; defaults to api.cube_id from the configuration.
    #[arg(long, conflicts_with = "report")]
    cube: Option<String>,

    /// Sync from a report instead of a cube (first result page only).
    #[arg(long)]
    report: Option<String>,
}

#[derive(Parser)]
struct PushArgs {
    /// Existing dataset id. When omitted, a new dataset is created first.
    #[arg(long)]
    dataset_id: Option<String>,

    /// Restrict the pushed metrics to one company.
    #[arg(long)]
    company: Option<String>,
}

#[derive(Parser)]
struct CubeArgs {
    /// Cube id; defaults to api.cube_id from the configuration.
    #[arg(long)]
    cube: Option<String>,

    /// Restrict the pushed metrics to one company.
    #[arg(long)]
    company: Option<String>,
}

// ==============================================================================
// Connection helpers
// ==============================================================================

/// Builds a manager and logs it in.
async fn connect_api(config: &Config) -> Result<DataManager> {
    let mut manager = DataManager::new(&config.api.base_url)?;
    manager
        .connect_api(&config.api.username, &config.api.password)
        .await
        .context("login failed")?;
    if !config.api.project_id.is_empty() {
        manager.set_project(&config.api.project_id);
    }
    Ok(manager)
}

/// Builds a manager with only the storage backend attached.
async fn connect_store(config: &Config) -> Result<DataManager> {
    let backend: StorageBackend = config.storage.backend.parse()?;
    let mut manager = DataManager::new(&config.api.base_url)?;
    manager
        .connect_store(backend, &config.storage.connection)
        .await
        .context("failed to open the storage backend")?;
    Ok(manager)
}

fn required<'a>(flag: Option<&'a String>, fallback: &'a str, what: &str) -> Result<&'a str> {
    match flag {
        Some(value) if !value.is_empty() => Ok(value),
        _ if !fallback.is_empty() => Ok(fallback),
        _ => anyhow::bail!("no {what} given on the command line or in finmart.toml"),
    }
}

// ==============================================================================
// Command handlers
// ==============================================================================

async fn handle_projects(config: &Config) -> Result<()> {
    let mut manager = connect_api(config).await?;
    let projects = manager.get_projects().await?;

    let mut table = Table::new();
    table.set_header(vec!["Id", "Name", "Description", "Status"]);
    for project in &projects {
        table.add_row(vec![
            &project.id,
            &project.name,
            &project.description,
            &project.status,
        ]);
    }
    println!("{table}");
    println!("{} project(s)", projects.len());

    manager.disconnect_api().await;
    Ok(())
}

async fn handle_search(config: &Config, args: SearchArgs) -> Result<()> {
    let mut manager = connect_api(config).await?;
    let results = manager
        .search(args.name.as_deref(), args.object_type, args.limit)
        .await?;

    let mut table = Table::new();
    table.set_header(vec!["Id", "Name", "Type", "Subtype", "Modified", "Owner"]);
    for result in &results {
        table.add_row(vec![
            &result.id,
            &result.name,
            &result.object_type,
            &result.subtype,
            &result.date_modified,
            &result.owner,
        ]);
    }
    println!("{table}");
    println!("{} hit(s)", results.len());

    manager.disconnect_api().await;
    Ok(())
}

async fn handle_library(config: &Config, args: LibraryArgs) -> Result<()> {
    let mut manager = connect_api(config).await?;
    let items = manager.get_library(args.limit).await?;

    let mut table = Table::new();
    table.set_header(vec!["Id", "Name", "Type", "Project", "Modified"]);
    for item in &items {
        table.add_row(vec![
            &item.id,
            &item.name,
            &item.object_type,
            &item.project_id,
            &item.date_modified,
        ]);
    }
    println!("{table}");
    println!("{} item(s)", items.len());

    manager.disconnect_api().await;
    Ok(())
}

async fn handle_report(config: &Config, args: ReportArgs) -> Result<()> {
    let report_id = required(args.id.as_ref(), &config.api.report_id, "report id")?.to_string();

    let mut manager = connect_api(config).await?;
    let body = if args.definition {
        manager.get_report_definition(&report_id).await?
    } else {
        manager.get_report(&report_id).await?
    };
    println!("{body}");

    manager.disconnect_api().await;
    Ok(())
}

async fn handle_summary(config: &Config, args: SummaryArgs) -> Result<()> {
    let manager = connect_store(config).await?;

    let transactions = manager.fetch_transactions().await?;
    if args.json {
        println!("{}", transactions_to_json(&transactions));
        return Ok(());
    }
    println!(
        "Store: {} ({} recent transaction(s))\n",
        manager.store_backend_name(),
        transactions.len()
    );

    let mut departments = Table::new();
    departments.set_header(vec!["Department", "Total"]);
    for entry in manager.fetch_department_spending().await? {
        departments.add_row(vec![entry.department, format!("{:.2}", entry.total)]);
    }
    println!("{departments}");

    let mut systems = Table::new();
    systems.set_header(vec!["Source system", "Transactions"]);
    for entry in manager.fetch_source_system_counts().await? {
        systems.add_row(vec![entry.source_system, entry.count.to_string()]);
    }
    println!("{systems}");

    println!(
        "Total spending: {:.2}",
        manager.fetch_total_spending().await?
    );
    Ok(())
}

async fn handle_metrics(config: &Config, args: MetricsArgs) -> Result<()> {
    let manager = connect_store(config).await?;
    let records = match &args.company {
        Some(company) => manager.fetch_financials(company).await?,
        None => manager.fetch_all_financials().await?,
    };
    let metrics = manager.calculate_metrics(&records);

    if args.json {
        println!("{}", metrics_to_json(&metrics));
        return Ok(());
    }

    let growth = manager.calculate_yoy_growth(&metrics);

    let mut table = Table::new();
    table.set_header(vec![
        "Period", "Company", "Revenue", "Gross margin", "EBITDA", "Net margin", "Current ratio",
        "D/E", "ROE", "YoY",
    ]);
    for (m, yoy) in metrics.iter().zip(&growth) {
        table.add_row(vec![
            m.record.period.clone(),
            m.record.company_id.clone(),
            format!("{:.2}", m.record.revenue),
            format!("{:.4}", m.gross_margin()),
            format!("{:.2}", m.ebitda()),
            format!("{:.4}", m.net_margin()),
            format!("{:.4}", m.current_ratio()),
            format!("{:.4}", m.debt_to_equity()),
            format!("{:.4}", m.return_on_equity()),
            format!("{:.4}", yoy),
        ]);
    }
    println!("{table}");
    println!("{} record(s)", metrics.len());
    Ok(())
}

async fn handle_sync(config: &Config, args: SyncArgs) -> Result<()> {
    let backend: StorageBackend = config.storage.backend.parse()?;
    let mut manager = connect_api(config).await?;
    manager
        .connect_store(backend, &config.storage.connection)
        .await?;

    match args.report {
        Some(report_id) => {
            let inserted = manager.sync_report_to_store(&report_id).await?;
            println!("Synced {inserted} record(s) from report {report_id}");
        }
        None => {
            let cube_id =
                required(args.cube.as_ref(), &config.api.cube_id, "cube id")?.to_string();
            let inserted = manager.sync_cube_to_store(&cube_id).await?;
            println!("Synced {inserted} record(s) from cube {cube_id}");
        }
    }

    manager.disconnect_api().await;
    Ok(())
}

async fn handle_push(config: &Config, args: PushArgs) -> Result<()> {
    let backend: StorageBackend = config.storage.backend.parse()?;
    let mut manager = connect_api(config).await?;
    manager
        .connect_store(backend, &config.storage.connection)
        .await?;

    let records = match &args.company {
        Some(company) => manager.fetch_financials(company).await?,
        None => manager.fetch_all_financials().await?,
    };
    if records.is_empty() {
        anyhow::bail!("no financial records in the store; run `sync` first");
    }
    let metrics = manager.calculate_metrics(&records);

    let dataset_id = match args.dataset_id {
        Some(id) => id,
        None => {
            let id = manager
                .create_dataset(
                    &config.push.dataset_name,
                    &config.push.dataset_description,
                    &config.push.table_name,
                )
                .await?;
            println!("Created dataset {id}");
            id
        }
    };

    manager
        .push_to_dataset(&dataset_id, &config.push.table_name, &metrics)
        .await?;
    println!(
        "Published {} metric row(s) to dataset {dataset_id}",
        metrics.len()
    );

    manager.disconnect_api().await;
    Ok(())
}

async fn handle_update_cube(config: &Config, args: CubeArgs) -> Result<()> {
    let cube_id = required(args.cube.as_ref(), &config.api.cube_id, "cube id")?.to_string();

    let backend: StorageBackend = config.storage.backend.parse()?;
    let mut manager = connect_api(config).await?;
    manager
        .connect_store(backend, &config.storage.connection)
        .await?;

    let records = match &args.company {
        Some(company) => manager.fetch_financials(company).await?,
        None => manager.fetch_all_financials().await?,
    };
    if records.is_empty() {
        anyhow::bail!("no financial records in the store; run `sync` first");
    }
    let metrics = manager.calculate_metrics(&records);

    manager.update_cube(&cube_id, &metrics).await?;
    println!("Refreshed cube {cube_id} with {} row(s)", metrics.len());

    manager.disconnect_api().await;
    Ok(())
}
