use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use natcap_sync::catalog::{CatalogStore, CkanCatalogClient, FileCatalog};
use natcap_sync::config::{CatalogTarget, ConfigLoader, ResolvedConfig};
use natcap_sync::domain::MapPreview;
use natcap_sync::error::SyncError;
use natcap_sync::http::ResourceHttpClient;
use natcap_sync::output::{ArchiveTree, JsonOutput, PreviewResult, SyncSummary, TreeResult};
use natcap_sync::pipeline::{PipelineSettings, SyncOptions, SyncOutcome, SyncPipeline, SyncReport};
use natcap_sync::sources::{parse_sources_extra, sources_for_resource};
use natcap_sync::tiles::TilerHttpClient;

#[derive(Parser)]
#[command(name = "natcap-sync")]
#[command(about = "Recompute derived catalog extras from dataset metadata sidecars")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Update the given datasets")]
    Sync(SyncArgs),
    #[command(about = "Update every dataset in the catalog")]
    SyncAll(SyncFlags),
    #[command(about = "Show the archive source tree of a dataset")]
    Tree(DatasetArgs),
    #[command(about = "Show the stored map preview of a dataset")]
    Preview(DatasetArgs),
}

#[derive(Args)]
struct SyncArgs {
    #[arg(required = true)]
    ids: Vec<String>,

    #[command(flatten)]
    flags: SyncFlags,
}

#[derive(Args, Clone, Copy)]
struct SyncFlags {
    #[arg(long)]
    force: bool,

    #[arg(long)]
    dry_run: bool,
}

impl From<SyncFlags> for SyncOptions {
    fn from(flags: SyncFlags) -> Self {
        SyncOptions {
            force: flags.force,
            dry_run: flags.dry_run,
        }
    }
}

#[derive(Args)]
struct DatasetArgs {
    id: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<SyncError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SyncError) -> u8 {
    match error {
        SyncError::DatasetNotFound(_) => 2,
        SyncError::CatalogHttp(_)
        | SyncError::CatalogStatus { .. }
        | SyncError::CatalogAction { .. }
        | SyncError::ResourceHttp(_)
        | SyncError::ResourceStatus { .. }
        | SyncError::TileHttp(_)
        | SyncError::TileStatus { .. } => 3,
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
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match config.catalog.clone() {
        CatalogTarget::Ckan { url, api_key } => {
            let catalog = CkanCatalogClient::new(url, api_key, config.request_timeout)?;
            run_command(cli.command, catalog, &config)
        }
        CatalogTarget::Directory(root) => run_command(cli.command, FileCatalog::new(root), &config),
    }
}

fn run_command<C: CatalogStore>(
    command: Commands,
    catalog: C,
    config: &ResolvedConfig,
) -> miette::Result<()> {
    match command {
        Commands::Sync(args) => {
            let pipeline = build_pipeline(catalog, config)?;
            let options = SyncOptions::from(args.flags);
            let mut first_error = None;
            let mut reports = Vec::with_capacity(args.ids.len());
            for id in args.ids {
                let outcome = match pipeline.sync(&id, options) {
                    Ok(outcome) => outcome,
                    Err(error) => {
                        tracing::error!(dataset = %id, error = %error, "dataset sync failed");
                        let outcome = SyncOutcome::Failed {
                            error: error.to_string(),
                        };
                        if first_error.is_none() {
                            first_error = Some(error);
                        }
                        outcome
                    }
                };
                reports.push(SyncReport {
                    dataset: id,
                    outcome,
                });
            }
            JsonOutput::print_summary(&SyncSummary::new(reports)).into_diagnostic()?;
            match first_error {
                Some(error) => Err(error.into()),
                None => Ok(()),
            }
        }
        Commands::SyncAll(flags) => {
            let pipeline = build_pipeline(catalog, config)?;
            let reports = pipeline.sync_all(SyncOptions::from(flags))?;
            let summary = SyncSummary::new(reports);
            JsonOutput::print_summary(&summary).into_diagnostic()?;
            if summary.failed > 0 {
                return Err(miette::Report::msg(format!(
                    "{} dataset(s) failed to sync",
                    summary.failed
                )));
            }
            Ok(())
        }
        Commands::Tree(args) => {
            let dataset = catalog.get_dataset(&args.id)?;
            let tree = parse_sources_extra(&dataset.extras)?.unwrap_or_default();
            let archives = dataset
                .resources
                .iter()
                .filter_map(|resource| {
                    sources_for_resource(&tree, resource).map(|members| ArchiveTree {
                        resource: resource.name.clone(),
                        members: members.to_vec(),
                    })
                })
                .collect();
            JsonOutput::print_tree(&TreeResult {
                dataset: dataset.id,
                tree,
                archives,
            })
            .into_diagnostic()
        }
        Commands::Preview(args) => {
            let dataset = catalog.get_dataset(&args.id)?;
            let preview = MapPreview::from_extras(&dataset.extras)?;
            JsonOutput::print_preview(&PreviewResult {
                dataset: dataset.id,
                preview,
            })
            .into_diagnostic()
        }
    }
}

fn build_pipeline<C: CatalogStore>(
    catalog: C,
    config: &ResolvedConfig,
) -> Result<SyncPipeline<C, ResourceHttpClient, TilerHttpClient>, SyncError> {
    let resources = ResourceHttpClient::new(config.request_timeout)?;
    let tiles = TilerHttpClient::new(config.tile_service_url.clone(), config.request_timeout)?;
    SyncPipeline::new(catalog, resources, tiles, PipelineSettings::from(config))
}
