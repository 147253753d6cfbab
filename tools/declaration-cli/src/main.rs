use std::path::PathBuf;

use clap::{Parser, Subcommand};
use declaration_model::{FilterClause, FilterValue, TenantSchema};
use declaration_service::{DeclarationService, SearchRequest, ServiceConfig};
use embedding_provider::config::default_stdio_config;
use tracing_subscriber::EnvFilter;

/// Ingest and search EAEU customs declarations.
#[derive(Parser)]
#[command(name = "declaration-cli", version, about)]
struct Cli {
    /// Directory holding the SQLite metadata DB, document store and vector index.
    #[arg(long, default_value = "target/demo/declarations")]
    data_dir: PathBuf,

    /// Directory of per-tenant schema YAML files.
    #[arg(long, default_value = "target/demo/tenants")]
    tenant_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a declaration from one of the three input forms.
    Ingest {
        #[command(subcommand)]
        form: IngestForm,
    },
    /// Run a hybrid search over ingested declarations.
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        /// Repeatable `field=value` equality filter.
        #[arg(long = "filter", value_name = "FIELD=VALUE")]
        filters: Vec<String>,
        #[arg(long)]
        rerank: bool,
        #[arg(long)]
        explain: bool,
    },
    /// Inspect or register per-tenant schemas.
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
    /// Report the health of the storage-trio collaborators.
    Health,
}

#[derive(Subcommand)]
enum IngestForm {
    /// Structured markup (XML).
    Markup {
        file: PathBuf,
        #[arg(long, default_value = "default")]
        tenant: String,
    },
    /// A pre-parsed record (JSON), mapped through the tenant's schema.
    Record {
        file: PathBuf,
        #[arg(long, default_value = "default")]
        tenant: String,
    },
    /// Free OCR text.
    Ocr {
        file: PathBuf,
        #[arg(long, default_value = "default")]
        tenant: String,
    },
}

#[derive(Subcommand)]
enum SchemaAction {
    /// List known tenants.
    List,
    /// Print a tenant's schema as JSON.
    Show { tenant: String },
    /// Register (or overwrite) a tenant's schema from a YAML file.
    Set { file: PathBuf },
}

fn build_service(cli: &Cli) -> Result<DeclarationService, String> {
    let embedder = default_stdio_config();
    let config = ServiceConfig::new(
        cli.data_dir.join("metadata.db"),
        cli.data_dir.join("documents"),
        cli.data_dir.join("vectors"),
        cli.tenant_dir.clone(),
        embedder,
    );
    DeclarationService::new(config).map_err(|e| e.to_string())
}

/// Parses a repeatable `--filter field=value` flag into an equality clause.
/// Range and membership filters are not exposed on the command line; they
/// are used programmatically by callers that embed the service directly.
fn parse_filter(raw: &str) -> Result<FilterClause, String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("filter `{raw}` must be `field=value`"))?;
    Ok(FilterClause {
        field: field.to_string(),
        value: FilterValue::Eq(serde_json::json!(value)),
    })
}

fn run(cli: Cli) -> Result<(), String> {
    match &cli.command {
        Command::Ingest { form } => {
            let service = build_service(&cli)?;
            let report = match form {
                IngestForm::Markup { file, tenant } => {
                    let xml = std::fs::read_to_string(file).map_err(|e| e.to_string())?;
                    service.ingest_markup(&xml, tenant).map_err(|e| e.to_string())?
                }
                IngestForm::Record { file, tenant } => {
                    let raw = std::fs::read_to_string(file).map_err(|e| e.to_string())?;
                    let json: serde_json::Value = serde_json::from_str(&raw).map_err(|e| e.to_string())?;
                    service.ingest_record(&json, tenant).map_err(|e| e.to_string())?
                }
                IngestForm::Ocr { file, tenant } => {
                    let text = std::fs::read_to_string(file).map_err(|e| e.to_string())?;
                    service.ingest_ocr(&text, tenant).map_err(|e| e.to_string())?
                }
            };
            service.persist().map_err(|e| e.to_string())?;
            println!("{}", serde_json::to_string_pretty(&report).unwrap());
            Ok(())
        }
        Command::Search {
            query,
            top_k,
            filters,
            rerank,
            explain,
        } => {
            let service = build_service(&cli)?;
            let parsed_filters = filters
                .iter()
                .map(|f| parse_filter(f))
                .collect::<Result<Vec<_>, _>>()?;
            let request = SearchRequest {
                query: query.clone(),
                top_k: *top_k,
                filters: parsed_filters,
                rerank: *rerank,
                explain: *explain,
                query_date: None,
            };
            let hits = service.search(&request).map_err(|e| e.to_string())?;
            println!("{}", serde_json::to_string_pretty(&hits).unwrap());
            Ok(())
        }
        Command::Schema { action } => {
            let service = build_service(&cli)?;
            match action {
                SchemaAction::List => {
                    for tenant in service.list_tenants() {
                        println!("{tenant}");
                    }
                    Ok(())
                }
                SchemaAction::Show { tenant } => {
                    let schema = service.get_schema(tenant);
                    println!("{}", serde_json::to_string_pretty(&schema).unwrap());
                    Ok(())
                }
                SchemaAction::Set { file } => {
                    let raw = std::fs::read_to_string(file).map_err(|e| e.to_string())?;
                    let schema: TenantSchema = serde_yaml::from_str(&raw).map_err(|e| e.to_string())?;
                    service.register_schema(schema).map_err(|e| e.to_string())
                }
            }
        }
        Command::Health => {
            let service = build_service(&cli)?;
            let report = service.health();
            println!("{}", serde_json::to_string_pretty(&report).unwrap());
            Ok(())
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
