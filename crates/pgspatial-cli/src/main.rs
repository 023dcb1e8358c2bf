use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pgspatial_catalog::{CatalogAdapter, PostgresAdapter, SchemaReflector};
use pgspatial_core::{Column, Config, DdlStyle, IndexDefinition, TableIdentifier};
use pgspatial_ddl::MigrationFile;

const DEFAULT_CONFIG: &str = "pgspatial.toml";

/// pgspatial - PostGIS spatial column migrations and reflection
#[derive(Parser)]
#[command(name = "pgspatial")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: pgspatial.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SQL a migration file would run
    Render {
        /// Migration file (TOML)
        file: PathBuf,

        /// DDL style: typed or add_geometry_column (overrides config)
        #[arg(short, long)]
        style: Option<DdlStyle>,

        /// Print statements as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Run a migration file against the database
    Apply {
        /// Migration file (TOML)
        file: PathBuf,
    },

    /// Show the columns and indexes of a table, with spatial metadata
    Inspect {
        /// Table name, optionally schema-qualified
        table: String,

        /// Schema for an unqualified table name
        #[arg(short, long)]
        schema: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Test the database connection
    CheckConnection,

    /// Write a default pgspatial.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    if let Commands::Init { force } = cli.command {
        return init_command(cli.config.as_deref(), force);
    }

    // Load config if specified
    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else if Path::new(DEFAULT_CONFIG).exists() {
        Config::from_file(Path::new(DEFAULT_CONFIG))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    if cli.verbose {
        eprintln!("{} DDL style: {:?}", "Using".cyan(), config.ddl.style);
    }

    match cli.command {
        Commands::Render { file, style, json } => render_command(&config, &file, style, json),
        Commands::Apply { file } => apply_command(&config, &file, cli.verbose).await,
        Commands::Inspect { table, schema, json } => {
            inspect_command(&config, &table, schema.as_deref(), json).await
        }
        Commands::CheckConnection => check_connection_command(&config).await,
        Commands::Init { .. } => Ok(()),
    }
}

/// Render command - print the statements without touching the database
fn render_command(config: &Config, file: &Path, style: Option<DdlStyle>, json: bool) -> Result<()> {
    let migration = load_migration(config, file)?;

    let mut ddl = config.ddl.clone();
    if let Some(style) = style {
        ddl.style = style;
    }

    let statements = migration.statements(&ddl)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&statements)?);
    } else {
        for sql in &statements {
            println!("{};", sql);
        }
    }
    Ok(())
}

/// Apply command - execute a migration through the reflector
async fn apply_command(config: &Config, file: &Path, verbose: bool) -> Result<()> {
    let migration = load_migration(config, file)?;
    let reflector = SchemaReflector::new(connect(config).await?).with_config(config.ddl.clone());

    if verbose {
        eprintln!(
            "{} {} operations from {}",
            "Applying".cyan(),
            migration.operations.len(),
            file.display()
        );
    }

    let executed = reflector.execute_migration(&migration).await?;
    for sql in &executed {
        println!("{} {}", "✓".green(), sql);
    }
    eprintln!("{} {} statements executed", "Done:".green().bold(), executed.len());
    Ok(())
}

#[derive(Serialize)]
struct InspectReport {
    table: String,
    columns: Vec<Column>,
    indexes: Vec<IndexDefinition>,
}

/// Inspect command - reflect a table
async fn inspect_command(config: &Config, table: &str, schema: Option<&str>, json: bool) -> Result<()> {
    let table = resolve_table(table, schema.unwrap_or_else(|| config.default_schema()));
    let reflector = SchemaReflector::new(connect(config).await?);

    let report = InspectReport {
        table: table.fqn(),
        columns: reflector.columns(&table).await?,
        indexes: reflector.indexes(&table).await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", report.table.bold());
    for column in &report.columns {
        let mut line = format!("  {:<24} {:<32}", column.name, column.sql_type);
        if !column.null {
            line.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            line.push_str(&format!(" DEFAULT {}", default.to_sql()));
        }
        println!("{}", line);

        if let Some(spatial) = &column.spatial {
            let storage = if spatial.geographic { "geography" } else { "geometry" };
            let mut dims = String::new();
            if spatial.has_z {
                dims.push('Z');
            }
            if spatial.has_m {
                dims.push('M');
            }
            println!(
                "    {} {} {}{} srid={} constraints={}",
                "↳".cyan(),
                storage,
                spatial.geometric_type,
                dims,
                spatial.srid,
                spatial.has_spatial_constraints
            );
        }
    }

    if !report.indexes.is_empty() {
        println!();
        println!("{}", "Indexes:".bold());
        for index in &report.indexes {
            let kind = match (index.spatial, index.unique) {
                (true, _) => "GIST".cyan().to_string(),
                (false, true) => "UNIQUE".yellow().to_string(),
                (false, false) => "BTREE".normal().to_string(),
            };
            println!("  {} {} ({})", index.name, kind, index.columns.join(", "));
        }
    }

    Ok(())
}

/// Check connection command
async fn check_connection_command(config: &Config) -> Result<()> {
    let adapter = connect(config).await?;
    adapter
        .test_connection()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    println!(
        "{} connected to {}:{}/{}",
        "✓".green(),
        adapter.host(),
        adapter.port(),
        adapter.database()
    );
    Ok(())
}

/// Init command - write a default config file
fn init_command(path: Option<&Path>, force: bool) -> Result<()> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG));
    if path.exists() && !force {
        return Err(anyhow::anyhow!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        ));
    }

    Config::default().save_to_file(path)?;
    println!("{} {}", "Created".green(), path.display());
    Ok(())
}

/// Connect using DATABASE_URL if set, otherwise the [database] section
async fn connect(config: &Config) -> Result<PostgresAdapter> {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        tracing::debug!("connecting with DATABASE_URL");
        return Ok(PostgresAdapter::from_connection_string(&url).await?);
    }

    let database = config.database.as_ref().ok_or_else(|| {
        anyhow::anyhow!(
            "No database configuration found. Set DATABASE_URL or add a [database] \
             section to {}.",
            DEFAULT_CONFIG
        )
    })?;
    Ok(PostgresAdapter::from_config(database).await?)
}

/// Load a migration, resolving unqualified tables in the configured schema
fn load_migration(config: &Config, file: &Path) -> Result<MigrationFile> {
    Ok(MigrationFile::from_file_in_schema(file, config.default_schema())?)
}

/// Qualify a table name with a schema unless it already has one
fn resolve_table(name: &str, schema: &str) -> TableIdentifier {
    match name.split_once('.') {
        Some(_) => TableIdentifier::parse(name),
        None => TableIdentifier::new(schema, name),
    }
}
