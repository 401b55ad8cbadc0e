//! Embedmap CLI - inspect embedded-value mappings and read/write entities

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use embedmap::config::{self, EmbedmapConfig};
use embedmap::mapping::SchemaRegistry;
use embedmap::storage::schema as ddl;
use embedmap::{ui, MappingContext, SchemaDocument};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "embedmap")]
#[command(version = "0.0.1")]
#[command(about = "Embedded-value schema mapping - nested value objects to prefixed columns and back")]
#[command(long_about = r#"
Embedmap resolves entity and embeddable definitions into flat, prefixed
physical columns and stores nested instances in SQLite.

Example usage:
  embedmap columns --schema schemas/patient.toml
  embedmap ddl --schema schemas/patient.toml --entity Patient
  embedmap put --entity Patient --data '{"id":"1","name":{"givenName":"John","surname":"Doe"}}'
  embedmap get --entity Patient --id 1
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file
    Init {
        /// Where to write the config
        #[arg(long, default_value = "embedmap.toml")]
        path: PathBuf,

        /// Database file to record in the config
        #[arg(short, long)]
        database: Option<String>,

        /// Schema file to record in the config
        #[arg(short, long)]
        schema: Option<String>,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Show the physical columns of each entity
    Columns {
        /// Path to the schema file
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Only show this entity
        #[arg(short, long)]
        entity: Option<String>,
    },

    /// Print CREATE TABLE statements
    Ddl {
        /// Path to the schema file
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Only show this entity
        #[arg(short, long)]
        entity: Option<String>,
    },

    /// Insert an instance given as JSON
    Put {
        /// Entity name
        #[arg(short, long)]
        entity: String,

        /// Instance as a JSON object
        #[arg(long)]
        data: String,

        /// Path to the schema file
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<String>,
    },

    /// Load an instance by primary key and print it as JSON
    Get {
        /// Entity name
        #[arg(short, long)]
        entity: String,

        /// Primary key value
        #[arg(long)]
        id: String,

        /// Path to the schema file
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<String>,
    },

    /// Delete an instance by primary key
    Delete {
        /// Entity name
        #[arg(short, long)]
        entity: String,

        /// Primary key value
        #[arg(long)]
        id: String,

        /// Path to the schema file
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let file_config = config::load_config(cli.config.as_deref())?.unwrap_or_default();

    match cli.command {
        Commands::Init { path, database, schema, force } => {
            let config = EmbedmapConfig {
                database: database.or(file_config.database),
                schema: schema.or(file_config.schema),
                debug: file_config.debug,
            };
            config::write_config(&path, &config, force)?;
            ui::success(&format!("Wrote {}", path.display()));
        }

        Commands::Columns { schema, entity } => {
            let registry = load_registry(schema.as_deref(), &file_config)?;
            let catalog = registry.build()?;
            for meta in catalog.iter().filter(|m| entity.as_deref().is_none_or(|e| e == m.name())) {
                ui::section(&format!("{} ({})", meta.name(), meta.table()));
                println!("{}", ui::columns_table(meta));
                let embeddings = ui::embeddings_table(meta);
                if !embeddings.is_empty() {
                    println!("{}", embeddings);
                }
            }
        }

        Commands::Ddl { schema, entity } => {
            let registry = load_registry(schema.as_deref(), &file_config)?;
            let catalog = registry.build()?;
            for meta in catalog.iter().filter(|m| entity.as_deref().is_none_or(|e| e == m.name())) {
                println!("{};\n", ddl::create_table_sql(meta));
            }
        }

        Commands::Put { entity, data, schema, database } => {
            let ctx = open_context(schema.as_deref(), database, &file_config)?;
            let instance: serde_json::Value = serde_json::from_str(&data)?;
            ctx.create_schema()?;
            ctx.persist(&entity, &instance)?;
            ui::success(&format!("Stored {} {}", entity, instance_id(&ctx, &entity, &instance)));
            ctx.close()?;
        }

        Commands::Get { entity, id, schema, database } => {
            let ctx = open_context(schema.as_deref(), database, &file_config)?;
            ctx.create_schema()?;
            match ctx.find_one(&entity, &id)? {
                Some(instance) => println!("{}", serde_json::to_string_pretty(&instance)?),
                None => ui::warn(&format!("No {} with id '{}'", entity, id)),
            }
            ctx.close()?;
        }

        Commands::Delete { entity, id, schema, database } => {
            let ctx = open_context(schema.as_deref(), database, &file_config)?;
            ctx.create_schema()?;
            if ctx.remove(&entity, &id)? {
                ui::success(&format!("Deleted {} '{}'", entity, id));
            } else {
                ui::warn(&format!("No {} with id '{}'", entity, id));
            }
            ctx.close()?;
        }
    }

    Ok(())
}

fn load_registry(schema: Option<&Path>, file_config: &EmbedmapConfig) -> anyhow::Result<SchemaRegistry> {
    let path = match (schema, file_config.schema.as_deref()) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(path)) => PathBuf::from(path),
        (None, None) => anyhow::bail!("no schema file given (use --schema or set `schema` in the config)"),
    };

    tracing::debug!("Loading schema from {}", path.display());
    let doc = SchemaDocument::from_path(&path)?;
    Ok(SchemaRegistry::from_document(doc))
}

fn open_context(
    schema: Option<&Path>,
    database: Option<String>,
    file_config: &EmbedmapConfig,
) -> anyhow::Result<MappingContext> {
    let registry = load_registry(schema, file_config)?;
    let database = match database.or_else(|| file_config.database.clone()) {
        Some(database) => database,
        None => config::default_database_path_in(&std::env::current_dir()?)
            .to_string_lossy()
            .into_owned(),
    };

    if database != config::IN_MEMORY {
        config::ensure_db_dir(Path::new(&database))?;
    }
    ui::info("Database", &database);

    let config = EmbedmapConfig {
        database: Some(database),
        ..file_config.clone()
    };
    Ok(MappingContext::init(&config, &registry)?)
}

fn instance_id(ctx: &MappingContext, entity: &str, instance: &serde_json::Value) -> String {
    ctx.metadata(entity)
        .ok()
        .and_then(|meta| instance.get(&meta.primary_key().path).cloned())
        .map(|id| id.to_string())
        .unwrap_or_default()
}
