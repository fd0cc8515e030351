use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ftsgate::{
    highlight, AppConfig, Document, HighlightOptions, Index, LoggingConfig, Schema,
    SmartQueryOptions,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ftsgate")]
#[command(about = "Index and search documents in a Tantivy index", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML file with [index], [schema] and [logging] sections
    #[arg(short, long, env = "FTSGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Index directory, overriding the configuration file
    #[arg(short, long)]
    index: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add documents from a JSON-lines file ("-" for stdin) in one transaction
    Index {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Delete documents by id in one transaction
    Delete {
        #[arg(value_name = "ID", required = true)]
        ids: Vec<String>,
    },

    /// Free-text search; prints matching ids, best first
    Search {
        text: String,

        #[arg(short, long)]
        limit: Option<usize>,

        /// Match words within this edit distance
        #[arg(long)]
        fuzzy: Option<u8>,

        /// Text fields to search (default: all)
        #[arg(short, long = "field")]
        fields: Vec<String>,
    },

    /// Print TEXT with words matching QUERY wrapped in <b></b>
    Highlight {
        text: String,

        query: String,

        #[arg(long, default_value = "0")]
        fuzzy: u8,
    },

    /// Print the terms a field's tokenizer produces for TEXT
    Terms {
        text: String,

        #[arg(short, long)]
        field: Option<String>,
    },

    /// Print index statistics as JSON
    Stats,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.log_level.as_str().into());

    if logging.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

fn open_index(config: &AppConfig, schema: Schema) -> Result<Index> {
    if config.index.path.is_none() {
        bail!("no index directory configured; pass --index or set [index].path");
    }
    Index::open(config.index.clone(), schema).context("Failed to open index")
}

fn read_documents(schema: &Schema, input: &Path) -> Result<Vec<Document>> {
    let reader: Box<dyn BufRead> = if input.as_os_str() == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(input)
            .with_context(|| format!("Failed to open {}", input.display()))?;
        Box::new(BufReader::new(file))
    };

    let mut documents = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let json: serde_json::Value = serde_json::from_str(&line)
            .with_context(|| format!("line {}: invalid JSON", number + 1))?;
        let document = Document::from_json(schema, &json)
            .with_context(|| format!("line {}: invalid document", number + 1))?;
        documents.push(document);
    }

    Ok(documents)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = cli.index {
        config.index.path = Some(path);
    }

    init_tracing(&config.logging);

    let schema = Schema::from_definition(&config.schema).context("Invalid schema")?;

    match cli.command {
        Commands::Index { input } => {
            let documents = read_documents(&schema, &input)?;
            let index = open_index(&config, schema)?;
            let added = index.add_documents(&documents)?;
            info!(documents = added, "Indexed documents");
            println!("{added}");
        }

        Commands::Delete { ids } => {
            let index = open_index(&config, schema)?;
            index.transaction(|| {
                for id in &ids {
                    index.delete_document(id)?;
                }
                Ok(())
            })?;
            info!(documents = ids.len(), "Deleted documents");
        }

        Commands::Search {
            text,
            limit,
            fuzzy,
            fields,
        } => {
            let index = open_index(&config, schema)?;
            let limit = limit.unwrap_or_else(|| index.default_limit());
            let options = SmartQueryOptions {
                fuzzy_distance: fuzzy,
                ..SmartQueryOptions::default()
            };

            let ids = if fields.is_empty() {
                index.search_text(&text, limit, &options)?
            } else {
                let query = index.smart_query(&fields, &text, &options)?;
                index.search(&query, limit)?
            };

            for id in ids {
                println!("{id}");
            }
        }

        Commands::Highlight { text, query, fuzzy } => {
            println!("{}", highlight(&text, &query, &HighlightOptions::fuzzy(fuzzy)));
        }

        Commands::Terms { text, field } => {
            let tokenizer = match &field {
                Some(field) => schema.tokenizer_for(field),
                None => schema.default_tokenizer(),
            };
            for term in tokenizer.terms(&text) {
                println!("{term}");
            }
        }

        Commands::Stats => {
            let index = open_index(&config, schema)?;
            println!("{}", serde_json::to_string_pretty(&index.stats()?)?);
        }
    }

    Ok(())
}
