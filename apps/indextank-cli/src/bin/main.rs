use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use indextank_client::{Client, ClientConfig, Document, Index, SearchOptions};
use indextank_core::config::{expand_path, Config};

#[derive(Parser)]
#[command(name = "indextank", version, about = "Command line client for IndexTank hosted search")]
struct Cli {
    /// TOML file with an [indextank] table; defaults to indextank.toml + indextank.<env>.toml
    #[arg(long, global = true)]
    config: Option<String>,

    /// Private URL (http://:password@key.api.indextank.com); wins over the config file
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every index on the account
    Indexes,
    /// Show metadata for one index
    Info { index: String },
    /// Create an index and, unless --no-wait, block until it has started
    Create {
        index: String,
        #[arg(long)]
        no_wait: bool,
        /// Give up waiting after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Delete an index
    Delete { index: String },
    /// Add a single document with one `text` field
    Add { index: String, docid: String, text: String },
    /// Add documents from a JSON file holding [{"docid": .., "fields": {..}}, ..]
    AddBatch { index: String, file: PathBuf },
    /// Search an index
    Search {
        index: String,
        query: String,
        /// Comma separated fields to fetch
        #[arg(long, default_value = "text")]
        fetch: String,
        #[arg(long)]
        no_snippets: bool,
    },
    /// Autocomplete suggestions for a prefix
    Autocomplete { index: String, text: String },
}

fn client_config(cli: &Cli) -> Result<ClientConfig> {
    let config = match &cli.config {
        Some(path) => Config::from_file(&expand_path(path))?,
        None => Config::load()?,
    };
    let mut client_config = config.client_config()?;
    if let Some(url) = &cli.url {
        let from_url = ClientConfig::from_private_url(url);
        client_config.credentials = from_url.credentials;
    }
    Ok(client_config)
}

fn print(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = client_config(&cli).context("loading configuration")?;
    if let Command::Create { timeout: Some(secs), .. } = &cli.command {
        config.wait = config.wait.with_timeout(Duration::from_secs(*secs));
    }
    let client = Client::new(config)?;

    match cli.command {
        Command::Indexes => {
            let indexes = client.list_indexes()?;
            let listing: serde_json::Map<String, Value> =
                indexes.iter().map(|(name, index)| (name.clone(), index.to_array())).collect();
            print(&Value::Object(listing))?;
        }
        Command::Info { index } => print(&client.get_index(&index)?.to_array())?,
        Command::Create { index, no_wait, .. } => {
            let created = if no_wait {
                client.create_index(&index, false)?
            } else {
                let spinner = ProgressBar::new_spinner();
                spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")?);
                spinner.set_message(format!("waiting for '{index}' to start"));
                spinner.enable_steady_tick(Duration::from_millis(120));
                let created = client.create_index(&index, true);
                spinner.finish_and_clear();
                created?
            };
            print(&created.to_array())?;
        }
        Command::Delete { index } => {
            client.delete_index(&index)?;
            eprintln!("deleted '{index}'");
        }
        Command::Add { index, docid, text } => {
            let mut fields = serde_json::Map::new();
            fields.insert("text".to_string(), Value::String(text));
            print(&Index::new(&client, index).add_document(&docid, &fields, None)?)?;
        }
        Command::AddBatch { index, file } => {
            let raw = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let documents: Vec<Document> =
                serde_json::from_str(&raw).with_context(|| format!("parsing {}", file.display()))?;
            print(&Index::new(&client, index).add_documents(&documents)?)?;
        }
        Command::Search { index, query, fetch, no_snippets } => {
            let mut options = SearchOptions::fields(fetch.split(',').map(str::trim).filter(|f| !f.is_empty()));
            if no_snippets {
                options = options.without_snippets();
            }
            let results = Index::new(&client, index).search_with(&query, &options)?;
            let ranked: Vec<Value> = results
                .ranked()
                .map(|(docid, doc)| json!({ "docid": docid, "fields": doc.fields, "snippets": doc.snippets }))
                .collect();
            print(&json!({ "matches": results.matches, "results": ranked }))?;
        }
        Command::Autocomplete { index, text } => {
            let suggestions = Index::new(&client, index).autocomplete(&text)?;
            print(&json!(suggestions))?;
        }
    }
    Ok(())
}
