//! Pagetrawl main entry point
//!
//! This is the command-line interface for the Pagetrawl page scraper.

use clap::Parser;
use pagetrawl::config::{load_config_with_hash, validate, Config, CrawlConfig, OutputConfig};
use pagetrawl::crawler::{fetch_table, preview, CrawlEvent, Engine};
use pagetrawl::output::{
    default_export_name, format_results, print_summary, table_to_csv_string, write_csv,
    write_json, write_table_csv,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Values shown by --preview
const PREVIEW_LIMIT: usize = 200;

/// Pagetrawl: a selector-driven page scraper
///
/// Fetches pages, extracts values with a CSS selector, optionally follows a
/// "next page" link up to a page limit, and exports the records.
#[derive(Parser, Debug)]
#[command(name = "pagetrawl")]
#[command(version = "1.0.0")]
#[command(about = "A selector-driven page scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (flags override its values)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Start URL
    #[arg(long)]
    url: Option<String>,

    /// CSS selector for values to extract
    #[arg(short = 's', long)]
    selector: Option<String>,

    /// Attribute to read (href, src, ...); "text" for visible text
    #[arg(short = 'a', long)]
    attribute: Option<String>,

    /// CSS selector for the "next page" link
    #[arg(short = 'n', long = "next")]
    next_selector: Option<String>,

    /// Maximum number of pages to fetch
    #[arg(short = 'p', long)]
    max_pages: Option<u32>,

    /// Delay between pages in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// User-Agent header
    #[arg(long)]
    user_agent: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Write results to this CSV file
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Write results to this JSON file
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Export to timestamped CSV and JSON files in the current directory
    #[arg(long, conflicts_with_all = ["csv", "json"])]
    export: bool,

    /// Fetch only the start page and show what the selector matches
    #[arg(long, conflicts_with = "table")]
    preview: bool,

    /// Extract the table matching this selector from the start page
    #[arg(long, value_name = "SELECTOR")]
    table: Option<String>,

    /// Form field (key=value) to POST to the start URL before table extraction
    #[arg(long = "form", value_name = "KEY=VALUE", value_parser = parse_form_field, requires = "table")]
    form: Vec<(String, String)>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;

    if cli.preview {
        handle_preview(&config.crawl).await
    } else if let Some(table_selector) = &cli.table {
        handle_table(&config.crawl, table_selector, &cli.form, &config.output).await
    } else {
        handle_crawl(config, cli.export).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pagetrawl=info,warn"),
            1 => EnvFilter::new("pagetrawl=debug,info"),
            2 => EnvFilter::new("pagetrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Parses a `key=value` form field
fn parse_form_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}

/// Loads the config file if given, applies flag overrides, and validates the result
fn build_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path).map_err(|e| {
                tracing::error!("Failed to load configuration: {}", e);
                e
            })?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            let (Some(url), Some(selector)) = (&cli.url, &cli.selector) else {
                return Err("either a CONFIG file or both --url and --selector are required".into());
            };
            Config {
                crawl: CrawlConfig::new(url.as_str(), selector.as_str()),
                output: OutputConfig::default(),
            }
        }
    };

    let crawl = &mut config.crawl;
    if let Some(url) = &cli.url {
        crawl.start_url = url.clone();
    }
    if let Some(selector) = &cli.selector {
        crawl.selector = selector.clone();
    }
    if cli.attribute.is_some() {
        crawl.attribute = cli.attribute.clone();
    }
    if cli.next_selector.is_some() {
        crawl.next_selector = cli.next_selector.clone();
    }
    if let Some(max_pages) = cli.max_pages {
        crawl.max_pages = max_pages;
    }
    if let Some(delay_ms) = cli.delay_ms {
        crawl.delay_ms = delay_ms;
    }
    if let Some(user_agent) = &cli.user_agent {
        crawl.user_agent = user_agent.clone();
    }
    if let Some(timeout_secs) = cli.timeout_secs {
        crawl.timeout_secs = timeout_secs;
    }
    if let Some(csv) = &cli.csv {
        config.output.csv_path = Some(csv.display().to_string());
    }
    if let Some(json) = &cli.json {
        config.output.json_path = Some(json.display().to_string());
    }

    validate(&config.crawl)?;
    Ok(config)
}

/// Handles --preview: single page, no pagination, no export
async fn handle_preview(config: &CrawlConfig) -> Result<(), Box<dyn std::error::Error>> {
    let values = preview(config).await?;
    for value in values.iter().take(PREVIEW_LIMIT) {
        println!("{}", value);
    }
    println!("\nPreview: {} items found on single page", values.len());
    Ok(())
}

/// Handles --table: fetch (or form-post) the start page and extract one table
async fn handle_table(
    config: &CrawlConfig,
    table_selector: &str,
    form: &[(String, String)],
    output: &OutputConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let form = (!form.is_empty()).then_some(form);
    let Some(table) = fetch_table(config, table_selector, form).await? else {
        println!("No table found on the page.");
        return Ok(());
    };

    if table.is_empty() {
        println!("No data found in the table");
        return Ok(());
    }

    print!("{}", table_to_csv_string(&table));
    println!("\nSuccessfully extracted {} records", table.rows.len());

    if let Some(path) = &output.csv_path {
        write_table_csv(&table, Path::new(path))?;
        println!("Data saved to {}", path);
    }
    Ok(())
}

/// Handles the main crawl: runs on a worker task, streams status, exports on success
async fn handle_crawl(config: Config, export: bool) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::new();
    let mut handle = engine.spawn(config.crawl)?;
    let cancel = handle.cancel_flag();

    let result = loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(CrawlEvent::Status(status)) => tracing::debug!("status: {}", status),
                Some(CrawlEvent::Finished(result)) => break result,
                Some(CrawlEvent::Failed(e)) => {
                    tracing::error!("Crawl failed: {}", e);
                    return Err(e.into());
                }
                None => return Err("crawl worker stopped without a result".into()),
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Interrupt received, stopping after the current page");
                cancel.cancel();
            }
        }
    };

    print!("{}", format_results(&result));
    print_summary(&result);

    if result.is_empty() {
        println!("No results to export.");
        return Ok(());
    }

    let now = chrono::Utc::now();
    let csv_path = config
        .output
        .csv_path
        .or_else(|| export.then(|| default_export_name("pagetrawl", "csv", now)));
    let json_path = config
        .output
        .json_path
        .or_else(|| export.then(|| default_export_name("pagetrawl", "json", now)));

    if let Some(path) = csv_path {
        write_csv(&result, Path::new(&path))?;
        println!("Saved CSV to {}", path);
    }
    if let Some(path) = json_path {
        write_json(&result, Path::new(&path))?;
        println!("Saved JSON to {}", path);
    }

    Ok(())
}
