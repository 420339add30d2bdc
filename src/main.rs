//! catalog-scraper - headless-browser scraper for a "load more" e-commerce catalog

use anyhow::Result;
use catalog_scraper::catalog::pages::Page;
use catalog_scraper::commands::ScrapeCommand;
use catalog_scraper::config::{Config, FailurePolicy};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "catalog-scraper",
    version,
    about = "Scrape the e-commerce test catalog into one CSV file per page",
    long_about = "Opens every catalog page in headless Chromium, expands it with \"load more\" \
                  until all items are shown, and writes <page>.csv with \
                  title, description, price, rating and num_of_reviews columns."
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the CSV files
    #[arg(short, long, env = "CATALOG_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Catalog root URL
    #[arg(long, env = "CATALOG_BASE_URL")]
    base_url: Option<String>,

    /// Only scrape these pages (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    page: Vec<Page>,

    /// Keep going when a page fails instead of stopping
    #[arg(long)]
    keep_going: bool,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the catalog pages and their URLs
    Pages,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if cli.keep_going {
        config.on_error = FailurePolicy::Continue;
    }
    if cli.headful {
        config.browser.headless = false;
    }

    if let Some(Commands::Pages) = cli.command {
        println!("{:<10} {}", "Page", "URL");
        println!("{:-<10} {:-<60}", "", "");
        for page in Page::all() {
            println!("{:<10} {}", page.name(), page.url(&config.base_url));
        }
        return Ok(ExitCode::SUCCESS);
    }

    let cmd = ScrapeCommand::new(config).with_pages(&cli.page);
    let report = cmd.execute().await?;

    info!(
        "Done: {} of {} pages written, {} records",
        report.written(),
        report.pages.len(),
        report.total_records()
    );

    if report.has_failures() {
        let failed: Vec<_> = report.failed().iter().map(|p| p.to_string()).collect();
        eprintln!("Failed pages: {}", failed.join(", "));
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}
