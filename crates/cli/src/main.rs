use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use folio_core::artifact::{ArtifactDir, HtmlSnapshot, StampStyle};
use folio_core::config::RunConfig;
use folio_core::enrich::{SiteNews, YahooQuotes, DEFAULT_NEWS_URL, DEFAULT_QUOTE_URL};
use folio_core::merge::TableMerger;
use folio_core::workflow::{self, Enrichment, RunReport};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "folio", about = "Cookie-authenticated portfolio scraper")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Attach quote data and recent news to every symbol
    #[arg(long, global = true)]
    enrich: bool,

    /// Output directory (overrides FOLIO_OUTPUT_DIR)
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    /// Exported cookie file (overrides FOLIO_COOKIE_FILE)
    #[arg(long, global = true)]
    cookies: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Snapshot every tab, write timestamped JSON and a PDF (default)
    Capture,
    /// Write portfolio-data.json and list the tab controls found
    Parse,
    /// Save the account page as a PDF
    Print,
    /// Merge tables from saved pages without touching the network
    Extract {
        /// TAB=FILE pairs, merged in order (use - for stdin)
        #[arg(required = true)]
        pages: Vec<String>,
    },
}

fn main() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = RunConfig::from_env();
    if let Some(out) = &cli.out {
        config.output_dir = out.clone();
    }
    if let Some(cookies) = &cli.cookies {
        config.cookie_file = cookies.clone();
    }

    let quotes = YahooQuotes {
        base_url: config.quote_url.clone().unwrap_or_else(|| DEFAULT_QUOTE_URL.to_string()),
    };
    let news = SiteNews {
        base_url: config.news_url.clone().unwrap_or_else(|| DEFAULT_NEWS_URL.to_string()),
    };
    let enrichment = if cli.enrich {
        Enrichment {
            quotes: Some(&quotes),
            news: Some(&news),
        }
    } else {
        Enrichment::default()
    };

    match cli.command.unwrap_or(Commands::Capture) {
        Commands::Capture => {
            let report = workflow::capture(&config, &HtmlSnapshot, enrichment).context("capture failed")?;
            report_done(&report);
        }
        Commands::Parse => {
            let report = workflow::parse(&config, &HtmlSnapshot, enrichment).context("parse failed")?;
            report_done(&report);
        }
        Commands::Print => {
            let report = workflow::print(&config, &HtmlSnapshot).context("print failed")?;
            report_done(&report);
        }
        Commands::Extract { pages } => extract(&pages, cli.out.as_deref())?,
    }
    Ok(())
}

/// Merge saved pages tab by tab. Prints the JSON unless `out` is given.
fn extract(pages: &[String], out: Option<&Path>) -> Result<()> {
    let mut merger = TableMerger::new();
    for page in pages {
        let (tab, file) = match page.split_once('=') {
            Some((tab, file)) if !tab.is_empty() && !file.is_empty() => (tab, file),
            _ => bail!("expected TAB=FILE, got '{}'", page),
        };
        let html = read_page(file)?;
        let records = folio_core::extract(&html);
        let stats = merger.merge_tab(tab, &records);
        info!(%tab, file, rows = stats.rows, merged = stats.merged, "extracted tab");
    }

    let data = merger.finish();
    workflow::log_summary(&data);
    match out {
        Some(root) => {
            let dir = ArtifactDir::create(root, StampStyle::Compact.now())?;
            let path = dir.write_json(&data, &dir.file("portfolio-data.json"))?;
            info!(path = %path.display(), "saved portfolio data");
        }
        None => println!("{}", data.to_json_pretty()?),
    }
    Ok(())
}

fn read_page(file: &str) -> Result<String> {
    if file == "-" {
        use std::io::Read;
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file))
}

fn report_done(report: &RunReport) {
    for path in &report.artifacts {
        info!(path = %path.display(), "wrote");
    }
    info!(symbols = report.symbols.len(), files = report.artifacts.len(), "done");
}
