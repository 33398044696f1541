use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use feedmill::config::Config;
use feedmill::feed::FeedParser;
use feedmill::icon::{FaviconResolver, Fetcher, HttpFetcher, IconResolver, NoIcons, PassthroughIconStore};
use feedmill::sanitize::BasicSanitizer;
use feedmill::schedule::PollScheduler;

/// Get the default config file path (~/.config/feedmill/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("feedmill")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(
    name = "feedmill",
    version,
    about = "Parse an Atom/RSS/RDF feed and print the normalized result as JSON"
)]
struct Args {
    /// Feed file path or http(s) URL
    source: String,

    /// Feed URL to record as the feed's identity (defaults to SOURCE)
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Skip favicon lookup
    #[arg(long)]
    no_icons: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let bytes = read_source(&args.source, &config).await?;
    let feed_url = args.url.clone().unwrap_or_else(|| args.source.clone());

    if args.no_icons {
        run(&config, &feed_url, &bytes, NoIcons).await
    } else {
        let fetcher = HttpFetcher::new(&config.fetch, config.fetch.max_icon_bytes)
            .context("Failed to build icon HTTP client")?;
        let icons = FaviconResolver::new(fetcher, PassthroughIconStore::new());
        run(&config, &feed_url, &bytes, icons).await
    }
}

/// Reads a local file, or fetches an http(s) URL.
async fn read_source(source: &str, config: &Config) -> Result<Vec<u8>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let fetcher = HttpFetcher::new(&config.fetch, config.fetch.max_feed_bytes)
            .context("Failed to build HTTP client")?;
        let response = fetcher
            .get(source)
            .await
            .with_context(|| format!("Failed to fetch {source}"))?;
        if response.status != 200 {
            anyhow::bail!("Fetching {source} returned HTTP {}", response.status);
        }
        Ok(response.body)
    } else {
        std::fs::read(source).with_context(|| format!("Failed to read feed file '{source}'"))
    }
}

async fn run<I: IconResolver>(config: &Config, feed_url: &str, bytes: &[u8], icons: I) -> Result<()> {
    let parser = FeedParser::from_config(config, BasicSanitizer, icons);
    let mut parsed = parser
        .parse(feed_url, bytes)
        .await
        .with_context(|| format!("Failed to parse feed {feed_url}"))?;

    let scheduler = PollScheduler::new(config.schedule);
    let next = scheduler.schedule_next_update_now(&mut parsed.feed);
    tracing::info!(
        feed = %feed_url,
        stories = parsed.stories.len(),
        next_update = %next,
        "Parsed feed"
    );

    let json = serde_json::to_string_pretty(&parsed).context("Failed to serialize feed")?;
    println!("{json}");
    Ok(())
}
