//! Example of using the peer-census crawler.

use clap::Parser;
use log::LevelFilter;
use peer_census_crawler::{CrawlerBuilder, CrawlerMessage, Report, StaticCountryLookup};
use std::net::IpAddr;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Seed peer address, may be repeated.
    #[arg(short, long = "seed", required = true)]
    seeds: Vec<String>,

    /// Default RPC port of the network.
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Maximum number of concurrent tasks for crawling.
    #[arg(short, long, default_value = "64")]
    concurrent_tasks: usize,

    /// Retries per endpoint after the first failed try.
    #[arg(short, long, default_value = "2")]
    retries: usize,

    /// Timeout of a single neighbor request, in seconds.
    #[arg(short, long, default_value = "10")]
    timeout: u64,

    /// Pause between retries of an endpoint, in milliseconds.
    #[arg(long, default_value = "1000")]
    retry_delay: u64,

    /// Custom user agent (optional).
    #[arg(short, long)]
    user_agent: Option<String>,

    /// Country attribution as IP=CODE, may be repeated.
    #[arg(long = "country", value_parser = parse_country)]
    countries: Vec<(IpAddr, String)>,

    /// Log level.
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn parse_country(value: &str) -> Result<(IpAddr, String), String> {
    let (ip, country) = value
        .split_once('=')
        .ok_or_else(|| format!("Expected IP=CODE, got {value}"))?;
    let ip = ip
        .parse::<IpAddr>()
        .map_err(|_| format!("Invalid IP address: {ip}"))?;
    Ok((ip, country.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = match args.log_level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    // Configure fern logger
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] {} - {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log_level)
        .chain(std::io::stderr())
        .apply()?;

    log::info!("CRAWLING THE NETWORK FROM {} SEEDS", args.seeds.len());

    let mut builder = CrawlerBuilder::new()
        .with_default_port(args.port)
        .with_retry_budget(args.retries)
        .with_retry_delay(Duration::from_millis(args.retry_delay))
        .with_peer_timeout(Duration::from_secs(args.timeout))
        .with_max_concurrent_tasks(args.concurrent_tasks)?;
    if let Some(user_agent) = args.user_agent.clone() {
        log::debug!("Using custom user agent: {user_agent}");
        builder = builder.with_user_agent(user_agent);
    }
    log::debug!("Using {} concurrent tasks", args.concurrent_tasks);

    let crawler = builder.build()?;
    let mut peers_rx = crawler.crawl(args.seeds.clone());

    while let Some(peer_msg) = peers_rx.recv().await {
        match peer_msg {
            CrawlerMessage::Finished(result) => {
                let lookup: StaticCountryLookup = args.countries.iter().cloned().collect();
                let report = Report::new(&result, &lookup);
                print!("{report}");
                log::info!(
                    "Crawl finished, {} of {} peers unreachable",
                    report.unresponsive.len(),
                    report.found.len()
                );
                return Ok(());
            }
            CrawlerMessage::Failed(err) => {
                log::error!("{err}");
                return Err(err.into());
            }
            progress => log::info!("{progress}"),
        }
    }

    Err("Crawler stopped without a result".into())
}
