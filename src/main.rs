use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gsc_etl::dates::parse_date;
use gsc_etl::{EtlJob, GscEtl};

/// Load Search Console URL and keyword performance into DuckDB tables.
#[derive(Parser, Debug)]
#[command(name = "gsc-etl", version)]
struct Args {
    /// Search Console property, e.g. `https://example.com/` or `sc-domain:example.com`
    #[arg(long, env = "GSC_SITE")]
    site: String,

    /// OAuth client secrets JSON
    #[arg(long, env = "GSC_CREDENTIALS", default_value = "client_secret.json")]
    credentials: PathBuf,

    /// Token cache file (defaults to the platform cache directory)
    #[arg(long, env = "GSC_TOKEN_CACHE")]
    token_cache: Option<PathBuf>,

    /// First day to extract (YYYY-MM-DD)
    #[arg(long, env = "GSC_START_DATE")]
    start_date: String,

    /// Last day to extract, inclusive (YYYY-MM-DD)
    #[arg(long, env = "GSC_END_DATE")]
    end_date: String,

    /// Warehouse project; one DuckDB file per project
    #[arg(long, env = "GSC_PROJECT")]
    project: String,

    /// Destination for URL-level data (`dataset.table` or `table`)
    #[arg(long, env = "GSC_URL_TABLE")]
    url_table: String,

    /// Destination for keyword-level data (`dataset.table` or `table`)
    #[arg(long, env = "GSC_KEYWORD_TABLE")]
    keyword_table: String,

    /// Directory holding the warehouse databases
    #[arg(long, env = "GSC_WAREHOUSE_DIR")]
    warehouse_dir: Option<PathBuf>,

    /// HTTP timeout in seconds
    #[arg(long, env = "GSC_TIMEOUT_SECS", default_value_t = 120)]
    timeout_secs: u64,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gsc_etl=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(args: Args) -> gsc_etl::Result<()> {
    let start = parse_date(&args.start_date)?;
    let end = parse_date(&args.end_date)?;
    let job = EtlJob::new(
        &args.site,
        start,
        end,
        &args.project,
        &args.url_table,
        &args.keyword_table,
    )?;

    let mut builder = GscEtl::builder()
        .credentials(&args.credentials)
        .timeout(Duration::from_secs(args.timeout_secs));
    if let Some(path) = &args.token_cache {
        builder = builder.token_cache(path);
    }
    if let Some(dir) = &args.warehouse_dir {
        builder = builder.warehouse_dir(dir);
    }
    let etl = builder.build()?;
    info!("{}", etl);

    let summary = etl.run(&job)?;
    info!(
        "Keyword rows: {} extracted, {} loaded into {}",
        summary.keyword.extracted, summary.keyword.loaded, job.keyword_table
    );
    info!(
        "URL rows: {} extracted, {} loaded into {}",
        summary.url.extracted, summary.url.loaded, job.url_table
    );
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
