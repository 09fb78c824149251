mod scrape;
mod show;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tmboard_core::BoardTable;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tmboard-cli")]
#[command(about = "Leaderboard snapshot command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Transcode one styled name fragment into `$` markup
    Transcode {
        /// HTML fragment, e.g. `<a><span style="color:#ff0000">R</span>ed</a>`
        html: String,
    },
    /// Extract a table from a saved page or a live URL and print it as JSON
    Extract {
        /// Table layout to read: results or maps
        table: BoardTable,
        #[command(flatten)]
        source: PageSource,
        /// Drop rows with too few cells instead of failing
        #[arg(long)]
        skip_malformed: bool,
        /// Request timeout when fetching with --url
        #[arg(
            long,
            env = "TMBOARD_SCRAPER_REQUEST_TIMEOUT_SECS",
            default_value_t = 30
        )]
        timeout_secs: u64,
        #[arg(
            long,
            env = "TMBOARD_SCRAPER_USER_AGENT",
            default_value = "tmboard/0.1 (leaderboard-sync)"
        )]
        user_agent: String,
    },
    /// Print the cached snapshot of a table
    Show {
        /// Table to show: results or maps
        table: BoardTable,
    },
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct PageSource {
    /// Read the page from a local file
    #[arg(long)]
    file: Option<PathBuf>,
    /// Fetch the page from this URL
    #[arg(long)]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let log_level = std::env::var("TMBOARD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Transcode { html } => println!("{}", scrape::run_transcode(&html)?),
        Commands::Extract {
            table,
            source,
            skip_malformed,
            timeout_secs,
            user_agent,
        } => {
            let body = match (source.file, source.url) {
                (Some(path), _) => scrape::read_page(&path).await?,
                (None, Some(url)) => scrape::fetch_page(&url, timeout_secs, &user_agent).await?,
                (None, None) => anyhow::bail!("either --file or --url is required"),
            };
            println!("{}", scrape::run_extract(table, &body, skip_malformed)?);
        }
        Commands::Show { table } => {
            let pool = tmboard_db::connect_pool_from_env().await?;
            let store = tmboard_db::PgSnapshotStore::new(pool);
            println!("{}", show::run_show(&store, table).await?);
        }
    }

    Ok(())
}
