mod commands;
mod serve;

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use effeff_storage::StoreConfig;

/// Log filter used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "effeff=info,effeff_storage=info,tower_http=info";

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Form submission service.
#[derive(Parser)]
#[command(name = "effeff", version, about = "Form submission service")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP submission service
    Serve(ServeArgs),

    /// Validate a submission against a form definition without a store
    Validate {
        /// Path to the form JSON (with its questions)
        form: PathBuf,
        /// Path to the submission JSON (`{answers, metadata, started_at}`)
        submission: PathBuf,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Base URL of the document store
    #[arg(long, env = "SURREAL_URL", default_value = "http://localhost:8000")]
    store_url: String,

    #[arg(long, env = "SURREAL_USER", default_value = "root")]
    store_user: String,

    #[arg(long, env = "SURREAL_PASS", default_value = "formflow_secret", hide_env_values = true)]
    store_pass: String,

    /// Store namespace
    #[arg(long, env = "SURREAL_NS", default_value = "formflow")]
    store_ns: String,

    /// Store database
    #[arg(long, env = "SURREAL_DB", default_value = "main")]
    store_db: String,

    /// Deadline for each store call, in seconds
    #[arg(long, env = "SURREAL_TIMEOUT_SECS", default_value_t = 10)]
    store_timeout_secs: u64,

    /// Health probes (one second apart) before starting
    #[arg(long, env = "SURREAL_WAIT_ATTEMPTS", default_value_t = 30)]
    store_wait_attempts: u32,

    /// Requests per minute per caller
    #[arg(long, env = "EFFEFF_RATE_LIMIT", default_value_t = 60)]
    rate_limit: u64,

    /// Comma-separated allowed CORS origins
    #[arg(
        long,
        env = "CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:5173,http://localhost:3000"
    )]
    cors_origins: Vec<String>,

    /// Whole-request timeout, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,
}

impl ServeArgs {
    fn into_config(self) -> serve::ServeConfig {
        serve::ServeConfig {
            port: self.port,
            store: StoreConfig {
                base_url: self.store_url,
                user: self.store_user,
                pass: self.store_pass,
                namespace: self.store_ns,
                database: self.store_db,
                timeout: Duration::from_secs(self.store_timeout_secs),
            },
            store_wait_attempts: self.store_wait_attempts,
            rate_limit: self.rate_limit,
            cors_origins: self.cors_origins,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            init_tracing();
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("failed to create tokio runtime: {}", e);
                    process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(serve::start_server(args.into_config())) {
                tracing::error!(error = %e, "server error");
                process::exit(1);
            }
        }
        Commands::Validate { form, submission } => {
            commands::validate::cmd_validate(&form, &submission, cli.output, cli.quiet);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}
