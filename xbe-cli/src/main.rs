//! xbe CLI
//!
//! Command-line client for the x-b-e JSON:API backend.
//!
//! # Usage
//!
//! ```bash
//! # Store a token for staging (reads it from stdin when --token is omitted)
//! xbe --base-url staging auth login
//!
//! # Show which token would be used and where it came from
//! xbe auth status
//!
//! # Fetch a collection
//! xbe api get /v1/material-types --fields material-types=name --limit 10
//! ```

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};
use xbe_core::{BaseUrl, DEFAULT_BASE_URL, RequestContext, XbeError};

mod api;
mod auth;

#[derive(Parser)]
#[command(name = "xbe")]
#[command(about = "Command-line client for the x-b-e API")]
#[command(version)]
struct Cli {
    /// API base URL, or one of: production, staging, local
    #[arg(long, global = true, env = "XBE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// API token; takes priority over XBE_TOKEN and stored credentials
    #[arg(long, global = true)]
    token: Option<String>,

    /// Send requests without an Authorization header
    #[arg(long, global = true)]
    no_auth: bool,

    /// Give up after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage stored credentials
    #[command(subcommand)]
    Auth(auth::AuthCommand),

    /// Send raw JSON:API requests
    #[command(subcommand)]
    Api(api::ApiCommand),
}

/// Settings shared by every command.
pub struct Globals {
    pub base_url: BaseUrl,
    pub token: Option<String>,
    pub no_auth: bool,
    pub ctx: RequestContext,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut ctx = RequestContext::background();
    if let Some(secs) = cli.timeout {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }
    let (ctx, canceller) = ctx.cancellable();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, cancelling");
            canceller.cancel();
        }
    });

    let globals = Globals {
        base_url: BaseUrl::normalize(&cli.base_url),
        token: cli.token,
        no_auth: cli.no_auth,
        ctx,
    };
    debug!("using base URL {}", globals.base_url);

    let result = match cli.command {
        Commands::Auth(command) => auth::run(command, &globals).await,
        Commands::Api(command) => api::run(command, &globals).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("xbe=debug,xbe_core=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn report(err: &anyhow::Error) {
    let Some(xbe) = err.downcast_ref::<XbeError>() else {
        eprintln!("Error: {:#}", err);
        return;
    };

    if xbe.is_auth_required() {
        eprintln!("Authentication required. Run 'xbe auth login' first.");
        return;
    }

    eprintln!("Error: {}", xbe);
    if let XbeError::Client(client_err) = xbe {
        let api_errors = client_err.api_errors();
        if !api_errors.is_empty() {
            for api_error in api_errors {
                eprintln!("  {}", api_error);
            }
        } else if let Some(body) = client_err.body() {
            let body = String::from_utf8_lossy(body);
            if !body.trim().is_empty() {
                eprintln!("{}", body.trim());
            }
        }
    }
}
