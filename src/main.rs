//! sheetserve server entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use sheetserve::api::ApiServer;
use sheetserve::config::{RuntimeEnv, ServerConfig};
use sheetserve::credentials::EnvCredentialsResolver;
use sheetserve::store::SheetsStoreFactory;

/// Expose a spreadsheet document as a REST resource
#[derive(Parser, Debug)]
#[command(name = "sheetserve")]
#[command(version, about, long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind to
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Allowed CORS origin (repeatable; permissive when omitted)
    #[arg(long = "cors-origin")]
    cors_origins: Vec<String>,

    /// Directory holding a locally placed key file (defaults to the
    /// working directory)
    #[arg(long)]
    project_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        cors_origins: args.cors_origins,
    };
    let env = RuntimeEnv::from_env();
    let resolver = match args.project_root {
        Some(root) => {
            EnvCredentialsResolver::new(&env, root, std::env::temp_dir().join("sheetserve"))
        }
        None => EnvCredentialsResolver::from_runtime(&env),
    };
    let factory = SheetsStoreFactory::new(Arc::new(resolver));

    if let Err(err) = ApiServer::new(factory, config).start().await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
