//! XS2A Gateway - Entry Point

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use xs2a_gateway::config::api;
use xs2a_gateway::{AisGateway, BankClient, Config, server};

#[derive(Parser, Debug)]
#[command(name = "xs2a-gateway")]
#[command(about = "OAuth2/PKCE client and proxy for PSD2 account information services")]
#[command(version)]
struct Cli {
    /// PEM encoded client certificate (overrides XS2A_CERT_FILE, required if it is unset)
    #[arg(long)]
    cert: Option<PathBuf>,

    /// PEM encoded private key (overrides XS2A_KEY_FILE, required if it is unset)
    #[arg(long)]
    key: Option<PathBuf>,

    /// Env file with the bank settings; variables already set take precedence
    #[arg(long, default_value = api::ENV_FILE, env = "XS2A_ENV_FILE")]
    env_file: PathBuf,

    /// HTTP server port
    #[arg(long, default_value_t = api::LISTEN_PORT, env = "PORT")]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

/// Outcome of loading the env file, logged once tracing is up.
enum EnvFile {
    Loaded,
    Missing,
}

/// Load the env file. A missing file is not an error; the process environment may suffice.
fn load_env_file(path: &Path) -> anyhow::Result<EnvFile> {
    match dotenv::from_path(path) {
        Ok(()) => Ok(EnvFile::Loaded),
        Err(dotenv::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            Ok(EnvFile::Missing)
        }
        Err(err) => Err(err).with_context(|| format!("Cannot load {}", path.display())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // PORT and RUST_LOG may be set in the env file, so parse again once it is loaded.
    let env_file = Cli::parse().env_file;
    let env_file_status = load_env_file(&env_file)?;
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting XS2A gateway");
    match env_file_status {
        EnvFile::Loaded => tracing::info!(path = %env_file.display(), "Loaded env file"),
        EnvFile::Missing => {
            tracing::warn!(
                path = %env_file.display(),
                "Env file not found, using process environment"
            );
        }
    }

    let config = Config::from_env()
        .context("Invalid configuration")?
        .with_identity(cli.cert, cli.key)
        .require_identity()?;

    let client = BankClient::new(&config).context("Cannot set up the bank client")?;
    tracing::info!(mtls = client.has_identity(), "Bank client ready");

    let gateway = AisGateway::connect(config, Arc::new(client))
        .await
        .context("Endpoint discovery failed")?;

    server::run(gateway, cli.port).await
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_env_file_loaded_before_cli() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "XS2A_GATEWAY_TEST_PORT=9191").unwrap();

        assert!(matches!(load_env_file(file.path()).unwrap(), EnvFile::Loaded));
        assert_eq!(std::env::var("XS2A_GATEWAY_TEST_PORT").unwrap(), "9191");
    }

    #[test]
    fn test_missing_env_file_is_not_fatal() {
        let missing = Path::new("/nonexistent/xs2a/sandbox.env");
        assert!(matches!(load_env_file(missing).unwrap(), EnvFile::Missing));
    }
}
