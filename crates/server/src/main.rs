use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use phishguard_server::auth::HttpCredentialVerifier;
use phishguard_server::classify::{GatewayClassifier, GatewayConfig};
use phishguard_server::config::Config;
use phishguard_server::serve;
use phishguard_storage::{RestStore, RestStoreConfig};

/// PhishGuard scam-analysis service.
#[derive(Parser)]
#[command(name = "phishguard", version, about = "PhishGuard scam-analysis service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let config = match Config::from_env() {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("configuration error: {e}");
                    process::exit(1);
                }
            };

            let verifier = Arc::new(HttpCredentialVerifier::new(
                config.auth_url.clone(),
                config.db_key.clone(),
            ));
            let classifier = Arc::new(GatewayClassifier::new(GatewayConfig {
                url: config.ai_url.clone(),
                api_key: config.ai_key.clone(),
                text_model: config.text_model.clone(),
                audio_model: config.audio_model.clone(),
            }));
            let store = Arc::new(RestStore::new(RestStoreConfig {
                base_url: config.db_url.clone(),
                api_key: config.db_key.clone(),
            }));

            if let Err(e) = serve::start_server(port, &config, verifier, classifier, store).await {
                eprintln!("server error: {e}");
                process::exit(1);
            }
        }
    }
}
